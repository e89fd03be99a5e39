use crate::config::Config;
use crate::marketplace::Marketplace;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    /// Transition service over whichever store backend was configured at startup.
    pub marketplace: Marketplace,
    pub config: Config,
}
