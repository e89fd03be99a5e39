use axum::{extract::State, Json};
use serde_json::{json, Value};

use crate::models::user::Principal;
use crate::state::AppState;

/// GET /health
/// Returns service status, version and the active store backend.
pub async fn health_handler(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "service": "mindlancer-api",
        "store": state.marketplace.store().backend()
    }))
}

/// GET /api/v1/me
pub async fn me_handler(principal: Principal) -> Json<Principal> {
    Json(principal)
}
