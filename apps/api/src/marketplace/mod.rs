pub mod locks;
pub mod policy;
pub mod service;
pub mod validation;

#[cfg(test)]
pub(crate) mod fixtures;

pub use service::{Decision, DecisionOutcome, Marketplace};
