pub mod health;

use axum::{
    routing::{get, patch, post},
    Router,
};
use serde::Serialize;

use crate::jobs::handlers as jobs;
use crate::proposals::handlers as proposals;
use crate::state::AppState;

/// Envelope shared by every list endpoint.
#[derive(Debug, Serialize)]
pub struct ListResponse<T> {
    pub items: Vec<T>,
    pub total: usize,
}

impl<T> ListResponse<T> {
    pub fn new(items: Vec<T>) -> Self {
        let total = items.len();
        Self { items, total }
    }
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        .route("/api/v1/me", get(health::me_handler))
        // Jobs
        .route(
            "/api/v1/jobs",
            get(jobs::handle_list_jobs).post(jobs::handle_create_job),
        )
        .route("/api/v1/jobs/mine", get(jobs::handle_my_jobs))
        .route(
            "/api/v1/jobs/:id",
            get(jobs::handle_get_job)
                .put(jobs::handle_update_job)
                .delete(jobs::handle_delete_job),
        )
        .route("/api/v1/jobs/:id/status", patch(jobs::handle_set_job_status))
        .route(
            "/api/v1/jobs/:id/proposals",
            get(jobs::handle_job_proposals),
        )
        // Proposals
        .route(
            "/api/v1/proposals",
            post(proposals::handle_submit_proposal),
        )
        .route("/api/v1/proposals/mine", get(proposals::handle_my_proposals))
        .route("/api/v1/proposals/:id", get(proposals::handle_get_proposal))
        .route(
            "/api/v1/proposals/:id/status",
            patch(proposals::handle_decide_proposal),
        )
        .route(
            "/api/v1/proposals/:id/withdraw",
            patch(proposals::handle_withdraw_proposal),
        )
        .with_state(state)
}
