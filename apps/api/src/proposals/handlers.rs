use axum::{
    extract::State,
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::errors::AppError;
use crate::extract::{AppJson, AppPath};
use crate::marketplace::validation::ProposalDraft;
use crate::marketplace::{Decision, DecisionOutcome};
use crate::models::proposal::{EstimatedDuration, Proposal, ProposalStatus};
use crate::models::user::Principal;
use crate::routes::ListResponse;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct SubmitProposalRequest {
    pub job_id: Uuid,
    pub cover_letter: String,
    pub bid_amount: f64,
    pub estimated_duration: EstimatedDuration,
}

/// Body of `PATCH /api/v1/proposals/:id/status`; `accepted` or `rejected`.
#[derive(Debug, Deserialize)]
pub struct DecisionRequest {
    pub status: ProposalStatus,
}

/// POST /api/v1/proposals
pub async fn handle_submit_proposal(
    State(state): State<AppState>,
    principal: Principal,
    AppJson(req): AppJson<SubmitProposalRequest>,
) -> Result<(StatusCode, Json<Proposal>), AppError> {
    let draft = ProposalDraft {
        cover_letter: req.cover_letter,
        bid_amount: req.bid_amount,
        estimated_duration: req.estimated_duration,
    };
    let proposal = state
        .marketplace
        .submit_proposal(&principal, req.job_id, draft)
        .await?;
    Ok((StatusCode::CREATED, Json(proposal)))
}

/// GET /api/v1/proposals/mine
pub async fn handle_my_proposals(
    State(state): State<AppState>,
    principal: Principal,
) -> Result<Json<ListResponse<Proposal>>, AppError> {
    let proposals = state.marketplace.my_proposals(&principal).await?;
    Ok(Json(ListResponse::new(proposals)))
}

/// GET /api/v1/proposals/:id
pub async fn handle_get_proposal(
    State(state): State<AppState>,
    principal: Principal,
    AppPath(id): AppPath<Uuid>,
) -> Result<Json<Proposal>, AppError> {
    Ok(Json(state.marketplace.get_proposal(&principal, id).await?))
}

/// PATCH /api/v1/proposals/:id/status
pub async fn handle_decide_proposal(
    State(state): State<AppState>,
    principal: Principal,
    AppPath(id): AppPath<Uuid>,
    AppJson(req): AppJson<DecisionRequest>,
) -> Result<Json<DecisionOutcome>, AppError> {
    let decision = Decision::try_from(req.status)?;
    let outcome = state
        .marketplace
        .decide_proposal(&principal, id, decision)
        .await?;
    Ok(Json(outcome))
}

/// PATCH /api/v1/proposals/:id/withdraw
pub async fn handle_withdraw_proposal(
    State(state): State<AppState>,
    principal: Principal,
    AppPath(id): AppPath<Uuid>,
) -> Result<Json<Proposal>, AppError> {
    Ok(Json(
        state.marketplace.withdraw_proposal(&principal, id).await?,
    ))
}
