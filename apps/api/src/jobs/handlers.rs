use axum::{
    extract::State,
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::errors::AppError;
use crate::extract::{AppJson, AppPath, AppQuery};
use crate::marketplace::validation::{normalize_skills, JobPatch, NewJob};
use crate::models::job::{Job, JobStatus};
use crate::models::proposal::Proposal;
use crate::models::user::Principal;
use crate::routes::ListResponse;
use crate::state::AppState;
use crate::store::{JobFilter, JobSort};

/// Query string for `GET /api/v1/jobs`. Everything arrives as text so bad
/// values surface as validation errors in the standard envelope.
#[derive(Debug, Default, Deserialize)]
pub struct JobListQuery {
    /// A job status, or `all`. Defaults to `open`.
    pub status: Option<String>,
    pub search: Option<String>,
    /// Comma-separated.
    pub skills: Option<String>,
    pub budget_min: Option<String>,
    pub budget_max: Option<String>,
    pub sort: Option<String>,
}

impl JobListQuery {
    pub fn into_filter(self) -> Result<JobFilter, AppError> {
        let mut filter = JobFilter::open();

        match self.status.as_deref().map(str::trim) {
            None | Some("") => {}
            Some("all") => filter.status = None,
            Some(s) => filter.status = Some(s.parse::<JobStatus>()?),
        }
        if let Some(s) = self.sort.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            filter.sort = s.parse::<JobSort>()?;
        }
        filter.search = self
            .search
            .map(|s| s.trim().to_lowercase())
            .filter(|s| !s.is_empty());
        if let Some(skills) = self.skills {
            filter.skills =
                normalize_skills(&skills.split(',').map(str::to_string).collect::<Vec<_>>());
        }
        filter.budget_min = parse_amount("budget_min", self.budget_min)?;
        filter.budget_max = parse_amount("budget_max", self.budget_max)?;

        Ok(filter)
    }
}

fn parse_amount(field: &str, raw: Option<String>) -> Result<Option<f64>, AppError> {
    match raw.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(s) => s
            .parse::<f64>()
            .ok()
            .filter(|v| v.is_finite())
            .map(Some)
            .ok_or_else(|| AppError::Validation(format!("{field} must be a number"))),
    }
}

#[derive(Debug, Deserialize)]
pub struct JobStatusRequest {
    pub status: JobStatus,
}

/// POST /api/v1/jobs
pub async fn handle_create_job(
    State(state): State<AppState>,
    principal: Principal,
    AppJson(req): AppJson<NewJob>,
) -> Result<(StatusCode, Json<Job>), AppError> {
    let job = state.marketplace.create_job(&principal, req).await?;
    Ok((StatusCode::CREATED, Json(job)))
}

/// GET /api/v1/jobs
pub async fn handle_list_jobs(
    State(state): State<AppState>,
    AppQuery(params): AppQuery<JobListQuery>,
) -> Result<Json<ListResponse<Job>>, AppError> {
    let filter = params.into_filter()?;
    let jobs = state.marketplace.list_jobs(&filter).await?;
    Ok(Json(ListResponse::new(jobs)))
}

/// GET /api/v1/jobs/mine
pub async fn handle_my_jobs(
    State(state): State<AppState>,
    principal: Principal,
) -> Result<Json<ListResponse<Job>>, AppError> {
    let jobs = state.marketplace.my_jobs(&principal).await?;
    Ok(Json(ListResponse::new(jobs)))
}

/// GET /api/v1/jobs/:id
pub async fn handle_get_job(
    State(state): State<AppState>,
    AppPath(id): AppPath<Uuid>,
) -> Result<Json<Job>, AppError> {
    Ok(Json(state.marketplace.get_job(id).await?))
}

/// PUT /api/v1/jobs/:id
pub async fn handle_update_job(
    State(state): State<AppState>,
    principal: Principal,
    AppPath(id): AppPath<Uuid>,
    AppJson(patch): AppJson<JobPatch>,
) -> Result<Json<Job>, AppError> {
    Ok(Json(state.marketplace.update_job(&principal, id, patch).await?))
}

/// DELETE /api/v1/jobs/:id
pub async fn handle_delete_job(
    State(state): State<AppState>,
    principal: Principal,
    AppPath(id): AppPath<Uuid>,
) -> Result<StatusCode, AppError> {
    state.marketplace.delete_job(&principal, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// PATCH /api/v1/jobs/:id/status
pub async fn handle_set_job_status(
    State(state): State<AppState>,
    principal: Principal,
    AppPath(id): AppPath<Uuid>,
    AppJson(req): AppJson<JobStatusRequest>,
) -> Result<Json<Job>, AppError> {
    Ok(Json(
        state
            .marketplace
            .set_job_status(&principal, id, req.status)
            .await?,
    ))
}

/// GET /api/v1/jobs/:id/proposals
pub async fn handle_job_proposals(
    State(state): State<AppState>,
    principal: Principal,
    AppPath(id): AppPath<Uuid>,
) -> Result<Json<ListResponse<Proposal>>, AppError> {
    let proposals = state.marketplace.job_proposals(&principal, id).await?;
    Ok(Json(ListResponse::new(proposals)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_query_lists_open_jobs_newest_first() {
        let filter = JobListQuery::default().into_filter().unwrap();
        assert_eq!(filter.status, Some(JobStatus::Open));
        assert_eq!(filter.sort, JobSort::Newest);
        assert!(filter.skills.is_empty());
        assert!(filter.search.is_none());
    }

    #[test]
    fn test_query_parsing() {
        let filter = JobListQuery {
            status: Some("all".into()),
            search: Some("  Rust API ".into()),
            skills: Some("Rust, SQL,,rust".into()),
            budget_min: Some("100".into()),
            budget_max: Some("".into()),
            sort: Some("budget_low".into()),
        }
        .into_filter()
        .unwrap();

        assert_eq!(filter.status, None);
        assert_eq!(filter.search.as_deref(), Some("rust api"));
        assert_eq!(filter.skills, vec!["rust", "sql"]);
        assert_eq!(filter.budget_min, Some(100.0));
        assert_eq!(filter.budget_max, None);
        assert_eq!(filter.sort, JobSort::BudgetLow);
    }

    #[test]
    fn test_bad_query_values_are_validation_errors() {
        let bad_status = JobListQuery {
            status: Some("archived".into()),
            ..Default::default()
        };
        assert!(matches!(bad_status.into_filter(), Err(AppError::Validation(_))));

        let bad_budget = JobListQuery {
            budget_max: Some("lots".into()),
            ..Default::default()
        };
        assert!(matches!(bad_budget.into_filter(), Err(AppError::Validation(_))));
    }
}
