//! Persistence seam for jobs and proposals.
//!
//! The transition service only talks to `dyn MarketplaceStore`. Absence is
//! reported as `Ok(None)`; every `Err` is a real failure. Writes that guard
//! an invariant (`update_job`, `delete_job`, `insert_proposal`,
//! `transition_proposal`, `commit_acceptance`) re-check their preconditions
//! inside the store so that concurrent writers cannot both win.

pub mod filter;
pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::job::Job;
use crate::models::proposal::{Proposal, ProposalStatus};

pub use filter::{JobFilter, JobSort};
pub use memory::MemoryStore;
pub use postgres::PgStore;

/// Everything needed to accept one proposal and cascade-reject its pending siblings.
#[derive(Debug, Clone, Copy)]
pub struct Acceptance {
    pub job_id: Uuid,
    pub proposal_id: Uuid,
    pub freelancer_id: Uuid,
    /// Job version observed when the decision was made.
    pub expected_version: i64,
}

#[derive(Debug, Clone)]
pub struct AcceptanceOutcome {
    pub job: Job,
    pub proposal: Proposal,
    /// Sibling proposals moved from pending to rejected.
    pub rejected: Vec<Uuid>,
}

#[async_trait]
pub trait MarketplaceStore: Send + Sync {
    /// Short name for logs and the health endpoint.
    fn backend(&self) -> &'static str;

    async fn find_job(&self, id: Uuid) -> Result<Option<Job>, AppError>;

    async fn list_jobs(&self, filter: &JobFilter) -> Result<Vec<Job>, AppError>;

    /// Jobs owned by a business, newest first.
    async fn jobs_by_business(&self, business_id: Uuid) -> Result<Vec<Job>, AppError>;

    async fn insert_job(&self, job: &Job) -> Result<(), AppError>;

    /// Writes every mutable field of `job` if the stored version still equals
    /// `expected_version`. Returns the stored job with its bumped version.
    async fn update_job(&self, job: &Job, expected_version: i64) -> Result<Job, AppError>;

    /// Deletes a job and all of its proposals, guarded by version.
    async fn delete_job(&self, id: Uuid, expected_version: i64) -> Result<(), AppError>;

    async fn find_proposal(&self, id: Uuid) -> Result<Option<Proposal>, AppError>;

    /// Proposals for a job in submission order.
    async fn find_proposals_by_job(&self, job_id: Uuid) -> Result<Vec<Proposal>, AppError>;

    /// Proposals by a freelancer, newest first.
    async fn find_proposals_by_freelancer(
        &self,
        freelancer_id: Uuid,
    ) -> Result<Vec<Proposal>, AppError>;

    async fn find_proposal_by_job_and_freelancer(
        &self,
        job_id: Uuid,
        freelancer_id: Uuid,
    ) -> Result<Option<Proposal>, AppError>;

    /// Inserts a pending proposal and appends it to its job.
    /// `NotFound` if the job is gone, `Conflict` if it is no longer open or
    /// the (job, freelancer) pair already exists.
    async fn insert_proposal(&self, proposal: &Proposal) -> Result<(), AppError>;

    /// Compare-and-set on proposal status. `Conflict` when the stored status
    /// is not `from`.
    async fn transition_proposal(
        &self,
        id: Uuid,
        from: ProposalStatus,
        to: ProposalStatus,
    ) -> Result<Proposal, AppError>;

    /// Applies an acceptance as one unit: job to in-progress with the hire set,
    /// the proposal to accepted, every other pending proposal of the job to
    /// rejected. Nothing is written if any guard fails.
    async fn commit_acceptance(&self, acceptance: &Acceptance)
        -> Result<AcceptanceOutcome, AppError>;
}
