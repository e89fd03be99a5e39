//! Status transition service: the only code that changes job or proposal status.

use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

use crate::errors::AppError;
use crate::marketplace::locks::JobLocks;
use crate::marketplace::policy::{authorize, Action};
use crate::marketplace::validation::{
    check_job_fields, into_result, normalize_skills, validate_draft, validate_new_job, JobPatch,
    NewJob, ProposalDraft,
};
use crate::models::job::{Job, JobStatus};
use crate::models::proposal::{Proposal, ProposalStatus};
use crate::models::user::{Principal, Role};
use crate::store::{Acceptance, JobFilter, MarketplaceStore};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Accept,
    Reject,
}

impl TryFrom<ProposalStatus> for Decision {
    type Error = AppError;

    fn try_from(status: ProposalStatus) -> Result<Self, Self::Error> {
        match status {
            ProposalStatus::Accepted => Ok(Decision::Accept),
            ProposalStatus::Rejected => Ok(Decision::Reject),
            other => Err(AppError::Validation(format!(
                "Proposal status can only be set to accepted or rejected, not {other}"
            ))),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct DecisionOutcome {
    pub proposal: Proposal,
    /// The updated job, present when the decision hired someone.
    pub job: Option<Job>,
    /// Sibling proposals rejected by the cascade.
    pub rejected_proposals: Vec<Uuid>,
}

#[derive(Clone)]
pub struct Marketplace {
    store: Arc<dyn MarketplaceStore>,
    locks: JobLocks,
}

impl Marketplace {
    pub fn new(store: Arc<dyn MarketplaceStore>) -> Self {
        Self {
            store,
            locks: JobLocks::new(),
        }
    }

    pub fn store(&self) -> &dyn MarketplaceStore {
        self.store.as_ref()
    }

    async fn load_job(&self, id: Uuid) -> Result<Job, AppError> {
        self.store
            .find_job(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Job {id} not found")))
    }

    async fn load_proposal(&self, id: Uuid) -> Result<Proposal, AppError> {
        self.store
            .find_proposal(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Proposal {id} not found")))
    }

    // ── Jobs ────────────────────────────────────────────────────────────────

    pub async fn create_job(&self, principal: &Principal, input: NewJob) -> Result<Job, AppError> {
        authorize(principal, Action::CreateJob)?;
        let now = Utc::now();
        let input = validate_new_job(input, now)?;

        let job = Job {
            id: Uuid::new_v4(),
            title: input.title,
            description: input.description,
            business_id: principal.id,
            skills: input.skills,
            budget: input.budget,
            deadline: input.deadline,
            is_urgent: input.is_urgent,
            status: JobStatus::Open,
            hired_freelancer: None,
            proposals: Vec::new(),
            version: 1,
            created_at: now,
        };
        self.store.insert_job(&job).await?;

        info!("Business {} posted job {}", principal.id, job.id);
        Ok(job)
    }

    pub async fn get_job(&self, id: Uuid) -> Result<Job, AppError> {
        self.load_job(id).await
    }

    pub async fn list_jobs(&self, filter: &JobFilter) -> Result<Vec<Job>, AppError> {
        self.store.list_jobs(filter).await
    }

    pub async fn my_jobs(&self, principal: &Principal) -> Result<Vec<Job>, AppError> {
        authorize(principal, Action::ListOwnJobs)?;
        self.store.jobs_by_business(principal.id).await
    }

    /// Edits the content of an open job owned by the principal.
    pub async fn update_job(
        &self,
        principal: &Principal,
        job_id: Uuid,
        patch: JobPatch,
    ) -> Result<Job, AppError> {
        let _guard = self.locks.acquire(job_id).await;
        let job = self.load_job(job_id).await?;
        authorize(principal, Action::ManageJob(&job))?;
        if !job.is_open() {
            return Err(AppError::Conflict(format!(
                "Job {job_id} is {} and can no longer be edited",
                job.status
            )));
        }

        let mut next = job.clone();
        if let Some(title) = patch.title {
            next.title = title.trim().to_string();
        }
        if let Some(description) = patch.description {
            next.description = description.trim().to_string();
        }
        if let Some(skills) = patch.skills {
            next.skills = normalize_skills(&skills);
        }
        if let Some(budget) = patch.budget {
            next.budget = budget;
        }
        match patch.deadline {
            Some(Some(deadline)) if deadline <= Utc::now() => {
                return Err(AppError::Validation(
                    "Deadline must be in the future".to_string(),
                ));
            }
            Some(deadline) => next.deadline = deadline,
            None => {}
        }
        if let Some(is_urgent) = patch.is_urgent {
            next.is_urgent = is_urgent;
        }
        into_result(check_job_fields(
            &next.title,
            &next.description,
            &next.skills,
            &next.budget,
        ))?;

        let updated = self.store.update_job(&next, job.version).await?;
        info!("Job {job_id} edited by {}", principal.id);
        Ok(updated)
    }

    /// Deletes an open job and its proposals.
    pub async fn delete_job(&self, principal: &Principal, job_id: Uuid) -> Result<(), AppError> {
        let _guard = self.locks.acquire(job_id).await;
        let job = self.load_job(job_id).await?;
        authorize(principal, Action::ManageJob(&job))?;
        if !job.is_open() {
            return Err(AppError::Conflict(format!(
                "Job {job_id} is {} and can no longer be deleted",
                job.status
            )));
        }

        self.store.delete_job(job_id, job.version).await?;
        info!(
            "Job {job_id} deleted by {} with {} proposal(s)",
            principal.id,
            job.proposals.len()
        );
        Ok(())
    }

    /// Completes or cancels a job. Reopening or hiring through this path is refused;
    /// `in-progress` is reachable only by accepting a proposal.
    pub async fn set_job_status(
        &self,
        principal: &Principal,
        job_id: Uuid,
        status: JobStatus,
    ) -> Result<Job, AppError> {
        let _guard = self.locks.acquire(job_id).await;
        let job = self.load_job(job_id).await?;
        authorize(principal, Action::ManageJob(&job))?;

        if matches!(status, JobStatus::Open | JobStatus::InProgress) {
            return Err(AppError::Conflict(format!(
                "Job status cannot be set to {status} directly"
            )));
        }
        if !job.status.can_transition_to(status) {
            warn!("Refused job {job_id} transition {} -> {status}", job.status);
            return Err(AppError::Conflict(format!(
                "Job {job_id} cannot move from {} to {status}",
                job.status
            )));
        }

        let mut next = job.clone();
        next.status = status;
        if !status.has_hire() {
            next.hired_freelancer = None;
        }

        let updated = self.store.update_job(&next, job.version).await?;
        info!("Job {job_id} moved {} -> {status}", job.status);
        Ok(updated)
    }

    // ── Proposals ───────────────────────────────────────────────────────────

    pub async fn submit_proposal(
        &self,
        principal: &Principal,
        job_id: Uuid,
        draft: ProposalDraft,
    ) -> Result<Proposal, AppError> {
        authorize(principal, Action::SubmitProposal)?;
        validate_draft(&draft)?;

        let job = self.load_job(job_id).await?;
        if !job.is_open() {
            return Err(AppError::Conflict(format!(
                "Job {job_id} is {} and no longer accepting proposals",
                job.status
            )));
        }
        if self
            .store
            .find_proposal_by_job_and_freelancer(job_id, principal.id)
            .await?
            .is_some()
        {
            return Err(AppError::Conflict(
                "A proposal for this job has already been submitted".to_string(),
            ));
        }

        let proposal = Proposal {
            id: Uuid::new_v4(),
            job_id,
            freelancer_id: principal.id,
            cover_letter: draft.cover_letter.trim().to_string(),
            bid_amount: draft.bid_amount,
            estimated_duration: draft.estimated_duration,
            status: ProposalStatus::Pending,
            created_at: Utc::now(),
        };
        // The store repeats the open and uniqueness checks atomically.
        self.store.insert_proposal(&proposal).await?;

        info!(
            "Freelancer {} submitted proposal {} on job {job_id}",
            principal.id, proposal.id
        );
        Ok(proposal)
    }

    /// Accepts or rejects a pending proposal on behalf of the job owner.
    /// Accepting hires the freelancer and rejects every other pending proposal.
    pub async fn decide_proposal(
        &self,
        principal: &Principal,
        proposal_id: Uuid,
        decision: Decision,
    ) -> Result<DecisionOutcome, AppError> {
        let job_id = self.load_proposal(proposal_id).await?.job_id;
        let _guard = self.locks.acquire(job_id).await;

        // Re-read under the job lock.
        let proposal = self.load_proposal(proposal_id).await?;
        let job = self.load_job(job_id).await?;
        authorize(principal, Action::DecideProposal(&job))?;

        let target = match decision {
            Decision::Accept => ProposalStatus::Accepted,
            Decision::Reject => ProposalStatus::Rejected,
        };
        if !proposal.status.can_transition_to(target) {
            return Err(AppError::Conflict(format!(
                "Proposal {proposal_id} is {} and can no longer be decided",
                proposal.status
            )));
        }

        match decision {
            Decision::Accept => {
                if !job.is_open() {
                    return Err(AppError::Conflict(format!(
                        "Job {job_id} is {} and cannot hire",
                        job.status
                    )));
                }
                let outcome = self
                    .store
                    .commit_acceptance(&Acceptance {
                        job_id,
                        proposal_id,
                        freelancer_id: proposal.freelancer_id,
                        expected_version: job.version,
                    })
                    .await?;

                info!(
                    "Proposal {proposal_id} accepted; job {job_id} in progress with freelancer {}, {} sibling(s) rejected",
                    proposal.freelancer_id,
                    outcome.rejected.len()
                );
                Ok(DecisionOutcome {
                    proposal: outcome.proposal,
                    job: Some(outcome.job),
                    rejected_proposals: outcome.rejected,
                })
            }
            Decision::Reject => {
                let proposal = self
                    .store
                    .transition_proposal(proposal_id, ProposalStatus::Pending, target)
                    .await?;
                info!("Proposal {proposal_id} on job {job_id} rejected");
                Ok(DecisionOutcome {
                    proposal,
                    job: None,
                    rejected_proposals: Vec::new(),
                })
            }
        }
    }

    pub async fn withdraw_proposal(
        &self,
        principal: &Principal,
        proposal_id: Uuid,
    ) -> Result<Proposal, AppError> {
        let proposal = self.load_proposal(proposal_id).await?;
        authorize(principal, Action::WithdrawProposal(&proposal))?;
        if !proposal.status.can_transition_to(ProposalStatus::Withdrawn) {
            return Err(AppError::Conflict(format!(
                "Can only withdraw pending proposals; proposal {proposal_id} is {}",
                proposal.status
            )));
        }

        let proposal = self
            .store
            .transition_proposal(proposal_id, ProposalStatus::Pending, ProposalStatus::Withdrawn)
            .await?;
        info!("Proposal {proposal_id} withdrawn by {}", principal.id);
        Ok(proposal)
    }

    pub async fn get_proposal(
        &self,
        principal: &Principal,
        proposal_id: Uuid,
    ) -> Result<Proposal, AppError> {
        let proposal = self.load_proposal(proposal_id).await?;
        let job = self.load_job(proposal.job_id).await?;
        authorize(
            principal,
            Action::ViewProposal {
                proposal: &proposal,
                job: &job,
            },
        )?;
        Ok(proposal)
    }

    /// All proposals for the job owner and admins; only their own for a freelancer.
    pub async fn job_proposals(
        &self,
        principal: &Principal,
        job_id: Uuid,
    ) -> Result<Vec<Proposal>, AppError> {
        let job = self.load_job(job_id).await?;
        let proposals = self.store.find_proposals_by_job(job_id).await?;
        let has_own_proposal = proposals.iter().any(|p| p.is_owned_by(principal.id));
        authorize(
            principal,
            Action::ViewJobProposals {
                job: &job,
                has_own_proposal,
            },
        )?;

        if principal.is(Role::Freelancer) {
            Ok(proposals
                .into_iter()
                .filter(|p| p.is_owned_by(principal.id))
                .collect())
        } else {
            Ok(proposals)
        }
    }

    pub async fn my_proposals(&self, principal: &Principal) -> Result<Vec<Proposal>, AppError> {
        authorize(principal, Action::ListOwnProposals)?;
        self.store.find_proposals_by_freelancer(principal.id).await
    }
}
