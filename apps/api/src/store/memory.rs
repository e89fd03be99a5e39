use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::job::{Job, JobStatus};
use crate::models::proposal::{Proposal, ProposalStatus};
use crate::store::{Acceptance, AcceptanceOutcome, JobFilter, MarketplaceStore};

#[derive(Default)]
struct Inner {
    jobs: HashMap<Uuid, Job>,
    proposals: HashMap<Uuid, Proposal>,
}

/// Process-local store. Every write holds the single write lock for its whole
/// check-then-apply sequence, which makes each trait call atomic.
#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn job_not_found(id: Uuid) -> AppError {
    AppError::NotFound(format!("Job {id} not found"))
}

fn proposal_not_found(id: Uuid) -> AppError {
    AppError::NotFound(format!("Proposal {id} not found"))
}

fn stale_job(id: Uuid) -> AppError {
    AppError::Conflict(format!("Job {id} was modified concurrently; reload and retry"))
}

#[async_trait]
impl MarketplaceStore for MemoryStore {
    fn backend(&self) -> &'static str {
        "memory"
    }

    async fn find_job(&self, id: Uuid) -> Result<Option<Job>, AppError> {
        Ok(self.inner.read().await.jobs.get(&id).cloned())
    }

    async fn list_jobs(&self, filter: &JobFilter) -> Result<Vec<Job>, AppError> {
        let inner = self.inner.read().await;
        let mut jobs: Vec<Job> = inner
            .jobs
            .values()
            .filter(|job| filter.matches(job))
            .cloned()
            .collect();
        jobs.sort_by(|a, b| filter.sort.compare(a, b));
        Ok(jobs)
    }

    async fn jobs_by_business(&self, business_id: Uuid) -> Result<Vec<Job>, AppError> {
        let inner = self.inner.read().await;
        let mut jobs: Vec<Job> = inner
            .jobs
            .values()
            .filter(|job| job.business_id == business_id)
            .cloned()
            .collect();
        jobs.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(jobs)
    }

    async fn insert_job(&self, job: &Job) -> Result<(), AppError> {
        let mut inner = self.inner.write().await;
        if inner.jobs.contains_key(&job.id) {
            return Err(AppError::Conflict(format!("Job {} already exists", job.id)));
        }
        inner.jobs.insert(job.id, job.clone());
        Ok(())
    }

    async fn update_job(&self, job: &Job, expected_version: i64) -> Result<Job, AppError> {
        let mut inner = self.inner.write().await;
        let stored = inner
            .jobs
            .get_mut(&job.id)
            .ok_or_else(|| job_not_found(job.id))?;
        if stored.version != expected_version {
            return Err(stale_job(job.id));
        }

        // Proposal references are owned by the store, never by the caller.
        let proposals = std::mem::take(&mut stored.proposals);
        *stored = Job {
            proposals,
            version: expected_version + 1,
            ..job.clone()
        };
        Ok(stored.clone())
    }

    async fn delete_job(&self, id: Uuid, expected_version: i64) -> Result<(), AppError> {
        let mut inner = self.inner.write().await;
        let stored = inner.jobs.get(&id).ok_or_else(|| job_not_found(id))?;
        if stored.version != expected_version {
            return Err(stale_job(id));
        }
        inner.jobs.remove(&id);
        inner.proposals.retain(|_, p| p.job_id != id);
        Ok(())
    }

    async fn find_proposal(&self, id: Uuid) -> Result<Option<Proposal>, AppError> {
        Ok(self.inner.read().await.proposals.get(&id).cloned())
    }

    async fn find_proposals_by_job(&self, job_id: Uuid) -> Result<Vec<Proposal>, AppError> {
        let inner = self.inner.read().await;
        let Some(job) = inner.jobs.get(&job_id) else {
            return Ok(vec![]);
        };
        Ok(job
            .proposals
            .iter()
            .filter_map(|id| inner.proposals.get(id).cloned())
            .collect())
    }

    async fn find_proposals_by_freelancer(
        &self,
        freelancer_id: Uuid,
    ) -> Result<Vec<Proposal>, AppError> {
        let inner = self.inner.read().await;
        let mut proposals: Vec<Proposal> = inner
            .proposals
            .values()
            .filter(|p| p.freelancer_id == freelancer_id)
            .cloned()
            .collect();
        proposals.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(proposals)
    }

    async fn find_proposal_by_job_and_freelancer(
        &self,
        job_id: Uuid,
        freelancer_id: Uuid,
    ) -> Result<Option<Proposal>, AppError> {
        let inner = self.inner.read().await;
        Ok(inner
            .proposals
            .values()
            .find(|p| p.job_id == job_id && p.freelancer_id == freelancer_id)
            .cloned())
    }

    async fn insert_proposal(&self, proposal: &Proposal) -> Result<(), AppError> {
        let mut inner = self.inner.write().await;
        let Inner { jobs, proposals } = &mut *inner;

        let job = jobs
            .get_mut(&proposal.job_id)
            .ok_or_else(|| job_not_found(proposal.job_id))?;
        if !job.is_open() {
            return Err(AppError::Conflict(format!(
                "Job {} is {} and no longer accepting proposals",
                job.id, job.status
            )));
        }
        if proposals
            .values()
            .any(|p| p.job_id == proposal.job_id && p.freelancer_id == proposal.freelancer_id)
        {
            return Err(AppError::Conflict(
                "A proposal for this job has already been submitted".to_string(),
            ));
        }

        job.proposals.push(proposal.id);
        proposals.insert(proposal.id, proposal.clone());
        Ok(())
    }

    async fn transition_proposal(
        &self,
        id: Uuid,
        from: ProposalStatus,
        to: ProposalStatus,
    ) -> Result<Proposal, AppError> {
        let mut inner = self.inner.write().await;
        let proposal = inner
            .proposals
            .get_mut(&id)
            .ok_or_else(|| proposal_not_found(id))?;
        if proposal.status != from {
            return Err(AppError::Conflict(format!(
                "Proposal {id} is {}, expected {from}",
                proposal.status
            )));
        }
        proposal.status = to;
        Ok(proposal.clone())
    }

    async fn commit_acceptance(
        &self,
        acceptance: &Acceptance,
    ) -> Result<AcceptanceOutcome, AppError> {
        let mut inner = self.inner.write().await;
        let Inner { jobs, proposals } = &mut *inner;

        // Check every guard before touching anything.
        let job = jobs
            .get_mut(&acceptance.job_id)
            .ok_or_else(|| job_not_found(acceptance.job_id))?;
        if job.version != acceptance.expected_version {
            return Err(stale_job(job.id));
        }
        if !job.is_open() {
            return Err(AppError::Conflict(format!(
                "Job {} is {} and cannot hire",
                job.id, job.status
            )));
        }
        match proposals.get(&acceptance.proposal_id) {
            None => return Err(proposal_not_found(acceptance.proposal_id)),
            Some(p) if p.job_id != job.id => {
                return Err(AppError::Conflict(format!(
                    "Proposal {} does not belong to job {}",
                    p.id, job.id
                )))
            }
            Some(p) if !p.is_pending() => {
                return Err(AppError::Conflict(format!(
                    "Proposal {} is {} and cannot be accepted",
                    p.id, p.status
                )))
            }
            Some(_) => {}
        }

        job.status = JobStatus::InProgress;
        job.hired_freelancer = Some(acceptance.freelancer_id);
        job.version += 1;

        let mut rejected = Vec::new();
        for id in &job.proposals {
            let Some(p) = proposals.get_mut(id) else {
                continue;
            };
            if p.id == acceptance.proposal_id {
                p.status = ProposalStatus::Accepted;
            } else if p.is_pending() {
                p.status = ProposalStatus::Rejected;
                rejected.push(p.id);
            }
        }
        debug!(
            "memory store: accepted {} on job {}, rejected {}",
            acceptance.proposal_id,
            job.id,
            rejected.len()
        );

        let proposal = proposals
            .get(&acceptance.proposal_id)
            .cloned()
            .ok_or_else(|| proposal_not_found(acceptance.proposal_id))?;
        Ok(AcceptanceOutcome {
            job: job.clone(),
            proposal,
            rejected,
        })
    }
}
