//! Access policy: who may do what to which job or proposal.
//!
//! Pure over (role, ownership). Status checks live in the transition
//! service because they surface as `Conflict`, not `Forbidden`.

use crate::errors::AppError;
use crate::models::job::Job;
use crate::models::proposal::Proposal;
use crate::models::user::{Principal, Role};

#[derive(Debug, Clone, Copy)]
pub enum Action<'a> {
    CreateJob,
    /// Edit, delete or change the status of a job.
    ManageJob(&'a Job),
    SubmitProposal,
    WithdrawProposal(&'a Proposal),
    /// Accept or reject a proposal against this job.
    DecideProposal(&'a Job),
    ViewJobProposals {
        job: &'a Job,
        has_own_proposal: bool,
    },
    ViewProposal {
        proposal: &'a Proposal,
        job: &'a Job,
    },
    ListOwnJobs,
    ListOwnProposals,
}

pub fn authorize(principal: &Principal, action: Action<'_>) -> Result<(), AppError> {
    let allowed = match action {
        Action::CreateJob | Action::ListOwnJobs => principal.is(Role::Business),
        Action::ManageJob(job) | Action::DecideProposal(job) => {
            principal.is(Role::Business) && job.is_owned_by(principal.id)
        }
        Action::SubmitProposal | Action::ListOwnProposals => principal.is(Role::Freelancer),
        Action::WithdrawProposal(proposal) => {
            principal.is(Role::Freelancer) && proposal.is_owned_by(principal.id)
        }
        Action::ViewJobProposals {
            job,
            has_own_proposal,
        } => match principal.role {
            Role::Admin => true,
            Role::Business => job.is_owned_by(principal.id),
            Role::Freelancer => has_own_proposal,
        },
        Action::ViewProposal { proposal, job } => match principal.role {
            Role::Admin => true,
            Role::Business => job.is_owned_by(principal.id),
            Role::Freelancer => proposal.is_owned_by(principal.id),
        },
    };

    if allowed {
        Ok(())
    } else {
        Err(AppError::Forbidden(denial_message(principal, action)))
    }
}

fn denial_message(principal: &Principal, action: Action<'_>) -> String {
    match action {
        Action::CreateJob => "Only business accounts can post jobs".to_string(),
        Action::ListOwnJobs => "Access denied. Business accounts only.".to_string(),
        Action::SubmitProposal | Action::ListOwnProposals => {
            "Access denied. Freelancer accounts only.".to_string()
        }
        Action::ManageJob(job) => format!("User {} does not own job {}", principal.id, job.id),
        Action::DecideProposal(job) => format!(
            "Only the business that posted job {} can decide its proposals",
            job.id
        ),
        Action::WithdrawProposal(proposal) => format!(
            "User {} does not own proposal {}",
            principal.id, proposal.id
        ),
        Action::ViewJobProposals { job, .. } => {
            format!("Not authorized to view proposals for job {}", job.id)
        }
        Action::ViewProposal { proposal, .. } => {
            format!("Not authorized to view proposal {}", proposal.id)
        }
    }
}

#[cfg(test)]
mod tests {
    use uuid::Uuid;

    use super::*;
    use crate::marketplace::fixtures::{admin, business, freelancer, sample_job, sample_proposal};

    fn forbidden(result: Result<(), AppError>) -> bool {
        matches!(result, Err(AppError::Forbidden(_)))
    }

    #[test]
    fn test_only_business_creates_jobs() {
        assert!(authorize(&business(), Action::CreateJob).is_ok());
        assert!(forbidden(authorize(&freelancer(), Action::CreateJob)));
        assert!(forbidden(authorize(&admin(), Action::CreateJob)));
    }

    #[test]
    fn test_only_owner_manages_job() {
        let owner = business();
        let other = business();
        let job = sample_job(owner.id);

        assert!(authorize(&owner, Action::ManageJob(&job)).is_ok());
        assert!(forbidden(authorize(&other, Action::ManageJob(&job))));
        assert!(forbidden(authorize(&admin(), Action::ManageJob(&job))));
    }

    #[test]
    fn test_owner_id_with_wrong_role_is_forbidden() {
        let owner = business();
        let job = sample_job(owner.id);
        let impostor = Principal::new(owner.id, Role::Freelancer);
        assert!(forbidden(authorize(&impostor, Action::ManageJob(&job))));
        assert!(forbidden(authorize(&impostor, Action::DecideProposal(&job))));
    }

    #[test]
    fn test_only_freelancer_submits() {
        assert!(authorize(&freelancer(), Action::SubmitProposal).is_ok());
        assert!(forbidden(authorize(&business(), Action::SubmitProposal)));
        assert!(forbidden(authorize(&admin(), Action::SubmitProposal)));
    }

    #[test]
    fn test_only_owning_freelancer_withdraws() {
        let owner = freelancer();
        let proposal = sample_proposal(Uuid::new_v4(), owner.id);

        assert!(authorize(&owner, Action::WithdrawProposal(&proposal)).is_ok());
        assert!(forbidden(authorize(
            &freelancer(),
            Action::WithdrawProposal(&proposal)
        )));
        assert!(forbidden(authorize(
            &business(),
            Action::WithdrawProposal(&proposal)
        )));
    }

    #[test]
    fn test_only_job_owner_decides() {
        let owner = business();
        let job = sample_job(owner.id);
        assert!(authorize(&owner, Action::DecideProposal(&job)).is_ok());
        assert!(forbidden(authorize(&business(), Action::DecideProposal(&job))));
        assert!(forbidden(authorize(&freelancer(), Action::DecideProposal(&job))));
        assert!(forbidden(authorize(&admin(), Action::DecideProposal(&job))));
    }

    #[test]
    fn test_view_job_proposals() {
        let owner = business();
        let job = sample_job(owner.id);
        let view = |has_own_proposal| Action::ViewJobProposals {
            job: &job,
            has_own_proposal,
        };

        assert!(authorize(&owner, view(false)).is_ok());
        assert!(authorize(&admin(), view(false)).is_ok());
        assert!(authorize(&freelancer(), view(true)).is_ok());
        assert!(forbidden(authorize(&freelancer(), view(false))));
        assert!(forbidden(authorize(&business(), view(false))));
    }

    #[test]
    fn test_view_single_proposal() {
        let owner = business();
        let bidder = freelancer();
        let job = sample_job(owner.id);
        let proposal = sample_proposal(job.id, bidder.id);
        let view = Action::ViewProposal {
            proposal: &proposal,
            job: &job,
        };

        assert!(authorize(&owner, view).is_ok());
        assert!(authorize(&bidder, view).is_ok());
        assert!(authorize(&admin(), view).is_ok());
        assert!(forbidden(authorize(&freelancer(), view)));
        assert!(forbidden(authorize(&business(), view)));
    }

    #[test]
    fn test_list_own_collections_by_role() {
        assert!(authorize(&business(), Action::ListOwnJobs).is_ok());
        assert!(forbidden(authorize(&freelancer(), Action::ListOwnJobs)));
        assert!(authorize(&freelancer(), Action::ListOwnProposals).is_ok());
        assert!(forbidden(authorize(&business(), Action::ListOwnProposals)));
    }
}
