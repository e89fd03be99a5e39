//! Shared builders for tests.

use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use crate::marketplace::validation::{NewJob, ProposalDraft};
use crate::marketplace::Marketplace;
use crate::models::job::{Budget, BudgetKind, Job, JobStatus};
use crate::models::proposal::{DurationUnit, EstimatedDuration, Proposal, ProposalStatus};
use crate::models::user::{Principal, Role};
use crate::store::{MarketplaceStore, MemoryStore};

pub fn business() -> Principal {
    Principal::new(Uuid::new_v4(), Role::Business)
}

pub fn freelancer() -> Principal {
    Principal::new(Uuid::new_v4(), Role::Freelancer)
}

pub fn admin() -> Principal {
    Principal::new(Uuid::new_v4(), Role::Admin)
}

pub fn new_job() -> NewJob {
    NewJob {
        title: "Build a REST API".to_string(),
        description: "Axum service backed by Postgres".to_string(),
        skills: vec!["rust".to_string(), "postgres".to_string()],
        budget: Budget {
            kind: BudgetKind::Fixed,
            min: 500.0,
            max: 1500.0,
        },
        deadline: None,
        is_urgent: false,
    }
}

pub fn sample_draft(bid_amount: f64) -> ProposalDraft {
    ProposalDraft {
        cover_letter: "I have shipped three of these.".to_string(),
        bid_amount,
        estimated_duration: EstimatedDuration {
            value: 2.0,
            unit: DurationUnit::Weeks,
        },
    }
}

pub fn sample_job(business_id: Uuid) -> Job {
    Job {
        id: Uuid::new_v4(),
        title: "Build a REST API".to_string(),
        description: "Axum service".to_string(),
        business_id,
        skills: vec!["rust".to_string()],
        budget: Budget {
            kind: BudgetKind::Hourly,
            min: 40.0,
            max: 80.0,
        },
        deadline: None,
        is_urgent: false,
        status: JobStatus::Open,
        hired_freelancer: None,
        proposals: vec![],
        version: 1,
        created_at: Utc::now(),
    }
}

pub fn sample_proposal(job_id: Uuid, freelancer_id: Uuid) -> Proposal {
    Proposal {
        id: Uuid::new_v4(),
        job_id,
        freelancer_id,
        cover_letter: "Hire me".to_string(),
        bid_amount: 500.0,
        estimated_duration: EstimatedDuration {
            value: 2.0,
            unit: DurationUnit::Weeks,
        },
        status: ProposalStatus::Pending,
        created_at: Utc::now(),
    }
}

pub fn memory_store() -> Arc<dyn MarketplaceStore> {
    Arc::new(MemoryStore::new())
}

pub fn marketplace() -> Marketplace {
    Marketplace::new(memory_store())
}
