use async_trait::async_trait;
use sqlx::{PgPool, Postgres, QueryBuilder};
use tracing::{info, warn};
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::job::{Job, JobRow, JobStatus};
use crate::models::proposal::{Proposal, ProposalRow, ProposalStatus};
use crate::store::{Acceptance, AcceptanceOutcome, JobFilter, JobSort, MarketplaceStore};

/// Jobs with their proposal ids, oldest proposal first.
const JOB_SELECT: &str = r#"
SELECT j.id, j.title, j.description, j.business_id, j.skills,
       j.budget_type, j.budget_min, j.budget_max, j.deadline, j.is_urgent,
       j.status, j.hired_freelancer,
       ARRAY(
           SELECT p.id FROM proposals p
           WHERE p.job_id = j.id
           ORDER BY p.created_at, p.id
       ) AS proposal_ids,
       j.version, j.created_at
FROM jobs j
"#;

const PROPOSAL_SELECT: &str = r#"
SELECT id, job_id, freelancer_id, cover_letter, bid_amount,
       duration_value, duration_unit, status, created_at
FROM proposals
"#;

const PROPOSAL_RETURNING: &str = "RETURNING id, job_id, freelancer_id, cover_letter, bid_amount, \
     duration_value, duration_unit, status, created_at";

/// PostgreSQL-backed store. Guarded writes use conditional UPDATEs and
/// transactions so the invariants hold across service instances.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Distinguishes a vanished job from a stale version after a guarded write hit no rows.
    async fn job_write_missed(&self, id: Uuid) -> AppError {
        match self.find_job(id).await {
            Ok(None) => AppError::NotFound(format!("Job {id} not found")),
            Ok(Some(_)) => {
                AppError::Conflict(format!("Job {id} was modified concurrently; reload and retry"))
            }
            Err(e) => e,
        }
    }
}

fn rows_to_jobs(rows: Vec<JobRow>) -> Result<Vec<Job>, AppError> {
    rows.into_iter().map(Job::try_from).collect()
}

fn rows_to_proposals(rows: Vec<ProposalRow>) -> Result<Vec<Proposal>, AppError> {
    rows.into_iter().map(Proposal::try_from).collect()
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.is_unique_violation())
}

/// Escapes LIKE metacharacters so user search text matches literally.
fn escape_like(term: &str) -> String {
    term.replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

fn order_by(sort: JobSort) -> &'static str {
    match sort {
        JobSort::Newest => " ORDER BY j.created_at DESC, j.id",
        JobSort::Oldest => " ORDER BY j.created_at ASC, j.id",
        JobSort::BudgetHigh => " ORDER BY j.budget_max DESC, j.created_at DESC",
        JobSort::BudgetLow => " ORDER BY j.budget_min ASC, j.created_at DESC",
    }
}

#[async_trait]
impl MarketplaceStore for PgStore {
    fn backend(&self) -> &'static str {
        "postgres"
    }

    async fn find_job(&self, id: Uuid) -> Result<Option<Job>, AppError> {
        let sql = format!("{JOB_SELECT} WHERE j.id = $1");
        let row: Option<JobRow> = sqlx::query_as(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(Job::try_from).transpose()
    }

    async fn list_jobs(&self, filter: &JobFilter) -> Result<Vec<Job>, AppError> {
        let mut qb: QueryBuilder<Postgres> = QueryBuilder::new(JOB_SELECT);
        qb.push(" WHERE TRUE");

        if let Some(status) = filter.status {
            qb.push(" AND j.status = ").push_bind(status.as_str());
        }
        if let Some(term) = &filter.search {
            let pattern = format!("%{}%", escape_like(term));
            qb.push(" AND (j.title ILIKE ")
                .push_bind(pattern.clone())
                .push(" OR j.description ILIKE ")
                .push_bind(pattern.clone())
                .push(" OR EXISTS (SELECT 1 FROM unnest(j.skills) AS s(skill) WHERE s.skill ILIKE ")
                .push_bind(pattern)
                .push("))");
        }
        if !filter.skills.is_empty() {
            qb.push(" AND j.skills && ").push_bind(filter.skills.clone());
        }
        if let Some(min) = filter.budget_min {
            qb.push(" AND j.budget_max >= ").push_bind(min);
        }
        if let Some(max) = filter.budget_max {
            qb.push(" AND j.budget_min <= ").push_bind(max);
        }
        qb.push(order_by(filter.sort));

        let rows = qb.build_query_as::<JobRow>().fetch_all(&self.pool).await?;
        rows_to_jobs(rows)
    }

    async fn jobs_by_business(&self, business_id: Uuid) -> Result<Vec<Job>, AppError> {
        let sql = format!("{JOB_SELECT} WHERE j.business_id = $1 ORDER BY j.created_at DESC");
        let rows: Vec<JobRow> = sqlx::query_as(&sql)
            .bind(business_id)
            .fetch_all(&self.pool)
            .await?;
        rows_to_jobs(rows)
    }

    async fn insert_job(&self, job: &Job) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO jobs
                (id, title, description, business_id, skills, budget_type,
                 budget_min, budget_max, deadline, is_urgent, status,
                 hired_freelancer, version, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
            "#,
        )
        .bind(job.id)
        .bind(&job.title)
        .bind(&job.description)
        .bind(job.business_id)
        .bind(job.skills.as_slice())
        .bind(job.budget.kind.as_str())
        .bind(job.budget.min)
        .bind(job.budget.max)
        .bind(job.deadline)
        .bind(job.is_urgent)
        .bind(job.status.as_str())
        .bind(job.hired_freelancer)
        .bind(job.version)
        .bind(job.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn update_job(&self, job: &Job, expected_version: i64) -> Result<Job, AppError> {
        let result = sqlx::query(
            r#"
            UPDATE jobs
            SET title = $1, description = $2, skills = $3, budget_type = $4,
                budget_min = $5, budget_max = $6, deadline = $7, is_urgent = $8,
                status = $9, hired_freelancer = $10, version = version + 1
            WHERE id = $11 AND version = $12
            "#,
        )
        .bind(&job.title)
        .bind(&job.description)
        .bind(job.skills.as_slice())
        .bind(job.budget.kind.as_str())
        .bind(job.budget.min)
        .bind(job.budget.max)
        .bind(job.deadline)
        .bind(job.is_urgent)
        .bind(job.status.as_str())
        .bind(job.hired_freelancer)
        .bind(job.id)
        .bind(expected_version)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(self.job_write_missed(job.id).await);
        }
        self.find_job(job.id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Job {} not found", job.id)))
    }

    async fn delete_job(&self, id: Uuid, expected_version: i64) -> Result<(), AppError> {
        // Proposals go with the job via ON DELETE CASCADE.
        let result = sqlx::query("DELETE FROM jobs WHERE id = $1 AND version = $2")
            .bind(id)
            .bind(expected_version)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(self.job_write_missed(id).await);
        }
        Ok(())
    }

    async fn find_proposal(&self, id: Uuid) -> Result<Option<Proposal>, AppError> {
        let sql = format!("{PROPOSAL_SELECT} WHERE id = $1");
        let row: Option<ProposalRow> = sqlx::query_as(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(Proposal::try_from).transpose()
    }

    async fn find_proposals_by_job(&self, job_id: Uuid) -> Result<Vec<Proposal>, AppError> {
        let sql = format!("{PROPOSAL_SELECT} WHERE job_id = $1 ORDER BY created_at, id");
        let rows: Vec<ProposalRow> = sqlx::query_as(&sql)
            .bind(job_id)
            .fetch_all(&self.pool)
            .await?;
        rows_to_proposals(rows)
    }

    async fn find_proposals_by_freelancer(
        &self,
        freelancer_id: Uuid,
    ) -> Result<Vec<Proposal>, AppError> {
        let sql = format!("{PROPOSAL_SELECT} WHERE freelancer_id = $1 ORDER BY created_at DESC");
        let rows: Vec<ProposalRow> = sqlx::query_as(&sql)
            .bind(freelancer_id)
            .fetch_all(&self.pool)
            .await?;
        rows_to_proposals(rows)
    }

    async fn find_proposal_by_job_and_freelancer(
        &self,
        job_id: Uuid,
        freelancer_id: Uuid,
    ) -> Result<Option<Proposal>, AppError> {
        let sql = format!("{PROPOSAL_SELECT} WHERE job_id = $1 AND freelancer_id = $2");
        let row: Option<ProposalRow> = sqlx::query_as(&sql)
            .bind(job_id)
            .bind(freelancer_id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(Proposal::try_from).transpose()
    }

    async fn insert_proposal(&self, proposal: &Proposal) -> Result<(), AppError> {
        let mut tx = self.pool.begin().await?;

        // Row lock orders this insert against a concurrent acceptance of the same job.
        let status: Option<String> =
            sqlx::query_scalar("SELECT status FROM jobs WHERE id = $1 FOR UPDATE")
                .bind(proposal.job_id)
                .fetch_optional(&mut *tx)
                .await?;
        let status = status
            .ok_or_else(|| AppError::NotFound(format!("Job {} not found", proposal.job_id)))?;
        if status != JobStatus::Open.as_str() {
            return Err(AppError::Conflict(format!(
                "Job {} is {status} and no longer accepting proposals",
                proposal.job_id
            )));
        }

        let inserted = sqlx::query(
            r#"
            INSERT INTO proposals
                (id, job_id, freelancer_id, cover_letter, bid_amount,
                 duration_value, duration_unit, status, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(proposal.id)
        .bind(proposal.job_id)
        .bind(proposal.freelancer_id)
        .bind(&proposal.cover_letter)
        .bind(proposal.bid_amount)
        .bind(proposal.estimated_duration.value)
        .bind(proposal.estimated_duration.unit.as_str())
        .bind(proposal.status.as_str())
        .bind(proposal.created_at)
        .execute(&mut *tx)
        .await;

        match inserted {
            Ok(_) => {}
            Err(e) if is_unique_violation(&e) => {
                return Err(AppError::Conflict(
                    "A proposal for this job has already been submitted".to_string(),
                ))
            }
            Err(e) => return Err(e.into()),
        }

        tx.commit().await?;
        Ok(())
    }

    async fn transition_proposal(
        &self,
        id: Uuid,
        from: ProposalStatus,
        to: ProposalStatus,
    ) -> Result<Proposal, AppError> {
        let sql = format!("UPDATE proposals SET status = $1 WHERE id = $2 AND status = $3 {PROPOSAL_RETURNING}");
        let row: Option<ProposalRow> = sqlx::query_as(&sql)
            .bind(to.as_str())
            .bind(id)
            .bind(from.as_str())
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => Proposal::try_from(row),
            None => match self.find_proposal(id).await? {
                None => Err(AppError::NotFound(format!("Proposal {id} not found"))),
                Some(current) => Err(AppError::Conflict(format!(
                    "Proposal {id} is {}, expected {from}",
                    current.status
                ))),
            },
        }
    }

    async fn commit_acceptance(
        &self,
        acceptance: &Acceptance,
    ) -> Result<AcceptanceOutcome, AppError> {
        let Acceptance {
            job_id,
            proposal_id,
            freelancer_id,
            expected_version,
        } = *acceptance;

        // Any early return drops `tx`, which rolls the whole cascade back.
        let mut tx = self.pool.begin().await?;

        let job_updated = sqlx::query(
            r#"
            UPDATE jobs
            SET status = 'in-progress', hired_freelancer = $2, version = version + 1
            WHERE id = $1 AND version = $3 AND status = 'open'
            "#,
        )
        .bind(job_id)
        .bind(freelancer_id)
        .bind(expected_version)
        .execute(&mut *tx)
        .await?;
        if job_updated.rows_affected() == 0 {
            drop(tx);
            warn!("Acceptance of proposal {proposal_id} lost the race on job {job_id}");
            return Err(match self.job_write_missed(job_id).await {
                AppError::Conflict(_) => AppError::Conflict(format!(
                    "Job {job_id} is no longer open or was modified concurrently"
                )),
                other => other,
            });
        }

        let accepted = sqlx::query(
            "UPDATE proposals SET status = 'accepted' WHERE id = $1 AND job_id = $2 AND status = 'pending'",
        )
        .bind(proposal_id)
        .bind(job_id)
        .execute(&mut *tx)
        .await;
        match accepted {
            Ok(r) if r.rows_affected() == 1 => {}
            Ok(_) => {
                return Err(AppError::Conflict(format!(
                    "Proposal {proposal_id} is no longer pending"
                )))
            }
            Err(e) if is_unique_violation(&e) => {
                return Err(AppError::Conflict(format!(
                    "Job {job_id} already has an accepted proposal"
                )))
            }
            Err(e) => return Err(e.into()),
        }

        let rejected: Vec<Uuid> = sqlx::query_scalar(
            r#"
            UPDATE proposals SET status = 'rejected'
            WHERE job_id = $1 AND id <> $2 AND status = 'pending'
            RETURNING id
            "#,
        )
        .bind(job_id)
        .bind(proposal_id)
        .fetch_all(&mut *tx)
        .await?;

        tx.commit().await?;
        info!(
            "Committed acceptance of proposal {proposal_id} on job {job_id} ({} rejected)",
            rejected.len()
        );

        let job = self
            .find_job(job_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Job {job_id} not found")))?;
        let proposal = self
            .find_proposal(proposal_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Proposal {proposal_id} not found")))?;

        Ok(AcceptanceOutcome {
            job,
            proposal,
            rejected,
        })
    }
}
