use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::errors::AppError;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum JobStatus {
    Open,
    InProgress,
    Completed,
    Cancelled,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Open => "open",
            JobStatus::InProgress => "in-progress",
            JobStatus::Completed => "completed",
            JobStatus::Cancelled => "cancelled",
        }
    }

    /// Forward-only job lifecycle:
    /// open → in-progress → completed, and open | in-progress → cancelled.
    pub fn can_transition_to(self, next: JobStatus) -> bool {
        matches!(
            (self, next),
            (JobStatus::Open, JobStatus::InProgress)
                | (JobStatus::Open, JobStatus::Cancelled)
                | (JobStatus::InProgress, JobStatus::Completed)
                | (JobStatus::InProgress, JobStatus::Cancelled)
        )
    }

    /// Statuses in which `hired_freelancer` must be set.
    pub fn has_hire(self) -> bool {
        matches!(self, JobStatus::InProgress | JobStatus::Completed)
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for JobStatus {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "open" => Ok(JobStatus::Open),
            "in-progress" => Ok(JobStatus::InProgress),
            "completed" => Ok(JobStatus::Completed),
            "cancelled" => Ok(JobStatus::Cancelled),
            other => Err(AppError::Validation(format!(
                "Unknown job status '{other}' (expected open, in-progress, completed or cancelled)"
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum BudgetKind {
    Fixed,
    Hourly,
}

impl BudgetKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            BudgetKind::Fixed => "fixed",
            BudgetKind::Hourly => "hourly",
        }
    }
}

impl FromStr for BudgetKind {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "fixed" => Ok(BudgetKind::Fixed),
            "hourly" => Ok(BudgetKind::Hourly),
            other => Err(AppError::Validation(format!(
                "Unknown budget type '{other}' (expected fixed or hourly)"
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Budget {
    #[serde(rename = "type")]
    pub kind: BudgetKind,
    pub min: f64,
    pub max: f64,
}

impl Budget {
    /// True when `[min, max]` intersects the requested range.
    pub fn overlaps(&self, lower: Option<f64>, upper: Option<f64>) -> bool {
        lower.map_or(true, |l| self.max >= l) && upper.map_or(true, |u| self.min <= u)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Job {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub business_id: Uuid,
    pub skills: Vec<String>,
    pub budget: Budget,
    pub deadline: Option<DateTime<Utc>>,
    pub is_urgent: bool,
    pub status: JobStatus,
    pub hired_freelancer: Option<Uuid>,
    /// Proposal ids in submission order.
    pub proposals: Vec<Uuid>,
    pub version: i64,
    pub created_at: DateTime<Utc>,
}

impl Job {
    pub fn is_owned_by(&self, user_id: Uuid) -> bool {
        self.business_id == user_id
    }

    pub fn is_open(&self) -> bool {
        self.status == JobStatus::Open
    }
}

/// Flat row shape of the `jobs` table joined with its proposal ids.
#[derive(Debug, Clone, FromRow)]
pub struct JobRow {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub business_id: Uuid,
    pub skills: Vec<String>,
    pub budget_type: String,
    pub budget_min: f64,
    pub budget_max: f64,
    pub deadline: Option<DateTime<Utc>>,
    pub is_urgent: bool,
    pub status: String,
    pub hired_freelancer: Option<Uuid>,
    pub proposal_ids: Vec<Uuid>,
    pub version: i64,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<JobRow> for Job {
    type Error = AppError;

    fn try_from(row: JobRow) -> Result<Self, Self::Error> {
        let status = row.status.parse::<JobStatus>().map_err(|_| {
            AppError::Internal(anyhow::anyhow!(
                "job {} has corrupt status '{}'",
                row.id,
                row.status
            ))
        })?;
        let kind = row.budget_type.parse::<BudgetKind>().map_err(|_| {
            AppError::Internal(anyhow::anyhow!(
                "job {} has corrupt budget type '{}'",
                row.id,
                row.budget_type
            ))
        })?;

        Ok(Job {
            id: row.id,
            title: row.title,
            description: row.description,
            business_id: row.business_id,
            skills: row.skills,
            budget: Budget {
                kind,
                min: row.budget_min,
                max: row.budget_max,
            },
            deadline: row.deadline,
            is_urgent: row.is_urgent,
            status,
            hired_freelancer: row.hired_freelancer,
            proposals: row.proposal_ids,
            version: row.version,
            created_at: row.created_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_job_status_forward_only() {
        use JobStatus::*;
        assert!(Open.can_transition_to(InProgress));
        assert!(Open.can_transition_to(Cancelled));
        assert!(InProgress.can_transition_to(Completed));
        assert!(InProgress.can_transition_to(Cancelled));

        assert!(!Open.can_transition_to(Completed));
        assert!(!InProgress.can_transition_to(Open));
        assert!(!Completed.can_transition_to(Cancelled));
        assert!(!Cancelled.can_transition_to(Open));
        assert!(!Open.can_transition_to(Open));
    }

    #[test]
    fn test_job_status_wire_names() {
        assert_eq!(
            serde_json::to_string(&JobStatus::InProgress).unwrap(),
            "\"in-progress\""
        );
        assert_eq!("in-progress".parse::<JobStatus>().unwrap(), JobStatus::InProgress);
        assert!(matches!(
            "in_progress".parse::<JobStatus>(),
            Err(AppError::Validation(_))
        ));
    }

    #[test]
    fn test_budget_serializes_kind_as_type() {
        let budget = Budget {
            kind: BudgetKind::Hourly,
            min: 20.0,
            max: 40.0,
        };
        let value = serde_json::to_value(budget).unwrap();
        assert_eq!(value["type"], "hourly");
    }

    #[test]
    fn test_budget_overlap() {
        let budget = Budget {
            kind: BudgetKind::Fixed,
            min: 100.0,
            max: 500.0,
        };
        assert!(budget.overlaps(None, None));
        assert!(budget.overlaps(Some(400.0), None));
        assert!(!budget.overlaps(Some(600.0), None));
        assert!(budget.overlaps(None, Some(100.0)));
        assert!(!budget.overlaps(None, Some(50.0)));
    }

    #[test]
    fn test_row_with_unknown_status_is_internal_error() {
        let row = JobRow {
            id: Uuid::new_v4(),
            title: "t".into(),
            description: "d".into(),
            business_id: Uuid::new_v4(),
            skills: vec![],
            budget_type: "fixed".into(),
            budget_min: 1.0,
            budget_max: 2.0,
            deadline: None,
            is_urgent: false,
            status: "archived".into(),
            hired_freelancer: None,
            proposal_ids: vec![],
            version: 1,
            created_at: Utc::now(),
        };
        assert!(matches!(Job::try_from(row), Err(AppError::Internal(_))));
    }
}
