use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer};

use crate::errors::AppError;
use crate::models::job::Budget;
use crate::models::proposal::EstimatedDuration;

const MAX_TITLE_LEN: usize = 200;
const MAX_SKILLS: usize = 30;

/// Fields a business supplies when posting a job.
#[derive(Debug, Clone, Deserialize)]
pub struct NewJob {
    pub title: String,
    pub description: String,
    pub skills: Vec<String>,
    pub budget: Budget,
    pub deadline: Option<DateTime<Utc>>,
    #[serde(default)]
    pub is_urgent: bool,
}

/// Partial edit of an open job. Absent fields are left unchanged.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct JobPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub skills: Option<Vec<String>>,
    pub budget: Option<Budget>,
    /// `Some(None)` when the body sends `"deadline": null`, which clears it.
    #[serde(default, deserialize_with = "present")]
    pub deadline: Option<Option<DateTime<Utc>>>,
    pub is_urgent: Option<bool>,
}

/// Marks a field as present even when its value is `null`.
fn present<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProposalDraft {
    pub cover_letter: String,
    pub bid_amount: f64,
    pub estimated_duration: EstimatedDuration,
}

/// Trims, lowercases and de-duplicates skills, keeping first-seen order.
pub fn normalize_skills(skills: &[String]) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(skills.len());
    for skill in skills {
        let skill = skill.trim().to_lowercase();
        if !skill.is_empty() && !out.contains(&skill) {
            out.push(skill);
        }
    }
    out
}

/// Collects every problem with a job's content fields at once.
pub fn check_job_fields(
    title: &str,
    description: &str,
    skills: &[String],
    budget: &Budget,
) -> Vec<String> {
    let mut problems = Vec::new();

    if title.trim().is_empty() {
        problems.push("Title is required".to_string());
    } else if title.trim().chars().count() > MAX_TITLE_LEN {
        problems.push(format!("Title must be at most {MAX_TITLE_LEN} characters"));
    }
    if description.trim().is_empty() {
        problems.push("Description is required".to_string());
    }
    if skills.is_empty() {
        problems.push("At least one skill is required".to_string());
    } else if skills.len() > MAX_SKILLS {
        problems.push(format!("At most {MAX_SKILLS} skills are allowed"));
    }
    if !budget.min.is_finite() || !budget.max.is_finite() {
        problems.push("Budget bounds must be numbers".to_string());
    } else {
        if budget.min < 0.0 {
            problems.push("Minimum budget cannot be negative".to_string());
        }
        if budget.max <= 0.0 {
            problems.push("Maximum budget must be greater than zero".to_string());
        }
        if budget.min > budget.max {
            problems.push("Minimum budget cannot exceed maximum budget".to_string());
        }
    }

    problems
}

/// Validates and normalizes a new job posting.
pub fn validate_new_job(input: NewJob, now: DateTime<Utc>) -> Result<NewJob, AppError> {
    let skills = normalize_skills(&input.skills);
    let mut problems = check_job_fields(&input.title, &input.description, &skills, &input.budget);
    if let Some(deadline) = input.deadline {
        if deadline <= now {
            problems.push("Deadline must be in the future".to_string());
        }
    }
    into_result(problems)?;

    Ok(NewJob {
        title: input.title.trim().to_string(),
        description: input.description.trim().to_string(),
        skills,
        ..input
    })
}

pub fn validate_draft(draft: &ProposalDraft) -> Result<(), AppError> {
    let mut problems = Vec::new();

    if draft.cover_letter.trim().is_empty() {
        problems.push("Cover letter is required".to_string());
    }
    if !draft.bid_amount.is_finite() || draft.bid_amount <= 0.0 {
        problems.push("Bid amount must be greater than zero".to_string());
    }
    let duration = draft.estimated_duration.value;
    if !duration.is_finite() || duration <= 0.0 {
        problems.push("Estimated duration must be greater than zero".to_string());
    }

    into_result(problems)
}

pub fn into_result(problems: Vec<String>) -> Result<(), AppError> {
    if problems.is_empty() {
        Ok(())
    } else {
        Err(AppError::Validation(problems.join("; ")))
    }
}
