use std::cmp::Ordering;
use std::str::FromStr;

use crate::errors::AppError;
use crate::models::job::{Job, JobStatus};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum JobSort {
    #[default]
    Newest,
    Oldest,
    BudgetHigh,
    BudgetLow,
}

impl FromStr for JobSort {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "newest" => Ok(JobSort::Newest),
            "oldest" => Ok(JobSort::Oldest),
            "budget_high" => Ok(JobSort::BudgetHigh),
            "budget_low" => Ok(JobSort::BudgetLow),
            other => Err(AppError::Validation(format!(
                "Unknown sort '{other}' (expected newest, oldest, budget_high or budget_low)"
            ))),
        }
    }
}

impl JobSort {
    pub fn compare(self, a: &Job, b: &Job) -> Ordering {
        let newest_first = b.created_at.cmp(&a.created_at);
        match self {
            JobSort::Newest => newest_first,
            JobSort::Oldest => a.created_at.cmp(&b.created_at),
            JobSort::BudgetHigh => b
                .budget
                .max
                .total_cmp(&a.budget.max)
                .then(newest_first),
            JobSort::BudgetLow => a
                .budget
                .min
                .total_cmp(&b.budget.min)
                .then(newest_first),
        }
    }
}

/// Public job search. `search` and `skills` are expected lowercase.
#[derive(Debug, Clone, Default)]
pub struct JobFilter {
    /// `None` lists every status.
    pub status: Option<JobStatus>,
    pub search: Option<String>,
    pub skills: Vec<String>,
    pub budget_min: Option<f64>,
    pub budget_max: Option<f64>,
    pub sort: JobSort,
}

impl JobFilter {
    pub fn open() -> Self {
        Self {
            status: Some(JobStatus::Open),
            ..Self::default()
        }
    }

    pub fn matches(&self, job: &Job) -> bool {
        if let Some(status) = self.status {
            if job.status != status {
                return false;
            }
        }

        if let Some(term) = &self.search {
            let hit = job.title.to_lowercase().contains(term)
                || job.description.to_lowercase().contains(term)
                || job.skills.iter().any(|s| s.contains(term.as_str()));
            if !hit {
                return false;
            }
        }

        if !self.skills.is_empty() && !job.skills.iter().any(|s| self.skills.contains(s)) {
            return false;
        }

        job.budget.overlaps(self.budget_min, self.budget_max)
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};
    use uuid::Uuid;

    use super::*;
    use crate::models::job::{Budget, BudgetKind};

    fn job(title: &str, skills: &[&str], min: f64, max: f64) -> Job {
        Job {
            id: Uuid::new_v4(),
            title: title.to_string(),
            description: format!("{title} description"),
            business_id: Uuid::new_v4(),
            skills: skills.iter().map(|s| s.to_string()).collect(),
            budget: Budget {
                kind: BudgetKind::Fixed,
                min,
                max,
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

    #[test]
    fn test_default_open_filter_skips_other_statuses() {
        let mut j = job("Rust API", &["rust"], 100.0, 200.0);
        assert!(JobFilter::open().matches(&j));
        j.status = JobStatus::Cancelled;
        assert!(!JobFilter::open().matches(&j));
        assert!(JobFilter::default().matches(&j));
    }

    #[test]
    fn test_search_is_case_insensitive_over_title_and_skills() {
        let j = job("Build a Rust API", &["postgres"], 100.0, 200.0);
        let by_title = JobFilter {
            search: Some("rust api".into()),
            ..JobFilter::open()
        };
        let by_skill = JobFilter {
            search: Some("postg".into()),
            ..JobFilter::open()
        };
        let miss = JobFilter {
            search: Some("kotlin".into()),
            ..JobFilter::open()
        };
        assert!(by_title.matches(&j));
        assert!(by_skill.matches(&j));
        assert!(!miss.matches(&j));
    }

    #[test]
    fn test_skills_match_any() {
        let j = job("API", &["rust", "sql"], 100.0, 200.0);
        let any = JobFilter {
            skills: vec!["go".into(), "sql".into()],
            ..JobFilter::open()
        };
        let none = JobFilter {
            skills: vec!["go".into()],
            ..JobFilter::open()
        };
        assert!(any.matches(&j));
        assert!(!none.matches(&j));
    }

    #[test]
    fn test_budget_bounds() {
        let j = job("API", &[], 100.0, 200.0);
        let too_rich = JobFilter {
            budget_min: Some(250.0),
            ..JobFilter::open()
        };
        let in_range = JobFilter {
            budget_min: Some(150.0),
            budget_max: Some(300.0),
            ..JobFilter::open()
        };
        assert!(!too_rich.matches(&j));
        assert!(in_range.matches(&j));
    }

    #[test]
    fn test_sort_orders() {
        let mut old = job("old", &[], 10.0, 1000.0);
        old.created_at = Utc::now() - Duration::days(3);
        let new = job("new", &[], 50.0, 60.0);

        let mut jobs = vec![old.clone(), new.clone()];
        jobs.sort_by(|a, b| JobSort::Newest.compare(a, b));
        assert_eq!(jobs[0].title, "new");

        jobs.sort_by(|a, b| JobSort::Oldest.compare(a, b));
        assert_eq!(jobs[0].title, "old");

        jobs.sort_by(|a, b| JobSort::BudgetHigh.compare(a, b));
        assert_eq!(jobs[0].title, "old");

        jobs.sort_by(|a, b| JobSort::BudgetLow.compare(a, b));
        assert_eq!(jobs[0].title, "old");
    }

    #[test]
    fn test_sort_parse() {
        assert_eq!("budget_high".parse::<JobSort>().unwrap(), JobSort::BudgetHigh);
        assert!("-createdAt".parse::<JobSort>().is_err());
    }
}
