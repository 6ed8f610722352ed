//! Job board: postings, public search and saved jobs

pub mod board;
pub mod saved;
pub mod search;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::database::models::*;
use crate::error::MarketplaceError;
use crate::lenient;

pub use board::JobBoard;
pub use saved::SavedJobs;
pub use search::{JobSearch, JobSort};

/// Body of `POST /api/jobs` and `PUT /api/jobs/:id`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobInput {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub required_skills: Vec<String>,
    pub job_type: Option<JobType>,
    #[serde(default, deserialize_with = "lenient::opt_i64")]
    pub number_of_workers_needed: Option<i64>,
    #[serde(default, deserialize_with = "lenient::opt_f64")]
    pub budget_min: Option<f64>,
    #[serde(default, deserialize_with = "lenient::opt_f64")]
    pub budget_max: Option<f64>,
    pub payment_type: Option<PaymentType>,
    pub location_type: Option<LocationType>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub job_location_city: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub job_location_state: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_datetime")]
    pub start_date: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "lenient::opt_datetime")]
    pub end_date: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "lenient::opt_i64")]
    pub duration_days: Option<i64>,
    pub urgency: Option<Urgency>,
    #[serde(default, deserialize_with = "lenient::opt_datetime")]
    pub expires_at: Option<DateTime<Utc>>,
    /// Create only: publish immediately instead of saving a draft.
    #[serde(default)]
    pub publish: bool,
    /// Update only.
    pub status: Option<JobStatus>,
}

/// Validated posting fields shared by create and update.
#[derive(Debug, Clone)]
pub(crate) struct ValidJob {
    pub job_type: JobType,
    pub payment_type: PaymentType,
    pub location_type: LocationType,
    pub workers_needed: i64,
}

impl JobInput {
    pub(crate) fn validate(&self) -> Result<ValidJob, MarketplaceError> {
        if self.title.trim().is_empty() || self.description.trim().is_empty() {
            return Err(MarketplaceError::ValidationError(
                "Title and description are required".to_string(),
            ));
        }

        let (job_type, payment_type, location_type) =
            match (self.job_type, self.payment_type, self.location_type) {
                (Some(j), Some(p), Some(l)) => (j, p, l),
                _ => {
                    return Err(MarketplaceError::ValidationError(
                        "Job type, payment type and location type are required".to_string(),
                    ))
                }
            };

        let workers_needed = self.number_of_workers_needed.unwrap_or(1);
        if workers_needed < 1 {
            return Err(MarketplaceError::ValidationError(
                "Number of workers needed must be at least 1".to_string(),
            ));
        }

        if let (Some(min), Some(max)) = (self.budget_min, self.budget_max) {
            if min > max {
                return Err(MarketplaceError::ValidationError(
                    "Minimum budget cannot exceed maximum budget".to_string(),
                ));
            }
        }
        if self.budget_min.is_some_and(|b| b < 0.0) || self.budget_max.is_some_and(|b| b < 0.0) {
            return Err(MarketplaceError::ValidationError(
                "Budget cannot be negative".to_string(),
            ));
        }

        Ok(ValidJob {
            job_type,
            payment_type,
            location_type,
            workers_needed,
        })
    }
}

/// A job row together with its application count.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct JobRow {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub job: JobPost,
    pub application_count: i64,
}

/// A job as shown in search results and saved-job lists.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobListing {
    #[serde(flatten)]
    pub job: JobPost,
    pub business: Option<BusinessSummary>,
    pub application_count: i64,
    pub required_skills_data: Vec<Skill>,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct BusinessDetails {
    pub id: String,
    pub company_name: String,
    pub logo_url: Option<String>,
    pub description: Option<String>,
    pub location_city: Option<String>,
    pub location_state: Option<String>,
    pub location_country: Option<String>,
    pub industry: Option<String>,
    pub company_size: Option<String>,
    pub website: Option<String>,
    pub verification_status: VerificationStatus,
}

/// `GET /api/jobs/:id`; the viewer fields are only populated for workers.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobDetail {
    #[serde(flatten)]
    pub job: JobPost,
    pub business: BusinessDetails,
    pub application_count: i64,
    pub required_skills_data: Vec<Skill>,
    pub has_applied: bool,
    pub is_saved: bool,
    pub application: Option<JobApplication>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobPage {
    pub jobs: Vec<JobListing>,
    pub pagination: Pagination,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_input() -> JobInput {
        JobInput {
            title: "Pipe fitter".to_string(),
            description: "Fit pipes".to_string(),
            job_type: Some(JobType::Individual),
            payment_type: Some(PaymentType::Hourly),
            location_type: Some(LocationType::OnSite),
            ..Default::default()
        }
    }

    #[test]
    fn test_defaults_to_one_worker() {
        let valid = valid_input().validate().unwrap();
        assert_eq!(valid.workers_needed, 1);
    }

    #[test]
    fn test_rejects_inverted_budget() {
        let input = JobInput {
            budget_min: Some(500.0),
            budget_max: Some(100.0),
            ..valid_input()
        };
        assert!(matches!(input.validate(), Err(MarketplaceError::ValidationError(_))));
    }

    #[test]
    fn test_requires_enums() {
        let input = JobInput {
            payment_type: None,
            ..valid_input()
        };
        assert!(input.validate().is_err());
    }

    #[test]
    fn test_accepts_string_budgets() {
        let input: JobInput = serde_json::from_str(
            r#"{"title":"t","description":"d","jobType":"BULK","paymentType":"DAILY",
                "locationType":"REMOTE","budgetMin":"100","budgetMax":"","numberOfWorkersNeeded":"4"}"#,
        )
        .unwrap();
        assert_eq!(input.budget_min, Some(100.0));
        assert_eq!(input.budget_max, None);
        assert_eq!(input.validate().unwrap().workers_needed, 4);
    }
}
