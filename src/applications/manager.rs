use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{QueryBuilder, Sqlite, SqlitePool};
use tracing::{info, warn};

use crate::database::models::*;
use crate::database::new_id;
use crate::error::MarketplaceError;
use crate::jobs::{JobBoard, JobListing, JobRow};
use crate::lenient;
use crate::notifications::NewNotification;
use crate::profiles::worker::{ProfileOwner, WorkerProfiles};

const WORKER_APPLICATIONS_LINK: &str = "/applications";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplyInput {
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub cover_letter: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_f64")]
    pub proposed_rate: Option<f64>,
}

/// An applicant as the hiring business sees them.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Applicant {
    #[serde(flatten)]
    pub profile: WorkerProfile,
    pub user: ProfileOwner,
    pub skills: Vec<WorkerSkill>,
    pub work_experiences: Vec<WorkExperience>,
    pub licenses: Vec<License>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplicationWithWorker {
    #[serde(flatten)]
    pub application: JobApplication,
    pub worker: Applicant,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplicationWithJob {
    #[serde(flatten)]
    pub application: JobApplication,
    pub job_post: JobListing,
}

/// Job fields needed to decide on an application.
#[derive(Debug, Clone, sqlx::FromRow)]
struct HiringContext {
    job_id: String,
    title: String,
    business_id: String,
    job_type: JobType,
    job_status: JobStatus,
    number_of_workers_needed: i64,
    budget_min: Option<f64>,
    start_date: Option<DateTime<Utc>>,
    end_date: Option<DateTime<Utc>>,
    company_name: String,
    business_user_id: String,
    worker_user_id: String,
    worker_first_name: String,
    worker_last_name: String,
}

pub struct ApplicationManager {
    pool: SqlitePool,
}

impl ApplicationManager {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn find(&self, application_id: &str) -> Result<Option<JobApplication>, MarketplaceError> {
        let application = sqlx::query_as::<_, JobApplication>("SELECT * FROM job_applications WHERE id = ?")
            .bind(application_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(application)
    }

    async fn require(&self, application_id: &str) -> Result<JobApplication, MarketplaceError> {
        self.find(application_id)
            .await?
            .ok_or_else(|| MarketplaceError::not_found("Application"))
    }

    /// Submit an application and notify the hiring business in the same
    /// transaction.
    pub async fn apply(
        &self,
        worker: &WorkerProfile,
        job_id: &str,
        input: ApplyInput,
    ) -> Result<JobApplication, MarketplaceError> {
        if input.proposed_rate.is_some_and(|rate| rate < 0.0) {
            return Err(MarketplaceError::ValidationError(
                "Proposed rate cannot be negative".to_string(),
            ));
        }

        let job = JobBoard::new(self.pool.clone()).require(job_id).await?;
        let now = Utc::now();
        if !job.is_open(now) {
            return Err(MarketplaceError::ValidationError(
                "This job is no longer accepting applications".to_string(),
            ));
        }

        let business_user_id: String =
            sqlx::query_scalar("SELECT user_id FROM business_profiles WHERE id = ?")
                .bind(&job.business_id)
                .fetch_one(&self.pool)
                .await?;

        let mut tx = self.pool.begin().await?;
        let inserted = sqlx::query_as::<_, JobApplication>(
            r#"
            INSERT INTO job_applications (id, job_post_id, worker_id, cover_letter, proposed_rate, status, applied_at)
            VALUES (?, ?, ?, ?, ?, 'PENDING', ?)
            RETURNING *
            "#,
        )
        .bind(new_id())
        .bind(job_id)
        .bind(&worker.id)
        .bind(&input.cover_letter)
        .bind(input.proposed_rate)
        .bind(now)
        .fetch_one(&mut *tx)
        .await;

        let application = match inserted {
            Ok(application) => application,
            Err(e) if MarketplaceError::is_unique_violation(&e) => {
                return Err(MarketplaceError::ValidationError(
                    "You have already applied to this job".to_string(),
                ))
            }
            Err(e) => return Err(e.into()),
        };

        NewNotification::new(
            business_user_id,
            NotificationType::JobApplication,
            "New Job Application",
            format!("{} applied to your job: {}", worker.full_name(), job.title),
        )
        .link(format!("/business/jobs/{}/applications", job_id))
        .insert(&mut *tx)
        .await?;

        tx.commit().await?;
        info!("Worker {} applied to job {}", worker.id, job_id);
        Ok(application)
    }

    /// Applications for a job owned by `business_id`, newest first.
    pub async fn list_for_job(
        &self,
        job_id: &str,
        business_id: &str,
    ) -> Result<Vec<ApplicationWithWorker>, MarketplaceError> {
        JobBoard::new(self.pool.clone()).require_owned(job_id, business_id).await?;

        let applications = sqlx::query_as::<_, JobApplication>(
            "SELECT * FROM job_applications WHERE job_post_id = ? ORDER BY applied_at DESC, rowid DESC",
        )
        .bind(job_id)
        .fetch_all(&self.pool)
        .await?;

        let profiles = WorkerProfiles::new(self.pool.clone());
        let mut result = Vec::with_capacity(applications.len());
        for application in applications {
            let worker = self.applicant(&profiles, &application.worker_id).await?;
            result.push(ApplicationWithWorker { application, worker });
        }
        Ok(result)
    }

    async fn applicant(&self, profiles: &WorkerProfiles, worker_id: &str) -> Result<Applicant, MarketplaceError> {
        let profile = profiles
            .find(worker_id)
            .await?
            .ok_or_else(MarketplaceError::worker_profile_missing)?;

        let user = sqlx::query_as::<_, ProfileOwner>("SELECT email, image, created_at FROM users WHERE id = ?")
            .bind(&profile.user_id)
            .fetch_one(&self.pool)
            .await?;

        let work_experiences = sqlx::query_as::<_, WorkExperience>(
            "SELECT * FROM work_experiences WHERE worker_id = ? ORDER BY start_date DESC LIMIT 3",
        )
        .bind(worker_id)
        .fetch_all(&self.pool)
        .await?;

        let licenses = sqlx::query_as::<_, License>("SELECT * FROM licenses WHERE worker_id = ? LIMIT 5")
            .bind(worker_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(Applicant {
            skills: profiles.skills(worker_id).await?,
            profile,
            user,
            work_experiences,
            licenses,
        })
    }

    /// The worker's own applications with job and business summaries.
    pub async fn list_for_worker(
        &self,
        worker_id: &str,
        status: Option<ApplicationStatus>,
    ) -> Result<Vec<ApplicationWithJob>, MarketplaceError> {
        let mut query: QueryBuilder<Sqlite> =
            QueryBuilder::new("SELECT * FROM job_applications WHERE worker_id = ");
        query.push_bind(worker_id.to_string());
        if let Some(status) = status {
            query.push(" AND status = ");
            query.push_bind(status);
        }
        query.push(" ORDER BY applied_at DESC, rowid DESC");
        let applications = query.build_query_as::<JobApplication>().fetch_all(&self.pool).await?;

        if applications.is_empty() {
            return Ok(Vec::new());
        }

        let mut jobs: QueryBuilder<Sqlite> = QueryBuilder::new(
            r#"
            SELECT j.*, (SELECT COUNT(*) FROM job_applications a WHERE a.job_post_id = j.id) AS application_count
            FROM job_posts j WHERE j.id IN (
            "#,
        );
        let mut separated = jobs.separated(", ");
        for application in &applications {
            separated.push_bind(application.job_post_id.clone());
        }
        separated.push_unseparated(")");
        let rows = jobs.build_query_as::<JobRow>().fetch_all(&self.pool).await?;

        let listings: HashMap<String, JobListing> = JobBoard::new(self.pool.clone())
            .listings(rows)
            .await?
            .into_iter()
            .map(|listing| (listing.job.id.clone(), listing))
            .collect();

        Ok(applications
            .into_iter()
            .filter_map(|application| {
                let job_post = listings.get(&application.job_post_id)?.clone();
                Some(ApplicationWithJob { application, job_post })
            })
            .collect())
    }

    async fn hiring_context(&self, application: &JobApplication) -> Result<HiringContext, MarketplaceError> {
        let context = sqlx::query_as::<_, HiringContext>(
            r#"
            SELECT j.id AS job_id, j.title, j.business_id, j.job_type, j.status AS job_status,
                   j.number_of_workers_needed,
                   j.budget_min, j.start_date, j.end_date,
                   b.company_name, b.user_id AS business_user_id,
                   w.user_id AS worker_user_id, w.first_name AS worker_first_name,
                   w.last_name AS worker_last_name
            FROM job_posts j
            JOIN business_profiles b ON b.id = j.business_id
            JOIN worker_profiles w ON w.id = ?
            WHERE j.id = ?
            "#,
        )
        .bind(&application.worker_id)
        .bind(&application.job_post_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(context)
    }

    /// Move an application through the review pipeline on behalf of the
    /// business that owns the job. Accepting creates the contract and
    /// closes the job once every position is filled.
    pub async fn update_status(
        &self,
        application_id: &str,
        business_id: &str,
        next: ApplicationStatus,
    ) -> Result<JobApplication, MarketplaceError> {
        let application = self.require(application_id).await?;
        let context = self.hiring_context(&application).await?;

        if context.business_id != business_id {
            return Err(MarketplaceError::forbidden());
        }
        if !application.status.can_transition_to(next) {
            return Err(MarketplaceError::ConflictError(format!(
                "Cannot change application status from {:?} to {:?}",
                application.status, next
            )));
        }
        if next == ApplicationStatus::Accepted
            && !matches!(context.job_status, JobStatus::Active | JobStatus::Closed)
        {
            return Err(MarketplaceError::ConflictError(format!(
                "Cannot hire for a job that is {:?}",
                context.job_status
            )));
        }

        let now = Utc::now();
        let mut tx = self.pool.begin().await?;

        let updated = sqlx::query_as::<_, JobApplication>(
            "UPDATE job_applications SET status = ?, reviewed_at = ? WHERE id = ? AND status = ? RETURNING *",
        )
        .bind(next)
        .bind(now)
        .bind(application_id)
        .bind(application.status)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| {
            MarketplaceError::ConflictError("Application status changed, reload and try again".to_string())
        })?;

        if next == ApplicationStatus::Accepted {
            let accepted: i64 = sqlx::query_scalar(
                "SELECT COUNT(*) FROM job_applications WHERE job_post_id = ? AND status = 'ACCEPTED'",
            )
            .bind(&context.job_id)
            .fetch_one(&mut *tx)
            .await?;

            if accepted > context.number_of_workers_needed {
                warn!("Job {} is already fully staffed", context.job_id);
                return Err(MarketplaceError::ConflictError(
                    "All positions for this job have been filled".to_string(),
                ));
            }

            let contract_type = match context.job_type {
                JobType::Bulk => ContractType::BulkMember,
                JobType::Individual => ContractType::Individual,
            };
            let agreed_rate = application
                .proposed_rate
                .or(context.budget_min)
                .unwrap_or(0.0);

            sqlx::query(
                r#"
                INSERT INTO contracts (id, application_id, job_post_id, worker_id, business_id,
                    contract_type, status, start_date, end_date, agreed_rate, created_at, updated_at)
                VALUES (?, ?, ?, ?, ?, ?, 'ACTIVE', ?, ?, ?, ?, ?)
                "#,
            )
            .bind(new_id())
            .bind(application_id)
            .bind(&context.job_id)
            .bind(&application.worker_id)
            .bind(business_id)
            .bind(contract_type)
            .bind(context.start_date.unwrap_or(now))
            .bind(context.end_date)
            .bind(agreed_rate)
            .bind(now)
            .bind(now)
            .execute(&mut *tx)
            .await?;

            if accepted >= context.number_of_workers_needed {
                sqlx::query("UPDATE job_posts SET status = 'CLOSED', updated_at = ? WHERE id = ? AND status = 'ACTIVE'")
                    .bind(now)
                    .bind(&context.job_id)
                    .execute(&mut *tx)
                    .await?;
                info!("Job {} filled and closed", context.job_id);
            }
        }

        status_notification(&context, next).insert(&mut *tx).await?;
        tx.commit().await?;

        info!(
            "Application {} moved {:?} -> {:?}",
            application_id, application.status, next
        );
        Ok(updated)
    }

    /// Worker pulls their own application before a decision is made.
    pub async fn withdraw(
        &self,
        application_id: &str,
        worker_id: &str,
    ) -> Result<JobApplication, MarketplaceError> {
        let application = self.require(application_id).await?;
        if application.worker_id != worker_id {
            return Err(MarketplaceError::forbidden());
        }
        if !application.status.is_withdrawable() {
            return Err(MarketplaceError::ConflictError(
                "This application can no longer be withdrawn".to_string(),
            ));
        }

        let context = self.hiring_context(&application).await?;
        let mut tx = self.pool.begin().await?;

        let updated = sqlx::query_as::<_, JobApplication>(
            "UPDATE job_applications SET status = 'WITHDRAWN' WHERE id = ? AND status = ? RETURNING *",
        )
        .bind(application_id)
        .bind(application.status)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| {
            MarketplaceError::ConflictError("Application status changed, reload and try again".to_string())
        })?;

        NewNotification::new(
            &context.business_user_id,
            NotificationType::JobApplication,
            "Application Withdrawn",
            format!(
                "{} {} withdrew their application for {}",
                context.worker_first_name, context.worker_last_name, context.title
            ),
        )
        .link(format!("/business/jobs/{}/applications", context.job_id))
        .insert(&mut *tx)
        .await?;

        tx.commit().await?;
        info!("Application {} withdrawn by worker {}", application_id, worker_id);
        Ok(updated)
    }
}

fn status_notification(context: &HiringContext, status: ApplicationStatus) -> NewNotification {
    let (kind, title, message) = match status {
        ApplicationStatus::Shortlisted => (
            NotificationType::JobApplication,
            "Application Shortlisted",
            format!(
                "Great news! Your application for {} has been shortlisted by {}.",
                context.title, context.company_name
            ),
        ),
        ApplicationStatus::Accepted => (
            NotificationType::JobAccepted,
            "Application Accepted",
            format!(
                "Congratulations! Your application for {} has been accepted by {}.",
                context.title, context.company_name
            ),
        ),
        ApplicationStatus::Rejected => (
            NotificationType::JobRejected,
            "Application Update",
            format!(
                "Your application for {} at {} was not selected at this time.",
                context.title, context.company_name
            ),
        ),
        _ => (
            NotificationType::JobApplication,
            "Application Update",
            format!("Your application for {} has been updated.", context.title),
        ),
    };

    NewNotification::new(&context.worker_user_id, kind, title, message).link(WORKER_APPLICATIONS_LINK)
}
