use std::collections::HashMap;

use chrono::Utc;
use sqlx::types::Json;
use sqlx::{QueryBuilder, Sqlite, SqlitePool};
use tracing::info;

use super::search::{JobSearch, DEFAULT_PAGE_SIZE};
use super::{BusinessDetails, JobDetail, JobInput, JobListing, JobPage, JobRow};
use crate::catalog::SkillCatalog;
use crate::database::models::*;
use crate::database::new_id;
use crate::error::MarketplaceError;

const JOB_WITH_COUNT: &str = r#"
    SELECT j.*, (SELECT COUNT(*) FROM job_applications a WHERE a.job_post_id = j.id) AS application_count
    FROM job_posts j
"#;

pub struct JobBoard {
    pool: SqlitePool,
}

impl JobBoard {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn find(&self, job_id: &str) -> Result<Option<JobPost>, MarketplaceError> {
        let job = sqlx::query_as::<_, JobPost>("SELECT * FROM job_posts WHERE id = ?")
            .bind(job_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(job)
    }

    pub async fn require(&self, job_id: &str) -> Result<JobPost, MarketplaceError> {
        self.find(job_id)
            .await?
            .ok_or_else(|| MarketplaceError::not_found("Job"))
    }

    /// Load a job and make sure `business_id` owns it.
    pub async fn require_owned(&self, job_id: &str, business_id: &str) -> Result<JobPost, MarketplaceError> {
        let job = self.require(job_id).await?;
        if job.business_id != business_id {
            return Err(MarketplaceError::forbidden());
        }
        Ok(job)
    }

    pub async fn create(&self, business_id: &str, input: JobInput) -> Result<JobPost, MarketplaceError> {
        let valid = input.validate()?;
        let now = Utc::now();
        let (status, published_at) = if input.publish {
            (JobStatus::Active, Some(now))
        } else {
            (JobStatus::Draft, None)
        };

        let job = sqlx::query_as::<_, JobPost>(
            r#"
            INSERT INTO job_posts (id, business_id, title, description, required_skills, job_type,
                number_of_workers_needed, budget_min, budget_max, payment_type, location_type,
                job_location_city, job_location_state, start_date, end_date, duration_days,
                status, urgency, published_at, expires_at, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            RETURNING *
            "#,
        )
        .bind(new_id())
        .bind(business_id)
        .bind(input.title.trim())
        .bind(input.description.trim())
        .bind(Json(&input.required_skills))
        .bind(valid.job_type)
        .bind(valid.workers_needed)
        .bind(input.budget_min)
        .bind(input.budget_max)
        .bind(valid.payment_type)
        .bind(valid.location_type)
        .bind(&input.job_location_city)
        .bind(&input.job_location_state)
        .bind(input.start_date)
        .bind(input.end_date)
        .bind(input.duration_days)
        .bind(status)
        .bind(input.urgency.unwrap_or(Urgency::Medium))
        .bind(published_at)
        .bind(input.expires_at)
        .bind(now)
        .bind(now)
        .fetch_one(&self.pool)
        .await?;

        info!("Job {} created by business {} ({:?})", job.id, business_id, job.status);
        Ok(job)
    }

    /// Replace every editable field. `published_at` is stamped the first
    /// time the job becomes active and never cleared.
    pub async fn update(
        &self,
        job_id: &str,
        business_id: &str,
        input: JobInput,
    ) -> Result<JobPost, MarketplaceError> {
        let existing = self.require_owned(job_id, business_id).await?;
        let valid = input.validate()?;
        let now = Utc::now();

        let status = match (input.status, input.publish) {
            (Some(status), _) => status,
            (None, true) => JobStatus::Active,
            (None, false) => existing.status,
        };
        let published_at = match existing.published_at {
            Some(at) => Some(at),
            None if status == JobStatus::Active => Some(now),
            None => None,
        };

        let job = sqlx::query_as::<_, JobPost>(
            r#"
            UPDATE job_posts SET
                title = ?, description = ?, required_skills = ?, job_type = ?,
                number_of_workers_needed = ?, budget_min = ?, budget_max = ?, payment_type = ?,
                location_type = ?, job_location_city = ?, job_location_state = ?, start_date = ?,
                end_date = ?, duration_days = ?, status = ?, urgency = ?, published_at = ?,
                expires_at = ?, updated_at = ?
            WHERE id = ?
            RETURNING *
            "#,
        )
        .bind(input.title.trim())
        .bind(input.description.trim())
        .bind(Json(&input.required_skills))
        .bind(valid.job_type)
        .bind(valid.workers_needed)
        .bind(input.budget_min)
        .bind(input.budget_max)
        .bind(valid.payment_type)
        .bind(valid.location_type)
        .bind(&input.job_location_city)
        .bind(&input.job_location_state)
        .bind(input.start_date)
        .bind(input.end_date)
        .bind(input.duration_days)
        .bind(status)
        .bind(input.urgency.unwrap_or(existing.urgency))
        .bind(published_at)
        .bind(input.expires_at)
        .bind(now)
        .bind(job_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(job)
    }

    /// Applications and saves go with the job; contracts keep it alive.
    pub async fn delete(&self, job_id: &str, business_id: &str) -> Result<(), MarketplaceError> {
        self.require_owned(job_id, business_id).await?;

        let contracts: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM contracts WHERE job_post_id = ?")
            .bind(job_id)
            .fetch_one(&self.pool)
            .await?;
        if contracts > 0 {
            return Err(MarketplaceError::ConflictError(
                "Cannot delete a job that has contracts".to_string(),
            ));
        }

        sqlx::query("DELETE FROM job_posts WHERE id = ?")
            .bind(job_id)
            .execute(&self.pool)
            .await?;

        info!("Job {} deleted by business {}", job_id, business_id);
        Ok(())
    }

    pub async fn search(&self, search: &JobSearch) -> Result<JobPage, MarketplaceError> {
        let (page, limit) = Pagination::window(search.page, search.limit, DEFAULT_PAGE_SIZE);
        let now = Utc::now();

        let mut count: QueryBuilder<Sqlite> = QueryBuilder::new("SELECT COUNT(*) FROM job_posts j");
        search.push_filters(&mut count, now);
        let total: i64 = count.build_query_scalar().fetch_one(&self.pool).await?;
        let pagination = Pagination::new(page, limit, total);

        let mut query: QueryBuilder<Sqlite> = QueryBuilder::new(JOB_WITH_COUNT);
        search.push_filters(&mut query, now);
        search.push_order(&mut query);
        query.push(" LIMIT ");
        query.push_bind(limit);
        query.push(" OFFSET ");
        query.push_bind(pagination.offset());

        let rows = query.build_query_as::<JobRow>().fetch_all(&self.pool).await?;
        let jobs = self.listings(rows).await?;

        Ok(JobPage { jobs, pagination })
    }

    /// Attach business summaries and resolved skills to job rows.
    pub(crate) async fn listings(&self, rows: Vec<JobRow>) -> Result<Vec<JobListing>, MarketplaceError> {
        if rows.is_empty() {
            return Ok(Vec::new());
        }

        let skills = SkillCatalog::new(self.pool.clone())
            .resolve(rows.iter().flat_map(|row| row.job.required_skills.0.iter()))
            .await?;
        let businesses = self
            .business_summaries(rows.iter().map(|row| row.job.business_id.as_str()))
            .await?;

        Ok(rows
            .into_iter()
            .map(|row| JobListing {
                required_skills_data: SkillCatalog::ordered(&row.job.required_skills.0, &skills),
                business: businesses.get(&row.job.business_id).cloned(),
                application_count: row.application_count,
                job: row.job,
            })
            .collect())
    }

    async fn business_summaries<'a, I>(&self, ids: I) -> Result<HashMap<String, BusinessSummary>, MarketplaceError>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut ids: Vec<&str> = ids.into_iter().collect();
        ids.sort_unstable();
        ids.dedup();

        let mut query: QueryBuilder<Sqlite> = QueryBuilder::new(
            r#"
            SELECT id, company_name, logo_url, location_city, location_state, verification_status
            FROM business_profiles WHERE id IN (
            "#,
        );
        let mut separated = query.separated(", ");
        for id in ids {
            separated.push_bind(id.to_string());
        }
        separated.push_unseparated(")");

        let summaries = query.build_query_as::<BusinessSummary>().fetch_all(&self.pool).await?;
        Ok(summaries.into_iter().map(|b| (b.id.clone(), b)).collect())
    }

    /// Job details for anyone; `viewer` is the caller's worker profile id.
    pub async fn get(&self, job_id: &str, viewer: Option<&str>) -> Result<JobDetail, MarketplaceError> {
        let row = sqlx::query_as::<_, JobRow>(&format!("{} WHERE j.id = ?", JOB_WITH_COUNT))
            .bind(job_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| MarketplaceError::not_found("Job"))?;

        let business = sqlx::query_as::<_, BusinessDetails>(
            r#"
            SELECT id, company_name, logo_url, description, location_city, location_state,
                   location_country, industry, company_size, website, verification_status
            FROM business_profiles WHERE id = ?
            "#,
        )
        .bind(&row.job.business_id)
        .fetch_one(&self.pool)
        .await?;

        let skills = SkillCatalog::new(self.pool.clone())
            .resolve(row.job.required_skills.0.iter())
            .await?;

        let (application, is_saved) = match viewer {
            Some(worker_id) => {
                let application = sqlx::query_as::<_, JobApplication>(
                    "SELECT * FROM job_applications WHERE job_post_id = ? AND worker_id = ?",
                )
                .bind(job_id)
                .bind(worker_id)
                .fetch_optional(&self.pool)
                .await?;

                let saved: Option<String> = sqlx::query_scalar(
                    "SELECT id FROM saved_jobs WHERE job_post_id = ? AND worker_id = ?",
                )
                .bind(job_id)
                .bind(worker_id)
                .fetch_optional(&self.pool)
                .await?;

                (application, saved.is_some())
            }
            None => (None, false),
        };

        Ok(JobDetail {
            required_skills_data: SkillCatalog::ordered(&row.job.required_skills.0, &skills),
            business,
            application_count: row.application_count,
            has_applied: application.is_some(),
            is_saved,
            application,
            job: row.job,
        })
    }

    /// The business's own jobs, newest first.
    pub async fn list_for_business(
        &self,
        business_id: &str,
        status: Option<JobStatus>,
    ) -> Result<Vec<JobRow>, MarketplaceError> {
        let mut query: QueryBuilder<Sqlite> = QueryBuilder::new(JOB_WITH_COUNT);
        query.push(" WHERE j.business_id = ");
        query.push_bind(business_id.to_string());
        if let Some(status) = status {
            query.push(" AND j.status = ");
            query.push_bind(status);
        }
        query.push(" ORDER BY j.created_at DESC, j.rowid DESC");

        let rows = query.build_query_as::<JobRow>().fetch_all(&self.pool).await?;
        Ok(rows)
    }
}
