//! Business profiles and the business dashboard

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use tracing::info;

use crate::database::models::{ApplicationStatus, BusinessProfile, JobStatus};
use crate::database::new_id;
use crate::error::MarketplaceError;
use crate::lenient;

pub const DEFAULT_COUNTRY: &str = "USA";
const RECENT_LIMIT: i64 = 5;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BusinessOnboarding {
    #[serde(default)]
    pub company_name: String,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub company_registration_number: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub phone: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub industry: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub company_size: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub website: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub logo_url: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub description: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub location_city: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub location_state: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub location_country: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub total_jobs: i64,
    pub active_jobs: i64,
    pub total_applications: i64,
    pub pending_applications: i64,
    pub total_contracts: i64,
    pub active_contracts: i64,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct RecentJob {
    pub id: String,
    pub title: String,
    pub status: JobStatus,
    pub published_at: Option<DateTime<Utc>>,
    pub application_count: i64,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct RecentApplication {
    pub id: String,
    pub status: ApplicationStatus,
    pub applied_at: DateTime<Utc>,
    pub worker_first_name: String,
    pub worker_last_name: String,
    pub job_post_id: String,
    pub job_title: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BusinessDashboard {
    pub stats: DashboardStats,
    pub recent_jobs: Vec<RecentJob>,
    pub recent_applications: Vec<RecentApplication>,
}

pub struct BusinessProfiles {
    pool: SqlitePool,
}

impl BusinessProfiles {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn find_by_user(&self, user_id: &str) -> Result<Option<BusinessProfile>, MarketplaceError> {
        let profile = sqlx::query_as::<_, BusinessProfile>("SELECT * FROM business_profiles WHERE user_id = ?")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(profile)
    }

    pub async fn require_by_user(&self, user_id: &str) -> Result<BusinessProfile, MarketplaceError> {
        self.find_by_user(user_id)
            .await?
            .ok_or_else(MarketplaceError::business_profile_missing)
    }

    pub async fn onboard(
        &self,
        user_id: &str,
        input: BusinessOnboarding,
    ) -> Result<BusinessProfile, MarketplaceError> {
        let company_name = input.company_name.trim();
        if company_name.is_empty() {
            return Err(MarketplaceError::ValidationError(
                "Company name is required".to_string(),
            ));
        }

        let country = input
            .location_country
            .clone()
            .unwrap_or_else(|| DEFAULT_COUNTRY.to_string());
        let now = Utc::now();
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO business_profiles (id, user_id, company_name, company_registration_number,
                phone, industry, company_size, website, logo_url, description, location_city,
                location_state, location_country, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT (user_id) DO UPDATE SET
                company_name = excluded.company_name,
                company_registration_number = excluded.company_registration_number,
                phone = excluded.phone,
                industry = excluded.industry,
                company_size = excluded.company_size,
                website = excluded.website,
                logo_url = excluded.logo_url,
                description = excluded.description,
                location_city = excluded.location_city,
                location_state = excluded.location_state,
                location_country = excluded.location_country,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(new_id())
        .bind(user_id)
        .bind(company_name)
        .bind(&input.company_registration_number)
        .bind(&input.phone)
        .bind(&input.industry)
        .bind(&input.company_size)
        .bind(&input.website)
        .bind(&input.logo_url)
        .bind(&input.description)
        .bind(&input.location_city)
        .bind(&input.location_state)
        .bind(&country)
        .bind(now)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            "UPDATE users SET user_type = 'BUSINESS', onboarding_completed = TRUE, name = ?, updated_at = ? WHERE id = ?",
        )
        .bind(company_name)
        .bind(now)
        .bind(user_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        info!("Business onboarding completed for user {}", user_id);

        self.require_by_user(user_id).await
    }

    pub async fn dashboard(&self, business_id: &str) -> Result<BusinessDashboard, MarketplaceError> {
        let (total_jobs, active_jobs): (i64, i64) = sqlx::query_as(
            r#"
            SELECT COUNT(*), COALESCE(SUM(status = 'ACTIVE'), 0)
            FROM job_posts WHERE business_id = ?
            "#,
        )
        .bind(business_id)
        .fetch_one(&self.pool)
        .await?;

        let (total_applications, pending_applications): (i64, i64) = sqlx::query_as(
            r#"
            SELECT COUNT(*), COALESCE(SUM(a.status = 'PENDING'), 0)
            FROM job_applications a
            JOIN job_posts j ON j.id = a.job_post_id
            WHERE j.business_id = ?
            "#,
        )
        .bind(business_id)
        .fetch_one(&self.pool)
        .await?;

        let (total_contracts, active_contracts): (i64, i64) = sqlx::query_as(
            r#"
            SELECT COUNT(*), COALESCE(SUM(status = 'ACTIVE'), 0)
            FROM contracts WHERE business_id = ?
            "#,
        )
        .bind(business_id)
        .fetch_one(&self.pool)
        .await?;

        let recent_jobs = sqlx::query_as::<_, RecentJob>(
            r#"
            SELECT j.id, j.title, j.status, j.published_at,
                   (SELECT COUNT(*) FROM job_applications a WHERE a.job_post_id = j.id) AS application_count
            FROM job_posts j
            WHERE j.business_id = ?
            ORDER BY j.created_at DESC, j.rowid DESC
            LIMIT ?
            "#,
        )
        .bind(business_id)
        .bind(RECENT_LIMIT)
        .fetch_all(&self.pool)
        .await?;

        let recent_applications = sqlx::query_as::<_, RecentApplication>(
            r#"
            SELECT a.id, a.status, a.applied_at,
                   w.first_name AS worker_first_name, w.last_name AS worker_last_name,
                   j.id AS job_post_id, j.title AS job_title
            FROM job_applications a
            JOIN job_posts j ON j.id = a.job_post_id
            JOIN worker_profiles w ON w.id = a.worker_id
            WHERE j.business_id = ?
            ORDER BY a.applied_at DESC, a.rowid DESC
            LIMIT ?
            "#,
        )
        .bind(business_id)
        .bind(RECENT_LIMIT)
        .fetch_all(&self.pool)
        .await?;

        Ok(BusinessDashboard {
            stats: DashboardStats {
                total_jobs,
                active_jobs,
                total_applications,
                pending_applications,
                total_contracts,
                active_contracts,
            },
            recent_jobs,
            recent_applications,
        })
    }
}
