use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UserType {
    Worker,
    Business,
    Admin,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AvailabilityStatus {
    Available,
    Busy,
    NotAvailable,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VerificationStatus {
    Pending,
    Verified,
    Rejected,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobStatus {
    Draft,
    Active,
    Closed,
    Cancelled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobType {
    Individual,
    Bulk,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentType {
    Hourly,
    Daily,
    Fixed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LocationType {
    OnSite,
    Remote,
    Hybrid,
}

/// Declared in severity order; `Ord` follows it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Urgency {
    Low,
    Medium,
    High,
    Urgent,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ApplicationStatus {
    Pending,
    Reviewed,
    Shortlisted,
    Rejected,
    Accepted,
    Withdrawn,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ContractType {
    Individual,
    BulkMember,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ContractStatus {
    Pending,
    Active,
    Completed,
    Cancelled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NotificationType {
    JobApplication,
    JobAccepted,
    JobRejected,
    PaymentReceived,
    PaymentSent,
    Message,
    ReviewReceived,
    ContractCreated,
    ContractCompleted,
    WorkerHired,
    System,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: Option<String>,
    pub name: Option<String>,
    pub image: Option<String>,
    pub user_type: Option<UserType>,
    pub onboarding_completed: bool,
    pub email_verified: Option<DateTime<Utc>>,
    pub last_login: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct UserSummary {
    pub id: String,
    pub name: Option<String>,
    pub email: String,
    pub image: Option<String>,
    pub user_type: Option<UserType>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct WorkerProfile {
    pub id: String,
    pub user_id: String,
    pub first_name: String,
    pub last_name: String,
    pub phone: Option<String>,
    pub headline: Option<String>,
    pub bio: Option<String>,
    pub resume_url: Option<String>,
    pub linkedin_url: Option<String>,
    pub location_city: Option<String>,
    pub location_state: Option<String>,
    pub location_country: Option<String>,
    pub location_zip_code: Option<String>,
    pub hourly_rate: Option<f64>,
    pub daily_rate: Option<f64>,
    pub years_of_experience: Option<i64>,
    pub willing_to_relocate: bool,
    pub willing_to_travel: bool,
    pub availability_status: AvailabilityStatus,
    pub verification_status: VerificationStatus,
    pub rating_average: Option<f64>,
    pub total_jobs_completed: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl WorkerProfile {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name).trim().to_string()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct BusinessProfile {
    pub id: String,
    pub user_id: String,
    pub company_name: String,
    pub company_registration_number: Option<String>,
    pub phone: Option<String>,
    pub industry: Option<String>,
    pub company_size: Option<String>,
    pub website: Option<String>,
    pub logo_url: Option<String>,
    pub description: Option<String>,
    pub location_city: Option<String>,
    pub location_state: Option<String>,
    pub location_country: Option<String>,
    pub verification_status: VerificationStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Business fields shown next to job listings, applications and contracts.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct BusinessSummary {
    pub id: String,
    pub company_name: String,
    pub logo_url: Option<String>,
    pub location_city: Option<String>,
    pub location_state: Option<String>,
    pub verification_status: VerificationStatus,
}

impl From<&BusinessProfile> for BusinessSummary {
    fn from(profile: &BusinessProfile) -> Self {
        Self {
            id: profile.id.clone(),
            company_name: profile.company_name.clone(),
            logo_url: profile.logo_url.clone(),
            location_city: profile.location_city.clone(),
            location_state: profile.location_state.clone(),
            verification_status: profile.verification_status,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Skill {
    pub id: String,
    pub name: String,
    pub category: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct WorkerSkill {
    pub skill_id: String,
    pub name: String,
    pub category: String,
    pub proficiency_level: Option<String>,
    pub years_of_experience: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct WorkExperience {
    pub id: String,
    pub worker_id: String,
    pub title: String,
    pub company: String,
    pub location: Option<String>,
    pub start_date: DateTime<Utc>,
    pub end_date: Option<DateTime<Utc>>,
    pub is_current: bool,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct WorkerLanguage {
    pub language_id: String,
    pub name: String,
    pub code: String,
    pub proficiency: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct License {
    pub id: String,
    pub worker_id: String,
    pub name: String,
    pub issuing_authority: String,
    pub license_number: Option<String>,
    pub issue_date: Option<DateTime<Utc>>,
    pub expiry_date: Option<DateTime<Utc>>,
    pub state: Option<String>,
    pub document_url: Option<String>,
    pub verification_status: VerificationStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct PortfolioItem {
    pub id: String,
    pub worker_id: String,
    pub title: String,
    pub description: Option<String>,
    pub project_date: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    #[sqlx(skip)]
    pub images: Vec<PortfolioImage>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct PortfolioImage {
    pub id: String,
    pub portfolio_item_id: String,
    pub image_url: String,
    pub display_order: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct JobPost {
    pub id: String,
    pub business_id: String,
    pub title: String,
    pub description: String,
    pub required_skills: Json<Vec<String>>,
    pub job_type: JobType,
    pub number_of_workers_needed: i64,
    pub budget_min: Option<f64>,
    pub budget_max: Option<f64>,
    pub payment_type: PaymentType,
    pub location_type: LocationType,
    pub job_location_city: Option<String>,
    pub job_location_state: Option<String>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub duration_days: Option<i64>,
    pub status: JobStatus,
    pub urgency: Urgency,
    pub published_at: Option<DateTime<Utc>>,
    pub expires_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl JobPost {
    pub fn is_open(&self, now: DateTime<Utc>) -> bool {
        self.status == JobStatus::Active && self.expires_at.map_or(true, |at| at > now)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct JobApplication {
    pub id: String,
    pub job_post_id: String,
    pub worker_id: String,
    pub cover_letter: Option<String>,
    pub proposed_rate: Option<f64>,
    pub status: ApplicationStatus,
    pub applied_at: DateTime<Utc>,
    pub reviewed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Contract {
    pub id: String,
    pub application_id: Option<String>,
    pub job_post_id: String,
    pub worker_id: String,
    pub business_id: String,
    pub contract_type: ContractType,
    pub status: ContractStatus,
    pub start_date: DateTime<Utc>,
    pub end_date: Option<DateTime<Utc>>,
    pub agreed_rate: f64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct SavedJob {
    pub id: String,
    pub worker_id: String,
    pub job_post_id: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: String,
    pub conversation_id: String,
    pub sender_id: String,
    pub content: String,
    pub is_read: bool,
    pub sent_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: String,
    pub user_id: String,
    #[sqlx(rename = "type")]
    #[serde(rename = "type")]
    pub notification_type: NotificationType,
    pub title: String,
    pub message: String,
    pub link: Option<String>,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

/// Page/limit metadata returned next to paginated lists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub page: i64,
    pub limit: i64,
    pub total: i64,
    pub total_pages: i64,
}

impl Pagination {
    pub const MAX_LIMIT: i64 = 100;

    /// Clamp client-supplied paging values into a usable window.
    pub fn window(page: Option<i64>, limit: Option<i64>, default_limit: i64) -> (i64, i64) {
        let page = page.unwrap_or(1).max(1);
        let limit = limit.unwrap_or(default_limit).clamp(1, Self::MAX_LIMIT);
        (page, limit)
    }

    pub fn new(page: i64, limit: i64, total: i64) -> Self {
        let total_pages = if total == 0 { 0 } else { (total + limit - 1) / limit };
        Self {
            page,
            limit,
            total,
            total_pages,
        }
    }

    pub fn offset(&self) -> i64 {
        Self::offset_for(self.page, self.limit)
    }

    /// Rows to skip for a clamped `(page, limit)`; saturates instead of
    /// overflowing on absurd page numbers.
    pub fn offset_for(page: i64, limit: i64) -> i64 {
        (page - 1).saturating_mul(limit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pagination_window_clamps() {
        assert_eq!(Pagination::window(None, None, 10), (1, 10));
        assert_eq!(Pagination::window(Some(0), Some(0), 10), (1, 1));
        assert_eq!(Pagination::window(Some(3), Some(500), 10), (3, 100));
    }

    #[test]
    fn test_pagination_total_pages_rounds_up() {
        assert_eq!(Pagination::new(1, 10, 0).total_pages, 0);
        assert_eq!(Pagination::new(1, 10, 10).total_pages, 1);
        assert_eq!(Pagination::new(2, 10, 11).total_pages, 2);
        assert_eq!(Pagination::new(2, 10, 11).offset(), 10);
        assert_eq!(Pagination::new(i64::MAX, 100, 3).offset(), i64::MAX);
        assert_eq!(Pagination::offset_for(1, 100), 0);
    }

    #[test]
    fn test_urgency_orders_by_severity() {
        assert!(Urgency::Urgent > Urgency::High);
        assert!(Urgency::Medium > Urgency::Low);
    }
}
