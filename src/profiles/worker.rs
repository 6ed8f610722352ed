//! Worker profiles
//!
//! Onboarding, self-service profile edits and the profile view shown to
//! businesses.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{Sqlite, SqlitePool, Transaction};
use tracing::info;

use super::portfolio::Portfolio;
use crate::database::models::*;
use crate::database::new_id;
use crate::error::MarketplaceError;
use crate::lenient;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkerOnboarding {
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub phone: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub headline: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub bio: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub resume_url: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub linkedin_url: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub location_city: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub location_state: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub location_country: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub location_zip_code: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_f64")]
    pub hourly_rate: Option<f64>,
    #[serde(default, deserialize_with = "lenient::opt_f64")]
    pub daily_rate: Option<f64>,
    #[serde(default, deserialize_with = "lenient::opt_i64")]
    pub years_of_experience: Option<i64>,
    #[serde(default)]
    pub willing_to_relocate: bool,
    #[serde(default)]
    pub willing_to_travel: bool,
    /// Replaced only when non-empty.
    pub skills: Option<Vec<SkillInput>>,
    /// Replaced whenever present, including an empty list.
    pub work_experiences: Option<Vec<ExperienceInput>>,
    pub languages: Option<Vec<LanguageInput>>,
    pub licenses: Option<Vec<LicenseInput>>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SkillInput {
    pub skill_id: String,
    pub proficiency_level: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_i64")]
    pub years_of_experience: Option<i64>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExperienceInput {
    pub title: String,
    pub company: String,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub location: Option<String>,
    pub start_date: String,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub end_date: Option<String>,
    #[serde(default)]
    pub is_current: bool,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LanguageInput {
    pub language_id: String,
    pub name: String,
    pub proficiency: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LicenseInput {
    pub name: String,
    pub issuing_authority: String,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub license_number: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_datetime")]
    pub issue_date: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "lenient::opt_datetime")]
    pub expiry_date: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub state: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub document_url: Option<String>,
}

/// Partial profile update. Absent fields keep their stored value; optional
/// fields sent blank or null are cleared.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkerProfileUpdate {
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub first_name: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub last_name: Option<String>,
    #[serde(default, deserialize_with = "lenient::clearable_string")]
    pub phone: Option<Option<String>>,
    #[serde(default, deserialize_with = "lenient::clearable_string")]
    pub headline: Option<Option<String>>,
    #[serde(default, deserialize_with = "lenient::clearable_string")]
    pub bio: Option<Option<String>>,
    #[serde(default, deserialize_with = "lenient::clearable_string")]
    pub linkedin_url: Option<Option<String>>,
    #[serde(default, deserialize_with = "lenient::clearable_string")]
    pub location_city: Option<Option<String>>,
    #[serde(default, deserialize_with = "lenient::clearable_string")]
    pub location_state: Option<Option<String>>,
    #[serde(default, deserialize_with = "lenient::clearable_string")]
    pub location_country: Option<Option<String>>,
    #[serde(default, deserialize_with = "lenient::clearable_string")]
    pub location_zip_code: Option<Option<String>>,
    #[serde(default, deserialize_with = "lenient::clearable_f64")]
    pub hourly_rate: Option<Option<f64>>,
    #[serde(default, deserialize_with = "lenient::clearable_f64")]
    pub daily_rate: Option<Option<f64>>,
    #[serde(default, deserialize_with = "lenient::clearable_i64")]
    pub years_of_experience: Option<Option<i64>>,
    pub willing_to_relocate: Option<bool>,
    pub willing_to_travel: Option<bool>,
    pub availability_status: Option<AvailabilityStatus>,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ProfileOwner {
    pub email: String,
    pub image: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkerProfileView {
    #[serde(flatten)]
    pub profile: WorkerProfile,
    pub user: ProfileOwner,
    pub skills: Vec<WorkerSkill>,
    pub work_experiences: Vec<WorkExperience>,
    pub licenses: Vec<License>,
    pub languages: Vec<WorkerLanguage>,
    pub portfolio_items: Vec<PortfolioItem>,
}

pub struct WorkerProfiles {
    pool: SqlitePool,
}

impl WorkerProfiles {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn find(&self, worker_id: &str) -> Result<Option<WorkerProfile>, MarketplaceError> {
        let profile = sqlx::query_as::<_, WorkerProfile>("SELECT * FROM worker_profiles WHERE id = ?")
            .bind(worker_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(profile)
    }

    pub async fn find_by_user(&self, user_id: &str) -> Result<Option<WorkerProfile>, MarketplaceError> {
        let profile = sqlx::query_as::<_, WorkerProfile>("SELECT * FROM worker_profiles WHERE user_id = ?")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(profile)
    }

    pub async fn require_by_user(&self, user_id: &str) -> Result<WorkerProfile, MarketplaceError> {
        self.find_by_user(user_id)
            .await?
            .ok_or_else(MarketplaceError::worker_profile_missing)
    }

    /// Apply the onboarding wizard in one transaction and mark the user as
    /// an onboarded worker.
    pub async fn onboard(
        &self,
        user_id: &str,
        input: WorkerOnboarding,
    ) -> Result<WorkerProfile, MarketplaceError> {
        if input.first_name.trim().is_empty() || input.last_name.trim().is_empty() {
            return Err(MarketplaceError::ValidationError(
                "First name and last name are required".to_string(),
            ));
        }

        let now = Utc::now();
        let mut tx = self.pool.begin().await?;

        let worker_id: String = sqlx::query_scalar(
            r#"
            INSERT INTO worker_profiles (id, user_id, first_name, last_name, phone, headline, bio,
                resume_url, linkedin_url, location_city, location_state, location_country,
                location_zip_code, hourly_rate, daily_rate, years_of_experience,
                willing_to_relocate, willing_to_travel, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT (user_id) DO UPDATE SET
                first_name = excluded.first_name,
                last_name = excluded.last_name,
                phone = excluded.phone,
                headline = excluded.headline,
                bio = excluded.bio,
                resume_url = excluded.resume_url,
                linkedin_url = excluded.linkedin_url,
                location_city = excluded.location_city,
                location_state = excluded.location_state,
                location_country = excluded.location_country,
                location_zip_code = excluded.location_zip_code,
                hourly_rate = excluded.hourly_rate,
                daily_rate = excluded.daily_rate,
                years_of_experience = excluded.years_of_experience,
                willing_to_relocate = excluded.willing_to_relocate,
                willing_to_travel = excluded.willing_to_travel,
                updated_at = excluded.updated_at
            RETURNING id
            "#,
        )
        .bind(new_id())
        .bind(user_id)
        .bind(input.first_name.trim())
        .bind(input.last_name.trim())
        .bind(&input.phone)
        .bind(&input.headline)
        .bind(&input.bio)
        .bind(&input.resume_url)
        .bind(&input.linkedin_url)
        .bind(&input.location_city)
        .bind(&input.location_state)
        .bind(&input.location_country)
        .bind(&input.location_zip_code)
        .bind(input.hourly_rate)
        .bind(input.daily_rate)
        .bind(input.years_of_experience)
        .bind(input.willing_to_relocate)
        .bind(input.willing_to_travel)
        .bind(now)
        .bind(now)
        .fetch_one(&mut *tx)
        .await?;

        if let Some(skills) = input.skills.as_ref().filter(|s| !s.is_empty()) {
            replace_skills(&mut tx, &worker_id, skills).await?;
        }
        if let Some(experiences) = &input.work_experiences {
            replace_experiences(&mut tx, &worker_id, experiences).await?;
        }
        if let Some(languages) = &input.languages {
            replace_languages(&mut tx, &worker_id, languages).await?;
        }
        if let Some(licenses) = &input.licenses {
            replace_licenses(&mut tx, &worker_id, licenses).await?;
        }

        let name = format!("{} {}", input.first_name.trim(), input.last_name.trim());
        sqlx::query(
            "UPDATE users SET user_type = 'WORKER', onboarding_completed = TRUE, name = ?, updated_at = ? WHERE id = ?",
        )
        .bind(name.trim())
        .bind(now)
        .bind(user_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        info!("Worker onboarding completed for user {}", user_id);

        self.require_by_user(user_id).await
    }

    pub async fn update(
        &self,
        user_id: &str,
        update: WorkerProfileUpdate,
    ) -> Result<WorkerProfile, MarketplaceError> {
        let profile = self.require_by_user(user_id).await?;
        let now = Utc::now();
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            UPDATE worker_profiles SET
                first_name = COALESCE(?, first_name),
                last_name = COALESCE(?, last_name),
                phone = CASE WHEN ? THEN ? ELSE phone END,
                headline = CASE WHEN ? THEN ? ELSE headline END,
                bio = CASE WHEN ? THEN ? ELSE bio END,
                linkedin_url = CASE WHEN ? THEN ? ELSE linkedin_url END,
                location_city = CASE WHEN ? THEN ? ELSE location_city END,
                location_state = CASE WHEN ? THEN ? ELSE location_state END,
                location_country = CASE WHEN ? THEN ? ELSE location_country END,
                location_zip_code = CASE WHEN ? THEN ? ELSE location_zip_code END,
                hourly_rate = CASE WHEN ? THEN ? ELSE hourly_rate END,
                daily_rate = CASE WHEN ? THEN ? ELSE daily_rate END,
                years_of_experience = CASE WHEN ? THEN ? ELSE years_of_experience END,
                willing_to_relocate = COALESCE(?, willing_to_relocate),
                willing_to_travel = COALESCE(?, willing_to_travel),
                availability_status = COALESCE(?, availability_status),
                updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(&update.first_name)
        .bind(&update.last_name)
        .bind(update.phone.is_some())
        .bind(update.phone.flatten())
        .bind(update.headline.is_some())
        .bind(update.headline.flatten())
        .bind(update.bio.is_some())
        .bind(update.bio.flatten())
        .bind(update.linkedin_url.is_some())
        .bind(update.linkedin_url.flatten())
        .bind(update.location_city.is_some())
        .bind(update.location_city.flatten())
        .bind(update.location_state.is_some())
        .bind(update.location_state.flatten())
        .bind(update.location_country.is_some())
        .bind(update.location_country.flatten())
        .bind(update.location_zip_code.is_some())
        .bind(update.location_zip_code.flatten())
        .bind(update.hourly_rate.is_some())
        .bind(update.hourly_rate.flatten())
        .bind(update.daily_rate.is_some())
        .bind(update.daily_rate.flatten())
        .bind(update.years_of_experience.is_some())
        .bind(update.years_of_experience.flatten())
        .bind(update.willing_to_relocate)
        .bind(update.willing_to_travel)
        .bind(update.availability_status)
        .bind(now)
        .bind(&profile.id)
        .execute(&mut *tx)
        .await?;

        let updated = sqlx::query_as::<_, WorkerProfile>("SELECT * FROM worker_profiles WHERE id = ?")
            .bind(&profile.id)
            .fetch_one(&mut *tx)
            .await?;

        sqlx::query("UPDATE users SET name = ?, updated_at = ? WHERE id = ?")
            .bind(updated.full_name())
            .bind(now)
            .bind(user_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(updated)
    }

    /// Full profile with qualifications and portfolio. Public views hide
    /// license numbers and license documents.
    pub async fn view(
        &self,
        profile: WorkerProfile,
        public: bool,
    ) -> Result<WorkerProfileView, MarketplaceError> {
        let user = sqlx::query_as::<_, ProfileOwner>("SELECT email, image, created_at FROM users WHERE id = ?")
            .bind(&profile.user_id)
            .fetch_one(&self.pool)
            .await?;

        let skills = self.skills(&profile.id).await?;

        let work_experiences = sqlx::query_as::<_, WorkExperience>(
            "SELECT * FROM work_experiences WHERE worker_id = ? ORDER BY start_date DESC",
        )
        .bind(&profile.id)
        .fetch_all(&self.pool)
        .await?;

        let mut licenses = sqlx::query_as::<_, License>(
            "SELECT * FROM licenses WHERE worker_id = ? ORDER BY issue_date DESC",
        )
        .bind(&profile.id)
        .fetch_all(&self.pool)
        .await?;

        if public {
            for license in &mut licenses {
                license.license_number = None;
                license.document_url = None;
            }
        }

        let languages = sqlx::query_as::<_, WorkerLanguage>(
            r#"
            SELECT wl.language_id, l.name, l.code, wl.proficiency
            FROM worker_languages wl
            JOIN languages l ON l.id = wl.language_id
            WHERE wl.worker_id = ?
            ORDER BY l.name
            "#,
        )
        .bind(&profile.id)
        .fetch_all(&self.pool)
        .await?;

        let portfolio_items = Portfolio::new(self.pool.clone()).list(&profile.id).await?;

        Ok(WorkerProfileView {
            profile,
            user,
            skills,
            work_experiences,
            licenses,
            languages,
            portfolio_items,
        })
    }

    pub async fn skills(&self, worker_id: &str) -> Result<Vec<WorkerSkill>, MarketplaceError> {
        let skills = sqlx::query_as::<_, WorkerSkill>(
            r#"
            SELECT ws.skill_id, s.name, s.category, ws.proficiency_level, ws.years_of_experience
            FROM worker_skills ws
            JOIN skills s ON s.id = ws.skill_id
            WHERE ws.worker_id = ?
            ORDER BY s.name
            "#,
        )
        .bind(worker_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(skills)
    }
}

async fn replace_skills(
    tx: &mut Transaction<'_, Sqlite>,
    worker_id: &str,
    skills: &[SkillInput],
) -> Result<(), MarketplaceError> {
    sqlx::query("DELETE FROM worker_skills WHERE worker_id = ?")
        .bind(worker_id)
        .execute(&mut **tx)
        .await?;

    for skill in skills {
        let inserted = sqlx::query(
            r#"
            INSERT INTO worker_skills (worker_id, skill_id, proficiency_level, years_of_experience)
            VALUES (?, ?, ?, ?)
            ON CONFLICT (worker_id, skill_id) DO UPDATE SET
                proficiency_level = excluded.proficiency_level,
                years_of_experience = excluded.years_of_experience
            "#,
        )
        .bind(worker_id)
        .bind(&skill.skill_id)
        .bind(&skill.proficiency_level)
        .bind(skill.years_of_experience)
        .execute(&mut **tx)
        .await;

        if let Err(sqlx::Error::Database(db_err)) = &inserted {
            if db_err.is_foreign_key_violation() {
                return Err(MarketplaceError::ValidationError(format!(
                    "Unknown skill: {}",
                    skill.skill_id
                )));
            }
        }
        inserted?;
    }
    Ok(())
}

async fn replace_experiences(
    tx: &mut Transaction<'_, Sqlite>,
    worker_id: &str,
    experiences: &[ExperienceInput],
) -> Result<(), MarketplaceError> {
    sqlx::query("DELETE FROM work_experiences WHERE worker_id = ?")
        .bind(worker_id)
        .execute(&mut **tx)
        .await?;

    for experience in experiences {
        let start_date = lenient::parse_date(&experience.start_date).ok_or_else(|| {
            MarketplaceError::ValidationError(format!("Invalid start date: {}", experience.start_date))
        })?;
        let end_date = match experience.end_date.as_deref() {
            Some(raw) => Some(lenient::parse_date(raw).ok_or_else(|| {
                MarketplaceError::ValidationError(format!("Invalid end date: {}", raw))
            })?),
            None => None,
        };

        sqlx::query(
            r#"
            INSERT INTO work_experiences (id, worker_id, title, company, location, start_date,
                                          end_date, is_current, description)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(new_id())
        .bind(worker_id)
        .bind(&experience.title)
        .bind(&experience.company)
        .bind(&experience.location)
        .bind(start_date)
        .bind(end_date)
        .bind(experience.is_current)
        .bind(&experience.description)
        .execute(&mut **tx)
        .await?;
    }
    Ok(())
}

async fn replace_languages(
    tx: &mut Transaction<'_, Sqlite>,
    worker_id: &str,
    languages: &[LanguageInput],
) -> Result<(), MarketplaceError> {
    sqlx::query("DELETE FROM worker_languages WHERE worker_id = ?")
        .bind(worker_id)
        .execute(&mut **tx)
        .await?;

    for language in languages {
        // The client uses the language code as its id.
        sqlx::query("INSERT OR IGNORE INTO languages (id, name, code) VALUES (?, ?, ?)")
            .bind(&language.language_id)
            .bind(&language.name)
            .bind(&language.language_id)
            .execute(&mut **tx)
            .await?;

        sqlx::query(
            r#"
            INSERT INTO worker_languages (worker_id, language_id, proficiency) VALUES (?, ?, ?)
            ON CONFLICT (worker_id, language_id) DO UPDATE SET proficiency = excluded.proficiency
            "#,
        )
        .bind(worker_id)
        .bind(&language.language_id)
        .bind(&language.proficiency)
        .execute(&mut **tx)
        .await?;
    }
    Ok(())
}

async fn replace_licenses(
    tx: &mut Transaction<'_, Sqlite>,
    worker_id: &str,
    licenses: &[LicenseInput],
) -> Result<(), MarketplaceError> {
    sqlx::query("DELETE FROM licenses WHERE worker_id = ?")
        .bind(worker_id)
        .execute(&mut **tx)
        .await?;

    for license in licenses {
        sqlx::query(
            r#"
            INSERT INTO licenses (id, worker_id, name, issuing_authority, license_number,
                                  issue_date, expiry_date, state, document_url)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(new_id())
        .bind(worker_id)
        .bind(&license.name)
        .bind(&license.issuing_authority)
        .bind(&license.license_number)
        .bind(license.issue_date)
        .bind(license.expiry_date)
        .bind(&license.state)
        .bind(&license.document_url)
        .execute(&mut **tx)
        .await?;
    }
    Ok(())
}
