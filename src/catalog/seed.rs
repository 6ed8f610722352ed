//! Idempotent seed data: the skill catalog plus optional demo accounts.

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::info;

use crate::accounts::password::hash_password;
use crate::database::models::UserType;
use crate::database::new_id;
use crate::error::MarketplaceError;

pub const SKILLS: &[(&str, &str)] = &[
    ("Plumbing", "Construction & Building"),
    ("Welding", "Construction & Building"),
    ("Painting", "Construction & Building"),
    ("Carpentry", "Construction & Building"),
    ("Masonry", "Construction & Building"),
    ("Roofing", "Construction & Building"),
    ("Electrical Work", "Construction & Building"),
    ("HVAC", "Construction & Building"),
    ("Drywall Installation", "Construction & Building"),
    ("Flooring", "Construction & Building"),
    ("General Maintenance", "Maintenance & Repair"),
    ("Appliance Repair", "Maintenance & Repair"),
    ("Equipment Repair", "Maintenance & Repair"),
    ("Facility Maintenance", "Maintenance & Repair"),
    ("Landscaping", "Landscaping & Outdoor"),
    ("Gardening", "Landscaping & Outdoor"),
    ("Tree Service", "Landscaping & Outdoor"),
    ("Irrigation", "Landscaping & Outdoor"),
    ("Auto Mechanics", "Automotive"),
    ("Auto Body Repair", "Automotive"),
    ("Auto Painting", "Automotive"),
    ("Commercial Cleaning", "Cleaning & Sanitation"),
    ("Deep Cleaning", "Cleaning & Sanitation"),
    ("Janitorial Services", "Cleaning & Sanitation"),
    ("CNC Operation", "Manufacturing"),
    ("Machine Operation", "Manufacturing"),
    ("Assembly", "Manufacturing"),
    ("Quality Control", "Manufacturing"),
    ("Locksmith", "Other Skilled Trades"),
    ("Glass Installation", "Other Skilled Trades"),
    ("Security Installation", "Other Skilled Trades"),
];

/// Insert any catalog skills that are missing. Returns how many were added.
pub async fn seed_skills(pool: &SqlitePool) -> Result<u64, MarketplaceError> {
    let mut added = 0;
    for (name, category) in SKILLS {
        let result = sqlx::query("INSERT OR IGNORE INTO skills (id, name, category) VALUES (?, ?, ?)")
            .bind(new_id())
            .bind(name)
            .bind(category)
            .execute(pool)
            .await?;
        added += result.rows_affected();
    }

    info!("Skill catalog seeded ({} new of {})", added, SKILLS.len());
    Ok(added)
}

/// Demo admin, worker and business accounts for local development.
pub async fn seed_demo_accounts(pool: &SqlitePool, password_cost: u32) -> Result<(), MarketplaceError> {
    let now = Utc::now();

    let accounts = [
        ("admin@gigit.com", "Admin@123", UserType::Admin, None),
        ("worker@example.com", "Worker@123", UserType::Worker, Some("John Smith")),
        ("business@example.com", "Business@123", UserType::Business, Some("BuildCo Construction")),
    ];

    for (email, password, user_type, name) in accounts {
        let existing: Option<String> = sqlx::query_scalar("SELECT id FROM users WHERE email = ?")
            .bind(email)
            .fetch_optional(pool)
            .await?;
        if existing.is_some() {
            continue;
        }

        let user_id = new_id();
        let password_hash = hash_password(password, password_cost).await?;
        let mut tx = pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO users (id, email, password_hash, name, user_type, onboarding_completed,
                               email_verified, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&user_id)
        .bind(email)
        .bind(&password_hash)
        .bind(name)
        .bind(user_type)
        .bind(user_type != UserType::Admin)
        .bind(now)
        .bind(now)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        match user_type {
            UserType::Worker => {
                let worker_id = new_id();
                sqlx::query(
                    r#"
                    INSERT INTO worker_profiles (id, user_id, first_name, last_name, phone, bio,
                        years_of_experience, hourly_rate, availability_status, location_city,
                        location_state, location_country, verification_status, rating_average,
                        total_jobs_completed, created_at, updated_at)
                    VALUES (?, ?, 'John', 'Smith', '+1234567890',
                        'Experienced plumber with 10+ years in residential and commercial plumbing. Licensed and insured.',
                        10, 75.0, 'AVAILABLE', 'New York', 'NY', 'USA', 'VERIFIED', 4.8, 127, ?, ?)
                    "#,
                )
                .bind(&worker_id)
                .bind(&user_id)
                .bind(now)
                .bind(now)
                .execute(&mut *tx)
                .await?;

                for (skill, level, years) in [("Plumbing", "EXPERT", 10), ("Welding", "INTERMEDIATE", 5)] {
                    sqlx::query(
                        r#"
                        INSERT OR IGNORE INTO worker_skills (worker_id, skill_id, proficiency_level, years_of_experience)
                        SELECT ?, id, ?, ? FROM skills WHERE name = ?
                        "#,
                    )
                    .bind(&worker_id)
                    .bind(level)
                    .bind(years)
                    .bind(skill)
                    .execute(&mut *tx)
                    .await?;
                }
            }
            UserType::Business => {
                sqlx::query(
                    r#"
                    INSERT INTO business_profiles (id, user_id, company_name, company_registration_number,
                        phone, industry, company_size, website, description, location_city,
                        location_state, location_country, verification_status, created_at, updated_at)
                    VALUES (?, ?, 'BuildCo Construction', 'REG123456', '+1987654321', 'Construction',
                        'MEDIUM', 'https://buildco.example.com',
                        'Leading construction company specializing in commercial and residential projects.',
                        'New York', 'NY', 'USA', 'VERIFIED', ?, ?)
                    "#,
                )
                .bind(new_id())
                .bind(&user_id)
                .bind(now)
                .bind(now)
                .execute(&mut *tx)
                .await?;
            }
            UserType::Admin => {}
        }

        tx.commit().await?;
        info!("Created demo account {}", email);
    }

    Ok(())
}
