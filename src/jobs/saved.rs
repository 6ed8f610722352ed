use chrono::Utc;
use serde::Serialize;
use sqlx::SqlitePool;

use super::{JobBoard, JobListing, JobRow};
use crate::database::models::SavedJob;
use crate::database::new_id;
use crate::error::MarketplaceError;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SavedJobView {
    #[serde(flatten)]
    pub saved: SavedJob,
    pub job_post: JobListing,
}

/// A worker's bookmarked jobs.
pub struct SavedJobs {
    pool: SqlitePool,
}

impl SavedJobs {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn save(&self, worker_id: &str, job_id: &str) -> Result<SavedJob, MarketplaceError> {
        JobBoard::new(self.pool.clone()).require(job_id).await?;

        let saved = sqlx::query_as::<_, SavedJob>(
            "INSERT INTO saved_jobs (id, worker_id, job_post_id, created_at) VALUES (?, ?, ?, ?) RETURNING *",
        )
        .bind(new_id())
        .bind(worker_id)
        .bind(job_id)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await;

        match saved {
            Ok(saved) => Ok(saved),
            Err(e) if MarketplaceError::is_unique_violation(&e) => {
                Err(MarketplaceError::ValidationError("Job already saved".to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    pub async fn unsave(&self, worker_id: &str, job_id: &str) -> Result<(), MarketplaceError> {
        let deleted = sqlx::query("DELETE FROM saved_jobs WHERE worker_id = ? AND job_post_id = ?")
            .bind(worker_id)
            .bind(job_id)
            .execute(&self.pool)
            .await?;

        if deleted.rows_affected() == 0 {
            return Err(MarketplaceError::not_found("Saved job"));
        }
        Ok(())
    }

    /// Most recently saved first.
    pub async fn list(&self, worker_id: &str) -> Result<Vec<SavedJobView>, MarketplaceError> {
        let saved = sqlx::query_as::<_, SavedJob>(
            "SELECT * FROM saved_jobs WHERE worker_id = ? ORDER BY created_at DESC, rowid DESC",
        )
        .bind(worker_id)
        .fetch_all(&self.pool)
        .await?;

        let rows = sqlx::query_as::<_, JobRow>(
            r#"
            SELECT j.*, (SELECT COUNT(*) FROM job_applications a WHERE a.job_post_id = j.id) AS application_count
            FROM job_posts j
            JOIN saved_jobs s ON s.job_post_id = j.id
            WHERE s.worker_id = ?
            "#,
        )
        .bind(worker_id)
        .fetch_all(&self.pool)
        .await?;

        let mut listings = JobBoard::new(self.pool.clone()).listings(rows).await?;

        Ok(saved
            .into_iter()
            .filter_map(|saved| {
                let index = listings.iter().position(|l| l.job.id == saved.job_post_id)?;
                Some(SavedJobView {
                    saved,
                    job_post: listings.swap_remove(index),
                })
            })
            .collect())
    }
}
