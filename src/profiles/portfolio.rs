use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::Deserialize;
use sqlx::{QueryBuilder, Sqlite, SqlitePool, Transaction};

use crate::database::models::{PortfolioImage, PortfolioItem};
use crate::database::new_id;
use crate::error::MarketplaceError;
use crate::lenient;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PortfolioInput {
    #[serde(default)]
    pub title: String,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub description: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_datetime")]
    pub project_date: Option<DateTime<Utc>>,
    /// Image URLs in display order.
    #[serde(default)]
    pub images: Vec<String>,
}

impl PortfolioInput {
    fn validate(&self) -> Result<DateTime<Utc>, MarketplaceError> {
        if self.title.trim().is_empty() {
            return Err(MarketplaceError::ValidationError("Title is required".to_string()));
        }
        self.project_date
            .ok_or_else(|| MarketplaceError::ValidationError("Project date is required".to_string()))
    }
}

/// Portfolio items, always scoped to one worker profile.
pub struct Portfolio {
    pool: SqlitePool,
}

impl Portfolio {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn list(&self, worker_id: &str) -> Result<Vec<PortfolioItem>, MarketplaceError> {
        let mut items = sqlx::query_as::<_, PortfolioItem>(
            "SELECT * FROM portfolio_items WHERE worker_id = ? ORDER BY project_date DESC, rowid DESC",
        )
        .bind(worker_id)
        .fetch_all(&self.pool)
        .await?;

        if items.is_empty() {
            return Ok(items);
        }

        let mut query: QueryBuilder<Sqlite> =
            QueryBuilder::new("SELECT * FROM portfolio_images WHERE portfolio_item_id IN (");
        let mut separated = query.separated(", ");
        for item in &items {
            separated.push_bind(item.id.clone());
        }
        separated.push_unseparated(") ORDER BY display_order");

        let mut by_item: HashMap<String, Vec<PortfolioImage>> = HashMap::new();
        for image in query.build_query_as::<PortfolioImage>().fetch_all(&self.pool).await? {
            by_item.entry(image.portfolio_item_id.clone()).or_default().push(image);
        }
        for item in &mut items {
            item.images = by_item.remove(&item.id).unwrap_or_default();
        }

        Ok(items)
    }

    pub async fn get(&self, worker_id: &str, item_id: &str) -> Result<PortfolioItem, MarketplaceError> {
        let mut item = sqlx::query_as::<_, PortfolioItem>(
            "SELECT * FROM portfolio_items WHERE id = ? AND worker_id = ?",
        )
        .bind(item_id)
        .bind(worker_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| MarketplaceError::not_found("Portfolio item"))?;

        item.images = self.images(item_id).await?;
        Ok(item)
    }

    pub async fn create(
        &self,
        worker_id: &str,
        input: PortfolioInput,
    ) -> Result<PortfolioItem, MarketplaceError> {
        let project_date = input.validate()?;
        let item_id = new_id();
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO portfolio_items (id, worker_id, title, description, project_date, created_at)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&item_id)
        .bind(worker_id)
        .bind(input.title.trim())
        .bind(&input.description)
        .bind(project_date)
        .bind(Utc::now())
        .execute(&mut *tx)
        .await?;

        insert_images(&mut tx, &item_id, &input.images).await?;
        tx.commit().await?;

        self.get(worker_id, &item_id).await
    }

    /// Replace the item's fields and its image list.
    pub async fn update(
        &self,
        worker_id: &str,
        item_id: &str,
        input: PortfolioInput,
    ) -> Result<PortfolioItem, MarketplaceError> {
        let project_date = input.validate()?;
        let mut tx = self.pool.begin().await?;

        let updated = sqlx::query(
            "UPDATE portfolio_items SET title = ?, description = ?, project_date = ? WHERE id = ? AND worker_id = ?",
        )
        .bind(input.title.trim())
        .bind(&input.description)
        .bind(project_date)
        .bind(item_id)
        .bind(worker_id)
        .execute(&mut *tx)
        .await?;

        if updated.rows_affected() == 0 {
            return Err(MarketplaceError::not_found("Portfolio item"));
        }

        sqlx::query("DELETE FROM portfolio_images WHERE portfolio_item_id = ?")
            .bind(item_id)
            .execute(&mut *tx)
            .await?;
        insert_images(&mut tx, item_id, &input.images).await?;
        tx.commit().await?;

        self.get(worker_id, item_id).await
    }

    /// Delete the item and return the URLs of the images it referenced.
    pub async fn delete(&self, worker_id: &str, item_id: &str) -> Result<Vec<String>, MarketplaceError> {
        let item = self.get(worker_id, item_id).await?;

        sqlx::query("DELETE FROM portfolio_items WHERE id = ? AND worker_id = ?")
            .bind(item_id)
            .bind(worker_id)
            .execute(&self.pool)
            .await?;

        Ok(item.images.into_iter().map(|image| image.image_url).collect())
    }

    async fn images(&self, item_id: &str) -> Result<Vec<PortfolioImage>, MarketplaceError> {
        let images = sqlx::query_as::<_, PortfolioImage>(
            "SELECT * FROM portfolio_images WHERE portfolio_item_id = ? ORDER BY display_order",
        )
        .bind(item_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(images)
    }
}

async fn insert_images(
    tx: &mut Transaction<'_, Sqlite>,
    item_id: &str,
    urls: &[String],
) -> Result<(), MarketplaceError> {
    for (order, url) in urls.iter().enumerate() {
        sqlx::query(
            "INSERT INTO portfolio_images (id, portfolio_item_id, image_url, display_order) VALUES (?, ?, ?, ?)",
        )
        .bind(new_id())
        .bind(item_id)
        .bind(url)
        .bind(order as i64)
        .execute(&mut **tx)
        .await?;
    }
    Ok(())
}
