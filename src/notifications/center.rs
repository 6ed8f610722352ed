use chrono::Utc;
use serde::Serialize;
use sqlx::{Executor, Sqlite, SqlitePool};
use tracing::debug;

use crate::database::models::{Notification, NotificationType, Pagination};
use crate::database::new_id;
use crate::error::MarketplaceError;

/// A notification about to be written for `user_id`.
#[derive(Debug, Clone)]
pub struct NewNotification {
    pub user_id: String,
    pub notification_type: NotificationType,
    pub title: String,
    pub message: String,
    pub link: Option<String>,
}

impl NewNotification {
    pub fn new(
        user_id: impl Into<String>,
        notification_type: NotificationType,
        title: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            notification_type,
            title: title.into(),
            message: message.into(),
            link: None,
        }
    }

    pub fn link(mut self, link: impl Into<String>) -> Self {
        self.link = Some(link.into());
        self
    }

    /// Insert on any executor so callers can include it in their transaction.
    pub async fn insert<'e, E>(&self, executor: E) -> Result<String, MarketplaceError>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let id = new_id();
        sqlx::query(
            r#"
            INSERT INTO notifications (id, user_id, type, title, message, link, is_read, created_at)
            VALUES (?, ?, ?, ?, ?, ?, FALSE, ?)
            "#,
        )
        .bind(&id)
        .bind(&self.user_id)
        .bind(self.notification_type)
        .bind(&self.title)
        .bind(&self.message)
        .bind(&self.link)
        .bind(Utc::now())
        .execute(executor)
        .await?;

        debug!("Notified user {} ({:?})", self.user_id, self.notification_type);
        Ok(id)
    }
}

#[derive(Debug, Serialize)]
pub struct NotificationPage {
    pub notifications: Vec<Notification>,
    pub pagination: Pagination,
}

pub struct NotificationCenter {
    pool: SqlitePool,
}

impl NotificationCenter {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn list(
        &self,
        user_id: &str,
        page: i64,
        limit: i64,
        unread_only: bool,
    ) -> Result<NotificationPage, MarketplaceError> {
        let total: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM notifications WHERE user_id = ? AND (? = FALSE OR is_read = FALSE)",
        )
        .bind(user_id)
        .bind(unread_only)
        .fetch_one(&self.pool)
        .await?;

        let pagination = Pagination::new(page, limit, total);

        let notifications = sqlx::query_as::<_, Notification>(
            r#"
            SELECT id, user_id, type, title, message, link, is_read, created_at
            FROM notifications
            WHERE user_id = ? AND (? = FALSE OR is_read = FALSE)
            ORDER BY created_at DESC, rowid DESC
            LIMIT ? OFFSET ?
            "#,
        )
        .bind(user_id)
        .bind(unread_only)
        .bind(limit)
        .bind(pagination.offset())
        .fetch_all(&self.pool)
        .await?;

        Ok(NotificationPage {
            notifications,
            pagination,
        })
    }

    pub async fn unread_count(&self, user_id: &str) -> Result<i64, MarketplaceError> {
        let count = sqlx::query_scalar(
            "SELECT COUNT(*) FROM notifications WHERE user_id = ? AND is_read = FALSE",
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }

    pub async fn mark_read(&self, user_id: &str, notification_id: &str) -> Result<(), MarketplaceError> {
        let result = sqlx::query("UPDATE notifications SET is_read = TRUE WHERE id = ? AND user_id = ?")
            .bind(notification_id)
            .bind(user_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(MarketplaceError::not_found("Notification"));
        }
        Ok(())
    }

    pub async fn mark_all_read(&self, user_id: &str) -> Result<u64, MarketplaceError> {
        let result = sqlx::query("UPDATE notifications SET is_read = TRUE WHERE user_id = ? AND is_read = FALSE")
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    pub async fn delete(&self, user_id: &str, notification_id: &str) -> Result<(), MarketplaceError> {
        let result = sqlx::query("DELETE FROM notifications WHERE id = ? AND user_id = ?")
            .bind(notification_id)
            .bind(user_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(MarketplaceError::not_found("Notification"));
        }
        Ok(())
    }
}
