//! Two-party conversations between users

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::info;

use crate::database::models::{NotificationType, Pagination, User, UserSummary};
use crate::database::new_id;
use crate::error::MarketplaceError;
use crate::notifications::NewNotification;

pub const DEFAULT_THREAD_PAGE_SIZE: i64 = 50;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendMessage {
    #[serde(default)]
    pub receiver_id: String,
    #[serde(default)]
    pub content: String,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct LastMessage {
    pub id: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub is_read: bool,
    pub sender_id: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationSummary {
    pub id: String,
    pub other_user: Option<UserSummary>,
    pub last_message: Option<LastMessage>,
    pub unread_count: i64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageSender {
    pub id: String,
    pub name: Option<String>,
    pub image: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageView {
    pub id: String,
    pub conversation_id: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub is_read: bool,
    pub sender_id: String,
    pub sender: MessageSender,
}

#[derive(sqlx::FromRow)]
struct MessageRow {
    id: String,
    conversation_id: String,
    content: String,
    sent_at: DateTime<Utc>,
    is_read: bool,
    sender_id: String,
    sender_name: Option<String>,
    sender_image: Option<String>,
}

impl From<MessageRow> for MessageView {
    fn from(row: MessageRow) -> Self {
        MessageView {
            sender: MessageSender {
                id: row.sender_id.clone(),
                name: row.sender_name,
                image: row.sender_image,
            },
            id: row.id,
            conversation_id: row.conversation_id,
            content: row.content,
            created_at: row.sent_at,
            is_read: row.is_read,
            sender_id: row.sender_id,
        }
    }
}

const MESSAGE_SELECT: &str = r#"
    SELECT m.id, m.conversation_id, m.content, m.sent_at, m.is_read, m.sender_id,
           u.name AS sender_name, u.image AS sender_image
    FROM messages m
    JOIN users u ON u.id = m.sender_id
"#;

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct WorkerName {
    pub id: String,
    pub first_name: String,
    pub last_name: String,
    pub headline: Option<String>,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct BusinessName {
    pub id: String,
    pub company_name: String,
}

/// The other side of a thread, with whichever role profile they have.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Correspondent {
    #[serde(flatten)]
    pub user: UserSummary,
    pub worker_profile: Option<WorkerName>,
    pub business_profile: Option<BusinessName>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationThread {
    pub messages: Vec<MessageView>,
    pub other_user: Correspondent,
}

pub struct Inbox {
    pool: SqlitePool,
}

impl Inbox {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// The caller's conversations, most recently active first.
    pub async fn list_conversations(&self, user_id: &str) -> Result<Vec<ConversationSummary>, MarketplaceError> {
        let ids: Vec<String> = sqlx::query_scalar(
            r#"
            SELECT c.id FROM conversations c
            JOIN conversation_participants p ON p.conversation_id = c.id
            WHERE p.user_id = ?
            ORDER BY c.updated_at DESC, c.rowid DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        let mut conversations = Vec::with_capacity(ids.len());
        for id in ids {
            let other_user = sqlx::query_as::<_, UserSummary>(
                r#"
                SELECT u.id, u.name, u.email, u.image, u.user_type
                FROM conversation_participants p
                JOIN users u ON u.id = p.user_id
                WHERE p.conversation_id = ? AND p.user_id != ?
                "#,
            )
            .bind(&id)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;

            let last_message = sqlx::query_as::<_, LastMessage>(
                r#"
                SELECT id, content, sent_at AS created_at, is_read, sender_id
                FROM messages WHERE conversation_id = ?
                ORDER BY sent_at DESC, rowid DESC LIMIT 1
                "#,
            )
            .bind(&id)
            .fetch_optional(&self.pool)
            .await?;

            let unread_count: i64 = sqlx::query_scalar(
                "SELECT COUNT(*) FROM messages WHERE conversation_id = ? AND sender_id != ? AND is_read = FALSE",
            )
            .bind(&id)
            .bind(user_id)
            .fetch_one(&self.pool)
            .await?;

            conversations.push(ConversationSummary {
                id,
                other_user,
                last_message,
                unread_count,
            });
        }

        Ok(conversations)
    }

    /// Send `content` to a user, addressed by user id or worker profile id.
    pub async fn send_message(&self, sender: &User, request: SendMessage) -> Result<MessageView, MarketplaceError> {
        let receiver_id = request.receiver_id.trim();
        let content = request.content.trim();
        if receiver_id.is_empty() || content.is_empty() {
            return Err(MarketplaceError::ValidationError(
                "Receiver ID and content are required".to_string(),
            ));
        }

        let receiver = self.resolve_receiver(receiver_id).await?;
        if receiver == sender.id {
            return Err(MarketplaceError::ValidationError(
                "You cannot send a message to yourself".to_string(),
            ));
        }

        let now = Utc::now();
        let mut tx = self.pool.begin().await?;

        // The insert comes first so the transaction holds the write lock
        // before looking the pair up.
        let pair = pair_key(&sender.id, &receiver);
        sqlx::query(
            "INSERT INTO conversations (id, pair_key, created_at, updated_at) VALUES (?, ?, ?, ?) ON CONFLICT(pair_key) DO NOTHING",
        )
        .bind(new_id())
        .bind(&pair)
        .bind(now)
        .bind(now)
        .execute(&mut *tx)
        .await?;
        let conversation_id: String = sqlx::query_scalar("SELECT id FROM conversations WHERE pair_key = ?")
            .bind(&pair)
            .fetch_one(&mut *tx)
            .await?;
        for participant in [&sender.id, &receiver] {
            sqlx::query("INSERT OR IGNORE INTO conversation_participants (conversation_id, user_id) VALUES (?, ?)")
                .bind(&conversation_id)
                .bind(participant)
                .execute(&mut *tx)
                .await?;
        }

        let message_id = new_id();
        sqlx::query(
            "INSERT INTO messages (id, conversation_id, sender_id, content, is_read, sent_at) VALUES (?, ?, ?, ?, FALSE, ?)",
        )
        .bind(&message_id)
        .bind(&conversation_id)
        .bind(&sender.id)
        .bind(content)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        sqlx::query("UPDATE conversations SET updated_at = ? WHERE id = ?")
            .bind(now)
            .bind(&conversation_id)
            .execute(&mut *tx)
            .await?;

        let from = sender.name.as_deref().unwrap_or(&sender.email);
        NewNotification::new(
            &receiver,
            NotificationType::Message,
            "New Message",
            format!("You have a new message from {}", from),
        )
        .link("/messages")
        .insert(&mut *tx)
        .await?;

        let message = sqlx::query_as::<_, MessageRow>(&format!("{} WHERE m.id = ?", MESSAGE_SELECT))
            .bind(&message_id)
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;
        info!("Message {} sent in conversation {}", message_id, conversation_id);
        Ok(message.into())
    }

    async fn resolve_receiver(&self, receiver_id: &str) -> Result<String, MarketplaceError> {
        let user: Option<String> = sqlx::query_scalar("SELECT id FROM users WHERE id = ?")
            .bind(receiver_id)
            .fetch_optional(&self.pool)
            .await?;
        if let Some(id) = user {
            return Ok(id);
        }

        let worker_user: Option<String> = sqlx::query_scalar("SELECT user_id FROM worker_profiles WHERE id = ?")
            .bind(receiver_id)
            .fetch_optional(&self.pool)
            .await?;
        worker_user.ok_or_else(|| MarketplaceError::not_found("Receiver"))
    }

    /// Messages with `other_user_id`, oldest first. Their messages to the
    /// caller are marked read.
    pub async fn get_conversation(
        &self,
        user_id: &str,
        other_user_id: &str,
        page: Option<i64>,
        limit: Option<i64>,
    ) -> Result<ConversationThread, MarketplaceError> {
        let other_user = self.correspondent(other_user_id).await?;

        let mut conn = self.pool.acquire().await?;
        let Some(conversation_id) = find_conversation(&mut conn, user_id, other_user_id).await? else {
            return Ok(ConversationThread {
                messages: Vec::new(),
                other_user,
            });
        };

        sqlx::query("UPDATE messages SET is_read = TRUE WHERE conversation_id = ? AND sender_id = ? AND is_read = FALSE")
            .bind(&conversation_id)
            .bind(other_user_id)
            .execute(&mut *conn)
            .await?;

        let (page, limit) = Pagination::window(page, limit, DEFAULT_THREAD_PAGE_SIZE);
        let rows = sqlx::query_as::<_, MessageRow>(&format!(
            "{} WHERE m.conversation_id = ? ORDER BY m.sent_at ASC, m.rowid ASC LIMIT ? OFFSET ?",
            MESSAGE_SELECT
        ))
        .bind(&conversation_id)
        .bind(limit)
        .bind(Pagination::offset_for(page, limit))
        .fetch_all(&mut *conn)
        .await?;

        Ok(ConversationThread {
            messages: rows.into_iter().map(MessageView::from).collect(),
            other_user,
        })
    }

    async fn correspondent(&self, user_id: &str) -> Result<Correspondent, MarketplaceError> {
        let user = sqlx::query_as::<_, UserSummary>("SELECT id, name, email, image, user_type FROM users WHERE id = ?")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| MarketplaceError::not_found("User"))?;

        let worker_profile = sqlx::query_as::<_, WorkerName>(
            "SELECT id, first_name, last_name, headline FROM worker_profiles WHERE user_id = ?",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        let business_profile =
            sqlx::query_as::<_, BusinessName>("SELECT id, company_name FROM business_profiles WHERE user_id = ?")
                .bind(user_id)
                .fetch_optional(&self.pool)
                .await?;

        Ok(Correspondent {
            user,
            worker_profile,
            business_profile,
        })
    }
}

/// Order-independent key for a pair of users.
fn pair_key(a: &str, b: &str) -> String {
    if a <= b {
        format!("{}:{}", a, b)
    } else {
        format!("{}:{}", b, a)
    }
}

/// The oldest conversation both users take part in.
async fn find_conversation(
    conn: &mut SqliteConnection,
    user_id: &str,
    other_user_id: &str,
) -> Result<Option<String>, MarketplaceError> {
    let id: Option<String> = sqlx::query_scalar(
        r#"
        SELECT c.id FROM conversations c
        JOIN conversation_participants a ON a.conversation_id = c.id AND a.user_id = ?
        JOIN conversation_participants b ON b.conversation_id = c.id AND b.user_id = ?
        ORDER BY c.created_at ASC, c.rowid ASC
        LIMIT 1
        "#,
    )
    .bind(user_id)
    .bind(other_user_id)
    .fetch_optional(conn)
    .await?;
    Ok(id)
}
