mod common;

use common::*;
use gigit::database::models::NotificationType;
use gigit::database::Database;
use gigit::error::MarketplaceError;
use gigit::messaging::{Inbox, SendMessage};
use gigit::notifications::{NewNotification, NotificationCenter};

fn message(to: &str, content: &str) -> SendMessage {
    SendMessage {
        receiver_id: to.to_string(),
        content: content.to_string(),
    }
}

#[tokio::test]
async fn test_send_message_creates_single_conversation() -> Result<(), Box<dyn std::error::Error>> {
    let db = setup_test_db().await;
    let (owner, _) = create_business(&db, "owner@acme.test", "Acme").await;
    let (worker_user, worker) = create_worker(&db, "worker@example.com", "Sam", "Reyes").await;
    let inbox = Inbox::new(db.pool().clone());

    // Worker profile ids are accepted as receivers.
    let first = inbox.send_message(&owner, message(&worker.id, "Are you free Monday?")).await?;
    let reply = inbox.send_message(&worker_user, message(&owner.id, "  Yes, all day  ")).await?;

    assert_eq!(first.conversation_id, reply.conversation_id);
    assert_eq!(reply.content, "Yes, all day");
    assert_eq!(reply.sender.name.as_deref(), Some("Sam Reyes"));

    let conversations = inbox.list_conversations(&owner.id).await?;
    assert_eq!(conversations.len(), 1);
    let summary = &conversations[0];
    assert_eq!(summary.other_user.as_ref().map(|u| u.id.as_str()), Some(worker_user.id.as_str()));
    assert_eq!(summary.last_message.as_ref().map(|m| m.content.as_str()), Some("Yes, all day"));
    assert_eq!(summary.unread_count, 1);

    let notes = NotificationCenter::new(db.pool().clone())
        .list(&worker_user.id, 1, 20, false)
        .await?;
    assert_eq!(notes.notifications[0].notification_type, NotificationType::Message);
    assert_eq!(notes.notifications[0].message, "You have a new message from Acme");
    Ok(())
}

#[tokio::test]
async fn test_concurrent_first_messages_share_conversation() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    let url = format!("sqlite://{}", dir.path().join("inbox.db").display());
    let db = Database::new(&url, 4).await?;
    db.run_migrations().await?;
    let (owner, _) = create_business(&db, "owner@acme.test", "Acme").await;
    let (worker_user, _) = create_worker(&db, "worker@example.com", "Sam", "Reyes").await;
    let inbox = Inbox::new(db.pool().clone());

    let (a, b) = tokio::join!(
        inbox.send_message(&owner, message(&worker_user.id, "Can you start Monday?")),
        inbox.send_message(&worker_user, message(&owner.id, "Is the job still open?")),
    );
    assert_eq!(a?.conversation_id, b?.conversation_id);

    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM conversations")
        .fetch_one(db.pool())
        .await?;
    assert_eq!(count, 1);
    assert_eq!(inbox.list_conversations(&owner.id).await?[0].unread_count, 1);

    let pair: String = sqlx::query_scalar("SELECT pair_key FROM conversations")
        .fetch_one(db.pool())
        .await?;
    let duplicate = sqlx::query(
        "INSERT INTO conversations (id, pair_key, created_at, updated_at) VALUES ('dup', ?, '2024-01-01', '2024-01-01')",
    )
    .bind(&pair)
    .execute(db.pool())
    .await;
    assert!(duplicate.is_err());
    Ok(())
}

#[tokio::test]
async fn test_send_message_validation() -> Result<(), Box<dyn std::error::Error>> {
    let db = setup_test_db().await;
    let (owner, _) = create_business(&db, "owner@acme.test", "Acme").await;
    let inbox = Inbox::new(db.pool().clone());

    let blank = inbox.send_message(&owner, message(&owner.id, "   ")).await;
    match blank {
        Err(MarketplaceError::ValidationError(msg)) => assert_eq!(msg, "Receiver ID and content are required"),
        other => panic!("expected validation error, got {:?}", other),
    }

    let to_self = inbox.send_message(&owner, message(&owner.id, "hello me")).await;
    match to_self {
        Err(MarketplaceError::ValidationError(msg)) => assert_eq!(msg, "You cannot send a message to yourself"),
        other => panic!("expected validation error, got {:?}", other),
    }

    let unknown = inbox.send_message(&owner, message("nobody", "hello?")).await;
    assert!(matches!(unknown, Err(MarketplaceError::NotFoundError(_))));
    Ok(())
}

#[tokio::test]
async fn test_get_conversation_marks_read() -> Result<(), Box<dyn std::error::Error>> {
    let db = setup_test_db().await;
    let (owner, _) = create_business(&db, "owner@acme.test", "Acme").await;
    let (worker_user, _) = create_worker(&db, "worker@example.com", "Sam", "Reyes").await;
    let (stranger, _) = create_worker(&db, "stranger@example.com", "Lou", "Tan").await;
    let inbox = Inbox::new(db.pool().clone());

    inbox.send_message(&owner, message(&worker_user.id, "one")).await?;
    inbox.send_message(&owner, message(&worker_user.id, "two")).await?;
    inbox.send_message(&worker_user, message(&owner.id, "three")).await?;

    let thread = inbox.get_conversation(&worker_user.id, &owner.id, None, None).await?;
    let contents: Vec<&str> = thread.messages.iter().map(|m| m.content.as_str()).collect();
    assert_eq!(contents, vec!["one", "two", "three"]);
    assert_eq!(thread.other_user.business_profile.as_ref().map(|b| b.company_name.as_str()), Some("Acme"));
    assert!(thread.messages.iter().filter(|m| m.sender_id == owner.id).all(|m| m.is_read));

    let worker_view = inbox.list_conversations(&worker_user.id).await?;
    assert_eq!(worker_view[0].unread_count, 0);
    let owner_view = inbox.list_conversations(&owner.id).await?;
    assert_eq!(owner_view[0].unread_count, 1);

    let page = inbox.get_conversation(&worker_user.id, &owner.id, Some(2), Some(2)).await?;
    assert_eq!(page.messages.len(), 1);
    assert_eq!(page.messages[0].content, "three");

    let beyond = inbox.get_conversation(&worker_user.id, &owner.id, Some(i64::MAX), Some(50)).await?;
    assert!(beyond.messages.is_empty());

    let empty = inbox.get_conversation(&worker_user.id, &stranger.id, None, None).await?;
    assert!(empty.messages.is_empty());
    assert_eq!(empty.other_user.worker_profile.as_ref().map(|w| w.first_name.as_str()), Some("Lou"));

    let missing = inbox.get_conversation(&worker_user.id, "missing", None, None).await;
    assert!(matches!(missing, Err(MarketplaceError::NotFoundError(_))));
    Ok(())
}

#[tokio::test]
async fn test_notification_center() -> Result<(), Box<dyn std::error::Error>> {
    let db = setup_test_db().await;
    let (user, _) = create_worker(&db, "worker@example.com", "Sam", "Reyes").await;
    let (other, _) = create_worker(&db, "other@example.com", "Jo", "March").await;
    let center = NotificationCenter::new(db.pool().clone());

    let mut ids = Vec::new();
    for i in 0..3 {
        let id = NewNotification::new(&user.id, NotificationType::System, format!("Notice {}", i), "Body")
            .link("/dashboard")
            .insert(db.pool())
            .await?;
        ids.push(id);
    }
    assert_eq!(center.unread_count(&user.id).await?, 3);

    center.mark_read(&user.id, &ids[0]).await?;
    assert_eq!(center.unread_count(&user.id).await?, 2);

    let unread = center.list(&user.id, 1, 20, true).await?;
    assert_eq!(unread.pagination.total, 2);
    assert_eq!(unread.notifications[0].title, "Notice 2");

    // Other users cannot touch someone else's notifications.
    assert!(matches!(
        center.mark_read(&other.id, &ids[1]).await,
        Err(MarketplaceError::NotFoundError(_))
    ));
    assert!(matches!(
        center.delete(&other.id, &ids[1]).await,
        Err(MarketplaceError::NotFoundError(_))
    ));

    assert_eq!(center.mark_all_read(&user.id).await?, 2);
    assert_eq!(center.unread_count(&user.id).await?, 0);

    center.delete(&user.id, &ids[2]).await?;
    let page = center.list(&user.id, 1, 2, false).await?;
    assert_eq!(page.pagination.total, 2);
    assert_eq!(page.pagination.total_pages, 1);
    Ok(())
}
