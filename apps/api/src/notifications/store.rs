use sqlx::{PgExecutor, PgPool};
use uuid::Uuid;

use crate::models::notification::{Notification, NotificationType};
use crate::notifications::composer::ComposedMessage;

pub async fn insert_notification<'e>(
    executor: impl PgExecutor<'e>,
    user_id: Uuid,
    kind: NotificationType,
    message: &ComposedMessage,
) -> Result<Notification, sqlx::Error> {
    sqlx::query_as::<_, Notification>(
        r#"
        INSERT INTO notifications (user_id, type, ai_generated_content, sentiment_score)
        VALUES ($1, $2, $3, $4)
        RETURNING *
        "#,
    )
    .bind(user_id)
    .bind(kind.as_str())
    .bind(&message.content)
    .bind(message.sentiment)
    .fetch_one(executor)
    .await
}

/// Writes one notification per `(recipient, message)` pair. All rows land or none do.
pub async fn insert_batch(
    pool: &PgPool,
    kind: NotificationType,
    messages: &[(Uuid, ComposedMessage)],
) -> Result<Vec<Notification>, sqlx::Error> {
    let mut tx = pool.begin().await?;
    let mut written = Vec::with_capacity(messages.len());
    for (user_id, message) in messages {
        written.push(insert_notification(&mut *tx, *user_id, kind, message).await?);
    }
    tx.commit().await?;
    Ok(written)
}

/// Newest first.
pub async fn list_for_user(pool: &PgPool, user_id: Uuid, limit: i64) -> Result<Vec<Notification>, sqlx::Error> {
    sqlx::query_as::<_, Notification>(
        "SELECT * FROM notifications WHERE user_id = $1 ORDER BY sent_at DESC LIMIT $2",
    )
    .bind(user_id)
    .bind(limit)
    .fetch_all(pool)
    .await
}

/// Stamps `opened_at` the first time; later calls keep the original time.
pub async fn mark_opened(pool: &PgPool, id: Uuid) -> Result<Option<Notification>, sqlx::Error> {
    sqlx::query_as::<_, Notification>(
        r#"
        UPDATE notifications
        SET opened_at = COALESCE(opened_at, now())
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await
}

#[cfg(all(test, feature = "live-db-tests"))]
mod tests {
    use super::*;
    use crate::models::user::NotificationPreference;
    use crate::test_support::{integration_pool, seed_user};

    fn message(content: &str) -> ComposedMessage {
        ComposedMessage {
            content: content.to_string(),
            sentiment: None,
        }
    }

    #[tokio::test]
    #[ignore = "requires TEST_DATABASE_URL/live Postgres"]
    async fn test_batch_rolls_back_when_one_row_fails() {
        let pool = integration_pool().await;
        let author = seed_user(&pool, NotificationPreference::HighTouch).await;

        // Second recipient does not exist, so its insert breaks the foreign key
        let messages = vec![
            (author.id, message("You did it!")),
            (Uuid::new_v4(), message("Send some encouragement!")),
        ];
        let result = insert_batch(&pool, NotificationType::CompletionCelebration, &messages).await;
        assert!(result.is_err());

        let written = list_for_user(&pool, author.id, 10)
            .await
            .expect("list_for_user should succeed");
        assert!(written.is_empty());
    }

    #[tokio::test]
    #[ignore = "requires TEST_DATABASE_URL/live Postgres"]
    async fn test_mark_opened_keeps_first_time() {
        let pool = integration_pool().await;
        let user = seed_user(&pool, NotificationPreference::LowTouch).await;
        let note = insert_notification(
            &pool,
            user.id,
            NotificationType::MidweekCheckin,
            &message("How is the week going?"),
        )
        .await
        .expect("insert_notification should succeed");
        assert!(note.opened_at.is_none());

        let first = mark_opened(&pool, note.id)
            .await
            .expect("mark_opened should succeed")
            .expect("notification should exist");
        let second = mark_opened(&pool, note.id)
            .await
            .expect("mark_opened should succeed")
            .expect("notification should exist");
        assert!(first.opened_at.is_some());
        assert_eq!(first.opened_at, second.opened_at);
    }
}
