use sqlx::PgPool;
use tracing::info;

use crate::errors::AppError;
use crate::models::commitment::Commitment;
use crate::models::notification::{Notification, NotificationType};
use crate::models::user::{NotificationPreference, User};
use crate::notifications::composer::{CelebrationContext, MessageComposer};
use crate::notifications::store;
use crate::pods;
use crate::users;

/// Who hears about a completion: the author always, pod mates only if high-touch.
pub fn celebration_recipients(author: &User, pod_members: Vec<User>) -> Vec<User> {
    let mut recipients = vec![author.clone()];
    recipients.extend(pod_members.into_iter().filter(|member| {
        member.id != author.id
            && member.notification_preference == NotificationPreference::HighTouch
    }));
    recipients
}

/// Records one completion celebration per recipient in a single transaction.
/// Returns the notifications written.
pub async fn notify_completion(
    pool: &PgPool,
    composer: &dyn MessageComposer,
    commitment: &Commitment,
) -> Result<Vec<Notification>, AppError> {
    let author = users::store::get_user(pool, commitment.user_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("User {} not found", commitment.user_id)))?;

    let pod_members = match commitment.pod_id {
        Some(pod_id) => pods::store::active_members(pool, pod_id).await?,
        None => Vec::new(),
    };
    let recipients = celebration_recipients(&author, pod_members);

    // Every message is composed before the first write
    let mut messages = Vec::with_capacity(recipients.len());
    for recipient in &recipients {
        let message = composer
            .celebration(&CelebrationContext {
                recipient,
                author: &author,
                commitment_text: &commitment.text,
            })
            .await;
        messages.push((recipient.id, message));
    }

    let sent = store::insert_batch(pool, NotificationType::CompletionCelebration, &messages).await?;

    info!(
        "Recorded {} completion notifications for commitment {} via {} composer",
        sent.len(),
        commitment.id,
        composer.backend()
    );
    Ok(sent)
}
