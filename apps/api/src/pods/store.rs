use chrono::{DateTime, Utc};
use sqlx::{PgExecutor, PgPool};
use tracing::info;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::attendance::CallAttendance;
use crate::models::pod::{Pod, PodMembership};
use crate::models::user::User;

/// Membership columns with `weeks_active` derived from the join/leave window.
const MEMBERSHIP_COLUMNS: &str = r#"
    id, user_id, pod_id, joined_at, left_at, is_active,
    GREATEST(0, FLOOR(EXTRACT(EPOCH FROM (COALESCE(left_at, now()) - joined_at)) / 604800))::INT4
        AS weeks_active
"#;

pub struct NewPod<'a> {
    pub name: &'a str,
    pub leader_id: Option<Uuid>,
    pub max_size: i32,
    pub call_day: Option<&'a str>,
    pub call_time: Option<&'a str>,
    pub jitsi_room_id: Option<&'a str>,
    pub revenue_share_enabled: bool,
    pub revenue_share_percentage: f64,
}

pub async fn insert_pod<'e>(executor: impl PgExecutor<'e>, new: NewPod<'_>) -> Result<Pod, sqlx::Error> {
    sqlx::query_as::<_, Pod>(
        r#"
        INSERT INTO pods
            (name, leader_id, max_size, call_day, call_time, jitsi_room_id,
             revenue_share_enabled, revenue_share_percentage)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        RETURNING *
        "#,
    )
    .bind(new.name)
    .bind(new.leader_id)
    .bind(new.max_size)
    .bind(new.call_day)
    .bind(new.call_time)
    .bind(new.jitsi_room_id)
    .bind(new.revenue_share_enabled)
    .bind(new.revenue_share_percentage)
    .fetch_one(executor)
    .await
}

pub async fn get_pod<'e>(executor: impl PgExecutor<'e>, pod_id: Uuid) -> Result<Option<Pod>, sqlx::Error> {
    sqlx::query_as::<_, Pod>("SELECT * FROM pods WHERE id = $1")
        .bind(pod_id)
        .fetch_optional(executor)
        .await
}

/// The pod owned by the scoreboard import, row-locked until the transaction ends.
pub async fn lock_import_pod<'e>(executor: impl PgExecutor<'e>) -> Result<Option<Pod>, sqlx::Error> {
    sqlx::query_as::<_, Pod>("SELECT * FROM pods WHERE is_import FOR UPDATE")
        .fetch_optional(executor)
        .await
}

pub async fn mark_import_pod<'e>(executor: impl PgExecutor<'e>, pod_id: Uuid) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE pods SET is_import = TRUE WHERE id = $1")
        .bind(pod_id)
        .execute(executor)
        .await?;
    Ok(())
}

pub async fn count_active_members<'e>(executor: impl PgExecutor<'e>, pod_id: Uuid) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar("SELECT COUNT(*) FROM pod_memberships WHERE pod_id = $1 AND is_active")
        .bind(pod_id)
        .fetch_one(executor)
        .await
}

pub async fn set_max_size<'e>(
    executor: impl PgExecutor<'e>,
    pod_id: Uuid,
    max_size: i32,
) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE pods SET max_size = $1 WHERE id = $2")
        .bind(max_size)
        .bind(pod_id)
        .execute(executor)
        .await?;
    Ok(())
}

pub async fn active_membership<'e>(
    executor: impl PgExecutor<'e>,
    pod_id: Uuid,
    user_id: Uuid,
) -> Result<Option<PodMembership>, sqlx::Error> {
    sqlx::query_as::<_, PodMembership>(&format!(
        "SELECT {MEMBERSHIP_COLUMNS} FROM pod_memberships \
         WHERE pod_id = $1 AND user_id = $2 AND is_active"
    ))
    .bind(pod_id)
    .bind(user_id)
    .fetch_optional(executor)
    .await
}

/// Inserts an active membership without checking capacity. Callers hold the pod lock.
pub async fn insert_membership<'e>(
    executor: impl PgExecutor<'e>,
    pod_id: Uuid,
    user_id: Uuid,
    joined_at: Option<DateTime<Utc>>,
) -> Result<PodMembership, sqlx::Error> {
    sqlx::query_as::<_, PodMembership>(&format!(
        "INSERT INTO pod_memberships (pod_id, user_id, joined_at) \
         VALUES ($1, $2, COALESCE($3, now())) RETURNING {MEMBERSHIP_COLUMNS}"
    ))
    .bind(pod_id)
    .bind(user_id)
    .bind(joined_at)
    .fetch_one(executor)
    .await
}

/// Adds a user to a pod, enforcing one active membership and the pod's max size.
pub async fn join_pod(pool: &PgPool, pod_id: Uuid, user_id: Uuid) -> Result<PodMembership, AppError> {
    let mut tx = pool.begin().await?;

    // Row lock serializes concurrent joins against the capacity check
    let pod = sqlx::query_as::<_, Pod>("SELECT * FROM pods WHERE id = $1 FOR UPDATE")
        .bind(pod_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Pod {pod_id} not found")))?;

    if active_membership(&mut *tx, pod_id, user_id).await?.is_some() {
        return Err(AppError::Conflict(format!(
            "User {user_id} is already an active member of pod {pod_id}"
        )));
    }

    let active = count_active_members(&mut *tx, pod_id).await?;

    if active >= i64::from(pod.max_size) {
        return Err(AppError::UnprocessableEntity(format!(
            "Pod {pod_id} is full ({active}/{})",
            pod.max_size
        )));
    }

    let membership = insert_membership(&mut *tx, pod_id, user_id, None).await?;
    tx.commit().await?;

    info!("User {user_id} joined pod {pod_id}");
    Ok(membership)
}

/// Ends the active membership. History rows are kept.
pub async fn leave_pod(
    pool: &PgPool,
    pod_id: Uuid,
    user_id: Uuid,
) -> Result<Option<PodMembership>, sqlx::Error> {
    let membership = sqlx::query_as::<_, PodMembership>(&format!(
        "UPDATE pod_memberships SET is_active = FALSE, left_at = now() \
         WHERE pod_id = $1 AND user_id = $2 AND is_active \
         RETURNING {MEMBERSHIP_COLUMNS}"
    ))
    .bind(pod_id)
    .bind(user_id)
    .fetch_optional(pool)
    .await?;

    if membership.is_some() {
        info!("User {user_id} left pod {pod_id}");
    }
    Ok(membership)
}

pub async fn memberships_for_user(pool: &PgPool, user_id: Uuid) -> Result<Vec<PodMembership>, sqlx::Error> {
    sqlx::query_as::<_, PodMembership>(&format!(
        "SELECT {MEMBERSHIP_COLUMNS} FROM pod_memberships \
         WHERE user_id = $1 AND is_active ORDER BY joined_at ASC"
    ))
    .bind(user_id)
    .fetch_all(pool)
    .await
}

pub async fn active_members(pool: &PgPool, pod_id: Uuid) -> Result<Vec<User>, sqlx::Error> {
    sqlx::query_as::<_, User>(
        r#"
        SELECT u.*
        FROM users u
        JOIN pod_memberships m ON m.user_id = u.id
        WHERE m.pod_id = $1 AND m.is_active
        ORDER BY m.joined_at ASC
        "#,
    )
    .bind(pod_id)
    .fetch_all(pool)
    .await
}

pub struct NewAttendance<'a> {
    pub user_id: Uuid,
    pub pod_id: Uuid,
    pub scheduled_at: DateTime<Utc>,
    pub attended: bool,
    pub video_update_url: Option<&'a str>,
}

pub async fn insert_attendance<'e>(
    executor: impl PgExecutor<'e>,
    new: NewAttendance<'_>,
) -> Result<CallAttendance, sqlx::Error> {
    sqlx::query_as::<_, CallAttendance>(
        r#"
        INSERT INTO call_attendance (user_id, pod_id, scheduled_at, attended, video_update_url)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING *
        "#,
    )
    .bind(new.user_id)
    .bind(new.pod_id)
    .bind(new.scheduled_at)
    .bind(new.attended)
    .bind(new.video_update_url)
    .fetch_one(executor)
    .await
}

/// Number of pods with at least one active member.
pub async fn count_active_pods(pool: &PgPool) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar("SELECT COUNT(DISTINCT pod_id) FROM pod_memberships WHERE is_active")
        .fetch_one(pool)
        .await
}

#[cfg(all(test, feature = "live-db-tests"))]
mod tests {
    use super::*;
    use crate::models::user::NotificationPreference;
    use crate::test_support::{integration_pool, seed_pod, seed_user};

    #[tokio::test]
    #[ignore = "requires TEST_DATABASE_URL/live Postgres"]
    async fn test_join_rejects_full_pod() {
        let pool = integration_pool().await;
        let pod = seed_pod(&pool, 2).await;
        for _ in 0..2 {
            let user = seed_user(&pool, NotificationPreference::HighTouch).await;
            join_pod(&pool, pod.id, user.id)
                .await
                .expect("join under capacity should succeed");
        }

        let late = seed_user(&pool, NotificationPreference::HighTouch).await;
        let err = join_pod(&pool, pod.id, late.id)
            .await
            .expect_err("third member should not fit");
        assert!(matches!(err, AppError::UnprocessableEntity(_)));
        assert_eq!(count_active_members(&pool, pod.id).await.unwrap(), 2);
    }

    #[tokio::test]
    #[ignore = "requires TEST_DATABASE_URL/live Postgres"]
    async fn test_join_twice_conflicts() {
        let pool = integration_pool().await;
        let pod = seed_pod(&pool, 8).await;
        let user = seed_user(&pool, NotificationPreference::LowTouch).await;

        join_pod(&pool, pod.id, user.id)
            .await
            .expect("first join should succeed");
        let err = join_pod(&pool, pod.id, user.id)
            .await
            .expect_err("second join should conflict");
        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[tokio::test]
    #[ignore = "requires TEST_DATABASE_URL/live Postgres"]
    async fn test_leave_keeps_history_and_allows_rejoin() {
        let pool = integration_pool().await;
        let pod = seed_pod(&pool, 8).await;
        let user = seed_user(&pool, NotificationPreference::HighTouch).await;

        join_pod(&pool, pod.id, user.id)
            .await
            .expect("join should succeed");
        let left = leave_pod(&pool, pod.id, user.id)
            .await
            .expect("leave should succeed")
            .expect("membership should exist");
        assert!(!left.is_active);
        assert!(left.left_at.is_some());

        assert!(leave_pod(&pool, pod.id, user.id)
            .await
            .expect("second leave should succeed")
            .is_none());

        join_pod(&pool, pod.id, user.id)
            .await
            .expect("rejoin should succeed");
        let rows: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM pod_memberships WHERE pod_id = $1 AND user_id = $2",
        )
        .bind(pod.id)
        .bind(user.id)
        .fetch_one(&pool)
        .await
        .expect("count should succeed");
        assert_eq!(rows, 2);
        assert_eq!(memberships_for_user(&pool, user.id).await.unwrap().len(), 1);
    }
}
