use chrono::{DateTime, Utc};
use sqlx::{PgExecutor, PgPool};
use tracing::info;
use uuid::Uuid;

use crate::commitments::week::IsoWeek;
use crate::models::commitment::{Commitment, PlanningHorizon};

/// Fields for a new commitment row. Validation happens before this point.
pub struct NewCommitment<'a> {
    pub user_id: Uuid,
    pub pod_id: Option<Uuid>,
    pub text: &'a str,
    pub week: IsoWeek,
    pub planning_horizon: PlanningHorizon,
    pub device_created_at: Option<DateTime<Utc>>,
}

pub async fn insert_commitment<'e>(
    executor: impl PgExecutor<'e>,
    new: NewCommitment<'_>,
) -> Result<Commitment, sqlx::Error> {
    let commitment = sqlx::query_as::<_, Commitment>(
        r#"
        INSERT INTO commitments
            (user_id, pod_id, text, week_number, year, device_created_at, planning_horizon)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        RETURNING *
        "#,
    )
    .bind(new.user_id)
    .bind(new.pod_id)
    .bind(new.text)
    .bind(new.week.week_i32())
    .bind(new.week.year)
    .bind(new.device_created_at)
    .bind(new.planning_horizon.as_str())
    .fetch_one(executor)
    .await?;

    info!(
        "Created commitment {} for user {} (week {}/{})",
        commitment.id, commitment.user_id, commitment.week_number, commitment.year
    );
    Ok(commitment)
}

/// Marks a commitment complete. A second call leaves `completed_at` untouched.
pub async fn complete_commitment(pool: &PgPool, id: Uuid) -> Result<Option<Commitment>, sqlx::Error> {
    sqlx::query_as::<_, Commitment>(
        r#"
        UPDATE commitments
        SET is_completed = TRUE,
            completed_at = COALESCE(completed_at, now())
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await
}

pub async fn get_commitment(pool: &PgPool, id: Uuid) -> Result<Option<Commitment>, sqlx::Error> {
    sqlx::query_as::<_, Commitment>("SELECT * FROM commitments WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
}

pub async fn list_for_week(
    pool: &PgPool,
    user_id: Uuid,
    week: IsoWeek,
) -> Result<Vec<Commitment>, sqlx::Error> {
    sqlx::query_as::<_, Commitment>(
        r#"
        SELECT * FROM commitments
        WHERE user_id = $1 AND year = $2 AND week_number = $3
        ORDER BY created_at ASC, id ASC
        "#,
    )
    .bind(user_id)
    .bind(week.year)
    .bind(week.week_i32())
    .fetch_all(pool)
    .await
}

/// Stamps `synced_at` on every commitment of the user not yet synced. Returns the count.
pub async fn mark_synced(pool: &PgPool, user_id: Uuid) -> Result<u64, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE commitments SET synced_at = now() WHERE user_id = $1 AND synced_at IS NULL",
    )
    .bind(user_id)
    .execute(pool)
    .await?;
    Ok(result.rows_affected())
}

/// All commitments planned for `week`, across users.
pub async fn count_for_week(pool: &PgPool, week: IsoWeek) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar("SELECT COUNT(*) FROM commitments WHERE year = $1 AND week_number = $2")
        .bind(week.year)
        .bind(week.week_i32())
        .fetch_one(pool)
        .await
}
