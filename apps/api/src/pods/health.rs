use chrono::{DateTime, Duration, Utc};
use sqlx::{FromRow, PgPool};
use tracing::info;

use crate::config::HealthConfig;
use crate::models::pod::{Pod, PodHealth};

/// Pods quiet for longer than this need a nudge regardless of their score.
pub const MAX_QUIET_DAYS: i64 = 14;

const ATTENDANCE_WEIGHT: f64 = 0.5;
const COMPLETION_WEIGHT: f64 = 0.5;

/// Raw activity counts for one pod over the health window.
#[derive(Debug, Clone, Default, FromRow)]
pub struct HealthInputs {
    pub scheduled_calls: i64,
    pub attended_calls: i64,
    pub commitments: i64,
    pub completed: i64,
    pub last_activity: Option<DateTime<Utc>>,
}

fn ratio(part: i64, whole: i64) -> f64 {
    if whole <= 0 {
        return 0.0;
    }
    (part as f64 / whole as f64).clamp(0.0, 1.0)
}

/// Scores a pod from its activity counts.
///
/// health = round(100 × (0.5 × attendance + 0.5 × completion)). A pod needs
/// intervention when its score is under the configured threshold or nothing
/// has happened in it for `MAX_QUIET_DAYS`.
pub fn compute_pod_health(
    pod: &Pod,
    inputs: &HealthInputs,
    config: &HealthConfig,
    now: DateTime<Utc>,
) -> PodHealth {
    let attendance_rate = ratio(inputs.attended_calls, inputs.scheduled_calls);
    let completion_rate = ratio(inputs.completed, inputs.commitments);
    let health_score = (100.0
        * (ATTENDANCE_WEIGHT * attendance_rate + COMPLETION_WEIGHT * completion_rate))
        .round()
        .clamp(0.0, 100.0);

    let last_activity = inputs.last_activity.unwrap_or(pod.created_at);
    let quiet = now - last_activity > Duration::days(MAX_QUIET_DAYS);

    PodHealth {
        pod_id: pod.id,
        health_score,
        attendance_rate,
        completion_rate,
        last_activity,
        needs_intervention: health_score < config.intervention_threshold || quiet,
    }
}

async fn load_inputs(
    pool: &PgPool,
    pod: &Pod,
    window_start: DateTime<Utc>,
) -> Result<HealthInputs, sqlx::Error> {
    sqlx::query_as::<_, HealthInputs>(
        r#"
        SELECT
            (SELECT COUNT(*) FROM call_attendance
              WHERE pod_id = $1 AND scheduled_at >= $2 AND scheduled_at <= now())
                AS scheduled_calls,
            (SELECT COUNT(*) FROM call_attendance
              WHERE pod_id = $1 AND scheduled_at >= $2 AND scheduled_at <= now() AND attended)
                AS attended_calls,
            (SELECT COUNT(*) FROM commitments
              WHERE pod_id = $1 AND created_at >= $2)
                AS commitments,
            (SELECT COUNT(*) FROM commitments
              WHERE pod_id = $1 AND created_at >= $2 AND is_completed)
                AS completed,
            GREATEST(
                (SELECT MAX(scheduled_at) FROM call_attendance
                  WHERE pod_id = $1 AND attended AND scheduled_at <= now()),
                (SELECT MAX(GREATEST(created_at, completed_at)) FROM commitments
                  WHERE pod_id = $1)
            ) AS last_activity
        "#,
    )
    .bind(pod.id)
    .bind(window_start)
    .fetch_one(pool)
    .await
}

/// Computes a pod's health over the configured window and records the score on the pod.
pub async fn evaluate_pod_health(
    pool: &PgPool,
    pod: &Pod,
    config: &HealthConfig,
) -> Result<PodHealth, sqlx::Error> {
    let now = Utc::now();
    let window_start = now - Duration::weeks(i64::from(config.window_weeks));
    let inputs = load_inputs(pool, pod, window_start).await?;
    let health = compute_pod_health(pod, &inputs, config, now);

    sqlx::query("UPDATE pods SET health_score = $1, last_health_check = $2 WHERE id = $3")
        .bind(health.health_score)
        .bind(now)
        .bind(pod.id)
        .execute(pool)
        .await?;

    info!(
        "Pod {} health {} (attendance {:.2}, completion {:.2}, intervention: {})",
        pod.id,
        health.health_score,
        health.attendance_rate,
        health.completion_rate,
        health.needs_intervention
    );
    Ok(health)
}
