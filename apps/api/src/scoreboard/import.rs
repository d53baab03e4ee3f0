use std::collections::HashMap;

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::Serialize;
use sqlx::{PgConnection, PgPool};
use tracing::info;
use uuid::Uuid;

use crate::commitments::week::IsoWeek;
use crate::errors::AppError;
use crate::models::commitment::PlanningHorizon;
use crate::models::pod::Pod;
use crate::pods::handlers::DEFAULT_MAX_SIZE;
use crate::pods::store::{self as pod_store, NewPod};
use crate::scoreboard::parse::{ImportPlan, MemberPlan, PlannedCommitment};
use crate::users;

pub const IMPORT_POD_NAME: &str = "Imported Scoreboards Pod";
const IMPORT_CALL_DAY: &str = "Monday";
const IMPORT_CALL_TIME: &str = "19:00";

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportReport {
    pub pod_id: Uuid,
    pub pod_max_size: i32,
    pub users_created: usize,
    pub users_matched: usize,
    pub commitments_imported: usize,
    pub commitments_skipped: usize,
    pub attendance_imported: usize,
    pub attendance_skipped: usize,
    pub dates_skipped: usize,
}

fn at(date: NaiveDate, h: u32, m: u32, s: u32) -> DateTime<Utc> {
    let time = NaiveTime::from_hms_opt(h, m, s).unwrap_or(NaiveTime::MIN);
    date.and_time(time).and_utc()
}

/// Commitments open at midnight of the scoreboard date.
pub fn commitment_created_at(date: NaiveDate) -> DateTime<Utc> {
    at(date, 0, 0, 0)
}

/// Fulfilled commitments close at the last second of the scoreboard date.
pub fn commitment_completed_at(date: NaiveDate) -> DateTime<Utc> {
    at(date, 23, 59, 59)
}

/// Pod calls happen at 19:00 UTC on the scoreboard date.
pub fn call_scheduled_at(date: NaiveDate) -> DateTime<Utc> {
    at(date, 19, 0, 0)
}

/// Smallest `max_size` that keeps every active member of the import pod inside it.
pub fn required_max_size(current: i32, active_members: i64) -> i32 {
    current.max(i32::try_from(active_members).unwrap_or(i32::MAX))
}

/// 1-based repeat count of each line among the identical lines before it.
/// "✅ Run" twice in one cell yields `[1, 2]`.
pub fn occurrence_numbers(commitments: &[PlannedCommitment]) -> Vec<i64> {
    let mut seen: HashMap<&str, i64> = HashMap::new();
    commitments
        .iter()
        .map(|c| {
            let n = seen.entry(c.text.as_str()).or_insert(0);
            *n += 1;
            *n
        })
        .collect()
}

/// Returns the import pod, creating it on first use. Concurrent imports queue
/// on an advisory lock and the pod row stays locked until commit.
async fn lock_import_pod(conn: &mut PgConnection) -> Result<Pod, sqlx::Error> {
    sqlx::query("SELECT pg_advisory_xact_lock(hashtext($1))")
        .bind(IMPORT_POD_NAME)
        .execute(&mut *conn)
        .await?;

    if let Some(pod) = pod_store::lock_import_pod(&mut *conn).await? {
        return Ok(pod);
    }

    let pod = pod_store::insert_pod(
        &mut *conn,
        NewPod {
            name: IMPORT_POD_NAME,
            leader_id: None,
            max_size: DEFAULT_MAX_SIZE,
            call_day: Some(IMPORT_CALL_DAY),
            call_time: Some(IMPORT_CALL_TIME),
            jitsi_room_id: None,
            revenue_share_enabled: false,
            revenue_share_percentage: 0.0,
        },
    )
    .await?;
    pod_store::mark_import_pod(&mut *conn, pod.id).await?;
    info!("Created import pod {}", pod.id);
    Ok(pod)
}

/// Inserts a backdated commitment unless this occurrence of it was imported before.
async fn insert_historical_commitment(
    conn: &mut PgConnection,
    user_id: Uuid,
    pod_id: Uuid,
    commitment: &PlannedCommitment,
    occurrence: i64,
    date: NaiveDate,
) -> Result<bool, sqlx::Error> {
    let week = IsoWeek::of_date(date);
    let created_at = commitment_created_at(date);
    let completed_at = commitment.fulfilled.then(|| commitment_completed_at(date));

    let result = sqlx::query(
        r#"
        INSERT INTO commitments
            (user_id, pod_id, text, created_at, week_number, year,
             is_completed, completed_at, synced_at, planning_horizon)
        SELECT $1, $2, $3, $4, $5, $6, $7, $8, now(), $9
        WHERE (
            SELECT COUNT(*) FROM commitments WHERE user_id = $1 AND text = $3 AND created_at = $4
        ) < $10
        "#,
    )
    .bind(user_id)
    .bind(pod_id)
    .bind(&commitment.text)
    .bind(created_at)
    .bind(week.week_i32())
    .bind(week.year)
    .bind(commitment.fulfilled)
    .bind(completed_at)
    .bind(PlanningHorizon::Week.as_str())
    .bind(occurrence)
    .execute(&mut *conn)
    .await?;
    Ok(result.rows_affected() > 0)
}

async fn insert_historical_attendance(
    conn: &mut PgConnection,
    user_id: Uuid,
    pod_id: Uuid,
    date: NaiveDate,
    attended: bool,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        r#"
        INSERT INTO call_attendance (user_id, pod_id, scheduled_at, attended)
        VALUES ($1, $2, $3, $4)
        ON CONFLICT (user_id, pod_id, scheduled_at) DO NOTHING
        "#,
    )
    .bind(user_id)
    .bind(pod_id)
    .bind(call_scheduled_at(date))
    .bind(attended)
    .execute(&mut *conn)
    .await?;
    Ok(result.rows_affected() > 0)
}

async fn import_member(
    conn: &mut PgConnection,
    pod_id: Uuid,
    member: &MemberPlan,
    report: &mut ImportReport,
) -> Result<(), sqlx::Error> {
    let (user_id, created) = users::store::upsert_user_by_email(&mut *conn, &member.email).await?;
    if created {
        report.users_created += 1;
    } else {
        report.users_matched += 1;
    }

    if pod_store::active_membership(&mut *conn, pod_id, user_id)
        .await?
        .is_none()
    {
        let joined_at = member.first_date().map(commitment_created_at);
        pod_store::insert_membership(&mut *conn, pod_id, user_id, joined_at).await?;
    }

    for day in &member.days {
        let occurrences = occurrence_numbers(&day.commitments);
        for (commitment, occurrence) in day.commitments.iter().zip(occurrences) {
            let inserted =
                insert_historical_commitment(conn, user_id, pod_id, commitment, occurrence, day.date)
                    .await?;
            if inserted {
                report.commitments_imported += 1;
            } else {
                report.commitments_skipped += 1;
            }
        }

        if let Some(attended) = day.attended {
            if insert_historical_attendance(conn, user_id, pod_id, day.date, attended).await? {
                report.attendance_imported += 1;
            } else {
                report.attendance_skipped += 1;
            }
        }
    }

    info!(
        "Imported scoreboard for {} ({} dates)",
        member.full_name,
        member.days.len()
    );
    Ok(())
}

/// Writes an import plan in a single transaction. Re-running the same
/// document creates no duplicates. The import pod grows to fit its members.
pub async fn run_import(pool: &PgPool, plan: &ImportPlan) -> Result<ImportReport, AppError> {
    let mut report = ImportReport {
        commitments_skipped: plan.summary.commitments_skipped,
        attendance_skipped: plan.summary.attendance_skipped,
        dates_skipped: plan.summary.dates_skipped,
        ..Default::default()
    };

    let mut tx = pool.begin().await?;
    let pod = lock_import_pod(&mut tx).await?;
    report.pod_id = pod.id;

    for member in &plan.members {
        import_member(&mut tx, pod.id, member, &mut report).await?;
    }

    let active = pod_store::count_active_members(&mut *tx, pod.id).await?;
    report.pod_max_size = required_max_size(pod.max_size, active);
    if report.pod_max_size > pod.max_size {
        pod_store::set_max_size(&mut *tx, pod.id, report.pod_max_size).await?;
        info!(
            "Import pod {} grown from {} to {} members",
            pod.id, pod.max_size, report.pod_max_size
        );
    }

    tx.commit().await?;
    info!(
        "Scoreboard import finished: {} users created, {} commitments, {} attendance records",
        report.users_created, report.commitments_imported, report.attendance_imported
    );
    Ok(report)
}
