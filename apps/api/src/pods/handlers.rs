//! Axum route handlers for the Pods API.

use axum::{
    extract::State,
    http::StatusCode,
    Json,
};
use chrono::{DateTime, NaiveTime, Utc, Weekday};
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;

use crate::commitments;
use crate::errors::AppError;
use crate::extract::{AppJson, AppQuery};
use crate::models::attendance::CallAttendance;
use crate::models::pod::{Pod, PodHealth, PodMembership};
use crate::notifications::dispatch::notify_completion;
use crate::pods::health::evaluate_pod_health;
use crate::pods::store::{self, NewAttendance, NewPod};
use crate::state::AppState;
use crate::users;

pub const DEFAULT_MAX_SIZE: i32 = 8;
const MAX_NAME_LEN: usize = 100;

// ────────────────────────────────────────────────────────────────────────────
// Request types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePodRequest {
    pub name: String,
    pub leader_id: Option<Uuid>,
    pub max_size: Option<i32>,
    pub call_day: Option<String>,
    pub call_time: Option<String>,
    pub jitsi_room_id: Option<String>,
    #[serde(default)]
    pub revenue_share_enabled: bool,
    pub revenue_share_percentage: Option<f64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MembershipRequest {
    pub pod_id: Uuid,
    pub user_id: Uuid,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceRequest {
    pub user_id: Uuid,
    pub pod_id: Uuid,
    pub scheduled_at: DateTime<Utc>,
    pub attended: bool,
    pub video_update_url: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PodIdQuery {
    pub pod_id: Uuid,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotifyCompletionRequest {
    pub commitment_id: Uuid,
}

// ────────────────────────────────────────────────────────────────────────────
// Validation
// ────────────────────────────────────────────────────────────────────────────

/// Normalizes a call day ("tue", "TUESDAY") to its full English name.
pub fn normalize_call_day(raw: &str) -> Result<String, AppError> {
    let day: Weekday = raw
        .trim()
        .parse()
        .map_err(|_| AppError::Validation(format!("'{raw}' is not a day of the week")))?;
    let name = match day {
        Weekday::Mon => "Monday",
        Weekday::Tue => "Tuesday",
        Weekday::Wed => "Wednesday",
        Weekday::Thu => "Thursday",
        Weekday::Fri => "Friday",
        Weekday::Sat => "Saturday",
        Weekday::Sun => "Sunday",
    };
    Ok(name.to_string())
}

/// Normalizes a call time ("19:00", "7:05:00") to `HH:MM`.
pub fn normalize_call_time(raw: &str) -> Result<String, AppError> {
    let raw = raw.trim();
    NaiveTime::parse_from_str(raw, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(raw, "%H:%M:%S"))
        .map(|t| t.format("%H:%M").to_string())
        .map_err(|_| AppError::Validation(format!("'{raw}' is not a valid call time (HH:MM)")))
}

fn validate_url(url: &str) -> Result<(), AppError> {
    if url.starts_with("https://") || url.starts_with("http://") {
        Ok(())
    } else {
        Err(AppError::Validation(
            "videoUpdateUrl must be an http(s) URL".to_string(),
        ))
    }
}

#[derive(Debug, PartialEq)]
pub struct ValidatedPod {
    pub name: String,
    pub max_size: i32,
    pub call_day: Option<String>,
    pub call_time: Option<String>,
    pub revenue_share_percentage: f64,
}

pub fn validate_pod(request: &CreatePodRequest) -> Result<ValidatedPod, AppError> {
    let name = request.name.trim();
    if name.is_empty() {
        return Err(AppError::Validation("name cannot be empty".to_string()));
    }
    if name.chars().count() > MAX_NAME_LEN {
        return Err(AppError::Validation(format!(
            "name cannot exceed {MAX_NAME_LEN} characters"
        )));
    }

    let max_size = request.max_size.unwrap_or(DEFAULT_MAX_SIZE);
    if max_size < 1 {
        return Err(AppError::Validation("maxSize must be at least 1".to_string()));
    }

    let revenue_share_percentage = request.revenue_share_percentage.unwrap_or(0.0);
    if !(0.0..=100.0).contains(&revenue_share_percentage) {
        return Err(AppError::Validation(
            "revenueSharePercentage must be between 0 and 100".to_string(),
        ));
    }

    Ok(ValidatedPod {
        name: name.to_string(),
        max_size,
        call_day: request.call_day.as_deref().map(normalize_call_day).transpose()?,
        call_time: request.call_time.as_deref().map(normalize_call_time).transpose()?,
        revenue_share_percentage,
    })
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// POST /api/pods
///
/// Creates a pod. A given leader is flagged as pod leader and joins immediately.
pub async fn handle_create_pod(
    State(state): State<AppState>,
    AppJson(request): AppJson<CreatePodRequest>,
) -> Result<Json<Pod>, AppError> {
    let valid = validate_pod(&request)?;

    let mut tx = state.db.begin().await?;

    if let Some(leader_id) = request.leader_id {
        if !users::store::user_exists(&mut *tx, leader_id).await? {
            return Err(AppError::NotFound(format!("User {leader_id} not found")));
        }
    }

    let pod = store::insert_pod(
        &mut *tx,
        NewPod {
            name: &valid.name,
            leader_id: request.leader_id,
            max_size: valid.max_size,
            call_day: valid.call_day.as_deref(),
            call_time: valid.call_time.as_deref(),
            jitsi_room_id: request.jitsi_room_id.as_deref(),
            revenue_share_enabled: request.revenue_share_enabled,
            revenue_share_percentage: valid.revenue_share_percentage,
        },
    )
    .await?;

    if let Some(leader_id) = pod.leader_id {
        users::store::set_pod_leader(&mut *tx, leader_id).await?;
        store::insert_membership(&mut *tx, pod.id, leader_id, None).await?;
    }

    tx.commit().await?;
    info!("Created pod {} '{}'", pod.id, pod.name);

    Ok(Json(pod))
}

/// POST /api/pods/members
pub async fn handle_join(
    State(state): State<AppState>,
    AppJson(request): AppJson<MembershipRequest>,
) -> Result<Json<PodMembership>, AppError> {
    if !users::store::user_exists(&state.db, request.user_id).await? {
        return Err(AppError::NotFound(format!("User {} not found", request.user_id)));
    }
    let membership = store::join_pod(&state.db, request.pod_id, request.user_id).await?;
    Ok(Json(membership))
}

/// POST /api/pods/members/leave
pub async fn handle_leave(
    State(state): State<AppState>,
    AppJson(request): AppJson<MembershipRequest>,
) -> Result<Json<PodMembership>, AppError> {
    let membership = store::leave_pod(&state.db, request.pod_id, request.user_id)
        .await?
        .ok_or_else(|| {
            AppError::NotFound(format!(
                "User {} has no active membership in pod {}",
                request.user_id, request.pod_id
            ))
        })?;
    Ok(Json(membership))
}

/// POST /api/pods/attendance
pub async fn handle_record_attendance(
    State(state): State<AppState>,
    AppJson(request): AppJson<AttendanceRequest>,
) -> Result<Json<CallAttendance>, AppError> {
    if let Some(url) = request.video_update_url.as_deref() {
        validate_url(url)?;
    }
    if store::get_pod(&state.db, request.pod_id).await?.is_none() {
        return Err(AppError::NotFound(format!("Pod {} not found", request.pod_id)));
    }
    if !users::store::user_exists(&state.db, request.user_id).await? {
        return Err(AppError::NotFound(format!("User {} not found", request.user_id)));
    }

    let attendance = store::insert_attendance(
        &state.db,
        NewAttendance {
            user_id: request.user_id,
            pod_id: request.pod_id,
            scheduled_at: request.scheduled_at,
            attended: request.attended,
            video_update_url: request.video_update_url.as_deref(),
        },
    )
    .await?;

    Ok(Json(attendance))
}

/// GET /api/pods/health
pub async fn handle_health(
    State(state): State<AppState>,
    AppQuery(params): AppQuery<PodIdQuery>,
) -> Result<Json<PodHealth>, AppError> {
    let pod = store::get_pod(&state.db, params.pod_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Pod {} not found", params.pod_id)))?;

    let health = evaluate_pod_health(&state.db, &pod, &state.config.health).await?;
    Ok(Json(health))
}

/// POST /api/pods/notify-completion
///
/// Records a completion celebration for the author and for high-touch pod mates.
pub async fn handle_notify_completion(
    State(state): State<AppState>,
    AppJson(request): AppJson<NotifyCompletionRequest>,
) -> Result<StatusCode, AppError> {
    let commitment = commitments::store::get_commitment(&state.db, request.commitment_id)
        .await?
        .ok_or_else(|| {
            AppError::NotFound(format!("Commitment {} not found", request.commitment_id))
        })?;

    if !commitment.is_completed {
        return Err(AppError::UnprocessableEntity(format!(
            "Commitment {} is not completed",
            commitment.id
        )));
    }

    notify_completion(&state.db, state.composer.as_ref(), &commitment).await?;
    Ok(StatusCode::NO_CONTENT)
}
