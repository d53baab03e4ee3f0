//! Axum route handlers for the Users API.

use axum::{
    extract::State,
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;

use crate::commitments;
use crate::errors::AppError;
use crate::extract::{AppJson, AppQuery};
use crate::models::pod::PodMembership;
use crate::models::user::{NotificationPreference, User};
use crate::pods;
use crate::state::AppState;
use crate::users::store::{self, NewUser};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateUserRequest {
    pub email: String,
    pub phone: Option<String>,
    #[serde(default)]
    pub is_admin: bool,
    #[serde(default)]
    pub notification_preference: NotificationPreference,
    pub communication_style: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserIdQuery {
    pub user_id: Uuid,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncRequest {
    pub device_id: String,
    pub user_id: Uuid,
}

/// Lowercases and checks an email address: one `@` with non-empty sides and no whitespace.
pub fn normalize_email(raw: &str) -> Result<String, AppError> {
    let email = raw.trim().to_lowercase();
    let valid = match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.is_empty()
                && !domain.contains('@')
                && !email.chars().any(char::is_whitespace)
        }
        None => false,
    };
    if valid {
        Ok(email)
    } else {
        Err(AppError::Validation(format!("'{raw}' is not a valid email")))
    }
}

/// POST /api/users
pub async fn handle_create_user(
    State(state): State<AppState>,
    AppJson(request): AppJson<CreateUserRequest>,
) -> Result<Json<User>, AppError> {
    let email = normalize_email(&request.email)?;

    let user = store::insert_user(
        &state.db,
        NewUser {
            email: &email,
            phone: request.phone.as_deref().map(str::trim).filter(|p| !p.is_empty()),
            is_admin: request.is_admin,
            notification_preference: request.notification_preference,
            communication_style: request.communication_style.as_deref(),
        },
    )
    .await
    .map_err(|e| {
        if crate::db::is_unique_violation(&e) {
            AppError::Conflict(format!("A user with email {email} already exists"))
        } else {
            AppError::Database(e)
        }
    })?;

    info!("Created user {}", user.id);
    Ok(Json(user))
}

/// GET /api/users/profile
///
/// Returns the user with performance rates computed over their full history.
pub async fn handle_profile(
    State(state): State<AppState>,
    AppQuery(params): AppQuery<UserIdQuery>,
) -> Result<Json<User>, AppError> {
    let mut user = store::get_user(&state.db, params.user_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("User {} not found", params.user_id)))?;

    let totals = store::user_totals(&state.db, user.id).await?;
    user.commitment_success_rate = totals.commitment_success_rate();
    user.attendance_rate = totals.attendance_rate();

    Ok(Json(user))
}

/// GET /api/users/pods
pub async fn handle_user_pods(
    State(state): State<AppState>,
    AppQuery(params): AppQuery<UserIdQuery>,
) -> Result<Json<Vec<PodMembership>>, AppError> {
    if !store::user_exists(&state.db, params.user_id).await? {
        return Err(AppError::NotFound(format!("User {} not found", params.user_id)));
    }
    let memberships = pods::store::memberships_for_user(&state.db, params.user_id).await?;
    Ok(Json(memberships))
}

/// POST /api/users/sync
///
/// Binds the device to the user and stamps `syncedAt` on pending commitments.
pub async fn handle_sync(
    State(state): State<AppState>,
    AppJson(request): AppJson<SyncRequest>,
) -> Result<StatusCode, AppError> {
    let device_id = request.device_id.trim();
    if device_id.is_empty() {
        return Err(AppError::Validation("deviceId cannot be empty".to_string()));
    }

    if !store::bind_device(&state.db, request.user_id, device_id).await? {
        return Err(AppError::NotFound(format!("User {} not found", request.user_id)));
    }

    let synced = commitments::store::mark_synced(&state.db, request.user_id).await?;
    info!(
        "Synced device {device_id} for user {} ({synced} commitments)",
        request.user_id
    );

    Ok(StatusCode::NO_CONTENT)
}
