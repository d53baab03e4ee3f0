//! Axum route handlers for the Commitments API.

use axum::{
    extract::State,
    Json,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;

use crate::commitments::store::{self, NewCommitment};
use crate::commitments::week::IsoWeek;
use crate::errors::AppError;
use crate::extract::{AppJson, AppQuery};
use crate::models::commitment::{Commitment, PlanningHorizon};
use crate::pods;
use crate::state::AppState;
use crate::users;

pub const MAX_TEXT_LEN: usize = 1000;

/// A partial commitment as submitted by a client. Server-owned fields
/// (`id`, `createdAt`, `isCompleted`, ...) are ignored if present.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateCommitmentRequest {
    pub user_id: Option<Uuid>,
    pub pod_id: Option<Uuid>,
    pub text: Option<String>,
    pub week_number: Option<i32>,
    pub year: Option<i32>,
    pub planning_horizon: Option<PlanningHorizon>,
    pub device_created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, PartialEq)]
pub struct ValidatedCommitment {
    pub user_id: Uuid,
    pub pod_id: Option<Uuid>,
    pub text: String,
    pub week: IsoWeek,
    pub planning_horizon: PlanningHorizon,
    pub device_created_at: Option<DateTime<Utc>>,
}

/// Checks the shape of a create request without touching the database.
pub fn validate_create(
    request: CreateCommitmentRequest,
    today: IsoWeek,
) -> Result<ValidatedCommitment, AppError> {
    let user_id = request
        .user_id
        .ok_or_else(|| AppError::Validation("userId is required".to_string()))?;

    let text = request.text.as_deref().map(str::trim).unwrap_or_default();
    if text.is_empty() {
        return Err(AppError::Validation("text cannot be empty".to_string()));
    }
    if text.chars().count() > MAX_TEXT_LEN {
        return Err(AppError::Validation(format!(
            "text cannot exceed {MAX_TEXT_LEN} characters"
        )));
    }

    let week = match (request.week_number, request.year) {
        (Some(week), Some(year)) => IsoWeek::new(year, week)?,
        (None, None) => today,
        _ => {
            return Err(AppError::Validation(
                "weekNumber and year must be given together".to_string(),
            ))
        }
    };

    Ok(ValidatedCommitment {
        user_id,
        pod_id: request.pod_id,
        text: text.to_string(),
        week,
        planning_horizon: request.planning_horizon.unwrap_or_default(),
        device_created_at: request.device_created_at,
    })
}

/// POST /api/commitments/create
pub async fn handle_create(
    State(state): State<AppState>,
    AppJson(request): AppJson<CreateCommitmentRequest>,
) -> Result<Json<Commitment>, AppError> {
    let valid = validate_create(request, IsoWeek::current())?;

    if !users::store::user_exists(&state.db, valid.user_id).await? {
        return Err(AppError::NotFound(format!("User {} not found", valid.user_id)));
    }

    if let Some(pod_id) = valid.pod_id {
        if pods::store::get_pod(&state.db, pod_id).await?.is_none() {
            return Err(AppError::NotFound(format!("Pod {pod_id} not found")));
        }
        if pods::store::active_membership(&state.db, pod_id, valid.user_id)
            .await?
            .is_none()
        {
            return Err(AppError::UnprocessableEntity(format!(
                "User {} is not an active member of pod {pod_id}",
                valid.user_id
            )));
        }
    }

    let commitment = store::insert_commitment(
        &state.db,
        NewCommitment {
            user_id: valid.user_id,
            pod_id: valid.pod_id,
            text: &valid.text,
            week: valid.week,
            planning_horizon: valid.planning_horizon,
            device_created_at: valid.device_created_at,
        },
    )
    .await?;

    Ok(Json(commitment))
}

#[derive(Debug, Deserialize)]
pub struct CompleteRequest {
    pub id: Uuid,
}

/// POST /api/commitments/complete
pub async fn handle_complete(
    State(state): State<AppState>,
    AppJson(request): AppJson<CompleteRequest>,
) -> Result<Json<Commitment>, AppError> {
    let commitment = store::complete_commitment(&state.db, request.id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Commitment {} not found", request.id)))?;

    info!("Commitment {} completed", commitment.id);
    Ok(Json(commitment))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeekQuery {
    pub user_id: Uuid,
    pub week: i32,
    pub year: i32,
}

/// GET /api/commitments/week
pub async fn handle_week(
    State(state): State<AppState>,
    AppQuery(params): AppQuery<WeekQuery>,
) -> Result<Json<Vec<Commitment>>, AppError> {
    let week = IsoWeek::new(params.year, params.week)?;
    let commitments = store::list_for_week(&state.db, params.user_id, week).await?;
    Ok(Json(commitments))
}
