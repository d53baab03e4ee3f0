use axum::{
    extract::State,
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::errors::AppError;
use crate::extract::{AppJson, AppQuery};
use crate::models::notification::Notification;
use crate::notifications::store;
use crate::state::AppState;
use crate::users::handlers::UserIdQuery;

const LIST_LIMIT: i64 = 100;

#[derive(Debug, Deserialize)]
pub struct OpenedRequest {
    pub id: Uuid,
}

/// GET /api/notifications
pub async fn handle_list(
    State(state): State<AppState>,
    AppQuery(params): AppQuery<UserIdQuery>,
) -> Result<Json<Vec<Notification>>, AppError> {
    let notifications = store::list_for_user(&state.db, params.user_id, LIST_LIMIT).await?;
    Ok(Json(notifications))
}

/// POST /api/notifications/opened
///
/// Stamps `openedAt` the first time; later calls keep the original time.
pub async fn handle_opened(
    State(state): State<AppState>,
    AppJson(request): AppJson<OpenedRequest>,
) -> Result<Json<Notification>, AppError> {
    let notification = store::mark_opened(&state.db, request.id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Notification {} not found", request.id)))?;
    Ok(Json(notification))
}
