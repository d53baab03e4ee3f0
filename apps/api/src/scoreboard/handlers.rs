//! Axum route handlers for the legacy scoreboard import.

use axum::{extract::State, Json};

use crate::errors::AppError;
use crate::extract::AppJson;
use crate::scoreboard::import::{run_import, ImportReport};
use crate::scoreboard::parse::{plan_import, PlanSummary, ScoreboardDocument};
use crate::state::AppState;

fn ensure_not_empty(document: &ScoreboardDocument) -> Result<(), AppError> {
    if document.is_empty() {
        return Err(AppError::Validation(
            "scoreboard document has no members".to_string(),
        ));
    }
    Ok(())
}

/// POST /api/admin/import/scoreboards/preview
///
/// Parses the document and reports what an import would write, without writing.
pub async fn handle_preview(
    AppJson(document): AppJson<ScoreboardDocument>,
) -> Result<Json<PlanSummary>, AppError> {
    ensure_not_empty(&document)?;
    Ok(Json(plan_import(document).summary))
}

/// POST /api/admin/import/scoreboards
pub async fn handle_import(
    State(state): State<AppState>,
    AppJson(document): AppJson<ScoreboardDocument>,
) -> Result<Json<ImportReport>, AppError> {
    ensure_not_empty(&document)?;
    let plan = plan_import(document);
    let report = run_import(&state.db, &plan).await?;
    Ok(Json(report))
}
