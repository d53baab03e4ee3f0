use axum::{extract::State, Json};
use serde::Serialize;

use crate::commitments;
use crate::commitments::week::IsoWeek;
use crate::errors::AppError;
use crate::pods;
use crate::state::AppState;
use crate::users;

/// Admin dashboard counters. All zero on an empty database.
#[derive(Debug, Default, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DashboardSummary {
    pub total_users: i64,
    pub active_pods: i64,
    pub week_commitments: i64,
    pub week_number: u32,
    pub year: i32,
}

/// GET /api/admin/dashboard
pub async fn handle_dashboard(State(state): State<AppState>) -> Result<Json<DashboardSummary>, AppError> {
    let week = IsoWeek::current();

    let total_users = users::store::count_users(&state.db).await?;
    let active_pods = pods::store::count_active_pods(&state.db).await?;
    let week_commitments = commitments::store::count_for_week(&state.db, week).await?;

    Ok(Json(DashboardSummary {
        total_users,
        active_pods,
        week_commitments,
        week_number: week.week,
        year: week.year,
    }))
}
