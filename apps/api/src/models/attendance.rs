use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct CallAttendance {
    pub id: Uuid,
    pub user_id: Uuid,
    pub pod_id: Uuid,
    pub scheduled_at: DateTime<Utc>,
    pub attended: bool,
    pub video_update_url: Option<String>,
}
