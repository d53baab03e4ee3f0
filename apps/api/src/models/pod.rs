use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Pod {
    pub id: Uuid,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub leader_id: Option<Uuid>,
    pub max_size: i32,
    pub call_day: Option<String>,
    pub call_time: Option<String>,
    pub jitsi_room_id: Option<String>,
    pub health_score: f64,
    pub last_health_check: Option<DateTime<Utc>>,
    pub revenue_share_enabled: bool,
    pub revenue_share_percentage: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct PodMembership {
    pub id: Uuid,
    pub user_id: Uuid,
    pub pod_id: Uuid,
    pub joined_at: DateTime<Utc>,
    pub left_at: Option<DateTime<Utc>>,
    pub is_active: bool,
    /// Derived in SQL from `joined_at` and `left_at` (or now).
    pub weeks_active: i32,
}

/// Derived health metric for a pod. Rates are fractions in 0..=1, the score is 0..=100.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PodHealth {
    pub pod_id: Uuid,
    pub health_score: f64,
    pub attendance_rate: f64,
    pub completion_rate: f64,
    pub last_activity: DateTime<Utc>,
    pub needs_intervention: bool,
}
