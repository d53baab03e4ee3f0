use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::models::UnknownVariant;

/// How often a user wants to hear from the product.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationPreference {
    #[default]
    HighTouch,
    LowTouch,
}

impl NotificationPreference {
    pub fn as_str(self) -> &'static str {
        match self {
            NotificationPreference::HighTouch => "high_touch",
            NotificationPreference::LowTouch => "low_touch",
        }
    }
}

impl TryFrom<String> for NotificationPreference {
    type Error = UnknownVariant;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        match value.as_str() {
            "high_touch" => Ok(NotificationPreference::HighTouch),
            "low_touch" => Ok(NotificationPreference::LowTouch),
            _ => Err(UnknownVariant {
                kind: "notification preference",
                value,
            }),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub phone: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub is_admin: bool,
    pub is_pod_leader: bool,
    #[sqlx(try_from = "String")]
    pub notification_preference: NotificationPreference,
    pub device_id: Option<String>,
    /// Computed on read, never stored.
    #[sqlx(default)]
    pub commitment_success_rate: Option<f64>,
    #[sqlx(default)]
    pub attendance_rate: Option<f64>,
    pub communication_style: Option<String>,
}
