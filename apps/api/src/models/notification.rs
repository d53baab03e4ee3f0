use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::models::UnknownVariant;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NotificationType {
    #[serde(rename = "midweek_checkin")]
    MidweekCheckin,
    #[serde(rename = "24hr_reminder")]
    DayBeforeReminder,
    #[serde(rename = "completion_celebration")]
    CompletionCelebration,
}

impl NotificationType {
    pub fn as_str(self) -> &'static str {
        match self {
            NotificationType::MidweekCheckin => "midweek_checkin",
            NotificationType::DayBeforeReminder => "24hr_reminder",
            NotificationType::CompletionCelebration => "completion_celebration",
        }
    }
}

impl TryFrom<String> for NotificationType {
    type Error = UnknownVariant;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        match value.as_str() {
            "midweek_checkin" => Ok(NotificationType::MidweekCheckin),
            "24hr_reminder" => Ok(NotificationType::DayBeforeReminder),
            "completion_celebration" => Ok(NotificationType::CompletionCelebration),
            _ => Err(UnknownVariant {
                kind: "notification type",
                value,
            }),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: Uuid,
    pub user_id: Uuid,
    #[serde(rename = "type")]
    #[sqlx(rename = "type", try_from = "String")]
    pub kind: NotificationType,
    pub sent_at: DateTime<Utc>,
    pub opened_at: Option<DateTime<Utc>>,
    pub ai_generated_content: Option<String>,
    pub sentiment_score: Option<f64>,
}
