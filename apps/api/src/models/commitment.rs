use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::models::UnknownVariant;

/// The period a commitment is planned against.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanningHorizon {
    #[default]
    Week,
    Month,
    Quarter,
    Year,
}

impl PlanningHorizon {
    pub fn as_str(self) -> &'static str {
        match self {
            PlanningHorizon::Week => "week",
            PlanningHorizon::Month => "month",
            PlanningHorizon::Quarter => "quarter",
            PlanningHorizon::Year => "year",
        }
    }
}

impl TryFrom<String> for PlanningHorizon {
    type Error = UnknownVariant;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        match value.as_str() {
            "week" => Ok(PlanningHorizon::Week),
            "month" => Ok(PlanningHorizon::Month),
            "quarter" => Ok(PlanningHorizon::Quarter),
            "year" => Ok(PlanningHorizon::Year),
            _ => Err(UnknownVariant {
                kind: "planning horizon",
                value,
            }),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Commitment {
    pub id: Uuid,
    pub user_id: Uuid,
    pub pod_id: Option<Uuid>,
    pub text: String,
    pub created_at: DateTime<Utc>,
    pub week_number: i32,
    pub year: i32,
    pub is_completed: bool,
    pub completed_at: Option<DateTime<Utc>>,
    pub device_created_at: Option<DateTime<Utc>>,
    pub synced_at: Option<DateTime<Utc>>,
    #[sqlx(try_from = "String")]
    pub planning_horizon: PlanningHorizon,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_horizon_outside_set_is_rejected() {
        assert!(serde_json::from_str::<PlanningHorizon>("\"decade\"").is_err());
        assert!(PlanningHorizon::try_from("fortnight".to_string()).is_err());
    }

    #[test]
    fn test_horizon_str_matches_wire_name() {
        for horizon in [
            PlanningHorizon::Week,
            PlanningHorizon::Month,
            PlanningHorizon::Quarter,
            PlanningHorizon::Year,
        ] {
            let wire = serde_json::to_string(&horizon).unwrap();
            assert_eq!(wire, format!("\"{}\"", horizon.as_str()));
            assert_eq!(
                PlanningHorizon::try_from(horizon.as_str().to_string()).unwrap(),
                horizon
            );
        }
    }

    #[test]
    fn test_commitment_serializes_camel_case() {
        let commitment = Commitment {
            id: Uuid::nil(),
            user_id: Uuid::nil(),
            pod_id: None,
            text: "Ship the onboarding flow".into(),
            created_at: Utc::now(),
            week_number: 12,
            year: 2026,
            is_completed: false,
            completed_at: None,
            device_created_at: None,
            synced_at: None,
            planning_horizon: PlanningHorizon::Quarter,
        };
        let value = serde_json::to_value(&commitment).unwrap();
        assert_eq!(value["weekNumber"], 12);
        assert_eq!(value["isCompleted"], false);
        assert_eq!(value["planningHorizon"], "quarter");
        assert!(value.get("week_number").is_none());
    }
}
