use chrono::{DateTime, Datelike, NaiveDate, Utc, Weekday};

use crate::errors::AppError;

/// An ISO-8601 week, the unit commitments are planned against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IsoWeek {
    pub year: i32,
    pub week: u32,
}

impl IsoWeek {
    /// Validates that `week` exists in `year` (some ISO years have 53 weeks).
    pub fn new(year: i32, week: i32) -> Result<Self, AppError> {
        let week = u32::try_from(week)
            .map_err(|_| AppError::Validation(format!("week {week} is out of range")))?;
        if NaiveDate::from_isoywd_opt(year, week, Weekday::Mon).is_none() {
            return Err(AppError::Validation(format!(
                "week {week} does not exist in ISO year {year}"
            )));
        }
        Ok(Self { year, week })
    }

    pub fn of_date(date: NaiveDate) -> Self {
        let iso = date.iso_week();
        Self {
            year: iso.year(),
            week: iso.week(),
        }
    }

    pub fn of(instant: DateTime<Utc>) -> Self {
        Self::of_date(instant.date_naive())
    }

    pub fn current() -> Self {
        Self::of(Utc::now())
    }

    pub fn week_i32(self) -> i32 {
        // ISO weeks never exceed 53
        self.week as i32
    }
}
