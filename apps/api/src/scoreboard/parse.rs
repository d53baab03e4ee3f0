//! Scoreboard document model and the pure parsing rules behind the import.

use std::collections::BTreeMap;

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use tracing::warn;

const FULFILLED_MARK: char = '✅';
const MISSED_MARK: char = '❌';

/// Date layouts seen in scoreboards, tried in order.
const DATETIME_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S"];
const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%m/%d/%Y", "%d/%m/%Y"];

pub const IMPORT_EMAIL_DOMAIN: &str = "scoreboards.import";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Fulfillment {
    #[serde(rename = "true")]
    Fulfilled,
    #[serde(rename = "false")]
    Missed,
    #[default]
    #[serde(rename = "unknown")]
    Unknown,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttendanceStatus {
    Attended,
    NotAttended,
    #[default]
    Unknown,
}

impl AttendanceStatus {
    pub fn attended(self) -> Option<bool> {
        match self {
            AttendanceStatus::Attended => Some(true),
            AttendanceStatus::NotAttended => Some(false),
            AttendanceStatus::Unknown => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreboardCommitment {
    pub text: String,
    #[serde(default)]
    pub fulfilled: Fulfillment,
}

/// Commitments arrive already split, or as the raw multi-line cell text.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum CommitmentsField {
    Parsed(Vec<ScoreboardCommitment>),
    Cell(String),
}

impl Default for CommitmentsField {
    fn default() -> Self {
        CommitmentsField::Parsed(Vec::new())
    }
}

impl CommitmentsField {
    pub fn into_commitments(self) -> Vec<ScoreboardCommitment> {
        match self {
            CommitmentsField::Parsed(list) => list
                .into_iter()
                .map(|c| {
                    let fulfilled = match c.fulfilled {
                        Fulfillment::Unknown => detect_fulfillment(&c.text),
                        known => known,
                    };
                    ScoreboardCommitment {
                        text: clean_commitment_text(&c.text),
                        fulfilled,
                    }
                })
                .collect(),
            CommitmentsField::Cell(text) => parse_commitment_cell(&text),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ScoreboardEntry {
    #[serde(default)]
    pub attendance: AttendanceStatus,
    #[serde(default)]
    pub commitments: CommitmentsField,
}

/// Member full name -> date string -> entry.
pub type ScoreboardDocument = BTreeMap<String, BTreeMap<String, ScoreboardEntry>>;

pub fn detect_fulfillment(text: &str) -> Fulfillment {
    match text.trim_start().chars().next() {
        Some(FULFILLED_MARK) => Fulfillment::Fulfilled,
        Some(MISSED_MARK) => Fulfillment::Missed,
        _ => Fulfillment::Unknown,
    }
}

/// Drops a leading ✅/❌ marker and surrounding whitespace.
pub fn clean_commitment_text(text: &str) -> String {
    let text = text.trim();
    text.strip_prefix(FULFILLED_MARK)
        .or_else(|| text.strip_prefix(MISSED_MARK))
        .unwrap_or(text)
        .trim()
        .to_string()
}

/// Splits a scoreboard cell into one commitment per non-empty line.
pub fn parse_commitment_cell(cell: &str) -> Vec<ScoreboardCommitment> {
    cell.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .filter_map(|line| {
            let text = clean_commitment_text(line);
            (!text.is_empty()).then(|| ScoreboardCommitment {
                text,
                fulfilled: detect_fulfillment(line),
            })
        })
        .collect()
}

pub fn parse_scoreboard_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    if raw.is_empty() || matches!(raw.to_lowercase().as_str(), "nan" | "none") {
        return None;
    }
    DATETIME_FORMATS
        .iter()
        .find_map(|f| NaiveDateTime::parse_from_str(raw, f).ok().map(|dt| dt.date()))
        .or_else(|| {
            DATE_FORMATS
                .iter()
                .find_map(|f| NaiveDate::parse_from_str(raw, f).ok())
        })
}

/// First token is the first name; everything after it is the last name.
pub fn split_name(full_name: &str) -> (String, String) {
    let mut parts = full_name.split_whitespace();
    let first = parts.next().unwrap_or_default().to_string();
    let last = parts.collect::<Vec<_>>().join(" ");
    (first, last)
}

pub fn import_email(full_name: &str) -> String {
    let (first, last) = split_name(full_name);
    format!("{first}.{last}@{IMPORT_EMAIL_DOMAIN}")
        .to_lowercase()
        .replace(' ', "")
}

/// Empty cells and "-" placeholders are not commitments.
pub fn is_placeholder(text: &str) -> bool {
    matches!(text.trim(), "" | "-")
}

// ────────────────────────────────────────────────────────────────────────────
// Import plan
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub struct PlannedCommitment {
    pub text: String,
    pub fulfilled: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DayPlan {
    pub date: NaiveDate,
    pub attended: Option<bool>,
    pub commitments: Vec<PlannedCommitment>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MemberPlan {
    pub full_name: String,
    pub email: String,
    pub days: Vec<DayPlan>,
}

impl MemberPlan {
    pub fn first_date(&self) -> Option<NaiveDate> {
        self.days.iter().map(|d| d.date).min()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanSummary {
    pub members: usize,
    pub dates: usize,
    pub commitments: usize,
    pub attendance_records: usize,
    pub commitments_skipped: usize,
    pub attendance_skipped: usize,
    pub dates_skipped: usize,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ImportPlan {
    pub members: Vec<MemberPlan>,
    pub summary: PlanSummary,
}

/// Normalizes a scoreboard document into rows ready to insert.
pub fn plan_import(document: ScoreboardDocument) -> ImportPlan {
    let mut plan = ImportPlan::default();

    for (full_name, entries) in document {
        let full_name = full_name.split_whitespace().collect::<Vec<_>>().join(" ");
        if full_name.is_empty() {
            warn!("Skipping scoreboard member with an empty name");
            continue;
        }

        let mut days = Vec::new();
        for (raw_date, entry) in entries {
            let Some(date) = parse_scoreboard_date(&raw_date) else {
                warn!("Skipping unparseable scoreboard date '{raw_date}' for {full_name}");
                plan.summary.dates_skipped += 1;
                continue;
            };

            let attended = entry.attendance.attended();
            if attended.is_none() {
                plan.summary.attendance_skipped += 1;
            }

            let mut commitments = Vec::new();
            for commitment in entry.commitments.into_commitments() {
                if is_placeholder(&commitment.text) {
                    plan.summary.commitments_skipped += 1;
                    continue;
                }
                commitments.push(PlannedCommitment {
                    text: commitment.text,
                    fulfilled: commitment.fulfilled == Fulfillment::Fulfilled,
                });
            }

            plan.summary.commitments += commitments.len();
            plan.summary.attendance_records += usize::from(attended.is_some());
            days.push(DayPlan {
                date,
                attended,
                commitments,
            });
        }

        days.sort_by_key(|d| d.date);
        plan.summary.dates += days.len();
        plan.members.push(MemberPlan {
            email: import_email(&full_name),
            full_name,
            days,
        });
    }

    plan.summary.members = plan.members.len();
    plan
}
