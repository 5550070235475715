use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::calendar::previous_weekday;

// ─── Roster ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Team {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order: Option<i32>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Member {
    pub id: String,
    pub name: String,
    pub team_id: String,
    /// Labels this member must not be given.
    #[serde(default)]
    pub excluded_task_label_ids: Vec<String>,
    #[serde(default = "default_active")]
    pub active: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order: Option<i32>,
}

fn default_active() -> bool {
    true
}

impl Member {
    pub fn is_excluded_from(&self, task_label_id: &str) -> bool {
        self.excluded_task_label_ids.iter().any(|id| id == task_label_id)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TaskLabel {
    pub id: String,
    pub left_label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub right_label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order: Option<i32>,
    /// Synthetic padding row added when a team has more members than labels.
    #[serde(default)]
    pub placeholder: bool,
}

impl TaskLabel {
    pub fn placeholder(index: usize) -> Self {
        Self {
            id: format!("placeholder-{index}"),
            left_label: String::new(),
            right_label: None,
            order: None,
            placeholder: true,
        }
    }
}

/// Two members who must never share a row. Stored with the ids in ascending
/// order so the same pair always serializes the same way.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase")]
pub struct PairExclusion {
    pub member_id1: String,
    pub member_id2: String,
}

impl PairExclusion {
    pub fn new(a: &str, b: &str) -> Self {
        let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
        Self {
            member_id1: lo.to_string(),
            member_id2: hi.to_string(),
        }
    }
}

// ─── Assignments ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Assignment {
    pub team_id: String,
    pub task_label_id: String,
    pub member_id: Option<String>,
    pub assigned_date: NaiveDate,
}

/// Assignments keyed by date. Each date is replaced wholesale, never merged.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(transparent)]
pub struct AssignmentHistory {
    days: BTreeMap<NaiveDate, Vec<Assignment>>,
}

impl AssignmentHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Group flat records by their `assigned_date`.
    pub fn from_records<I>(records: I) -> Self
    where
        I: IntoIterator<Item = Assignment>,
    {
        let mut days: BTreeMap<NaiveDate, Vec<Assignment>> = BTreeMap::new();
        for record in records {
            days.entry(record.assigned_date).or_default().push(record);
        }
        Self { days }
    }

    pub fn for_date(&self, date: NaiveDate) -> &[Assignment] {
        self.days.get(&date).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Replace everything stored for `date`. Records are re-stamped with `date`.
    pub fn replace_date(&mut self, date: NaiveDate, assignments: Vec<Assignment>) {
        let stamped: Vec<Assignment> = assignments
            .into_iter()
            .map(|a| Assignment { assigned_date: date, ..a })
            .collect();
        self.days.insert(date, stamped);
    }

    pub fn records(&self) -> impl Iterator<Item = &Assignment> {
        self.days.values().flatten()
    }

    pub fn dates(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        self.days.keys().copied()
    }

    /// The board a viewer sees for `target`: that day's assignments, or the
    /// previous weekday's when the day has not been rotated yet.
    pub fn current_snapshot(&self, target: NaiveDate) -> Vec<Assignment> {
        let today = self.for_date(target);
        if !today.is_empty() {
            return today.to_vec();
        }
        self.for_date(previous_weekday(target)).to_vec()
    }
}

// ─── Shuffle Event (broadcast payload) ──────────────────────────────────────

/// One published rotation. Viewers identify it by `event_id` alone.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ShuffleEvent {
    pub event_id: Uuid,
    /// Unix ms at which the reveal started.
    pub start_time: i64,
    pub target_date: NaiveDate,
    pub duration_ms: u64,
    pub result_assignments: Vec<Assignment>,
    /// History version of `target_date` the result was computed against.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_version: Option<u64>,
}
