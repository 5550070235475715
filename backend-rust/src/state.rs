use chrono::NaiveDate;
use roster_core::{Assignment, Member, PairExclusion, ShuffleEvent, TaskLabel, Team};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

// ─── Persisted Roster ────────────────────────────────────────────────────────

/// Everything the server keeps besides assignment history.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RosterState {
    #[serde(default)]
    pub teams: Vec<Team>,
    #[serde(default)]
    pub members: Vec<Member>,
    #[serde(default)]
    pub task_labels: Vec<TaskLabel>,
    /// Member pairs never seated on the same row.
    #[serde(default)]
    pub pair_exclusions: Vec<PairExclusion>,
    /// In-flight reveal, kept so a restart does not lose an unapplied result.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shuffle_event: Option<ShuffleEvent>,
}

// ─── Socket Payloads ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RosterUpdate {
    #[serde(default)]
    pub teams: Vec<Team>,
    #[serde(default)]
    pub members: Vec<Member>,
    #[serde(default)]
    pub task_labels: Vec<TaskLabel>,
    #[serde(default)]
    pub pair_exclusions: Vec<PairExclusion>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TriggerShuffle {
    #[serde(default)]
    pub target_date: Option<NaiveDate>,
}

impl TriggerShuffle {
    /// A missing or null payload means "use the current target date". Anything
    /// else must parse.
    pub fn from_payload(data: Value) -> Result<Self, serde_json::Error> {
        if data.is_null() {
            return Ok(Self::default());
        }
        serde_json::from_value(data)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ShuffleApplied {
    pub event_id: Uuid,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GetAssignments {
    pub date: NaiveDate,
}

/// Reply to `register`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct InitState {
    pub teams: Vec<Team>,
    pub members: Vec<Member>,
    pub task_labels: Vec<TaskLabel>,
    pub pair_exclusions: Vec<PairExclusion>,
    pub target_date: NaiveDate,
    /// The board for `target_date` (or the previous weekday's).
    pub assignments: Vec<Assignment>,
    pub shuffle_event: Option<ShuffleEvent>,
    pub server_time: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DateAssignments {
    pub date: NaiveDate,
    pub assignments: Vec<Assignment>,
}

/// Broadcast once a shuffle result has been written to history.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AppliedShuffle {
    pub event_id: Uuid,
    pub target_date: NaiveDate,
    pub version: u64,
    pub assignments: Vec<Assignment>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ShuffleNotice {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event_id: Option<Uuid>,
    pub reason: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn trigger_without_payload_uses_default_date() {
        assert_eq!(TriggerShuffle::from_payload(Value::Null).unwrap(), TriggerShuffle::default());
        assert_eq!(TriggerShuffle::from_payload(json!({})).unwrap(), TriggerShuffle::default());
    }

    #[test]
    fn trigger_with_date_parses() {
        let request = TriggerShuffle::from_payload(json!({"targetDate": "2025-11-18"})).unwrap();
        assert_eq!(request.target_date, NaiveDate::from_ymd_opt(2025, 11, 18));
    }

    #[test]
    fn malformed_trigger_date_is_rejected() {
        assert!(TriggerShuffle::from_payload(json!({"targetDate": "18/11/2025"})).is_err());
        assert!(TriggerShuffle::from_payload(json!("tomorrow")).is_err());
    }

    #[test]
    fn roster_without_pair_exclusions_still_loads() {
        let state: RosterState = serde_json::from_value(json!({"teams": []})).unwrap();
        assert!(state.pair_exclusions.is_empty());
    }
}
