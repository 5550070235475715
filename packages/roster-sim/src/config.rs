//! roster.toml layout. Roster entries use the same keys as the JSON wire
//! format so a file exported from the backend can be pasted in.

use chrono::NaiveDate;
use roster_core::calendar::Window;
use roster_core::rotation::LinkedPair;
use roster_core::{Member, PairExclusion, RotationParams, TaskLabel, Team};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct SimFile {
    pub simulation: SimulationConfig,
    #[serde(default)]
    pub teams: Vec<Team>,
    #[serde(default)]
    pub members: Vec<Member>,
    #[serde(default)]
    pub labels: Vec<TaskLabel>,
    #[serde(default, rename = "pairExclusions")]
    pub pair_exclusions: Vec<PairExclusion>,
}

#[derive(Debug, Deserialize)]
pub struct SimulationConfig {
    pub start_date: NaiveDate,
    #[serde(default = "default_reveal_ms")]
    pub reveal_ms: u64,
    #[serde(default = "default_latency_ms")]
    pub mean_viewer_latency_ms: f64,
    #[serde(default = "default_recency")]
    pub recency_weekdays: u32,
    /// Two team names, or empty to disable pair tracking.
    #[serde(default)]
    pub linked_teams: Vec<String>,
}

fn default_reveal_ms() -> u64 {
    3000
}

fn default_latency_ms() -> f64 {
    1500.0
}

fn default_recency() -> u32 {
    2
}

impl SimulationConfig {
    pub fn linked_pair(&self) -> Option<LinkedPair> {
        match self.linked_teams.as_slice() {
            [first, second] => Some(LinkedPair {
                first: first.clone(),
                second: second.clone(),
            }),
            _ => None,
        }
    }

    pub fn rotation_params(&self) -> RotationParams {
        RotationParams {
            recency_window: Window::Weekdays(self.recency_weekdays),
            linked_pair: self.linked_pair(),
            ..RotationParams::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bundled_roster_parses() {
        let file: SimFile = toml::from_str(include_str!("../roster.toml")).unwrap();
        assert_eq!(file.teams.len(), 3);
        assert!(file.members.iter().any(|m| !m.active));
        assert!(file.members.iter().any(|m| m.is_excluded_from("roast")));
        assert_eq!(file.pair_exclusions, vec![PairExclusion::new("b1", "a1")]);
        assert_eq!(file.simulation.linked_pair().map(|p| p.first), Some("A".to_string()));
    }

    #[test]
    fn linked_teams_need_exactly_two_names() {
        let file: SimFile = toml::from_str(
            r#"
            [simulation]
            start_date = "2025-11-17"
            linked_teams = ["A"]
            "#,
        )
        .unwrap();
        assert!(file.simulation.linked_pair().is_none());
        assert_eq!(file.simulation.reveal_ms, 3000);
    }
}
