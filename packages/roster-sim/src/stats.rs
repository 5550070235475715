//! Fairness numbers collected over a simulated run.

use std::collections::{BTreeMap, HashMap, HashSet};

use roster_core::rotation::pair_key;
use roster_core::Assignment;

#[derive(Debug, Default)]
pub struct RunStats {
    /// member id → real (non-placeholder) labels held
    pub participation: BTreeMap<String, u32>,
    /// linked pair key → number of days it was seated together
    pub pair_counts: BTreeMap<String, u32>,
    /// Pairs seated together on two consecutive simulated days.
    pub back_to_back_pairs: u32,
    last_pairs: HashSet<String>,
}

impl RunStats {
    pub fn record(&mut self, board: &[Assignment], real_labels: &HashSet<String>, linked: Option<(&str, &str)>) {
        for assignment in board {
            if let Some(member) = &assignment.member_id {
                if real_labels.contains(&assignment.task_label_id) {
                    *self.participation.entry(member.clone()).or_insert(0) += 1;
                }
            }
        }

        let Some((first, second)) = linked else {
            return;
        };
        let mut by_label: HashMap<&str, (Option<&str>, Option<&str>)> = HashMap::new();
        for assignment in board {
            let slot = by_label.entry(assignment.task_label_id.as_str()).or_default();
            if assignment.team_id == first {
                slot.0 = assignment.member_id.as_deref();
            } else if assignment.team_id == second {
                slot.1 = assignment.member_id.as_deref();
            }
        }

        let today: HashSet<String> = by_label
            .values()
            .filter_map(|(a, b)| Some(pair_key((*a)?, (*b)?)))
            .collect();
        for key in &today {
            *self.pair_counts.entry(key.clone()).or_insert(0) += 1;
            if self.last_pairs.contains(key) {
                self.back_to_back_pairs += 1;
            }
        }
        self.last_pairs = today;
    }

    /// Largest minus smallest participation count.
    pub fn participation_spread(&self) -> u32 {
        let max = self.participation.values().max().copied().unwrap_or(0);
        let min = self.participation.values().min().copied().unwrap_or(0);
        max - min
    }

    pub fn most_repeated_pair(&self) -> Option<(&str, u32)> {
        self.pair_counts
            .iter()
            .max_by_key(|(_, count)| **count)
            .map(|(key, count)| (key.as_str(), *count))
    }
}
