use std::collections::{HashMap, HashSet};

use chrono::NaiveDate;

use crate::calendar::Window;
use crate::model::{Assignment, AssignmentHistory};

use super::evaluator::ShuffleWeights;

/// Canonical key for two members: ids sorted and joined, so (a, b) == (b, a).
pub fn pair_key(a: &str, b: &str) -> String {
    if a <= b {
        format!("{a}-{b}")
    } else {
        format!("{b}-{a}")
    }
}

#[derive(Default)]
struct SlotPair {
    first: Option<String>,
    second: Option<String>,
}

impl SlotPair {
    fn key(&self) -> Option<String> {
        match (&self.first, &self.second) {
            (Some(a), Some(b)) => Some(pair_key(a, b)),
            _ => None,
        }
    }
}

/// Pairing signals for the two linked teams, derived once per rotation run.
#[derive(Debug, Clone)]
pub struct PairTracker {
    first_team_id: String,
    second_team_id: String,
    usage: HashMap<String, u32>,
    recent: HashSet<String>,
    current_day: HashSet<String>,
    weights: ShuffleWeights,
}

impl PairTracker {
    pub fn build(
        first_team_id: &str,
        second_team_id: &str,
        history: &AssignmentHistory,
        current: &[Assignment],
        target: NaiveDate,
        window: Window,
        weights: ShuffleWeights,
    ) -> Self {
        let mut tracker = Self {
            first_team_id: first_team_id.to_string(),
            second_team_id: second_team_id.to_string(),
            usage: HashMap::new(),
            recent: HashSet::new(),
            current_day: HashSet::new(),
            weights,
        };

        // Usage: every (date, label) slot counted once even when it shows up
        // in both the stored history and the on-screen snapshot.
        let mut counted: HashSet<(NaiveDate, String, String)> = HashSet::new();
        for source in [
            tracker.slot_pairs(history.records()),
            tracker.slot_pairs(current.iter()),
        ] {
            for ((date, label), pair) in source {
                if let Some(key) = pair.key() {
                    if counted.insert((date, label, key.clone())) {
                        *tracker.usage.entry(key).or_insert(0) += 1;
                    }
                }
            }
        }

        // Recent: history inside the window, plus the snapshot regardless of date.
        let window_dates = window.dates(target);
        let in_window = history
            .records()
            .filter(|r| window_dates.as_ref().map_or(true, |d| d.contains(&r.assigned_date)));
        let mut merged = tracker.slot_pairs(in_window);
        for (slot, pair) in tracker.slot_pairs(current.iter()) {
            let entry = merged.entry(slot).or_default();
            if pair.first.is_some() {
                entry.first = pair.first;
            }
            if pair.second.is_some() {
                entry.second = pair.second;
            }
        }
        tracker.recent = merged.values().filter_map(SlotPair::key).collect();

        // Current day: pairs already standing on the target date.
        let today = current.iter().filter(|r| r.assigned_date == target);
        tracker.current_day = tracker.slot_pairs(today).values().filter_map(SlotPair::key).collect();

        tracker
    }

    fn slot_pairs<'a, I>(&self, records: I) -> HashMap<(NaiveDate, String), SlotPair>
    where
        I: Iterator<Item = &'a Assignment>,
    {
        let mut slots: HashMap<(NaiveDate, String), SlotPair> = HashMap::new();
        for record in records {
            let Some(member_id) = record.member_id.as_ref() else {
                continue;
            };
            let is_first = record.team_id == self.first_team_id;
            if !is_first && record.team_id != self.second_team_id {
                continue;
            }
            let slot = slots
                .entry((record.assigned_date, record.task_label_id.clone()))
                .or_default();
            if is_first {
                slot.first = Some(member_id.clone());
            } else {
                slot.second = Some(member_id.clone());
            }
        }
        slots
    }

    pub fn usage_count(&self, a: &str, b: &str) -> u32 {
        self.usage.get(&pair_key(a, b)).copied().unwrap_or(0)
    }

    pub fn is_recent(&self, a: &str, b: &str) -> bool {
        self.recent.contains(&pair_key(a, b))
    }

    pub fn is_on_current_day(&self, a: &str, b: &str) -> bool {
        self.current_day.contains(&pair_key(a, b))
    }

    /// Extra penalty for seating `candidate` next to `partner` from the other team.
    pub fn penalty(&self, partner: &str, candidate: &str) -> f64 {
        let used = f64::from(self.usage_count(partner, candidate)) * self.weights.pair_used;
        let recent = if self.is_recent(partner, candidate) {
            self.weights.pair_recent
        } else {
            0.0
        };
        let today = if self.is_on_current_day(partner, candidate) {
            self.weights.pair_current_day
        } else {
            0.0
        };
        used + recent + today
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 11, d).unwrap()
    }

    fn asg(team: &str, label: &str, member: &str, date: NaiveDate) -> Assignment {
        Assignment {
            team_id: team.into(),
            task_label_id: label.into(),
            member_id: Some(member.into()),
            assigned_date: date,
        }
    }

    #[test]
    fn pair_key_is_order_independent() {
        assert_eq!(pair_key("b1", "a1"), pair_key("a1", "b1"));
        assert_eq!(pair_key("a1", "b1"), "a1-b1");
    }

    #[test]
    fn usage_counts_each_slot_once() {
        let history = AssignmentHistory::from_records(vec![
            asg("A", "l1", "a1", day(13)),
            asg("B", "l1", "b1", day(13)),
            asg("A", "l2", "a1", day(14)),
            asg("B", "l2", "b1", day(14)),
        ]);
        // The snapshot repeats the 14th; it must not be counted twice.
        let current = history.for_date(day(14)).to_vec();
        let tracker = PairTracker::build(
            "A",
            "B",
            &history,
            &current,
            day(17),
            Window::AllHistory,
            ShuffleWeights::default(),
        );

        assert_eq!(tracker.usage_count("b1", "a1"), 2);
        assert!(tracker.is_recent("a1", "b1"));
        assert!(!tracker.is_on_current_day("a1", "b1"));
        assert_eq!(tracker.penalty("a1", "b1"), 2.0 * 4.0 + 9.0);
    }

    #[test]
    fn weekday_window_limits_recent_pairs() {
        let history = AssignmentHistory::from_records(vec![
            asg("A", "l1", "a1", day(3)),
            asg("B", "l1", "b1", day(3)),
        ]);
        let tracker = PairTracker::build(
            "A",
            "B",
            &history,
            &[],
            day(18),
            Window::Weekdays(2),
            ShuffleWeights::default(),
        );
        assert!(!tracker.is_recent("a1", "b1"));
        assert_eq!(tracker.usage_count("a1", "b1"), 1);
    }

    #[test]
    fn current_day_pairs_come_from_the_snapshot() {
        let current = vec![asg("A", "l1", "a2", day(18)), asg("B", "l1", "b2", day(18))];
        let tracker = PairTracker::build(
            "A",
            "B",
            &AssignmentHistory::new(),
            &current,
            day(18),
            Window::AllHistory,
            ShuffleWeights::default(),
        );
        assert!(tracker.is_on_current_day("b2", "a2"));
        assert_eq!(tracker.penalty("a2", "b2"), 4.0 + 9.0 + 12.0);
    }
}
