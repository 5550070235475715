use std::collections::{HashMap, HashSet};

use crate::model::{Member, TaskLabel};

/// Penalty weights. Lower total penalty wins a slot.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShuffleWeights {
    pub pair_used: f64,
    pub pair_recent: f64,
    pub pair_current_day: f64,
    pub recent_member: f64,
    pub same_as_current: f64,
    pub participation: f64,
}

impl Default for ShuffleWeights {
    fn default() -> Self {
        Self {
            pair_used: 4.0,
            pair_recent: 9.0,
            pair_current_day: 12.0,
            recent_member: 3.0,
            same_as_current: 6.0,
            participation: 1.0,
        }
    }
}

/// Per-team, per-slot facts the evaluator scores against.
#[derive(Debug, Clone, Copy)]
pub struct SlotSignals<'a> {
    /// Members who held any slot of this team within the recency window.
    pub recent_members: &'a HashSet<String>,
    /// Who sits in this (team, label) slot on the board right now.
    pub current_occupant: Option<&'a str>,
    /// Lifetime number of slots each member has held for this team.
    pub participation: &'a HashMap<String, u32>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ConstraintEvaluator {
    weights: ShuffleWeights,
}

impl ConstraintEvaluator {
    pub fn new(weights: ShuffleWeights) -> Self {
        Self { weights }
    }

    /// Excluded members are not candidates for the label. This is lifted only
    /// when no member of the team is a candidate.
    pub fn is_candidate(member: &Member, label: &TaskLabel) -> bool {
        !member.is_excluded_from(&label.id)
    }

    pub fn penalty(&self, member_id: &str, slot: &SlotSignals<'_>) -> f64 {
        let recent = if slot.recent_members.contains(member_id) {
            self.weights.recent_member
        } else {
            0.0
        };
        let same = if slot.current_occupant == Some(member_id) {
            self.weights.same_as_current
        } else {
            0.0
        };
        let participation = f64::from(slot.participation.get(member_id).copied().unwrap_or(0))
            * self.weights.participation;

        recent + same + participation
    }
}
