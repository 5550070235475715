//! # rotation
//!
//! Daily team-assignment rotation: which member of each team takes which task
//! label on a target date.
//!
//! A run walks the labels in order and, per label, picks one member per team.
//! Candidates are narrowed by the [`RelaxationPolicy`], scored by the
//! [`ConstraintEvaluator`] (plus the [`PairTracker`] for the linked teams) and
//! chosen by [`select_lowest`]. The whole run is a pure function of its input
//! and the injected random source.

pub mod evaluator;
pub mod pairs;
pub mod planner;
pub mod policy;
pub mod selector;

use std::collections::HashMap;

use chrono::NaiveDate;
use rand::Rng;
use tracing::debug;

use crate::calendar::Window;
use crate::model::{Assignment, AssignmentHistory, Member, PairExclusion, TaskLabel, Team};

pub use evaluator::{ConstraintEvaluator, ShuffleWeights, SlotSignals};
pub use pairs::{pair_key, PairTracker};
pub use planner::AssignmentPlanner;
pub use policy::{Constraint, RelaxationPolicy};
pub use selector::select_lowest;

/// Everything a rotation run reads.
#[derive(Debug, Clone, Copy)]
pub struct RotationInput<'a> {
    pub teams: &'a [Team],
    pub members: &'a [Member],
    pub labels: &'a [TaskLabel],
    pub history: &'a AssignmentHistory,
    pub target_date: NaiveDate,
    /// The board as currently displayed; its occupants are the "previous
    /// occupant" of each slot. Empty slots dated on `target_date` stay empty.
    pub current_assignments: &'a [Assignment],
    pub pair_exclusions: &'a [PairExclusion],
}

/// The two teams whose member pairings are tracked, matched by display name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkedPair {
    pub first: String,
    pub second: String,
}

impl Default for LinkedPair {
    fn default() -> Self {
        Self {
            first: "A".to_string(),
            second: "B".to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct RotationParams {
    pub recency_window: Window,
    pub pair_window: Window,
    pub weights: ShuffleWeights,
    pub policy: RelaxationPolicy,
    pub linked_pair: Option<LinkedPair>,
}

impl Default for RotationParams {
    fn default() -> Self {
        Self {
            recency_window: Window::Weekdays(2),
            pair_window: Window::AllHistory,
            weights: ShuffleWeights::default(),
            policy: RelaxationPolicy::default(),
            linked_pair: Some(LinkedPair::default()),
        }
    }
}

/// Run one rotation. If the result reproduces the displayed board exactly
/// (and there is more than one member to move around) the run is repeated
/// once and the second result is kept either way.
pub fn rotate<R>(input: &RotationInput<'_>, params: &RotationParams, rng: &mut R) -> Vec<Assignment>
where
    R: Rng + ?Sized,
{
    let planner = AssignmentPlanner::new(input, params);
    let first = planner.run(rng);

    if input.members.len() > 1 && same_board(&first, input.current_assignments) {
        debug!(date = %input.target_date, "rotation reproduced the current board, running again");
        return planner.run(rng);
    }
    first
}

/// True when both boards seat the same member (or nobody) in every
/// (team, label) slot.
pub fn same_board(a: &[Assignment], b: &[Assignment]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let seats: HashMap<(&str, &str), Option<&str>> = b
        .iter()
        .map(|x| ((x.team_id.as_str(), x.task_label_id.as_str()), x.member_id.as_deref()))
        .collect();

    a.iter().all(|x| {
        seats.get(&(x.team_id.as_str(), x.task_label_id.as_str())) == Some(&x.member_id.as_deref())
    })
}
