//! Order in which candidate filters are given up when a slot would otherwise
//! go empty.

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Constraint {
    /// Candidate must not form a recent pair with the linked team's pick.
    PairRecent,
    /// Candidate must not have served this team inside the recency window.
    RecentMember,
    /// Candidate must not be the slot's current occupant.
    PreviousOccupant,
    /// Candidate must not be excluded from the label.
    LabelExclusion,
    /// Candidate must not share the row with a member it is paired off from.
    /// Left out of the default drop order, so it never gives way.
    PairExclusion,
}

/// Stage 0 enforces every constraint. Stage `i` drops the first `i` entries
/// of `drop_order`. Constraints missing from `drop_order` are never dropped.
///
/// `LabelExclusion` is only ever reached when nobody in the team could take
/// the label; the planner keeps it hard otherwise.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelaxationPolicy {
    drop_order: Vec<Constraint>,
}

impl Default for RelaxationPolicy {
    fn default() -> Self {
        Self {
            drop_order: vec![
                Constraint::PairRecent,
                Constraint::RecentMember,
                Constraint::PreviousOccupant,
                Constraint::LabelExclusion,
            ],
        }
    }
}

impl RelaxationPolicy {
    pub fn new(drop_order: Vec<Constraint>) -> Self {
        let mut deduped = Vec::with_capacity(drop_order.len());
        for constraint in drop_order {
            if !deduped.contains(&constraint) {
                deduped.push(constraint);
            }
        }
        Self { drop_order: deduped }
    }

    pub fn stage_count(&self) -> usize {
        self.drop_order.len() + 1
    }

    pub fn enforces(&self, stage: usize, constraint: Constraint) -> bool {
        let dropped = stage.min(self.drop_order.len());
        !self.drop_order[..dropped].contains(&constraint)
    }

    /// Filter `pool` stage by stage and return the first non-empty result with
    /// the stage index that produced it. An empty pool yields `(last, [])`.
    pub fn relax<T, F>(&self, pool: &[T], admits: F) -> (usize, Vec<T>)
    where
        T: Clone,
        F: Fn(&T, Constraint) -> bool,
    {
        let all = [
            Constraint::PairRecent,
            Constraint::RecentMember,
            Constraint::PreviousOccupant,
            Constraint::LabelExclusion,
            Constraint::PairExclusion,
        ];
        for stage in 0..self.stage_count() {
            let survivors: Vec<T> = pool
                .iter()
                .filter(|item| {
                    all.iter()
                        .filter(|c| self.enforces(stage, **c))
                        .all(|c| admits(*item, *c))
                })
                .cloned()
                .collect();
            if !survivors.is_empty() {
                return (stage, survivors);
            }
        }
        (self.stage_count() - 1, Vec::new())
    }
}
