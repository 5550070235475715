use std::collections::{HashMap, HashSet};

use chrono::NaiveDate;
use rand::seq::SliceRandom;
use rand::Rng;
use tracing::debug;

use crate::model::{Assignment, Member, PairExclusion, TaskLabel, Team};

use super::evaluator::{ConstraintEvaluator, SlotSignals};
use super::pairs::PairTracker;
use super::policy::{Constraint, RelaxationPolicy};
use super::selector::select_lowest;
use super::{RotationInput, RotationParams};

#[derive(Debug, Default)]
struct TeamSignals {
    recent: HashSet<String>,
    participation: HashMap<String, u32>,
}

/// Members seated so far on the label being filled.
#[derive(Debug, Default)]
struct Row<'a> {
    first_pick: Option<&'a str>,
    seated: Vec<&'a str>,
}

/// One rotation's precomputed view of the roster and history. Building it is
/// deterministic; only [`AssignmentPlanner::run`] consumes randomness.
pub struct AssignmentPlanner<'a> {
    target_date: NaiveDate,
    teams: Vec<&'a Team>,
    labels: Vec<TaskLabel>,
    /// (first, second) team ids of the linked pair, when both exist.
    linked: Option<(&'a str, &'a str)>,
    members_by_team: HashMap<&'a str, Vec<&'a Member>>,
    signals: HashMap<&'a str, TeamSignals>,
    occupants: HashMap<(&'a str, &'a str), &'a str>,
    /// (team, label) slots left empty on the target date's own board.
    locked: HashSet<(&'a str, &'a str)>,
    excluded_pairs: HashSet<PairExclusion>,
    pairs: Option<PairTracker>,
    evaluator: ConstraintEvaluator,
    policy: &'a RelaxationPolicy,
}

impl<'a> AssignmentPlanner<'a> {
    pub fn new(input: &RotationInput<'a>, params: &'a RotationParams) -> Self {
        let target = input.target_date;

        let mut seen_teams = HashSet::new();
        let mut teams: Vec<&'a Team> = input
            .teams
            .iter()
            .filter(|t| seen_teams.insert(t.id.as_str()))
            .collect();
        teams.sort_by_key(|t| t.order.unwrap_or(i32::MAX));

        let linked = params.linked_pair.as_ref().and_then(|pair| {
            let first = teams.iter().copied().find(|t| t.name == pair.first)?;
            let second = teams.iter().copied().find(|t| t.name == pair.second)?;
            (first.id != second.id).then(|| (first.id.as_str(), second.id.as_str()))
        });
        if let Some((first, second)) = linked {
            // Linked teams go first on every label so the second can see the first's pick.
            let rank = |t: &&Team| match t.id.as_str() {
                id if id == first => 0,
                id if id == second => 1,
                _ => 2,
            };
            teams.sort_by_key(rank);
        }

        let mut members_by_team: HashMap<&'a str, Vec<&'a Member>> =
            teams.iter().map(|&t| (t.id.as_str(), Vec::new())).collect();
        for member in input.members.iter().filter(|m| m.active) {
            if let Some(bucket) = members_by_team.get_mut(member.team_id.as_str()) {
                bucket.push(member);
            }
        }

        let widest = members_by_team.values().map(Vec::len).max().unwrap_or(0);
        let labels = pad_labels(input.labels, widest);

        let recent_dates = params.recency_window.dates(target);
        let mut signals: HashMap<&'a str, TeamSignals> =
            teams.iter().map(|&t| (t.id.as_str(), TeamSignals::default())).collect();
        for record in input.history.records() {
            let Some(member_id) = record.member_id.as_ref() else {
                continue;
            };
            if record.assigned_date == target {
                continue;
            }
            let Some(team) = signals.get_mut(record.team_id.as_str()) else {
                continue;
            };
            *team.participation.entry(member_id.clone()).or_insert(0) += 1;
            if recent_dates.as_ref().map_or(true, |d| d.contains(&record.assigned_date)) {
                team.recent.insert(member_id.clone());
            }
        }

        let occupants = input
            .current_assignments
            .iter()
            .filter_map(|a| {
                let member = a.member_id.as_deref()?;
                Some(((a.team_id.as_str(), a.task_label_id.as_str()), member))
            })
            .collect();

        let locked = input
            .current_assignments
            .iter()
            .filter(|a| a.member_id.is_none() && a.assigned_date == target)
            .map(|a| (a.team_id.as_str(), a.task_label_id.as_str()))
            .collect();

        let excluded_pairs = input
            .pair_exclusions
            .iter()
            .filter(|p| p.member_id1 != p.member_id2)
            .map(|p| PairExclusion::new(&p.member_id1, &p.member_id2))
            .collect();

        let pairs = linked.map(|(first, second)| {
            PairTracker::build(
                first,
                second,
                input.history,
                input.current_assignments,
                target,
                params.pair_window,
                params.weights,
            )
        });

        Self {
            target_date: target,
            teams,
            labels,
            linked,
            members_by_team,
            signals,
            occupants,
            locked,
            excluded_pairs,
            pairs,
            evaluator: ConstraintEvaluator::new(params.weights),
            policy: &params.policy,
        }
    }

    /// Teams in processing order: linked pair first, then the rest.
    pub fn teams(&self) -> &[&'a Team] {
        &self.teams
    }

    pub fn run<R>(&self, rng: &mut R) -> Vec<Assignment>
    where
        R: Rng + ?Sized,
    {
        // Shuffle in team order so a seeded rng reproduces the same run.
        let mut shuffled: HashMap<&'a str, Vec<&'a Member>> = HashMap::new();
        for &team in &self.teams {
            let mut order = self.members_by_team.get(team.id.as_str()).cloned().unwrap_or_default();
            order.shuffle(rng);
            shuffled.insert(team.id.as_str(), order);
        }

        let mut used: HashMap<&'a str, HashSet<&'a str>> = HashMap::new();
        let mut result = Vec::with_capacity(self.labels.len() * self.teams.len());

        for label in &self.labels {
            let mut row = Row::default();

            for &team in &self.teams {
                if self.locked.contains(&(team.id.as_str(), label.id.as_str())) {
                    result.push(Assignment {
                        team_id: team.id.clone(),
                        task_label_id: label.id.clone(),
                        member_id: None,
                        assigned_date: self.target_date,
                    });
                    continue;
                }

                let order = shuffled.get(team.id.as_str()).map(Vec::as_slice).unwrap_or(&[]);
                let team_used = used.entry(team.id.as_str()).or_default();

                let picked = self.pick(team, label, &row, order, team_used, rng);
                if let Some(member) = picked {
                    team_used.insert(member.id.as_str());
                    row.seated.push(member.id.as_str());
                }
                if matches!(self.linked, Some((first, _)) if first == team.id) {
                    row.first_pick = picked.map(|m| m.id.as_str());
                }

                result.push(Assignment {
                    team_id: team.id.clone(),
                    task_label_id: label.id.clone(),
                    member_id: picked.map(|m| m.id.clone()),
                    assigned_date: self.target_date,
                });
            }
        }

        debug!(
            date = %self.target_date,
            labels = self.labels.len(),
            teams = self.teams.len(),
            "rotation run complete"
        );
        result
    }

    fn pick<R>(
        &self,
        team: &Team,
        label: &TaskLabel,
        row: &Row<'a>,
        order: &[&'a Member],
        used: &HashSet<&'a str>,
        rng: &mut R,
    ) -> Option<&'a Member>
    where
        R: Rng + ?Sized,
    {
        // Exclusion may only give way when nobody in the whole team could take
        // the label. Otherwise an excluded member is never seated on it, even
        // if that leaves the slot empty.
        let team_members = self.members_by_team.get(team.id.as_str()).map(Vec::as_slice).unwrap_or(&[]);
        let exclusion_holds = team_members.iter().any(|m| ConstraintEvaluator::is_candidate(m, label));

        let pool: Vec<&'a Member> = order
            .iter()
            .copied()
            .filter(|m| !used.contains(m.id.as_str()))
            .filter(|m| !exclusion_holds || ConstraintEvaluator::is_candidate(m, label))
            .collect();
        if pool.is_empty() {
            if exclusion_holds {
                debug!(team = %team.name, label = %label.id, "no eligible member left, slot stays empty");
            }
            return None;
        }

        let team_signals = self.signals.get(team.id.as_str())?;
        let occupant = self
            .occupants
            .get(&(team.id.as_str(), label.id.as_str()))
            .copied();
        let partner = match self.linked {
            Some((_, second)) if second == team.id => row.first_pick,
            _ => None,
        };
        let pairing = partner.zip(self.pairs.as_ref());

        let (stage, candidates) = self.policy.relax(&pool, |m, constraint| match constraint {
            Constraint::PairRecent => pairing.map_or(true, |(p, tracker)| !tracker.is_recent(p, &m.id)),
            Constraint::RecentMember => !team_signals.recent.contains(&m.id),
            Constraint::PreviousOccupant => occupant != Some(m.id.as_str()),
            Constraint::LabelExclusion => ConstraintEvaluator::is_candidate(m, label),
            Constraint::PairExclusion => !row
                .seated
                .iter()
                .any(|other| self.excluded_pairs.contains(&PairExclusion::new(other, &m.id))),
        });
        if stage > 0 {
            debug!(team = %team.name, label = %label.id, stage, "relaxed candidate filters");
        }

        let slot = SlotSignals {
            recent_members: &team_signals.recent,
            current_occupant: occupant,
            participation: &team_signals.participation,
        };
        select_lowest(candidates, rng, |m| {
            let pair_penalty = pairing.map_or(0.0, |(p, tracker)| tracker.penalty(p, &m.id));
            self.evaluator.penalty(&m.id, &slot) + pair_penalty
        })
    }
}

/// Dedupe labels, order them, and pad with placeholders up to `widest_team`.
fn pad_labels(labels: &[TaskLabel], widest_team: usize) -> Vec<TaskLabel> {
    let mut seen: HashSet<String> = HashSet::new();
    let mut padded: Vec<TaskLabel> = labels
        .iter()
        .filter(|l| seen.insert(l.id.clone()))
        .cloned()
        .collect();
    padded.sort_by_key(|l| l.order.unwrap_or(i32::MAX));

    let mut index = padded.len();
    while padded.len() < widest_team {
        let placeholder = TaskLabel::placeholder(index);
        index += 1;
        if seen.insert(placeholder.id.clone()) {
            padded.push(placeholder);
        }
    }
    padded
}
