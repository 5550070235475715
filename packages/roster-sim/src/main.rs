//! main.rs: roster rotation simulator
//!
//! Replays one rotation per weekday against an in-process history, the same
//! way the backend does on `trigger-shuffle`, and has a handful of simulated
//! viewers join each reveal after a random delay. Every viewer must end up
//! with the published board and the result must be written back exactly once.
//! Prints per-member participation and linked-pair repetition at the end.

mod config;
mod stats;

use std::collections::HashSet;

use anyhow::{bail, Context, Result};
use clap::Parser;
use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, Exp};
use roster_core::calendar::{is_weekend, next_weekday};
use roster_core::{
    rotate, Assignment, AssignmentHistory, PairExclusion, RotationInput, ShuffleCoordinator, ViewerAction, ViewerSync,
};
use tracing::{debug, info, warn};

use config::SimFile;
use stats::RunStats;

const DAY_MS: i64 = 86_400_000;

// ── CLI ───────────────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "roster-sim", about = "Roastery roster rotation simulator")]
struct Args {
    /// Roster file path
    #[arg(short, long, default_value = "roster.toml")]
    config: String,
    /// Number of weekdays to rotate
    #[arg(long, default_value = "20")]
    days: u32,
    /// RNG seed; omit for a fresh run every time
    #[arg(long)]
    seed: Option<u64>,
    /// Simulated viewers per reveal
    #[arg(long, default_value = "4")]
    viewers: usize,
}

// ── Main ──────────────────────────────────────────────────────────────────────

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "roster_sim=info".into()),
        )
        .init();

    let args = Args::parse();

    let config_str = match std::fs::read_to_string(&args.config) {
        Ok(s) => s,
        Err(e) => {
            warn!("Could not read {}: {e}, using bundled roster", args.config);
            include_str!("../roster.toml").to_string()
        }
    };
    let file: SimFile = toml::from_str(&config_str).with_context(|| format!("invalid roster file {}", args.config))?;

    let mut rng = match args.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };

    info!(
        "☕ Roster simulator: {} teams, {} members, {} labels, {} pair exclusions, {} days, {} viewers",
        file.teams.len(),
        file.members.len(),
        file.labels.len(),
        file.pair_exclusions.len(),
        args.days,
        args.viewers
    );

    let stats = run(&file, args.days, args.viewers, &mut rng)?;
    report(&file, &stats);
    Ok(())
}

// ── Replay loop ───────────────────────────────────────────────────────────────

fn run(file: &SimFile, days: u32, viewer_count: usize, rng: &mut StdRng) -> Result<RunStats> {
    let sim = &file.simulation;
    let params = sim.rotation_params();
    let latency = Exp::new(1.0 / sim.mean_viewer_latency_ms.max(1.0)).context("bad viewer latency")?;

    let linked_ids = sim.linked_pair().and_then(|pair| {
        let first = file.teams.iter().find(|t| t.name == pair.first)?;
        let second = file.teams.iter().find(|t| t.name == pair.second)?;
        Some((first.id.clone(), second.id.clone()))
    });
    let real_labels: HashSet<String> = file.labels.iter().map(|l| l.id.clone()).collect();

    let mut history = AssignmentHistory::new();
    let mut coordinator = ShuffleCoordinator::new(sim.reveal_ms);
    let mut viewers: Vec<ViewerSync> = (0..viewer_count).map(|_| ViewerSync::new()).collect();
    let mut stats = RunStats::default();

    let mut date = sim.start_date;
    if is_weekend(date) {
        date = next_weekday(date);
    }
    let mut clock_ms: i64 = 0;

    for _ in 0..days {
        let current = history.current_snapshot(date);
        let input = RotationInput {
            teams: &file.teams,
            members: &file.members,
            labels: &file.labels,
            history: &history,
            target_date: date,
            current_assignments: &current,
            pair_exclusions: &file.pair_exclusions,
        };
        let board = rotate(&input, &params, rng);
        if let Some(pair) = file.pair_exclusions.iter().find(|p| shares_a_row(&board, p)) {
            bail!("{date}: {} and {} seated on the same row", pair.member_id1, pair.member_id2);
        }
        let event = coordinator.publish(board, date, clock_ms, None)?;

        // Each viewer joins late by an exponential delay and reports the
        // board it ends up showing once its reveal completes.
        let mut first_report: Option<i64> = None;
        let mut applies = 0;
        for (i, viewer) in viewers.iter_mut().enumerate() {
            let joined_at = clock_ms + latency.sample(rng) as i64;
            let done_at = match viewer.observe(&event, joined_at) {
                ViewerAction::ApplyNow => joined_at,
                ViewerAction::Reveal { remaining_ms } => joined_at + remaining_ms as i64,
                ViewerAction::Ignore => bail!("viewer {i} ignored a fresh event {}", event.event_id),
            };
            if viewer.observe(&event, done_at) != ViewerAction::Ignore {
                bail!("viewer {i} would apply {} twice", event.event_id);
            }
            if done_at < clock_ms + event.duration_ms as i64 {
                bail!("viewer {i} finished before the reveal ended");
            }
            debug!("viewer {i} joined at +{}ms, applied at +{}ms", joined_at - clock_ms, done_at - clock_ms);

            first_report = Some(first_report.map_or(done_at, |t| t.min(done_at)));
            if coordinator.resolve(event.event_id).is_some() {
                applies += 1;
            }
        }
        if viewers.is_empty() && coordinator.resolve(event.event_id).is_some() {
            applies += 1;
        }
        if applies != 1 {
            bail!("{} written back {applies} times", event.event_id);
        }

        history.replace_date(date, event.result_assignments.clone());
        stats.record(
            &event.result_assignments,
            &real_labels,
            linked_ids.as_ref().map(|(a, b)| (a.as_str(), b.as_str())),
        );
        info!(
            "{date}: {} slots filled, first viewer done after {}ms",
            event.result_assignments.iter().filter(|a| a.member_id.is_some()).count(),
            first_report.map_or(0, |t| t - clock_ms)
        );

        date = next_weekday(date);
        clock_ms += DAY_MS;
    }

    Ok(stats)
}

fn shares_a_row(board: &[Assignment], pair: &PairExclusion) -> bool {
    let label_of = |member: &str| {
        board
            .iter()
            .find(|a| a.member_id.as_deref() == Some(member))
            .map(|a| a.task_label_id.as_str())
    };
    matches!((label_of(&pair.member_id1), label_of(&pair.member_id2)), (Some(a), Some(b)) if a == b)
}

fn report(file: &SimFile, stats: &RunStats) {
    info!("── Participation (real labels) ──");
    for member in &file.members {
        let held = stats.participation.get(&member.id).copied().unwrap_or(0);
        let flag = if member.active { "" } else { " (inactive)" };
        info!("  {:<12} {:>3}{flag}", member.name, held);
    }
    info!("  spread: {}", stats.participation_spread());

    if stats.pair_counts.is_empty() {
        info!("No linked pairs tracked");
        return;
    }
    info!("── Linked pairs ──");
    info!("  distinct pairs: {}", stats.pair_counts.len());
    if let Some((key, count)) = stats.most_repeated_pair() {
        info!("  most repeated: {key} ×{count}");
    }
    info!("  back-to-back repeats: {}", stats.back_to_back_pairs);
}
