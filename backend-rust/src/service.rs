//! Roster operations shared by the socket handlers and the reveal sweep.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use chrono::{DateTime, NaiveDate, Utc};
use rand::rngs::StdRng;
use rand::SeedableRng;
use roster_core::{rotate, Assignment, RotationInput, ShuffleCoordinator, ShuffleError, ShuffleEvent, ShufflePhase};
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{info, warn};
use uuid::Uuid;

use crate::config::Config;
use crate::history::{HistoryAccessor, HistoryError};
use crate::persistence::save_state;
use crate::state::{AppliedShuffle, InitState, RosterState, RosterUpdate};

// ─── Shared State Types ───────────────────────────────────────────────────────

pub type SharedState = Arc<RwLock<RosterState>>;
pub type SharedCoordinator = Arc<RwLock<ShuffleCoordinator>>;
pub type SharedHistory = Arc<dyn HistoryAccessor>;

// ─── Helper: get unix ms ─────────────────────────────────────────────────────

pub fn now_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as i64
}

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error(transparent)]
    Shuffle(#[from] ShuffleError),
    #[error(transparent)]
    History(#[from] HistoryError),
    #[error("roster could not be saved: {0:#}")]
    Persist(anyhow::Error),
}

#[derive(Clone)]
pub struct RosterService {
    pub state: SharedState,
    pub coordinator: SharedCoordinator,
    pub history: SharedHistory,
    pub config: Arc<Config>,
}

impl RosterService {
    /// Wire up the service, reinstating an in-flight shuffle from `state`.
    pub fn new(config: Config, state: RosterState, history: SharedHistory) -> Self {
        let mut coordinator = ShuffleCoordinator::new(config.reveal_duration_ms);
        if let Some(event) = state.shuffle_event.clone() {
            coordinator.restore(event);
        }
        Self {
            state: Arc::new(RwLock::new(state)),
            coordinator: Arc::new(RwLock::new(coordinator)),
            history,
            config: Arc::new(config),
        }
    }

    fn state_file(&self) -> PathBuf {
        self.config.state_file.clone()
    }

    async fn persist(&self, state: &RosterState) -> Result<(), ServiceError> {
        save_state(&self.state_file(), state).await.map_err(ServiceError::Persist)
    }

    pub async fn init_state(&self, now: DateTime<Utc>) -> Result<InitState, ServiceError> {
        let target_date = self.config.target_date(now);
        let assignments = self.history.history().await?.current_snapshot(target_date);
        let shuffle_event = self.coordinator.read().await.active().cloned();
        let state = self.state.read().await;

        Ok(InitState {
            teams: state.teams.clone(),
            members: state.members.clone(),
            task_labels: state.task_labels.clone(),
            pair_exclusions: state.pair_exclusions.clone(),
            target_date,
            assignments,
            shuffle_event,
            server_time: now.timestamp_millis(),
        })
    }

    /// Replace teams, members, labels and pair exclusions wholesale and persist.
    pub async fn update_roster(&self, update: RosterUpdate) -> Result<RosterState, ServiceError> {
        let mut state = self.state.write().await;
        state.teams = update.teams;
        state.members = update.members;
        state.task_labels = update.task_labels;
        state.pair_exclusions = update.pair_exclusions;
        self.persist(&state).await?;
        info!(
            "Roster updated: {} teams, {} members, {} labels, {} pair exclusions",
            state.teams.len(),
            state.members.len(),
            state.task_labels.len(),
            state.pair_exclusions.len()
        );
        Ok(state.clone())
    }

    pub async fn assignments_for(&self, date: NaiveDate) -> Result<Vec<Assignment>, ServiceError> {
        Ok(self.history.history().await?.for_date(date).to_vec())
    }

    /// Compute a rotation for `target_date` (or the date implied by `now`) and
    /// publish it. Rejected while another shuffle is in flight.
    pub async fn trigger_shuffle(
        &self,
        target_date: Option<NaiveDate>,
        now: DateTime<Utc>,
    ) -> Result<ShuffleEvent, ServiceError> {
        let target = target_date.unwrap_or_else(|| self.config.target_date(now));

        // Held until publish so two triggers cannot both compute.
        let mut coordinator = self.coordinator.write().await;
        if let Some(active) = coordinator.active() {
            return Err(ShuffleError::InFlight {
                event_id: active.event_id,
                target_date: active.target_date,
            }
            .into());
        }

        let history = self.history.history().await?;
        let base_version = self.history.version(target).await?;
        let current = history.current_snapshot(target);
        let params = self.config.rotation_params();

        let result = {
            let state = self.state.read().await;
            let input = RotationInput {
                teams: &state.teams,
                members: &state.members,
                labels: &state.task_labels,
                history: &history,
                target_date: target,
                current_assignments: &current,
                pair_exclusions: &state.pair_exclusions,
            };
            let mut rng = StdRng::from_entropy();
            rotate(&input, &params, &mut rng)
        };

        let event = coordinator.publish(result, target, now.timestamp_millis(), Some(base_version))?;
        drop(coordinator);

        let mut state = self.state.write().await;
        state.shuffle_event = Some(event.clone());
        if let Err(e) = self.persist(&state).await {
            // The event still lives in memory; only a restart would lose it.
            warn!("Shuffle {} not persisted: {e}", event.event_id);
        }
        Ok(event)
    }

    /// Write the in-flight result back to history. Returns `None` when
    /// `event_id` is not the in-flight event (already applied or stale).
    /// An I/O failure keeps the event in flight; a version conflict drops it.
    pub async fn apply_shuffle(&self, event_id: Uuid) -> Result<Option<AppliedShuffle>, ServiceError> {
        let mut coordinator = self.coordinator.write().await;
        let Some(event) = coordinator.active().filter(|e| e.event_id == event_id).cloned() else {
            return Ok(None);
        };

        let written = self
            .history
            .replace_for_date(event.target_date, event.result_assignments.clone(), event.base_version)
            .await;

        match written {
            Ok(version) => {
                coordinator.resolve(event_id);
                drop(coordinator);
                self.clear_persisted_event().await;
                info!("Shuffle {event_id} applied to {} (v{version})", event.target_date);
                Ok(Some(AppliedShuffle {
                    event_id,
                    target_date: event.target_date,
                    version,
                    assignments: event.result_assignments,
                }))
            }
            Err(e @ HistoryError::VersionConflict { .. }) => {
                coordinator.resolve(event_id);
                drop(coordinator);
                self.clear_persisted_event().await;
                warn!("Shuffle {event_id} discarded: {e}");
                Err(e.into())
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Apply the in-flight event if it finished revealing more than the grace
    /// period ago and no viewer has written it back.
    pub async fn sweep(&self, now_ms: i64) -> Option<Result<AppliedShuffle, ServiceError>> {
        let event_id = {
            let coordinator = self.coordinator.read().await;
            match coordinator.phase(now_ms) {
                ShufflePhase::Due { overdue_ms } if overdue_ms >= self.config.reveal_grace_ms => {
                    coordinator.active()?.event_id
                }
                _ => return None,
            }
        };
        info!("Shuffle {event_id} overdue, applying from server");
        self.apply_shuffle(event_id).await.transpose()
    }

    async fn clear_persisted_event(&self) {
        let mut state = self.state.write().await;
        state.shuffle_event = None;
        if let Err(e) = self.persist(&state).await {
            warn!("Failed to clear persisted shuffle: {e}");
        }
    }
}
