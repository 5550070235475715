//! # shuffle
//!
//! Reveal coordination for a published rotation. The server side
//! ([`ShuffleCoordinator`]) holds the single in-flight event; every viewer runs
//! a [`ViewerSync`] that turns an incoming event into "reveal for N ms" or
//! "apply now", using `now - start_time` as the shared clock.

use chrono::NaiveDate;
use thiserror::Error;
use tracing::{debug, info};
use uuid::Uuid;

use crate::model::{Assignment, ShuffleEvent};

/// Default length of the reveal animation.
pub const DEFAULT_REVEAL_MS: u64 = 3000;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ShuffleError {
    #[error("shuffle {event_id} for {target_date} is still in flight")]
    InFlight { event_id: Uuid, target_date: NaiveDate },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShufflePhase {
    Idle,
    Revealing { remaining_ms: u64 },
    /// Reveal finished but nobody has written the result back yet.
    Due { overdue_ms: u64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewerAction {
    /// Already processed this event id.
    Ignore,
    ApplyNow,
    Reveal { remaining_ms: u64 },
}

/// Milliseconds since the event started, never negative.
fn elapsed_ms(event: &ShuffleEvent, now_ms: i64) -> u64 {
    u64::try_from(now_ms.saturating_sub(event.start_time)).unwrap_or(0)
}

pub struct ShuffleCoordinator {
    reveal_duration_ms: u64,
    active: Option<ShuffleEvent>,
}

impl Default for ShuffleCoordinator {
    fn default() -> Self {
        Self::new(DEFAULT_REVEAL_MS)
    }
}

impl ShuffleCoordinator {
    pub fn new(reveal_duration_ms: u64) -> Self {
        Self {
            reveal_duration_ms,
            active: None,
        }
    }

    pub fn reveal_duration_ms(&self) -> u64 {
        self.reveal_duration_ms
    }

    /// Start a reveal for `result`. Only one event may be in flight.
    pub fn publish(
        &mut self,
        result: Vec<Assignment>,
        target_date: NaiveDate,
        now_ms: i64,
        base_version: Option<u64>,
    ) -> Result<ShuffleEvent, ShuffleError> {
        if let Some(active) = &self.active {
            return Err(ShuffleError::InFlight {
                event_id: active.event_id,
                target_date: active.target_date,
            });
        }

        let event = ShuffleEvent {
            event_id: Uuid::new_v4(),
            start_time: now_ms,
            target_date,
            duration_ms: self.reveal_duration_ms,
            result_assignments: result,
            base_version,
        };
        info!(
            "Shuffle published: {} for {} ({} assignments)",
            event.event_id,
            target_date,
            event.result_assignments.len()
        );
        self.active = Some(event.clone());
        Ok(event)
    }

    /// Reinstate an event that was in flight before a restart.
    pub fn restore(&mut self, event: ShuffleEvent) {
        info!("Restoring in-flight shuffle {}", event.event_id);
        self.active = Some(event);
    }

    pub fn active(&self) -> Option<&ShuffleEvent> {
        self.active.as_ref()
    }

    pub fn phase(&self, now_ms: i64) -> ShufflePhase {
        let Some(event) = &self.active else {
            return ShufflePhase::Idle;
        };
        let elapsed = elapsed_ms(event, now_ms);
        if elapsed < event.duration_ms {
            ShufflePhase::Revealing {
                remaining_ms: event.duration_ms - elapsed,
            }
        } else {
            ShufflePhase::Due {
                overdue_ms: elapsed - event.duration_ms,
            }
        }
    }

    /// Clear and return the in-flight event if it is `event_id`. A stale or
    /// repeated id leaves the coordinator untouched.
    pub fn resolve(&mut self, event_id: Uuid) -> Option<ShuffleEvent> {
        match &self.active {
            Some(active) if active.event_id == event_id => {
                debug!("Shuffle {event_id} resolved");
                self.active.take()
            }
            _ => None,
        }
    }
}

/// Per-viewer de-duplication and reveal timing.
#[derive(Debug, Default, Clone)]
pub struct ViewerSync {
    last_seen: Option<Uuid>,
}

impl ViewerSync {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn last_seen(&self) -> Option<Uuid> {
        self.last_seen
    }

    pub fn observe(&mut self, event: &ShuffleEvent, now_ms: i64) -> ViewerAction {
        if self.last_seen == Some(event.event_id) {
            return ViewerAction::Ignore;
        }
        self.last_seen = Some(event.event_id);

        let elapsed = elapsed_ms(event, now_ms);
        if elapsed >= event.duration_ms {
            ViewerAction::ApplyNow
        } else {
            ViewerAction::Reveal {
                remaining_ms: event.duration_ms - elapsed,
            }
        }
    }
}
