use chrono::Utc;
use serde::Serialize;
use serde_json::Value;
use socketioxide::extract::{Data, SocketRef};
use tracing::{debug, error, info, warn};

use crate::history::HistoryError;
use crate::service::{RosterService, ServiceError};
use crate::state::{DateAssignments, GetAssignments, RosterUpdate, ShuffleApplied, ShuffleNotice, TriggerShuffle};

/// Room every registered viewer joins.
pub const VIEWERS_ROOM: &str = "viewers";

/// Send to every other client and echo back to the sender.
fn emit_all<T: Serialize>(s: &SocketRef, event: &'static str, data: &T) {
    let _ = s.broadcast().emit(event, data);
    let _ = s.emit(event, data);
}

fn emit_error(s: &SocketRef, err: &ServiceError) {
    let notice = ShuffleNotice {
        event_id: None,
        reason: err.to_string(),
    };
    let _ = s.emit("server-error", &notice);
}

// ─── Socket.IO Connection Handler ────────────────────────────────────────────

pub async fn on_connect(socket: SocketRef, service: RosterService) {
    let socket_id = socket.id.to_string();
    info!("Client connected: {socket_id}");

    socket.on_disconnect({
        let sid = socket_id.clone();
        move |_: SocketRef| async move {
            info!("Client disconnected: {sid}");
        }
    });

    // ── register ──────────────────────────────────────────────────────────────
    {
        let service = service.clone();
        socket.on("register", move |s: SocketRef, Data::<Value>(data)| {
            let service = service.clone();
            async move {
                let name = data["name"].as_str().unwrap_or("anonymous").to_string();
                let _ = s.join(VIEWERS_ROOM);
                info!("Client {}: registered as {name}", s.id);

                match service.init_state(Utc::now()).await {
                    Ok(init) => {
                        let _ = s.emit("init-state", &init);
                    }
                    Err(e) => {
                        error!("init-state for {} failed: {e}", s.id);
                        emit_error(&s, &e);
                    }
                }
            }
        });
    }

    // ── latency-ping ──────────────────────────────────────────────────────────
    socket.on("latency-ping", move |s: SocketRef, Data::<Value>(data)| async move {
        let _ = s.emit("latency-pong", &data);
    });

    // ── update-roster ─────────────────────────────────────────────────────────
    {
        let service = service.clone();
        socket.on("update-roster", move |s: SocketRef, Data::<Value>(data)| {
            let service = service.clone();
            async move {
                let update = match serde_json::from_value::<RosterUpdate>(data) {
                    Ok(u) => u,
                    Err(e) => {
                        warn!("update-roster: bad payload from {}: {e}", s.id);
                        return;
                    }
                };
                match service.update_roster(update).await {
                    Ok(state) => emit_all(&s, "roster-update", &state),
                    Err(e) => {
                        error!("update-roster failed: {e}");
                        emit_error(&s, &e);
                    }
                }
            }
        });
    }

    // ── trigger-shuffle ───────────────────────────────────────────────────────
    {
        let service = service.clone();
        socket.on("trigger-shuffle", move |s: SocketRef, Data::<Value>(data)| {
            let service = service.clone();
            async move {
                let request = match TriggerShuffle::from_payload(data) {
                    Ok(r) => r,
                    Err(e) => {
                        warn!("trigger-shuffle: bad payload from {}: {e}", s.id);
                        return;
                    }
                };
                match service.trigger_shuffle(request.target_date, Utc::now()).await {
                    Ok(event) => {
                        info!("Client {}: triggered shuffle {} for {}", s.id, event.event_id, event.target_date);
                        emit_all(&s, "shuffle-event", &event);
                    }
                    Err(ServiceError::Shuffle(e)) => {
                        warn!("trigger-shuffle from {} rejected: {e}", s.id);
                        let notice = ShuffleNotice {
                            event_id: match &e {
                                roster_core::ShuffleError::InFlight { event_id, .. } => Some(*event_id),
                            },
                            reason: e.to_string(),
                        };
                        let _ = s.emit("shuffle-rejected", &notice);
                    }
                    Err(e) => {
                        error!("trigger-shuffle failed: {e}");
                        emit_error(&s, &e);
                    }
                }
            }
        });
    }

    // ── shuffle-applied ───────────────────────────────────────────────────────
    {
        let service = service.clone();
        socket.on("shuffle-applied", move |s: SocketRef, Data::<Value>(data)| {
            let service = service.clone();
            async move {
                let applied = match serde_json::from_value::<ShuffleApplied>(data) {
                    Ok(a) => a,
                    Err(e) => {
                        warn!("shuffle-applied: bad payload from {}: {e}", s.id);
                        return;
                    }
                };
                match service.apply_shuffle(applied.event_id).await {
                    Ok(Some(result)) => emit_all(&s, "assignments-updated", &result),
                    Ok(None) => debug!("shuffle-applied {} from {} already handled", applied.event_id, s.id),
                    Err(ServiceError::History(e @ HistoryError::VersionConflict { .. })) => {
                        let notice = ShuffleNotice {
                            event_id: Some(applied.event_id),
                            reason: e.to_string(),
                        };
                        emit_all(&s, "shuffle-conflict", &notice);
                    }
                    Err(e) => {
                        error!("shuffle-applied {} failed: {e}", applied.event_id);
                        emit_error(&s, &e);
                    }
                }
            }
        });
    }

    // ── get-assignments ───────────────────────────────────────────────────────
    {
        let service = service.clone();
        socket.on("get-assignments", move |s: SocketRef, Data::<Value>(data)| {
            let service = service.clone();
            async move {
                let Ok(request) = serde_json::from_value::<GetAssignments>(data) else {
                    warn!("get-assignments: missing or invalid date from {}", s.id);
                    return;
                };
                match service.assignments_for(request.date).await {
                    Ok(assignments) => {
                        let reply = DateAssignments {
                            date: request.date,
                            assignments,
                        };
                        let _ = s.emit("assignments", &reply);
                    }
                    Err(e) => {
                        error!("get-assignments failed: {e}");
                        emit_error(&s, &e);
                    }
                }
            }
        });
    }
}
