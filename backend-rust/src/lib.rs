//! # roster-backend
//!
//! Socket.IO server for the daily roster board: persists the roster and
//! assignment history, runs rotations on request and coordinates the timed
//! reveal across every connected viewer.

pub mod config;
pub mod handlers;
pub mod history;
pub mod persistence;
pub mod service;
pub mod state;

pub use config::{Config, ConfigError};
pub use history::{FileHistory, HistoryAccessor, HistoryError, MemoryHistory};
pub use service::{now_ms, RosterService, ServiceError};
