//! # roster-core
//!
//! Shared roster types and the daily team-assignment rotation engine.
//!
//! These types are used by:
//! - `backend-rust`: persisting the board, running rotations, publishing shuffle events
//! - `roster-sim`: replaying many weekdays of rotations offline
//! - Web viewers: every struct here is the JSON shape they send and receive
//!
//! ## Conventions
//!
//! - Dates are calendar days (`YYYY-MM-DD`), timestamps are Unix milliseconds
//! - All wire structs serialise in camelCase
//! - Nothing in this crate performs I/O; randomness is always injected
//!
//! ## Invariants
//! - For a fixed date each (teamId, taskLabelId) slot appears at most once
//! - Within one rotation run no member holds two labels for their own team
//! - Two members under a pair exclusion never share a row
//! - A viewer never applies the same shuffle event twice

pub mod calendar;
pub mod model;
pub mod rotation;
pub mod shuffle;

pub use calendar::{previous_weekday, previous_weekdays, shuffle_target_date, Window};
pub use model::{Assignment, AssignmentHistory, Member, PairExclusion, ShuffleEvent, TaskLabel, Team};
pub use rotation::{rotate, RotationInput, RotationParams};
pub use shuffle::{ShuffleCoordinator, ShuffleError, ShufflePhase, ViewerAction, ViewerSync};
