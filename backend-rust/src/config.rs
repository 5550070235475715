use std::path::PathBuf;

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveTime, Offset, Utc};
use roster_core::calendar::{shuffle_target_date, Window};
use roster_core::rotation::LinkedPair;
use roster_core::RotationParams;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{var}={value:?} is not a valid {expected}")]
    Invalid {
        var: &'static str,
        expected: &'static str,
        value: String,
    },
}

/// Runtime settings, read once at startup.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub port: u16,
    pub state_file: PathBuf,
    pub history_file: PathBuf,
    pub reveal_duration_ms: u64,
    /// How long a finished reveal may wait for a viewer before the server
    /// writes it back itself.
    pub reveal_grace_ms: u64,
    pub recency_weekdays: u32,
    pub linked_teams: Option<LinkedPair>,
    pub shuffle_cutoff: NaiveTime,
    pub utc_offset: FixedOffset,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 3001,
            state_file: PathBuf::from("roster.json"),
            history_file: PathBuf::from("history.json"),
            reveal_duration_ms: 3000,
            reveal_grace_ms: 5000,
            recency_weekdays: 2,
            linked_teams: Some(LinkedPair::default()),
            shuffle_cutoff: NaiveTime::from_hms_opt(16, 45, 0).unwrap_or_default(),
            utc_offset: FixedOffset::east_opt(9 * 3600).unwrap_or_else(|| Utc.fix()),
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup; unset keys keep their defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Config::default();

        if let Some(v) = lookup("PORT") {
            config.port = parse(&v, "PORT", "port number")?;
        }
        if let Some(v) = lookup("ROSTER_STATE_FILE") {
            config.state_file = PathBuf::from(v);
        }
        if let Some(v) = lookup("ROSTER_HISTORY_FILE") {
            config.history_file = PathBuf::from(v);
        }
        if let Some(v) = lookup("REVEAL_DURATION_MS") {
            config.reveal_duration_ms = parse(&v, "REVEAL_DURATION_MS", "duration in ms")?;
        }
        if let Some(v) = lookup("REVEAL_GRACE_MS") {
            config.reveal_grace_ms = parse(&v, "REVEAL_GRACE_MS", "duration in ms")?;
        }
        if let Some(v) = lookup("RECENCY_WEEKDAYS") {
            config.recency_weekdays = parse(&v, "RECENCY_WEEKDAYS", "weekday count")?;
        }
        if let Some(v) = lookup("LINKED_TEAMS") {
            config.linked_teams = parse_linked(&v)?;
        }
        if let Some(v) = lookup("SHUFFLE_CUTOFF") {
            config.shuffle_cutoff = NaiveTime::parse_from_str(v.trim(), "%H:%M").map_err(|_| ConfigError::Invalid {
                var: "SHUFFLE_CUTOFF",
                expected: "HH:MM time",
                value: v.clone(),
            })?;
        }
        if let Some(v) = lookup("UTC_OFFSET_HOURS") {
            let hours: i32 = parse(&v, "UTC_OFFSET_HOURS", "hour offset")?;
            config.utc_offset = hours
                .checked_mul(3600)
                .and_then(FixedOffset::east_opt)
                .ok_or(ConfigError::Invalid {
                    var: "UTC_OFFSET_HOURS",
                    expected: "hour offset",
                    value: v.clone(),
                })?;
        }

        Ok(config)
    }

    pub fn rotation_params(&self) -> RotationParams {
        RotationParams {
            recency_window: Window::Weekdays(self.recency_weekdays),
            linked_pair: self.linked_teams.clone(),
            ..RotationParams::default()
        }
    }

    /// Date a trigger at `now` rotates for, in the configured local offset.
    pub fn target_date(&self, now: DateTime<Utc>) -> NaiveDate {
        shuffle_target_date(&now.with_timezone(&self.utc_offset), self.shuffle_cutoff)
    }
}

fn parse<T: std::str::FromStr>(value: &str, var: &'static str, expected: &'static str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::Invalid {
        var,
        expected,
        value: value.to_string(),
    })
}

/// `"A,B"` links teams A and B; an empty value or `none` disables pairing.
fn parse_linked(value: &str) -> Result<Option<LinkedPair>, ConfigError> {
    let trimmed = value.trim();
    if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("none") {
        return Ok(None);
    }
    let names: Vec<&str> = trimmed.split(',').map(str::trim).collect();
    match names.as_slice() {
        [first, second] if !first.is_empty() && !second.is_empty() && first != second => Ok(Some(LinkedPair {
            first: first.to_string(),
            second: second.to_string(),
        })),
        _ => Err(ConfigError::Invalid {
            var: "LINKED_TEAMS",
            expected: "pair of team names like \"A,B\"",
            value: value.to_string(),
        }),
    }
}
