use anyhow::Result;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{info, warn};

use crate::state::RosterState;

/// Load the persisted roster. Returns default if file missing or corrupt.
pub async fn load_state(path: &Path) -> RosterState {
    if !path.exists() {
        info!("No {} found, starting with an empty roster", path.display());
        return RosterState::default();
    }

    match fs::read_to_string(path).await {
        Ok(data) => match serde_json::from_str::<RosterState>(&data) {
            Ok(state) => {
                info!(
                    "Loaded roster from disk ({} teams, {} members, {} labels{})",
                    state.teams.len(),
                    state.members.len(),
                    state.task_labels.len(),
                    if state.shuffle_event.is_some() { ", shuffle in flight" } else { "" }
                );
                state
            }
            Err(e) => {
                warn!("Failed to parse {}: {e}, using empty roster", path.display());
                RosterState::default()
            }
        },
        Err(e) => {
            warn!("Failed to read {}: {e}, using empty roster", path.display());
            RosterState::default()
        }
    }
}

pub async fn save_state(path: &Path, state: &RosterState) -> Result<()> {
    let json = serde_json::to_vec_pretty(state)?;
    write_atomically(path, &json).await?;
    Ok(())
}

/// Write to a sibling temp file, then rename over `path`, so readers only
/// ever see the old or the new contents.
pub async fn write_atomically(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let tmp = temp_path(path);
    fs::write(&tmp, bytes).await?;
    if let Err(e) = fs::rename(&tmp, path).await {
        let _ = fs::remove_file(&tmp).await;
        return Err(e);
    }
    Ok(())
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(OsString::from).unwrap_or_else(|| OsString::from("state"));
    name.push(".tmp");
    path.with_file_name(name)
}
