use crate::protocol::{PlaybackStatus, PlayerState};
use crate::snapshot::NowPlayingSnapshot;
use crate::station::StationDescriptor;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::sync::RwLock;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct PersistentState {
    pub last_station_idx: Option<usize>,
}

pub struct StateManager {
    state: RwLock<PlayerState>,
    state_file: PathBuf,
}

impl StateManager {
    pub fn new(state_file: PathBuf, stations: Vec<StationDescriptor>) -> Self {
        let persistent = Self::load_persistent(&state_file);
        let current_station = persistent
            .last_station_idx
            .filter(|&idx| idx < stations.len());

        let state = PlayerState {
            rev: 1,
            stations,
            current_station,
            playback_status: PlaybackStatus::Idle,
            now_playing: NowPlayingSnapshot::not_playing(),
        };

        Self {
            state: RwLock::new(state),
            state_file,
        }
    }

    pub async fn get_state(&self) -> PlayerState {
        self.state.read().await.clone()
    }

    pub async fn station(&self, idx: usize) -> Option<StationDescriptor> {
        self.state.read().await.stations.get(idx).cloned()
    }

    pub async fn set_playing(&self, idx: usize) -> anyhow::Result<()> {
        {
            let mut state = self.state.write().await;
            state.current_station = Some(idx);
            state.playback_status = PlaybackStatus::Playing;
            state.rev += 1;
        }
        self.save().await
    }

    pub async fn set_playback_status(&self, status: PlaybackStatus) {
        let mut state = self.state.write().await;
        state.playback_status = status;
        state.rev += 1;
    }

    pub async fn set_now_playing(&self, snapshot: NowPlayingSnapshot) {
        let mut state = self.state.write().await;
        state.now_playing = snapshot;
        state.rev += 1;
    }

    /// Index of the next (or previous) enabled station, wrapping around.
    pub async fn neighbour_station(&self, forward: bool) -> Option<usize> {
        let state = self.state.read().await;
        let len = state.stations.len();
        if len == 0 {
            return None;
        }

        let start = state.current_station.unwrap_or(if forward { len - 1 } else { 0 });
        (1..=len)
            .map(|offset| {
                if forward {
                    (start + offset) % len
                } else {
                    (start + len - offset % len) % len
                }
            })
            .find(|&idx| state.stations[idx].enabled)
    }

    async fn save(&self) -> anyhow::Result<()> {
        let persistent = {
            let state = self.state.read().await;
            PersistentState {
                last_station_idx: state.current_station,
            }
        };

        if let Some(parent) = self.state_file.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let json = serde_json::to_string_pretty(&persistent)?;
        tokio::fs::write(&self.state_file, json).await?;
        Ok(())
    }

    fn load_persistent(state_file: &Path) -> PersistentState {
        if let Ok(content) = std::fs::read_to_string(state_file) {
            if let Ok(persistent) = serde_json::from_str::<PersistentState>(&content) {
                return persistent;
            }
        }
        PersistentState::default()
    }
}
