use crate::BroadcastMessage;
use nowplaying::protocol::{Command, PlaybackStatus};
use nowplaying::state::StateManager;
use nowplaying::{NowPlayingEngine, NowPlayingSnapshot};
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, error, info, warn};

/// Everything the daemon reacts to, funnelled into one queue.
#[derive(Debug)]
pub enum DaemonEvent {
    ClientCommand(Command),
}

/// Owns the now-playing engine and applies player commands one at a time.
pub struct DaemonCore {
    state_manager: Arc<StateManager>,
    engine: NowPlayingEngine,
    snapshot_rx: mpsc::UnboundedReceiver<NowPlayingSnapshot>,
    broadcast_tx: broadcast::Sender<BroadcastMessage>,
}

impl DaemonCore {
    pub fn new(
        state_manager: Arc<StateManager>,
        engine: NowPlayingEngine,
        snapshot_rx: mpsc::UnboundedReceiver<NowPlayingSnapshot>,
        broadcast_tx: broadcast::Sender<BroadcastMessage>,
    ) -> Self {
        Self {
            state_manager,
            engine,
            snapshot_rx,
            broadcast_tx,
        }
    }

    pub fn state_manager(&self) -> Arc<StateManager> {
        Arc::clone(&self.state_manager)
    }

    pub async fn run(mut self, mut event_rx: mpsc::Receiver<DaemonEvent>) -> anyhow::Result<()> {
        info!("Daemon core running");

        loop {
            tokio::select! {
                biased;

                Some(snapshot) = self.snapshot_rx.recv() => {
                    self.apply_snapshot(snapshot).await;
                }

                event = event_rx.recv() => {
                    let Some(event) = event else {
                        info!("Event channel closed, shutting down");
                        break;
                    };
                    match event {
                        DaemonEvent::ClientCommand(cmd) => {
                            info!("Processing command: {:?}", cmd);
                            if let Err(e) = self.handle_command(cmd).await {
                                error!("Error handling command: {}", e);
                            }
                        }
                    }
                }
            }
        }

        self.engine.stop_updating(false).await;
        Ok(())
    }

    pub async fn handle_command(&mut self, cmd: Command) -> anyhow::Result<()> {
        match cmd {
            Command::Play { station_idx } => self.play_station(station_idx).await?,
            Command::Pause => self.pause().await,
            Command::Resume => self.resume().await?,
            Command::Stop => self.stop().await,
            Command::Next => self.step(true).await?,
            Command::Prev => self.step(false).await?,
            Command::GetState => {
                // State is sent back by the socket handler
            }
        }
        Ok(())
    }

    async fn play_station(&mut self, idx: usize) -> anyhow::Result<()> {
        let Some(station) = self.state_manager.station(idx).await else {
            warn!("No station at index {}", idx);
            return Ok(());
        };
        if !station.enabled {
            warn!("Station {} is disabled", station.name);
            return Ok(());
        }

        info!("Playing station: {}", station.name);
        if self.engine.is_updating() {
            self.halt_refresh(true).await;
        }
        self.state_manager.set_playing(idx).await?;
        self.notify_state();
        self.engine.start_updating(station).await;
        Ok(())
    }

    async fn pause(&mut self) {
        if self.playback_status().await != PlaybackStatus::Playing {
            return;
        }
        info!("Pausing now-playing refresh");
        self.halt_refresh(false).await;
        self.state_manager
            .set_playback_status(PlaybackStatus::Paused)
            .await;
        self.notify_state();
    }

    async fn resume(&mut self) -> anyhow::Result<()> {
        let state = self.state_manager.get_state().await;
        if !matches!(
            state.playback_status,
            PlaybackStatus::Paused | PlaybackStatus::Stopped
        ) {
            return Ok(());
        }
        let Some(idx) = state.current_station else {
            return Ok(());
        };
        self.play_station(idx).await
    }

    async fn stop(&mut self) {
        info!("Stopping playback");
        self.halt_refresh(false).await;
        self.engine.set_stopped_state();
        self.state_manager
            .set_playback_status(PlaybackStatus::Stopped)
            .await;
        self.notify_state();
    }

    async fn step(&mut self, forward: bool) -> anyhow::Result<()> {
        match self.state_manager.neighbour_station(forward).await {
            Some(idx) => self.play_station(idx).await,
            None => {
                warn!("No playable stations");
                Ok(())
            }
        }
    }

    /// Stops the refresh loop and applies only the newest snapshot it
    /// queued.  With `reset` that is the "Not playing" snapshot.
    async fn halt_refresh(&mut self, reset: bool) {
        self.engine.stop_updating(reset).await;

        let mut last = None;
        while let Ok(snapshot) = self.snapshot_rx.try_recv() {
            last = Some(snapshot);
        }
        if let Some(snapshot) = last {
            self.apply_snapshot(snapshot).await;
        }
    }

    async fn apply_snapshot(&mut self, snapshot: NowPlayingSnapshot) {
        debug!("now playing: {:?} / {:?}", snapshot.title, snapshot.subtitle);
        self.state_manager.set_now_playing(snapshot.clone()).await;
        let _ = self
            .broadcast_tx
            .send(BroadcastMessage::NowPlaying(snapshot));
        self.notify_state();
    }

    async fn playback_status(&self) -> PlaybackStatus {
        self.state_manager.get_state().await.playback_status
    }

    fn notify_state(&self) {
        let _ = self.broadcast_tx.send(BroadcastMessage::StateUpdated);
    }
}
