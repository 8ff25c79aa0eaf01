//! Now-playing refresh engine.
//!
//! ```text
//!   NowPlayingEngine (single owner, &mut self)
//!         │
//!         ├── start_updating(station) ── cancel + await previous loop
//!         │                            └─ spawn refresh loop ─┐
//!         │                                                   │
//!         │   refresh loop:  fetch ─► publish ─► sleep ─► fetch ...
//!         │                  (ICY every 15 s, REST every 30 s)
//!         │                                                   │
//!         └── snapshot channel ◄──────────────────────────────┘
//! ```
//!
//! Every await inside the loop is raced against the loop's
//! `CancellationToken`, and the token is checked again before publishing.
//! Because the engine waits for the old task to finish before spawning the
//! next one, a snapshot for the previous station can never be published
//! after the new station's loop has started.

use std::time::Duration;

use reqwest::header::ACCEPT;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::NowPlayingConfig;
use crate::error::Result;
use crate::icy;
use crate::providers::ProviderResponse;
use crate::snapshot::NowPlayingSnapshot;
use crate::station::{MetadataSource, StationDescriptor};

#[derive(Debug, Clone)]
pub struct RefreshSettings {
    pub rest_interval: Duration,
    pub icy_interval: Duration,
    pub request_timeout: Duration,
}

impl Default for RefreshSettings {
    fn default() -> Self {
        (&NowPlayingConfig::default()).into()
    }
}

impl From<&NowPlayingConfig> for RefreshSettings {
    fn from(cfg: &NowPlayingConfig) -> Self {
        Self {
            rest_interval: cfg.rest_interval(),
            icy_interval: cfg.icy_interval(),
            request_timeout: cfg.request_timeout(),
        }
    }
}

/// HTTP client shared by REST polling and ICY reads.
pub fn build_client(user_agent: &str) -> reqwest::Result<reqwest::Client> {
    reqwest::Client::builder()
        .user_agent(user_agent)
        // Icecast relays and API gateways both like to redirect
        .redirect(reqwest::redirect::Policy::limited(10))
        .build()
}

struct ActiveLoop {
    station: StationDescriptor,
    cancel: CancellationToken,
    /// Resolves to the artwork of the last snapshot the loop published.
    handle: JoinHandle<Option<String>>,
}

pub struct NowPlayingEngine {
    client: reqwest::Client,
    settings: RefreshSettings,
    tx: mpsc::UnboundedSender<NowPlayingSnapshot>,
    active: Option<ActiveLoop>,
    last_artwork: Option<String>,
}

impl NowPlayingEngine {
    /// Creates an idle engine and the receiving end of its snapshot channel.
    /// One message arrives per emitted snapshot.
    pub fn new(
        client: reqwest::Client,
        settings: RefreshSettings,
    ) -> (Self, mpsc::UnboundedReceiver<NowPlayingSnapshot>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let engine = Self {
            client,
            settings,
            tx,
            active: None,
            last_artwork: None,
        };
        (engine, rx)
    }

    pub fn is_updating(&self) -> bool {
        self.active.is_some()
    }

    pub fn current_station(&self) -> Option<&StationDescriptor> {
        self.active.as_ref().map(|a| &a.station)
    }

    /// Replaces whatever loop is running with one for `station`.
    pub async fn start_updating(&mut self, station: StationDescriptor) {
        self.cancel_active().await;

        let interval = match &station.metadata_source {
            MetadataSource::Icy(_) => self.settings.icy_interval,
            MetadataSource::Rest(_) => self.settings.rest_interval,
            MetadataSource::None => {
                info!("[now-playing] {} has no metadata source", station.name);
                self.last_artwork = None;
                self.publish(NowPlayingSnapshot::no_endpoint(&station));
                return;
            }
        };

        info!(
            "[now-playing] updating {} every {}s",
            station.name,
            interval.as_secs()
        );

        let cancel = CancellationToken::new();
        let refresh = RefreshLoop {
            client: self.client.clone(),
            station: station.clone(),
            interval,
            request_timeout: self.settings.request_timeout,
            tx: self.tx.clone(),
            cancel: cancel.clone(),
        };
        let handle = tokio::spawn(refresh.run());

        self.active = Some(ActiveLoop {
            station,
            cancel,
            handle,
        });
    }

    /// Cancels the running loop.  With `reset_state` a cleared "Not playing"
    /// snapshot follows; without it the last snapshot stays in place.
    pub async fn stop_updating(&mut self, reset_state: bool) {
        self.cancel_active().await;

        if reset_state {
            self.last_artwork = None;
            self.publish(NowPlayingSnapshot::not_playing());
        }
    }

    /// Publishes "Stopped", carrying over the artwork of the last snapshot a
    /// finished loop published.
    pub fn set_stopped_state(&mut self) {
        self.publish(NowPlayingSnapshot::stopped(self.last_artwork.clone()));
    }

    async fn cancel_active(&mut self) {
        let Some(active) = self.active.take() else {
            return;
        };

        active.cancel.cancel();
        self.last_artwork = match active.handle.await {
            Ok(artwork) => artwork,
            Err(e) => {
                warn!(
                    "[now-playing] refresh loop for {} ended abnormally: {}",
                    active.station.name, e
                );
                None
            }
        };
        debug!("[now-playing] stopped updating {}", active.station.name);
    }

    fn publish(&self, snapshot: NowPlayingSnapshot) {
        if self.tx.send(snapshot).is_err() {
            debug!("[now-playing] snapshot receiver dropped");
        }
    }
}

impl Drop for NowPlayingEngine {
    fn drop(&mut self) {
        if let Some(active) = self.active.take() {
            active.cancel.cancel();
        }
    }
}

// ── refresh loop ──────────────────────────────────────────────────────────────

struct RefreshLoop {
    client: reqwest::Client,
    station: StationDescriptor,
    interval: Duration,
    request_timeout: Duration,
    tx: mpsc::UnboundedSender<NowPlayingSnapshot>,
    cancel: CancellationToken,
}

impl RefreshLoop {
    async fn run(self) -> Option<String> {
        let mut last_artwork = None;

        loop {
            let snapshot = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => break,
                snapshot = fetch_snapshot(&self.client, &self.station, self.request_timeout) => snapshot,
            };

            // The fetch may have completed in the same instant we were cancelled.
            if self.cancel.is_cancelled() {
                break;
            }
            last_artwork = snapshot.artwork_url.clone();
            if self.tx.send(snapshot).is_err() {
                debug!("[now-playing] snapshot receiver dropped, ending loop");
                break;
            }

            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => break,
                _ = tokio::time::sleep(self.interval) => {}
            }
        }

        last_artwork
    }
}

/// Runs one refresh cycle for `station`.  Never fails: errors become a
/// placeholder snapshot carrying the error message.
pub async fn fetch_snapshot(
    client: &reqwest::Client,
    station: &StationDescriptor,
    request_timeout: Duration,
) -> NowPlayingSnapshot {
    let result = match &station.metadata_source {
        MetadataSource::Icy(url) => icy::fetch_stream_title(client, url, request_timeout)
            .await
            .map(|title| icy::snapshot_from_stream_title(&title, station)),
        MetadataSource::Rest(url) => fetch_provider(client, url, request_timeout)
            .await
            .map(|response| {
                debug!(
                    "[now-playing] {} decoded as {}",
                    station.name,
                    response.kind().label()
                );
                response.into_snapshot(station)
            }),
        MetadataSource::None => return NowPlayingSnapshot::no_endpoint(station),
    };

    match result {
        Ok(snapshot) => snapshot,
        Err(e) => {
            warn!("[now-playing] refresh failed for {}: {}", station.name, e);
            NowPlayingSnapshot::fetch_failed(station, e)
        }
    }
}

async fn fetch_provider(
    client: &reqwest::Client,
    url: &str,
    request_timeout: Duration,
) -> Result<ProviderResponse> {
    let body = client
        .get(url)
        .header(ACCEPT, "application/json")
        .timeout(request_timeout)
        .send()
        .await?
        .error_for_status()?
        .bytes()
        .await?;
    ProviderResponse::decode(&body)
}
