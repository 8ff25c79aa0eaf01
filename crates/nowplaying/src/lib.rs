//! Now-playing metadata for streaming radio stations.
//!
//! Given the station being played, [`engine::NowPlayingEngine`] keeps
//! resolving what is on air, either by polling a broadcaster's JSON API
//! ([`providers`]) or by reading ICY in-band metadata from the stream
//! ([`icy`]), and emits uniform [`snapshot::NowPlayingSnapshot`]s.

pub mod config;
pub mod engine;
pub mod error;
pub mod icy;
pub mod platform;
pub mod protocol;
pub mod providers;
pub mod snapshot;
pub mod state;
pub mod station;

pub use engine::{NowPlayingEngine, RefreshSettings};
pub use error::{IcyError, NowPlayingError};
pub use snapshot::NowPlayingSnapshot;
pub use station::{MetadataSource, StationDescriptor};
