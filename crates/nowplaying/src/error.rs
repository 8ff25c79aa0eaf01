//! Error types for the now-playing refresh subsystem.
//!
//! None of these ever reach the UI as a failure: the engine folds every error
//! into a placeholder snapshot and keeps polling.

use thiserror::Error;

/// Failures of a single ICY metadata read.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum IcyError {
    #[error("server did not advertise an icy-metaint interval")]
    NoMetaint,

    #[error("stream carried no StreamTitle metadata")]
    NoMetadata,

    #[error("stream ended before the metadata block")]
    InvalidStream,
}

/// Anything that can go wrong during one refresh cycle.
#[derive(Error, Debug)]
pub enum NowPlayingError {
    #[error("ICY metadata: {0}")]
    Icy(#[from] IcyError),

    #[error("Unsupported now-playing response format: {0}")]
    Decode(String),

    #[error("{}", friendly_transport_error(.0))]
    Transport(#[from] reqwest::Error),
}

pub type Result<T> = std::result::Result<T, NowPlayingError>;

fn friendly_transport_error(e: &reqwest::Error) -> String {
    if e.is_connect() {
        if let Some(url) = e.url() {
            return format!(
                "Could not connect to {}",
                url.host_str().unwrap_or("server")
            );
        }
        return "Could not connect to server".to_string();
    }
    if e.is_timeout() {
        return "The request timed out".to_string();
    }
    if let Some(status) = e.status() {
        return format!("Server returned {}", status);
    }
    format!("Network error: {e}")
}
