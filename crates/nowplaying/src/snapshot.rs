use serde::{Deserialize, Serialize};

use crate::station::StationDescriptor;

pub const NOT_PLAYING_TITLE: &str = "Not playing";
pub const STOPPED_TITLE: &str = "Stopped";
pub const NO_ENDPOINT_SUBTITLE: &str = "No now-playing endpoint";
pub const FETCH_FAILED_SUBTITLE: &str = "Unable to fetch now playing";

/// Normalized "what is on air" state.  A new snapshot always replaces the
/// previous one wholesale; fields are never merged.
///
/// `title` is never empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NowPlayingSnapshot {
    pub title: String,
    #[serde(default)]
    pub subtitle: Option<String>,
    #[serde(default)]
    pub artwork_url: Option<String>,
    #[serde(default)]
    pub error_message: Option<String>,
}

impl Default for NowPlayingSnapshot {
    fn default() -> Self {
        Self::not_playing()
    }
}

impl NowPlayingSnapshot {
    /// Builds a snapshot from optional provider fields, falling back to the
    /// station's display title when the provider gave no usable title.
    pub fn from_parts(
        station: &StationDescriptor,
        title: Option<String>,
        subtitle: Option<String>,
        artwork_url: Option<String>,
    ) -> Self {
        Self {
            title: non_blank(title).unwrap_or_else(|| station.display_title()),
            subtitle: non_blank(subtitle),
            artwork_url: non_blank(artwork_url),
            error_message: None,
        }
    }

    pub fn not_playing() -> Self {
        Self {
            title: NOT_PLAYING_TITLE.to_string(),
            subtitle: None,
            artwork_url: None,
            error_message: None,
        }
    }

    /// "Stopped" keeps whatever artwork the caller decides to carry over.
    pub fn stopped(artwork_url: Option<String>) -> Self {
        Self {
            title: STOPPED_TITLE.to_string(),
            subtitle: None,
            artwork_url,
            error_message: None,
        }
    }

    pub fn no_endpoint(station: &StationDescriptor) -> Self {
        Self {
            title: station.display_title(),
            subtitle: Some(NO_ENDPOINT_SUBTITLE.to_string()),
            artwork_url: None,
            error_message: None,
        }
    }

    pub fn fetch_failed(station: &StationDescriptor, error: impl ToString) -> Self {
        Self {
            title: station.display_title(),
            subtitle: Some(FETCH_FAILED_SUBTITLE.to_string()),
            artwork_url: None,
            error_message: Some(error.to_string()),
        }
    }

    pub fn is_error(&self) -> bool {
        self.error_message.is_some()
    }
}

/// Treats empty / whitespace-only strings as absent.
pub(crate) fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}
