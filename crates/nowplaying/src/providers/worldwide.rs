//! Worldwide FM (radiocult `schedule/live`).

use serde::Deserialize;

use crate::snapshot::{non_blank, NowPlayingSnapshot};
use crate::station::StationDescriptor;

#[derive(Debug, Clone, Deserialize)]
pub struct WorldwideResponse {
    pub success: bool,
    pub result: Option<WorldwideResult>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct WorldwideResult {
    pub status: Option<String>,
    pub content: Option<WorldwideContent>,
    pub metadata: Option<WorldwideMetadata>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct WorldwideContent {
    pub title: Option<String>,
    pub color: Option<String>,
    pub media: Option<WorldwideMedia>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct WorldwideMetadata {
    pub title: Option<String>,
    pub artist: Option<String>,
    pub album: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct WorldwideMedia {
    #[serde(rename = "type")]
    pub kind: Option<String>,
}

/// Title: show title, then track title.  Subtitle: artist, then track title,
/// then the schedule status ("live", "offAir", ...).  No artwork.
pub fn adapt(response: &WorldwideResponse, station: &StationDescriptor) -> NowPlayingSnapshot {
    let result = response.result.as_ref();
    let content = result.and_then(|r| r.content.as_ref());
    let metadata = result.and_then(|r| r.metadata.as_ref());

    let track_title = metadata.and_then(|m| non_blank(m.title.clone()));

    let title = content
        .and_then(|c| non_blank(c.title.clone()))
        .or_else(|| track_title.clone());
    let subtitle = metadata
        .and_then(|m| non_blank(m.artist.clone()))
        .or(track_title)
        .or_else(|| result.and_then(|r| non_blank(r.status.clone())));

    NowPlayingSnapshot::from_parts(station, title, subtitle, None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::station::MetadataSource;
    use serde_json::json;

    fn wwfm() -> StationDescriptor {
        StationDescriptor::new("Worldwide FM", "https://wwfm/stream", MetadataSource::None)
    }

    fn adapt_json(value: serde_json::Value) -> NowPlayingSnapshot {
        let resp: WorldwideResponse = serde_json::from_value(value).unwrap();
        adapt(&resp, &wwfm())
    }

    #[test]
    fn test_content_title_and_artist() {
        let snap = adapt_json(json!({
            "success": true,
            "result": {
                "status": "live",
                "content": {"title": "Gilles Peterson", "color": "#ff0000"},
                "metadata": {"title": "Track", "artist": "Artist", "album": "LP"}
            }
        }));
        assert_eq!(snap.title, "Gilles Peterson");
        assert_eq!(snap.subtitle.as_deref(), Some("Artist"));
        assert!(snap.artwork_url.is_none());
    }

    #[test]
    fn test_metadata_title_fills_both() {
        let snap = adapt_json(json!({
            "success": true,
            "result": {"metadata": {"title": "Track"}}
        }));
        assert_eq!(snap.title, "Track");
        assert_eq!(snap.subtitle.as_deref(), Some("Track"));
    }

    #[test]
    fn test_status_is_last_subtitle_fallback() {
        let snap = adapt_json(json!({
            "success": true,
            "result": {"status": "offAir"}
        }));
        assert_eq!(snap.title, "Worldwide FM");
        assert_eq!(snap.subtitle.as_deref(), Some("offAir"));
    }

    #[test]
    fn test_missing_result() {
        let snap = adapt_json(json!({"success": false}));
        assert_eq!(snap.title, "Worldwide FM");
        assert!(snap.subtitle.is_none());
    }

    #[test]
    fn test_success_is_required() {
        assert!(serde_json::from_value::<WorldwideResponse>(json!({"result": {}})).is_err());
    }
}
