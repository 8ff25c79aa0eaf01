//! Station descriptors and the registry they come from.
//!
//! The built-in list mirrors the stations the player ships with.  A
//! `stations.toml` file, when present, replaces it entirely.

use serde::{Deserialize, Serialize};
use tracing::warn;

/// Where "what is on air" comes from for a station.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(tag = "kind", content = "url")]
pub enum MetadataSource {
    /// JSON endpoint polled over HTTP.
    Rest(String),
    /// ICY in-band metadata read from this stream URL.
    Icy(String),
    /// Display the station name only.
    #[default]
    None,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StationDescriptor {
    pub name: String,
    pub stream_url: String,
    #[serde(default)]
    pub metadata_source: MetadataSource,
    /// Fallback artwork image name, used when no artwork URL is known.
    #[serde(default)]
    pub artwork: Option<String>,
    #[serde(default)]
    pub description: String,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

fn default_enabled() -> bool {
    true
}

impl StationDescriptor {
    pub fn new(
        name: impl Into<String>,
        stream_url: impl Into<String>,
        metadata_source: MetadataSource,
    ) -> Self {
        Self {
            name: name.into(),
            stream_url: stream_url.into(),
            metadata_source,
            artwork: None,
            description: String::new(),
            enabled: true,
        }
    }

    pub fn with_artwork(mut self, artwork: impl Into<String>) -> Self {
        self.artwork = Some(artwork.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Name shown when nothing better is known.  Never empty.
    pub fn display_title(&self) -> String {
        let name = self.name.trim();
        if name.is_empty() {
            "Live".to_string()
        } else {
            name.to_string()
        }
    }
}

// ── built-in registry ─────────────────────────────────────────────────────────

const NTS_LIVE_API: &str = "https://www.nts.live/api/v2/live";

pub fn builtin_stations() -> Vec<StationDescriptor> {
    vec![
        StationDescriptor::new(
            "NTS 1",
            "https://stream-relay-geo.ntslive.net/stream",
            MetadataSource::Rest(NTS_LIVE_API.to_string()),
        )
        .with_artwork("nts-radio-1")
        .with_description("NTS Radio, broadcasting from Hackney since 2011. Don't Assume."),
        StationDescriptor::new(
            "NTS 2",
            "https://stream-relay-geo.ntslive.net/stream2",
            MetadataSource::Rest(NTS_LIVE_API.to_string()),
        )
        .with_artwork("nts-radio-2")
        .with_description("NTS Radio, second channel."),
        StationDescriptor::new(
            "Worldwide FM",
            "https://worldwide-fm.radiocult.fm/stream",
            MetadataSource::Rest(
                "https://api.radiocult.fm/api/station/worldwide-fm/schedule/live".to_string(),
            ),
        )
        .with_artwork("worldwide-fm-radio")
        .with_description(
            "Underground music, stories and culture from around the world.",
        ),
        StationDescriptor::new(
            "FIP",
            "https://icecast.radiofrance.fr/fip-hifi.aac?id=radiofrance",
            MetadataSource::Rest("https://api.radiofrance.fr/livemeta/pull/7".to_string()),
        )
        .with_artwork("fip-radio")
        .with_description("Hand-picked three-hour blocks, never the same song twice in 48 hours."),
        StationDescriptor::new(
            "Kiosk Radio",
            "https://kioskradiobxl.out.airtime.pro/kioskradiobxl_b",
            MetadataSource::Icy("https://kioskradiobxl.out.airtime.pro/kioskradiobxl_b".to_string()),
        )
        .with_artwork("kioskradio")
        .with_description("Webradio broadcasting from Brussels' Parc Royal."),
    ]
}

/// Stations the player may actually tune to.
pub fn playable(stations: &[StationDescriptor]) -> Vec<StationDescriptor> {
    stations.iter().filter(|s| s.enabled).cloned().collect()
}

// ── TOML station loader ───────────────────────────────────────────────────────

/// Matches the `[[station]]` table.  Kept apart from `StationDescriptor` so
/// the file format can carry both source URLs while the descriptor holds
/// exactly one.
#[derive(Debug, Deserialize)]
struct TomlStationFile {
    station: Vec<TomlStation>,
}

#[derive(Debug, Deserialize)]
struct TomlStation {
    name: String,
    url: String,
    #[serde(default)]
    now_playing_url: String,
    #[serde(default)]
    icy_url: String,
    #[serde(default)]
    image: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    disable: bool,
}

impl From<TomlStation> for StationDescriptor {
    fn from(s: TomlStation) -> Self {
        let icy = s.icy_url.trim();
        let rest = s.now_playing_url.trim();
        let metadata_source = match (icy.is_empty(), rest.is_empty()) {
            (false, rest_empty) => {
                if !rest_empty {
                    warn!(
                        "station {:?} sets both icy_url and now_playing_url; using ICY",
                        s.name
                    );
                }
                MetadataSource::Icy(icy.to_string())
            }
            (true, false) => MetadataSource::Rest(rest.to_string()),
            (true, true) => MetadataSource::None,
        };

        Self {
            name: s.name,
            stream_url: s.url,
            metadata_source,
            artwork: Some(s.image).filter(|i| !i.trim().is_empty()),
            description: s.description,
            enabled: !s.disable,
        }
    }
}

pub fn parse_stations_from_toml_str(content: &str) -> anyhow::Result<Vec<StationDescriptor>> {
    let file: TomlStationFile = toml::from_str(content)?;
    Ok(file.station.into_iter().map(StationDescriptor::from).collect())
}

pub fn load_stations_from_toml(path: &std::path::Path) -> anyhow::Result<Vec<StationDescriptor>> {
    let content = std::fs::read_to_string(path)?;
    parse_stations_from_toml_str(&content)
}

/// Loads `path` if it exists, otherwise the built-in registry.
pub fn load_stations(path: &std::path::Path) -> anyhow::Result<Vec<StationDescriptor>> {
    if path.exists() {
        load_stations_from_toml(path)
    } else {
        Ok(builtin_stations())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_registry_sources() {
        let stations = builtin_stations();
        assert_eq!(stations.len(), 5);
        assert!(matches!(stations[0].metadata_source, MetadataSource::Rest(_)));
        assert!(matches!(stations[4].metadata_source, MetadataSource::Icy(_)));
        assert!(stations.iter().all(|s| s.enabled));
    }

    #[test]
    fn test_parse_toml_picks_single_source() {
        let toml = r#"
            [[station]]
            name = "Both"
            url = "https://a/stream"
            now_playing_url = "https://a/api"
            icy_url = "https://a/stream"

            [[station]]
            name = "Rest"
            url = "https://b/stream"
            now_playing_url = "https://b/api"

            [[station]]
            name = "Plain"
            url = "https://c/stream"
            disable = true
        "#;
        let stations = parse_stations_from_toml_str(toml).unwrap();
        assert_eq!(
            stations[0].metadata_source,
            MetadataSource::Icy("https://a/stream".into())
        );
        assert_eq!(
            stations[1].metadata_source,
            MetadataSource::Rest("https://b/api".into())
        );
        assert_eq!(stations[2].metadata_source, MetadataSource::None);
        assert!(!stations[2].enabled);
        assert_eq!(playable(&stations).len(), 2);
    }

    #[test]
    fn test_missing_file_falls_back_to_builtin() {
        let stations =
            load_stations(std::path::Path::new("/definitely/not/here/stations.toml")).unwrap();
        assert_eq!(stations.len(), builtin_stations().len());
    }
}
