//! NTS live API (`/api/v2/live`).
//!
//! Each channel carries the current broadcast under `now` and the upcoming
//! ones under numbered keys (`next`, `next1`, `next2`, ...).  Those keys are
//! not a fixed schema, so channels are decoded with a map visitor that sees
//! every raw key in document order.

use std::fmt;

use serde::de::{IgnoredAny, MapAccess, Visitor};
use serde::{Deserialize, Deserializer};

use crate::snapshot::{non_blank, NowPlayingSnapshot};
use crate::station::StationDescriptor;

const UPCOMING_PREFIX: &str = "next";

#[derive(Debug, Clone, Deserialize)]
pub struct NtsResponse {
    pub results: Vec<NtsChannel>,
}

#[derive(Debug, Clone, Default)]
pub struct NtsChannel {
    pub channel_name: Option<String>,
    pub now: Option<NtsBroadcast>,
    /// Sorted by the numeric suffix of their `next*` key.
    pub upcoming: Vec<NtsBroadcast>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct NtsBroadcast {
    pub broadcast_title: Option<String>,
    pub start_timestamp: Option<String>,
    pub end_timestamp: Option<String>,
    pub embeds: Option<NtsEmbeds>,
    pub links: Option<Vec<NtsLink>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct NtsEmbeds {
    pub details: Option<NtsEpisodeDetails>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct NtsEpisodeDetails {
    pub status: Option<String>,
    pub updated: Option<String>,
    pub name: Option<String>,
    pub description: Option<String>,
    pub description_html: Option<String>,
    pub location_short: Option<String>,
    pub location_long: Option<String>,
    pub intensity: Option<String>,
    pub media: Option<NtsMedia>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct NtsMedia {
    pub background_large: Option<String>,
    pub background_medium_large: Option<String>,
    pub background_medium: Option<String>,
    pub background_small: Option<String>,
    pub background_thumb: Option<String>,
    pub picture_large: Option<String>,
    pub picture_medium_large: Option<String>,
    pub picture_medium: Option<String>,
    pub picture_small: Option<String>,
    pub picture_thumb: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct NtsLink {
    pub href: Option<String>,
    pub rel: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
}

// ── channel decoding ──────────────────────────────────────────────────────────

impl<'de> Deserialize<'de> for NtsChannel {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_map(ChannelVisitor)
    }
}

struct ChannelVisitor;

impl<'de> Visitor<'de> for ChannelVisitor {
    type Value = NtsChannel;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("an NTS live channel object")
    }

    fn visit_map<A>(self, mut map: A) -> Result<NtsChannel, A::Error>
    where
        A: MapAccess<'de>,
    {
        let mut channel = NtsChannel::default();
        let mut upcoming: Vec<(i64, NtsBroadcast)> = Vec::new();

        while let Some(key) = map.next_key::<String>()? {
            match key.as_str() {
                "channel_name" => channel.channel_name = map.next_value()?,
                "now" => channel.now = map.next_value()?,
                k if k.starts_with(UPCOMING_PREFIX) => {
                    let raw: serde_json::Value = map.next_value()?;
                    // Entries that are not broadcasts are skipped, not fatal.
                    if let Ok(broadcast) = serde_json::from_value::<NtsBroadcast>(raw) {
                        upcoming.push((upcoming_order(k), broadcast));
                    }
                }
                _ => {
                    map.next_value::<IgnoredAny>()?;
                }
            }
        }

        // Stable: equal suffixes keep document order.
        upcoming.sort_by_key(|(order, _)| *order);
        channel.upcoming = upcoming.into_iter().map(|(_, b)| b).collect();
        Ok(channel)
    }
}

/// `next3` → 3.  A missing or non-numeric suffix counts as 1.
fn upcoming_order(key: &str) -> i64 {
    key[UPCOMING_PREFIX.len()..].parse().unwrap_or(1)
}

// ── adapter ───────────────────────────────────────────────────────────────────

/// NTS names its channels "1" and "2"; a station whose name mentions 2 is
/// the second channel.
pub fn inferred_channel_name(station: &StationDescriptor) -> &'static str {
    if station.name.contains('2') {
        "2"
    } else {
        "1"
    }
}

pub fn best_channel<'a>(
    channels: &'a [NtsChannel],
    station: &StationDescriptor,
) -> Option<&'a NtsChannel> {
    let wanted = inferred_channel_name(station);
    channels
        .iter()
        .find(|c| c.channel_name.as_deref() == Some(wanted))
        .or_else(|| channels.first())
}

pub fn adapt(response: &NtsResponse, station: &StationDescriptor) -> NowPlayingSnapshot {
    let now = best_channel(&response.results, station).and_then(|c| c.now.as_ref());
    let details = now
        .and_then(|n| n.embeds.as_ref())
        .and_then(|e| e.details.as_ref());

    let show_name = details.and_then(|d| non_blank(d.name.clone()));
    let broadcast_title = now
        .and_then(|n| n.broadcast_title.as_deref())
        .map(|t| html_escape::decode_html_entities(t).into_owned());

    let (title, subtitle) = match show_name {
        Some(name) => (Some(name), broadcast_title),
        None => (broadcast_title, None),
    };

    let media = details.and_then(|d| d.media.as_ref());
    let artwork = media.and_then(|m| {
        non_blank(m.picture_medium.clone()).or_else(|| non_blank(m.background_medium.clone()))
    });

    NowPlayingSnapshot::from_parts(station, title, subtitle, artwork)
}
