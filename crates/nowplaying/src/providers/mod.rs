//! Now-playing JSON providers.
//!
//! Each provider is a serde shape plus a pure adapter from that shape to a
//! [`NowPlayingSnapshot`].  REST endpoints are not labelled with their
//! provider, so [`ProviderResponse::decode`] sniffs the payload by trying
//! each shape in a fixed order and keeping the first structural match:
//!
//!   1. NTS           (`results: [...]`)
//!   2. Worldwide FM  (`success: bool`)
//!   3. FIP           (`steps: {...}`, `levels: [...]`)
//!
//! A payload that satisfies more than one shape always resolves to the
//! earliest in this list.

pub mod fip;
pub mod nts;
pub mod worldwide;

use crate::error::{NowPlayingError, Result};
use crate::snapshot::NowPlayingSnapshot;
use crate::station::StationDescriptor;

pub use fip::FipResponse;
pub use nts::NtsResponse;
pub use worldwide::WorldwideResponse;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderKind {
    Nts,
    Worldwide,
    Fip,
}

impl ProviderKind {
    /// Decode priority.
    pub const ORDER: [ProviderKind; 3] = [Self::Nts, Self::Worldwide, Self::Fip];

    pub fn label(&self) -> &'static str {
        match self {
            Self::Nts => "nts",
            Self::Worldwide => "worldwide",
            Self::Fip => "fip",
        }
    }
}

#[derive(Debug, Clone)]
pub enum ProviderResponse {
    Nts(NtsResponse),
    Worldwide(WorldwideResponse),
    Fip(FipResponse),
}

impl ProviderResponse {
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let mut last_err = None;
        for kind in ProviderKind::ORDER {
            let decoded = match kind {
                ProviderKind::Nts => serde_json::from_slice(bytes).map(Self::Nts),
                ProviderKind::Worldwide => serde_json::from_slice(bytes).map(Self::Worldwide),
                ProviderKind::Fip => serde_json::from_slice(bytes).map(Self::Fip),
            };
            match decoded {
                Ok(response) => return Ok(response),
                Err(e) => last_err = Some(format!("{} ({})", kind.label(), e)),
            }
        }
        Err(NowPlayingError::Decode(
            last_err.unwrap_or_else(|| "no provider matched".to_string()),
        ))
    }

    pub fn kind(&self) -> ProviderKind {
        match self {
            Self::Nts(_) => ProviderKind::Nts,
            Self::Worldwide(_) => ProviderKind::Worldwide,
            Self::Fip(_) => ProviderKind::Fip,
        }
    }

    pub fn into_snapshot(self, station: &StationDescriptor) -> NowPlayingSnapshot {
        match self {
            Self::Nts(r) => nts::adapt(&r, station),
            Self::Worldwide(r) => worldwide::adapt(&r, station),
            Self::Fip(r) => fip::adapt(&r, station),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::station::MetadataSource;

    fn station(name: &str) -> StationDescriptor {
        StationDescriptor::new(name, "https://example.com/s", MetadataSource::None)
    }

    #[test]
    fn test_ambiguous_payload_prefers_nts() {
        let body = br#"{
            "results": [{"channel_name": "1", "now": {"broadcast_title": "Early Bird"}}],
            "success": true,
            "result": {"content": {"title": "Worldwide Show"}}
        }"#;
        let resp = ProviderResponse::decode(body).unwrap();
        assert_eq!(resp.kind(), ProviderKind::Nts);
        assert_eq!(resp.into_snapshot(&station("NTS 1")).title, "Early Bird");
    }

    #[test]
    fn test_worldwide_before_fip() {
        let body = br#"{"success": true, "steps": {}, "levels": []}"#;
        let resp = ProviderResponse::decode(body).unwrap();
        assert_eq!(resp.kind(), ProviderKind::Worldwide);
    }

    #[test]
    fn test_fip_is_last_resort() {
        let body = br#"{"steps": {"a": {"title": "Song"}}, "levels": [{"items": ["a"], "position": 0}]}"#;
        let resp = ProviderResponse::decode(body).unwrap();
        assert_eq!(resp.kind(), ProviderKind::Fip);
    }

    #[test]
    fn test_unknown_shape_is_decode_failure() {
        let err = ProviderResponse::decode(br#"{"hello": "world"}"#).unwrap_err();
        assert!(matches!(err, NowPlayingError::Decode(_)));
        assert!(err.to_string().starts_with("Unsupported now-playing response format"));
    }

    #[test]
    fn test_invalid_json_is_decode_failure() {
        let err = ProviderResponse::decode(b"<html>").unwrap_err();
        assert!(matches!(err, NowPlayingError::Decode(_)));
    }
}
