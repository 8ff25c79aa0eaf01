//! FIP / Radio France (`livemeta/pull/{id}`).
//!
//! `levels[0].items` lists step ids in broadcast order and
//! `levels[0].position` points at the one on air.

use std::collections::HashMap;

use serde::Deserialize;

use crate::snapshot::{non_blank, NowPlayingSnapshot};
use crate::station::StationDescriptor;

#[derive(Debug, Clone, Deserialize)]
pub struct FipResponse {
    pub steps: HashMap<String, FipStep>,
    pub levels: Vec<FipLevel>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FipLevel {
    pub items: Vec<String>,
    pub position: i64,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FipStep {
    pub title: Option<String>,
    pub highlighted_artists: Option<Vec<String>>,
    pub authors: Option<String>,
    pub titre_album: Option<String>,
    pub visual: Option<String>,
    pub start: Option<f64>,
    pub end: Option<f64>,
}

impl FipResponse {
    /// The step at `levels[0].items[position]`, if every link resolves.
    pub fn current_step(&self) -> Option<&FipStep> {
        let level = self.levels.first()?;
        let index = usize::try_from(level.position).ok()?;
        let step_id = level.items.get(index)?;
        self.steps.get(step_id)
    }
}

impl FipStep {
    pub fn artist(&self) -> Option<String> {
        self.highlighted_artists
            .as_ref()
            .and_then(|a| a.first())
            .cloned()
            .and_then(|a| non_blank(Some(a)))
            .or_else(|| non_blank(self.authors.clone()))
    }
}

pub fn adapt(response: &FipResponse, station: &StationDescriptor) -> NowPlayingSnapshot {
    let step = response.current_step();
    NowPlayingSnapshot::from_parts(
        station,
        step.and_then(|s| s.title.clone()),
        step.and_then(FipStep::artist),
        step.and_then(|s| s.visual.clone()),
    )
}
