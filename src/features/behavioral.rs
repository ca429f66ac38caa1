//! Dwell and flight timings over one captured sample.

use super::{mean, std_dev};
use crate::capture::{KeyPhase, KeystrokeEvent};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct KeystrokeTimings {
    /// Press→release of the same key, adjacent in the stream
    pub dwell: Vec<f64>,
    /// Release→next release
    pub flight: Vec<f64>,
}

impl KeystrokeTimings {
    pub fn from_events(events: &[KeystrokeEvent]) -> Self {
        // Strict positional adjacency: an interleaved press hides the dwell.
        let dwell = events
            .windows(2)
            .filter(|w| {
                w[0].phase == KeyPhase::Press && w[1].phase == KeyPhase::Release && w[0].key == w[1].key
            })
            .map(|w| w[1].offset_ms - w[0].offset_ms)
            .collect();

        let releases: Vec<f64> = events
            .iter()
            .filter(|e| e.phase == KeyPhase::Release)
            .map(|e| e.offset_ms)
            .collect();
        let flight = releases.windows(2).map(|w| w[1] - w[0]).collect();

        Self { dwell, flight }
    }

    /// Summary statistics appended after the raw timings, in order.
    pub fn summary(&self) -> Vec<f64> {
        let mut out = Vec::with_capacity(4);
        if !self.dwell.is_empty() {
            out.push(mean(&self.dwell));
            out.push(std_dev(&self.dwell));
        }
        if !self.flight.is_empty() {
            out.push(mean(&self.flight));
            out.push(std_dev(&self.flight));
        }
        out
    }

    /// Raw timings followed by the summary, before fitting to a fixed length.
    ///
    /// With `reserve_summary` the raw part is cut short so that the summary
    /// still fits inside `dim`.
    pub fn to_raw(&self, dim: usize, reserve_summary: bool) -> Vec<f64> {
        let summary = self.summary();
        let mut raw: Vec<f64> = Vec::with_capacity(self.dwell.len() + self.flight.len() + summary.len());
        raw.extend_from_slice(&self.dwell);
        raw.extend_from_slice(&self.flight);
        if reserve_summary && raw.len() + summary.len() > dim {
            raw.truncate(dim.saturating_sub(summary.len()));
        }
        raw.extend(summary);
        raw
    }
}
