//! Extraction pipeline: key events → timings → fixed-length vector.

use super::{FeatureVector, KeystrokeTimings};
use crate::capture::KeystrokeEvent;
use crate::config::FeaturesConfig;

#[derive(Debug, Clone)]
pub struct FeatureExtractor {
    config: FeaturesConfig,
}

impl FeatureExtractor {
    pub fn new(config: FeaturesConfig) -> Self {
        Self { config }
    }

    pub fn dim(&self) -> usize {
        self.config.feature_dim
    }

    /// Pure and total: degenerate input yields an all-zero vector.
    pub fn extract(&self, events: &[KeystrokeEvent]) -> FeatureVector {
        let dim = self.config.feature_dim;
        if events.len() < 2 {
            return FeatureVector::zeros(dim);
        }
        let timings = KeystrokeTimings::from_events(events);
        FeatureVector::fit(&timings.to_raw(dim, self.config.reserve_summary_stats), dim)
    }
}

impl Default for FeatureExtractor {
    fn default() -> Self {
        Self::new(FeaturesConfig::default())
    }
}
