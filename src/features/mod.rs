//! Keystroke-rhythm feature extraction from raw key events.

mod pipeline;
mod behavioral;

pub use pipeline::FeatureExtractor;
pub use behavioral::KeystrokeTimings;

use serde::{Deserialize, Serialize};

/// Fixed-length feature vector. Coordinate order is the profile's coordinate system.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FeatureVector {
    values: Vec<f64>,
}

impl FeatureVector {
    pub fn zeros(dim: usize) -> Self {
        Self {
            values: vec![0.0; dim],
        }
    }

    /// Zero-pad or truncate `raw` to exactly `dim` entries.
    pub fn fit(raw: &[f64], dim: usize) -> Self {
        let mut values = vec![0.0f64; dim];
        let copy = raw.len().min(dim);
        values[..copy].copy_from_slice(&raw[..copy]);
        Self { values }
    }

    /// Wrap values as-is. Length is checked where vectors meet a profile.
    pub fn from_values(values: Vec<f64>) -> Self {
        Self { values }
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

pub(crate) fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Population standard deviation (divides by N).
pub(crate) fn std_dev(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let avg = mean(values);
    let var = values.iter().map(|v| (v - avg).powi(2)).sum::<f64>() / values.len() as f64;
    var.sqrt()
}
