//! RMS z-distance against a profile, mapped into [0, 1].

use crate::config::ScoringConfig;
use crate::error::ValidationError;
use crate::features::FeatureVector;
use crate::profile::BiometricProfile;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Decision {
    Accept,
    Reject,
}

impl Decision {
    pub fn from_confidence(confidence: f64, min_confidence: f64) -> Self {
        if confidence >= min_confidence {
            Decision::Accept
        } else {
            Decision::Reject
        }
    }
}

/// Derived, never stored.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MatchResult {
    pub distance: f64,
    pub similarity: f64,
    /// Same value as `similarity` today
    pub confidence: f64,
}

#[derive(Debug, Clone)]
pub struct SimilarityScorer {
    config: ScoringConfig,
    dim: usize,
}

impl SimilarityScorer {
    pub fn new(config: ScoringConfig, dim: usize) -> Self {
        Self { config, dim }
    }

    pub fn score(&self, sample: &FeatureVector, profile: &BiometricProfile) -> Result<MatchResult, ValidationError> {
        for len in [sample.len(), profile.means.len(), profile.stds.len()] {
            if len != self.dim {
                return Err(ValidationError::DimensionMismatch {
                    expected: self.dim,
                    actual: len,
                });
            }
        }

        let eps = self.config.std_epsilon;
        let sum_sq: f64 = sample
            .as_slice()
            .iter()
            .zip(profile.means.as_slice())
            .zip(profile.stds.as_slice())
            .map(|((x, m), s)| {
                let z = (x - m) / (s + eps);
                z * z
            })
            .sum();
        let distance = if self.dim == 0 {
            0.0
        } else {
            (sum_sq / self.dim as f64).sqrt()
        };
        let similarity = (1.0 - distance / self.config.distance_divisor).clamp(0.0, 1.0);

        Ok(MatchResult {
            distance,
            similarity,
            confidence: similarity,
        })
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    pub fn config(&self) -> &ScoringConfig {
        &self.config
    }
}
