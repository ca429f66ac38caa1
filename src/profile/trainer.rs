//! Enrollment samples → per-dimension mean and population std.

use super::BiometricProfile;
use crate::error::ValidationError;
use crate::features::{mean, std_dev, FeatureVector};
use chrono::Utc;

#[derive(Debug, Clone)]
pub struct ProfileTrainer {
    dim: usize,
}

impl ProfileTrainer {
    pub fn new(dim: usize) -> Self {
        Self { dim }
    }

    pub fn train(&self, samples: &[FeatureVector], label: impl Into<String>) -> Result<BiometricProfile, ValidationError> {
        if samples.is_empty() {
            return Err(ValidationError::EmptyTrainingSet);
        }
        if let Some((index, bad)) = samples.iter().enumerate().find(|(_, s)| s.len() != self.dim) {
            return Err(ValidationError::InconsistentSample {
                index,
                expected: self.dim,
                actual: bad.len(),
            });
        }

        let mut means = Vec::with_capacity(self.dim);
        let mut stds = Vec::with_capacity(self.dim);
        let mut column = Vec::with_capacity(samples.len());
        for i in 0..self.dim {
            column.clear();
            column.extend(samples.iter().map(|s| s.as_slice()[i]));
            means.push(mean(&column));
            stds.push(std_dev(&column));
        }

        Ok(BiometricProfile {
            means: FeatureVector::from_values(means),
            stds: FeatureVector::from_values(stds),
            sample_count: samples.len(),
            raw_samples: samples.to_vec(),
            label: label.into(),
            created_at: Utc::now(),
        })
    }
}
