//! Per-user statistical profiles and the bundle persisted at registration.

mod trainer;

pub use trainer::ProfileTrainer;

use crate::config::LabelPolicy;
use crate::features::FeatureVector;
use crate::voice::VoiceSample;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

/// Mean/std per dimension learned from enrollment samples.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BiometricProfile {
    pub means: FeatureVector,
    pub stds: FeatureVector,
    pub sample_count: usize,
    /// Kept for re-training
    pub raw_samples: Vec<FeatureVector>,
    /// Opaque provenance
    pub label: String,
    pub created_at: DateTime<Utc>,
}

impl BiometricProfile {
    pub fn dim(&self) -> usize {
        self.means.len()
    }
}

/// Voice enrollment material. Matching happens in the voice collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VoiceProfile {
    pub passphrase: String,
    pub samples: Vec<VoiceSample>,
}

/// Everything registration produces; persisted all-or-nothing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileBundle {
    pub id: String,
    pub user: String,
    pub keystroke: BiometricProfile,
    pub voice: VoiceProfile,
    pub created_at: DateTime<Utc>,
}

impl ProfileBundle {
    pub fn new(user: impl Into<String>, keystroke: BiometricProfile, voice: VoiceProfile) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            user: user.into(),
            keystroke,
            voice,
            created_at: Utc::now(),
        }
    }
}

/// Provenance label for an enrolled secret.
pub fn label_for(secret: &str, policy: LabelPolicy) -> String {
    match policy {
        LabelPolicy::Digest => format!("{:x}", Sha256::digest(secret.as_bytes())),
        LabelPolicy::Literal => secret.to_string(),
    }
}
