//! Verification seam. A verifier answers with an explicit tagged outcome so the
//! transport-failure policy is a branch, not an accident of response shape.

mod local;
mod remote;

pub use local::LocalVerifier;
pub use remote::{classify_register, classify_verify, ApiError, RemoteVerifier, VerifyResponse};

use crate::error::ValidationError;
use crate::features::FeatureVector;
use crate::profile::ProfileBundle;
use crate::storage::UserRecord;
use crate::voice::VoiceSample;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum VerifyOutcome {
    Accepted { confidence: f64 },
    Rejected { confidence: Option<f64> },
    NetworkError { reason: String },
}

impl VerifyOutcome {
    pub fn network(reason: impl Into<String>) -> Self {
        VerifyOutcome::NetworkError {
            reason: reason.into(),
        }
    }

    pub fn confidence(&self) -> Option<f64> {
        match self {
            VerifyOutcome::Accepted { confidence } => Some(*confidence),
            VerifyOutcome::Rejected { confidence } => *confidence,
            VerifyOutcome::NetworkError { .. } => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum RegisterOutcome {
    Registered { user: Option<UserRecord> },
    Rejected { reason: String },
    NetworkError { reason: String },
}

pub trait Verifier: Send + Sync {
    /// Score a keystroke sample for `user`.
    fn verify_keystroke(&self, user: &str, features: &FeatureVector) -> Result<VerifyOutcome, ValidationError>;

    /// Decide on a collected voice sample for `user`.
    fn verify_voice(&self, user: &str, sample: &VoiceSample) -> VerifyOutcome;

    /// Hand over a completed registration bundle.
    fn register(&self, bundle: &ProfileBundle) -> RegisterOutcome;

    /// Withdraw a registration that could not be committed locally.
    fn unregister(&self, user: &str);
}
