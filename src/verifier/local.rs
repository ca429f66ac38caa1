//! In-process verifier: runs the similarity scorer against bundles it holds.

use super::{RegisterOutcome, Verifier, VerifyOutcome};
use crate::error::ValidationError;
use crate::features::FeatureVector;
use crate::profile::ProfileBundle;
use crate::scoring::{Decision, SimilarityScorer};
use crate::storage::UserRecord;
use crate::voice::VoiceSample;
use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};
use tracing::debug;

pub struct LocalVerifier {
    scorer: SimilarityScorer,
    min_confidence: f64,
    bundles: RwLock<HashMap<String, ProfileBundle>>,
}

impl LocalVerifier {
    pub fn new(scorer: SimilarityScorer, min_confidence: f64) -> Self {
        Self {
            scorer,
            min_confidence,
            bundles: RwLock::new(HashMap::new()),
        }
    }

    /// Make a previously stored bundle available for verification.
    pub fn load(&self, bundle: ProfileBundle) {
        self.bundles
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(bundle.user.clone(), bundle);
    }

    pub fn knows(&self, user: &str) -> bool {
        self.bundles
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(user)
    }
}

impl Verifier for LocalVerifier {
    fn verify_keystroke(&self, user: &str, features: &FeatureVector) -> Result<VerifyOutcome, ValidationError> {
        let bundles = self.bundles.read().unwrap_or_else(PoisonError::into_inner);
        let Some(bundle) = bundles.get(user) else {
            debug!(user, "no keystroke profile");
            return Ok(VerifyOutcome::Rejected { confidence: None });
        };
        let result = self.scorer.score(features, &bundle.keystroke)?;
        debug!(user, distance = result.distance, confidence = result.confidence, "keystroke scored");
        Ok(match Decision::from_confidence(result.confidence, self.min_confidence) {
            Decision::Accept => VerifyOutcome::Accepted {
                confidence: result.confidence,
            },
            Decision::Reject => VerifyOutcome::Rejected {
                confidence: Some(result.confidence),
            },
        })
    }

    fn verify_voice(&self, user: &str, sample: &VoiceSample) -> VerifyOutcome {
        if !self.knows(user) {
            return VerifyOutcome::Rejected { confidence: None };
        }
        match sample.match_confidence {
            Some(c) if Decision::from_confidence(c, self.min_confidence) == Decision::Accept => {
                VerifyOutcome::Accepted { confidence: c }
            }
            other => VerifyOutcome::Rejected { confidence: other },
        }
    }

    fn register(&self, bundle: &ProfileBundle) -> RegisterOutcome {
        if bundle.keystroke.dim() != self.scorer.dim() {
            return RegisterOutcome::Rejected {
                reason: format!(
                    "profile has {} dimensions, expected {}",
                    bundle.keystroke.dim(),
                    self.scorer.dim()
                ),
            };
        }
        self.load(bundle.clone());
        RegisterOutcome::Registered {
            user: Some(UserRecord::new(&bundle.user)),
        }
    }

    fn unregister(&self, user: &str) {
        let removed = self
            .bundles
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(user);
        debug!(user, removed = removed.is_some(), "registration withdrawn");
    }
}

