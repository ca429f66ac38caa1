//! Engine configuration. Every knob of the escalation protocol lives here.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::warn;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Data directory (encrypted profile store)
    pub data_dir: PathBuf,
    /// Registration protocol
    pub enrollment: EnrollmentConfig,
    /// Login protocol and escalation budgets
    pub login: LoginConfig,
    /// Feature extraction parameters
    pub features: FeaturesConfig,
    /// Similarity calibration
    pub scoring: ScoringConfig,
    /// Where verification happens
    pub verifier: VerifierConfig,
    /// Logging
    pub log: LogConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EnrollmentConfig {
    /// Keystroke samples collected before training
    pub keystroke_samples: usize,
    /// Voice samples collected after the keystroke profile is trained
    pub voice_samples: usize,
    /// Phrase the user is asked to speak
    pub voice_passphrase: String,
    /// How the enrolled secret is recorded as profile provenance
    pub label_policy: LabelPolicy,
}

/// What ends up in `BiometricProfile::label`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LabelPolicy {
    /// Hex SHA-256 of the secret
    Digest,
    /// The secret text itself
    Literal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoginConfig {
    /// Keystroke confidence required to authenticate (0.0–1.0)
    pub min_confidence: f64,
    /// Consecutive keystroke failures before escalating to voice
    pub max_keystroke_attempts: u32,
    /// Consecutive voice failures before lockout
    pub max_voice_attempts: u32,
    pub transport_failure_policy: TransportFailurePolicy,
}

/// Whether an unreachable verifier costs the user an attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransportFailurePolicy {
    ConsumeAttempt,
    RetryFree,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FeaturesConfig {
    /// Fixed length of every feature vector
    pub feature_dim: usize,
    /// Cap raw dwell/flight entries so the four summary statistics always fit
    pub reserve_summary_stats: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    /// RMS z-distance at which similarity reaches zero
    pub distance_divisor: f64,
    /// Added to every std before dividing
    pub std_epsilon: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VerifierConfig {
    pub mode: VerifierMode,
    /// Base URL of the verification service when remote
    pub endpoint: Option<String>,
    pub api_key: Option<String>,
    pub timeout_secs: u64,
    pub connect_timeout_secs: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerifierMode {
    Local,
    Remote,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    pub level: String,
    pub json: bool,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            data_dir: dirs::data_local_dir()
                .map(|d| d.join("typeprint"))
                .unwrap_or_else(|| PathBuf::from(".typeprint")),
            enrollment: EnrollmentConfig::default(),
            login: LoginConfig::default(),
            features: FeaturesConfig::default(),
            scoring: ScoringConfig::default(),
            verifier: VerifierConfig::default(),
            log: LogConfig::default(),
        }
    }
}

impl Default for EnrollmentConfig {
    fn default() -> Self {
        Self {
            keystroke_samples: 5,
            voice_samples: 3,
            voice_passphrase: "I'll Always Choose You".to_string(),
            label_policy: LabelPolicy::Digest,
        }
    }
}

impl Default for LoginConfig {
    fn default() -> Self {
        Self {
            min_confidence: 0.85,
            max_keystroke_attempts: 2,
            max_voice_attempts: 4,
            transport_failure_policy: TransportFailurePolicy::ConsumeAttempt,
        }
    }
}

impl Default for FeaturesConfig {
    fn default() -> Self {
        Self {
            feature_dim: 100,
            reserve_summary_stats: false,
        }
    }
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            distance_divisor: 10.0,
            std_epsilon: 1e-4,
        }
    }
}

impl Default for VerifierConfig {
    fn default() -> Self {
        Self {
            mode: VerifierMode::Local,
            endpoint: None,
            api_key: None,
            timeout_secs: 15,
            connect_timeout_secs: 5,
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: true,
        }
    }
}

impl AuthConfig {
    /// Load from JSON file if present; otherwise return default
    pub fn load(path: &Path) -> Self {
        if !path.exists() {
            return Self::default();
        }
        match std::fs::read_to_string(path) {
            Ok(data) => match serde_json::from_str::<AuthConfig>(&data) {
                Ok(c) => match c.validate() {
                    Ok(()) => c,
                    Err(e) => {
                        warn!(path = %path.display(), error = %e, "config out of range; using defaults");
                        Self::default()
                    }
                },
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "invalid config; using defaults");
                    Self::default()
                }
            },
            Err(e) => {
                warn!(path = %path.display(), error = %e, "unreadable config; using defaults");
                Self::default()
            }
        }
    }

    /// Reject values that would make every sample match or no budget apply.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let checks = [
            (self.features.feature_dim > 0, "features.feature_dim", "must be positive"),
            (self.enrollment.keystroke_samples > 0, "enrollment.keystroke_samples", "must be positive"),
            (
                self.scoring.distance_divisor.is_finite() && self.scoring.distance_divisor > 0.0,
                "scoring.distance_divisor",
                "must be a positive number",
            ),
            (
                self.scoring.std_epsilon.is_finite() && self.scoring.std_epsilon > 0.0,
                "scoring.std_epsilon",
                "must be a positive number",
            ),
            (
                (0.0..=1.0).contains(&self.login.min_confidence),
                "login.min_confidence",
                "must lie in [0, 1]",
            ),
            (self.login.max_keystroke_attempts > 0, "login.max_keystroke_attempts", "must be positive"),
            (self.login.max_voice_attempts > 0, "login.max_voice_attempts", "must be positive"),
        ];
        match checks.into_iter().find(|(ok, _, _)| !ok) {
            Some((_, key, reason)) => Err(ConfigError { key, reason }),
            None => Ok(()),
        }
    }
}
