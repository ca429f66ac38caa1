//! Escalation state machine: keystroke enrollment → voice enrollment on
//! registration; keystroke attempts → voice attempts → lockout on login.
//!
//! One [`Orchestrator`] per attached field. It is single-threaded and
//! event-driven: each [`Orchestrator::submit`] resolves exactly one sample
//! before returning, so attempts never overlap.

mod session;

pub use session::{Collaborators, Orchestrator};

use crate::storage::UserRecord;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Modality {
    Keystroke,
    Voice,
}

impl fmt::Display for Modality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Modality::Keystroke => f.write_str("keystroke"),
            Modality::Voice => f.write_str("voice"),
        }
    }
}

/// Failure budget for the current modality stage.
///
/// Created fresh when a stage is entered; the counter only ever grows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttemptState {
    pub modality: Modality,
    pub consecutive_failures: u32,
}

impl AttemptState {
    pub fn enter(modality: Modality) -> Self {
        Self {
            modality,
            consecutive_failures: 0,
        }
    }

    fn record_failure(&mut self) -> u32 {
        self.consecutive_failures += 1;
        self.consecutive_failures
    }
}

/// Terminal results. Once reached, the orchestrator refuses further input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionOutcome {
    Registered,
    Authenticated,
    LockedOut,
    Abandoned,
}

impl SessionOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionOutcome::Registered => "registered",
            SessionOutcome::Authenticated => "authenticated",
            SessionOutcome::LockedOut => "locked_out",
            SessionOutcome::Abandoned => "abandoned",
        }
    }
}

/// Observable summary of where the machine is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Idle,
    Registering { collected: usize },
    VoiceEnrolling { collected: usize },
    KeystrokeAttempt { failures: u32 },
    VoiceAttempt { failures: u32 },
    Finished(SessionOutcome),
}

impl Stage {
    pub fn outcome(&self) -> Option<SessionOutcome> {
        match self {
            Stage::Finished(o) => Some(*o),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.outcome().is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AbandonReason {
    VoiceSkipped,
    VoiceFailed(String),
    RegistrationRefused(String),
    Detached,
}

impl fmt::Display for AbandonReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AbandonReason::VoiceSkipped => f.write_str("voice enrollment skipped"),
            AbandonReason::VoiceFailed(r) => write!(f, "voice enrollment failed: {}", r),
            AbandonReason::RegistrationRefused(r) => write!(f, "registration refused: {}", r),
            AbandonReason::Detached => f.write_str("field detached"),
        }
    }
}

/// What a single submission did.
#[derive(Debug, Clone, PartialEq)]
pub enum Step {
    /// Registration keystroke sample kept; more needed
    SampleRecorded { collected: usize, required: usize },
    /// Last keystroke sample kept and the profile trained; voice enrollment next
    KeystrokeEnrolled { samples: usize },
    VoiceSampleRecorded { collected: usize, required: usize },
    Registered { user: UserRecord },
    Abandoned { reason: AbandonReason },
    Authenticated { modality: Modality, confidence: f64 },
    /// Failed attempt inside the current modality budget
    Retry {
        modality: Modality,
        failures: u32,
        remaining: u32,
    },
    /// Verifier unreachable; budget untouched under the retry-free policy
    TransportRetry { modality: Modality, reason: String },
    /// Keystroke budget exhausted; the next submission goes to voice
    Escalated,
    LockedOut,
}
