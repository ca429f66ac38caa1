//! Typeprint — keystroke-rhythm authentication with voice escalation.
//!
//! Modular structure:
//! - [`capture`] — Key event types and the capture-source seam
//! - [`features`] — Dwell/flight feature extraction to a fixed-length vector
//! - [`profile`] — Per-user statistical profile training
//! - [`scoring`] — Similarity of a live sample against a profile
//! - [`verifier`] — Local or remote verification with tagged outcomes
//! - [`voice`] — Voice fallback seam
//! - [`orchestrator`] — Enrollment and login escalation state machine
//! - [`registry`] — One orchestrator per attached field
//! - [`storage`] — Encrypted local profile storage
//! - [`presentation`] — Notices and session termination
//! - [`replay`] — Recorded session playback
//! - [`logging`] — Structured JSON logging

pub mod config;
pub mod error;
pub mod capture;
pub mod features;
pub mod profile;
pub mod scoring;
pub mod verifier;
pub mod voice;
pub mod presentation;
pub mod storage;
pub mod orchestrator;
pub mod registry;
pub mod replay;
pub mod logging;

pub use config::AuthConfig;
pub use error::{AuthError, ConfigError, StoreError, ValidationError};
pub use capture::{CaptureSource, FieldId, KeyPhase, KeystrokeEvent, RecordedCapture};
pub use features::{FeatureExtractor, FeatureVector};
pub use profile::{BiometricProfile, ProfileBundle, ProfileTrainer};
pub use scoring::{MatchResult, SimilarityScorer};
pub use verifier::{LocalVerifier, RemoteVerifier, Verifier, VerifyOutcome};
pub use orchestrator::{Collaborators, Orchestrator, SessionOutcome, Stage, Step};
pub use registry::FieldRegistry;
pub use storage::{ProfileStore, SecureStore};
pub use logging::StructuredLogger;
