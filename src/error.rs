//! Error types. Expected biometric failures are not errors; they travel as
//! tagged outcomes through the orchestrator.

use crate::capture::FieldId;
use crate::orchestrator::SessionOutcome;
use thiserror::Error;

/// Integration defect: wrong shapes handed to the trainer or scorer.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("validation: training set is empty")]
    EmptyTrainingSet,

    #[error("validation: expected {expected} dimensions, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("validation: sample {index} has {actual} dimensions, expected {expected}")]
    InconsistentSample {
        index: usize,
        expected: usize,
        actual: usize,
    },
}

/// A configuration value outside the range the protocol can run with.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("config: {key} {reason}")]
pub struct ConfigError {
    pub key: &'static str,
    pub reason: &'static str,
}

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("store: sqlite: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("store: serialization: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("store: encoding: {0}")]
    Encoding(#[from] base64::DecodeError),

    #[error("store: cipher failure")]
    Cipher,

    #[error("store: payload too short")]
    Truncated,
}

#[derive(Error, Debug)]
pub enum AuthError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("auth: session not started")]
    NotStarted,

    #[error("auth: session already started")]
    AlreadyStarted,

    #[error("auth: session already ended ({0:?})")]
    Terminal(SessionOutcome),

    #[error("auth: field {0} is already attached")]
    AlreadyAttached(FieldId),

    #[error("auth: field {0} is not attached")]
    UnknownField(FieldId),
}

pub type Result<T> = std::result::Result<T, AuthError>;
