//! Keystroke capture: shared event types and the capture-source seam.
//! The host owns the input device; the engine only sees ordered, timestamped events.

mod recorded;

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

pub use recorded::RecordedCapture;

/// Identifies one attached input field.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FieldId(pub String);

impl FieldId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FieldId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyPhase {
    #[serde(alias = "keydown")]
    Press,
    #[serde(alias = "keyup")]
    Release,
}

/// One key transition. `offset_ms` is relative to capture start.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeystrokeEvent {
    pub key: String,
    pub phase: KeyPhase,
    #[serde(alias = "timestamp")]
    pub offset_ms: f64,
}

impl KeystrokeEvent {
    pub fn press(key: impl Into<String>, offset_ms: f64) -> Self {
        Self {
            key: key.into(),
            phase: KeyPhase::Press,
            offset_ms,
        }
    }

    pub fn release(key: impl Into<String>, offset_ms: f64) -> Self {
        Self {
            key: key.into(),
            phase: KeyPhase::Release,
            offset_ms,
        }
    }
}

/// Live capture on one field. Dropped handles must be passed back to `stop`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureHandle {
    pub id: Uuid,
    pub field: FieldId,
}

impl CaptureHandle {
    pub fn new(field: FieldId) -> Self {
        Self {
            id: Uuid::new_v4(),
            field,
        }
    }
}

/// Source of raw key events for a field.
pub trait CaptureSource: Send {
    /// Begin buffering events for `field`; offsets restart at zero.
    fn start_capture(&mut self, field: &FieldId) -> CaptureHandle;

    /// Drain everything buffered since start or the previous read.
    fn read_and_clear(&mut self, handle: &CaptureHandle) -> Vec<KeystrokeEvent>;

    /// Tear down the capture and discard anything still buffered.
    fn stop(&mut self, handle: &CaptureHandle);
}
