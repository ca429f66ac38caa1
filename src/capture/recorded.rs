//! In-memory capture source. The host pushes events in; the orchestrator drains them.

use super::{CaptureHandle, CaptureSource, FieldId, KeyPhase, KeystrokeEvent};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Instant;
use uuid::Uuid;

struct ActiveCapture {
    id: Uuid,
    started: Instant,
    buffer: Vec<KeystrokeEvent>,
}

/// Cloneable handle onto a shared buffer table, one active capture per field.
#[derive(Clone, Default)]
pub struct RecordedCapture {
    inner: Arc<Mutex<HashMap<FieldId, ActiveCapture>>>,
}

impl RecordedCapture {
    pub fn new() -> Self {
        Self::default()
    }

    fn table(&self) -> MutexGuard<'_, HashMap<FieldId, ActiveCapture>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Append an event with an explicit offset. Returns false when the field is not capturing.
    pub fn record(&self, field: &FieldId, event: KeystrokeEvent) -> bool {
        match self.table().get_mut(field) {
            Some(active) => {
                active.buffer.push(event);
                true
            }
            None => false,
        }
    }

    /// Append a whole recorded sample.
    pub fn record_all(&self, field: &FieldId, events: impl IntoIterator<Item = KeystrokeEvent>) -> bool {
        match self.table().get_mut(field) {
            Some(active) => {
                active.buffer.extend(events);
                true
            }
            None => false,
        }
    }

    /// Append an event stamped with the wall-clock offset since capture start.
    pub fn record_now(&self, field: &FieldId, key: &str, phase: KeyPhase) -> bool {
        match self.table().get_mut(field) {
            Some(active) => {
                let offset_ms = active.started.elapsed().as_secs_f64() * 1000.0;
                active.buffer.push(KeystrokeEvent {
                    key: key.to_string(),
                    phase,
                    offset_ms,
                });
                true
            }
            None => false,
        }
    }

    pub fn is_capturing(&self, field: &FieldId) -> bool {
        self.table().contains_key(field)
    }

    pub fn buffered(&self, field: &FieldId) -> usize {
        self.table().get(field).map(|a| a.buffer.len()).unwrap_or(0)
    }
}

impl CaptureSource for RecordedCapture {
    fn start_capture(&mut self, field: &FieldId) -> CaptureHandle {
        let handle = CaptureHandle::new(field.clone());
        self.table().insert(
            field.clone(),
            ActiveCapture {
                id: handle.id,
                started: Instant::now(),
                buffer: Vec::new(),
            },
        );
        handle
    }

    fn read_and_clear(&mut self, handle: &CaptureHandle) -> Vec<KeystrokeEvent> {
        match self.table().get_mut(&handle.field) {
            Some(active) if active.id == handle.id => std::mem::take(&mut active.buffer),
            _ => Vec::new(),
        }
    }

    fn stop(&mut self, handle: &CaptureHandle) {
        let mut table = self.table();
        if table.get(&handle.field).is_some_and(|a| a.id == handle.id) {
            table.remove(&handle.field);
        }
    }
}
