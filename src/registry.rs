//! Which fields have an orchestrator attached. Owned by the host integration
//! layer; at most one orchestrator per field.

use crate::capture::FieldId;
use crate::error::{AuthError, Result};
use crate::orchestrator::{Orchestrator, Stage, Step};
use std::collections::HashMap;
use tracing::debug;

#[derive(Default)]
pub struct FieldRegistry {
    attached: HashMap<FieldId, Orchestrator>,
}

impl FieldRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn attach(&mut self, orchestrator: Orchestrator) -> Result<&mut Orchestrator> {
        let field = orchestrator.field().clone();
        if self.attached.contains_key(&field) {
            return Err(AuthError::AlreadyAttached(field));
        }
        debug!(field = %field, "field attached");
        Ok(self.attached.entry(field).or_insert(orchestrator))
    }

    pub fn is_attached(&self, field: &FieldId) -> bool {
        self.attached.contains_key(field)
    }

    pub fn get_mut(&mut self, field: &FieldId) -> Result<&mut Orchestrator> {
        self.attached
            .get_mut(field)
            .ok_or_else(|| AuthError::UnknownField(field.clone()))
    }

    pub fn stage(&self, field: &FieldId) -> Option<Stage> {
        self.attached.get(field).map(|o| o.stage())
    }

    /// Route a commit to the field's orchestrator.
    pub fn submit(&mut self, field: &FieldId) -> Result<Step> {
        self.get_mut(field)?.submit()
    }

    /// Tear down the field: capture stops and buffered samples are dropped.
    pub fn detach(&mut self, field: &FieldId) -> Result<Stage> {
        let mut orchestrator = self
            .attached
            .remove(field)
            .ok_or_else(|| AuthError::UnknownField(field.clone()))?;
        orchestrator.detach();
        debug!(field = %field, "field detached");
        Ok(orchestrator.stage())
    }

    pub fn len(&self) -> usize {
        self.attached.len()
    }

    pub fn is_empty(&self) -> bool {
        self.attached.is_empty()
    }
}
