use super::{EditType, Event};
use crate::core::{EntityKind, ProgramId};
use std::collections::BTreeSet;

/// Restricts which events a subscription receives.
///
/// Empty sets mean "no restriction"; `EventFilter::default()` accepts
/// everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventFilter {
    kinds: BTreeSet<EntityKind>,
    edit_types: Vec<EditType>,
    program_ids: BTreeSet<ProgramId>,
}

impl EventFilter {
    pub fn all() -> Self {
        Self::default()
    }

    /// Only events about entities of this kind (may be called repeatedly).
    pub fn kind(mut self, kind: EntityKind) -> Self {
        self.kinds.insert(kind);
        self
    }

    pub fn edit_type(mut self, edit_type: EditType) -> Self {
        if !self.edit_types.contains(&edit_type) {
            self.edit_types.push(edit_type);
        }
        self
    }

    /// Only events whose entity belongs to this program.
    pub fn program(mut self, program_id: ProgramId) -> Self {
        self.program_ids.insert(program_id);
        self
    }

    pub fn matches(&self, event: &Event) -> bool {
        (self.kinds.is_empty() || self.kinds.contains(&event.payload.kind()))
            && (self.edit_types.is_empty() || self.edit_types.contains(&event.edit_type))
            && (self.program_ids.is_empty()
                || self.program_ids.contains(&event.payload.program_id()))
    }
}
