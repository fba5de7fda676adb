use crate::core::{EntityKind, ProgramId};
use crate::model::{Observation, Program, Target};
use crate::storage::Entity;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Position of an event in the global commit order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EventId(pub u64);

impl EventId {
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "evt_{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EditType {
    Created,
    Updated,
    Deleted,
}

/// The committed state of the entity an event is about.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventPayload {
    Program(Program),
    Observation(Observation),
    Target(Target),
}

impl EventPayload {
    pub fn kind(&self) -> EntityKind {
        match self {
            EventPayload::Program(_) => EntityKind::Program,
            EventPayload::Observation(_) => EntityKind::Observation,
            EventPayload::Target(_) => EntityKind::Target,
        }
    }

    pub fn program_id(&self) -> ProgramId {
        match self {
            EventPayload::Program(p) => p.program_id(),
            EventPayload::Observation(o) => o.program_id(),
            EventPayload::Target(t) => t.program_id(),
        }
    }

    /// Textual id of the entity, e.g. `o-3`.
    pub fn entity_id(&self) -> String {
        match self {
            EventPayload::Program(p) => p.id.to_string(),
            EventPayload::Observation(o) => o.id.to_string(),
            EventPayload::Target(t) => t.id.to_string(),
        }
    }
}

/// One committed change, delivered to subscribers after the commit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    pub id: EventId,
    pub edit_type: EditType,
    pub timestamp: DateTime<Utc>,
    pub payload: EventPayload,
}

impl Event {
    pub fn new(id: EventId, edit_type: EditType, payload: EventPayload) -> Self {
        Self {
            id,
            edit_type,
            timestamp: Utc::now(),
            payload,
        }
    }
}
