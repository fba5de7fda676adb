use super::{Database, Table};
use crate::core::{EntityKind, Gid, Lens, ProgramId, Result};
use crate::events::EventPayload;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Soft-delete marker carried by every top-level entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Existence {
    #[default]
    Present,
    Deleted,
}

impl Existence {
    pub fn is_present(self) -> bool {
        self == Existence::Present
    }

    pub fn is_deleted(self) -> bool {
        self == Existence::Deleted
    }
}

impl fmt::Display for Existence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Existence::Present => write!(f, "PRESENT"),
            Existence::Deleted => write!(f, "DELETED"),
        }
    }
}

/// A top-level entity stored in its own table of the [`Database`].
///
/// The generic repository machinery (lookup, save, select, delete, paging)
/// is written once against this trait.
pub trait Entity: Clone + PartialEq + fmt::Debug + Send + Sync + 'static {
    type Id: Gid;

    const KIND: EntityKind;

    fn id(&self) -> Self::Id;

    fn existence(&self) -> Existence;

    fn existence_lens() -> Lens<Self, Existence>;

    /// Focus on this kind's table within a database snapshot.
    fn table_lens() -> Lens<Database, Table<Self::Id, Self>>;

    fn table(db: &Database) -> &Table<Self::Id, Self>;

    /// The owning program; a program is its own parent.
    fn program_id(&self) -> ProgramId;

    /// Checks the referential invariants this entity takes part in.
    fn check_references(&self, db: &Database) -> Result<()>;

    fn into_payload(self) -> EventPayload;

    fn is_present(&self) -> bool {
        self.existence().is_present()
    }

    fn with_existence(&self, existence: Existence) -> Self {
        Self::existence_lens().set(self, existence)
    }
}
