// ============================================================================
// obsdb Library
// ============================================================================
//
// In-memory transactional store for observing programs, observations and
// targets. All tables live in one immutable snapshot that is replaced
// atomically on each commit; committed changes are published as events.
//
// ============================================================================

pub mod config;
pub mod core;
pub mod events;
pub mod facade;
pub mod model;
pub mod repo;
pub mod storage;
pub mod transaction;

// Re-export main types for convenience
pub use config::{OdbConfig, SuggestedIdPolicy};
pub use crate::core::{
    EntityKind, Gid, InputErrors, Nullable, ObservationId, OdbError, ProgramId, Result, TargetId,
};
pub use events::{EditType, Event, EventFilter, EventId, EventPayload, Subscription};
pub use facade::Odb;
pub use repo::{AsterismGroup, ResultPage};
pub use storage::{Database, Existence};

/// Create a database with the default configuration
///
/// # Examples
///
/// ```
/// use obsdb::model::{CreateObservationInput, CreateProgramInput, EditObservationInput};
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let odb = obsdb::open();
///
/// let program = odb.programs().insert(CreateProgramInput {
///     program_id: None,
///     name: Some("Galactic survey".into()),
/// })?;
///
/// let obs = odb.observations().insert(CreateObservationInput {
///     observation_id: None,
///     program_id: program.id,
///     set: None,
/// })?;
///
/// let edit: EditObservationInput = serde_json::from_str(&format!(
///     r#"{{"select": {{"observationIds": ["{}"]}},
///         "patch": {{"constraintSet": {{"skyBackground": "GRAY"}}}}}}"#,
///     obs.id
/// ))?;
/// let edited = odb.observations().edit(edit)?;
/// assert_eq!(edited.len(), 1);
/// # Ok(())
/// # }
/// ```
pub fn open() -> Odb {
    Odb::new()
}

/// Create a database with a custom configuration
///
/// # Examples
///
/// ```
/// use obsdb::{OdbConfig, SuggestedIdPolicy};
/// use std::num::NonZeroUsize;
///
/// let page_size = NonZeroUsize::new(50).unwrap();
/// let odb = obsdb::open_with_config(
///     OdbConfig::new()
///         .default_page_size(page_size)
///         .suggested_id_policy(SuggestedIdPolicy::Reject),
/// );
/// assert_eq!(odb.config().default_page_size, Some(page_size));
/// ```
pub fn open_with_config(config: OdbConfig) -> Odb {
    Odb::with_config(config)
}
