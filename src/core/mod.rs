pub mod error;
pub mod id;
pub mod nullable;
pub mod optics;
pub mod validated;

pub use error::{OdbError, Result};
pub use id::{EntityKind, Gid, ObservationId, ProgramId, TargetId};
pub use nullable::Nullable;
pub use optics::Lens;
pub use validated::{InputErrors, Validated, ValidatedExt};
