// ============================================================================
// Repositories
// ============================================================================
//
// One repository per entity kind. The shared behaviour lives in
// `TopLevelRepo`; kind-specific operations are inherent impls on the
// concrete instantiations.
//
// ============================================================================

pub mod observation;
pub mod paging;
pub mod program;
pub mod target;
pub mod top_level;

pub use observation::{AsterismGroup, ObservationRepo};
pub use paging::ResultPage;
pub use program::ProgramRepo;
pub use target::TargetRepo;
pub use top_level::{Change, Patch, Selection, TopLevelRepo};
