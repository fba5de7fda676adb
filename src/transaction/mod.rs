// ============================================================================
// Transaction Module
// ============================================================================
//
// Snapshot-isolated edits over the in-memory Database:
// - Editor: pure, composable state transitions
// - AtomicCell: compare-and-swap commit of whole snapshots
//
// ============================================================================

pub mod cell;
pub mod editor;

pub use cell::{AtomicCell, DEFAULT_MAX_CAS_RETRIES};
pub use editor::{
    claim_id, claim_or_next, claim_strict, lookup, next_id, save, traverse, traverse_all,
    EditResult, Editor,
};
