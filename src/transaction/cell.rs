// ============================================================================
// Atomic Cell
// ============================================================================
//
// Holds the single committed Database snapshot. Writers read the current
// snapshot, run an editor against it without holding any lock, then commit
// only if the cell still holds the snapshot they read (compared by Arc
// pointer identity). A lost race re-runs the editor against the newer
// snapshot, up to a configured number of retries.
//
// ============================================================================

use super::Editor;
use crate::core::{OdbError, Result};
use crate::storage::Database;
use std::sync::{Arc, RwLock};
use tracing::{Level, event};

pub const DEFAULT_MAX_CAS_RETRIES: usize = 128;

#[derive(Debug)]
pub struct AtomicCell {
    current: RwLock<Arc<Database>>,
    max_retries: usize,
}

impl Default for AtomicCell {
    fn default() -> Self {
        Self::new(Database::new(), DEFAULT_MAX_CAS_RETRIES)
    }
}

impl AtomicCell {
    pub fn new(initial: Database, max_retries: usize) -> Self {
        Self {
            current: RwLock::new(Arc::new(initial)),
            max_retries,
        }
    }

    /// The latest committed snapshot.
    pub fn get(&self) -> Result<Arc<Database>> {
        let guard = self.current.read().map_err(|e| {
            event!(Level::ERROR, "database cell lock poisoned");
            OdbError::from(e)
        })?;
        Ok(Arc::clone(&guard))
    }

    /// Runs a read-only editor against the latest snapshot; nothing is committed.
    pub fn read<A: 'static>(&self, editor: &Editor<A>) -> Result<A> {
        let snapshot = self.get()?;
        editor.run(&snapshot).map(|(_, a)| a)
    }

    /// Applies the editor atomically, returning its result.
    pub fn modify<A: 'static>(&self, editor: &Editor<A>) -> Result<A> {
        self.modify_then(editor, |_, _| {})
    }

    /// Applies the editor atomically and runs `on_commit` inside the commit
    /// critical section, so hooks observe commits in commit order.
    ///
    /// The editor may run several times; `on_commit` runs exactly once, and
    /// only if the commit succeeds. On failure the cell is left untouched.
    pub fn modify_then<A: 'static>(
        &self,
        editor: &Editor<A>,
        on_commit: impl FnOnce(&Database, &A),
    ) -> Result<A> {
        for attempt in 0..=self.max_retries {
            let snapshot = self.get()?;
            let (next, result) = editor.run(&snapshot)?;

            let mut guard = self.current.write().map_err(|e| {
                event!(Level::ERROR, "database cell lock poisoned");
                OdbError::from(e)
            })?;
            if !Arc::ptr_eq(&guard, &snapshot) {
                event!(
                    Level::DEBUG,
                    attempt,
                    read_version = snapshot.version(),
                    current_version = guard.version(),
                    "concurrent commit detected, retrying edit"
                );
                continue;
            }

            let version = snapshot.version() + 1;
            let committed = Arc::new(next.with_version(version));
            *guard = Arc::clone(&committed);
            event!(Level::DEBUG, version, "committed");
            on_commit(&committed, &result);
            return Ok(result);
        }

        event!(
            Level::ERROR,
            max_retries = self.max_retries,
            "edit abandoned after exhausting retries"
        );
        Err(OdbError::Internal(format!(
            "edit could not be committed after {} retries",
            self.max_retries
        )))
    }
}
