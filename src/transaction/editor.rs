// ============================================================================
// Editors
// ============================================================================
//
// An editor is a pure function from one database snapshot to either a new
// snapshot plus a result, or a failure. Editors compose by sequencing and
// are handed to the atomic cell, which may run them more than once under
// contention; they must not perform I/O or publish events.
//
// ============================================================================

use crate::core::{Gid, OdbError, Result};
use crate::storage::{Database, Entity};
use std::sync::Arc;

pub type EditResult<A> = Result<(Database, A)>;

type EditFn<A> = dyn Fn(&Database) -> EditResult<A> + Send + Sync;

pub struct Editor<A> {
    run: Arc<EditFn<A>>,
}

impl<A> Clone for Editor<A> {
    fn clone(&self) -> Self {
        Self {
            run: Arc::clone(&self.run),
        }
    }
}

impl<A: 'static> Editor<A> {
    pub fn new(f: impl Fn(&Database) -> EditResult<A> + Send + Sync + 'static) -> Self {
        Self { run: Arc::new(f) }
    }

    /// Runs against a snapshot without touching it.
    pub fn run(&self, db: &Database) -> EditResult<A> {
        (self.run)(db)
    }

    pub fn pure(a: A) -> Self
    where
        A: Clone + Send + Sync,
    {
        Self::new(move |db| Ok((db.clone(), a.clone())))
    }

    pub fn fail(err: OdbError) -> Self {
        Self::new(move |_| Err(err.clone()))
    }

    /// Read-only query of the snapshot.
    pub fn inspect(f: impl Fn(&Database) -> Result<A> + Send + Sync + 'static) -> Self {
        Self::new(move |db| f(db).map(|a| (db.clone(), a)))
    }

    pub fn map<B: 'static>(self, f: impl Fn(A) -> B + Send + Sync + 'static) -> Editor<B> {
        Editor::new(move |db| self.run(db).map(|(db, a)| (db, f(a))))
    }

    /// Sequences two editors; the second sees the first one's output snapshot
    /// and never runs if the first fails.
    pub fn and_then<B: 'static>(
        self,
        f: impl Fn(A) -> Editor<B> + Send + Sync + 'static,
    ) -> Editor<B> {
        Editor::new(move |db| {
            let (db, a) = self.run(db)?;
            f(a).run(&db)
        })
    }

    /// Rewrites the failure, leaving success untouched.
    pub fn map_err(self, f: impl Fn(OdbError) -> OdbError + Send + Sync + 'static) -> Self {
        Editor::new(move |db| self.run(db).map_err(&f))
    }

    /// Like `and_then` for a follow-up that only computes a value.
    pub fn and_then_result<B: 'static>(
        self,
        f: impl Fn(A) -> Result<B> + Send + Sync + 'static,
    ) -> Editor<B> {
        Editor::new(move |db| {
            let (db, a) = self.run(db)?;
            f(a).map(|b| (db, b))
        })
    }

    /// Runs `next` after this editor, discarding this editor's result.
    pub fn then<B: 'static>(self, next: Editor<B>) -> Editor<B> {
        Editor::new(move |db| {
            let (db, _) = self.run(db)?;
            next.run(&db)
        })
    }
}

/// Resolves an id against its table; missing ids fail with a named reference error.
pub fn lookup<E: Entity>(id: E::Id) -> Editor<E> {
    Editor::inspect(move |db| db.lookup::<E>(id).cloned())
}

/// Inserts or overwrites a row after re-checking its referential invariants.
pub fn save<E: Entity>(entity: E) -> Editor<E> {
    Editor::new(move |db| {
        entity.check_references(db)?;
        let table = E::table(db).with_row(entity.id(), entity.clone())?;
        Ok((E::table_lens().set(db, table), entity.clone()))
    })
}

/// Issues the next unused id of the entity kind.
pub fn next_id<E: Entity>() -> Editor<E::Id> {
    Editor::new(|db| {
        let (table, id) = E::table(db).next_unused()?;
        Ok((E::table_lens().set(db, table), id))
    })
}

/// Claims a suggested id, `None` when it is already taken.
///
/// The largest representable id is refused: claiming it would leave the
/// kind unable to issue any further id.
pub fn claim_id<E: Entity>(id: E::Id) -> Editor<Option<E::Id>> {
    Editor::new(move |db| {
        if id.value() == u64::MAX {
            return Err(OdbError::input(format!(
                "{} id {id} is too large, no further ids could be issued after it",
                E::KIND
            )));
        }
        match E::table(db).claim(id) {
            Some(table) => Ok((E::table_lens().set(db, table), Some(id))),
            None => Ok((db.clone(), None)),
        }
    })
}

/// Claims the suggestion if free, otherwise issues the next unused id.
pub fn claim_or_next<E: Entity>(suggested: Option<E::Id>) -> Editor<E::Id> {
    match suggested {
        None => next_id::<E>(),
        Some(id) => claim_id::<E>(id).and_then(move |claimed| match claimed {
            Some(id) => Editor::pure(id),
            None => {
                tracing::debug!(kind = %E::KIND, suggested = %id, "suggested id taken, issuing next unused");
                next_id::<E>()
            }
        }),
    }
}

/// Claims the suggestion, failing with an input error if it is taken.
pub fn claim_strict<E: Entity>(suggested: Option<E::Id>) -> Editor<E::Id> {
    match suggested {
        None => next_id::<E>(),
        Some(id) => claim_id::<E>(id).and_then_result(move |claimed| {
            claimed.ok_or_else(|| OdbError::input(format!("{} id {} is already in use", E::KIND, id)))
        }),
    }
}

/// Runs one editor per item in order, stopping at the first failure.
pub fn traverse<T, B>(items: Vec<T>, f: impl Fn(T) -> Editor<B> + Send + Sync + 'static) -> Editor<Vec<B>>
where
    T: Clone + Send + Sync + 'static,
    B: 'static,
{
    Editor::new(move |db| {
        let mut db = db.clone();
        let mut out = Vec::with_capacity(items.len());
        for item in &items {
            let (next, b) = f(item.clone()).run(&db)?;
            db = next;
            out.push(b);
        }
        Ok((db, out))
    })
}

/// Runs one editor per item and collects every failure.
///
/// Successful steps are threaded through the snapshot so later items see
/// earlier changes; if anything failed, all failures are combined into one
/// error and the whole editor fails, so none of the changes survive.
pub fn traverse_all<T, B>(items: Vec<T>, f: impl Fn(T) -> Editor<B> + Send + Sync + 'static) -> Editor<Vec<B>>
where
    T: Clone + Send + Sync + 'static,
    B: 'static,
{
    Editor::new(move |db| {
        let mut db = db.clone();
        let mut out = Vec::with_capacity(items.len());
        let mut errors = Vec::new();
        for item in &items {
            match f(item.clone()).run(&db) {
                Ok((next, b)) => {
                    db = next;
                    out.push(b);
                }
                Err(e) => errors.push(e),
            }
        }
        match OdbError::combine_all(errors) {
            Some(err) => Err(err),
            None => Ok((db, out)),
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Gid, ProgramId};
    use crate::model::Program;
    use crate::storage::Existence;

    fn new_program() -> Editor<Program> {
        next_id::<Program>().and_then(|id| {
            save(Program {
                id,
                existence: Existence::Present,
                name: None,
            })
        })
    }

    #[test]
    fn test_sequencing_threads_snapshot() {
        let editor = new_program().then(new_program());
        let (db, second) = editor.run(&Database::new()).unwrap();
        assert_eq!(second.id, ProgramId::from_value(2).unwrap());
        assert_eq!(db.program_table().len(), 2);
    }

    #[test]
    fn test_failure_short_circuits() {
        let editor = new_program()
            .then(Editor::<()>::fail(OdbError::input("stop")))
            .then(new_program());
        let db = Database::new();
        let err = editor.run(&db).unwrap_err();
        assert_eq!(err.messages(), ["stop"]);
        assert!(db.program_table().is_empty());
    }

    #[test]
    fn test_lookup_missing() {
        let err = lookup::<Program>(ProgramId::from_value(3).unwrap())
            .run(&Database::new())
            .unwrap_err();
        assert!(err.is_missing_reference());
    }

    #[test]
    fn test_claim_or_next_falls_back() {
        let (db, first) = new_program().run(&Database::new()).unwrap();
        let (_, id) = claim_or_next::<Program>(Some(first.id)).run(&db).unwrap();
        assert_eq!(id, ProgramId::from_value(2).unwrap());

        let err = claim_strict::<Program>(Some(first.id)).run(&db).unwrap_err();
        assert!(err.is_input());
    }

    #[test]
    fn test_claim_refuses_largest_id() {
        let largest = ProgramId::from_value(u64::MAX).unwrap();
        let db = Database::new();
        assert!(claim_or_next::<Program>(Some(largest)).run(&db).unwrap_err().is_input());
        assert!(claim_strict::<Program>(Some(largest)).run(&db).unwrap_err().is_input());

        let below = ProgramId::from_value(u64::MAX - 1).unwrap();
        let (db, id) = claim_or_next::<Program>(Some(below)).run(&db).unwrap();
        assert_eq!(id, below);
        let (_, next) = next_id::<Program>().run(&db).unwrap();
        assert_eq!(next.value(), u64::MAX);
    }

    #[test]
    fn test_traverse_all_collects_every_failure() {
        let editor = traverse_all(vec![1, 2, 3, 4], |n: i32| {
            if n % 2 == 0 {
                Editor::fail(OdbError::input(format!("{n} rejected")))
            } else {
                new_program().map(|p| p.id)
            }
        });
        let err = editor.run(&Database::new()).unwrap_err();
        assert_eq!(err.messages(), ["2 rejected", "4 rejected"]);
    }

    #[test]
    fn test_traverse_stops_at_first_failure() {
        let editor = traverse(vec![1, 2, 3], |n: i32| {
            if n == 2 {
                Editor::fail(OdbError::input(format!("{n} rejected")))
            } else {
                new_program().map(|p| p.id)
            }
        });
        let err = editor.run(&Database::new()).unwrap_err();
        assert_eq!(err.messages(), ["2 rejected"]);

        let (db, ids) = traverse(vec![1, 2], |_: i32| new_program().map(|p| p.id))
            .run(&Database::new())
            .unwrap();
        assert_eq!(ids.len(), 2);
        assert_eq!(db.program_table().len(), 2);
    }

    #[test]
    fn test_editor_is_rerunnable() {
        let editor = new_program();
        let db = Database::new();
        let (_, a) = editor.run(&db).unwrap();
        let (_, b) = editor.run(&db).unwrap();
        assert_eq!(a, b);
    }
}
