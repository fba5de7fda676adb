// ============================================================================
// Generic top-level repository
// ============================================================================
//
// CRUD, bulk edit and paging written once for every entity kind. Each
// mutating operation builds an Editor, commits it through the shared
// AtomicCell and, inside the commit section, publishes one event per
// changed entity in ascending id order.
//
// ============================================================================

use super::paging::{self, ResultPage};
use crate::config::{OdbConfig, SuggestedIdPolicy};
use crate::core::{InputErrors, OdbError, ProgramId, Result};
use crate::events::{EditType, EventService};
use crate::storage::{Database, Entity, Existence};
use crate::transaction::{AtomicCell, Editor, claim_or_next, claim_strict, lookup, save, traverse_all};
use std::collections::BTreeSet;
use std::marker::PhantomData;
use std::num::NonZeroUsize;
use std::sync::Arc;
use tracing::{Level, event, info_span};

/// The outcome of an edit for one entity: its new state and the kind of
/// event to publish, `None` when nothing changed.
#[derive(Debug, Clone, PartialEq)]
pub struct Change<M> {
    pub edit_type: Option<EditType>,
    pub model: M,
}

impl<M: Entity> Change<M> {
    pub fn unchanged(model: M) -> Self {
        Self { edit_type: None, model }
    }

    /// Classifies the transition from `before` to `after`.
    pub fn between(before: &M, after: M) -> Self {
        let edit_type = if *before == after {
            None
        } else if before.is_present() && !after.is_present() {
            Some(EditType::Deleted)
        } else {
            Some(EditType::Updated)
        };
        Self { edit_type, model: after }
    }
}

/// Which entities a bulk edit applies to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection<I> {
    pub ids: Option<Vec<I>>,
    pub program_id: Option<ProgramId>,
    pub include_deleted: bool,
}

impl<I> Selection<I> {
    pub fn ids(ids: Vec<I>) -> Self {
        Self {
            ids: Some(ids),
            program_id: None,
            include_deleted: false,
        }
    }
}

pub type Patch<M> = Arc<dyn Fn(&M) -> std::result::Result<M, InputErrors> + Send + Sync>;

pub struct TopLevelRepo<M: Entity> {
    cell: Arc<AtomicCell>,
    events: Arc<EventService>,
    config: Arc<OdbConfig>,
    _kind: PhantomData<fn() -> M>,
}

impl<M: Entity> Clone for TopLevelRepo<M> {
    fn clone(&self) -> Self {
        Self {
            cell: Arc::clone(&self.cell),
            events: Arc::clone(&self.events),
            config: Arc::clone(&self.config),
            _kind: PhantomData,
        }
    }
}

impl<M: Entity> std::fmt::Debug for TopLevelRepo<M> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TopLevelRepo").field("kind", &M::KIND).finish()
    }
}

impl<M: Entity> TopLevelRepo<M> {
    pub fn new(cell: Arc<AtomicCell>, events: Arc<EventService>, config: Arc<OdbConfig>) -> Self {
        Self {
            cell,
            events,
            config,
            _kind: PhantomData,
        }
    }

    pub fn snapshot(&self) -> Result<Arc<Database>> {
        self.cell.get()
    }

    /// The entity with this id; `None` when unknown, or tombstoned unless
    /// `include_deleted`.
    pub fn select(&self, id: M::Id, include_deleted: bool) -> Result<Option<M>> {
        let snapshot = self.cell.get()?;
        Ok(M::table(&snapshot)
            .get(&id)
            .filter(|m| include_deleted || m.is_present())
            .cloned())
    }

    /// Matching entities in ascending id order, starting after `after`.
    pub fn select_page(
        &self,
        count: Option<usize>,
        after: Option<M::Id>,
        include_deleted: bool,
        predicate: impl Fn(&M) -> bool,
    ) -> Result<ResultPage<M>> {
        let snapshot = self.cell.get()?;
        let limit = count.or(self.config.default_page_size.map(NonZeroUsize::get));
        paging::page(M::table(&snapshot), limit, after, include_deleted, predicate)
    }

    /// Every entity of a program, in id order.
    pub fn select_for_program(&self, program_id: ProgramId, include_deleted: bool) -> Result<Vec<M>> {
        let snapshot = self.cell.get()?;
        snapshot.check_program(program_id)?;
        Ok(M::table(&snapshot)
            .values()
            .filter(|m| m.program_id() == program_id && (include_deleted || m.is_present()))
            .cloned()
            .collect())
    }

    /// Issues the id for a new entity according to the configured policy.
    pub fn id_editor(&self, suggested: Option<M::Id>) -> Editor<M::Id> {
        match self.config.suggested_id_policy {
            SuggestedIdPolicy::FallBackToNext => claim_or_next::<M>(suggested),
            SuggestedIdPolicy::Reject => claim_strict::<M>(suggested),
        }
    }

    /// Inserts the entity `build` makes for the issued id and publishes `Created`.
    pub fn insert_with(
        &self,
        suggested: Option<M::Id>,
        build: impl Fn(M::Id) -> Result<M> + Send + Sync + 'static,
    ) -> Result<M> {
        let span = info_span!("insert", kind = %M::KIND);
        let _enter = span.enter();

        let editor = self.id_editor(suggested).and_then(move |id| match build(id) {
            Ok(model) => save(model).map(|m| Change {
                edit_type: Some(EditType::Created),
                model: m,
            }),
            Err(e) => Editor::fail(e),
        });
        let mut models = self.commit(editor.map(|c| vec![c]))?;
        let model = models.pop().ok_or_else(|| OdbError::Internal("insert produced no entity".into()))?;
        event!(Level::INFO, id = %model.id(), "inserted");
        Ok(model)
    }

    /// Resolves a selection to candidate ids, ascending and deduplicated.
    ///
    /// Explicitly named ids must exist (tombstoned is fine); program
    /// selection skips tombstoned rows unless `include_deleted`.
    pub fn resolve(selection: Selection<M::Id>) -> Editor<Vec<M::Id>> {
        Editor::inspect(move |db| {
            if selection.ids.is_none() && selection.program_id.is_none() {
                return Err(OdbError::input(format!(
                    "select: a program id or a list of {} ids is required",
                    M::KIND
                )));
            }
            let table = M::table(db);
            let mut ids = BTreeSet::new();
            let mut problems = Vec::new();
            for id in selection.ids.iter().flatten() {
                if table.contains(id) {
                    ids.insert(*id);
                } else {
                    problems.push(OdbError::missing(M::KIND, id));
                }
            }
            if let Some(program_id) = selection.program_id {
                match db.check_program(program_id) {
                    Ok(()) => ids.extend(
                        table
                            .values()
                            .filter(|m| m.program_id() == program_id)
                            .filter(|m| selection.include_deleted || m.is_present())
                            .map(Entity::id),
                    ),
                    Err(e) => problems.push(e),
                }
            }
            match OdbError::combine_all(problems) {
                Some(err) => Err(err),
                None => Ok(ids.into_iter().collect()),
            }
        })
    }

    /// Applies `patch` to every selected entity in one atomic commit.
    ///
    /// Failures of all candidates are reported together and nothing is
    /// committed unless every candidate succeeds.
    pub fn edit_with(&self, selection: Selection<M::Id>, patch: Patch<M>) -> Result<Vec<M>> {
        let span = info_span!("edit", kind = %M::KIND);
        let _enter = span.enter();

        let editor = Self::resolve(selection).and_then(move |ids| {
            let patch = Arc::clone(&patch);
            traverse_all(ids, move |id| {
                let patch = Arc::clone(&patch);
                lookup::<M>(id).and_then(move |before| match patch(&before) {
                    Ok(after) if after == before => Editor::pure(Change::unchanged(before)),
                    Ok(after) => save(after)
                        .map(move |saved| Change::between(&before, saved))
                        .map_err(move |e| e.prefixed(id)),
                    Err(errors) => Editor::fail(OdbError::Input(errors.prefixed(id))),
                })
            })
        });
        let models = self.commit(editor)?;
        event!(Level::INFO, count = models.len(), "edited");
        Ok(models)
    }

    pub fn delete(&self, id: M::Id) -> Result<M> {
        self.set_existence(id, Existence::Deleted)
    }

    pub fn undelete(&self, id: M::Id) -> Result<M> {
        self.set_existence(id, Existence::Present)
    }

    /// Flips the tombstone. Already being in the target state is a no-op that
    /// publishes nothing.
    fn set_existence(&self, id: M::Id, existence: Existence) -> Result<M> {
        let span = info_span!("set_existence", kind = %M::KIND, id = %id, %existence);
        let _enter = span.enter();

        let editor = lookup::<M>(id).and_then(move |before| {
            if before.existence() == existence {
                Editor::pure(vec![Change::unchanged(before)])
            } else {
                let after = before.with_existence(existence);
                save(after).map(move |saved| vec![Change::between(&before, saved)])
            }
        });
        self.commit(editor)?
            .pop()
            .ok_or_else(|| OdbError::Internal(format!("{} {id} vanished during commit", M::KIND)))
    }

    /// Commits the editor and publishes an event for each changed entity.
    pub(crate) fn commit(&self, editor: Editor<Vec<Change<M>>>) -> Result<Vec<M>> {
        let events = &self.events;
        let changes = self.cell.modify_then(&editor, |db, changes| {
            let published = changes
                .iter()
                .filter_map(|c| c.edit_type.map(|t| (t, c.model.clone().into_payload())));
            match events.publish_all(published) {
                Ok(ids) if !ids.is_empty() => {
                    event!(Level::DEBUG, version = db.version(), events = ids.len(), "events published")
                }
                Ok(_) => {}
                Err(e) => event!(Level::ERROR, error = %e, "failed to publish events"),
            }
        })?;
        Ok(changes.into_iter().map(|c| c.model).collect())
    }
}
