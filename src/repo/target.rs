use super::top_level::{Patch, Selection, TopLevelRepo};
use crate::core::{ObservationId, Result, TargetId};
use crate::model::{CreateTargetInput, EditTargetInput, Target};
use std::sync::Arc;

pub type TargetRepo = TopLevelRepo<Target>;

impl TopLevelRepo<Target> {
    /// Creates a target; the owning program must exist.
    pub fn insert(&self, input: CreateTargetInput) -> Result<Target> {
        let suggested = input.target_id;
        let valid = input.validate()?;
        self.insert_with(suggested, move |id| Ok(valid.build(id)))
    }

    pub fn edit(&self, input: EditTargetInput) -> Result<Vec<Target>> {
        let edit = input.patch.validate()?;
        let patch: Patch<Target> = Arc::new(move |t| edit.apply(t));
        let selection = Selection {
            ids: input.select.target_ids,
            program_id: input.select.program_id,
            include_deleted: input.select.include_deleted,
        };
        self.edit_with(selection, patch)
    }

    /// Present observations whose asterism includes the target.
    pub fn referencing_observations(&self, id: TargetId) -> Result<Vec<ObservationId>> {
        let snapshot = self.snapshot()?;
        snapshot.lookup::<Target>(id)?;
        Ok(snapshot.observations_referencing(id))
    }
}
