use super::top_level::{Patch, Selection, TopLevelRepo};
use crate::core::Result;
use crate::model::{CreateProgramInput, EditProgramInput, Program};
use std::sync::Arc;

pub type ProgramRepo = TopLevelRepo<Program>;

impl TopLevelRepo<Program> {
    pub fn insert(&self, input: CreateProgramInput) -> Result<Program> {
        let suggested = input.program_id;
        let valid = input.validate()?;
        self.insert_with(suggested, move |id| Ok(valid.build(id)))
    }

    pub fn edit(&self, input: EditProgramInput) -> Result<Vec<Program>> {
        let edit = input.patch.validate()?;
        let patch: Patch<Program> = Arc::new(move |p| edit.apply(p));
        self.edit_with(Selection::ids(input.select.program_ids), patch)
    }
}
