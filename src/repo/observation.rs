use super::top_level::{Change, Patch, Selection, TopLevelRepo};
use crate::core::{ObservationId, OdbError, ProgramId, Result, TargetId};
use crate::events::EditType;
use crate::model::{
    CreateObservationInput, EditAsterismsInput, EditObservationInput, ObsStatus, Observation,
    ObservationSelectInput,
};
use crate::storage::Existence;
use crate::transaction::{lookup, save};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use tracing::{Level, event, info_span};

pub type ObservationRepo = TopLevelRepo<Observation>;

/// Observations of one program that share exactly the same asterism.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AsterismGroup {
    pub asterism: BTreeSet<TargetId>,
    pub observation_ids: BTreeSet<ObservationId>,
}

fn selection(select: ObservationSelectInput) -> Selection<ObservationId> {
    Selection {
        ids: select.observation_ids,
        program_id: select.program_id,
        include_deleted: select.include_deleted,
    }
}

impl TopLevelRepo<Observation> {
    /// Creates an observation from the defaults with the `set` properties
    /// applied. Program and asterism references are checked on save.
    pub fn insert(&self, input: CreateObservationInput) -> Result<Observation> {
        let suggested = input.observation_id;
        let valid = input.validate()?;
        self.insert_with(suggested, move |id| valid.build(id).map_err(OdbError::from))
    }

    pub fn edit(&self, input: EditObservationInput) -> Result<Vec<Observation>> {
        let edit = input.patch.validate()?;
        let patch: Patch<Observation> = Arc::new(move |o| edit.apply(o));
        self.edit_with(selection(input.select), patch)
    }

    /// Adds and removes asterism targets across the selection in one commit.
    pub fn update_asterisms(&self, input: EditAsterismsInput) -> Result<Vec<Observation>> {
        input.patch.validate()?;
        let asterism = input.patch;
        let patch: Patch<Observation> = Arc::new(move |o| Ok(asterism.apply(o)));
        self.edit_with(selection(input.select), patch)
    }

    /// Copies an observation into a fresh id with its status reset.
    pub fn clone_observation(&self, id: ObservationId) -> Result<Observation> {
        let span = info_span!("clone_observation", source = %id);
        let _enter = span.enter();

        let fresh_id = self.id_editor(None);
        let editor = lookup::<Observation>(id).and_then(move |original| {
            fresh_id.clone().and_then(move |new_id| {
                let copy = Observation {
                    id: new_id,
                    existence: Existence::Present,
                    status: ObsStatus::New,
                    ..original.clone()
                };
                save(copy).map(|saved| {
                    vec![Change {
                        edit_type: Some(EditType::Created),
                        model: saved,
                    }]
                })
            })
        });
        let copy = self
            .commit(editor)?
            .pop()
            .ok_or_else(|| OdbError::Internal(format!("clone of {id} produced no observation")))?;
        event!(Level::INFO, clone = %copy.id, "cloned");
        Ok(copy)
    }

    /// Groups the program's present observations by identical asterism,
    /// ordered by asterism.
    pub fn asterism_groups(&self, program_id: ProgramId) -> Result<Vec<AsterismGroup>> {
        let groups = self.select_for_program(program_id, false)?.into_iter().fold(
            BTreeMap::<BTreeSet<TargetId>, BTreeSet<ObservationId>>::new(),
            |mut groups, o| {
                groups.entry(o.target_environment.asterism).or_default().insert(o.id);
                groups
            },
        );
        Ok(groups
            .into_iter()
            .map(|(asterism, observation_ids)| AsterismGroup {
                asterism,
                observation_ids,
            })
            .collect())
    }
}
