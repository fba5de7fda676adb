use super::constraints::{ConstraintSet, ConstraintSetEdit, ConstraintSetInput};
use super::science_mode::{ScienceMode, ScienceModeEdit, ScienceModeInput};
use crate::core::validated::{Validated, invalid, optional, valid};
use crate::core::{EntityKind, Lens, Nullable, ObservationId, ProgramId, Result, TargetId};
use crate::events::EventPayload;
use crate::storage::{Database, Entity, Existence, Table};
use crate::{field_lens, validate};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ObsStatus {
    #[default]
    New,
    Included,
    Proposed,
    Approved,
    ForReview,
    Ready,
    Ongoing,
    Observed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ObsActiveStatus {
    #[default]
    Active,
    Inactive,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TargetEnvironment {
    pub asterism: BTreeSet<TargetId>,
}

impl TargetEnvironment {
    pub fn asterism() -> Lens<TargetEnvironment, BTreeSet<TargetId>> {
        field_lens!(TargetEnvironment, asterism: BTreeSet<TargetId>)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Observation {
    pub id: ObservationId,
    pub program_id: ProgramId,
    pub existence: Existence,
    pub subtitle: Option<String>,
    pub status: ObsStatus,
    pub active_status: ObsActiveStatus,
    pub target_environment: TargetEnvironment,
    pub constraint_set: ConstraintSet,
    pub science_mode: Option<ScienceMode>,
}

impl Observation {
    /// A fresh observation with default settings.
    pub fn new(id: ObservationId, program_id: ProgramId) -> Self {
        Self {
            id,
            program_id,
            existence: Existence::Present,
            subtitle: None,
            status: ObsStatus::default(),
            active_status: ObsActiveStatus::default(),
            target_environment: TargetEnvironment::default(),
            constraint_set: ConstraintSet::default(),
            science_mode: None,
        }
    }

    pub fn subtitle() -> Lens<Observation, Option<String>> {
        field_lens!(Observation, subtitle: Option<String>)
    }

    pub fn status() -> Lens<Observation, ObsStatus> {
        field_lens!(Observation, status: ObsStatus)
    }

    pub fn active_status() -> Lens<Observation, ObsActiveStatus> {
        field_lens!(Observation, active_status: ObsActiveStatus)
    }

    pub fn target_environment() -> Lens<Observation, TargetEnvironment> {
        field_lens!(Observation, target_environment: TargetEnvironment)
    }

    pub fn constraint_set() -> Lens<Observation, ConstraintSet> {
        field_lens!(Observation, constraint_set: ConstraintSet)
    }

    pub fn science_mode() -> Lens<Observation, Option<ScienceMode>> {
        field_lens!(Observation, science_mode: Option<ScienceMode>)
    }

    /// Observation → target environment → asterism.
    pub fn asterism() -> Lens<Observation, BTreeSet<TargetId>> {
        Self::target_environment().compose(TargetEnvironment::asterism())
    }
}

impl Entity for Observation {
    type Id = ObservationId;

    const KIND: EntityKind = EntityKind::Observation;

    fn id(&self) -> ObservationId {
        self.id
    }

    fn existence(&self) -> Existence {
        self.existence
    }

    fn existence_lens() -> Lens<Self, Existence> {
        field_lens!(Observation, existence: Existence)
    }

    fn table_lens() -> Lens<Database, Table<ObservationId, Observation>> {
        Database::observations()
    }

    fn table(db: &Database) -> &Table<ObservationId, Observation> {
        db.observation_table()
    }

    fn program_id(&self) -> ProgramId {
        self.program_id
    }

    fn check_references(&self, db: &Database) -> Result<()> {
        db.check_program(self.program_id)?;
        db.check_asterism(self.program_id, &self.target_environment.asterism)
    }

    fn into_payload(self) -> EventPayload {
        EventPayload::Observation(self)
    }
}

// ----------------------------------------------------------------------------
// Inputs
// ----------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TargetEnvironmentInput {
    #[serde(default)]
    pub asterism: Nullable<Vec<TargetId>>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObservationPropertiesInput {
    #[serde(default)]
    pub subtitle: Nullable<String>,
    pub status: Option<ObsStatus>,
    pub active_status: Option<ObsActiveStatus>,
    pub target_environment: Option<TargetEnvironmentInput>,
    pub constraint_set: Option<ConstraintSetInput>,
    #[serde(default)]
    pub science_mode: Nullable<ScienceModeInput>,
    pub existence: Option<Existence>,
}

/// Validated observation patch.
///
/// Everything that can be checked without looking at a particular
/// observation has been; [`ObservationEdit::apply`] handles the rest.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ObservationEdit {
    pub subtitle: Nullable<String>,
    pub status: Option<ObsStatus>,
    pub active_status: Option<ObsActiveStatus>,
    pub asterism: Nullable<BTreeSet<TargetId>>,
    pub constraint_set: Option<ConstraintSetEdit>,
    pub science_mode: Nullable<ScienceModeEdit>,
    pub existence: Option<Existence>,
}

fn non_blank_subtitle(s: String) -> Validated<String> {
    if s.trim().is_empty() {
        invalid("subtitle may not be blank; use null to clear it")
    } else {
        valid(s.trim().to_string())
    }
}

impl ObservationPropertiesInput {
    pub fn validate(self) -> Validated<ObservationEdit> {
        let status = self.status;
        let active_status = self.active_status;
        let existence = self.existence;
        let asterism = self
            .target_environment
            .map(|te| te.asterism.map(|ids| ids.into_iter().collect::<BTreeSet<_>>()))
            .unwrap_or_default();

        validate! {
            subtitle = self.subtitle.map(non_blank_subtitle).transpose(),
            constraint_set = optional(self.constraint_set, ConstraintSetInput::validate),
            science_mode = self.science_mode.map(ScienceModeInput::validate).transpose(),
            => ObservationEdit {
                subtitle,
                status,
                active_status,
                asterism,
                constraint_set,
                science_mode,
                existence,
            }
        }
    }
}

impl ObservationEdit {
    /// Applies the patch to one observation.
    ///
    /// Referential checks on the resulting asterism happen when the
    /// observation is saved.
    pub fn apply(&self, obs: &Observation) -> Validated<Observation> {
        let mut next = obs.clone();

        let subtitle = self.subtitle.clone();
        next = Observation::subtitle().modify(&next, |cur| subtitle.apply(cur));

        if let Some(status) = self.status {
            next = Observation::status().set(&next, status);
        }
        if let Some(active) = self.active_status {
            next = Observation::active_status().set(&next, active);
        }
        match &self.asterism {
            Nullable::Absent => {}
            Nullable::Null => next = Observation::asterism().set(&next, BTreeSet::new()),
            Nullable::Value(ids) => next = Observation::asterism().set(&next, ids.clone()),
        }

        let constraints = self
            .constraint_set
            .as_ref()
            .map(|edit| Observation::constraint_set().try_modify(&next, |cs| edit.apply(&cs)))
            .transpose();
        let mode = match self.science_mode {
            Nullable::Absent => Ok(None),
            Nullable::Null => Ok(Some(None)),
            Nullable::Value(edit) => edit.apply(next.science_mode.as_ref()).map(|m| Some(Some(m))),
        };

        validate! {
            constraints = constraints,
            mode = mode,
            => {
                let mut result = constraints.unwrap_or(next);
                if let Some(mode) = mode {
                    result = Observation::science_mode().set(&result, mode);
                }
                if let Some(existence) = self.existence {
                    result = result.with_existence(existence);
                }
                result
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateObservationInput {
    pub observation_id: Option<ObservationId>,
    pub program_id: ProgramId,
    pub set: Option<ObservationPropertiesInput>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ValidCreateObservation {
    pub program_id: ProgramId,
    pub edit: ObservationEdit,
}

impl ValidCreateObservation {
    /// Defaults with the creation properties applied.
    pub fn build(&self, id: ObservationId) -> Validated<Observation> {
        self.edit.apply(&Observation::new(id, self.program_id))
    }
}

impl CreateObservationInput {
    pub fn validate(self) -> Validated<ValidCreateObservation> {
        let edit = self.set.unwrap_or_default().validate()?;
        Ok(ValidCreateObservation {
            program_id: self.program_id,
            edit,
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObservationSelectInput {
    pub program_id: Option<ProgramId>,
    pub observation_ids: Option<Vec<ObservationId>>,
    #[serde(default)]
    pub include_deleted: bool,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EditObservationInput {
    pub select: ObservationSelectInput,
    pub patch: ObservationPropertiesInput,
}

/// Targets to add to and remove from the selected observations' asterisms.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EditAsterismPatchInput {
    #[serde(default)]
    pub add: Vec<TargetId>,
    #[serde(default)]
    pub delete: Vec<TargetId>,
}

impl EditAsterismPatchInput {
    pub fn validate(&self) -> Validated<()> {
        if self.add.is_empty() && self.delete.is_empty() {
            return invalid("asterism patch: at least one of add, delete must be provided");
        }
        let both: Vec<String> = self
            .add
            .iter()
            .filter(|id| self.delete.contains(id))
            .map(|id| id.to_string())
            .collect();
        if both.is_empty() {
            valid(())
        } else {
            invalid(format!(
                "asterism patch: {} cannot be both added and deleted",
                both.join(", ")
            ))
        }
    }

    pub fn apply(&self, obs: &Observation) -> Observation {
        Observation::asterism().modify(obs, |mut asterism| {
            for id in &self.delete {
                asterism.remove(id);
            }
            asterism.extend(self.add.iter().copied());
            asterism
        })
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EditAsterismsInput {
    pub select: ObservationSelectInput,
    pub patch: EditAsterismPatchInput,
}
