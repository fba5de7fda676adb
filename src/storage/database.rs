use super::{Entity, Table};
use crate::core::{Lens, ObservationId, OdbError, ProgramId, Result, TargetId};
use crate::field_lens;
use crate::model::{Observation, Program, Target};
use std::collections::BTreeSet;

/// One consistent snapshot of every table.
///
/// Snapshots are immutable values; the atomic cell swaps whole snapshots and
/// bumps `version` on each commit. Cloning is cheap because tables are
/// persistent maps.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Database {
    version: u64,
    programs: Table<ProgramId, Program>,
    observations: Table<ObservationId, Observation>,
    targets: Table<TargetId, Target>,
}

impl Database {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of commits that produced this snapshot.
    pub fn version(&self) -> u64 {
        self.version
    }

    pub(crate) fn with_version(mut self, version: u64) -> Self {
        self.version = version;
        self
    }

    pub fn programs() -> Lens<Database, Table<ProgramId, Program>> {
        field_lens!(Database, programs: Table<ProgramId, Program>)
    }

    pub fn observations() -> Lens<Database, Table<ObservationId, Observation>> {
        field_lens!(Database, observations: Table<ObservationId, Observation>)
    }

    pub fn targets() -> Lens<Database, Table<TargetId, Target>> {
        field_lens!(Database, targets: Table<TargetId, Target>)
    }

    pub fn program_table(&self) -> &Table<ProgramId, Program> {
        &self.programs
    }

    pub fn observation_table(&self) -> &Table<ObservationId, Observation> {
        &self.observations
    }

    pub fn target_table(&self) -> &Table<TargetId, Target> {
        &self.targets
    }

    pub fn program(&self, id: ProgramId) -> Option<&Program> {
        self.programs.get(&id)
    }

    pub fn observation(&self, id: ObservationId) -> Option<&Observation> {
        self.observations.get(&id)
    }

    pub fn target(&self, id: TargetId) -> Option<&Target> {
        self.targets.get(&id)
    }

    /// Looks an entity up by id regardless of existence.
    pub fn lookup<E: Entity>(&self, id: E::Id) -> Result<&E> {
        E::table(self)
            .get(&id)
            .ok_or_else(|| OdbError::missing(E::KIND, id))
    }

    pub fn check_program(&self, id: ProgramId) -> Result<()> {
        self.lookup::<Program>(id).map(|_| ())
    }

    /// Every target must exist and belong to the observation's program.
    pub fn check_asterism(&self, program_id: ProgramId, asterism: &BTreeSet<TargetId>) -> Result<()> {
        let problems = asterism.iter().filter_map(|tid| match self.targets.get(tid) {
            None => Some(OdbError::missing(crate::core::EntityKind::Target, tid)),
            Some(t) if t.program_id != program_id => Some(OdbError::input(format!(
                "Target {tid} belongs to program {}, not {program_id}",
                t.program_id
            ))),
            Some(_) => None,
        });
        match OdbError::combine_all(problems) {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    /// Present observations whose asterism includes the target.
    pub fn observations_referencing(&self, target: TargetId) -> Vec<ObservationId> {
        self.observations
            .values()
            .filter(|o| o.existence.is_present() && o.target_environment.asterism.contains(&target))
            .map(|o| o.id)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Gid;
    use crate::storage::Existence;

    fn seeded() -> (Database, ProgramId, TargetId) {
        let db = Database::new();
        let (programs, pid) = db.program_table().next_unused().unwrap();
        let programs = programs
            .with_row(pid, Program { id: pid, existence: Existence::Present, name: None })
            .unwrap();
        let db = Database::programs().set(&db, programs);

        let (targets, tid) = db.target_table().next_unused().unwrap();
        let target = Target {
            id: tid,
            program_id: pid,
            existence: Existence::Present,
            name: "Vega".into(),
            tracking: crate::model::Tracking::Nonsidereal {
                key_type: crate::model::target::EphemerisKeyType::MajorBody,
                des: "x".into(),
            },
        };
        let db = Database::targets().set(&db, targets.with_row(tid, target).unwrap());
        (db, pid, tid)
    }

    #[test]
    fn test_lookup_missing_names_kind_and_id() {
        let db = Database::new();
        let err = db.lookup::<Program>(ProgramId::from_value(7).unwrap()).unwrap_err();
        assert_eq!(err.to_string(), "Program p-7 does not exist");
    }

    #[test]
    fn test_check_asterism() {
        let (db, pid, tid) = seeded();
        let ok: BTreeSet<_> = [tid].into_iter().collect();
        assert!(db.check_asterism(pid, &ok).is_ok());

        let missing: BTreeSet<_> = [tid, TargetId::from_value(99).unwrap()].into_iter().collect();
        assert!(db.check_asterism(pid, &missing).unwrap_err().is_missing_reference());

        let other = ProgramId::from_value(2).unwrap();
        assert!(db.check_asterism(other, &ok).unwrap_err().is_input());
    }

    #[test]
    fn test_table_lens_shares_untouched_tables() {
        let (db, _, _) = seeded();
        let next = Database::programs().modify(&db, |t| t);
        assert_eq!(next.target_table(), db.target_table());
    }
}
