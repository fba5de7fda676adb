/// Repository tests
///
/// Insert, bulk edit, delete/undelete and referential checks through the
/// public `Odb` facade.
/// Run with: cargo test --test repository_tests

use obsdb::model::{
    CreateObservationInput, CreateProgramInput, CreateTargetInput, EditAsterismsInput,
    EditObservationInput, EditProgramInput, EditTargetInput, Observation, SkyBackground,
};
use obsdb::{EditType, EventFilter, Existence, Gid, ObservationId, Odb, OdbConfig, ProgramId, SuggestedIdPolicy, TargetId};
use serde_json::json;

fn program(odb: &Odb) -> ProgramId {
    odb.programs()
        .insert(CreateProgramInput {
            program_id: None,
            name: Some("Survey".into()),
        })
        .unwrap()
        .id
}

fn target(odb: &Odb, pid: ProgramId, name: &str) -> TargetId {
    let input: CreateTargetInput = serde_json::from_value(json!({
        "programId": pid.to_string(),
        "name": name,
        "sidereal": {
            "ra": {"hms": "18:36:56.336"},
            "dec": {"dms": "+38:47:01.28"},
            "epoch": "J2000.000"
        }
    }))
    .unwrap();
    odb.targets().insert(input).unwrap().id
}

fn observation(odb: &Odb, pid: ProgramId) -> ObservationId {
    odb.observations()
        .insert(CreateObservationInput {
            observation_id: None,
            program_id: pid,
            set: None,
        })
        .unwrap()
        .id
}

fn edit_observations(ids: &[ObservationId], patch: serde_json::Value) -> EditObservationInput {
    let ids: Vec<String> = ids.iter().map(|id| id.to_string()).collect();
    serde_json::from_value(json!({
        "select": {"observationIds": ids},
        "patch": patch
    }))
    .unwrap()
}

#[test]
fn test_bulk_edit_sky_background() {
    let odb = Odb::new();
    let pid = program(&odb);
    let o1 = observation(&odb, pid);
    let o2 = observation(&odb, pid);
    let mut sub = odb.subscribe(EventFilter::all()).unwrap();

    let edited = odb
        .observations()
        .edit(edit_observations(&[o2, o1], json!({"constraintSet": {"skyBackground": "GRAY"}})))
        .unwrap();

    assert_eq!(edited.iter().map(|o| o.id).collect::<Vec<_>>(), [o1, o2]);
    assert!(edited.iter().all(|o| o.constraint_set.sky_background == SkyBackground::Gray));

    let events = sub.drain();
    assert_eq!(events.len(), 2);
    assert!(events.iter().all(|e| e.edit_type == EditType::Updated));
    assert_eq!(events[0].payload.entity_id(), o1.to_string());
    assert_eq!(events[1].payload.entity_id(), o2.to_string());
    assert!(events[0].id < events[1].id);
}

#[test]
fn test_invalid_airmass_reports_once_and_changes_nothing() {
    let odb = Odb::new();
    let pid = program(&odb);
    let o1 = observation(&odb, pid);
    let o2 = observation(&odb, pid);
    let before = odb.snapshot().unwrap();

    let err = odb
        .observations()
        .edit(edit_observations(
            &[o1, o2],
            json!({"constraintSet": {"elevationRange": {"airMass": {"min": 0.0}}}}),
        ))
        .unwrap_err();

    assert_eq!(err.messages().len(), 1);
    assert_eq!(odb.snapshot().unwrap().version(), before.version());
}

#[test]
fn test_bulk_edit_is_all_or_nothing() {
    let odb = Odb::new();
    let pid = program(&odb);
    let o1 = observation(&odb, pid);
    let o2 = observation(&odb, pid);

    // o2 uses an hour-angle range, so a partial airmass edit cannot apply to it.
    odb.observations()
        .edit(edit_observations(
            &[o2],
            json!({"constraintSet": {"elevationRange": {"hourAngle": {"minHours": -2.0, "maxHours": 2.0}}}}),
        ))
        .unwrap();
    let before = odb.snapshot().unwrap();

    let err = odb
        .observations()
        .edit(edit_observations(
            &[o1, o2],
            json!({"constraintSet": {"elevationRange": {"airMass": {"max": 1.5}}}}),
        ))
        .unwrap_err();

    let messages = err.messages();
    assert_eq!(messages.len(), 1);
    assert!(messages[0].starts_with(&o2.to_string()), "{messages:?}");
    let after = odb.snapshot().unwrap();
    assert_eq!(after.observation(o1), before.observation(o1));
    assert_eq!(after.version(), before.version());
}

#[test]
fn test_delete_is_idempotent_and_undelete_restores() {
    let odb = Odb::new();
    let pid = program(&odb);
    let oid = observation(&odb, pid);
    let mut sub = odb.subscribe(EventFilter::all()).unwrap();

    let first = odb.observations().delete(oid).unwrap();
    let second = odb.observations().delete(oid).unwrap();
    assert_eq!(first, second);
    assert_eq!(first.existence, Existence::Deleted);
    assert_eq!(odb.observations().select(oid, false).unwrap(), None);

    let restored = odb.observations().undelete(oid).unwrap();
    assert_eq!(restored.existence, Existence::Present);

    let kinds: Vec<_> = sub.drain().into_iter().map(|e| e.edit_type).collect();
    assert_eq!(kinds, [EditType::Deleted, EditType::Updated]);
}

#[test]
fn test_ids_are_monotonic_and_never_reused() {
    let odb = Odb::new();
    let ids: Vec<_> = (0..5).map(|_| program(&odb)).collect();
    assert!(ids.windows(2).all(|w| w[0] < w[1]));

    let last = *ids.last().unwrap();
    odb.programs().delete(last).unwrap();
    let next = program(&odb);
    assert!(next > last);
}

#[test]
fn test_suggested_id_policies() {
    let odb = Odb::new();
    let taken = program(&odb);
    let suggested = ProgramId::from_value(0x2a).unwrap();

    let claimed = odb
        .programs()
        .insert(CreateProgramInput {
            program_id: Some(suggested),
            name: None,
        })
        .unwrap();
    assert_eq!(claimed.id.to_string(), "p-2a");

    let fallback = odb
        .programs()
        .insert(CreateProgramInput {
            program_id: Some(taken),
            name: None,
        })
        .unwrap();
    assert_eq!(fallback.id.to_string(), "p-2b");

    let strict = Odb::with_config(OdbConfig::new().suggested_id_policy(SuggestedIdPolicy::Reject));
    let taken = program(&strict);
    let err = strict
        .programs()
        .insert(CreateProgramInput {
            program_id: Some(taken),
            name: None,
        })
        .unwrap_err();
    assert_eq!(err.messages(), ["Program id p-1 is already in use"]);
}

#[test]
fn test_oversized_suggested_id_is_rejected() {
    let odb = Odb::new();
    let err = odb
        .programs()
        .insert(CreateProgramInput {
            program_id: Some(ProgramId::from_value(u64::MAX).unwrap()),
            name: None,
        })
        .unwrap_err();
    assert!(err.is_input());
    assert_eq!(odb.snapshot().unwrap().version(), 0);

    let next = program(&odb);
    assert_eq!(next.to_string(), "p-1");
}

#[test]
fn test_asterism_must_reference_existing_targets() {
    let odb = Odb::new();
    let pid = program(&odb);
    let before = odb.snapshot().unwrap();

    let input: CreateObservationInput = serde_json::from_value(json!({
        "programId": pid.to_string(),
        "set": {"targetEnvironment": {"asterism": ["t-5"]}}
    }))
    .unwrap();
    let err = odb.observations().insert(input).unwrap_err();

    assert!(err.is_missing_reference());
    assert_eq!(err.to_string(), "Target t-5 does not exist");
    assert_eq!(odb.snapshot().unwrap().observation_table().len(), 0);
    assert_eq!(odb.snapshot().unwrap().version(), before.version());
}

#[test]
fn test_asterism_targets_must_share_the_program() {
    let odb = Odb::new();
    let p1 = program(&odb);
    let p2 = program(&odb);
    let foreign = target(&odb, p2, "Vega");
    let oid = observation(&odb, p1);

    let err = odb
        .observations()
        .edit(edit_observations(
            &[oid],
            json!({"targetEnvironment": {"asterism": [foreign.to_string()]}}),
        ))
        .unwrap_err();
    assert!(err.is_input());
}

#[test]
fn test_bulk_asterism_edit_attributes_each_failure_once() {
    let odb = Odb::new();
    let p1 = program(&odb);
    let p2 = program(&odb);
    let foreign = target(&odb, p2, "Vega");
    let o1 = observation(&odb, p1);
    let o2 = observation(&odb, p1);
    let before = odb.snapshot().unwrap();

    let add = |t: String| -> EditAsterismsInput {
        serde_json::from_value(json!({
            "select": {"observationIds": [o1.to_string(), o2.to_string()]},
            "patch": {"add": [t]}
        }))
        .unwrap()
    };

    let err = odb.observations().update_asterisms(add("t-9".into())).unwrap_err();
    assert!(err.is_missing_reference());
    assert_eq!(err.messages(), ["Target t-9 does not exist"]);

    let err = odb.observations().update_asterisms(add(foreign.to_string())).unwrap_err();
    let messages = err.messages();
    assert_eq!(messages.len(), 2);
    assert!(messages[0].starts_with(&format!("{o1}: ")), "{messages:?}");
    assert!(messages[1].starts_with(&format!("{o2}: ")), "{messages:?}");
    assert_eq!(odb.snapshot().unwrap().version(), before.version());
}

#[test]
fn test_child_insert_requires_program() {
    let odb = Odb::new();
    let err = odb
        .observations()
        .insert(CreateObservationInput {
            observation_id: None,
            program_id: ProgramId::from_value(3).unwrap(),
            set: None,
        })
        .unwrap_err();
    assert_eq!(err.to_string(), "Program p-3 does not exist");
}

#[test]
fn test_target_create_accumulates_errors() {
    let odb = Odb::new();
    let pid = program(&odb);
    let input: CreateTargetInput =
        serde_json::from_value(json!({"programId": pid.to_string()})).unwrap();
    let err = odb.targets().insert(input).unwrap_err();
    assert_eq!(err.messages().len(), 2);
}

#[test]
fn test_select_by_program_skips_deleted() {
    let odb = Odb::new();
    let pid = program(&odb);
    let t1 = target(&odb, pid, "Vega");
    let t2 = target(&odb, pid, "Deneb");
    odb.targets().delete(t1).unwrap();

    let rename = |include_deleted: bool| -> EditTargetInput {
        serde_json::from_value(json!({
            "select": {"programId": pid.to_string(), "includeDeleted": include_deleted},
            "patch": {"name": "renamed"}
        }))
        .unwrap()
    };

    let edited = odb.targets().edit(rename(false)).unwrap();
    assert_eq!(edited.iter().map(|t| t.id).collect::<Vec<_>>(), [t2]);

    let edited = odb.targets().edit(rename(true)).unwrap();
    assert_eq!(edited.iter().map(|t| t.id).collect::<Vec<_>>(), [t1, t2]);
}

#[test]
fn test_edit_unknown_ids_reports_every_missing_reference() {
    let odb = Odb::new();
    let pid = program(&odb);
    let oid = observation(&odb, pid);
    let err = odb
        .observations()
        .edit(edit_observations(
            &[oid, ObservationId::from_value(8).unwrap(), ObservationId::from_value(9).unwrap()],
            json!({"subtitle": "x"}),
        ))
        .unwrap_err();
    assert_eq!(err.messages(), ["Observation o-8 does not exist", "Observation o-9 does not exist"]);
    assert_eq!(odb.observations().select(oid, false).unwrap().unwrap().subtitle, None);
}

#[test]
fn test_unchanged_candidates_publish_nothing() {
    let odb = Odb::new();
    let pid = program(&odb);
    let o1 = observation(&odb, pid);
    let o2 = observation(&odb, pid);
    odb.observations()
        .edit(edit_observations(&[o1], json!({"status": "READY"})))
        .unwrap();

    let mut sub = odb.subscribe(EventFilter::all()).unwrap();
    odb.observations()
        .edit(edit_observations(&[o1, o2], json!({"status": "READY"})))
        .unwrap();
    let events = sub.drain();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].payload.entity_id(), o2.to_string());
}

#[test]
fn test_patch_tombstone_publishes_deleted() {
    let odb = Odb::new();
    let pid = program(&odb);
    let mut sub = odb.subscribe(EventFilter::all()).unwrap();
    let input: EditProgramInput = serde_json::from_value(json!({
        "select": {"programIds": [pid.to_string()]},
        "patch": {"existence": "DELETED", "name": null}
    }))
    .unwrap();
    let edited = odb.programs().edit(input).unwrap();
    assert_eq!(edited[0].name, None);
    assert_eq!(sub.drain()[0].edit_type, EditType::Deleted);
}

#[test]
fn test_update_asterisms_and_groups() {
    let odb = Odb::new();
    let pid = program(&odb);
    let t1 = target(&odb, pid, "Vega");
    let t2 = target(&odb, pid, "Deneb");
    let o1 = observation(&odb, pid);
    let o2 = observation(&odb, pid);
    let o3 = observation(&odb, pid);

    let add_both: EditAsterismsInput = serde_json::from_value(json!({
        "select": {"observationIds": [o1.to_string(), o2.to_string()]},
        "patch": {"add": [t1.to_string(), t2.to_string()]}
    }))
    .unwrap();
    odb.observations().update_asterisms(add_both).unwrap();

    let drop_t2: EditAsterismsInput = serde_json::from_value(json!({
        "select": {"observationIds": [o2.to_string()]},
        "patch": {"delete": [t2.to_string()]}
    }))
    .unwrap();
    let edited = odb.observations().update_asterisms(drop_t2).unwrap();
    assert_eq!(edited[0].target_environment.asterism.iter().copied().collect::<Vec<_>>(), [t1]);

    let groups = odb.observations().asterism_groups(pid).unwrap();
    let shapes: Vec<(Vec<TargetId>, Vec<ObservationId>)> = groups
        .into_iter()
        .map(|g| (g.asterism.into_iter().collect(), g.observation_ids.into_iter().collect()))
        .collect();
    assert_eq!(shapes, [(Vec::<TargetId>::new(), vec![o3]), (vec![t1], vec![o2]), (vec![t1, t2], vec![o1])]);

    assert_eq!(odb.targets().referencing_observations(t2).unwrap(), [o1]);
}

#[test]
fn test_clone_observation() {
    let odb = Odb::new();
    let pid = program(&odb);
    let t1 = target(&odb, pid, "Vega");
    let original = odb
        .observations()
        .insert(
            serde_json::from_value(json!({
                "programId": pid.to_string(),
                "set": {
                    "subtitle": "deep field",
                    "status": "READY",
                    "targetEnvironment": {"asterism": [t1.to_string()]}
                }
            }))
            .unwrap(),
        )
        .unwrap();

    let mut sub = odb.subscribe(EventFilter::all()).unwrap();
    let copy: Observation = odb.observations().clone_observation(original.id).unwrap();

    assert!(copy.id > original.id);
    assert_eq!(copy.subtitle, original.subtitle);
    assert_eq!(copy.target_environment, original.target_environment);
    assert_eq!(copy.status, obsdb::model::ObsStatus::New);
    assert_eq!(sub.drain()[0].edit_type, EditType::Created);
}
