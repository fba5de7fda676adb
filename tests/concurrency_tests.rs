/// Concurrent access tests
///
/// Many tasks inserting and bulk-editing through one shared database.
/// Run with: cargo test --test concurrency_tests

use obsdb::model::{CreateObservationInput, CreateProgramInput, EditObservationInput};
use obsdb::{EventFilter, Odb, ProgramId};
use std::collections::BTreeSet;
use std::sync::Arc;
use tokio::sync::Barrier;

fn program(odb: &Odb) -> ProgramId {
    odb.programs().insert(CreateProgramInput::default()).unwrap().id
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_inserts_issue_distinct_ids() {
    let odb = Odb::new();
    let pid = program(&odb);

    let num_tasks = 8;
    let inserts_per_task = 25;
    let barrier = Arc::new(Barrier::new(num_tasks));
    let mut handles = vec![];

    for _ in 0..num_tasks {
        let odb = odb.clone();
        let barrier = Arc::clone(&barrier);
        handles.push(tokio::spawn(async move {
            barrier.wait().await;
            let mut ids = vec![];
            for _ in 0..inserts_per_task {
                let obs = odb
                    .observations()
                    .insert(CreateObservationInput {
                        observation_id: None,
                        program_id: pid,
                        set: None,
                    })
                    .unwrap();
                ids.push(obs.id);
            }
            ids
        }));
    }

    let mut all = BTreeSet::new();
    for handle in handles {
        let ids = handle.await.unwrap();
        assert!(ids.windows(2).all(|w| w[0] < w[1]), "ids within a task must increase");
        all.extend(ids);
    }

    assert_eq!(all.len(), num_tasks * inserts_per_task);
    let snapshot = odb.snapshot().unwrap();
    assert_eq!(snapshot.observation_table().len(), num_tasks * inserts_per_task);
    // One commit for the program plus one per observation.
    assert_eq!(snapshot.version(), 1 + (num_tasks * inserts_per_task) as u64);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_bulk_edits_racing_inserts_stay_consistent() {
    let odb = Odb::new();
    let pid = program(&odb);
    for _ in 0..10 {
        odb.observations()
            .insert(CreateObservationInput {
                observation_id: None,
                program_id: pid,
                set: None,
            })
            .unwrap();
    }
    let mut sub = odb.subscribe(EventFilter::all()).unwrap();
    let barrier = Arc::new(Barrier::new(2));

    let editor = {
        let odb = odb.clone();
        let barrier = Arc::clone(&barrier);
        tokio::spawn(async move {
            barrier.wait().await;
            for i in 0..20 {
                let input: EditObservationInput = serde_json::from_value(serde_json::json!({
                    "select": {"programId": pid.to_string()},
                    "patch": {"subtitle": format!("pass {i}")}
                }))
                .unwrap();
                odb.observations().edit(input).unwrap();
            }
        })
    };
    let inserter = {
        let odb = odb.clone();
        let barrier = Arc::clone(&barrier);
        tokio::spawn(async move {
            barrier.wait().await;
            for _ in 0..20 {
                odb.observations()
                    .insert(CreateObservationInput {
                        observation_id: None,
                        program_id: pid,
                        set: None,
                    })
                    .unwrap();
            }
        })
    };
    editor.await.unwrap();
    inserter.await.unwrap();

    // The final pass saw a single snapshot, so every observation it selected
    // carries the same subtitle.
    let snapshot = odb.snapshot().unwrap();
    assert_eq!(snapshot.observation_table().len(), 30);
    let first_ten: BTreeSet<_> = snapshot
        .observation_table()
        .values()
        .take(10)
        .map(|o| o.subtitle.clone())
        .collect();
    assert_eq!(first_ten.len(), 1);
    assert_eq!(first_ten.into_iter().next().flatten().as_deref(), Some("pass 19"));

    let events = sub.drain();
    assert!(events.windows(2).all(|w| w[0].id < w[1].id));
}

#[test]
fn test_threads_share_one_database() {
    let odb = Odb::new();
    std::thread::scope(|s| {
        for _ in 0..4 {
            s.spawn(|| {
                for _ in 0..50 {
                    program(&odb);
                }
            });
        }
    });
    let page = odb.programs().select_page(None, None, false, |_| true).unwrap();
    assert_eq!(page.len(), 200);
    assert_eq!(page.cursor().map(|id| id.to_string()).as_deref(), Some("p-c8"));
}
