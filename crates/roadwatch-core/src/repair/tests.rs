//! Repair Status Engine tests.

use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};
use proptest::prelude::*;

use super::*;
use crate::hazard::HazardId;
use crate::store::{InMemoryStore, SqliteStore, StoreStats};

fn t(hour: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 6, 1, hour, 0, 0).unwrap()
}

fn reported(id: &str) -> RepairTracker {
    RepairTracker {
        reported_at: Some(t(0)),
        ..RepairTracker::new(HazardId::from(id))
    }
}

fn engine_with(tracker: RepairTracker) -> RepairEngine<Arc<InMemoryStore>> {
    let store = Arc::new(InMemoryStore::new());
    store.insert_tracker(tracker).unwrap();
    RepairEngine::new(store)
}

// ============================================================================
// Merge
// ============================================================================

#[test]
fn test_merge_fills_unset_milestone() {
    let existing = reported("1");
    let merged = merge(
        &existing,
        &RepairUpdate::default().with_milestone(Milestone::TeamAssigned, t(1)),
    );
    assert_eq!(merged.reported_at, Some(t(0)));
    assert_eq!(merged.team_assigned_at, Some(t(1)));
    assert_eq!(merged.stage(), Some(Milestone::TeamAssigned));
}

#[test]
fn test_merge_never_overwrites_milestone() {
    let existing = reported("1");
    let update = RepairUpdate::default().with_milestone(Milestone::Reported, t(9));

    let merged = merge(&existing, &update);
    assert_eq!(merged.reported_at, Some(t(0)));
    assert_eq!(update.absorbed_by(&merged), vec![Milestone::Reported]);
}

#[test]
fn test_merge_worker_overwrites() {
    let existing = RepairTracker {
        worker: Some("Alice".into()),
        ..reported("1")
    };

    let merged = merge(&existing, &RepairUpdate::default().with_worker("Bob"));
    assert_eq!(merged.worker.as_deref(), Some("Bob"));

    let kept = merge(&merged, &RepairUpdate::default());
    assert_eq!(kept.worker.as_deref(), Some("Bob"));
}

#[test]
fn test_null_and_missing_are_equivalent() {
    let explicit: RepairUpdate =
        serde_json::from_str(r#"{"worker":null,"team_assigned_at":null}"#).unwrap();
    let omitted: RepairUpdate = serde_json::from_str("{}").unwrap();
    assert_eq!(explicit, omitted);
    assert!(explicit.is_empty());

    let existing = RepairTracker {
        worker: Some("Alice".into()),
        team_assigned_at: Some(t(1)),
        ..reported("1")
    };
    assert_eq!(merge(&existing, &explicit), existing);
}

#[test]
fn test_update_decodes_rfc3339_and_ignores_unknown_keys() {
    let update: RepairUpdate = serde_json::from_str(
        r#"{"worker":"Alice","on_the_way_at":"2025-06-01T03:00:00Z","status":"busy"}"#,
    )
    .unwrap();
    assert_eq!(update.worker.as_deref(), Some("Alice"));
    assert_eq!(update.on_the_way_at, Some(t(3)));
}

#[test]
fn test_stage_follows_workflow_order() {
    let mut tracker = RepairTracker::new(HazardId::from("1"));
    assert_eq!(tracker.stage(), None);

    tracker.completed_at = Some(t(5));
    tracker.team_assigned_at = Some(t(1));
    assert_eq!(tracker.stage(), Some(Milestone::Completed));
}

// ============================================================================
// Engine
// ============================================================================

#[tokio::test]
async fn test_second_assignment_is_absorbed() {
    let engine = engine_with(reported("5"));
    let id = HazardId::from("5");

    let first = engine
        .apply_update(
            &id,
            RepairUpdate::default().with_milestone(Milestone::TeamAssigned, t(1)),
        )
        .await
        .unwrap();
    assert_eq!(first.team_assigned_at, Some(t(1)));

    let second = engine
        .apply_update(
            &id,
            RepairUpdate::default().with_milestone(Milestone::TeamAssigned, t(2)),
        )
        .await
        .unwrap();
    assert_eq!(second.team_assigned_at, Some(t(1)));
    assert_eq!(engine.tracker(&id).await.unwrap(), second);
}

#[tokio::test]
async fn test_missing_tracker_is_not_found() {
    let engine = RepairEngine::new(InMemoryStore::new());

    let err = engine
        .apply_update(
            &HazardId::from("nonexistent-id"),
            RepairUpdate::default().with_worker("Alice"),
        )
        .await
        .unwrap_err();
    assert!(err.is_not_found());
    assert!(matches!(err, RepairError::NotFound { ref id } if id.as_str() == "nonexistent-id"));
    assert_eq!(engine.store().stats().writes, 0);
}

#[tokio::test]
async fn test_default_path_reads_once_and_writes_once() {
    let engine = engine_with(reported("5"));

    engine
        .apply_update(&HazardId::from("5"), RepairUpdate::default().with_worker("Alice"))
        .await
        .unwrap();
    assert_eq!(engine.store().stats(), StoreStats { reads: 1, writes: 1 });
}

#[tokio::test]
async fn test_sqlite_store_behaves_like_default_path() {
    let store = SqliteStore::in_memory().unwrap();
    store.create_tracker(&HazardId::from("5")).unwrap();
    let engine = RepairEngine::new(store);
    let id = HazardId::from("5");

    let update = RepairUpdate::default()
        .with_worker("Alice")
        .with_milestone(Milestone::Reported, t(0));
    let first = engine.apply_update(&id, update.clone()).await.unwrap();
    let again = engine.apply_update(&id, update).await.unwrap();
    assert_eq!(first, again);

    let late = engine
        .apply_update(
            &id,
            RepairUpdate::default()
                .with_milestone(Milestone::Reported, t(4))
                .with_worker("Bob"),
        )
        .await
        .unwrap();
    assert_eq!(late.reported_at, Some(t(0)));
    assert_eq!(late.worker.as_deref(), Some("Bob"));

    let err = engine
        .apply_update(&HazardId::from("6"), RepairUpdate::default())
        .await
        .unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_sqlite_updates_lose_nothing() {
    const ROUNDS: usize = 64;

    let store = SqliteStore::in_memory().unwrap();
    let crew = RepairEngine::new(store.clone());
    let dispatch = RepairEngine::new(store.clone());

    let mut rounds = Vec::with_capacity(ROUNDS);
    for round in 0..ROUNDS {
        let id = HazardId::from(round.to_string());
        store.create_tracker(&id).unwrap();
        let barrier = Arc::new(tokio::sync::Barrier::new(2));

        // Each side records its own milestone and races the other for
        // the team assignment.
        let crew_task = {
            let (engine, id, barrier) = (crew.clone(), id.clone(), Arc::clone(&barrier));
            tokio::spawn(async move {
                barrier.wait().await;
                engine
                    .apply_update(
                        &id,
                        RepairUpdate::default()
                            .with_milestone(Milestone::TeamAssigned, t(1))
                            .with_milestone(Milestone::OnTheWay, t(2)),
                    )
                    .await
            })
        };
        let dispatch_task = {
            let (engine, id, barrier) = (dispatch.clone(), id.clone(), barrier);
            tokio::spawn(async move {
                barrier.wait().await;
                engine
                    .apply_update(
                        &id,
                        RepairUpdate::default()
                            .with_milestone(Milestone::TeamAssigned, t(3))
                            .with_milestone(Milestone::InProgress, t(4)),
                    )
                    .await
            })
        };
        rounds.push((id, crew_task, dispatch_task));
    }

    for (id, crew_task, dispatch_task) in rounds {
        let from_crew = crew_task.await.unwrap().unwrap();
        let from_dispatch = dispatch_task.await.unwrap().unwrap();
        let stored = crew.tracker(&id).await.unwrap();

        assert_eq!(stored.on_the_way_at, Some(t(2)), "hazard {id}");
        assert_eq!(stored.in_progress_at, Some(t(4)), "hazard {id}");
        assert!(
            stored.team_assigned_at == Some(t(1)) || stored.team_assigned_at == Some(t(3)),
            "hazard {id}"
        );
        // Whoever wrote second saw the first value and kept it.
        assert_eq!(from_crew.team_assigned_at, stored.team_assigned_at, "hazard {id}");
        assert_eq!(from_dispatch.team_assigned_at, stored.team_assigned_at, "hazard {id}");
    }
}

// ============================================================================
// Properties
// ============================================================================

fn arb_timestamp() -> impl Strategy<Value = Option<DateTime<Utc>>> {
    prop::option::of((0i64..1_000_000).prop_map(|secs| {
        Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
    }))
}

fn arb_update() -> impl Strategy<Value = RepairUpdate> {
    (
        prop::option::of("[a-z]{1,8}"),
        arb_timestamp(),
        arb_timestamp(),
        arb_timestamp(),
        arb_timestamp(),
        arb_timestamp(),
    )
        .prop_map(
            |(worker, reported_at, team_assigned_at, on_the_way_at, in_progress_at, completed_at)| {
                RepairUpdate {
                    worker,
                    reported_at,
                    team_assigned_at,
                    on_the_way_at,
                    in_progress_at,
                    completed_at,
                }
            },
        )
}

fn arb_tracker() -> impl Strategy<Value = RepairTracker> {
    arb_update().prop_map(|u| merge(&RepairTracker::new(HazardId::from("p")), &u))
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// Property: a milestone set before an update keeps its exact value.
    #[test]
    fn prop_milestones_are_forward_only(
        start in arb_tracker(),
        updates in prop::collection::vec(arb_update(), 1..10),
    ) {
        let mut current = start;
        for update in &updates {
            let next = merge(&current, update);
            for m in Milestone::ALL {
                if let Some(before) = current.milestone(m) {
                    prop_assert_eq!(next.milestone(m), Some(before));
                }
            }
            current = next;
        }
    }

    /// Property: applying the same payload twice equals applying it once.
    #[test]
    fn prop_merge_is_idempotent(start in arb_tracker(), update in arb_update()) {
        let once = merge(&start, &update);
        let twice = merge(&once, &update);
        prop_assert_eq!(once, twice);
    }

    /// Property: the SQLite conditional write agrees with the in-memory
    /// read-merge-persist path for any update sequence.
    #[test]
    fn prop_sqlite_matches_default_path(updates in prop::collection::vec(arb_update(), 1..6)) {
        let rt = tokio::runtime::Builder::new_current_thread().build().unwrap();
        rt.block_on(async {
            let id = HazardId::from("p");
            let memory = engine_with(RepairTracker::new(id.clone()));
            let sqlite = SqliteStore::in_memory().unwrap();
            sqlite.create_tracker(&id).unwrap();
            let sqlite = RepairEngine::new(sqlite);

            for update in updates {
                let a = memory.apply_update(&id, update.clone()).await.unwrap();
                let b = sqlite.apply_update(&id, update).await.unwrap();
                assert_eq!(a, b);
            }
        });
    }
}
