//! Storage backend tests.

use chrono::{DateTime, Duration, TimeZone, Utc};
use tempfile::TempDir;

use super::*;
use crate::hazard::{Hazard, HazardId, Worker};
use crate::loader::HazardSource;
use crate::repair::{Milestone, RepairStore, RepairTracker, RepairUpdate};

fn base() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap()
}

fn hazard(id: &str, risk: &str, minutes: i64) -> Hazard {
    Hazard {
        id: HazardId::from(id),
        latitude: 2.9,
        longitude: 101.8,
        hazard_type: "pothole".into(),
        risk_level: risk.into(),
        repair_material: Some("asphalt".into()),
        volume_material_required: Some(0.25),
        manpower_required: Some(3),
        image_url: None,
        state: Some("Selangor".into()),
        reported_at: base() + Duration::minutes(minutes),
    }
}

// ============================================================================
// SqliteStore
// ============================================================================

#[test]
fn test_open_creates_file_and_reopens() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("roadwatch.db");

    {
        let store = SqliteStore::open(&path).unwrap();
        store.insert_hazard(&hazard("1", "high", 0)).unwrap();
        assert_eq!(store.path(), Some(path.as_path()));
    }

    let reopened = SqliteStore::open(&path).unwrap();
    let loaded = reopened.hazard(&HazardId::from("1")).unwrap().unwrap();
    assert_eq!(loaded, hazard("1", "high", 0));
}

#[test]
fn test_list_hazards_newest_first_and_capped() {
    let store = SqliteStore::in_memory().unwrap();
    for i in 0..60 {
        store.insert_hazard(&hazard(&i.to_string(), "low", i)).unwrap();
    }

    let listed = store.list_hazards(DEFAULT_LIST_LIMIT).unwrap();
    assert_eq!(listed.len(), 50);
    assert_eq!(listed[0].id, HazardId::from("59"));
    assert!(listed.windows(2).all(|w| w[0].reported_at >= w[1].reported_at));
}

#[test]
fn test_list_summaries_by_risk() {
    let store = SqliteStore::in_memory().unwrap();
    store.insert_hazard(&hazard("1", "1-low", 0)).unwrap();
    store.insert_hazard(&hazard("2", "3-high", 1)).unwrap();
    store.insert_hazard(&hazard("3", "2-medium", 2)).unwrap();

    let summaries = store.list_summaries(DEFAULT_LIST_LIMIT).unwrap();
    let order: Vec<_> = summaries.iter().map(|s| s.id.as_str()).collect();
    assert_eq!(order, vec!["2", "3", "1"]);
    assert_eq!(summaries[0].state.as_deref(), Some("Selangor"));
}

#[test]
fn test_missing_hazard_is_none() {
    let store = SqliteStore::in_memory().unwrap();
    assert!(store.hazard(&HazardId::from("nope")).unwrap().is_none());
}

#[test]
fn test_workers_ordered_by_name() {
    let store = SqliteStore::in_memory().unwrap();
    for (id, name) in [("w1", "Zainab"), ("w2", "Ahmad"), ("w3", "Mei Ling")] {
        store
            .insert_worker(&Worker {
                id: id.into(),
                name: name.into(),
            })
            .unwrap();
    }

    let names: Vec<_> = store
        .list_workers()
        .unwrap()
        .into_iter()
        .map(|w| w.name)
        .collect();
    assert_eq!(names, vec!["Ahmad", "Mei Ling", "Zainab"]);
}

#[test]
fn test_create_tracker_once() {
    let store = SqliteStore::in_memory().unwrap();
    assert!(store.create_tracker(&HazardId::from("5")).unwrap());
    assert!(!store.create_tracker(&HazardId::from("5")).unwrap());
}

#[tokio::test]
async fn test_conditional_write_keeps_milestones() {
    let store = SqliteStore::in_memory().unwrap();
    let id = HazardId::from("5");
    store.create_tracker(&id).unwrap();

    let first = store
        .apply_forward_only(
            &id,
            &RepairUpdate::default().with_milestone(Milestone::TeamAssigned, base()),
        )
        .await
        .unwrap()
        .unwrap();
    assert_eq!(first.team_assigned_at, Some(base()));

    let second = store
        .apply_forward_only(
            &id,
            &RepairUpdate::default()
                .with_milestone(Milestone::TeamAssigned, base() + Duration::hours(1))
                .with_milestone(Milestone::OnTheWay, base() + Duration::hours(2)),
        )
        .await
        .unwrap()
        .unwrap();
    assert_eq!(second.team_assigned_at, Some(base()));
    assert_eq!(second.on_the_way_at, Some(base() + Duration::hours(2)));
    assert_eq!(store.fetch_tracker(&id).await.unwrap(), Some(second));
}

#[tokio::test]
async fn test_insert_hazard_opens_tracker() {
    let store = SqliteStore::in_memory().unwrap();
    let id = HazardId::from("5");
    store.insert_hazard(&hazard("5", "high", 30)).unwrap();

    let tracker = store.fetch_tracker(&id).await.unwrap().unwrap();
    assert_eq!(tracker.reported_at, Some(base() + Duration::minutes(30)));
    assert_eq!(tracker.stage(), Some(Milestone::Reported));

    // Re-reporting keeps the tracker and its progress.
    store
        .apply_forward_only(&id, &RepairUpdate::default().with_worker("Alice"))
        .await
        .unwrap();
    store.insert_hazard(&hazard("5", "high", 45)).unwrap();
    let tracker = store.fetch_tracker(&id).await.unwrap().unwrap();
    assert_eq!(tracker.reported_at, Some(base() + Duration::minutes(30)));
    assert_eq!(tracker.worker.as_deref(), Some("Alice"));
    assert!(!store.create_tracker(&id).unwrap());
}

#[tokio::test]
async fn test_conditional_write_on_missing_tracker() {
    let store = SqliteStore::in_memory().unwrap();
    let result = store
        .apply_forward_only(&HazardId::from("ghost"), &RepairUpdate::default().with_worker("Alice"))
        .await
        .unwrap();
    assert!(result.is_none());
    assert!(store.fetch_tracker(&HazardId::from("ghost")).await.unwrap().is_none());
}

#[tokio::test]
async fn test_persist_overwrites() {
    let store = SqliteStore::in_memory().unwrap();
    let mut record = RepairTracker::new(HazardId::from("5"));
    record.completed_at = Some(base());
    store.persist_tracker(&record).await.unwrap();

    // The storage boundary itself has plain overwrite semantics.
    record.completed_at = None;
    let stored = store.persist_tracker(&record).await.unwrap();
    assert_eq!(stored, record);
}

#[tokio::test]
async fn test_clones_share_connection() {
    let store = SqliteStore::in_memory().unwrap();
    let clone = store.clone();
    store.create_tracker(&HazardId::from("5")).unwrap();
    assert!(clone.fetch_tracker(&HazardId::from("5")).await.unwrap().is_some());
}

// ============================================================================
// InMemoryStore
// ============================================================================

#[tokio::test]
async fn test_in_memory_source_sorted_and_capped() {
    let store = InMemoryStore::new();
    store
        .set_hazards((0..70).map(|i| hazard(&i.to_string(), "low", i)).collect())
        .unwrap();

    let hazards = store.fetch_hazard_list().await.unwrap();
    assert_eq!(hazards.len(), 50);
    assert_eq!(hazards[0].id, HazardId::from("69"));
}

#[tokio::test]
async fn test_in_memory_counts_tracker_io() {
    let store = InMemoryStore::new();
    store
        .insert_tracker(RepairTracker::new(HazardId::from("5")))
        .unwrap();

    store.fetch_tracker(&HazardId::from("5")).await.unwrap();
    store
        .apply_forward_only(&HazardId::from("404"), &RepairUpdate::default())
        .await
        .unwrap();
    assert_eq!(store.stats(), StoreStats { reads: 2, writes: 0 });
}
