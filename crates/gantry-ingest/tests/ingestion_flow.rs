//! End-to-end tests for the batch ingestion pipeline against the
//! in-memory store: dedup semantics, rejection reporting, the counter
//! law, and the fallback path under injected store failures.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};

use gantry_core::MachineEvent;
use gantry_ingest::{BatchIngestResponse, IngestionService, RejectionReason};
use gantry_store::{
    DefectLineStats, EventStore, MemoryEventStore, Result as StoreResult, StoreError,
};
use gantry_test_utils::{EventBuilder, unique_event_id};

fn service(store: &Arc<MemoryEventStore>) -> IngestionService {
    IngestionService::new(store.clone() as Arc<dyn EventStore>)
}

fn counters(response: &BatchIngestResponse) -> (u64, u64, u64, u64) {
    (
        response.accepted,
        response.deduped,
        response.updated,
        response.rejected,
    )
}

// Identical duplicate: second delivery of the same event dedupes.
#[tokio::test]
async fn identical_duplicate_dedupes() {
    let store = Arc::new(MemoryEventStore::new());
    let service = service(&store);

    let received = Utc::now();
    let first = EventBuilder::new("DUP-001")
        .received_at(received)
        .defects(5)
        .submission();
    let second = first.clone();

    let response = service.process_batch(vec![first]).await;
    assert_eq!(counters(&response), (1, 0, 0, 0));

    let response = service.process_batch(vec![second]).await;
    assert_eq!(counters(&response), (0, 1, 0, 0));

    assert_eq!(store.row_count().unwrap(), 1);
}

// Newer receive time with a different payload replaces the stored state.
#[tokio::test]
async fn newer_update_wins() {
    let store = Arc::new(MemoryEventStore::new());
    let service = service(&store);

    let old = EventBuilder::new("U-001")
        .received_offset_secs(-10)
        .defects(1)
        .submission();
    service.process_batch(vec![old]).await;

    let newer = EventBuilder::new("U-001")
        .received_offset_secs(0)
        .duration_ms(200)
        .defects(5)
        .submission();
    let response = service.process_batch(vec![newer]).await;
    assert_eq!(counters(&response), (0, 0, 1, 0));

    let stored = store.find_by_id("U-001").await.unwrap().unwrap();
    assert_eq!(stored.defect_count, 5);
    assert_eq!(stored.duration_ms, 200);
}

// Older receive time is ignored even when the payload differs.
#[tokio::test]
async fn older_update_ignored() {
    let store = Arc::new(MemoryEventStore::new());
    let service = service(&store);

    let newer = EventBuilder::new("IGN-001")
        .received_offset_secs(0)
        .defects(5)
        .submission();
    service.process_batch(vec![newer]).await;

    let older = EventBuilder::new("IGN-001")
        .received_offset_secs(-20)
        .duration_ms(200)
        .defects(99)
        .submission();
    let response = service.process_batch(vec![older]).await;
    assert_eq!(counters(&response), (0, 1, 0, 0));

    let stored = store.find_by_id("IGN-001").await.unwrap().unwrap();
    assert_eq!(stored.defect_count, 5);
}

#[tokio::test]
async fn invalid_duration_rejected() {
    let store = Arc::new(MemoryEventStore::new());
    let service = service(&store);

    let bad = EventBuilder::new("BAD-DUR").duration_ms(-1).submission();
    let response = service.process_batch(vec![bad]).await;

    assert_eq!(counters(&response), (0, 0, 0, 1));
    assert_eq!(response.rejections[0].reason, RejectionReason::InvalidDuration);
    assert_eq!(store.row_count().unwrap(), 0);
}

#[tokio::test]
async fn future_event_rejected() {
    let store = Arc::new(MemoryEventStore::new());
    let service = service(&store);

    let future = EventBuilder::new("FUTURE")
        .event_time(Utc::now() + Duration::hours(1))
        .submission();
    let response = service.process_batch(vec![future]).await;

    assert_eq!(counters(&response), (0, 0, 0, 1));
    assert_eq!(response.rejections[0].reason, RejectionReason::EventInFuture);
}

#[tokio::test]
async fn blank_event_id_rejected() {
    let store = Arc::new(MemoryEventStore::new());
    let service = service(&store);

    let anonymous = EventBuilder::new("  ").submission();
    let response = service.process_batch(vec![anonymous]).await;

    assert_eq!(counters(&response), (0, 0, 0, 1));
    assert_eq!(
        response.rejections[0].reason,
        RejectionReason::MissingEventId
    );
}

// Three candidates for one id inside a batch: the newest receive time is
// stored, the other two count as in-batch dedups.
#[tokio::test]
async fn in_batch_coalescing() {
    let store = Arc::new(MemoryEventStore::new());
    let service = service(&store);

    let batch = vec![
        EventBuilder::new("COAL-001")
            .received_offset_secs(-10)
            .defects(1)
            .submission(),
        EventBuilder::new("COAL-001")
            .received_offset_secs(0)
            .defects(2)
            .submission(),
        EventBuilder::new("COAL-001")
            .received_offset_secs(-5)
            .defects(3)
            .submission(),
    ];

    let response = service.process_batch(batch).await;
    assert_eq!(counters(&response), (1, 2, 0, 0));

    let stored = store.find_by_id("COAL-001").await.unwrap().unwrap();
    assert_eq!(stored.defect_count, 2);
}

// Replaying a whole batch yields no new writes, only dedups.
#[tokio::test]
async fn replay_is_idempotent() {
    let store = Arc::new(MemoryEventStore::new());
    let service = service(&store);

    let received = Utc::now();
    let batch: Vec<_> = (0..5)
        .map(|i| {
            EventBuilder::new(format!("REPLAY-{i}"))
                .received_at(received)
                .defects(i)
                .submission()
        })
        .collect();

    let first = service.process_batch(batch.clone()).await;
    assert_eq!(counters(&first), (5, 0, 0, 0));

    let second = service.process_batch(batch).await;
    assert_eq!(counters(&second), (0, 5, 0, 0));
}

// An unknown defect count is a valid observation, not a rejection.
#[tokio::test]
async fn unknown_defect_count_accepted() {
    let store = Arc::new(MemoryEventStore::new());
    let service = service(&store);

    let unknown = EventBuilder::new("UNKNOWN-DEFECT").defects(-1).submission();
    let response = service.process_batch(vec![unknown]).await;

    assert_eq!(counters(&response), (1, 0, 0, 0));
    assert_eq!(store.sum_known_defects().await.unwrap(), 0);
}

// Mixed batch: every event lands in exactly one counter.
#[tokio::test]
async fn counter_law_over_mixed_batch() {
    let store = Arc::new(MemoryEventStore::new());
    let service = service(&store);

    service
        .process_batch(vec![
            EventBuilder::new("MIX-EXISTING")
                .received_offset_secs(-60)
                .defects(1)
                .submission(),
        ])
        .await;

    let batch = vec![
        EventBuilder::new("MIX-NEW").submission(),
        EventBuilder::new("MIX-EXISTING")
            .received_offset_secs(0)
            .defects(7)
            .submission(),
        EventBuilder::new("MIX-DUP").received_offset_secs(-1).submission(),
        EventBuilder::new("MIX-DUP").received_offset_secs(0).submission(),
        EventBuilder::new("").submission(),
        EventBuilder::new("MIX-BAD").duration_ms(-5).submission(),
    ];
    let size = batch.len() as u64;

    let response = service.process_batch(batch).await;
    assert_eq!(response.total_counted(), size);
    assert_eq!(response.accepted, 2);
    assert_eq!(response.updated, 1);
    assert_eq!(response.deduped, 1);
    assert_eq!(response.rejected, 2);
}

// A full batch of unique valid events is accepted in one bulk write.
#[tokio::test]
async fn thousand_event_batch_accepted() {
    let store = Arc::new(MemoryEventStore::new());
    let service = service(&store);

    let now = Utc::now();
    let batch: Vec<_> = (0..1000)
        .map(|_| {
            EventBuilder::new(unique_event_id())
                .machine("M-BENCH")
                .event_time(now)
                .received_at(now)
                .submission()
        })
        .collect();

    let started = Instant::now();
    let response = service.process_batch(batch).await;
    let elapsed = started.elapsed();

    assert_eq!(counters(&response), (1000, 0, 0, 0));
    assert_eq!(store.row_count().unwrap(), 1000);
    assert!(
        elapsed.as_millis() < 1000,
        "1000-event batch took {elapsed:?}, expected < 1s"
    );
}

// ============================================================================
// Injected store failures
// ============================================================================

/// Store wrapper that fails every bulk write, forcing the per-row stage.
struct BulkConflictStore {
    inner: MemoryEventStore,
}

#[async_trait]
impl EventStore for BulkConflictStore {
    async fn find_by_id(&self, event_id: &str) -> StoreResult<Option<MachineEvent>> {
        self.inner.find_by_id(event_id).await
    }

    async fn find_all_by_ids(
        &self,
        ids: &[String],
    ) -> StoreResult<HashMap<String, MachineEvent>> {
        self.inner.find_all_by_ids(ids).await
    }

    async fn save_all(&self, _events: &[MachineEvent]) -> StoreResult<()> {
        Err(StoreError::VersionConflict {
            event_id: "injected".to_string(),
        })
    }

    async fn save_one(&self, event: &MachineEvent) -> StoreResult<()> {
        self.inner.save_one(event).await
    }

    async fn find_by_machine_and_range(
        &self,
        machine_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> StoreResult<Vec<MachineEvent>> {
        self.inner.find_by_machine_and_range(machine_id, start, end).await
    }

    async fn top_defect_lines(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        factory_id: Option<&str>,
    ) -> StoreResult<Vec<DefectLineStats>> {
        self.inner.top_defect_lines(start, end, factory_id).await
    }

    async fn sum_known_defects(&self) -> StoreResult<i64> {
        self.inner.sum_known_defects().await
    }
}

/// Store whose every call fails, as if the backend were unreachable.
struct UnreachableStore;

#[async_trait]
impl EventStore for UnreachableStore {
    async fn find_by_id(&self, _event_id: &str) -> StoreResult<Option<MachineEvent>> {
        Err(StoreError::storage("store unreachable"))
    }

    async fn find_all_by_ids(
        &self,
        _ids: &[String],
    ) -> StoreResult<HashMap<String, MachineEvent>> {
        Err(StoreError::storage("store unreachable"))
    }

    async fn save_all(&self, _events: &[MachineEvent]) -> StoreResult<()> {
        Err(StoreError::storage("store unreachable"))
    }

    async fn save_one(&self, _event: &MachineEvent) -> StoreResult<()> {
        Err(StoreError::storage("store unreachable"))
    }

    async fn find_by_machine_and_range(
        &self,
        _machine_id: &str,
        _start: DateTime<Utc>,
        _end: DateTime<Utc>,
    ) -> StoreResult<Vec<MachineEvent>> {
        Err(StoreError::storage("store unreachable"))
    }

    async fn top_defect_lines(
        &self,
        _start: DateTime<Utc>,
        _end: DateTime<Utc>,
        _factory_id: Option<&str>,
    ) -> StoreResult<Vec<DefectLineStats>> {
        Err(StoreError::storage("store unreachable"))
    }

    async fn sum_known_defects(&self) -> StoreResult<i64> {
        Err(StoreError::storage("store unreachable"))
    }
}

// Bulk conflict: the per-row stage re-derives the counters and the
// in-batch dedup count survives the transition exactly once.
#[tokio::test]
async fn bulk_conflict_falls_back_per_row() {
    let store = Arc::new(BulkConflictStore {
        inner: MemoryEventStore::new(),
    });
    let service = IngestionService::new(store.clone() as Arc<dyn EventStore>);

    let batch = vec![
        EventBuilder::new("FB-1").submission(),
        EventBuilder::new("FB-2").received_offset_secs(-1).submission(),
        EventBuilder::new("FB-2").received_offset_secs(0).submission(),
    ];

    let response = service.process_batch(batch).await;

    assert_eq!(response.accepted, 2);
    assert_eq!(response.deduped, 1);
    assert_eq!(response.rejected, 0);
    assert_eq!(response.total_counted(), 3);
    assert!(store.find_by_id("FB-1").await.unwrap().is_some());
    assert!(store.find_by_id("FB-2").await.unwrap().is_some());
}

// Infrastructure failure: every row is reported, none aborts the batch.
#[tokio::test]
async fn unreachable_store_reports_internal_errors() {
    let service = IngestionService::new(Arc::new(UnreachableStore) as Arc<dyn EventStore>);

    let batch = vec![
        EventBuilder::new("DOWN-1").submission(),
        EventBuilder::new("DOWN-2").submission(),
    ];

    let response = service.process_batch(batch).await;

    assert_eq!(response.rejected, 2);
    assert_eq!(response.total_counted(), 2);
    assert!(
        response
            .rejections
            .iter()
            .all(|r| r.reason == RejectionReason::InternalError)
    );
}
