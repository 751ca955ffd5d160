//! In-memory store implementation.
//!
//! This module provides [`MemoryEventStore`], a thread-safe in-memory
//! implementation of the [`EventStore`] trait suitable for testing and
//! development.
//!
//! ## Limitations
//!
//! - **Not durable**: all state is lost when the process exits
//! - **Single-process only**: state is not shared across process boundaries
//!
//! The version-check semantics are identical to a production adapter, so
//! concurrency behavior observed against this store carries over.

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use gantry_core::MachineEvent;

use crate::error::{Result, StoreError};
use crate::{DefectLineStats, EventStore};

/// In-memory event store.
///
/// Uses a single `RwLock` over the row map; `save_all` validates every row
/// under the write lock before applying any of them, which gives the
/// all-or-nothing semantics the contract requires.
#[derive(Debug, Default)]
pub struct MemoryEventStore {
    rows: RwLock<HashMap<String, MachineEvent>>,
}

/// Converts a lock poison error to a storage error.
fn poison_err<T>(_: PoisonError<T>) -> StoreError {
    StoreError::storage("lock poisoned")
}

impl MemoryEventStore {
    /// Creates a new, empty in-memory store.
    #[must_use]
    pub fn new() -> Self {
        Self {
            rows: RwLock::new(HashMap::new()),
        }
    }

    /// Returns the number of rows currently stored.
    ///
    /// # Errors
    ///
    /// Returns an error if the lock is poisoned.
    pub fn row_count(&self) -> Result<usize> {
        let count = {
            let rows = self.rows.read().map_err(poison_err)?;
            rows.len()
        };
        Ok(count)
    }

    /// Computes the version the store would assign if the write were
    /// accepted, or the conflict that rejects it.
    fn next_version(current: Option<&MachineEvent>, incoming: &MachineEvent) -> Result<u64> {
        match (incoming.version, current) {
            // Fresh insert into an empty slot.
            (None, None) => Ok(0),
            // Insert raced against an existing row.
            (None, Some(_)) => Err(StoreError::DuplicateKey {
                event_id: incoming.event_id.clone(),
            }),
            // Update whose version still matches the stored row.
            (Some(v), Some(row)) if row.version == Some(v) => Ok(v + 1),
            // Stale update, or an update to a row that no longer exists.
            (Some(_), _) => Err(StoreError::VersionConflict {
                event_id: incoming.event_id.clone(),
            }),
        }
    }
}

#[async_trait]
impl EventStore for MemoryEventStore {
    async fn find_by_id(&self, event_id: &str) -> Result<Option<MachineEvent>> {
        let result = {
            let rows = self.rows.read().map_err(poison_err)?;
            rows.get(event_id).cloned()
        };
        Ok(result)
    }

    async fn find_all_by_ids(&self, ids: &[String]) -> Result<HashMap<String, MachineEvent>> {
        let result = {
            let rows = self.rows.read().map_err(poison_err)?;
            ids.iter()
                .filter_map(|id| rows.get(id).map(|e| (id.clone(), e.clone())))
                .collect()
        };
        Ok(result)
    }

    async fn save_all(&self, events: &[MachineEvent]) -> Result<()> {
        let mut rows = self.rows.write().map_err(poison_err)?;

        // Validate every row before touching any of them.
        let mut staged = Vec::with_capacity(events.len());
        for event in events {
            let next = Self::next_version(rows.get(&event.event_id), event)?;
            staged.push((event.clone(), next));
        }

        for (mut event, next) in staged {
            event.version = Some(next);
            rows.insert(event.event_id.clone(), event);
        }
        Ok(())
    }

    async fn save_one(&self, event: &MachineEvent) -> Result<()> {
        let mut rows = self.rows.write().map_err(poison_err)?;

        let next = Self::next_version(rows.get(&event.event_id), event)?;
        let mut event = event.clone();
        event.version = Some(next);
        rows.insert(event.event_id.clone(), event);
        Ok(())
    }

    async fn find_by_machine_and_range(
        &self,
        machine_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<MachineEvent>> {
        let result = {
            let rows = self.rows.read().map_err(poison_err)?;
            rows.values()
                .filter(|e| {
                    e.machine_id == machine_id && e.event_time >= start && e.event_time < end
                })
                .cloned()
                .collect()
        };
        Ok(result)
    }

    async fn top_defect_lines(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        factory_id: Option<&str>,
    ) -> Result<Vec<DefectLineStats>> {
        let mut totals: HashMap<String, (i64, u64)> = HashMap::new();
        {
            let rows = self.rows.read().map_err(poison_err)?;
            for event in rows.values() {
                if event.event_time < start || event.event_time >= end {
                    continue;
                }
                let line_id = match factory_id {
                    Some(factory) => {
                        if event.factory_id != factory {
                            continue;
                        }
                        &event.factory_id
                    }
                    None => &event.machine_id,
                };
                let entry = totals.entry(line_id.clone()).or_insert((0, 0));
                if event.has_known_defects() {
                    entry.0 += i64::from(event.defect_count);
                }
                entry.1 += 1;
            }
        }

        let mut result: Vec<DefectLineStats> = totals
            .into_iter()
            .map(|(line_id, (total_defects, event_count))| DefectLineStats {
                line_id,
                total_defects,
                event_count,
            })
            .collect();
        result.sort_by(|a, b| {
            b.total_defects
                .cmp(&a.total_defects)
                .then_with(|| a.line_id.cmp(&b.line_id))
        });
        Ok(result)
    }

    async fn sum_known_defects(&self) -> Result<i64> {
        let sum = {
            let rows = self.rows.read().map_err(poison_err)?;
            rows.values()
                .filter(|e| e.has_known_defects())
                .map(|e| i64::from(e.defect_count))
                .sum()
        };
        Ok(sum)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    const UNKNOWN: i32 = gantry_core::UNKNOWN_DEFECT_COUNT;

    fn event(id: &str, machine: &str, factory: &str, defects: i32) -> MachineEvent {
        let now = Utc::now();
        MachineEvent {
            event_id: id.to_string(),
            machine_id: machine.to_string(),
            factory_id: factory.to_string(),
            event_time: now,
            received_time: now,
            duration_ms: 100,
            defect_count: defects,
            version: None,
        }
    }

    #[tokio::test]
    async fn save_and_find_roundtrip() -> Result<()> {
        let store = MemoryEventStore::new();
        assert!(store.find_by_id("E1").await?.is_none());

        store.save_one(&event("E1", "M1", "F1", 2)).await?;

        let stored = store.find_by_id("E1").await?.expect("row should exist");
        assert_eq!(stored.event_id, "E1");
        assert_eq!(stored.version, Some(0));
        Ok(())
    }

    #[tokio::test]
    async fn update_bumps_version() -> Result<()> {
        let store = MemoryEventStore::new();
        store.save_one(&event("E1", "M1", "F1", 2)).await?;

        let mut stored = store.find_by_id("E1").await?.expect("row should exist");
        stored.defect_count = 9;
        store.save_one(&stored).await?;

        let updated = store.find_by_id("E1").await?.expect("row should exist");
        assert_eq!(updated.defect_count, 9);
        assert_eq!(updated.version, Some(1));
        Ok(())
    }

    #[tokio::test]
    async fn insert_collision_is_duplicate_key() -> Result<()> {
        let store = MemoryEventStore::new();
        store.save_one(&event("E1", "M1", "F1", 2)).await?;

        let err = store
            .save_one(&event("E1", "M2", "F1", 3))
            .await
            .expect_err("second insert should collide");
        assert!(matches!(err, StoreError::DuplicateKey { .. }));
        assert!(err.is_concurrency_conflict());
        Ok(())
    }

    #[tokio::test]
    async fn stale_version_is_conflict() -> Result<()> {
        let store = MemoryEventStore::new();
        store.save_one(&event("E1", "M1", "F1", 2)).await?;

        // Two readers pick up version 0; the first write wins.
        let first = store.find_by_id("E1").await?.expect("row should exist");
        let second = first.clone();
        store.save_one(&first).await?;

        let err = store
            .save_one(&second)
            .await
            .expect_err("stale write should conflict");
        assert!(matches!(err, StoreError::VersionConflict { .. }));

        // The row still carries the first writer's state.
        let stored = store.find_by_id("E1").await?.expect("row should exist");
        assert_eq!(stored.version, Some(1));
        Ok(())
    }

    #[tokio::test]
    async fn save_all_is_atomic_on_conflict() -> Result<()> {
        let store = MemoryEventStore::new();
        store.save_one(&event("E2", "M1", "F1", 0)).await?;

        // E1 would be a clean insert, but E2 collides, so nothing lands.
        let err = store
            .save_all(&[event("E1", "M1", "F1", 1), event("E2", "M1", "F1", 1)])
            .await
            .expect_err("bulk write should fail");
        assert!(err.is_concurrency_conflict());

        assert!(store.find_by_id("E1").await?.is_none());
        let untouched = store.find_by_id("E2").await?.expect("row should exist");
        assert_eq!(untouched.defect_count, 0);
        assert_eq!(untouched.version, Some(0));
        Ok(())
    }

    #[tokio::test]
    async fn bulk_lookup_skips_missing_ids() -> Result<()> {
        let store = MemoryEventStore::new();
        store.save_one(&event("E1", "M1", "F1", 0)).await?;

        let found = store
            .find_all_by_ids(&["E1".to_string(), "E2".to_string()])
            .await?;
        assert_eq!(found.len(), 1);
        assert!(found.contains_key("E1"));
        Ok(())
    }

    #[tokio::test]
    async fn machine_range_is_half_open() -> Result<()> {
        let store = MemoryEventStore::new();
        let start = Utc::now();
        let end = start + Duration::hours(1);

        let mut at_start = event("E1", "M1", "F1", 1);
        at_start.event_time = start;
        let mut at_end = event("E2", "M1", "F1", 1);
        at_end.event_time = end;
        let mut other_machine = event("E3", "M2", "F1", 1);
        other_machine.event_time = start;

        store.save_all(&[at_start, at_end, other_machine]).await?;

        let events = store.find_by_machine_and_range("M1", start, end).await?;
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event_id, "E1");
        Ok(())
    }

    #[tokio::test]
    async fn top_lines_order_and_unknown_defects() -> Result<()> {
        let store = MemoryEventStore::new();
        let start = Utc::now() - Duration::minutes(5);
        let end = Utc::now() + Duration::minutes(5);

        store
            .save_all(&[
                event("E1", "M1", "F1", 3),
                event("E2", "M1", "F1", UNKNOWN),
                event("E3", "M2", "F1", 7),
                event("E4", "M3", "F2", 7),
            ])
            .await?;

        let lines = store.top_defect_lines(start, end, None).await?;
        assert_eq!(lines.len(), 3);
        // M2 and M3 tie on 7; line id breaks the tie.
        assert_eq!(lines[0].line_id, "M2");
        assert_eq!(lines[1].line_id, "M3");
        assert_eq!(lines[2].line_id, "M1");
        assert_eq!(lines[2].total_defects, 3);
        assert_eq!(lines[2].event_count, 2);
        Ok(())
    }

    #[tokio::test]
    async fn top_lines_filter_by_factory() -> Result<()> {
        let store = MemoryEventStore::new();
        let start = Utc::now() - Duration::minutes(5);
        let end = Utc::now() + Duration::minutes(5);

        store
            .save_all(&[
                event("E1", "M1", "F1", 3),
                event("E2", "M2", "F1", 4),
                event("E3", "M3", "F2", 9),
            ])
            .await?;

        let lines = store.top_defect_lines(start, end, Some("F1")).await?;
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].line_id, "F1");
        assert_eq!(lines[0].total_defects, 7);
        assert_eq!(lines[0].event_count, 2);
        Ok(())
    }

    #[tokio::test]
    async fn known_defect_sum_ignores_unknown() -> Result<()> {
        let store = MemoryEventStore::new();
        store
            .save_all(&[
                event("E1", "M1", "F1", 3),
                event("E2", "M1", "F1", UNKNOWN),
                event("E3", "M2", "F1", 4),
            ])
            .await?;

        assert_eq!(store.sum_known_defects().await?, 7);
        assert_eq!(store.row_count()?, 3);
        Ok(())
    }
}
