//! In-batch deduplication.
//!
//! A batch may carry the same `event_id` several times (client retries,
//! buffered redeliveries). Coalescing keeps at most one winner per key so
//! the upsert engine never writes the same row twice within a batch.

use std::collections::HashMap;
use std::collections::hash_map::Entry;

use gantry_core::MachineEvent;

/// The result of coalescing one batch.
#[derive(Debug)]
pub struct CoalesceOutcome {
    /// At most one event per `event_id`; no ordering guarantee.
    pub winners: Vec<MachineEvent>,
    /// How many candidates lost to an in-batch sibling.
    pub deduped: u64,
}

/// Reduces a batch to one winner per `event_id`.
///
/// The winner is the candidate with the maximal `received_time`; on a tie
/// the one seen later in input order is kept. Runs entirely in memory and
/// has no failure mode.
#[must_use]
pub fn coalesce(events: Vec<MachineEvent>) -> CoalesceOutcome {
    let mut winners: HashMap<String, MachineEvent> = HashMap::with_capacity(events.len());
    let mut deduped = 0;

    for event in events {
        match winners.entry(event.event_id.clone()) {
            Entry::Vacant(slot) => {
                slot.insert(event);
            }
            Entry::Occupied(mut slot) => {
                deduped += 1;
                if event.received_time >= slot.get().received_time {
                    slot.insert(event);
                }
            }
        }
    }

    CoalesceOutcome {
        winners: winners.into_values().collect(),
        deduped,
    }
}
