//! In-process hand-off queue between request producers and the export cycle
//!
//! Batches are stored in integer-indexed slots. Both `enqueue` and
//! `dequeue_latest` locate the first free index by probing from 0, so
//! retrieval always targets the most recently filled slot and the queue
//! hands batches out last-in-first-out.
//!
//! The probe is O(n) in the number of occupied slots, which is fine for a
//! few hundred enqueues between cycles but does not scale beyond that.

use crate::error::{ExportError, Result};
use crate::types::Batch;
use hashbrown::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

/// Default sliding expiry of an untouched slot (300 days)
pub const DEFAULT_SLOT_TTL: Duration = Duration::from_secs(300 * 24 * 60 * 60);

#[derive(Debug)]
struct Slot {
    batch: Batch,
    last_access: Instant,
}

/// Lock-guarded, index-addressed batch store
#[derive(Debug)]
pub struct HandoffQueue {
    slots: Mutex<HashMap<usize, Slot>>,
    ttl: Duration,
}

impl HandoffQueue {
    /// Create an empty queue with the default slot TTL
    pub fn new() -> Self {
        Self::with_ttl(DEFAULT_SLOT_TTL)
    }

    /// Create an empty queue whose slots expire after `ttl` without access
    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            slots: Mutex::new(HashMap::new()),
            ttl,
        }
    }

    /// Store a batch at the first free index
    pub fn enqueue(&self, batch: Batch) {
        let now = Instant::now();
        let mut slots = self.lock();
        let index = self.next_free_index(&mut slots, now);
        log::debug!("Enqueued batch of {} request(s) at slot {}", batch.len(), index);
        slots.insert(
            index,
            Slot {
                batch,
                last_access: now,
            },
        );
    }

    /// Remove and return the batch just below the first free index
    pub fn dequeue_latest(&self) -> Result<Batch> {
        let now = Instant::now();
        let mut slots = self.lock();
        let free = self.next_free_index(&mut slots, now);
        if free == 0 {
            return Err(ExportError::EmptyQueue);
        }
        let slot = slots.remove(&(free - 1)).ok_or(ExportError::EmptyQueue)?;
        log::debug!(
            "Dequeued batch of {} request(s) from slot {}",
            slot.batch.len(),
            free - 1
        );
        Ok(slot.batch)
    }

    /// Number of live slots, including any stranded above a gap
    pub fn len(&self) -> usize {
        let now = Instant::now();
        let mut slots = self.lock();
        self.purge_expired(&mut slots, now);
        slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<usize, Slot>> {
        self.slots.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn purge_expired(&self, slots: &mut HashMap<usize, Slot>, now: Instant) {
        let ttl = self.ttl;
        slots.retain(|_, slot| now.saturating_duration_since(slot.last_access) < ttl);
    }

    /// Probe 0, 1, 2, ... until an empty slot is found. Every slot the probe
    /// reads has its sliding expiry refreshed.
    fn next_free_index(&self, slots: &mut HashMap<usize, Slot>, now: Instant) -> usize {
        self.purge_expired(slots, now);
        let mut index = 0;
        while let Some(slot) = slots.get_mut(&index) {
            slot.last_access = now;
            index += 1;
        }
        index
    }
}

impl Default for HandoffQueue {
    fn default() -> Self {
        Self::new()
    }
}
