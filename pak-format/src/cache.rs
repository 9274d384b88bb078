//! Decompressed block cache.
//!
//! Slots are keyed by storage offset, so names aliasing one stored range share
//! a slot. Eviction is opportunistic: every `get_or_create` first drops slots
//! that have been idle for longer than the threshold. A slot that keeps being
//! read within the threshold lives indefinitely.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use bytes::Bytes;
use dashmap::DashMap;

use crate::record::Entry;

pub const DEFAULT_IDLE_THRESHOLD: Duration = Duration::from_secs(60);

/// Source of "now" for idle tracking.
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

#[derive(Debug)]
struct Slot {
    bytes: Bytes,
    /// Nanoseconds since the cache epoch.
    last_access: AtomicU64,
    name: String,
}

impl Slot {
    fn touch(&self, now: u64) {
        self.last_access.fetch_max(now, Ordering::Relaxed);
    }

    fn idle_for(&self, now: u64) -> u64 {
        now.saturating_sub(self.last_access.load(Ordering::Relaxed))
    }
}

pub(crate) struct BlockCache {
    slots: DashMap<u64, Slot>,
    idle_threshold: Duration,
    clock: Arc<dyn Clock>,
    epoch: Instant,
}

impl std::fmt::Debug for BlockCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BlockCache")
            .field("slots", &self.slots.len())
            .field("idle_threshold", &self.idle_threshold)
            .finish_non_exhaustive()
    }
}

impl BlockCache {
    pub(crate) fn new(idle_threshold: Duration, clock: Arc<dyn Clock>) -> BlockCache {
        let epoch = clock.now();
        BlockCache {
            slots: DashMap::new(),
            idle_threshold,
            clock,
            epoch,
        }
    }

    fn now(&self) -> u64 {
        self.clock.now().saturating_duration_since(self.epoch).as_nanos() as u64
    }

    /// Returns the cached bytes for `entry`, running `load` to produce them on a
    /// miss. A failed load installs nothing.
    ///
    /// Loads run without holding any lock, so concurrent misses on the same
    /// offset may each decode. The first buffer installed wins and every one
    /// of those callers gets it back.
    pub(crate) fn get_or_create<F, E>(&self, entry: &Entry, load: F) -> Result<Bytes, E>
    where
        F: FnOnce() -> Result<Vec<u8>, E>,
    {
        let now = self.now();
        self.sweep(now);

        if let Some(slot) = self.slots.get(&entry.offset()) {
            slot.touch(now);
            tracing::trace!(name = entry.name(), slot = %slot.name, "cache hit");
            return Ok(slot.bytes.clone());
        }

        tracing::trace!(name = entry.name(), "cache miss");
        let bytes = Bytes::from(load()?);

        let slot = self.slots.entry(entry.offset()).or_insert_with(|| Slot {
            bytes,
            last_access: AtomicU64::new(now),
            name: entry.name().to_string(),
        });
        slot.touch(now);
        Ok(slot.bytes.clone())
    }

    fn sweep(&self, now: u64) {
        let threshold = self.idle_threshold.as_nanos() as u64;
        self.slots.retain(|offset, slot| {
            let keep = slot.idle_for(now) <= threshold;
            if !keep {
                tracing::trace!(
                    name = %slot.name,
                    offset = format_args!("{:#x}", offset),
                    "evicting idle cache slot"
                );
            }
            keep
        });
    }

    #[cfg(test)]
    pub(crate) fn contains(&self, offset: u64) -> bool {
        self.slots.contains_key(&offset)
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.slots.len()
    }

    pub(crate) fn clear(&self) {
        self.slots.clear();
    }
}
