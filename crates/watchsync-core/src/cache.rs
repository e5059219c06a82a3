use std::time::{Duration, Instant};

/// TTL for remote watchlist/recommendation snapshots served to downstream
/// consumers. The diff engine never reads these.
pub const DEFAULT_SNAPSHOT_TTL: Duration = Duration::from_secs(5 * 60);

/// A single cached value with an explicit fetch timestamp and TTL.
///
/// Replaces ad-hoc module-level snapshots: staleness and invalidation are
/// visible in the type instead of hidden in static state.
#[derive(Debug)]
pub struct TtlCache<T> {
    slot: Option<Slot<T>>,
    ttl: Duration,
}

#[derive(Debug)]
struct Slot<T> {
    value: T,
    fetched_at: Instant,
}

impl<T> TtlCache<T> {
    pub fn new(ttl: Duration) -> Self {
        Self { slot: None, ttl }
    }

    pub fn with_default_ttl() -> Self {
        Self::new(DEFAULT_SNAPSHOT_TTL)
    }

    /// The cached value, if one is present and still fresh.
    pub fn get(&self) -> Option<&T> {
        match &self.slot {
            Some(slot) if slot.fetched_at.elapsed() < self.ttl => Some(&slot.value),
            _ => None,
        }
    }

    pub fn set(&mut self, value: T) {
        self.slot = Some(Slot {
            value,
            fetched_at: Instant::now(),
        });
    }

    pub fn invalidate(&mut self) {
        self.slot = None;
    }

    pub fn is_fresh(&self) -> bool {
        self.get().is_some()
    }
}

impl<T> Default for TtlCache<T> {
    fn default() -> Self {
        Self::with_default_ttl()
    }
}
