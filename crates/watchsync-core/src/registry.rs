// Retry/skip bookkeeping for items the remote service could not resolve

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use watchsync_models::{AlreadyExistsRecord, LocalItem, SkipRecord};

/// Registry-wide cooldown before previously-skipped items are retried.
/// Service-side data-quality gaps are usually fixed within days.
pub const SKIP_COOLDOWN_DAYS: i64 = 7;

/// Items that failed remote matching (not found / invalid), suppressed
/// from diffing until the cooldown elapses.
///
/// The cooldown is measured from the last time skips were recorded, for
/// the registry as a whole: on expiry every entry is cleared at once and
/// repopulated fresh. This is a deliberate batch-retry policy, not a
/// per-item TTL.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SkipRegistry {
    records: Vec<SkipRecord>,
    last_skip_sync: DateTime<Utc>,
}

impl Default for SkipRegistry {
    fn default() -> Self {
        Self {
            records: Vec::new(),
            last_skip_sync: Utc::now(),
        }
    }
}

impl SkipRegistry {
    pub fn should_skip(&self, item: &LocalItem) -> bool {
        self.records.iter().any(|record| record.matches(item))
    }

    pub fn record_skipped(&mut self, items: &[LocalItem]) {
        let mut added = 0;
        for item in items {
            if self.should_skip(item) {
                continue;
            }
            self.records.push(SkipRecord::for_item(item));
            added += 1;
        }
        if added > 0 {
            self.last_skip_sync = Utc::now();
            debug!(
                "Skip registry: recorded {} new entries ({} total)",
                added,
                self.records.len()
            );
        }
    }

    /// Clear the whole registry once the cooldown has elapsed, re-admitting
    /// every previously-skipped item for one retry cycle. Runs once per
    /// pass, before filtering. Returns true when entries were cleared.
    pub fn maybe_expire(&mut self, now: DateTime<Utc>) -> bool {
        if now - self.last_skip_sync <= Duration::days(SKIP_COOLDOWN_DAYS) {
            return false;
        }
        let cleared = self.records.len();
        self.records.clear();
        self.last_skip_sync = now;
        if cleared > 0 {
            info!(
                "Skip registry cooldown elapsed, cleared {} entries for retry",
                cleared
            );
        }
        cleared > 0
    }

    pub fn records(&self) -> &[SkipRecord] {
        &self.records
    }

    pub fn last_skip_sync(&self) -> DateTime<Utc> {
        self.last_skip_sync
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn clear(&mut self) {
        self.records.clear();
        self.last_skip_sync = Utc::now();
    }

    #[cfg(test)]
    pub(crate) fn with_state(records: Vec<SkipRecord>, last_skip_sync: DateTime<Utc>) -> Self {
        Self {
            records,
            last_skip_sync,
        }
    }
}

/// Items known to exist remotely under a different identity (e.g. an
/// alternate title), recorded so they are not resent every pass.
///
/// Records persist indefinitely; a record is pruned only when nothing in
/// the current local candidate set matches it anymore, and only while a
/// single local-library source feeds the engine. With multiple sources a
/// record may legitimately be absent from one source's candidate set
/// while still valid for another, so pruning is disabled.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AlreadyExistsRegistry {
    records: Vec<AlreadyExistsRecord>,
}

impl AlreadyExistsRegistry {
    pub fn is_known_existing(&self, item: &LocalItem) -> bool {
        self.records.iter().any(|record| record.matches(item))
    }

    pub fn record_existing(&mut self, items: &[LocalItem]) {
        let mut added = 0;
        for item in items {
            if self.is_known_existing(item) {
                continue;
            }
            self.records.push(AlreadyExistsRecord::for_item(item));
            added += 1;
        }
        if added > 0 {
            debug!(
                "Already-exists registry: recorded {} new entries ({} total)",
                added,
                self.records.len()
            );
        }
    }

    /// Drop records no longer backed by any item in the current local
    /// candidate set. Returns the number of records removed.
    pub fn prune_stale(&mut self, current: &[LocalItem], source_count: usize) -> usize {
        if source_count != 1 {
            debug!(
                source_count = source_count,
                "Already-exists pruning disabled: more than one local source"
            );
            return 0;
        }
        let before = self.records.len();
        self.records
            .retain(|record| current.iter().any(|item| record.matches(item)));
        let pruned = before - self.records.len();
        if pruned > 0 {
            debug!(
                "Already-exists registry: pruned {} stale entries ({} remain)",
                pruned,
                self.records.len()
            );
        }
        pruned
    }

    pub fn records(&self) -> &[AlreadyExistsRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn clear(&mut self) {
        self.records.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use watchsync_models::ExternalIds;

    fn item(title: &str, year: Option<u32>, imdb: Option<&str>) -> LocalItem {
        LocalItem {
            library_id: 1,
            title: title.to_string(),
            year,
            episode: None,
            ids: ExternalIds {
                imdb_id: imdb.map(|s| s.to_string()),
                tmdb_id: None,
            },
            play_count: 0,
            in_collection: true,
            user_rating: None,
            files: Vec::new(),
            source: "videodb".to_string(),
        }
    }

    #[test]
    fn test_skip_cooldown_window() {
        let skipped = item("Broken", Some(2015), Some("tt0000015"));
        let created_at = Utc::now();
        let mut registry = SkipRegistry::with_state(
            vec![SkipRecord::for_item(&skipped)],
            created_at,
        );

        // One day in: still suppressed
        registry.maybe_expire(created_at + Duration::days(1));
        assert!(registry.should_skip(&skipped));

        // Eight days in: cleared in bulk, item re-admitted
        assert!(registry.maybe_expire(created_at + Duration::days(8)));
        assert!(!registry.should_skip(&skipped));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_recording_resets_cooldown_clock() {
        let old = Utc::now() - Duration::days(6);
        let mut registry = SkipRegistry::with_state(Vec::new(), old);
        registry.record_skipped(&[item("Broken", Some(2015), None)]);
        // Fresh records push the clock forward, so two more days do not expire
        assert!(!registry.maybe_expire(Utc::now() + Duration::days(2)));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_record_skipped_dedups() {
        let mut registry = SkipRegistry::default();
        let a = item("Broken", Some(2015), Some("tt0000015"));
        registry.record_skipped(&[a.clone()]);
        registry.record_skipped(&[a]);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_prune_stale_single_source() {
        let kept = item("Kept", Some(2001), Some("tt0000001"));
        let gone = item("Gone", Some(2002), Some("tt0000002"));
        let mut registry = AlreadyExistsRegistry::default();
        registry.record_existing(&[kept.clone(), gone]);

        let pruned = registry.prune_stale(&[kept.clone()], 1);
        assert_eq!(pruned, 1);
        assert!(registry.is_known_existing(&kept));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_prune_disabled_with_multiple_sources() {
        let gone = item("Gone", Some(2002), Some("tt0000002"));
        let mut registry = AlreadyExistsRegistry::default();
        registry.record_existing(&[gone]);

        // Candidate set is empty, but two sources are registered
        assert_eq!(registry.prune_stale(&[], 2), 0);
        assert_eq!(registry.len(), 1);
    }
}
