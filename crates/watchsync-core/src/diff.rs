// Diff computation between local and remote collection/watched state

use std::collections::HashSet;
use tracing::{debug, warn};
use watchsync_models::{ExternalIds, LocalItem, RemoteItem};

use crate::matcher;
use crate::registry::{AlreadyExistsRegistry, SkipRegistry};


/// Inputs shared by both diffs for one pass.
pub struct DiffContext<'a> {
    pub skip: &'a SkipRegistry,
    pub already_exists: &'a AlreadyExistsRegistry,
    pub cleanup_enabled: bool,
    /// Number of registered local-library sources. Clean-up removals and
    /// registry pruning require exactly one.
    pub source_count: usize,
    /// Ids of the item currently being played, excluded from background
    /// mark-seen to avoid racing the live progress reporter.
    pub now_playing: Option<&'a ExternalIds>,
}

/// Local watched-state fix requested from the library.
#[derive(Debug, Clone, PartialEq)]
pub struct WatchedCorrection {
    pub item: LocalItem,
    pub watched: bool,
}

/// Remote-discovered primary id the local library should adopt.
#[derive(Debug, Clone, PartialEq)]
pub struct IdBackfill {
    pub item: LocalItem,
    pub imdb_id: String,
}

#[derive(Debug, Default)]
pub struct CollectionDiff {
    /// Local items with no remote counterpart, to push as collection adds.
    pub to_add: Vec<LocalItem>,
    /// Remote collection entries with no local counterpart, to remove
    /// (clean-up). Empty unless the safety conditions hold.
    pub to_remove: Vec<RemoteItem>,
    pub backfills: Vec<IdBackfill>,
    pub corrections: Vec<WatchedCorrection>,
    /// True when unmatched remotes were left in place because clean-up
    /// was suppressed by the safety valve.
    pub cleanup_suppressed: bool,
}

#[derive(Debug, Default)]
pub struct WatchedDiff {
    /// Locally-watched items the remote does not know as watched.
    pub to_mark_seen: Vec<LocalItem>,
    pub corrections: Vec<WatchedCorrection>,
}

/// Compute the collection diff for one entity class.
///
/// Matching runs against the full local collection; the skip and
/// already-exists registries only shrink the push set, so a suppressed
/// item still protects its remote counterpart from clean-up.
pub fn compute_collection_diff(
    local: &[LocalItem],
    remote: &[RemoteItem],
    ctx: &DiffContext,
) -> CollectionDiff {
    let mut diff = CollectionDiff::default();
    let mut matched_remote: HashSet<usize> = HashSet::new();
    let mut skipped = 0;
    let mut known_existing = 0;

    for item in local.iter().filter(|item| item.in_collection) {
        let result = matcher::match_item(item, remote);
        match result.remote_index {
            Some(remote_index) => {
                matched_remote.insert(remote_index);
                if let Some(imdb_id) = result.backfill_imdb_id {
                    diff.backfills.push(IdBackfill {
                        item: item.clone(),
                        imdb_id,
                    });
                }
                let counterpart = &remote[remote_index];
                if counterpart.unseen_override && item.is_watched() {
                    // Explicit service-side "unseen" beats any play count
                    diff.corrections.push(WatchedCorrection {
                        item: item.clone(),
                        watched: false,
                    });
                } else if counterpart.is_watched() && !item.is_watched() {
                    diff.corrections.push(WatchedCorrection {
                        item: item.clone(),
                        watched: true,
                    });
                }
            }
            None => {
                if ctx.skip.should_skip(item) {
                    skipped += 1;
                    continue;
                }
                if ctx.already_exists.is_known_existing(item) {
                    known_existing += 1;
                    continue;
                }
                diff.to_add.push(item.clone());
            }
        }
    }

    // Clean-up: unmatched remote entries are removal candidates, but only
    // when clean-up is enabled, a single local source is registered, and
    // there is no unresolved already-exists ambiguity at all.
    let unmatched_remote: Vec<usize> = remote
        .iter()
        .enumerate()
        .filter(|(index, item)| item.in_collection && !matched_remote.contains(index))
        .map(|(index, _)| index)
        .collect();

    if !unmatched_remote.is_empty() && ctx.cleanup_enabled {
        if ctx.source_count != 1 {
            diff.cleanup_suppressed = true;
            warn!(
                source_count = ctx.source_count,
                candidates = unmatched_remote.len(),
                "Clean-up suppressed: more than one local source registered"
            );
        } else if !ctx.already_exists.is_empty() {
            diff.cleanup_suppressed = true;
            warn!(
                pending_records = ctx.already_exists.len(),
                candidates = unmatched_remote.len(),
                "Clean-up suppressed: unresolved already-exists entries present"
            );
        } else {
            for index in unmatched_remote {
                diff.to_remove.push(remote[index].clone());
            }
        }
    }

    debug!(
        "compute_collection_diff: local={}, remote={}, to_add={}, to_remove={}, \
         corrections={}, backfills={}, skipped={}, known_existing={}",
        local.len(),
        remote.len(),
        diff.to_add.len(),
        diff.to_remove.len(),
        diff.corrections.len(),
        diff.backfills.len(),
        skipped,
        known_existing
    );

    diff
}

/// Compute the watched diff for one entity class.
///
/// Symmetric to the collection diff but never produces removals: only
/// mark-seen pushes and local corrections.
pub fn compute_watched_diff(
    local: &[LocalItem],
    remote_watched: &[RemoteItem],
    ctx: &DiffContext,
) -> WatchedDiff {
    let mut diff = WatchedDiff::default();
    let mut skipped = 0;
    let mut now_playing_excluded = 0;

    for item in local {
        let result = matcher::match_item(item, remote_watched);
        match result.remote_index {
            Some(remote_index) => {
                let counterpart = &remote_watched[remote_index];
                if counterpart.unseen_override && item.is_watched() {
                    diff.corrections.push(WatchedCorrection {
                        item: item.clone(),
                        watched: false,
                    });
                } else if counterpart.is_watched() && !item.is_watched() {
                    diff.corrections.push(WatchedCorrection {
                        item: item.clone(),
                        watched: true,
                    });
                }
            }
            None => {
                if !item.is_watched() {
                    continue;
                }
                if let Some(playing) = ctx.now_playing {
                    if matcher::ids_overlap(&item.ids, playing) {
                        now_playing_excluded += 1;
                        continue;
                    }
                }
                if ctx.skip.should_skip(item) || ctx.already_exists.is_known_existing(item) {
                    skipped += 1;
                    continue;
                }
                diff.to_mark_seen.push(item.clone());
            }
        }
    }

    debug!(
        "compute_watched_diff: local={}, remote_watched={}, to_mark_seen={}, \
         corrections={}, skipped={}, now_playing_excluded={}",
        local.len(),
        remote_watched.len(),
        diff.to_mark_seen.len(),
        diff.corrections.len(),
        skipped,
        now_playing_excluded
    );

    diff
}
