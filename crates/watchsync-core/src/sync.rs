use std::collections::HashMap;
use std::slice;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use thiserror::Error;
use tokio::sync::Mutex;
use tokio::time::timeout;
use tracing::{debug, info, instrument, warn};

use watchsync_config::SyncOptions;
use watchsync_models::{
    EntityClass, ExternalIds, ItemOutcome, LocalItem, OperationItem, OperationKind, RemoteItem,
    SyncOperation,
};
use watchsync_providers::{ChangedFields, LibraryError, LocalLibrary, RemoteError, RemoteService};

use crate::cache::TtlCache;
use crate::diff::{self, DiffContext, WatchedCorrection};
use crate::registry::{AlreadyExistsRegistry, SkipRegistry};
use crate::store::RegistryStore;


/// How long an incremental event handler waits for the registries before
/// proceeding against possibly stale state.
pub const REGISTRY_READ_WAIT: Duration = Duration::from_secs(10);

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("a full sync pass is already in progress")]
    AlreadyRunning,
    #[error("sync pass cancelled")]
    Cancelled,
    #[error("no local-library source registered")]
    NoSources,
    #[error("remote fetch failed: {0}")]
    Fetch(#[from] RemoteError),
    #[error("local listing failed: {0}")]
    Listing(#[from] LibraryError),
}

/// Counts for one full pass. The only thing the engine surfaces to its
/// caller beyond success/failure.
#[derive(Debug, Default, Clone)]
pub struct SyncSummary {
    pub added: usize,
    pub removed: usize,
    pub marked_seen: usize,
    pub corrected_local: usize,
    pub backfilled: usize,
    pub newly_skipped: usize,
    pub newly_existing: usize,
    pub failed: usize,
    pub local_errors: usize,
    pub cleanup_suppressed: bool,
    pub duration: Duration,
}

impl SyncSummary {
    /// One human-readable line for the presentation layer.
    pub fn line(&self) -> String {
        format!(
            "added {}, removed {}, marked seen {}, corrected {}, backfilled {}, \
             skipped {}, already existing {}, failed {}",
            self.added,
            self.removed,
            self.marked_seen,
            self.corrected_local,
            self.backfilled,
            self.newly_skipped,
            self.newly_existing,
            self.failed
        )
    }
}

struct Registries {
    skip: SkipRegistry,
    already_exists: AlreadyExistsRegistry,
}

/// The reconciliation engine.
///
/// One explicit instance owns the registries, the in-progress flags and
/// the snapshot caches; workers receive it behind an `Arc`. There is no
/// static state anywhere.
pub struct SyncEngine {
    remote: Arc<dyn RemoteService>,
    libraries: Vec<Arc<dyn LocalLibrary>>,
    /// Greater of the live registration count and the count persisted by
    /// the previous run; all single-source safety gates read this.
    known_sources: usize,
    registries: Mutex<Registries>,
    store: RegistryStore,
    options: SyncOptions,
    /// Set for the duration of one full pass; checked-and-set atomically.
    in_progress: AtomicBool,
    /// Set while the engine applies local corrections, so its own library
    /// mutations do not re-trigger incremental pushes.
    applying_corrections: AtomicBool,
    cancelled: AtomicBool,
    /// Serializes all remote write submissions so an incremental push can
    /// never interleave with a full pass's writes out of order.
    submit_lock: Mutex<()>,
    watchlist_cache: Mutex<HashMap<EntityClass, TtlCache<Vec<RemoteItem>>>>,
    recommendations_cache: Mutex<HashMap<EntityClass, TtlCache<Vec<RemoteItem>>>>,
    now_playing: Mutex<Option<ExternalIds>>,
}

impl SyncEngine {
    pub fn new(
        remote: Arc<dyn RemoteService>,
        libraries: Vec<Arc<dyn LocalLibrary>>,
        store: RegistryStore,
        options: SyncOptions,
    ) -> Result<Self, SyncError> {
        if libraries.is_empty() {
            return Err(SyncError::NoSources);
        }

        let registries = Registries {
            skip: store.load_skip(),
            already_exists: store.load_already_exists(),
        };
        // The single-source gates honour the persisted count from the
        // previous run as well as the live registration: after dropping a
        // source the gates stay multi-source for one more run rather than
        // turning destructive clean-up on immediately.
        let known_sources = store.load_source_count().max(libraries.len());
        if let Err(e) = store.save_source_count(libraries.len()) {
            warn!("Failed to persist source count: {}", e);
        }

        Ok(Self {
            remote,
            libraries,
            known_sources,
            registries: Mutex::new(registries),
            store,
            options,
            in_progress: AtomicBool::new(false),
            applying_corrections: AtomicBool::new(false),
            cancelled: AtomicBool::new(false),
            submit_lock: Mutex::new(()),
            watchlist_cache: Mutex::new(HashMap::new()),
            recommendations_cache: Mutex::new(HashMap::new()),
            now_playing: Mutex::new(None),
        })
    }

    pub fn source_count(&self) -> usize {
        self.known_sources
    }

    pub fn is_running(&self) -> bool {
        self.in_progress.load(Ordering::SeqCst)
    }

    /// Request cooperative cancellation. Cancels the in-flight pass at its
    /// next phase boundary, or the next pass to start if none is running;
    /// each cancel is consumed by exactly one pass.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    /// Mark an item as currently playing so the background diff leaves
    /// its watched state to the live progress reporter.
    pub async fn set_now_playing(&self, ids: Option<ExternalIds>) {
        *self.now_playing.lock().await = ids;
    }

    fn check_cancelled(&self) -> Result<(), SyncError> {
        if self.cancelled.swap(false, Ordering::SeqCst) {
            return Err(SyncError::Cancelled);
        }
        Ok(())
    }

    /// Run one full reconciliation pass.
    ///
    /// Single-writer: a second concurrent call returns `AlreadyRunning`.
    /// A local listing or remote fetch failure aborts the pass before any
    /// registry or remote mutation; individual push failures are recorded
    /// per item only.
    #[instrument(skip(self))]
    pub async fn run_full_sync(&self) -> Result<SyncSummary, SyncError> {
        if self
            .in_progress
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(SyncError::AlreadyRunning);
        }
        let result = self.run_full_sync_inner().await;
        self.in_progress.store(false, Ordering::SeqCst);
        result
    }

    async fn run_full_sync_inner(&self) -> Result<SyncSummary, SyncError> {
        let start = Instant::now();
        // A cancel issued between passes lands on this one rather than
        // being dropped on the floor.
        self.check_cancelled()?;
        let mut summary = SyncSummary::default();

        info!(
            operation = "sync_start",
            remote = self.remote.service_name(),
            sources = self.source_count(),
            "Starting full reconciliation pass"
        );

        // Snapshot local state once; incremental side effects landing
        // after this point are not read back by this pass. A listing
        // failure aborts the pass: diffing against a partial snapshot
        // would queue everything missing for clean-up removal.
        let mut local: HashMap<EntityClass, Vec<LocalItem>> = HashMap::new();
        let mut local_watched: HashMap<EntityClass, Vec<LocalItem>> = HashMap::new();
        for entity in EntityClass::ALL {
            let mut items = Vec::new();
            let mut watched = Vec::new();
            for library in &self.libraries {
                match library.list_all(entity).await {
                    Ok(mut listed) => items.append(&mut listed),
                    Err(e) => {
                        warn!(
                            source = library.source_name(),
                            entity = entity.as_str(),
                            "Aborting pass, failed to list local items: {}",
                            e
                        );
                        return Err(SyncError::Listing(e));
                    }
                }
                match library.list_watched(entity).await {
                    Ok(mut listed) => watched.append(&mut listed),
                    Err(e) => {
                        warn!(
                            source = library.source_name(),
                            entity = entity.as_str(),
                            "Aborting pass, failed to list watched items: {}",
                            e
                        );
                        return Err(SyncError::Listing(e));
                    }
                }
            }
            local.insert(entity, items);
            local_watched.insert(entity, watched);
        }
        let local_flat: Vec<LocalItem> = local.values().flatten().cloned().collect();

        // Registry maintenance runs before any filtering.
        {
            let mut regs = self.registries.lock().await;
            if regs.skip.maybe_expire(Utc::now()) {
                self.persist_skip(&regs.skip);
            }
            if regs
                .already_exists
                .prune_stale(&local_flat, self.source_count())
                > 0
            {
                self.persist_already_exists(&regs.already_exists);
            }
        }
        self.check_cancelled()?;

        // Fetch remote state; any fetch error fails the whole pass with
        // no partial writes.
        let mut remote_collection: HashMap<EntityClass, Vec<RemoteItem>> = HashMap::new();
        let mut remote_watched: HashMap<EntityClass, Vec<RemoteItem>> = HashMap::new();
        for entity in EntityClass::ALL {
            remote_collection.insert(entity, self.remote.fetch_collection(entity).await?);
            remote_watched.insert(entity, self.remote.fetch_watched(entity).await?);
        }
        self.check_cancelled()?;

        // Diff against a registry snapshot; the lock is not held across
        // network calls.
        let (skip_snapshot, already_snapshot) = {
            let regs = self.registries.lock().await;
            (regs.skip.clone(), regs.already_exists.clone())
        };
        let now_playing = if self.options.exclude_now_playing {
            self.now_playing.lock().await.clone()
        } else {
            None
        };

        for entity in EntityClass::ALL {
            let local_items = &local[&entity];
            let ctx = DiffContext {
                skip: &skip_snapshot,
                already_exists: &already_snapshot,
                cleanup_enabled: self.options.cleanup_remote_collection,
                source_count: self.source_count(),
                now_playing: now_playing.as_ref(),
            };

            let collection_diff = if self.options.sync_collection {
                diff::compute_collection_diff(local_items, &remote_collection[&entity], &ctx)
            } else {
                Default::default()
            };
            let watched_diff = if self.options.sync_watched {
                diff::compute_watched_diff(&local_watched[&entity], &remote_watched[&entity], &ctx)
            } else {
                Default::default()
            };
            summary.cleanup_suppressed |= collection_diff.cleanup_suppressed;

            // Corrections land before the push sets are consumed, so this
            // pass never pushes an item a correction already resolved.
            self.apply_backfills(&collection_diff.backfills, &mut summary)
                .await;
            let corrections =
                merge_corrections(collection_diff.corrections, watched_diff.corrections);
            self.apply_corrections(&corrections, &mut summary).await;
            self.check_cancelled()?;

            // Pushes, grouped into one request per operation kind.
            if !collection_diff.to_add.is_empty() {
                self.push_batch(
                    entity,
                    OperationKind::AddToCollection,
                    &collection_diff.to_add,
                    &mut summary,
                )
                .await;
            }
            if !watched_diff.to_mark_seen.is_empty() {
                self.push_batch(
                    entity,
                    OperationKind::MarkSeen,
                    &watched_diff.to_mark_seen,
                    &mut summary,
                )
                .await;
            }
            self.check_cancelled()?;

            // Clean-up removals run last, after the push responses have
            // been classified.
            if !collection_diff.to_remove.is_empty() {
                self.push_removals(entity, &collection_diff.to_remove, &mut summary)
                    .await;
            }
        }

        summary.duration = start.elapsed();
        info!(
            operation = "sync_complete",
            duration_ms = summary.duration.as_millis() as u64,
            added = summary.added,
            removed = summary.removed,
            marked_seen = summary.marked_seen,
            corrected_local = summary.corrected_local,
            backfilled = summary.backfilled,
            newly_skipped = summary.newly_skipped,
            newly_existing = summary.newly_existing,
            failed = summary.failed,
            cleanup_suppressed = summary.cleanup_suppressed,
            "Reconciliation pass completed"
        );
        Ok(summary)
    }

    async fn apply_backfills(&self, backfills: &[diff::IdBackfill], summary: &mut SyncSummary) {
        if backfills.is_empty() {
            return;
        }
        self.applying_corrections.store(true, Ordering::SeqCst);
        for backfill in backfills {
            let library = self.library_for(&backfill.item);
            match library
                .adopt_external_id(&backfill.item, &backfill.imdb_id)
                .await
            {
                Ok(()) => {
                    debug!(
                        title = %backfill.item.title,
                        imdb_id = %backfill.imdb_id,
                        "Back-filled primary id into local item"
                    );
                    summary.backfilled += 1;
                }
                Err(e) => {
                    warn!(
                        title = %backfill.item.title,
                        "Local library rejected id back-fill: {}",
                        e
                    );
                    summary.local_errors += 1;
                }
            }
        }
        self.applying_corrections.store(false, Ordering::SeqCst);
    }

    async fn apply_corrections(
        &self,
        corrections: &[WatchedCorrection],
        summary: &mut SyncSummary,
    ) {
        if corrections.is_empty() {
            return;
        }
        self.applying_corrections.store(true, Ordering::SeqCst);
        for correction in corrections {
            let library = self.library_for(&correction.item);
            match library
                .apply_watched_correction(&correction.item, correction.watched)
                .await
            {
                Ok(()) => summary.corrected_local += 1,
                Err(e) => {
                    warn!(
                        title = %correction.item.title,
                        watched = correction.watched,
                        "Local library rejected watched correction: {}",
                        e
                    );
                    summary.local_errors += 1;
                }
            }
        }
        self.applying_corrections.store(false, Ordering::SeqCst);
    }

    fn library_for(&self, item: &LocalItem) -> &Arc<dyn LocalLibrary> {
        self.libraries
            .iter()
            .find(|library| library.source_name() == item.source)
            .unwrap_or(&self.libraries[0])
    }

    /// Submit one push batch and classify every per-item outcome into the
    /// registries. A failure here never aborts the pass.
    async fn push_batch(
        &self,
        entity: EntityClass,
        kind: OperationKind,
        items: &[LocalItem],
        summary: &mut SyncSummary,
    ) {
        let operation = SyncOperation::new(
            entity,
            kind,
            items.iter().map(OperationItem::from).collect(),
        );

        let result = {
            let _guard = self.submit_lock.lock().await;
            self.remote.submit(&operation).await
        };

        let result = match result {
            Ok(result) => result,
            Err(e) => {
                warn!(
                    entity = entity.as_str(),
                    kind = kind.as_str(),
                    items = items.len(),
                    "Push operation failed: {}",
                    e
                );
                summary.failed += items.len();
                return;
            }
        };

        let mut to_skip = Vec::new();
        let mut to_exists = Vec::new();
        for (index, item) in items.iter().enumerate() {
            match result.outcome_for(index) {
                ItemOutcome::Success => match kind {
                    OperationKind::AddToCollection => summary.added += 1,
                    OperationKind::MarkSeen => summary.marked_seen += 1,
                    _ => {}
                },
                ItemOutcome::NotFound => to_skip.push(item.clone()),
                ItemOutcome::AlreadyExists => to_exists.push(item.clone()),
                ItemOutcome::Failed => summary.failed += 1,
            }
        }
        summary.newly_skipped += to_skip.len();
        summary.newly_existing += to_exists.len();

        if !to_skip.is_empty() || !to_exists.is_empty() {
            let mut regs = self.registries.lock().await;
            if !to_skip.is_empty() {
                regs.skip.record_skipped(&to_skip);
                self.persist_skip(&regs.skip);
            }
            if !to_exists.is_empty() {
                regs.already_exists.record_existing(&to_exists);
                self.persist_already_exists(&regs.already_exists);
            }
        }
    }

    async fn push_removals(
        &self,
        entity: EntityClass,
        items: &[RemoteItem],
        summary: &mut SyncSummary,
    ) {
        let operation = SyncOperation::new(
            entity,
            OperationKind::RemoveFromCollection,
            items.iter().map(OperationItem::from).collect(),
        );
        let result = {
            let _guard = self.submit_lock.lock().await;
            self.remote.submit(&operation).await
        };
        match result {
            Ok(result) => {
                for index in 0..items.len() {
                    match result.outcome_for(index) {
                        ItemOutcome::Success => summary.removed += 1,
                        _ => summary.failed += 1,
                    }
                }
            }
            Err(e) => {
                warn!(
                    entity = entity.as_str(),
                    items = items.len(),
                    "Clean-up removal failed: {}",
                    e
                );
                summary.failed += items.len();
            }
        }
    }

    fn persist_skip(&self, registry: &SkipRegistry) {
        if let Err(e) = self.store.save_skip(registry) {
            warn!("Failed to persist skip registry: {}", e);
        }
    }

    fn persist_already_exists(&self, registry: &AlreadyExistsRegistry) {
        if let Err(e) = self.store.save_already_exists(registry) {
            warn!("Failed to persist already-exists registry: {}", e);
        }
    }

    // ---- Event-driven incremental sync -----------------------------------

    /// Dispatch one local-library change notification. Notifications are
    /// at-least-once; every branch below is idempotent against duplicates.
    pub async fn handle_event(&self, event: watchsync_providers::LibraryEvent) {
        use watchsync_providers::LibraryEvent::*;
        match event {
            Inserted(item) => self.on_local_insert(&item).await,
            Updated { item, changed } => self.on_local_update(&item, changed).await,
            Deleted(item) => self.on_local_delete(&item).await,
        }
    }

    /// A new local item: push add-to-collection immediately. Registries
    /// are bypassed for this initial attempt only; a failure populates
    /// them through the normal classification.
    pub async fn on_local_insert(&self, item: &LocalItem) {
        debug!(title = %item.title, "Local insert, pushing single-item add");
        self.submit_single(entity_for(item), OperationKind::AddToCollection, item)
            .await;
        self.invalidate_snapshots().await;
    }

    /// A local update: only play-count and user-rating changes go to the
    /// network. Mutations performed by the engine itself (corrections,
    /// back-fills) are suppressed by the reentrancy guard.
    pub async fn on_local_update(&self, item: &LocalItem, changed: ChangedFields) {
        if self.applying_corrections.load(Ordering::SeqCst) {
            debug!(
                title = %item.title,
                "Update originated from sync correction, not re-pushing"
            );
            return;
        }
        if !changed.play_count && !changed.user_rating {
            return;
        }

        if changed.play_count {
            if self.registry_says_skip(item).await {
                debug!(title = %item.title, "Update suppressed by registries");
            } else {
                let kind = if item.play_count > 0 {
                    OperationKind::MarkSeen
                } else {
                    OperationKind::MarkUnseen
                };
                self.submit_single(entity_for(item), kind, item).await;
            }
        }
        if changed.user_rating && item.user_rating.is_some() {
            self.submit_single(entity_for(item), OperationKind::Rate, item)
                .await;
        }
    }

    /// A local delete: remove-from-collection, gated by the same safety
    /// conditions as full-pass clean-up.
    pub async fn on_local_delete(&self, item: &LocalItem) {
        if !self.options.cleanup_remote_collection || self.source_count() != 1 {
            debug!(
                title = %item.title,
                "Local delete not propagated (clean-up disabled or multiple sources)"
            );
            return;
        }
        debug!(title = %item.title, "Local delete, pushing single-item removal");
        self.submit_single(entity_for(item), OperationKind::RemoveFromCollection, item)
            .await;
        self.invalidate_snapshots().await;
    }

    /// Bounded-wait registry read for event handlers: after 10 s the
    /// handler proceeds as if unsuppressed rather than blocking on an
    /// in-flight full pass. Slightly stale reads are acceptable here.
    async fn registry_says_skip(&self, item: &LocalItem) -> bool {
        match timeout(REGISTRY_READ_WAIT, self.registries.lock()).await {
            Ok(regs) => {
                regs.skip.should_skip(item) || regs.already_exists.is_known_existing(item)
            }
            Err(_) => {
                warn!(
                    title = %item.title,
                    "Registry read timed out, proceeding without suppression check"
                );
                false
            }
        }
    }

    async fn submit_single(&self, entity: EntityClass, kind: OperationKind, item: &LocalItem) {
        let operation = SyncOperation::new(entity, kind, vec![OperationItem::from(item)]);
        let result = {
            let _guard = self.submit_lock.lock().await;
            self.remote.submit(&operation).await
        };
        match result {
            Ok(result) => match result.outcome_for(0) {
                ItemOutcome::Success => {
                    debug!(title = %item.title, kind = kind.as_str(), "Single-item push succeeded");
                }
                ItemOutcome::NotFound => {
                    let mut regs = self.registries.lock().await;
                    regs.skip.record_skipped(slice::from_ref(item));
                    self.persist_skip(&regs.skip);
                }
                ItemOutcome::AlreadyExists => {
                    let mut regs = self.registries.lock().await;
                    regs.already_exists.record_existing(slice::from_ref(item));
                    self.persist_already_exists(&regs.already_exists);
                }
                ItemOutcome::Failed => {
                    warn!(title = %item.title, kind = kind.as_str(), "Single-item push failed");
                }
            },
            Err(e) if e.is_transport() => {
                // Retried implicitly by the next full pass; no registry entry
                debug!(
                    title = %item.title,
                    "Transport failure on single-item push, deferring to next pass: {}",
                    e
                );
            }
            Err(e) => {
                warn!(title = %item.title, "Single-item push rejected: {}", e);
            }
        }
    }

    // ---- Snapshot caches for downstream consumers ------------------------

    /// The remote watchlist, served from a five-minute snapshot cache.
    pub async fn watchlist(&self, entity: EntityClass) -> Result<Vec<RemoteItem>, RemoteError> {
        let mut caches = self.watchlist_cache.lock().await;
        let cache = caches.entry(entity).or_default();
        if let Some(items) = cache.get() {
            return Ok(items.clone());
        }
        let items = self.remote.fetch_watchlist(entity).await?;
        cache.set(items.clone());
        Ok(items)
    }

    /// Service recommendations, same snapshot policy as the watchlist.
    pub async fn recommendations(
        &self,
        entity: EntityClass,
    ) -> Result<Vec<RemoteItem>, RemoteError> {
        let mut caches = self.recommendations_cache.lock().await;
        let cache = caches.entry(entity).or_default();
        if let Some(items) = cache.get() {
            return Ok(items.clone());
        }
        let items = self.remote.fetch_recommendations(entity).await?;
        cache.set(items.clone());
        Ok(items)
    }

    pub async fn invalidate_snapshots(&self) {
        for cache in self.watchlist_cache.lock().await.values_mut() {
            cache.invalidate();
        }
        for cache in self.recommendations_cache.lock().await.values_mut() {
            cache.invalidate();
        }
    }
}

fn entity_for(item: &LocalItem) -> EntityClass {
    if item.episode.is_some() {
        EntityClass::Episodes
    } else {
        EntityClass::Movies
    }
}

/// Merge corrections from the collection and watched scans, one per local
/// item. "Mark unwatched" wins a conflict: the service's explicit unseen
/// flag has precedence over any play count.
fn merge_corrections(
    collection: Vec<WatchedCorrection>,
    watched: Vec<WatchedCorrection>,
) -> Vec<WatchedCorrection> {
    let mut by_item: HashMap<u64, WatchedCorrection> = HashMap::new();
    for correction in collection.into_iter().chain(watched) {
        match by_item.get(&correction.item.library_id) {
            Some(existing) if !existing.watched => {}
            _ => {
                by_item.insert(correction.item.library_id, correction);
            }
        }
    }
    let mut merged: Vec<WatchedCorrection> = by_item.into_values().collect();
    merged.sort_by_key(|correction| correction.item.library_id);
    merged
}
