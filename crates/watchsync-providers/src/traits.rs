use async_trait::async_trait;
use watchsync_models::{EntityClass, LocalItem, OperationResult, RemoteItem, SyncOperation};

use crate::error::{LibraryError, RemoteError};

/// The remote media-tracking service, consumed as an opaque
/// request/response API. Transport and marshalling live behind this trait.
#[async_trait]
pub trait RemoteService: Send + Sync {
    fn service_name(&self) -> &str;

    /// The user's remote collection for one entity class.
    async fn fetch_collection(&self, entity: EntityClass) -> Result<Vec<RemoteItem>, RemoteError>;

    /// The user's remote watched state for one entity class.
    async fn fetch_watched(&self, entity: EntityClass) -> Result<Vec<RemoteItem>, RemoteError>;

    /// The user's remote watchlist. Consumed by downstream browsing
    /// features through the engine's snapshot cache, never by the diff.
    async fn fetch_watchlist(&self, entity: EntityClass) -> Result<Vec<RemoteItem>, RemoteError>;

    /// Service recommendations, same caching rules as the watchlist.
    async fn fetch_recommendations(
        &self,
        entity: EntityClass,
    ) -> Result<Vec<RemoteItem>, RemoteError>;

    /// Submit one batch operation. A protocol error here is a structured
    /// response and is classified per item by the caller.
    async fn submit(&self, operation: &SyncOperation) -> Result<OperationResult, RemoteError>;
}

/// The on-device media library: queried for state, and asked (never told)
/// to mutate its own records.
#[async_trait]
pub trait LocalLibrary: Send + Sync {
    fn source_name(&self) -> &str;

    async fn list_all(&self, entity: EntityClass) -> Result<Vec<LocalItem>, LibraryError>;

    async fn list_watched(&self, entity: EntityClass) -> Result<Vec<LocalItem>, LibraryError>;

    /// Fire-and-forget watched-state correction. The library applies it
    /// through its own update path, which re-emits a change notification.
    async fn apply_watched_correction(
        &self,
        item: &LocalItem,
        watched: bool,
    ) -> Result<(), LibraryError>;

    /// Adopt a remote-discovered primary id into an item lacking one
    /// (back-fill). Identity fields are owned by the library, so the
    /// engine requests this rather than writing directly.
    async fn adopt_external_id(&self, item: &LocalItem, imdb_id: &str)
        -> Result<(), LibraryError>;
}
