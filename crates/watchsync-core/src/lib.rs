pub mod cache;
pub mod diff;
pub mod matcher;
pub mod registry;
pub mod scheduler;
pub mod store;
pub mod sync;

pub use cache::TtlCache;
pub use diff::{compute_collection_diff, compute_watched_diff, CollectionDiff, DiffContext, WatchedDiff};
pub use matcher::match_item;
pub use registry::{AlreadyExistsRegistry, SkipRegistry, SKIP_COOLDOWN_DAYS};
pub use scheduler::SyncScheduler;
pub use store::RegistryStore;
pub use sync::{SyncEngine, SyncError, SyncSummary};
