pub mod ids;
pub mod item;
pub mod matching;
pub mod operation;
pub mod records;

pub use ids::ExternalIds;
pub use item::{EntityClass, EpisodeKey, LocalItem, RemoteItem};
pub use matching::{MatchResult, MatchTier};
pub use operation::{ItemOutcome, OperationItem, OperationKind, OperationResult, SyncOperation};
pub use records::{AlreadyExistsRecord, SkipRecord};
