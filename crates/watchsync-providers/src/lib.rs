pub mod error;
pub mod events;
pub mod traits;

pub use error::{LibraryError, RemoteError};
pub use events::{ChangedFields, LibraryEvent};
pub use traits::{LocalLibrary, RemoteService};
