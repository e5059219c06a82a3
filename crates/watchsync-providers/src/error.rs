use thiserror::Error;

/// Failure modes of the remote service client.
///
/// Transport errors (no response at all) abort a full pass; protocol
/// errors are structured responses and are handled per operation.
#[derive(Debug, Error)]
pub enum RemoteError {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("protocol error {code}: {message}")]
    Protocol { code: i64, message: String },
}

impl RemoteError {
    pub fn is_transport(&self) -> bool {
        matches!(self, RemoteError::Transport(_))
    }
}

/// Failure reported by the local library when a mutation is rejected or
/// the store is unavailable. Never fatal to a pass; logged and counted.
#[derive(Debug, Error)]
#[error("local library error: {0}")]
pub struct LibraryError(pub String);
