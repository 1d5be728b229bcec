use thiserror::Error;

/// Failures the synchronization engine distinguishes between. Everything
/// above the domain layer is plain `anyhow`.
#[derive(Error, Clone, Debug, PartialEq, Eq)]
pub enum SyncError {
    /// Non-2xx response or network failure on a remote store call, or on the
    /// initial handshake of a generation request.
    #[error("Remote store request failed: {message}")]
    Remote {
        status: Option<u16>,
        message: String,
    },

    /// The generation response broke off after the handshake succeeded.
    #[error("Assistant stream failed: {0}")]
    Stream(String),

    /// Persisted content could not be loaded into the editor surface.
    #[error("Document content could not be loaded: {0}")]
    Parse(String),
}

impl SyncError {
    pub fn remote(message: impl Into<String>) -> SyncError {
        return SyncError::Remote {
            status: None,
            message: message.into(),
        };
    }

    pub fn remote_status(status: u16, message: impl Into<String>) -> SyncError {
        return SyncError::Remote {
            status: Some(status),
            message: message.into(),
        };
    }
}

impl From<reqwest::Error> for SyncError {
    fn from(err: reqwest::Error) -> SyncError {
        return SyncError::Remote {
            status: err.status().map(|status| return status.as_u16()),
            message: err.to_string(),
        };
    }
}

pub type SyncResult<T> = Result<T, SyncError>;
