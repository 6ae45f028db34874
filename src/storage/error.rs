use std::path::PathBuf;

use reqwest::Method;
use thiserror::Error;

/// Result type alias for state store operations.
pub type Result<T> = std::result::Result<T, StoreError>;

/// Errors surfaced by a [`StateStore`](super::StateStore).
///
/// `Status` and `Connection` are transport failures: the store was
/// unreachable or rejected the request. `Decode` means the store answered
/// with data that does not parse into the expected entity.
#[derive(Error, Debug)]
pub enum StoreError {
    /// The store answered with anything other than 200.
    #[error("error calling {method} {path} with status code {status}")]
    Status {
        method: Method,
        path: String,
        status: u16,
    },

    /// The request never produced a response.
    #[error("error calling {method} {path}: {source}")]
    Connection {
        method: Method,
        path: String,
        #[source]
        source: reqwest::Error,
    },

    /// Response body did not parse into the expected entity.
    #[error("error parsing {resource} {id}")]
    Decode {
        resource: &'static str,
        id: String,
        #[source]
        source: serde_json::Error,
    },

    /// Request body could not be serialized before sending.
    #[error("error parsing to json while calling {method} {path}")]
    Encode {
        method: Method,
        path: String,
        #[source]
        source: serde_json::Error,
    },

    /// Raised by local stores for an unknown or soft-deleted id.
    #[error("{resource} not found: {id}")]
    NotFound { resource: &'static str, id: String },

    #[error("store i/o failure at {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl StoreError {
    /// HTTP status carried by a transport error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            StoreError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            StoreError::Status { .. } | StoreError::Connection { .. }
        )
    }

    /// True for local `NotFound` and for a remote 404.
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound { .. }) || self.status() == Some(404)
    }

    pub(crate) fn not_found(resource: &'static str, id: &str) -> Self {
        StoreError::NotFound {
            resource,
            id: id.to_string(),
        }
    }

    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        StoreError::Io {
            path: path.into(),
            source,
        }
    }
}
