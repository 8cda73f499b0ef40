//! Error taxonomy shared by the transport, protocol client and orchestrator.

use std::time::Duration;
use thiserror::Error;

/// Why a single attempt never produced a response.
#[derive(Debug, Error)]
pub enum TransportFailure {
    #[error("request timed out after {0:?}")]
    Timeout(Duration),
    #[error("connection failed: {0}")]
    Connection(#[source] reqwest::Error),
}

/// Reasons a file or label is refused before it reaches the service.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SelectionError {
    #[error("\"{0}\" filename already exists, please rename")]
    DuplicateName(String),
    #[error("\"{name}\" is {size} bytes, larger than the {limit} byte limit")]
    TooLarge { name: String, size: u64, limit: u64 },
    #[error("\"{0}\" is not a regular file")]
    NotAFile(String),
    #[error("invalid file name \"{name}\": {reason}")]
    InvalidFileName { name: String, reason: String },
    #[error("invalid {field} \"{value}\": {reason}")]
    InvalidLabel {
        field: &'static str,
        value: String,
        reason: &'static str,
    },
}

/// Everything that can go wrong while talking to the upload service.
#[derive(Debug, Error)]
pub enum UploadError {
    #[error("{operation} failed after {attempts} attempt(s): {source}")]
    RetryExhausted {
        operation: &'static str,
        attempts: u32,
        #[source]
        source: TransportFailure,
    },
    #[error("{0}")]
    Application(String),
    #[error("protocol violation: {0}")]
    Protocol(String),
    #[error("authentication rejected by upload service")]
    Unauthorized,
    #[error("transfer of \"{filename}\" failed: {source}")]
    FileTransfer {
        filename: String,
        #[source]
        source: Box<UploadError>,
    },
    #[error("transfer task aborted: {0}")]
    TaskAborted(String),
    #[error("I/O error on \"{path}\": {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error(transparent)]
    Selection(#[from] SelectionError),
}

/// Coarse category of an [`UploadError`], cheap to copy into UI state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    RetryExhausted,
    Application,
    Protocol,
    Unauthorized,
    PartialTransfer,
    Io,
    Selection,
}

impl UploadError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            UploadError::RetryExhausted { .. } => ErrorKind::RetryExhausted,
            UploadError::Application(_) => ErrorKind::Application,
            UploadError::Protocol(_) => ErrorKind::Protocol,
            UploadError::Unauthorized => ErrorKind::Unauthorized,
            UploadError::FileTransfer { .. } | UploadError::TaskAborted(_) => {
                ErrorKind::PartialTransfer
            }
            UploadError::Io { .. } => ErrorKind::Io,
            UploadError::Selection(_) => ErrorKind::Selection,
        }
    }

    /// Cause of the innermost failure, skipping the per-file wrapper.
    pub fn root(&self) -> &UploadError {
        match self {
            UploadError::FileTransfer { source, .. } => source.root(),
            other => other,
        }
    }

    pub(crate) fn empty_data() -> Self {
        UploadError::Protocol("data is empty in result".to_string())
    }
}
