//! Error types for the extension layer.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{TabId, WindowId};

/// Errors that can occur in the extension layer.
///
/// Every variant maps to one of the wire-level [`ErrorKind`]s surfaced to
/// extension code. No variant is process-fatal; all failures are scoped to
/// the call that produced them.
#[derive(Debug, Error)]
pub enum ExtensionError {
    #[error("Extension '{0}' not found")]
    ExtensionNotFound(String),

    #[error("API not found: {namespace}.{member}")]
    ApiNotFound { namespace: String, member: String },

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Tab {0} not found")]
    TabNotFound(TabId),

    #[error("Window {0} not found")]
    WindowNotFound(WindowId),

    #[error("{0} not found")]
    NotFound(String),

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Not implemented: {0}")]
    Unimplemented(String),

    #[error("Manifest not found in extension: {0}")]
    ManifestNotFound(PathBuf),

    #[error("Invalid manifest in {path}: {message}")]
    ManifestInvalid { path: PathBuf, message: String },

    #[error("Failed to install extension '{extension}': {message}")]
    InstallFailed { extension: String, message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type for extension operations.
pub type ExtensionResult<T> = Result<T, ExtensionError>;

/// Wire-level error category, part of the dispatch reply shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorKind {
    ExtensionNotFound,
    ApiNotFound,
    InvalidArgument,
    NotFound,
    PermissionDenied,
    IoFailure,
    Unimplemented,
}

/// Error shape carried back across the boundary to the calling extension.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorDescriptor {
    pub kind: ErrorKind,
    pub message: String,
}

impl ExtensionError {
    /// The wire-level category for this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::ExtensionNotFound(_) => ErrorKind::ExtensionNotFound,
            Self::ApiNotFound { .. } => ErrorKind::ApiNotFound,
            Self::InvalidArgument(_) | Self::Json(_) => ErrorKind::InvalidArgument,
            Self::TabNotFound(_)
            | Self::WindowNotFound(_)
            | Self::NotFound(_)
            | Self::ManifestNotFound(_) => ErrorKind::NotFound,
            Self::PermissionDenied(_) => ErrorKind::PermissionDenied,
            Self::Unimplemented(_) => ErrorKind::Unimplemented,
            Self::ManifestInvalid { .. } => ErrorKind::InvalidArgument,
            Self::InstallFailed { .. } | Self::Io(_) => ErrorKind::IoFailure,
        }
    }
}

impl From<&ExtensionError> for ErrorDescriptor {
    fn from(err: &ExtensionError) -> Self {
        Self {
            kind: err.kind(),
            message: err.to_string(),
        }
    }
}

impl From<ExtensionError> for ErrorDescriptor {
    fn from(err: ExtensionError) -> Self {
        (&err).into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kinds() {
        assert_eq!(
            ExtensionError::ExtensionNotFound("abc".into()).kind(),
            ErrorKind::ExtensionNotFound
        );
        assert_eq!(ExtensionError::TabNotFound(7).kind(), ErrorKind::NotFound);
        assert_eq!(
            ExtensionError::InvalidArgument("url is required".into()).kind(),
            ErrorKind::InvalidArgument
        );
    }

    #[test]
    fn test_descriptor_round_trip() {
        let desc: ErrorDescriptor = ExtensionError::ApiNotFound {
            namespace: "bogus".into(),
            member: "call".into(),
        }
        .into();

        let json = serde_json::to_string(&desc).unwrap();
        let back: ErrorDescriptor = serde_json::from_str(&json).unwrap();
        assert_eq!(back.kind, ErrorKind::ApiNotFound);
        assert!(back.message.contains("bogus.call"));
    }
}
