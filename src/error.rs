//! Error types shared by the sanitizer, walker, formatter and file server.

use std::path::PathBuf;
use thiserror::Error;

/// Every way a netskel request can fail.
#[derive(Debug, Error)]
pub enum NetskelError {
    /// User identifier was empty or contained characters outside `[A-Za-z0-9_]`.
    #[error("invalid user identifier")]
    InvalidIdentifier,

    /// Relative path was empty, absolute, contained `..` or a NUL byte.
    #[error("invalid relative path")]
    InvalidPath,

    /// User directory or requested file does not exist (or escapes the user root).
    #[error("not found")]
    NotFound,

    /// Traversal failed part-way; no partial manifest is produced.
    #[error("failed to walk {path}: {source}")]
    Walk {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The bootstrap script could not be produced.
    #[error("bootstrap script unavailable: {0}")]
    Script(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl NetskelError {
    /// Rejected or absent input, as opposed to a server-side failure.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::InvalidIdentifier | Self::InvalidPath | Self::NotFound
        )
    }

    pub(crate) fn walk(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Walk {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T, E = NetskelError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_classification() {
        assert!(NetskelError::InvalidIdentifier.is_not_found());
        assert!(NetskelError::InvalidPath.is_not_found());
        assert!(NetskelError::NotFound.is_not_found());
        assert!(!NetskelError::Script("missing template".into()).is_not_found());

        let walk = NetskelError::walk(
            "/srv/db/alice/private",
            std::io::Error::from(std::io::ErrorKind::PermissionDenied),
        );
        assert!(!walk.is_not_found());
        assert!(walk.to_string().contains("/srv/db/alice/private"));
    }
}
