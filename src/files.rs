//! Resolution of sanitized (user, file) pairs to readable files.

use crate::error::{NetskelError, Result};
use crate::sanitize::{RelPath, UserId};
use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};
use tracing::warn;

/// Serves files out of `root/<user>/`.
#[derive(Debug, Clone)]
pub struct FileServer {
    root: PathBuf,
}

impl FileServer {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// `root/user`, which must be an existing directory.
    pub fn user_dir(&self, user: &UserId) -> Result<PathBuf> {
        let dir = self.root.join(user);
        if !dir.is_dir() {
            return Err(NetskelError::NotFound);
        }
        Ok(dir)
    }

    /// Canonical path of `root/user/file`.
    ///
    /// The target must be a regular file and its symlink-resolved location
    /// must still be inside the canonical user directory.
    pub fn resolve(&self, user: &UserId, file: &RelPath) -> Result<PathBuf> {
        let dir = self.user_dir(user)?;
        let candidate = dir.join(file);

        match std::fs::metadata(&candidate) {
            Ok(meta) if meta.is_file() => {}
            _ => return Err(NetskelError::NotFound),
        }

        let canon_dir = dir.canonicalize().map_err(|_| NetskelError::NotFound)?;
        let canon = candidate
            .canonicalize()
            .map_err(|_| NetskelError::NotFound)?;
        if !canon.starts_with(&canon_dir) {
            warn!(user = %user, file = %file, "resolved path escapes user root");
            return Err(NetskelError::NotFound);
        }
        Ok(canon)
    }

    /// Open the resolved file for reading; returns the handle and its length.
    pub fn open(&self, user: &UserId, file: &RelPath) -> Result<(File, u64)> {
        let path = self.resolve(user, file)?;
        let handle = File::open(&path).map_err(|e| match e.kind() {
            // Removed between resolve and open
            io::ErrorKind::NotFound => NetskelError::NotFound,
            _ => NetskelError::Io(e),
        })?;
        let len = handle.metadata()?.len();
        Ok((handle, len))
    }
}
