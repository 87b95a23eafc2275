//! Validation of untrusted request input before it is used to build paths.
//!
//! Both sanitizers reject rather than repair: a bad identifier or path is an
//! error, never silently filtered down to something that happens to be valid.

use crate::error::{NetskelError, Result};
use std::fmt;
use std::path::{Component, Path};

/// A user identifier restricted to `[A-Za-z0-9_]`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct UserId(String);

impl UserId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<Path> for UserId {
    fn as_ref(&self) -> &Path {
        Path::new(&self.0)
    }
}

/// A `/`-separated path that stays below whatever root it is joined to.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RelPath(String);

impl RelPath {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RelPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<Path> for RelPath {
    fn as_ref(&self) -> &Path {
        Path::new(&self.0)
    }
}

fn is_word_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

/// Accept `raw` only if it is a non-empty run of word characters.
pub fn sanitize_identifier(raw: &str) -> Result<UserId> {
    if raw.is_empty() || !raw.chars().all(is_word_char) {
        return Err(NetskelError::InvalidIdentifier);
    }
    Ok(UserId(raw.to_string()))
}

/// Normalize a client-supplied relative path.
///
/// Rejects NUL bytes, absolute paths and any parent-directory component.
/// `.` components and repeated separators are dropped, so `./a//b` becomes
/// `a/b`. An input that normalizes to nothing is rejected as well.
pub fn sanitize_relative_path(raw: &str) -> Result<RelPath> {
    use Component::{CurDir, Normal, ParentDir, Prefix, RootDir};

    if raw.contains('\0') || raw.starts_with('/') {
        return Err(NetskelError::InvalidPath);
    }

    let mut parts: Vec<String> = Vec::new();
    for component in Path::new(raw).components() {
        match component {
            CurDir => {}
            Normal(s) => {
                let s = s.to_string_lossy();
                // Windows ADS defense
                #[cfg(windows)]
                if s.contains(':') {
                    return Err(NetskelError::InvalidPath);
                }
                parts.push(s.into_owned());
            }
            ParentDir | RootDir | Prefix(_) => return Err(NetskelError::InvalidPath),
        }
    }

    if parts.is_empty() {
        return Err(NetskelError::InvalidPath);
    }
    Ok(RelPath(parts.join("/")))
}
