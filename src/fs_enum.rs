//! Recursive enumeration of a user tree into manifest entries.
//!
//! Traversal is pre-order and depth-first with children sorted by file name,
//! so an unchanged tree always yields the same sequence. Only directories and
//! regular files are reported; symlinks are never followed.

use crate::checksum::md5_file;
use crate::error::{NetskelError, Result};
use crate::manifest::ManifestEntry;
use std::io;
use std::path::{Path, PathBuf};
use tracing::warn;
use walkdir::{DirEntry, WalkDir};

/// Mode reported for directories
pub const DIR_MODE: u32 = 0o700;
/// Mode reported for regular files without an execute bit
pub const FILE_MODE: u32 = 0o600;
/// Mode reported for files with any execute bit set
pub const EXEC_MODE: u32 = 0o700;

/// Names skipped during traversal, together with everything below them.
#[derive(Debug, Clone)]
pub struct WalkFilter {
    pub exclude: Vec<String>,
}

impl Default for WalkFilter {
    fn default() -> Self {
        Self {
            exclude: vec![".git".to_string()],
        }
    }
}

impl WalkFilter {
    pub fn new(exclude: Vec<String>) -> Self {
        Self { exclude }
    }

    pub fn is_excluded(&self, name: &str) -> bool {
        self.exclude.iter().any(|pattern| glob_match(pattern, name))
    }

    fn admits(&self, entry: &DirEntry) -> bool {
        // The root itself is never filtered
        if entry.depth() == 0 {
            return true;
        }
        match entry.file_name().to_str() {
            // Tabs and newlines would break the manifest's line format
            Some(name) if name.chars().any(char::is_control) => {
                warn!(path = ?entry.path(), "skipping name with control characters");
                false
            }
            Some(name) => !self.is_excluded(name),
            None => {
                warn!(path = %entry.path().display(), "skipping non UTF-8 name");
                false
            }
        }
    }
}

/// Simple glob matching (supports * wildcards)
fn glob_match(pattern: &str, text: &str) -> bool {
    if pattern == "*" {
        return true;
    }

    if pattern.contains('*') {
        if pattern.len() > 1 && pattern.starts_with('*') && pattern.ends_with('*') {
            let middle = &pattern[1..pattern.len() - 1];
            return text.contains(middle);
        } else if let Some(suffix) = pattern.strip_prefix('*') {
            return text.ends_with(suffix);
        } else if let Some(prefix) = pattern.strip_suffix('*') {
            return text.starts_with(prefix);
        }
    }

    pattern == text
}

/// Lazy pre-order walk below `root`. Fuses after the first error.
pub struct Walker {
    root: PathBuf,
    prefix: String,
    inner: Box<dyn Iterator<Item = walkdir::Result<DirEntry>> + Send>,
    failed: bool,
}

/// Walk `root`, emitting paths relative to it and prefixed with `prefix`.
///
/// The root itself produces no entry. The first unreadable directory or file
/// ends the walk with [`NetskelError::Walk`].
pub fn walk(root: &Path, prefix: &str, filter: &WalkFilter) -> Walker {
    let filter = filter.clone();
    let inner = WalkDir::new(root)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(move |e| filter.admits(e));

    Walker {
        root: root.to_path_buf(),
        prefix: prefix.trim_end_matches('/').to_string(),
        inner: Box::new(inner),
        failed: false,
    }
}

impl Walker {
    fn relative(&self, path: &Path) -> Option<String> {
        let rel = path.strip_prefix(&self.root).ok()?;
        let mut parts: Vec<&str> = Vec::new();
        if !self.prefix.is_empty() {
            parts.push(&self.prefix);
        }
        for component in rel.components() {
            parts.push(component.as_os_str().to_str()?);
        }
        Some(parts.join("/"))
    }

    fn entry_for(&self, entry: &DirEntry) -> Result<Option<ManifestEntry>> {
        let file_type = entry.file_type();
        if !file_type.is_dir() && !file_type.is_file() {
            return Ok(None);
        }
        let Some(rel) = self.relative(entry.path()) else {
            return Ok(None);
        };

        if file_type.is_dir() {
            return Ok(Some(ManifestEntry::directory(rel, DIR_MODE)));
        }

        let metadata = entry.metadata().map_err(|e| walk_error(entry.path(), e))?;
        let checksum = md5_file(entry.path()).map_err(|e| NetskelError::walk(entry.path(), e))?;
        Ok(Some(ManifestEntry::file(
            rel,
            file_mode(&metadata),
            metadata.len(),
            checksum,
        )))
    }
}

impl Iterator for Walker {
    type Item = Result<ManifestEntry>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        loop {
            let entry = match self.inner.next()? {
                Ok(entry) => entry,
                Err(e) => {
                    self.failed = true;
                    let path = e
                        .path()
                        .map(Path::to_path_buf)
                        .unwrap_or_else(|| self.root.clone());
                    return Some(Err(walk_error(&path, e)));
                }
            };
            // The root produces no entry of its own
            if entry.depth() == 0 {
                continue;
            }
            match self.entry_for(&entry) {
                Ok(Some(item)) => return Some(Ok(item)),
                Ok(None) => continue,
                Err(e) => {
                    self.failed = true;
                    return Some(Err(e));
                }
            }
        }
    }
}

fn walk_error(path: &Path, e: walkdir::Error) -> NetskelError {
    let source = e
        .into_io_error()
        .unwrap_or_else(|| io::Error::new(io::ErrorKind::Other, "filesystem loop"));
    NetskelError::walk(path, source)
}

#[cfg(unix)]
fn file_mode(metadata: &std::fs::Metadata) -> u32 {
    use std::os::unix::fs::PermissionsExt;
    if metadata.permissions().mode() & 0o111 != 0 {
        EXEC_MODE
    } else {
        FILE_MODE
    }
}

#[cfg(not(unix))]
fn file_mode(_metadata: &std::fs::Metadata) -> u32 {
    FILE_MODE
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checksum::md5_hex;
    use crate::manifest::EntryKind;
    use std::fs;
    use tempfile::TempDir;

    fn paths(root: &Path, prefix: &str, filter: &WalkFilter) -> Vec<String> {
        walk(root, prefix, filter)
            .map(|e| e.unwrap().to_string())
            .collect()
    }

    fn sample_tree() -> TempDir {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        fs::create_dir_all(root.join("bin")).unwrap();
        fs::create_dir_all(root.join("etc/profile.d")).unwrap();
        fs::write(root.join("zshrc"), "setopt autocd\n").unwrap();
        fs::write(root.join("bin/tool"), "#!/bin/sh\n").unwrap();
        fs::write(root.join("etc/profile.d/a.sh"), "export A=1\n").unwrap();
        fs::write(root.join("etc/hosts"), "127.0.0.1 localhost\n").unwrap();
        temp_dir
    }

    #[test]
    fn test_preorder_sorted_walk() {
        let temp_dir = sample_tree();
        let entries: Vec<ManifestEntry> = walk(temp_dir.path(), "", &WalkFilter::default())
            .collect::<Result<_>>()
            .unwrap();
        let names: Vec<&str> = entries.iter().map(|e| e.path.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "bin",
                "bin/tool",
                "etc",
                "etc/hosts",
                "etc/profile.d",
                "etc/profile.d/a.sh",
                "zshrc",
            ]
        );
        assert!(entries[0].is_dir());
        assert_eq!(entries[0].mode, DIR_MODE);
    }

    #[test]
    fn test_file_size_and_checksum() {
        let temp_dir = TempDir::new().unwrap();
        let content = b"0123456789";
        fs::write(temp_dir.path().join("config.txt"), content).unwrap();

        let entries: Vec<ManifestEntry> = walk(temp_dir.path(), "", &WalkFilter::default())
            .collect::<Result<_>>()
            .unwrap();
        assert_eq!(entries.len(), 1);
        match &entries[0].kind {
            EntryKind::File { size, checksum } => {
                assert_eq!(*size, content.len() as u64);
                assert_eq!(checksum, &md5_hex(content));
            }
            EntryKind::Directory => panic!("expected a file entry"),
        }
    }

    #[cfg(unix)]
    #[test]
    fn test_executable_mode() {
        use std::os::unix::fs::PermissionsExt;
        let temp_dir = TempDir::new().unwrap();
        let script = temp_dir.path().join("run");
        let plain = temp_dir.path().join("notes");
        fs::write(&script, "#!/bin/sh\n").unwrap();
        fs::write(&plain, "hello\n").unwrap();
        fs::set_permissions(&script, fs::Permissions::from_mode(0o755)).unwrap();
        fs::set_permissions(&plain, fs::Permissions::from_mode(0o644)).unwrap();

        let modes: Vec<(String, u32)> = walk(temp_dir.path(), "", &WalkFilter::default())
            .map(|e| e.unwrap())
            .map(|e| (e.path, e.mode))
            .collect();
        assert_eq!(
            modes,
            vec![("notes".to_string(), FILE_MODE), ("run".to_string(), EXEC_MODE)]
        );
    }

    #[test]
    fn test_prefix_is_applied() {
        let temp_dir = sample_tree();
        let listed = paths(&temp_dir.path().join("etc"), "etc/", &WalkFilter::default());
        assert_eq!(
            listed[0],
            format!("etc/hosts\t600\t*\t20\t{}", md5_hex(b"127.0.0.1 localhost\n"))
        );
        assert_eq!(listed[1], "etc/profile.d/\t700\t*");
    }

    #[test]
    fn test_git_and_patterns_excluded() {
        let temp_dir = sample_tree();
        let root = temp_dir.path();
        fs::create_dir_all(root.join(".git/objects")).unwrap();
        fs::write(root.join(".git/HEAD"), "ref: refs/heads/main\n").unwrap();
        fs::write(root.join("etc/hosts.bak"), "old\n").unwrap();

        let default_listing = paths(root, "", &WalkFilter::default());
        assert!(default_listing.iter().all(|l| !l.starts_with(".git")));
        assert!(default_listing.iter().any(|l| l.starts_with("etc/hosts.bak")));

        let filter = WalkFilter::new(vec![".git".into(), "*.bak".into(), "profile*".into()]);
        let filtered = paths(root, "", &filter);
        assert!(filtered.iter().all(|l| !l.contains(".bak")));
        assert!(filtered.iter().all(|l| !l.contains("profile.d")));
        assert!(filtered.iter().any(|l| l.starts_with("etc/hosts\t")));
    }

    #[cfg(unix)]
    #[test]
    fn test_symlinks_skipped() {
        let temp_dir = sample_tree();
        let outside = TempDir::new().unwrap();
        fs::write(outside.path().join("secret"), "nope\n").unwrap();
        std::os::unix::fs::symlink(outside.path(), temp_dir.path().join("escape")).unwrap();
        std::os::unix::fs::symlink(
            temp_dir.path().join("zshrc"),
            temp_dir.path().join("zshrc.link"),
        )
        .unwrap();
        // Cycle back to the root
        std::os::unix::fs::symlink(temp_dir.path(), temp_dir.path().join("bin/loop")).unwrap();

        let listed = paths(temp_dir.path(), "", &WalkFilter::default());
        assert!(listed.iter().all(|l| !l.starts_with("escape")));
        assert!(listed.iter().all(|l| !l.starts_with("zshrc.link")));
        assert!(listed.iter().all(|l| !l.starts_with("bin/loop")));
        assert_eq!(listed.len(), 7);
    }

    #[cfg(unix)]
    #[test]
    fn test_control_character_names_skipped() {
        let temp_dir = sample_tree();
        fs::write(temp_dir.path().join("evil\tname"), "x").unwrap();
        fs::write(temp_dir.path().join("a\ninjected\t600\t*\t1\tdeadbeef"), "x").unwrap();
        fs::write(temp_dir.path().join("carriage\rreturn"), "x").unwrap();
        fs::create_dir(temp_dir.path().join("tab\tdir")).unwrap();
        fs::write(temp_dir.path().join("tab\tdir/inner"), "x").unwrap();

        let listed = paths(temp_dir.path(), "", &WalkFilter::default());
        assert_eq!(listed.len(), 7);
        for line in &listed {
            assert!(!line.contains('\n') && !line.contains('\r'), "{line:?}");
            let fields = line.split('\t').count();
            if line.ends_with("/\t700\t*") {
                assert_eq!(fields, 3, "{line:?}");
            } else {
                assert_eq!(fields, 5, "{line:?}");
            }
        }
        assert!(listed.iter().all(|l| !l.contains("injected") && !l.contains("evil")));
        assert!(listed.iter().any(|l| l.starts_with("zshrc\t")));
    }

    #[test]
    fn test_missing_root_is_walk_error() {
        let temp_dir = TempDir::new().unwrap();
        let missing = temp_dir.path().join("gone");
        let mut walker = walk(&missing, "", &WalkFilter::default());
        match walker.next() {
            Some(Err(NetskelError::Walk { path, .. })) => assert_eq!(path, missing),
            other => panic!("expected walk error, got {other:?}"),
        }
        assert!(walker.next().is_none());
    }

    #[test]
    fn test_glob_match() {
        assert!(glob_match("*", "anything"));
        assert!(glob_match("*.tmp", "file.tmp"));
        assert!(!glob_match("*.tmp", "file.txt"));
        assert!(glob_match("cache*", "cache-dir"));
        assert!(glob_match("*swp*", ".notes.swp.1"));
        assert!(glob_match(".git", ".git"));
        assert!(!glob_match(".git", ".gitignore"));
    }
}
