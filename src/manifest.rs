//! The `.netskeldb` manifest: one tab-separated line per entry below a short
//! comment header.

use crate::checksum::md5_hex;
use crate::error::Result;
use crate::sanitize::UserId;
use chrono::{DateTime, Utc};
use std::fmt;

/// Directory that holds the synthesized client
pub const BOOTSTRAP_DIR: &str = "bin";
/// Manifest path of the synthesized client script
pub const BOOTSTRAP_PATH: &str = "bin/netskel";
/// Mode advertised for the synthesized entries
pub const BOOTSTRAP_MODE: u32 = 0o700;
/// Placeholder owner column; real ownership is never reported
pub const OWNER_MARKER: &str = "*";

const TIMESTAMP_FORMAT: &str = "%d-%b-%Y @ %H:%M %Z";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntryKind {
    Directory,
    File { size: u64, checksum: String },
}

/// One node of a user tree, relative to the user's root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestEntry {
    /// Relative path without a trailing slash
    pub path: String,
    pub mode: u32,
    pub kind: EntryKind,
}

impl ManifestEntry {
    pub fn directory(path: impl Into<String>, mode: u32) -> Self {
        Self {
            path: path.into(),
            mode,
            kind: EntryKind::Directory,
        }
    }

    pub fn file(path: impl Into<String>, mode: u32, size: u64, checksum: String) -> Self {
        Self {
            path: path.into(),
            mode,
            kind: EntryKind::File { size, checksum },
        }
    }

    pub fn is_dir(&self) -> bool {
        matches!(self.kind, EntryKind::Directory)
    }
}

impl fmt::Display for ManifestEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            EntryKind::Directory => {
                write!(f, "{}/\t{:o}\t{}", self.path, self.mode, OWNER_MARKER)
            }
            EntryKind::File { size, checksum } => write!(
                f,
                "{}\t{:o}\t{}\t{}\t{}",
                self.path, self.mode, OWNER_MARKER, size, checksum
            ),
        }
    }
}

/// Everything the comment block needs; the host comes from the caller.
#[derive(Debug, Clone)]
pub struct ManifestHeader<'a> {
    pub user: &'a UserId,
    pub generated_at: DateTime<Utc>,
    pub host: &'a str,
}

impl ManifestHeader<'_> {
    fn render(&self, out: &mut String) {
        out.push_str("#\n");
        out.push_str(&format!("# .netskeldb for {}\n", self.user));
        out.push_str("#\n");
        out.push_str(&format!(
            "# Generated {} by {}\n",
            self.generated_at.format(TIMESTAMP_FORMAT),
            self.host
        ));
        out.push_str("#\n");
    }
}

/// A fully rendered manifest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Manifest {
    text: String,
    walked: usize,
}

impl Manifest {
    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn into_string(self) -> String {
        self.text
    }

    /// Number of entries that came from the walk (synthesized ones excluded)
    pub fn walked_entries(&self) -> usize {
        self.walked
    }
}

/// Render the header, the synthesized client entries and every walked entry.
///
/// The client entries always come first, even when the user tree carries its
/// own `bin/`. The first failed entry aborts rendering so that a truncated
/// listing is never handed out.
pub fn format_manifest<I>(
    header: &ManifestHeader<'_>,
    bootstrap_script: &[u8],
    entries: I,
) -> Result<Manifest>
where
    I: IntoIterator<Item = Result<ManifestEntry>>,
{
    let mut text = String::new();
    header.render(&mut text);

    text.push_str(&ManifestEntry::directory(BOOTSTRAP_DIR, BOOTSTRAP_MODE).to_string());
    text.push('\n');
    // Deployed clients expect the trailing tab on this line
    text.push_str(&format!(
        "{}\t{:o}\t{}\t{}\t{}\t\n",
        BOOTSTRAP_PATH,
        BOOTSTRAP_MODE,
        OWNER_MARKER,
        bootstrap_script.len(),
        md5_hex(bootstrap_script)
    ));

    let mut walked = 0;
    for entry in entries {
        text.push_str(&entry?.to_string());
        text.push('\n');
        walked += 1;
    }

    Ok(Manifest { text, walked })
}
