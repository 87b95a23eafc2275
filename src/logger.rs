use anyhow::{Context, Result};
use chrono::Utc;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::Path;

use crate::sanitize::{RelPath, UserId};

/// Access log hooks, one per served or refused request.
pub trait Logger: Send + Sync {
    fn script_sent(&self, _user: &UserId, _bytes: usize) {}
    fn manifest_sent(&self, _user: &UserId, _host: &str, _entries: usize) {}
    fn file_sent(&self, _user: &UserId, _file: &RelPath, _bytes: u64) {}
    fn rejected(&self, _request: &str, _reason: &str) {}
}

pub struct NoopLogger;
impl Logger for NoopLogger {}

fn open_append(path: &Path) -> Result<File> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).ok();
    }
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("open access log {}", path.display()))
}

pub struct TextLogger {
    file: Mutex<File>,
}

impl TextLogger {
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        Ok(Self {
            file: Mutex::new(open_append(path.as_ref())?),
        })
    }

    fn line(&self, s: &str) {
        let mut f = self.file.lock();
        let _ = writeln!(f, "[{}] {}", Utc::now().to_rfc3339(), s);
    }
}

impl Logger for TextLogger {
    fn script_sent(&self, user: &UserId, bytes: usize) {
        self.line(&format!("SCRIPT user={user} bytes={bytes}"));
    }
    fn manifest_sent(&self, user: &UserId, host: &str, entries: usize) {
        self.line(&format!("MANIFEST user={user} host={host} entries={entries}"));
    }
    fn file_sent(&self, user: &UserId, file: &RelPath, bytes: u64) {
        self.line(&format!("FILE user={user} path={file} bytes={bytes}"));
    }
    fn rejected(&self, request: &str, reason: &str) {
        self.line(&format!("REJECT req={request} reason={reason}"));
    }
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AccessEvent {
    Script,
    Manifest,
    File,
    Rejected,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct AccessLogEntry {
    pub timestamp: String,
    pub event: AccessEvent,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bytes: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entries: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl AccessLogEntry {
    fn new(event: AccessEvent) -> Self {
        Self {
            timestamp: Utc::now().to_rfc3339(),
            event,
            user: None,
            path: None,
            host: None,
            bytes: None,
            entries: None,
            reason: None,
        }
    }
}

/// One JSON object per line
pub struct JsonlLogger {
    file: Mutex<File>,
}

impl JsonlLogger {
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        Ok(Self {
            file: Mutex::new(open_append(path.as_ref())?),
        })
    }

    fn add_entry(&self, entry: &AccessLogEntry) {
        let mut f = self.file.lock();
        if serde_json::to_writer(&mut *f, entry).is_ok() {
            let _ = f.write_all(b"\n");
        }
    }
}

impl Logger for JsonlLogger {
    fn script_sent(&self, user: &UserId, bytes: usize) {
        let mut entry = AccessLogEntry::new(AccessEvent::Script);
        entry.user = Some(user.to_string());
        entry.bytes = Some(bytes as u64);
        self.add_entry(&entry);
    }
    fn manifest_sent(&self, user: &UserId, host: &str, entries: usize) {
        let mut entry = AccessLogEntry::new(AccessEvent::Manifest);
        entry.user = Some(user.to_string());
        entry.host = Some(host.to_string());
        entry.entries = Some(entries);
        self.add_entry(&entry);
    }
    fn file_sent(&self, user: &UserId, file: &RelPath, bytes: u64) {
        let mut entry = AccessLogEntry::new(AccessEvent::File);
        entry.user = Some(user.to_string());
        entry.path = Some(file.to_string());
        entry.bytes = Some(bytes);
        self.add_entry(&entry);
    }
    fn rejected(&self, request: &str, reason: &str) {
        let mut entry = AccessLogEntry::new(AccessEvent::Rejected);
        entry.path = Some(request.to_string());
        entry.reason = Some(reason.to_string());
        self.add_entry(&entry);
    }
}

/// Install the global tracing subscriber; `RUST_LOG` wins over `level`.
pub fn init_tracing(level: &str) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .or_else(|_| tracing_subscriber::EnvFilter::try_new(level))
        .context("Failed to create log filter")?;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to install tracing subscriber: {e}"))?;

    Ok(())
}
