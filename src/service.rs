//! Request-level operations: bootstrap script, manifest and file delivery.
//!
//! Every operation takes raw request strings, runs them through the
//! sanitizers before touching the filesystem, and reads the tree fresh.

use crate::error::Result;
use crate::files::FileServer;
use crate::fs_enum::{walk, WalkFilter};
use crate::logger::{Logger, NoopLogger};
use crate::manifest::{format_manifest, Manifest, ManifestHeader, BOOTSTRAP_PATH};
use crate::sanitize::{sanitize_identifier, sanitize_relative_path};
use crate::script::ScriptSource;
use chrono::{DateTime, Utc};
use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, error};

/// Body of a successful file request.
#[derive(Debug)]
pub enum FileBody {
    /// The synthesized client, served for `bin/netskel`
    Script(Vec<u8>),
    /// A file from the user tree
    File { file: File, len: u64 },
}

pub struct Netskel {
    files: FileServer,
    script: Arc<dyn ScriptSource>,
    filter: WalkFilter,
    logger: Arc<dyn Logger>,
}

impl Netskel {
    /// `root` holds one directory per user.
    pub fn new(root: impl Into<PathBuf>, script: Arc<dyn ScriptSource>) -> Self {
        Self {
            files: FileServer::new(root),
            script,
            filter: WalkFilter::default(),
            logger: Arc::new(NoopLogger),
        }
    }

    pub fn with_filter(mut self, filter: WalkFilter) -> Self {
        self.filter = filter;
        self
    }

    pub fn with_logger(mut self, logger: Arc<dyn Logger>) -> Self {
        self.logger = logger;
        self
    }

    pub fn root(&self) -> &Path {
        self.files.root()
    }

    /// GetBootstrapScript
    pub fn bootstrap_script(&self, raw_user: &str) -> Result<Vec<u8>> {
        self.audit("getclient", || {
            let user = sanitize_identifier(raw_user)?;
            self.files.user_dir(&user)?;
            let script = self.script.render(&user)?;
            self.logger.script_sent(&user, script.len());
            Ok(script)
        })
    }

    /// GetManifest
    ///
    /// The walk runs to completion before anything is returned; any walk
    /// failure discards the whole manifest.
    pub fn manifest(
        &self,
        raw_user: &str,
        host: &str,
        generated_at: DateTime<Utc>,
    ) -> Result<Manifest> {
        self.audit("netskeldb", || {
            let user = sanitize_identifier(raw_user)?;
            let dir = self.files.user_dir(&user)?;
            let script = self.script.render(&user)?;
            let header = ManifestHeader {
                user: &user,
                generated_at,
                host,
            };
            let manifest = format_manifest(&header, &script, walk(&dir, "", &self.filter))?;
            debug!(user = %user, entries = manifest.walked_entries(), "manifest generated");
            self.logger.manifest_sent(&user, host, manifest.walked_entries());
            Ok(manifest)
        })
    }

    /// GetFile
    pub fn file(&self, raw_user: &str, raw_file: &str) -> Result<FileBody> {
        self.audit("sendfile", || {
            let user = sanitize_identifier(raw_user)?;
            let file = sanitize_relative_path(raw_file)?;

            // Synthesized entries shadow the user tree, as in the manifest
            if file.as_str() == BOOTSTRAP_PATH {
                self.files.user_dir(&user)?;
                let script = self.script.render(&user)?;
                self.logger.file_sent(&user, &file, script.len() as u64);
                return Ok(FileBody::Script(script));
            }

            let (handle, len) = self.files.open(&user, &file)?;
            self.logger.file_sent(&user, &file, len);
            Ok(FileBody::File { file: handle, len })
        })
    }

    fn audit<T>(&self, request: &str, op: impl FnOnce() -> Result<T>) -> Result<T> {
        op().inspect_err(|e| {
            if !e.is_not_found() {
                error!(request, error = %e, "request failed");
            }
            self.logger.rejected(request, &e.to_string());
        })
    }
}
