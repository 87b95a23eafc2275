//! Per-user bootstrap client script.

use crate::error::{NetskelError, Result};
use crate::sanitize::UserId;
use std::path::PathBuf;

/// Placeholder replaced with the requesting user
pub const USER_PLACEHOLDER: &str = "{{user}}";
/// Placeholder replaced with the configured server URL
pub const SERVER_URL_PLACEHOLDER: &str = "{{server_url}}";

/// Source of the client script advertised as `bin/netskel`.
///
/// Output must be deterministic for a given user and configuration; it is
/// returned in memory so its size and checksum can be taken before sending.
pub trait ScriptSource: Send + Sync {
    fn render(&self, user: &UserId) -> Result<Vec<u8>>;
}

#[derive(Debug, Clone)]
enum Template {
    /// Re-read on every render so edits show up without a restart
    File(PathBuf),
    Inline(String),
}

/// Client script built by substituting placeholders in a template.
#[derive(Debug, Clone)]
pub struct TemplateScript {
    template: Template,
    server_url: String,
}

impl TemplateScript {
    pub fn from_file(path: impl Into<PathBuf>, server_url: impl Into<String>) -> Self {
        Self {
            template: Template::File(path.into()),
            server_url: server_url.into(),
        }
    }

    pub fn inline(template: impl Into<String>, server_url: impl Into<String>) -> Self {
        Self {
            template: Template::Inline(template.into()),
            server_url: server_url.into(),
        }
    }

    fn load(&self) -> Result<String> {
        match &self.template {
            Template::File(path) => std::fs::read_to_string(path).map_err(|e| {
                NetskelError::Script(format!("read template {}: {}", path.display(), e))
            }),
            Template::Inline(text) => Ok(text.clone()),
        }
    }
}

impl ScriptSource for TemplateScript {
    fn render(&self, user: &UserId) -> Result<Vec<u8>> {
        let script = self
            .load()?
            .replace(USER_PLACEHOLDER, user.as_str())
            .replace(SERVER_URL_PLACEHOLDER, &self.server_url);
        Ok(script.into_bytes())
    }
}
