//! Daemon configuration: TOML file, overridden by command-line flags.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::cli::{ConfigArgs, DaemonOpts};
use crate::fs_enum::WalkFilter;
use crate::logger::{JsonlLogger, Logger, NoopLogger, TextLogger};
use crate::script::TemplateScript;
use crate::service::Netskel;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccessLogFormat {
    #[default]
    Text,
    Jsonl,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub root: PathBuf,
    pub bind: String,
    pub client_template: PathBuf,
    /// Defaults to `http://<server_name>`
    pub server_url: Option<String>,
    /// Defaults to the machine hostname
    pub server_name: Option<String>,
    pub exclude: Vec<String>,
    pub access_log: Option<PathBuf>,
    pub access_log_format: AccessLogFormat,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            root: PathBuf::from("./db"),
            bind: "0.0.0.0:8080".to_string(),
            client_template: PathBuf::from("./client/netskel"),
            server_url: None,
            server_name: None,
            exclude: WalkFilter::default().exclude,
            access_log: None,
            access_log_format: AccessLogFormat::Text,
        }
    }
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let data = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        Self::from_toml(&data).with_context(|| format!("Failed to parse config {}", path.display()))
    }

    pub fn from_toml(data: &str) -> Result<Self> {
        Ok(toml::from_str(data)?)
    }

    /// Config file named by `--config` (or defaults), with flags applied on top.
    pub fn from_args(args: &ConfigArgs) -> Result<Self> {
        let mut config = match &args.config {
            Some(path) => Self::load(path)?,
            None => Self::default(),
        };
        config.apply_args(args);
        Ok(config)
    }

    pub fn for_daemon(opts: &DaemonOpts) -> Result<Self> {
        let mut config = Self::from_args(&opts.common)?;
        if let Some(bind) = &opts.bind {
            config.bind = bind.clone();
        }
        if let Some(log) = &opts.access_log {
            config.access_log = Some(log.clone());
        }
        Ok(config)
    }

    pub fn apply_args(&mut self, args: &ConfigArgs) {
        if let Some(root) = &args.root {
            self.root = root.clone();
        }
        if let Some(template) = &args.client_template {
            self.client_template = template.clone();
        }
        if let Some(url) = &args.server_url {
            self.server_url = Some(url.clone());
        }
    }

    /// Validate the root and return its canonical form.
    pub fn canonical_root(&self) -> Result<PathBuf> {
        if !self.root.exists() {
            anyhow::bail!("Root directory does not exist: {}", self.root.display());
        }
        if !self.root.is_dir() {
            anyhow::bail!("Root path is not a directory: {}", self.root.display());
        }
        std::fs::canonicalize(&self.root)
            .with_context(|| format!("Failed to canonicalize root path: {}", self.root.display()))
    }

    pub fn server_name(&self) -> String {
        self.server_name
            .clone()
            .or_else(|| {
                hostname::get()
                    .ok()
                    .map(|h| h.to_string_lossy().into_owned())
            })
            .unwrap_or_else(|| "localhost".to_string())
    }

    pub fn server_url(&self) -> String {
        self.server_url
            .clone()
            .unwrap_or_else(|| format!("http://{}", self.server_name()))
    }

    pub fn filter(&self) -> WalkFilter {
        WalkFilter::new(self.exclude.clone())
    }

    pub fn logger(&self) -> Result<Arc<dyn Logger>> {
        let Some(path) = &self.access_log else {
            return Ok(Arc::new(NoopLogger));
        };
        Ok(match self.access_log_format {
            AccessLogFormat::Text => Arc::new(TextLogger::new(path)?),
            AccessLogFormat::Jsonl => Arc::new(JsonlLogger::new(path)?),
        })
    }

    /// Build the request service against the validated root.
    pub fn build_service(&self) -> Result<Netskel> {
        let root = self.canonical_root()?;
        if !self.client_template.is_file() {
            tracing::warn!(
                template = %self.client_template.display(),
                "client template missing; script and manifest requests will fail"
            );
        }
        let script = TemplateScript::from_file(&self.client_template, self.server_url());
        Ok(Netskel::new(root, Arc::new(script))
            .with_filter(self.filter())
            .with_logger(self.logger()?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.bind, "0.0.0.0:8080");
        assert_eq!(config.exclude, vec![".git".to_string()]);
        assert_eq!(config.access_log_format, AccessLogFormat::Text);
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = Config::from_toml(
            r#"
            root = "/srv/netskel/db"
            server_name = "skel.example.com"
            exclude = [".git", "*.swp"]
            access_log_format = "jsonl"
            "#,
        )
        .unwrap();
        assert_eq!(config.root, PathBuf::from("/srv/netskel/db"));
        assert_eq!(config.bind, "0.0.0.0:8080");
        assert_eq!(config.server_url(), "http://skel.example.com");
        assert_eq!(config.exclude.len(), 2);
        assert_eq!(config.access_log_format, AccessLogFormat::Jsonl);
    }

    #[test]
    fn test_flags_override_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("netskel.toml");
        std::fs::write(&path, "bind = \"127.0.0.1:1\"\nroot = \"/from/file\"\n").unwrap();

        let opts = DaemonOpts::parse_from([
            "netskeld",
            "--config",
            path.to_str().unwrap(),
            "--root",
            "/from/flag",
        ]);
        let config = Config::for_daemon(&opts).unwrap();
        assert_eq!(config.bind, "127.0.0.1:1");
        assert_eq!(config.root, PathBuf::from("/from/flag"));
    }

    #[test]
    fn test_root_validation() {
        let temp_dir = TempDir::new().unwrap();
        let mut config = Config::default();

        config.root = temp_dir.path().join("missing");
        assert!(config.canonical_root().is_err());

        let file = temp_dir.path().join("file");
        std::fs::write(&file, "x").unwrap();
        config.root = file;
        assert!(config.canonical_root().is_err());

        config.root = temp_dir.path().to_path_buf();
        assert_eq!(
            config.canonical_root().unwrap(),
            temp_dir.path().canonicalize().unwrap()
        );
    }

    #[test]
    fn test_unknown_format_rejected() {
        assert!(Config::from_toml("access_log_format = \"xml\"").is_err());
    }
}
