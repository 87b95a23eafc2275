//! Shared CLI helpers and small reusable Clap fragments

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::encoding::Encoding;

/// Options that override values from the config file
#[derive(Clone, Debug, Default, Args)]
pub struct ConfigArgs {
    /// TOML config file
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Directory holding one subdirectory per user
    #[arg(long)]
    pub root: Option<PathBuf>,

    /// Client script template served as bin/netskel
    #[arg(long)]
    pub client_template: Option<PathBuf>,

    /// URL substituted for {{server_url}} in the client template
    #[arg(long)]
    pub server_url: Option<String>,
}

/// Options for the netskeld daemon
#[derive(Clone, Debug, Parser)]
#[command(author, version, about = "Netskel daemon - per-user file distribution over HTTP")]
pub struct DaemonOpts {
    #[command(flatten)]
    pub common: ConfigArgs,

    /// Bind address (host:port)
    #[arg(long)]
    pub bind: Option<String>,

    /// Append access log entries to this file
    #[arg(long = "access-log")]
    pub access_log: Option<PathBuf>,

    /// Log level when RUST_LOG is unset
    #[arg(long, default_value = "info")]
    pub log_level: String,
}

/// Offline inspection tool
#[derive(Clone, Debug, Parser)]
#[command(author, version, about = "Netskel - inspect what the daemon would serve")]
pub struct AdminOpts {
    #[command(flatten)]
    pub common: ConfigArgs,

    /// Log level when RUST_LOG is unset
    #[arg(long, default_value = "warn")]
    pub log_level: String,

    #[command(subcommand)]
    pub command: AdminCommand,
}

#[derive(Clone, Debug, Subcommand)]
pub enum AdminCommand {
    /// Print a user's manifest exactly as served
    Manifest {
        user: String,
        /// Host named in the header (defaults to the configured server name)
        #[arg(long)]
        host: Option<String>,
    },
    /// Print the md5 fingerprint of a file
    Md5 { file: PathBuf },
    /// Print a user's file as the daemon would send it
    Cat {
        user: String,
        file: String,
        #[arg(long, value_enum, default_value_t = Encoding::Raw)]
        encoding: Encoding,
    },
}
