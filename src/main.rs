//! netskel - offline view of what the daemon serves
//!
//! Uses the same config file and flags as `netskeld`, so an administrator can
//! check a user's manifest or a file body without going through HTTP.

use anyhow::{Context, Result};
use chrono::Utc;
use clap::Parser;
use std::io::{self, Write};

use netskel::checksum::md5_file;
use netskel::cli::{AdminCommand, AdminOpts};
use netskel::config::Config;
use netskel::logger::init_tracing;
use netskel::FileBody;

fn main() -> Result<()> {
    let opts = AdminOpts::parse();
    init_tracing(&opts.log_level)?;

    let config = Config::from_args(&opts.common)?;
    let stdout = io::stdout();
    let mut out = stdout.lock();

    match opts.command {
        AdminCommand::Md5 { file } => {
            let hash = md5_file(&file).with_context(|| {
                format!("Unable to determine fingerprint for {}", file.display())
            })?;
            writeln!(out, "{}", hash)?;
        }
        AdminCommand::Manifest { user, host } => {
            let netskel = config.build_service()?;
            let host = host.unwrap_or_else(|| config.server_name());
            let manifest = netskel
                .manifest(&user, &host, Utc::now())
                .with_context(|| format!("Unable to build manifest for {}", user))?;
            out.write_all(manifest.as_str().as_bytes())?;
        }
        AdminCommand::Cat {
            user,
            file,
            encoding,
        } => {
            let netskel = config.build_service()?;
            let body = netskel
                .file(&user, &file)
                .with_context(|| format!("Unable to send {} for {}", file, user))?;
            match body {
                FileBody::Script(bytes) => out.write_all(&encoding.encode(&bytes))?,
                FileBody::File { mut file, .. } if encoding.is_raw() => {
                    io::copy(&mut file, &mut out)?;
                }
                FileBody::File { mut file, len } => {
                    let mut data = Vec::with_capacity(len as usize);
                    io::Read::read_to_end(&mut file, &mut data)?;
                    out.write_all(&encoding.encode(&data))?;
                }
            }
        }
    }

    out.flush()?;
    Ok(())
}
