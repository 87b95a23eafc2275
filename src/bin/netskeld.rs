use anyhow::{Context, Result};
use clap::Parser;
use std::sync::Arc;
use tracing::info;

use netskel::cli::DaemonOpts;
use netskel::config::Config;
use netskel::http::{self, AppState};
use netskel::logger::init_tracing;

fn main() -> Result<()> {
    let opts = DaemonOpts::parse();
    init_tracing(&opts.log_level)?;

    let config = Config::for_daemon(&opts)?;
    let netskel = config.build_service()?;

    info!("Starting netskel daemon:");
    info!("  Root: {}", netskel.root().display());
    info!("  Bind: {}", config.bind);
    info!("  Client template: {}", config.client_template.display());

    if config.bind.starts_with("0.0.0.0") {
        info!("Binding to 0.0.0.0 exposes the daemon on all network interfaces");
    }

    let state = Arc::new(AppState {
        netskel,
        server_name: config.server_name(),
    });

    let rt = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Failed to build tokio runtime")?;

    rt.block_on(http::serve(&config.bind, state))
}
