// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

use anyhow::Result;
use clap::Parser;
use engine_supervisor::{Dispatcher, load_settings, server, settings_path};
use log::{error, info};
use simple_logger::SimpleLogger;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::signal::unix::{SignalKind, signal};

/// Serve engine lifecycle calls as line-delimited JSON on stdin/stdout.
#[derive(Parser, Debug)]
#[command(name = "engine-supervisor", version)]
struct Cli {
    /// Settings file (overrides ENGINE_SUPERVISOR_SETTINGS)
    #[arg(long, value_name = "PATH")]
    settings: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let settings = load_settings(&settings_path(cli.settings))?;

    SimpleLogger::new()
        .with_level(settings.log_level().to_level_filter())
        .with_utc_timestamps()
        .init()?;
    info!(
        "engine-supervisor starting (version {})",
        env!("CARGO_PKG_VERSION")
    );

    let dispatcher = Arc::new(Dispatcher::from_settings(&settings));

    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigint = signal(SignalKind::interrupt())?;

    tokio::select! {
        res = server::serve(Arc::clone(&dispatcher), tokio::io::stdin(), tokio::io::stdout()) => {
            match res {
                Ok(()) => info!("input closed"),
                Err(e) => error!("failed reading requests: {e}"),
            }
        }
        _ = sigterm.recv() => info!("received SIGTERM"),
        _ = sigint.recv() => info!("received SIGINT"),
    }

    dispatcher.detach().await;
    info!("engine-supervisor shutting down");
    // A blocking stdin read still in flight would hold up runtime shutdown.
    std::process::exit(0)
}
