// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Vigil Daemon (vigild)
//!
//! Background process hosting one diagnostic agent per workspace.
//!
//! Architecture:
//! - HTTP listener: axum serves the JSON API and SSE streams
//! - Agent loop: one worker task per workspace processing events sequentially

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

use std::path::PathBuf;

use tokio::signal::unix::{signal, SignalKind};
use tracing::{error, info};
use vigil_daemon::lifecycle::{self, Paths};
use vigil_daemon::listener;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Handle info flags before any config or state access
    let mut config_path = PathBuf::from("vigil.toml");
    if let Some(arg) = std::env::args().nth(1) {
        match arg.as_str() {
            "--version" | "-V" | "-v" => {
                println!("vigild {}", env!("CARGO_PKG_VERSION"));
                return Ok(());
            }
            "--help" | "-h" | "help" => {
                println!("vigild {}", env!("CARGO_PKG_VERSION"));
                println!("Vigil Daemon - autonomous diagnostic agent for a workspace");
                println!();
                println!("USAGE:");
                println!("    vigild [CONFIG]");
                println!();
                println!("ARGS:");
                println!("    CONFIG    Path to the workspace config (default: vigil.toml)");
                println!();
                println!("The daemon watches the configured project tree, re-checks it on");
                println!("change, and serves its state over HTTP/SSE (see [server] listen).");
                println!();
                println!("OPTIONS:");
                println!("    -h, --help       Print help information");
                println!("    -V, --version    Print version information");
                return Ok(());
            }
            flag if flag.starts_with('-') => {
                eprintln!("error: unexpected argument '{flag}'");
                eprintln!("Usage: vigild [CONFIG | --help | --version]");
                std::process::exit(2);
            }
            path => config_path = PathBuf::from(path),
        }
    }

    let paths = Paths::load()?;

    // Rotate log file if it has grown too large
    rotate_log_if_needed(&paths.log_path);

    // Write startup marker to log (before tracing setup, so operators can
    // find where this attempt begins)
    write_startup_marker(&paths)?;

    let log_guard = setup_logging(&paths)?;

    info!(config = %config_path.display(), "starting vigild");

    let startup = match lifecycle::startup(&config_path, &paths) {
        Ok(result) => result,
        Err(e) => {
            write_startup_error(&paths, &e);
            error!("failed to start daemon: {}", e);
            drop(log_guard);
            return Err(e.into());
        }
    };

    // Auto-start agents whose config asks for it
    {
        let agents: Vec<_> = startup.state.inner.agents.lock().values().cloned().collect();
        for agent in agents {
            if agent.workspace().config.agent.enabled
                && agent.workspace().config.agent.auto_start
            {
                let _ = agent.start();
            }
        }
    }

    let tcp = tokio::net::TcpListener::bind(&startup.listen).await?;
    info!("daemon ready, listening on http://{}", startup.listen);

    // Signal ready for parent process (CLI or service manager waiting on us)
    println!("READY");

    let state = startup.state.clone();
    let app = listener::router(startup.state);
    axum::serve(tcp, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // Graceful stop of every agent: joins workers, releases singleton locks
    let agents: Vec<_> = state.inner.agents.lock().values().cloned().collect();
    for agent in agents {
        agent.stop().await;
    }

    info!("daemon stopped");
    Ok(())
}

async fn shutdown_signal() {
    let mut sigterm = match signal(SignalKind::terminate()) {
        Ok(sig) => sig,
        Err(e) => {
            error!("failed to install SIGTERM handler: {}", e);
            return std::future::pending().await;
        }
    };
    tokio::select! {
        _ = tokio::signal::ctrl_c() => info!("received SIGINT, shutting down..."),
        _ = sigterm.recv() => info!("received SIGTERM, shutting down..."),
    }
}

/// Maximum log file size before rotation (10 MB).
const MAX_LOG_SIZE: u64 = 10 * 1024 * 1024;

/// Number of rotated log files to keep (vigild.log.1, .2, .3).
const MAX_ROTATED_LOGS: u32 = 3;

/// Rotate the daemon log file if it exceeds [`MAX_LOG_SIZE`].
///
/// Shifts `vigild.log` -> `vigild.log.1` -> `.2` -> `.3`, deleting the
/// oldest. Best-effort: rotation failures are silently ignored so the
/// daemon still starts.
fn rotate_log_if_needed(log_path: &std::path::Path) {
    let size = match std::fs::metadata(log_path) {
        Ok(m) => m.len(),
        Err(_) => return,
    };
    if size < MAX_LOG_SIZE {
        return;
    }

    let log_str = log_path.display().to_string();
    for i in (1..MAX_ROTATED_LOGS).rev() {
        let from = format!("{log_str}.{i}");
        let to = format!("{log_str}.{}", i + 1);
        let _ = std::fs::rename(&from, &to);
    }
    let _ = std::fs::rename(log_path, format!("{log_str}.1"));
}

/// Startup marker prefix written to log before anything else.
/// Full format: "--- vigild: starting (pid: 12345) ---"
const STARTUP_MARKER_PREFIX: &str = "--- vigild: starting (pid: ";

fn write_startup_marker(paths: &Paths) -> std::io::Result<()> {
    use std::io::Write;

    if let Some(parent) = paths.log_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let mut file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&paths.log_path)?;
    writeln!(
        file,
        "{}{}) ---\n",
        STARTUP_MARKER_PREFIX,
        std::process::id()
    )?;
    Ok(())
}

/// Write startup error synchronously to the log file.
/// Tracing is non-blocking and may not flush before a fast exit.
fn write_startup_error(paths: &Paths, error: &lifecycle::LifecycleError) {
    use std::io::Write;

    let Ok(mut file) = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&paths.log_path)
    else {
        return;
    };
    let _ = writeln!(file, "ERROR failed to start daemon: {}", error);
}

fn setup_logging(
    paths: &Paths,
) -> Result<tracing_appender::non_blocking::WorkerGuard, Box<dyn std::error::Error>> {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    if let Some(parent) = paths.log_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let file_appender = tracing_appender::rolling::never(
        paths
            .log_path
            .parent()
            .ok_or("log path has no parent directory")?,
        paths
            .log_path
            .file_name()
            .ok_or("log path has no file name")?,
    );
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(non_blocking))
        .init();

    Ok(guard)
}
