//! Sequence generator daemon.
//!
//! Serves durable monotonic per-key sequences over HTTP.
//!
//! # Signals
//!
//! - `SIGINT`, `SIGTERM`: stop serving, persist the final snapshot, exit
//! - `SIGHUP`: reopen the diagnostic log file

mod logging;

use clap::Parser;
use seqgen_core::{Config, SequenceEngine};
use seqgen_server::{parse_bind_addr, SequenceServer, ServerConfig};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// Durable monotonic sequence generator.
#[derive(Parser)]
#[command(name = "sequence-generator")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Listen address, `ip:port` or `:port`
    #[arg(long, default_value = ":8080")]
    http: String,

    /// Directory for the diagnostic log file (must exist)
    #[arg(long, default_value = "/var/log/sequence-generator/")]
    log_dir: PathBuf,

    /// Directory for snapshots and write log segments (must exist)
    #[arg(long, default_value = "/var/sequence-generator/")]
    data_dir: PathBuf,

    /// Step between consecutive values of a key
    #[arg(long, default_value_t = 1)]
    increment: u64,

    /// Added to every returned value; at most `increment`
    #[arg(long, default_value_t = 0)]
    offset: u64,

    /// Request timeout in seconds
    #[arg(long, default_value_t = 10)]
    timeout: u64,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let log_file = logging::init(&cli.log_dir, cli.verbose).map_err(|err| {
        format!(
            "could not open log {}: {err}",
            cli.log_dir.join(logging::LOG_FILE_NAME).display()
        )
    })?;

    let bind_addr = parse_bind_addr(&cli.http)?;
    let server_config =
        ServerConfig::new(bind_addr).with_request_timeout(Duration::from_secs(cli.timeout));

    let config = Config::new(&cli.data_dir, &cli.log_dir)
        .increment(cli.increment)
        .offset(cli.offset);
    let engine = match tokio::task::spawn_blocking(move || SequenceEngine::start(config)).await? {
        Ok(engine) => Arc::new(engine),
        Err(err) => {
            tracing::error!(error = %err, "failed to start sequence engine");
            return Err(err.into());
        }
    };

    tokio::spawn(reopen_on_hangup(log_file));

    let server = SequenceServer::new(server_config, Arc::clone(&engine));
    let served = server.run(shutdown_signal()).await;

    // Persist the final state even if the server failed.
    let stopped = tokio::task::spawn_blocking(move || engine.stop()).await?;
    if let Err(err) = &stopped {
        tracing::error!(error = %err, "failed to stop sequence engine");
    }

    served?;
    stopped?;
    Ok(())
}

/// Resolves on `SIGINT` or `SIGTERM`.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %err, "failed to listen for SIGINT");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(err) => {
                tracing::error!(error = %err, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {}
        () = terminate => {}
    }
    tracing::info!("stop signal received");
}

/// Reopens the diagnostic log file on every `SIGHUP`.
#[cfg(unix)]
async fn reopen_on_hangup(log_file: logging::ReopenableFile) {
    use tokio::signal::unix::{signal, SignalKind};

    let mut hangup = match signal(SignalKind::hangup()) {
        Ok(stream) => stream,
        Err(err) => {
            tracing::error!(error = %err, "failed to listen for SIGHUP");
            return;
        }
    };

    while hangup.recv().await.is_some() {
        match log_file.reopen() {
            Ok(()) => tracing::info!(path = %log_file.path().display(), "reopen log file"),
            Err(err) => {
                tracing::error!(path = %log_file.path().display(), error = %err, "could not reopen log file");
            }
        }
    }
}

#[cfg(not(unix))]
async fn reopen_on_hangup(_log_file: logging::ReopenableFile) {}
