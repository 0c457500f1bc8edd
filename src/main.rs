#![forbid(unsafe_code)]

//! `smart-planner` server binary.
//!
//! Loads configuration, opens the database, and serves the REST API plus
//! the MCP endpoint over HTTP, or the MCP tools alone over stdio.

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, ValueEnum};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::{fmt, EnvFilter};

use smart_planner::config::GlobalConfig;
use smart_planner::mcp::handler::AppState;
use smart_planner::mcp::transport;
use smart_planner::persistence::db;
use smart_planner::scheduling::HttpFeedFetcher;
use smart_planner::{api, AppError, Result};

#[derive(Debug, Copy, Clone, Eq, PartialEq, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, ValueEnum)]
enum Transport {
    /// REST API and MCP streamable HTTP on one listener.
    Http,
    /// MCP over stdin/stdout.
    Stdio,
}

#[derive(Debug, Parser)]
#[command(name = "smart-planner", about = "Personal task planner server", version, long_about = None)]
struct Cli {
    /// Path to the TOML configuration file; built-in defaults apply when absent.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Override the database path from the configuration.
    #[arg(long)]
    db: Option<PathBuf>,

    /// Override the HTTP port from the configuration.
    #[arg(long)]
    port: Option<u16>,

    /// Log output format (text or json).
    #[arg(long, value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,

    /// Which transport to serve.
    #[arg(long, value_enum, default_value_t = Transport::Http)]
    transport: Transport,
}

fn main() -> Result<()> {
    let args = Cli::parse();
    init_tracing(args.log_format, args.transport)?;
    info!("smart-planner bootstrap");

    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|err| AppError::Config(format!("failed to build tokio runtime: {err}")))?
        .block_on(run(args))
}

async fn run(args: Cli) -> Result<()> {
    let mut config = match &args.config {
        Some(path) => GlobalConfig::load_from_path(path)?,
        None => GlobalConfig::default(),
    };
    if let Some(db_path) = args.db {
        config.db_path = db_path;
    }
    if let Some(port) = args.port {
        config.http_port = port;
    }
    let config = Arc::new(config);
    info!(db_path = %config.db_path.display(), "configuration loaded");

    let db = Arc::new(db::connect(&config.db_path).await?);
    info!("database connected");

    let fetcher = Arc::new(HttpFeedFetcher::new(config.fetch_timeout())?);
    let state = Arc::new(AppState {
        config: Arc::clone(&config),
        db,
        fetcher,
    });

    let ct = CancellationToken::new();
    let signal_ct = ct.clone();
    tokio::spawn(async move {
        shutdown_signal().await;
        info!("shutdown signal received");
        signal_ct.cancel();
    });

    let outcome = match args.transport {
        Transport::Http => {
            let addr = config.bind_addr();
            let listener = tokio::net::TcpListener::bind(&addr)
                .await
                .map_err(|err| AppError::Config(format!("failed to bind {addr}: {err}")))?;
            api::serve_http(listener, state, ct).await
        }
        Transport::Stdio => transport::serve_stdio(state, ct).await,
    };

    if let Err(err) = &outcome {
        error!(%err, "server stopped with error");
    }
    info!("smart-planner shut down");
    outcome
}

async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();

    #[cfg(unix)]
    {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = ctrl_c => {}
                    _ = sigterm.recv() => {}
                }
            }
            Err(err) => {
                tracing::warn!(%err, "failed to register SIGTERM handler, using ctrl-c only");
                let _ = ctrl_c.await;
            }
        }
    }

    #[cfg(not(unix))]
    {
        if let Err(err) = ctrl_c.await {
            tracing::error!(%err, "ctrl-c signal handler failed");
        }
    }
}

fn init_tracing(log_format: LogFormat, transport: Transport) -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    // stdout carries the protocol in stdio mode.
    let writer = match transport {
        Transport::Http => BoxMakeWriter::new(std::io::stdout),
        Transport::Stdio => BoxMakeWriter::new(std::io::stderr),
    };
    let subscriber = fmt().with_env_filter(env_filter).with_writer(writer);

    match log_format {
        LogFormat::Text => subscriber
            .try_init()
            .map_err(|err| AppError::Config(format!("failed to init tracing: {err}")))?,
        LogFormat::Json => subscriber
            .json()
            .try_init()
            .map_err(|err| AppError::Config(format!("failed to init tracing: {err}")))?,
    }

    Ok(())
}
