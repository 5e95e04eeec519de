//! lotkeeperd - The lotkeeper background service
//!
//! This is the main entry point for the lotkeeperd service.
//! It wires together all the components:
//! - Configuration loading
//! - Store initialization
//! - Lot engine and startup slot layout
//! - IPC server

use anyhow::{Context, Result, anyhow};
use clap::Parser;
use lotkeeper_api::{ErrorCode, ErrorInfo, Event, EventPayload, Response, Tariff};
use lotkeeper_config::{LotPolicy, load_config};
use lotkeeper_core::LotEngine;
use lotkeeper_ipc::{IpcServer, ServerMessage};
use lotkeeper_store::{AuditEvent, AuditEventType, DB_FILENAME, SqliteStore, Store};
use lotkeeper_util::{RateLimiter, default_config_path};
use lotkeeperd::dispatch::{collect_events, handle_command};
use lotkeeperd::logging::open_log_file;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::signal::unix::{SignalKind, signal};
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// lotkeeperd - Slot allocation and billing service for a parking lot
#[derive(Parser, Debug)]
#[command(name = "lotkeeperd")]
#[command(about = "Slot allocation and billing service for a parking lot", long_about = None)]
struct Args {
    /// Configuration file path (default: ~/.config/lotkeeper/config.toml)
    #[arg(short, long, default_value_os_t = default_config_path())]
    config: PathBuf,

    /// Socket path override (or set LOTKEEPER_SOCKET env var)
    #[arg(short, long, env = "LOTKEEPER_SOCKET")]
    socket: Option<PathBuf>,

    /// Data directory override (or set LOTKEEPER_DATA_DIR env var)
    #[arg(short, long, env = "LOTKEEPER_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// Log directory override (or set LOTKEEPER_LOG_DIR env var)
    #[arg(long, env = "LOTKEEPER_LOG_DIR")]
    log_dir: Option<PathBuf>,

    /// Tariff override in currency units per minute
    #[arg(short, long, env = "LOTKEEPER_TARIFF_PER_MINUTE")]
    tariff: Option<f64>,

    /// Log level
    #[arg(short, long, default_value = "info")]
    log_level: String,
}

/// Main service state
struct Service {
    engine: LotEngine,
    ipc: Arc<IpcServer>,
    store: Arc<dyn Store>,
    rate_limiter: RateLimiter,
}

impl Service {
    async fn new(args: &Args, policy: LotPolicy) -> Result<Self> {
        let tariff = match args.tariff {
            Some(rate) => Tariff::per_minute(rate)
                .ok_or_else(|| {
                    anyhow!(
                        "Invalid tariff {}: must be between 0 and {}",
                        rate,
                        Tariff::MAX_PER_MINUTE
                    )
                })?,
            None => policy.tariff,
        };

        let socket_path = args
            .socket
            .clone()
            .unwrap_or_else(|| policy.service.socket_path.clone());

        let data_dir = args
            .data_dir
            .clone()
            .unwrap_or_else(|| policy.service.data_dir.clone());

        std::fs::create_dir_all(&data_dir)
            .with_context(|| format!("Failed to create data directory {:?}", data_dir))?;

        let db_path = data_dir.join(DB_FILENAME);
        let store: Arc<dyn Store> = Arc::new(
            SqliteStore::open(&db_path)
                .with_context(|| format!("Failed to open database {:?}", db_path))?,
        );

        info!(db_path = %db_path.display(), "Store initialized");

        store.append_audit(AuditEvent::new(AuditEventType::ServiceStarted))?;

        let mut engine = LotEngine::new(store.clone(), tariff);

        if !policy.layout.is_empty() {
            let added = engine
                .provision(&policy.layout.rows, policy.layout.slots_per_row)
                .context("Failed to provision configured slot layout")?;
            debug!(added = added.len(), "Configured layout applied");
        }
        // Nobody is subscribed yet
        engine.drain_events();

        let state = engine.get_state().context("Failed to read lot state")?;
        info!(
            slots = state.summary.total,
            free = state.summary.free,
            active_sessions = state.active_sessions,
            tariff = tariff.rate(),
            "Lot state restored"
        );

        let mut ipc = IpcServer::new(&socket_path);
        ipc.start().await?;

        info!(socket_path = %socket_path.display(), "IPC server started");

        // 30 requests per second per client
        let rate_limiter = RateLimiter::new(30, Duration::from_secs(1));

        Ok(Self {
            engine,
            ipc: Arc::new(ipc),
            store,
            rate_limiter,
        })
    }

    async fn run(self) -> Result<()> {
        let ipc_ref = self.ipc.clone();
        let mut ipc_messages = ipc_ref
            .take_message_receiver()
            .await
            .ok_or_else(|| anyhow!("IPC message receiver already taken"))?;

        let engine = Arc::new(Mutex::new(self.engine));
        let rate_limiter = Arc::new(Mutex::new(self.rate_limiter));
        let store = self.store.clone();

        let ipc_accept = ipc_ref.clone();
        tokio::spawn(async move {
            if let Err(e) = ipc_accept.run().await {
                error!(error = %e, "IPC server error");
            }
        });

        let mut sigterm =
            signal(SignalKind::terminate()).context("Failed to create SIGTERM handler")?;
        let mut sigint =
            signal(SignalKind::interrupt()).context("Failed to create SIGINT handler")?;
        let mut sighup =
            signal(SignalKind::hangup()).context("Failed to create SIGHUP handler")?;

        info!("Service running");

        loop {
            tokio::select! {
                _ = sigterm.recv() => {
                    info!("Received SIGTERM, shutting down gracefully");
                    break;
                }
                _ = sigint.recv() => {
                    info!("Received SIGINT, shutting down gracefully");
                    break;
                }
                _ = sighup.recv() => {
                    info!("Received SIGHUP, shutting down gracefully");
                    break;
                }

                Some(msg) = ipc_messages.recv() => {
                    Self::handle_ipc_message(&engine, &ipc_ref, &store, &rate_limiter, msg).await;
                }
            }
        }

        info!("Shutting down lotkeeperd");

        ipc_ref.broadcast_event(Event::new(EventPayload::Shutdown));

        if let Err(e) = store.append_audit(AuditEvent::new(AuditEventType::ServiceStopped)) {
            warn!(error = %e, "Failed to log service shutdown");
        }

        ipc_ref.shutdown();
        info!("Shutdown complete");
        Ok(())
    }

    async fn handle_ipc_message(
        engine: &Arc<Mutex<LotEngine>>,
        ipc: &Arc<IpcServer>,
        store: &Arc<dyn Store>,
        rate_limiter: &Arc<Mutex<RateLimiter>>,
        msg: ServerMessage,
    ) {
        match msg {
            ServerMessage::Request { client_id, request } => {
                {
                    let mut limiter = rate_limiter.lock().await;
                    if !limiter.check(&client_id) {
                        let response = Response::error(
                            request.request_id,
                            ErrorInfo::new(ErrorCode::RateLimited, "Too many requests"),
                        );
                        let _ = ipc.send_response(&client_id, response).await;
                        return;
                    }
                }

                let Some(client) = ipc.get_client_info(&client_id).await else {
                    debug!(client_id = %client_id, "Request from departed client dropped");
                    return;
                };

                let (response, events) = {
                    let mut eng = engine.lock().await;
                    let response = handle_command(
                        &mut eng,
                        &client,
                        request.request_id,
                        request.command,
                        lotkeeper_util::now(),
                    );
                    (response, collect_events(&mut eng))
                };

                if let Err(e) = ipc.send_response(&client_id, response).await {
                    debug!(client_id = %client_id, error = %e, "Failed to send response");
                }
                for event in events {
                    ipc.broadcast_event(event);
                }
            }

            ServerMessage::ClientConnected { client_id, info } => {
                info!(
                    client_id = %client_id,
                    role = ?info.role,
                    uid = ?info.uid,
                    "Client connected"
                );

                let _ = store.append_audit(AuditEvent::new(AuditEventType::ClientConnected {
                    client_id: client_id.to_string(),
                    role: format!("{:?}", info.role),
                    uid: info.uid,
                }));
            }

            ServerMessage::ClientDisconnected { client_id } => {
                debug!(client_id = %client_id, "Client disconnected");

                let _ = store.append_audit(AuditEvent::new(AuditEventType::ClientDisconnected {
                    client_id: client_id.to_string(),
                }));

                let mut limiter = rate_limiter.lock().await;
                limiter.remove_client(&client_id);
            }
        }
    }
}

/// Load the config file, or defaults when there is none. Returns whether a
/// file was found.
fn read_policy(path: &Path) -> Result<(LotPolicy, bool)> {
    if !path.exists() {
        return Ok((LotPolicy::default(), false));
    }
    let policy =
        load_config(path).with_context(|| format!("Failed to load config from {:?}", path))?;
    Ok((policy, true))
}

/// Human-readable logs on stdout, JSON lines in the log file
fn init_logging(level: &str, log_file: File) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_target(true))
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_ansi(false)
                .with_writer(std::sync::Mutex::new(log_file)),
        )
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let (policy, config_found) = read_policy(&args.config)?;

    let log_dir = args
        .log_dir
        .clone()
        .unwrap_or_else(|| policy.service.log_dir.clone());
    let log_file = open_log_file(&log_dir)
        .with_context(|| format!("Failed to open log file in {:?}", log_dir))?;
    init_logging(&args.log_level, log_file);

    info!(
        version = env!("CARGO_PKG_VERSION"),
        log_dir = %log_dir.display(),
        "lotkeeperd starting"
    );

    if config_found {
        info!(
            config_path = %args.config.display(),
            rows = policy.layout.rows.len(),
            slots_per_row = policy.layout.slots_per_row,
            "Configuration loaded"
        );
    } else {
        warn!(
            config_path = %args.config.display(),
            "No configuration file, using defaults"
        );
    }

    if lotkeeper_util::is_mock_time_active() {
        warn!(
            mock_time_var = lotkeeper_util::MOCK_TIME_ENV_VAR,
            "Mock time is active; entry and exit times are shifted"
        );
    }

    let service = Service::new(&args, policy).await?;
    service.run().await
}
