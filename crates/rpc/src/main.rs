//! goaltrack RPC server.
//!
//! Serves the goal engine to remote callers, one JSON request per line,
//! over stdio or a Unix socket.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use goaltrack_core::{SystemClock, TenantId};
use goaltrack_engine::{EngineConfig, EngineContext, GoalService, StaticAuthorizer};
use goaltrack_rpc::{RpcServer, RpcServerConfig};
use goaltrack_storage::JsonStorage;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "goaltrack-rpc")]
#[command(about = "Goal tracking RPC server for mentoring platforms", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Data directory
    #[arg(short, long, default_value = ".goaltrack")]
    data: PathBuf,

    /// Tenant (mentoring program) the data directory is scoped to
    #[arg(short, long)]
    tenant: Option<String>,

    /// Token table; defaults to <data>/auth.json
    #[arg(long)]
    auth: Option<PathBuf>,

    /// UTC offset of the platform timezone, in hours
    #[arg(long, default_value_t = goaltrack_core::time::DEFAULT_UTC_OFFSET_HOURS, allow_hyphen_values = true)]
    utc_offset: i32,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve requests on stdin/stdout
    Stdio,

    /// Serve requests on a Unix socket
    Socket {
        /// Socket path
        path: PathBuf,
    },

    /// Print server info
    Info,
}

fn init_logging() {
    // stdout carries responses, so logs always go to stderr.
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging();

    let config = RpcServerConfig {
        data_dir: cli.data.clone(),
        tenant: cli.tenant.map(TenantId::new),
        socket_path: match &cli.command {
            Commands::Socket { path } => Some(path.clone()),
            _ => None,
        },
        ..Default::default()
    };

    if let Commands::Info = cli.command {
        println!("{} RPC server v{}", config.server_name, config.version);
        println!("Transport: stdio / Unix socket");
        println!("Data: {}", config.data_dir.display());
        if let Some(tenant) = &config.tenant {
            println!("Tenant: {}", tenant);
        }
        return Ok(());
    }

    let engine_config = EngineConfig { utc_offset_hours: cli.utc_offset, ..Default::default() };
    let calendar = engine_config.calendar().context("invalid calendar settings")?;
    let storage = JsonStorage::new(&config.data_dir, config.tenant.as_ref(), calendar)
        .await
        .with_context(|| format!("failed to open data directory {}", config.data_dir.display()))?;

    let auth_path = cli.auth.unwrap_or_else(|| config.data_dir.join("auth.json"));
    let authorizer = if auth_path.exists() {
        StaticAuthorizer::load(&auth_path).with_context(|| format!("failed to load {}", auth_path.display()))?
    } else {
        warn!("No token table at {}; every authenticated call will be rejected", auth_path.display());
        StaticAuthorizer::new()
    };

    let context = EngineContext::with_calendar(storage, Arc::new(SystemClock), calendar);
    let service = GoalService::new(context, Arc::new(authorizer));
    let server = Arc::new(RpcServer::new(config, service));

    match cli.command {
        Commands::Stdio => server.start_with_stdio().await?,
        Commands::Socket { path } => {
            info!("Listening on {}", path.display());
            server.start_with_socket(&path).await?;
        }
        Commands::Info => {}
    }

    Ok(())
}
