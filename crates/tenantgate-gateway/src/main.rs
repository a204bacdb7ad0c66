//! TenantGate Gateway Server

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tokio::net::TcpListener;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use tenantgate_gateway::storage::{MemoryTenantStore, MemoryTokenStore, StoreError, TokenStore};
use tenantgate_gateway::{http, AppState, BootstrapCoordinator, Config};

/// TenantGate gateway: onboards agents through the bootstrap handshake.
#[derive(Parser, Debug)]
#[command(name = "tenantgate-gateway", about = "TenantGate bootstrap gateway")]
struct Args {
    /// HTTP server address
    #[arg(long, default_value = "[::1]:8443")]
    bind_addr: String,

    /// Path to the PKCS#8 PEM identity key
    #[arg(long)]
    identity_key: Option<PathBuf>,

    /// Path to the bootstrap token file (JSON array)
    #[arg(long)]
    token_file: Option<PathBuf>,

    /// Do not mount the bootstrap routes
    #[arg(long)]
    disable_bootstrap: bool,

    /// Storage call timeout in milliseconds
    #[arg(long, default_value = "5000")]
    store_timeout_ms: u64,
}

impl From<Args> for Config {
    fn from(args: Args) -> Self {
        Self {
            bind_addr: args.bind_addr,
            identity_key_path: args.identity_key,
            token_file: args.token_file,
            bootstrap_enabled: !args.disable_bootstrap,
            store_timeout: Duration::from_millis(args.store_timeout_ms),
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .init();

    let config = Config::from(Args::parse());
    let addr: SocketAddr = config.bind_addr.parse()?;

    let identity = config.load_identity()?;
    info!(
        public_key = %hex::encode(identity.public_key().as_bytes()),
        "Gateway identity ready"
    );

    let tokens = Arc::new(MemoryTokenStore::new());
    for token in config.load_tokens()? {
        let token_id = token.hex_id();
        match tokens.create_token(token).await {
            Ok(()) => {}
            Err(StoreError::AlreadyExists(_)) => {
                warn!(token_id = %token_id, "Duplicate bootstrap token ignored");
            }
            Err(e) => return Err(e.into()),
        }
    }
    let active = tokens.list_active_tokens().await?.len();
    if active == 0 {
        warn!("No active bootstrap tokens; join requests will be refused");
    }
    info!(active_tokens = active, "Bootstrap tokens loaded");

    let coordinator = BootstrapCoordinator::new(
        Arc::new(identity),
        tokens,
        Arc::new(MemoryTenantStore::new()),
        config.store_timeout,
    );
    let state = AppState::new(coordinator, config.bootstrap_enabled);
    let router = http::create_router(state);

    let listener = TcpListener::bind(addr).await?;
    info!(
        addr = %addr,
        bootstrap_enabled = config.bootstrap_enabled,
        "Gateway listening"
    );

    if let Err(e) = axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        error!(error = %e, "HTTP server error");
        return Err(e.into());
    }

    info!("Gateway stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}
