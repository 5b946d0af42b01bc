//! Conversation State Service MCP server
//!
//! Single-binary service that:
//! 1. Loads OAuth client credentials and upstream settings
//! 2. Registers the conversation-state tools
//! 3. Serves MCP JSON-RPC over HTTP (`POST /mcp`) or, with `--stdio`,
//!    over stdin/stdout

mod config;
mod metrics;
mod server;
mod stdio;
mod tools;

use anyhow::{Context, Result};
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::Ordering;
use tokio::net::TcpListener;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use mcp_core::{DispatchServer, RpcHandler, ServerInfo, ToolRegistry};
use oauth_client::OAuthClient;
use upstream_client::AuthenticatedClient;

use crate::config::Config;
use crate::server::{AppState, DRAIN_TIMEOUT, ServiceMetrics, build_router};
use crate::tools::register_conversation_tools;
use crate::tools::upstream::ConversationApi;

/// Parsed command-line flags
#[derive(Debug, Default)]
struct CliArgs {
    config: Option<String>,
    listen: Option<String>,
    stdio: bool,
}

impl CliArgs {
    fn parse(args: &[String]) -> Self {
        let value_of = |flag: &str| {
            args.iter()
                .position(|a| a == flag)
                .and_then(|i| args.get(i + 1))
                .cloned()
        };
        Self {
            config: value_of("--config"),
            listen: value_of("--listen"),
            stdio: args.iter().any(|a| a == "--stdio"),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // JSON logs on stderr; stdout belongs to the stdio transport
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_env("LOG_LEVEL")
                .or_else(|_| EnvFilter::try_from_default_env())
                .unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
        .init();

    info!("starting conversation-state-mcp");

    // Install Prometheus metrics recorder before any metrics are emitted
    let prometheus_handle = metrics::install_recorder()?;

    let args: Vec<String> = std::env::args().collect();
    let cli = CliArgs::parse(&args);

    let config_path = Config::resolve_path(cli.config.as_deref());
    match &config_path {
        Some(path) => info!(path = %path.display(), "loading configuration"),
        None => info!(
            path = config::DEFAULT_CONFIG_PATH,
            "loading configuration from default path if present"
        ),
    }
    let mut config = Config::load(config_path.as_deref()).context("failed to load configuration")?;
    if let Some(listen) = &cli.listen {
        config.server.listen_addr = listen
            .parse::<SocketAddr>()
            .with_context(|| format!("invalid --listen address: {listen}"))?;
    }

    info!(
        listen_addr = %config.server.listen_addr,
        base_url = %config.upstream.base_url,
        token_endpoint = %config.oauth.token_endpoint,
        scope = %config.oauth.scope,
        stdio = cli.stdio,
        "configuration loaded"
    );

    let settings = config.http_settings();
    let credentials = config.credentials().context("incomplete OAuth credentials")?;
    let token_http = settings
        .build_client()
        .context("failed to build token HTTP client")?;
    let oauth = Arc::new(OAuthClient::new(credentials, token_http));
    let client = AuthenticatedClient::new(oauth.clone(), &settings)
        .context("failed to build upstream HTTP client")?;
    let api = ConversationApi::new(Arc::new(client), &config.upstream.base_url);

    let registry = Arc::new(ToolRegistry::new());
    register_conversation_tools(&registry, &api, &config.endpoints);
    let rpc = RpcHandler::new(
        DispatchServer::new(registry),
        ServerInfo {
            name: config.server.name.clone(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        },
    );

    if cli.stdio {
        info!("serving MCP over stdio");
        let stdin = tokio::io::BufReader::new(tokio::io::stdin());
        stdio::serve(&rpc, stdin, tokio::io::stdout())
            .await
            .context("stdio transport failed")?;
        info!("shutdown complete");
        return Ok(());
    }

    let metrics = ServiceMetrics::new();
    let in_flight = metrics.in_flight.clone();
    let app = build_router(
        AppState {
            rpc,
            oauth,
            metrics,
            prometheus: prometheus_handle,
        },
        config.server.max_connections,
    );

    let listen_addr = config.server.listen_addr;
    let listener = TcpListener::bind(listen_addr)
        .await
        .with_context(|| format!("failed to bind to {listen_addr}"))?;
    info!(addr = %listen_addr, "accepting MCP requests on /mcp");

    // The drain timeout starts when the shutdown signal fires, not when the
    // server starts.
    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();

    let server_handle = tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(async {
                let _ = shutdown_rx.await;
            })
            .await
    });

    shutdown_signal().await;
    let _ = shutdown_tx.send(());

    match tokio::time::timeout(DRAIN_TIMEOUT, server_handle).await {
        Ok(Ok(Ok(()))) => {
            info!("all in-flight requests drained");
        }
        Ok(Ok(Err(e))) => {
            error!(error = %e, "server error during shutdown");
        }
        Ok(Err(e)) => {
            error!(error = %e, "server task panicked");
        }
        Err(_) => {
            let remaining = in_flight.load(Ordering::Relaxed);
            warn!(
                remaining,
                drain_timeout_secs = DRAIN_TIMEOUT.as_secs(),
                "drain timeout exceeded, forcing shutdown"
            );
        }
    }

    info!("shutdown complete");
    Ok(())
}

/// Wait for SIGTERM or SIGINT for graceful shutdown.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("received SIGINT, shutting down"),
        _ = terminate => info!("received SIGTERM, shutting down"),
    }
}
