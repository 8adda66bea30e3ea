//! # helm-agent
//!
//! Helm gateway server binary — loads settings, wires the session store,
//! tool broker, model gateway, run controller, and RPC surface together,
//! and serves the WebSocket control plane until a shutdown signal arrives.

#![deny(unsafe_code)]

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;

use helm_llm::{AnthropicConfig, AnthropicGateway};
use helm_rpc::context::RpcContext;
use helm_rpc::registry::MethodRegistry;
use helm_runtime::{ControllerConfig, RunController};
use helm_server::{GatewayServer, ServerConfig};
use helm_sessions::SessionStore;
use helm_settings::{HelmSettings, ToolsSettings};
use helm_tools::{BrowserTool, FilesystemTool, ShellTool, ToolBroker, ToolPolicy};

/// Helm gateway server.
#[derive(Parser, Debug)]
#[command(name = "helm-agent", about = "Helm agent gateway server")]
struct Cli {
    /// Host to bind (overrides settings).
    #[arg(long)]
    host: Option<String>,

    /// Port to bind (overrides settings; 0 for auto-assign).
    #[arg(long)]
    port: Option<u16>,

    /// Path to a settings file (defaults to `~/.helm/settings.json`).
    #[arg(long)]
    config: Option<PathBuf>,

    /// Directory session transcripts are persisted under.
    #[arg(long)]
    sessions_dir: Option<PathBuf>,

    /// Model ID handed to the model gateway.
    #[arg(long)]
    model: Option<String>,

    /// Require this bearer token from every client.
    #[arg(long)]
    auth_token: Option<String>,
}

fn load_settings(cli: &Cli) -> Result<HelmSettings> {
    let mut settings = match &cli.config {
        Some(path) => helm_settings::load_settings_from_path(path)
            .with_context(|| format!("failed to load settings from {}", path.display()))?,
        None => helm_settings::load_settings().context("failed to load settings")?,
    };

    if let Some(host) = &cli.host {
        settings.server.host.clone_from(host);
    }
    if let Some(port) = cli.port {
        settings.server.port = port;
    }
    if let Some(dir) = &cli.sessions_dir {
        settings.server.sessions_dir = dir.display().to_string();
    }
    if let Some(model) = &cli.model {
        settings.agent.model.clone_from(model);
    }
    if let Some(token) = &cli.auth_token {
        settings.server.auth.mode = helm_settings::AuthMode::Token;
        settings.server.auth.token = Some(token.clone());
    }
    Ok(settings)
}

/// Build the broker with the built-in tools and the configured policy.
fn build_broker(tools: &ToolsSettings, tool_timeout: Duration) -> Result<ToolBroker> {
    let mut broker = ToolBroker::new().with_default_timeout(tool_timeout);
    broker.register(Arc::new(ShellTool::new(
        tools.shell_timeout_ms,
        tools.max_output_bytes,
    )));
    broker.register(Arc::new(FilesystemTool::default()));
    broker.register(Arc::new(BrowserTool::new(tools.max_output_bytes)));

    let shared = ToolPolicy::new(true, &tools.allow, &tools.deny)
        .context("invalid tool policy pattern")?;
    for name in broker.names() {
        if tools.disabled.contains(&name) {
            broker.set_policy(name, ToolPolicy::disabled());
        } else {
            broker.set_policy(name, shared.clone());
        }
    }
    Ok(broker)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let settings = load_settings(&cli)?;
    helm_logging::init(&settings.logging);

    let store = Arc::new(
        SessionStore::open(&settings.server.sessions_dir).with_context(|| {
            format!("failed to open session store at {}", settings.server.sessions_dir)
        })?,
    );

    let broker = build_broker(
        &settings.tools,
        Duration::from_secs(settings.agent.tool_timeout_secs),
    )?;

    let api_key = std::env::var("ANTHROPIC_API_KEY").unwrap_or_default();
    let gateway = Arc::new(AnthropicGateway::new(AnthropicConfig {
        api_key,
        model: settings.agent.model.clone(),
        base_url: None,
        max_tokens: None,
    }));

    let controller = Arc::new(RunController::new(
        store.clone(),
        gateway,
        Arc::new(broker),
        ControllerConfig::from_settings(&settings.agent, &settings.tools),
    ));

    let mut registry = MethodRegistry::new()
        .with_handler_timeout(Duration::from_secs(settings.server.request_timeout_secs));
    helm_rpc::handlers::register_all(&mut registry);

    let rpc = RpcContext::new(controller, store);
    let server = GatewayServer::new(
        ServerConfig::from_settings(&settings.server),
        registry,
        rpc,
    );

    info!(
        host = settings.server.host,
        port = settings.server.port,
        model = settings.agent.model,
        auth = ?settings.server.auth.mode,
        "starting helm gateway"
    );

    let shutdown = server.shutdown().clone();
    let _signal_task = tokio::spawn(async move {
        wait_for_shutdown_signal().await;
        info!("shutdown signal received");
        shutdown.shutdown();
    });

    server.serve().await.context("server failed")?;
    info!("gateway stopped");
    Ok(())
}

async fn wait_for_shutdown_signal() {
    #[cfg(unix)]
    {
        let mut term = match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
        {
            Ok(signal) => signal,
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler");
                let _ = tokio::signal::ctrl_c().await;
                return;
            }
        };
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {}
            _ = term.recv() => {}
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}
