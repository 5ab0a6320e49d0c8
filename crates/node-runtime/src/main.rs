//! # Quorum-Ledger Node
//!
//! ## Startup sequence
//!
//! 1. Load configuration (file, then `QL_*` environment, then flags)
//! 2. Install logging and metrics
//! 3. Open the ledger and registry, repairing the chain file if needed
//! 4. Bind the HTTP listener and start heartbeat and discovery
//! 5. Run until ctrl-c, then shut down gracefully

use anyhow::{Context, Result};
use clap::Parser;
use node_runtime::{NodeConfig, NodeContainer, NodeRuntime};
use ql_telemetry::{init_telemetry, TelemetryConfig};
use shared_types::NodeId;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::net::TcpListener;

#[derive(Debug, Parser)]
#[command(name = "quorum-node", version, about = "Quorum-Ledger validator node")]
struct Cli {
    /// TOML configuration file.
    #[arg(short, long, env = "QL_CONFIG")]
    config: Option<PathBuf>,

    /// Overrides `node.id`.
    #[arg(long)]
    node_id: Option<String>,

    /// Overrides `node.listen_addr`.
    #[arg(long)]
    listen: Option<SocketAddr>,

    /// Overrides `node.data_dir`.
    #[arg(long)]
    data_dir: Option<PathBuf>,
}

impl Cli {
    fn into_config(self) -> Result<NodeConfig> {
        let mut config =
            NodeConfig::load(self.config.as_deref()).context("Failed to load configuration")?;
        if let Some(id) = self.node_id {
            config.node.id = NodeId::new(id);
        }
        if let Some(listen) = self.listen {
            config.node.listen_addr = listen;
        }
        if let Some(dir) = self.data_dir {
            config.node.data_dir = dir;
        }
        config.validate().context("Invalid configuration")?;
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = Cli::parse().into_config()?;

    let _telemetry = init_telemetry(TelemetryConfig::for_node(config.node.id.as_str()))
        .context("Failed to initialize telemetry")?;

    let listen = config.node.listen_addr;
    let container = match NodeContainer::build(config) {
        Ok(container) => Arc::new(container),
        Err(e) => {
            tracing::error!("[runtime] ❌ Startup failed: {}", e);
            return Err(e).context("Failed to build node");
        }
    };

    let listener = TcpListener::bind(listen)
        .await
        .with_context(|| format!("Failed to bind {listen}"))?;
    let runtime = NodeRuntime::new(container);
    runtime.start(listener).await?;

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for ctrl-c")?;
    runtime.shutdown().await;
    Ok(())
}
