//! # Node Runtime
//!
//! Supervises the node's background tasks:
//!
//! | Task | Period | Work |
//! |------|--------|------|
//! | HTTP server | - | peer messages and queries |
//! | heartbeat | adaptive | retries, proposer duty |
//! | discovery | `discovery.interval` | ping peers, merge new ones |
//!
//! Every task watches one shutdown channel and exits at its next check;
//! requests already in flight finish or time out on their own.

pub mod discovery;
pub mod heartbeat;

pub use discovery::{Discovery, DiscoveryReport};
pub use heartbeat::{adaptive_interval, BeatReport, FinalizationWindow, Heartbeat};

use crate::container::NodeContainer;
use crate::http;
use anyhow::{Context, Result};
use parking_lot::Mutex;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Grace period for tasks to observe the shutdown signal.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

pub struct NodeRuntime {
    container: Arc<NodeContainer>,
    shutdown_tx: watch::Sender<bool>,
    shutdown_rx: watch::Receiver<bool>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl NodeRuntime {
    pub fn new(container: Arc<NodeContainer>) -> Self {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        Self {
            container,
            shutdown_tx,
            shutdown_rx,
            tasks: Mutex::new(Vec::new()),
        }
    }

    pub fn container(&self) -> &Arc<NodeContainer> {
        &self.container
    }

    /// Serve on `listener` and start the background loops.
    ///
    /// Returns the bound address.
    pub async fn start(&self, listener: TcpListener) -> Result<SocketAddr> {
        let addr = listener
            .local_addr()
            .context("Listener has no local address")?;
        let node = &self.container;

        tracing::info!("===========================================");
        tracing::info!("  Quorum-Ledger node {}", node.local_id());
        tracing::info!("  Listening on {}", addr);
        tracing::info!("  Data dir: {}", node.config.node.data_dir.display());
        tracing::info!("===========================================");

        let router = http::router(Arc::clone(node));
        let mut shutdown = self.shutdown_rx.clone();
        let server = tokio::spawn(async move {
            let result = axum::serve(listener, router)
                .with_graceful_shutdown(async move {
                    while !*shutdown.borrow() {
                        if shutdown.changed().await.is_err() {
                            break;
                        }
                    }
                })
                .await;
            if let Err(e) = result {
                tracing::error!("[runtime] ❌ HTTP server failed: {}", e);
            }
        });

        let heartbeat = Heartbeat::new(Arc::clone(node));
        let heartbeat = tokio::spawn(heartbeat.run(self.shutdown_rx.clone()));

        let discovery = Discovery::new(Arc::clone(node));
        let discovery = tokio::spawn(discovery.run(self.shutdown_rx.clone()));

        self.tasks.lock().extend([server, heartbeat, discovery]);
        Ok(addr)
    }

    /// Signal every task to stop and wait for them, bounded by a grace period.
    pub async fn shutdown(&self) {
        tracing::info!("[runtime] Initiating graceful shutdown...");
        if self.shutdown_tx.send(true).is_err() {
            tracing::debug!("[runtime] No task was listening for shutdown");
        }

        let tasks: Vec<JoinHandle<()>> = std::mem::take(&mut *self.tasks.lock());
        let drained = tokio::time::timeout(SHUTDOWN_GRACE, futures::future::join_all(tasks)).await;
        if drained.is_err() {
            tracing::warn!(
                "[runtime] ⚠️ Tasks still running after {:?}; exiting anyway",
                SHUTDOWN_GRACE
            );
        }
        tracing::info!("[runtime] Shutdown complete");
    }
}
