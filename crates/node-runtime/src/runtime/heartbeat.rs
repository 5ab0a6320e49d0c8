//! # Heartbeat
//!
//! The node's pulse. Each beat:
//!
//! 1. refreshes our own `last_seen` and uptime
//! 2. re-drives proposals waiting in the retry queue
//! 3. proposes a block if we are the selected proposer and the mempool is
//!    non-empty
//!
//! The sleep between beats shrinks as the network finalizes more blocks:
//!
//! ```text
//! interval = max - (max - min) * min(recent / saturation, 1)
//! ```

use crate::container::config::HeartbeatSettings;
use crate::container::NodeContainer;
use parking_lot::Mutex;
use ql_02_mempool::MempoolApi;
use ql_03_validator_registry::RegistryApi;
use ql_telemetry::metrics::{ACTIVE_VALIDATORS, HEARTBEAT_INTERVAL, MEMPOOL_SIZE};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::Instant;

/// Finalizations seen within a sliding window.
#[derive(Debug)]
pub struct FinalizationWindow {
    window: Duration,
    stamps: Mutex<VecDeque<Instant>>,
    total: AtomicU64,
}

impl FinalizationWindow {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            stamps: Mutex::new(VecDeque::new()),
            total: AtomicU64::new(0),
        }
    }

    pub fn record(&self) {
        let now = Instant::now();
        let mut stamps = self.stamps.lock();
        stamps.push_back(now);
        Self::expire(&mut stamps, now, self.window);
        self.total.fetch_add(1, Ordering::Relaxed);
    }

    /// Finalizations within the window.
    pub fn recent(&self) -> usize {
        let mut stamps = self.stamps.lock();
        Self::expire(&mut stamps, Instant::now(), self.window);
        stamps.len()
    }

    /// Finalizations since start.
    pub fn total(&self) -> u64 {
        self.total.load(Ordering::Relaxed)
    }

    fn expire(stamps: &mut VecDeque<Instant>, now: Instant, window: Duration) {
        while stamps
            .front()
            .is_some_and(|t| now.saturating_duration_since(*t) > window)
        {
            stamps.pop_front();
        }
    }
}

/// Sleep before the next beat, given `recent` finalizations.
pub fn adaptive_interval(settings: &HeartbeatSettings, recent: usize) -> Duration {
    let saturation = settings.saturation_blocks.max(1) as f64;
    let ratio = (recent as f64 / saturation).min(1.0);
    let span = settings.max_interval.saturating_sub(settings.min_interval);
    settings.max_interval.saturating_sub(span.mul_f64(ratio))
}

/// What one beat did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BeatReport {
    /// Queued proposals that finalized on retry.
    pub retried: usize,
    /// Outdated proposals rebuilt on the current tip.
    pub rebuilt: usize,
    /// Outdated proposals whose transactions were already on chain.
    pub dropped: usize,
    /// `(finalized, index)` of the block proposed this beat, if any.
    pub proposed: Option<(bool, u64)>,
    pub next_interval: Duration,
}

pub struct Heartbeat {
    node: Arc<NodeContainer>,
    last_total: u64,
}

impl Heartbeat {
    pub fn new(node: Arc<NodeContainer>) -> Self {
        Self {
            node,
            last_total: 0,
        }
    }

    pub async fn beat(&mut self) -> BeatReport {
        let node = &self.node;
        let local = node.local_id().clone();

        let total = node.activity.total();
        let online = total > self.last_total;
        self.last_total = total;
        if let Err(e) = node
            .registry
            .touch(&local)
            .and_then(|_| node.registry.update_uptime(&local, online))
        {
            tracing::warn!("[runtime] ⚠️ Could not refresh own registry entry: {}", e);
        }

        let retry = node.retry_pending().await;
        let mut report = BeatReport {
            retried: retry.finalized.len(),
            rebuilt: retry.rebuilt.len(),
            dropped: retry.dropped.len(),
            ..BeatReport::default()
        };

        let proposer = node.registry.select_proposer();
        if proposer.as_ref() == Some(&local) && !node.mempool.is_empty() {
            let transactions = node
                .mempool
                .drain(node.config.consensus.max_block_transactions);
            match node.propose_block(transactions).await {
                Ok((finalized, block)) => report.proposed = Some((finalized, block.index)),
                Err(e) => tracing::warn!("[runtime] ❌ Proposal failed: {}", e),
            }
        } else if let Some(proposer) = proposer.filter(|p| *p != local) {
            tracing::trace!("[runtime] 💤 {} holds the proposer slot", proposer);
        }

        report.next_interval = adaptive_interval(&node.config.heartbeat, node.activity.recent());
        HEARTBEAT_INTERVAL.set(report.next_interval.as_secs_f64());
        ACTIVE_VALIDATORS.set(node.registry.active_nodes().len() as f64);
        MEMPOOL_SIZE.set(node.mempool.len() as f64);
        tracing::debug!(
            "[runtime] 💓 Beat: retried {}, rebuilt {}, dropped {}, proposed {:?}, next in {:?}",
            report.retried,
            report.rebuilt,
            report.dropped,
            report.proposed,
            report.next_interval
        );
        report
    }

    /// Beat until `shutdown` flips to `true`.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) {
        tracing::info!("[runtime] 💓 Heartbeat started");
        loop {
            if *shutdown.borrow() {
                break;
            }
            let report = self.beat().await;
            tokio::select! {
                _ = tokio::time::sleep(report.next_interval) => {}
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
            }
        }
        tracing::info!("[runtime] Heartbeat stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings() -> HeartbeatSettings {
        HeartbeatSettings {
            min_interval: Duration::from_secs(10),
            max_interval: Duration::from_secs(30),
            activity_window: Duration::from_secs(300),
            saturation_blocks: 30,
        }
    }

    #[test]
    fn test_idle_network_uses_max_interval() {
        assert_eq!(adaptive_interval(&settings(), 0), Duration::from_secs(30));
    }

    #[test]
    fn test_interval_shrinks_with_activity() {
        assert_eq!(adaptive_interval(&settings(), 15), Duration::from_secs(20));
        assert_eq!(adaptive_interval(&settings(), 30), Duration::from_secs(10));
        assert_eq!(adaptive_interval(&settings(), 500), Duration::from_secs(10));
    }

    #[tokio::test(start_paused = true)]
    async fn test_window_forgets_old_finalizations() {
        let window = FinalizationWindow::new(Duration::from_secs(300));
        window.record();
        window.record();
        tokio::time::advance(Duration::from_secs(200)).await;
        window.record();
        assert_eq!(window.recent(), 3);

        tokio::time::advance(Duration::from_secs(150)).await;
        assert_eq!(window.recent(), 1);
        assert_eq!(window.total(), 3);
    }
}
