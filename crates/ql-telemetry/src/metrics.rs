//! Prometheus metrics for Quorum-Ledger nodes.
//!
//! All metrics follow the naming convention: `ql_<component>_<metric>_<unit>`

use lazy_static::lazy_static;
use prometheus::{
    exponential_buckets, Counter, CounterVec, Encoder, Gauge, Histogram, HistogramOpts, Opts,
    Registry, TextEncoder,
};

use crate::TelemetryError;

lazy_static! {
    /// Global metrics registry
    pub static ref REGISTRY: Registry = Registry::new();

    // =========================================================================
    // LEDGER
    // =========================================================================

    /// Blocks on the local chain, genesis included
    pub static ref CHAIN_HEIGHT: Gauge = Gauge::new(
        "ql_ledger_chain_height",
        "Number of blocks on the local chain"
    ).expect("metric creation failed");

    // =========================================================================
    // CONSENSUS
    // =========================================================================

    /// Blocks this node finalized through voting
    pub static ref BLOCKS_FINALIZED: Counter = Counter::new(
        "ql_consensus_blocks_finalized_total",
        "Total number of blocks finalized by local proposals"
    ).expect("metric creation failed");

    /// Proposal outcomes
    pub static ref PROPOSALS: CounterVec = CounterVec::new(
        Opts::new("ql_consensus_proposals_total", "Block proposals by outcome"),
        &["outcome"]  // finalized/queued/failed
    ).expect("metric creation failed");

    /// Phases that missed quorum within the vote window
    pub static ref QUORUM_TIMEOUTS: Counter = Counter::new(
        "ql_consensus_quorum_timeouts_total",
        "Proposals parked in the retry queue"
    ).expect("metric creation failed");

    /// Votes accepted from peers
    pub static ref VOTES_RECORDED: CounterVec = CounterVec::new(
        Opts::new("ql_consensus_votes_recorded_total", "Peer votes recorded by phase"),
        &["phase"]
    ).expect("metric creation failed");

    /// Retry queue depth
    pub static ref RETRY_QUEUE_DEPTH: Gauge = Gauge::new(
        "ql_consensus_retry_queue_depth",
        "Proposals waiting for another attempt"
    ).expect("metric creation failed");

    /// Time from proposal to outcome
    pub static ref PROPOSAL_DURATION: Histogram = Histogram::with_opts(
        HistogramOpts::new(
            "ql_consensus_proposal_duration_seconds",
            "Time spent driving a proposal through the voting phases"
        ).buckets(exponential_buckets(0.001, 2.0, 15).expect("valid buckets"))
    ).expect("metric creation failed");

    // =========================================================================
    // PEER SYNC
    // =========================================================================

    /// Blocks received from peers
    pub static ref BLOCKS_RECEIVED: CounterVec = CounterVec::new(
        Opts::new("ql_sync_blocks_received_total", "Blocks received from peers by outcome"),
        &["outcome"]  // appended/duplicate/reorganized/genesis/rejected
    ).expect("metric creation failed");

    /// Forks resolved by truncating to a common ancestor
    pub static ref FORKS_RECONCILED: Counter = Counter::new(
        "ql_sync_forks_reconciled_total",
        "Total fork reconciliations"
    ).expect("metric creation failed");

    /// Outbound peer requests that failed or timed out
    pub static ref PEER_SEND_FAILURES: Counter = Counter::new(
        "ql_sync_peer_send_failures_total",
        "Outbound peer requests that failed"
    ).expect("metric creation failed");

    // =========================================================================
    // MEMPOOL & REGISTRY
    // =========================================================================

    /// Pending transactions
    pub static ref MEMPOOL_SIZE: Gauge = Gauge::new(
        "ql_mempool_transactions_pending",
        "Number of pending transactions in mempool"
    ).expect("metric creation failed");

    /// Submissions by result
    pub static ref TRANSACTIONS_SUBMITTED: CounterVec = CounterVec::new(
        Opts::new("ql_mempool_transactions_submitted_total", "Transaction submissions by result"),
        &["result"]  // accepted/rejected
    ).expect("metric creation failed");

    /// Validators seen within the liveness window
    pub static ref ACTIVE_VALIDATORS: Gauge = Gauge::new(
        "ql_registry_active_validators",
        "Validators seen within the liveness window"
    ).expect("metric creation failed");

    // =========================================================================
    // RUNTIME
    // =========================================================================

    /// Current adaptive heartbeat interval
    pub static ref HEARTBEAT_INTERVAL: Gauge = Gauge::new(
        "ql_runtime_heartbeat_interval_seconds",
        "Current heartbeat interval"
    ).expect("metric creation failed");
}

/// Handle proving the metrics were registered.
#[derive(Debug, Clone, Copy)]
pub struct MetricsHandle {
    _private: (),
}

/// Register all metrics with the global registry. Safe to call more than once.
pub fn register_metrics() -> Result<MetricsHandle, TelemetryError> {
    let metrics: Vec<Box<dyn prometheus::core::Collector>> = vec![
        Box::new(CHAIN_HEIGHT.clone()),
        Box::new(BLOCKS_FINALIZED.clone()),
        Box::new(PROPOSALS.clone()),
        Box::new(QUORUM_TIMEOUTS.clone()),
        Box::new(VOTES_RECORDED.clone()),
        Box::new(RETRY_QUEUE_DEPTH.clone()),
        Box::new(PROPOSAL_DURATION.clone()),
        Box::new(BLOCKS_RECEIVED.clone()),
        Box::new(FORKS_RECONCILED.clone()),
        Box::new(PEER_SEND_FAILURES.clone()),
        Box::new(MEMPOOL_SIZE.clone()),
        Box::new(TRANSACTIONS_SUBMITTED.clone()),
        Box::new(ACTIVE_VALIDATORS.clone()),
        Box::new(HEARTBEAT_INTERVAL.clone()),
    ];

    for metric in metrics {
        match REGISTRY.register(metric) {
            Ok(()) | Err(prometheus::Error::AlreadyReg) => {}
            Err(e) => return Err(TelemetryError::MetricsInit(e.to_string())),
        }
    }

    Ok(MetricsHandle { _private: () })
}

/// Encode all metrics as Prometheus text format.
pub fn encode_metrics() -> Result<String, TelemetryError> {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    encoder
        .encode(&metric_families, &mut buffer)
        .map_err(|e| TelemetryError::MetricsInit(e.to_string()))?;
    String::from_utf8(buffer).map_err(|e| TelemetryError::MetricsInit(e.to_string()))
}

/// Timer guard for automatic histogram observation.
pub struct HistogramTimer {
    histogram: Histogram,
    start: std::time::Instant,
}

impl HistogramTimer {
    /// Start a new timer for the given histogram.
    pub fn new(histogram: &Histogram) -> Self {
        Self {
            histogram: histogram.clone(),
            start: std::time::Instant::now(),
        }
    }
}

impl Drop for HistogramTimer {
    fn drop(&mut self) {
        let duration = self.start.elapsed().as_secs_f64();
        self.histogram.observe(duration);
    }
}

/// Start timing for a histogram. Observation happens on drop.
#[macro_export]
macro_rules! time_histogram {
    ($histogram:expr) => {
        $crate::metrics::HistogramTimer::new(&$histogram)
    };
}
