//! Deterministic proposer selection.

use super::node::ValidatorNode;
use shared_types::{NodeId, Timestamp};

/// Highest `trust * uptime` among live nodes; lowest id on ties.
pub fn select_proposer<'a, I>(nodes: I, now: Timestamp, window: u64) -> Option<NodeId>
where
    I: IntoIterator<Item = &'a ValidatorNode>,
{
    let mut best: Option<(&ValidatorNode, f64)> = None;
    for node in nodes.into_iter().filter(|n| n.is_live(now, window)) {
        let score = node.reputation();
        best = match best {
            None => Some((node, score)),
            Some((current, current_score)) => {
                if score > current_score || (score == current_score && node.id < current.id) {
                    Some((node, score))
                } else {
                    Some((current, current_score))
                }
            }
        };
    }
    best.map(|(node, _)| node.id.clone())
}
