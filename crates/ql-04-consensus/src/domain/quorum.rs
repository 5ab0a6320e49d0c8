//! Quorum thresholds and the vote tally.

use shared_types::{Hash, NodeId, Vote, VotePhase};
use std::collections::{BTreeMap, BTreeSet, HashMap};

/// Votes needed from a slice of `slice_size` members: `floor(n/2) + 1`.
pub fn quorum_threshold(slice_size: usize) -> usize {
    slice_size / 2 + 1
}

/// Append-only vote store keyed by `(block_hash, phase, voter)`.
///
/// Inserting the same key twice keeps the first vote, so concurrent or
/// repeated delivery never double-counts.
#[derive(Debug, Default)]
pub struct VoteTally {
    votes: HashMap<(Hash, VotePhase), BTreeMap<NodeId, Vote>>,
}

impl VoteTally {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `vote`. Returns `false` if this voter already voted this phase.
    pub fn insert(&mut self, vote: Vote) -> bool {
        let voters = self.votes.entry((vote.block_hash, vote.phase)).or_default();
        if voters.contains_key(&vote.voter) {
            return false;
        }
        voters.insert(vote.voter.clone(), vote);
        true
    }

    pub fn has_voted(&self, hash: &Hash, phase: VotePhase, voter: &NodeId) -> bool {
        self.votes
            .get(&(*hash, phase))
            .is_some_and(|v| v.contains_key(voter))
    }

    /// Distinct slice members with a `phase` vote on `hash`.
    pub fn count_in_slice(&self, hash: &Hash, phase: VotePhase, slice: &BTreeSet<NodeId>) -> usize {
        self.votes
            .get(&(*hash, phase))
            .map(|voters| voters.keys().filter(|v| slice.contains(*v)).count())
            .unwrap_or(0)
    }

    /// True once the slice has reached threshold for `phase`.
    pub fn is_quorate(&self, hash: &Hash, phase: VotePhase, slice: &BTreeSet<NodeId>) -> bool {
        !slice.is_empty() && self.count_in_slice(hash, phase, slice) >= quorum_threshold(slice.len())
    }

    /// Drop every vote for `hash`.
    pub fn forget(&mut self, hash: &Hash) {
        self.votes.retain(|(h, _), _| h != hash);
    }

    pub fn voters(&self, hash: &Hash, phase: VotePhase) -> Vec<NodeId> {
        self.votes
            .get(&(*hash, phase))
            .map(|v| v.keys().cloned().collect())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn slice(ids: &[&str]) -> BTreeSet<NodeId> {
        ids.iter().map(|s| NodeId::from(*s)).collect()
    }

    fn vote(voter: &str, phase: VotePhase) -> Vote {
        Vote::new(Hash([1; 32]), phase, NodeId::from(voter), 0)
    }

    #[test]
    fn test_threshold_values() {
        assert_eq!(quorum_threshold(1), 1);
        assert_eq!(quorum_threshold(2), 2);
        assert_eq!(quorum_threshold(3), 2);
        assert_eq!(quorum_threshold(4), 3);
        assert_eq!(quorum_threshold(5), 3);
    }

    #[test]
    fn test_duplicate_vote_is_idempotent() {
        let mut tally = VoteTally::new();
        assert!(tally.insert(vote("N1", VotePhase::Nominate)));
        assert!(!tally.insert(vote("N1", VotePhase::Nominate)));
        assert!(tally.insert(vote("N1", VotePhase::Vote)));

        let s = slice(&["N1", "N2", "N3"]);
        assert_eq!(tally.count_in_slice(&Hash([1; 32]), VotePhase::Nominate, &s), 1);
    }

    #[test]
    fn test_quorum_reached_exactly_at_threshold() {
        let mut tally = VoteTally::new();
        let s = slice(&["N1", "N2", "N3", "N4"]);
        let h = Hash([1; 32]);

        tally.insert(vote("N1", VotePhase::Nominate));
        tally.insert(vote("N2", VotePhase::Nominate));
        assert!(!tally.is_quorate(&h, VotePhase::Nominate, &s));

        tally.insert(vote("N3", VotePhase::Nominate));
        assert!(tally.is_quorate(&h, VotePhase::Nominate, &s));
    }

    #[test]
    fn test_votes_outside_slice_do_not_count() {
        let mut tally = VoteTally::new();
        let s = slice(&["N1", "N2", "N3"]);
        tally.insert(vote("X1", VotePhase::Accept));
        tally.insert(vote("X2", VotePhase::Accept));
        assert!(!tally.is_quorate(&Hash([1; 32]), VotePhase::Accept, &s));
    }

    #[test]
    fn test_empty_slice_never_quorate() {
        let tally = VoteTally::new();
        assert!(!tally.is_quorate(&Hash([1; 32]), VotePhase::Nominate, &BTreeSet::new()));
    }

    #[test]
    fn test_forget_clears_all_phases() {
        let mut tally = VoteTally::new();
        tally.insert(vote("N1", VotePhase::Nominate));
        tally.insert(vote("N1", VotePhase::Confirm));
        tally.forget(&Hash([1; 32]));
        assert!(tally.voters(&Hash([1; 32]), VotePhase::Confirm).is_empty());
    }
}
