//! # Ledger Store Service Tests

use super::*;
use crate::adapters::{InMemoryChainStore, JsonFileChainStore};
use shared_crypto::{sign_block, Ed25519KeyPair, Ed25519Verifier, Signer};
use shared_types::{NodeId, PublicKey, Transaction};
use std::collections::HashMap;
use tempfile::TempDir;

#[derive(Default)]
struct StaticKeys(HashMap<NodeId, PublicKey>);

impl KeyDirectory for StaticKeys {
    fn public_key(&self, id: &NodeId) -> Option<PublicKey> {
        self.0.get(id).copied()
    }
}

struct Fixture {
    signer: Ed25519KeyPair,
    keys: Arc<StaticKeys>,
}

impl Fixture {
    fn new() -> Self {
        let signer = Ed25519KeyPair::from_seed(NodeId::from("N1"), [1u8; 32]);
        let mut keys = StaticKeys::default();
        keys.0.insert(NodeId::from("N1"), signer.public_key());
        Self {
            signer,
            keys: Arc::new(keys),
        }
    }

    fn store<P: ChainPersistence>(
        &self,
        persistence: P,
    ) -> LedgerResult<LedgerStore<P, StaticKeys, Ed25519Verifier>> {
        LedgerStore::open(
            Arc::new(persistence),
            self.keys.clone(),
            Arc::new(Ed25519Verifier),
        )
    }

    fn child(&self, parent: &Block, amount: f64) -> Block {
        let mut block = Block::new(
            parent.index + 1,
            parent.hash,
            parent.timestamp + 10,
            vec![Transaction::new("alice", "bob", amount, parent.timestamp + 5)],
            NodeId::from("N1"),
        );
        sign_block(&mut block, &self.signer);
        block
    }
}

fn make_test_service(
    fx: &Fixture,
) -> LedgerStore<InMemoryChainStore, StaticKeys, Ed25519Verifier> {
    fx.store(InMemoryChainStore::new()).unwrap()
}

#[test]
fn test_open_bootstraps_genesis() {
    let fx = Fixture::new();
    let store = make_test_service(&fx);

    assert_eq!(store.len(), 1);
    assert!(store.tip().is_canonical_genesis());
    assert!(store.validate_chain());
}

#[test]
fn test_append_valid_block() {
    let fx = Fixture::new();
    let store = make_test_service(&fx);
    let block = fx.child(&store.tip(), 5.0);

    store.append(block.clone()).unwrap();

    assert_eq!(store.len(), 2);
    assert_eq!(store.tip(), block);
    assert_eq!(store.position_of(&block.hash), Some(1));
}

#[test]
fn test_append_persists_before_visible() {
    let fx = Fixture::new();
    let persistence = Arc::new(InMemoryChainStore::new());
    let store = LedgerStore::open(
        persistence.clone(),
        fx.keys.clone(),
        Arc::new(Ed25519Verifier),
    )
    .unwrap();
    let block = fx.child(&store.tip(), 1.0);

    store.append(block.clone()).unwrap();

    assert_eq!(persistence.saved().unwrap().last(), Some(&block));
}

#[test]
fn test_check_candidate_does_not_append() {
    let fx = Fixture::new();
    let store = make_test_service(&fx);
    let block = fx.child(&store.tip(), 5.0);

    assert_eq!(store.check_candidate(&block), Ok(()));
    assert_eq!(store.len(), 1);
}

#[test]
fn test_append_index_mismatch() {
    let fx = Fixture::new();
    let store = make_test_service(&fx);
    let a = fx.child(&store.tip(), 1.0);
    let b = fx.child(&a, 2.0);

    let result = store.append(b);
    assert_eq!(
        result,
        Err(LedgerError::IndexMismatch {
            expected: 1,
            actual: 2
        })
    );
    assert_eq!(store.len(), 1);
}

#[test]
fn test_append_prev_hash_mismatch() {
    let fx = Fixture::new();
    let store = make_test_service(&fx);
    let stranger = Block::new(0, Hash([3; 32]), 0, vec![], NodeId::genesis());
    let block = fx.child(&stranger, 1.0);

    assert!(matches!(
        store.append(block),
        Err(LedgerError::PrevHashMismatch { index: 1, .. })
    ));
}

#[test]
fn test_append_hash_invalid() {
    let fx = Fixture::new();
    let store = make_test_service(&fx);
    let mut block = fx.child(&store.tip(), 1.0);
    block.timestamp += 1;
    sign_block(&mut block, &fx.signer);

    assert!(matches!(
        store.append(block),
        Err(LedgerError::HashInvalid { index: 1, .. })
    ));
}

#[test]
fn test_append_unsigned_block_rejected() {
    let fx = Fixture::new();
    let store = make_test_service(&fx);
    let mut block = fx.child(&store.tip(), 1.0);
    block.signatures.clear();

    assert!(matches!(
        store.append(block),
        Err(LedgerError::SignatureInvalid { index: 1, .. })
    ));
}

#[test]
fn test_append_forged_signature_rejected() {
    let fx = Fixture::new();
    let store = make_test_service(&fx);
    let forger = Ed25519KeyPair::from_seed(NodeId::from("N1"), [2u8; 32]);
    let mut block = fx.child(&store.tip(), 1.0);
    sign_block(&mut block, &forger);

    assert!(matches!(
        store.append(block),
        Err(LedgerError::SignatureInvalid { .. })
    ));
}

#[test]
fn test_append_unknown_proposer_rejected() {
    let fx = Fixture::new();
    let store = make_test_service(&fx);
    let outsider = Ed25519KeyPair::from_seed(NodeId::from("N9"), [9u8; 32]);
    let tip = store.tip();
    let mut block = Block::new(1, tip.hash, 1, vec![], NodeId::from("N9"));
    sign_block(&mut block, &outsider);

    assert!(matches!(
        store.append(block),
        Err(LedgerError::SignatureInvalid { validator, .. }) if validator.as_str() == "N9"
    ));
}

#[test]
fn test_replace_with_fork() {
    let fx = Fixture::new();
    let store = make_test_service(&fx);
    let genesis = store.tip();
    let a = fx.child(&genesis, 1.0);
    let b = fx.child(&a, 2.0);
    store.append(a.clone()).unwrap();
    store.append(b).unwrap();

    let c = fx.child(&a, 3.0);
    store
        .replace(vec![genesis.clone(), a.clone(), c.clone()])
        .unwrap();

    assert_eq!(store.chain(), vec![genesis, a, c.clone()]);
    assert_eq!(store.tip(), c);
}

#[test]
fn test_replace_rejects_broken_chain() {
    let fx = Fixture::new();
    let store = make_test_service(&fx);
    let genesis = store.tip();
    let a = fx.child(&genesis, 1.0);
    let b = fx.child(&a, 2.0);

    let result = store.replace(vec![genesis.clone(), b]);

    assert!(matches!(result, Err(LedgerError::IndexMismatch { .. })));
    assert_eq!(store.chain(), vec![genesis]);
}

/// Index 0, zero parent and the genesis validator, but minting funds.
fn forged_genesis() -> Block {
    Block::new(
        0,
        Hash::ZERO,
        Block::genesis().timestamp,
        vec![Transaction::new("genesis", "mallory", 1_000_000.0, 0)],
        NodeId::from("genesis"),
    )
}

#[test]
fn test_open_rejects_forged_genesis() {
    let fx = Fixture::new();
    let forged = forged_genesis();
    let next = fx.child(&forged, 1.0);

    let result = fx.store(InMemoryChainStore::with_blocks(vec![forged, next]));

    assert!(matches!(result, Err(LedgerError::MalformedPersisted(_))));
}

#[test]
fn test_replace_rejects_forged_genesis() {
    let fx = Fixture::new();
    let store = make_test_service(&fx);
    let forged = forged_genesis();
    let a = fx.child(&forged, 1.0);
    let b = fx.child(&a, 2.0);

    let result = store.replace(vec![forged, a, b]);

    assert!(matches!(result, Err(LedgerError::GenesisInvalid(_))));
    assert!(store.tip().is_canonical_genesis());
}

#[test]
fn test_replace_if_tip_detects_concurrent_writer() {
    let fx = Fixture::new();
    let store = make_test_service(&fx);
    let genesis = store.tip();
    let a = fx.child(&genesis, 1.0);
    store.append(a.clone()).unwrap();

    let result = store.replace_if_tip(genesis.hash, vec![genesis.clone(), fx.child(&genesis, 9.0)]);

    assert_eq!(
        result,
        Err(LedgerError::TipChanged {
            expected: genesis.hash,
            actual: a.hash
        })
    );
    assert_eq!(store.tip(), a);
}

#[test]
fn test_reopen_from_file() {
    let fx = Fixture::new();
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("chain.json");

    let block = {
        let store = fx.store(JsonFileChainStore::new(&path)).unwrap();
        let block = fx.child(&store.tip(), 4.0);
        store.append(block.clone()).unwrap();
        block
    };

    let reopened = fx.store(JsonFileChainStore::new(&path)).unwrap();
    assert_eq!(reopened.len(), 2);
    assert_eq!(reopened.tip(), block);
    assert!(reopened.repair_report().is_none());
}

#[test]
fn test_open_repairs_trailing_comma() {
    let fx = Fixture::new();
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("chain.json");
    let genesis = Block::genesis();
    let a = fx.child(&genesis, 1.0);
    let pretty = serde_json::to_string_pretty(&vec![genesis, a.clone()]).unwrap();
    std::fs::write(&path, pretty.replace("\n]", ",\n]")).unwrap();

    let store = fx.store(JsonFileChainStore::new(&path)).unwrap();

    assert_eq!(store.tip(), a);
    assert_eq!(store.repair_report().unwrap().trailing_commas_removed, 1);
    let rewritten: Vec<Block> =
        serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(rewritten.len(), 2);
}

#[test]
fn test_open_rejects_repaired_but_invalid_chain() {
    let fx = Fixture::new();
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("chain.json");
    let genesis = Block::genesis();
    let mut a = fx.child(&genesis, 1.0);
    a.nonce = 7;
    let pretty = serde_json::to_string_pretty(&vec![genesis, a]).unwrap();
    std::fs::write(&path, pretty.replace("\n]", ",\n]")).unwrap();

    let result = fx.store(JsonFileChainStore::new(&path));
    assert!(matches!(result, Err(LedgerError::MalformedPersisted(_))));
}

#[test]
fn test_open_rejects_unrepairable_file() {
    let fx = Fixture::new();
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("chain.json");
    std::fs::write(&path, "not json at all").unwrap();

    let result = fx.store(JsonFileChainStore::new(&path));
    assert!(matches!(result, Err(LedgerError::MalformedPersisted(_))));
}

#[test]
fn test_concurrent_appends_keep_chain_gap_free() {
    let fx = Fixture::new();
    let store = Arc::new(make_test_service(&fx));
    let genesis = store.tip();
    let candidates: Vec<Block> = (0..8).map(|i| fx.child(&genesis, i as f64)).collect();

    let handles: Vec<_> = candidates
        .into_iter()
        .map(|block| {
            let store = store.clone();
            std::thread::spawn(move || store.append(block).is_ok())
        })
        .collect();
    let accepted = handles
        .into_iter()
        .map(|h| h.join().unwrap())
        .filter(|ok| *ok)
        .count();

    assert_eq!(accepted, 1);
    assert_eq!(store.len(), 2);
    assert!(store.validate_chain());
}
