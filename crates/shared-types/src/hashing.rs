//! # Canonical Hashing
//!
//! Block hashes and Merkle roots are SHA-256 over a canonical JSON encoding:
//! compact separators, object keys sorted at every depth. The encoding is
//! produced by hand rather than through `serde_json::to_string`, so the
//! result does not depend on whether `serde_json` was built with ordered maps.

use crate::entities::{Block, Hash, Transaction};
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};

/// SHA-256 of arbitrary bytes.
pub fn sha256(data: &[u8]) -> Hash {
    Hash(Sha256::digest(data).into())
}

/// Serialize `value` with sorted keys and no whitespace.
pub fn canonical_json(value: &Value) -> String {
    let mut out = String::new();
    write_canonical(value, &mut out);
    out
}

fn write_canonical(value: &Value, out: &mut String) {
    match value {
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            out.push('{');
            for (i, key) in keys.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                out.push_str(&Value::String((*key).clone()).to_string());
                out.push(':');
                write_canonical(&map[key.as_str()], out);
            }
            out.push('}');
        }
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_canonical(item, out);
            }
            out.push(']');
        }
        scalar => out.push_str(&scalar.to_string()),
    }
}

fn transaction_value(tx: &Transaction) -> Value {
    let mut map = Map::new();
    map.insert("sender".into(), Value::String(tx.sender.0.clone()));
    map.insert("recipient".into(), Value::String(tx.recipient.0.clone()));
    map.insert("amount".into(), Value::from(tx.amount));
    map.insert("timestamp".into(), Value::from(tx.timestamp));
    map.insert("note".into(), tx.note.clone());
    map.insert(
        "extra".into(),
        Value::Object(tx.extra.clone().into_iter().collect()),
    );
    Value::Object(map)
}

/// The hashed portion of a block: every field except `hash` and `signatures`.
fn block_content_value(block: &Block) -> Value {
    let mut map = Map::new();
    map.insert("index".into(), Value::from(block.index));
    map.insert("timestamp".into(), Value::from(block.timestamp));
    map.insert(
        "transactions".into(),
        Value::Array(block.transactions.iter().map(transaction_value).collect()),
    );
    map.insert(
        "previous_hash".into(),
        Value::String(block.previous_hash.to_hex()),
    );
    map.insert("validator".into(), Value::String(block.validator.0.clone()));
    map.insert("merkle_root".into(), Value::String(block.merkle_root.to_hex()));
    map.insert("nonce".into(), Value::from(block.nonce));
    map.insert(
        "metadata".into(),
        Value::Object(block.metadata.clone().into_iter().collect()),
    );
    Value::Object(map)
}

/// Merkle leaf for one transaction.
pub fn hash_transaction(tx: &Transaction) -> Hash {
    sha256(canonical_json(&transaction_value(tx)).as_bytes())
}

/// Hash over the canonical content of `block`.
pub fn compute_block_hash(block: &Block) -> Hash {
    sha256(canonical_json(&block_content_value(block)).as_bytes())
}

/// Pairwise SHA-256 folding; an odd node at any level is paired with itself.
/// An empty list yields the SHA-256 of the empty string.
pub fn compute_merkle_root(transactions: &[Transaction]) -> Hash {
    if transactions.is_empty() {
        return sha256(b"");
    }

    let mut level: Vec<Hash> = transactions.iter().map(hash_transaction).collect();
    while level.len() > 1 {
        level = level
            .chunks(2)
            .map(|pair| {
                let left = pair[0];
                let right = pair.get(1).copied().unwrap_or(left);
                let mut buf = [0u8; 64];
                buf[..32].copy_from_slice(&left.0);
                buf[32..].copy_from_slice(&right.0);
                sha256(&buf)
            })
            .collect();
    }
    level[0]
}
