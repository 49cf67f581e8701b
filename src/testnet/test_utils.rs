//! Test utilities for ledger and network testing

use crate::core::{Block, Blockchain};
use serde_json::{json, Value};

/// Mine `blocks` blocks on top of genesis and return the whole chain
pub fn mined_chain(difficulty: usize, blocks: usize) -> Vec<Block> {
    let mut blockchain = Blockchain::new(difficulty);
    for i in 0..blocks {
        blockchain
            .mine(json!(format!("block {i}")))
            .expect("mining at test difficulty should succeed");
    }
    blockchain.chain().to_vec()
}

/// Copy of `block` with one wire field altered
pub fn tampered(block: &Block, field: &str) -> Block {
    let mut value = serde_json::to_value(block).expect("blocks serialize");
    let altered = match &value[field] {
        Value::Number(n) => json!(n.as_u64().unwrap_or(0) + 1),
        Value::String(s) => json!(format!("{s}x")),
        other => json!(format!("{other}x")),
    };
    value[field] = altered;
    serde_json::from_value(value).expect("altered block deserializes")
}
