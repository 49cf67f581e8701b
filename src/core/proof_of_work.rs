use crate::core::Block;
use crate::error::Result;
use crate::utils::{current_timestamp, sha256_hex};
use log::debug;
use serde_json::Value;
use std::borrow::Cow;

/// Canonical string form of a payload inside the hash preimage.
///
/// A JSON string contributes its raw contents, anything else its compact JSON text.
pub fn payload_string(data: &Value) -> Cow<'_, str> {
    match data {
        Value::String(s) => Cow::Borrowed(s.as_str()),
        other => Cow::Owned(other.to_string()),
    }
}

/// Hex SHA-256 over `index ++ previous_hash ++ timestamp ++ data ++ nonce`.
///
/// The fields are concatenated in this order with no separators. Peers must
/// agree on this encoding bit for bit.
pub fn calculate_hash(
    index: u64,
    previous_hash: &str,
    timestamp: i64,
    data: &Value,
    nonce: u64,
) -> String {
    let preimage = format!(
        "{index}{previous_hash}{timestamp}{}{nonce}",
        payload_string(data)
    );
    sha256_hex(preimage.as_bytes())
}

pub fn calculate_block_hash(block: &Block) -> String {
    calculate_hash(
        block.get_index(),
        block.get_previous_hash(),
        block.get_timestamp(),
        block.get_data(),
        block.get_nonce(),
    )
}

/// Leading run of '0' hex digits is at least `difficulty` long
pub fn meets_difficulty(hash: &str, difficulty: usize) -> bool {
    hash.len() >= difficulty && hash.bytes().take(difficulty).all(|b| b == b'0')
}

/// Brute-force nonce search for the block following `parent`
pub struct ProofOfWork {
    index: u64,
    previous_hash: String,
    data: Value,
    difficulty: usize,
}

impl ProofOfWork {
    pub fn new_proof_of_work(parent: &Block, data: Value, difficulty: usize) -> ProofOfWork {
        ProofOfWork {
            index: parent.get_index() + 1,
            previous_hash: parent.get_hash().to_string(),
            data,
            difficulty,
        }
    }

    /// Search until a satisfying hash is found. There is no iteration bound.
    ///
    /// The timestamp is resampled on every attempt, so the returned block
    /// carries the instant its winning hash was computed.
    pub fn run(self) -> Result<Block> {
        let mut nonce: u64 = 0;
        debug!(
            "Mining block {} with difficulty {}",
            self.index, self.difficulty
        );
        loop {
            let timestamp = current_timestamp()?;
            let hash = calculate_hash(
                self.index,
                &self.previous_hash,
                timestamp,
                &self.data,
                nonce,
            );
            if meets_difficulty(&hash, self.difficulty) {
                return Ok(Block::new(
                    self.index,
                    self.previous_hash,
                    timestamp,
                    self.data,
                    hash,
                    nonce,
                ));
            }
            nonce += 1;
        }
    }
}
