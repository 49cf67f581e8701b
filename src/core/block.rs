use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const GENESIS_PREVIOUS_HASH: &str = "0";
pub const GENESIS_TIMESTAMP: i64 = 1_508_270_000_000;
pub const GENESIS_DATA: &str = "first block";
pub const GENESIS_HASH: &str = "000dc75a315c77a1f9c98fb6247d03dd18ac52632d7dc6a9920261d8109b37cf";
pub const GENESIS_NONCE: u64 = 604;

/// A linked, hash-addressed unit of the ledger.
///
/// Blocks are plain values: they carry no validation of their own because
/// whether a block is acceptable depends on its parent and on the difficulty,
/// both of which belong to [`crate::core::Blockchain`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Block {
    index: u64,
    previous_hash: String,
    timestamp: i64,
    data: Value,
    hash: String,
    nonce: u64,
}

impl Block {
    pub fn new(
        index: u64,
        previous_hash: String,
        timestamp: i64,
        data: Value,
        hash: String,
        nonce: u64,
    ) -> Block {
        Block {
            index,
            previous_hash,
            timestamp,
            data,
            hash,
            nonce,
        }
    }

    /// The fixed first block, root of trust for chain validation
    pub fn genesis() -> Block {
        Block::new(
            0,
            GENESIS_PREVIOUS_HASH.to_string(),
            GENESIS_TIMESTAMP,
            Value::String(GENESIS_DATA.to_string()),
            GENESIS_HASH.to_string(),
            GENESIS_NONCE,
        )
    }

    pub fn get_index(&self) -> u64 {
        self.index
    }

    pub fn get_previous_hash(&self) -> &str {
        self.previous_hash.as_str()
    }

    pub fn get_timestamp(&self) -> i64 {
        self.timestamp
    }

    pub fn get_data(&self) -> &Value {
        &self.data
    }

    pub fn get_hash(&self) -> &str {
        self.hash.as_str()
    }

    pub fn get_nonce(&self) -> u64 {
        self.nonce
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_genesis_is_fixed() {
        assert_eq!(Block::genesis(), Block::genesis());
        let genesis = Block::genesis();
        assert_eq!(genesis.get_index(), 0);
        assert_eq!(genesis.get_previous_hash(), "0");
        assert!(genesis.get_hash().starts_with("000"));
    }

    #[test]
    fn test_wire_field_names() {
        let value = serde_json::to_value(Block::genesis()).unwrap();
        assert_eq!(
            value,
            json!({
                "index": 0,
                "previousHash": "0",
                "timestamp": 1508270000000i64,
                "data": "first block",
                "hash": GENESIS_HASH,
                "nonce": 604
            })
        );
    }

    #[test]
    fn test_structured_payload_survives_json() {
        let block = Block::new(
            1,
            GENESIS_HASH.to_string(),
            1,
            json!({"to": "bob", "amount": [1, 2]}),
            "abc".to_string(),
            7,
        );
        let text = serde_json::to_string(&block).unwrap();
        let parsed: Block = serde_json::from_str(&text).unwrap();
        assert_eq!(parsed.get_data()["to"], "bob");
        assert_eq!(parsed, block);
    }
}
