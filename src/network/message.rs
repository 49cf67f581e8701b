use crate::core::Block;
use crate::error::{BlockchainError, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Wire envelope exchanged between peers: `{"type": ..., "data": ...}`.
///
/// The `type` strings are the wire contract and must never change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Message {
    /// "send your tip"
    RequestLatestBlock,
    /// "here is my tip"
    ReceiveLatestBlock(Block),
    /// "send your whole chain"
    RequestBlockchain,
    /// "here is my whole chain"
    ReceiveBlockchain(Vec<Block>),
}

impl Message {
    pub fn request_latest_block() -> Message {
        Message::RequestLatestBlock
    }

    pub fn latest_block(block: &Block) -> Message {
        Message::ReceiveLatestBlock(block.clone())
    }

    pub fn request_blockchain() -> Message {
        Message::RequestBlockchain
    }

    pub fn blockchain(chain: &[Block]) -> Message {
        Message::ReceiveBlockchain(chain.to_vec())
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Message::RequestLatestBlock => "REQUEST_LATEST_BLOCK",
            Message::ReceiveLatestBlock(_) => "RECEIVE_LATEST_BLOCK",
            Message::RequestBlockchain => "REQUEST_BLOCKCHAIN",
            Message::ReceiveBlockchain(_) => "RECEIVE_BLOCKCHAIN",
        }
    }

    /// Interpret a complete JSON frame as an envelope.
    ///
    /// Well-formed JSON that is not a known envelope is a protocol fault.
    pub fn from_frame(frame: Value) -> Result<Message> {
        serde_json::from_value(frame)
            .map_err(|e| BlockchainError::Protocol(format!("unrecognized envelope: {e}")))
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }
}
