//! # Ledger Node
//!
//! A peer-to-peer node that keeps a local chain of hash-linked blocks, mines
//! new ones by proof-of-work, checks blocks and chains received from peers
//! and resolves forks with the longest valid chain.
//!
//! ## Layout
//! - `core/`: blocks, the chain engine, proof-of-work
//! - `network/`: envelopes, stream framing, peer tracking, the P2P server
//! - `config/`: node settings from file and environment
//! - `cli/`: startup flags and the line console
//! - `utils/`: hashing and clock helpers
//!
//! Nothing is persisted: a node starts from the genesis block every time.

pub mod cli;
pub mod config;
pub mod core;
pub mod error;
pub mod network;
pub mod utils;

#[cfg(test)]
pub mod testnet;

// Re-export commonly used types for convenience
pub use cli::{Command, ConsoleLine, Opt};
pub use config::Config;
pub use core::{
    calculate_block_hash, calculate_hash, meets_difficulty, Block, Blockchain, ProofOfWork,
    DEFAULT_DIFFICULTY,
};
pub use error::{BlockchainError, Result};
pub use network::{FrameDecoder, Message, Peer, PeerRegistry, Server};
pub use utils::{current_timestamp, sha256_digest, sha256_hex};
