//! Core ledger functionality
//!
//! Blocks, the chain engine and proof-of-work.

pub mod block;
pub mod blockchain;
pub mod proof_of_work;

pub use block::Block;
pub use blockchain::{Blockchain, DEFAULT_DIFFICULTY};
pub use proof_of_work::{calculate_block_hash, calculate_hash, meets_difficulty, ProofOfWork};
