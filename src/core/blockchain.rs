// The ledger engine: owns the in-memory chain and its difficulty, mines new
// blocks, validates blocks and chains from peers and applies fork choice.
// Fork choice is "longest valid chain wins". That is only sound among
// cooperating peers; weighing chains by work is out of scope.

use crate::core::proof_of_work::{calculate_block_hash, meets_difficulty, ProofOfWork};
use crate::core::Block;
use crate::error::{BlockchainError, Result};
use log::{error, info};
use serde_json::Value;

pub const DEFAULT_DIFFICULTY: usize = 3;

#[derive(Debug, Clone)]
pub struct Blockchain {
    // Never empty: the minimum legal chain is [genesis]
    chain: Vec<Block>,
    difficulty: usize,
}

impl Default for Blockchain {
    fn default() -> Self {
        Self::new(DEFAULT_DIFFICULTY)
    }
}

impl Blockchain {
    pub fn new(difficulty: usize) -> Blockchain {
        Blockchain {
            chain: vec![Block::genesis()],
            difficulty,
        }
    }

    pub fn chain(&self) -> &[Block] {
        &self.chain
    }

    pub fn len(&self) -> usize {
        self.chain.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chain.is_empty()
    }

    pub fn difficulty(&self) -> usize {
        self.difficulty
    }

    pub fn latest(&self) -> &Block {
        // The constructor seeds genesis and replacement only accepts chains
        // that start with it, so there is always a last block.
        &self.chain[self.chain.len() - 1]
    }

    pub fn meets_difficulty(&self, hash: &str) -> bool {
        meets_difficulty(hash, self.difficulty)
    }

    /// Recompute the hash a block should carry from its other fields
    pub fn hash_of(&self, block: &Block) -> String {
        calculate_block_hash(block)
    }

    /// Run proof-of-work on top of the current tip and append the result
    pub fn mine(&mut self, data: Value) -> Result<&Block> {
        let block = self.generate_next_block(data)?;
        if let Err(e) = self.append(block) {
            error!("Self-mined block failed validation: {e}");
            return Err(BlockchainError::Internal(format!(
                "self-mined block rejected: {e}"
            )));
        }
        let tip = self.latest();
        info!(
            "Mined block {} (hash={}, nonce={})",
            tip.get_index(),
            tip.get_hash(),
            tip.get_nonce()
        );
        Ok(tip)
    }

    pub fn generate_next_block(&self, data: Value) -> Result<Block> {
        ProofOfWork::new_proof_of_work(self.latest(), data, self.difficulty).run()
    }

    /// Explain why `candidate` cannot follow `parent`, if it cannot
    pub fn check_successor(&self, candidate: &Block, parent: &Block) -> Result<()> {
        if candidate.get_index() != parent.get_index() + 1 {
            return Err(BlockchainError::InvalidBlock(format!(
                "index {} does not follow {}",
                candidate.get_index(),
                parent.get_index()
            )));
        }
        if candidate.get_previous_hash() != parent.get_hash() {
            return Err(BlockchainError::InvalidBlock(format!(
                "block {} does not link to parent hash {}",
                candidate.get_index(),
                parent.get_hash()
            )));
        }
        let recomputed = self.hash_of(candidate);
        if recomputed != candidate.get_hash() {
            return Err(BlockchainError::InvalidBlock(format!(
                "block {} hash mismatch: carried {}, computed {recomputed}",
                candidate.get_index(),
                candidate.get_hash()
            )));
        }
        if !self.meets_difficulty(&recomputed) {
            return Err(BlockchainError::InvalidBlock(format!(
                "block {} hash {recomputed} is below difficulty {}",
                candidate.get_index(),
                self.difficulty
            )));
        }
        Ok(())
    }

    pub fn validate_successor(&self, candidate: &Block, parent: &Block) -> bool {
        self.check_successor(candidate, parent).is_ok()
    }

    pub fn append(&mut self, candidate: Block) -> Result<()> {
        self.check_successor(&candidate, self.latest())?;
        self.chain.push(candidate);
        Ok(())
    }

    /// Walk a candidate chain from genesis, validating each block against the
    /// block accepted just before it.
    ///
    /// Genesis is a trusted root: it is compared structurally and never
    /// re-hashed, so the difficulty setting cannot invalidate it.
    pub fn check_chain(&self, candidate: &[Block]) -> Result<()> {
        let Some(first) = candidate.first() else {
            return Err(BlockchainError::InvalidChain("empty chain".to_string()));
        };
        if *first != Block::genesis() {
            return Err(BlockchainError::InvalidChain(
                "first block is not the genesis block".to_string(),
            ));
        }

        let mut validated = first;
        for block in &candidate[1..] {
            self.check_successor(block, validated)
                .map_err(|e| BlockchainError::InvalidChain(e.to_string()))?;
            validated = block;
        }
        Ok(())
    }

    pub fn validate_chain(&self, candidate: &[Block]) -> bool {
        self.check_chain(candidate).is_ok()
    }

    /// Replace the local chain with `candidate` if it is valid and strictly longer.
    ///
    /// The engine keeps its own copy; the caller's blocks are never aliased.
    pub fn try_replace(&mut self, candidate: &[Block]) -> Result<()> {
        self.check_chain(candidate)?;
        if candidate.len() <= self.chain.len() {
            return Err(BlockchainError::NotLonger {
                candidate: candidate.len(),
                local: self.chain.len(),
            });
        }
        self.chain = candidate.to_vec();
        info!(
            "Replaced local chain with received chain of length {} (tip={})",
            self.chain.len(),
            self.latest().get_hash()
        );
        Ok(())
    }
}
