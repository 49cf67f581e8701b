//! Error handling for the ledger node
//!
//! Every failure the ledger or the network layer can produce is one of these
//! variants. Nothing in the library terminates the process; the console binary
//! is the only place errors are turned into user-visible text.

use std::fmt;

/// Result type alias for ledger and network operations
pub type Result<T> = std::result::Result<T, BlockchainError>;

/// Error kinds for ledger and peer-to-peer operations
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BlockchainError {
    /// A block is not a valid successor of the current tip
    InvalidBlock(String),
    /// A received chain fails structural or hash checks
    InvalidChain(String),
    /// A received chain is valid but does not beat the local one
    NotLonger { candidate: usize, local: usize },
    /// Transport failure on connect/listen
    Connection(String),
    /// Malformed or unknown message from a peer
    Protocol(String),
    /// A self-mined block failed its own validation, or shared state is unusable
    Internal(String),
    /// Serialization/deserialization errors
    Serialization(String),
    /// File and socket I/O errors
    Io(String),
    /// Configuration errors
    Config(String),
}

impl BlockchainError {
    /// True for the recoverable block/chain validation failures
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            BlockchainError::InvalidBlock(_)
                | BlockchainError::InvalidChain(_)
                | BlockchainError::NotLonger { .. }
        )
    }
}

impl fmt::Display for BlockchainError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BlockchainError::InvalidBlock(msg) => write!(f, "Invalid block: {msg}"),
            BlockchainError::InvalidChain(msg) => write!(f, "Invalid chain: {msg}"),
            BlockchainError::NotLonger { candidate, local } => write!(
                f,
                "Received chain is not longer: candidate {candidate}, local {local}"
            ),
            BlockchainError::Connection(msg) => write!(f, "Connection error: {msg}"),
            BlockchainError::Protocol(msg) => write!(f, "Protocol fault: {msg}"),
            BlockchainError::Internal(msg) => write!(f, "Internal inconsistency: {msg}"),
            BlockchainError::Serialization(msg) => write!(f, "Serialization error: {msg}"),
            BlockchainError::Io(msg) => write!(f, "I/O error: {msg}"),
            BlockchainError::Config(msg) => write!(f, "Configuration error: {msg}"),
        }
    }
}

impl std::error::Error for BlockchainError {}

impl From<std::io::Error> for BlockchainError {
    fn from(err: std::io::Error) -> Self {
        BlockchainError::Io(err.to_string())
    }
}

impl From<serde_json::Error> for BlockchainError {
    fn from(err: serde_json::Error) -> Self {
        BlockchainError::Serialization(err.to_string())
    }
}

impl From<toml::de::Error> for BlockchainError {
    fn from(err: toml::de::Error) -> Self {
        BlockchainError::Config(err.to_string())
    }
}
