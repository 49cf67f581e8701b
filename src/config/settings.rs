use crate::core::DEFAULT_DIFFICULTY;
use crate::error::{BlockchainError, Result};
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::Path;

const P2P_PORT_KEY: &str = "P2P_PORT";
const DIFFICULTY_KEY: &str = "DIFFICULTY";
const PEERS_KEY: &str = "PEERS";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Port to accept peers on at startup, if any
    pub p2p_port: Option<u16>,
    /// Required leading zero hex digits in a block hash
    pub difficulty: usize,
    /// `host:port` peers to dial at startup
    pub peers: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            p2p_port: None,
            difficulty: DEFAULT_DIFFICULTY,
            peers: Vec::new(),
        }
    }
}

impl Config {
    /// Defaults, then `path` if given, then the process environment
    pub fn load(path: Option<&Path>) -> Result<Config> {
        let config = match path {
            Some(path) => Self::from_file(path)?,
            None => Config::default(),
        };
        config.with_env(env::vars())
    }

    pub fn from_file(path: &Path) -> Result<Config> {
        let text = fs::read_to_string(path).map_err(|e| {
            BlockchainError::Config(format!("Failed to read {}: {e}", path.display()))
        })?;
        Self::from_toml_str(&text)
    }

    pub fn from_toml_str(text: &str) -> Result<Config> {
        Ok(toml::from_str(text)?)
    }

    /// Override fields from `P2P_PORT`, `DIFFICULTY` and `PEERS` (comma separated)
    pub fn with_env<I>(mut self, vars: I) -> Result<Config>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        for (key, value) in vars {
            match key.as_str() {
                P2P_PORT_KEY => {
                    let port = value.trim().parse::<u16>().map_err(|e| {
                        BlockchainError::Config(format!("Invalid {P2P_PORT_KEY} '{value}': {e}"))
                    })?;
                    self.p2p_port = Some(port);
                }
                DIFFICULTY_KEY => {
                    self.difficulty = value.trim().parse::<usize>().map_err(|e| {
                        BlockchainError::Config(format!(
                            "Invalid {DIFFICULTY_KEY} '{value}': {e}"
                        ))
                    })?;
                }
                PEERS_KEY => {
                    self.peers = value
                        .split(',')
                        .map(str::trim)
                        .filter(|peer| !peer.is_empty())
                        .map(String::from)
                        .collect();
                }
                _ => {}
            }
        }
        Ok(self)
    }

    /// Split every configured peer into host and port
    pub fn peer_addresses(&self) -> Result<Vec<(String, u16)>> {
        self.peers.iter().map(|peer| parse_peer(peer)).collect()
    }
}

/// Parse `host:port`, splitting on the last colon
pub fn parse_peer(peer: &str) -> Result<(String, u16)> {
    let (host, port) = peer
        .rsplit_once(':')
        .ok_or_else(|| BlockchainError::Config(format!("Peer '{peer}' is not host:port")))?;
    let port = port
        .parse::<u16>()
        .map_err(|e| BlockchainError::Config(format!("Invalid port in peer '{peer}': {e}")))?;
    if host.is_empty() {
        return Err(BlockchainError::Config(format!("Peer '{peer}' has no host")));
    }
    Ok((host.to_string(), port))
}
