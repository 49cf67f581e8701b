use crate::error::{BlockchainError, Result};
use crate::network::Message;
use log::{debug, info, warn};
use std::collections::HashMap;
use std::io::Write;
use std::net::{Shutdown, SocketAddr, TcpStream};
use std::sync::{Arc, Mutex, RwLock};

/// Write side of one live peer connection
pub struct Peer {
    addr: SocketAddr,
    stream: Mutex<TcpStream>,
}

impl Peer {
    pub fn new(addr: SocketAddr, stream: TcpStream) -> Peer {
        Peer {
            addr,
            stream: Mutex::new(stream),
        }
    }

    pub fn get_addr(&self) -> SocketAddr {
        self.addr
    }

    /// Serialize one envelope onto the stream
    pub fn send(&self, message: &Message) -> Result<()> {
        let bytes = message.to_bytes()?;
        let mut stream = self
            .stream
            .lock()
            .map_err(|e| BlockchainError::Internal(format!("Failed to acquire stream lock: {e}")))?;
        stream.write_all(&bytes).map_err(|e| {
            BlockchainError::Connection(format!("Failed to send to {}: {e}", self.addr))
        })?;
        debug!("Sent {} to {}", message.kind(), self.addr);
        Ok(())
    }

    fn shutdown(&self) {
        if let Ok(stream) = self.stream.lock() {
            let _ = stream.shutdown(Shutdown::Both);
        }
    }
}

/// Tracked connections keyed by `address:port`
///
/// Presence in the registry is what makes a connection "connected": readers
/// stop dispatching as soon as their key disappears. Peers are handed out as
/// `Arc` clones and written to after the map lock is released, so a slow peer
/// only ever stalls the thread writing to it.
#[derive(Default)]
pub struct PeerRegistry {
    inner: RwLock<HashMap<String, Arc<Peer>>>,
}

impl PeerRegistry {
    pub fn new() -> PeerRegistry {
        PeerRegistry {
            inner: RwLock::new(HashMap::new()),
        }
    }

    pub fn key_for(addr: &SocketAddr) -> String {
        addr.to_string()
    }

    /// Track a new connection. Returns `false` when the key is already tracked.
    pub fn add(&self, peer: Peer) -> Result<bool> {
        let key = Self::key_for(&peer.get_addr());
        let mut inner = self
            .inner
            .write()
            .map_err(|e| BlockchainError::Internal(format!("Failed to acquire peer lock: {e}")))?;
        if inner.contains_key(&key) {
            return Ok(false);
        }
        inner.insert(key.clone(), Arc::new(peer));
        info!("Connected to peer: {key}");
        Ok(true)
    }

    /// Stop tracking a connection and shut its socket down
    pub fn remove(&self, key: &str) -> Result<bool> {
        let removed = self
            .inner
            .write()
            .map_err(|e| BlockchainError::Internal(format!("Failed to acquire peer lock: {e}")))?
            .remove(key);
        match removed {
            Some(peer) => {
                peer.shutdown();
                info!("Disconnected from peer: {key}");
                Ok(true)
            }
            None => Ok(false),
        }
    }

    pub fn contains(&self, key: &str) -> bool {
        self.inner
            .read()
            .map(|inner| inner.contains_key(key))
            .unwrap_or(false)
    }

    pub fn addresses(&self) -> Result<Vec<String>> {
        let inner = self
            .inner
            .read()
            .map_err(|e| BlockchainError::Internal(format!("Failed to acquire peer lock: {e}")))?;
        let mut keys: Vec<String> = inner.keys().cloned().collect();
        keys.sort();
        Ok(keys)
    }

    pub fn len(&self) -> usize {
        self.inner.read().map(|inner| inner.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn get(&self, key: &str) -> Result<Option<Arc<Peer>>> {
        let inner = self
            .inner
            .read()
            .map_err(|e| BlockchainError::Internal(format!("Failed to acquire peer lock: {e}")))?;
        Ok(inner.get(key).cloned())
    }

    fn snapshot(&self) -> Result<Vec<(String, Arc<Peer>)>> {
        let inner = self
            .inner
            .read()
            .map_err(|e| BlockchainError::Internal(format!("Failed to acquire peer lock: {e}")))?;
        Ok(inner
            .iter()
            .map(|(key, peer)| (key.clone(), Arc::clone(peer)))
            .collect())
    }

    pub fn send_to(&self, key: &str, message: &Message) -> Result<()> {
        let result = match self.get(key)? {
            Some(peer) => peer.send(message),
            None => Err(BlockchainError::Connection(format!(
                "Peer {key} is not connected"
            ))),
        };
        if let Err(BlockchainError::Connection(msg)) = &result {
            warn!("{msg}");
            self.remove(key)?;
        }
        result
    }

    /// Fire-and-forget delivery to every tracked peer; returns how many writes succeeded.
    ///
    /// Peers whose write fails are closed.
    pub fn broadcast(&self, message: &Message) -> Result<usize> {
        let peers = self.snapshot()?;
        let total = peers.len();
        let failed: Vec<String> = peers
            .into_iter()
            .filter_map(|(key, peer)| match peer.send(message) {
                Ok(()) => None,
                Err(e) => {
                    warn!("Broadcast to {key} failed: {e}");
                    Some(key)
                }
            })
            .collect();
        for key in &failed {
            self.remove(key)?;
        }
        Ok(total - failed.len())
    }

    pub fn close_all(&self) -> Result<()> {
        let drained: Vec<(String, Arc<Peer>)> = self
            .inner
            .write()
            .map_err(|e| BlockchainError::Internal(format!("Failed to acquire peer lock: {e}")))?
            .drain()
            .collect();
        for (key, peer) in drained {
            peer.shutdown();
            info!("Closed connection to {key}");
        }
        Ok(())
    }
}
