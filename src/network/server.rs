use crate::core::{Block, Blockchain};
use crate::error::{BlockchainError, Result};
use crate::network::{FrameDecoder, Message, Peer, PeerRegistry};
use log::{debug, error, info, warn};
use serde_json::Value;
use std::io::Read;
use std::net::{Shutdown, SocketAddr, TcpListener, TcpStream};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread;
use std::time::Duration;

const READ_BUFFER_SIZE: usize = 8192;
const TCP_WRITE_TIMEOUT: u64 = 5000;

/// Peer-to-peer side of a node.
///
/// Holds a shared handle to the chain engine and the registry of live
/// connections. Cloning is cheap and every clone drives the same node: the
/// accept loop and each connection's reader thread run on their own clone.
/// All chain access goes through one mutex, so appends and replacements
/// coming from different peers never interleave.
#[derive(Clone)]
pub struct Server {
    blockchain: Arc<Mutex<Blockchain>>,
    peers: Arc<PeerRegistry>,
}

impl Server {
    pub fn new(blockchain: Blockchain) -> Self {
        Self::with_shared(Arc::new(Mutex::new(blockchain)))
    }

    pub fn with_shared(blockchain: Arc<Mutex<Blockchain>>) -> Self {
        Self {
            blockchain,
            peers: Arc::new(PeerRegistry::new()),
        }
    }

    fn lock_blockchain(&self) -> Result<MutexGuard<'_, Blockchain>> {
        self.blockchain
            .lock()
            .map_err(|e| BlockchainError::Internal(format!("Failed to acquire chain lock: {e}")))
    }

    /// Accept inbound peers on `port` (0 picks a free one) from a background thread
    pub fn listen(&self, port: u16) -> Result<SocketAddr> {
        let listener = TcpListener::bind(("0.0.0.0", port)).map_err(|e| {
            BlockchainError::Connection(format!("Failed to bind to port {port}: {e}"))
        })?;
        let local_addr = listener.local_addr()?;
        info!("Server listening on {local_addr}");

        let server = self.clone();
        thread::spawn(move || server.accept_loop(listener));
        Ok(local_addr)
    }

    fn accept_loop(&self, listener: TcpListener) {
        for stream in listener.incoming() {
            match stream {
                Ok(stream) => {
                    if let Err(e) = self.init_connection(stream) {
                        warn!("Failed to set up inbound connection: {e}");
                    }
                }
                Err(e) => {
                    error!("Error accepting connection: {e}");
                }
            }
        }
    }

    /// Open one outbound connection. Failures are returned to the caller, not retried.
    pub fn connect(&self, host: &str, port: u16) -> Result<String> {
        let stream = TcpStream::connect((host, port)).map_err(|e| {
            BlockchainError::Connection(format!("Failed to connect to {host}:{port}: {e}"))
        })?;
        info!("Connected to peer {host}:{port}");
        self.init_connection(stream)
    }

    /// Register a stream, greet it with our tip and start its reader thread
    fn init_connection(&self, stream: TcpStream) -> Result<String> {
        let addr = stream.peer_addr()?;
        let key = PeerRegistry::key_for(&addr);
        let writer = stream.try_clone()?;
        // A peer that stops reading gets dropped instead of stalling its writer
        writer
            .set_write_timeout(Some(Duration::from_millis(TCP_WRITE_TIMEOUT)))
            .map_err(|e| {
                BlockchainError::Connection(format!("Failed to set write timeout: {e}"))
            })?;

        if !self.peers.add(Peer::new(addr, writer))? {
            let _ = stream.shutdown(Shutdown::Both);
            return Err(BlockchainError::Connection(format!(
                "Already connected to {key}"
            )));
        }

        // Unsolicited tip so the newcomer can reconcile without asking
        let greeting = Message::latest_block(self.lock_blockchain()?.latest());
        self.peers.send_to(&key, &greeting)?;

        let server = self.clone();
        let reader_key = key.clone();
        thread::spawn(move || server.read_loop(reader_key, stream));
        Ok(key)
    }

    fn read_loop(&self, key: String, mut stream: TcpStream) {
        let mut decoder = FrameDecoder::new();
        let mut buf = [0u8; READ_BUFFER_SIZE];
        loop {
            match stream.read(&mut buf) {
                Ok(0) => {
                    info!("Peer {key} closed the connection");
                    break;
                }
                Ok(n) => {
                    if !self.peers.contains(&key) {
                        break;
                    }
                    self.on_data(&key, &mut decoder, &buf[..n]);
                }
                Err(e) => {
                    if self.peers.contains(&key) {
                        warn!("Transport error on {key}: {e}");
                    }
                    break;
                }
            }
        }
        if let Err(e) = self.peers.remove(&key) {
            error!("Failed to untrack {key}: {e}");
        }
    }

    /// Feed received bytes to a peer's decoder and handle every complete envelope.
    ///
    /// Replies go back to the same peer. Faults are logged and returned; none of
    /// them closes the connection.
    pub fn on_data(
        &self,
        key: &str,
        decoder: &mut FrameDecoder,
        bytes: &[u8],
    ) -> Vec<BlockchainError> {
        decoder.push(bytes);
        let mut faults = Vec::new();
        while let Some(frame) = decoder.next_frame() {
            if !self.peers.contains(key) {
                break;
            }
            match frame.and_then(|frame| self.handle_frame(frame)) {
                Ok(Some(reply)) => {
                    if let Err(e) = self.peers.send_to(key, &reply) {
                        faults.push(e);
                    }
                }
                Ok(None) => {}
                Err(e) => {
                    Self::report(key, &e);
                    faults.push(e);
                }
            }
        }
        faults
    }

    fn report(key: &str, err: &BlockchainError) {
        match err {
            BlockchainError::Protocol(_) => warn!("Protocol fault from {key}: {err}"),
            BlockchainError::NotLonger { .. } => info!("Ignoring chain from {key}: {err}"),
            e if e.is_validation() => warn!("Rejected data from {key}: {err}"),
            _ => error!("Failed to handle message from {key}: {err}"),
        }
    }

    /// Decode one complete JSON frame and dispatch it
    pub fn handle_frame(&self, frame: Value) -> Result<Option<Message>> {
        let message = Message::from_frame(frame)?;
        self.dispatch(message)
    }

    /// Route an envelope by type; returns the reply owed to the sender, if any
    pub fn dispatch(&self, message: Message) -> Result<Option<Message>> {
        debug!("Dispatching {}", message.kind());
        match message {
            Message::RequestLatestBlock => {
                let blockchain = self.lock_blockchain()?;
                Ok(Some(Message::latest_block(blockchain.latest())))
            }
            Message::RequestBlockchain => {
                let blockchain = self.lock_blockchain()?;
                Ok(Some(Message::blockchain(blockchain.chain())))
            }
            Message::ReceiveLatestBlock(block) => self.merge_received_block(block),
            Message::ReceiveBlockchain(chain) => {
                self.merge_received_chain(&chain)?;
                Ok(None)
            }
        }
    }

    /// Extend the tip, ask for the full chain when the peer is ahead, or ignore
    fn merge_received_block(&self, block: Block) -> Result<Option<Message>> {
        let mut blockchain = self.lock_blockchain()?;
        let (tip_hash, tip_index) = {
            let latest = blockchain.latest();
            (latest.get_hash().to_string(), latest.get_index())
        };

        if block.get_previous_hash() == tip_hash {
            let index = block.get_index();
            blockchain.append(block)?;
            info!("Appended block {index} received from peer");
            Ok(None)
        } else if block.get_index() > tip_index {
            info!(
                "Peer is ahead (index {} > {tip_index}), requesting its chain",
                block.get_index()
            );
            Ok(Some(Message::request_blockchain()))
        } else {
            Ok(None)
        }
    }

    fn merge_received_chain(&self, chain: &[Block]) -> Result<()> {
        self.lock_blockchain()?.try_replace(chain)
    }

    /// Mine a block carrying `data`, then announce the new tip to every peer
    pub fn mine(&self, data: Value) -> Result<Block> {
        let block = self.lock_blockchain()?.mine(data)?.clone();
        self.broadcast_latest_block()?;
        Ok(block)
    }

    pub fn broadcast_latest_block(&self) -> Result<usize> {
        let message = Message::latest_block(self.lock_blockchain()?.latest());
        self.peers.broadcast(&message)
    }

    /// Snapshot of the local chain
    pub fn get_chain(&self) -> Result<Vec<Block>> {
        Ok(self.lock_blockchain()?.chain().to_vec())
    }

    /// Snapshot of connected peers as `address:port`
    pub fn get_peers(&self) -> Result<Vec<String>> {
        self.peers.addresses()
    }

    pub fn close_all(&self) -> Result<()> {
        self.peers.close_all()
    }
}
