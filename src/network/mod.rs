//! Peer-to-peer networking
//!
//! Connection tracking, stream framing, message dispatch and gossip between
//! nodes. Every peer speaks the same symmetric protocol; there are no
//! distinguished client or server roles once a connection is up.

pub mod framing;
pub mod message;
pub mod peer;
pub mod server;

pub use framing::FrameDecoder;
pub use message::Message;
pub use peer::{Peer, PeerRegistry};
pub use server::Server;
