//! Network integration tests
//!
//! Real TCP connections on loopback. Every read has a timeout and every
//! wait is bounded, so a broken node fails the test instead of hanging it.

use ledger_node::{Blockchain, FrameDecoder, Message, Server};
use serde_json::json;
use std::io::{Read, Write};
use std::net::TcpStream;
use std::thread;
use std::time::{Duration, Instant};

const WAIT: Duration = Duration::from_secs(10);

fn wait_until(mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + WAIT;
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        thread::sleep(Duration::from_millis(20));
    }
    condition()
}

/// A bare socket speaking the wire protocol by hand
struct RawPeer {
    stream: TcpStream,
    decoder: FrameDecoder,
}

impl RawPeer {
    fn connect(port: u16) -> RawPeer {
        let stream = TcpStream::connect(("127.0.0.1", port)).unwrap();
        stream.set_read_timeout(Some(WAIT)).unwrap();
        RawPeer {
            stream,
            decoder: FrameDecoder::new(),
        }
    }

    fn send_raw(&mut self, bytes: &[u8]) {
        self.stream.write_all(bytes).unwrap();
    }

    fn receive(&mut self) -> Message {
        let mut buf = [0u8; 4096];
        loop {
            if let Some(frame) = self.decoder.next_frame() {
                return Message::from_frame(frame.unwrap()).unwrap();
            }
            let n = self.stream.read(&mut buf).expect("peer went silent");
            assert!(n > 0, "node closed the connection");
            self.decoder.push(&buf[..n]);
        }
    }
}

#[test]
fn test_newcomer_is_greeted_with_tip() {
    let server = Server::new(Blockchain::new(1));
    server.mine(json!("tip")).unwrap();
    let port = server.listen(0).unwrap().port();

    let mut peer = RawPeer::connect(port);
    let tip = server.get_chain().unwrap()[1].clone();
    assert_eq!(peer.receive(), Message::latest_block(&tip));
    assert!(wait_until(|| server.get_peers().unwrap().len() == 1));
}

#[test]
fn test_two_envelopes_in_one_write_are_both_answered() {
    let server = Server::new(Blockchain::new(1));
    let port = server.listen(0).unwrap().port();
    let mut peer = RawPeer::connect(port);
    let _greeting = peer.receive();

    peer.send_raw(br#"{"type":"REQUEST_BLOCKCHAIN"}{"type":"REQUEST_LATEST_BLOCK"}"#);

    let chain = server.get_chain().unwrap();
    assert_eq!(peer.receive(), Message::blockchain(&chain));
    assert_eq!(peer.receive(), Message::latest_block(&chain[0]));
}

#[test]
fn test_envelope_split_across_writes_is_reassembled() {
    let server = Server::new(Blockchain::new(1));
    let port = server.listen(0).unwrap().port();
    let mut peer = RawPeer::connect(port);
    let _greeting = peer.receive();

    peer.send_raw(br#"{"type":"REQUEST_"#);
    thread::sleep(Duration::from_millis(50));
    peer.send_raw(br#"LATEST_BLOCK"}"#);

    assert_eq!(peer.receive().kind(), "RECEIVE_LATEST_BLOCK");
}

#[test]
fn test_unknown_type_keeps_connection_open() {
    let server = Server::new(Blockchain::new(1));
    let port = server.listen(0).unwrap().port();
    let mut peer = RawPeer::connect(port);
    let _greeting = peer.receive();

    peer.send_raw(br#"{"type":"DISCOVER_PEERS","data":[]}"#);
    peer.send_raw(br#"{"type":"REQUEST_LATEST_BLOCK"}"#);

    assert_eq!(peer.receive().kind(), "RECEIVE_LATEST_BLOCK");
    assert_eq!(server.get_chain().unwrap().len(), 1);
    assert_eq!(server.get_peers().unwrap().len(), 1);
}

#[test]
fn test_lagging_node_catches_up_on_connect() {
    let a = Server::new(Blockchain::new(1));
    for i in 0..3 {
        a.mine(json!(i)).unwrap();
    }
    let port = a.listen(0).unwrap().port();

    let b = Server::new(Blockchain::new(1));
    b.connect("127.0.0.1", port).unwrap();

    assert!(wait_until(|| b.get_chain().unwrap().len() == 4));
    assert_eq!(b.get_chain().unwrap(), a.get_chain().unwrap());
}

#[test]
fn test_mined_block_is_gossiped_to_peers() {
    let a = Server::new(Blockchain::new(1));
    let port = a.listen(0).unwrap().port();
    let b = Server::new(Blockchain::new(1));
    b.connect("127.0.0.1", port).unwrap();
    assert!(wait_until(|| a.get_peers().unwrap().len() == 1));

    let block = a.mine(json!("fresh")).unwrap();

    assert!(wait_until(|| b.get_chain().unwrap().len() == 2));
    assert_eq!(b.get_chain().unwrap()[1], block);
}

#[test]
fn test_duplicate_outbound_connection_is_refused() {
    let a = Server::new(Blockchain::new(1));
    let port = a.listen(0).unwrap().port();
    let b = Server::new(Blockchain::new(1));

    b.connect("127.0.0.1", port).unwrap();
    assert!(b.connect("127.0.0.1", port).is_err());
    assert_eq!(b.get_peers().unwrap().len(), 1);
}

#[test]
fn test_closed_peer_is_untracked() {
    let server = Server::new(Blockchain::new(1));
    let port = server.listen(0).unwrap().port();
    let mut peer = RawPeer::connect(port);
    let _greeting = peer.receive();
    assert!(wait_until(|| server.get_peers().unwrap().len() == 1));

    drop(peer);
    assert!(wait_until(|| server.get_peers().unwrap().is_empty()));
}

#[test]
fn test_peer_that_never_reads_does_not_stall_others() {
    let server = Server::new(Blockchain::new(0));
    for _ in 0..50 {
        server.mine(json!("x".repeat(20_000))).unwrap();
    }
    let port = server.listen(0).unwrap().port();

    let mut hog = RawPeer::connect(port);
    for _ in 0..200 {
        hog.send_raw(br#"{"type":"REQUEST_BLOCKCHAIN"}"#);
    }
    thread::sleep(Duration::from_millis(200));

    let started = Instant::now();
    let mut newcomer = RawPeer::connect(port);
    assert_eq!(newcomer.receive().kind(), "RECEIVE_LATEST_BLOCK");
    assert!(!server.get_peers().unwrap().is_empty());
    assert!(started.elapsed() < Duration::from_secs(3));

    // The hog is dropped once its write times out
    assert!(wait_until(|| server.get_peers().unwrap().len() == 1));
}
