//! Sessions fed through slow or fragmented transports.
//!
//! Frames must come out whole regardless of how the bytes are split on the
//! way in, and closing must interrupt a read that is waiting on a peer that
//! never finishes its frame.

use std::time::Duration;

use proptest::prelude::*;
use tandem_core::{
    ConnectionState, Controller, Endpoint, LinkConfig, LinkEvent, LoopOutcome, ReceiveLoop,
    Session,
};
use tandem_harness::{DuplexConnector, TrickleReader};
use tandem_proto::{Frame, FrameError, encode};
use tokio::{io::AsyncWriteExt, sync::mpsc};

fn script(messages: &[&str]) -> Vec<u8> {
    let mut wire = Vec::new();
    for message in messages {
        wire.extend_from_slice(&encode(message.as_bytes()).unwrap());
    }
    wire
}

#[tokio::test]
async fn byte_at_a_time_delivery() {
    let stream = TrickleReader::new(script(&["hello", "world"]), 1);
    let (_session, mut reader) = Session::open(stream, "peer");

    assert_eq!(reader.receive_one().await.unwrap().text(), "hello");
    assert_eq!(reader.receive_one().await.unwrap().text(), "world");
    assert!(matches!(reader.receive_one().await, Err(FrameError::ConnectionClosed)));
}

#[tokio::test]
async fn close_interrupts_read_on_stalled_peer() {
    // Header announces 100 bytes; only 3 ever arrive.
    let mut wire = 100u32.to_le_bytes().to_vec();
    wire.extend_from_slice(b"abc");
    let stream = TrickleReader::new(wire, 2).hold_open();
    let (mut session, reader) = Session::open(stream, "peer");

    let (events_tx, mut events) = mpsc::unbounded_channel();
    let (exits_tx, mut exits) = mpsc::unbounded_channel();
    let receive_loop = ReceiveLoop::spawn(1, reader, events_tx, exits_tx);

    tokio::time::sleep(Duration::from_millis(20)).await;
    assert!(!receive_loop.is_finished());

    session.close().await;
    receive_loop.join(Duration::from_secs(1)).await;

    let exit = exits.recv().await.unwrap();
    assert!(matches!(exit.outcome, LoopOutcome::Closed));
    assert!(events.try_recv().is_err());
}

#[tokio::test]
async fn controller_over_duplex_pipes() {
    let (connector, mut acceptor) = DuplexConnector::new(16);
    let (mut controller, mut feed) = Controller::new(connector, LinkConfig::with_username("me"));

    controller.connect(&Endpoint::new("pipe", 9)).await.unwrap();
    let (endpoint, mut peer) = acceptor.accept().await.unwrap();
    assert_eq!(endpoint.to_string(), "pipe:9");

    // Larger than the pipe buffer, so the write lands in several pieces.
    let long = "x".repeat(200);
    peer.write_all(&script(&[&long, "short"])).await.unwrap();

    let mut received = Vec::new();
    while received.len() < 2 {
        if let LinkEvent::Message(message) = feed.recv().await.unwrap() {
            received.push(message.text().to_string());
        }
    }
    assert_eq!(received, vec![long, "short".to_string()]);

    controller.shutdown().await;
    assert_eq!(controller.state(), ConnectionState::Disconnected);
}

#[tokio::test]
async fn refused_when_nobody_accepts() {
    let (connector, acceptor) = DuplexConnector::new(16);
    drop(acceptor);
    let (mut controller, _feed) = Controller::new(connector, LinkConfig::default());

    assert!(controller.connect(&Endpoint::new("pipe", 9)).await.is_err());
    assert_eq!(controller.state(), ConnectionState::Disconnected);
}

proptest! {
    #[test]
    fn any_chunking_yields_whole_frames(
        messages in prop::collection::vec("[a-z ]{1,40}", 1..8),
        chunk in 1usize..16,
    ) {
        let runtime = tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap();
        let texts: Vec<&str> = messages.iter().map(String::as_str).collect();

        let received = runtime.block_on(async {
            let stream = TrickleReader::new(script(&texts), chunk);
            let (_session, mut reader) = Session::open(stream, "peer");

            let mut received = Vec::new();
            while let Ok(message) = reader.receive_one().await {
                received.push(message.text().to_string());
            }
            received
        });

        prop_assert_eq!(received, messages);
    }

    #[test]
    fn frame_length_matches_payload(text in "\\PC{1,64}") {
        let frame = Frame::from_text(&text).unwrap();
        prop_assert_eq!(frame.payload_len() as usize, text.len());
        prop_assert_eq!(frame.encoded_len(), text.len() + 4);
    }
}
