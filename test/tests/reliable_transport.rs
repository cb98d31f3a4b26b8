//! The stream transport over in-memory pipes that split transfers into
//! small pieces and interrupt every other call.

use proptest::prelude::*;

use rti_shared::{
    transport::{encode_frame, write_message, FrameReader, SocketTcp, TransportError},
    AttributeHandle, FederateHandle, NetworkMessage, ObjectHandle,
};
use rti_test::{LocalStream, LocalStreamPair};

fn sockets(pair: LocalStreamPair) -> (SocketTcp<LocalStream>, SocketTcp<LocalStream>) {
    let (left, right) = pair.split();
    (SocketTcp::new(left), SocketTcp::new(right))
}

fn send_all(socket: &mut SocketTcp<LocalStream>, bytes: &[u8]) -> usize {
    let mut signals = 0;
    loop {
        match socket.send(bytes) {
            Ok(()) => return signals,
            Err(TransportError::NetworkSignal { .. }) => signals += 1,
            Err(error) => panic!("send failed: {}", error),
        }
    }
}

fn receive_all(socket: &mut SocketTcp<LocalStream>, buffer: &mut [u8]) -> usize {
    let mut signals = 0;
    loop {
        match socket.receive(buffer) {
            Ok(()) => return signals,
            Err(TransportError::NetworkSignal { .. }) => signals += 1,
            Err(error) => panic!("receive failed: {}", error),
        }
    }
}

#[test]
fn transfers_larger_than_a_chunk_are_completed() {
    let (mut left, mut right) = sockets(LocalStreamPair::new(3));
    let bytes: Vec<u8> = (0..10).collect();

    left.send(&bytes).unwrap();
    assert_eq!(left.stream().writes(), 4);
    assert_eq!(left.sent_bytes(), 10);

    let mut buffer = [0u8; 10];
    right.receive(&mut buffer).unwrap();
    assert_eq!(&buffer[..], &bytes[..]);
    assert_eq!(right.stream().reads(), 4);
    assert_eq!(right.received_bytes(), 10);
    assert_eq!(right.stream().pending(), 0);
}

#[test]
fn interrupted_calls_resume_where_they_stopped() {
    let (mut left, mut right) = sockets(LocalStreamPair::interrupted(4));
    let bytes: Vec<u8> = (0..32).rev().collect();

    assert!(send_all(&mut left, &bytes) > 0);
    assert_eq!(left.sent_bytes(), 32);

    let mut buffer = vec![0u8; 32];
    assert!(receive_all(&mut right, &mut buffer) > 0);
    assert_eq!(buffer, bytes);
    assert!(right.stream().reads() > 1);
}

#[test]
fn a_closed_peer_is_a_network_error() {
    let (left, mut right) = sockets(LocalStreamPair::new(8));
    drop(left);

    let mut buffer = [0u8; 4];
    let error = right.receive(&mut buffer).unwrap_err();
    assert!(matches!(error, TransportError::NetworkError { .. }));
    assert!(!error.is_recoverable());

    let error = right.send(&[1, 2, 3]).unwrap_err();
    assert!(matches!(error, TransportError::NetworkError { .. }));
}

#[test]
fn a_peer_closing_mid_transfer_is_a_network_error() {
    let (mut left, mut right) = sockets(LocalStreamPair::new(8));
    left.send(&[1, 2]).unwrap();
    left.close().unwrap();

    let mut buffer = [0u8; 4];
    assert!(matches!(
        right.receive(&mut buffer),
        Err(TransportError::NetworkError { .. })
    ));
}

#[test]
fn messages_survive_interrupted_framing() {
    let (mut left, mut right) = sockets(LocalStreamPair::interrupted(5));
    let messages = vec![
        NetworkMessage::JoinFederationExecution {
            federation_name: "exercise".to_string(),
            federate_name: "pilot".to_string(),
        },
        NetworkMessage::ReflectAttributeValues {
            object: ObjectHandle::new(3),
            values: vec![(AttributeHandle::new(2), vec![7; 40])],
            time: 1.5,
            tag: "tick".to_string(),
        },
        NetworkMessage::NullMessage {
            federate: FederateHandle::new(2),
            time: 8.0,
        },
        NetworkMessage::CloseConnexion,
    ];
    for message in &messages {
        write_message(&mut left, message, 1024).unwrap();
    }

    let mut frames = FrameReader::new(1024);
    let mut received = Vec::new();
    while received.len() < messages.len() {
        match frames.read_message(&mut right) {
            Ok(message) => received.push(message),
            Err(TransportError::NetworkSignal { .. }) => continue,
            Err(error) => panic!("read failed: {}", error),
        }
    }
    assert_eq!(received, messages);
}

#[test]
fn oversized_frames_are_refused() {
    let (mut left, mut right) = sockets(LocalStreamPair::new(64));
    left.send(&encode_frame(&[0; 100])).unwrap();
    let mut frames = FrameReader::new(16);
    assert!(matches!(
        frames.read_frame(&mut right),
        Err(TransportError::NetworkError { .. })
    ));

    let message = NetworkMessage::Exception {
        name: "RTIinternalError".to_string(),
        reason: "x".repeat(64),
    };
    assert!(matches!(
        write_message(&mut left, &message, 16),
        Err(TransportError::NetworkError { .. })
    ));
}

#[test]
fn a_malformed_payload_is_a_network_error() {
    let (mut left, mut right) = sockets(LocalStreamPair::new(64));
    left.send(&encode_frame(&[250, 1, 2])).unwrap();
    let mut frames = FrameReader::new(64);
    assert!(matches!(
        frames.read_message(&mut right),
        Err(TransportError::NetworkError { .. })
    ));
}

proptest! {
    #[test]
    fn any_payload_arrives_intact(
        bytes in proptest::collection::vec(any::<u8>(), 1..512),
        chunk in 1usize..16,
        interrupt in any::<bool>(),
    ) {
        let pair = if interrupt {
            LocalStreamPair::interrupted(chunk)
        } else {
            LocalStreamPair::new(chunk)
        };
        let (mut left, mut right) = sockets(pair);
        send_all(&mut left, &bytes);
        let mut buffer = vec![0u8; bytes.len()];
        receive_all(&mut right, &mut buffer);
        prop_assert_eq!(buffer, bytes.clone());
        prop_assert!(right.stream().reads() >= (bytes.len() + chunk - 1) / chunk);
    }
}
