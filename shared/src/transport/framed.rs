use log::trace;

use crate::messages::network_message::NetworkMessage;

use super::{ByteStream, SocketTcp, TransportError};

const HEADER_SIZE: usize = 4;

enum Stage {
    Header,
    Payload,
}

/// Reads length-prefixed frames (`u32` big-endian length, then payload) off a
/// `SocketTcp`. Keeps its buffers between calls, so a read interrupted by
/// `NetworkSignal` resumes on the next call.
pub struct FrameReader {
    max_message_size: usize,
    header: [u8; HEADER_SIZE],
    payload: Vec<u8>,
    stage: Stage,
}

impl FrameReader {
    pub fn new(max_message_size: usize) -> Self {
        Self {
            max_message_size,
            header: [0; HEADER_SIZE],
            payload: Vec::new(),
            stage: Stage::Header,
        }
    }

    pub fn read_frame<S: ByteStream>(
        &mut self,
        socket: &mut SocketTcp<S>,
    ) -> Result<Vec<u8>, TransportError> {
        if let Stage::Header = self.stage {
            let result = socket.receive(&mut self.header);
            self.guard(result)?;
            let length = u32::from_be_bytes(self.header) as usize;
            if length > self.max_message_size {
                return Err(TransportError::network(format!(
                    "frame of {} bytes exceeds the {} byte limit",
                    length, self.max_message_size
                )));
            }
            self.payload = vec![0; length];
            self.stage = Stage::Payload;
        }
        let result = socket.receive(&mut self.payload);
        self.guard(result)?;
        self.stage = Stage::Header;
        Ok(std::mem::take(&mut self.payload))
    }

    pub fn read_message<S: ByteStream>(
        &mut self,
        socket: &mut SocketTcp<S>,
    ) -> Result<NetworkMessage, TransportError> {
        let frame = self.read_frame(socket)?;
        let message = NetworkMessage::from_bytes(&frame)
            .map_err(|error| TransportError::network(format!("malformed message: {}", error)))?;
        trace!("received {}", message.name());
        Ok(message)
    }

    fn guard(&mut self, result: Result<(), TransportError>) -> Result<(), TransportError> {
        if let Err(TransportError::NetworkError { .. }) = result {
            self.stage = Stage::Header;
        }
        result
    }
}

/// Prefixes `payload` with its length
pub fn encode_frame(payload: &[u8]) -> Vec<u8> {
    let mut frame = Vec::with_capacity(HEADER_SIZE + payload.len());
    frame.extend_from_slice(&(payload.len() as u32).to_be_bytes());
    frame.extend_from_slice(payload);
    frame
}

/// Sends one message as a single frame. `SocketTcp::send` still reports
/// every interruption as `NetworkSignal`; this is the caller that retries it,
/// resuming from the bytes already written, so a started frame is always
/// finished.
pub fn write_message<S: ByteStream>(
    socket: &mut SocketTcp<S>,
    message: &NetworkMessage,
    max_message_size: usize,
) -> Result<(), TransportError> {
    let payload = message.to_bytes();
    if payload.len() > max_message_size {
        return Err(TransportError::network(format!(
            "{} of {} bytes exceeds the {} byte limit",
            message.name(),
            payload.len(),
            max_message_size
        )));
    }
    let frame = encode_frame(&payload);
    loop {
        match socket.send(&frame) {
            Err(TransportError::NetworkSignal { .. }) => continue,
            other => {
                trace!("sent {}", message.name());
                return other;
            }
        }
    }
}
