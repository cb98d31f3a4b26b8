use std::{
    io,
    net::{SocketAddr, TcpStream, ToSocketAddrs},
    time::Duration,
};

use log::{debug, trace};

use super::{ByteStream, SocketConfig, TransportError};

/// Reliable stream endpoint. `send` and `receive` move exactly the number of
/// bytes asked for, or fail.
///
/// When a call is interrupted by a signal it returns `NetworkSignal` and
/// remembers how far it got; calling it again with the same buffer resumes
/// from there. Any other failure is fatal and forgets the partial progress.
pub struct SocketTcp<S: ByteStream = TcpStream> {
    stream: S,
    sent_bytes: u64,
    received_bytes: u64,
    send_progress: usize,
    receive_progress: usize,
}

impl<S: ByteStream> SocketTcp<S> {
    pub fn new(stream: S) -> Self {
        Self {
            stream,
            sent_bytes: 0,
            received_bytes: 0,
            send_progress: 0,
            receive_progress: 0,
        }
    }

    /// Writes all of `buffer`
    pub fn send(&mut self, buffer: &[u8]) -> Result<(), TransportError> {
        while self.send_progress < buffer.len() {
            match self.stream.write(&buffer[self.send_progress..]) {
                Ok(0) => {
                    self.send_progress = 0;
                    return Err(TransportError::network(
                        "connection closed by peer while sending",
                    ));
                }
                Ok(count) => {
                    self.send_progress += count;
                    self.sent_bytes += count as u64;
                }
                Err(error) if error.kind() == io::ErrorKind::Interrupted => {
                    trace!(
                        "send interrupted after {}/{} bytes",
                        self.send_progress,
                        buffer.len()
                    );
                    return Err(TransportError::NetworkSignal { context: "send" });
                }
                Err(error) => {
                    self.send_progress = 0;
                    return Err(TransportError::network(format!("send failed: {}", error)));
                }
            }
        }
        self.send_progress = 0;
        Ok(())
    }

    /// Fills all of `buffer`. A zero-byte read means the peer closed the
    /// connection.
    pub fn receive(&mut self, buffer: &mut [u8]) -> Result<(), TransportError> {
        while self.receive_progress < buffer.len() {
            match self.stream.read(&mut buffer[self.receive_progress..]) {
                Ok(0) => {
                    self.receive_progress = 0;
                    return Err(TransportError::network(
                        "connection closed by peer while receiving",
                    ));
                }
                Ok(count) => {
                    self.receive_progress += count;
                    self.received_bytes += count as u64;
                }
                Err(error) if error.kind() == io::ErrorKind::Interrupted => {
                    trace!(
                        "receive interrupted after {}/{} bytes",
                        self.receive_progress,
                        buffer.len()
                    );
                    return Err(TransportError::NetworkSignal { context: "receive" });
                }
                Err(error) => {
                    self.receive_progress = 0;
                    return Err(TransportError::network(format!(
                        "receive failed: {}",
                        error
                    )));
                }
            }
        }
        self.receive_progress = 0;
        Ok(())
    }

    /// Waits at most `timeout` for incoming data. `Ok(false)` means the
    /// deadline passed with nothing to read.
    pub fn timeout_wait(&mut self, timeout: Duration) -> Result<bool, TransportError> {
        match self.stream.wait_readable(timeout) {
            Ok(ready) => Ok(ready),
            Err(error) if error.kind() == io::ErrorKind::Interrupted => {
                Err(TransportError::NetworkSignal {
                    context: "timeout_wait",
                })
            }
            Err(error) => Err(TransportError::network(format!(
                "waiting for data failed: {}",
                error
            ))),
        }
    }

    pub fn close(&mut self) -> Result<(), TransportError> {
        debug!(
            "closing stream, {} bytes sent, {} bytes received",
            self.sent_bytes, self.received_bytes
        );
        self.stream
            .shutdown()
            .map_err(|error| TransportError::network(format!("close failed: {}", error)))
    }

    pub fn sent_bytes(&self) -> u64 {
        self.sent_bytes
    }

    pub fn received_bytes(&self) -> u64 {
        self.received_bytes
    }

    pub fn stream(&self) -> &S {
        &self.stream
    }

    pub fn stream_mut(&mut self) -> &mut S {
        &mut self.stream
    }
}

impl SocketTcp<TcpStream> {
    /// Opens a connection to a coordinator and applies `config` to it
    pub fn connect<A: ToSocketAddrs>(
        address: A,
        config: &SocketConfig,
    ) -> Result<Self, TransportError> {
        let stream = TcpStream::connect(address)
            .map_err(|error| TransportError::network(format!("connect failed: {}", error)))?;
        Self::from_connected(stream, config)
    }

    /// Wraps a freshly accepted or connected stream
    pub fn from_connected(
        stream: TcpStream,
        config: &SocketConfig,
    ) -> Result<Self, TransportError> {
        ByteStream::set_nodelay(&stream, config.nodelay).map_err(|error| {
            TransportError::network(format!("setting TCP_NODELAY failed: {}", error))
        })?;
        Ok(Self::new(stream))
    }

    /// A second handle on the same connection, with its own counters. Used to
    /// give reading and writing to different threads.
    pub fn try_clone(&self) -> Result<Self, TransportError> {
        self.stream
            .try_clone()
            .map(Self::new)
            .map_err(|error| TransportError::network(format!("cloning stream failed: {}", error)))
    }

    pub fn peer_addr(&self) -> Result<SocketAddr, TransportError> {
        self.stream
            .peer_addr()
            .map_err(|error| TransportError::network(error.to_string()))
    }
}
