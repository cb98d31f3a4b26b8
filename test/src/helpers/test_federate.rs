use std::{collections::VecDeque, net::SocketAddr, time::Duration};

use rti_shared::{
    transport::{write_message, FrameReader, SocketConfig, SocketTcp, TransportError},
    FederateHandle, FederationHandle, NetworkMessage,
};

/// A federate talking to a live coordinator over TCP. Notifications that
/// arrive while waiting for a reply are queued for `next_notification`.
pub struct TestFederate {
    socket: SocketTcp,
    frames: FrameReader,
    config: SocketConfig,
    notifications: VecDeque<NetworkMessage>,
}

fn is_reply(message: &NetworkMessage) -> bool {
    matches!(
        message,
        NetworkMessage::Acknowledge
            | NetworkMessage::FederationJoined { .. }
            | NetworkMessage::ObjectRegistered { .. }
            | NetworkMessage::IdPoolGranted { .. }
            | NetworkMessage::AttributeOwnershipStatus { .. }
            | NetworkMessage::AttributesReleased { .. }
            | NetworkMessage::Exception { .. }
    )
}

impl TestFederate {
    pub fn connect(address: SocketAddr) -> Result<Self, TransportError> {
        let config = SocketConfig::default();
        let socket = SocketTcp::connect(address, &config)?;
        Ok(Self {
            socket,
            frames: FrameReader::new(config.max_message_size),
            config,
            notifications: VecDeque::new(),
        })
    }

    pub fn send(&mut self, message: &NetworkMessage) -> Result<(), TransportError> {
        write_message(&mut self.socket, message, self.config.max_message_size)
    }

    fn read(&mut self) -> Result<NetworkMessage, TransportError> {
        loop {
            match self.frames.read_message(&mut self.socket) {
                Err(TransportError::NetworkSignal { .. }) => continue,
                other => return other,
            }
        }
    }

    /// Sends a request and waits for its reply
    pub fn request(&mut self, message: NetworkMessage) -> Result<NetworkMessage, TransportError> {
        self.send(&message)?;
        loop {
            let incoming = self.read()?;
            if is_reply(&incoming) {
                return Ok(incoming);
            }
            self.notifications.push_back(incoming);
        }
    }

    /// Creates (if needed) and joins a federation
    pub fn join(
        &mut self,
        federation_name: &str,
        federate_name: &str,
    ) -> Result<(FederationHandle, FederateHandle), TransportError> {
        self.request(NetworkMessage::CreateFederationExecution {
            federation_name: federation_name.to_string(),
        })?;
        match self.request(NetworkMessage::JoinFederationExecution {
            federation_name: federation_name.to_string(),
            federate_name: federate_name.to_string(),
        })? {
            NetworkMessage::FederationJoined {
                federation,
                federate,
            } => Ok((federation, federate)),
            other => Err(TransportError::network(format!(
                "join answered with {:?}",
                other
            ))),
        }
    }

    /// The next queued or incoming notification, if one shows up within
    /// `timeout`
    pub fn next_notification(
        &mut self,
        timeout: Duration,
    ) -> Result<Option<NetworkMessage>, TransportError> {
        if let Some(message) = self.notifications.pop_front() {
            return Ok(Some(message));
        }
        if !self.socket.timeout_wait(timeout)? {
            return Ok(None);
        }
        self.read().map(Some)
    }

    /// Says goodbye and closes the connection
    pub fn close(mut self) -> Result<(), TransportError> {
        self.send(&NetworkMessage::CloseConnexion)?;
        self.socket.close()
    }

    /// Drops the connection without a goodbye, as a crashed federate would
    pub fn abort(mut self) {
        let _ = self.socket.close();
    }
}
