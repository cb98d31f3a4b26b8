use crate::{messages::network_message::NetworkMessage, types::FederateHandle};

/// Notifications produced by one operation, in the order they must be sent.
/// The federation flushes it through its `MessageSink` once the operation
/// has succeeded.
#[derive(Debug, Default)]
pub struct Outbox {
    messages: Vec<(FederateHandle, NetworkMessage)>,
}

impl Outbox {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, federate: FederateHandle, message: NetworkMessage) {
        self.messages.push((federate, message));
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &(FederateHandle, NetworkMessage)> {
        self.messages.iter()
    }

    pub fn drain(&mut self) -> std::vec::Drain<'_, (FederateHandle, NetworkMessage)> {
        self.messages.drain(..)
    }

    /// Messages addressed to `federate`, in order
    pub fn messages_for(&self, federate: FederateHandle) -> Vec<&NetworkMessage> {
        self.messages
            .iter()
            .filter(|(to, _)| *to == federate)
            .map(|(_, message)| message)
            .collect()
    }
}
