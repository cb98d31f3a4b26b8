use crate::{messages::network_message::NetworkMessage, transport::TransportError, types::LinkKey};

/// Delivers notifications to the federate behind a link. The coordinator
/// implements this over its open connections; tests record what was sent.
pub trait MessageSink: Send + Sync {
    fn deliver(&self, link: &LinkKey, message: &NetworkMessage) -> Result<(), TransportError>;
}
