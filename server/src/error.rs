use thiserror::Error;

use rti_shared::{transport::TransportError, RtiError};

/// Failures of the coordinator process itself, as opposed to the exceptions
/// reported back to federates
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RtiServerError {
    /// `serve` or `local_addr` was called before `listen`
    #[error("The server is not listening. Call listen() first")]
    NotListening,

    /// `listen` was called twice
    #[error("The server is already listening on {address}")]
    AlreadyListening { address: String },

    /// Binding, accepting or spawning a connection failed
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    /// A federation operation failed
    #[error("RTI error: {0}")]
    Rti(#[from] RtiError),

    /// A connection thread could not be started
    #[error("Could not spawn the handler for {link}: {reason}")]
    SpawnFailed { link: String, reason: String },
}
