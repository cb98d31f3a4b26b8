use thiserror::Error;

/// Failures of the reliable stream transport
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// The call was interrupted by a signal before it could finish. Calling
    /// it again with the same buffer resumes where it stopped.
    #[error("Interrupted by a signal during {context}, the call can be retried")]
    NetworkSignal { context: &'static str },

    /// The connection is gone: the peer closed it, a read or write moved zero
    /// bytes, or the OS reported an error
    #[error("Network error: {reason}")]
    NetworkError { reason: String },
}

impl TransportError {
    pub fn network(reason: impl Into<String>) -> Self {
        Self::NetworkError {
            reason: reason.into(),
        }
    }

    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::NetworkSignal { .. })
    }
}
