use std::default::Default;

/// Largest frame the coordinator accepts by default
pub const DEFAULT_MAX_MESSAGE_SIZE: usize = 1 << 20;

/// Contains Config properties applied to every TCP connection
#[derive(Clone, Debug)]
pub struct SocketConfig {
    /// Disable Nagle's algorithm right after the handshake
    pub nodelay: bool,
    /// Frames announcing a larger payload than this are refused and the
    /// connection is treated as broken
    pub max_message_size: usize,
}

impl Default for SocketConfig {
    fn default() -> Self {
        Self {
            nodelay: true,
            max_message_size: DEFAULT_MAX_MESSAGE_SIZE,
        }
    }
}
