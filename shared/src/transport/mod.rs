mod byte_stream;
mod error;
mod framed;
mod socket_config;
mod socket_tcp;
mod tcp_server;

pub use byte_stream::ByteStream;
pub use error::TransportError;
pub use framed::{encode_frame, write_message, FrameReader};
pub use socket_config::{SocketConfig, DEFAULT_MAX_MESSAGE_SIZE};
pub use socket_tcp::SocketTcp;
pub use tcp_server::TcpServer;
