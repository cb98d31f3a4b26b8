mod server;
pub use server::{Server, ServerHandle};

mod server_config;
pub use server_config::{ServerConfig, DEFAULT_PORT};
