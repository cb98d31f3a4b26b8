mod handler;
pub use handler::ConnectionHandler;

mod socket_server;
pub use socket_server::SocketServer;
