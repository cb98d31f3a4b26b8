use std::{
    io,
    net::{SocketAddr, TcpListener, TcpStream},
};

use log::{info, warn};
use socket2::{Domain, Protocol, Socket, Type};

use super::{SocketConfig, SocketTcp, TransportError};

/// Listening side of the reliable transport
pub struct TcpServer {
    listener: TcpListener,
    config: SocketConfig,
}

impl TcpServer {
    /// Opens, binds and listens on `address`. If the address is still in use
    /// and `reuse_address` is set, binding is retried once with
    /// `SO_REUSEADDR`.
    pub fn bind(
        address: SocketAddr,
        reuse_address: bool,
        backlog: i32,
        config: SocketConfig,
    ) -> Result<Self, TransportError> {
        let socket = match open_and_bind(address, false) {
            Ok(socket) => socket,
            Err(error) if error.kind() == io::ErrorKind::AddrInUse && reuse_address => {
                warn!("{} is in use, retrying bind with address reuse", address);
                open_and_bind(address, true).map_err(|error| {
                    TransportError::network(format!("bind to {} failed: {}", address, error))
                })?
            }
            Err(error) => {
                return Err(TransportError::network(format!(
                    "bind to {} failed: {}",
                    address, error
                )));
            }
        };
        socket
            .listen(backlog)
            .map_err(|error| TransportError::network(format!("listen failed: {}", error)))?;

        let listener: TcpListener = socket.into();
        if let Ok(local) = listener.local_addr() {
            info!("listening on {}", local);
        }
        Ok(Self { listener, config })
    }

    /// Blocks until a federate connects
    pub fn accept(&self) -> Result<(SocketTcp<TcpStream>, SocketAddr), TransportError> {
        match self.listener.accept() {
            Ok((stream, address)) => {
                Ok((SocketTcp::from_connected(stream, &self.config)?, address))
            }
            Err(error) if error.kind() == io::ErrorKind::Interrupted => {
                Err(TransportError::NetworkSignal { context: "accept" })
            }
            Err(error) => Err(TransportError::network(format!("accept failed: {}", error))),
        }
    }

    pub fn local_addr(&self) -> Result<SocketAddr, TransportError> {
        self.listener
            .local_addr()
            .map_err(|error| TransportError::network(error.to_string()))
    }

    pub fn config(&self) -> &SocketConfig {
        &self.config
    }
}

fn open_and_bind(address: SocketAddr, reuse_address: bool) -> io::Result<Socket> {
    let socket = Socket::new(Domain::for_address(address), Type::STREAM, Some(Protocol::TCP))?;
    if reuse_address {
        allow_address_reuse(&socket)?;
    }
    socket.bind(&address.into())?;
    Ok(socket)
}

cfg_if! {
    if #[cfg(windows)] {
        // SO_REUSEADDR on Windows lets a second listener hijack a live port,
        // which is not what a restarted coordinator wants
        fn allow_address_reuse(_socket: &Socket) -> io::Result<()> {
            warn!("address reuse is not supported on this platform");
            Ok(())
        }
    } else {
        fn allow_address_reuse(socket: &Socket) -> io::Result<()> {
            socket.set_reuse_address(true)
        }
    }
}
