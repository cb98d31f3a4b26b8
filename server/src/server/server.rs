use std::{
    net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr, TcpStream},
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    thread,
};

use log::{debug, info, warn};

use rti_shared::{
    transport::{SocketTcp, TcpServer, TransportError},
    ObjectModel,
};

use crate::{
    connection::{ConnectionHandler, SocketServer},
    federations_list::FederationsList,
    statistics::Statistics,
    RtiServerError, ServerConfig,
};

/// The federation coordinator: accepts federate connections over TCP and
/// serves each on its own thread against a shared `FederationsList`
pub struct Server {
    config: ServerConfig,
    federations: Arc<FederationsList>,
    sockets: Arc<SocketServer>,
    statistics: Arc<Statistics>,
    listener: Option<TcpServer>,
    shutdown: Arc<AtomicBool>,
}

impl Server {
    /// Create a new Server. Every federation created on it starts from its
    /// own copy of `model`.
    pub fn new(config: ServerConfig, model: ObjectModel) -> Self {
        let statistics = Arc::new(Statistics::new(config.statistics.clone()));
        let sockets = Arc::new(SocketServer::new(
            statistics.clone(),
            config.socket.max_message_size,
        ));
        let federations = Arc::new(FederationsList::new(
            model,
            sockets.clone(),
            config.max_federations,
            config.max_federates,
        ));
        Self {
            config,
            federations,
            sockets,
            statistics,
            listener: None,
            shutdown: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Binds the configured address. Returns the address actually bound,
    /// which differs from the configured one when port 0 was asked for.
    pub fn listen(&mut self) -> Result<SocketAddr, RtiServerError> {
        if let Some(listener) = &self.listener {
            return Err(RtiServerError::AlreadyListening {
                address: listener
                    .local_addr()
                    .map_or_else(|_| "?".to_string(), |address| address.to_string()),
            });
        }
        let listener = TcpServer::bind(
            self.config.listen_addr,
            self.config.reuse_address,
            self.config.listen_backlog,
            self.config.socket.clone(),
        )?;
        let address = listener.local_addr()?;
        self.listener = Some(listener);
        Ok(address)
    }

    /// Returns whether or not the Server is bound and accepting federates
    pub fn is_listening(&self) -> bool {
        self.listener.is_some()
    }

    pub fn local_addr(&self) -> Result<SocketAddr, RtiServerError> {
        let listener = self.listener.as_ref().ok_or(RtiServerError::NotListening)?;
        Ok(listener.local_addr()?)
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    pub fn federations(&self) -> &Arc<FederationsList> {
        &self.federations
    }

    pub fn statistics(&self) -> &Arc<Statistics> {
        &self.statistics
    }

    /// Number of open federate connections
    pub fn connection_count(&self) -> usize {
        self.sockets.len()
    }

    /// A handle that stops `serve` from another thread
    pub fn handle(&self) -> Result<ServerHandle, RtiServerError> {
        Ok(ServerHandle {
            address: self.local_addr()?,
            shutdown: self.shutdown.clone(),
        })
    }

    /// Accepts federates until stopped through a `ServerHandle`. Each
    /// connection is served on its own thread.
    pub fn serve(&self) -> Result<(), RtiServerError> {
        let listener = self.listener.as_ref().ok_or(RtiServerError::NotListening)?;
        loop {
            let accepted = listener.accept();
            if self.shutdown.load(Ordering::SeqCst) {
                info!("coordinator stopping");
                return Ok(());
            }
            match accepted {
                Ok((socket, address)) => {
                    if let Err(error) = self.open_connection(socket, address) {
                        warn!("connection from {} refused: {}", address, error);
                    }
                }
                Err(TransportError::NetworkSignal { .. }) => continue,
                Err(error) => return Err(error.into()),
            }
        }
    }

    fn open_connection(
        &self,
        socket: SocketTcp<TcpStream>,
        address: SocketAddr,
    ) -> Result<(), RtiServerError> {
        let reader = socket.try_clone()?;
        let link = self.sockets.register(socket)?;
        info!("federate connected from {} on {}", address, link);

        let handler = ConnectionHandler::new(
            link,
            reader,
            self.config.socket.max_message_size,
            self.federations.clone(),
            self.sockets.clone(),
            self.statistics.clone(),
        );
        let spawned = thread::Builder::new()
            .name(format!("rti-{}", link))
            .spawn(move || handler.run());
        if let Err(error) = spawned {
            self.sockets.unregister(&link);
            return Err(RtiServerError::SpawnFailed {
                link: link.to_string(),
                reason: error.to_string(),
            });
        }
        Ok(())
    }
}

impl Drop for Server {
    fn drop(&mut self) {
        self.statistics.log_report();
    }
}

/// Stops a running `Server::serve` loop
#[derive(Clone, Debug)]
pub struct ServerHandle {
    address: SocketAddr,
    shutdown: Arc<AtomicBool>,
}

impl ServerHandle {
    pub fn address(&self) -> SocketAddr {
        self.address
    }

    /// Raises the stop flag and wakes the accept loop with a throwaway
    /// connection
    pub fn stop(&self) {
        self.shutdown.store(true, Ordering::SeqCst);
        let mut address = self.address;
        match address.ip() {
            IpAddr::V4(ip) if ip.is_unspecified() => address.set_ip(Ipv4Addr::LOCALHOST.into()),
            IpAddr::V6(ip) if ip.is_unspecified() => address.set_ip(Ipv6Addr::LOCALHOST.into()),
            _ => {}
        }
        if let Err(error) = TcpStream::connect(address) {
            debug!("waking the accept loop failed: {}", error);
        }
    }
}
