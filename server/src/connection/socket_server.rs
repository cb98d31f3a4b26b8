use std::{
    collections::HashMap,
    net::TcpStream,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc, Mutex, RwLock,
    },
};

use log::{debug, warn};

use rti_shared::{
    transport::{write_message, ByteStream, SocketTcp, TransportError},
    LinkKey, MessageSink, NetworkMessage,
};

use crate::statistics::Statistics;

/// The writing halves of every open federate connection, by link key.
/// Replies and broadcast notifications both go out through here, so one
/// frame is always written whole before the next one starts.
pub struct SocketServer<S: ByteStream = TcpStream> {
    connections: RwLock<HashMap<LinkKey, Arc<Mutex<SocketTcp<S>>>>>,
    next_link: AtomicU64,
    statistics: Arc<Statistics>,
    max_message_size: usize,
}

impl<S: ByteStream> SocketServer<S> {
    pub fn new(statistics: Arc<Statistics>, max_message_size: usize) -> Self {
        Self {
            connections: RwLock::new(HashMap::new()),
            next_link: AtomicU64::new(1),
            statistics,
            max_message_size,
        }
    }

    pub fn register(&self, writer: SocketTcp<S>) -> Result<LinkKey, TransportError> {
        let link = LinkKey::new(self.next_link.fetch_add(1, Ordering::SeqCst));
        self.connections
            .write()
            .map_err(|_| TransportError::network("connection table poisoned"))?
            .insert(link, Arc::new(Mutex::new(writer)));
        debug!("{} registered", link);
        Ok(link)
    }

    /// Forgets and closes a connection. Unknown links are ignored.
    pub fn unregister(&self, link: &LinkKey) {
        let removed = match self.connections.write() {
            Ok(mut connections) => connections.remove(link),
            Err(_) => {
                warn!("connection table poisoned, {} left open", link);
                return;
            }
        };
        let Some(writer) = removed else {
            return;
        };
        if let Ok(mut writer) = writer.lock() {
            if let Err(error) = writer.close() {
                debug!("closing {}: {}", link, error);
            }
            debug!(
                "{} unregistered after {} bytes sent",
                link,
                writer.sent_bytes()
            );
        };
    }

    pub fn len(&self) -> usize {
        self.connections
            .read()
            .map_or(0, |connections| connections.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, link: &LinkKey) -> bool {
        self.connections
            .read()
            .map_or(false, |connections| connections.contains_key(link))
    }

    /// Writes one framed message to `link`
    pub fn send(&self, link: &LinkKey, message: &NetworkMessage) -> Result<(), TransportError> {
        let writer = self
            .connections
            .read()
            .map_err(|_| TransportError::network("connection table poisoned"))?
            .get(link)
            .cloned()
            .ok_or_else(|| TransportError::network(format!("{} is not connected", link)))?;
        let mut writer = writer
            .lock()
            .map_err(|_| TransportError::network(format!("{} writer poisoned", link)))?;
        write_message(&mut writer, message, self.max_message_size)?;
        self.statistics.record_sent(message);
        Ok(())
    }
}

impl<S: ByteStream> MessageSink for SocketServer<S> {
    fn deliver(&self, link: &LinkKey, message: &NetworkMessage) -> Result<(), TransportError> {
        self.send(link, message)
    }
}
