//! # RTI Server
//! The federation coordinator: accepts federate connections over TCP, keeps
//! the registry of running federation executions and routes declarations,
//! object updates, interactions and ownership traffic between federates.

#![deny(
    trivial_casts,
    trivial_numeric_casts,
    unstable_features,
    unused_import_braces
)]

pub mod shared {
    pub use rti_shared::{
        transport::{SocketConfig, TransportError},
        ErrorKind, NetworkMessage, ObjectModel, ObjectModelBuilder, RtiError,
    };
}

mod connection;
mod error;
mod federation;
mod federations_list;
mod server;
mod statistics;

pub use connection::{ConnectionHandler, SocketServer};
pub use error::RtiServerError;
pub use federation::{Federate, Federation, FederationInfo};
pub use federations_list::FederationsList;
pub use server::{Server, ServerConfig, ServerHandle, DEFAULT_PORT};
pub use statistics::{Statistics, StatisticsConfig, NO_STATISTICS_VARIABLE};
