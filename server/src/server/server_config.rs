use std::{
    default::Default,
    net::{Ipv4Addr, SocketAddr},
};

use rti_shared::transport::SocketConfig;

use crate::statistics::StatisticsConfig;

/// Port the coordinator listens on unless told otherwise
pub const DEFAULT_PORT: u16 = 60400;

/// Contains Config properties which will be used by the Server
#[derive(Clone, Debug)]
pub struct ServerConfig {
    /// Address federates connect to
    pub listen_addr: SocketAddr,
    /// If the address is still in use (typically by a coordinator that just
    /// exited), retry the bind once with address reuse enabled
    pub reuse_address: bool,
    /// Number of federation executions that may run at once
    pub max_federations: usize,
    /// Number of federates one federation execution admits
    pub max_federates: usize,
    /// Pending connections the listening socket queues
    pub listen_backlog: i32,
    /// Used to configure every federate connection
    pub socket: SocketConfig,
    /// Message counters reported at shutdown
    pub statistics: StatisticsConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        let max_federations = 20;
        let max_federates = 20;
        Self {
            listen_addr: SocketAddr::from((Ipv4Addr::UNSPECIFIED, DEFAULT_PORT)),
            reuse_address: false,
            max_federations,
            max_federates,
            listen_backlog: (max_federations * max_federates) as i32,
            socket: SocketConfig::default(),
            statistics: StatisticsConfig::from_env(),
        }
    }
}
