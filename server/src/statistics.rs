use std::{
    env,
    sync::atomic::{AtomicU64, Ordering},
};

use log::info;

use rti_shared::NetworkMessage;

/// Setting this variable, to any value, turns the statistics report off
pub const NO_STATISTICS_VARIABLE: &str = "RTI_NO_STATISTICS";

#[derive(Clone, Debug)]
pub struct StatisticsConfig {
    /// Print the report at shutdown
    pub display: bool,
    /// Also list message kinds that were never seen
    pub display_zero: bool,
}

impl StatisticsConfig {
    pub fn from_env() -> Self {
        Self {
            display: env::var_os(NO_STATISTICS_VARIABLE).is_none(),
            ..Self::default()
        }
    }
}

impl Default for StatisticsConfig {
    fn default() -> Self {
        Self {
            display: true,
            display_zero: false,
        }
    }
}

/// Per-kind counters of the requests received from federates and the
/// notifications sent to them. Indexed by `NetworkMessage::NAMES`, so the
/// table exists as soon as the struct does.
pub struct Statistics {
    config: StatisticsConfig,
    received: Box<[AtomicU64]>,
    sent: Box<[AtomicU64]>,
}

fn counters() -> Box<[AtomicU64]> {
    NetworkMessage::NAMES.iter().map(|_| AtomicU64::new(0)).collect()
}

fn index_of(message: &NetworkMessage) -> Option<usize> {
    NetworkMessage::NAMES
        .iter()
        .position(|name| *name == message.name())
}

impl Statistics {
    pub fn new(config: StatisticsConfig) -> Self {
        Self {
            config,
            received: counters(),
            sent: counters(),
        }
    }

    pub fn record_received(&self, message: &NetworkMessage) {
        if let Some(index) = index_of(message) {
            self.received[index].fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn record_sent(&self, message: &NetworkMessage) {
        if let Some(index) = index_of(message) {
            self.sent[index].fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn received(&self, name: &str) -> u64 {
        Self::count(&self.received, name)
    }

    pub fn sent(&self, name: &str) -> u64 {
        Self::count(&self.sent, name)
    }

    pub fn total_received(&self) -> u64 {
        self.received.iter().map(|c| c.load(Ordering::Relaxed)).sum()
    }

    pub fn total_sent(&self) -> u64 {
        self.sent.iter().map(|c| c.load(Ordering::Relaxed)).sum()
    }

    fn count(counters: &[AtomicU64], name: &str) -> u64 {
        NetworkMessage::NAMES
            .iter()
            .position(|known| *known == name)
            .map_or(0, |index| counters[index].load(Ordering::Relaxed))
    }

    /// Report lines, one per message kind, in tag order
    pub fn report(&self) -> Vec<String> {
        let mut lines = vec!["Requests received from federates".to_string()];
        lines.extend(self.section(&self.received));
        lines.push("Notifications sent to federates".to_string());
        lines.extend(self.section(&self.sent));
        lines.push(format!(
            "{} request(s) received, {} notification(s) sent",
            self.total_received(),
            self.total_sent()
        ));
        lines
    }

    fn section(&self, counters: &[AtomicU64]) -> Vec<String> {
        NetworkMessage::NAMES
            .iter()
            .zip(counters.iter())
            .map(|(name, counter)| (name, counter.load(Ordering::Relaxed)))
            .filter(|(_, count)| *count > 0 || self.config.display_zero)
            .map(|(name, count)| format!("{:>8} {}", count, name))
            .collect()
    }

    /// Logs the report unless statistics are disabled
    pub fn log_report(&self) {
        if !self.config.display {
            return;
        }
        for line in self.report() {
            info!("{}", line);
        }
    }
}
