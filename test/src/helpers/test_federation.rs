use std::sync::Arc;

use rti_server::FederationsList;
use rti_shared::{FederateHandle, FederationHandle, LinkKey, NetworkMessage};

use crate::helpers::{fixtures::vehicle_model, RecordingSink};

/// A registry holding one federation built from `vehicle_model`, whose
/// notifications land in a `RecordingSink`
pub struct TestFederation {
    pub list: FederationsList,
    pub sink: Arc<RecordingSink>,
    pub handle: FederationHandle,
    links: Vec<(FederateHandle, LinkKey)>,
}

impl TestFederation {
    pub fn new() -> Self {
        let sink = Arc::new(RecordingSink::new());
        let list = FederationsList::new(vehicle_model(), sink.clone(), 4, 8);
        let handle = list.create("test").expect("first federation is accepted");
        Self {
            list,
            sink,
            handle,
            links: Vec::new(),
        }
    }

    /// Joins a federate on a fresh link
    pub fn join(&mut self, name: &str) -> FederateHandle {
        let link = LinkKey::new(self.links.len() as u64 + 1);
        let federate = self
            .list
            .add_federate(self.handle, name, link)
            .expect("join succeeds");
        self.links.push((federate, link));
        federate
    }

    pub fn link(&self, federate: FederateHandle) -> LinkKey {
        self.links
            .iter()
            .find(|(known, _)| *known == federate)
            .map(|(_, link)| *link)
            .expect("federate joined through this fixture")
    }

    /// Removes and returns what was delivered to `federate`
    pub fn received(&self, federate: FederateHandle) -> Vec<NetworkMessage> {
        self.sink.take_for(self.link(federate))
    }
}

impl Default for TestFederation {
    fn default() -> Self {
        Self::new()
    }
}
