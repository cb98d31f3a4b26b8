use std::collections::{BTreeMap, BTreeSet};

use crate::types::{AttributeHandle, FederateHandle, ObjectClassHandle, ObjectHandle};

/// Ownership of one attribute of one object instance, as a federate would
/// observe it
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OwnershipState {
    Owned(FederateHandle),
    Unowned,
    /// The owner offered the attribute and nobody has taken it yet
    DivestitureInNegotiation(FederateHandle),
    /// Someone asked the owner to release the attribute; holds the first
    /// requester
    AcquisitionPending(FederateHandle),
}

#[derive(Clone, Debug, Default)]
pub struct AttributeOwnership {
    pub(crate) owner: Option<FederateHandle>,
    pub(crate) divesting: bool,
    /// Federates waiting for the owner to release, oldest first
    pub(crate) candidates: Vec<FederateHandle>,
}

impl AttributeOwnership {
    pub fn owner(&self) -> Option<FederateHandle> {
        self.owner
    }

    pub fn is_divesting(&self) -> bool {
        self.divesting
    }

    pub fn is_candidate(&self, federate: FederateHandle) -> bool {
        self.candidates.contains(&federate)
    }

    pub fn state(&self) -> OwnershipState {
        match self.owner {
            None => OwnershipState::Unowned,
            Some(owner) if self.divesting => OwnershipState::DivestitureInNegotiation(owner),
            Some(owner) => match self.candidates.first() {
                Some(candidate) => OwnershipState::AcquisitionPending(*candidate),
                None => OwnershipState::Owned(owner),
            },
        }
    }

    /// Hands the attribute to `federate`, clearing any negotiation
    pub(crate) fn transfer_to(&mut self, federate: FederateHandle) -> Option<FederateHandle> {
        self.candidates.retain(|candidate| *candidate != federate);
        self.divesting = false;
        self.owner.replace(federate)
    }

    pub(crate) fn release(&mut self) {
        self.owner = None;
        self.divesting = false;
    }
}

/// A registered object instance
#[derive(Clone, Debug)]
pub struct ObjectInstance {
    handle: ObjectHandle,
    name: String,
    class: ObjectClassHandle,
    /// Holder of the delete privilege, the federate that registered it
    registrant: FederateHandle,
    pub(crate) attributes: BTreeMap<AttributeHandle, AttributeOwnership>,
    pub(crate) discovered_by: BTreeSet<FederateHandle>,
}

impl ObjectInstance {
    pub(crate) fn new(
        handle: ObjectHandle,
        name: String,
        class: ObjectClassHandle,
        registrant: FederateHandle,
    ) -> Self {
        Self {
            handle,
            name,
            class,
            registrant,
            attributes: BTreeMap::new(),
            discovered_by: BTreeSet::new(),
        }
    }

    pub fn handle(&self) -> ObjectHandle {
        self.handle
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn class(&self) -> ObjectClassHandle {
        self.class
    }

    pub fn registrant(&self) -> FederateHandle {
        self.registrant
    }

    pub fn ownership(&self, attribute: AttributeHandle) -> Option<&AttributeOwnership> {
        self.attributes.get(&attribute)
    }

    pub fn is_owned_by(&self, attribute: AttributeHandle, federate: FederateHandle) -> bool {
        self.attributes
            .get(&attribute)
            .map_or(false, |ownership| ownership.owner == Some(federate))
    }

    pub fn is_discovered_by(&self, federate: FederateHandle) -> bool {
        self.discovered_by.contains(&federate)
    }

    pub fn owns_any(&self, federate: FederateHandle) -> bool {
        self.attributes
            .values()
            .any(|ownership| ownership.owner == Some(federate))
    }
}
