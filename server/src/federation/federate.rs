use rti_shared::{FederateHandle, LinkKey};

/// A joined simulation participant, and the connection it talks through
#[derive(Clone, Debug)]
pub struct Federate {
    handle: FederateHandle,
    name: String,
    link: LinkKey,
    pub(crate) constrained: bool,
}

impl Federate {
    pub fn new(handle: FederateHandle, name: &str, link: LinkKey) -> Self {
        Self {
            handle,
            name: name.to_string(),
            link,
            constrained: false,
        }
    }

    pub fn handle(&self) -> FederateHandle {
        self.handle
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn link(&self) -> &LinkKey {
        &self.link
    }

    pub fn is_constrained(&self) -> bool {
        self.constrained
    }
}
