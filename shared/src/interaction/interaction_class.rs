use std::collections::{BTreeMap, BTreeSet};

use crate::{
    broadcast_list::{Audience, BroadcastLevel},
    error::RtiError,
    messages::network_message::NetworkMessage,
    types::{FederateHandle, InteractionClassHandle, ParameterHandle, SecurityLevel},
};

/// One node of the interaction class tree. Declarations are per class, not
/// per parameter.
#[derive(Clone, Debug)]
pub struct InteractionClass {
    handle: InteractionClassHandle,
    name: String,
    pub(crate) parent: Option<InteractionClassHandle>,
    pub(crate) children: Vec<InteractionClassHandle>,
    pub(crate) level: SecurityLevel,
    pub(crate) parameters: BTreeMap<ParameterHandle, String>,
    pub(crate) publishers: BTreeSet<FederateHandle>,
    pub(crate) subscribers: BTreeSet<FederateHandle>,
}

impl InteractionClass {
    pub fn new(
        handle: InteractionClassHandle,
        name: impl Into<String>,
        level: SecurityLevel,
    ) -> Self {
        Self {
            handle,
            name: name.into(),
            parent: None,
            children: Vec::new(),
            level,
            parameters: BTreeMap::new(),
            publishers: BTreeSet::new(),
            subscribers: BTreeSet::new(),
        }
    }

    pub fn add_parameter(
        &mut self,
        handle: ParameterHandle,
        name: impl Into<String>,
    ) -> Result<(), RtiError> {
        if !handle.is_valid() || self.parameters.contains_key(&handle) {
            return Err(RtiError::internal(format!(
                "parameter handle {} rejected in interaction class {}",
                handle, self.name
            )));
        }
        self.parameters.insert(handle, name.into());
        Ok(())
    }

    pub(crate) fn inherit_from(&mut self, parent: &InteractionClass) -> Result<(), RtiError> {
        if let Some(handle) = parent
            .parameters
            .keys()
            .find(|handle| self.parameters.contains_key(handle))
        {
            return Err(RtiError::internal(format!(
                "interaction class {} redefines parameter {} inherited from class {}",
                self.handle, handle, parent.handle
            )));
        }
        for (handle, name) in &parent.parameters {
            self.parameters.insert(*handle, name.clone());
        }
        self.level = parent.level;
        self.parent = Some(parent.handle);
        Ok(())
    }

    pub fn handle(&self) -> InteractionClassHandle {
        self.handle
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn parent(&self) -> Option<InteractionClassHandle> {
        self.parent
    }

    pub fn children(&self) -> &[InteractionClassHandle] {
        &self.children
    }

    pub fn security_level(&self) -> SecurityLevel {
        self.level
    }

    pub fn parameter_handle(&self, name: &str) -> Result<ParameterHandle, RtiError> {
        self.parameters
            .iter()
            .find(|(_, parameter)| parameter.as_str() == name)
            .map(|(handle, _)| *handle)
            .ok_or_else(|| RtiError::NameNotFound {
                kind: "parameter",
                name: name.to_string(),
            })
    }

    pub fn parameter_name(&self, handle: ParameterHandle) -> Result<&str, RtiError> {
        self.parameters
            .get(&handle)
            .map(String::as_str)
            .ok_or(RtiError::InteractionParameterNotDefined {
                class: self.handle,
                parameter: handle,
            })
    }

    pub fn is_published(&self, federate: FederateHandle) -> bool {
        self.publishers.contains(&federate)
    }

    pub fn is_subscribed(&self, federate: FederateHandle) -> bool {
        self.subscribers.contains(&federate)
    }

    pub(crate) fn withdraw(&mut self, federate: FederateHandle) {
        self.publishers.remove(&federate);
        self.subscribers.remove(&federate);
    }
}

impl BroadcastLevel for InteractionClass {
    type Class = InteractionClassHandle;
    type Member = ParameterHandle;

    fn class_handle(&self) -> InteractionClassHandle {
        self.handle
    }

    fn parent(&self) -> Option<InteractionClassHandle> {
        self.parent
    }

    /// Everyone declared on the class, interested in the parameters visible
    /// at this level
    fn audience(&self, audience: Audience) -> Vec<(FederateHandle, BTreeSet<ParameterHandle>)> {
        let federates = match audience {
            Audience::Subscribers => &self.subscribers,
            Audience::Publishers => &self.publishers,
        };
        let visible: BTreeSet<ParameterHandle> = self.parameters.keys().copied().collect();
        federates
            .iter()
            .map(|federate| (*federate, visible.clone()))
            .collect()
    }

    fn retarget(
        message: &NetworkMessage,
        class: InteractionClassHandle,
        members: &BTreeSet<ParameterHandle>,
    ) -> NetworkMessage {
        match message {
            NetworkMessage::ReceiveInteraction {
                parameters,
                time,
                tag,
                ..
            } => NetworkMessage::ReceiveInteraction {
                class,
                parameters: parameters
                    .iter()
                    .filter(|(parameter, _)| members.contains(parameter))
                    .cloned()
                    .collect(),
                time: *time,
                tag: tag.clone(),
            },
            other => other.clone(),
        }
    }
}
