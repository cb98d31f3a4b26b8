use std::collections::BTreeMap;

use log::{debug, trace};

use crate::{
    broadcast_list::Audience,
    error::RtiError,
    interaction::{interaction_class::InteractionClass, InteractionBroadcastList},
    messages::{
        network_message::{NetworkMessage, ParameterValue},
        outbox::Outbox,
    },
    types::{FederateHandle, FederationTime, InteractionClassHandle, ParameterHandle},
};

/// All interaction classes of one federation
#[derive(Clone, Debug, Default)]
pub struct InteractionClassSet {
    classes: BTreeMap<InteractionClassHandle, InteractionClass>,
    class_names: BTreeMap<String, InteractionClassHandle>,
}

impl InteractionClassSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_class(
        &mut self,
        mut class: InteractionClass,
        parent: Option<InteractionClassHandle>,
    ) -> Result<(), RtiError> {
        let handle = class.handle();
        if !handle.is_valid()
            || self.classes.contains_key(&handle)
            || self.class_names.contains_key(class.name())
        {
            return Err(RtiError::internal(format!(
                "interaction class {} (\"{}\") cannot be added",
                handle,
                class.name()
            )));
        }
        if let Some(parent_handle) = parent {
            let parent_class = self.get_with_handle_mut(parent_handle)?;
            class.inherit_from(parent_class)?;
            parent_class.children.push(handle);
        }
        debug!("interaction class {} \"{}\" linked", handle, class.name());
        self.class_names.insert(class.name().to_string(), handle);
        self.classes.insert(handle, class);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    pub fn get_with_handle(
        &self,
        handle: InteractionClassHandle,
    ) -> Result<&InteractionClass, RtiError> {
        self.classes
            .get(&handle)
            .ok_or(RtiError::InteractionClassNotDefined { class: handle })
    }

    fn get_with_handle_mut(
        &mut self,
        handle: InteractionClassHandle,
    ) -> Result<&mut InteractionClass, RtiError> {
        self.classes
            .get_mut(&handle)
            .ok_or(RtiError::InteractionClassNotDefined { class: handle })
    }

    pub fn get_handle_from_name(&self, name: &str) -> Result<InteractionClassHandle, RtiError> {
        self.class_names
            .get(name)
            .copied()
            .ok_or_else(|| RtiError::NameNotFound {
                kind: "interaction class",
                name: name.to_string(),
            })
    }

    pub fn get_name_from_handle(&self, handle: InteractionClassHandle) -> Result<&str, RtiError> {
        self.get_with_handle(handle).map(|class| class.name())
    }

    pub fn get_parameter_handle(
        &self,
        name: &str,
        class: InteractionClassHandle,
    ) -> Result<ParameterHandle, RtiError> {
        self.get_with_handle(class)?.parameter_handle(name)
    }

    pub fn get_parameter_name(
        &self,
        parameter: ParameterHandle,
        class: InteractionClassHandle,
    ) -> Result<&str, RtiError> {
        self.get_with_handle(class)?.parameter_name(parameter)
    }

    fn ancestors(&self, class: InteractionClassHandle) -> Vec<&InteractionClass> {
        let mut ancestors = Vec::new();
        let mut current = self.classes.get(&class).and_then(|class| class.parent());
        while let Some(handle) = current {
            match self.classes.get(&handle) {
                Some(level) => {
                    ancestors.push(level);
                    current = level.parent();
                }
                None => break,
            }
        }
        ancestors
    }

    pub fn publish(
        &mut self,
        federate: FederateHandle,
        class: InteractionClassHandle,
        publish: bool,
    ) -> Result<(), RtiError> {
        let class = self.get_with_handle_mut(class)?;
        if publish {
            class.publishers.insert(federate);
        } else {
            class.publishers.remove(&federate);
        }
        Ok(())
    }

    pub fn subscribe(
        &mut self,
        federate: FederateHandle,
        class: InteractionClassHandle,
        subscribe: bool,
    ) -> Result<(), RtiError> {
        let class = self.get_with_handle_mut(class)?;
        if subscribe {
            class.subscribers.insert(federate);
        } else {
            class.subscribers.remove(&federate);
        }
        Ok(())
    }

    /// Delivers an interaction to the subscribers of its class and of every
    /// ancestor class. Each receives the parameters visible at the level it
    /// subscribed to.
    pub fn send_interaction(
        &self,
        federate: FederateHandle,
        class: InteractionClassHandle,
        parameters: Vec<ParameterValue>,
        time: FederationTime,
        tag: &str,
        outbox: &mut Outbox,
    ) -> Result<(), RtiError> {
        let origin = self.get_with_handle(class)?;
        if !origin.is_published(federate) {
            return Err(RtiError::InteractionClassNotPublished { class, federate });
        }
        for (parameter, _) in &parameters {
            origin.parameter_name(*parameter)?;
        }

        let list = InteractionBroadcastList::new(
            NetworkMessage::ReceiveInteraction {
                class,
                parameters,
                time,
                tag: tag.to_string(),
            },
            federate,
            Audience::Subscribers,
            None,
        );
        let ancestors = self.ancestors(class);
        if !list.would_extend(origin) && !ancestors.iter().any(|level| list.would_extend(level)) {
            trace!("nobody listens on interaction class {} or above", class);
            return Ok(());
        }
        let list = list.extend(origin).thread_upward(&ancestors);
        trace!("interaction {} reaches {} federate(s)", class, list.len());
        list.flush(outbox);
        Ok(())
    }

    pub fn kill_federate(&mut self, federate: FederateHandle) {
        for class in self.classes.values_mut() {
            class.withdraw(federate);
        }
    }
}
