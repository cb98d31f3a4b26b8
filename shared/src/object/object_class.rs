use std::collections::{BTreeMap, BTreeSet};

use crate::{
    broadcast_list::{Audience, BroadcastLevel},
    error::RtiError,
    messages::network_message::NetworkMessage,
    object::object_instance::ObjectInstance,
    types::{AttributeHandle, FederateHandle, ObjectClassHandle, ObjectHandle, SecurityLevel},
};

/// An attribute definition plus who declared it on this class
#[derive(Clone, Debug)]
pub struct ObjectClassAttribute {
    handle: AttributeHandle,
    name: String,
    pub(crate) publishers: BTreeSet<FederateHandle>,
    pub(crate) subscribers: BTreeSet<FederateHandle>,
}

impl ObjectClassAttribute {
    pub fn new(handle: AttributeHandle, name: impl Into<String>) -> Self {
        Self {
            handle,
            name: name.into(),
            publishers: BTreeSet::new(),
            subscribers: BTreeSet::new(),
        }
    }

    pub fn handle(&self) -> AttributeHandle {
        self.handle
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_published_by(&self, federate: FederateHandle) -> bool {
        self.publishers.contains(&federate)
    }

    pub fn is_subscribed_by(&self, federate: FederateHandle) -> bool {
        self.subscribers.contains(&federate)
    }

    /// Copy of the definition without any declarations, for inheritance
    fn definition(&self) -> Self {
        Self::new(self.handle, self.name.clone())
    }
}

/// One node of the object class tree. Parent and children are handles into
/// the owning `ObjectClassSet`.
#[derive(Clone, Debug)]
pub struct ObjectClass {
    handle: ObjectClassHandle,
    name: String,
    pub(crate) parent: Option<ObjectClassHandle>,
    pub(crate) children: Vec<ObjectClassHandle>,
    pub(crate) level: SecurityLevel,
    pub(crate) attributes: BTreeMap<AttributeHandle, ObjectClassAttribute>,
    pub(crate) instances: BTreeMap<ObjectHandle, ObjectInstance>,
}

impl ObjectClass {
    pub fn new(handle: ObjectClassHandle, name: impl Into<String>, level: SecurityLevel) -> Self {
        Self {
            handle,
            name: name.into(),
            parent: None,
            children: Vec::new(),
            level,
            attributes: BTreeMap::new(),
            instances: BTreeMap::new(),
        }
    }

    pub fn add_attribute(
        &mut self,
        handle: AttributeHandle,
        name: impl Into<String>,
    ) -> Result<(), RtiError> {
        let name = name.into();
        if !handle.is_valid() {
            return Err(RtiError::internal(format!(
                "invalid attribute handle {} for \"{}\"",
                handle, name
            )));
        }
        if self.attributes.contains_key(&handle) {
            return Err(RtiError::internal(format!(
                "attribute handle {} defined twice in class {}",
                handle, self.name
            )));
        }
        self.attributes
            .insert(handle, ObjectClassAttribute::new(handle, name));
        Ok(())
    }

    /// Link-time copy of the parent's attribute definitions and security
    /// level. The parent already carries every ancestor attribute, so a
    /// handle the child also defines is a redefinition and nothing is copied.
    pub(crate) fn inherit_from(&mut self, parent: &ObjectClass) -> Result<(), RtiError> {
        if let Some(handle) = parent
            .attributes
            .keys()
            .find(|handle| self.attributes.contains_key(handle))
        {
            return Err(RtiError::internal(format!(
                "object class {} redefines attribute {} inherited from class {}",
                self.handle, handle, parent.handle
            )));
        }
        for (handle, attribute) in &parent.attributes {
            self.attributes.insert(*handle, attribute.definition());
        }
        self.level = parent.level;
        self.parent = Some(parent.handle);
        Ok(())
    }

    pub fn handle(&self) -> ObjectClassHandle {
        self.handle
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn parent(&self) -> Option<ObjectClassHandle> {
        self.parent
    }

    pub fn children(&self) -> &[ObjectClassHandle] {
        &self.children
    }

    pub fn security_level(&self) -> SecurityLevel {
        self.level
    }

    pub fn attributes(&self) -> impl Iterator<Item = &ObjectClassAttribute> {
        self.attributes.values()
    }

    pub fn attribute(&self, handle: AttributeHandle) -> Result<&ObjectClassAttribute, RtiError> {
        self.attributes
            .get(&handle)
            .ok_or(RtiError::AttributeNotDefined {
                class: self.handle,
                attribute: handle,
            })
    }

    pub fn attribute_handle(&self, name: &str) -> Result<AttributeHandle, RtiError> {
        self.attributes
            .values()
            .find(|attribute| attribute.name == name)
            .map(|attribute| attribute.handle)
            .ok_or_else(|| RtiError::NameNotFound {
                kind: "attribute",
                name: name.to_string(),
            })
    }

    pub fn attribute_name(&self, handle: AttributeHandle) -> Result<&str, RtiError> {
        self.attribute(handle).map(|attribute| attribute.name())
    }

    pub(crate) fn check_attributes(&self, attributes: &[AttributeHandle]) -> Result<(), RtiError> {
        for attribute in attributes {
            self.attribute(*attribute)?;
        }
        Ok(())
    }

    /// Replaces the federate's publication with `attributes`. An empty list,
    /// or `publish == false`, withdraws it.
    pub(crate) fn publish(
        &mut self,
        federate: FederateHandle,
        attributes: &[AttributeHandle],
        publish: bool,
    ) -> Result<(), RtiError> {
        if publish {
            self.check_attributes(attributes)?;
        }
        for attribute in self.attributes.values_mut() {
            attribute.publishers.remove(&federate);
        }
        if publish {
            for handle in attributes {
                if let Some(attribute) = self.attributes.get_mut(handle) {
                    attribute.publishers.insert(federate);
                }
            }
        }
        Ok(())
    }

    /// Replaces the federate's subscription with `attributes`. Returns true
    /// when the federate was not subscribed before and now is, which means it
    /// may have missed discoveries.
    pub(crate) fn subscribe(
        &mut self,
        federate: FederateHandle,
        attributes: &[AttributeHandle],
        subscribe: bool,
    ) -> Result<bool, RtiError> {
        if subscribe {
            self.check_attributes(attributes)?;
        }
        let was_subscribed = self.is_subscribed(federate);
        for attribute in self.attributes.values_mut() {
            attribute.subscribers.remove(&federate);
        }
        if !subscribe {
            return Ok(false);
        }
        for handle in attributes {
            if let Some(attribute) = self.attributes.get_mut(handle) {
                attribute.subscribers.insert(federate);
            }
        }
        Ok(!was_subscribed && self.is_subscribed(federate))
    }

    pub fn is_subscribed(&self, federate: FederateHandle) -> bool {
        self.attributes
            .values()
            .any(|attribute| attribute.is_subscribed_by(federate))
    }

    pub fn is_published(&self, federate: FederateHandle) -> bool {
        self.attributes
            .values()
            .any(|attribute| attribute.is_published_by(federate))
    }

    pub fn publishes_attribute(&self, federate: FederateHandle, attribute: AttributeHandle) -> bool {
        self.attributes
            .get(&attribute)
            .map_or(false, |attribute| attribute.is_published_by(federate))
    }

    pub fn instances(&self) -> impl Iterator<Item = &ObjectInstance> {
        self.instances.values()
    }

    pub fn instance(&self, object: ObjectHandle) -> Option<&ObjectInstance> {
        self.instances.get(&object)
    }

    pub(crate) fn withdraw(&mut self, federate: FederateHandle) {
        for attribute in self.attributes.values_mut() {
            attribute.publishers.remove(&federate);
            attribute.subscribers.remove(&federate);
        }
    }
}

impl BroadcastLevel for ObjectClass {
    type Class = ObjectClassHandle;
    type Member = AttributeHandle;

    fn class_handle(&self) -> ObjectClassHandle {
        self.handle
    }

    fn parent(&self) -> Option<ObjectClassHandle> {
        self.parent
    }

    fn audience(&self, audience: Audience) -> Vec<(FederateHandle, BTreeSet<AttributeHandle>)> {
        let mut declared: BTreeMap<FederateHandle, BTreeSet<AttributeHandle>> = BTreeMap::new();
        for attribute in self.attributes.values() {
            let federates = match audience {
                Audience::Subscribers => &attribute.subscribers,
                Audience::Publishers => &attribute.publishers,
            };
            for federate in federates {
                declared.entry(*federate).or_default().insert(attribute.handle);
            }
        }
        declared.into_iter().collect()
    }

    fn retarget(
        message: &NetworkMessage,
        class: ObjectClassHandle,
        members: &BTreeSet<AttributeHandle>,
    ) -> NetworkMessage {
        match message {
            NetworkMessage::DiscoverObject { object, name, .. } => NetworkMessage::DiscoverObject {
                object: *object,
                class,
                name: name.clone(),
            },
            NetworkMessage::ReflectAttributeValues {
                object,
                values,
                time,
                tag,
            } => NetworkMessage::ReflectAttributeValues {
                object: *object,
                values: values
                    .iter()
                    .filter(|(attribute, _)| members.contains(attribute))
                    .cloned()
                    .collect(),
                time: *time,
                tag: tag.clone(),
            },
            NetworkMessage::RequestAttributeOwnershipAssumption {
                object,
                attributes,
                tag,
            } => NetworkMessage::RequestAttributeOwnershipAssumption {
                object: *object,
                attributes: attributes
                    .iter()
                    .filter(|attribute| members.contains(attribute))
                    .copied()
                    .collect(),
                tag: tag.clone(),
            },
            other => other.clone(),
        }
    }
}
