use std::collections::{BTreeMap, BTreeSet};

use log::{debug, trace, warn};

use crate::{
    broadcast_list::Audience,
    error::RtiError,
    messages::{
        network_message::{AttributeValue, NetworkMessage},
        outbox::Outbox,
    },
    object::{
        object_class::ObjectClass,
        object_instance::{AttributeOwnership, ObjectInstance},
        ObjectClassBroadcastList,
    },
    types::{AttributeHandle, FederateHandle, FederationTime, ObjectClassHandle, ObjectHandle},
};

/// All object classes of one federation, stored as an arena keyed by handle.
/// Also indexes every live instance to its class.
#[derive(Clone, Debug, Default)]
pub struct ObjectClassSet {
    classes: BTreeMap<ObjectClassHandle, ObjectClass>,
    class_names: BTreeMap<String, ObjectClassHandle>,
    instance_classes: BTreeMap<ObjectHandle, ObjectClassHandle>,
    instance_names: BTreeMap<String, ObjectHandle>,
}

fn distinct(attributes: &[AttributeHandle]) -> Vec<AttributeHandle> {
    let mut seen = BTreeSet::new();
    attributes
        .iter()
        .copied()
        .filter(|attribute| seen.insert(*attribute))
        .collect()
}

fn notify_each(
    outbox: &mut Outbox,
    grouped: BTreeMap<FederateHandle, Vec<AttributeHandle>>,
    make: impl Fn(Vec<AttributeHandle>) -> NetworkMessage,
) {
    for (federate, attributes) in grouped {
        outbox.push(federate, make(attributes));
    }
}

impl ObjectClassSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Links `class` under `parent` (or as a root). The child receives a copy
    /// of the parent's attribute definitions and security level, once.
    pub fn add_class(
        &mut self,
        mut class: ObjectClass,
        parent: Option<ObjectClassHandle>,
    ) -> Result<(), RtiError> {
        let handle = class.handle();
        if !handle.is_valid() {
            return Err(RtiError::internal(format!(
                "invalid object class handle {}",
                handle
            )));
        }
        if self.classes.contains_key(&handle) || self.class_names.contains_key(class.name()) {
            return Err(RtiError::internal(format!(
                "object class {} (\"{}\") is already defined",
                handle,
                class.name()
            )));
        }
        if let Some(parent_handle) = parent {
            let parent_class = self.get_with_handle_mut(parent_handle)?;
            class.inherit_from(parent_class)?;
            parent_class.children.push(handle);
        }
        debug!(
            "object class {} \"{}\" linked under {:?}",
            handle,
            class.name(),
            parent
        );
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

    pub fn classes(&self) -> impl Iterator<Item = &ObjectClass> {
        self.classes.values()
    }

    pub fn get_with_handle(&self, handle: ObjectClassHandle) -> Result<&ObjectClass, RtiError> {
        self.classes
            .get(&handle)
            .ok_or(RtiError::ObjectClassNotDefined { class: handle })
    }

    fn get_with_handle_mut(
        &mut self,
        handle: ObjectClassHandle,
    ) -> Result<&mut ObjectClass, RtiError> {
        self.classes
            .get_mut(&handle)
            .ok_or(RtiError::ObjectClassNotDefined { class: handle })
    }

    pub fn get_handle_from_name(&self, name: &str) -> Result<ObjectClassHandle, RtiError> {
        self.class_names
            .get(name)
            .copied()
            .ok_or_else(|| RtiError::NameNotFound {
                kind: "object class",
                name: name.to_string(),
            })
    }

    pub fn get_name_from_handle(&self, handle: ObjectClassHandle) -> Result<&str, RtiError> {
        self.get_with_handle(handle).map(|class| class.name())
    }

    pub fn get_attribute_handle(
        &self,
        name: &str,
        class: ObjectClassHandle,
    ) -> Result<AttributeHandle, RtiError> {
        self.get_with_handle(class)?.attribute_handle(name)
    }

    pub fn get_attribute_name(
        &self,
        attribute: AttributeHandle,
        class: ObjectClassHandle,
    ) -> Result<&str, RtiError> {
        self.get_with_handle(class)?.attribute_name(attribute)
    }

    /// The most-derived class of a live instance
    pub fn get_instance_class(&self, object: ObjectHandle) -> Result<ObjectClassHandle, RtiError> {
        self.instance_classes
            .get(&object)
            .copied()
            .ok_or(RtiError::ObjectNotKnown { object })
    }

    pub fn get_instance(&self, object: ObjectHandle) -> Result<&ObjectInstance, RtiError> {
        let class = self.get_instance_class(object)?;
        self.get_with_handle(class)?
            .instance(object)
            .ok_or(RtiError::ObjectNotKnown { object })
    }

    fn get_instance_mut(
        &mut self,
        class: ObjectClassHandle,
        object: ObjectHandle,
    ) -> Result<&mut ObjectInstance, RtiError> {
        self.get_with_handle_mut(class)?
            .instances
            .get_mut(&object)
            .ok_or(RtiError::ObjectNotKnown { object })
    }

    pub fn get_object_handle_from_name(&self, name: &str) -> Result<ObjectHandle, RtiError> {
        self.instance_names
            .get(name)
            .copied()
            .ok_or_else(|| RtiError::NameNotFound {
                kind: "object instance",
                name: name.to_string(),
            })
    }

    pub fn is_subclass_of(&self, class: ObjectClassHandle, ancestor: ObjectClassHandle) -> bool {
        self.ancestors(class)
            .iter()
            .any(|level| level.handle() == ancestor)
    }

    /// Ancestors of `class`, nearest first
    fn ancestors(&self, class: ObjectClassHandle) -> Vec<&ObjectClass> {
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

    /// Runs the broadcast walk for an event on an instance of `class`.
    /// Returns `None`, without walking, when nobody in the whole chain could
    /// hear about it.
    fn broadcast(
        &self,
        class: ObjectClassHandle,
        list: ObjectClassBroadcastList,
    ) -> Option<ObjectClassBroadcastList> {
        let origin = self.classes.get(&class)?;
        let ancestors = self.ancestors(class);
        if !list.would_extend(origin) && !ancestors.iter().any(|level| list.would_extend(level)) {
            trace!("nobody listens on class {} or above", class);
            return None;
        }
        Some(list.extend(origin).thread_upward(&ancestors))
    }

    // Declarations

    pub fn publish(
        &mut self,
        federate: FederateHandle,
        class: ObjectClassHandle,
        attributes: &[AttributeHandle],
        publish: bool,
    ) -> Result<(), RtiError> {
        trace!(
            "federate {} {} class {}",
            federate,
            if publish { "publishes" } else { "unpublishes" },
            class
        );
        self.get_with_handle_mut(class)?
            .publish(federate, attributes, publish)
    }

    /// Changes the federate's subscription. A first subscription makes it
    /// discover every live instance of the class and of its subclasses,
    /// except below subclasses it was already subscribed to.
    pub fn subscribe(
        &mut self,
        federate: FederateHandle,
        class: ObjectClassHandle,
        attributes: &[AttributeHandle],
        subscribe: bool,
        outbox: &mut Outbox,
    ) -> Result<(), RtiError> {
        let first_time = self
            .get_with_handle_mut(class)?
            .subscribe(federate, attributes, subscribe)?;
        if first_time {
            self.recursive_discovering(class, federate, outbox);
        }
        Ok(())
    }

    fn recursive_discovering(
        &mut self,
        start: ObjectClassHandle,
        federate: FederateHandle,
        outbox: &mut Outbox,
    ) {
        let mut pending = vec![start];
        while let Some(handle) = pending.pop() {
            let class = match self.classes.get_mut(&handle) {
                Some(class) => class,
                None => continue,
            };
            if handle != start && class.is_subscribed(federate) {
                trace!("class {} already covers federate {}", handle, federate);
                continue;
            }
            for instance in class.instances.values_mut() {
                if instance.discovered_by.insert(federate) {
                    outbox.push(
                        federate,
                        NetworkMessage::DiscoverObject {
                            object: instance.handle(),
                            class: start,
                            name: instance.name().to_string(),
                        },
                    );
                }
            }
            pending.extend(class.children.iter().rev().copied());
        }
    }

    // Instances

    /// Registers a new instance of `class`. The federate must publish the
    /// class and receives the attributes it publishes. Returns the instance
    /// name.
    pub fn register_object(
        &mut self,
        federate: FederateHandle,
        class: ObjectClassHandle,
        object: ObjectHandle,
        name: Option<String>,
        outbox: &mut Outbox,
    ) -> Result<String, RtiError> {
        if !object.is_valid() {
            return Err(RtiError::internal(format!("invalid object handle {}", object)));
        }
        if self.instance_classes.contains_key(&object) {
            return Err(RtiError::ObjectAlreadyRegistered { object });
        }
        let name = name
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| format!("HLAobject_{}", object));
        if self.instance_names.contains_key(&name) {
            return Err(RtiError::ObjectNameAlreadyRegistered { name });
        }
        let object_class = self.get_with_handle_mut(class)?;
        if !object_class.is_published(federate) {
            return Err(RtiError::ObjectClassNotPublished { class, federate });
        }

        let mut instance = ObjectInstance::new(object, name.clone(), class, federate);
        for attribute in object_class.attributes.values() {
            let owner = attribute.is_published_by(federate).then_some(federate);
            instance.attributes.insert(
                attribute.handle(),
                AttributeOwnership {
                    owner,
                    ..AttributeOwnership::default()
                },
            );
        }
        instance.discovered_by.insert(federate);
        object_class.instances.insert(object, instance);
        self.instance_classes.insert(object, class);
        self.instance_names.insert(name.clone(), object);
        debug!(
            "federate {} registered object {} \"{}\" in class {}",
            federate, object, name, class
        );

        let list = ObjectClassBroadcastList::new(
            NetworkMessage::DiscoverObject {
                object,
                class,
                name: name.clone(),
            },
            federate,
            Audience::Subscribers,
            None,
        );
        if let Some(list) = self.broadcast(class, list) {
            let recipients: Vec<FederateHandle> = list.recipients().collect();
            self.get_instance_mut(class, object)?
                .discovered_by
                .extend(recipients);
            list.flush(outbox);
        }
        Ok(name)
    }

    /// Removes an instance. Only the federate holding the delete privilege
    /// may do this.
    pub fn delete_object(
        &mut self,
        federate: FederateHandle,
        object: ObjectHandle,
        tag: &str,
        outbox: &mut Outbox,
    ) -> Result<(), RtiError> {
        let class = self.get_instance_class(object)?;
        if self.get_instance(object)?.registrant() != federate {
            return Err(RtiError::DeletePrivilegeNotHeld { object, federate });
        }
        if let Some(instance) = self.get_with_handle_mut(class)?.instances.remove(&object) {
            self.instance_names.remove(instance.name());
        }
        self.instance_classes.remove(&object);
        debug!("federate {} deleted object {}", federate, object);

        let list = ObjectClassBroadcastList::new(
            NetworkMessage::RemoveObject {
                object,
                tag: tag.to_string(),
            },
            federate,
            Audience::Subscribers,
            None,
        );
        if let Some(list) = self.broadcast(class, list) {
            list.flush(outbox);
        }
        Ok(())
    }

    /// Reflects new values to every federate subscribed to at least one of
    /// the updated attributes. The federate must own all of them.
    pub fn update_attribute_values(
        &mut self,
        federate: FederateHandle,
        object: ObjectHandle,
        values: Vec<AttributeValue>,
        time: FederationTime,
        tag: &str,
        outbox: &mut Outbox,
    ) -> Result<(), RtiError> {
        let attributes: Vec<AttributeHandle> = values.iter().map(|(handle, _)| *handle).collect();
        let class = self.check_ownership(object, &attributes, |_, attribute, ownership| {
            if ownership.owner() == Some(federate) {
                Ok(())
            } else {
                Err(RtiError::AttributeNotOwned {
                    object,
                    attribute,
                    federate,
                })
            }
        })?;

        let list = ObjectClassBroadcastList::new(
            NetworkMessage::ReflectAttributeValues {
                object,
                values,
                time,
                tag: tag.to_string(),
            },
            federate,
            Audience::Subscribers,
            Some(attributes.into_iter().collect()),
        );
        if let Some(list) = self.broadcast(class, list) {
            trace!("reflecting object {} to {} federate(s)", object, list.len());
            list.flush(outbox);
        }
        Ok(())
    }

    // Ownership

    /// Validates `rule` for every attribute before anything is touched.
    /// Returns the instance's class.
    fn check_ownership<F>(
        &self,
        object: ObjectHandle,
        attributes: &[AttributeHandle],
        mut rule: F,
    ) -> Result<ObjectClassHandle, RtiError>
    where
        F: FnMut(&ObjectClass, AttributeHandle, &AttributeOwnership) -> Result<(), RtiError>,
    {
        let class_handle = self.get_instance_class(object)?;
        let class = self.get_with_handle(class_handle)?;
        let instance = class
            .instance(object)
            .ok_or(RtiError::ObjectNotKnown { object })?;
        for attribute in attributes {
            class.attribute(*attribute)?;
            let ownership = instance
                .ownership(*attribute)
                .ok_or(RtiError::AttributeNotDefined {
                    class: class_handle,
                    attribute: *attribute,
                })?;
            rule(class, *attribute, ownership)?;
        }
        Ok(class_handle)
    }

    /// Asks the publishers of `attributes` to take them over
    fn offer_attributes(
        &self,
        class: ObjectClassHandle,
        object: ObjectHandle,
        divestor: FederateHandle,
        attributes: Vec<AttributeHandle>,
        tag: &str,
        outbox: &mut Outbox,
    ) {
        if attributes.is_empty() {
            return;
        }
        let members = attributes.iter().copied().collect();
        let list = ObjectClassBroadcastList::new(
            NetworkMessage::RequestAttributeOwnershipAssumption {
                object,
                attributes,
                tag: tag.to_string(),
            },
            divestor,
            Audience::Publishers,
            Some(members),
        );
        if let Some(list) = self.broadcast(class, list) {
            list.flush(outbox);
        }
    }

    pub fn is_attribute_owned_by_federate(
        &self,
        federate: FederateHandle,
        object: ObjectHandle,
        attribute: AttributeHandle,
    ) -> Result<bool, RtiError> {
        let instance = self.get_instance(object)?;
        self.get_with_handle(instance.class())?.attribute(attribute)?;
        Ok(instance.is_owned_by(attribute, federate))
    }

    /// Answers the asking federate with the current owner, if any
    pub fn query_attribute_ownership(
        &self,
        federate: FederateHandle,
        object: ObjectHandle,
        attribute: AttributeHandle,
        outbox: &mut Outbox,
    ) -> Result<(), RtiError> {
        let instance = self.get_instance(object)?;
        self.get_with_handle(instance.class())?.attribute(attribute)?;
        let message = match instance.ownership(attribute).and_then(|o| o.owner()) {
            Some(owner) => NetworkMessage::InformAttributeOwnership {
                object,
                attribute,
                owner,
            },
            None => NetworkMessage::AttributeIsNotOwned { object, attribute },
        };
        outbox.push(federate, message);
        Ok(())
    }

    /// The owner offers attributes. Attributes someone is already waiting
    /// for change hands at once; the others enter negotiation and are
    /// offered to their publishers.
    pub fn negotiated_divestiture(
        &mut self,
        federate: FederateHandle,
        object: ObjectHandle,
        attributes: &[AttributeHandle],
        tag: &str,
        outbox: &mut Outbox,
    ) -> Result<(), RtiError> {
        let attributes = distinct(attributes);
        let class = self.check_ownership(object, &attributes, |_, attribute, ownership| {
            if ownership.owner() != Some(federate) {
                Err(RtiError::AttributeNotOwned {
                    object,
                    attribute,
                    federate,
                })
            } else if ownership.is_divesting() {
                Err(RtiError::AttributeAlreadyBeingDivested { object, attribute })
            } else {
                Ok(())
            }
        })?;

        let instance = self.get_instance_mut(class, object)?;
        let mut divested = Vec::new();
        let mut acquired: BTreeMap<FederateHandle, Vec<AttributeHandle>> = BTreeMap::new();
        let mut offered = Vec::new();
        for attribute in &attributes {
            if let Some(ownership) = instance.attributes.get_mut(attribute) {
                match ownership.candidates.first().copied() {
                    Some(candidate) => {
                        ownership.transfer_to(candidate);
                        divested.push(*attribute);
                        acquired.entry(candidate).or_default().push(*attribute);
                    }
                    None => {
                        ownership.divesting = true;
                        offered.push(*attribute);
                    }
                }
            }
        }

        if !divested.is_empty() {
            outbox.push(
                federate,
                NetworkMessage::AttributeOwnershipDivestitureNotification {
                    object,
                    attributes: divested,
                },
            );
        }
        notify_each(outbox, acquired, |attributes| {
            NetworkMessage::AttributeOwnershipAcquisitionNotification { object, attributes }
        });
        self.offer_attributes(class, object, federate, offered, tag, outbox);
        Ok(())
    }

    pub fn cancel_negotiated_divestiture(
        &mut self,
        federate: FederateHandle,
        object: ObjectHandle,
        attributes: &[AttributeHandle],
    ) -> Result<(), RtiError> {
        let attributes = distinct(attributes);
        let class = self.check_ownership(object, &attributes, |_, attribute, ownership| {
            if ownership.owner() != Some(federate) {
                Err(RtiError::AttributeNotOwned {
                    object,
                    attribute,
                    federate,
                })
            } else if !ownership.is_divesting() {
                Err(RtiError::AttributeDivestitureWasNotRequested { object, attribute })
            } else {
                Ok(())
            }
        })?;

        let instance = self.get_instance_mut(class, object)?;
        for attribute in &attributes {
            if let Some(ownership) = instance.attributes.get_mut(attribute) {
                ownership.divesting = false;
            }
        }
        Ok(())
    }

    /// The federate wants attributes. Free or offered attributes are taken at
    /// once; the owners of the others are asked to release them.
    pub fn attribute_ownership_acquisition(
        &mut self,
        federate: FederateHandle,
        object: ObjectHandle,
        attributes: &[AttributeHandle],
        tag: &str,
        outbox: &mut Outbox,
    ) -> Result<(), RtiError> {
        let attributes = distinct(attributes);
        let class = self.check_acquirable(federate, object, &attributes)?;

        let instance = self.get_instance_mut(class, object)?;
        let mut acquired = Vec::new();
        let mut divested: BTreeMap<FederateHandle, Vec<AttributeHandle>> = BTreeMap::new();
        let mut release_requests: BTreeMap<FederateHandle, Vec<AttributeHandle>> = BTreeMap::new();
        for attribute in &attributes {
            if let Some(ownership) = instance.attributes.get_mut(attribute) {
                match ownership.owner() {
                    None => {
                        ownership.transfer_to(federate);
                        acquired.push(*attribute);
                    }
                    Some(owner) if ownership.is_divesting() => {
                        ownership.transfer_to(federate);
                        acquired.push(*attribute);
                        divested.entry(owner).or_default().push(*attribute);
                    }
                    Some(owner) => {
                        ownership.candidates.push(federate);
                        release_requests.entry(owner).or_default().push(*attribute);
                    }
                }
            }
        }

        if !acquired.is_empty() {
            outbox.push(
                federate,
                NetworkMessage::AttributeOwnershipAcquisitionNotification {
                    object,
                    attributes: acquired,
                },
            );
        }
        notify_each(outbox, divested, |attributes| {
            NetworkMessage::AttributeOwnershipDivestitureNotification { object, attributes }
        });
        notify_each(outbox, release_requests, |attributes| {
            NetworkMessage::RequestAttributeOwnershipRelease {
                object,
                attributes,
                tag: tag.to_string(),
            }
        });
        Ok(())
    }

    /// Takes only what is free or being offered; reports the rest as
    /// unavailable
    pub fn attribute_ownership_acquisition_if_available(
        &mut self,
        federate: FederateHandle,
        object: ObjectHandle,
        attributes: &[AttributeHandle],
        outbox: &mut Outbox,
    ) -> Result<(), RtiError> {
        let attributes = distinct(attributes);
        let class = self.check_acquirable(federate, object, &attributes)?;

        let instance = self.get_instance_mut(class, object)?;
        let mut acquired = Vec::new();
        let mut unavailable = Vec::new();
        let mut divested: BTreeMap<FederateHandle, Vec<AttributeHandle>> = BTreeMap::new();
        for attribute in &attributes {
            if let Some(ownership) = instance.attributes.get_mut(attribute) {
                match ownership.owner() {
                    None => {
                        ownership.transfer_to(federate);
                        acquired.push(*attribute);
                    }
                    Some(owner) if ownership.is_divesting() => {
                        ownership.transfer_to(federate);
                        acquired.push(*attribute);
                        divested.entry(owner).or_default().push(*attribute);
                    }
                    Some(_) => unavailable.push(*attribute),
                }
            }
        }

        if !acquired.is_empty() {
            outbox.push(
                federate,
                NetworkMessage::AttributeOwnershipAcquisitionNotification {
                    object,
                    attributes: acquired,
                },
            );
        }
        if !unavailable.is_empty() {
            outbox.push(
                federate,
                NetworkMessage::AttributeOwnershipUnavailable {
                    object,
                    attributes: unavailable,
                },
            );
        }
        notify_each(outbox, divested, |attributes| {
            NetworkMessage::AttributeOwnershipDivestitureNotification { object, attributes }
        });
        Ok(())
    }

    fn check_acquirable(
        &self,
        federate: FederateHandle,
        object: ObjectHandle,
        attributes: &[AttributeHandle],
    ) -> Result<ObjectClassHandle, RtiError> {
        self.check_ownership(object, attributes, |class, attribute, ownership| {
            if !class.publishes_attribute(federate, attribute) {
                Err(RtiError::AttributeNotPublished {
                    class: class.handle(),
                    attribute,
                    federate,
                })
            } else if ownership.owner() == Some(federate) {
                Err(RtiError::FederateOwnsAttributes { federate })
            } else if ownership.is_candidate(federate) {
                Err(RtiError::AttributeAlreadyBeingAcquired { object, attribute })
            } else {
                Ok(())
            }
        })
    }

    pub fn cancel_attribute_ownership_acquisition(
        &mut self,
        federate: FederateHandle,
        object: ObjectHandle,
        attributes: &[AttributeHandle],
        outbox: &mut Outbox,
    ) -> Result<(), RtiError> {
        let attributes = distinct(attributes);
        let class = self.check_ownership(object, &attributes, |_, attribute, ownership| {
            if ownership.owner() == Some(federate) {
                Err(RtiError::AttributeAlreadyOwned { object, attribute })
            } else if !ownership.is_candidate(federate) {
                Err(RtiError::AttributeAcquisitionWasNotRequested { object, attribute })
            } else {
                Ok(())
            }
        })?;

        let instance = self.get_instance_mut(class, object)?;
        for attribute in &attributes {
            if let Some(ownership) = instance.attributes.get_mut(attribute) {
                ownership.candidates.retain(|candidate| *candidate != federate);
            }
        }
        outbox.push(
            federate,
            NetworkMessage::ConfirmAttributeOwnershipAcquisitionCancellation { object, attributes },
        );
        Ok(())
    }

    /// The owner drops attributes. A waiting candidate takes them over,
    /// otherwise they become unowned and are offered to their publishers.
    pub fn unconditional_divestiture(
        &mut self,
        federate: FederateHandle,
        object: ObjectHandle,
        attributes: &[AttributeHandle],
        outbox: &mut Outbox,
    ) -> Result<(), RtiError> {
        let attributes = distinct(attributes);
        let class = self.check_ownership(object, &attributes, |_, attribute, ownership| {
            if ownership.owner() == Some(federate) {
                Ok(())
            } else {
                Err(RtiError::AttributeNotOwned {
                    object,
                    attribute,
                    federate,
                })
            }
        })?;

        let instance = self.get_instance_mut(class, object)?;
        let mut acquired: BTreeMap<FederateHandle, Vec<AttributeHandle>> = BTreeMap::new();
        let mut released = Vec::new();
        for attribute in &attributes {
            if let Some(ownership) = instance.attributes.get_mut(attribute) {
                match ownership.candidates.first().copied() {
                    Some(candidate) => {
                        ownership.transfer_to(candidate);
                        acquired.entry(candidate).or_default().push(*attribute);
                    }
                    None => {
                        ownership.release();
                        released.push(*attribute);
                    }
                }
            }
        }

        notify_each(outbox, acquired, |attributes| {
            NetworkMessage::AttributeOwnershipAcquisitionNotification { object, attributes }
        });
        self.offer_attributes(class, object, federate, released, "", outbox);
        Ok(())
    }

    /// The owner agrees to release attributes somebody asked for. Returns
    /// the attributes released.
    pub fn attribute_ownership_release_response(
        &mut self,
        federate: FederateHandle,
        object: ObjectHandle,
        attributes: &[AttributeHandle],
        outbox: &mut Outbox,
    ) -> Result<Vec<AttributeHandle>, RtiError> {
        let attributes = distinct(attributes);
        let class = self.check_ownership(object, &attributes, |_, attribute, ownership| {
            if ownership.owner() != Some(federate) {
                Err(RtiError::AttributeNotOwned {
                    object,
                    attribute,
                    federate,
                })
            } else if ownership.candidates.is_empty() {
                Err(RtiError::FederateWasNotAskedToReleaseAttribute {
                    object,
                    attribute,
                    federate,
                })
            } else {
                Ok(())
            }
        })?;

        let instance = self.get_instance_mut(class, object)?;
        let mut acquired: BTreeMap<FederateHandle, Vec<AttributeHandle>> = BTreeMap::new();
        for attribute in &attributes {
            if let Some(ownership) = instance.attributes.get_mut(attribute) {
                if let Some(candidate) = ownership.candidates.first().copied() {
                    ownership.transfer_to(candidate);
                    acquired.entry(candidate).or_default().push(*attribute);
                }
            }
        }
        notify_each(outbox, acquired, |attributes| {
            NetworkMessage::AttributeOwnershipAcquisitionNotification { object, attributes }
        });
        Ok(attributes)
    }

    /// Whether the federate owns any attribute of any instance
    pub fn owns_attributes(&self, federate: FederateHandle) -> bool {
        self.classes
            .values()
            .flat_map(|class| class.instances())
            .any(|instance| instance.owns_any(federate))
    }

    /// Forgets everything about a federate that left without resigning.
    /// Instances it registered are deleted, attributes it owned are released
    /// and offered, and its declarations are withdrawn. Never fails.
    pub fn kill_federate(&mut self, federate: FederateHandle, outbox: &mut Outbox) {
        let registered: Vec<ObjectHandle> = self
            .classes
            .values()
            .flat_map(|class| class.instances())
            .filter(|instance| instance.registrant() == federate)
            .map(|instance| instance.handle())
            .collect();
        for object in registered {
            if let Err(error) = self.delete_object(federate, object, "", outbox) {
                warn!(
                    "could not delete object {} of killed federate {}: {}",
                    object, federate, error
                );
            }
        }

        let mut acquired = Vec::new();
        let mut released = Vec::new();
        for class in self.classes.values_mut() {
            let class_handle = class.handle();
            for instance in class.instances.values_mut() {
                instance.discovered_by.remove(&federate);
                let mut taken: BTreeMap<FederateHandle, Vec<AttributeHandle>> = BTreeMap::new();
                let mut attributes = Vec::new();
                for (handle, ownership) in instance.attributes.iter_mut() {
                    ownership.candidates.retain(|candidate| *candidate != federate);
                    if ownership.owner() != Some(federate) {
                        continue;
                    }
                    match ownership.candidates.first().copied() {
                        Some(candidate) => {
                            ownership.transfer_to(candidate);
                            taken.entry(candidate).or_default().push(*handle);
                        }
                        None => {
                            ownership.release();
                            attributes.push(*handle);
                        }
                    }
                }
                if !taken.is_empty() {
                    acquired.push((instance.handle(), taken));
                }
                if !attributes.is_empty() {
                    released.push((class_handle, instance.handle(), attributes));
                }
            }
        }
        for (object, taken) in acquired {
            notify_each(outbox, taken, |attributes| {
                NetworkMessage::AttributeOwnershipAcquisitionNotification { object, attributes }
            });
        }
        for (class, object, attributes) in released {
            self.offer_attributes(class, object, federate, attributes, "", outbox);
        }
        for class in self.classes.values_mut() {
            class.withdraw(federate);
        }
        debug!("object classes forgot federate {}", federate);
    }
}
