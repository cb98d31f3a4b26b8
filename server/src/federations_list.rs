use std::sync::{
    atomic::{AtomicI32, Ordering},
    Arc, Mutex, RwLock, RwLockReadGuard, RwLockWriteGuard,
};

use log::{info, trace, warn};

use rti_shared::{
    AttributeHandle, AttributeValue, FederateHandle, FederationHandle, FederationTime,
    InteractionClassHandle, LinkKey, MessageSink, ObjectClassHandle, ObjectHandle, ObjectModel,
    ParameterValue, RtiError,
};

use crate::federation::{Federation, FederationInfo};

struct FederationEntry {
    name: String,
    federation: Mutex<Federation>,
}

/// Rejects handles that can never name anything, before any lookup
fn check_handle(value: i32, what: &str) -> Result<(), RtiError> {
    if value <= 0 {
        return Err(RtiError::internal(format!("invalid {} handle {}", what, value)));
    }
    Ok(())
}

fn check_attributes(attributes: &[AttributeHandle]) -> Result<(), RtiError> {
    for attribute in attributes {
        check_handle(attribute.value(), "attribute")?;
    }
    Ok(())
}

/// Registry of the running federation executions.
///
/// Every operation first validates its handles, then resolves the
/// federation, then delegates to it under that federation's mutex. Different
/// federations proceed in parallel: the registry lock is only taken for
/// writing to create or destroy one.
pub struct FederationsList {
    federations: RwLock<Vec<(FederationHandle, FederationEntry)>>,
    model: ObjectModel,
    sink: Arc<dyn MessageSink>,
    max_federations: usize,
    max_federates: usize,
    next_handle: AtomicI32,
}

impl FederationsList {
    pub fn new(
        model: ObjectModel,
        sink: Arc<dyn MessageSink>,
        max_federations: usize,
        max_federates: usize,
    ) -> Self {
        Self {
            federations: RwLock::new(Vec::new()),
            model,
            sink,
            max_federations,
            max_federates,
            next_handle: AtomicI32::new(1),
        }
    }

    fn read(
        &self,
    ) -> Result<RwLockReadGuard<'_, Vec<(FederationHandle, FederationEntry)>>, RtiError> {
        self.federations
            .read()
            .map_err(|_| RtiError::internal("federation registry lock poisoned"))
    }

    fn write(
        &self,
    ) -> Result<RwLockWriteGuard<'_, Vec<(FederationHandle, FederationEntry)>>, RtiError> {
        self.federations
            .write()
            .map_err(|_| RtiError::internal("federation registry lock poisoned"))
    }

    /// Number of running federations. A poisoned registry counts as empty
    /// and is logged.
    pub fn len(&self) -> usize {
        match self.read() {
            Ok(federations) => federations.len(),
            Err(error) => {
                warn!("cannot count federations: {}", error);
                0
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Runs `op` on the federation, under its mutex
    fn with_federation<T, F>(&self, handle: FederationHandle, op: F) -> Result<T, RtiError>
    where
        F: FnOnce(&mut Federation) -> Result<T, RtiError>,
    {
        check_handle(handle.value(), "federation")?;
        let federations = self.read()?;
        let entry = federations
            .iter()
            .find(|(known, _)| *known == handle)
            .map(|(_, entry)| entry)
            .ok_or_else(|| RtiError::FederationExecutionDoesNotExist {
                context: format!("handle {}", handle),
            })?;
        let mut federation = entry
            .federation
            .lock()
            .map_err(|_| RtiError::internal(format!("federation {} lock poisoned", handle)))?;
        op(&mut federation)
    }

    fn with_federate<T, F>(
        &self,
        handle: FederationHandle,
        federate: FederateHandle,
        op: F,
    ) -> Result<T, RtiError>
    where
        F: FnOnce(&mut Federation) -> Result<T, RtiError>,
    {
        check_handle(federate.value(), "federate")?;
        self.with_federation(handle, op)
    }

    // Federation lifecycle

    /// Starts a federation execution under a caller-chosen handle, with its
    /// own copy of the object model
    pub fn create_federation(&self, name: &str, handle: FederationHandle) -> Result<(), RtiError> {
        if name.is_empty() {
            return Err(RtiError::internal("empty federation name"));
        }
        check_handle(handle.value(), "federation")?;
        let mut federations = self.write()?;
        self.insert(&mut federations, name, handle)
    }

    /// Like `create_federation`, picking the next free handle
    pub fn create(&self, name: &str) -> Result<FederationHandle, RtiError> {
        if name.is_empty() {
            return Err(RtiError::internal("empty federation name"));
        }
        let mut federations = self.write()?;
        let handle = loop {
            let candidate = FederationHandle::new(self.next_handle.fetch_add(1, Ordering::SeqCst));
            check_handle(candidate.value(), "federation")?;
            if federations.iter().all(|(known, _)| *known != candidate) {
                break candidate;
            }
            trace!("federation handle {} taken, trying the next one", candidate);
        };
        self.insert(&mut federations, name, handle)?;
        Ok(handle)
    }

    fn insert(
        &self,
        federations: &mut Vec<(FederationHandle, FederationEntry)>,
        name: &str,
        handle: FederationHandle,
    ) -> Result<(), RtiError> {
        if federations.iter().any(|(_, entry)| entry.name == name) {
            return Err(RtiError::FederationExecutionAlreadyExists {
                name: name.to_string(),
            });
        }
        if federations.iter().any(|(known, _)| *known == handle) {
            return Err(RtiError::internal(format!(
                "federation handle {} already in use",
                handle
            )));
        }
        if federations.len() >= self.max_federations {
            return Err(RtiError::internal("too many federation executions"));
        }

        let (object_classes, interaction_classes) = self.model.clone().into_parts();
        let federation = Federation::new(
            handle,
            name,
            object_classes,
            interaction_classes,
            self.sink.clone(),
            self.max_federates,
        );
        federations.push((
            handle,
            FederationEntry {
                name: name.to_string(),
                federation: Mutex::new(federation),
            },
        ));
        info!("federation {} \"{}\" created", handle, name);
        Ok(())
    }

    /// Ends a federation execution. Only an empty federation can go.
    pub fn destroy_federation(&self, handle: FederationHandle) -> Result<(), RtiError> {
        check_handle(handle.value(), "federation")?;
        let mut federations = self.write()?;
        let index = federations
            .iter()
            .position(|(known, _)| *known == handle)
            .ok_or_else(|| RtiError::FederationExecutionDoesNotExist {
                context: format!("handle {}", handle),
            })?;
        {
            let federation = federations[index]
                .1
                .federation
                .lock()
                .map_err(|_| RtiError::internal(format!("federation {} lock poisoned", handle)))?;
            if !federation.is_empty() {
                return Err(RtiError::FederatesCurrentlyJoined {
                    federation: handle,
                    count: federation.len(),
                });
            }
        }
        let (_, entry) = federations.remove(index);
        info!("federation {} \"{}\" destroyed", handle, entry.name);
        Ok(())
    }

    /// Handle of the federation execution named `name`
    pub fn exists(&self, name: &str) -> Result<FederationHandle, RtiError> {
        if name.is_empty() {
            return Err(RtiError::internal("empty federation name"));
        }
        self.read()?
            .iter()
            .find(|(_, entry)| entry.name == name)
            .map(|(handle, _)| *handle)
            .ok_or_else(|| RtiError::FederationExecutionDoesNotExist {
                context: name.to_string(),
            })
    }

    pub fn info(&self, handle: FederationHandle) -> Result<FederationInfo, RtiError> {
        self.with_federation(handle, |federation| Ok(federation.info()))
    }

    // Membership

    pub fn add_federate(
        &self,
        handle: FederationHandle,
        name: &str,
        link: LinkKey,
    ) -> Result<FederateHandle, RtiError> {
        self.with_federation(handle, |federation| federation.add(name, link))
    }

    pub fn remove(&self, handle: FederationHandle, federate: FederateHandle) -> Result<(), RtiError> {
        self.with_federate(handle, federate, |federation| federation.remove(federate))
    }

    /// Removes a federate whose connection broke. Total: any failure along
    /// the way is logged, never returned.
    pub fn kill_federate(&self, handle: FederationHandle, federate: FederateHandle) {
        let result = self.with_federate(handle, federate, |federation| {
            federation.kill(federate);
            Ok(())
        });
        if let Err(error) = result {
            warn!(
                "could not kill federate {} of federation {}: {}",
                federate, handle, error
            );
        }
    }

    // Time management

    pub fn add_constrained(
        &self,
        handle: FederationHandle,
        federate: FederateHandle,
    ) -> Result<(), RtiError> {
        self.with_federate(handle, federate, |federation| {
            federation.add_constrained(federate)
        })
    }

    pub fn remove_constrained(
        &self,
        handle: FederationHandle,
        federate: FederateHandle,
    ) -> Result<(), RtiError> {
        self.with_federate(handle, federate, |federation| {
            federation.remove_constrained(federate)
        })
    }

    pub fn create_regulator(
        &self,
        handle: FederationHandle,
        federate: FederateHandle,
        time: FederationTime,
    ) -> Result<(), RtiError> {
        self.with_federate(handle, federate, |federation| {
            federation.add_regulator(federate, time)
        })
    }

    pub fn update_regulator(
        &self,
        handle: FederationHandle,
        federate: FederateHandle,
        time: FederationTime,
    ) -> Result<(), RtiError> {
        self.with_federate(handle, federate, |federation| {
            federation.update_regulator(federate, time)
        })
    }

    pub fn remove_regulator(
        &self,
        handle: FederationHandle,
        federate: FederateHandle,
    ) -> Result<(), RtiError> {
        self.with_federate(handle, federate, |federation| {
            federation.remove_regulator(federate)
        })
    }

    pub fn set_pause(
        &self,
        handle: FederationHandle,
        federate: FederateHandle,
        pause: bool,
        label: &str,
    ) -> Result<(), RtiError> {
        self.with_federate(handle, federate, |federation| {
            federation.set_pause(federate, pause, label)
        })
    }

    pub fn request_id(
        &self,
        handle: FederationHandle,
        count: u32,
    ) -> Result<(ObjectHandle, ObjectHandle), RtiError> {
        self.with_federation(handle, |federation| federation.request_id(count))
    }

    // Declarations

    pub fn publish_object(
        &self,
        handle: FederationHandle,
        federate: FederateHandle,
        class: ObjectClassHandle,
        attributes: &[AttributeHandle],
        publish: bool,
    ) -> Result<(), RtiError> {
        check_handle(class.value(), "object class")?;
        check_attributes(attributes)?;
        self.with_federate(handle, federate, |federation| {
            federation.publish_object(federate, class, attributes, publish)
        })
    }

    pub fn subscribe_object(
        &self,
        handle: FederationHandle,
        federate: FederateHandle,
        class: ObjectClassHandle,
        attributes: &[AttributeHandle],
        subscribe: bool,
    ) -> Result<(), RtiError> {
        check_handle(class.value(), "object class")?;
        check_attributes(attributes)?;
        self.with_federate(handle, federate, |federation| {
            federation.subscribe_object(federate, class, attributes, subscribe)
        })
    }

    pub fn publish_interaction(
        &self,
        handle: FederationHandle,
        federate: FederateHandle,
        class: InteractionClassHandle,
        publish: bool,
    ) -> Result<(), RtiError> {
        check_handle(class.value(), "interaction class")?;
        self.with_federate(handle, federate, |federation| {
            federation.publish_interaction(federate, class, publish)
        })
    }

    pub fn subscribe_interaction(
        &self,
        handle: FederationHandle,
        federate: FederateHandle,
        class: InteractionClassHandle,
        subscribe: bool,
    ) -> Result<(), RtiError> {
        check_handle(class.value(), "interaction class")?;
        self.with_federate(handle, federate, |federation| {
            federation.subscribe_interaction(federate, class, subscribe)
        })
    }

    // Objects

    pub fn register_object(
        &self,
        handle: FederationHandle,
        federate: FederateHandle,
        class: ObjectClassHandle,
        name: Option<String>,
    ) -> Result<(ObjectHandle, String), RtiError> {
        check_handle(class.value(), "object class")?;
        if name.as_deref() == Some("") {
            return Err(RtiError::internal("empty object name"));
        }
        self.with_federate(handle, federate, |federation| {
            federation.register_object(federate, class, name)
        })
    }

    pub fn destroy_object(
        &self,
        handle: FederationHandle,
        federate: FederateHandle,
        object: ObjectHandle,
        tag: &str,
    ) -> Result<(), RtiError> {
        check_handle(object.value(), "object")?;
        self.with_federate(handle, federate, |federation| {
            federation.destroy_object(federate, object, tag)
        })
    }

    pub fn update_attribute(
        &self,
        handle: FederationHandle,
        federate: FederateHandle,
        object: ObjectHandle,
        values: Vec<AttributeValue>,
        time: FederationTime,
        tag: &str,
    ) -> Result<(), RtiError> {
        check_handle(object.value(), "object")?;
        for (attribute, _) in &values {
            check_handle(attribute.value(), "attribute")?;
        }
        self.with_federate(handle, federate, |federation| {
            federation.update_attribute(federate, object, values, time, tag)
        })
    }

    pub fn update_parameter(
        &self,
        handle: FederationHandle,
        federate: FederateHandle,
        class: InteractionClassHandle,
        parameters: Vec<ParameterValue>,
        time: FederationTime,
        tag: &str,
    ) -> Result<(), RtiError> {
        check_handle(class.value(), "interaction class")?;
        for (parameter, _) in &parameters {
            check_handle(parameter.value(), "parameter")?;
        }
        self.with_federate(handle, federate, |federation| {
            federation.update_parameter(federate, class, parameters, time, tag)
        })
    }

    // Ownership

    pub fn is_owner(
        &self,
        handle: FederationHandle,
        federate: FederateHandle,
        object: ObjectHandle,
        attribute: AttributeHandle,
    ) -> Result<bool, RtiError> {
        check_handle(object.value(), "object")?;
        check_handle(attribute.value(), "attribute")?;
        self.with_federate(handle, federate, |federation| {
            federation.is_owner(federate, object, attribute)
        })
    }

    pub fn search_owner(
        &self,
        handle: FederationHandle,
        federate: FederateHandle,
        object: ObjectHandle,
        attribute: AttributeHandle,
    ) -> Result<(), RtiError> {
        check_handle(object.value(), "object")?;
        check_handle(attribute.value(), "attribute")?;
        self.with_federate(handle, federate, |federation| {
            federation.search_owner(federate, object, attribute)
        })
    }

    pub fn negotiate_divestiture(
        &self,
        handle: FederationHandle,
        federate: FederateHandle,
        object: ObjectHandle,
        attributes: &[AttributeHandle],
        tag: &str,
    ) -> Result<(), RtiError> {
        check_handle(object.value(), "object")?;
        check_attributes(attributes)?;
        self.with_federate(handle, federate, |federation| {
            federation.negotiate_divestiture(federate, object, attributes, tag)
        })
    }

    pub fn cancel_divestiture(
        &self,
        handle: FederationHandle,
        federate: FederateHandle,
        object: ObjectHandle,
        attributes: &[AttributeHandle],
    ) -> Result<(), RtiError> {
        check_handle(object.value(), "object")?;
        check_attributes(attributes)?;
        self.with_federate(handle, federate, |federation| {
            federation.cancel_divestiture(federate, object, attributes)
        })
    }

    pub fn acquire(
        &self,
        handle: FederationHandle,
        federate: FederateHandle,
        object: ObjectHandle,
        attributes: &[AttributeHandle],
        tag: &str,
    ) -> Result<(), RtiError> {
        check_handle(object.value(), "object")?;
        check_attributes(attributes)?;
        self.with_federate(handle, federate, |federation| {
            federation.acquire(federate, object, attributes, tag)
        })
    }

    pub fn acquire_if_available(
        &self,
        handle: FederationHandle,
        federate: FederateHandle,
        object: ObjectHandle,
        attributes: &[AttributeHandle],
    ) -> Result<(), RtiError> {
        check_handle(object.value(), "object")?;
        check_attributes(attributes)?;
        self.with_federate(handle, federate, |federation| {
            federation.acquire_if_available(federate, object, attributes)
        })
    }

    pub fn cancel_acquisition(
        &self,
        handle: FederationHandle,
        federate: FederateHandle,
        object: ObjectHandle,
        attributes: &[AttributeHandle],
    ) -> Result<(), RtiError> {
        check_handle(object.value(), "object")?;
        check_attributes(attributes)?;
        self.with_federate(handle, federate, |federation| {
            federation.cancel_acquisition(federate, object, attributes)
        })
    }

    pub fn divest(
        &self,
        handle: FederationHandle,
        federate: FederateHandle,
        object: ObjectHandle,
        attributes: &[AttributeHandle],
    ) -> Result<(), RtiError> {
        check_handle(object.value(), "object")?;
        check_attributes(attributes)?;
        self.with_federate(handle, federate, |federation| {
            federation.divest(federate, object, attributes)
        })
    }

    pub fn respond_release(
        &self,
        handle: FederationHandle,
        federate: FederateHandle,
        object: ObjectHandle,
        attributes: &[AttributeHandle],
    ) -> Result<Vec<AttributeHandle>, RtiError> {
        check_handle(object.value(), "object")?;
        check_attributes(attributes)?;
        self.with_federate(handle, federate, |federation| {
            federation.respond_release(federate, object, attributes)
        })
    }

    // Save & restore

    pub fn request_federation_save(
        &self,
        handle: FederationHandle,
        federate: FederateHandle,
        label: &str,
    ) -> Result<(), RtiError> {
        self.with_federate(handle, federate, |federation| {
            federation.request_federation_save(federate, label)
        })
    }

    pub fn federate_save_begun(
        &self,
        handle: FederationHandle,
        federate: FederateHandle,
    ) -> Result<(), RtiError> {
        self.with_federate(handle, federate, |federation| {
            federation.federate_save_begun(federate)
        })
    }

    pub fn federate_save_status(
        &self,
        handle: FederationHandle,
        federate: FederateHandle,
        success: bool,
    ) -> Result<(), RtiError> {
        self.with_federate(handle, federate, |federation| {
            federation.federate_save_status(federate, success)
        })
    }

    pub fn request_federation_restore(
        &self,
        handle: FederationHandle,
        federate: FederateHandle,
        label: &str,
    ) -> Result<(), RtiError> {
        self.with_federate(handle, federate, |federation| {
            federation.request_federation_restore(federate, label)
        })
    }

    pub fn federate_restore_status(
        &self,
        handle: FederationHandle,
        federate: FederateHandle,
        success: bool,
    ) -> Result<(), RtiError> {
        self.with_federate(handle, federate, |federation| {
            federation.federate_restore_status(federate, success)
        })
    }
}
