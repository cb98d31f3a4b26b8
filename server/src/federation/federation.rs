use std::{
    collections::{BTreeMap, BTreeSet},
    sync::Arc,
};

use log::{debug, info, trace, warn};

use rti_shared::{
    AttributeHandle, AttributeValue, FederateHandle, FederationHandle, FederationTime,
    InteractionClassHandle, InteractionClassSet, LinkKey, MessageSink, NetworkMessage,
    ObjectClassHandle, ObjectClassSet, ObjectHandle, Outbox, ParameterValue, RtiError,
};

use crate::federation::Federate;

/// Snapshot of a federation's membership, for diagnostics
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FederationInfo {
    pub federates: usize,
    pub regulators: usize,
    pub paused: bool,
}

/// A save or restore in flight: who has yet to report, and whether everyone
/// who reported so far succeeded
#[derive(Debug)]
struct Synchronization {
    label: String,
    pending: BTreeSet<FederateHandle>,
    success: bool,
}

impl Synchronization {
    fn new(label: &str, members: impl Iterator<Item = FederateHandle>) -> Self {
        Self {
            label: label.to_string(),
            pending: members.collect(),
            success: true,
        }
    }
}

#[derive(Debug)]
enum Activity {
    Idle,
    Saving(Synchronization),
    Restoring(Synchronization),
}

/// One running federation execution. Owns its class trees and instances;
/// the registry serializes access with one mutex per federation.
///
/// Every operation validates first and mutates after, collecting the
/// notifications it produces in an `Outbox` that is flushed through the
/// `MessageSink` only once the operation has succeeded.
pub struct Federation {
    handle: FederationHandle,
    name: String,
    federates: BTreeMap<FederateHandle, Federate>,
    next_federate: FederateHandle,
    regulators: BTreeMap<FederateHandle, FederationTime>,
    pause_label: Option<String>,
    activity: Activity,
    next_object: i32,
    object_classes: ObjectClassSet,
    interaction_classes: InteractionClassSet,
    sink: Arc<dyn MessageSink>,
    max_federates: usize,
}

impl Federation {
    pub fn new(
        handle: FederationHandle,
        name: &str,
        object_classes: ObjectClassSet,
        interaction_classes: InteractionClassSet,
        sink: Arc<dyn MessageSink>,
        max_federates: usize,
    ) -> Self {
        Self {
            handle,
            name: name.to_string(),
            federates: BTreeMap::new(),
            next_federate: FederateHandle::new(1),
            regulators: BTreeMap::new(),
            pause_label: None,
            activity: Activity::Idle,
            next_object: 1,
            object_classes,
            interaction_classes,
            sink,
            max_federates,
        }
    }

    pub fn handle(&self) -> FederationHandle {
        self.handle
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn len(&self) -> usize {
        self.federates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.federates.is_empty()
    }

    pub fn federate(&self, federate: FederateHandle) -> Result<&Federate, RtiError> {
        self.federates
            .get(&federate)
            .ok_or(RtiError::FederateNotExecutionMember {
                federation: self.handle,
                federate,
            })
    }

    pub fn federates(&self) -> impl Iterator<Item = &Federate> {
        self.federates.values()
    }

    pub fn is_regulator(&self, federate: FederateHandle) -> bool {
        self.regulators.contains_key(&federate)
    }

    pub fn is_paused(&self) -> bool {
        self.pause_label.is_some()
    }

    pub fn is_saving(&self) -> bool {
        matches!(self.activity, Activity::Saving(_))
    }

    pub fn is_restoring(&self) -> bool {
        matches!(self.activity, Activity::Restoring(_))
    }

    pub fn object_classes(&self) -> &ObjectClassSet {
        &self.object_classes
    }

    pub fn interaction_classes(&self) -> &InteractionClassSet {
        &self.interaction_classes
    }

    pub fn info(&self) -> FederationInfo {
        FederationInfo {
            federates: self.federates.len(),
            regulators: self.regulators.len(),
            paused: self.is_paused(),
        }
    }

    fn check_member(&self, federate: FederateHandle) -> Result<(), RtiError> {
        self.federate(federate).map(|_| ())
    }

    fn check_idle(&self) -> Result<(), RtiError> {
        match self.activity {
            Activity::Idle => Ok(()),
            Activity::Saving(_) => Err(RtiError::SaveInProgress),
            Activity::Restoring(_) => Err(RtiError::RestoreInProgress),
        }
    }

    /// Member and no save or restore running
    fn check_active(&self, federate: FederateHandle) -> Result<(), RtiError> {
        self.check_member(federate)?;
        self.check_idle()
    }

    fn broadcast(
        &self,
        outbox: &mut Outbox,
        except: Option<FederateHandle>,
        message: &NetworkMessage,
    ) {
        for handle in self.federates.keys() {
            if Some(*handle) != except {
                outbox.push(*handle, message.clone());
            }
        }
    }

    /// Delivers every queued notification. Federates that left in the
    /// meantime are skipped, delivery failures are logged and dropped; the
    /// receiving connection's own handler will notice the broken link.
    fn flush(&self, outbox: &mut Outbox) {
        for (federate, message) in outbox.drain() {
            let Some(recipient) = self.federates.get(&federate) else {
                trace!("{} dropped for departed federate {}", message.name(), federate);
                continue;
            };
            if let Err(error) = self.sink.deliver(recipient.link(), &message) {
                warn!(
                    "federation {}: could not deliver {} to federate {}: {}",
                    self.handle,
                    message.name(),
                    federate,
                    error
                );
            }
        }
    }

    // Membership

    /// Admits a federate. The newcomer receives the current bound of every
    /// regulator and, if the federation is paused, the pause request.
    pub fn add(&mut self, name: &str, link: LinkKey) -> Result<FederateHandle, RtiError> {
        if name.is_empty() {
            return Err(RtiError::internal("empty federate name"));
        }
        self.check_idle()?;
        if self.federates.values().any(|federate| federate.name() == name) {
            return Err(RtiError::FederateAlreadyExecutionMember {
                name: name.to_string(),
            });
        }
        if self.federates.len() >= self.max_federates {
            return Err(RtiError::MemoryExhausted {
                reason: format!(
                    "federation {} already holds {} federates",
                    self.name, self.max_federates
                ),
            });
        }

        let handle = self.next_federate;
        self.next_federate = handle.next();
        self.federates
            .insert(handle, Federate::new(handle, name, link));
        info!(
            "federate {} \"{}\" joined federation {} \"{}\"",
            handle, name, self.handle, self.name
        );

        let mut outbox = Outbox::new();
        for (regulator, time) in &self.regulators {
            outbox.push(
                handle,
                NetworkMessage::NullMessage {
                    federate: *regulator,
                    time: *time,
                },
            );
        }
        if let Some(label) = &self.pause_label {
            outbox.push(
                handle,
                NetworkMessage::RequestPause {
                    label: label.clone(),
                },
            );
        }
        self.flush(&mut outbox);
        Ok(handle)
    }

    /// Resigns a federate. Refused while it still owns attributes; otherwise
    /// the objects it registered are deleted and its declarations withdrawn.
    pub fn remove(&mut self, federate: FederateHandle) -> Result<(), RtiError> {
        self.check_member(federate)?;
        if self.object_classes.owns_attributes(federate) {
            return Err(RtiError::FederateOwnsAttributes { federate });
        }
        self.forget(federate);
        info!("federate {} resigned from federation {}", federate, self.handle);
        Ok(())
    }

    /// Removes a federate whose connection broke. Never fails: whatever the
    /// federate left behind is released and offered to the others.
    pub fn kill(&mut self, federate: FederateHandle) {
        if self.check_member(federate).is_err() {
            debug!(
                "federate {} is not a member of federation {}, nothing to kill",
                federate, self.handle
            );
            return;
        }
        self.forget(federate);
        warn!("federate {} killed in federation {}", federate, self.handle);
    }

    fn forget(&mut self, federate: FederateHandle) {
        let mut outbox = Outbox::new();
        self.object_classes.kill_federate(federate, &mut outbox);
        self.interaction_classes.kill_federate(federate);
        self.flush(&mut outbox);

        if let Some(time) = self.regulators.remove(&federate) {
            self.broadcast(
                &mut outbox,
                Some(federate),
                &NetworkMessage::SetTimeRegulating {
                    federate,
                    enabled: false,
                    time,
                },
            );
        }
        self.federates.remove(&federate);
        self.leave_synchronization(federate, &mut outbox);
        self.flush(&mut outbox);
    }

    // Time management

    pub fn add_constrained(&mut self, federate: FederateHandle) -> Result<(), RtiError> {
        self.set_constrained(federate, true)
    }

    pub fn remove_constrained(&mut self, federate: FederateHandle) -> Result<(), RtiError> {
        self.set_constrained(federate, false)
    }

    fn set_constrained(&mut self, federate: FederateHandle, enabled: bool) -> Result<(), RtiError> {
        self.check_active(federate)?;
        let handle = self.handle;
        let record = self
            .federates
            .get_mut(&federate)
            .ok_or(RtiError::FederateNotExecutionMember {
                federation: handle,
                federate,
            })?;
        if record.constrained == enabled {
            return Err(RtiError::internal(format!(
                "federate {} is already {}",
                federate,
                if enabled { "constrained" } else { "unconstrained" }
            )));
        }
        record.constrained = enabled;
        debug!("federate {} constrained: {}", federate, enabled);
        Ok(())
    }

    pub fn add_regulator(
        &mut self,
        federate: FederateHandle,
        time: FederationTime,
    ) -> Result<(), RtiError> {
        self.check_active(federate)?;
        if self.is_regulator(federate) {
            return Err(RtiError::internal(format!(
                "federate {} is already a regulator",
                federate
            )));
        }
        self.regulators.insert(federate, time);
        debug!("federate {} regulates from {}", federate, time);

        let mut outbox = Outbox::new();
        self.broadcast(
            &mut outbox,
            Some(federate),
            &NetworkMessage::SetTimeRegulating {
                federate,
                enabled: true,
                time,
            },
        );
        self.flush(&mut outbox);
        Ok(())
    }

    pub fn update_regulator(
        &mut self,
        federate: FederateHandle,
        time: FederationTime,
    ) -> Result<(), RtiError> {
        self.check_active(federate)?;
        let Some(bound) = self.regulators.get_mut(&federate) else {
            return Err(RtiError::internal(format!(
                "federate {} is not a regulator",
                federate
            )));
        };
        *bound = time;

        let mut outbox = Outbox::new();
        self.broadcast(
            &mut outbox,
            Some(federate),
            &NetworkMessage::NullMessage { federate, time },
        );
        self.flush(&mut outbox);
        Ok(())
    }

    pub fn remove_regulator(&mut self, federate: FederateHandle) -> Result<(), RtiError> {
        self.check_active(federate)?;
        let Some(time) = self.regulators.remove(&federate) else {
            return Err(RtiError::internal(format!(
                "federate {} is not a regulator",
                federate
            )));
        };
        debug!("federate {} stopped regulating", federate);

        let mut outbox = Outbox::new();
        self.broadcast(
            &mut outbox,
            Some(federate),
            &NetworkMessage::SetTimeRegulating {
                federate,
                enabled: false,
                time,
            },
        );
        self.flush(&mut outbox);
        Ok(())
    }

    // Pause

    pub fn set_pause(
        &mut self,
        federate: FederateHandle,
        pause: bool,
        label: &str,
    ) -> Result<(), RtiError> {
        self.check_member(federate)?;
        let message = match (pause, self.is_paused()) {
            (true, true) => return Err(RtiError::FederationAlreadyPaused),
            (false, false) => return Err(RtiError::FederationNotPaused),
            (true, false) => {
                self.pause_label = Some(label.to_string());
                NetworkMessage::RequestPause {
                    label: label.to_string(),
                }
            }
            (false, true) => {
                self.pause_label = None;
                NetworkMessage::RequestResume {
                    label: label.to_string(),
                }
            }
        };
        info!("federation {} paused: {}", self.handle, pause);

        let mut outbox = Outbox::new();
        self.broadcast(&mut outbox, None, &message);
        self.flush(&mut outbox);
        Ok(())
    }

    // Object identifiers

    /// Hands out `count` contiguous object handles
    pub fn request_id(&mut self, count: u32) -> Result<(ObjectHandle, ObjectHandle), RtiError> {
        if count == 0 {
            return Err(RtiError::internal("zero object handles requested"));
        }
        let first = self.next_object;
        let last = i32::try_from(count)
            .ok()
            .and_then(|count| first.checked_add(count - 1))
            .ok_or(RtiError::TooManyIdsRequested { requested: count })?;
        let next = last
            .checked_add(1)
            .ok_or(RtiError::TooManyIdsRequested { requested: count })?;
        self.next_object = next;
        Ok((ObjectHandle::new(first), ObjectHandle::new(last)))
    }

    // Declarations

    pub fn publish_object(
        &mut self,
        federate: FederateHandle,
        class: ObjectClassHandle,
        attributes: &[AttributeHandle],
        publish: bool,
    ) -> Result<(), RtiError> {
        self.check_active(federate)?;
        self.object_classes
            .publish(federate, class, attributes, publish)
    }

    pub fn subscribe_object(
        &mut self,
        federate: FederateHandle,
        class: ObjectClassHandle,
        attributes: &[AttributeHandle],
        subscribe: bool,
    ) -> Result<(), RtiError> {
        self.check_active(federate)?;
        let mut outbox = Outbox::new();
        self.object_classes
            .subscribe(federate, class, attributes, subscribe, &mut outbox)?;
        self.flush(&mut outbox);
        Ok(())
    }

    pub fn publish_interaction(
        &mut self,
        federate: FederateHandle,
        class: InteractionClassHandle,
        publish: bool,
    ) -> Result<(), RtiError> {
        self.check_active(federate)?;
        self.interaction_classes.publish(federate, class, publish)
    }

    pub fn subscribe_interaction(
        &mut self,
        federate: FederateHandle,
        class: InteractionClassHandle,
        subscribe: bool,
    ) -> Result<(), RtiError> {
        self.check_active(federate)?;
        self.interaction_classes
            .subscribe(federate, class, subscribe)
    }

    // Objects

    /// Registers an instance under the next free object handle. The handle
    /// is only consumed when registration succeeds.
    pub fn register_object(
        &mut self,
        federate: FederateHandle,
        class: ObjectClassHandle,
        name: Option<String>,
    ) -> Result<(ObjectHandle, String), RtiError> {
        self.check_active(federate)?;
        let object = ObjectHandle::new(self.next_object);
        let next = self
            .next_object
            .checked_add(1)
            .ok_or(RtiError::TooManyIdsRequested { requested: 1 })?;

        let mut outbox = Outbox::new();
        let name = self
            .object_classes
            .register_object(federate, class, object, name, &mut outbox)?;
        self.next_object = next;
        self.flush(&mut outbox);
        Ok((object, name))
    }

    pub fn destroy_object(
        &mut self,
        federate: FederateHandle,
        object: ObjectHandle,
        tag: &str,
    ) -> Result<(), RtiError> {
        self.check_active(federate)?;
        let mut outbox = Outbox::new();
        self.object_classes
            .delete_object(federate, object, tag, &mut outbox)?;
        self.flush(&mut outbox);
        Ok(())
    }

    pub fn update_attribute(
        &mut self,
        federate: FederateHandle,
        object: ObjectHandle,
        values: Vec<AttributeValue>,
        time: FederationTime,
        tag: &str,
    ) -> Result<(), RtiError> {
        self.check_active(federate)?;
        let mut outbox = Outbox::new();
        self.object_classes
            .update_attribute_values(federate, object, values, time, tag, &mut outbox)?;
        self.flush(&mut outbox);
        Ok(())
    }

    pub fn update_parameter(
        &mut self,
        federate: FederateHandle,
        class: InteractionClassHandle,
        parameters: Vec<ParameterValue>,
        time: FederationTime,
        tag: &str,
    ) -> Result<(), RtiError> {
        self.check_active(federate)?;
        let mut outbox = Outbox::new();
        self.interaction_classes
            .send_interaction(federate, class, parameters, time, tag, &mut outbox)?;
        self.flush(&mut outbox);
        Ok(())
    }

    // Ownership

    pub fn is_owner(
        &self,
        federate: FederateHandle,
        object: ObjectHandle,
        attribute: AttributeHandle,
    ) -> Result<bool, RtiError> {
        self.check_member(federate)?;
        self.object_classes
            .is_attribute_owned_by_federate(federate, object, attribute)
    }

    /// Answers with `InformAttributeOwnership` or `AttributeIsNotOwned`
    pub fn search_owner(
        &mut self,
        federate: FederateHandle,
        object: ObjectHandle,
        attribute: AttributeHandle,
    ) -> Result<(), RtiError> {
        self.check_member(federate)?;
        let mut outbox = Outbox::new();
        self.object_classes
            .query_attribute_ownership(federate, object, attribute, &mut outbox)?;
        self.flush(&mut outbox);
        Ok(())
    }

    pub fn negotiate_divestiture(
        &mut self,
        federate: FederateHandle,
        object: ObjectHandle,
        attributes: &[AttributeHandle],
        tag: &str,
    ) -> Result<(), RtiError> {
        self.check_active(federate)?;
        let mut outbox = Outbox::new();
        self.object_classes
            .negotiated_divestiture(federate, object, attributes, tag, &mut outbox)?;
        self.flush(&mut outbox);
        Ok(())
    }

    pub fn cancel_divestiture(
        &mut self,
        federate: FederateHandle,
        object: ObjectHandle,
        attributes: &[AttributeHandle],
    ) -> Result<(), RtiError> {
        self.check_active(federate)?;
        self.object_classes
            .cancel_negotiated_divestiture(federate, object, attributes)
    }

    pub fn acquire(
        &mut self,
        federate: FederateHandle,
        object: ObjectHandle,
        attributes: &[AttributeHandle],
        tag: &str,
    ) -> Result<(), RtiError> {
        self.check_active(federate)?;
        let mut outbox = Outbox::new();
        self.object_classes.attribute_ownership_acquisition(
            federate,
            object,
            attributes,
            tag,
            &mut outbox,
        )?;
        self.flush(&mut outbox);
        Ok(())
    }

    pub fn acquire_if_available(
        &mut self,
        federate: FederateHandle,
        object: ObjectHandle,
        attributes: &[AttributeHandle],
    ) -> Result<(), RtiError> {
        self.check_active(federate)?;
        let mut outbox = Outbox::new();
        self.object_classes
            .attribute_ownership_acquisition_if_available(federate, object, attributes, &mut outbox)?;
        self.flush(&mut outbox);
        Ok(())
    }

    pub fn cancel_acquisition(
        &mut self,
        federate: FederateHandle,
        object: ObjectHandle,
        attributes: &[AttributeHandle],
    ) -> Result<(), RtiError> {
        self.check_active(federate)?;
        let mut outbox = Outbox::new();
        self.object_classes
            .cancel_attribute_ownership_acquisition(federate, object, attributes, &mut outbox)?;
        self.flush(&mut outbox);
        Ok(())
    }

    /// Unconditional divestiture
    pub fn divest(
        &mut self,
        federate: FederateHandle,
        object: ObjectHandle,
        attributes: &[AttributeHandle],
    ) -> Result<(), RtiError> {
        self.check_active(federate)?;
        let mut outbox = Outbox::new();
        self.object_classes
            .unconditional_divestiture(federate, object, attributes, &mut outbox)?;
        self.flush(&mut outbox);
        Ok(())
    }

    /// Releases the attributes the owner was asked for; returns the ones
    /// that changed hands
    pub fn respond_release(
        &mut self,
        federate: FederateHandle,
        object: ObjectHandle,
        attributes: &[AttributeHandle],
    ) -> Result<Vec<AttributeHandle>, RtiError> {
        self.check_active(federate)?;
        let mut outbox = Outbox::new();
        let released = self.object_classes.attribute_ownership_release_response(
            federate,
            object,
            attributes,
            &mut outbox,
        )?;
        self.flush(&mut outbox);
        Ok(released)
    }

    // Save & restore

    pub fn request_federation_save(
        &mut self,
        federate: FederateHandle,
        label: &str,
    ) -> Result<(), RtiError> {
        self.check_active(federate)?;
        self.activity =
            Activity::Saving(Synchronization::new(label, self.federates.keys().copied()));
        info!("federation {} saving \"{}\"", self.handle, label);

        let mut outbox = Outbox::new();
        self.broadcast(
            &mut outbox,
            None,
            &NetworkMessage::InitiateFederateSave {
                label: label.to_string(),
            },
        );
        self.flush(&mut outbox);
        Ok(())
    }

    pub fn federate_save_begun(&mut self, federate: FederateHandle) -> Result<(), RtiError> {
        self.check_member(federate)?;
        match &self.activity {
            Activity::Saving(save) => {
                debug!("federate {} began saving \"{}\"", federate, save.label);
                Ok(())
            }
            _ => Err(RtiError::SaveNotInitiated),
        }
    }

    pub fn federate_save_status(
        &mut self,
        federate: FederateHandle,
        success: bool,
    ) -> Result<(), RtiError> {
        self.check_member(federate)?;
        let Activity::Saving(save) = &mut self.activity else {
            return Err(RtiError::SaveNotInitiated);
        };
        save.pending.remove(&federate);
        save.success &= success;

        let mut outbox = Outbox::new();
        self.complete_synchronization(&mut outbox);
        self.flush(&mut outbox);
        Ok(())
    }

    pub fn request_federation_restore(
        &mut self,
        federate: FederateHandle,
        label: &str,
    ) -> Result<(), RtiError> {
        self.check_active(federate)?;
        self.activity =
            Activity::Restoring(Synchronization::new(label, self.federates.keys().copied()));
        info!("federation {} restoring \"{}\"", self.handle, label);

        let mut outbox = Outbox::new();
        self.broadcast(
            &mut outbox,
            None,
            &NetworkMessage::InitiateFederateRestore {
                label: label.to_string(),
            },
        );
        self.flush(&mut outbox);
        Ok(())
    }

    pub fn federate_restore_status(
        &mut self,
        federate: FederateHandle,
        success: bool,
    ) -> Result<(), RtiError> {
        self.check_member(federate)?;
        let Activity::Restoring(restore) = &mut self.activity else {
            return Err(RtiError::RestoreNotRequested);
        };
        restore.pending.remove(&federate);
        restore.success &= success;

        let mut outbox = Outbox::new();
        self.complete_synchronization(&mut outbox);
        self.flush(&mut outbox);
        Ok(())
    }

    /// A departing federate no longer holds up a save or restore
    fn leave_synchronization(&mut self, federate: FederateHandle, outbox: &mut Outbox) {
        match &mut self.activity {
            Activity::Saving(sync) | Activity::Restoring(sync) => {
                sync.pending.remove(&federate);
            }
            Activity::Idle => return,
        }
        self.complete_synchronization(outbox);
    }

    /// Once every member has reported, announces the outcome and returns to
    /// idle
    fn complete_synchronization(&mut self, outbox: &mut Outbox) {
        let message = match &self.activity {
            Activity::Saving(save) if save.pending.is_empty() => {
                info!(
                    "federation {} save \"{}\" finished, success: {}",
                    self.handle, save.label, save.success
                );
                if save.success {
                    NetworkMessage::FederationSaved
                } else {
                    NetworkMessage::FederationNotSaved
                }
            }
            Activity::Restoring(restore) if restore.pending.is_empty() => {
                info!(
                    "federation {} restore \"{}\" finished, success: {}",
                    self.handle, restore.label, restore.success
                );
                if restore.success {
                    NetworkMessage::FederationRestored
                } else {
                    NetworkMessage::FederationNotRestored
                }
            }
            _ => return,
        };
        self.activity = Activity::Idle;
        self.broadcast(outbox, None, &message);
    }
}
