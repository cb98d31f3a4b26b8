use std::{net::TcpStream, sync::Arc};

use log::{debug, info, warn};

use rti_shared::{
    transport::{ByteStream, FrameReader, SocketTcp, TransportError},
    FederateHandle, FederationHandle, LinkKey, NetworkMessage, RtiError,
};

use crate::{connection::SocketServer, federations_list::FederationsList, statistics::Statistics};

/// Serves one federate connection: reads framed requests, applies them to
/// the registry and answers each with an acknowledgement, a typed reply or
/// an `Exception`. Runs on its own thread until the peer goes away.
pub struct ConnectionHandler<S: ByteStream = TcpStream> {
    link: LinkKey,
    reader: SocketTcp<S>,
    frames: FrameReader,
    federations: Arc<FederationsList>,
    sockets: Arc<SocketServer<S>>,
    statistics: Arc<Statistics>,
    membership: Option<(FederationHandle, FederateHandle)>,
}

impl<S: ByteStream> ConnectionHandler<S> {
    pub fn new(
        link: LinkKey,
        reader: SocketTcp<S>,
        max_message_size: usize,
        federations: Arc<FederationsList>,
        sockets: Arc<SocketServer<S>>,
        statistics: Arc<Statistics>,
    ) -> Self {
        Self {
            link,
            reader,
            frames: FrameReader::new(max_message_size),
            federations,
            sockets,
            statistics,
            membership: None,
        }
    }

    pub fn link(&self) -> &LinkKey {
        &self.link
    }

    /// The federation and federate handles once this connection has joined
    pub fn membership(&self) -> Option<(FederationHandle, FederateHandle)> {
        self.membership
    }

    pub fn run(mut self) {
        loop {
            let message = match self.frames.read_message(&mut self.reader) {
                Ok(message) => message,
                Err(TransportError::NetworkSignal { context }) => {
                    debug!("{} interrupted during {}, resuming", self.link, context);
                    continue;
                }
                Err(error) => {
                    info!("{} lost: {}", self.link, error);
                    break;
                }
            };
            self.statistics.record_received(&message);
            if let NetworkMessage::CloseConnexion = message {
                debug!("{} closed by the federate", self.link);
                break;
            }

            let reply = self.process(message).unwrap_or_else(|error| {
                debug!("{} request failed: {}", self.link, error);
                NetworkMessage::Exception {
                    name: error.name().to_string(),
                    reason: error.to_string(),
                }
            });
            if let Err(error) = self.sockets.send(&self.link, &reply) {
                warn!("{} reply failed: {}", self.link, error);
                break;
            }
        }
        self.close();
    }

    /// Kills the federate if it never resigned, then forgets the connection
    fn close(&mut self) {
        if let Some((federation, federate)) = self.membership.take() {
            self.federations.kill_federate(federation, federate);
        }
        self.sockets.unregister(&self.link);
        debug!("{} read {} bytes", self.link, self.reader.received_bytes());
    }

    fn joined(&self) -> Result<(FederationHandle, FederateHandle), RtiError> {
        self.membership
            .ok_or_else(|| RtiError::internal(format!("{} has not joined a federation", self.link)))
    }

    /// Applies one request and builds the reply
    pub fn process(&mut self, message: NetworkMessage) -> Result<NetworkMessage, RtiError> {
        let federations = self.federations.clone();
        match message {
            // Federation management
            NetworkMessage::CreateFederationExecution { federation_name } => {
                federations.create(&federation_name)?;
            }
            NetworkMessage::DestroyFederationExecution { federation_name } => {
                let federation = federations.exists(&federation_name)?;
                federations.destroy_federation(federation)?;
            }
            NetworkMessage::JoinFederationExecution {
                federation_name,
                federate_name,
            } => {
                if let Some((federation, federate)) = self.membership {
                    return Err(RtiError::internal(format!(
                        "already joined federation {} as federate {}",
                        federation, federate
                    )));
                }
                let federation = federations.exists(&federation_name)?;
                let federate = federations.add_federate(federation, &federate_name, self.link)?;
                self.membership = Some((federation, federate));
                return Ok(NetworkMessage::FederationJoined {
                    federation,
                    federate,
                });
            }
            NetworkMessage::ResignFederationExecution => {
                let (federation, federate) = self.joined()?;
                federations.remove(federation, federate)?;
                self.membership = None;
            }

            // Time & pause
            NetworkMessage::SetTimeRegulating { enabled, time, .. } => {
                let (federation, federate) = self.joined()?;
                if enabled {
                    federations.create_regulator(federation, federate, time)?;
                } else {
                    federations.remove_regulator(federation, federate)?;
                }
            }
            NetworkMessage::SetTimeConstrained { enabled } => {
                let (federation, federate) = self.joined()?;
                if enabled {
                    federations.add_constrained(federation, federate)?;
                } else {
                    federations.remove_constrained(federation, federate)?;
                }
            }
            NetworkMessage::NullMessage { time, .. } => {
                let (federation, federate) = self.joined()?;
                federations.update_regulator(federation, federate, time)?;
            }
            NetworkMessage::RequestPause { label } => {
                let (federation, federate) = self.joined()?;
                federations.set_pause(federation, federate, true, &label)?;
            }
            NetworkMessage::RequestResume { label } => {
                let (federation, federate) = self.joined()?;
                federations.set_pause(federation, federate, false, &label)?;
            }

            // Save & restore
            NetworkMessage::RequestFederationSave { label } => {
                let (federation, federate) = self.joined()?;
                federations.request_federation_save(federation, federate, &label)?;
            }
            NetworkMessage::FederateSaveBegun => {
                let (federation, federate) = self.joined()?;
                federations.federate_save_begun(federation, federate)?;
            }
            NetworkMessage::FederateSaveComplete { success } => {
                let (federation, federate) = self.joined()?;
                federations.federate_save_status(federation, federate, success)?;
            }
            NetworkMessage::RequestFederationRestore { label } => {
                let (federation, federate) = self.joined()?;
                federations.request_federation_restore(federation, federate, &label)?;
            }
            NetworkMessage::FederateRestoreComplete { success } => {
                let (federation, federate) = self.joined()?;
                federations.federate_restore_status(federation, federate, success)?;
            }

            // Declarations
            NetworkMessage::PublishObjectClass { class, attributes } => {
                let (federation, federate) = self.joined()?;
                federations.publish_object(federation, federate, class, &attributes, true)?;
            }
            NetworkMessage::UnpublishObjectClass { class } => {
                let (federation, federate) = self.joined()?;
                federations.publish_object(federation, federate, class, &[], false)?;
            }
            NetworkMessage::SubscribeObjectClassAttributes { class, attributes } => {
                let (federation, federate) = self.joined()?;
                federations.subscribe_object(federation, federate, class, &attributes, true)?;
            }
            NetworkMessage::UnsubscribeObjectClass { class } => {
                let (federation, federate) = self.joined()?;
                federations.subscribe_object(federation, federate, class, &[], false)?;
            }
            NetworkMessage::PublishInteractionClass { class } => {
                let (federation, federate) = self.joined()?;
                federations.publish_interaction(federation, federate, class, true)?;
            }
            NetworkMessage::UnpublishInteractionClass { class } => {
                let (federation, federate) = self.joined()?;
                federations.publish_interaction(federation, federate, class, false)?;
            }
            NetworkMessage::SubscribeInteractionClass { class } => {
                let (federation, federate) = self.joined()?;
                federations.subscribe_interaction(federation, federate, class, true)?;
            }
            NetworkMessage::UnsubscribeInteractionClass { class } => {
                let (federation, federate) = self.joined()?;
                federations.subscribe_interaction(federation, federate, class, false)?;
            }

            // Objects
            NetworkMessage::RequestIdPool { count } => {
                let (federation, _) = self.joined()?;
                let (first, last) = federations.request_id(federation, count)?;
                return Ok(NetworkMessage::IdPoolGranted { first, last });
            }
            NetworkMessage::RegisterObject { class, name } => {
                let (federation, federate) = self.joined()?;
                let (object, name) = federations.register_object(federation, federate, class, name)?;
                return Ok(NetworkMessage::ObjectRegistered { object, name });
            }
            NetworkMessage::UpdateAttributeValues {
                object,
                values,
                time,
                tag,
            } => {
                let (federation, federate) = self.joined()?;
                federations.update_attribute(federation, federate, object, values, time, &tag)?;
            }
            NetworkMessage::SendInteraction {
                class,
                parameters,
                time,
                tag,
            } => {
                let (federation, federate) = self.joined()?;
                federations.update_parameter(federation, federate, class, parameters, time, &tag)?;
            }
            NetworkMessage::DeleteObject { object, tag } => {
                let (federation, federate) = self.joined()?;
                federations.destroy_object(federation, federate, object, &tag)?;
            }

            // Ownership
            NetworkMessage::IsAttributeOwnedByFederate { object, attribute } => {
                let (federation, federate) = self.joined()?;
                let owned = federations.is_owner(federation, federate, object, attribute)?;
                return Ok(NetworkMessage::AttributeOwnershipStatus { owned });
            }
            NetworkMessage::QueryAttributeOwnership { object, attribute } => {
                let (federation, federate) = self.joined()?;
                federations.search_owner(federation, federate, object, attribute)?;
            }
            NetworkMessage::NegotiatedAttributeOwnershipDivestiture {
                object,
                attributes,
                tag,
            } => {
                let (federation, federate) = self.joined()?;
                federations.negotiate_divestiture(federation, federate, object, &attributes, &tag)?;
            }
            NetworkMessage::CancelNegotiatedAttributeOwnershipDivestiture { object, attributes } => {
                let (federation, federate) = self.joined()?;
                federations.cancel_divestiture(federation, federate, object, &attributes)?;
            }
            NetworkMessage::AttributeOwnershipAcquisition {
                object,
                attributes,
                tag,
            } => {
                let (federation, federate) = self.joined()?;
                federations.acquire(federation, federate, object, &attributes, &tag)?;
            }
            NetworkMessage::AttributeOwnershipAcquisitionIfAvailable { object, attributes } => {
                let (federation, federate) = self.joined()?;
                federations.acquire_if_available(federation, federate, object, &attributes)?;
            }
            NetworkMessage::CancelAttributeOwnershipAcquisition { object, attributes } => {
                let (federation, federate) = self.joined()?;
                federations.cancel_acquisition(federation, federate, object, &attributes)?;
            }
            NetworkMessage::UnconditionalAttributeOwnershipDivestiture { object, attributes } => {
                let (federation, federate) = self.joined()?;
                federations.divest(federation, federate, object, &attributes)?;
            }
            NetworkMessage::AttributeOwnershipReleaseResponse { object, attributes } => {
                let (federation, federate) = self.joined()?;
                let attributes =
                    federations.respond_release(federation, federate, object, &attributes)?;
                return Ok(NetworkMessage::AttributesReleased { attributes });
            }

            other => {
                return Err(RtiError::internal(format!(
                    "{} is not a request",
                    other.name()
                )));
            }
        }
        Ok(NetworkMessage::Acknowledge)
    }
}
