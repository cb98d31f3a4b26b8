//! # RTI Shared
//! Common functionality shared between the RTI coordinator & federate-side
//! ambassadors: handles, the exception taxonomy, wire messages, the reliable
//! TCP transport and the object & interaction class model.

#![deny(trivial_numeric_casts, unstable_features, unused_import_braces)]

#[macro_use]
extern crate cfg_if;

pub use rti_serde::{ByteWrite, Serde, SerdeErr, StreamReader, StreamWriter};

mod broadcast_list;
mod error;
mod interaction;
mod messages;
mod object;
mod object_model;
mod types;

pub mod transport;

pub use broadcast_list::{Audience, BroadcastLevel, BroadcastList};
pub use error::{ErrorKind, RtiError};
pub use interaction::{
    interaction_class::InteractionClass, interaction_class_set::InteractionClassSet,
    InteractionBroadcastList,
};
pub use messages::{
    message_sink::MessageSink,
    network_message::{AttributeValue, NetworkMessage, ParameterValue},
    outbox::Outbox,
};
pub use object::{
    object_class::{ObjectClass, ObjectClassAttribute},
    object_class_set::ObjectClassSet,
    object_instance::{AttributeOwnership, ObjectInstance, OwnershipState},
    ObjectClassBroadcastList,
};
pub use object_model::{ObjectModel, ObjectModelBuilder};
pub use types::{
    AttributeHandle, FederateHandle, FederationHandle, FederationTime, InteractionClassHandle,
    LinkKey, ObjectClassHandle, ObjectHandle, ObjectHandleCount, ParameterHandle, SecurityLevel,
    PUBLIC_LEVEL,
};
