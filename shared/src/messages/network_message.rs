use rti_serde::{ByteWrite, Serde, SerdeErr, StreamReader};

use crate::types::{
    AttributeHandle, FederateHandle, FederationHandle, FederationTime, InteractionClassHandle,
    ObjectClassHandle, ObjectHandle, ParameterHandle,
};

pub type AttributeValue = (AttributeHandle, Vec<u8>);
pub type ParameterValue = (ParameterHandle, Vec<u8>);

macro_rules! network_messages {
    ($(
        $(#[$meta:meta])*
        $tag:literal => $variant:ident $({ $($field:ident: $ty:ty),* $(,)? })?
    ),* $(,)?) => {
        /// Everything that travels between a federate and the coordinator.
        /// Requests flow in, notifications and replies flow out; a few kinds
        /// (time and pause traffic) are used in both directions.
        #[derive(Clone, Debug, PartialEq)]
        pub enum NetworkMessage {
            $(
                $(#[$meta])*
                $variant $({ $($field: $ty),* })?,
            )*
        }

        impl NetworkMessage {
            /// Compile-time name of the message kind, used by statistics and
            /// logs
            pub fn name(&self) -> &'static str {
                match self {
                    $(Self::$variant { .. } => stringify!($variant),)*
                }
            }

            pub fn tag(&self) -> u8 {
                match self {
                    $(Self::$variant { .. } => $tag,)*
                }
            }

            /// Names of every message kind, in tag order
            pub const NAMES: &'static [&'static str] = &[$(stringify!($variant)),*];
        }

        impl Serde for NetworkMessage {
            #[allow(unused_variables)]
            fn ser(&self, writer: &mut dyn ByteWrite) {
                self.tag().ser(writer);
                match self {
                    $(Self::$variant $({ $($field),* })? => {
                        $($($field.ser(writer);)*)?
                    })*
                }
            }

            fn de(reader: &mut StreamReader) -> Result<Self, SerdeErr> {
                let tag = u8::de(reader)?;
                match tag {
                    $($tag => Ok(Self::$variant $({ $($field: <$ty>::de(reader)?),* })?),)*
                    _ => Err(SerdeErr::InvalidTag {
                        type_name: "NetworkMessage",
                        tag,
                    }),
                }
            }
        }
    };
}

network_messages! {
    // Federation management requests
    0 => CreateFederationExecution { federation_name: String },
    1 => DestroyFederationExecution { federation_name: String },
    2 => JoinFederationExecution { federation_name: String, federate_name: String },
    3 => ResignFederationExecution,
    /// Enables or disables time regulation. Broadcast back out with the
    /// federate filled in.
    4 => SetTimeRegulating { federate: FederateHandle, enabled: bool, time: FederationTime },
    5 => SetTimeConstrained { enabled: bool },
    /// A regulator's new lower bound. Broadcast back out with the federate
    /// filled in.
    6 => NullMessage { federate: FederateHandle, time: FederationTime },
    7 => RequestPause { label: String },
    8 => RequestResume { label: String },
    9 => RequestFederationSave { label: String },
    10 => FederateSaveBegun,
    11 => FederateSaveComplete { success: bool },
    12 => RequestFederationRestore { label: String },
    13 => FederateRestoreComplete { success: bool },
    14 => CloseConnexion,

    // Declaration requests
    20 => PublishObjectClass { class: ObjectClassHandle, attributes: Vec<AttributeHandle> },
    21 => UnpublishObjectClass { class: ObjectClassHandle },
    22 => SubscribeObjectClassAttributes { class: ObjectClassHandle, attributes: Vec<AttributeHandle> },
    23 => UnsubscribeObjectClass { class: ObjectClassHandle },
    24 => PublishInteractionClass { class: InteractionClassHandle },
    25 => UnpublishInteractionClass { class: InteractionClassHandle },
    26 => SubscribeInteractionClass { class: InteractionClassHandle },
    27 => UnsubscribeInteractionClass { class: InteractionClassHandle },

    // Object requests
    30 => RequestIdPool { count: u32 },
    31 => RegisterObject { class: ObjectClassHandle, name: Option<String> },
    32 => UpdateAttributeValues {
        object: ObjectHandle,
        values: Vec<AttributeValue>,
        time: FederationTime,
        tag: String,
    },
    33 => SendInteraction {
        class: InteractionClassHandle,
        parameters: Vec<ParameterValue>,
        time: FederationTime,
        tag: String,
    },
    34 => DeleteObject { object: ObjectHandle, tag: String },

    // Ownership requests
    40 => IsAttributeOwnedByFederate { object: ObjectHandle, attribute: AttributeHandle },
    41 => QueryAttributeOwnership { object: ObjectHandle, attribute: AttributeHandle },
    42 => NegotiatedAttributeOwnershipDivestiture {
        object: ObjectHandle,
        attributes: Vec<AttributeHandle>,
        tag: String,
    },
    43 => CancelNegotiatedAttributeOwnershipDivestiture {
        object: ObjectHandle,
        attributes: Vec<AttributeHandle>,
    },
    44 => AttributeOwnershipAcquisition {
        object: ObjectHandle,
        attributes: Vec<AttributeHandle>,
        tag: String,
    },
    45 => AttributeOwnershipAcquisitionIfAvailable {
        object: ObjectHandle,
        attributes: Vec<AttributeHandle>,
    },
    46 => CancelAttributeOwnershipAcquisition {
        object: ObjectHandle,
        attributes: Vec<AttributeHandle>,
    },
    47 => UnconditionalAttributeOwnershipDivestiture {
        object: ObjectHandle,
        attributes: Vec<AttributeHandle>,
    },
    48 => AttributeOwnershipReleaseResponse {
        object: ObjectHandle,
        attributes: Vec<AttributeHandle>,
    },

    // Notifications
    60 => DiscoverObject { object: ObjectHandle, class: ObjectClassHandle, name: String },
    61 => ReflectAttributeValues {
        object: ObjectHandle,
        values: Vec<AttributeValue>,
        time: FederationTime,
        tag: String,
    },
    62 => RemoveObject { object: ObjectHandle, tag: String },
    63 => ReceiveInteraction {
        class: InteractionClassHandle,
        parameters: Vec<ParameterValue>,
        time: FederationTime,
        tag: String,
    },
    64 => RequestAttributeOwnershipAssumption {
        object: ObjectHandle,
        attributes: Vec<AttributeHandle>,
        tag: String,
    },
    65 => RequestAttributeOwnershipRelease {
        object: ObjectHandle,
        attributes: Vec<AttributeHandle>,
        tag: String,
    },
    66 => AttributeOwnershipDivestitureNotification {
        object: ObjectHandle,
        attributes: Vec<AttributeHandle>,
    },
    67 => AttributeOwnershipAcquisitionNotification {
        object: ObjectHandle,
        attributes: Vec<AttributeHandle>,
    },
    68 => AttributeOwnershipUnavailable {
        object: ObjectHandle,
        attributes: Vec<AttributeHandle>,
    },
    69 => ConfirmAttributeOwnershipAcquisitionCancellation {
        object: ObjectHandle,
        attributes: Vec<AttributeHandle>,
    },
    70 => InformAttributeOwnership {
        object: ObjectHandle,
        attribute: AttributeHandle,
        owner: FederateHandle,
    },
    71 => AttributeIsNotOwned { object: ObjectHandle, attribute: AttributeHandle },
    72 => InitiateFederateSave { label: String },
    73 => FederationSaved,
    74 => FederationNotSaved,
    75 => InitiateFederateRestore { label: String },
    76 => FederationRestored,
    77 => FederationNotRestored,

    // Replies
    90 => Acknowledge,
    91 => FederationJoined { federation: FederationHandle, federate: FederateHandle },
    92 => ObjectRegistered { object: ObjectHandle, name: String },
    93 => IdPoolGranted { first: ObjectHandle, last: ObjectHandle },
    94 => AttributeOwnershipStatus { owned: bool },
    95 => AttributesReleased { attributes: Vec<AttributeHandle> },
    /// The request failed. `name` is the exception name, see
    /// `RtiError::name`.
    96 => Exception { name: String, reason: String },
}

impl NetworkMessage {
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut writer = rti_serde::StreamWriter::new();
        self.ser(&mut writer);
        writer.to_bytes()
    }

    /// Decodes one whole frame; trailing bytes are an error
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, SerdeErr> {
        let mut reader = StreamReader::new(bytes);
        let message = Self::de(&mut reader)?;
        if !reader.is_empty() {
            return Err(SerdeErr::LengthTooLarge {
                length: bytes.len(),
                limit: bytes.len() - reader.remaining(),
            });
        }
        Ok(message)
    }
}
