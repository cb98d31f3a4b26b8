use thiserror::Error;

use crate::{
    transport::TransportError, AttributeHandle, FederateHandle, FederationHandle,
    InteractionClassHandle, ObjectClassHandle, ObjectHandle, ParameterHandle,
};

/// Broad families of failure. Callers branch on these rather than on
/// individual exceptions when all they need is "retry, abort or report".
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Invalid handle, empty name and other bad arguments
    Precondition,
    /// A federation, federate, class, attribute, object or name lookup missed
    NotFound,
    /// The operation is not legal in the current protocol state
    StateConflict,
    /// A configured ceiling was hit
    Capacity,
    /// The connection failed, or was interrupted by a signal
    Transport,
}

/// Every exception the coordinator can report to a federate.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RtiError {
    #[error("RTI internal error: {reason}")]
    RtiInternalError { reason: String },

    // Lookups
    #[error("Federation execution does not exist: {context}")]
    FederationExecutionDoesNotExist { context: String },
    #[error("Federate {federate} is not a member of federation {federation}")]
    FederateNotExecutionMember {
        federation: FederationHandle,
        federate: FederateHandle,
    },
    #[error("Object class {class} is not defined")]
    ObjectClassNotDefined { class: ObjectClassHandle },
    #[error("Attribute {attribute} is not defined in object class {class}")]
    AttributeNotDefined {
        class: ObjectClassHandle,
        attribute: AttributeHandle,
    },
    #[error("Object instance {object} is not known")]
    ObjectNotKnown { object: ObjectHandle },
    #[error("No {kind} is named \"{name}\"")]
    NameNotFound { kind: &'static str, name: String },
    #[error("Interaction class {class} is not defined")]
    InteractionClassNotDefined { class: InteractionClassHandle },
    #[error("Parameter {parameter} is not defined in interaction class {class}")]
    InteractionParameterNotDefined {
        class: InteractionClassHandle,
        parameter: ParameterHandle,
    },

    // Admission
    #[error("A federation execution named \"{name}\" already exists")]
    FederationExecutionAlreadyExists { name: String },
    #[error("Federation {federation} still has {count} joined federate(s)")]
    FederatesCurrentlyJoined {
        federation: FederationHandle,
        count: usize,
    },
    #[error("A federate named \"{name}\" already joined this federation")]
    FederateAlreadyExecutionMember { name: String },
    #[error("Federate {federate} still owns attributes")]
    FederateOwnsAttributes { federate: FederateHandle },

    // Declarations & objects
    #[error("Object instance {object} is already registered")]
    ObjectAlreadyRegistered { object: ObjectHandle },
    #[error("An object instance named \"{name}\" is already registered")]
    ObjectNameAlreadyRegistered { name: String },
    #[error("Federate {federate} does not publish object class {class}")]
    ObjectClassNotPublished {
        class: ObjectClassHandle,
        federate: FederateHandle,
    },
    #[error("Federate {federate} does not publish attribute {attribute} of class {class}")]
    AttributeNotPublished {
        class: ObjectClassHandle,
        attribute: AttributeHandle,
        federate: FederateHandle,
    },
    #[error("Federate {federate} does not publish interaction class {class}")]
    InteractionClassNotPublished {
        class: InteractionClassHandle,
        federate: FederateHandle,
    },
    #[error("Federate {federate} does not hold the privilege to delete object {object}")]
    DeletePrivilegeNotHeld {
        object: ObjectHandle,
        federate: FederateHandle,
    },

    // Ownership
    #[error("Attribute {attribute} of object {object} is not owned by federate {federate}")]
    AttributeNotOwned {
        object: ObjectHandle,
        attribute: AttributeHandle,
        federate: FederateHandle,
    },
    #[error("Attribute {attribute} of object {object} is already owned by the caller")]
    AttributeAlreadyOwned {
        object: ObjectHandle,
        attribute: AttributeHandle,
    },
    #[error("Attribute {attribute} of object {object} is already being divested")]
    AttributeAlreadyBeingDivested {
        object: ObjectHandle,
        attribute: AttributeHandle,
    },
    #[error("No divestiture of attribute {attribute} of object {object} was requested")]
    AttributeDivestitureWasNotRequested {
        object: ObjectHandle,
        attribute: AttributeHandle,
    },
    #[error("Attribute {attribute} of object {object} is already being acquired by the caller")]
    AttributeAlreadyBeingAcquired {
        object: ObjectHandle,
        attribute: AttributeHandle,
    },
    #[error("No acquisition of attribute {attribute} of object {object} was requested")]
    AttributeAcquisitionWasNotRequested {
        object: ObjectHandle,
        attribute: AttributeHandle,
    },
    #[error("Federate {federate} was not asked to release attribute {attribute} of object {object}")]
    FederateWasNotAskedToReleaseAttribute {
        object: ObjectHandle,
        attribute: AttributeHandle,
        federate: FederateHandle,
    },

    // Federation management
    #[error("Federation is already paused")]
    FederationAlreadyPaused,
    #[error("Federation is not paused")]
    FederationNotPaused,
    #[error("A federation save is in progress")]
    SaveInProgress,
    #[error("A federation restore is in progress")]
    RestoreInProgress,
    #[error("No federation save was initiated")]
    SaveNotInitiated,
    #[error("No federation restore was requested")]
    RestoreNotRequested,

    // Capacity
    #[error("Memory exhausted: {reason}")]
    MemoryExhausted { reason: String },
    #[error("Cannot hand out {requested} more object handles")]
    TooManyIdsRequested { requested: u32 },

    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),
}

impl RtiError {
    pub fn internal(reason: impl Into<String>) -> Self {
        Self::RtiInternalError {
            reason: reason.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::RtiInternalError { .. } => ErrorKind::Precondition,
            Self::FederationExecutionDoesNotExist { .. }
            | Self::FederateNotExecutionMember { .. }
            | Self::ObjectClassNotDefined { .. }
            | Self::AttributeNotDefined { .. }
            | Self::ObjectNotKnown { .. }
            | Self::NameNotFound { .. }
            | Self::InteractionClassNotDefined { .. }
            | Self::InteractionParameterNotDefined { .. } => ErrorKind::NotFound,
            Self::MemoryExhausted { .. } | Self::TooManyIdsRequested { .. } => {
                ErrorKind::Capacity
            }
            Self::Transport(_) => ErrorKind::Transport,
            _ => ErrorKind::StateConflict,
        }
    }

    /// Stable exception name, used as the tag of `Exception` replies.
    pub fn name(&self) -> &'static str {
        match self {
            Self::RtiInternalError { .. } => "RTIinternalError",
            Self::FederationExecutionDoesNotExist { .. } => "FederationExecutionDoesNotExist",
            Self::FederateNotExecutionMember { .. } => "FederateNotExecutionMember",
            Self::ObjectClassNotDefined { .. } => "ObjectClassNotDefined",
            Self::AttributeNotDefined { .. } => "AttributeNotDefined",
            Self::ObjectNotKnown { .. } => "ObjectNotKnown",
            Self::NameNotFound { .. } => "NameNotFound",
            Self::InteractionClassNotDefined { .. } => "InteractionClassNotDefined",
            Self::InteractionParameterNotDefined { .. } => "InteractionParameterNotDefined",
            Self::FederationExecutionAlreadyExists { .. } => "FederationExecutionAlreadyExists",
            Self::FederatesCurrentlyJoined { .. } => "FederatesCurrentlyJoined",
            Self::FederateAlreadyExecutionMember { .. } => "FederateAlreadyExecutionMember",
            Self::FederateOwnsAttributes { .. } => "FederateOwnsAttributes",
            Self::ObjectAlreadyRegistered { .. } => "ObjectAlreadyRegistered",
            Self::ObjectNameAlreadyRegistered { .. } => "ObjectAlreadyRegistered",
            Self::ObjectClassNotPublished { .. } => "ObjectClassNotPublished",
            Self::AttributeNotPublished { .. } => "AttributeNotPublished",
            Self::InteractionClassNotPublished { .. } => "InteractionClassNotPublished",
            Self::DeletePrivilegeNotHeld { .. } => "DeletePrivilegeNotHeld",
            Self::AttributeNotOwned { .. } => "AttributeNotOwned",
            Self::AttributeAlreadyOwned { .. } => "AttributeAlreadyOwned",
            Self::AttributeAlreadyBeingDivested { .. } => "AttributeAlreadyBeingDivested",
            Self::AttributeDivestitureWasNotRequested { .. } => {
                "AttributeDivestitureWasNotRequested"
            }
            Self::AttributeAlreadyBeingAcquired { .. } => "AttributeAlreadyBeingAcquired",
            Self::AttributeAcquisitionWasNotRequested { .. } => {
                "AttributeAcquisitionWasNotRequested"
            }
            Self::FederateWasNotAskedToReleaseAttribute { .. } => {
                "FederateWasNotAskedToReleaseAttribute"
            }
            Self::FederationAlreadyPaused => "FederationAlreadyPaused",
            Self::FederationNotPaused => "FederationNotPaused",
            Self::SaveInProgress => "SaveInProgress",
            Self::RestoreInProgress => "RestoreInProgress",
            Self::SaveNotInitiated => "SaveNotInitiated",
            Self::RestoreNotRequested => "RestoreNotRequested",
            Self::MemoryExhausted { .. } => "MemoryExhausted",
            Self::TooManyIdsRequested { .. } => "TooManyIDsRequested",
            Self::Transport(TransportError::NetworkSignal { .. }) => "NetworkSignal",
            Self::Transport(TransportError::NetworkError { .. }) => "NetworkError",
        }
    }
}
