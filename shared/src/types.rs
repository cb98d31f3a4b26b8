use std::fmt;

use rti_serde::{ByteWrite, Serde, SerdeErr, StreamReader};

pub type FederationTime = f64;
pub type SecurityLevel = u16;
pub type ObjectHandleCount = u32;

pub const PUBLIC_LEVEL: SecurityLevel = 1;

macro_rules! handle_type {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
        pub struct $name(i32);

        impl $name {
            pub const fn new(value: i32) -> Self {
                Self(value)
            }

            pub const fn value(&self) -> i32 {
                self.0
            }

            /// Handles are positive; zero and negative values never name
            /// anything.
            pub const fn is_valid(&self) -> bool {
                self.0 > 0
            }

            pub const fn next(&self) -> Self {
                Self(self.0 + 1)
            }
        }

        impl From<i32> for $name {
            fn from(value: i32) -> Self {
                Self(value)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl Serde for $name {
            fn ser(&self, writer: &mut dyn ByteWrite) {
                self.0.ser(writer);
            }

            fn de(reader: &mut StreamReader) -> Result<Self, SerdeErr> {
                Ok(Self(i32::de(reader)?))
            }

            fn byte_length(&self) -> usize {
                4
            }
        }
    };
}

handle_type!(
    /// Identifies one federation execution on the coordinator
    FederationHandle
);
handle_type!(
    /// Identifies a federate inside its federation
    FederateHandle
);
handle_type!(ObjectClassHandle);
handle_type!(AttributeHandle);
handle_type!(
    /// Identifies a registered object instance, unique inside its federation
    ObjectHandle
);
handle_type!(InteractionClassHandle);
handle_type!(ParameterHandle);

/// Opaque key of a federate's connection on the coordinator. The federation
/// layer stores it and hands it back to the `MessageSink` for delivery.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LinkKey(u64);

impl LinkKey {
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    pub const fn to_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for LinkKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "link#{}", self.0)
    }
}
