use thiserror::Error;

/// Failure while decoding bytes into a value
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SerdeErr {
    /// The reader ran out of bytes before the value was complete
    #[error("Unexpected end of buffer: needed {needed} more byte(s), {remaining} left")]
    UnexpectedEnd { needed: usize, remaining: usize },

    /// An enum tag did not match any known variant
    #[error("Invalid {type_name} tag {tag}")]
    InvalidTag { type_name: &'static str, tag: u8 },

    /// A string field was not valid UTF-8
    #[error("Invalid UTF-8 in string field")]
    InvalidUtf8,

    /// A length prefix was larger than the reader allows
    #[error("Length {length} exceeds limit of {limit}")]
    LengthTooLarge { length: usize, limit: usize },
}
