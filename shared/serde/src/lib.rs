//! # RTI Serde
//! Byte-aligned serialization for the messages exchanged between the
//! coordinator and federates.

mod error;
mod impls;
mod serde;
mod stream_reader;
mod stream_writer;

pub use error::SerdeErr;
pub use serde::Serde;
pub use stream_reader::StreamReader;
pub use stream_writer::{ByteCounter, ByteWrite, StreamWriter};
