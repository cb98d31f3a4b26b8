use crate::{
    error::SerdeErr,
    stream_reader::StreamReader,
    stream_writer::{ByteCounter, ByteWrite},
};

/// A value which can be written to and read back from a byte stream
pub trait Serde: Sized + Clone + PartialEq {
    /// Serialize Self to a ByteWrite
    fn ser(&self, writer: &mut dyn ByteWrite);

    /// Parse Self from a StreamReader
    fn de(reader: &mut StreamReader) -> Result<Self, SerdeErr>;

    /// Return length of value in bytes
    fn byte_length(&self) -> usize {
        let mut counter = ByteCounter::new();
        self.ser(&mut counter);
        counter.bytes_written()
    }
}
