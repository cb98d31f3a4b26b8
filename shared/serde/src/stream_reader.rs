use crate::error::SerdeErr;

pub struct StreamReader<'b> {
    buffer: &'b [u8],
    position: usize,
}

impl<'b> StreamReader<'b> {
    pub fn new(buffer: &'b [u8]) -> Self {
        Self {
            buffer,
            position: 0,
        }
    }

    pub fn remaining(&self) -> usize {
        self.buffer.len() - self.position
    }

    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    pub fn read_byte(&mut self) -> Result<u8, SerdeErr> {
        let [byte] = self.read_array::<1>()?;
        Ok(byte)
    }

    pub fn read_bytes(&mut self, count: usize) -> Result<&'b [u8], SerdeErr> {
        if count > self.remaining() {
            return Err(SerdeErr::UnexpectedEnd {
                needed: count,
                remaining: self.remaining(),
            });
        }
        let start = self.position;
        self.position += count;
        Ok(&self.buffer[start..self.position])
    }

    pub fn read_array<const N: usize>(&mut self) -> Result<[u8; N], SerdeErr> {
        let bytes = self.read_bytes(N)?;
        let mut output = [0u8; N];
        output.copy_from_slice(bytes);
        Ok(output)
    }

    /// Length prefixes must fit in what is left of the buffer, otherwise a
    /// corrupt frame could make us allocate arbitrarily.
    pub fn read_length(&mut self) -> Result<usize, SerdeErr> {
        let length = u32::from_be_bytes(self.read_array::<4>()?) as usize;
        if length > self.remaining() {
            return Err(SerdeErr::LengthTooLarge {
                length,
                limit: self.remaining(),
            });
        }
        Ok(length)
    }
}
