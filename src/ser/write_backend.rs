use embedded_io::Write;

use super::{ser_backend::SerializerBackend, Error, Result};

/// Streams serialized bytes into an [`embedded_io::Write`] sink
pub struct WriteSerializer<'a, W: Write> {
    writer: &'a mut W,
    current_length: usize,
}

impl<'a, W: Write> WriteSerializer<'a, W> {
    /// Create a new `WriteSerializer`
    pub fn new(writer: &'a mut W) -> Self {
        Self {
            writer,
            current_length: 0,
        }
    }
}

impl<'a, W: Write> SerializerBackend for WriteSerializer<'a, W> {
    fn end(&self) -> usize {
        self.current_length
    }

    fn push(&mut self, c: u8) -> Result<()> {
        self.extend_from_slice(&[c])
    }

    fn extend_from_slice(&mut self, other: &[u8]) -> Result<()> {
        self.writer.write_all(other).map_err(|_| Error::IoError)?;
        self.current_length += other.len();
        Ok(())
    }
}
