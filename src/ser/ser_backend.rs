use super::{Error, Result};

/// Destination of serialized bytes
///
/// Every write checks the remaining capacity first; a write that doesn't fit fails without
/// touching the destination.
pub trait SerializerBackend {
    /// Return the current amount of serialized data in the buffer
    fn end(&self) -> usize;
    /// Appends one byte.
    fn push(&mut self, c: u8) -> Result<()>;
    /// Appends all of `other` or nothing.
    fn extend_from_slice(&mut self, other: &[u8]) -> Result<()>;
}

/// Writes into a caller supplied byte slice
pub struct SliceSerializer<'a> {
    buf: &'a mut [u8],
    current_length: usize,
}

impl<'a> SliceSerializer<'a> {
    /// Create a new `SliceSerializer`
    pub fn new(buf: &'a mut [u8]) -> Self {
        Self {
            buf,
            current_length: 0,
        }
    }

    fn remaining(&self) -> usize {
        self.buf.len() - self.current_length
    }
}

impl<'a> SerializerBackend for SliceSerializer<'a> {
    fn end(&self) -> usize {
        self.current_length
    }

    fn push(&mut self, c: u8) -> Result<()> {
        if self.remaining() == 0 {
            return Err(Error::BufferFull);
        }
        self.buf[self.current_length] = c;
        self.current_length += 1;
        Ok(())
    }

    fn extend_from_slice(&mut self, other: &[u8]) -> Result<()> {
        if other.len() > self.remaining() {
            // won't fit in the buf; don't modify anything and return an error
            return Err(Error::BufferFull);
        }
        let end = self.current_length + other.len();
        self.buf[self.current_length..end].copy_from_slice(other);
        self.current_length = end;
        Ok(())
    }
}

/// Counts bytes without storing them, used to size a buffer up front
#[derive(Clone, Copy, Debug, Default)]
pub struct CountingSerializer {
    current_length: usize,
}

impl CountingSerializer {
    /// Create a new `CountingSerializer`
    pub fn new() -> Self {
        Self::default()
    }
}

impl SerializerBackend for CountingSerializer {
    fn end(&self) -> usize {
        self.current_length
    }

    fn push(&mut self, _: u8) -> Result<()> {
        self.current_length += 1;
        Ok(())
    }

    fn extend_from_slice(&mut self, other: &[u8]) -> Result<()> {
        self.current_length += other.len();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slice_rejects_overflow_untouched() {
        let mut buf = [0u8; 4];
        let mut ser = SliceSerializer::new(&mut buf);
        ser.extend_from_slice(b"abc").unwrap();
        assert_eq!(ser.extend_from_slice(b"de"), Err(Error::BufferFull));
        assert_eq!(ser.end(), 3);
        ser.push(b'd').unwrap();
        assert_eq!(ser.push(b'e'), Err(Error::BufferFull));
        assert_eq!(ser.end(), 4);
        assert_eq!(&buf, b"abcd");
    }

    #[test]
    fn counting() {
        let mut ser = CountingSerializer::new();
        ser.push(b'[').unwrap();
        ser.extend_from_slice(b"1234").unwrap();
        assert_eq!(ser.end(), 5);
    }
}
