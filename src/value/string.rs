use core::ffi::CStr;
use core::fmt;

use allocator_api2::vec::Vec;

use crate::allocator::{self, AllocError, Allocator, Global};

/// A JSON string: raw bytes, no terminator, no escape processing.
///
/// The bytes are usually UTF-8 but this is not enforced; [`Str::as_str`] checks on access.
#[derive(Clone)]
pub struct Str<A: Allocator = Global> {
    bytes: Vec<u8, A>,
}

impl<A: Allocator> Str<A> {
    /// Creates an empty string. Doesn't allocate.
    pub fn new_in(alloc: A) -> Self {
        Str {
            bytes: Vec::new_in(alloc),
        }
    }

    /// Copies `bytes` into a buffer of exactly `bytes.len()` bytes.
    pub fn try_from_bytes_in(bytes: &[u8], alloc: A) -> Result<Self, AllocError> {
        let mut buf = Vec::new_in(alloc);
        allocator::reserve_exact(&mut buf, bytes.len())?;
        buf.extend_from_slice(bytes);
        Ok(Str { bytes: buf })
    }

    /// Copies a NUL terminated string, without the terminator.
    pub fn try_from_c_str_in(s: &CStr, alloc: A) -> Result<Self, AllocError> {
        Self::try_from_bytes_in(s.to_bytes(), alloc)
    }

    /// Deep copy into `alloc`.
    pub fn try_clone_in(&self, alloc: A) -> Result<Self, AllocError> {
        Self::try_from_bytes_in(&self.bytes, alloc)
    }

    /// The raw bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// The contents as `&str`, if they are valid UTF-8.
    pub fn as_str(&self) -> Option<&str> {
        core::str::from_utf8(&self.bytes).ok()
    }

    /// Number of bytes.
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Returns `true` if the string holds no bytes.
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// The allocator backing this string.
    pub fn allocator(&self) -> &A {
        self.bytes.allocator()
    }
}

impl Str<Global> {
    /// Creates an empty string in the global allocator.
    pub fn new() -> Self {
        Str::new_in(Global)
    }
}

impl Default for Str<Global> {
    fn default() -> Self {
        Str::new()
    }
}

impl<'a> From<&'a str> for Str<Global> {
    fn from(s: &'a str) -> Self {
        let mut bytes = Vec::with_capacity_in(s.len(), Global);
        bytes.extend_from_slice(s.as_bytes());
        Str { bytes }
    }
}

impl<A: Allocator> AsRef<[u8]> for Str<A> {
    fn as_ref(&self) -> &[u8] {
        &self.bytes
    }
}

impl<A: Allocator> PartialEq for Str<A> {
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len() && self.as_bytes() == other.as_bytes()
    }
}

impl<A: Allocator> Eq for Str<A> {}

impl<A: Allocator> PartialEq<[u8]> for Str<A> {
    fn eq(&self, other: &[u8]) -> bool {
        self.as_bytes() == other
    }
}

impl<A: Allocator> PartialEq<str> for Str<A> {
    fn eq(&self, other: &str) -> bool {
        self.as_bytes() == other.as_bytes()
    }
}

impl<'a, A: Allocator> PartialEq<&'a str> for Str<A> {
    fn eq(&self, other: &&'a str) -> bool {
        self.as_bytes() == other.as_bytes()
    }
}

impl<A: Allocator> fmt::Debug for Str<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.as_str() {
            Some(s) => fmt::Debug::fmt(s, f),
            None => fmt::Debug::fmt(self.as_bytes(), f),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_capacity() {
        let s = Str::try_from_bytes_in(b"hello", Global).unwrap();
        assert_eq!(s.len(), 5);
        assert_eq!(s.as_str(), Some("hello"));
        assert_eq!(s, "hello");
    }

    #[test]
    fn c_string() {
        let c = CStr::from_bytes_with_nul(b"key\0").unwrap();
        let s = Str::try_from_c_str_in(c, Global).unwrap();
        assert_eq!(s.as_bytes(), b"key");
    }

    #[test]
    fn raw_bytes() {
        let s = Str::try_from_bytes_in(&[0xff, 0xfe], Global).unwrap();
        assert_eq!(s.as_str(), None);
        assert_eq!(s.as_bytes(), &[0xff, 0xfe]);
        assert!(Str::new().is_empty());
    }
}
