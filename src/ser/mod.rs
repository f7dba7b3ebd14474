//! Serialize a [`Value`] tree into JSON text
//!
//! Output is compact: no whitespace, object members in table order. Strings are written between
//! quotes exactly as stored. Integers are written in decimal, finite decimals in their shortest
//! round-trip form and non-finite decimals as `null`.
//!
//! Serialization never recurses: open arrays and objects wait on a stack drawn from the tree's
//! allocator. Scalars and strings are written without allocating.

use core::fmt;
use core::mem;
use core::slice;

use allocator_api2::vec::Vec;

use crate::allocator::{self, Allocator};
use crate::value::{self, Str, Value};

pub use self::ser_backend::{CountingSerializer, SerializerBackend, SliceSerializer};
#[cfg(feature = "embedded-io")]
pub use self::write_backend::WriteSerializer;

mod ser_backend;
#[cfg(feature = "embedded-io")]
mod write_backend;

/// Serialization result
pub type Result<T> = ::core::result::Result<T, Error>;

/// This type represents all possible errors that can occur when serializing JSON data
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[non_exhaustive]
pub enum Error {
    /// Buffer is full
    BufferFull,
    /// Output is not valid UTF-8
    InvalidUtf8,
    /// No memory for the stack of open containers
    OutOfMemory,
    /// The writer reported an error
    #[cfg(feature = "embedded-io")]
    IoError,
}

#[cfg(feature = "std")]
impl ::std::error::Error for Error {}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::BufferFull => write!(f, "Buffer is full"),
            Error::InvalidUtf8 => write!(f, "Output is not valid UTF-8"),
            Error::OutOfMemory => write!(f, "Memory allocation failed"),
            #[cfg(feature = "embedded-io")]
            Error::IoError => write!(f, "Writer error"),
        }
    }
}

// An array or object whose members are being written.
enum Frame<'v, A: Allocator> {
    Array {
        items: slice::Iter<'v, Value<A>>,
        first: bool,
    },
    Object {
        members: value::Iter<'v, A>,
        first: bool,
    },
}

enum Step<'v, A: Allocator> {
    Member {
        first: bool,
        key: Option<&'v Str<A>>,
        value: &'v Value<A>,
    },
    Close(u8),
}

/// Writes JSON text into a [`SerializerBackend`]
pub struct Serializer<B> {
    backend: B,
}

impl<B: SerializerBackend> Serializer<B> {
    /// Create a new `Serializer`
    pub fn new(backend: B) -> Self {
        Serializer { backend }
    }

    /// Number of bytes written so far.
    pub fn end(&self) -> usize {
        self.backend.end()
    }

    /// Returns the backend.
    pub fn into_inner(self) -> B {
        self.backend
    }

    /// Appends the JSON text of `value`.
    ///
    /// Stops at the first write that doesn't fit; bytes already written stay in the backend.
    pub fn serialize_value<A: Allocator>(&mut self, value: &Value<A>) -> Result<()> {
        let alloc = match value {
            Value::Array(array) => array.allocator().clone(),
            Value::Object(object) => object.allocator().clone(),
            leaf => return self.serialize_leaf(leaf),
        };

        let mut frames = Vec::new_in(alloc);
        let mut pending = Some(value);
        loop {
            if let Some(value) = pending.take() {
                let frame = match value {
                    Value::Array(array) => {
                        self.backend.push(b'[')?;
                        Frame::Array {
                            items: array.iter(),
                            first: true,
                        }
                    }
                    Value::Object(object) => {
                        self.backend.push(b'{')?;
                        Frame::Object {
                            members: object.iter(),
                            first: true,
                        }
                    }
                    leaf => {
                        self.serialize_leaf(leaf)?;
                        continue;
                    }
                };
                allocator::reserve(&mut frames, 1).map_err(|_| Error::OutOfMemory)?;
                frames.push(frame);
            }

            let step = match frames.last_mut() {
                None => return Ok(()),
                Some(Frame::Array { items, first }) => match items.next() {
                    Some(value) => Step::Member {
                        first: mem::replace(first, false),
                        key: None,
                        value,
                    },
                    None => Step::Close(b']'),
                },
                Some(Frame::Object { members, first }) => match members.next() {
                    Some((key, value)) => Step::Member {
                        first: mem::replace(first, false),
                        key: Some(key),
                        value,
                    },
                    None => Step::Close(b'}'),
                },
            };

            match step {
                Step::Member { first, key, value } => {
                    if !first {
                        self.backend.push(b',')?;
                    }
                    if let Some(key) = key {
                        self.serialize_str(key.as_bytes())?;
                        self.backend.push(b':')?;
                    }
                    pending = Some(value);
                }
                Step::Close(bracket) => {
                    frames.pop();
                    self.backend.push(bracket)?;
                }
            }
        }
    }

    fn serialize_leaf<A: Allocator>(&mut self, value: &Value<A>) -> Result<()> {
        match value {
            Value::Null => self.backend.extend_from_slice(b"null"),
            Value::Boolean(true) => self.backend.extend_from_slice(b"true"),
            Value::Boolean(false) => self.backend.extend_from_slice(b"false"),
            Value::Integer(v) => self.serialize_i64(*v),
            Value::Decimal(v) => self.serialize_f64(*v),
            Value::String(s) => self.serialize_str(s.as_bytes()),
            Value::Array(_) | Value::Object(_) => self.serialize_value(value),
        }
    }

    fn serialize_str(&mut self, bytes: &[u8]) -> Result<()> {
        self.backend.push(b'"')?;
        self.backend.extend_from_slice(bytes)?;
        self.backend.push(b'"')
    }

    // NOTE(serialize_i64) This is basically the numtoa implementation minus the lookup tables,
    // which take 200+ bytes of ROM / Flash
    fn serialize_i64(&mut self, v: i64) -> Result<()> {
        // "-9223372036854775808"
        let mut buf = [0u8; 20];
        let mut n = v.unsigned_abs();
        let mut i = buf.len();
        loop {
            i -= 1;
            buf[i] = (n % 10) as u8 + b'0';
            n /= 10;
            if n == 0 {
                break;
            }
        }
        if v < 0 {
            i -= 1;
            buf[i] = b'-';
        }
        self.backend.extend_from_slice(&buf[i..])
    }

    fn serialize_f64(&mut self, v: f64) -> Result<()> {
        if v.is_finite() {
            let mut buffer = ryu::Buffer::new();
            let printed = buffer.format_finite(v);
            self.backend.extend_from_slice(printed.as_bytes())
        } else {
            self.backend.extend_from_slice(b"null")
        }
    }
}

/// Serializes `value` into `buf`, returning the number of bytes written.
pub fn to_slice<A: Allocator>(value: &Value<A>, buf: &mut [u8]) -> Result<usize> {
    let mut ser = Serializer::new(SliceSerializer::new(buf));
    ser.serialize_value(value)?;
    Ok(ser.end())
}

/// Serializes `value` into `buf`, returning the number of bytes written or 0 if it doesn't fit.
///
/// ```
/// let value = jsonslot::from_str(r#"{"x": 7}"#).unwrap();
///
/// let mut small = [0u8; 6];
/// assert_eq!(jsonslot::serialize(&value, &mut small), 0);
///
/// let mut buf = [0u8; 7];
/// assert_eq!(jsonslot::serialize(&value, &mut buf), 7);
/// assert_eq!(&buf, br#"{"x":7}"#);
/// ```
pub fn serialize<A: Allocator>(value: &Value<A>, buf: &mut [u8]) -> usize {
    to_slice(value, buf).unwrap_or(0)
}

/// Number of bytes [`to_slice`] would write for `value`.
pub fn serialized_len<A: Allocator>(value: &Value<A>) -> usize {
    let mut ser = Serializer::new(CountingSerializer::new());
    match ser.serialize_value(value) {
        Ok(()) => ser.end(),
        Err(_) => 0,
    }
}

/// Serializes `value` as a `heapless::Vec`
#[cfg(feature = "heapless")]
pub fn to_vec<const N: usize, A: Allocator>(value: &Value<A>) -> Result<heapless::Vec<u8, N>> {
    let mut buf = heapless::Vec::<u8, N>::new();
    buf.resize_default(N).map_err(|_| Error::BufferFull)?;
    let len = to_slice(value, &mut buf)?;
    buf.truncate(len);
    Ok(buf)
}

/// Serializes `value` as a `heapless::String`
#[cfg(feature = "heapless")]
pub fn to_string<const N: usize, A: Allocator>(
    value: &Value<A>,
) -> Result<heapless::String<N>> {
    heapless::String::from_utf8(to_vec::<N, A>(value)?).map_err(|_| Error::InvalidUtf8)
}

/// Serializes `value` into an [`embedded_io::Write`] sink, returning the number of bytes written.
#[cfg(feature = "embedded-io")]
pub fn to_writer<A, W>(value: &Value<A>, writer: &mut W) -> Result<usize>
where
    A: Allocator,
    W: embedded_io::Write,
{
    let mut ser = Serializer::new(WriteSerializer::new(writer));
    ser.serialize_value(value)?;
    Ok(ser.end())
}

#[cfg(test)]
mod tests {
    #[cfg(feature = "embedded-io")]
    mod my_writer;

    use crate::value::{Array, Object, Str};
    use crate::{Budget, Global, Value};

    fn round_trip(value: &Value) -> Value {
        let mut buf = [0u8; 256];
        let len = crate::serialize(value, &mut buf);
        assert!(len > 0);
        crate::from_slice(&buf[..len]).unwrap()
    }

    #[test]
    fn scalars() {
        let mut buf = [0u8; 32];
        let cases: &[(Value, &str)] = &[
            (Value::Null, "null"),
            (Value::Boolean(true), "true"),
            (Value::Boolean(false), "false"),
            (Value::Integer(0), "0"),
            (Value::Integer(-42), "-42"),
            (Value::Integer(i64::MAX), "9223372036854775807"),
            (Value::Integer(i64::MIN), "-9223372036854775808"),
            (Value::Decimal(1.5), "1.5"),
            (Value::Decimal(-0.25), "-0.25"),
            (Value::Decimal(f64::NAN), "null"),
            (Value::Decimal(f64::INFINITY), "null"),
        ];
        for (value, text) in cases {
            let len = crate::to_slice(value, &mut buf).unwrap();
            assert_eq!(&buf[..len], text.as_bytes());
        }
    }

    #[test]
    fn string_is_verbatim() {
        let value = Value::String(Str::from(r#"a\"b"#));
        let mut buf = [0u8; 16];
        let len = crate::serialize(&value, &mut buf);
        assert_eq!(&buf[..len], br#""a\"b""#);
    }

    #[test]
    fn parsed_string_round_trips_exactly() {
        let value = crate::from_str(r#""hello""#).unwrap();
        let mut buf = [0u8; 7];
        assert_eq!(crate::serialize(&value, &mut buf), 7);
        assert_eq!(&buf, br#""hello""#);
    }

    #[test]
    fn compact_containers() {
        let value = crate::from_str(r#" [ 1 , [ ] , { } , "x" ] "#).unwrap();
        let mut buf = [0u8; 32];
        let len = crate::serialize(&value, &mut buf);
        assert_eq!(&buf[..len], br#"[1,[],{},"x"]"#);
    }

    #[test]
    fn buffer_too_small() {
        let value = crate::from_str(r#"{"x": 7}"#).unwrap();
        let mut buf = [0u8; 6];
        assert_eq!(crate::serialize(&value, &mut buf), 0);
        assert_eq!(
            crate::to_slice(&value, &mut buf),
            Err(super::Error::BufferFull)
        );
        assert_eq!(crate::serialize(&value, &mut []), 0);
    }

    #[test]
    fn exact_fit() {
        let value = crate::from_str(r#"[true, null]"#).unwrap();
        let len = crate::serialized_len(&value);
        assert_eq!(len, 11);
        let mut buf = [0u8; 11];
        assert_eq!(crate::serialize(&value, &mut buf), 11);
        let mut short = [0u8; 10];
        assert_eq!(crate::serialize(&value, &mut short), 0);
    }

    #[test]
    fn round_trips() {
        let text = r#"{"name": "probe", "readings": [1, -2, 0.5, 1e300], "ok": true, "none": null,
                     "nested": {"deeper": [[], {}]}}"#;
        let value = crate::from_str(text).unwrap();
        assert_eq!(round_trip(&value), value);

        let mut object = Object::try_with_table_size_in(4, Global).unwrap();
        for i in 0..10 {
            let key = std::format!("k{}", i);
            object.insert(key.as_bytes(), Value::Decimal(i as f64 / 3.0)).unwrap();
        }
        let value = Value::Object(object);
        assert_eq!(round_trip(&value), value);

        let value = Value::Array([Value::Integer(1)].iter().cloned().collect::<Array>());
        assert_eq!(round_trip(&value), value);
    }

    #[test]
    fn deep_tree_is_written_iteratively() {
        let depth = 100_000;
        let mut value = Value::Integer(1);
        for _ in 0..depth {
            let mut array = Array::new();
            array.push_back(value).unwrap();
            value = Value::Array(array);
        }

        let len = crate::serialized_len(&value);
        assert_eq!(len, 2 * depth + 1);
        let mut buf = std::vec![0u8; len];
        assert_eq!(crate::serialize(&value, &mut buf), len);
        assert!(buf[..depth].iter().all(|&b| b == b'['));
        assert_eq!(buf[depth], b'1');
        assert!(buf[depth + 1..].iter().all(|&b| b == b']'));
        assert_eq!(crate::serialize(&value, &mut buf[..len - 1]), 0);
    }

    #[test]
    fn open_containers_need_memory() {
        let budget = Budget::new(Global, 1 << 16);
        let value = crate::from_slice_in(b"[[1], [2, [3]], {}]", &budget).unwrap();
        let mut buf = [0u8; 32];
        let len = crate::to_slice(&value, &mut buf).unwrap();
        assert_eq!(&buf[..len], b"[[1],[2,[3]],{}]");

        let mut hog = allocator_api2::vec::Vec::<u8, _>::new_in(&budget);
        hog.try_reserve_exact(budget.remaining()).unwrap();
        assert_eq!(
            crate::to_slice(&value, &mut buf),
            Err(super::Error::OutOfMemory)
        );
        assert_eq!(crate::serialize(&value, &mut buf), 0);

        // scalars and strings have nothing to keep open
        let empty = Value::try_string_in(b"", &budget).unwrap();
        assert_eq!(crate::to_slice(&empty, &mut buf), Ok(2));
        assert_eq!(crate::to_slice(&Value::<&Budget>::Integer(5), &mut buf), Ok(1));
    }

    #[test]
    fn members_follow_table_order() {
        let value = crate::from_str(r#"{"a": 1, "b": 2, "c": 3}"#).unwrap();
        let object = value.as_object().unwrap();
        let mut expected = std::vec::Vec::new();
        expected.push(b'{');
        for (i, (key, item)) in object.iter().enumerate() {
            if i > 0 {
                expected.push(b',');
            }
            expected.push(b'"');
            expected.extend_from_slice(key.as_bytes());
            expected.extend_from_slice(b"\":");
            expected.extend_from_slice(std::format!("{}", item.as_i64().unwrap()).as_bytes());
        }
        expected.push(b'}');

        let mut buf = [0u8; 32];
        let len = crate::serialize(&value, &mut buf);
        assert_eq!(&buf[..len], &expected[..]);
    }

    #[test]
    #[cfg(feature = "heapless")]
    fn heapless_outputs() {
        let value = crate::from_str(r#"{"led": true}"#).unwrap();
        assert_eq!(
            &*crate::to_string::<32, _>(&value).unwrap(),
            r#"{"led":true}"#
        );
        assert_eq!(&crate::to_vec::<32, _>(&value).unwrap()[..], br#"{"led":true}"#);
        assert!(crate::to_vec::<4, _>(&value).is_err());
    }

    #[test]
    #[cfg(feature = "heapless")]
    fn heapless_rejects_invalid_utf8() {
        let value = Value::String(Str::try_from_bytes_in(&[0xff], Global).unwrap());
        assert_eq!(
            crate::to_string::<8, _>(&value),
            Err(super::Error::InvalidUtf8)
        );
    }

    #[test]
    fn agrees_with_serde_json() {
        let value = crate::from_str(r#"[{"a": [0.1, -7, false]}, "text", null]"#).unwrap();
        let mut buf = [0u8; 64];
        let len = crate::serialize(&value, &mut buf);
        let ours: serde_json::Value = serde_json::from_slice(&buf[..len]).unwrap();
        let theirs: serde_json::Value =
            serde_json::from_str(&serde_json::to_string(&value).unwrap()).unwrap();
        assert_eq!(ours, theirs);
    }

    #[test]
    #[cfg(feature = "embedded-io")]
    fn writer() {
        let value = crate::from_str(r#"[1, "two", {"three": 3.5}]"#).unwrap();
        let mut writer = my_writer::MyWriter::new();
        let len = super::to_writer(&value, &mut writer).unwrap();
        assert_eq!(writer.written(), br#"[1,"two",{"three":3.5}]"#);
        assert_eq!(len, writer.pos);
    }

    #[test]
    #[cfg(feature = "embedded-io")]
    fn writer_failure() {
        let value = crate::from_str("[1, 2, 3]").unwrap();
        let mut writer = my_writer::MyWriter::new();
        writer.fail = true;
        assert_eq!(
            super::to_writer(&value, &mut writer),
            Err(super::Error::IoError)
        );
    }
}
