//! Dynamically typed JSON values for `no_std` programs
//!
//! `jsonslot` is a small JSON engine meant to be embedded by other software. It provides a
//! [`Value`] type, a parser that turns raw bytes into a [`Value`] tree and a serializer that
//! writes a tree back into a caller supplied buffer.
//!
//! # Current features
//!
//! - All container storage (strings, arrays, object tables) is allocated through a pluggable
//!   [`Allocator`], including the parser's scratch space. A [`Budget`] adapter caps the number of
//!   bytes a tree may hold.
//! - Objects are open addressing hash tables of key / value slots.
//! - Parsing, serializing, copying, comparing and dropping are iterative: nesting depth is
//!   bounded by memory (or [`Options::max_depth`]), not by the call stack.
//! - Serialization writes into a caller supplied buffer and checks the remaining capacity before
//!   every write. Its only allocation is the stack of open containers.
//! - [`Value`] implements `serde::Serialize` and `serde::Deserialize`.
//!
//! Strings are carried verbatim. Escape sequences are neither decoded by the parser nor
//! produced by the serializer.
//!
//! # Example
//!
//! ```
//! let value = jsonslot::from_str(r#"{"a": 1, "b": [true, false, null]}"#).unwrap();
//! assert_eq!(value.get("a").and_then(|a| a.as_i64()), Some(1));
//!
//! let mut buf = [0u8; 64];
//! let len = jsonslot::serialize(&value, &mut buf);
//! assert!(len > 0);
//! assert_eq!(jsonslot::from_slice(&buf[..len]).unwrap(), value);
//! ```
//!
//! # Non-features
//!
//! This is explicitly out of scope
//!
//! - Streaming parsers for inputs larger than memory
//! - Pretty printing
//! - JSON Pointer / Patch and schema validation
#![deny(missing_docs)]
#![deny(warnings)]
#![no_std]

#[cfg(any(test, feature = "std"))]
extern crate std;

#[macro_use]
mod macros;

pub mod allocator;
pub mod de;
pub mod scan;
pub mod ser;
pub mod value;

pub use allocator::{AllocError, Allocator, Budget, Global};
pub use de::{from_slice, from_slice_in, from_slice_with, from_str, parse_into, Options};
#[cfg(feature = "heapless")]
pub use ser::{to_string, to_vec};
pub use ser::{serialize, serialized_len, to_slice};
#[cfg(feature = "embedded-io")]
pub use ser::to_writer;
pub use value::{Array, Kind, Object, Slot, Str, Value};
