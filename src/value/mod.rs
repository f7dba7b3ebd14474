//! The JSON value model
//!
//! A [`Value`] is one of seven kinds. Scalars are stored inline; strings, arrays and objects own
//! buffers allocated through the tree's [`Allocator`]. Dropping a value releases everything it
//! owns.
//!
//! Copies are explicit and fallible ([`Value::try_clone`], [`Value::assign`]) because they
//! allocate. Moves ([`Value::take`], [`Value::assign_from`]) transfer buffers and leave `Null`
//! behind.
//!
//! Dropping, copying and comparing never recurse per nesting level: nested containers wait on
//! a work stack drawn from the tree's allocator.

use core::alloc::Layout;
use core::fmt;

use allocator_api2::alloc::handle_alloc_error;

use crate::allocator::{AllocError, Allocator, Global};

mod array;
mod de;
mod object;
mod ser;
mod string;
mod walk;

pub use self::array::Array;
pub use self::de::ValueSeed;
pub use self::object::{hash_key, Iter, IterMut, Object, Slot, DEFAULT_TABLE_SIZE};
pub use self::string::Str;

/// The kind of a [`Value`]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Kind {
    /// `null`
    Null,
    /// `true` or `false`
    Boolean,
    /// A number without fraction or exponent that fits an `i64`
    Integer,
    /// Any other number
    Decimal,
    /// A quoted string
    String,
    /// An ordered sequence of values
    Array,
    /// A table of key / value pairs
    Object,
}

impl Kind {
    /// Lower case name of the kind.
    pub fn name(self) -> &'static str {
        match self {
            Kind::Null => "null",
            Kind::Boolean => "boolean",
            Kind::Integer => "integer",
            Kind::Decimal => "decimal",
            Kind::String => "string",
            Kind::Array => "array",
            Kind::Object => "object",
        }
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A JSON value
pub enum Value<A: Allocator = Global> {
    /// `null`
    Null,
    /// `true` or `false`
    Boolean(bool),
    /// A 64-bit signed integer
    Integer(i64),
    /// A 64-bit float
    Decimal(f64),
    /// A byte string
    String(Str<A>),
    /// A sequence of values
    Array(Array<A>),
    /// A key / value table
    Object(Object<A>),
}

impl<A: Allocator> Value<A> {
    /// Creates the default value of `kind`: `false`, `0`, `0.0` or an empty container.
    ///
    /// Containers don't allocate until they are filled; objects start unsized.
    pub fn with_kind_in(kind: Kind, alloc: A) -> Self {
        match kind {
            Kind::Null => Value::Null,
            Kind::Boolean => Value::Boolean(false),
            Kind::Integer => Value::Integer(0),
            Kind::Decimal => Value::Decimal(0.0),
            Kind::String => Value::String(Str::new_in(alloc)),
            Kind::Array => Value::Array(Array::new_in(alloc)),
            Kind::Object => Value::Object(Object::new_in(alloc)),
        }
    }

    /// Creates a string value holding a copy of `bytes`.
    pub fn try_string_in(bytes: &[u8], alloc: A) -> Result<Self, AllocError> {
        Str::try_from_bytes_in(bytes, alloc).map(Value::String)
    }

    /// Creates an empty array with room for `capacity` elements.
    pub fn try_array_in(capacity: usize, alloc: A) -> Result<Self, AllocError> {
        Array::try_with_capacity_in(capacity, alloc).map(Value::Array)
    }

    /// Creates an empty object with `table_size` slots.
    pub fn try_object_in(table_size: usize, alloc: A) -> Result<Self, AllocError> {
        Object::try_with_table_size_in(table_size, alloc).map(Value::Object)
    }

    /// The kind of this value.
    pub fn kind(&self) -> Kind {
        match self {
            Value::Null => Kind::Null,
            Value::Boolean(_) => Kind::Boolean,
            Value::Integer(_) => Kind::Integer,
            Value::Decimal(_) => Kind::Decimal,
            Value::String(_) => Kind::String,
            Value::Array(_) => Kind::Array,
            Value::Object(_) => Kind::Object,
        }
    }

    /// Returns `true` for `Null`.
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Returns `true` for `Boolean`.
    pub fn is_bool(&self) -> bool {
        matches!(self, Value::Boolean(_))
    }

    /// Returns `true` for `Integer`.
    pub fn is_i64(&self) -> bool {
        matches!(self, Value::Integer(_))
    }

    /// Returns `true` for `Decimal`.
    pub fn is_f64(&self) -> bool {
        matches!(self, Value::Decimal(_))
    }

    /// Returns `true` for `String`.
    pub fn is_string(&self) -> bool {
        matches!(self, Value::String(_))
    }

    /// Returns `true` for `Array`.
    pub fn is_array(&self) -> bool {
        matches!(self, Value::Array(_))
    }

    /// Returns `true` for `Object`.
    pub fn is_object(&self) -> bool {
        matches!(self, Value::Object(_))
    }

    /// The boolean payload.
    pub fn as_bool(&self) -> Option<bool> {
        match *self {
            Value::Boolean(b) => Some(b),
            _ => None,
        }
    }

    /// The integer payload.
    pub fn as_i64(&self) -> Option<i64> {
        match *self {
            Value::Integer(i) => Some(i),
            _ => None,
        }
    }

    /// The number as a float; integers are converted.
    pub fn as_f64(&self) -> Option<f64> {
        match *self {
            Value::Decimal(d) => Some(d),
            Value::Integer(i) => Some(i as f64),
            _ => None,
        }
    }

    /// The string payload.
    pub fn as_string(&self) -> Option<&Str<A>> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// The string payload as raw bytes.
    pub fn as_bytes(&self) -> Option<&[u8]> {
        self.as_string().map(Str::as_bytes)
    }

    /// The string payload, if it is valid UTF-8.
    pub fn as_str(&self) -> Option<&str> {
        self.as_string().and_then(Str::as_str)
    }

    /// The array payload.
    pub fn as_array(&self) -> Option<&Array<A>> {
        match self {
            Value::Array(a) => Some(a),
            _ => None,
        }
    }

    /// The array payload for modification.
    pub fn as_array_mut(&mut self) -> Option<&mut Array<A>> {
        match self {
            Value::Array(a) => Some(a),
            _ => None,
        }
    }

    /// The object payload.
    pub fn as_object(&self) -> Option<&Object<A>> {
        match self {
            Value::Object(o) => Some(o),
            _ => None,
        }
    }

    /// The object payload for modification.
    pub fn as_object_mut(&mut self) -> Option<&mut Object<A>> {
        match self {
            Value::Object(o) => Some(o),
            _ => None,
        }
    }

    /// Looks up `key` if this is an object.
    pub fn get(&self, key: &str) -> Option<&Value<A>> {
        self.as_object().and_then(|o| o.get(key))
    }

    /// Returns element `index` if this is an array.
    pub fn get_index(&self, index: usize) -> Option<&Value<A>> {
        self.as_array().and_then(|a| a.get(index))
    }

    /// The allocator of a string, array or object. Scalars have none.
    pub fn allocator(&self) -> Option<&A> {
        match self {
            Value::String(s) => Some(s.allocator()),
            Value::Array(a) => Some(a.allocator()),
            Value::Object(o) => Some(o.allocator()),
            _ => None,
        }
    }

    fn copy_scalar(&self) -> Option<Self> {
        match *self {
            Value::Null => Some(Value::Null),
            Value::Boolean(b) => Some(Value::Boolean(b)),
            Value::Integer(i) => Some(Value::Integer(i)),
            Value::Decimal(d) => Some(Value::Decimal(d)),
            _ => None,
        }
    }

    /// Moves the value out, leaving `Null` in its place.
    pub fn take(&mut self) -> Self {
        core::mem::replace(self, Value::Null)
    }

    /// Deep copy using the allocator of `self`.
    pub fn try_clone(&self) -> Result<Self, AllocError> {
        match self.allocator() {
            Some(alloc) => self.try_clone_in(alloc.clone()),
            None => Ok(self.copy_scalar().unwrap_or(Value::Null)),
        }
    }

    /// Deep copy into `alloc`.
    ///
    /// Strings and arrays get buffers of the same size; objects keep their table size and slot
    /// layout. Nothing is returned if any allocation fails.
    pub fn try_clone_in(&self, alloc: A) -> Result<Self, AllocError> {
        walk::copy(self, alloc)
    }

    /// Copy assignment: replaces `self` with a deep copy of `other`.
    ///
    /// The copy is allocated from `self`'s allocator unless
    /// [`Allocator::PROPAGATE_ON_COPY_ASSIGNMENT`] is set or `self` has none. The copy is built
    /// before the old contents are released, so `self` is unchanged on failure.
    pub fn assign(&mut self, other: &Self) -> Result<(), AllocError> {
        if let Some(scalar) = other.copy_scalar() {
            *self = scalar;
            return Ok(());
        }

        let alloc = match (self.allocator(), other.allocator()) {
            (Some(own), _) if !A::PROPAGATE_ON_COPY_ASSIGNMENT => own.clone(),
            (_, Some(theirs)) => theirs.clone(),
            (Some(own), None) => own.clone(),
            (None, None) => return Ok(()),
        };
        *self = other.try_clone_in(alloc)?;
        Ok(())
    }

    /// Move assignment: transfers `other` into `self` and leaves `Null` in `other`.
    ///
    /// With [`Allocator::PROPAGATE_ON_MOVE_ASSIGNMENT`] set this is O(1). Otherwise, when both
    /// sides own allocators, the contents are deep copied into `self`'s allocator first; on
    /// failure both values are unchanged.
    pub fn assign_from(&mut self, other: &mut Self) -> Result<(), AllocError> {
        if !A::PROPAGATE_ON_MOVE_ASSIGNMENT && other.allocator().is_some() {
            if let Some(own) = self.allocator().cloned() {
                *self = other.try_clone_in(own)?;
                *other = Value::Null;
                return Ok(());
            }
        }
        *self = other.take();
        Ok(())
    }

    /// Deep structural equality.
    ///
    /// Integers and decimals never compare equal to each other. Objects are equal when they
    /// have the same number of entries and every key maps to equal values, regardless of table
    /// size or slot layout.
    pub fn equals(&self, other: &Self) -> bool {
        walk::equal(self, other)
    }
}

/// Deep copy in the same allocator. Aborts through [`handle_alloc_error`] when memory runs
/// out, like the std collections; use [`Value::try_clone`] to handle that case.
impl<A: Allocator> Clone for Value<A> {
    fn clone(&self) -> Self {
        self.try_clone()
            .unwrap_or_else(|_| handle_alloc_error(Layout::new::<Self>()))
    }
}

impl<A: Allocator> Default for Value<A> {
    fn default() -> Self {
        Value::Null
    }
}

impl<A: Allocator> PartialEq for Value<A> {
    fn eq(&self, other: &Self) -> bool {
        self.equals(other)
    }
}

impl<A: Allocator> fmt::Debug for Value<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("Null"),
            Value::Boolean(b) => f.debug_tuple("Boolean").field(b).finish(),
            Value::Integer(i) => f.debug_tuple("Integer").field(i).finish(),
            Value::Decimal(d) => f.debug_tuple("Decimal").field(d).finish(),
            Value::String(s) => f.debug_tuple("String").field(s).finish(),
            Value::Array(a) => f.debug_tuple("Array").field(a).finish(),
            Value::Object(o) => f.debug_tuple("Object").field(o).finish(),
        }
    }
}

impl<A: Allocator> From<bool> for Value<A> {
    fn from(b: bool) -> Self {
        Value::Boolean(b)
    }
}

impl<A: Allocator> From<i64> for Value<A> {
    fn from(i: i64) -> Self {
        Value::Integer(i)
    }
}

impl<A: Allocator> From<i32> for Value<A> {
    fn from(i: i32) -> Self {
        Value::Integer(i64::from(i))
    }
}

impl<A: Allocator> From<f64> for Value<A> {
    fn from(d: f64) -> Self {
        Value::Decimal(d)
    }
}

impl<A: Allocator> From<Str<A>> for Value<A> {
    fn from(s: Str<A>) -> Self {
        Value::String(s)
    }
}

impl<A: Allocator> From<Array<A>> for Value<A> {
    fn from(a: Array<A>) -> Self {
        Value::Array(a)
    }
}

impl<A: Allocator> From<Object<A>> for Value<A> {
    fn from(o: Object<A>) -> Self {
        Value::Object(o)
    }
}

impl<'a> From<&'a str> for Value<Global> {
    fn from(s: &'a str) -> Self {
        Value::String(Str::from(s))
    }
}

#[cfg(test)]
mod tests {
    use core::alloc::Layout;
    use core::ptr::NonNull;

    use allocator_api2::alloc::Allocator as RawAllocator;

    use super::*;
    use crate::Budget;

    fn sample() -> Value {
        let mut object = Object::new();
        object.insert(b"n", Value::Integer(7)).unwrap();
        object.insert(b"s", Value::from("text")).unwrap();
        let list: Array = [Value::Null, Value::Boolean(true), Value::Decimal(1.5)]
            .iter()
            .cloned()
            .collect();
        object.insert(b"list", Value::Array(list)).unwrap();
        Value::Object(object)
    }

    #[test]
    fn kinds() {
        for &kind in &[
            Kind::Null,
            Kind::Boolean,
            Kind::Integer,
            Kind::Decimal,
            Kind::String,
            Kind::Array,
            Kind::Object,
        ] {
            assert_eq!(Value::with_kind_in(kind, Global).kind(), kind);
        }
        assert_eq!(Value::<Global>::default().kind(), Kind::Null);
        assert_eq!(Kind::Decimal.name(), "decimal");
    }

    #[test]
    fn accessors() {
        let value = sample();
        assert!(value.is_object());
        assert_eq!(value.get("n").and_then(Value::as_i64), Some(7));
        assert_eq!(value.get("s").and_then(Value::as_str), Some("text"));
        assert_eq!(value.get("s").and_then(Value::as_bytes), Some(&b"text"[..]));
        let list = value.get("list").unwrap();
        assert_eq!(list.get_index(1).and_then(Value::as_bool), Some(true));
        assert_eq!(list.get_index(2).and_then(Value::as_f64), Some(1.5));
        assert!(list.get_index(0).unwrap().is_null());
        assert_eq!(value.get("missing"), None);
        assert_eq!(Value::<Global>::Integer(3).as_f64(), Some(3.0));
        assert!(Value::<Global>::Integer(3).allocator().is_none());
    }

    #[test]
    fn integer_and_decimal_differ() {
        assert_ne!(Value::<Global>::Integer(1), Value::Decimal(1.0));
        assert_ne!(Value::<Global>::Null, Value::Boolean(false));
    }

    #[test]
    fn clone_is_deep_and_equal() {
        let value = sample();
        let mut copy = value.try_clone().unwrap();
        assert_eq!(copy, value);
        copy.as_object_mut()
            .unwrap()
            .insert(b"n", Value::Integer(8))
            .unwrap();
        assert_ne!(copy, value);
        assert_eq!(value.get("n"), Some(&Value::Integer(7)));
    }

    #[test]
    fn take_leaves_null() {
        let mut value = sample();
        let moved = value.take();
        assert!(value.is_null());
        assert!(moved.is_object());
    }

    #[test]
    fn assign_copies() {
        let source = sample();
        let mut target = Value::Integer(1);
        target.assign(&source).unwrap();
        assert_eq!(target, source);

        target.assign(&Value::Boolean(true)).unwrap();
        assert_eq!(target, Value::Boolean(true));
    }

    #[test]
    fn assign_from_moves() {
        let mut source = sample();
        let expected = source.try_clone().unwrap();
        let mut target = Value::Null;
        target.assign_from(&mut source).unwrap();
        assert_eq!(target, expected);
        assert!(source.is_null());
    }

    #[test]
    fn copy_into_budget_keeps_own_allocator() {
        let a = Budget::new(Global, 1 << 16);
        let b = Budget::new(Global, 1 << 16);
        let source = Value::try_string_in(b"payload", &a).unwrap();
        let mut target = Value::try_string_in(b"x", &b).unwrap();
        let before = b.in_use();
        target.assign(&source).unwrap();
        assert_eq!(target.as_bytes(), Some(&b"payload"[..]));
        assert!(core::ptr::eq(*target.allocator().unwrap(), &b));
        assert_eq!(b.in_use(), before - 1 + 7);
    }

    #[test]
    fn failed_copy_leaves_target() {
        let roomy = Budget::new(Global, 1 << 16);
        let tight = Budget::new(Global, 4);
        let source = Value::try_string_in(b"too long for the budget", &roomy).unwrap();
        let mut target = Value::try_string_in(b"ok", &tight).unwrap();
        assert!(target.assign(&source).is_err());
        assert_eq!(target.as_bytes(), Some(&b"ok"[..]));
    }

    // Allocator that keeps its own contents on move assignment.
    #[derive(Clone, Copy)]
    struct Pinned<'a>(&'a Budget);

    unsafe impl<'a> RawAllocator for Pinned<'a> {
        fn allocate(&self, layout: Layout) -> Result<NonNull<[u8]>, AllocError> {
            self.0.allocate(layout)
        }

        unsafe fn deallocate(&self, ptr: NonNull<u8>, layout: Layout) {
            self.0.deallocate(ptr, layout)
        }
    }

    impl<'a> Allocator for Pinned<'a> {
        const PROPAGATE_ON_MOVE_ASSIGNMENT: bool = false;
    }

    #[test]
    fn move_without_propagation_copies() {
        let a = Budget::new(Global, 1 << 16);
        let b = Budget::new(Global, 1 << 16);
        let mut source = Value::try_string_in(b"abc", Pinned(&a)).unwrap();
        let mut target = Value::try_string_in(b"", Pinned(&b)).unwrap();
        target.assign_from(&mut source).unwrap();
        assert!(source.is_null());
        assert_eq!(target.as_bytes(), Some(&b"abc"[..]));
        assert_eq!(a.in_use(), 0);
        assert_eq!(b.in_use(), 3);
    }
}
