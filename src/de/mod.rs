//! Parse JSON text into a [`Value`] tree
//!
//! The parser never recurses. It keeps a FIFO queue of pending `(byte range, node)` work items:
//! each item is trimmed and classified by its first and last byte, containers are split into
//! their top level members (which are queued in turn) and scalars are decoded in place. Once
//! the queue drains the tree is assembled bottom-up. Nesting depth is therefore bounded by
//! memory (or [`Options::max_depth`]), not by the call stack.
//!
//! All scratch space comes from the same allocator as the resulting tree. Nothing is written to
//! the caller's value unless the whole document parses.

use core::fmt;
use core::mem;

use allocator_api2::vec::Vec;

use crate::allocator::{self, AllocError, Allocator, Global};
use crate::scan::{find_matching_close, is_whitespace, trim, trim_bounds, SplitTop};
use crate::value::{Array, Object, Str, Value};

pub use self::options::Options;

mod options;

/// Deserialization result
pub type Result<T> = core::result::Result<T, Error>;

/// What went wrong while parsing
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[non_exhaustive]
pub enum ErrorKind {
    /// EOF while parsing a list.
    EofWhileParsingList,

    /// EOF while parsing an object.
    EofWhileParsingObject,

    /// EOF while parsing a string.
    EofWhileParsingString,

    /// EOF while parsing a JSON value.
    EofWhileParsingValue,

    /// Expected this character to be a `':'`.
    ExpectedColon,

    /// Expected this character to start a JSON value.
    ExpectedSomeValue,

    /// Invalid number.
    InvalidNumber,

    /// Object key is not a string.
    KeyMustBeAString,

    /// JSON has an empty member between commas or after the last one.
    TrailingComma,

    /// Input is longer than [`Options::max_input_len`].
    InputTooLarge,

    /// Document holds more values than [`Options::max_values`].
    TooManyValues,

    /// Containers are nested deeper than [`Options::max_depth`].
    NestingTooDeep,

    /// The allocator refused a request.
    OutOfMemory,
}

impl ErrorKind {
    fn message(self) -> &'static str {
        match self {
            ErrorKind::EofWhileParsingList => "EOF while parsing a list.",
            ErrorKind::EofWhileParsingObject => "EOF while parsing an object.",
            ErrorKind::EofWhileParsingString => "EOF while parsing a string.",
            ErrorKind::EofWhileParsingValue => "EOF while parsing a JSON value.",
            ErrorKind::ExpectedColon => "Expected this character to be a `':'`.",
            ErrorKind::ExpectedSomeValue => "Expected this character to start a JSON value.",
            ErrorKind::InvalidNumber => "Invalid number.",
            ErrorKind::KeyMustBeAString => "Object key is not a string.",
            ErrorKind::TrailingComma => "JSON has an empty member in an array or map.",
            ErrorKind::InputTooLarge => "Input exceeds the configured length limit.",
            ErrorKind::TooManyValues => "Document exceeds the configured value limit.",
            ErrorKind::NestingTooDeep => "Document exceeds the configured nesting limit.",
            ErrorKind::OutOfMemory => "Memory allocation failed.",
        }
    }
}

/// This type represents all possible errors that can occur when parsing JSON data
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Error {
    kind: ErrorKind,
    offset: usize,
}

impl Error {
    fn new(kind: ErrorKind, offset: usize) -> Self {
        Error { kind, offset }
    }

    /// The category of the error.
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Byte offset into the input where the offending text starts.
    pub fn offset(&self) -> usize {
        self.offset
    }
}

#[cfg(feature = "std")]
impl std::error::Error for Error {}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (at byte {})", self.kind.message(), self.offset)
    }
}

#[derive(Clone, Copy)]
struct Work {
    start: usize,
    end: usize,
    node: usize,
    // containers enclosing this item
    depth: usize,
}

#[derive(Clone, Copy)]
struct Member {
    key_start: usize,
    key_end: usize,
    node: usize,
}

enum Node<A: Allocator> {
    Pending,
    Done(Value<A>),
    Array(Vec<usize, A>),
    Object(Vec<Member, A>),
}

impl<A: Allocator> Node<A> {
    fn take_value(&mut self) -> Value<A> {
        match mem::replace(self, Node::Pending) {
            Node::Done(value) => value,
            _ => Value::Null,
        }
    }
}

// Node `i` is described by `queue[i]`. Children are always queued after their parent, so they
// have larger indices.
struct Parser<'a, 'o, A: Allocator> {
    input: &'a [u8],
    options: &'o Options,
    alloc: A,
    nodes: Vec<Node<A>, A>,
    queue: Vec<Work, A>,
}

impl<'a, 'o, A: Allocator> Parser<'a, 'o, A> {
    fn new(input: &'a [u8], alloc: A, options: &'o Options) -> Self {
        Parser {
            input,
            options,
            nodes: Vec::new_in(alloc.clone()),
            queue: Vec::new_in(alloc.clone()),
            alloc,
        }
    }

    fn parse(mut self) -> Result<Value<A>> {
        if self.input.len() > self.options.max_input_len {
            return Err(Error::new(
                ErrorKind::InputTooLarge,
                self.options.max_input_len,
            ));
        }

        self.enqueue(0, self.input.len(), 0)?;
        let mut next = 0;
        while next < self.queue.len() {
            let work = self.queue[next];
            next += 1;
            let node = self.expand(work)?;
            self.nodes[work.node] = node;
        }
        trace!(
            "parsed {=usize} bytes into {=usize} values",
            self.input.len(),
            self.nodes.len()
        );
        self.assemble()
    }

    fn enqueue(&mut self, start: usize, end: usize, depth: usize) -> Result<usize> {
        if self.nodes.len() >= self.options.max_values {
            return Err(Error::new(ErrorKind::TooManyValues, start));
        }
        let oom = |_: AllocError| Error::new(ErrorKind::OutOfMemory, start);
        allocator::reserve(&mut self.nodes, 1).map_err(oom)?;
        allocator::reserve(&mut self.queue, 1).map_err(oom)?;

        let node = self.nodes.len();
        self.nodes.push(Node::Pending);
        self.queue.push(Work {
            start,
            end,
            node,
            depth,
        });
        Ok(node)
    }

    fn expand(&mut self, work: Work) -> Result<Node<A>> {
        let input = self.input;
        let (lo, hi) = trim_bounds(&input[work.start..work.end]);
        let start = work.start + lo;
        let end = work.start + hi;
        let text = &input[start..end];

        let container = matches!(
            (text.first(), text.last()),
            (Some(b'{'), Some(b'}')) | (Some(b'['), Some(b']'))
        );
        if container && text.len() >= 2 && work.depth >= self.options.max_depth {
            return Err(Error::new(ErrorKind::NestingTooDeep, start));
        }
        let depth = work.depth + 1;

        match (text.first(), text.last()) {
            (None, _) => Err(Error::new(ErrorKind::EofWhileParsingValue, work.start)),
            (Some(b'{'), Some(b'}')) if text.len() >= 2 => self.expand_object(start, end, depth),
            (Some(b'['), Some(b']')) if text.len() >= 2 => self.expand_array(start, end, depth),
            (Some(b'"'), Some(b'"')) if text.len() >= 2 => {
                Str::try_from_bytes_in(&text[1..text.len() - 1], self.alloc.clone())
                    .map(|s| Node::Done(Value::String(s)))
                    .map_err(|_| Error::new(ErrorKind::OutOfMemory, start))
            }
            (Some(b'{'), _) => Err(Error::new(ErrorKind::EofWhileParsingObject, start)),
            (Some(b'['), _) => Err(Error::new(ErrorKind::EofWhileParsingList, start)),
            (Some(b'"'), _) => Err(Error::new(ErrorKind::EofWhileParsingString, start)),
            _ => parse_scalar(text)
                .map(Node::Done)
                .map_err(|kind| Error::new(kind, start)),
        }
    }

    fn expand_array(&mut self, start: usize, end: usize, depth: usize) -> Result<Node<A>> {
        let input = self.input;
        let inner_start = start + 1;
        let inner = &input[inner_start..end - 1];

        let mut children = Vec::new_in(self.alloc.clone());
        if trim(inner).is_empty() {
            return Ok(Node::Array(children));
        }

        for (offset, segment) in SplitTop::new(inner, b',') {
            let segment_start = inner_start + offset;
            if trim(segment).is_empty() {
                return Err(Error::new(ErrorKind::TrailingComma, segment_start));
            }
            let child = self.enqueue(segment_start, segment_start + segment.len(), depth)?;
            allocator::reserve(&mut children, 1)
                .map_err(|_| Error::new(ErrorKind::OutOfMemory, segment_start))?;
            children.push(child);
        }
        Ok(Node::Array(children))
    }

    fn expand_object(&mut self, start: usize, end: usize, depth: usize) -> Result<Node<A>> {
        let input = self.input;
        let inner_start = start + 1;
        let inner = &input[inner_start..end - 1];

        let mut members = Vec::new_in(self.alloc.clone());
        if trim(inner).is_empty() {
            return Ok(Node::Object(members));
        }

        for (offset, segment) in SplitTop::new(inner, b',') {
            let (lo, hi) = trim_bounds(segment);
            let field_start = inner_start + offset + lo;
            if lo == hi {
                return Err(Error::new(ErrorKind::TrailingComma, inner_start + offset));
            }
            let field = &segment[lo..hi];

            if field[0] != b'"' {
                return Err(Error::new(ErrorKind::KeyMustBeAString, field_start));
            }
            let key_close = find_matching_close(field, 0);
            if key_close == field.len() {
                return Err(Error::new(ErrorKind::EofWhileParsingString, field_start));
            }

            let mut colon = None;
            for (i, &b) in field.iter().enumerate().skip(key_close + 1) {
                if b == b':' {
                    colon = Some(i);
                    break;
                }
                if !is_whitespace(b) {
                    return Err(Error::new(ErrorKind::ExpectedColon, field_start + i));
                }
            }
            let colon = colon
                .ok_or_else(|| Error::new(ErrorKind::ExpectedColon, field_start + field.len()))?;

            let node = self.enqueue(field_start + colon + 1, field_start + field.len(), depth)?;
            allocator::reserve(&mut members, 1)
                .map_err(|_| Error::new(ErrorKind::OutOfMemory, field_start))?;
            members.push(Member {
                key_start: field_start + 1,
                key_end: field_start + key_close,
                node,
            });
        }
        Ok(Node::Object(members))
    }

    // Builds containers from the highest index down, so every child is complete before its
    // parent takes it.
    fn assemble(mut self) -> Result<Value<A>> {
        let input = self.input;
        for index in (0..self.nodes.len()).rev() {
            let offset = self.queue[index].start;
            let oom = |_: AllocError| Error::new(ErrorKind::OutOfMemory, offset);
            let value = match mem::replace(&mut self.nodes[index], Node::Pending) {
                Node::Pending => Value::Null,
                Node::Done(value) => value,
                Node::Array(children) => {
                    let mut array = Array::try_with_capacity_in(children.len(), self.alloc.clone())
                        .map_err(oom)?;
                    for &child in children.iter() {
                        array.push_back(self.nodes[child].take_value()).map_err(oom)?;
                    }
                    Value::Array(array)
                }
                Node::Object(members) => {
                    let mut object = Object::try_with_table_size_in(
                        self.options.object_table_size,
                        self.alloc.clone(),
                    )
                    .map_err(oom)?;
                    for member in members.iter() {
                        let value = self.nodes[member.node].take_value();
                        object
                            .insert(&input[member.key_start..member.key_end], value)
                            .map_err(oom)?;
                    }
                    Value::Object(object)
                }
            };
            self.nodes[index] = Node::Done(value);
        }

        Ok(self.nodes.first_mut().map_or(Value::Null, Node::take_value))
    }
}

// `null`, `true`, `false` or a number.
fn parse_scalar<A: Allocator>(text: &[u8]) -> core::result::Result<Value<A>, ErrorKind> {
    match text {
        b"null" => return Ok(Value::Null),
        b"true" => return Ok(Value::Boolean(true)),
        b"false" => return Ok(Value::Boolean(false)),
        _ => {}
    }

    match text.first() {
        Some(b'-') | Some(b'+') | Some(b'.') | Some(b'0'..=b'9') => {}
        _ => return Err(ErrorKind::ExpectedSomeValue),
    }
    if !text
        .iter()
        .all(|b| matches!(b, b'0'..=b'9' | b'-' | b'+' | b'.' | b'e' | b'E'))
    {
        return Err(ErrorKind::InvalidNumber);
    }

    let text = core::str::from_utf8(text).map_err(|_| ErrorKind::InvalidNumber)?;
    if let Ok(i) = text.parse::<i64>() {
        return Ok(Value::Integer(i));
    }
    text.parse::<f64>()
        .map(Value::Decimal)
        .map_err(|_| ErrorKind::InvalidNumber)
}

/// Parses `v` with the global allocator and no limits.
pub fn from_slice(v: &[u8]) -> Result<Value> {
    from_slice_with(v, Global, &Options::new())
}

/// Parses `s` with the global allocator and no limits.
pub fn from_str(s: &str) -> Result<Value> {
    from_slice(s.as_bytes())
}

/// Parses `v`, allocating the tree and all scratch space from `alloc`.
pub fn from_slice_in<A: Allocator>(v: &[u8], alloc: A) -> Result<Value<A>> {
    from_slice_with(v, alloc, &Options::new())
}

/// Parses `v` from `alloc`, enforcing `options`.
pub fn from_slice_with<A: Allocator>(v: &[u8], alloc: A, options: &Options) -> Result<Value<A>> {
    Parser::new(v, alloc, options).parse().map_err(|err| {
        debug!("parse error {} at byte {=usize}", err.kind(), err.offset());
        err
    })
}

/// Parses `v` into `out`.
///
/// On failure `out` keeps its previous contents; on success they are released and replaced.
///
/// ```
/// use jsonslot::{Global, Value};
///
/// let mut value = Value::Integer(1);
/// assert!(jsonslot::parse_into(&mut value, b"[1, ]", Global).is_err());
/// assert_eq!(value, Value::Integer(1));
/// jsonslot::parse_into(&mut value, b"[1]", Global).unwrap();
/// assert!(value.is_array());
/// ```
pub fn parse_into<A: Allocator>(out: &mut Value<A>, v: &[u8], alloc: A) -> Result<()> {
    *out = from_slice_in(v, alloc)?;
    Ok(())
}

impl core::str::FromStr for Value<Global> {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        from_str(s)
    }
}
