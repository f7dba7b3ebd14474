use crate::value::DEFAULT_TABLE_SIZE;

/// Parser limits and tuning
///
/// [`Options::new`] sets no limits. Use [`Options::bounded`] (or the builder methods) when the
/// input comes from an untrusted source.
///
/// ```
/// use jsonslot::{de::ErrorKind, Global, Options};
///
/// let options = Options::new().max_values(3);
/// assert!(jsonslot::from_slice_with(b"[1, 2]", Global, &options).is_ok());
/// let err = jsonslot::from_slice_with(b"[1, 2, 3]", Global, &options).unwrap_err();
/// assert_eq!(err.kind(), ErrorKind::TooManyValues);
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Options {
    /// Longest accepted input, in bytes.
    pub max_input_len: usize,
    /// Maximum number of values (containers and scalars) in one document.
    pub max_values: usize,
    /// Maximum number of nested arrays and objects. `[[1]]` has a depth of 2.
    pub max_depth: usize,
    /// Table size of every object the parser creates.
    pub object_table_size: usize,
}

impl Options {
    /// No limits; objects get [`DEFAULT_TABLE_SIZE`] slots.
    pub const fn new() -> Self {
        Options {
            max_input_len: usize::MAX,
            max_values: usize::MAX,
            max_depth: usize::MAX,
            object_table_size: DEFAULT_TABLE_SIZE,
        }
    }

    /// 1 MiB of input, at most 65536 values nested at most 128 levels deep.
    pub const fn bounded() -> Self {
        Options {
            max_input_len: 1 << 20,
            max_values: 1 << 16,
            max_depth: 128,
            object_table_size: DEFAULT_TABLE_SIZE,
        }
    }

    /// Sets [`Options::max_input_len`].
    pub const fn max_input_len(mut self, len: usize) -> Self {
        self.max_input_len = len;
        self
    }

    /// Sets [`Options::max_values`].
    pub const fn max_values(mut self, count: usize) -> Self {
        self.max_values = count;
        self
    }

    /// Sets [`Options::max_depth`].
    pub const fn max_depth(mut self, depth: usize) -> Self {
        self.max_depth = depth;
        self
    }

    /// Sets [`Options::object_table_size`]. Zero leaves parsed objects unsized until their
    /// first member is stored.
    pub const fn object_table_size(mut self, size: usize) -> Self {
        self.object_table_size = size;
        self
    }
}

impl Default for Options {
    fn default() -> Self {
        Options::new()
    }
}
