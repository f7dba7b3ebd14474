//! Byte level scanning utilities used by the parser.
//!
//! All functions work on borrowed byte slices and never allocate. Brackets, braces and quotes
//! are matched structurally only; a backslash always hides the byte that follows it, inside or
//! outside of quotes.

/// Returns `true` for the ASCII whitespace bytes removed by [`trim`].
pub fn is_whitespace(b: u8) -> bool {
    matches!(b, b' ' | b'\t' | b'\n' | 0x0B | 0x0C | b'\r')
}

/// Returns the bounds `(start, end)` of `bytes` without leading and trailing whitespace.
///
/// Empty or all-whitespace input yields `start == end`.
pub fn trim_bounds(bytes: &[u8]) -> (usize, usize) {
    let start = bytes
        .iter()
        .position(|&b| !is_whitespace(b))
        .unwrap_or(bytes.len());
    let end = bytes
        .iter()
        .rposition(|&b| !is_whitespace(b))
        .map_or(start, |i| i + 1);
    (start, end)
}

/// Removes leading and trailing ASCII whitespace (space, `\t`, `\n`, `\x0B`, `\x0C`, `\r`).
pub fn trim(bytes: &[u8]) -> &[u8] {
    let (start, end) = trim_bounds(bytes);
    &bytes[start..end]
}

fn closer_for(open: u8) -> Option<u8> {
    match open {
        b'{' => Some(b'}'),
        b'[' => Some(b']'),
        b'"' => Some(b'"'),
        _ => None,
    }
}

/// Finds the byte that closes the opener at `open`.
///
/// `bytes[open]` must be one of `{`, `[` or `"`. The scan tracks nesting of braces and brackets
/// and treats quoted runs as opaque. Returns the index of the matching closer, or `bytes.len()`
/// if there is none (unbalanced input, a closer of the wrong kind, or no opener at `open`).
///
/// ```
/// use jsonslot::scan::find_matching_close;
///
/// let text = br#"{"a": [1, "}"]} tail"#;
/// assert_eq!(find_matching_close(text, 0), 14);
/// assert_eq!(find_matching_close(b"[1, 2", 0), 5);
/// ```
pub fn find_matching_close(bytes: &[u8], open: usize) -> usize {
    let len = bytes.len();
    let expected = match bytes.get(open).copied().and_then(closer_for) {
        Some(c) => c,
        None => return len,
    };

    let mut i = open + 1;
    if expected == b'"' {
        while i < len {
            match bytes[i] {
                b'\\' => i += 2,
                b'"' => return i,
                _ => i += 1,
            }
        }
        return len;
    }

    let mut in_string = false;
    let mut depth = 0usize;
    while i < len {
        let b = bytes[i];
        if b == b'\\' {
            i += 2;
            continue;
        }

        if in_string {
            if b == b'"' {
                in_string = false;
            }
        } else {
            match b {
                b'"' => in_string = true,
                b'{' | b'[' => depth += 1,
                b'}' | b']' if depth > 0 => depth -= 1,
                b'}' | b']' => return if b == expected { i } else { len },
                _ => {}
            }
        }
        i += 1;
    }

    len
}

/// Iterator over the top level segments of a byte slice
///
/// Created by [`SplitTop::new`]. Yields `(offset, segment)` pairs where `offset` is the
/// position of the segment inside the scanned slice. Delimiters nested in strings, arrays or
/// objects and escaped delimiters don't split. The trailing segment is always produced, even
/// if it is empty, so a slice containing `n` top level delimiters yields `n + 1` segments.
#[derive(Clone, Debug)]
pub struct SplitTop<'a> {
    bytes: &'a [u8],
    delimiter: u8,
    start: usize,
    done: bool,
}

impl<'a> SplitTop<'a> {
    /// Splits `bytes` on top level occurrences of `delimiter`.
    pub fn new(bytes: &'a [u8], delimiter: u8) -> Self {
        SplitTop {
            bytes,
            delimiter,
            start: 0,
            done: false,
        }
    }
}

impl<'a> Iterator for SplitTop<'a> {
    type Item = (usize, &'a [u8]);

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        let len = self.bytes.len();
        let start = self.start;
        let mut i = start;
        while i < len {
            let b = self.bytes[i];
            if b == b'\\' {
                i += 2;
            } else if b == self.delimiter {
                self.start = i + 1;
                return Some((start, &self.bytes[start..i]));
            } else if closer_for(b).is_some() {
                i = find_matching_close(self.bytes, i).saturating_add(1);
            } else {
                i += 1;
            }
        }

        self.done = true;
        Some((start, &self.bytes[start..]))
    }
}

/// Calls `on_segment` for every top level segment of `bytes`, see [`SplitTop`].
pub fn split_top<'a, F>(bytes: &'a [u8], delimiter: u8, mut on_segment: F)
where
    F: FnMut(&'a [u8]),
{
    for (_, segment) in SplitTop::new(bytes, delimiter) {
        on_segment(segment);
    }
}
