//! Growable byte buffer and borrowed byte views.
//!
//! [`ByteBuf`] accumulates bytes (the piece hash blob of a torrent being
//! created, for instance) and [`ByteView`] is the non-owning counterpart used
//! wherever bytes are compared or printed.

use std::cmp::Ordering;
use std::fmt;

use bytes::{Bytes, BytesMut};

/// An owned, growable byte buffer.
///
/// Capacity at least doubles whenever a push would overflow it, so a long
/// run of small appends stays amortized O(1).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ByteBuf {
    inner: BytesMut,
}

impl ByteBuf {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            inner: BytesMut::with_capacity(capacity),
        }
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.inner.capacity()
    }

    /// Ensures room for `additional` more bytes, growing geometrically.
    pub fn reserve(&mut self, additional: usize) {
        let needed = self.len() + additional;
        if needed <= self.capacity() {
            return;
        }
        let target = needed.max(self.capacity().saturating_mul(2)).max(1);
        self.inner.reserve(target - self.len());
    }

    pub fn push(&mut self, byte: u8) {
        self.reserve(1);
        self.inner.extend_from_slice(&[byte]);
    }

    pub fn push_slice(&mut self, bytes: &[u8]) {
        self.reserve(bytes.len());
        self.inner.extend_from_slice(bytes);
    }

    pub fn push_view(&mut self, view: ByteView<'_>) {
        self.push_slice(view.as_bytes());
    }

    pub fn clear(&mut self) {
        self.inner.clear();
    }

    pub fn as_view(&self) -> ByteView<'_> {
        ByteView::new(&self.inner)
    }

    /// Converts the buffer into immutable, cheaply cloneable bytes.
    pub fn freeze(self) -> Bytes {
        self.inner.freeze()
    }
}

impl AsRef<[u8]> for ByteBuf {
    fn as_ref(&self) -> &[u8] {
        &self.inner
    }
}

impl From<&[u8]> for ByteBuf {
    fn from(bytes: &[u8]) -> Self {
        let mut buf = Self::with_capacity(bytes.len());
        buf.push_slice(bytes);
        buf
    }
}

/// A borrowed run of bytes with a known length.
///
/// Ordering is lexicographic over the common prefix, then the shorter view
/// sorts first.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct ByteView<'a> {
    data: &'a [u8],
}

impl<'a> ByteView<'a> {
    pub const fn new(data: &'a [u8]) -> Self {
        Self { data }
    }

    pub const fn len(&self) -> usize {
        self.data.len()
    }

    pub const fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub const fn as_bytes(&self) -> &'a [u8] {
        self.data
    }

    pub fn contains(&self, byte: u8) -> bool {
        self.data.contains(&byte)
    }

    pub fn as_str(&self) -> Option<&'a str> {
        std::str::from_utf8(self.data).ok()
    }
}

impl PartialOrd for ByteView<'_> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ByteView<'_> {
    fn cmp(&self, other: &Self) -> Ordering {
        let common = self.len().min(other.len());
        self.data[..common]
            .cmp(&other.data[..common])
            .then(self.len().cmp(&other.len()))
    }
}

impl<'a> From<&'a [u8]> for ByteView<'a> {
    fn from(data: &'a [u8]) -> Self {
        Self::new(data)
    }
}

impl<'a> From<&'a str> for ByteView<'a> {
    fn from(s: &'a str) -> Self {
        Self::new(s.as_bytes())
    }
}

impl PartialEq<[u8]> for ByteView<'_> {
    fn eq(&self, other: &[u8]) -> bool {
        self.data == other
    }
}

/// Renders as `{...}`: printable ASCII verbatim with `\` and `"` escaped,
/// everything else as `\uXXXX`.
impl fmt::Display for ByteView<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("{")?;
        for &b in self.data {
            match b {
                b'\\' | b'"' => write!(f, "\\{}", b as char)?,
                0x20..=0x7e => write!(f, "{}", b as char)?,
                _ => write!(f, "\\u{:04x}", b)?,
            }
        }
        f.write_str("}")
    }
}
