use std::fmt;

use bytes::{Buf, BufMut};

/// Bytes used by an encoded `i32`, and by every length prefix.
pub const INT_SIZE: usize = 4;

/// Bytes used by one UTF-16 code unit.
pub const UTF16_UNIT_SIZE: usize = 2;

/// A fixed-size, in-memory copy of a block.
///
/// Values are encoded at caller-chosen byte offsets. Everything is little-endian:
///
/// - `i32`: 4 bytes, two's complement
/// - bytes: `i32` length prefix, then the raw bytes
/// - strings: `i32` prefix holding the *byte* length of the UTF-16 encoding,
///   then each code unit as 2 bytes
///
/// Laying fields out so they neither overlap nor run past the end is up to the
/// caller. An offset outside the page panics.
#[derive(Clone, PartialEq, Eq)]
pub struct Page {
    data: Box<[u8]>,
}

impl Page {
    /// Creates a zero-filled page of `size` bytes.
    pub fn new(size: usize) -> Self {
        Self {
            data: vec![0; size].into_boxed_slice(),
        }
    }

    /// Wraps existing bytes; the page keeps their length for its lifetime.
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self {
            data: bytes.into_boxed_slice(),
        }
    }

    pub fn size(&self) -> usize {
        self.data.len()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn as_bytes_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    pub fn get_i32(&self, offset: usize) -> i32 {
        let mut buf = &self.data[offset..offset + INT_SIZE];
        buf.get_i32_le()
    }

    pub fn set_i32(&mut self, offset: usize, value: i32) {
        let mut buf = &mut self.data[offset..offset + INT_SIZE];
        buf.put_i32_le(value);
    }

    /// Returns the length-prefixed byte sequence stored at `offset`.
    pub fn get_bytes(&self, offset: usize) -> &[u8] {
        let start = offset + INT_SIZE;
        let len = self.get_len(offset);
        &self.data[start..start + len]
    }

    pub fn set_bytes(&mut self, offset: usize, bytes: &[u8]) {
        let start = offset + INT_SIZE;
        let end = start + bytes.len();
        // Bounds first, so a too-long value leaves the page untouched.
        let target = &mut self.data[start..end];
        target.copy_from_slice(bytes);
        self.set_i32(offset, bytes.len() as i32);
    }

    /// Decodes the UTF-16 string stored at `offset`. Unpaired surrogates
    /// come back as U+FFFD.
    pub fn get_string(&self, offset: usize) -> String {
        let start = offset + INT_SIZE;
        let byte_len = self.get_len(offset);
        let units = self.data[start..start + byte_len]
            .chunks_exact(UTF16_UNIT_SIZE)
            .map(|unit| u16::from_le_bytes([unit[0], unit[1]]));

        char::decode_utf16(units)
            .map(|c| c.unwrap_or(char::REPLACEMENT_CHARACTER))
            .collect()
    }

    pub fn set_string(&mut self, offset: usize, value: &str) {
        let byte_len = value.encode_utf16().count() * UTF16_UNIT_SIZE;
        let start = offset + INT_SIZE;

        let mut buf = &mut self.data[start..start + byte_len];
        for unit in value.encode_utf16() {
            buf.put_u16_le(unit);
        }
        self.set_i32(offset, byte_len as i32);
    }

    /// Bytes `set_string` uses for a string of `code_units` UTF-16 code units.
    ///
    /// This is a code-unit count, not a character count: a character outside
    /// the Basic Multilingual Plane takes two units. Use
    /// `s.encode_utf16().count()` when sizing a field for `s`.
    pub const fn max_length(code_units: usize) -> usize {
        INT_SIZE + UTF16_UNIT_SIZE * code_units
    }

    fn get_len(&self, offset: usize) -> usize {
        // A negative prefix becomes a huge length and faults on slicing.
        self.get_i32(offset) as u32 as usize
    }
}

impl fmt::Debug for Page {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let used = self.data.iter().filter(|&&b| b != 0).count();
        f.debug_struct("Page")
            .field("size", &self.data.len())
            .field("non_zero_bytes", &used)
            .finish()
    }
}
