//! Low-level byte cursor over an in-memory or mapped source.

use byteorder::{ByteOrder, LittleEndian};

use super::error::{LoadError, Result};

/// A read cursor over a borrowed byte buffer.
///
/// Every read advances the cursor and fails with
/// [`LoadError::TruncatedInput`] when fewer bytes remain than requested.
/// The decoder carries no state beyond the cursor position.
pub struct Decoder<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Decoder<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Decoder { buf, pos: 0 }
    }

    /// Absolute position of the cursor within the source.
    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    /// Consume `n` bytes and return them as a slice of the source.
    pub fn take(&mut self, n: usize, context: &'static str) -> Result<&'a [u8]> {
        if self.remaining() < n {
            return Err(LoadError::TruncatedInput {
                context,
                needed: n as u64,
                available: self.remaining() as u64,
            });
        }
        let out = &self.buf[self.pos..self.pos + n];
        self.pos += n;
        Ok(out)
    }

    /// Advance the cursor without inspecting the bytes.
    pub fn skip(&mut self, n: usize, context: &'static str) -> Result<()> {
        self.take(n, context).map(|_| ())
    }

    pub fn read_u8(&mut self, context: &'static str) -> Result<u8> {
        Ok(self.take(1, context)?[0])
    }

    pub fn read_i8(&mut self, context: &'static str) -> Result<i8> {
        Ok(self.take(1, context)?[0] as i8)
    }

    pub fn read_u32_le(&mut self, context: &'static str) -> Result<u32> {
        Ok(LittleEndian::read_u32(self.take(4, context)?))
    }

    pub fn read_i32_le(&mut self, context: &'static str) -> Result<i32> {
        Ok(LittleEndian::read_i32(self.take(4, context)?))
    }

    pub fn read_u64_le(&mut self, context: &'static str) -> Result<u64> {
        Ok(LittleEndian::read_u64(self.take(8, context)?))
    }

    pub fn read_i64_le(&mut self, context: &'static str) -> Result<i64> {
        Ok(LittleEndian::read_i64(self.take(8, context)?))
    }

    pub fn read_f64_le(&mut self, context: &'static str) -> Result<f64> {
        Ok(LittleEndian::read_f64(self.take(8, context)?))
    }

    /// Read `count` little-endian f32 values into `out`.
    pub fn read_f32_into(
        &mut self,
        count: usize,
        out: &mut Vec<f32>,
        context: &'static str,
    ) -> Result<()> {
        let byte_len = count.checked_mul(4).ok_or(LoadError::TruncatedInput {
            context,
            needed: (count as u64).saturating_mul(4),
            available: self.remaining() as u64,
        })?;
        let bytes = self.take(byte_len, context)?;
        let start = out.len();
        out.resize(start + count, 0.0);
        LittleEndian::read_f32_into(bytes, &mut out[start..]);
        Ok(())
    }

    /// Read bytes up to (not including) `delimiter` and consume the
    /// delimiter itself. Fails if the source ends before the delimiter.
    pub fn read_delimited(&mut self, delimiter: u8, context: &'static str) -> Result<&'a [u8]> {
        let rest = &self.buf[self.pos..];
        let end = rest
            .iter()
            .position(|&b| b == delimiter)
            .ok_or(LoadError::TruncatedInput {
                context,
                needed: 1,
                available: 0,
            })?;
        let out = &rest[..end];
        self.pos += end + 1;
        Ok(out)
    }

    /// Read a u32-length-prefixed UTF-8 string.
    pub fn read_prefixed_str(&mut self, context: &'static str) -> Result<&'a str> {
        let len = self.read_u32_le(context)? as usize;
        let bytes = self.take(len, context)?;
        std::str::from_utf8(bytes)
            .map_err(|_| LoadError::MalformedHeader(format!("{context}: invalid UTF-8")))
    }

    /// Skip any of the given bytes at the cursor (e.g. record separators).
    pub fn skip_any(&mut self, bytes: &[u8]) {
        while self.pos < self.buf.len() && bytes.contains(&self.buf[self.pos]) {
            self.pos += 1;
        }
    }
}
