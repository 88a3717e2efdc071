use crate::err::DecodeResult;
use crate::string_or_ordinal::{ORDINAL_MARKER, StringOrOrdinal};
use crate::utils::bytes;

/// A lightweight cursor over an immutable resource blob.
///
/// This is the slice/offset equivalent of `Cursor<&[u8]>`: every read is bounds-checked against
/// the declared resource length and fails with `DecodeError::Truncated` instead of clamping.
/// Callers that want to stop gracefully (e.g. the menu decoders) check [`ByteCursor::remaining`]
/// or [`ByteCursor::in_bounds`] first.
///
/// All reads are little-endian and advance the cursor on success.
#[derive(Clone, Copy, Debug)]
pub(crate) struct ByteCursor<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> ByteCursor<'a> {
    #[inline]
    pub(crate) fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    #[inline]
    pub(crate) fn with_pos(buf: &'a [u8], pos: usize, what: &'static str) -> DecodeResult<Self> {
        // Allow pos == len (EOF), reject pos > len.
        let _ = bytes::slice_r(buf, pos, 0, what)?;
        Ok(Self { buf, pos })
    }

    #[inline]
    pub(crate) fn pos(&self) -> usize {
        self.pos
    }

    #[inline]
    pub(crate) fn remaining(&self) -> usize {
        self.buf.len().saturating_sub(self.pos)
    }

    /// The bytes from the current position to the end of the resource.
    #[inline]
    pub(crate) fn rest(&self) -> &'a [u8] {
        self.buf.get(self.pos..).unwrap_or_default()
    }

    /// Returns true if `n` more bytes can be read from the current position.
    #[inline]
    pub(crate) fn in_bounds(&self, n: usize) -> bool {
        self.pos
            .checked_add(n)
            .is_some_and(|end| end <= self.buf.len())
    }

    #[inline]
    pub(crate) fn advance(&mut self, n: usize, what: &'static str) -> DecodeResult<()> {
        let new_pos = self
            .pos
            .checked_add(n)
            .ok_or_else(|| bytes::truncated(what, self.pos, n, self.buf.len()))?;
        if new_pos > self.buf.len() {
            return Err(bytes::truncated(what, self.pos, n, self.buf.len()));
        }
        self.pos = new_pos;
        Ok(())
    }

    /// Advance to the next offset (relative to the start of the resource) that is a multiple of 4.
    ///
    /// No-op when already aligned.
    #[inline]
    pub(crate) fn align_to_4(&mut self, what: &'static str) -> DecodeResult<()> {
        let misalignment = self.pos % 4;
        if misalignment == 0 {
            return Ok(());
        }
        self.advance(4 - misalignment, what)
    }

    #[inline]
    pub(crate) fn take_bytes(&mut self, len: usize, what: &'static str) -> DecodeResult<&'a [u8]> {
        let out = bytes::slice_r(self.buf, self.pos, len, what)?;
        self.pos += len;
        Ok(out)
    }

    #[inline]
    pub(crate) fn u16_named(&mut self, what: &'static str) -> DecodeResult<u16> {
        let v = bytes::read_u16_le_r(self.buf, self.pos, what)?;
        self.pos += 2;
        Ok(v)
    }

    #[inline]
    pub(crate) fn u32_named(&mut self, what: &'static str) -> DecodeResult<u32> {
        let v = bytes::read_u32_le_r(self.buf, self.pos, what)?;
        self.pos += 4;
        Ok(v)
    }

    /// Read UTF-16 code units until a NUL (0x0000) code unit is encountered.
    ///
    /// The cursor is left just past the terminator. A missing terminator is a truncation.
    pub(crate) fn null_terminated_utf16_units(
        &mut self,
        what: &'static str,
    ) -> DecodeResult<Vec<u16>> {
        let mut units = Vec::new();
        loop {
            let cu = self.u16_named(what)?;
            if cu == 0 {
                break;
            }
            units.push(cu);
        }
        Ok(units)
    }

    /// Read UTF-16 code units until NUL and decode into UTF-8.
    ///
    /// Unpaired surrogates are replaced with U+FFFD rather than failing the whole resource.
    pub(crate) fn null_terminated_utf16_string(&mut self, what: &'static str) -> DecodeResult<String> {
        let units = self.null_terminated_utf16_units(what)?;
        Ok(String::from_utf16_lossy(&units))
    }

    /// Read a `sz_Or_Ord` field. The first unit decides how many bytes are consumed.
    pub(crate) fn string_or_ordinal(&mut self, what: &'static str) -> DecodeResult<StringOrOrdinal> {
        let start = self.pos;
        let first = bytes::read_u16_le_r(self.buf, start, what)?;
        match first {
            0x0000 => {
                self.pos += 2;
                Ok(StringOrOrdinal::Absent)
            }
            ORDINAL_MARKER => {
                let ordinal = bytes::read_u16_le_r(self.buf, start + 2, what)?;
                self.pos += 4;
                Ok(StringOrOrdinal::Ordinal(ordinal))
            }
            _ => Ok(StringOrOrdinal::Text(self.null_terminated_utf16_string(what)?)),
        }
    }

    /// Read `len` bytes as UTF-16 code units (an odd trailing byte is consumed but ignored).
    pub(crate) fn utf16_units_by_byte_len(
        &mut self,
        len: usize,
        what: &'static str,
    ) -> DecodeResult<Vec<u16>> {
        let bytes = self.take_bytes(len, what)?;
        Ok(bytes
            .chunks_exact(2)
            .map(|chunk| u16::from_le_bytes([chunk[0], chunk[1]]))
            .collect())
    }
}
