//! Byte-slice utilities for bounds-oriented parsing.
//!
//! There are two layers:
//! - **Option layer** (`read_*`): zero-cost helpers that return `Option<T>`.
//!   Use these when you want to map failures to your own error type (e.g. PE directory parsing).
//! - **Result layer** (`*_r`): wrappers that map `None` to `DecodeError::Truncated`.
//!   Use these for resource template decoding where `DecodeError` is the canonical error type.
//!
//! All numeric reads are **little-endian**. Offsets are `usize` and are interpreted relative to
//! the slice you pass in.

use crate::err::DecodeError;

/// Read `N` raw bytes at `offset`.
///
/// Returns `None` if the range is out of bounds.
pub(crate) fn read_array<const N: usize>(buf: &[u8], offset: usize) -> Option<[u8; N]> {
    let end = offset.checked_add(N)?;
    let bytes: [u8; N] = buf.get(offset..end)?.try_into().ok()?;
    Some(bytes)
}

/// Read a `u16` (little-endian) at `offset`.
pub(crate) fn read_u16_le(buf: &[u8], offset: usize) -> Option<u16> {
    Some(u16::from_le_bytes(read_array::<2>(buf, offset)?))
}

/// Read a `u32` (little-endian) at `offset`.
pub(crate) fn read_u32_le(buf: &[u8], offset: usize) -> Option<u32> {
    Some(u32::from_le_bytes(read_array::<4>(buf, offset)?))
}

#[inline]
pub(crate) fn truncated(what: &'static str, offset: usize, need: usize, len: usize) -> DecodeError {
    DecodeError::Truncated {
        what,
        offset: offset as u64,
        need,
        have: len.saturating_sub(offset),
    }
}

pub(crate) fn slice_r<'a>(
    buf: &'a [u8],
    offset: usize,
    len: usize,
    what: &'static str,
) -> Result<&'a [u8], DecodeError> {
    let end = offset
        .checked_add(len)
        .ok_or_else(|| truncated(what, offset, len, buf.len()))?;
    buf.get(offset..end)
        .ok_or_else(|| truncated(what, offset, len, buf.len()))
}

/// Read a `u16` (little-endian) at `offset`, or return `DecodeError::Truncated`.
pub(crate) fn read_u16_le_r(
    buf: &[u8],
    offset: usize,
    what: &'static str,
) -> Result<u16, DecodeError> {
    read_u16_le(buf, offset).ok_or_else(|| truncated(what, offset, 2, buf.len()))
}

/// Read a `u32` (little-endian) at `offset`, or return `DecodeError::Truncated`.
pub(crate) fn read_u32_le_r(
    buf: &[u8],
    offset: usize,
    what: &'static str,
) -> Result<u32, DecodeError> {
    read_u32_le(buf, offset).ok_or_else(|| truncated(what, offset, 4, buf.len()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reads_little_endian_values() {
        let buf = [0x34, 0x12, 0x78, 0x56, 0xff];
        assert_eq!(read_u16_le(&buf, 0), Some(0x1234));
        assert_eq!(read_u32_le(&buf, 0), Some(0x5678_1234));
        assert_eq!(read_u32_le(&buf, 2), None);
    }

    #[test]
    fn test_result_layer_reports_what_and_remaining() {
        let buf = [0u8; 3];
        match read_u32_le_r(&buf, 1, "item style") {
            Err(DecodeError::Truncated {
                what,
                offset,
                need,
                have,
            }) => {
                assert_eq!(what, "item style");
                assert_eq!(offset, 1);
                assert_eq!(need, 4);
                assert_eq!(have, 2);
            }
            other => panic!("expected truncation, got {:?}", other),
        }
    }

    #[test]
    fn test_slice_r_rejects_overflowing_ranges() {
        let buf = [0u8; 8];
        assert!(slice_r(&buf, usize::MAX, 2, "overflow").is_err());
        assert_eq!(slice_r(&buf, 8, 0, "eof").unwrap().len(), 0);
    }
}
