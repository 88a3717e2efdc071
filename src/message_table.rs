//! Decoding of `RT_MESSAGETABLE` resources (`MESSAGE_RESOURCE_DATA`).
//!
//! Layout:
//! - `u32` block count, then `count` blocks of `{ low_id: u32, high_id: u32, offset: u32 }`.
//! - Each block's `offset` (relative to the resource start) points at `high_id - low_id + 1`
//!   packed `MESSAGE_RESOURCE_ENTRY` records: `{ length: u16, flags: u16, text[length - 4] }`.
//!
//! Entries are walked purely by their declared length.

use crate::err::{DecodeError, DecodeResult};
use crate::resource_id::ResourceId;
use crate::text_record::{ItemId, RecordSink, TextRecord};
use crate::utils::{ByteCursor, escape_cr_lf_tab};

use encoding::{DecoderTrap, EncodingRef};
use log::{debug, trace, warn};

pub const MESSAGE_RESOURCE_UNICODE: u16 = 0x0001;
pub const MESSAGE_RESOURCE_UTF8: u16 = 0x0002;

pub const UTF8_PLACEHOLDER: &str = "[[[UTF-8 text (not supported)]]]";

const ENTRY_HEADER_LEN: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MessageBlock {
    pub low_id: u32,
    pub high_id: u32,
    pub entries_offset: u32,
}

impl MessageBlock {
    fn read(cursor: &mut ByteCursor<'_>) -> DecodeResult<Self> {
        Ok(MessageBlock {
            low_id: cursor.u32_named("message block low id")?,
            high_id: cursor.u32_named("message block high id")?,
            entries_offset: cursor.u32_named("message block offset")?,
        })
    }
}

/// Read the block directory at the start of a message table.
pub fn read_message_blocks(data: &[u8]) -> DecodeResult<Vec<MessageBlock>> {
    let mut cursor = ByteCursor::new(data);
    let count = cursor.u32_named("message block count")? as usize;
    // Each block is 12 bytes; reject absurd counts before allocating.
    if !cursor.in_bounds(count.saturating_mul(12)) {
        return Err(DecodeError::Truncated {
            what: "message block directory",
            offset: cursor.pos() as u64,
            need: count.saturating_mul(12),
            have: cursor.remaining(),
        });
    }

    let mut blocks = Vec::with_capacity(count);
    for _ in 0..count {
        blocks.push(MessageBlock::read(&mut cursor)?);
    }
    Ok(blocks)
}

/// Decode one message table, emitting one record per message id in directory order.
///
/// Returns the number of emitted records. An entry that starts outside of the resource aborts the
/// resource with `DecodeError::EntryOutOfBounds`; everything emitted before that stays with the sink.
pub fn decode_message_table(
    resource: &ResourceId,
    data: &[u8],
    ansi_codec: EncodingRef,
    sink: &mut impl RecordSink,
) -> DecodeResult<usize> {
    let blocks = read_message_blocks(data)?;
    debug!("Message table {}: {} blocks", resource, blocks.len());

    let mut emitted = 0;
    for block in blocks {
        trace!("Message table {}: {:?}", resource, block);
        let mut entry_offset = block.entries_offset as usize;

        for id in block.low_id..=block.high_id {
            if entry_offset >= data.len() {
                warn!(
                    "Message table {}: entry for message {} at offset {} is out of range",
                    resource, id, entry_offset
                );
                return Err(DecodeError::EntryOutOfBounds {
                    id,
                    offset: entry_offset as u64,
                    len: data.len(),
                });
            }

            let mut cursor = ByteCursor::with_pos(data, entry_offset, "message entry")?;
            let length = cursor.u16_named("message entry length")?;
            let flags = cursor.u16_named("message entry flags")?;
            if usize::from(length) < ENTRY_HEADER_LEN {
                return Err(DecodeError::InvalidEntryLength {
                    id,
                    offset: entry_offset as u64,
                    length,
                });
            }

            let payload_len = usize::from(length) - ENTRY_HEADER_LEN;
            let text = if flags & MESSAGE_RESOURCE_UNICODE != 0 {
                let mut units = cursor.utf16_units_by_byte_len(payload_len, "message text")?;
                while units.last() == Some(&0) {
                    units.pop();
                }
                escape_cr_lf_tab(&String::from_utf16_lossy(&units))
            } else if flags & MESSAGE_RESOURCE_UTF8 != 0 {
                cursor.advance(payload_len, "message text")?;
                UTF8_PLACEHOLDER.to_string()
            } else if flags == 0 {
                let mut payload = cursor.take_bytes(payload_len, "message text")?;
                while let [rest @ .., 0] = payload {
                    payload = rest;
                }
                let decoded = ansi_codec
                    .decode(payload, DecoderTrap::Replace)
                    .unwrap_or_else(|_| String::from_utf8_lossy(payload).into_owned());
                escape_cr_lf_tab(&decoded)
            } else {
                warn!(
                    "Message table {}: message {} has unexpected flags 0x{:04X}",
                    resource, id, flags
                );
                cursor.advance(payload_len, "message text")?;
                format!("[[[Unexpected flags value 0x{:04X}]]]", flags)
            };

            sink.emit(TextRecord {
                resource: resource.clone(),
                item: ItemId::Message(id),
                raw_text: text.clone(),
                text,
                type_label: None,
            });
            emitted += 1;

            entry_offset = cursor.pos();
        }
    }

    Ok(emitted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn entry(flags: u16, payload: &[u8]) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(&((payload.len() + 4) as u16).to_le_bytes());
        out.extend_from_slice(&flags.to_le_bytes());
        out.extend_from_slice(payload);
        out
    }

    fn table(low: u32, entries: &[Vec<u8>]) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(&1u32.to_le_bytes());
        out.extend_from_slice(&low.to_le_bytes());
        out.extend_from_slice(&(low + entries.len() as u32 - 1).to_le_bytes());
        out.extend_from_slice(&16u32.to_le_bytes());
        for e in entries {
            out.extend_from_slice(e);
        }
        out
    }

    fn decode(data: &[u8]) -> (DecodeResult<usize>, Vec<TextRecord>) {
        let mut records: Vec<TextRecord> = Vec::new();
        let res = decode_message_table(
            &ResourceId::Id(1),
            data,
            encoding::all::WINDOWS_1252,
            &mut records,
        );
        (res, records)
    }

    #[test]
    fn test_unicode_entry_trims_trailing_nul() {
        let ok: Vec<u8> = [b'O', 0, b'K', 0, 0, 0].to_vec();
        let data = table(0x1000, &[entry(MESSAGE_RESOURCE_UNICODE, &ok)]);
        assert_eq!(&data[16..18], &10u16.to_le_bytes());

        let (res, records) = decode(&data);
        assert_eq!(res.unwrap(), 1);
        assert_eq!(records[0].item, ItemId::Message(0x1000));
        assert_eq!(records[0].text, "OK");
        assert_eq!(records[0].raw_text, "OK");
        assert_eq!(records[0].type_label, None);
    }

    #[test]
    fn test_ansi_and_placeholders() {
        let data = table(
            7,
            &[
                entry(0, b"caf\xe9\r\n\0\0"),
                entry(MESSAGE_RESOURCE_UTF8, b"hi\0\0"),
                entry(0x0004, b"\0\0\0\0"),
            ],
        );

        let (res, records) = decode(&data);
        assert_eq!(res.unwrap(), 3);
        let texts: Vec<&str> = records.iter().map(|r| r.text.as_str()).collect();
        assert_eq!(
            texts,
            vec![
                "caf\u{e9}\\r\\n",
                UTF8_PLACEHOLDER,
                "[[[Unexpected flags value 0x0004]]]"
            ]
        );
        assert_eq!(records[2].item, ItemId::Message(9));
    }

    #[test]
    fn test_entry_out_of_bounds_keeps_earlier_records() {
        let mut data = table(1, &[entry(MESSAGE_RESOURCE_UNICODE, &[b'A', 0, 0, 0])]);
        // Claim a second message in the block with no entry behind it.
        data[8..12].copy_from_slice(&2u32.to_le_bytes());

        let (res, records) = decode(&data);
        assert!(matches!(
            res,
            Err(DecodeError::EntryOutOfBounds { id: 2, .. })
        ));
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].text, "A");
    }

    #[test]
    fn test_short_entry_length_is_rejected() {
        let mut data = table(1, &[entry(0, b"")]);
        data[16..18].copy_from_slice(&2u16.to_le_bytes());
        let (res, records) = decode(&data);
        assert!(matches!(
            res,
            Err(DecodeError::InvalidEntryLength { id: 1, length: 2, .. })
        ));
        assert!(records.is_empty());
    }
}
