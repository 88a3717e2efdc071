//! Decoding of `RT_STRING` resources.
//!
//! String tables are stored in blocks of 16 strings. Block `B` (the resource id) holds the strings
//! `(B - 1) * 16 ..= (B - 1) * 16 + 15`; each one is a `u16` character count followed by that
//! many UTF-16 units, with no terminator. Unused slots are stored with a count of zero.

use crate::accelerator::strip_accelerators;
use crate::err::DecodeResult;
use crate::pe_resources::Resource;
use crate::resource_id::ResourceId;
use crate::text_record::{ItemId, RecordSink, TextRecord};
use crate::utils::{ByteCursor, escape_cr_lf_tab_nul};

use log::{trace, warn};

pub const STRINGS_PER_BLOCK: u32 = 16;

/// The string id of the first string of block `block_id`. Block 0 does not exist.
pub fn first_string_id(block_id: u16) -> Option<u32> {
    u32::from(block_id)
        .checked_sub(1)
        .map(|b| b * STRINGS_PER_BLOCK)
}

/// The block id holding `string_id`.
pub fn block_of(string_id: u32) -> u32 {
    string_id / STRINGS_PER_BLOCK + 1
}

/// Read all 16 strings of a block, unescaped. Empty slots are empty strings.
pub fn read_string_block(data: &[u8]) -> DecodeResult<Vec<String>> {
    let mut cursor = ByteCursor::new(data);
    let mut strings = Vec::with_capacity(STRINGS_PER_BLOCK as usize);

    for _ in 0..STRINGS_PER_BLOCK {
        let len = cursor.u16_named("string length")?;
        let units = cursor.utf16_units_by_byte_len(usize::from(len) * 2, "string text")?;
        strings.push(String::from_utf16_lossy(&units));
    }

    if cursor.remaining() > 0 {
        trace!("{} trailing bytes after string block", cursor.remaining());
    }
    Ok(strings)
}

/// Decode one string-table block, emitting every non-empty string in id order.
///
/// Named blocks (and the invalid block 0) cannot be mapped to string ids; they are skipped with a
/// warning and emit nothing.
pub fn decode_string_table(
    resource: &ResourceId,
    data: &[u8],
    sink: &mut impl RecordSink,
) -> DecodeResult<usize> {
    let Some(first_id) = resource.as_id().and_then(first_string_id) else {
        warn!("String table block {} has no numeric block id, skipping", resource);
        return Ok(0);
    };

    let mut emitted = 0;
    for (string_id, text) in (first_id..).zip(read_string_block(data)?) {
        if text.is_empty() {
            continue;
        }

        let raw_text = escape_cr_lf_tab_nul(&text);
        sink.emit(TextRecord {
            resource: resource.clone(),
            item: ItemId::Id(i64::from(string_id)),
            text: strip_accelerators(&raw_text),
            raw_text,
            type_label: None,
        });
        emitted += 1;
    }

    Ok(emitted)
}

/// Find string `string_id` among the blocks of a module's string table.
///
/// Returns `None` when the block does not exist or the string is empty.
pub fn lookup_string(blocks: &[Resource], string_id: u32) -> DecodeResult<Option<String>> {
    let block_id = block_of(string_id);
    let Some(block) = blocks
        .iter()
        .find(|r| r.id.as_id().map(u32::from) == Some(block_id))
    else {
        return Ok(None);
    };

    let index = (string_id % STRINGS_PER_BLOCK) as usize;
    let text = read_string_block(&block.data)?.swap_remove(index);
    Ok(Some(text).filter(|t| !t.is_empty()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::err::DecodeError;
    use pretty_assertions::assert_eq;

    fn block(strings: &[(usize, &str)]) -> Vec<u8> {
        let mut out = Vec::new();
        for slot in 0..STRINGS_PER_BLOCK as usize {
            let text = strings
                .iter()
                .find(|(ix, _)| *ix == slot)
                .map(|(_, s)| *s)
                .unwrap_or("");
            let units: Vec<u16> = text.encode_utf16().collect();
            out.extend_from_slice(&(units.len() as u16).to_le_bytes());
            for u in units {
                out.extend_from_slice(&u.to_le_bytes());
            }
        }
        out
    }

    #[test]
    fn test_string_ids_follow_block_id() {
        let data = block(&[(0, "&Open"), (3, "Line\r\nbreak\0x")]);
        let mut records: Vec<TextRecord> = Vec::new();
        let emitted = decode_string_table(&ResourceId::Id(2), &data, &mut records).unwrap();

        assert_eq!(emitted, 2);
        assert_eq!(records[0].item, ItemId::Id(16));
        assert_eq!(records[0].text, "Open");
        assert_eq!(records[0].raw_text, "&Open");
        assert_eq!(records[1].item, ItemId::Id(19));
        assert_eq!(records[1].raw_text, "Line\\r\\nbreak\\0x");
    }

    #[test]
    fn test_named_and_zero_blocks_are_skipped() {
        let data = block(&[(0, "x")]);
        let mut records: Vec<TextRecord> = Vec::new();
        assert_eq!(
            decode_string_table(&ResourceId::from("NAMED"), &data, &mut records).unwrap(),
            0
        );
        assert_eq!(
            decode_string_table(&ResourceId::Id(0), &data, &mut records).unwrap(),
            0
        );
        assert!(records.is_empty());
    }

    #[test]
    fn test_truncated_block() {
        let mut data = block(&[(15, "last")]);
        data.truncate(data.len() - 2);
        assert!(matches!(
            read_string_block(&data),
            Err(DecodeError::Truncated { .. })
        ));
    }

    #[test]
    fn test_lookup_string() {
        let blocks = vec![Resource {
            id: ResourceId::Id(7),
            lang_id: 0x0409,
            data: block(&[(5, "Hello\tworld")]),
        }];

        assert_eq!(
            lookup_string(&blocks, 101).unwrap(),
            Some("Hello\tworld".to_string())
        );
        assert_eq!(lookup_string(&blocks, 100).unwrap(), None);
        assert_eq!(lookup_string(&blocks, 5).unwrap(), None);
    }
}
