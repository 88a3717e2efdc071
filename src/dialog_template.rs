//! Decoding of `RT_DIALOG` resources (`DLGTEMPLATE` and `DLGTEMPLATEEX`).
//!
//! Both layouts share the same shape:
//! header -> menu (`sz_Or_Ord`) -> window class (`sz_Or_Ord`) -> caption -> optional font block,
//! then `item_count` items, each starting on a 4-byte boundary:
//! fixed fields -> window class (`sz_Or_Ord`) -> title (`sz_Or_Ord`) -> extra data.
//!
//! References:
//! - <https://learn.microsoft.com/en-us/windows/win32/api/winuser/ns-winuser-dlgtemplate>
//! - <https://learn.microsoft.com/en-us/windows/win32/dlgbox/dlgtemplateex>
//! - "The evolution of dialog templates" (The Old New Thing)

use crate::accelerator::strip_accelerators;
use crate::control_class::control_class_label;
use crate::err::DecodeResult;
use crate::resource_id::ResourceId;
use crate::string_or_ordinal::{ORDINAL_MARKER, StringOrOrdinal};
use crate::text_record::{DIALOG_TYPE_LABEL, ItemId, RecordSink, TextRecord};
use crate::utils::{ByteCursor, bytes, escape_cr_lf_tab};

use bitflags::bitflags;
use log::{debug, trace};

/// Dialog style bits that decide whether a font block follows the caption.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct DialogStyle(u32);

bitflags! {
    impl DialogStyle: u32 {
        const FIXEDSYS = 0x0000_0008;
        const SETFONT = 0x0000_0040;
        const SHELLFONT = Self::SETFONT.bits() | Self::FIXEDSYS.bits();
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum DialogVariant {
    Classic,
    Extended,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DialogHeader {
    pub style: DialogStyle,
    pub extended_style: u32,
    pub item_count: u16,
    pub variant: DialogVariant,
}

impl DialogVariant {
    /// An extended template starts with `dlgVer == 1` followed by `signature == 0xFFFF`.
    ///
    /// Anything else is treated as a classic template; there is no other signature to check.
    pub fn detect(data: &[u8]) -> Self {
        match (bytes::read_u16_le(data, 0), bytes::read_u16_le(data, 2)) {
            (Some(1), Some(ORDINAL_MARKER)) => DialogVariant::Extended,
            _ => DialogVariant::Classic,
        }
    }
}

impl DialogHeader {
    fn read(cursor: &mut ByteCursor<'_>, variant: DialogVariant) -> DecodeResult<Self> {
        let (style, extended_style) = match variant {
            DialogVariant::Classic => {
                let style = cursor.u32_named("dialog style")?;
                let extended_style = cursor.u32_named("dialog extended style")?;
                (style, extended_style)
            }
            DialogVariant::Extended => {
                let _version = cursor.u16_named("dialog version")?;
                let _signature = cursor.u16_named("dialog signature")?;
                let _help_id = cursor.u32_named("dialog help id")?;
                let extended_style = cursor.u32_named("dialog extended style")?;
                let style = cursor.u32_named("dialog style")?;
                (style, extended_style)
            }
        };
        let item_count = cursor.u16_named("dialog item count")?;
        // x, y, cx, cy
        cursor.advance(8, "dialog position")?;

        Ok(DialogHeader {
            style: DialogStyle::from_bits_retain(style),
            extended_style,
            item_count,
            variant,
        })
    }

    fn has_typeface(&self) -> bool {
        match self.variant {
            DialogVariant::Classic => self.style.contains(DialogStyle::SETFONT),
            DialogVariant::Extended => self.style.intersects(DialogStyle::SHELLFONT),
        }
    }
}

/// Decode one dialog resource, emitting the caption (if any) and then every control that carries
/// inline text, in template order.
///
/// Every field read is bounds-checked against `data.len()`. On a truncated template the error is
/// returned and records emitted so far stay with the sink.
pub fn decode_dialog(
    resource: &ResourceId,
    data: &[u8],
    sink: &mut impl RecordSink,
) -> DecodeResult<DialogHeader> {
    let variant = DialogVariant::detect(data);
    let mut cursor = ByteCursor::new(data);
    let header = DialogHeader::read(&mut cursor, variant)?;
    debug!(
        "Dialog {}: {:?} template, style 0x{:08x}, {} items",
        resource,
        variant,
        header.style.bits(),
        header.item_count
    );

    let _menu = cursor.string_or_ordinal("dialog menu")?;
    let _class = cursor.string_or_ordinal("dialog class")?;

    let caption = cursor.null_terminated_utf16_string("dialog caption")?;
    if !caption.is_empty() {
        let raw_text = escape_cr_lf_tab(&caption);
        sink.emit(TextRecord {
            resource: resource.clone(),
            item: ItemId::Caption,
            text: strip_accelerators(&raw_text),
            raw_text,
            type_label: Some(DIALOG_TYPE_LABEL.to_string()),
        });
    }

    if variant == DialogVariant::Extended {
        // pointsize, weight, italic + charset
        cursor.advance(6, "dialog font")?;
    } else if header.has_typeface() {
        let _point_size = cursor.u16_named("dialog point size")?;
    }
    if header.has_typeface() {
        let _typeface = cursor.null_terminated_utf16_units("dialog typeface")?;
    }

    for index in 0..header.item_count {
        cursor.align_to_4("dialog item alignment")?;
        trace!("Dialog {}: item {} at offset {}", resource, index, cursor.pos());

        let (style, id) = match variant {
            DialogVariant::Classic => {
                let style = cursor.u32_named("item style")?;
                let _extended_style = cursor.u32_named("item extended style")?;
                cursor.advance(8, "item position")?;
                let id = cursor.u16_named("item id")?;
                (style, i64::from(id))
            }
            DialogVariant::Extended => {
                let _help_id = cursor.u32_named("item help id")?;
                let _extended_style = cursor.u32_named("item extended style")?;
                let style = cursor.u32_named("item style")?;
                cursor.advance(8, "item position")?;
                let id = cursor.u32_named("item id")?;
                (style, i64::from(id as i32))
            }
        };

        let class = cursor.string_or_ordinal("item class")?;
        let title = cursor.string_or_ordinal("item title")?;

        if let Some(title) = title.text() {
            let raw_text = escape_cr_lf_tab(title);
            sink.emit(TextRecord {
                resource: resource.clone(),
                item: ItemId::Id(id),
                text: strip_accelerators(&raw_text),
                raw_text,
                type_label: Some(control_class_label(&class, style).into_owned()),
            });
        } else if let StringOrOrdinal::Ordinal(ordinal) = title {
            trace!("Dialog {}: item {} has ordinal title {}", resource, id, ordinal);
        }

        let extra_count = cursor.u16_named("item extra count")?;
        cursor.advance(usize::from(extra_count / 2) * 2, "item extra data")?;
    }

    Ok(header)
}
