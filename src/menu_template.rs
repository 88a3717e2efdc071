//! Decoding of `RT_MENU` resources (`MENUHEADER` + `NORMALMENUITEM`/`POPUPMENUITEM`, and
//! `MENUEX_TEMPLATE_HEADER` + `MENUEX_TEMPLATE_ITEM`).
//!
//! Neither layout is walked as a tree. Popups and their children (and the end-of-popup markers)
//! sit in one flat stream, which is scanned item by item until the resource runs out.
//!
//! References:
//! - <https://learn.microsoft.com/en-us/windows/win32/menurc/menuheader>
//! - <https://learn.microsoft.com/en-us/windows/win32/menurc/menuex-template-item>
//! - "The evolution of menu templates" (The Old New Thing)

use crate::accelerator::strip_accelerators;
use crate::err::{DecodeError, DecodeResult};
use crate::resource_id::ResourceId;
use crate::text_record::{ItemId, RecordSink, TextRecord};
use crate::utils::{ByteCursor, bytes, escape_cr_lf_tab};

use bitflags::bitflags;
use log::{debug, trace, warn};

/// `mtOption` of a classic menu item.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct MenuItemOptions(u16);

bitflags! {
    impl MenuItemOptions: u16 {
        const GRAYED = 0x0001;
        const DISABLED = 0x0002;
        const CHECKED = 0x0008;
        const POPUP = 0x0010;
        const END = 0x0080;
    }
}

/// `dwType` of an extended menu item.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct MenuItemType(u32);

bitflags! {
    impl MenuItemType: u32 {
        const BITMAP = 0x0000_0004;
        const OWNERDRAW = 0x0000_0100;
        const SEPARATOR = 0x0000_0800;
    }
}

/// `wFlags` of an extended menu item.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct MenuExFlags(u16);

bitflags! {
    impl MenuExFlags: u16 {
        /// A 4-byte help id header follows the text, then the submenu's items.
        const SUBMENU = 0x0001;
        const END = 0x0080;
    }
}

const EXTENDED_ITEMS_OFFSET: u16 = 4;
const SUBMENU_HEADER_LEN: usize = 4;
// type, state, id, flags
const EXTENDED_ITEM_HEADER_LEN: usize = 14;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum MenuVariant {
    Classic,
    Extended,
}

impl MenuVariant {
    /// The first unit of a menu template is its version: 0 for classic, 1 for extended.
    pub fn detect(data: &[u8]) -> DecodeResult<Self> {
        let version = bytes::read_u16_le_r(data, 0, "menu version")?;
        match version {
            0 => Ok(MenuVariant::Classic),
            1 => Ok(MenuVariant::Extended),
            version => Err(DecodeError::InvalidMenuVersion { version }),
        }
    }
}

/// Decode one menu resource, emitting every item with non-empty text in stream order.
///
/// An unknown version is reported as `DecodeError::InvalidMenuVersion` before anything is emitted.
pub fn decode_menu(
    resource: &ResourceId,
    data: &[u8],
    sink: &mut impl RecordSink,
) -> DecodeResult<MenuVariant> {
    let variant = MenuVariant::detect(data)?;
    debug!("Menu {}: {:?} template, {} bytes", resource, variant, data.len());

    match variant {
        MenuVariant::Classic => decode_classic_menu(resource, data, sink)?,
        MenuVariant::Extended => decode_extended_menu(resource, data, sink)?,
    }

    Ok(variant)
}

/// Keep scanning while the unit *after* the current one is still inside the resource.
#[inline]
fn has_more_items(cursor: &ByteCursor<'_>) -> bool {
    cursor.remaining() > 2
}

/// Fewer zero bytes than a fixed extended item header are left: the template is over.
fn is_trailing_padding(cursor: &ByteCursor<'_>) -> bool {
    let rest = cursor.rest();
    rest.len() < EXTENDED_ITEM_HEADER_LEN + 3 && rest.iter().all(|b| *b == 0)
}

/// Menu text up to (not including) the first tab; what follows a tab is the shortcut key text.
pub fn truncate_at_tab(text: &str) -> &str {
    match text.find('\t') {
        Some(ix) => &text[..ix],
        None => text,
    }
}

fn decode_classic_menu(
    resource: &ResourceId,
    data: &[u8],
    sink: &mut impl RecordSink,
) -> DecodeResult<()> {
    let mut cursor = ByteCursor::new(data);
    let _version = cursor.u16_named("menu version")?;
    let header_size = cursor.u16_named("menu header size")?;
    if header_size != 0 {
        warn!(
            "Menu {}: unexpected classic header size {}, expected 0",
            resource, header_size
        );
    }

    while has_more_items(&cursor) {
        let options = MenuItemOptions::from_bits_retain(cursor.u16_named("menu item options")?);
        let item = if options.contains(MenuItemOptions::POPUP) {
            ItemId::Popup
        } else {
            ItemId::Id(i64::from(cursor.u16_named("menu item id")?))
        };

        let text = cursor.null_terminated_utf16_string("menu item text")?;
        let visible = truncate_at_tab(&text);
        trace!("Menu {}: {:?} {:?} {:?}", resource, options, item, visible);

        if !visible.is_empty() {
            let raw_text = escape_cr_lf_tab(visible);
            sink.emit(TextRecord {
                resource: resource.clone(),
                item,
                text: strip_accelerators(&raw_text),
                raw_text,
                type_label: None,
            });
        }
    }

    Ok(())
}

fn decode_extended_menu(
    resource: &ResourceId,
    data: &[u8],
    sink: &mut impl RecordSink,
) -> DecodeResult<()> {
    let mut cursor = ByteCursor::new(data);
    let _version = cursor.u16_named("menu version")?;
    let items_offset = cursor.u16_named("menu items offset")?;
    let _help_id = cursor.u32_named("menu help id")?;
    if items_offset != EXTENDED_ITEMS_OFFSET {
        warn!(
            "Menu {}: unexpected extended items offset {}, expected {}",
            resource, items_offset, EXTENDED_ITEMS_OFFSET
        );
    }

    while has_more_items(&cursor) {
        if is_trailing_padding(&cursor) {
            trace!("Menu {}: {} bytes of trailing padding", resource, cursor.remaining());
            break;
        }
        cursor.align_to_4("menu item alignment")?;

        let item_type = MenuItemType::from_bits_retain(cursor.u32_named("menu item type")?);
        let _state = cursor.u32_named("menu item state")?;
        let id = cursor.u32_named("menu item id")?;
        let flags = MenuExFlags::from_bits_retain(cursor.u16_named("menu item flags")?);

        // Separators and bitmaps have no text field at all; the next item starts where the text
        // would have been (after alignment).
        if item_type.intersects(MenuItemType::SEPARATOR | MenuItemType::BITMAP) {
            trace!("Menu {}: item {} has no text ({:?})", resource, id, item_type);
            continue;
        }

        let text = cursor.null_terminated_utf16_string("menu item text")?;
        trace!("Menu {}: item {} {:?} {:?}", resource, id, flags, text);
        if !text.is_empty() {
            let raw_text = escape_cr_lf_tab(&text);
            sink.emit(TextRecord {
                resource: resource.clone(),
                item: ItemId::Id(i64::from(id as i32)),
                text: strip_accelerators(&raw_text),
                raw_text,
                type_label: None,
            });
        }

        if flags.contains(MenuExFlags::SUBMENU) {
            cursor.advance(SUBMENU_HEADER_LEN, "submenu header")?;
        }
    }

    Ok(())
}
