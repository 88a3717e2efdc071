use crate::resource_id::ResourceId;
use serde::{Serialize, Serializer};
use std::fmt;

/// Label used instead of a control id for a dialog's caption row.
pub const CAPTION_SENTINEL: &str = "[Caption]";
/// Type label of a dialog's caption row.
pub const DIALOG_TYPE_LABEL: &str = "[Dialog]";
/// Label used instead of a command id for classic popup menu items.
pub const POPUP_SENTINEL: &str = "n/a";

/// Identifies the text's item within a resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ItemId {
    /// The caption of a dialog.
    Caption,
    /// A classic popup menu item, which has no command id.
    Popup,
    /// A dialog control id, menu command id or string id.
    ///
    /// Extended templates store 32-bit ids that are reported as signed values.
    Id(i64),
    /// A message table id, reported in decimal and hexadecimal.
    Message(u32),
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ItemId::Caption => f.write_str(CAPTION_SENTINEL),
            ItemId::Popup => f.write_str(POPUP_SENTINEL),
            ItemId::Id(id) => write!(f, "{}", id),
            ItemId::Message(id) => write!(f, "{}", id),
        }
    }
}

impl Serialize for ItemId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            ItemId::Caption => serializer.serialize_str(CAPTION_SENTINEL),
            ItemId::Popup => serializer.serialize_str(POPUP_SENTINEL),
            ItemId::Id(id) => serializer.serialize_i64(*id),
            ItemId::Message(id) => serializer.serialize_u32(*id),
        }
    }
}

/// One piece of localizable text found in a resource.
///
/// Dialog, menu and string table text is only emitted when non-empty; message tables emit one
/// record per id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TextRecord {
    pub resource: ResourceId,
    pub item: ItemId,
    /// Text with accelerator markup removed.
    pub text: String,
    /// Text as stored in the resource (control characters escaped).
    pub raw_text: String,
    /// Control class for dialog items, `[Dialog]` for captions, absent otherwise.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub type_label: Option<String>,
}

/// Receives records in byte-stream traversal order.
pub trait RecordSink {
    fn emit(&mut self, record: TextRecord);
}

impl RecordSink for Vec<TextRecord> {
    fn emit(&mut self, record: TextRecord) {
        self.push(record);
    }
}
