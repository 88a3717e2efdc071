use crate::string_or_ordinal::StringOrOrdinal;
use std::borrow::Cow;

pub const BUTTON_CLASS: u16 = 0x0080;
pub const EDIT_CLASS: u16 = 0x0081;
pub const STATIC_CLASS: u16 = 0x0082;
pub const LIST_BOX_CLASS: u16 = 0x0083;
pub const SCROLL_BAR_CLASS: u16 = 0x0084;
pub const COMBO_BOX_CLASS: u16 = 0x0085;

// Button styles are an enumeration in the low nibble, not independent bits.
const BS_TYPEMASK: u32 = 0x0000_000F;
const BS_CHECKBOX: u32 = 0x0000_0002;
const BS_AUTOCHECKBOX: u32 = 0x0000_0003;
const BS_RADIOBUTTON: u32 = 0x0000_0004;
const BS_3STATE: u32 = 0x0000_0005;
const BS_AUTO3STATE: u32 = 0x0000_0006;
const BS_GROUPBOX: u32 = 0x0000_0007;
const BS_AUTORADIOBUTTON: u32 = 0x0000_0009;

/// Display label of a dialog control's window class.
///
/// Named classes are reported verbatim; predefined ordinals get a readable name, buttons are
/// refined by their style. An absent class yields an empty label.
pub fn control_class_label(class: &StringOrOrdinal, style: u32) -> Cow<'_, str> {
    match class {
        StringOrOrdinal::Text(name) => Cow::Borrowed(name),
        StringOrOrdinal::Ordinal(ordinal) => match *ordinal {
            BUTTON_CLASS => Cow::Borrowed(button_label(style)),
            EDIT_CLASS => Cow::Borrowed("Edit"),
            STATIC_CLASS => Cow::Borrowed("Static"),
            LIST_BOX_CLASS => Cow::Borrowed("List box"),
            SCROLL_BAR_CLASS => Cow::Borrowed("Scroll bar"),
            COMBO_BOX_CLASS => Cow::Borrowed("Combo box"),
            other => Cow::Owned(format!("Ordinal {}", other)),
        },
        StringOrOrdinal::Absent => Cow::Borrowed(""),
    }
}

fn button_label(style: u32) -> &'static str {
    match style & BS_TYPEMASK {
        BS_3STATE | BS_CHECKBOX | BS_AUTO3STATE | BS_AUTOCHECKBOX => "Checkbox",
        BS_RADIOBUTTON | BS_AUTORADIOBUTTON => "Radio button",
        BS_GROUPBOX => "Group box",
        _ => "Button",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn label(ordinal: u16, style: u32) -> String {
        control_class_label(&StringOrOrdinal::Ordinal(ordinal), style).into_owned()
    }

    #[test]
    fn test_buttons_are_refined_by_style() {
        // WS_CHILD | WS_VISIBLE | WS_TABSTOP on top of the button type.
        let window_bits = 0x5001_0000;
        assert_eq!(label(BUTTON_CLASS, window_bits), "Button");
        assert_eq!(label(BUTTON_CLASS, window_bits | 0x1), "Button");
        assert_eq!(label(BUTTON_CLASS, window_bits | BS_AUTOCHECKBOX), "Checkbox");
        assert_eq!(label(BUTTON_CLASS, BS_3STATE), "Checkbox");
        assert_eq!(label(BUTTON_CLASS, BS_RADIOBUTTON), "Radio button");
        assert_eq!(label(BUTTON_CLASS, window_bits | BS_AUTORADIOBUTTON), "Radio button");
        assert_eq!(label(BUTTON_CLASS, BS_GROUPBOX), "Group box");
    }

    #[test]
    fn test_predefined_classes() {
        assert_eq!(label(EDIT_CLASS, 0), "Edit");
        assert_eq!(label(STATIC_CLASS, BS_GROUPBOX), "Static");
        assert_eq!(label(LIST_BOX_CLASS, 0), "List box");
        assert_eq!(label(SCROLL_BAR_CLASS, 0), "Scroll bar");
        assert_eq!(label(COMBO_BOX_CLASS, 0), "Combo box");
    }

    #[test]
    fn test_unknown_ordinal() {
        assert_eq!(label(0x86, 0), "Ordinal 134");
    }

    #[test]
    fn test_named_class_is_verbatim() {
        let class = StringOrOrdinal::Text("SysListView32".to_string());
        assert_eq!(control_class_label(&class, BS_GROUPBOX), "SysListView32");
        assert_eq!(control_class_label(&StringOrOrdinal::Absent, 0), "");
    }
}
