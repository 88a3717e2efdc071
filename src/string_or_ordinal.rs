use std::fmt;

/// Marks an ordinal in a `sz_Or_Ord` field.
pub const ORDINAL_MARKER: u16 = 0xFFFF;

/// A variable-length "string or ordinal" field of a dialog template.
///
/// The shape is fully determined by the first 16-bit unit:
/// - `0x0000` - [`StringOrOrdinal::Absent`], one unit.
/// - `0xFFFF` - [`StringOrOrdinal::Ordinal`], two units (marker + value).
/// - anything else - [`StringOrOrdinal::Text`], a NUL-terminated UTF-16 run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StringOrOrdinal {
    Absent,
    Ordinal(u16),
    Text(String),
}

impl StringOrOrdinal {
    /// Returns the inline text, if this field holds a non-empty string.
    pub fn text(&self) -> Option<&str> {
        match self {
            StringOrOrdinal::Text(s) if !s.is_empty() => Some(s),
            _ => None,
        }
    }

    /// Number of bytes this field occupies in the template.
    pub fn encoded_len(&self) -> usize {
        match self {
            StringOrOrdinal::Absent => 2,
            StringOrOrdinal::Ordinal(_) => 4,
            StringOrOrdinal::Text(s) => (s.encode_utf16().count() + 1) * 2,
        }
    }
}

impl fmt::Display for StringOrOrdinal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StringOrOrdinal::Absent => Ok(()),
            StringOrOrdinal::Ordinal(n) => write!(f, "#{}", n),
            StringOrOrdinal::Text(s) => f.write_str(s),
        }
    }
}
