pub(crate) mod byte_cursor;
pub(crate) mod bytes;
mod escape;

pub(crate) use self::byte_cursor::ByteCursor;
pub use self::escape::{escape_cr_lf_tab, escape_cr_lf_tab_nul};
