#![deny(unused_must_use)]
#![forbid(unsafe_code)]
// Don't allow dbg! prints in release.
#![cfg_attr(not(debug_assertions), deny(clippy::dbg_macro))]

pub use dialog_template::{DialogHeader, DialogStyle, DialogVariant, decode_dialog};
pub use extractor::{ExtractSettings, Extraction, Extractor, ResourceKind};
pub use indirect::IndirectString;
pub use menu_template::{MenuVariant, decode_menu};
pub use message_table::{MessageBlock, decode_message_table};
pub use output::{OutputFormat, RecordWriter};
pub use pe_resources::{Resource, resources_of_type};
pub use resource_id::ResourceId;
pub use string_or_ordinal::StringOrOrdinal;
pub use string_table::{decode_string_table, lookup_string};
pub use text_record::{ItemId, RecordSink, TextRecord};

pub mod accelerator;
pub mod control_class;
pub mod dialog_template;
pub mod err;
pub mod extractor;
pub mod indirect;
pub mod menu_template;
pub mod message_table;
pub mod output;
pub mod pe_resources;
pub mod string_table;
pub mod text_record;

mod resource_id;
mod string_or_ordinal;
mod utils;

pub use utils::{escape_cr_lf_tab, escape_cr_lf_tab_nul};

// For tests, we only initialize logging once.
#[cfg(test)]
use std::sync::Once;

#[cfg(test)]
static LOGGER_INIT: Once = Once::new();

// Rust runs the tests concurrently, so unless we synchronize logging access
// it will crash when attempting to run `cargo test` with some logging facilities.
#[cfg(test)]
pub fn ensure_env_logger_initialized() {
    use std::io::Write;

    LOGGER_INIT.call_once(|| {
        let mut builder = env_logger::Builder::from_default_env();
        builder
            .format(|buf, record| writeln!(buf, "[{}] - {}", record.level(), record.args()))
            .init();
    });
}
