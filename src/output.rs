use crate::extractor::ResourceKind;
use crate::text_record::{ItemId, TextRecord};

use std::fmt;
use std::io::{self, Write};
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// Tab-delimited text with one header line.
    #[default]
    Tsv,
    /// One JSON object per line.
    JsonLines,
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "tsv" => Ok(OutputFormat::Tsv),
            "jsonl" => Ok(OutputFormat::JsonLines),
            other => Err(format!("unknown output format `{}`", other)),
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputFormat::Tsv => f.write_str("tsv"),
            OutputFormat::JsonLines => f.write_str("jsonl"),
        }
    }
}

/// Column names of the TSV header line for `kind`.
pub fn tsv_header(kind: ResourceKind) -> &'static str {
    match kind {
        ResourceKind::Dialogs => "Dialog ID\tCtrl ID\tLocalized text\tDialog text\tCtrl Type",
        ResourceKind::Menus => "Menu ID\tCtrl ID\tLocalized text\tDialog text",
        ResourceKind::Messages => "Msg ID\tMsg ID (hex)\tLocalized text",
        ResourceKind::Strings => "String ID\tLocalized text\tOrig localized text",
    }
}

/// Writes the records of a single resource kind.
pub struct RecordWriter<W: Write> {
    writer: W,
    kind: ResourceKind,
    format: OutputFormat,
}

impl<W: Write> RecordWriter<W> {
    pub fn new(writer: W, kind: ResourceKind, format: OutputFormat) -> Self {
        RecordWriter {
            writer,
            kind,
            format,
        }
    }

    /// Writes the header line (TSV only).
    pub fn write_header(&mut self) -> io::Result<()> {
        match self.format {
            OutputFormat::Tsv => writeln!(self.writer, "{}", tsv_header(self.kind)),
            OutputFormat::JsonLines => Ok(()),
        }
    }

    pub fn write_record(&mut self, record: &TextRecord) -> io::Result<()> {
        match self.format {
            OutputFormat::Tsv => self.write_tsv(record),
            OutputFormat::JsonLines => {
                serde_json::to_writer(&mut self.writer, record)?;
                self.writer.write_all(b"\n")
            }
        }
    }

    fn write_tsv(&mut self, record: &TextRecord) -> io::Result<()> {
        let w = &mut self.writer;
        match self.kind {
            ResourceKind::Dialogs => writeln!(
                w,
                "{}\t{}\t{}\t{}\t{}",
                record.resource,
                record.item,
                record.text,
                record.raw_text,
                record.type_label.as_deref().unwrap_or_default()
            ),
            ResourceKind::Menus => writeln!(
                w,
                "{}\t{}\t{}\t{}",
                record.resource, record.item, record.text, record.raw_text
            ),
            ResourceKind::Messages => match record.item {
                ItemId::Message(id) => writeln!(w, "{}\t0x{:08X}\t{}", id, id, record.text),
                ref other => writeln!(w, "{}\t\t{}", other, record.text),
            },
            ResourceKind::Strings => writeln!(
                w,
                "{}\t{}\t{}",
                record.item, record.text, record.raw_text
            ),
        }
    }

    pub fn flush(&mut self) -> io::Result<()> {
        self.writer.flush()
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}
