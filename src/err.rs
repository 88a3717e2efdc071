use thiserror::Error;

pub type DecodeResult<T> = std::result::Result<T, DecodeError>;
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while walking a single resource blob.
///
/// None of these are fatal to the enclosing extraction: the driver logs them and moves on to the
/// next resource. Records emitted before the error was hit are kept.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error(
        "Offset {offset}: tried to read {need} bytes for `{what}`, but only {have} bytes remain"
    )]
    Truncated {
        what: &'static str,
        offset: u64,
        need: usize,
        have: usize,
    },

    #[error("Invalid menu template version `{version}`, expected 0 (classic) or 1 (extended)")]
    InvalidMenuVersion { version: u16 },

    #[error("Message {id}: entry at offset {offset} is outside of the resource ({len} bytes)")]
    EntryOutOfBounds { id: u32, offset: u64, len: usize },

    #[error("Message {id}: entry at offset {offset} declares an invalid length {length}")]
    InvalidEntryLength { id: u32, offset: u64, length: u16 },
}

/// Errors raised while locating resources inside a PE image.
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("input is not a valid PE file: {message}")]
    InvalidPe { message: &'static str },

    #[error("malformed PE file: {message}")]
    MalformedPe { message: &'static str },

    #[error("failed to map RVA 0x{rva:08x} to a file offset")]
    UnmappedRva { rva: u32 },

    #[error("resource directory is malformed: {message}")]
    MalformedResource { message: &'static str },

    #[error("failed to decode UTF-16 resource name")]
    InvalidResourceName,

    #[error("resource id {id} does not fit in 16 bits")]
    UnsupportedResourceId { id: u32 },
}

#[derive(Debug, Error)]
pub enum IndirectStringError {
    #[error("`{reference}` is not an indirect string reference (expected `@<module>,-<id>`)")]
    Malformed { reference: String },

    #[error("indirect string form `{reference}` is not supported offline")]
    Unsupported { reference: String },

    #[error("string {id} was not found in `{module}`")]
    NotFound { module: String, id: u32 },
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("An I/O error has occurred while reading `{path}`: {source}")]
    FailedToRead {
        path: String,
        source: std::io::Error,
    },

    #[error(transparent)]
    Extract(#[from] ExtractError),

    #[error("Failed to decode resource {resource}, caused by:\n\t{source}")]
    FailedToDecodeResource { resource: String, source: DecodeError },

    #[error(transparent)]
    Indirect(#[from] IndirectStringError),
}
