use thiserror::Error;

use crate::item::ItemKind;

/// Failures while reading an archive or a pixel payload.  All are terminal
/// for the call that raised them; no partial result is ever returned.
#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("Corrupt metadata: {reason} (header declares {declared} bytes, buffer holds {available})")]
    CorruptMetadata { declared: u64, available: u64, reason: String },

    #[error("Truncated archive: item #{index} ({name:?}) spans {start}..{end}, buffer holds {available} bytes")]
    TruncatedArchive { index: usize, name: String, start: u64, end: u64, available: u64 },

    #[error("Trailing bytes: payload region ends at {expected}, buffer holds {available} bytes")]
    TrailingBytes { expected: u64, available: u64 },

    #[error("Malformed {kind} payload in {name:?}: {reason}")]
    MalformedPayload { name: String, kind: ItemKind, reason: String },

    #[error("Truncated pixel payload: header declares {declared} bytes, pixels carry {available}")]
    TruncatedPixelPayload { declared: u64, available: u64 },

    #[error("Invalid embedded filename ({len} bytes): {reason}")]
    InvalidPixelFilename { len: u32, reason: String },
}

/// Length limits of the on-wire formats.
#[derive(Error, Debug)]
pub enum SizeError {
    #[error("Payload too large: {size} bytes exceeds the {limit}-byte pixel ceiling")]
    PayloadTooLarge { size: u64, limit: u64 },

    #[error("Item {name:?} too large: {size} bytes does not fit a u32 length field")]
    ItemTooLarge { name: String, size: u64 },

    #[error("Metadata too large: {size} bytes does not fit a u32 length field")]
    MetadataTooLarge { size: u64 },
}

#[derive(Error, Debug)]
pub enum EncodeError {
    #[error(transparent)]
    Size(#[from] SizeError),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
