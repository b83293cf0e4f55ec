//! Text transcodings used by the container and pixel formats.
//!
//! Two schemes exist:
//!
//! - [`TextScheme::Compact`] — plain UTF-8.  Used by every tagged format version.
//! - [`TextScheme::Legacy`] — one little-endian `u32` per character.  Archives
//!   written before the versioned metadata object use it for the metadata
//!   itself and for text payloads.
//!
//! Both directions are available for both schemes so older layouts can still
//! be written.  Legacy decode also accepts UTF-16 surrogate pairs stored as two
//! separate units, which is how some historical writers stored astral
//! characters.

use byteorder::{ByteOrder, LittleEndian};
use std::string::FromUtf8Error;
use thiserror::Error;

/// Number of legacy code units decoded per batch.
pub const LEGACY_BATCH: usize = 256;

const UNIT: usize = 4;

#[derive(Error, Debug)]
pub enum TextError {
    #[error("Invalid UTF-8: {0}")]
    InvalidUtf8(#[from] FromUtf8Error),
    #[error("Legacy text length {len} is not a multiple of 4")]
    Misaligned { len: usize },
    #[error("Invalid code point 0x{value:x} at byte offset {offset}")]
    InvalidCodePoint { value: u32, offset: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextScheme {
    Compact,
    Legacy,
}

impl TextScheme {
    /// Scheme used for text payloads of an archive whose version tag is `tag`.
    /// An empty tag marks the pre-versioned layouts.
    pub fn for_version_tag(tag: &str) -> Self {
        if tag.is_empty() { TextScheme::Legacy } else { TextScheme::Compact }
    }

    pub fn encode(self, text: &str) -> Vec<u8> {
        match self {
            TextScheme::Compact => text.as_bytes().to_vec(),
            TextScheme::Legacy  => encode_legacy(text),
        }
    }

    pub fn decode(self, bytes: &[u8]) -> Result<String, TextError> {
        match self {
            TextScheme::Compact => Ok(String::from_utf8(bytes.to_vec())?),
            TextScheme::Legacy  => decode_legacy(bytes),
        }
    }
}

fn encode_legacy(text: &str) -> Vec<u8> {
    let units: Vec<u32> = text.chars().map(u32::from).collect();
    let mut out = vec![0u8; units.len() * UNIT];
    LittleEndian::write_u32_into(&units, &mut out);
    out
}

fn decode_legacy(bytes: &[u8]) -> Result<String, TextError> {
    if bytes.len() % UNIT != 0 {
        return Err(TextError::Misaligned { len: bytes.len() });
    }

    let mut out = String::with_capacity(bytes.len() / UNIT);
    let mut units = [0u32; LEGACY_BATCH];
    // (high surrogate, byte offset) awaiting its low half; may straddle batches.
    let mut pending: Option<(u32, usize)> = None;

    for (batch_idx, batch) in bytes.chunks(LEGACY_BATCH * UNIT).enumerate() {
        let n = batch.len() / UNIT;
        LittleEndian::read_u32_into(batch, &mut units[..n]);

        for (i, &unit) in units[..n].iter().enumerate() {
            let offset = (batch_idx * LEGACY_BATCH + i) * UNIT;

            if let Some((high, high_offset)) = pending.take() {
                if (0xDC00..=0xDFFF).contains(&unit) {
                    let scalar = 0x10000 + ((high - 0xD800) << 10) + (unit - 0xDC00);
                    out.push(to_char(scalar, high_offset)?);
                    continue;
                }
                return Err(TextError::InvalidCodePoint { value: high, offset: high_offset });
            }

            if (0xD800..=0xDBFF).contains(&unit) {
                pending = Some((unit, offset));
            } else {
                out.push(to_char(unit, offset)?);
            }
        }
    }

    match pending {
        Some((value, offset)) => Err(TextError::InvalidCodePoint { value, offset }),
        None => Ok(out),
    }
}

fn to_char(value: u32, offset: usize) -> Result<char, TextError> {
    char::from_u32(value).ok_or(TextError::InvalidCodePoint { value, offset })
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "asdas asd asd asde 2 ad asd asd asd啥地方 😀";

    #[test]
    fn compact_roundtrip() {
        let bytes = TextScheme::Compact.encode(SAMPLE);
        assert_eq!(bytes, SAMPLE.as_bytes());
        assert_eq!(TextScheme::Compact.decode(&bytes).unwrap(), SAMPLE);
    }

    #[test]
    fn legacy_roundtrip_spans_batches() {
        let text: String = SAMPLE.chars().cycle().take(LEGACY_BATCH * 3 + 7).collect();
        let bytes = TextScheme::Legacy.encode(&text);
        assert_eq!(bytes.len(), text.chars().count() * 4);
        assert_eq!(TextScheme::Legacy.decode(&bytes).unwrap(), text);
    }

    #[test]
    fn legacy_layout_is_one_u32_per_char() {
        assert_eq!(TextScheme::Legacy.encode("[é"), vec![b'[', 0, 0, 0, 0xE9, 0, 0, 0]);
    }

    #[test]
    fn legacy_accepts_surrogate_pairs() {
        // U+1F600 as the UTF-16 pair D83D DE00, one unit each.
        let mut bytes = Vec::new();
        for unit in [0x61u32, 0xD83D, 0xDE00] {
            bytes.extend_from_slice(&unit.to_le_bytes());
        }
        assert_eq!(TextScheme::Legacy.decode(&bytes).unwrap(), "a😀");
    }

    #[test]
    fn legacy_pair_across_batch_boundary() {
        let mut bytes = Vec::new();
        for _ in 0..LEGACY_BATCH - 1 {
            bytes.extend_from_slice(&0x41u32.to_le_bytes());
        }
        bytes.extend_from_slice(&0xD83Du32.to_le_bytes());
        bytes.extend_from_slice(&0xDE00u32.to_le_bytes());
        let text = TextScheme::Legacy.decode(&bytes).unwrap();
        assert!(text.ends_with('😀'));
        assert_eq!(text.chars().count(), LEGACY_BATCH);
    }

    #[test]
    fn legacy_rejects_lone_surrogate_and_misalignment() {
        let lone = 0xD800u32.to_le_bytes();
        assert!(matches!(
            TextScheme::Legacy.decode(&lone),
            Err(TextError::InvalidCodePoint { value: 0xD800, offset: 0 })
        ));
        assert!(matches!(
            TextScheme::Legacy.decode(&[1, 0, 0]),
            Err(TextError::Misaligned { len: 3 })
        ));
    }

    #[test]
    fn scheme_follows_version_tag() {
        assert_eq!(TextScheme::for_version_tag(""), TextScheme::Legacy);
        assert_eq!(TextScheme::for_version_tag("0.1.0"), TextScheme::Compact);
    }
}
