//! Archive metadata: the descriptor list plus the format version tag.
//!
//! # Wire layouts
//!
//! Three historical layouts are readable; any of them can be written.
//!
//! | Version | JSON root | Metadata text | Text payloads |
//! |---|---|---|---|
//! | `LegacyArray` | bare descriptor array | legacy (u32 per char) | legacy |
//! | `Unversioned` | `{"files","md5","version":""}` | UTF-8 | legacy |
//! | `Tagged(v)` | `{"files","md5","version":v}` | UTF-8 | UTF-8 |
//!
//! # Layout detection
//! Compact JSON never contains a NUL byte, while the legacy encoding of the
//! opening bracket is `5B 00 00 00`.  Metadata byte 1 is therefore the
//! discriminant for the text transcoding.  The JSON root (array or object)
//! then selects the descriptor layout.  When compact parsing fails on text
//! that starts with `[`, a legacy re-decode is attempted as a last resort.

use log::warn;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::item::ItemKind;
use crate::text::{TextError, TextScheme};

/// Version tag written by this build.
pub const CURRENT_VERSION: &str = "0.1.0";

#[derive(Error, Debug)]
pub enum MetadataError {
    #[error("Text error: {0}")]
    Text(#[from] TextError),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Unexpected JSON root: expected array or object, found {0}")]
    UnexpectedRoot(&'static str),
}

// ── FileDescriptor ────────────────────────────────────────────────────────────

/// One archived item.  `start`/`end` are absolute buffer offsets resolved
/// by prefix-summing `size` in storage order; they are never serialized.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileDescriptor {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: ItemKind,
    pub size: u32,
    #[serde(rename = "mimeType", default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
    #[serde(skip)]
    pub start: u64,
    #[serde(skip)]
    pub end: u64,
}

impl FileDescriptor {
    pub fn new(name: impl Into<String>, kind: ItemKind, size: u32, mime_type: Option<String>) -> Self {
        Self { name: name.into(), kind, size, mime_type, start: 0, end: 0 }
    }
}

// ── FormatVersion ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormatVersion {
    /// Bare descriptor array in legacy text.
    LegacyArray,
    /// Object root with an empty version tag.
    Unversioned,
    Tagged(String),
}

impl Default for FormatVersion {
    fn default() -> Self { FormatVersion::current() }
}

impl FormatVersion {
    pub fn current() -> Self {
        FormatVersion::Tagged(CURRENT_VERSION.to_owned())
    }

    /// Map a stored object-root tag to a version.
    pub fn from_tag(tag: &str) -> Self {
        if tag.is_empty() {
            FormatVersion::Unversioned
        } else {
            FormatVersion::Tagged(tag.to_owned())
        }
    }

    /// The tag as stored; empty for both pre-versioned layouts.
    pub fn tag(&self) -> &str {
        match self {
            FormatVersion::LegacyArray | FormatVersion::Unversioned => "",
            FormatVersion::Tagged(tag) => tag,
        }
    }

    /// Transcoding of String and Object payloads.
    pub fn text_scheme(&self) -> TextScheme {
        TextScheme::for_version_tag(self.tag())
    }

    /// Transcoding of the metadata block itself.
    pub fn metadata_scheme(&self) -> TextScheme {
        match self {
            FormatVersion::LegacyArray => TextScheme::Legacy,
            _ => TextScheme::Compact,
        }
    }
}

// ── ArchiveMetadata ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ArchiveMetadata {
    pub descriptors: Vec<FileDescriptor>,
    pub version:     FormatVersion,
    /// Reserved; carried through but never computed or verified.
    pub checksum:    String,
}

#[derive(Serialize)]
struct WrappedRef<'a> {
    files:   &'a [FileDescriptor],
    md5:     &'a str,
    version: &'a str,
}

#[derive(Deserialize)]
struct Wrapped {
    #[serde(default)]
    files:   Vec<FileDescriptor>,
    #[serde(default)]
    md5:     String,
    #[serde(default)]
    version: String,
}

impl ArchiveMetadata {
    /// An empty tag is stored as `Unversioned`, the layout it reads back as.
    pub fn new(descriptors: Vec<FileDescriptor>, version: FormatVersion, checksum: impl Into<String>) -> Self {
        let version = match version {
            FormatVersion::Tagged(tag) => FormatVersion::from_tag(&tag),
            other => other,
        };
        Self { descriptors, version, checksum: checksum.into() }
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, serde_json::Error> {
        let json = match self.version {
            FormatVersion::LegacyArray => serde_json::to_string(&self.descriptors)?,
            _ => serde_json::to_string(&WrappedRef {
                files:   &self.descriptors,
                md5:     &self.checksum,
                version: self.version.tag(),
            })?,
        };
        Ok(self.version.metadata_scheme().encode(&json))
    }

    /// Parse a metadata block.  Offsets are left unresolved.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, MetadataError> {
        let scheme = detect_transcoding(bytes);
        let text = scheme.decode(bytes)?;

        match Self::from_json(&text) {
            Err(err) if scheme == TextScheme::Compact && text.trim_start().starts_with('[') => {
                warn!("metadata is a bare array but not valid compact JSON ({err}); retrying as legacy text");
                Self::from_json(&TextScheme::Legacy.decode(bytes)?)
            }
            result => result,
        }
    }

    fn from_json(text: &str) -> Result<Self, MetadataError> {
        match serde_json::from_str::<Value>(text)? {
            root @ Value::Array(_) => Ok(Self {
                descriptors: serde_json::from_value(root)?,
                version:     FormatVersion::LegacyArray,
                checksum:    String::new(),
            }),
            root @ Value::Object(_) => {
                let wrapped: Wrapped = serde_json::from_value(root)?;
                Ok(Self {
                    descriptors: wrapped.files,
                    version:     FormatVersion::from_tag(&wrapped.version),
                    checksum:    wrapped.md5,
                })
            }
            other => Err(MetadataError::UnexpectedRoot(json_type_name(&other))),
        }
    }

    /// Assign absolute `start`/`end` offsets, beginning at `base`.
    /// Returns the end of the last payload.
    pub fn resolve_offsets(&mut self, base: u64) -> u64 {
        let mut cursor = base;
        for d in &mut self.descriptors {
            d.start = cursor;
            d.end   = cursor + u64::from(d.size);
            cursor  = d.end;
        }
        cursor
    }

    /// Total payload bytes the descriptors claim.
    pub fn payload_len(&self) -> u64 {
        self.descriptors.iter().map(|d| u64::from(d.size)).sum()
    }
}

/// Transcoding of a metadata block, read from its byte 1.
pub fn detect_transcoding(bytes: &[u8]) -> TextScheme {
    if bytes.len() >= 4 && bytes.len() % 4 == 0 && bytes[1] == 0 {
        TextScheme::Legacy
    } else {
        TextScheme::Compact
    }
}

fn json_type_name(v: &Value) -> &'static str {
    match v {
        Value::Null      => "null",
        Value::Bool(_)   => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_)  => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Vec<FileDescriptor> {
        vec![
            FileDescriptor::new("a.txt", ItemKind::String, 2, None),
            FileDescriptor::new("photo.png", ItemKind::File, 10, Some("image/png".into())),
        ]
    }

    #[test]
    fn tagged_wire_format() {
        let meta = ArchiveMetadata::new(
            vec![FileDescriptor::new("a.txt", ItemKind::String, 2, None)],
            FormatVersion::current(),
            "",
        );
        let json = String::from_utf8(meta.to_bytes().unwrap()).unwrap();
        assert_eq!(
            json,
            r#"{"files":[{"name":"a.txt","type":"string","size":2}],"md5":"","version":"0.1.0"}"#
        );
    }

    #[test]
    fn each_layout_reads_back() {
        for version in [FormatVersion::LegacyArray, FormatVersion::Unversioned, FormatVersion::current()] {
            let meta = ArchiveMetadata::new(sample(), version.clone(), "");
            let parsed = ArchiveMetadata::from_bytes(&meta.to_bytes().unwrap()).unwrap();
            assert_eq!(parsed, meta, "{version:?}");
        }
    }

    #[test]
    fn detects_legacy_transcoding() {
        let legacy = ArchiveMetadata::new(sample(), FormatVersion::LegacyArray, "").to_bytes().unwrap();
        assert_eq!(&legacy[..4], &[b'[', 0, 0, 0]);
        assert_eq!(detect_transcoding(&legacy), TextScheme::Legacy);
        assert_eq!(detect_transcoding(b"{\"files\":[]}"), TextScheme::Compact);
        assert_eq!(detect_transcoding(b"[]"), TextScheme::Compact);
    }

    #[test]
    fn compact_bare_array_is_legacy_version() {
        let parsed = ArchiveMetadata::from_bytes(br#"[{"name":"x","type":"blob","size":3}]"#).unwrap();
        assert_eq!(parsed.version, FormatVersion::LegacyArray);
        assert_eq!(parsed.descriptors[0].kind, ItemKind::Blob);
    }

    #[test]
    fn unknown_fields_are_ignored() {
        let parsed = ArchiveMetadata::from_bytes(
            br#"{"files":[{"name":"x","type":"file","size":1,"start":4,"extra":{}}],"md5":"abc","version":"0.2.0"}"#,
        ).unwrap();
        assert_eq!(parsed.version, FormatVersion::Tagged("0.2.0".into()));
        assert_eq!(parsed.checksum, "abc");
        assert_eq!(parsed.descriptors[0].start, 0);
    }

    #[test]
    fn rejects_scalar_root() {
        assert!(matches!(
            ArchiveMetadata::from_bytes(b"42"),
            Err(MetadataError::UnexpectedRoot("number"))
        ));
    }

    #[test]
    fn offsets_are_prefix_sums() {
        let mut meta = ArchiveMetadata::new(sample(), FormatVersion::current(), "");
        let end = meta.resolve_offsets(100);
        assert_eq!((meta.descriptors[0].start, meta.descriptors[0].end), (100, 102));
        assert_eq!((meta.descriptors[1].start, meta.descriptors[1].end), (102, 112));
        assert_eq!(end, 112);
        assert_eq!(meta.payload_len(), 12);
    }

    #[test]
    fn empty_tag_is_stored_as_unversioned() {
        let meta = ArchiveMetadata::new(sample(), FormatVersion::Tagged(String::new()), "");
        assert_eq!(meta.version, FormatVersion::Unversioned);
        let parsed = ArchiveMetadata::from_bytes(&meta.to_bytes().unwrap()).unwrap();
        assert_eq!(parsed.version, meta.version);
        assert_eq!(parsed.descriptors, meta.descriptors);
    }
}
