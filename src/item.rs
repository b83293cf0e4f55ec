//! Typed items stored in a joined archive.
//!
//! An [`Item`] is one of four kinds, fixed at construction time.  Encoding
//! turns it into a [`FileDescriptor`] plus a flat payload; decoding reverses
//! that from the descriptor alone.  [`Entry`] additionally offers cross-kind
//! reinterpretation of a stored payload (string as object, file as string, …).

use std::borrow::Cow;
use std::fmt;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{DecodeError, EncodeError, SizeError};
use crate::metadata::FileDescriptor;
use crate::text::TextScheme;

// ── ItemKind ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemKind {
    File,
    Blob,
    String,
    Object,
}

impl ItemKind {
    /// Wire name, as written in the descriptor's `type` field.
    pub fn name(self) -> &'static str {
        match self {
            ItemKind::File   => "file",
            ItemKind::Blob   => "blob",
            ItemKind::String => "string",
            ItemKind::Object => "object",
        }
    }
}

impl fmt::Display for ItemKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.name())
    }
}

// ── NamedFile ─────────────────────────────────────────────────────────────────

/// Raw bytes with a name and MIME type.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct NamedFile {
    pub name:      String,
    pub mime_type: String,
    pub bytes:     Vec<u8>,
}

impl NamedFile {
    pub fn new(name: impl Into<String>, mime_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self { name: name.into(), mime_type: mime_type.into(), bytes }
    }
}

// ── Item ──────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub enum Item {
    /// Named file, restored with its MIME type.
    File { name: String, mime_type: String, bytes: Vec<u8> },
    /// Raw bytes under a name; not restored as a typed file.
    Blob { name: String, mime_type: Option<String>, bytes: Vec<u8> },
    String { name: String, value: String },
    Object { name: String, value: Value },
}

impl Item {
    pub fn file(name: impl Into<String>, mime_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Item::File { name: name.into(), mime_type: mime_type.into(), bytes }
    }

    pub fn blob(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Item::Blob { name: name.into(), mime_type: None, bytes }
    }

    pub fn string(name: impl Into<String>, value: impl Into<String>) -> Self {
        Item::String { name: name.into(), value: value.into() }
    }

    pub fn json(name: impl Into<String>, value: Value) -> Self {
        Item::Object { name: name.into(), value }
    }

    /// Serialize any value into an object item.
    pub fn object<T: Serialize + ?Sized>(name: impl Into<String>, value: &T) -> Result<Self, serde_json::Error> {
        Ok(Item::Object { name: name.into(), value: serde_json::to_value(value)? })
    }

    pub fn name(&self) -> &str {
        match self {
            Item::File { name, .. }
            | Item::Blob { name, .. }
            | Item::String { name, .. }
            | Item::Object { name, .. } => name,
        }
    }

    pub fn kind(&self) -> ItemKind {
        match self {
            Item::File { .. }   => ItemKind::File,
            Item::Blob { .. }   => ItemKind::Blob,
            Item::String { .. } => ItemKind::String,
            Item::Object { .. } => ItemKind::Object,
        }
    }
}

impl From<NamedFile> for Item {
    fn from(f: NamedFile) -> Self {
        Item::File { name: f.name, mime_type: f.mime_type, bytes: f.bytes }
    }
}

// ── Encode / decode ───────────────────────────────────────────────────────────

/// Flatten `item` into its descriptor and payload.  Text-bearing kinds are
/// transcoded with `scheme`; file and blob bytes are borrowed as-is.
pub fn encode(item: &Item, scheme: TextScheme) -> Result<(FileDescriptor, Cow<'_, [u8]>), EncodeError> {
    let (mime_type, payload): (Option<String>, Cow<'_, [u8]>) = match item {
        Item::File { mime_type, bytes, .. } => (Some(mime_type.clone()), Cow::Borrowed(bytes.as_slice())),
        Item::Blob { mime_type, bytes, .. } => (mime_type.clone(), Cow::Borrowed(bytes.as_slice())),
        Item::String { value, .. }          => (None, Cow::Owned(scheme.encode(value))),
        Item::Object { value, .. }          => (None, Cow::Owned(scheme.encode(&serde_json::to_string(value)?))),
    };

    let size = u32::try_from(payload.len()).map_err(|_| SizeError::ItemTooLarge {
        name: item.name().to_owned(),
        size: payload.len() as u64,
    })?;

    Ok((FileDescriptor::new(item.name(), item.kind(), size, mime_type), payload))
}

/// Rebuild an item from its stored payload.  `scheme` is the text scheme of
/// the archive's format version.
pub fn decode(descriptor: &FileDescriptor, payload: &[u8], scheme: TextScheme) -> Result<Item, DecodeError> {
    Entry::new(descriptor, payload, scheme).parse()
}

// ── Entry ─────────────────────────────────────────────────────────────────────

/// A stored item: its descriptor plus the payload slice it describes.
#[derive(Debug, Clone, Copy)]
pub struct Entry<'a> {
    descriptor: &'a FileDescriptor,
    payload:    &'a [u8],
    scheme:     TextScheme,
}

impl<'a> Entry<'a> {
    pub fn new(descriptor: &'a FileDescriptor, payload: &'a [u8], scheme: TextScheme) -> Self {
        Self { descriptor, payload, scheme }
    }

    pub fn descriptor(&self) -> &'a FileDescriptor { self.descriptor }
    pub fn name(&self) -> &'a str { &self.descriptor.name }
    pub fn kind(&self) -> ItemKind { self.descriptor.kind }

    /// Decode into the item's own kind.
    pub fn parse(&self) -> Result<Item, DecodeError> {
        let d = self.descriptor;
        Ok(match d.kind {
            ItemKind::File => Item::File {
                name:      d.name.clone(),
                mime_type: d.mime_type.clone().unwrap_or_default(),
                bytes:     self.payload.to_vec(),
            },
            ItemKind::Blob => Item::Blob {
                name:      d.name.clone(),
                mime_type: d.mime_type.clone(),
                bytes:     self.payload.to_vec(),
            },
            ItemKind::String => Item::String { name: d.name.clone(), value: self.text()? },
            ItemKind::Object => Item::Object { name: d.name.clone(), value: self.object_value()? },
        })
    }

    /// Text view: strings as stored, objects re-stringified, file and blob
    /// bytes read as UTF-8.
    pub fn as_string(&self) -> Result<String, DecodeError> {
        match self.kind() {
            ItemKind::String => self.text(),
            ItemKind::Object => serde_json::to_string(&self.object_value()?)
                .map_err(|e| self.malformed(e)),
            ItemKind::File | ItemKind::Blob => self.utf8(),
        }
    }

    /// JSON view of any kind.
    pub fn as_object(&self) -> Result<Value, DecodeError> {
        match self.kind() {
            ItemKind::Object => self.object_value(),
            ItemKind::String => self.parse_json(&self.text()?),
            ItemKind::File | ItemKind::Blob => self.parse_json(&self.utf8()?),
        }
    }

    /// Deserialize the JSON view into `T`.
    pub fn as_value<T: DeserializeOwned>(&self) -> Result<T, DecodeError> {
        serde_json::from_value(self.as_object()?).map_err(|e| self.malformed(e))
    }

    /// The stored payload, untouched.
    pub fn as_bytes(&self) -> &'a [u8] { self.payload }

    /// Wrap the stored payload as a file under the stored name.
    pub fn as_file(&self) -> NamedFile {
        NamedFile {
            name:      self.descriptor.name.clone(),
            mime_type: self.descriptor.mime_type.clone().unwrap_or_default(),
            bytes:     self.payload.to_vec(),
        }
    }

    // ── helpers ───────────────────────────────────────────────────────────────

    fn text(&self) -> Result<String, DecodeError> {
        self.scheme.decode(self.payload).map_err(|e| self.malformed(e))
    }

    fn utf8(&self) -> Result<String, DecodeError> {
        TextScheme::Compact.decode(self.payload).map_err(|e| self.malformed(e))
    }

    fn object_value(&self) -> Result<Value, DecodeError> {
        self.parse_json(&self.text()?)
    }

    fn parse_json(&self, text: &str) -> Result<Value, DecodeError> {
        serde_json::from_str(text).map_err(|e| self.malformed(e))
    }

    fn malformed(&self, reason: impl fmt::Display) -> DecodeError {
        DecodeError::MalformedPayload {
            name:   self.descriptor.name.clone(),
            kind:   self.descriptor.kind,
            reason: reason.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn roundtrip(item: &Item, scheme: TextScheme) -> Item {
        let (descriptor, payload) = encode(item, scheme).unwrap();
        assert_eq!(descriptor.size as usize, payload.len());
        assert_eq!(descriptor.kind, item.kind());
        decode(&descriptor, &payload, scheme).unwrap()
    }

    #[test]
    fn decode_restores_every_kind() {
        let items = [
            Item::file("a.js", "text/javascript", b"let x = 1;".to_vec()),
            Item::blob("raw", vec![0, 255, 3]),
            Item::string("s", "héllo 😀"),
            Item::json("o", json!({ "k": [1, "é", null] })),
        ];
        for scheme in [TextScheme::Compact, TextScheme::Legacy] {
            for item in &items {
                assert_eq!(&roundtrip(item, scheme), item);
            }
        }
    }

    #[test]
    fn legacy_string_payload_is_four_bytes_per_char() {
        let item = Item::string("s", "ab");
        let (descriptor, payload) = encode(&item, TextScheme::Legacy).unwrap();
        assert_eq!(descriptor.size, 8);
        assert_eq!(&payload[..], &[b'a', 0, 0, 0, b'b', 0, 0, 0]);
    }

    #[test]
    fn decode_reports_malformed_object() {
        let descriptor = FileDescriptor::new("bad.json", ItemKind::Object, 5, None);
        match decode(&descriptor, b"{nope", TextScheme::Compact) {
            Err(DecodeError::MalformedPayload { name, kind, .. }) => {
                assert_eq!(name, "bad.json");
                assert_eq!(kind, ItemKind::Object);
            }
            other => panic!("expected MalformedPayload, got {other:?}"),
        }
    }
}
