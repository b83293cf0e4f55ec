//! Joined archive: many typed items behind one length-prefixed metadata block.
//!
//! ```text
//! [0..4)              u32 LE  metadata byte length (M)
//! [4..4+M)            metadata (see `metadata`)
//! [4+M..)             item payloads, concatenated in descriptor order
//! ```
//!
//! ```
//! use pixjoin::container::{join, split};
//! use pixjoin::Item;
//!
//! let items = vec![
//!     Item::string("a.txt", "hi"),
//!     Item::json("b.json", serde_json::json!({ "x": 1 })),
//! ];
//! let archive = join(&items, Some("pair.data"))?;
//! assert_eq!(split(&archive.bytes, None)?, items);
//! assert_eq!(split(&archive.bytes, Some(&["a.txt"]))?, items[..1]);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use byteorder::{ByteOrder, LittleEndian};
use chrono::Utc;
use log::debug;

use crate::error::{DecodeError, EncodeError, SizeError};
use crate::item::{self, Entry, Item, NamedFile};
use crate::metadata::{ArchiveMetadata, FormatVersion};

/// Byte length of the metadata length prefix.
pub const LENGTH_PREFIX: usize = 4;
/// MIME type given to joined archives.
pub const ARCHIVE_MIME_TYPE: &str = "application/octet-stream";

// ── JoinOptions ───────────────────────────────────────────────────────────────

/// Configuration for [`join_with`].
#[derive(Debug, Clone, Default)]
pub struct JoinOptions {
    /// Layout to write.  Historical layouts stay writable for compatibility.
    pub version:  FormatVersion,
    /// Stored verbatim in the reserved checksum field.
    pub checksum: String,
}

// ── Join ──────────────────────────────────────────────────────────────────────

/// Join `items` into a named archive in the current layout.
/// Without a `filename`, the archive is named `<unix-millis>.data`.
pub fn join(items: &[Item], filename: Option<&str>) -> Result<NamedFile, EncodeError> {
    let bytes = join_with(items, &JoinOptions::default())?;
    let name  = filename.map_or_else(default_archive_name, str::to_owned);
    Ok(NamedFile::new(name, ARCHIVE_MIME_TYPE, bytes))
}

pub fn default_archive_name() -> String {
    format!("{}.data", Utc::now().timestamp_millis())
}

pub fn join_with(items: &[Item], opts: &JoinOptions) -> Result<Vec<u8>, EncodeError> {
    let scheme = opts.version.text_scheme();
    let mut descriptors = Vec::with_capacity(items.len());
    let mut payloads    = Vec::with_capacity(items.len());

    for it in items {
        let (descriptor, payload) = item::encode(it, scheme)?;
        descriptors.push(descriptor);
        payloads.push(payload);
    }

    let metadata   = ArchiveMetadata::new(descriptors, opts.version.clone(), opts.checksum.clone());
    let meta_bytes = metadata.to_bytes()?;
    let meta_len   = u32::try_from(meta_bytes.len())
        .map_err(|_| SizeError::MetadataTooLarge { size: meta_bytes.len() as u64 })?;

    let payload_len: usize = payloads.iter().map(|p| p.len()).sum();
    let mut out = Vec::with_capacity(LENGTH_PREFIX + meta_bytes.len() + payload_len);

    let mut prefix = [0u8; LENGTH_PREFIX];
    LittleEndian::write_u32(&mut prefix, meta_len);
    out.extend_from_slice(&prefix);
    out.extend_from_slice(&meta_bytes);
    for payload in &payloads {
        out.extend_from_slice(payload);
    }

    debug!(
        "joined {} item(s): metadata {} B, payload {} B, version {:?}",
        items.len(), meta_len, payload_len, opts.version
    );
    Ok(out)
}

// ── Parse ─────────────────────────────────────────────────────────────────────

/// Read the metadata block and resolve every descriptor's offsets.
/// Payload bounds are not checked here; see [`ArchiveView::open`].
pub fn parse_metadata(buffer: &[u8]) -> Result<ArchiveMetadata, DecodeError> {
    parse_resolved(buffer).map(|(metadata, _)| metadata)
}

/// Parsed metadata plus the offset where the payload region ends.
fn parse_resolved(buffer: &[u8]) -> Result<(ArchiveMetadata, u64), DecodeError> {
    let available = buffer.len() as u64;
    if buffer.len() < LENGTH_PREFIX {
        return Err(DecodeError::CorruptMetadata {
            declared: LENGTH_PREFIX as u64,
            available,
            reason: "buffer shorter than the length prefix".into(),
        });
    }

    let meta_len = u64::from(LittleEndian::read_u32(&buffer[..LENGTH_PREFIX]));
    let meta_end = LENGTH_PREFIX as u64 + meta_len;
    if meta_end > available {
        return Err(DecodeError::CorruptMetadata {
            declared: meta_len,
            available,
            reason: format!("metadata ends at {meta_end}, past the end of the buffer"),
        });
    }

    let mut metadata = ArchiveMetadata::from_bytes(&buffer[LENGTH_PREFIX..meta_end as usize])
        .map_err(|e| DecodeError::CorruptMetadata {
            declared: meta_len,
            available,
            reason: e.to_string(),
        })?;
    let payload_end = metadata.resolve_offsets(meta_end);
    Ok((metadata, payload_end))
}

// ── ArchiveView ───────────────────────────────────────────────────────────────

/// A parsed archive borrowing its buffer.  Every descriptor is known to lie
/// inside the buffer.
#[derive(Debug)]
pub struct ArchiveView<'a> {
    buffer:   &'a [u8],
    metadata: ArchiveMetadata,
}

impl<'a> ArchiveView<'a> {
    pub fn open(buffer: &'a [u8]) -> Result<Self, DecodeError> {
        let (metadata, payload_end) = parse_resolved(buffer)?;
        let available = buffer.len() as u64;

        if let Some((index, d)) = metadata.descriptors.iter().enumerate().find(|(_, d)| d.end > available) {
            return Err(DecodeError::TruncatedArchive {
                index,
                name: d.name.clone(),
                start: d.start,
                end: d.end,
                available,
            });
        }

        if payload_end < available {
            return Err(DecodeError::TrailingBytes { expected: payload_end, available });
        }

        debug!("opened archive: {} item(s), version {:?}", metadata.descriptors.len(), metadata.version);
        Ok(Self { buffer, metadata })
    }

    pub fn metadata(&self) -> &ArchiveMetadata { &self.metadata }
    pub fn version(&self) -> &FormatVersion { &self.metadata.version }
    pub fn len(&self) -> usize { self.metadata.descriptors.len() }
    pub fn is_empty(&self) -> bool { self.metadata.descriptors.is_empty() }

    /// Every stored item, in storage order.
    pub fn entries(&self) -> impl Iterator<Item = Entry<'_>> + '_ {
        let scheme = self.metadata.version.text_scheme();
        self.metadata.descriptors.iter().map(move |d| {
            Entry::new(d, &self.buffer[d.start as usize..d.end as usize], scheme)
        })
    }

    /// First stored item named `name`.
    pub fn entry(&self, name: &str) -> Option<Entry<'_>> {
        self.entries().find(|e| e.name() == name)
    }

    /// Decode the stored items, keeping only those named in `names` when given.
    pub fn split(&self, names: Option<&[&str]>) -> Result<Vec<Item>, DecodeError> {
        self.entries()
            .filter(|e| names.map_or(true, |names| names.contains(&e.name())))
            .map(|e| e.parse())
            .collect()
    }
}

/// Decode every item of `buffer`, or only those named in `names`.
pub fn split(buffer: &[u8], names: Option<&[&str]>) -> Result<Vec<Item>, DecodeError> {
    ArchiveView::open(buffer)?.split(names)
}
