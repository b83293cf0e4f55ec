//! Join typed items into one binary archive, and carry any byte stream inside
//! the pixels of a lossless image.
//!
//! ```
//! use pixjoin::{container, Item, PixelCodec, PngSurface};
//!
//! let items = vec![Item::string("note.txt", "héllo"), Item::blob("raw", vec![0, 1, 2])];
//! let archive = container::join(&items, Some("bundle.data"))?;
//!
//! let codec = PixelCodec::default();
//! let mut surface = PngSurface::new();
//! let png = codec.encode(&mut surface, &archive.bytes, &archive.name)?;
//! let back = codec.decode(&mut surface, &png)?;
//!
//! assert_eq!(back.filename, "bundle.data");
//! assert_eq!(container::split(&back.bytes, None)?, items);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod error;
pub mod text;
pub mod item;
pub mod metadata;
pub mod container;
pub mod pixel;

pub use error::{DecodeError, EncodeError, SizeError};
pub use text::{TextError, TextScheme};
pub use item::{Entry, Item, ItemKind, NamedFile};
pub use metadata::{ArchiveMetadata, FileDescriptor, FormatVersion, CURRENT_VERSION};
pub use container::{join, join_with, parse_metadata, split, ArchiveView, JoinOptions};
pub use pixel::{PixelCodec, PixelError, PixelPayload, PixelSurface, PngSurface, RgbaFrame};
