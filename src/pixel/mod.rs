//! Pixel codec: pack a byte stream and its filename into RGBA pixels.
//!
//! # Stream layout
//! ```text
//! [0..4)        u32 LE  filename byte length (F)
//! [4..8)        u32 LE  payload byte length (P)
//! [8..8+F)      filename, UTF-8
//! [8+F..8+F+P)  payload
//! ```
//!
//! The stream is written 3 bytes per pixel into R, G, B in row-major order,
//! with A = 255 on every pixel.  The image is square with side
//! `floor(sqrt(len / 3)) + 1`.  Slots past the end of the stream are zero;
//! decode reads exactly the lengths from the header and ignores them.
//!
//! Compression is delegated to a [`PixelSurface`], which must be lossless.

pub mod surface;

use byteorder::{ByteOrder, LittleEndian};
use log::debug;
use thiserror::Error;

use crate::error::{DecodeError, SizeError};
use crate::item::NamedFile;
use crate::text::TextScheme;

pub use surface::{PixelSurface, PngSurface, SurfaceError, SurfaceGuard};

/// Largest payload accepted by default (a 6400×6400 image budget).
pub const MAX_PAYLOAD_BYTES: usize = 1024 * 200 * 200;
/// Byte length of the stream header.
pub const HEADER_LEN: usize = 8;
/// Stream bytes carried by one pixel.
pub const BYTES_PER_PIXEL: usize = 3;
const CHANNELS: usize = 4;
const OPAQUE: u8 = 255;

#[derive(Error, Debug)]
pub enum PixelError {
    #[error(transparent)]
    Size(#[from] SizeError),
    #[error(transparent)]
    Decode(#[from] DecodeError),
    #[error("Surface error: {0}")]
    Surface(#[from] SurfaceError),
    #[error("Surface format {format:?} is not lossless for 8-bit RGBA")]
    LossySurface { format: String },
}

// ── RgbaFrame ─────────────────────────────────────────────────────────────────

/// Raw RGBA pixels, row-major, 4 bytes per pixel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RgbaFrame {
    pub width:  u32,
    pub height: u32,
    pub data:   Vec<u8>,
}

impl RgbaFrame {
    /// Fully transparent black frame.
    pub fn new(width: u32, height: u32) -> Self {
        let len = width as usize * height as usize * CHANNELS;
        Self { width, height, data: vec![0u8; len] }
    }

    pub fn expected_len(&self) -> u64 {
        u64::from(self.width) * u64::from(self.height) * CHANNELS as u64
    }
}

/// Decoded stream contents.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PixelPayload {
    pub filename: String,
    pub bytes:    Vec<u8>,
}

/// Side of the square image holding a stream of `stream_len` bytes.
pub fn side_for(stream_len: usize) -> u32 {
    ((stream_len / BYTES_PER_PIXEL).isqrt() + 1) as u32
}


// ── PixelCodec ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct PixelCodec {
    /// Payloads longer than this are rejected before any pixel work.
    pub max_payload: usize,
}

impl Default for PixelCodec {
    fn default() -> Self {
        Self { max_payload: MAX_PAYLOAD_BYTES }
    }
}

impl PixelCodec {
    pub fn with_max_payload(max_payload: usize) -> Self {
        Self { max_payload }
    }

    /// Build the pixel frame for `payload` named `filename`.
    pub fn pack(&self, payload: &[u8], filename: &str) -> Result<RgbaFrame, SizeError> {
        if payload.len() > self.max_payload {
            return Err(SizeError::PayloadTooLarge {
                size:  payload.len() as u64,
                limit: self.max_payload as u64,
            });
        }

        let name = TextScheme::Compact.encode(filename);
        let name_len = u32::try_from(name.len()).map_err(|_| SizeError::ItemTooLarge {
            name: filename.to_owned(),
            size: name.len() as u64,
        })?;
        // Bounded by max_payload, which callers keep well under u32::MAX.
        let payload_len = u32::try_from(payload.len()).map_err(|_| SizeError::PayloadTooLarge {
            size:  payload.len() as u64,
            limit: u64::from(u32::MAX),
        })?;

        let mut stream = Vec::with_capacity(HEADER_LEN + name.len() + payload.len());
        let mut header = [0u8; HEADER_LEN];
        LittleEndian::write_u32_into(&[name_len, payload_len], &mut header);
        stream.extend_from_slice(&header);
        stream.extend_from_slice(&name);
        stream.extend_from_slice(payload);

        let side = side_for(stream.len());
        let mut frame = RgbaFrame::new(side, side);
        for px in frame.data.chunks_exact_mut(CHANNELS) {
            px[3] = OPAQUE;
        }
        for (px, rgb) in frame.data.chunks_exact_mut(CHANNELS).zip(stream.chunks(BYTES_PER_PIXEL)) {
            px[..rgb.len()].copy_from_slice(rgb);
        }

        debug!("packed {} B stream ({:?}) into {side}x{side} pixels", stream.len(), filename);
        Ok(frame)
    }

    /// Recover the payload and filename from a frame of any dimensions.
    pub fn unpack(frame: &RgbaFrame) -> Result<PixelPayload, DecodeError> {
        let stream: Vec<u8> = frame.data
            .chunks_exact(CHANNELS)
            .flat_map(|px| &px[..BYTES_PER_PIXEL])
            .copied()
            .collect();
        let available = stream.len() as u64;

        if stream.len() < HEADER_LEN {
            return Err(DecodeError::TruncatedPixelPayload { declared: HEADER_LEN as u64, available });
        }
        let mut lens = [0u32; 2];
        LittleEndian::read_u32_into(&stream[..HEADER_LEN], &mut lens);
        let [name_len, payload_len] = lens;

        let declared = HEADER_LEN as u64 + u64::from(name_len) + u64::from(payload_len);
        if declared > available {
            return Err(DecodeError::TruncatedPixelPayload { declared, available });
        }

        let name_end = HEADER_LEN + name_len as usize;
        let filename = TextScheme::Compact.decode(&stream[HEADER_LEN..name_end])
            .map_err(|e| DecodeError::InvalidPixelFilename { len: name_len, reason: e.to_string() })?;
        let bytes = stream[name_end..name_end + payload_len as usize].to_vec();

        debug!("unpacked {} B payload ({:?}) from {}x{} pixels", bytes.len(), filename, frame.width, frame.height);
        Ok(PixelPayload { filename, bytes })
    }

    /// Pack and compress.  The size ceiling is checked before the surface is
    /// touched; a lossy surface is refused outright.
    pub fn encode<S: PixelSurface + ?Sized>(
        &self,
        surface:  &mut S,
        payload:  &[u8],
        filename: &str,
    ) -> Result<Vec<u8>, PixelError> {
        let frame = self.pack(payload, filename)?;
        if !surface.is_lossless() {
            return Err(PixelError::LossySurface { format: surface.extension().to_owned() });
        }

        let mut guard = SurfaceGuard::acquire(surface, frame.width, frame.height);
        guard.put_frame(&frame)?;
        Ok(guard.encode()?)
    }

    /// Encode a file into an image file.  The embedded filename defaults to
    /// the file's own name; the image is named `<filename>.<ext>`.
    pub fn encode_file<S: PixelSurface + ?Sized>(
        &self,
        surface:  &mut S,
        file:     &NamedFile,
        filename: Option<&str>,
    ) -> Result<NamedFile, PixelError> {
        let filename = filename.unwrap_or(&file.name);
        let image = self.encode(surface, &file.bytes, filename)?;
        let ext = surface.extension();
        Ok(NamedFile::new(format!("{filename}.{ext}"), format!("image/{ext}"), image))
    }

    /// Decompress an image and recover its payload.
    pub fn decode<S: PixelSurface + ?Sized>(&self, surface: &mut S, image: &[u8]) -> Result<PixelPayload, PixelError> {
        let mut guard = SurfaceGuard::acquire(surface, 0, 0);
        guard.draw_image(image)?;
        let frame = guard.frame();
        Ok(Self::unpack(&frame)?)
    }

    /// Decode an image back into the file it carries.
    pub fn decode_file<S: PixelSurface + ?Sized>(&self, surface: &mut S, image: &[u8]) -> Result<NamedFile, PixelError> {
        let payload = self.decode(surface, image)?;
        Ok(NamedFile::new(payload.filename, "", payload.bytes))
    }
}
