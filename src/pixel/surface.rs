//! Pixel surface capability and the PNG-backed reference surface.
//!
//! A surface is an exclusively owned drawing target.  Codec operations take
//! it as `&mut` for their whole duration through a [`SurfaceGuard`], which
//! sizes it on acquisition and shrinks it back to 0×0 on every exit path.

use std::ops::{Deref, DerefMut};

use image::codecs::png::PngEncoder;
use image::{ExtendedColorType, ImageEncoder, RgbaImage};
use thiserror::Error;

use super::RgbaFrame;

#[derive(Error, Debug)]
pub enum SurfaceError {
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),
    #[error("Frame holds {len} bytes, {width}x{height} RGBA needs {expected}")]
    FrameSize { width: u32, height: u32, len: usize, expected: u64 },
}

pub trait PixelSurface {
    /// Resize to `width`×`height` with every channel cleared to zero.
    fn reset(&mut self, width: u32, height: u32);
    /// Replace the contents with `frame`, taking its dimensions.
    fn put_frame(&mut self, frame: &RgbaFrame) -> Result<(), SurfaceError>;
    /// Decode a compressed image and draw it, taking its dimensions.
    fn draw_image(&mut self, image: &[u8]) -> Result<(), SurfaceError>;
    /// Current contents as raw RGBA.
    fn frame(&self) -> RgbaFrame;
    /// Compress the current contents.
    fn encode(&self) -> Result<Vec<u8>, SurfaceError>;
    /// Whether `encode` reproduces every 8-bit RGBA channel exactly.
    fn is_lossless(&self) -> bool;
    /// File extension of the compressed format, without the dot.
    fn extension(&self) -> &str;
}

// ── SurfaceGuard ──────────────────────────────────────────────────────────────

/// Exclusive lease on a surface for one codec operation.
pub struct SurfaceGuard<'s, S: PixelSurface + ?Sized> {
    surface: &'s mut S,
}

impl<'s, S: PixelSurface + ?Sized> SurfaceGuard<'s, S> {
    pub fn acquire(surface: &'s mut S, width: u32, height: u32) -> Self {
        surface.reset(width, height);
        Self { surface }
    }
}

impl<S: PixelSurface + ?Sized> Deref for SurfaceGuard<'_, S> {
    type Target = S;
    fn deref(&self) -> &S { &*self.surface }
}

impl<S: PixelSurface + ?Sized> DerefMut for SurfaceGuard<'_, S> {
    fn deref_mut(&mut self) -> &mut S { &mut *self.surface }
}

impl<S: PixelSurface + ?Sized> Drop for SurfaceGuard<'_, S> {
    fn drop(&mut self) {
        self.surface.reset(0, 0);
    }
}

// ── PngSurface ────────────────────────────────────────────────────────────────

/// In-memory surface that compresses to PNG (always lossless for RGBA8).
#[derive(Debug, Clone)]
pub struct PngSurface {
    canvas: RgbaImage,
}

impl Default for PngSurface {
    fn default() -> Self { Self::new() }
}

impl PngSurface {
    pub fn new() -> Self {
        Self { canvas: RgbaImage::new(0, 0) }
    }

    pub fn width(&self) -> u32 { self.canvas.width() }
    pub fn height(&self) -> u32 { self.canvas.height() }
}

impl PixelSurface for PngSurface {
    fn reset(&mut self, width: u32, height: u32) {
        self.canvas = RgbaImage::new(width, height);
    }

    fn put_frame(&mut self, frame: &RgbaFrame) -> Result<(), SurfaceError> {
        let expected = frame.expected_len();
        self.canvas = RgbaImage::from_raw(frame.width, frame.height, frame.data.clone())
            .ok_or(SurfaceError::FrameSize {
                width:  frame.width,
                height: frame.height,
                len:    frame.data.len(),
                expected,
            })?;
        Ok(())
    }

    fn draw_image(&mut self, image: &[u8]) -> Result<(), SurfaceError> {
        self.canvas = image::load_from_memory(image)?.to_rgba8();
        Ok(())
    }

    fn frame(&self) -> RgbaFrame {
        RgbaFrame {
            width:  self.canvas.width(),
            height: self.canvas.height(),
            data:   self.canvas.as_raw().clone(),
        }
    }

    fn encode(&self) -> Result<Vec<u8>, SurfaceError> {
        let mut out = Vec::new();
        PngEncoder::new(&mut out).write_image(
            self.canvas.as_raw(),
            self.canvas.width(),
            self.canvas.height(),
            ExtendedColorType::Rgba8,
        )?;
        Ok(out)
    }

    fn is_lossless(&self) -> bool { true }

    fn extension(&self) -> &str { "png" }
}
