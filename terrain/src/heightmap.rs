//! Decoded Terrarium heightmap tiles.
//!
//! Terrarium tiles are 256×256 PNG images whose red, green and blue channels
//! pack an elevation as `R·256 + G + B/256 - 32768` meters. This module holds
//! the decoded pixel buffer ([`TileBuffer`]), the image-decoding seam
//! ([`TileDecoder`]) and the elevation formula itself.

use std::fmt;

use image::ImageFormat;

use crate::error::{Result, TerrainError};
use crate::tile::Tile;

/// Width and height of a heightmap tile in pixels.
pub const TILE_PIXELS: usize = 256;

/// Bytes per pixel in a decoded buffer (red, green, blue, alpha).
pub const BYTES_PER_PIXEL: usize = 4;

/// Bytes per row in a decoded buffer.
pub const TILE_STRIDE: usize = TILE_PIXELS * BYTES_PER_PIXEL; // 1,024 bytes

/// Total size of a decoded buffer.
pub const TILE_BUFFER_LEN: usize = TILE_STRIDE * TILE_PIXELS; // 262,144 bytes

/// Offset subtracted from the packed channel value.
pub const TERRARIUM_OFFSET: f64 = 32768.0;

/// Decodes a Terrarium-encoded pixel into meters.
///
/// # Examples
///
/// ```
/// use terrain::heightmap::terrarium_meters;
///
/// assert_eq!(terrarium_meters(128, 0, 0), 0.0);
/// assert_eq!(terrarium_meters(0, 0, 0), -32768.0);
/// ```
pub fn terrarium_meters(red: u8, green: u8, blue: u8) -> f64 {
    (f64::from(red) * 256.0 + f64::from(green) + f64::from(blue) / 256.0) - TERRARIUM_OFFSET
}

/// Raw output of an image decoder.
#[derive(Clone, PartialEq, Eq)]
pub struct DecodedImage {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Bytes between the starts of consecutive rows.
    pub stride: usize,
    /// Non-premultiplied RGBA samples, row-major from the top-left.
    pub pixels: Vec<u8>,
}

impl fmt::Debug for DecodedImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DecodedImage")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("stride", &self.stride)
            .field("len", &self.pixels.len())
            .finish()
    }
}

/// Turns fetched tile bytes into an RGBA pixel buffer.
///
/// This abstraction allows for dependency injection and easier testing by
/// swapping the image codec.
pub trait TileDecoder: Send + Sync {
    /// Decodes `bytes`, returning a human-readable reason on failure.
    fn decode(&self, bytes: &[u8]) -> std::result::Result<DecodedImage, String>;
}

/// PNG decoder backed by the `image` crate.
///
/// Any PNG color type is converted to 8-bit non-premultiplied RGBA.
#[derive(Debug, Clone, Copy, Default)]
pub struct PngDecoder;

impl TileDecoder for PngDecoder {
    fn decode(&self, bytes: &[u8]) -> std::result::Result<DecodedImage, String> {
        let img = image::load_from_memory_with_format(bytes, ImageFormat::Png)
            .map_err(|e| format!("image decode error: {}", e))?;
        let rgba = img.to_rgba8();
        let (width, height) = rgba.dimensions();

        Ok(DecodedImage {
            width,
            height,
            stride: width as usize * BYTES_PER_PIXEL,
            pixels: rgba.into_raw(),
        })
    }
}

/// A decoded 256×256 RGBA heightmap tile.
///
/// Buffers are immutable once built; the cache hands them out behind an
/// `Arc` so readers keep a valid buffer even after it is evicted.
#[derive(Clone, PartialEq, Eq)]
pub struct TileBuffer {
    pixels: Box<[u8]>,
}

impl TileBuffer {
    /// Validates a decoded image and wraps its pixels.
    ///
    /// # Errors
    ///
    /// Returns [`TerrainError::Decode`] unless the image is exactly 256×256
    /// pixels with a 1024-byte row stride and 262,144 bytes of data.
    pub fn from_decoded(tile: &Tile, image: DecodedImage) -> Result<Self> {
        let decode_error = |reason: String| TerrainError::Decode {
            tile: tile.to_string(),
            reason,
        };

        if image.width as usize != TILE_PIXELS || image.height as usize != TILE_PIXELS {
            return Err(decode_error(format!(
                "expected 256x256 pixel image, got {}x{}",
                image.width, image.height
            )));
        }
        if image.stride != TILE_STRIDE {
            return Err(decode_error(format!(
                "expected {} byte stride, got {}",
                TILE_STRIDE, image.stride
            )));
        }
        if image.pixels.len() != TILE_BUFFER_LEN {
            return Err(decode_error(format!(
                "expected {} bytes of pixel data, got {}",
                TILE_BUFFER_LEN,
                image.pixels.len()
            )));
        }

        Ok(Self {
            pixels: image.pixels.into_boxed_slice(),
        })
    }

    /// Returns the RGBA channels of the pixel at `(col, row)`.
    ///
    /// Indices past the tile edge are clamped to the last row/column.
    pub fn rgba(&self, col: usize, row: usize) -> [u8; 4] {
        let col = col.min(TILE_PIXELS - 1);
        let row = row.min(TILE_PIXELS - 1);

        let offset = row * TILE_STRIDE + col * BYTES_PER_PIXEL;
        [
            self.pixels[offset],
            self.pixels[offset + 1],
            self.pixels[offset + 2],
            self.pixels[offset + 3],
        ]
    }

    /// Returns the elevation in meters at `(col, row)`.
    pub fn elevation(&self, col: usize, row: usize) -> f64 {
        let [red, green, blue, _] = self.rgba(col, row);
        terrarium_meters(red, green, blue)
    }

    /// Returns the raw RGBA bytes, row-major with a 1024-byte stride.
    pub fn as_bytes(&self) -> &[u8] {
        &self.pixels
    }
}

impl fmt::Debug for TileBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TileBuffer")
            .field("len", &self.pixels.len())
            .finish()
    }
}
