//! Error types for the terrain library.

use thiserror::Error;

/// Errors that can occur when addressing tiles or looking up elevations.
#[derive(Error, Debug)]
pub enum TerrainError {
    /// Zoom level exceeds the maximum supported by the operation.
    #[error("Invalid zoom level: {zoom} (maximum is {max})")]
    InvalidZoom { zoom: u8, max: u8 },

    /// Pixel address lies outside the map at its zoom level.
    #[error("Invalid pixel: x={x}, y={y} at zoom {zoom}")]
    InvalidPixel { x: u64, y: u64, zoom: u8 },

    /// Tile address lies outside the map at its zoom level.
    #[error("Invalid tile: {z}/{x}/{y}")]
    InvalidTile { z: u8, x: u64, y: u64 },

    /// Quadkey is too long or contains characters other than 0-3.
    #[error("Invalid quadkey: '{quadkey}' (must contain only digits 0-3 and length <= 38)")]
    InvalidQuadKey { quadkey: String },

    /// Raw datum code is not one of the supported EPSG codes.
    #[error("Unsupported datum: EPSG:{code} (expected 4326 or 3857)")]
    InvalidDatum { code: u32 },

    /// Fetched bytes could not be decoded into a 256×256 RGBA heightmap.
    #[error("Failed to decode tile {tile}: {reason}")]
    Decode { tile: String, reason: String },

    /// The tile source failed to deliver bytes.
    #[error("Failed to fetch {url}: {reason}")]
    Transport { url: String, reason: String },

    /// Preload area covers more tiles than the cache can hold.
    #[error("Preload covers {tiles} tiles but the cache holds only {capacity}")]
    PreloadTooLarge { tiles: u64, capacity: usize },

    /// Service configuration is incomplete or malformed.
    #[error("Invalid configuration: {message}")]
    InvalidConfig { message: String },
}

/// Result type alias using [`TerrainError`].
pub type Result<T> = std::result::Result<T, TerrainError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = TerrainError::InvalidZoom { zoom: 39, max: 38 };
        assert!(err.to_string().contains("39"));
        assert!(err.to_string().contains("38"));

        let err = TerrainError::InvalidTile { z: 1, x: 3, y: 0 };
        assert!(err.to_string().contains("1/3/0"));

        let err = TerrainError::InvalidQuadKey {
            quadkey: "0124".to_string(),
        };
        assert!(err.to_string().contains("0124"));

        let err = TerrainError::Transport {
            url: "https://example.com/1/0/0.png".to_string(),
            reason: "HTTP 404 Not Found".to_string(),
        };
        assert!(err.to_string().contains("HTTP 404"));
    }
}
