//! # Terrain - Web Mercator tiles and Terrarium elevation
//!
//! Library for converting between geographic coordinates and the Web Mercator
//! (EPSG:3857) pixel/tile/quadkey pyramid, and for querying elevation from
//! Terrarium-encoded heightmap tiles.
//!
//! ## Features
//!
//! - **Tile math**: coordinates, global pixels, `z/x/y` tiles and quadkeys
//!   at zoom levels 0 through 38, with validated constructors
//! - **Elevation**: meters at any point, decoded from 256×256 Terrarium PNGs
//! - **Bounded cache**: a fixed number of decoded tiles, safe to share
//!   between threads
//! - **Pluggable I/O**: bring your own [`TileSource`] and [`TileDecoder`],
//!   or enable the `download` feature for HTTP
//!
//! ## Quick Start
//!
//! ```
//! use terrain::{Coordinate, QuadKey};
//!
//! let fuji = Coordinate::from_lat_lon(35.3606, 138.7274);
//! let tile = fuji.to_tile(10)?;
//! assert_eq!(tile.to_string(), "10/906/404");
//!
//! let quadkey: QuadKey = tile.to_quadkey();
//! assert_eq!(quadkey.to_tile(), tile);
//! # Ok::<(), terrain::TerrainError>(())
//! ```
//!
//! ```ignore
//! use terrain::{Coordinate, ElevationService};
//!
//! let service = ElevationService::builder().cache_size(256).build()?;
//! let meters = service.elevation_at(&Coordinate::from_lat_lon(35.3606, 138.7274))?;
//! println!("Elevation: {}m", meters);
//! ```
//!
//! ## Terrarium Format
//!
//! Each pixel packs an elevation into its color channels:
//!
//! ```text
//! meters = (R * 256 + G + B / 256) - 32768
//! ```
//!
//! Tiles are published up to zoom 14 at
//! <https://s3.amazonaws.com/elevation-tiles-prod/terrarium/{z}/{x}/{y}.png>.

pub mod cache;
pub mod coord;
pub mod error;
pub mod heightmap;
pub mod projection;
pub mod service;
pub mod source;
pub mod tile;

// Re-export main types at crate root for convenience
pub use cache::{TileCache, DEFAULT_CACHE_CAPACITY};
pub use coord::{BoundingBox, Coordinate, Datum, MAX_LAT, MAX_LON, MIN_LAT, MIN_LON};
pub use error::{Result, TerrainError};
pub use heightmap::{DecodedImage, PngDecoder, TileBuffer, TileDecoder};
pub use service::{
    CacheStats, ElevationService, ElevationServiceBuilder, PreloadStats, MAX_ELEVATION_ZOOM,
};
pub use source::{TileSource, DEFAULT_TILE_URL};
pub use tile::{map_pixel_size, map_tile_size, Pixel, QuadKey, Tile, MAX_ZOOM, TILE_SIZE};

#[cfg(feature = "download")]
pub use source::HttpTileSource;
