//! Terrarium elevation service with a bounded tile cache.
//!
//! This module provides [`ElevationService`], a high-level interface for
//! querying elevation at geographic coordinates. It resolves the tile
//! containing a point, fetches and decodes that tile on first use, keeps it
//! in a [`TileCache`], and reads the height from the pixel's color channels.
//!
//! ```ignore
//! use terrain::{Coordinate, ElevationServiceBuilder};
//!
//! let service = ElevationServiceBuilder::new()
//!     .cache_size(256)
//!     .build()?;
//!
//! let meters = service.elevation_at(&Coordinate::from_lat_lon(27.9881, 86.9250))?;
//! ```

use std::collections::HashMap;
use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, trace, warn};

use crate::cache::{TileCache, DEFAULT_CACHE_CAPACITY};
use crate::coord::{BoundingBox, Coordinate};
use crate::error::{Result, TerrainError};
use crate::heightmap::{PngDecoder, TileBuffer, TileDecoder};
use crate::source::{
    tile_url, validate_template, TileSource, DEFAULT_TILE_URL, DEFAULT_TIMEOUT_SECS,
};
use crate::tile::{Pixel, Tile};

#[cfg(feature = "download")]
use crate::source::HttpTileSource;

/// Highest zoom level at which Terrarium tiles are published.
pub const MAX_ELEVATION_ZOOM: u8 = 14;

const DEFAULT_CAPACITY: NonZeroUsize = match NonZeroUsize::new(DEFAULT_CACHE_CAPACITY) {
    Some(capacity) => capacity,
    None => unreachable!(),
};

/// Statistics about cache usage.
#[derive(Debug, Clone, Default)]
pub struct CacheStats {
    /// Number of tiles currently in the cache.
    pub entry_count: u64,
    /// Maximum number of tiles the cache holds.
    pub capacity: u64,
    /// Number of cache hits (requests served from cache).
    pub hit_count: u64,
    /// Number of cache misses (tiles fetched from the source).
    pub miss_count: u64,
    /// Number of tiles evicted to make room.
    pub eviction_count: u64,
}

impl CacheStats {
    /// Calculate the cache hit rate (0.0 to 1.0).
    ///
    /// Returns 0.0 if no requests have been made.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hit_count + self.miss_count;
        if total == 0 {
            0.0
        } else {
            self.hit_count as f64 / total as f64
        }
    }
}

/// Statistics from a preload operation.
#[derive(Debug, Clone, Default)]
pub struct PreloadStats {
    /// Number of tiles successfully fetched into cache.
    pub tiles_loaded: u64,
    /// Number of tiles that were already in cache.
    pub tiles_already_cached: u64,
    /// Number of tiles that failed to load.
    pub tiles_failed: u64,
    /// Number of tiles covering the bounding box.
    pub tiles_matched: u64,
    /// Total elapsed time in milliseconds.
    pub elapsed_ms: u64,
}

fn check_elevation_zoom(zoom: u8) -> Result<()> {
    if zoom > MAX_ELEVATION_ZOOM {
        return Err(TerrainError::InvalidZoom {
            zoom,
            max: MAX_ELEVATION_ZOOM,
        });
    }
    Ok(())
}

/// Elevation lookups backed by Terrarium heightmap tiles.
///
/// The service is `Send + Sync`; share it between threads behind an `Arc`.
/// Concurrent misses on the same tile may fetch it more than once, but only
/// the first decoded buffer is cached.
///
/// # Example
///
/// ```ignore
/// use terrain::{Coordinate, ElevationService, HttpTileSource};
///
/// let service = ElevationService::new(HttpTileSource::new(30)?);
///
/// // Query elevation - tile is fetched automatically
/// let meters = service.elevation_at(&Coordinate::from_lat_lon(35.3606, 138.7274))?;
///
/// // Second query in the same tile uses the cache
/// let meters2 = service.elevation_at(&Coordinate::from_lat_lon(35.3610, 138.7280))?;
///
/// let stats = service.cache_stats();
/// println!("Cache hit rate: {:.1}%", stats.hit_rate() * 100.0);
/// ```
pub struct ElevationService {
    /// URL template with `{z}`, `{x}`, `{y}` placeholders.
    url_template: String,
    cache: TileCache,
    source: Box<dyn TileSource>,
    decoder: Box<dyn TileDecoder>,
    hit_count: AtomicU64,
    miss_count: AtomicU64,
}

impl ElevationService {
    /// Create a service reading the default Terrarium tile set from `source`.
    ///
    /// Uses a cache of [`DEFAULT_CACHE_CAPACITY`] tiles and the PNG decoder.
    pub fn new<S: TileSource + 'static>(source: S) -> Self {
        Self {
            url_template: DEFAULT_TILE_URL.to_string(),
            cache: TileCache::new(DEFAULT_CAPACITY),
            source: Box::new(source),
            decoder: Box::new(PngDecoder),
            hit_count: AtomicU64::new(0),
            miss_count: AtomicU64::new(0),
        }
    }

    /// Create a builder for more configuration options.
    pub fn builder() -> ElevationServiceBuilder {
        ElevationServiceBuilder::new()
    }

    /// Get the elevation in meters at `coord`, sampled at zoom 14.
    pub fn elevation_at(&self, coord: &Coordinate) -> Result<f64> {
        self.elevation_at_zoom(coord, MAX_ELEVATION_ZOOM)
    }

    /// Get the elevation in meters at `coord`, sampled at `zoom`.
    ///
    /// Lower zooms fetch coarser tiles covering more ground.
    ///
    /// # Errors
    ///
    /// Returns [`TerrainError::InvalidZoom`] if `zoom` is above
    /// [`MAX_ELEVATION_ZOOM`], before anything is fetched.
    pub fn elevation_at_zoom(&self, coord: &Coordinate, zoom: u8) -> Result<f64> {
        check_elevation_zoom(zoom)?;
        self.elevation_at_pixel(&coord.to_pixel(zoom)?)
    }

    /// Get the elevation in meters at a global pixel.
    pub fn elevation_at_pixel(&self, pixel: &Pixel) -> Result<f64> {
        let buffer = self.lookup_tile(&pixel.to_tile())?;
        let (col, row) = pixel.offset_in_tile();
        Ok(buffer.elevation(col, row))
    }

    /// Returns the decoded heightmap for `tile`, fetching it on a cache miss.
    ///
    /// # Errors
    ///
    /// - [`TerrainError::InvalidZoom`] if the tile's zoom is above 14
    /// - [`TerrainError::Transport`] if the source fails
    /// - [`TerrainError::Decode`] if the bytes are not a 256×256 image
    pub fn lookup_tile(&self, tile: &Tile) -> Result<Arc<TileBuffer>> {
        check_elevation_zoom(tile.z())?;

        if let Some(buffer) = self.cache.get(tile) {
            self.hit_count.fetch_add(1, Ordering::Relaxed);
            trace!(tile = %tile, "Tile cache hit");
            return Ok(buffer);
        }

        self.miss_count.fetch_add(1, Ordering::Relaxed);
        let buffer = Arc::new(self.fetch_tile(tile)?);
        Ok(self.cache.insert(*tile, buffer))
    }

    /// Like [`Self::lookup_tile`], taking raw tile indices.
    ///
    /// The zoom is checked against [`MAX_ELEVATION_ZOOM`] before the indices
    /// are validated.
    pub fn lookup_tile_zxy(&self, z: u8, x: u64, y: u64) -> Result<Arc<TileBuffer>> {
        check_elevation_zoom(z)?;
        self.lookup_tile(&Tile::new(z, x, y)?)
    }

    /// Fetch and decode a tile, bypassing the cache.
    fn fetch_tile(&self, tile: &Tile) -> Result<TileBuffer> {
        let url = tile_url(&self.url_template, tile);
        debug!(tile = %tile, url = %url, "Tile cache miss, fetching");

        let bytes = self.source.fetch(&url)?;
        let image = self
            .decoder
            .decode(&bytes)
            .map_err(|reason| TerrainError::Decode {
                tile: tile.to_string(),
                reason,
            })?;

        TileBuffer::from_decoded(tile, image)
    }

    /// Get elevations for a batch of coordinates.
    ///
    /// Coordinates are grouped by tile so that each unique tile is looked up
    /// only once, regardless of how many coordinates fall within it.
    ///
    /// Returns one value per input coordinate, using `default` wherever the
    /// lookup fails (invalid zoom, fetch or decode error).
    ///
    /// # Example
    ///
    /// ```ignore
    /// let coords = [
    ///     Coordinate::from_lat_lon(35.3606, 138.7274),
    ///     Coordinate::from_lat_lon(27.9881, 86.9250),
    /// ];
    /// let elevations = service.elevations_batch(&coords, 12, f64::NAN);
    /// ```
    pub fn elevations_batch(&self, coords: &[Coordinate], zoom: u8, default: f64) -> Vec<f64> {
        let mut results = vec![default; coords.len()];
        if check_elevation_zoom(zoom).is_err() {
            return results;
        }

        // Group pixel lookups by tile
        let mut groups: HashMap<Tile, Vec<(usize, Pixel)>> = HashMap::new();
        for (i, coord) in coords.iter().enumerate() {
            if let Ok(pixel) = coord.to_pixel(zoom) {
                groups.entry(pixel.to_tile()).or_default().push((i, pixel));
            }
        }

        for (tile, pixels) in &groups {
            let buffer = match self.lookup_tile(tile) {
                Ok(buffer) => buffer,
                Err(e) => {
                    debug!(tile = %tile, error = %e, "Batch lookup failed, using default");
                    continue;
                }
            };

            for (i, pixel) in pixels {
                let (col, row) = pixel.offset_in_tile();
                results[*i] = buffer.elevation(col, row);
            }
        }

        results
    }

    /// Preload every tile covering `bounds` at `zoom` into the cache.
    ///
    /// This is useful for warming the cache before a burst of queries over a
    /// known area. The area must fit in the cache, otherwise later tiles would
    /// evict the earlier ones.
    ///
    /// # Errors
    ///
    /// - [`TerrainError::InvalidZoom`] if `zoom` is above 14
    /// - [`TerrainError::PreloadTooLarge`] if the box covers more than
    ///   [`Self::cache_capacity`] tiles, checked before anything is fetched
    ///
    /// Failures of individual tiles are counted in the returned stats instead.
    pub fn preload(&self, bounds: &BoundingBox, zoom: u8) -> Result<PreloadStats> {
        check_elevation_zoom(zoom)?;

        let tiles = bounds.tile_count(zoom)?;
        if tiles > self.cache.capacity() as u64 {
            return Err(TerrainError::PreloadTooLarge {
                tiles,
                capacity: self.cache.capacity(),
            });
        }

        let start = Instant::now();
        let mut stats = PreloadStats::default();

        for tile in bounds.tiles(zoom)? {
            stats.tiles_matched += 1;

            if self.cache.contains(&tile) {
                stats.tiles_already_cached += 1;
                continue;
            }

            match self.lookup_tile(&tile) {
                Ok(_) => stats.tiles_loaded += 1,
                Err(e) => {
                    warn!(tile = %tile, error = %e, "Failed to preload tile");
                    stats.tiles_failed += 1;
                }
            }
        }

        stats.elapsed_ms = start.elapsed().as_millis() as u64;
        Ok(stats)
    }

    /// Get cache statistics.
    pub fn cache_stats(&self) -> CacheStats {
        CacheStats {
            entry_count: self.cache.len() as u64,
            capacity: self.cache.capacity() as u64,
            hit_count: self.hit_count.load(Ordering::Relaxed),
            miss_count: self.miss_count.load(Ordering::Relaxed),
            eviction_count: self.cache.eviction_count(),
        }
    }

    /// Get the maximum cache size.
    pub fn cache_capacity(&self) -> usize {
        self.cache.capacity()
    }

    /// Check if a tile is currently cached.
    pub fn contains_tile(&self, tile: &Tile) -> bool {
        self.cache.contains(tile)
    }

    /// Clear all tiles from the cache.
    pub fn clear_cache(&self) {
        self.cache.clear();
    }

    /// Get the tile URL template.
    pub fn url_template(&self) -> &str {
        &self.url_template
    }
}

/// Builder for creating [`ElevationService`] with custom configuration.
///
/// # Example
///
/// ```ignore
/// use terrain::ElevationServiceBuilder;
///
/// let service = ElevationServiceBuilder::new()
///     .url_template("https://tiles.example.com/terrarium/{z}/{x}/{y}.png")
///     .cache_size(256)
///     .timeout_secs(10)
///     .build()?;
/// ```
pub struct ElevationServiceBuilder {
    url_template: String,
    cache_size: usize,
    timeout_secs: u64,
    source: Option<Box<dyn TileSource>>,
    decoder: Option<Box<dyn TileDecoder>>,
}

impl Default for ElevationServiceBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ElevationServiceBuilder {
    /// Create a new builder with default settings.
    pub fn new() -> Self {
        Self {
            url_template: DEFAULT_TILE_URL.to_string(),
            cache_size: DEFAULT_CACHE_CAPACITY,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            source: None,
            decoder: None,
        }
    }

    /// Create a builder configured from environment variables.
    ///
    /// # Environment Variables
    ///
    /// | Variable | Description | Default |
    /// |----------|-------------|---------|
    /// | `TERRAIN_TILE_URL` | Tile URL template with `{z}`, `{x}`, `{y}` | AWS Terrarium tiles |
    /// | `TERRAIN_CACHE_SIZE` | Maximum tiles in cache | 1024 |
    /// | `TERRAIN_TIMEOUT_SECS` | HTTP request timeout* | 30 |
    ///
    /// *Only used when the `download` feature provides the tile source.
    ///
    /// # Errors
    ///
    /// Returns [`TerrainError::InvalidConfig`] if a numeric variable does not
    /// parse.
    pub fn from_env() -> Result<Self> {
        Self::from_vars(|key| std::env::var(key).ok())
    }

    fn from_vars(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        fn parse<T: std::str::FromStr>(key: &str, value: Option<String>, default: T) -> Result<T> {
            match value {
                None => Ok(default),
                Some(raw) => raw.trim().parse().map_err(|_| TerrainError::InvalidConfig {
                    message: format!("{} must be a non-negative integer, got '{}'", key, raw),
                }),
            }
        }

        Ok(Self {
            url_template: lookup("TERRAIN_TILE_URL")
                .unwrap_or_else(|| DEFAULT_TILE_URL.to_string()),
            cache_size: parse(
                "TERRAIN_CACHE_SIZE",
                lookup("TERRAIN_CACHE_SIZE"),
                DEFAULT_CACHE_CAPACITY,
            )?,
            timeout_secs: parse(
                "TERRAIN_TIMEOUT_SECS",
                lookup("TERRAIN_TIMEOUT_SECS"),
                DEFAULT_TIMEOUT_SECS,
            )?,
            source: None,
            decoder: None,
        })
    }

    /// Set the tile URL template.
    pub fn url_template(mut self, template: impl Into<String>) -> Self {
        self.url_template = template.into();
        self
    }

    /// Set the maximum number of tiles to keep in cache.
    ///
    /// Default is 1024 tiles.
    pub fn cache_size(mut self, size: usize) -> Self {
        self.cache_size = size;
        self
    }

    /// Set the HTTP request timeout used by the default source.
    pub fn timeout_secs(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }

    /// Fetch tiles from `source` instead of over HTTP.
    pub fn source<S: TileSource + 'static>(mut self, source: S) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    /// Decode tiles with `decoder` instead of the PNG decoder.
    pub fn decoder<D: TileDecoder + 'static>(mut self, decoder: D) -> Self {
        self.decoder = Some(Box::new(decoder));
        self
    }

    /// Build the [`ElevationService`].
    ///
    /// # Errors
    ///
    /// Returns [`TerrainError::InvalidConfig`] if the URL template lacks a
    /// placeholder, the cache size is zero, or no tile source is available
    /// (none injected and the `download` feature disabled).
    pub fn build(self) -> Result<ElevationService> {
        validate_template(&self.url_template)?;

        let capacity =
            NonZeroUsize::new(self.cache_size).ok_or_else(|| TerrainError::InvalidConfig {
                message: "cache size must be greater than zero".to_string(),
            })?;

        let source = match self.source {
            Some(source) => source,
            None => default_source(self.timeout_secs)?,
        };

        Ok(ElevationService {
            url_template: self.url_template,
            cache: TileCache::new(capacity),
            source,
            decoder: self.decoder.unwrap_or_else(|| Box::new(PngDecoder)),
            hit_count: AtomicU64::new(0),
            miss_count: AtomicU64::new(0),
        })
    }
}

#[cfg(feature = "download")]
fn default_source(timeout_secs: u64) -> Result<Box<dyn TileSource>> {
    Ok(Box::new(HttpTileSource::new(timeout_secs)?))
}

#[cfg(not(feature = "download"))]
fn default_source(_timeout_secs: u64) -> Result<Box<dyn TileSource>> {
    Err(TerrainError::InvalidConfig {
        message: "no tile source configured (enable the `download` feature or call .source())"
            .to_string(),
    })
}
