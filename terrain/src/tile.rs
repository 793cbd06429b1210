//! Tile pyramid addressing: global pixels, tiles and quadkeys.
//!
//! At zoom level `z` the world is a square of `256 · 2^z` pixels on a side,
//! cut into `2^z × 2^z` tiles of 256×256 pixels. A [`Pixel`] names one of
//! those pixels, a [`Tile`] one of those tiles, and a [`QuadKey`] spells a
//! tile's path from the root of the pyramid, one base-4 digit per level.
//!
//! All three types validate on construction, so every value in hand is on
//! the map.

use std::f64::consts::PI;
use std::fmt;
use std::str::FromStr;

use crate::coord::{BoundingBox, Coordinate, MAX_LON, MIN_LAT};
use crate::error::{Result, TerrainError};

/// Width and height of a tile in pixels.
pub const TILE_SIZE: u64 = 256;

/// Maximum zoom level for which pixel arithmetic stays exact.
pub const MAX_ZOOM: u8 = 38;

/// Pixels along one edge of the map at `zoom`; caller guarantees `zoom <= MAX_ZOOM`.
fn pixel_extent(zoom: u8) -> u64 {
    TILE_SIZE << zoom
}

/// Returns the width (and height) of the whole map in pixels at `zoom`.
///
/// # Errors
///
/// Returns [`TerrainError::InvalidZoom`] if `zoom` is greater than [`MAX_ZOOM`].
///
/// # Examples
///
/// ```
/// use terrain::tile::map_pixel_size;
///
/// assert_eq!(map_pixel_size(0).unwrap(), 256);
/// assert_eq!(map_pixel_size(3).unwrap(), 2048);
/// assert!(map_pixel_size(39).is_err());
/// ```
pub fn map_pixel_size(zoom: u8) -> Result<u64> {
    if zoom > MAX_ZOOM {
        return Err(TerrainError::InvalidZoom {
            zoom,
            max: MAX_ZOOM,
        });
    }
    Ok(pixel_extent(zoom))
}

/// Returns the number of tiles along one edge of the map at `zoom`.
///
/// # Errors
///
/// Returns [`TerrainError::InvalidZoom`] if `zoom` is greater than [`MAX_ZOOM`].
pub fn map_tile_size(zoom: u8) -> Result<u64> {
    Ok(map_pixel_size(zoom)? / TILE_SIZE)
}

/// A pixel address in the global pixel space of one zoom level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Pixel {
    x: u64,
    y: u64,
    zoom: u8,
}

impl Pixel {
    /// Creates a pixel, checking that it lies on the map at `zoom`.
    ///
    /// # Errors
    ///
    /// Returns [`TerrainError::InvalidPixel`] if the zoom is above
    /// [`MAX_ZOOM`] or either axis is outside `0..map_pixel_size(zoom)`.
    pub fn new(x: u64, y: u64, zoom: u8) -> Result<Self> {
        let invalid = || TerrainError::InvalidPixel { x, y, zoom };
        let size = map_pixel_size(zoom).map_err(|_| invalid())?;
        if x >= size || y >= size {
            return Err(invalid());
        }
        Ok(Self { x, y, zoom })
    }

    /// Column from the west edge of the map.
    pub fn x(&self) -> u64 {
        self.x
    }

    /// Row from the north edge of the map.
    pub fn y(&self) -> u64 {
        self.y
    }

    pub fn zoom(&self) -> u8 {
        self.zoom
    }

    /// Returns the pixel's position inside its tile as `(column, row)`.
    pub fn offset_in_tile(&self) -> (usize, usize) {
        ((self.x % TILE_SIZE) as usize, (self.y % TILE_SIZE) as usize)
    }

    /// Returns the geographic coordinate of this pixel's corner.
    ///
    /// The pixel is a quantized sample, so converting a coordinate to a pixel
    /// and back does not recover the original coordinate exactly.
    pub fn to_coordinate(&self) -> Coordinate {
        let map_size = pixel_extent(self.zoom) as f64;
        let x = (self.x as f64).clamp(0.0, map_size - 1.0) / map_size - 0.5;
        let y = 0.5 - (self.y as f64).clamp(0.0, map_size - 1.0) / map_size;

        Coordinate::from_lat_lon(
            90.0 - 360.0 * (-y * 2.0 * PI).exp().atan() / PI,
            360.0 * x,
        )
    }

    /// Returns the tile containing this pixel.
    pub fn to_tile(&self) -> Tile {
        Tile {
            z: self.zoom,
            x: self.x >> 8,
            y: self.y >> 8,
        }
    }

    /// Returns the quadkey of the tile containing this pixel.
    pub fn to_quadkey(&self) -> QuadKey {
        self.to_tile().to_quadkey()
    }
}

impl fmt::Display for Pixel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})@{}", self.x, self.y, self.zoom)
    }
}

/// A 256×256 pixel tile in the Web Mercator / slippy map scheme.
///
/// `x` grows eastwards and `y` southwards, both starting at 0 in the
/// north-west corner of the map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Tile {
    z: u8,
    x: u64,
    y: u64,
}

impl Tile {
    /// Creates a tile, checking that it lies on the map at zoom `z`.
    ///
    /// # Errors
    ///
    /// Returns [`TerrainError::InvalidTile`] if `z` is above [`MAX_ZOOM`] or
    /// either index is outside `0..map_tile_size(z)`.
    pub fn new(z: u8, x: u64, y: u64) -> Result<Self> {
        let invalid = || TerrainError::InvalidTile { z, x, y };
        let size = map_tile_size(z).map_err(|_| invalid())?;
        if x >= size || y >= size {
            return Err(invalid());
        }
        Ok(Self { z, x, y })
    }

    pub fn z(&self) -> u8 {
        self.z
    }

    pub fn x(&self) -> u64 {
        self.x
    }

    pub fn y(&self) -> u64 {
        self.y
    }

    /// Returns the top-left pixel of the tile.
    pub fn to_pixel(&self) -> Pixel {
        Pixel {
            x: self.x << 8,
            y: self.y << 8,
            zoom: self.z,
        }
    }

    /// Returns the coordinate of the tile's north-west corner.
    pub fn to_coordinate(&self) -> Coordinate {
        self.to_pixel().to_coordinate()
    }

    /// Encodes the tile's path from the root as a quadkey.
    ///
    /// # Examples
    ///
    /// ```
    /// use terrain::Tile;
    ///
    /// let tile = Tile::new(3, 3, 5)?;
    /// assert_eq!(tile.to_quadkey().as_str(), "213");
    /// # Ok::<(), terrain::TerrainError>(())
    /// ```
    pub fn to_quadkey(&self) -> QuadKey {
        let key = (1..=self.z)
            .rev()
            .map(|level| {
                let mask = 1u64 << (level - 1);
                match (self.x & mask != 0, self.y & mask != 0) {
                    (false, false) => '0',
                    (true, false) => '1',
                    (false, true) => '2',
                    (true, true) => '3',
                }
            })
            .collect();
        QuadKey(key)
    }

    /// Returns the south-west and north-east corners of the tile.
    ///
    /// The far edges come from the neighbouring tiles' north-west corners.
    /// Tiles in the last column or row use the map extremes (180° and
    /// [`MIN_LAT`]) instead, since no neighbour exists there.
    pub fn bounds(&self) -> (Coordinate, Coordinate) {
        let (nw_lat, nw_lon) = self.to_coordinate().lat_lon();

        let se_lon = match Tile::new(self.z, self.x + 1, self.y) {
            Ok(east) => east.to_coordinate().lat_lon().1,
            Err(_) => MAX_LON,
        };
        let se_lat = match Tile::new(self.z, self.x, self.y + 1) {
            Ok(south) => south.to_coordinate().lat_lon().0,
            Err(_) => MIN_LAT,
        };

        (
            Coordinate::from_lat_lon(se_lat, nw_lon),
            Coordinate::from_lat_lon(nw_lat, se_lon),
        )
    }

    /// Returns [`Tile::bounds`] as a [`BoundingBox`].
    pub fn bounding_box(&self) -> BoundingBox {
        let (min, max) = self.bounds();
        BoundingBox::from_corners(min, max)
    }
}

impl fmt::Display for Tile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.z, self.x, self.y)
    }
}

/// A tile path from the root of the pyramid, one digit `0`-`3` per zoom level.
///
/// Digit `0` is the north-west quadrant, `1` north-east, `2` south-west and
/// `3` south-east. The key's length is the tile's zoom level.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct QuadKey(String);

impl QuadKey {
    /// Parses and validates a quadkey.
    ///
    /// # Errors
    ///
    /// Returns [`TerrainError::InvalidQuadKey`] if the key is longer than
    /// [`MAX_ZOOM`] or contains anything other than `0`-`3`.
    pub fn new(key: impl Into<String>) -> Result<Self> {
        let key = key.into();
        let valid = key.len() <= MAX_ZOOM as usize
            && key.bytes().all(|b| (b'0'..=b'3').contains(&b));
        if !valid {
            return Err(TerrainError::InvalidQuadKey { quadkey: key });
        }
        Ok(Self(key))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Zoom level of the tile this key names.
    pub fn zoom(&self) -> u8 {
        self.0.len() as u8
    }

    /// Decodes the key back into its tile.
    pub fn to_tile(&self) -> Tile {
        let z = self.zoom();
        let mut x = 0u64;
        let mut y = 0u64;
        for (i, digit) in self.0.bytes().enumerate() {
            let mask = 1u64 << (z as usize - 1 - i);
            match digit {
                b'1' => x |= mask,
                b'2' => y |= mask,
                b'3' => {
                    x |= mask;
                    y |= mask;
                }
                _ => {}
            }
        }
        Tile { z, x, y }
    }

    /// Returns the top-left pixel of the tile this key names.
    pub fn to_pixel(&self) -> Pixel {
        self.to_tile().to_pixel()
    }

    /// Returns the north-west corner of the tile this key names.
    pub fn to_coordinate(&self) -> Coordinate {
        self.to_pixel().to_coordinate()
    }
}

impl FromStr for QuadKey {
    type Err = TerrainError;

    fn from_str(s: &str) -> Result<Self> {
        QuadKey::new(s)
    }
}

impl fmt::Display for QuadKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coord::{MAX_LAT, MIN_LON};

    fn assert_close(a: f64, b: f64) {
        assert!((a - b).abs() < 1e-9, "{} != {}", a, b);
    }

    #[test]
    fn test_map_sizes() {
        assert_eq!(map_pixel_size(0).unwrap(), 256);
        assert_eq!(map_tile_size(0).unwrap(), 1);
        assert_eq!(map_tile_size(10).unwrap(), 1024);
        assert_eq!(map_pixel_size(MAX_ZOOM).unwrap(), 1 << 46);

        let tiles = map_tile_size(19).unwrap() * map_tile_size(19).unwrap();
        assert_eq!(tiles, 274877906944);
    }

    #[test]
    fn test_invalid_construction() {
        assert!(matches!(
            map_pixel_size(MAX_ZOOM + 1),
            Err(TerrainError::InvalidZoom { .. })
        ));
        assert!(matches!(
            map_tile_size(MAX_ZOOM + 1),
            Err(TerrainError::InvalidZoom { .. })
        ));

        let size = map_pixel_size(1).unwrap();
        assert!(matches!(
            Pixel::new(0, 0, MAX_ZOOM + 1),
            Err(TerrainError::InvalidPixel { .. })
        ));
        assert!(matches!(
            Pixel::new(size, 0, 1),
            Err(TerrainError::InvalidPixel { .. })
        ));
        assert!(matches!(
            Pixel::new(0, size, 1),
            Err(TerrainError::InvalidPixel { .. })
        ));

        let size = map_tile_size(1).unwrap();
        assert!(matches!(
            Tile::new(MAX_ZOOM + 1, 0, 0),
            Err(TerrainError::InvalidTile { .. })
        ));
        assert!(matches!(
            Tile::new(1, size, 0),
            Err(TerrainError::InvalidTile { .. })
        ));
        assert!(matches!(
            Tile::new(1, 0, size),
            Err(TerrainError::InvalidTile { .. })
        ));

        assert!(matches!(
            QuadKey::new("4"),
            Err(TerrainError::InvalidQuadKey { .. })
        ));
        assert!("01a".parse::<QuadKey>().is_err());
        assert!(QuadKey::new("0".repeat(MAX_ZOOM as usize + 1)).is_err());
        assert!(QuadKey::new("0".repeat(MAX_ZOOM as usize)).is_ok());
    }

    #[test]
    fn test_quadkey_encoding() {
        assert_eq!(Tile::new(3, 3, 5).unwrap().to_quadkey().as_str(), "213");
        assert_eq!(Tile::new(1, 0, 0).unwrap().to_quadkey().as_str(), "0");
        assert_eq!(Tile::new(1, 1, 0).unwrap().to_quadkey().as_str(), "1");
        assert_eq!(Tile::new(1, 0, 1).unwrap().to_quadkey().as_str(), "2");
        assert_eq!(Tile::new(1, 1, 1).unwrap().to_quadkey().as_str(), "3");
        assert_eq!(Tile::new(0, 0, 0).unwrap().to_quadkey().as_str(), "");
    }

    #[test]
    fn test_quadkey_decoding() {
        let tile = "213".parse::<QuadKey>().unwrap().to_tile();
        assert_eq!(tile, Tile::new(3, 3, 5).unwrap());

        let root = QuadKey::new("").unwrap();
        assert_eq!(root.zoom(), 0);
        assert_eq!(root.to_tile(), Tile::new(0, 0, 0).unwrap());

        let deepest = Tile::new(MAX_ZOOM, (1 << 38) - 1, 12345).unwrap();
        assert_eq!(deepest.to_quadkey().to_tile(), deepest);
        assert_eq!(deepest.to_quadkey().zoom(), MAX_ZOOM);
    }

    #[test]
    fn test_pixel_tile_relationship() {
        let pixel = Pixel::new(1000, 700, 2).unwrap();
        let tile = pixel.to_tile();
        assert_eq!(tile, Tile::new(2, 3, 2).unwrap());
        assert_eq!(pixel.offset_in_tile(), (232, 188));

        let corner = tile.to_pixel();
        assert_eq!((corner.x(), corner.y(), corner.zoom()), (768, 512, 2));
        assert_eq!(pixel.to_quadkey(), tile.to_quadkey());
    }

    #[test]
    fn test_pixel_to_coordinate() {
        let (lat, lon) = Pixel::new(0, 0, 0).unwrap().to_coordinate().lat_lon();
        assert_close(lat, MAX_LAT);
        assert_close(lon, MIN_LON);

        let (lat, lon) = Pixel::new(256, 256, 1).unwrap().to_coordinate().lat_lon();
        assert_close(lat, 0.0);
        assert_close(lon, 0.0);
    }

    #[test]
    fn test_bounds_interior_tile() {
        let (min, max) = Tile::new(1, 0, 0).unwrap().bounds();
        let (min_lat, min_lon) = min.lat_lon();
        let (max_lat, max_lon) = max.lat_lon();
        assert_close(min_lat, 0.0);
        assert_close(min_lon, -180.0);
        assert_close(max_lat, MAX_LAT);
        assert_close(max_lon, 0.0);
    }

    #[test]
    fn test_bounds_edge_tiles() {
        // The single zoom-0 tile spans the whole map
        let (min, max) = Tile::new(0, 0, 0).unwrap().bounds();
        assert_eq!(min.lat_lon(), (MIN_LAT, MIN_LON));
        let (max_lat, max_lon) = max.lat_lon();
        assert_close(max_lat, MAX_LAT);
        assert_eq!(max_lon, MAX_LON);

        // South-east corner tile at zoom 2
        let (min, max) = Tile::new(2, 3, 3).unwrap().bounds();
        assert_eq!(min.lat_lon().0, MIN_LAT);
        assert_eq!(max.lat_lon().1, MAX_LON);
        assert_close(min.lat_lon().1, 90.0);

        // Last column, first row
        let (min, max) = Tile::new(2, 3, 0).unwrap().bounds();
        assert!(min.lat_lon().0 > 0.0);
        assert_eq!(max.lat_lon().1, MAX_LON);
    }

    #[test]
    fn test_bounds_contain_source_point() {
        let point = Coordinate::from_lat_lon(31.5590, 35.4732);
        let tile = point.to_tile(4).unwrap();
        assert_eq!(tile, Tile::new(4, 9, 6).unwrap());
        assert!(tile.bounding_box().contains(&point));
    }

    #[test]
    fn test_display() {
        assert_eq!(Tile::new(14, 8185, 5449).unwrap().to_string(), "14/8185/5449");
        assert_eq!(QuadKey::new("0231").unwrap().to_string(), "0231");
        assert_eq!(Pixel::new(3, 4, 1).unwrap().to_string(), "(3, 4)@1");
    }
}
