//! Geographic coordinates tagged with their datum.
//!
//! A [`Coordinate`] stores a point either as WGS84 latitude/longitude or as
//! Web Mercator meters and converts on access, so callers can ask for
//! whichever representation they need.

use std::f64::consts::PI;
use std::fmt;

use crate::error::{Result, TerrainError};
use crate::projection::{to_lat_lon, to_mercator};
use crate::tile::{map_pixel_size, Pixel, QuadKey, Tile};

/// Southern latitude limit of the square Web Mercator map.
pub const MIN_LAT: f64 = -85.05112877980659;
/// Northern latitude limit of the square Web Mercator map.
pub const MAX_LAT: f64 = 85.05112877980659;
/// Western longitude limit.
pub const MIN_LON: f64 = -180.0;
/// Eastern longitude limit.
pub const MAX_LON: f64 = 180.0;

/// Reference system a [`Coordinate`] is stored in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Datum {
    /// WGS84 latitude/longitude in decimal degrees (EPSG:4326).
    Wgs84LatLon,
    /// Spherical Web Mercator meters (EPSG:3857).
    WebMercatorMeters,
}

impl Datum {
    /// Returns the EPSG code of this datum.
    pub fn epsg(&self) -> u32 {
        match self {
            Datum::Wgs84LatLon => 4326,
            Datum::WebMercatorMeters => 3857,
        }
    }

    /// Looks up a datum by EPSG code.
    ///
    /// # Errors
    ///
    /// Returns [`TerrainError::InvalidDatum`] for any code other than 4326 or 3857.
    pub fn from_epsg(code: u32) -> Result<Self> {
        match code {
            4326 => Ok(Datum::Wgs84LatLon),
            3857 => Ok(Datum::WebMercatorMeters),
            code => Err(TerrainError::InvalidDatum { code }),
        }
    }
}

impl TryFrom<u32> for Datum {
    type Error = TerrainError;

    fn try_from(code: u32) -> Result<Self> {
        Datum::from_epsg(code)
    }
}

/// A point in one of the supported datums.
///
/// # Example
///
/// ```
/// use terrain::Coordinate;
///
/// let fuji = Coordinate::from_lat_lon(35.3606, 138.7274);
/// let tile = fuji.to_tile(10)?;
/// assert_eq!(tile.to_string(), "10/906/404");
/// # Ok::<(), terrain::TerrainError>(())
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coordinate {
    x: f64,
    y: f64,
    datum: Datum,
}

impl Coordinate {
    /// Creates a coordinate from WGS84 latitude and longitude.
    pub fn from_lat_lon(lat: f64, lon: f64) -> Self {
        Self {
            x: lon,
            y: lat,
            datum: Datum::Wgs84LatLon,
        }
    }

    /// Creates a coordinate from Web Mercator meters.
    pub fn from_meters(x: f64, y: f64) -> Self {
        Self {
            x,
            y,
            datum: Datum::WebMercatorMeters,
        }
    }

    /// Creates a coordinate from raw values and an EPSG code.
    ///
    /// For EPSG:4326 `x` is the longitude and `y` the latitude.
    pub fn from_raw(x: f64, y: f64, epsg: u32) -> Result<Self> {
        let datum = Datum::from_epsg(epsg)?;
        Ok(Self { x, y, datum })
    }

    /// Returns the datum this coordinate is stored in.
    pub fn datum(&self) -> Datum {
        self.datum
    }

    /// Returns `(lat, lon)` in decimal degrees.
    pub fn lat_lon(&self) -> (f64, f64) {
        match self.datum {
            Datum::Wgs84LatLon => (self.y, self.x),
            Datum::WebMercatorMeters => to_lat_lon(self.x, self.y),
        }
    }

    /// Returns `(x, y)` in Web Mercator meters.
    pub fn meters(&self) -> (f64, f64) {
        match self.datum {
            Datum::Wgs84LatLon => to_mercator(self.y, self.x),
            Datum::WebMercatorMeters => (self.x, self.y),
        }
    }

    /// Returns the global pixel containing this coordinate at `zoom`.
    ///
    /// Latitude is clipped to [`MIN_LAT`]..=[`MAX_LAT`] and longitude to
    /// [`MIN_LON`]..=[`MAX_LON`] before projecting, so every coordinate maps
    /// onto the map.
    ///
    /// # Errors
    ///
    /// Returns [`TerrainError::InvalidZoom`] if `zoom` is greater than 38.
    pub fn to_pixel(&self, zoom: u8) -> Result<Pixel> {
        let map_size = map_pixel_size(zoom)? as f64;

        let (lat, lon) = self.lat_lon();
        let lat = lat.clamp(MIN_LAT, MAX_LAT);
        let lon = lon.clamp(MIN_LON, MAX_LON);

        let x_frac = (lon + 180.0) / 360.0;
        let sin_lat = (lat * PI / 180.0).sin();
        let y_frac = 0.5 - ((1.0 + sin_lat) / (1.0 - sin_lat)).ln() / (4.0 * PI);

        Pixel::new(
            (x_frac * map_size + 0.5).clamp(0.0, map_size - 1.0) as u64,
            (y_frac * map_size + 0.5).clamp(0.0, map_size - 1.0) as u64,
            zoom,
        )
    }

    /// Returns the tile containing this coordinate at `zoom`.
    pub fn to_tile(&self, zoom: u8) -> Result<Tile> {
        Ok(self.to_pixel(zoom)?.to_tile())
    }

    /// Returns the quadkey of the tile containing this coordinate at `zoom`.
    pub fn to_quadkey(&self, zoom: u8) -> Result<QuadKey> {
        Ok(self.to_tile(zoom)?.to_quadkey())
    }
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.datum {
            Datum::Wgs84LatLon => write!(f, "({}, {}) EPSG:4326", self.y, self.x),
            Datum::WebMercatorMeters => write!(f, "({}, {}) EPSG:3857", self.x, self.y),
        }
    }
}

/// A geographic bounding box in decimal degrees (WGS84).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    /// Minimum latitude (southern boundary).
    pub min_lat: f64,
    /// Minimum longitude (western boundary).
    pub min_lon: f64,
    /// Maximum latitude (northern boundary).
    pub max_lat: f64,
    /// Maximum longitude (eastern boundary).
    pub max_lon: f64,
}

impl BoundingBox {
    /// Create a new bounding box.
    ///
    /// # Arguments
    ///
    /// * `min_lat` - Southern boundary latitude
    /// * `min_lon` - Western boundary longitude
    /// * `max_lat` - Northern boundary latitude
    /// * `max_lon` - Eastern boundary longitude
    pub fn new(min_lat: f64, min_lon: f64, max_lat: f64, max_lon: f64) -> Self {
        Self {
            min_lat,
            min_lon,
            max_lat,
            max_lon,
        }
    }

    /// Builds a box from its south-west and north-east corners.
    pub fn from_corners(min: Coordinate, max: Coordinate) -> Self {
        let (min_lat, min_lon) = min.lat_lon();
        let (max_lat, max_lon) = max.lat_lon();
        Self::new(min_lat, min_lon, max_lat, max_lon)
    }

    /// Check whether a coordinate lies inside the box (edges included).
    pub fn contains(&self, coord: &Coordinate) -> bool {
        let (lat, lon) = coord.lat_lon();
        (self.min_lat..=self.max_lat).contains(&lat) && (self.min_lon..=self.max_lon).contains(&lon)
    }

    /// North-west and south-east tiles of the box at `zoom`.
    fn corner_tiles(&self, zoom: u8) -> Result<(Tile, Tile)> {
        let nw = Coordinate::from_lat_lon(self.max_lat, self.min_lon).to_tile(zoom)?;
        let se = Coordinate::from_lat_lon(self.min_lat, self.max_lon).to_tile(zoom)?;
        Ok((nw, se))
    }

    /// Number of tiles at `zoom` that overlap the box, without listing them.
    ///
    /// An inverted box covers no tiles. Saturates at `u64::MAX`.
    ///
    /// # Errors
    ///
    /// Returns [`TerrainError::InvalidZoom`] if `zoom` is greater than 38.
    pub fn tile_count(&self, zoom: u8) -> Result<u64> {
        let (nw, se) = self.corner_tiles(zoom)?;
        let cols = (se.x() + 1).saturating_sub(nw.x());
        let rows = (se.y() + 1).saturating_sub(nw.y());
        Ok(cols.saturating_mul(rows))
    }

    /// Returns every tile at `zoom` that overlaps the box, row by row from the
    /// north-west corner.
    ///
    /// Tiles are produced lazily; check [`Self::tile_count`] before collecting
    /// a large box.
    ///
    /// # Errors
    ///
    /// Returns [`TerrainError::InvalidZoom`] if `zoom` is greater than 38.
    pub fn tiles(&self, zoom: u8) -> Result<impl Iterator<Item = Tile>> {
        let (nw, se) = self.corner_tiles(zoom)?;
        let (min_x, max_x) = (nw.x(), se.x());

        Ok((nw.y()..=se.y()).flat_map(move |y| {
            (min_x..=max_x).filter_map(move |x| Tile::new(zoom, x, y).ok())
        }))
    }
}
