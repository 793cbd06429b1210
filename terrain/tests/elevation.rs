//! End-to-end tests for the elevation service against an in-memory tile set.

use std::collections::HashMap;
use std::io::Cursor;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use image::{ImageFormat, Rgba, RgbaImage};
use parking_lot::Mutex;
use terrain::{
    BoundingBox, Coordinate, ElevationService, Result, TerrainError, Tile, TileSource,
};

const TEMPLATE: &str = "mem://{z}/{x}/{y}";

/// Terrarium channels for a whole number of meters.
fn encode_meters(meters: i32) -> [u8; 4] {
    let packed = (meters + 32768) as u32;
    [(packed >> 8) as u8, (packed & 0xff) as u8, 0, 255]
}

fn encode_png(img: &RgbaImage) -> Vec<u8> {
    let mut png = Vec::new();
    img.write_to(&mut Cursor::new(&mut png), ImageFormat::Png)
        .unwrap();
    png
}

/// Tile set where every tile is flat at `100 * x + y` meters, plus optional
/// hand-made tiles.
#[derive(Default)]
struct MemoryTiles {
    overrides: HashMap<String, Vec<u8>>,
    fetches: AtomicUsize,
    requested: Mutex<Vec<String>>,
}

impl MemoryTiles {
    fn with_tile(mut self, tile: &Tile, png: Vec<u8>) -> Self {
        self.overrides.insert(url_for(tile), png);
        self
    }

    fn fetches(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

fn url_for(tile: &Tile) -> String {
    format!("mem://{}/{}/{}", tile.z(), tile.x(), tile.y())
}

impl TileSource for MemoryTiles {
    fn fetch(&self, url: &str) -> Result<Vec<u8>> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        self.requested.lock().push(url.to_string());

        if let Some(png) = self.overrides.get(url) {
            return Ok(png.clone());
        }

        let parts: Option<Vec<i32>> = url
            .trim_start_matches("mem://")
            .split('/')
            .map(|part| part.parse().ok())
            .collect();
        match parts.as_deref() {
            Some([_, x, y]) => {
                let img = RgbaImage::from_pixel(256, 256, Rgba(encode_meters(100 * x + y)));
                Ok(encode_png(&img))
            }
            _ => Err(TerrainError::Transport {
                url: url.to_string(),
                reason: "HTTP 404 Not Found".to_string(),
            }),
        }
    }
}

fn create_service(tiles: &Arc<MemoryTiles>, cache_size: usize) -> ElevationService {
    ElevationService::builder()
        .url_template(TEMPLATE)
        .cache_size(cache_size)
        .source(Arc::clone(tiles))
        .build()
        .unwrap()
}

#[test]
fn test_dead_sea_marker_pixel() {
    let point = Coordinate::from_lat_lon(31.5590, 35.4732);
    let pixel = point.to_pixel(14).unwrap();
    let tile = pixel.to_tile();
    let (col, row) = pixel.offset_in_tile();

    let mut img = RgbaImage::from_pixel(256, 256, Rgba(encode_meters(0)));
    img.put_pixel(col as u32, row as u32, Rgba([126, 82, 0, 255]));
    let tiles = Arc::new(MemoryTiles::default().with_tile(&tile, encode_png(&img)));
    let service = create_service(&tiles, 4);

    assert_eq!(service.elevation_at(&point).unwrap(), -430.0);
    assert_eq!(tiles.requested.lock().as_slice(), [url_for(&tile)]);

    // Mercator input resolves to the same pixel
    let (x, y) = point.meters();
    let projected = Coordinate::from_raw(x, y, 3857).unwrap();
    assert_eq!(service.elevation_at(&projected).unwrap(), -430.0);
    assert_eq!(tiles.fetches(), 1);
}

#[test]
fn test_low_zoom_reads_coarse_tile() {
    let tiles = Arc::new(MemoryTiles::default());
    let service = create_service(&tiles, 4);

    // Tile 4/9/6 is flat at 906m
    let point = Coordinate::from_lat_lon(31.5590, 35.4732);
    assert_eq!(service.elevation_at_zoom(&point, 4).unwrap(), 906.0);
    assert!(service.contains_tile(&Tile::new(4, 9, 6).unwrap()));
}

#[test]
fn test_zoom_above_14_never_fetches() {
    let tiles = Arc::new(MemoryTiles::default());
    let service = create_service(&tiles, 4);
    let point = Coordinate::from_lat_lon(10.0, 10.0);

    for zoom in [15, 20, 38] {
        assert!(matches!(
            service.elevation_at_zoom(&point, zoom),
            Err(TerrainError::InvalidZoom { max: 14, .. })
        ));
    }
    assert_eq!(tiles.fetches(), 0);
}

#[test]
fn test_capacity_plus_one_evicts_first() {
    let tiles = Arc::new(MemoryTiles::default());
    let service = create_service(&tiles, 3);

    let row: Vec<Tile> = (0..4).map(|x| Tile::new(6, x, 10).unwrap()).collect();
    for tile in &row {
        service.lookup_tile(tile).unwrap();
    }

    assert!(!service.contains_tile(&row[0]));
    assert!(row[1..].iter().all(|t| service.contains_tile(t)));

    let stats = service.cache_stats();
    assert_eq!(stats.entry_count, 3);
    assert_eq!(stats.capacity, 3);
    assert_eq!(stats.eviction_count, 1);

    // The evicted tile is fetched again on demand
    assert_eq!(service.lookup_tile(&row[0]).unwrap().elevation(0, 0), 10.0);
    assert_eq!(tiles.fetches(), 5);
}

#[test]
fn test_missing_tile_is_transport_error() {
    let tiles = Arc::new(MemoryTiles::default());
    let service = ElevationService::builder()
        .url_template("mem://missing/{z}/{x}/{y}")
        .source(Arc::clone(&tiles))
        .build()
        .unwrap();

    let result = service.lookup_tile_zxy(2, 1, 1);
    assert!(matches!(result, Err(TerrainError::Transport { .. })));
    assert_eq!(service.cache_stats().entry_count, 0);
}

#[test]
fn test_preload_then_query_from_cache() {
    let tiles = Arc::new(MemoryTiles::default());
    let service = create_service(&tiles, 64);

    let bounds = BoundingBox::new(35.0, 138.0, 36.0, 139.0);
    let stats = service.preload(&bounds, 9).unwrap();
    assert!(stats.tiles_matched > 0);
    assert_eq!(stats.tiles_loaded, stats.tiles_matched);
    let fetched = tiles.fetches();

    let inside = Coordinate::from_lat_lon(35.5, 138.5);
    assert!(bounds.contains(&inside));
    service.elevation_at_zoom(&inside, 9).unwrap();
    assert_eq!(tiles.fetches(), fetched);
}

#[test]
fn test_batch_matches_single_lookups() {
    let tiles = Arc::new(MemoryTiles::default());
    let service = create_service(&tiles, 16);

    let coords: Vec<Coordinate> = (0..50)
        .map(|i| Coordinate::from_lat_lon(-40.0 + i as f64 * 1.7, -120.0 + i as f64 * 4.9))
        .collect();

    let batch = service.elevations_batch(&coords, 5, f64::NAN);
    for (coord, elevation) in coords.iter().zip(&batch) {
        assert_eq!(*elevation, service.elevation_at_zoom(coord, 5).unwrap());
    }
}

#[test]
fn test_concurrent_lookups() {
    let tiles = Arc::new(MemoryTiles::default());
    let service = Arc::new(create_service(&tiles, 8));

    let handles: Vec<_> = (0..8u64)
        .map(|worker| {
            let service = Arc::clone(&service);
            std::thread::spawn(move || {
                for i in 0..40u64 {
                    let (x, y) = ((worker + i) % 12, i % 3);
                    let buffer = service.lookup_tile_zxy(7, x, y).unwrap();
                    assert_eq!(buffer.elevation(128, 128), (100 * x + y) as f64);
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }

    let stats = service.cache_stats();
    assert!(stats.entry_count <= 8);
    assert_eq!(stats.hit_count + stats.miss_count, 8 * 40);
}
