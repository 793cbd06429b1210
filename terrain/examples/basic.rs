//! Basic example demonstrating terrain library usage.
//!
//! Run with: cargo run --example basic --features download
//!
//! Reads `TERRAIN_TILE_URL`, `TERRAIN_CACHE_SIZE` and `TERRAIN_TIMEOUT_SECS`
//! from the environment if set. Set `RUST_LOG=terrain=debug` to watch tile
//! fetches and evictions.

use terrain::{BoundingBox, Coordinate, ElevationServiceBuilder, TerrainError};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn main() -> Result<(), TerrainError> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "terrain=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let service = ElevationServiceBuilder::from_env()?.build()?;

    // Query some famous places
    let locations = [
        ("Mount Fuji, Japan", 35.3606, 138.7274),
        ("Mount Everest, Nepal", 27.9881, 86.9250),
        ("Dead Sea shore", 31.5590, 35.4732),
    ];

    println!("Elevation queries (zoom 14):");
    println!("{:-<50}", "");

    for (name, lat, lon) in &locations {
        let coord = Coordinate::from_lat_lon(*lat, *lon);
        let tile = coord.to_tile(14)?;
        match service.elevation_at(&coord) {
            Ok(elevation) => {
                println!("{}: {}m (tile {}, quadkey {})", name, elevation, tile, tile.to_quadkey());
            }
            Err(TerrainError::Transport { reason, .. }) => {
                println!("{}: tile not available ({})", name, reason);
            }
            Err(e) => {
                println!("{}: error - {}", name, e);
            }
        }
    }

    // Warm the cache around Fuji at a coarser zoom
    let area = BoundingBox::new(35.2, 138.6, 35.5, 138.9);
    let preload = service.preload(&area, 10)?;
    println!(
        "\nPreloaded {} of {} tiles in {}ms ({} failed)",
        preload.tiles_loaded, preload.tiles_matched, preload.elapsed_ms, preload.tiles_failed
    );

    // Show cache statistics
    let stats = service.cache_stats();
    println!("\nCache statistics:");
    println!("  Cached tiles: {}", stats.entry_count);
    println!("  Hits: {}", stats.hit_count);
    println!("  Misses: {}", stats.miss_count);
    println!("  Hit rate: {:.1}%", stats.hit_rate() * 100.0);

    Ok(())
}
