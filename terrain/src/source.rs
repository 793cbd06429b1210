//! Tile sources: where encoded heightmap tiles come from.
//!
//! The elevation service only needs "give me the bytes at this URL". The
//! [`TileSource`] trait captures that, so tests and embedders can supply
//! tiles from memory, disk or a custom client. With the `download` feature
//! enabled, [`HttpTileSource`] fetches them over HTTP(S).
//!
//! URLs are built from a template containing `{z}`, `{x}` and `{y}`
//! placeholders, e.g.
//! `https://s3.amazonaws.com/elevation-tiles-prod/terrarium/{z}/{x}/{y}.png`.

use std::sync::Arc;

use crate::error::{Result, TerrainError};
use crate::tile::Tile;

/// Public Terrarium tile set hosted on AWS Open Data.
pub const DEFAULT_TILE_URL: &str =
    "https://s3.amazonaws.com/elevation-tiles-prod/terrarium/{z}/{x}/{y}.png";

/// Default timeout for HTTP requests in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Trait for fetching raw tile bytes by URL.
///
/// Implementations own their timeout and transport policy. Failures should
/// be reported as [`TerrainError::Transport`]; the caller does not retry.
pub trait TileSource: Send + Sync {
    /// Fetches the bytes at `url`.
    fn fetch(&self, url: &str) -> Result<Vec<u8>>;
}

impl<S: TileSource + ?Sized> TileSource for Arc<S> {
    fn fetch(&self, url: &str) -> Result<Vec<u8>> {
        (**self).fetch(url)
    }
}

impl<S: TileSource + ?Sized> TileSource for Box<S> {
    fn fetch(&self, url: &str) -> Result<Vec<u8>> {
        (**self).fetch(url)
    }
}

/// Substitutes a tile's `{z}`, `{x}` and `{y}` into a URL template.
///
/// # Examples
///
/// ```
/// use terrain::{source::tile_url, Tile};
///
/// let tile = Tile::new(14, 8185, 5449)?;
/// assert_eq!(
///     tile_url("https://example.com/{z}/{x}/{y}.png", &tile),
///     "https://example.com/14/8185/5449.png"
/// );
/// # Ok::<(), terrain::TerrainError>(())
/// ```
pub fn tile_url(template: &str, tile: &Tile) -> String {
    template
        .replace("{z}", &tile.z().to_string())
        .replace("{x}", &tile.x().to_string())
        .replace("{y}", &tile.y().to_string())
}

/// Check that a URL template names all three tile placeholders.
pub fn validate_template(template: &str) -> Result<()> {
    let missing: Vec<&str> = ["{z}", "{x}", "{y}"]
        .into_iter()
        .filter(|placeholder| !template.contains(*placeholder))
        .collect();

    if missing.is_empty() {
        Ok(())
    } else {
        Err(TerrainError::InvalidConfig {
            message: format!(
                "tile URL template '{}' is missing {}",
                template,
                missing.join(", ")
            ),
        })
    }
}

#[cfg(feature = "download")]
pub use http::HttpTileSource;

#[cfg(feature = "download")]
mod http {
    use std::time::Duration;

    use reqwest::blocking::Client;
    use tracing::debug;

    use super::TileSource;
    use crate::error::{Result, TerrainError};

    const USER_AGENT: &str = concat!("terrain/", env!("CARGO_PKG_VERSION"));

    /// Blocking HTTP tile source using reqwest.
    #[derive(Clone)]
    pub struct HttpTileSource {
        client: Client,
    }

    impl HttpTileSource {
        /// Create a new HTTP source with the given request timeout.
        pub fn new(timeout_secs: u64) -> Result<Self> {
            let client = Client::builder()
                .timeout(Duration::from_secs(timeout_secs))
                .user_agent(USER_AGENT)
                .build()
                .map_err(|e| TerrainError::InvalidConfig {
                    message: format!("Failed to create HTTP client: {}", e),
                })?;

            Ok(Self { client })
        }
    }

    impl TileSource for HttpTileSource {
        fn fetch(&self, url: &str) -> Result<Vec<u8>> {
            let transport_error = |reason: String| TerrainError::Transport {
                url: url.to_string(),
                reason,
            };

            debug!(url, "Fetching tile");
            let response = self
                .client
                .get(url)
                .send()
                .map_err(|e| transport_error(e.to_string()))?;

            if !response.status().is_success() {
                return Err(transport_error(format!("HTTP {}", response.status())));
            }

            let bytes = response
                .bytes()
                .map_err(|e| transport_error(e.to_string()))?;
            Ok(bytes.to_vec())
        }
    }
}
