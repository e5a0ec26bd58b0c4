//! QuadPager - Quadtree tile paging for map and globe renderers
//!
//! This library provides the paging side of a tiled map renderer: a
//! quadtree sampling layer decides which tiles the current view wants, a
//! fetcher retrieves their payloads asynchronously, and an interpreter
//! turns the payloads into renderable objects. [`loader::QuadPagingLoader`]
//! ties the three together and owns the lifecycle, including the shutdown
//! races inherent in asynchronous fetch completion.
//!
//! # High-Level API
//!
//! ```ignore
//! use quadpager::controller::MapController;
//! use quadpager::loader::QuadPagingLoader;
//! use quadpager::sampling::SamplingParams;
//! use quadpager::tile::{TileInfo, TileSource};
//!
//! let controller = Arc::new(MapController::new());
//! let params = SamplingParams::new(0, 14)?;
//! let source = TileSource::new("osm", "https://tile.example.com/{z}/{x}/{y}.pbf");
//! let info = TileInfo::remote(0, 14, source)?;
//!
//! let loader = QuadPagingLoader::new(params, vec![info], my_interpreter, Some(controller));
//! ```

pub mod controller;
pub mod coord;
pub mod fetcher;
pub mod interp;
pub mod loader;
pub mod sampling;
pub mod telemetry;
pub mod tile;

/// Version of the QuadPager library.
///
/// The version is defined in `Cargo.toml` and injected at compile time.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_is_set() {
        assert!(!VERSION.is_empty());
    }
}
