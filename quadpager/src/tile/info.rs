//! Tile source descriptors.
//!
//! A [`TileInfo`] tells the loader which zoom levels a data source covers
//! and, if the data lives remotely, how to reach it. The loader treats the
//! source itself as opaque; only the fetcher interprets it.

use crate::coord::{CoordError, TileIdent};

/// Remote source descriptor for tile data.
///
/// The URL template uses `{z}`, `{x}` and `{y}` placeholders, the
/// convention used by slippy-map tile servers.
///
/// # Example
///
/// ```
/// use quadpager::tile::TileSource;
/// use quadpager::coord::TileIdent;
///
/// let source = TileSource::new("osm", "https://tile.example.com/{z}/{x}/{y}.png");
/// let ident = TileIdent::new(3, 4, 2).unwrap();
/// assert_eq!(source.url_for(&ident), "https://tile.example.com/3/4/2.png");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TileSource {
    name: String,
    url_template: String,
}

impl TileSource {
    /// Creates a remote source descriptor.
    pub fn new(name: impl Into<String>, url_template: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url_template: url_template.into(),
        }
    }

    /// Short name used in logs.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Expands the URL template for one tile.
    pub fn url_for(&self, ident: &TileIdent) -> String {
        self.url_template
            .replace("{z}", &ident.zoom.to_string())
            .replace("{x}", &ident.x.to_string())
            .replace("{y}", &ident.y.to_string())
    }
}

/// Describes one data source a loader pages tiles from.
///
/// Owned by the loader and read-only after construction. A loader holds one
/// or more of these; a source without a remote descriptor provides no data
/// to fetch and the loader synthesizes results locally.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TileInfo {
    min_zoom: u8,
    max_zoom: u8,
    source: Option<TileSource>,
}

impl TileInfo {
    /// Creates a tile info with a remote source.
    pub fn remote(min_zoom: u8, max_zoom: u8, source: TileSource) -> Result<Self, CoordError> {
        Self::build(min_zoom, max_zoom, Some(source))
    }

    /// Creates a tile info with no remote source (local/synthetic data).
    pub fn local(min_zoom: u8, max_zoom: u8) -> Result<Self, CoordError> {
        Self::build(min_zoom, max_zoom, None)
    }

    /// Infallible local info over a range already validated elsewhere
    /// (used when the loader synthesizes its default source).
    pub(crate) fn spanning(min_zoom: u8, max_zoom: u8) -> Self {
        Self {
            min_zoom,
            max_zoom,
            source: None,
        }
    }

    fn build(min_zoom: u8, max_zoom: u8, source: Option<TileSource>) -> Result<Self, CoordError> {
        if min_zoom > max_zoom {
            return Err(CoordError::InvalidZoomRange {
                min: min_zoom,
                max: max_zoom,
            });
        }
        Ok(Self {
            min_zoom,
            max_zoom,
            source,
        })
    }

    /// Minimum zoom level this source covers.
    pub fn min_zoom(&self) -> u8 {
        self.min_zoom
    }

    /// Maximum zoom level this source covers.
    pub fn max_zoom(&self) -> u8 {
        self.max_zoom
    }

    /// The remote source, if any.
    pub fn source(&self) -> Option<&TileSource> {
        self.source.as_ref()
    }

    /// Returns true if this source covers the given zoom level.
    pub fn covers_zoom(&self, zoom: u8) -> bool {
        (self.min_zoom..=self.max_zoom).contains(&zoom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_for_expands_placeholders() {
        let source = TileSource::new("test", "https://example.com/{z}/{x}/{y}.pbf");
        let ident = TileIdent::new(10, 163, 395).unwrap();
        assert_eq!(source.url_for(&ident), "https://example.com/10/163/395.pbf");
    }

    #[test]
    fn test_url_for_repeated_placeholder() {
        let source = TileSource::new("test", "https://example.com/{z}/{z}-{x}-{y}");
        let ident = TileIdent::new(2, 1, 3).unwrap();
        assert_eq!(source.url_for(&ident), "https://example.com/2/2-1-3");
    }

    #[test]
    fn test_remote_info() {
        let source = TileSource::new("sat", "https://example.com/{z}/{x}/{y}");
        let info = TileInfo::remote(2, 14, source.clone()).unwrap();
        assert_eq!(info.min_zoom(), 2);
        assert_eq!(info.max_zoom(), 14);
        assert_eq!(info.source(), Some(&source));
    }

    #[test]
    fn test_local_info_has_no_source() {
        let info = TileInfo::local(0, 10).unwrap();
        assert!(info.source().is_none());
    }

    #[test]
    fn test_rejects_inverted_zoom_range() {
        let result = TileInfo::local(8, 3);
        assert!(matches!(result, Err(CoordError::InvalidZoomRange { .. })));
    }

    #[test]
    fn test_covers_zoom() {
        let info = TileInfo::local(4, 9).unwrap();
        assert!(!info.covers_zoom(3));
        assert!(info.covers_zoom(4));
        assert!(info.covers_zoom(9));
        assert!(!info.covers_zoom(10));
    }
}
