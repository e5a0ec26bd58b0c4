//! Tile fetch request types.
//!
//! Provides the `TileFetchRequest` type that encapsulates everything a
//! fetcher needs to retrieve one tile: the tile identity and the source
//! to pull it from.

use super::TileSource;
use crate::coord::TileIdent;

/// Request to fetch one tile from one source.
///
/// Created by the loader when the sampling layer announces a wanted tile,
/// and handed to the fetcher. The same tile may produce several requests
/// when the loader multiplexes more than one source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TileFetchRequest {
    ident: TileIdent,
    source: TileSource,
}

impl TileFetchRequest {
    /// Creates a new fetch request.
    pub fn new(ident: TileIdent, source: TileSource) -> Self {
        Self { ident, source }
    }

    /// The tile being fetched.
    pub fn ident(&self) -> TileIdent {
        self.ident
    }

    /// The source to fetch from.
    pub fn source(&self) -> &TileSource {
        &self.source
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new() {
        let ident = TileIdent::new(5, 11, 9).unwrap();
        let source = TileSource::new("sat", "https://example.com/{z}/{x}/{y}");
        let request = TileFetchRequest::new(ident, source.clone());
        assert_eq!(request.ident(), ident);
        assert_eq!(request.source(), &source);
    }

    #[test]
    fn test_clone_equality() {
        let ident = TileIdent::new(1, 0, 1).unwrap();
        let source = TileSource::new("sat", "https://example.com/{z}/{x}/{y}");
        let request = TileFetchRequest::new(ident, source);
        assert_eq!(request.clone(), request);
    }
}
