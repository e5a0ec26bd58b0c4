//! Tile coordinate module
//!
//! Provides the quadtree tile identity used throughout the paging loader
//! and the small amount of quadtree math the sampling layer relies on
//! (tile counts per level, parent/child relations).

use thiserror::Error;

/// Minimum supported zoom level.
pub const MIN_ZOOM: u8 = 0;

/// Maximum supported zoom level.
///
/// Deep enough for building-scale imagery; at zoom 24 a tile axis spans
/// 2^24 cells, which still fits comfortably in a `u32`.
pub const MAX_ZOOM: u8 = 24;

/// Errors that can occur when constructing or manipulating tile coordinates.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoordError {
    /// Zoom level exceeds [`MAX_ZOOM`].
    #[error("Invalid zoom level: {0} (max: {MAX_ZOOM})")]
    InvalidZoom(u8),

    /// Tile x/y coordinate falls outside the grid at the given zoom.
    #[error("Tile ({x}, {y}) out of range at zoom {zoom} (axis size: {axis})")]
    OutOfRange { x: u32, y: u32, zoom: u8, axis: u32 },

    /// Zoom range where the minimum exceeds the maximum.
    #[error("Invalid zoom range: {min} > {max}")]
    InvalidZoomRange { min: u8, max: u8 },
}

/// Number of tiles along one axis at the given zoom level.
#[inline]
pub fn tiles_across(zoom: u8) -> u32 {
    1u32 << zoom.min(MAX_ZOOM)
}

/// Identity of one quadtree tile.
///
/// A tile is uniquely identified by its zoom level and its x/y position in
/// the grid at that level. Identities are immutable; the loader, fetcher,
/// and sampling layer all key their bookkeeping on this type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TileIdent {
    /// Zoom level (quadtree depth).
    pub zoom: u8,
    /// Column (increases eastward).
    pub x: u32,
    /// Row (increases southward).
    pub y: u32,
}

impl TileIdent {
    /// Creates a tile identity, validating it against the grid bounds.
    pub fn new(zoom: u8, x: u32, y: u32) -> Result<Self, CoordError> {
        if zoom > MAX_ZOOM {
            return Err(CoordError::InvalidZoom(zoom));
        }
        let axis = tiles_across(zoom);
        if x >= axis || y >= axis {
            return Err(CoordError::OutOfRange { x, y, zoom, axis });
        }
        Ok(Self { zoom, x, y })
    }

    /// Returns the parent tile one level up, or `None` at the root.
    pub fn parent(&self) -> Option<TileIdent> {
        if self.zoom == 0 {
            return None;
        }
        Some(TileIdent {
            zoom: self.zoom - 1,
            x: self.x >> 1,
            y: self.y >> 1,
        })
    }

    /// Returns the four children one level down, or `None` at [`MAX_ZOOM`].
    pub fn children(&self) -> Option<[TileIdent; 4]> {
        if self.zoom >= MAX_ZOOM {
            return None;
        }
        let zoom = self.zoom + 1;
        let x = self.x << 1;
        let y = self.y << 1;
        Some([
            TileIdent { zoom, x, y },
            TileIdent { zoom, x: x + 1, y },
            TileIdent { zoom, x, y: y + 1 },
            TileIdent { zoom, x: x + 1, y: y + 1 },
        ])
    }

    /// Returns true if `other` is this tile or a descendant of it.
    pub fn covers(&self, other: &TileIdent) -> bool {
        if other.zoom < self.zoom {
            return false;
        }
        let shift = other.zoom - self.zoom;
        (other.x >> shift) == self.x && (other.y >> shift) == self.y
    }
}

impl std::fmt::Display for TileIdent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}/{}", self.zoom, self.x, self.y)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_new_valid() {
        let ident = TileIdent::new(3, 5, 7).unwrap();
        assert_eq!(ident.zoom, 3);
        assert_eq!(ident.x, 5);
        assert_eq!(ident.y, 7);
    }

    #[test]
    fn test_new_rejects_zoom_beyond_max() {
        let result = TileIdent::new(MAX_ZOOM + 1, 0, 0);
        assert!(matches!(result, Err(CoordError::InvalidZoom(_))));
    }

    #[test]
    fn test_new_rejects_out_of_range() {
        // At zoom 2 the axis is 4 tiles wide, so x=4 is out of range
        let result = TileIdent::new(2, 4, 0);
        assert!(matches!(result, Err(CoordError::OutOfRange { .. })));
    }

    #[test]
    fn test_tiles_across() {
        assert_eq!(tiles_across(0), 1);
        assert_eq!(tiles_across(1), 2);
        assert_eq!(tiles_across(10), 1024);
    }

    #[test]
    fn test_root_has_no_parent() {
        let root = TileIdent::new(0, 0, 0).unwrap();
        assert!(root.parent().is_none());
    }

    #[test]
    fn test_children_of_root() {
        let root = TileIdent::new(0, 0, 0).unwrap();
        let children = root.children().unwrap();
        assert_eq!(children.len(), 4);
        for child in &children {
            assert_eq!(child.zoom, 1);
            assert_eq!(child.parent(), Some(root));
        }
    }

    #[test]
    fn test_covers_descendant() {
        let tile = TileIdent::new(2, 1, 1).unwrap();
        let deep = TileIdent::new(4, 5, 6).unwrap();
        assert!(tile.covers(&deep));
        assert!(tile.covers(&tile));

        let other = TileIdent::new(4, 12, 6).unwrap();
        assert!(!tile.covers(&other));
    }

    #[test]
    fn test_covers_never_upward() {
        let tile = TileIdent::new(3, 2, 2).unwrap();
        let parent = tile.parent().unwrap();
        assert!(!tile.covers(&parent));
    }

    #[test]
    fn test_display() {
        let ident = TileIdent::new(12, 2048, 1365).unwrap();
        assert_eq!(ident.to_string(), "12/2048/1365");
    }

    proptest! {
        #[test]
        fn prop_children_roundtrip_to_parent(zoom in 0u8..MAX_ZOOM, seed in any::<u32>()) {
            let axis = tiles_across(zoom);
            let x = seed % axis;
            let y = seed.rotate_left(7) % axis;
            let tile = TileIdent::new(zoom, x, y).unwrap();
            for child in tile.children().unwrap() {
                prop_assert_eq!(child.parent(), Some(tile));
                prop_assert!(tile.covers(&child));
            }
        }

        #[test]
        fn prop_valid_coords_always_construct(zoom in 0u8..=MAX_ZOOM, seed in any::<u32>()) {
            let axis = tiles_across(zoom);
            let x = seed % axis;
            let y = seed.wrapping_mul(31) % axis;
            prop_assert!(TileIdent::new(zoom, x, y).is_ok());
        }
    }
}
