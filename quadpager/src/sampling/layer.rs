//! Quadtree sampling layer.

use std::collections::BTreeSet;

use parking_lot::Mutex;
use tracing::debug;

use super::{SamplingParams, ViewRegion};
use crate::coord::{tiles_across, TileIdent};
use crate::loader::LoaderHandle;

/// Partitions the viewable space into quadtree tiles and announces
/// wanted/unwanted tiles to registered loaders as the view changes.
///
/// Owned by the controller; loaders keep only a weak reference back. The
/// layer in turn tracks loaders through their event-queue handles, which
/// do not keep a loader alive; handles whose loader has gone away are
/// pruned on the next announcement.
pub struct SamplingLayer {
    params: SamplingParams,
    inner: Mutex<LayerInner>,
}

struct LayerInner {
    loaders: Vec<LoaderHandle>,
    wanted: BTreeSet<TileIdent>,
}

impl SamplingLayer {
    /// Creates a sampling layer for the given params.
    pub fn new(params: SamplingParams) -> Self {
        Self {
            params,
            inner: Mutex::new(LayerInner {
                loaders: Vec::new(),
                wanted: BTreeSet::new(),
            }),
        }
    }

    /// The params this layer samples with.
    pub fn params(&self) -> &SamplingParams {
        &self.params
    }

    /// Registers a loader to receive wanted/unwanted announcements.
    ///
    /// The currently wanted tiles are replayed to the new loader so it
    /// catches up with the present view.
    pub fn register(&self, handle: LoaderHandle) {
        let mut inner = self.inner.lock();
        for ident in &inner.wanted {
            handle.tile_wanted(*ident);
        }
        debug!(loader_id = handle.loader_id(), "Loader registered with sampling layer");
        inner.loaders.push(handle);
    }

    /// Removes a loader from the announcement list.
    pub fn unregister(&self, loader_id: u64) {
        let mut inner = self.inner.lock();
        inner.loaders.retain(|h| h.loader_id() != loader_id);
    }

    /// Number of live registered loaders.
    pub fn loader_count(&self) -> usize {
        let mut inner = self.inner.lock();
        inner.loaders.retain(|h| !h.is_closed());
        inner.loaders.len()
    }

    /// Recomputes the wanted tile set for a new view and announces the
    /// difference to every registered loader.
    ///
    /// Newly wanted tiles are announced before no-longer-wanted ones, each
    /// in ascending tile order.
    pub fn set_view(&self, view: ViewRegion) {
        let next = self.wanted_for_view(&view);
        let mut inner = self.inner.lock();

        let newly: Vec<TileIdent> = next.difference(&inner.wanted).copied().collect();
        let stale: Vec<TileIdent> = inner.wanted.difference(&next).copied().collect();

        inner.loaders.retain(|h| !h.is_closed());

        debug!(
            zoom = view.zoom,
            wanted = next.len(),
            newly = newly.len(),
            stale = stale.len(),
            loaders = inner.loaders.len(),
            "Sampling layer view changed"
        );

        for handle in &inner.loaders {
            for ident in &newly {
                handle.tile_wanted(*ident);
            }
            for ident in &stale {
                handle.tile_unwanted(*ident);
            }
        }

        inner.wanted = next;
    }

    /// Snapshot of the currently wanted tiles.
    pub fn wanted(&self) -> Vec<TileIdent> {
        self.inner.lock().wanted.iter().copied().collect()
    }

    /// Computes the wanted tile set for a view, rescaled to the sampled
    /// zoom range.
    fn wanted_for_view(&self, view: &ViewRegion) -> BTreeSet<TileIdent> {
        let zoom = self.params.clamp_zoom(view.zoom);
        let axis = tiles_across(zoom);

        // Rescale the span from the view zoom to the sampled zoom
        let (min_x, min_y, max_x, max_y) = if view.zoom >= zoom {
            let shift = view.zoom - zoom;
            (
                view.min_x >> shift,
                view.min_y >> shift,
                view.max_x >> shift,
                view.max_y >> shift,
            )
        } else {
            let shift = zoom - view.zoom;
            (
                view.min_x << shift,
                view.min_y << shift,
                ((view.max_x + 1) << shift) - 1,
                ((view.max_y + 1) << shift) - 1,
            )
        };

        let mut wanted = BTreeSet::new();
        for y in min_y..=max_y.min(axis - 1) {
            for x in min_x..=max_x.min(axis - 1) {
                wanted.insert(TileIdent { zoom, x, y });
            }
        }
        wanted
    }
}
