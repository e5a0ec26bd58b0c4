//! Loader interpreter abstraction
//!
//! The interpreter is the collaborator that turns fetched tile payloads
//! into renderable objects. The paging loader drives it: it binds the
//! interpreter with a back-reference during deferred init, then invokes
//! [`LoaderInterpreter::interpret`] once per fetched (or synthesized) tile.

use std::sync::atomic::{AtomicU64, Ordering};

use crate::coord::TileIdent;
use crate::loader::LoaderHandle;
use crate::tile::LoaderReturn;

/// Process-wide render object id counter.
static NEXT_OBJECT_ID: AtomicU64 = AtomicU64::new(1);

/// Opaque handle to a renderable object produced by an interpreter.
///
/// The paging loader never looks inside; it only tracks which objects
/// belong to which tile so they can be torn down together.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RenderObject {
    id: u64,
    tile: TileIdent,
}

impl RenderObject {
    /// Creates a new object handle for the given tile.
    pub fn new(tile: TileIdent) -> Self {
        Self {
            id: NEXT_OBJECT_ID.fetch_add(1, Ordering::Relaxed),
            tile,
        }
    }

    /// Unique object id.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// The tile this object was built for.
    pub fn tile(&self) -> TileIdent {
        self.tile
    }
}

/// Converts fetched tile payloads into renderable objects.
///
/// Implementations are usually the application's own: parse the payload
/// bytes (vector data, model geometry, whatever the source serves) and add
/// the resulting objects to the loader return. In no-fetcher mode
/// `interpret` is invoked with no payloads at all and is expected to
/// produce objects procedurally.
pub trait LoaderInterpreter: Send + Sync {
    /// Binds the loader back-reference.
    ///
    /// Called once during the loader's deferred initialization. The handle
    /// is non-owning; holding it does not keep the loader alive or valid.
    fn set_loader(&self, loader: LoaderHandle);

    /// Turns one tile's payloads into render objects.
    ///
    /// Called once per tile load. A return with no payloads signals either
    /// no-fetcher mode (synthesize the tile) or a fetch failure (the error
    /// is recorded on the return).
    fn interpret(&self, ret: &mut dyn LoaderReturn);

    /// Notifies that a previously loaded tile is no longer wanted.
    ///
    /// The default does nothing; interpreters that register objects with an
    /// external scene should remove them here.
    fn tile_unloaded(&self, _ident: TileIdent) {}
}

#[cfg(test)]
pub mod tests_support {
    //! Interpreter doubles shared by unit tests across the crate.

    use parking_lot::Mutex;

    use super::*;
    use crate::fetcher::FetchError;

    /// Interpreter that does nothing.
    pub struct NullInterpreter;

    impl LoaderInterpreter for NullInterpreter {
        fn set_loader(&self, _loader: LoaderHandle) {}
        fn interpret(&self, _ret: &mut dyn LoaderReturn) {}
    }

    /// One recorded `interpret` invocation.
    #[derive(Debug, Clone)]
    pub struct InterpretedTile {
        pub ident: TileIdent,
        pub payloads: usize,
        pub error: Option<FetchError>,
    }

    /// Interpreter that records every call and emits one object per tile.
    #[derive(Default)]
    pub struct RecordingInterpreter {
        pub loaders: Mutex<Vec<LoaderHandle>>,
        pub interpreted: Mutex<Vec<InterpretedTile>>,
        pub unloaded: Mutex<Vec<TileIdent>>,
    }

    impl RecordingInterpreter {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn bound_loaders(&self) -> usize {
            self.loaders.lock().len()
        }

        pub fn interpreted(&self) -> Vec<InterpretedTile> {
            self.interpreted.lock().clone()
        }

        pub fn unloaded(&self) -> Vec<TileIdent> {
            self.unloaded.lock().clone()
        }
    }

    impl LoaderInterpreter for RecordingInterpreter {
        fn set_loader(&self, loader: LoaderHandle) {
            self.loaders.lock().push(loader);
        }

        fn interpret(&self, ret: &mut dyn LoaderReturn) {
            let ident = ret.ident();
            self.interpreted.lock().push(InterpretedTile {
                ident,
                payloads: ret.payloads().len(),
                error: ret.error().cloned(),
            });
            ret.add_object(RenderObject::new(ident));
        }

        fn tile_unloaded(&self, ident: TileIdent) {
            self.unloaded.lock().push(ident);
        }
    }
}
