//! Quadtree paging loader
//!
//! [`QuadPagingLoader`] owns the lifecycle of a quadtree tile-paging
//! loader: it registers with a sampling layer, forwards wanted tiles to a
//! fetcher, hands fetched payloads to an interpreter, and defends all of
//! that against shutdown racing with in-flight asynchronous work.
//!
//! # Architecture
//!
//! ```text
//! SamplingLayer ──wanted/unwanted──► ┌───────────────┐
//! TileFetcher ───fetch outcomes────► │  event queue  │──► pump task
//! constructor ───DelayedInit───────► └───────────────┘    (all state)
//! ```
//!
//! All loader state lives inside a single pump task draining one event
//! queue; collaborators only ever send events. The validity flag is the
//! cooperative cancellation token every continuation checks before
//! touching state.
//!
//! # Example
//!
//! ```ignore
//! use quadpager::loader::QuadPagingLoader;
//! use quadpager::sampling::SamplingParams;
//! use quadpager::tile::{TileInfo, TileSource};
//!
//! let params = SamplingParams::new(0, 14)?;
//! let source = TileSource::new("osm", "https://tile.example.com/{z}/{x}/{y}.pbf");
//! let info = TileInfo::remote(0, 14, source)?;
//! let loader = QuadPagingLoader::new(params, vec![info], interp, Some(controller));
//! // ... later ...
//! loader.shutdown();
//! ```

mod pump;

use std::sync::atomic::{AtomicBool, AtomicU64, AtomicU8, Ordering};
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::controller::Controller;
use crate::coord::TileIdent;
use crate::fetcher::FetchOutcome;
use crate::interp::LoaderInterpreter;
use crate::sampling::SamplingParams;
use crate::telemetry::{LoaderMetrics, LoaderSnapshot};
use crate::tile::{default_return_factory, ReturnFactory, TileInfo};

use pump::Pump;

/// Name the loader registers its fetcher under with the controller.
pub const TILE_FETCHER_NAME: &str = "Tile Fetcher";

/// Process-wide loader id counter.
static NEXT_LOADER_ID: AtomicU64 = AtomicU64::new(1);

/// Lifecycle state of a paging loader.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum LoaderState {
    /// Constructed without a controller; inert but valid.
    Constructed = 0,
    /// Deferred initialization queued but not yet run.
    DeferredInitPending = 1,
    /// Initialized and serving tiles.
    Active = 2,
    /// Shut down; terminal.
    ShutDown = 3,
}

impl LoaderState {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => Self::Constructed,
            1 => Self::DeferredInitPending,
            2 => Self::Active,
            _ => Self::ShutDown,
        }
    }
}

/// Events delivered to the loader's pump task.
#[derive(Debug)]
pub(crate) enum LoaderEvent {
    /// One-shot initialization, queued at construction.
    DelayedInit,
    /// The sampling layer wants this tile loaded.
    TileWanted(TileIdent),
    /// The sampling layer no longer wants this tile.
    TileUnwanted(TileIdent),
    /// A fetch finished, successfully or not.
    FetchComplete {
        ident: TileIdent,
        outcome: FetchOutcome,
    },
}

/// State shared between the loader object, its handles, and the pump.
#[derive(Debug)]
pub(crate) struct LoaderShared {
    id: u64,
    valid: AtomicBool,
    no_fetcher: AtomicBool,
    state: AtomicU8,
    metrics: LoaderMetrics,
}

impl LoaderShared {
    fn new(no_fetcher: bool) -> Self {
        Self {
            id: NEXT_LOADER_ID.fetch_add(1, Ordering::Relaxed),
            valid: AtomicBool::new(true),
            no_fetcher: AtomicBool::new(no_fetcher),
            state: AtomicU8::new(LoaderState::Constructed as u8),
            metrics: LoaderMetrics::new(),
        }
    }

    pub(crate) fn id(&self) -> u64 {
        self.id
    }

    pub(crate) fn is_valid(&self) -> bool {
        self.valid.load(Ordering::SeqCst)
    }

    pub(crate) fn invalidate(&self) -> bool {
        self.valid.swap(false, Ordering::SeqCst)
    }

    pub(crate) fn no_fetcher(&self) -> bool {
        self.no_fetcher.load(Ordering::SeqCst)
    }

    pub(crate) fn set_state(&self, state: LoaderState) {
        self.state.store(state as u8, Ordering::SeqCst);
    }

    pub(crate) fn state(&self) -> LoaderState {
        LoaderState::from_u8(self.state.load(Ordering::SeqCst))
    }

    pub(crate) fn metrics(&self) -> &LoaderMetrics {
        &self.metrics
    }
}

/// Non-owning handle to a paging loader.
///
/// This is what collaborators hold: the sampling layer to announce
/// wanted/unwanted tiles, the fetcher (via its delivery sink) to report
/// completions, and the interpreter as its back-reference. A handle never
/// keeps the loader alive or valid; sends after shutdown vanish.
#[derive(Debug, Clone)]
pub struct LoaderHandle {
    shared: Arc<LoaderShared>,
    events: mpsc::UnboundedSender<LoaderEvent>,
}

impl LoaderHandle {
    /// Unique id of the loader behind this handle.
    pub fn loader_id(&self) -> u64 {
        self.shared.id
    }

    /// Returns true until the loader shuts down.
    pub fn is_valid(&self) -> bool {
        self.shared.is_valid()
    }

    /// Returns true once the loader's event queue is gone.
    pub fn is_closed(&self) -> bool {
        self.events.is_closed() || !self.shared.is_valid()
    }

    /// Announces that a tile is wanted.
    pub fn tile_wanted(&self, ident: TileIdent) {
        self.send(LoaderEvent::TileWanted(ident));
    }

    /// Announces that a tile is no longer wanted.
    pub fn tile_unwanted(&self, ident: TileIdent) {
        self.send(LoaderEvent::TileUnwanted(ident));
    }

    pub(crate) fn fetch_complete(&self, ident: TileIdent, outcome: FetchOutcome) {
        self.send(LoaderEvent::FetchComplete { ident, outcome });
    }

    fn send(&self, event: LoaderEvent) {
        // A closed queue means the loader is gone; the event is dropped,
        // which is exactly the post-shutdown contract.
        let _ = self.events.send(event);
    }
}

/// General purpose quadtree paging loader.
///
/// Mediates between the sampling layer, the tile fetcher, and the loader
/// interpreter. Construction is synchronous and performs no registration;
/// a one-shot deferred initialization runs after the current synchronous
/// context returns, leaving callers a window to adjust settings (for
/// example [`set_no_fetcher`](Self::set_no_fetcher)) before the loader
/// becomes active.
///
/// Constructed with no tile infos, the loader synthesizes a default info
/// spanning the sampling params' zoom range and never creates a fetcher:
/// tiles are produced procedurally by the interpreter.
///
/// Must be constructed from within a tokio runtime when a controller is
/// given; the loader assumes construction, configuration, and callback
/// delivery share one logical control thread.
pub struct QuadPagingLoader {
    shared: Arc<LoaderShared>,
    events: mpsc::UnboundedSender<LoaderEvent>,
    cancel: CancellationToken,
}

impl QuadPagingLoader {
    /// Creates a loader with the default return factory.
    ///
    /// An empty `tile_infos` enables no-fetcher mode. A `None` controller
    /// leaves the loader inert but valid (mock/test usage): no deferred
    /// initialization is scheduled and no fetcher is ever created.
    pub fn new(
        params: SamplingParams,
        tile_infos: Vec<TileInfo>,
        interp: Arc<dyn LoaderInterpreter>,
        controller: Option<Arc<dyn Controller>>,
    ) -> Self {
        Self::with_return_factory(params, tile_infos, interp, controller, default_return_factory())
    }

    /// Creates a loader with a custom return factory.
    ///
    /// Loader variants use this to vary the concrete result type produced
    /// per fetch; one fresh result object is created per tile load and
    /// never reused.
    pub fn with_return_factory(
        params: SamplingParams,
        tile_infos: Vec<TileInfo>,
        interp: Arc<dyn LoaderInterpreter>,
        controller: Option<Arc<dyn Controller>>,
        return_factory: ReturnFactory,
    ) -> Self {
        let no_fetcher = tile_infos.is_empty();
        let tile_infos = if no_fetcher {
            vec![TileInfo::spanning(params.min_zoom(), params.max_zoom())]
        } else {
            tile_infos
        };

        let shared = Arc::new(LoaderShared::new(no_fetcher));
        let (events, event_rx) = mpsc::unbounded_channel();
        let cancel = CancellationToken::new();

        let loader = Self {
            shared: Arc::clone(&shared),
            events: events.clone(),
            cancel: cancel.clone(),
        };

        let Some(controller) = controller else {
            debug!(loader_id = shared.id, "Loader constructed without controller; staying inert");
            return loader;
        };

        shared.set_state(LoaderState::DeferredInitPending);

        // First event in the queue: the pump handles it after the current
        // synchronous context yields, and before any fetch completion for
        // tiles requested during init.
        let _ = events.send(LoaderEvent::DelayedInit);

        let handle = LoaderHandle {
            shared: Arc::clone(&shared),
            events,
        };
        let pump = Pump::new(
            shared,
            handle,
            params,
            tile_infos,
            interp,
            controller,
            return_factory,
        );
        tokio::spawn(pump.run(event_rx, cancel));

        loader
    }

    /// Unique id of this loader.
    pub fn loader_id(&self) -> u64 {
        self.shared.id
    }

    /// Returns true until [`shutdown`](Self::shutdown) is called.
    pub fn is_valid(&self) -> bool {
        self.shared.is_valid()
    }

    /// Current lifecycle state.
    pub fn state(&self) -> LoaderState {
        self.shared.state()
    }

    /// Returns true if fetcher creation is suppressed.
    pub fn no_fetcher(&self) -> bool {
        self.shared.no_fetcher()
    }

    /// Suppresses (or re-enables) fetcher creation.
    ///
    /// Only meaningful between construction and the deferred
    /// initialization tick; once a fetcher exists it is kept.
    pub fn set_no_fetcher(&self, no_fetcher: bool) {
        self.shared.no_fetcher.store(no_fetcher, Ordering::SeqCst);
    }

    /// A non-owning handle to this loader.
    pub fn handle(&self) -> LoaderHandle {
        LoaderHandle {
            shared: Arc::clone(&self.shared),
            events: self.events.clone(),
        }
    }

    /// Point-in-time copy of this loader's counters.
    pub fn metrics(&self) -> LoaderSnapshot {
        self.shared.metrics.snapshot()
    }

    /// Shuts the loader down.
    ///
    /// Flips validity first, then signals the pump to cancel in-flight
    /// fetches and release its collaborators. Idempotent: the second and
    /// later calls return immediately. Safe to call while deferred init or
    /// fetch completions are pending; those observe the flag and no-op.
    pub fn shutdown(&self) {
        if !self.shared.invalidate() {
            return;
        }
        debug!(loader_id = self.shared.id, "Loader shutting down");
        self.shared.set_state(LoaderState::ShutDown);
        self.cancel.cancel();
    }
}

impl Drop for QuadPagingLoader {
    fn drop(&mut self) {
        self.shutdown();
    }
}
