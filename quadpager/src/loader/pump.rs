//! Loader event pump.
//!
//! All loader state lives here, inside one task draining one queue. The
//! validity flag is checked at the top of every event; an event observed
//! after shutdown is dropped without side effects.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Weak};

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::{LoaderEvent, LoaderHandle, LoaderShared, LoaderState, TILE_FETCHER_NAME};
use crate::controller::Controller;
use crate::coord::TileIdent;
use crate::fetcher::{FetchDelivery, FetchError, FetchOutcome, TileFetcher};
use crate::interp::LoaderInterpreter;
use crate::sampling::{SamplingLayer, SamplingParams};
use crate::tile::{LoaderReturn, ReturnFactory, TileFetchRequest, TileInfo};

/// One tile with fetches outstanding.
struct PendingTile {
    ret: Box<dyn LoaderReturn>,
    remaining: usize,
}

pub(crate) struct Pump {
    shared: Arc<LoaderShared>,
    handle: LoaderHandle,
    params: SamplingParams,
    tile_infos: Vec<TileInfo>,
    interp: Arc<dyn LoaderInterpreter>,
    controller: Arc<dyn Controller>,
    return_factory: ReturnFactory,
    fetcher: Option<Arc<dyn TileFetcher>>,
    sampling: Option<Weak<SamplingLayer>>,
    in_flight: HashMap<TileIdent, PendingTile>,
    loaded: HashSet<TileIdent>,
}

impl Pump {
    pub(crate) fn new(
        shared: Arc<LoaderShared>,
        handle: LoaderHandle,
        params: SamplingParams,
        tile_infos: Vec<TileInfo>,
        interp: Arc<dyn LoaderInterpreter>,
        controller: Arc<dyn Controller>,
        return_factory: ReturnFactory,
    ) -> Self {
        Self {
            shared,
            handle,
            params,
            tile_infos,
            interp,
            controller,
            return_factory,
            fetcher: None,
            sampling: None,
            in_flight: HashMap::new(),
            loaded: HashSet::new(),
        }
    }

    /// Runs until shutdown is signalled or the event queue closes.
    pub(crate) async fn run(
        mut self,
        mut events: mpsc::UnboundedReceiver<LoaderEvent>,
        shutdown: CancellationToken,
    ) {
        debug!(loader_id = self.shared.id(), "Loader event pump starting");

        loop {
            tokio::select! {
                biased;

                _ = shutdown.cancelled() => break,

                event = events.recv() => match event {
                    Some(event) => self.handle_event(event),
                    None => break,
                },
            }
        }

        self.teardown();
    }

    fn handle_event(&mut self, event: LoaderEvent) {
        // The one guard against use-after-shutdown: anything queued before
        // (or racing with) shutdown is dropped here.
        if !self.shared.is_valid() {
            debug!(
                loader_id = self.shared.id(),
                ?event,
                "Dropping event after shutdown"
            );
            return;
        }

        match event {
            LoaderEvent::DelayedInit => self.delayed_init(),
            LoaderEvent::TileWanted(ident) => self.tile_wanted(ident),
            LoaderEvent::TileUnwanted(ident) => self.tile_unwanted(ident),
            LoaderEvent::FetchComplete { ident, outcome } => self.fetch_complete(ident, outcome),
        }
    }

    /// One-shot initialization, run a tick after construction so callers
    /// can adjust settings first.
    fn delayed_init(&mut self) {
        if self.fetcher.is_none() && !self.shared.no_fetcher() {
            self.fetcher = Some(self.controller.add_tile_fetcher(TILE_FETCHER_NAME));
        }

        let layer = self
            .controller
            .find_sampling_layer(&self.params, &self.handle);
        self.sampling = Some(Arc::downgrade(&layer));

        self.interp.set_loader(self.handle.clone());

        self.shared.set_state(LoaderState::Active);
        info!(
            loader_id = self.shared.id(),
            min_zoom = self.params.min_zoom(),
            max_zoom = self.params.max_zoom(),
            no_fetcher = self.shared.no_fetcher(),
            "Paging loader active"
        );
    }

    fn tile_wanted(&mut self, ident: TileIdent) {
        if self.in_flight.contains_key(&ident) || self.loaded.contains(&ident) {
            return;
        }
        self.shared.metrics().tile_requested();

        let fetcher = match (&self.fetcher, self.shared.no_fetcher()) {
            (Some(fetcher), false) => Arc::clone(fetcher),
            _ => {
                // No-fetcher mode: the interpreter produces the tile with
                // no payload at all.
                let ret = (self.return_factory)(ident);
                self.finish_tile(ident, ret);
                return;
            }
        };

        let requests: Vec<TileFetchRequest> = self
            .tile_infos
            .iter()
            .filter(|info| info.covers_zoom(ident.zoom))
            .filter_map(|info| info.source())
            .map(|source| TileFetchRequest::new(ident, source.clone()))
            .collect();

        if requests.is_empty() {
            let mut ret = (self.return_factory)(ident);
            ret.set_error(FetchError::NoSource { zoom: ident.zoom });
            self.finish_tile(ident, ret);
            return;
        }

        debug!(
            tile_zoom = ident.zoom,
            tile_x = ident.x,
            tile_y = ident.y,
            sources = requests.len(),
            "Tile wanted"
        );

        self.in_flight.insert(
            ident,
            PendingTile {
                ret: (self.return_factory)(ident),
                remaining: requests.len(),
            },
        );
        for request in requests {
            fetcher.start_fetch(request, FetchDelivery::new(ident, self.handle.clone()));
        }
    }

    fn tile_unwanted(&mut self, ident: TileIdent) {
        if self.in_flight.remove(&ident).is_some() {
            if let Some(fetcher) = &self.fetcher {
                fetcher.cancel_fetch(ident);
            }
            self.shared.metrics().fetch_cancelled();
            debug!(tile = %ident, "Cancelled fetch for unwanted tile");
        } else if self.loaded.remove(&ident) {
            self.interp.tile_unloaded(ident);
            debug!(tile = %ident, "Unloaded tile");
        }
    }

    fn fetch_complete(&mut self, ident: TileIdent, outcome: FetchOutcome) {
        let done = match self.in_flight.get_mut(&ident) {
            None => {
                // Cancellation is authoritative: a completion for a tile we
                // no longer track is discarded.
                self.shared.metrics().completion_discarded();
                debug!(tile = %ident, "Discarding completion for untracked tile");
                return;
            }
            Some(pending) => {
                match outcome {
                    FetchOutcome::Payload(data) => pending.ret.add_payload(data),
                    FetchOutcome::Failed(error) => pending.ret.set_error(error),
                }
                pending.remaining -= 1;
                pending.remaining == 0
            }
        };

        if done {
            if let Some(pending) = self.in_flight.remove(&ident) {
                self.finish_tile(ident, pending.ret);
            }
        }
    }

    /// Hands one completed tile to the interpreter.
    fn finish_tile(&mut self, ident: TileIdent, mut ret: Box<dyn LoaderReturn>) {
        let failed = ret.error().is_some();
        if let Some(error) = ret.error() {
            warn!(tile = %ident, error = %error, "Tile load failed");
        }

        self.interp.interpret(ret.as_mut());
        self.loaded.insert(ident);

        if failed {
            self.shared.metrics().tile_failed();
        } else {
            self.shared.metrics().tile_loaded();
            debug!(
                tile = %ident,
                payloads = ret.payloads().len(),
                objects = ret.objects().len(),
                "Tile loaded"
            );
        }
    }

    /// Releases collaborators. Runs exactly once, when the pump exits.
    fn teardown(&mut self) {
        self.shared.invalidate();
        self.shared.set_state(LoaderState::ShutDown);

        if let Some(fetcher) = self.fetcher.take() {
            for ident in self.in_flight.keys() {
                fetcher.cancel_fetch(*ident);
            }
        }
        self.in_flight.clear();
        self.loaded.clear();

        if let Some(layer) = self.sampling.take().and_then(|weak| weak.upgrade()) {
            layer.unregister(self.shared.id());
        }

        info!(loader_id = self.shared.id(), "Paging loader shut down");
    }
}
