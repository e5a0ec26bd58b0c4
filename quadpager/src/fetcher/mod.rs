//! Tile fetcher abstraction
//!
//! The fetcher is the collaborator that retrieves tile payloads. Fetches
//! run on background tasks; outcomes are marshaled back onto the owning
//! loader's event queue through a [`FetchDelivery`] so loader state is only
//! ever touched from its own logical thread.

mod remote;

pub use remote::RemoteTileFetcher;

use bytes::Bytes;
use thiserror::Error;

use crate::coord::TileIdent;
use crate::loader::LoaderHandle;
use crate::tile::TileFetchRequest;

/// Errors a tile fetch can end with.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    /// Server answered with a non-success status.
    #[error("HTTP {status} from {url}")]
    Http { status: u16, url: String },

    /// Transport-level failure (connect, timeout, body read).
    #[error("Transport error: {0}")]
    Transport(String),

    /// The fetch was cancelled before it completed.
    #[error("Fetch cancelled")]
    Cancelled,

    /// No configured source covers the requested zoom level.
    #[error("No source covers zoom level {zoom}")]
    NoSource { zoom: u8 },
}

/// Outcome of one tile fetch.
#[derive(Debug, Clone)]
pub enum FetchOutcome {
    /// The fetched payload bytes.
    Payload(Bytes),
    /// The fetch failed; the payload is absent.
    Failed(FetchError),
}

/// Completion sink for one in-flight fetch.
///
/// Created by the loader alongside each fetch request. Delivering consumes
/// the sink: a fetch reports exactly one outcome. If the loader has shut
/// down in the meantime the delivery is dropped silently.
#[derive(Debug)]
pub struct FetchDelivery {
    ident: TileIdent,
    handle: LoaderHandle,
}

impl FetchDelivery {
    pub(crate) fn new(ident: TileIdent, handle: LoaderHandle) -> Self {
        Self { ident, handle }
    }

    /// The tile this delivery belongs to.
    pub fn ident(&self) -> TileIdent {
        self.ident
    }

    /// Reports the fetch outcome to the owning loader.
    pub fn deliver(self, outcome: FetchOutcome) {
        self.handle.fetch_complete(self.ident, outcome);
    }
}

/// Issues and cancels asynchronous tile fetches.
///
/// `start_fetch` returns immediately; the outcome arrives later through the
/// delivery sink. `cancel_fetch` is best-effort: a completion may still
/// race in after a cancel, and the loader discards it.
pub trait TileFetcher: Send + Sync + 'static {
    /// Short name used in logs.
    fn name(&self) -> &str;

    /// Begins fetching one tile. The outcome is reported through `delivery`.
    fn start_fetch(&self, request: TileFetchRequest, delivery: FetchDelivery);

    /// Cancels the outstanding fetch for a tile, if one is in flight.
    fn cancel_fetch(&self, ident: TileIdent);
}
