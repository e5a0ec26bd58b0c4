//! Rendering controller abstraction
//!
//! The controller is the host rendering context a paging loader attaches
//! to. The loader consumes exactly two things from it during deferred
//! init: a tile fetcher (created once per name and shared) and a sampling
//! layer (found or created per params, with the loader registered).
//!
//! [`MapController`] is the concrete implementation; fetcher construction
//! is injectable so tests never touch the network.

use std::sync::Arc;

use dashmap::DashMap;
use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::fetcher::{RemoteTileFetcher, TileFetcher};
use crate::loader::LoaderHandle;
use crate::sampling::{SamplingLayer, SamplingParams};

/// Host rendering context consumed by paging loaders.
pub trait Controller: Send + Sync {
    /// Returns the fetcher registered under `name`, creating it on first
    /// use. Fetchers are shared between loaders asking for the same name.
    fn add_tile_fetcher(&self, name: &str) -> Arc<dyn TileFetcher>;

    /// Returns the sampling layer for `params`, creating it on first use,
    /// and registers the loader with it.
    fn find_sampling_layer(
        &self,
        params: &SamplingParams,
        loader: &LoaderHandle,
    ) -> Arc<SamplingLayer>;
}

/// Builds fetchers for a controller; injectable for tests.
pub type FetcherFactory = Box<dyn Fn(&str) -> Arc<dyn TileFetcher> + Send + Sync>;

/// Concrete controller owning named fetchers and sampling layers.
pub struct MapController {
    fetchers: DashMap<String, Arc<dyn TileFetcher>>,
    layers: Mutex<Vec<Arc<SamplingLayer>>>,
    fetcher_factory: FetcherFactory,
}

impl MapController {
    /// Creates a controller whose fetchers fetch over HTTP.
    pub fn new() -> Self {
        Self::with_fetcher_factory(Box::new(|name| match RemoteTileFetcher::new(name) {
            Ok(fetcher) => Arc::new(fetcher) as Arc<dyn TileFetcher>,
            Err(error) => {
                // TLS setup failed; fall back to a fetcher that reports the
                // failure per tile rather than panicking the controller.
                warn!(error = %error, "Failed to create HTTP fetcher");
                Arc::new(failing::FailingFetcher::new(name, error))
            }
        }))
    }

    /// Creates a controller with a custom fetcher factory.
    pub fn with_fetcher_factory(fetcher_factory: FetcherFactory) -> Self {
        Self {
            fetchers: DashMap::new(),
            layers: Mutex::new(Vec::new()),
            fetcher_factory,
        }
    }

    /// Number of distinct fetchers created so far.
    pub fn fetcher_count(&self) -> usize {
        self.fetchers.len()
    }

    /// Number of sampling layers created so far.
    pub fn layer_count(&self) -> usize {
        self.layers.lock().len()
    }

    /// The sampling layer for `params`, if one exists.
    pub fn sampling_layer(&self, params: &SamplingParams) -> Option<Arc<SamplingLayer>> {
        self.layers
            .lock()
            .iter()
            .find(|layer| layer.params() == params)
            .cloned()
    }
}

impl Default for MapController {
    fn default() -> Self {
        Self::new()
    }
}

impl Controller for MapController {
    fn add_tile_fetcher(&self, name: &str) -> Arc<dyn TileFetcher> {
        self.fetchers
            .entry(name.to_string())
            .or_insert_with(|| {
                debug!(name, "Creating tile fetcher");
                (self.fetcher_factory)(name)
            })
            .clone()
    }

    fn find_sampling_layer(
        &self,
        params: &SamplingParams,
        loader: &LoaderHandle,
    ) -> Arc<SamplingLayer> {
        let mut layers = self.layers.lock();
        let layer = match layers.iter().find(|layer| layer.params() == params) {
            Some(layer) => Arc::clone(layer),
            None => {
                debug!(
                    min_zoom = params.min_zoom(),
                    max_zoom = params.max_zoom(),
                    "Creating sampling layer"
                );
                let layer = Arc::new(SamplingLayer::new(params.clone()));
                layers.push(Arc::clone(&layer));
                layer
            }
        };
        layer.register(loader.clone());
        layer
    }
}

mod failing {
    //! Fallback fetcher used when HTTP client construction fails.

    use super::*;
    use crate::coord::TileIdent;
    use crate::fetcher::{FetchDelivery, FetchError, FetchOutcome};
    use crate::tile::TileFetchRequest;

    pub(super) struct FailingFetcher {
        name: String,
        error: FetchError,
    }

    impl FailingFetcher {
        pub(super) fn new(name: impl Into<String>, error: FetchError) -> Self {
            Self {
                name: name.into(),
                error,
            }
        }
    }

    impl TileFetcher for FailingFetcher {
        fn name(&self) -> &str {
            &self.name
        }

        fn start_fetch(&self, _request: TileFetchRequest, delivery: FetchDelivery) {
            delivery.deliver(FetchOutcome::Failed(self.error.clone()));
        }

        fn cancel_fetch(&self, _ident: TileIdent) {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetcher::tests::MockTileFetcher;

    fn mock_controller() -> (MapController, Arc<MockTileFetcher>) {
        let fetcher = Arc::new(MockTileFetcher::new());
        let for_factory = Arc::clone(&fetcher);
        let controller = MapController::with_fetcher_factory(Box::new(move |_| {
            Arc::clone(&for_factory) as Arc<dyn TileFetcher>
        }));
        (controller, fetcher)
    }

    #[test]
    fn test_fetchers_created_once_per_name() {
        let (controller, _) = mock_controller();
        let a = controller.add_tile_fetcher("Tile Fetcher");
        let b = controller.add_tile_fetcher("Tile Fetcher");
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(controller.fetcher_count(), 1);

        controller.add_tile_fetcher("Other Fetcher");
        assert_eq!(controller.fetcher_count(), 2);
    }

    #[tokio::test]
    async fn test_layers_shared_per_params() {
        use crate::interp::tests_support::NullInterpreter;
        use crate::loader::QuadPagingLoader;

        let (controller, _) = mock_controller();
        let params = SamplingParams::new(0, 8).unwrap();

        let loader_a = QuadPagingLoader::new(
            params.clone(),
            Vec::new(),
            Arc::new(NullInterpreter),
            None,
        );
        let loader_b = QuadPagingLoader::new(
            params.clone(),
            Vec::new(),
            Arc::new(NullInterpreter),
            None,
        );

        let layer_a = controller.find_sampling_layer(&params, &loader_a.handle());
        let layer_b = controller.find_sampling_layer(&params, &loader_b.handle());
        assert!(Arc::ptr_eq(&layer_a, &layer_b));
        assert_eq!(controller.layer_count(), 1);

        let other = SamplingParams::new(2, 6).unwrap();
        let loader_c =
            QuadPagingLoader::new(other.clone(), Vec::new(), Arc::new(NullInterpreter), None);
        controller.find_sampling_layer(&other, &loader_c.handle());
        assert_eq!(controller.layer_count(), 2);
    }
}
