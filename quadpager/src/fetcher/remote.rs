//! HTTP-backed tile fetcher.

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use dashmap::DashMap;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::{FetchDelivery, FetchError, FetchOutcome, TileFetcher};
use crate::coord::TileIdent;
use crate::tile::TileFetchRequest;

/// Default HTTP request timeout in seconds.
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Fetches tiles over HTTP from the request's source URL template.
///
/// Each fetch runs on its own tokio task. Cancellation is tracked per tile
/// through a registry of [`CancellationToken`]s; cancelling a tile aborts
/// its in-flight request and reports [`FetchError::Cancelled`] through the
/// delivery sink.
pub struct RemoteTileFetcher {
    name: String,
    client: reqwest::Client,
    in_flight: Arc<DashMap<TileIdent, CancellationToken>>,
}

impl RemoteTileFetcher {
    /// Creates a fetcher with the default request timeout.
    pub fn new(name: impl Into<String>) -> Result<Self, FetchError> {
        Self::with_timeout(name, DEFAULT_TIMEOUT_SECS)
    }

    /// Creates a fetcher with a custom request timeout.
    pub fn with_timeout(name: impl Into<String>, timeout_secs: u64) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| FetchError::Transport(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            name: name.into(),
            client,
            in_flight: Arc::new(DashMap::new()),
        })
    }

    /// Number of fetches currently in flight.
    pub fn in_flight(&self) -> usize {
        self.in_flight.len()
    }
}

impl TileFetcher for RemoteTileFetcher {
    fn name(&self) -> &str {
        &self.name
    }

    fn start_fetch(&self, request: TileFetchRequest, delivery: FetchDelivery) {
        let ident = request.ident();
        let url = request.source().url_for(&ident);
        let token = self
            .in_flight
            .entry(ident)
            .or_insert_with(CancellationToken::new)
            .clone();
        let client = self.client.clone();
        let in_flight = Arc::clone(&self.in_flight);

        debug!(
            tile_zoom = ident.zoom,
            tile_x = ident.x,
            tile_y = ident.y,
            source = request.source().name(),
            "Starting tile fetch"
        );

        tokio::spawn(async move {
            let outcome = tokio::select! {
                biased;

                _ = token.cancelled() => FetchOutcome::Failed(FetchError::Cancelled),

                result = fetch_url(&client, &url) => match result {
                    Ok(data) => FetchOutcome::Payload(data),
                    Err(err) => {
                        warn!(tile = %ident, error = %err, "Tile fetch failed");
                        FetchOutcome::Failed(err)
                    }
                },
            };

            in_flight.remove(&ident);
            delivery.deliver(outcome);
        });
    }

    fn cancel_fetch(&self, ident: TileIdent) {
        if let Some((_, token)) = self.in_flight.remove(&ident) {
            debug!(tile = %ident, "Cancelling tile fetch");
            token.cancel();
        }
    }
}

async fn fetch_url(client: &reqwest::Client, url: &str) -> Result<Bytes, FetchError> {
    let response = client
        .get(url)
        .send()
        .await
        .map_err(|e| FetchError::Transport(format!("Request failed: {}", e)))?;

    let status = response.status();
    if !status.is_success() {
        return Err(FetchError::Http {
            status: status.as_u16(),
            url: url.to_string(),
        });
    }

    response
        .bytes()
        .await
        .map_err(|e| FetchError::Transport(format!("Failed to read response: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_fetcher() {
        let fetcher = RemoteTileFetcher::new("Image Fetcher").unwrap();
        assert_eq!(fetcher.name(), "Image Fetcher");
        assert_eq!(fetcher.in_flight(), 0);
    }

    #[test]
    fn test_cancel_unknown_tile_is_noop() {
        let fetcher = RemoteTileFetcher::new("Image Fetcher").unwrap();
        fetcher.cancel_fetch(TileIdent::new(4, 1, 2).unwrap());
        assert_eq!(fetcher.in_flight(), 0);
    }
}
