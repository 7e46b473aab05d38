//! Application state shared across all request handlers.

use evmgw_core::api::StreamApi;
use evmgw_core::config::{ConfigStore, StreamConfig};
use evmgw_core::events::Broadcasters;
use evmgw_core::indexer::Ingestor;
use evmgw_core::state::{LocalClient, StateReader};
use evmgw_core::storage::InMemoryStore;
use std::sync::Arc;

/// Application state that is shared across all request handlers.
///
/// This is cloneable and cheap to pass around (everything is behind Arc).
#[derive(Clone)]
pub struct AppState {
    /// Subscription endpoints.
    pub stream: StreamApi,
    /// Write side for the indexer feeding this gateway.
    pub ingestor: Arc<Ingestor>,
    /// Stream settings (can be reloaded via SIGHUP).
    pub stream_config: ConfigStore<StreamConfig>,
    /// Account and call reads, present when a forked state is attached.
    pub local: Option<Arc<LocalClient>>,
}

impl AppState {
    /// Wire the engine over an in-memory store. Without `local_state` the
    /// state read methods are reported as unavailable.
    pub fn new(stream_config: StreamConfig, local_state: Option<Arc<dyn StateReader>>) -> Self {
        let store = Arc::new(InMemoryStore::new());
        let broadcasters = Broadcasters::new();
        let stream_config = ConfigStore::new(stream_config);

        let stream = StreamApi::new(
            stream_config.clone(),
            store.clone(),
            store.clone(),
            store.clone(),
            broadcasters.clone(),
        );
        let local = local_state.map(|reader| Arc::new(LocalClient::new(reader, store.clone())));
        let ingestor = Arc::new(Ingestor::new(store, broadcasters));

        Self {
            stream,
            ingestor,
            stream_config,
            local,
        }
    }
}
