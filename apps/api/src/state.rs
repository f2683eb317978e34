use std::sync::Arc;

use crate::config::Config;
use crate::orders::store::OrderStore;
use crate::processor::OrderProcessor;
use crate::queue::OrderQueue;
use crate::storage::ArtifactStore;

/// Shared application state injected into all route handlers via Axum extractors.
/// Every collaborator is constructed in `main` and passed in, so tests can swap fakes.
#[derive(Clone)]
pub struct AppState {
    pub orders: Arc<dyn OrderStore>,
    pub artifacts: Arc<dyn ArtifactStore>,
    pub queue: Arc<dyn OrderQueue>,
    /// Used by the webhook to fail an order it claimed but could not enqueue.
    pub processor: Arc<OrderProcessor>,
    pub config: Config,
}
