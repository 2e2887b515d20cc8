//! Connector producing in-memory clients.

use async_trait::async_trait;
use std::sync::{
    Arc,
    atomic::{AtomicUsize, Ordering},
};
use tracing::debug;

use docman_core::{
    backend::{BackendRef, Connector},
    error::DocumentResult,
    settings::DatabaseSettings,
};

use crate::store::InMemoryStore;

/// Hands out a fresh [`InMemoryStore`] for every connect.
///
/// Each distinct [`DatabaseSettings`] therefore sees its own data, the same way two
/// clients pointed at different servers would. Clones share the connect counter.
#[derive(Debug, Clone, Default)]
pub struct MemoryConnector {
    connects: Arc<AtomicUsize>,
}

impl MemoryConnector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of clients created so far.
    pub fn connects(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Connector for MemoryConnector {
    async fn connect(&self, settings: &DatabaseSettings) -> DocumentResult<BackendRef> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        debug!(uri = %settings.uri, database = %settings.name, "creating in-memory client");

        Ok(Arc::new(InMemoryStore::new()))
    }
}
