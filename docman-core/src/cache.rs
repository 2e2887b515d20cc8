//! Memoized backend clients keyed by database settings.
//!
//! Every concrete class declaration asks the cache for a client. Equal
//! [`DatabaseSettings`] always resolve to the same [`ClientHandle`], so declaring many
//! classes against one database opens a single connection pool. Entries are never
//! evicted; they live as long as the cache.

use mea::mutex::Mutex;
use std::{collections::HashMap, fmt, sync::Arc};
use tracing::debug;

use crate::{
    backend::{BackendRef, Connector},
    collection::DatabaseHandle,
    error::DocumentResult,
    settings::DatabaseSettings,
};

/// A cached backend client together with the settings it was built from.
#[derive(Clone)]
pub struct ClientHandle {
    settings: Arc<DatabaseSettings>,
    backend: BackendRef,
}

impl ClientHandle {
    pub fn settings(&self) -> &DatabaseSettings {
        &self.settings
    }

    pub fn backend(&self) -> &BackendRef {
        &self.backend
    }

    /// Handle on the database named by the client's settings.
    pub fn database(&self) -> DatabaseHandle {
        DatabaseHandle::new(self.settings.name.clone(), self.backend.clone())
    }

    /// Whether both handles share one underlying client.
    pub fn ptr_eq(&self, other: &ClientHandle) -> bool {
        Arc::ptr_eq(&self.backend, &other.backend)
    }
}

impl fmt::Debug for ClientHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientHandle")
            .field("database", &self.settings.name)
            .field("backend", &self.backend)
            .finish()
    }
}

/// Registry of live clients, one per distinct [`DatabaseSettings`].
///
/// Misses are serialised, so two concurrent declarations with equal settings still
/// produce exactly one connector call.
pub struct ClientCache {
    connector: Box<dyn Connector>,
    clients: Mutex<HashMap<DatabaseSettings, ClientHandle>>,
}

impl ClientCache {
    pub fn new(connector: impl Connector + 'static) -> Self {
        Self {
            connector: Box::new(connector),
            clients: Mutex::new(HashMap::new()),
        }
    }

    /// Returns the cached client for `settings`, connecting on first use.
    pub async fn get_client(&self, settings: &DatabaseSettings) -> DocumentResult<ClientHandle> {
        let mut clients = self.clients.lock().await;

        if let Some(client) = clients.get(settings) {
            debug!(database = %settings.name, "reusing cached client");
            return Ok(client.clone());
        }

        let backend = self.connector.connect(settings).await?;
        let client = ClientHandle {
            settings: Arc::new(settings.clone()),
            backend,
        };

        debug!(database = %settings.name, entries = clients.len() + 1, "created client");
        clients.insert(settings.clone(), client.clone());

        Ok(client)
    }

    /// Number of distinct live clients.
    pub async fn len(&self) -> usize {
        self.clients.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.clients.lock().await.is_empty()
    }

    pub async fn contains(&self, settings: &DatabaseSettings) -> bool {
        self.clients.lock().await.contains_key(settings)
    }

    /// Shuts down and forgets every cached client.
    ///
    /// Classes declared earlier keep their handles; they must not be used afterwards.
    pub async fn shutdown(&self) -> DocumentResult<()> {
        let clients = std::mem::take(&mut *self.clients.lock().await);

        for (settings, client) in clients {
            debug!(database = %settings.name, "shutting down client");
            client.backend.shutdown().await?;
        }

        Ok(())
    }
}

impl fmt::Debug for ClientCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientCache").finish_non_exhaustive()
    }
}
