use async_trait::async_trait;
use bson::{Bson, Document, oid::ObjectId};
use std::sync::{
    Arc,
    atomic::{AtomicUsize, Ordering},
};

use crate::{
    backend::{BackendRef, Connector, Namespace, StoreBackend},
    error::DocumentResult,
    query::{Filter, Query, Update, UpdateOutcome},
    settings::DatabaseSettings,
};

/// Backend that accepts every write and never returns documents.
#[derive(Debug, Default)]
pub(crate) struct NullBackend;

#[async_trait]
impl StoreBackend for NullBackend {
    async fn count_documents(&self, _ns: &Namespace, _filter: &Filter) -> DocumentResult<u64> {
        Ok(0)
    }

    async fn find_documents(&self, _ns: &Namespace, _query: &Query) -> DocumentResult<Vec<Document>> {
        Ok(vec![])
    }

    async fn insert_documents(
        &self,
        _ns: &Namespace,
        documents: Vec<Document>,
    ) -> DocumentResult<Vec<Bson>> {
        Ok(documents
            .iter()
            .map(|doc| doc.get("_id").cloned().unwrap_or_else(|| ObjectId::new().into()))
            .collect())
    }

    async fn update_documents(
        &self,
        _ns: &Namespace,
        _filter: &Filter,
        _update: &Update,
        _many: bool,
    ) -> DocumentResult<UpdateOutcome> {
        Ok(UpdateOutcome::default())
    }

    async fn replace_document(
        &self,
        _ns: &Namespace,
        _filter: &Filter,
        _document: Document,
        _upsert: bool,
    ) -> DocumentResult<UpdateOutcome> {
        Ok(UpdateOutcome::default())
    }

    async fn delete_documents(
        &self,
        _ns: &Namespace,
        _filter: &Filter,
        _many: bool,
    ) -> DocumentResult<u64> {
        Ok(0)
    }

    async fn list_collections(&self, _database: &str) -> DocumentResult<Vec<String>> {
        Ok(vec![])
    }

    async fn drop_collection(&self, _ns: &Namespace) -> DocumentResult<()> {
        Ok(())
    }
}

/// Connector handing out fresh [`NullBackend`]s and counting the calls.
#[derive(Debug, Clone, Default)]
pub(crate) struct CountingConnector {
    connects: Arc<AtomicUsize>,
}

impl CountingConnector {
    pub(crate) fn connects(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Connector for CountingConnector {
    async fn connect(&self, _settings: &DatabaseSettings) -> DocumentResult<BackendRef> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        // give concurrent callers a chance to race the miss
        tokio::task::yield_now().await;
        Ok(Arc::new(NullBackend))
    }
}
