//! Storage backend abstraction standing in for the document database driver.
//!
//! A [`StoreBackend`] is one client connection: it executes collection operations for any
//! [`Namespace`] (database + collection) it is asked about. A [`Connector`] builds
//! backends from [`DatabaseSettings`] and is what the
//! [`ClientCache`](crate::cache::ClientCache) calls on a miss.
//!
//! # Example
//!
//! ```ignore
//! use docman::backend::{Namespace, StoreBackend};
//! use docman::query::Filter;
//! use bson::doc;
//!
//! let ns = Namespace::new("app", "users");
//! backend.insert_documents(&ns, vec![doc! { "name": "Alice" }]).await?;
//! let count = backend.count_documents(&ns, &Filter::eq("name", "Alice")).await?;
//! ```

use async_trait::async_trait;
use bson::{Bson, Document};
use std::{fmt, fmt::Debug, sync::Arc};

use crate::{
    error::DocumentResult,
    query::{Filter, Query, Update, UpdateOutcome},
    settings::DatabaseSettings,
};

/// Fully qualified collection address.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Namespace {
    pub database: String,
    pub collection: String,
}

impl Namespace {
    pub fn new(database: impl Into<String>, collection: impl Into<String>) -> Self {
        Self {
            database: database.into(),
            collection: collection.into(),
        }
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.database, self.collection)
    }
}

/// Abstract interface for document database clients.
///
/// All operations are forwarded verbatim by managers; no retries or caching happen
/// above this trait. Implementations must be thread-safe.
#[async_trait]
pub trait StoreBackend: Send + Sync + Debug {
    /// Counts documents in `ns` matching `filter`.
    async fn count_documents(&self, ns: &Namespace, filter: &Filter) -> DocumentResult<u64>;

    /// Returns the documents in `ns` selected by `query`, in query order.
    async fn find_documents(&self, ns: &Namespace, query: &Query) -> DocumentResult<Vec<Document>>;

    /// Returns the first document in `ns` matching `filter`.
    async fn find_one_document(
        &self,
        ns: &Namespace,
        filter: &Filter,
    ) -> DocumentResult<Option<Document>> {
        Ok(self
            .find_documents(ns, &Query::builder().filter(filter.clone()).limit(1).build())
            .await?
            .into_iter()
            .next())
    }

    /// Inserts documents, assigning an `_id` to those without one.
    ///
    /// Returns the `_id` of every inserted document, in input order.
    async fn insert_documents(
        &self,
        ns: &Namespace,
        documents: Vec<Document>,
    ) -> DocumentResult<Vec<Bson>>;

    /// Applies `update` to the first (or every, when `many`) document matching `filter`.
    async fn update_documents(
        &self,
        ns: &Namespace,
        filter: &Filter,
        update: &Update,
        many: bool,
    ) -> DocumentResult<UpdateOutcome>;

    /// Replaces the first document matching `filter` with `document`.
    ///
    /// With `upsert`, inserts `document` when nothing matches.
    async fn replace_document(
        &self,
        ns: &Namespace,
        filter: &Filter,
        document: Document,
        upsert: bool,
    ) -> DocumentResult<UpdateOutcome>;

    /// Deletes the first (or every, when `many`) document matching `filter`.
    ///
    /// Returns the number of deleted documents.
    async fn delete_documents(
        &self,
        ns: &Namespace,
        filter: &Filter,
        many: bool,
    ) -> DocumentResult<u64>;

    /// Lists collection names of `database`.
    async fn list_collections(&self, database: &str) -> DocumentResult<Vec<String>>;

    /// Drops the collection and all its documents. Dropping a missing collection is a no-op.
    async fn drop_collection(&self, ns: &Namespace) -> DocumentResult<()>;

    /// Releases connections held by the client.
    async fn shutdown(&self) -> DocumentResult<()> {
        Ok(())
    }
}

/// Shared handle to a backend client.
pub type BackendRef = Arc<dyn StoreBackend>;

/// Creates backend clients from database settings.
#[async_trait]
pub trait Connector: Send + Sync {
    async fn connect(&self, settings: &DatabaseSettings) -> DocumentResult<BackendRef>;
}

#[async_trait]
impl<C> Connector for Arc<C>
where
    C: Connector + ?Sized,
{
    async fn connect(&self, settings: &DatabaseSettings) -> DocumentResult<BackendRef> {
        (**self).connect(settings).await
    }
}
