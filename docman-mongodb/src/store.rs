//! MongoDB storage backend and connector.

use async_trait::async_trait;
use bson::{Bson, Document};
use futures::TryStreamExt;
use mongodb::{
    Client, Collection as MongoCollection,
    error::Error as MongoError,
    options::{ClientOptions, FindOptions},
};
use std::{sync::Arc, time::Duration};
use tracing::{debug, trace};

use docman_core::{
    backend::{BackendRef, Connector, Namespace, StoreBackend},
    error::{DocumentError, DocumentResult},
    query::{Filter, Query, Update, UpdateOutcome},
    settings::DatabaseSettings,
};

use crate::query::{MongoQueryTranslator, translate_sort, translate_update};

fn backend_error(err: MongoError) -> DocumentError {
    DocumentError::Backend(err.to_string())
}

/// A MongoDB client serving every database and collection reachable through it.
#[derive(Debug, Clone)]
pub struct MongoDbStore {
    client: Client,
}

impl MongoDbStore {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    fn get_collection(&self, ns: &Namespace) -> MongoCollection<Document> {
        self.client
            .database(&ns.database)
            .collection(&ns.collection)
    }
}

#[async_trait]
impl StoreBackend for MongoDbStore {
    async fn count_documents(&self, ns: &Namespace, filter: &Filter) -> DocumentResult<u64> {
        self.get_collection(ns)
            .count_documents(MongoQueryTranslator::translate(filter)?)
            .await
            .map_err(backend_error)
    }

    async fn find_documents(&self, ns: &Namespace, query: &Query) -> DocumentResult<Vec<Document>> {
        let mut options = FindOptions::default();

        match query.limit {
            // the server reads a zero limit as no limit at all
            Some(0) => return Ok(vec![]),
            Some(limit) => options.limit = Some(limit as i64),
            None => {}
        }
        if let Some(skip) = query.skip {
            options.skip = Some(skip as u64);
        }
        if !query.sort.is_empty() {
            options.sort = Some(translate_sort(&query.sort));
        }

        self.get_collection(ns)
            .find(MongoQueryTranslator::translate(&query.filter)?)
            .with_options(options)
            .await
            .map_err(backend_error)?
            .try_collect::<Vec<Document>>()
            .await
            .map_err(backend_error)
    }

    async fn find_one_document(
        &self,
        ns: &Namespace,
        filter: &Filter,
    ) -> DocumentResult<Option<Document>> {
        self.get_collection(ns)
            .find_one(MongoQueryTranslator::translate(filter)?)
            .await
            .map_err(backend_error)
    }

    async fn insert_documents(
        &self,
        ns: &Namespace,
        documents: Vec<Document>,
    ) -> DocumentResult<Vec<Bson>> {
        if documents.is_empty() {
            return Ok(vec![]);
        }

        let result = self
            .get_collection(ns)
            .insert_many(documents)
            .await
            .map_err(backend_error)?;

        let mut ids = result.inserted_ids.into_iter().collect::<Vec<_>>();
        ids.sort_by_key(|(index, _)| *index);

        Ok(ids.into_iter().map(|(_, id)| id).collect())
    }

    async fn update_documents(
        &self,
        ns: &Namespace,
        filter: &Filter,
        update: &Update,
        many: bool,
    ) -> DocumentResult<UpdateOutcome> {
        let collection = self.get_collection(ns);
        let query = MongoQueryTranslator::translate(filter)?;

        // the server rejects an empty update document
        if update.is_empty() {
            let matched = collection
                .count_documents(query)
                .await
                .map_err(backend_error)?;

            return Ok(UpdateOutcome {
                matched: if many { matched } else { matched.min(1) },
                ..UpdateOutcome::default()
            });
        }

        let update = translate_update(update);
        let result = if many {
            collection.update_many(query, update).await
        } else {
            collection.update_one(query, update).await
        }
        .map_err(backend_error)?;

        Ok(UpdateOutcome {
            matched: result.matched_count,
            modified: result.modified_count,
            upserted_id: result.upserted_id,
        })
    }

    async fn replace_document(
        &self,
        ns: &Namespace,
        filter: &Filter,
        document: Document,
        upsert: bool,
    ) -> DocumentResult<UpdateOutcome> {
        let result = self
            .get_collection(ns)
            .replace_one(MongoQueryTranslator::translate(filter)?, document)
            .upsert(upsert)
            .await
            .map_err(backend_error)?;

        Ok(UpdateOutcome {
            matched: result.matched_count,
            modified: result.modified_count,
            upserted_id: result.upserted_id,
        })
    }

    async fn delete_documents(
        &self,
        ns: &Namespace,
        filter: &Filter,
        many: bool,
    ) -> DocumentResult<u64> {
        let collection = self.get_collection(ns);
        let query = MongoQueryTranslator::translate(filter)?;

        let result = if many {
            collection.delete_many(query).await
        } else {
            collection.delete_one(query).await
        }
        .map_err(backend_error)?;

        Ok(result.deleted_count)
    }

    async fn list_collections(&self, database: &str) -> DocumentResult<Vec<String>> {
        self.client
            .database(database)
            .list_collection_names()
            .await
            .map_err(backend_error)
    }

    async fn drop_collection(&self, ns: &Namespace) -> DocumentResult<()> {
        trace!(namespace = %ns, "dropping collection");

        self.get_collection(ns)
            .drop()
            .await
            .map_err(backend_error)
    }

    async fn shutdown(&self) -> DocumentResult<()> {
        debug!("shutting down MongoDB client");
        self.client.clone().shutdown().await;

        Ok(())
    }
}

/// Builds [`MongoDbStore`] clients from database settings.
///
/// The URI is parsed by the driver; the optional pool and timeout settings override
/// whatever the URI specifies.
#[derive(Debug, Clone, Copy, Default)]
pub struct MongoConnector;

impl MongoConnector {
    pub fn new() -> Self {
        Self
    }

    /// Driver options for `settings`.
    pub async fn client_options(settings: &DatabaseSettings) -> DocumentResult<ClientOptions> {
        let mut options = ClientOptions::parse(&settings.uri)
            .await
            .map_err(|e| DocumentError::Initialization(e.to_string()))?;

        if let Some(app_name) = &settings.app_name {
            options.app_name = Some(app_name.clone());
        }
        if let Some(min) = settings.min_pool_size {
            options.min_pool_size = Some(min);
        }
        if let Some(max) = settings.max_pool_size {
            options.max_pool_size = Some(max);
        }
        if let Some(ms) = settings.connect_timeout_ms {
            options.connect_timeout = Some(Duration::from_millis(ms));
        }
        if let Some(ms) = settings.server_selection_timeout_ms {
            options.server_selection_timeout = Some(Duration::from_millis(ms));
        }

        Ok(options)
    }
}

#[async_trait]
impl Connector for MongoConnector {
    async fn connect(&self, settings: &DatabaseSettings) -> DocumentResult<BackendRef> {
        debug!(database = %settings.name, "creating MongoDB client");

        let client = Client::with_options(Self::client_options(settings).await?)
            .map_err(|e| DocumentError::Initialization(e.to_string()))?;

        Ok(Arc::new(MongoDbStore::new(client)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_settings_override_uri_options() {
        let settings = DatabaseSettings::new("mongodb://localhost:27017/?appName=uri", "test")
            .with_app_name("docman")
            .with_pool_size(Some(1), Some(8))
            .with_connect_timeout_ms(1500);

        let options = MongoConnector::client_options(&settings).await.unwrap();

        assert_eq!(options.app_name.as_deref(), Some("docman"));
        assert_eq!(options.min_pool_size, Some(1));
        assert_eq!(options.max_pool_size, Some(8));
        assert_eq!(options.connect_timeout, Some(Duration::from_millis(1500)));
        assert_eq!(options.server_selection_timeout, None);
    }

    #[tokio::test]
    async fn test_zero_limit_finds_nothing() {
        let settings = DatabaseSettings::new("mongodb://localhost:27017", "test")
            .with_server_selection_timeout_ms(100);
        let store = MongoConnector.connect(&settings).await.unwrap();
        let query = Query::builder().limit(0).build();

        let found = store
            .find_documents(&Namespace::new("test", "items"), &query)
            .await
            .unwrap();
        assert!(found.is_empty());
    }

    #[tokio::test]
    async fn test_invalid_uri_is_an_initialization_error() {
        let settings = DatabaseSettings::new("not-a-uri", "test");

        assert!(matches!(
            MongoConnector.connect(&settings).await,
            Err(DocumentError::Initialization(_))
        ));
    }
}
