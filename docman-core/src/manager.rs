//! Per-class query managers.
//!
//! Every concrete [`DocumentClass`] owns exactly one [`Manager`], reachable through
//! [`DocumentClass::documents`]. Managers forward to the class's collection and wrap
//! the documents they read back as instances of that class.
//!
//! # Example
//!
//! ```ignore
//! let users = users_class.documents()?;
//!
//! let alice = users.create(doc! { "name": "Alice", "age": 30 }).await?;
//! let adults = users
//!     .find(Query::builder().filter(Filter::gte("age", 18)).build())
//!     .await?;
//!
//! users.update_one(Filter::id(alice.id().cloned().unwrap()), Update::new().inc("age", 1)).await?;
//! assert_eq!(users.count(Filter::All).await?, 1);
//! ```

use bson::{Bson, Document as BsonDocument};
use std::{fmt, sync::Weak};
use tracing::trace;

use crate::{
    class::{ClassInner, DocumentClass},
    collection::CollectionHandle,
    document::Document,
    error::{DocumentError, DocumentResult},
    init::InitData,
    query::{Filter, Query, Update, UpdateOutcome},
};

/// Query and persistence operations of one document class.
///
/// Only built by class declaration; abstract classes never get one.
pub struct Manager {
    class: Weak<ClassInner>,
    collection: CollectionHandle,
}

impl Manager {
    pub(crate) fn new(class: Weak<ClassInner>, collection: CollectionHandle) -> Self {
        Self { class, collection }
    }

    fn class(&self) -> DocumentResult<DocumentClass> {
        self.class
            .upgrade()
            .map(DocumentClass::from_inner)
            .ok_or_else(|| DocumentError::NoManager(self.collection.name().to_string()))
    }

    /// Name of the resolved collection.
    pub fn name(&self) -> &str {
        self.collection.name()
    }

    pub fn collection(&self) -> &CollectionHandle {
        &self.collection
    }

    pub async fn count(&self, filter: Filter) -> DocumentResult<u64> {
        trace!(collection = %self.name(), %filter, "count");
        self.collection.count(&filter).await
    }

    pub async fn find(&self, query: impl Into<Query>) -> DocumentResult<Vec<Document>> {
        let query = query.into();
        trace!(collection = %self.name(), filter = %query.filter, "find");

        let class = self.class()?;
        Ok(self
            .collection
            .find(&query)
            .await?
            .into_iter()
            .map(|data| class.from_stored(data))
            .collect())
    }

    pub async fn find_one(&self, filter: Filter) -> DocumentResult<Option<Document>> {
        trace!(collection = %self.name(), %filter, "find_one");

        let class = self.class()?;
        Ok(self
            .collection
            .find_one(&filter)
            .await?
            .map(|data| class.from_stored(data)))
    }

    /// Returns the first document matching `filter`.
    ///
    /// # Errors
    ///
    /// [`DocumentError::DoesNotExist`] when nothing matches.
    pub async fn get(&self, filter: Filter) -> DocumentResult<Document> {
        let rendered = filter.to_string();

        self.find_one(filter)
            .await?
            .ok_or_else(|| DocumentError::DoesNotExist {
                collection: self.name().to_string(),
                filter: rendered,
            })
    }

    /// Inserts `document` and records the assigned `_id` on it.
    pub async fn insert_one(&self, document: &mut Document) -> DocumentResult<Bson> {
        trace!(collection = %self.name(), "insert_one");

        let id = self
            .collection
            .insert(vec![document.data().clone()])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| DocumentError::Backend("insert returned no _id".to_string()))?;

        if !document.contains("_id") {
            document.set("_id", id.clone());
        }

        Ok(id)
    }

    /// Inserts every document, recording the assigned `_id`s on them.
    pub async fn insert_many(&self, documents: &mut [Document]) -> DocumentResult<Vec<Bson>> {
        trace!(collection = %self.name(), count = documents.len(), "insert_many");

        if documents.is_empty() {
            return Ok(vec![]);
        }

        let ids = self
            .collection
            .insert(documents.iter().map(|doc| doc.data().clone()).collect())
            .await?;

        for (document, id) in documents.iter_mut().zip(ids.iter()) {
            if !document.contains("_id") {
                document.set("_id", id.clone());
            }
        }

        Ok(ids)
    }

    /// Builds an instance from `data` (defaults applied), inserts and returns it.
    pub async fn create(&self, data: impl Into<InitData>) -> DocumentResult<Document> {
        let mut document = self.class()?.create_document(data);
        self.insert_one(&mut document).await?;
        Ok(document)
    }

    pub async fn update_one(&self, filter: Filter, update: Update) -> DocumentResult<UpdateOutcome> {
        trace!(collection = %self.name(), %filter, "update_one");
        self.collection.update(&filter, &update, false).await
    }

    pub async fn update_many(&self, filter: Filter, update: Update) -> DocumentResult<UpdateOutcome> {
        trace!(collection = %self.name(), %filter, "update_many");
        self.collection.update(&filter, &update, true).await
    }

    pub async fn replace_one(
        &self,
        filter: Filter,
        replacement: BsonDocument,
        upsert: bool,
    ) -> DocumentResult<UpdateOutcome> {
        trace!(collection = %self.name(), %filter, upsert, "replace_one");
        self.collection.replace(&filter, replacement, upsert).await
    }

    pub async fn delete_one(&self, filter: Filter) -> DocumentResult<u64> {
        trace!(collection = %self.name(), %filter, "delete_one");
        self.collection.delete(&filter, false).await
    }

    pub async fn delete_many(&self, filter: Filter) -> DocumentResult<u64> {
        trace!(collection = %self.name(), %filter, "delete_many");
        self.collection.delete(&filter, true).await
    }

    /// Drops the whole collection.
    pub async fn drop_collection(&self) -> DocumentResult<()> {
        trace!(collection = %self.name(), "drop_collection");
        self.collection.drop_collection().await
    }

    /// Inserts `document`, or upserts it by `_id` when it already has one.
    pub async fn save(&self, document: &mut Document) -> DocumentResult<()> {
        match document.id().cloned() {
            Some(id) => {
                self.replace_one(Filter::id(id), document.data().clone(), true)
                    .await?;
            }
            None => {
                self.insert_one(document).await?;
            }
        }

        Ok(())
    }
}

impl fmt::Debug for Manager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Manager")
            .field("collection", &self.collection)
            .field("bound", &(self.class.strong_count() > 0))
            .finish()
    }
}
