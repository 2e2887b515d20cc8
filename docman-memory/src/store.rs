//! In-memory storage implementation for document classes.
//!
//! Collections are kept as insertion-ordered vectors of BSON documents behind an
//! async-aware read-write lock, keyed by [`Namespace`].

use async_trait::async_trait;
use bson::{Bson, Document, oid::ObjectId};
use mea::rwlock::RwLock;
use std::{collections::HashMap, sync::Arc};
use tracing::trace;

use docman_core::{
    backend::{Namespace, StoreBackend},
    error::{DocumentError, DocumentResult},
    query::{FieldOp, Filter, Query, Update, UpdateOp, UpdateOutcome},
};

use crate::evaluator::{DocumentEvaluator, compare_documents};

type StoreMap = HashMap<Namespace, Vec<Document>>;

/// Thread-safe in-memory document storage backend.
///
/// `InMemoryStore` is cloneable and uses an `Arc`-wrapped internal state; clones share
/// the same data. Queries scan every document of a collection, there is no indexing.
///
/// # Example
///
/// ```ignore
/// use docman_memory::InMemoryStore;
/// use docman::backend::{Namespace, StoreBackend};
/// use docman::query::Filter;
/// use bson::doc;
///
/// let store = InMemoryStore::new();
/// let ns = Namespace::new("app", "users");
///
/// store.insert_documents(&ns, vec![doc! { "name": "Alice", "age": 30 }]).await?;
/// assert_eq!(store.count_documents(&ns, &Filter::gte("age", 18)).await?, 1);
/// ```
#[derive(Default, Clone, Debug)]
pub struct InMemoryStore {
    store: Arc<RwLock<StoreMap>>,
}

impl InMemoryStore {
    /// Creates a new empty in-memory store.
    pub fn new() -> Self {
        Self {
            store: Arc::new(RwLock::new(StoreMap::new())),
        }
    }
}

/// Returns `document` with `_id` as its first field, generating an `ObjectId` if absent.
fn with_id(mut document: Document) -> (Bson, Document) {
    let id = document
        .remove("_id")
        .unwrap_or_else(|| Bson::ObjectId(ObjectId::new()));

    let mut stored = Document::new();
    stored.insert("_id", id.clone());
    for (key, value) in document {
        stored.insert(key, value);
    }

    (id, stored)
}

fn has_id(documents: &[Document], id: &Bson) -> bool {
    documents.iter().any(|doc| doc.get("_id") == Some(id))
}

/// `_id` pinned by an equality filter, used for upserts.
fn filter_id(filter: &Filter) -> Option<Bson> {
    match filter {
        Filter::Field { field, op: FieldOp::Eq, value } if field == "_id" => Some(value.clone()),
        Filter::And(filters) => filters.iter().find_map(filter_id),
        _ => None,
    }
}

fn increment(current: Option<&Bson>, amount: &Bson, field: &str) -> DocumentResult<Bson> {
    let invalid = || {
        DocumentError::InvalidDocument(format!("cannot increment '{}' by {}", field, amount))
    };

    Ok(match (current, amount) {
        (None, Bson::Int32(_) | Bson::Int64(_) | Bson::Double(_)) => amount.clone(),
        (Some(Bson::Int32(a)), Bson::Int32(b)) => match a.checked_add(*b) {
            Some(sum) => Bson::Int32(sum),
            None => Bson::Int64(*a as i64 + *b as i64),
        },
        (Some(Bson::Int32(a)), Bson::Int64(b)) => {
            Bson::Int64((*a as i64).checked_add(*b).ok_or_else(invalid)?)
        }
        (Some(Bson::Int64(a)), Bson::Int32(b)) => {
            Bson::Int64(a.checked_add(*b as i64).ok_or_else(invalid)?)
        }
        (Some(Bson::Int64(a)), Bson::Int64(b)) => Bson::Int64(a.checked_add(*b).ok_or_else(invalid)?),
        (Some(Bson::Int32(a)), Bson::Double(b)) => Bson::Double(*a as f64 + b),
        (Some(Bson::Int64(a)), Bson::Double(b)) => Bson::Double(*a as f64 + b),
        (Some(Bson::Double(a)), Bson::Int32(b)) => Bson::Double(a + *b as f64),
        (Some(Bson::Double(a)), Bson::Int64(b)) => Bson::Double(a + *b as f64),
        (Some(Bson::Double(a)), Bson::Double(b)) => Bson::Double(a + b),
        _ => return Err(invalid()),
    })
}

/// Applies `update` to a copy of `document`. Returns the copy when anything changed.
fn apply_update(document: &Document, update: &Update) -> DocumentResult<Option<Document>> {
    let mut updated = document.clone();

    for op in &update.ops {
        let field = match op {
            UpdateOp::Set(field, _) | UpdateOp::Unset(field) | UpdateOp::Inc(field, _) => field,
        };
        if field == "_id" {
            return Err(DocumentError::InvalidDocument(
                "the _id field cannot be updated".to_string(),
            ));
        }

        match op {
            UpdateOp::Set(field, value) => {
                updated.insert(field.clone(), value.clone());
            }
            UpdateOp::Unset(field) => {
                updated.remove(field);
            }
            UpdateOp::Inc(field, amount) => {
                let value = increment(updated.get(field), amount, field)?;
                updated.insert(field.clone(), value);
            }
        }
    }

    Ok((&updated != document).then_some(updated))
}

#[async_trait]
impl StoreBackend for InMemoryStore {
    async fn count_documents(&self, ns: &Namespace, filter: &Filter) -> DocumentResult<u64> {
        let store = self.store.read().await;

        Ok(store
            .get(ns)
            .map(|documents| {
                documents
                    .iter()
                    .filter(|doc| DocumentEvaluator::matches(doc, filter))
                    .count() as u64
            })
            .unwrap_or(0))
    }

    async fn find_documents(&self, ns: &Namespace, query: &Query) -> DocumentResult<Vec<Document>> {
        let store = self.store.read().await;
        let documents = match store.get(ns) {
            Some(documents) => documents,
            None => return Ok(vec![]),
        };

        let mut matched = documents
            .iter()
            .filter(|doc| DocumentEvaluator::matches(doc, &query.filter))
            .collect::<Vec<_>>();

        if !query.sort.is_empty() {
            // stable, so ties keep insertion order
            matched.sort_by(|a, b| compare_documents(a, b, &query.sort));
        }

        Ok(matched
            .into_iter()
            .skip(query.skip.unwrap_or(0))
            .take(query.limit.unwrap_or(usize::MAX))
            .cloned()
            .collect())
    }

    async fn insert_documents(
        &self,
        ns: &Namespace,
        documents: Vec<Document>,
    ) -> DocumentResult<Vec<Bson>> {
        let mut store = self.store.write().await;
        let collection = store.entry(ns.clone()).or_default();

        let prepared = documents.into_iter().map(with_id).collect::<Vec<_>>();

        for (index, (id, _)) in prepared.iter().enumerate() {
            if has_id(collection, id) || prepared[..index].iter().any(|(other, _)| other == id) {
                return Err(DocumentError::Backend(format!(
                    "duplicate key in {}: _id {}",
                    ns, id
                )));
            }
        }

        trace!(namespace = %ns, count = prepared.len(), "inserting documents");

        let mut ids = Vec::with_capacity(prepared.len());
        for (id, document) in prepared {
            collection.push(document);
            ids.push(id);
        }

        Ok(ids)
    }

    async fn update_documents(
        &self,
        ns: &Namespace,
        filter: &Filter,
        update: &Update,
        many: bool,
    ) -> DocumentResult<UpdateOutcome> {
        let mut store = self.store.write().await;
        let mut outcome = UpdateOutcome::default();

        let Some(collection) = store.get_mut(ns) else {
            return Ok(outcome);
        };

        // compute every change first so a failing update leaves the collection untouched
        let mut changes = Vec::new();
        for (index, document) in collection.iter().enumerate() {
            if !DocumentEvaluator::matches(document, filter) {
                continue;
            }

            outcome.matched += 1;
            if let Some(updated) = apply_update(document, update)? {
                changes.push((index, updated));
            }

            if !many {
                break;
            }
        }

        outcome.modified = changes.len() as u64;
        for (index, updated) in changes {
            collection[index] = updated;
        }

        Ok(outcome)
    }

    async fn replace_document(
        &self,
        ns: &Namespace,
        filter: &Filter,
        document: Document,
        upsert: bool,
    ) -> DocumentResult<UpdateOutcome> {
        let mut store = self.store.write().await;
        if !upsert && !store.contains_key(ns) {
            return Ok(UpdateOutcome::default());
        }
        let collection = store.entry(ns.clone()).or_default();

        let position = collection
            .iter()
            .position(|doc| DocumentEvaluator::matches(doc, filter));

        match position {
            Some(index) => {
                let existing_id = collection[index].get("_id").cloned();
                let mut replacement = document;

                match (replacement.get("_id"), &existing_id) {
                    (Some(new), Some(old)) if new != old => {
                        return Err(DocumentError::InvalidDocument(format!(
                            "replacement would change _id from {} to {}",
                            old, new
                        )));
                    }
                    (None, Some(old)) => {
                        replacement.insert("_id", old.clone());
                    }
                    _ => {}
                }

                let (_, replacement) = with_id(replacement);
                let modified = collection[index] != replacement;
                collection[index] = replacement;

                Ok(UpdateOutcome {
                    matched: 1,
                    modified: modified as u64,
                    upserted_id: None,
                })
            }
            None if upsert => {
                let mut document = document;
                if !document.contains_key("_id") {
                    if let Some(id) = filter_id(filter) {
                        document.insert("_id", id);
                    }
                }

                let (id, document) = with_id(document);
                if has_id(collection, &id) {
                    return Err(DocumentError::Backend(format!(
                        "duplicate key in {}: _id {}",
                        ns, id
                    )));
                }

                trace!(namespace = %ns, %id, "upserting document");
                collection.push(document);

                Ok(UpdateOutcome {
                    matched: 0,
                    modified: 0,
                    upserted_id: Some(id),
                })
            }
            None => Ok(UpdateOutcome::default()),
        }
    }

    async fn delete_documents(
        &self,
        ns: &Namespace,
        filter: &Filter,
        many: bool,
    ) -> DocumentResult<u64> {
        let mut store = self.store.write().await;
        let Some(collection) = store.get_mut(ns) else {
            return Ok(0);
        };

        if many {
            let before = collection.len();
            collection.retain(|doc| !DocumentEvaluator::matches(doc, filter));
            return Ok((before - collection.len()) as u64);
        }

        match collection
            .iter()
            .position(|doc| DocumentEvaluator::matches(doc, filter))
        {
            Some(index) => {
                collection.remove(index);
                Ok(1)
            }
            None => Ok(0),
        }
    }

    async fn list_collections(&self, database: &str) -> DocumentResult<Vec<String>> {
        let mut names = self
            .store
            .read()
            .await
            .keys()
            .filter(|ns| ns.database == database)
            .map(|ns| ns.collection.clone())
            .collect::<Vec<_>>();

        names.sort();
        Ok(names)
    }

    async fn drop_collection(&self, ns: &Namespace) -> DocumentResult<()> {
        trace!(namespace = %ns, "dropping collection");
        self.store.write().await.remove(ns);

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::doc;
    use docman_core::query::SortDirection;

    fn ns() -> Namespace {
        Namespace::new("test", "people")
    }

    async fn seeded() -> InMemoryStore {
        let store = InMemoryStore::new();
        store
            .insert_documents(
                &ns(),
                vec![
                    doc! { "name": "Alice", "age": 30 },
                    doc! { "name": "Bob", "age": 25 },
                    doc! { "name": "Carol", "age": 35 },
                ],
            )
            .await
            .unwrap();
        store
    }

    #[tokio::test]
    async fn test_insert_assigns_ids_in_order() {
        let store = InMemoryStore::new();
        let ids = store
            .insert_documents(&ns(), vec![doc! { "_id": 7, "a": 1 }, doc! { "a": 2 }])
            .await
            .unwrap();

        assert_eq!(ids[0], Bson::Int32(7));
        assert!(matches!(ids[1], Bson::ObjectId(_)));

        let stored = store.find_documents(&ns(), &Query::new()).await.unwrap();
        assert_eq!(stored[0].keys().next().map(String::as_str), Some("_id"));
        assert_eq!(stored[1].get("_id"), Some(&ids[1]));
    }

    #[tokio::test]
    async fn test_duplicate_ids_are_rejected() {
        let store = InMemoryStore::new();
        store.insert_documents(&ns(), vec![doc! { "_id": 1 }]).await.unwrap();

        let err = store
            .insert_documents(&ns(), vec![doc! { "_id": 2 }, doc! { "_id": 1 }])
            .await
            .unwrap_err();

        assert!(matches!(err, DocumentError::Backend(_)));
        assert_eq!(store.count_documents(&ns(), &Filter::All).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_find_sorts_skips_and_limits() {
        let store = seeded().await;
        let query = Query::builder()
            .sort("age", SortDirection::Desc)
            .skip(1)
            .limit(1)
            .build();

        let found = store.find_documents(&ns(), &query).await.unwrap();

        assert_eq!(found.len(), 1);
        assert_eq!(found[0].get_str("name").unwrap(), "Alice");
    }

    #[tokio::test]
    async fn test_missing_collection_is_empty() {
        let store = InMemoryStore::new();

        assert_eq!(store.count_documents(&ns(), &Filter::All).await.unwrap(), 0);
        assert!(store.find_documents(&ns(), &Query::new()).await.unwrap().is_empty());
        assert_eq!(store.delete_documents(&ns(), &Filter::All, true).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_update_one_and_many() {
        let store = seeded().await;

        let outcome = store
            .update_documents(&ns(), &Filter::gte("age", 30), &Update::new().inc("age", 1), false)
            .await
            .unwrap();
        assert_eq!((outcome.matched, outcome.modified), (1, 1));

        let outcome = store
            .update_documents(&ns(), &Filter::All, &Update::new().set("active", true), true)
            .await
            .unwrap();
        assert_eq!((outcome.matched, outcome.modified), (3, 3));

        let alice = store
            .find_one_document(&ns(), &Filter::eq("name", "Alice"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(alice.get_i32("age").unwrap(), 31);
        assert!(alice.get_bool("active").unwrap());
    }

    #[tokio::test]
    async fn test_update_without_change_is_not_modified() {
        let store = seeded().await;

        let outcome = store
            .update_documents(&ns(), &Filter::eq("name", "Bob"), &Update::new().set("age", 25), false)
            .await
            .unwrap();

        assert_eq!((outcome.matched, outcome.modified), (1, 0));
    }

    #[tokio::test]
    async fn test_failed_update_leaves_documents_untouched() {
        let store = seeded().await;

        let err = store
            .update_documents(&ns(), &Filter::All, &Update::new().set("x", 1).inc("name", 1), true)
            .await
            .unwrap_err();

        assert!(matches!(err, DocumentError::InvalidDocument(_)));
        assert_eq!(store.count_documents(&ns(), &Filter::exists("x")).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_replace_and_upsert() {
        let store = seeded().await;

        let outcome = store
            .replace_document(&ns(), &Filter::eq("name", "Bob"), doc! { "name": "Robert" }, false)
            .await
            .unwrap();
        assert_eq!(outcome.matched, 1);
        assert_eq!(store.count_documents(&ns(), &Filter::eq("name", "Robert")).await.unwrap(), 1);

        let id = ObjectId::new();
        let outcome = store
            .replace_document(&ns(), &Filter::id(id), doc! { "name": "Dave" }, true)
            .await
            .unwrap();
        assert_eq!(outcome.upserted_id, Some(Bson::ObjectId(id)));
        assert_eq!(store.count_documents(&ns(), &Filter::All).await.unwrap(), 4);

        let outcome = store
            .replace_document(&ns(), &Filter::eq("name", "Nobody"), doc! {}, false)
            .await
            .unwrap();
        assert_eq!(outcome, UpdateOutcome::default());
    }

    #[tokio::test]
    async fn test_delete_one_and_many() {
        let store = seeded().await;

        assert_eq!(store.delete_documents(&ns(), &Filter::gte("age", 30), false).await.unwrap(), 1);
        assert_eq!(store.delete_documents(&ns(), &Filter::All, true).await.unwrap(), 2);
        assert_eq!(store.count_documents(&ns(), &Filter::All).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_collections_are_scoped_by_database() {
        let store = seeded().await;
        store
            .insert_documents(&Namespace::new("other", "things"), vec![doc! {}])
            .await
            .unwrap();

        assert_eq!(store.list_collections("test").await.unwrap(), vec!["people"]);

        store.drop_collection(&ns()).await.unwrap();
        assert!(store.list_collections("test").await.unwrap().is_empty());
        store.drop_collection(&ns()).await.unwrap();
    }

    #[test]
    fn test_increment_promotes_on_overflow() {
        assert_eq!(
            increment(Some(&Bson::Int32(i32::MAX)), &Bson::Int32(1), "n").unwrap(),
            Bson::Int64(i32::MAX as i64 + 1)
        );
        assert_eq!(increment(None, &Bson::Double(0.5), "n").unwrap(), Bson::Double(0.5));
        assert!(increment(Some(&Bson::String("a".into())), &Bson::Int32(1), "n").is_err());
    }
}
