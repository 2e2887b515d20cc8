//! Document instances.
//!
//! A [`Document`] is a flexible key/value record belonging to a
//! [`DocumentClass`]. Fields are read, written and removed by name; persistence goes
//! through the class manager. Instances compare by identity: two distinct instances
//! are never equal, whatever their data.
//!
//! # Example
//!
//! ```ignore
//! let mut doc = users.create_document(doc! { "name": "Alice" });
//!
//! doc.set("age", 30);
//! assert!(doc.contains("age"));
//! assert_eq!(format!("{:?}", doc), "<User({'age': 30, 'name': 'Alice'})>");
//!
//! doc.save().await?;
//! doc.remove("age")?;
//! ```

use bson::{Bson, Document as BsonDocument};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::{
    fmt,
    hash::{Hash, Hasher},
    sync::atomic::{AtomicU64, Ordering},
};

use crate::{
    class::DocumentClass,
    error::{DocumentError, DocumentResult},
    query::Filter,
    repr::ReprLimits,
};

static NEXT_IDENTITY: AtomicU64 = AtomicU64::new(1);

/// An instance of a document class.
pub struct Document {
    identity: u64,
    class: DocumentClass,
    data: BsonDocument,
}

impl Document {
    pub(crate) fn empty(class: DocumentClass) -> Self {
        Self {
            identity: NEXT_IDENTITY.fetch_add(1, Ordering::Relaxed),
            class,
            data: BsonDocument::new(),
        }
    }

    pub(crate) fn replace_data(&mut self, data: BsonDocument) {
        self.data = data;
    }

    pub fn class(&self) -> &DocumentClass {
        &self.class
    }

    pub fn class_name(&self) -> &str {
        self.class.name()
    }

    /// Reads a field.
    ///
    /// # Errors
    ///
    /// [`DocumentError::AttributeNotFound`] when the field is absent.
    pub fn get(&self, name: &str) -> DocumentResult<&Bson> {
        self.data
            .get(name)
            .ok_or_else(|| DocumentError::attribute_not_found(self.class_name(), name))
    }

    /// Reads a field and deserializes it into `T`.
    pub fn get_as<T: DeserializeOwned>(&self, name: &str) -> DocumentResult<T> {
        Ok(bson::de::deserialize_from_bson(self.get(name)?.clone())?)
    }

    /// Writes a field, creating or overwriting it.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<Bson>) {
        self.data.insert(name, value);
    }

    /// Removes a field and returns its value.
    ///
    /// # Errors
    ///
    /// [`DocumentError::AttributeNotFound`] when the field is absent.
    pub fn remove(&mut self, name: &str) -> DocumentResult<Bson> {
        match self.data.remove(name) {
            Some(value) => Ok(value),
            None => Err(DocumentError::attribute_not_found(self.class.name(), name)),
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.data.contains_key(name)
    }

    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.data.keys()
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// The stored `_id`, once the document has been inserted.
    pub fn id(&self) -> Option<&Bson> {
        self.data.get("_id")
    }

    pub fn data(&self) -> &BsonDocument {
        &self.data
    }

    pub fn into_data(self) -> BsonDocument {
        self.data
    }

    /// Deserializes the whole document into `T`.
    pub fn deserialize<T: DeserializeOwned>(&self) -> DocumentResult<T> {
        Ok(bson::de::deserialize_from_bson(Bson::Document(self.data.clone()))?)
    }

    /// JSON rendering of the data.
    pub fn to_json(&self) -> DocumentResult<Value> {
        Ok(serde_json::to_value(&self.data)?)
    }

    /// `<ClassName({...})>` with the data rendered size-limited.
    pub fn repr(&self) -> String {
        format!(
            "<{}({})>",
            self.class_name(),
            ReprLimits::default().repr_document(&self.data)
        )
    }

    /// Inserts the document, or replaces the stored copy when it already has an `_id`.
    pub async fn save(&mut self) -> DocumentResult<()> {
        let class = self.class.clone();
        class.documents()?.save(self).await
    }

    /// Deletes the stored copy. Returns the number of deleted documents.
    pub async fn delete(&self) -> DocumentResult<u64> {
        let id = self.get("_id")?.clone();
        self.class.documents()?.delete_one(Filter::id(id)).await
    }

    /// Reloads the data from the collection.
    ///
    /// # Errors
    ///
    /// [`DocumentError::DoesNotExist`] when the stored copy is gone.
    pub async fn refresh(&mut self) -> DocumentResult<()> {
        let id = self.get("_id")?.clone();
        let stored = self.class.documents()?.get(Filter::id(id)).await?;

        self.data = stored.into_data();
        Ok(())
    }
}

impl PartialEq for Document {
    fn eq(&self, other: &Self) -> bool {
        self.identity == other.identity
    }
}

impl Eq for Document {}

impl Hash for Document {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.identity.hash(state);
    }
}

impl fmt::Debug for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.repr())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{cache::ClientCache, settings::DatabaseSettings, testing::CountingConnector};
    use bson::doc;
    use std::collections::HashSet;

    async fn empty_doc() -> DocumentClass {
        let cache = ClientCache::new(CountingConnector::default());
        DocumentClass::builder("EmptyDoc")
            .database(DatabaseSettings::new("memory://", "test"))
            .declare(&cache)
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_set_then_get() {
        let mut empty = empty_doc().await.new_document();

        empty.set("test", "test");

        assert_eq!(empty.get("test").unwrap(), &Bson::String("test".into()));
    }

    #[tokio::test]
    async fn test_get_without_data() {
        let empty = empty_doc().await.new_document();

        let err = empty.get("test").unwrap_err();

        assert!(matches!(
            err,
            DocumentError::AttributeNotFound { ref class, ref name } if class == "EmptyDoc" && name == "test"
        ));
    }

    #[tokio::test]
    async fn test_remove() {
        let mut empty = empty_doc().await.create_document(doc! { "test": "test" });

        assert_eq!(empty.remove("test").unwrap(), Bson::String("test".into()));
        assert!(!empty.contains("test"));
        assert!(matches!(empty.remove("test"), Err(DocumentError::AttributeNotFound { .. })));
    }

    #[tokio::test]
    async fn test_repr() {
        let class = empty_doc().await;

        assert_eq!(
            class.create_document(doc! { "test": "test" }).repr(),
            "<EmptyDoc({'test': 'test'})>"
        );
        assert_eq!(
            format!(
                "{:?}",
                class.create_document(doc! {
                    "test": "test-test-test-test-test-test-test-test-test-test-test-test"
                })
            ),
            "<EmptyDoc({'test': 'test-test-te...est-test-test'})>"
        );
    }

    #[tokio::test]
    async fn test_identity_equality() {
        let class = empty_doc().await;
        let first = class.create_document(doc! { "name": "doc" });
        let second = class.create_document(doc! { "name": "doc" });

        assert_eq!(first, first);
        assert_ne!(first, second);

        let set: HashSet<&Document> = [&first, &second, &first].into_iter().collect();
        assert_eq!(set.len(), 2);
    }

    #[tokio::test]
    async fn test_typed_access() {
        #[derive(serde::Deserialize, PartialEq, Debug)]
        struct Person {
            name: String,
            age: i32,
        }

        let person = empty_doc()
            .await
            .create_document(doc! { "name": "Alice", "age": 30 });

        assert_eq!(person.get_as::<i32>("age").unwrap(), 30);
        assert_eq!(
            person.deserialize::<Person>().unwrap(),
            Person { name: "Alice".into(), age: 30 }
        );
        assert_eq!(
            person.to_json().unwrap(),
            serde_json::json!({ "name": "Alice", "age": 30 })
        );
    }

    #[tokio::test]
    async fn test_persistence_requires_an_id() {
        let document = empty_doc().await.new_document();

        assert!(matches!(
            document.delete().await,
            Err(DocumentError::AttributeNotFound { .. })
        ));
    }
}
