//! Database and collection handles, and collection name resolution.
//!
//! A [`CollectionHandle`] is what a [`Manager`](crate::manager::Manager) forwards its
//! operations to. Obtaining one never touches the server; collections are created
//! lazily by the backend on first write.

use bson::{Bson, Document};
use std::fmt;

use crate::{
    backend::{BackendRef, Namespace},
    error::DocumentResult,
    query::{Filter, Query, Update, UpdateOutcome},
    settings::CollectionSettings,
};

/// Handle on one database of a cached client.
#[derive(Clone)]
pub struct DatabaseHandle {
    name: String,
    backend: BackendRef,
}

impl DatabaseHandle {
    pub(crate) fn new(name: String, backend: BackendRef) -> Self {
        Self { name, backend }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Handle on the collection called `name`.
    pub fn collection(&self, name: impl Into<String>) -> CollectionHandle {
        CollectionHandle {
            ns: Namespace::new(self.name.clone(), name),
            backend: self.backend.clone(),
        }
    }

    pub async fn list_collections(&self) -> DocumentResult<Vec<String>> {
        self.backend.list_collections(&self.name).await
    }
}

impl fmt::Debug for DatabaseHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DatabaseHandle").field("name", &self.name).finish()
    }
}

/// Handle on one collection; thin forwarding layer over the backend.
#[derive(Clone)]
pub struct CollectionHandle {
    ns: Namespace,
    backend: BackendRef,
}

impl CollectionHandle {
    pub fn name(&self) -> &str {
        &self.ns.collection
    }

    pub fn namespace(&self) -> &Namespace {
        &self.ns
    }

    pub async fn count(&self, filter: &Filter) -> DocumentResult<u64> {
        self.backend.count_documents(&self.ns, filter).await
    }

    pub async fn find(&self, query: &Query) -> DocumentResult<Vec<Document>> {
        self.backend.find_documents(&self.ns, query).await
    }

    pub async fn find_one(&self, filter: &Filter) -> DocumentResult<Option<Document>> {
        self.backend.find_one_document(&self.ns, filter).await
    }

    pub async fn insert(&self, documents: Vec<Document>) -> DocumentResult<Vec<Bson>> {
        self.backend.insert_documents(&self.ns, documents).await
    }

    pub async fn update(
        &self,
        filter: &Filter,
        update: &Update,
        many: bool,
    ) -> DocumentResult<UpdateOutcome> {
        self.backend.update_documents(&self.ns, filter, update, many).await
    }

    pub async fn replace(
        &self,
        filter: &Filter,
        document: Document,
        upsert: bool,
    ) -> DocumentResult<UpdateOutcome> {
        self.backend.replace_document(&self.ns, filter, document, upsert).await
    }

    pub async fn delete(&self, filter: &Filter, many: bool) -> DocumentResult<u64> {
        self.backend.delete_documents(&self.ns, filter, many).await
    }

    pub async fn drop_collection(&self) -> DocumentResult<()> {
        self.backend.drop_collection(&self.ns).await
    }
}

impl fmt::Debug for CollectionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CollectionHandle").field("ns", &self.ns).finish()
    }
}

/// Name of the collection a class named `class_name` is stored in.
pub fn collection_name(class_name: &str, settings: &CollectionSettings) -> String {
    settings
        .name
        .clone()
        .unwrap_or_else(|| class_name.to_lowercase())
}

/// Resolves the collection of a class inside `database`.
pub fn get_collection(
    class_name: &str,
    database: &DatabaseHandle,
    settings: &CollectionSettings,
) -> CollectionHandle {
    database.collection(collection_name(class_name, settings))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::NullBackend;
    use std::sync::Arc;

    #[test]
    fn test_collection_name_defaults_to_lowercase_class_name() {
        assert_eq!(collection_name("EmptyDoc", &CollectionSettings::default()), "emptydoc");
    }

    #[test]
    fn test_collection_name_prefers_explicit_name() {
        assert_eq!(
            collection_name("EmptyDoc", &CollectionSettings::named("test_doc")),
            "test_doc"
        );
    }

    #[test]
    fn test_get_collection_uses_database_namespace() {
        let database = DatabaseHandle::new("app".to_string(), Arc::new(NullBackend));
        let collection = get_collection("User", &database, &CollectionSettings::default());

        assert_eq!(collection.namespace(), &Namespace::new("app", "user"));
        assert_eq!(collection.name(), "user");
    }
}
