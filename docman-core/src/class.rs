//! Document class declaration.
//!
//! A [`DocumentClass`] is declared once, usually at start-up, through a
//! [`ClassBuilder`]. Declaration resolves the class configuration against its bases,
//! fetches a client from the [`ClientCache`], resolves the collection and attaches a
//! [`Manager`]. The resulting handle is cheap to clone and is what document instances
//! point back to.
//!
//! Three kinds of configuration are inherited independently: database settings,
//! collection settings and default init data. For each, the class's own declaration
//! wins; otherwise the first base (in `extends` order) carrying it provides it. The
//! abstract flag is never inherited.
//!
//! # Example
//!
//! ```ignore
//! use docman::prelude::*;
//!
//! let cache = ClientCache::new(MemoryConnector::new());
//! let settings = DatabaseSettings::new("memory://", "app");
//!
//! let base = DocumentClass::builder("Timestamped")
//!     .database(settings)
//!     .default_with("created_at", |_| bson::Bson::DateTime(bson::DateTime::now()))
//!     .abstract_class()
//!     .declare(&cache)
//!     .await?;
//!
//! let users = DocumentClass::builder("User")
//!     .extends(&base)
//!     .declare(&cache)
//!     .await?;
//!
//! assert_eq!(users.documents()?.name(), "user");
//! let alice = users.documents()?.create(doc! { "name": "Alice" }).await?;
//! ```

use bson::{Bson, Document as BsonDocument};
use serde::Serialize;
use std::{fmt, sync::Arc};
use tracing::{debug, trace};

use crate::{
    cache::ClientCache,
    collection::{CollectionHandle, get_collection},
    document::Document,
    error::{DocumentError, DocumentResult},
    init::{InitData, InitValue},
    manager::Manager,
    settings::{CollectionSettings, DatabaseSettings},
};

/// Inheritable class-level configuration.
///
/// `None` means "not carried"; lookups fall through to the bases.
#[derive(Debug, Clone, Default)]
pub struct ClassConfig {
    pub database: Option<DatabaseSettings>,
    pub collection: Option<CollectionSettings>,
    pub init_data: Option<InitData>,
}

/// Resolves `own` against `bases`: each field is taken from `own` when present, else
/// from the first base whose resolved configuration carries it.
pub fn resolve_config(own: &ClassConfig, bases: &[DocumentClass]) -> ClassConfig {
    ClassConfig {
        database: own
            .database
            .clone()
            .or_else(|| bases.iter().find_map(|base| base.config().database.clone())),
        collection: own
            .collection
            .clone()
            .or_else(|| bases.iter().find_map(|base| base.config().collection.clone())),
        init_data: own
            .init_data
            .clone()
            .or_else(|| bases.iter().find_map(|base| base.config().init_data.clone())),
    }
}

/// Where a class ended up after declaration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClassState {
    /// Configuration-only template; never bound to a collection.
    Abstract,
    /// No database settings anywhere in the chain; no manager.
    Unconfigured,
    /// Bound to a collection, with a manager.
    Concrete,
}

pub(crate) struct ClassInner {
    name: String,
    bases: Vec<DocumentClass>,
    declared: ClassConfig,
    resolved: ClassConfig,
    defaults: InitData,
    state: ClassState,
    manager: Option<Manager>,
}

/// Shared handle on a declared document class.
///
/// Equality is identity: two handles are equal when they point at the same declaration.
#[derive(Clone)]
pub struct DocumentClass {
    inner: Arc<ClassInner>,
}

impl DocumentClass {
    pub fn builder(name: impl Into<String>) -> ClassBuilder {
        ClassBuilder::new(name)
    }

    pub(crate) fn from_inner(inner: Arc<ClassInner>) -> Self {
        Self { inner }
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    pub fn bases(&self) -> &[DocumentClass] {
        &self.inner.bases
    }

    pub fn state(&self) -> ClassState {
        self.inner.state
    }

    pub fn is_abstract(&self) -> bool {
        self.inner.state == ClassState::Abstract
    }

    /// Configuration as written on this class, without inheritance.
    pub fn declared_config(&self) -> &ClassConfig {
        &self.inner.declared
    }

    /// Configuration after resolving against the bases.
    pub fn config(&self) -> &ClassConfig {
        &self.inner.resolved
    }

    pub fn database_settings(&self) -> Option<&DatabaseSettings> {
        self.inner.resolved.database.as_ref()
    }

    /// Default init data applied to every new instance.
    pub fn default_init_data(&self) -> &InitData {
        &self.inner.defaults
    }

    /// The class manager.
    ///
    /// Fails with [`DocumentError::NoManager`] for abstract or unconfigured classes.
    pub fn documents(&self) -> DocumentResult<&Manager> {
        self.inner
            .manager
            .as_ref()
            .ok_or_else(|| DocumentError::NoManager(self.inner.name.clone()))
    }

    pub fn has_manager(&self) -> bool {
        self.inner.manager.is_some()
    }

    /// Builds an instance from positional or keyword init data.
    ///
    /// Mirrors a constructor call: `positional` must be a mapping, and supplying it
    /// together with non-empty `keywords` is rejected.
    pub fn instantiate(
        &self,
        positional: Option<Bson>,
        keywords: impl Into<InitData>,
    ) -> DocumentResult<Document> {
        let keywords = keywords.into();
        let supplied = match positional {
            Some(_) if !keywords.is_empty() => {
                return Err(DocumentError::InitData(
                    "pass init data either positionally or as keywords, not both".to_string(),
                ));
            }
            Some(data) => InitData::try_from(data)?,
            None => keywords,
        };

        Ok(self.build_document(&supplied))
    }

    /// Instance holding only the default init data.
    pub fn new_document(&self) -> Document {
        self.build_document(&InitData::new())
    }

    /// Instance from keyword-style init data.
    pub fn create_document(&self, data: impl Into<InitData>) -> Document {
        self.build_document(&data.into())
    }

    /// Instance from a single positional value, which must be a mapping.
    pub fn from_bson(&self, data: Bson) -> DocumentResult<Document> {
        self.instantiate(Some(data), InitData::new())
    }

    /// Instance from any value serializing to a mapping.
    pub fn from_serialize<T: Serialize>(&self, value: &T) -> DocumentResult<Document> {
        self.from_bson(bson::ser::serialize_to_bson(value)?)
    }

    /// Wraps data read back from the collection. Defaults are not applied.
    pub(crate) fn from_stored(&self, data: BsonDocument) -> Document {
        let mut document = Document::empty(self.clone());
        document.replace_data(data);
        document
    }

    fn build_document(&self, supplied: &InitData) -> Document {
        let merged = self.inner.defaults.merged(supplied);
        let mut document = Document::empty(self.clone());
        let data = merged.resolve(&document);

        trace!(class = %self.inner.name, fields = data.len(), "built document");
        document.replace_data(data);
        document
    }
}

impl PartialEq for DocumentClass {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Eq for DocumentClass {}

impl fmt::Debug for DocumentClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DocumentClass")
            .field("name", &self.inner.name)
            .field("state", &self.inner.state)
            .field("collection", &self.inner.manager.as_ref().map(|m| m.name()))
            .finish()
    }
}

/// Declaration of a document class.
///
/// Builder methods never fail; invalid input is reported by [`ClassBuilder::declare`].
pub struct ClassBuilder {
    name: String,
    bases: Vec<DocumentClass>,
    config: ClassConfig,
    is_abstract: bool,
    error: Option<DocumentError>,
}

impl ClassBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            bases: Vec::new(),
            config: ClassConfig::default(),
            is_abstract: false,
            error: None,
        }
    }

    /// Adds a base class. Bases are searched in the order they are added.
    pub fn extends(mut self, base: &DocumentClass) -> Self {
        self.bases.push(base.clone());
        self
    }

    pub fn database(mut self, settings: DatabaseSettings) -> Self {
        self.config.database = Some(settings);
        self
    }

    pub fn collection(mut self, settings: CollectionSettings) -> Self {
        self.config.collection = Some(settings);
        self
    }

    pub fn collection_name(self, name: impl Into<String>) -> Self {
        self.collection(CollectionSettings::named(name))
    }

    /// Declares a default field value. Any own default replaces inherited defaults as a whole.
    pub fn default_value(mut self, field: impl Into<String>, value: impl Into<InitValue>) -> Self {
        self.config
            .init_data
            .get_or_insert_with(InitData::new)
            .insert(field, value);
        self
    }

    /// Declares a per-instance default computed from the new instance.
    pub fn default_with<F>(self, field: impl Into<String>, factory: F) -> Self
    where
        F: Fn(&Document) -> Bson + Send + Sync + 'static,
    {
        self.default_value(field, InitValue::factory(factory))
    }

    /// Declares the whole default init data at once. Must be a mapping.
    pub fn init_data(mut self, data: impl Into<Bson>) -> Self {
        match InitData::try_from(data.into()) {
            Ok(data) => self.config.init_data = Some(data),
            Err(err) => self.error = Some(err),
        }
        self
    }

    /// Marks the class as a configuration-only template.
    pub fn abstract_class(mut self) -> Self {
        self.is_abstract = true;
        self
    }

    /// Runs the declaration and returns the class handle.
    ///
    /// Abstract classes and classes without database settings in their chain are
    /// returned without a manager and never touch `cache`.
    pub async fn declare(self, cache: &ClientCache) -> DocumentResult<DocumentClass> {
        if let Some(err) = self.error {
            return Err(err);
        }

        let mut resolved = resolve_config(&self.config, &self.bases);

        if self.is_abstract {
            debug!(class = %self.name, "declared abstract document class");
            return Ok(self.finish(resolved, ClassState::Abstract, None));
        }

        let Some(database) = resolved.database.clone() else {
            debug!(class = %self.name, "declared document class without database settings");
            return Ok(self.finish(resolved, ClassState::Unconfigured, None));
        };

        if resolved.init_data.is_none() {
            resolved.init_data = Some(InitData::new());
        }

        let client = cache.get_client(&database).await?;
        let collection = get_collection(
            &self.name,
            &client.database(),
            &resolved.collection.clone().unwrap_or_default(),
        );

        debug!(
            class = %self.name,
            database = %database.name,
            collection = %collection.name(),
            "declared document class"
        );

        Ok(self.finish(resolved, ClassState::Concrete, Some(collection)))
    }

    fn finish(
        self,
        resolved: ClassConfig,
        state: ClassState,
        collection: Option<CollectionHandle>,
    ) -> DocumentClass {
        let defaults = resolved.init_data.clone().unwrap_or_default();

        DocumentClass::from_inner(Arc::new_cyclic(|class| ClassInner {
            name: self.name,
            bases: self.bases,
            declared: self.config,
            resolved,
            defaults,
            state,
            manager: collection.map(|collection| Manager::new(class.clone(), collection)),
        }))
    }
}
