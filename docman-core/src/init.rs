//! Default and call-site init data for document instances.
//!
//! [`InitData`] is an ordered mapping from field name to [`InitValue`]. A value is
//! either stored as given or produced by a factory that receives the freshly built
//! (still empty) instance, which is how per-instance defaults such as timestamps or
//! generated identifiers are declared.
//!
//! # Example
//!
//! ```ignore
//! use docman::init::{InitData, InitValue};
//!
//! let defaults = InitData::new()
//!     .with("status", "draft")
//!     .with("created_at", InitValue::now())
//!     .with("ref", InitValue::factory(|doc| doc.class_name().into()));
//! ```

use bson::{Bson, Document as BsonDocument, oid::ObjectId};
use std::{fmt, sync::Arc};

use crate::{
    document::Document,
    error::{DocumentError, DocumentResult},
};

type Factory = Arc<dyn Fn(&Document) -> Bson + Send + Sync>;

/// A single init value: literal or per-instance factory.
#[derive(Clone)]
pub enum InitValue {
    Value(Bson),
    Factory(Factory),
}

impl InitValue {
    pub fn factory<F>(factory: F) -> Self
    where
        F: Fn(&Document) -> Bson + Send + Sync + 'static,
    {
        InitValue::Factory(Arc::new(factory))
    }

    /// Current UTC time, taken when the instance is built.
    pub fn now() -> Self {
        InitValue::factory(|_| Bson::DateTime(chrono::Utc::now().into()))
    }

    /// A new `ObjectId` per instance.
    pub fn object_id() -> Self {
        InitValue::factory(|_| Bson::ObjectId(ObjectId::new()))
    }

    /// A new random UUID per instance.
    pub fn uuid() -> Self {
        InitValue::factory(|_| Bson::from(bson::Uuid::new()))
    }

    pub fn is_factory(&self) -> bool {
        matches!(self, InitValue::Factory(_))
    }

    pub(crate) fn resolve(&self, instance: &Document) -> Bson {
        match self {
            InitValue::Value(value) => value.clone(),
            InitValue::Factory(factory) => factory(instance),
        }
    }
}

impl fmt::Debug for InitValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InitValue::Value(value) => f.debug_tuple("Value").field(value).finish(),
            InitValue::Factory(_) => f.write_str("Factory(..)"),
        }
    }
}

macro_rules! init_value_from {
    ($($ty:ty),* $(,)?) => {
        $(
            impl From<$ty> for InitValue {
                fn from(value: $ty) -> Self {
                    InitValue::Value(Bson::from(value))
                }
            }
        )*
    };
}

init_value_from!(
    Bson,
    &str,
    String,
    bool,
    i32,
    i64,
    f64,
    BsonDocument,
    Vec<Bson>,
    ObjectId,
    bson::DateTime,
    bson::Uuid,
);

/// Ordered field name to [`InitValue`] mapping.
///
/// Inserting an existing key replaces its value in place, so merged data keeps the
/// position of the first occurrence.
#[derive(Debug, Clone, Default)]
pub struct InitData {
    entries: Vec<(String, InitValue)>,
}

impl InitData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, field: impl Into<String>, value: impl Into<InitValue>) {
        let field = field.into();
        let value = value.into();

        match self.entries.iter_mut().find(|(key, _)| *key == field) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((field, value)),
        }
    }

    pub fn with(mut self, field: impl Into<String>, value: impl Into<InitValue>) -> Self {
        self.insert(field, value);
        self
    }

    pub fn get(&self, field: &str) -> Option<&InitValue> {
        self.entries
            .iter()
            .find(|(key, _)| key == field)
            .map(|(_, value)| value)
    }

    pub fn contains(&self, field: &str) -> bool {
        self.get(field).is_some()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(key, _)| key.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns `self` overridden by every entry of `other`.
    pub fn merged(&self, other: &InitData) -> InitData {
        let mut merged = self.clone();
        for (field, value) in &other.entries {
            merged.insert(field.clone(), value.clone());
        }
        merged
    }

    /// Evaluates every value against `instance`, keeping field order.
    pub(crate) fn resolve(&self, instance: &Document) -> BsonDocument {
        self.entries
            .iter()
            .map(|(field, value)| (field.clone(), value.resolve(instance)))
            .collect()
    }
}

impl From<BsonDocument> for InitData {
    fn from(document: BsonDocument) -> Self {
        Self {
            entries: document
                .into_iter()
                .map(|(field, value)| (field, InitValue::Value(value)))
                .collect(),
        }
    }
}

impl TryFrom<Bson> for InitData {
    type Error = DocumentError;

    fn try_from(value: Bson) -> DocumentResult<Self> {
        match value {
            Bson::Document(document) => Ok(document.into()),
            other => Err(DocumentError::InitData(format!(
                "init data must be a mapping, got {:?}",
                other.element_type()
            ))),
        }
    }
}

impl<K: Into<String>, V: Into<InitValue>> FromIterator<(K, V)> for InitData {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut data = InitData::new();
        for (field, value) in iter {
            data.insert(field, value);
        }
        data
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::doc;

    #[test]
    fn test_insert_replaces_in_place() {
        let data = InitData::new()
            .with("a", 1)
            .with("b", 2)
            .with("a", 3);

        assert_eq!(data.keys().collect::<Vec<_>>(), vec!["a", "b"]);
        assert!(matches!(data.get("a"), Some(InitValue::Value(Bson::Int32(3)))));
    }

    #[test]
    fn test_merged_overrides_and_appends() {
        let defaults = InitData::from(doc! { "a": 1, "b": 2 });
        let supplied = InitData::from(doc! { "c": 3, "a": "x" });

        let merged = defaults.merged(&supplied);

        assert_eq!(merged.keys().collect::<Vec<_>>(), vec!["a", "b", "c"]);
        assert!(matches!(merged.get("a"), Some(InitValue::Value(Bson::String(s))) if s == "x"));
    }

    #[test]
    fn test_non_mapping_is_rejected() {
        let err = InitData::try_from(Bson::Array(vec![])).unwrap_err();

        assert!(matches!(err, DocumentError::InitData(_)));
        assert!(InitData::try_from(Bson::Document(doc! {})).unwrap().is_empty());
    }

    #[test]
    fn test_factory_is_flagged() {
        assert!(InitValue::now().is_factory());
        assert!(!InitValue::from("value").is_factory());
    }
}
