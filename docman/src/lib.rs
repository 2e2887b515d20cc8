//! Main docman crate: a small object-document mapper with per-class managers.
//!
//! This crate is the primary entry point. It re-exports the core types from
//! `docman-core` and gives access to the storage backends.
//!
//! # Features
//!
//! - **Declared document classes** - Configuration inherited through base classes, abstract templates included
//! - **Flexible instances** - Fields read, written and removed by name, with defaults and factories
//! - **Per-class managers** - Count, find, insert, update, replace and delete on the class's collection
//! - **Shared clients** - One client per distinct database settings, cached process-wide
//! - **Multiple backends** - In-memory storage and MongoDB behind one trait
//!
//! # Quick Start
//!
//! ```ignore
//! use docman::{prelude::*, memory::MemoryConnector};
//! use bson::doc;
//!
//! #[tokio::main]
//! async fn main() -> DocumentResult<()> {
//!     let cache = ClientCache::new(MemoryConnector::new());
//!     let settings = DatabaseSettings::new("memory://", "app");
//!
//!     // Abstract classes carry shared configuration but never get a manager
//!     let base = DocumentClass::builder("Base")
//!         .database(settings)
//!         .default_value("active", true)
//!         .abstract_class()
//!         .declare(&cache)
//!         .await?;
//!
//!     let users = DocumentClass::builder("User")
//!         .extends(&base)
//!         .collection_name("people")
//!         .declare(&cache)
//!         .await?;
//!
//!     let mut alice = users.documents()?.create(doc! { "name": "Alice" }).await?;
//!     assert_eq!(alice.get("active")?, &bson::Bson::Boolean(true));
//!
//!     alice.set("age", 30);
//!     alice.save().await?;
//!
//!     let adults = users
//!         .documents()?
//!         .find(Query::builder().filter(Filter::gte("age", 18)).build())
//!         .await?;
//!     println!("{:?}", adults);
//!
//!     cache.shutdown().await?;
//!     Ok(())
//! }
//! ```
//!
//! # Backends
//!
//! - [`memory`] - In-memory storage for development and testing
//! - [`mongodb`] - MongoDB backend (requires `mongodb` feature)

pub mod prelude;

pub use docman_core::{
    backend, cache, class, collection, document, error, init, manager, query, repr, settings,
};

// Re-export BSON types for convenience
pub use bson;

/// In-memory storage backend implementations.
pub mod memory {
    pub use docman_memory::{InMemoryStore, MemoryConnector};
}

/// MongoDB storage backend implementations.
///
/// This module is only available when the `mongodb` feature is enabled.
#[cfg(feature = "mongodb")]
pub mod mongodb {
    pub use docman_mongodb::{MongoConnector, MongoDbStore};
}
