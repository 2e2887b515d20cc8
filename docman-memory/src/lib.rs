//! In-memory storage backend for docman.
//!
//! This crate provides a thread-safe, in-memory implementation of the `StoreBackend`
//! trait together with a `Connector` for the client cache. It uses async-aware
//! read-write locks for concurrent access and is meant for development and testing.
//!
//! # Features
//!
//! - **Thread-safe access** - Concurrent reads and writes using async-aware RwLock
//! - **Insertion order** - Unsorted queries return documents in the order they were inserted
//! - **Full query support** - Filtering, sorting, skip and limit, updates and upserts
//!
//! # Quick Start
//!
//! ```ignore
//! use docman::{prelude::*, memory::MemoryConnector};
//! use bson::doc;
//!
//! let cache = ClientCache::new(MemoryConnector::new());
//! let users = DocumentClass::builder("User")
//!     .database(DatabaseSettings::new("memory://", "app"))
//!     .declare(&cache)
//!     .await?;
//!
//! users.documents()?.create(doc! { "name": "Alice" }).await?;
//! assert_eq!(users.documents()?.count(Filter::All).await?, 1);
//! ```

#[allow(unused_extern_crates)]
extern crate self as docman_memory;

pub mod connector;
mod evaluator;
pub mod store;

pub use connector::MemoryConnector;
pub use store::InMemoryStore;
