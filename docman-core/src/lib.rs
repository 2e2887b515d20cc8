//! A small object-document mapper for document databases.
//!
//! Application code declares *document classes*; each concrete class is bound to a
//! collection and gets a [`Manager`](manager::Manager) for queries and persistence.
//! Instances are flexible key/value records whose fields are read and written by name.
//!
//! This crate is the core of the docman project and provides:
//!
//! - **Class declaration** ([`class`]) - Builder resolving configuration through base classes, including abstract templates
//! - **Document instances** ([`document`]) - Field access, identity equality and size-limited representation
//! - **Init data** ([`init`]) - Default values and per-instance factories
//! - **Managers** ([`manager`]) - Count, find, insert, update, replace and delete operations per class
//! - **Client cache** ([`cache`]) - One backend client per distinct database settings
//! - **Collections** ([`collection`]) - Collection name resolution and collection handles
//! - **Backend abstraction** ([`backend`]) - Traits implemented by database drivers
//! - **Queries** ([`query`]) - Filters, queries and updates handed to backends
//! - **Settings** ([`settings`]) - Serde-friendly database and collection settings
//! - **Error handling** ([`error`]) - Error and result types
//!
//! # Example
//!
//! ```ignore
//! use docman::{prelude::*, memory::MemoryConnector};
//! use bson::doc;
//!
//! let cache = ClientCache::new(MemoryConnector::new());
//! let settings = DatabaseSettings::new("memory://", "app");
//!
//! let empty = DocumentClass::builder("EmptyDoc")
//!     .database(settings)
//!     .declare(&cache)
//!     .await?;
//!
//! let instance = empty.create_document(doc! { "test": "test" });
//! assert!(instance.contains("test"));
//! assert_eq!(instance.repr(), "<EmptyDoc({'test': 'test'})>");
//! assert_eq!(empty.documents()?.name(), "emptydoc");
//! ```

#[allow(unused_extern_crates)]
extern crate self as docman_core;

pub mod backend;
pub mod cache;
pub mod class;
pub mod collection;
pub mod document;
pub mod error;
pub mod init;
pub mod manager;
pub mod query;
pub mod repr;
pub mod settings;

#[cfg(test)]
mod testing;
