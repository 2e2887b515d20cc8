//! MongoDB backend for docman.
//!
//! This crate provides a MongoDB implementation of the `StoreBackend` trait and a
//! `Connector` that builds driver clients from `DatabaseSettings`, so document
//! classes can be bound to real collections.
//!
//! To use this backend, enable the `mongodb` feature of `docman`:
//!
//! ```toml
//! [dependencies]
//! docman = { version = "x.y.z", features = ["mongodb"] }
//! ```
//!
//! # Features
//!
//! - **Client per settings** - One driver client per distinct settings, shared through the client cache
//! - **Full query support** - Filters, sorting, skip and limit run on the server
//! - **Pool configuration** - Application name, pool sizes and timeouts from the settings
//!
//! # Example
//!
//! ```ignore
//! use docman::{prelude::*, mongodb::MongoConnector};
//!
//! let cache = ClientCache::new(MongoConnector::new());
//! let users = DocumentClass::builder("User")
//!     .database(DatabaseSettings::new("mongodb://localhost:27017", "app"))
//!     .declare(&cache)
//!     .await?;
//!
//! let count = users.documents()?.count(Filter::All).await?;
//! ```

#[allow(unused_extern_crates)]
extern crate self as docman_mongodb;

mod query;
pub mod store;

pub use store::{MongoConnector, MongoDbStore};
