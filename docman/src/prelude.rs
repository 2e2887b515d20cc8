//! Convenient re-exports of commonly used types from docman.
//!
//! ```ignore
//! use docman::prelude::*;
//! ```
//!
//! This provides access to:
//! - Class declaration and document instances
//! - Managers, init data and the client cache
//! - Query construction and updates
//! - Settings and error types

pub use docman_core::{
    backend::{BackendRef, Connector, Namespace, StoreBackend},
    cache::{ClientCache, ClientHandle},
    class::{ClassBuilder, ClassConfig, ClassState, DocumentClass},
    collection::{CollectionHandle, DatabaseHandle},
    document::Document,
    error::{DocumentError, DocumentResult},
    init::{InitData, InitValue},
    manager::Manager,
    query::{
        FieldOp, Filter, Query, QueryBuilder, QueryVisitor, Sort, SortDirection, Update,
        UpdateOp, UpdateOutcome,
    },
    settings::{CollectionSettings, DatabaseSettings},
};
