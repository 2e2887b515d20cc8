//! Class-level configuration carried by document classes.
//!
//! [`DatabaseSettings`] identify a database connection and double as the key of the
//! [`ClientCache`](crate::cache::ClientCache). [`CollectionSettings`] optionally pin the
//! collection a class is stored in. Both are plain serde types so they can be loaded
//! from whatever configuration source the application already uses.
//!
//! # Example
//!
//! ```ignore
//! use docman::settings::DatabaseSettings;
//!
//! let settings = DatabaseSettings::new("mongodb://localhost:27017", "app")
//!     .with_app_name("billing")
//!     .with_pool_size(Some(1), Some(16));
//!
//! let from_json: DatabaseSettings = serde_json::from_str(
//!     r#"{ "uri": "mongodb://localhost:27017", "name": "app" }"#,
//! )?;
//! ```

use serde::{Deserialize, Serialize};

/// Parameters identifying and constructing a database connection.
///
/// Two classes declared with equal settings share one client.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DatabaseSettings {
    /// Connection string understood by the backend driver.
    pub uri: String,
    /// Name of the database the classes live in.
    pub name: String,
    /// Application name reported to the server.
    #[serde(default)]
    pub app_name: Option<String>,
    /// Minimum number of pooled connections.
    #[serde(default)]
    pub min_pool_size: Option<u32>,
    /// Maximum number of pooled connections.
    #[serde(default)]
    pub max_pool_size: Option<u32>,
    /// Connect timeout in milliseconds.
    #[serde(default)]
    pub connect_timeout_ms: Option<u64>,
    /// Server selection timeout in milliseconds.
    #[serde(default)]
    pub server_selection_timeout_ms: Option<u64>,
}

impl DatabaseSettings {
    pub fn new(uri: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            name: name.into(),
            app_name: None,
            min_pool_size: None,
            max_pool_size: None,
            connect_timeout_ms: None,
            server_selection_timeout_ms: None,
        }
    }

    pub fn with_app_name(mut self, app_name: impl Into<String>) -> Self {
        self.app_name = Some(app_name.into());
        self
    }

    pub fn with_pool_size(mut self, min: Option<u32>, max: Option<u32>) -> Self {
        self.min_pool_size = min;
        self.max_pool_size = max;
        self
    }

    pub fn with_connect_timeout_ms(mut self, timeout: u64) -> Self {
        self.connect_timeout_ms = Some(timeout);
        self
    }

    pub fn with_server_selection_timeout_ms(mut self, timeout: u64) -> Self {
        self.server_selection_timeout_ms = Some(timeout);
        self
    }
}

/// Optional parameters identifying the collection of a document class.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionSettings {
    /// Explicit collection name. Falls back to the lower-cased class name.
    #[serde(default)]
    pub name: Option<String>,
}

impl CollectionSettings {
    pub fn named(name: impl Into<String>) -> Self {
        Self { name: Some(name.into()) }
    }
}
