//! Storage configuration types.

use serde::Deserialize;

/// Storage type discriminator.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageType {
    #[default]
    Sqlite,
    Memory,
}

impl std::fmt::Display for StorageType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StorageType::Sqlite => write!(f, "sqlite"),
            StorageType::Memory => write!(f, "memory"),
        }
    }
}

/// Storage configuration (discriminated union).
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Storage type discriminator.
    #[serde(rename = "type")]
    pub storage_type: StorageType,
    /// SQLite-specific configuration.
    pub sqlite: SqliteConfig,
}

/// SQLite-specific configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SqliteConfig {
    /// Database file path, or `:memory:`.
    pub path: String,
    /// Pool size for file-backed databases.
    pub max_connections: u32,
}

impl Default for SqliteConfig {
    fn default() -> Self {
        Self {
            path: "data/salesdesk.db".to_string(),
            max_connections: 5,
        }
    }
}

/// Reference data inserted at start-up into empty tables.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SeedConfig {
    pub stores: Vec<String>,
    pub customers: Vec<SeedCustomer>,
    pub products: Vec<String>,
}

/// A customer entry in the seed section.
#[derive(Debug, Clone, Deserialize)]
pub struct SeedCustomer {
    pub first_name: String,
    pub last_name: String,
}

impl SeedConfig {
    pub fn is_empty(&self) -> bool {
        self.stores.is_empty() && self.customers.is_empty() && self.products.is_empty()
    }
}
