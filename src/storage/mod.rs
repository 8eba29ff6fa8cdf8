//! Storage implementations.

use std::sync::Arc;

use tracing::info;

use crate::config::{SeedConfig, StorageConfig, StorageType};
use crate::interfaces::sales_store::Result;
use crate::interfaces::SalesStore;

pub mod memory;
#[cfg(feature = "sqlite")]
pub mod schema;
#[cfg(feature = "sqlite")]
pub mod sqlite;

pub use memory::InMemorySalesStore;
#[cfg(feature = "sqlite")]
pub use sqlite::SqliteSalesStore;

/// Initialize storage based on configuration.
pub async fn init_storage(
    config: &StorageConfig,
) -> std::result::Result<Arc<dyn SalesStore>, Box<dyn std::error::Error + Send + Sync>> {
    match config.storage_type {
        StorageType::Memory => {
            info!("Storage: memory");
            Ok(Arc::new(InMemorySalesStore::new()))
        }
        #[cfg(feature = "sqlite")]
        StorageType::Sqlite => {
            let path = &config.sqlite.path;
            info!("Storage: sqlite at {}", path);

            if path != ":memory:" {
                if let Some(parent) = std::path::Path::new(path).parent() {
                    if !parent.as_os_str().is_empty() {
                        std::fs::create_dir_all(parent)?;
                    }
                }
            }

            let store = SqliteSalesStore::connect(path, config.sqlite.max_connections).await?;
            store.init().await?;
            Ok(Arc::new(store))
        }
        #[cfg(not(feature = "sqlite"))]
        StorageType::Sqlite => {
            tracing::error!("SQLite storage requested but 'sqlite' feature is not enabled");
            Err("SQLite feature not enabled".into())
        }
    }
}

/// Insert configured reference data into tables that are still empty.
///
/// Tables that already hold rows are left alone, so restarting against an
/// existing database never duplicates names.
pub async fn seed_reference_data(store: &dyn SalesStore, seed: &SeedConfig) -> Result<()> {
    if seed.is_empty() {
        return Ok(());
    }

    let (stores, customers, products) = store.reference_counts().await?;

    if stores == 0 {
        for name in &seed.stores {
            store.insert_store(name).await?;
        }
    }
    if customers == 0 {
        for customer in &seed.customers {
            store
                .insert_customer(&customer.first_name, &customer.last_name)
                .await?;
        }
    }
    if products == 0 {
        for name in &seed.products {
            store.insert_product(name).await?;
        }
    }

    info!(
        stores = seed.stores.len(),
        customers = seed.customers.len(),
        products = seed.products.len(),
        "reference data seeded"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SeedCustomer;

    fn seed() -> SeedConfig {
        SeedConfig {
            stores: vec!["Acme".to_string()],
            customers: vec![SeedCustomer {
                first_name: "Jane".to_string(),
                last_name: "Doe".to_string(),
            }],
            products: vec!["Widget".to_string(), "Gadget".to_string()],
        }
    }

    #[tokio::test]
    async fn test_seed_fills_empty_tables_once() {
        let store = InMemorySalesStore::new();

        seed_reference_data(&store, &seed()).await.unwrap();
        seed_reference_data(&store, &seed()).await.unwrap();

        assert_eq!(store.reference_counts().await.unwrap(), (1, 1, 2));
    }

    #[tokio::test]
    async fn test_init_memory_storage() {
        let config = StorageConfig {
            storage_type: StorageType::Memory,
            ..StorageConfig::default()
        };
        let store = init_storage(&config).await.unwrap();
        assert_eq!(store.reference_counts().await.unwrap(), (0, 0, 0));
    }

    #[cfg(feature = "sqlite")]
    #[tokio::test]
    async fn test_init_sqlite_storage_creates_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("sales.db");

        let mut config = StorageConfig::default();
        config.sqlite.path = path.to_string_lossy().into_owned();

        let store = init_storage(&config).await.unwrap();
        store.insert_store("Acme").await.unwrap();
        assert!(path.exists());
        assert_eq!(store.reference_counts().await.unwrap().0, 1);
    }
}
