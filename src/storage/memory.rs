//! In-memory implementation of the sales storage interface.
//!
//! Used for tests and for running without a database file. Semantics match
//! the SQLite backend: exact lookups, lowest-id tie-break, version-checked
//! writes, referential checks on commit.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{Barrier, RwLock};
use tracing::debug;

use crate::interfaces::sales_store::{
    CommitReceipt, Predicate, Result, SalesStore, StorageError, UnitOfWork,
};
use crate::model::{
    Customer, CustomerId, NewSale, Product, ProductId, Sale, SaleId, SaleRecord, Store, StoreId,
};

#[derive(Default)]
struct Tables {
    stores: BTreeMap<StoreId, Store>,
    customers: BTreeMap<CustomerId, Customer>,
    products: BTreeMap<ProductId, Product>,
    sales: BTreeMap<SaleId, Sale>,
    last_id: i64,
}

impl Tables {
    fn next_id(&mut self) -> i64 {
        self.last_id += 1;
        self.last_id
    }

    fn join(&self, sale: &Sale) -> Result<SaleRecord> {
        let dangling = |kind| StorageError::DanglingReference {
            id: Some(sale.id),
            kind,
        };
        Ok(SaleRecord {
            store: self
                .stores
                .get(&sale.store_id)
                .cloned()
                .ok_or_else(|| dangling("store"))?,
            customer: self
                .customers
                .get(&sale.customer_id)
                .cloned()
                .ok_or_else(|| dangling("customer"))?,
            product: self
                .products
                .get(&sale.product_id)
                .cloned()
                .ok_or_else(|| dangling("product"))?,
            sale: sale.clone(),
        })
    }

    fn check_references(
        &self,
        id: Option<SaleId>,
        store: StoreId,
        customer: CustomerId,
        product: ProductId,
    ) -> Result<()> {
        let missing = if !self.stores.contains_key(&store) {
            Some("store")
        } else if !self.customers.contains_key(&customer) {
            Some("customer")
        } else if !self.products.contains_key(&product) {
            Some("product")
        } else {
            None
        };
        match missing {
            Some(kind) => Err(StorageError::DanglingReference { id, kind }),
            None => Ok(()),
        }
    }

    fn check_version(&self, sale: &Sale) -> Result<()> {
        match self.sales.get(&sale.id) {
            Some(current) if current.version == sale.version => Ok(()),
            _ => Err(StorageError::Conflict { id: sale.id }),
        }
    }
}

#[derive(Default)]
struct Shared {
    tables: RwLock<Tables>,
    commit_barrier: RwLock<Option<Arc<Barrier>>>,
}

/// In-memory sales store. Clones share the same tables.
#[derive(Clone, Default)]
pub struct InMemorySalesStore {
    shared: Arc<Shared>,
}

impl InMemorySalesStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent commit wait on `barrier` before writing.
    ///
    /// Lets tests line up several units of work between their reads and
    /// their commits.
    pub async fn set_commit_barrier(&self, barrier: Arc<Barrier>) {
        *self.shared.commit_barrier.write().await = Some(barrier);
    }

    pub async fn clear_commit_barrier(&self) {
        *self.shared.commit_barrier.write().await = None;
    }

    /// Number of persisted sales.
    pub async fn sale_count(&self) -> usize {
        self.shared.tables.read().await.sales.len()
    }
}

#[async_trait]
impl SalesStore for InMemorySalesStore {
    async fn begin(&self) -> Result<Box<dyn UnitOfWork>> {
        Ok(Box::new(InMemoryUnitOfWork {
            shared: Arc::clone(&self.shared),
            staged: Vec::new(),
        }))
    }

    async fn insert_store(&self, name: &str) -> Result<StoreId> {
        let mut tables = self.shared.tables.write().await;
        let id = StoreId(tables.next_id());
        tables.stores.insert(
            id,
            Store {
                id,
                name: name.to_string(),
            },
        );
        Ok(id)
    }

    async fn insert_customer(&self, first_name: &str, last_name: &str) -> Result<CustomerId> {
        let mut tables = self.shared.tables.write().await;
        let id = CustomerId(tables.next_id());
        tables.customers.insert(
            id,
            Customer {
                id,
                first_name: first_name.to_string(),
                last_name: last_name.to_string(),
            },
        );
        Ok(id)
    }

    async fn insert_product(&self, name: &str) -> Result<ProductId> {
        let mut tables = self.shared.tables.write().await;
        let id = ProductId(tables.next_id());
        tables.products.insert(
            id,
            Product {
                id,
                name: name.to_string(),
            },
        );
        Ok(id)
    }

    async fn reference_counts(&self) -> Result<(u64, u64, u64)> {
        let tables = self.shared.tables.read().await;
        Ok((
            tables.stores.len() as u64,
            tables.customers.len() as u64,
            tables.products.len() as u64,
        ))
    }
}

enum Staged {
    Insert(NewSale),
    Update(Sale),
    Remove(Sale),
}

/// Unit of work over an `InMemorySalesStore`.
pub struct InMemoryUnitOfWork {
    shared: Arc<Shared>,
    staged: Vec<Staged>,
}

#[async_trait]
impl UnitOfWork for InMemoryUnitOfWork {
    async fn find_store(&mut self, predicate: &Predicate<'_>) -> Result<Option<Store>> {
        let tables = self.shared.tables.read().await;
        Ok(tables
            .stores
            .values()
            .find(|s| predicate.matches_store(s))
            .cloned())
    }

    async fn find_customer(&mut self, predicate: &Predicate<'_>) -> Result<Option<Customer>> {
        // Full scan in identifier order, comparing concatenated names.
        let tables = self.shared.tables.read().await;
        Ok(tables
            .customers
            .values()
            .find(|c| predicate.matches_customer(c))
            .cloned())
    }

    async fn find_product(&mut self, predicate: &Predicate<'_>) -> Result<Option<Product>> {
        let tables = self.shared.tables.read().await;
        Ok(tables
            .products
            .values()
            .find(|p| predicate.matches_product(p))
            .cloned())
    }

    async fn find_sale(&mut self, id: SaleId) -> Result<Option<Sale>> {
        Ok(self.shared.tables.read().await.sales.get(&id).cloned())
    }

    async fn load_sale(&mut self, id: SaleId) -> Result<Option<SaleRecord>> {
        let tables = self.shared.tables.read().await;
        tables.sales.get(&id).map(|sale| tables.join(sale)).transpose()
    }

    async fn load_sales(&mut self) -> Result<Vec<SaleRecord>> {
        let tables = self.shared.tables.read().await;
        tables.sales.values().map(|sale| tables.join(sale)).collect()
    }

    fn add_sale(&mut self, sale: NewSale) {
        self.staged.push(Staged::Insert(sale));
    }

    fn update_sale(&mut self, sale: Sale) {
        self.staged.push(Staged::Update(sale));
    }

    fn remove_sale(&mut self, sale: Sale) {
        self.staged.push(Staged::Remove(sale));
    }

    async fn commit(&mut self) -> Result<CommitReceipt> {
        let mut receipt = CommitReceipt::default();
        if self.staged.is_empty() {
            return Ok(receipt);
        }

        let barrier = self.shared.commit_barrier.read().await.clone();
        if let Some(barrier) = barrier {
            barrier.wait().await;
        }

        let mut tables = self.shared.tables.write().await;

        // Validate everything before touching anything so a failure leaves
        // the tables as they were.
        for change in &self.staged {
            match change {
                Staged::Insert(sale) => tables.check_references(
                    None,
                    sale.store_id,
                    sale.customer_id,
                    sale.product_id,
                )?,
                Staged::Update(sale) => {
                    tables.check_version(sale)?;
                    tables.check_references(
                        Some(sale.id),
                        sale.store_id,
                        sale.customer_id,
                        sale.product_id,
                    )?;
                }
                Staged::Remove(sale) => tables.check_version(sale)?,
            }
        }

        for change in self.staged.drain(..) {
            match change {
                Staged::Insert(sale) => {
                    let id = SaleId(tables.next_id());
                    tables.sales.insert(id, sale.into_sale(id));
                    receipt.inserted.push(id);
                }
                Staged::Update(mut sale) => {
                    sale.version += 1;
                    tables.sales.insert(sale.id, sale);
                    receipt.updated += 1;
                }
                Staged::Remove(sale) => {
                    tables.sales.remove(&sale.id);
                    receipt.removed += 1;
                }
            }
        }

        debug!(
            inserted = receipt.inserted.len(),
            updated = receipt.updated,
            removed = receipt.removed,
            "in-memory unit of work committed"
        );
        Ok(receipt)
    }
}
