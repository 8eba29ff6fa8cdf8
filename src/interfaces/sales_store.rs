//! Sales persistence interface.
//!
//! A `SalesStore` hands out one `UnitOfWork` per request. Reads hit the
//! backend directly; writes are staged on the unit of work and applied
//! together by `commit`, which is where optimistic concurrency is checked.

use async_trait::async_trait;

use crate::model::{
    Customer, CustomerId, NewSale, Product, ProductId, Sale, SaleId, SaleRecord, Store, StoreId,
};

/// Result type for storage operations.
pub type Result<T> = std::result::Result<T, StorageError>;

/// Errors that can occur during storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// The row was changed or removed after it was read.
    #[error("Concurrency conflict on sale {id}")]
    Conflict { id: SaleId },

    /// A staged write points at a store, customer or product that no
    /// longer exists. `id` is `None` for inserts.
    #[error("Sale references a missing {kind}")]
    DanglingReference { id: Option<SaleId>, kind: &'static str },

    #[error("Database error: {0}")]
    Database(String),
}

#[cfg(feature = "sqlite")]
impl From<sqlx::Error> for StorageError {
    fn from(err: sqlx::Error) -> Self {
        StorageError::Database(err.to_string())
    }
}

/// Lookup condition passed to the `find_*` operations.
///
/// Comparison is exact and case-sensitive; no trimming or folding.
/// When several rows match, the one with the lowest identifier wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Predicate<'a> {
    /// `name` equals the value. Stores and products.
    NameEquals(&'a str),
    /// `first_name || ' ' || last_name` equals the value. Customers.
    DisplayNameEquals(&'a str),
    /// Identifier equals the value.
    IdEquals(i64),
}

impl Predicate<'_> {
    /// Evaluate against a store.
    pub fn matches_store(&self, store: &Store) -> bool {
        match self {
            Predicate::NameEquals(name) => store.name == *name,
            Predicate::IdEquals(id) => store.id.0 == *id,
            Predicate::DisplayNameEquals(_) => false,
        }
    }

    /// Evaluate against a customer.
    pub fn matches_customer(&self, customer: &Customer) -> bool {
        match self {
            Predicate::DisplayNameEquals(name) => customer.display_name() == *name,
            Predicate::IdEquals(id) => customer.id.0 == *id,
            Predicate::NameEquals(_) => false,
        }
    }

    /// Evaluate against a product.
    pub fn matches_product(&self, product: &Product) -> bool {
        match self {
            Predicate::NameEquals(name) => product.name == *name,
            Predicate::IdEquals(id) => product.id.0 == *id,
            Predicate::DisplayNameEquals(_) => false,
        }
    }
}

/// What a successful commit produced.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommitReceipt {
    /// Identifiers assigned to staged inserts, in staging order.
    pub inserted: Vec<SaleId>,
    /// Number of staged updates applied.
    pub updated: usize,
    /// Number of staged removals applied.
    pub removed: usize,
}

/// Request-scoped unit of work.
///
/// Never shared between requests. Dropping it without calling `commit`
/// discards everything staged.
#[async_trait]
pub trait UnitOfWork: Send {
    async fn find_store(&mut self, predicate: &Predicate<'_>) -> Result<Option<Store>>;

    async fn find_customer(&mut self, predicate: &Predicate<'_>) -> Result<Option<Customer>>;

    async fn find_product(&mut self, predicate: &Predicate<'_>) -> Result<Option<Product>>;

    /// Fetch a sale by identifier without its references.
    async fn find_sale(&mut self, id: SaleId) -> Result<Option<Sale>>;

    /// Fetch a sale joined with its store, customer and product.
    async fn load_sale(&mut self, id: SaleId) -> Result<Option<SaleRecord>>;

    /// Fetch every sale joined with its references, ordered by identifier.
    async fn load_sales(&mut self) -> Result<Vec<SaleRecord>>;

    /// Stage an insert.
    fn add_sale(&mut self, sale: NewSale);

    /// Stage a full replacement of a previously fetched sale.
    ///
    /// `sale.version` must be the version that was read; the commit fails
    /// with `StorageError::Conflict` if the stored row no longer has it.
    fn update_sale(&mut self, sale: Sale);

    /// Stage removal of a previously fetched sale (same version rule).
    fn remove_sale(&mut self, sale: Sale);

    /// Apply everything staged atomically.
    async fn commit(&mut self) -> Result<CommitReceipt>;
}

/// Interface for sales persistence.
///
/// Implementations:
/// - `SqliteSalesStore`: SQLite storage
/// - `InMemorySalesStore`: process-local maps
#[async_trait]
pub trait SalesStore: Send + Sync {
    /// Open a new unit of work.
    async fn begin(&self) -> Result<Box<dyn UnitOfWork>>;

    /// Insert a store. Reference data only; sales never create stores.
    async fn insert_store(&self, name: &str) -> Result<StoreId>;

    async fn insert_customer(&self, first_name: &str, last_name: &str) -> Result<CustomerId>;

    async fn insert_product(&self, name: &str) -> Result<ProductId>;

    /// Row counts of (stores, customers, products).
    async fn reference_counts(&self) -> Result<(u64, u64, u64)>;
}
