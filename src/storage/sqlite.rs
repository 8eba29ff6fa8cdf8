//! SQLite implementation of the sales storage interface.

use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDateTime;
use sea_query::{Alias, Expr, Order, Query, SelectStatement, SqliteQueryBuilder};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteRow};
use sqlx::{Acquire, Row, SqlitePool};
use tracing::debug;

use crate::interfaces::sales_store::{
    CommitReceipt, Predicate, Result, SalesStore, StorageError, UnitOfWork,
};
use crate::model::{
    Customer, CustomerId, NewSale, Product, ProductId, Sale, SaleId, SaleRecord, Store, StoreId,
};

use super::schema::{
    Customers, Products, Sales, Stores, CREATE_REFERENCE_TABLES, CREATE_SALES_TABLE,
};

const DATE_SOLD_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f";

/// SQLite implementation of SalesStore.
pub struct SqliteSalesStore {
    pool: SqlitePool,
}

impl SqliteSalesStore {
    /// Create a new SQLite sales store.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Open a pool on `path` (`:memory:` for a private in-memory database).
    ///
    /// Foreign keys are enforced on every connection. In-memory databases
    /// are per-connection, so they get a single-connection pool.
    pub async fn connect(path: &str, max_connections: u32) -> Result<Self> {
        let in_memory = path == ":memory:";
        let opts = SqliteConnectOptions::new()
            .filename(path)
            .foreign_keys(true)
            .busy_timeout(Duration::from_secs(30))
            .create_if_missing(true);
        let opts = if in_memory {
            opts
        } else {
            opts.journal_mode(SqliteJournalMode::Wal)
        };

        let pool = if in_memory {
            // The database lives and dies with its only connection.
            SqlitePoolOptions::new()
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            SqlitePoolOptions::new().max_connections(max_connections.max(1))
        }
        .connect_with(opts)
        .await?;

        Ok(Self::new(pool))
    }

    /// Initialize the database schema.
    pub async fn init(&self) -> Result<()> {
        sqlx::query(CREATE_REFERENCE_TABLES)
            .execute(&self.pool)
            .await?;
        sqlx::query(CREATE_SALES_TABLE).execute(&self.pool).await?;
        Ok(())
    }

    async fn count(&self, table: impl sea_query::IntoTableRef) -> Result<u64> {
        let query = Query::select()
            .expr(Expr::col(Alias::new("id")).count())
            .from(table)
            .to_string(SqliteQueryBuilder);
        let row = sqlx::query(&query).fetch_one(&self.pool).await?;
        let count: i64 = row.get(0);
        Ok(count as u64)
    }
}

#[async_trait]
impl SalesStore for SqliteSalesStore {
    async fn begin(&self) -> Result<Box<dyn UnitOfWork>> {
        Ok(Box::new(SqliteUnitOfWork {
            pool: self.pool.clone(),
            staged: Vec::new(),
        }))
    }

    async fn insert_store(&self, name: &str) -> Result<StoreId> {
        let query = Query::insert()
            .into_table(Stores::Table)
            .columns([Stores::Name])
            .values_panic([name.into()])
            .to_string(SqliteQueryBuilder);
        let result = sqlx::query(&query).execute(&self.pool).await?;
        Ok(StoreId(result.last_insert_rowid()))
    }

    async fn insert_customer(&self, first_name: &str, last_name: &str) -> Result<CustomerId> {
        let query = Query::insert()
            .into_table(Customers::Table)
            .columns([Customers::FirstName, Customers::LastName])
            .values_panic([first_name.into(), last_name.into()])
            .to_string(SqliteQueryBuilder);
        let result = sqlx::query(&query).execute(&self.pool).await?;
        Ok(CustomerId(result.last_insert_rowid()))
    }

    async fn insert_product(&self, name: &str) -> Result<ProductId> {
        let query = Query::insert()
            .into_table(Products::Table)
            .columns([Products::Name])
            .values_panic([name.into()])
            .to_string(SqliteQueryBuilder);
        let result = sqlx::query(&query).execute(&self.pool).await?;
        Ok(ProductId(result.last_insert_rowid()))
    }

    async fn reference_counts(&self) -> Result<(u64, u64, u64)> {
        Ok((
            self.count(Stores::Table).await?,
            self.count(Customers::Table).await?,
            self.count(Products::Table).await?,
        ))
    }
}

/// Pending write held by a unit of work until commit.
enum Staged {
    Insert(NewSale),
    Update(Sale),
    Remove(Sale),
}

/// SQLite unit of work. Reads use the pool, commit runs in one transaction.
pub struct SqliteUnitOfWork {
    pool: SqlitePool,
    staged: Vec<Staged>,
}

impl SqliteUnitOfWork {
    /// Sales joined with stores, customers and products.
    fn joined_select() -> SelectStatement {
        Query::select()
            .expr_as(Expr::col((Sales::Table, Sales::Id)), Alias::new("sale_id"))
            .expr_as(Expr::col((Sales::Table, Sales::DateSold)), Alias::new("date_sold"))
            .expr_as(Expr::col((Sales::Table, Sales::Version)), Alias::new("version"))
            .expr_as(Expr::col((Stores::Table, Stores::Id)), Alias::new("store_id"))
            .expr_as(Expr::col((Stores::Table, Stores::Name)), Alias::new("store_name"))
            .expr_as(
                Expr::col((Customers::Table, Customers::Id)),
                Alias::new("customer_id"),
            )
            .expr_as(
                Expr::col((Customers::Table, Customers::FirstName)),
                Alias::new("first_name"),
            )
            .expr_as(
                Expr::col((Customers::Table, Customers::LastName)),
                Alias::new("last_name"),
            )
            .expr_as(
                Expr::col((Products::Table, Products::Id)),
                Alias::new("product_id"),
            )
            .expr_as(
                Expr::col((Products::Table, Products::Name)),
                Alias::new("product_name"),
            )
            .from(Sales::Table)
            .inner_join(
                Stores::Table,
                Expr::col((Stores::Table, Stores::Id)).equals((Sales::Table, Sales::StoreId)),
            )
            .inner_join(
                Customers::Table,
                Expr::col((Customers::Table, Customers::Id))
                    .equals((Sales::Table, Sales::CustomerId)),
            )
            .inner_join(
                Products::Table,
                Expr::col((Products::Table, Products::Id))
                    .equals((Sales::Table, Sales::ProductId)),
            )
            .to_owned()
    }

    async fn apply(
        tx: &mut sqlx::SqliteConnection,
        change: Staged,
        receipt: &mut CommitReceipt,
    ) -> Result<()> {
        match change {
            Staged::Insert(sale) => {
                let query = Query::insert()
                    .into_table(Sales::Table)
                    .columns([
                        Sales::StoreId,
                        Sales::CustomerId,
                        Sales::ProductId,
                        Sales::DateSold,
                        Sales::Version,
                    ])
                    .values_panic([
                        sale.store_id.0.into(),
                        sale.customer_id.0.into(),
                        sale.product_id.0.into(),
                        format_date(&sale.date_sold).into(),
                        1_i64.into(),
                    ])
                    .to_string(SqliteQueryBuilder);

                let result = match sqlx::query(&query).execute(&mut *tx).await {
                    Ok(result) => result,
                    Err(e) if is_foreign_key_violation(&e) => {
                        let kind =
                            missing_reference(tx, sale.store_id, sale.customer_id, sale.product_id)
                                .await?;
                        return Err(StorageError::DanglingReference { id: None, kind });
                    }
                    Err(e) => return Err(e.into()),
                };
                receipt.inserted.push(SaleId(result.last_insert_rowid()));
            }
            Staged::Update(sale) => {
                let query = Query::update()
                    .table(Sales::Table)
                    .values([
                        (Sales::StoreId, sale.store_id.0.into()),
                        (Sales::CustomerId, sale.customer_id.0.into()),
                        (Sales::ProductId, sale.product_id.0.into()),
                        (Sales::DateSold, format_date(&sale.date_sold).into()),
                        (Sales::Version, Expr::col(Sales::Version).add(1)),
                    ])
                    .and_where(Expr::col(Sales::Id).eq(sale.id.0))
                    .and_where(Expr::col(Sales::Version).eq(sale.version))
                    .to_string(SqliteQueryBuilder);

                let result = match sqlx::query(&query).execute(&mut *tx).await {
                    Ok(result) => result,
                    Err(e) if is_foreign_key_violation(&e) => {
                        let kind =
                            missing_reference(tx, sale.store_id, sale.customer_id, sale.product_id)
                                .await?;
                        return Err(StorageError::DanglingReference {
                            id: Some(sale.id),
                            kind,
                        });
                    }
                    Err(e) => return Err(e.into()),
                };
                if result.rows_affected() == 0 {
                    return Err(StorageError::Conflict { id: sale.id });
                }
                receipt.updated += 1;
            }
            Staged::Remove(sale) => {
                let query = Query::delete()
                    .from_table(Sales::Table)
                    .and_where(Expr::col(Sales::Id).eq(sale.id.0))
                    .and_where(Expr::col(Sales::Version).eq(sale.version))
                    .to_string(SqliteQueryBuilder);

                let result = sqlx::query(&query).execute(&mut *tx).await?;
                if result.rows_affected() == 0 {
                    return Err(StorageError::Conflict { id: sale.id });
                }
                receipt.removed += 1;
            }
        }
        Ok(())
    }
}

#[async_trait]
impl UnitOfWork for SqliteUnitOfWork {
    async fn find_store(&mut self, predicate: &Predicate<'_>) -> Result<Option<Store>> {
        // Statements hold non-Send idents; finish with them before awaiting.
        let query = {
            let condition = match predicate {
                Predicate::NameEquals(name) => Expr::col(Stores::Name).eq(*name),
                Predicate::IdEquals(id) => Expr::col(Stores::Id).eq(*id),
                Predicate::DisplayNameEquals(_) => return Ok(None),
            };
            Query::select()
                .columns([Stores::Id, Stores::Name])
                .from(Stores::Table)
                .and_where(condition)
                .order_by(Stores::Id, Order::Asc)
                .limit(1)
                .to_string(SqliteQueryBuilder)
        };

        let row = sqlx::query(&query).fetch_optional(&self.pool).await?;
        Ok(row.map(|row| Store {
            id: StoreId(row.get("id")),
            name: row.get("name"),
        }))
    }

    async fn find_customer(&mut self, predicate: &Predicate<'_>) -> Result<Option<Customer>> {
        let query = {
            let condition = match predicate {
                // Computed comparison; served by idx_customers_display_name.
                Predicate::DisplayNameEquals(name) => {
                    Expr::cust_with_values("(first_name || ' ' || last_name) = ?", [*name])
                }
                Predicate::IdEquals(id) => Expr::col(Customers::Id).eq(*id),
                Predicate::NameEquals(_) => return Ok(None),
            };
            Query::select()
                .columns([Customers::Id, Customers::FirstName, Customers::LastName])
                .from(Customers::Table)
                .and_where(condition)
                .order_by(Customers::Id, Order::Asc)
                .limit(1)
                .to_string(SqliteQueryBuilder)
        };

        let row = sqlx::query(&query).fetch_optional(&self.pool).await?;
        Ok(row.map(|row| Customer {
            id: CustomerId(row.get("id")),
            first_name: row.get("first_name"),
            last_name: row.get("last_name"),
        }))
    }

    async fn find_product(&mut self, predicate: &Predicate<'_>) -> Result<Option<Product>> {
        let query = {
            let condition = match predicate {
                Predicate::NameEquals(name) => Expr::col(Products::Name).eq(*name),
                Predicate::IdEquals(id) => Expr::col(Products::Id).eq(*id),
                Predicate::DisplayNameEquals(_) => return Ok(None),
            };
            Query::select()
                .columns([Products::Id, Products::Name])
                .from(Products::Table)
                .and_where(condition)
                .order_by(Products::Id, Order::Asc)
                .limit(1)
                .to_string(SqliteQueryBuilder)
        };

        let row = sqlx::query(&query).fetch_optional(&self.pool).await?;
        Ok(row.map(|row| Product {
            id: ProductId(row.get("id")),
            name: row.get("name"),
        }))
    }

    async fn find_sale(&mut self, id: SaleId) -> Result<Option<Sale>> {
        let query = Query::select()
            .columns([
                Sales::Id,
                Sales::StoreId,
                Sales::CustomerId,
                Sales::ProductId,
                Sales::DateSold,
                Sales::Version,
            ])
            .from(Sales::Table)
            .and_where(Expr::col(Sales::Id).eq(id.0))
            .to_string(SqliteQueryBuilder);

        let row = sqlx::query(&query).fetch_optional(&self.pool).await?;
        match row {
            Some(row) => Ok(Some(Sale {
                id: SaleId(row.get("id")),
                store_id: StoreId(row.get("store_id")),
                customer_id: CustomerId(row.get("customer_id")),
                product_id: ProductId(row.get("product_id")),
                date_sold: parse_date(row.get("date_sold"))?,
                version: row.get("version"),
            })),
            None => Ok(None),
        }
    }

    async fn load_sale(&mut self, id: SaleId) -> Result<Option<SaleRecord>> {
        let query = Self::joined_select()
            .and_where(Expr::col((Sales::Table, Sales::Id)).eq(id.0))
            .to_string(SqliteQueryBuilder);

        let row = sqlx::query(&query).fetch_optional(&self.pool).await?;
        row.as_ref().map(record_from_row).transpose()
    }

    async fn load_sales(&mut self) -> Result<Vec<SaleRecord>> {
        let query = Self::joined_select()
            .order_by((Sales::Table, Sales::Id), Order::Asc)
            .to_string(SqliteQueryBuilder);

        let rows = sqlx::query(&query).fetch_all(&self.pool).await?;

        let mut records = Vec::with_capacity(rows.len());
        for row in &rows {
            records.push(record_from_row(row)?);
        }
        Ok(records)
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

        let mut conn = self.pool.acquire().await?;
        let mut tx = conn.begin().await?;

        for change in self.staged.drain(..) {
            // Returning early drops `tx`, which rolls the transaction back.
            Self::apply(&mut tx, change, &mut receipt).await?;
        }

        tx.commit().await?;
        debug!(
            inserted = receipt.inserted.len(),
            updated = receipt.updated,
            removed = receipt.removed,
            "sqlite unit of work committed"
        );
        Ok(receipt)
    }
}

fn format_date(date: &NaiveDateTime) -> String {
    date.format(DATE_SOLD_FORMAT).to_string()
}

fn parse_date(raw: String) -> Result<NaiveDateTime> {
    NaiveDateTime::parse_from_str(&raw, DATE_SOLD_FORMAT)
        .map_err(|e| StorageError::Database(format!("invalid date_sold {:?}: {}", raw, e)))
}

fn record_from_row(row: &SqliteRow) -> Result<SaleRecord> {
    let store = Store {
        id: StoreId(row.get("store_id")),
        name: row.get("store_name"),
    };
    let customer = Customer {
        id: CustomerId(row.get("customer_id")),
        first_name: row.get("first_name"),
        last_name: row.get("last_name"),
    };
    let product = Product {
        id: ProductId(row.get("product_id")),
        name: row.get("product_name"),
    };
    let sale = Sale {
        id: SaleId(row.get("sale_id")),
        store_id: store.id,
        customer_id: customer.id,
        product_id: product.id,
        date_sold: parse_date(row.get("date_sold"))?,
        version: row.get("version"),
    };

    Ok(SaleRecord {
        sale,
        store,
        customer,
        product,
    })
}

fn is_foreign_key_violation(err: &sqlx::Error) -> bool {
    err.as_database_error()
        .map(|db| db.is_foreign_key_violation())
        .unwrap_or(false)
}

fn exists_query(
    table: impl sea_query::IntoTableRef,
    column: impl sea_query::IntoColumnRef,
    id: i64,
) -> String {
    Query::select()
        .expr(Expr::val(1))
        .from(table)
        .and_where(Expr::col(column).eq(id))
        .to_string(SqliteQueryBuilder)
}

/// Name the first reference of a rejected write that has no row.
///
/// SQLite does not say which constraint failed, so look each one up.
async fn missing_reference(
    conn: &mut sqlx::SqliteConnection,
    store: StoreId,
    customer: CustomerId,
    product: ProductId,
) -> Result<&'static str> {
    let checks = [
        ("store", exists_query(Stores::Table, Stores::Id, store.0)),
        (
            "customer",
            exists_query(Customers::Table, Customers::Id, customer.0),
        ),
        (
            "product",
            exists_query(Products::Table, Products::Id, product.0),
        ),
    ];
    for (kind, query) in checks {
        if sqlx::query(&query)
            .fetch_optional(&mut *conn)
            .await?
            .is_none()
        {
            return Ok(kind);
        }
    }
    Ok("reference")
}
