//! Database schema definitions using sea-query.
//!
//! These define the table and column identifiers for type-safe query building.

use sea_query::Iden;

/// Stores table schema.
#[derive(Iden)]
pub enum Stores {
    Table,
    #[iden = "id"]
    Id,
    #[iden = "name"]
    Name,
}

/// Customers table schema.
#[derive(Iden)]
pub enum Customers {
    Table,
    #[iden = "id"]
    Id,
    #[iden = "first_name"]
    FirstName,
    #[iden = "last_name"]
    LastName,
}

/// Products table schema.
#[derive(Iden)]
pub enum Products {
    Table,
    #[iden = "id"]
    Id,
    #[iden = "name"]
    Name,
}

/// Sales table schema.
#[derive(Iden)]
pub enum Sales {
    Table,
    #[iden = "id"]
    Id,
    #[iden = "store_id"]
    StoreId,
    #[iden = "customer_id"]
    CustomerId,
    #[iden = "product_id"]
    ProductId,
    #[iden = "date_sold"]
    DateSold,
    #[iden = "version"]
    Version,
}

/// SQL for creating the reference tables.
///
/// Text columns keep SQLite's default BINARY collation, so name lookups
/// are exact and case-sensitive.
pub const CREATE_REFERENCE_TABLES: &str = r#"
CREATE TABLE IF NOT EXISTS stores (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_stores_name ON stores(name);

CREATE TABLE IF NOT EXISTS customers (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    first_name TEXT NOT NULL,
    last_name TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_customers_display_name
    ON customers(first_name || ' ' || last_name);

CREATE TABLE IF NOT EXISTS products (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_products_name ON products(name);
"#;

/// SQL for creating the sales table.
pub const CREATE_SALES_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS sales (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    store_id INTEGER NOT NULL REFERENCES stores(id),
    customer_id INTEGER NOT NULL REFERENCES customers(id),
    product_id INTEGER NOT NULL REFERENCES products(id),
    date_sold TEXT NOT NULL,
    version INTEGER NOT NULL DEFAULT 1
);
"#;
