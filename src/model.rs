//! Domain records and the external sale representation.
//!
//! Persisted records (`Store`, `Customer`, `Product`, `Sale`) are keyed by
//! identifier. `SaleView` is the name-keyed shape exchanged with callers;
//! it is built per request and never stored.

use std::fmt;

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

macro_rules! id_type {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub i64);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

id_type!(
    /// Identifier of a persisted sale.
    SaleId
);
id_type!(
    /// Identifier of a store.
    StoreId
);
id_type!(
    /// Identifier of a customer.
    CustomerId
);
id_type!(
    /// Identifier of a product.
    ProductId
);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Store {
    pub id: StoreId,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Customer {
    pub id: CustomerId,
    pub first_name: String,
    pub last_name: String,
}

impl Customer {
    /// Name shown to callers: first and last name joined by one space.
    ///
    /// Not reversible. Last names may themselves contain spaces.
    pub fn display_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
}

/// A persisted sale.
///
/// `version` is the optimistic concurrency token. It starts at 1 and the
/// storage layer bumps it on every committed update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sale {
    pub id: SaleId,
    pub store_id: StoreId,
    pub customer_id: CustomerId,
    pub product_id: ProductId,
    pub date_sold: NaiveDateTime,
    pub version: i64,
}

/// A sale staged for insertion; identifier and version come from storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewSale {
    pub store_id: StoreId,
    pub customer_id: CustomerId,
    pub product_id: ProductId,
    pub date_sold: NaiveDateTime,
}

impl NewSale {
    /// Attach storage-assigned identity.
    pub fn into_sale(self, id: SaleId) -> Sale {
        Sale {
            id,
            store_id: self.store_id,
            customer_id: self.customer_id,
            product_id: self.product_id,
            date_sold: self.date_sold,
            version: 1,
        }
    }
}

/// A sale loaded together with the three records it references.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaleRecord {
    pub sale: Sale,
    pub store: Store,
    pub customer: Customer,
    pub product: Product,
}

/// External, name-keyed representation of a sale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaleView {
    #[serde(default)]
    pub id: i64,
    pub store_name: String,
    pub customer_name: String,
    pub product_name: String,
    #[serde(default)]
    pub sale_date: Option<SaleDate>,
}

/// Calendar date/time of a sale.
///
/// Accepts `YYYY-MM-DD` (read as midnight), a naive
/// `YYYY-MM-DDTHH:MM:SS[.fff]` timestamp, or RFC 3339 with a `Z` or offset
/// (converted to UTC). Always written in the long form; fractional seconds
/// are kept and omitted only when zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SaleDate(pub NaiveDateTime);

const DATE_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f";

impl SaleDate {
    pub fn parse(input: &str) -> Result<Self, chrono::ParseError> {
        let input = input.trim();
        let long_err = match NaiveDateTime::parse_from_str(input, DATE_TIME_FORMAT) {
            Ok(dt) => return Ok(Self(dt)),
            Err(e) => e,
        };
        if let Ok(dt) = DateTime::parse_from_rfc3339(input) {
            return Ok(Self(dt.naive_utc()));
        }
        match NaiveDate::parse_from_str(input, "%Y-%m-%d") {
            Ok(date) => Ok(Self(date.and_time(chrono::NaiveTime::MIN))),
            Err(_) => Err(long_err),
        }
    }
}

impl From<NaiveDateTime> for SaleDate {
    fn from(dt: NaiveDateTime) -> Self {
        Self(dt)
    }
}

impl fmt::Display for SaleDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format(DATE_TIME_FORMAT))
    }
}

impl Serialize for SaleDate {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for SaleDate {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        SaleDate::parse(&raw).map_err(serde::de::Error::custom)
    }
}
