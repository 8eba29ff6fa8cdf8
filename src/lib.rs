//! salesdesk - name-keyed sales service
//!
//! Exposes create/read/update/delete over sales that link a store, a
//! customer and a product. Callers exchange names; the crate resolves
//! them to identifiers, persists normalized records and projects them
//! back, detecting concurrent modification optimistically.

pub mod api;
pub mod config;
pub mod error;
pub mod interfaces;
pub mod model;
pub mod services;
pub mod storage;
pub mod utils;

pub use error::{ErrorKind, SaleError};
pub use model::{SaleId, SaleView};
