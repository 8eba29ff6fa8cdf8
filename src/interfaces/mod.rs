//! Abstract interfaces for salesdesk components.
//!
//! These traits define the persistence contract the core depends on.

pub mod sales_store;

pub use sales_store::{CommitReceipt, Predicate, SalesStore, StorageError, UnitOfWork};
