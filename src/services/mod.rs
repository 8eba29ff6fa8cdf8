//! Sale services: name resolution, mapping, reconciliation and queries.

pub mod mapper;
pub mod query;
pub mod reconcile;
pub mod resolver;

pub use query::SaleQuery;
pub use reconcile::SaleReconciler;
pub use resolver::Resolved;
