//! Reconciliation engine: applies name-keyed sale views as persisted writes.
//!
//! Every operation opens its own unit of work, resolves names to
//! references, stages the change and commits. A commit that loses an
//! optimistic-concurrency race is reported, never retried.

use std::sync::Arc;

use tracing::{debug, info};

use crate::error::{Result, SaleError};
use crate::interfaces::{SalesStore, StorageError};
use crate::model::{SaleId, SaleView};

use super::{mapper, resolver};

/// Create, update and delete paths for sales.
pub struct SaleReconciler {
    store: Arc<dyn SalesStore>,
}

impl SaleReconciler {
    pub fn new(store: Arc<dyn SalesStore>) -> Self {
        Self { store }
    }

    /// Persist a new sale. Any `id` on `view` is ignored.
    ///
    /// Returns the committed sale with its assigned identifier.
    pub async fn create(&self, view: &SaleView) -> Result<SaleView> {
        let date_sold = mapper::require_sale_date(view)?;

        let mut uow = self.store.begin().await?;
        let resolved = resolver::resolve_all(uow.as_mut(), view, None).await?;

        let new_sale = mapper::to_entity(
            date_sold,
            resolved.store.id,
            resolved.customer.id,
            resolved.product.id,
        );
        uow.add_sale(new_sale.clone());

        let receipt = uow
            .commit()
            .await
            .map_err(|e| lost_reference(e, view))?;
        let id = receipt.inserted.first().copied().ok_or_else(|| {
            StorageError::Database("commit did not assign a sale identifier".to_string())
        })?;

        let sale = new_sale.into_sale(id);
        info!(sale_id = %id, "sale created");
        Ok(mapper::to_view(
            &sale,
            &resolved.store,
            &resolved.customer,
            &resolved.product,
        ))
    }

    /// Replace every field of sale `id` with the contents of `view`.
    ///
    /// Outcomes are checked in this order: identifier mismatch, missing
    /// date, unresolved names, missing sale, commit conflict.
    pub async fn update(&self, id: SaleId, view: &SaleView) -> Result<SaleView> {
        if view.id != id.0 {
            return Err(SaleError::IdentifierMismatch {
                target: id,
                payload: view.id,
            });
        }
        let date_sold = mapper::require_sale_date(view)?;

        let mut uow = self.store.begin().await?;
        let existing = uow.find_sale(id).await?;
        let current_customer = existing.as_ref().map(|sale| sale.customer_id);
        let resolved = resolver::resolve_all(uow.as_mut(), view, current_customer).await?;

        let mut sale = existing.ok_or(SaleError::NotFound(id))?;
        mapper::apply(&mut sale, date_sold, &resolved);
        uow.update_sale(sale.clone());

        match uow.commit().await {
            Ok(_) => {}
            Err(StorageError::Conflict { .. }) => return Err(self.conflict_outcome(id).await),
            Err(e) => return Err(lost_reference(e, view)),
        }

        sale.version += 1;
        info!(sale_id = %id, version = sale.version, "sale updated");
        Ok(mapper::to_view(
            &sale,
            &resolved.store,
            &resolved.customer,
            &resolved.product,
        ))
    }

    /// Remove sale `id`. Stores, customers and products are untouched.
    pub async fn delete(&self, id: SaleId) -> Result<()> {
        let mut uow = self.store.begin().await?;
        let sale = uow.find_sale(id).await?.ok_or(SaleError::NotFound(id))?;
        uow.remove_sale(sale);

        match uow.commit().await {
            Ok(_) => {}
            Err(StorageError::Conflict { .. }) => return Err(self.conflict_outcome(id).await),
            Err(e) => return Err(e.into()),
        }

        info!(sale_id = %id, "sale deleted");
        Ok(())
    }

    /// Decide what a lost commit means for the caller.
    ///
    /// Gone since it was read → `NotFound`; still there → `ConcurrencyConflict`.
    async fn conflict_outcome(&self, id: SaleId) -> SaleError {
        let still_exists = async {
            let mut uow = self.store.begin().await?;
            Ok::<_, StorageError>(uow.find_sale(id).await?.is_some())
        };
        match still_exists.await {
            Ok(true) => {
                debug!(sale_id = %id, "commit lost to a concurrent modification");
                SaleError::ConcurrencyConflict(id)
            }
            Ok(false) => {
                debug!(sale_id = %id, "sale removed before commit");
                SaleError::NotFound(id)
            }
            Err(e) => e.into(),
        }
    }
}

/// A reference that resolved but vanished before commit is reported the
/// same way as one that never resolved.
fn lost_reference(err: StorageError, view: &SaleView) -> SaleError {
    match err {
        StorageError::DanglingReference { kind, .. } => {
            let named = |field: &str, name: &String| {
                (kind == field || !matches!(kind, "store" | "customer" | "product"))
                    .then(|| name.clone())
            };
            SaleError::InvalidReference {
                store: named("store", &view.store_name),
                customer: named("customer", &view.customer_name),
                product: named("product", &view.product_name),
            }
        }
        other => other.into(),
    }
}
