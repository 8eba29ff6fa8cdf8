//! Lookup resolver: name → existing Store, Customer, Product.
//!
//! Matching is exact and case-sensitive. If several rows share a name the
//! lowest identifier wins; the storage backends guarantee that order.

use tracing::debug;

use crate::error::{Result, SaleError};
use crate::interfaces::{Predicate, UnitOfWork};
use crate::model::{Customer, CustomerId, Product, SaleView, Store};

/// The three records a sale view resolved to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolved {
    pub store: Store,
    pub customer: Customer,
    pub product: Product,
}

pub async fn resolve_store(uow: &mut dyn UnitOfWork, name: &str) -> Result<Option<Store>> {
    Ok(uow.find_store(&Predicate::NameEquals(name)).await?)
}

pub async fn resolve_product(uow: &mut dyn UnitOfWork, name: &str) -> Result<Option<Product>> {
    Ok(uow.find_product(&Predicate::NameEquals(name)).await?)
}

/// Resolve a customer by display name (`first + " " + last`).
pub async fn resolve_customer(
    uow: &mut dyn UnitOfWork,
    display_name: &str,
) -> Result<Option<Customer>> {
    Ok(uow
        .find_customer(&Predicate::DisplayNameEquals(display_name))
        .await?)
}

/// Resolve a customer, preferring the one a sale already references.
///
/// When `current` still carries `display_name`, it is kept even if another
/// customer with the same name has a lower identifier.
pub async fn resolve_customer_preferring(
    uow: &mut dyn UnitOfWork,
    display_name: &str,
    current: Option<CustomerId>,
) -> Result<Option<Customer>> {
    if let Some(id) = current {
        let existing = uow.find_customer(&Predicate::IdEquals(id.0)).await?;
        if let Some(customer) = existing {
            if customer.display_name() == display_name {
                debug!(customer_id = %id, "kept current customer");
                return Ok(Some(customer));
            }
        }
    }
    resolve_customer(uow, display_name).await
}

/// Resolve every name in `view`.
///
/// All three lookups run even when an earlier one misses, so the error
/// names every unresolved field.
pub async fn resolve_all(
    uow: &mut dyn UnitOfWork,
    view: &SaleView,
    current_customer: Option<CustomerId>,
) -> Result<Resolved> {
    let store = resolve_store(uow, &view.store_name).await?;
    let customer =
        resolve_customer_preferring(uow, &view.customer_name, current_customer).await?;
    let product = resolve_product(uow, &view.product_name).await?;

    match (store, customer, product) {
        (Some(store), Some(customer), Some(product)) => Ok(Resolved {
            store,
            customer,
            product,
        }),
        (store, customer, product) => Err(SaleError::InvalidReference {
            store: store.is_none().then(|| view.store_name.clone()),
            customer: customer.is_none().then(|| view.customer_name.clone()),
            product: product.is_none().then(|| view.product_name.clone()),
        }),
    }
}
