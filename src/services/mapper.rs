//! Sale mapper: persisted `Sale` ⇄ external `SaleView`.

use chrono::NaiveDateTime;

use crate::error::{Result, SaleError};
use crate::model::{
    Customer, CustomerId, NewSale, Product, ProductId, Sale, SaleDate, SaleRecord, SaleView,
    Store, StoreId,
};

use super::resolver::Resolved;

/// Project a sale and the three records it references.
///
/// The customer name is synthesized and cannot be mapped back by splitting.
pub fn to_view(sale: &Sale, store: &Store, customer: &Customer, product: &Product) -> SaleView {
    SaleView {
        id: sale.id.0,
        store_name: store.name.clone(),
        customer_name: customer.display_name(),
        product_name: product.name.clone(),
        sale_date: Some(SaleDate(sale.date_sold)),
    }
}

pub fn to_view_record(record: &SaleRecord) -> SaleView {
    to_view(
        &record.sale,
        &record.store,
        &record.customer,
        &record.product,
    )
}

/// Build a new persisted sale from already-resolved references.
pub fn to_entity(
    date_sold: NaiveDateTime,
    store: StoreId,
    customer: CustomerId,
    product: ProductId,
) -> NewSale {
    NewSale {
        store_id: store,
        customer_id: customer,
        product_id: product,
        date_sold,
    }
}

/// Overwrite every mutable field of `sale`. Identity and version stay.
pub fn apply(sale: &mut Sale, date_sold: NaiveDateTime, resolved: &Resolved) {
    sale.store_id = resolved.store.id;
    sale.customer_id = resolved.customer.id;
    sale.product_id = resolved.product.id;
    sale.date_sold = date_sold;
}

/// Reject a view without a sale date.
pub fn require_sale_date(view: &SaleView) -> Result<NaiveDateTime> {
    view.sale_date
        .map(|date| date.0)
        .ok_or(SaleError::MissingSaleDate)
}
