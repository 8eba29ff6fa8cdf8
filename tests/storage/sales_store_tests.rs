//! SalesStore interface tests.
//!
//! These tests verify the contract of the SalesStore and UnitOfWork traits.
//! Each storage implementation should run these tests, each against a
//! fresh store.

use std::sync::Arc;

use chrono::{NaiveDate, NaiveDateTime};

use salesdesk::interfaces::{Predicate, SalesStore, StorageError};
use salesdesk::model::{CustomerId, NewSale, ProductId, SaleDate, SaleId, SaleView, StoreId};
use salesdesk::services::{SaleQuery, SaleReconciler};
use salesdesk::SaleError;

/// Reference ids created by `seed`.
pub struct Refs {
    pub acme: StoreId,
    pub jane: CustomerId,
    pub widget: ProductId,
}

pub async fn seed<S: SalesStore + ?Sized>(store: &S) -> Refs {
    Refs {
        acme: store.insert_store("Acme").await.expect("insert store"),
        jane: store
            .insert_customer("Jane", "Doe")
            .await
            .expect("insert customer"),
        widget: store.insert_product("Widget").await.expect("insert product"),
    }
}

pub fn day(d: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 1, d)
        .unwrap()
        .and_hms_opt(12, 0, 0)
        .unwrap()
}

fn new_sale(refs: &Refs, d: u32) -> NewSale {
    NewSale {
        store_id: refs.acme,
        customer_id: refs.jane,
        product_id: refs.widget,
        date_sold: day(d),
    }
}

async fn insert_sale<S: SalesStore + ?Sized>(store: &S, refs: &Refs, d: u32) -> SaleId {
    let mut uow = store.begin().await.expect("begin");
    uow.add_sale(new_sale(refs, d));
    let receipt = uow.commit().await.expect("commit should succeed");
    receipt.inserted[0]
}

// =============================================================================
// Lookups
// =============================================================================

pub async fn test_find_by_exact_name<S: SalesStore>(store: &S) {
    let refs = seed(store).await;
    let mut uow = store.begin().await.unwrap();

    let acme = uow
        .find_store(&Predicate::NameEquals("Acme"))
        .await
        .unwrap()
        .expect("store should resolve");
    assert_eq!(acme.id, refs.acme);

    let widget = uow
        .find_product(&Predicate::NameEquals("Widget"))
        .await
        .unwrap()
        .expect("product should resolve");
    assert_eq!(widget.id, refs.widget);

    for miss in ["acme", "ACME", " Acme", "Acme "] {
        let found = uow.find_store(&Predicate::NameEquals(miss)).await.unwrap();
        assert!(found.is_none(), "{miss:?} should not resolve");
    }
}

pub async fn test_find_customer_by_display_name<S: SalesStore>(store: &S) {
    let refs = seed(store).await;
    let spaced = store.insert_customer("Ana", "de la Cruz").await.unwrap();
    let mut uow = store.begin().await.unwrap();

    let jane = uow
        .find_customer(&Predicate::DisplayNameEquals("Jane Doe"))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(jane.id, refs.jane);

    let ana = uow
        .find_customer(&Predicate::DisplayNameEquals("Ana de la Cruz"))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(ana.id, spaced);

    assert!(uow
        .find_customer(&Predicate::DisplayNameEquals("Jane  Doe"))
        .await
        .unwrap()
        .is_none());
    assert!(uow
        .find_customer(&Predicate::DisplayNameEquals("jane doe"))
        .await
        .unwrap()
        .is_none());
}

pub async fn test_duplicate_names_resolve_to_lowest_id<S: SalesStore>(store: &S) {
    let first_store = store.insert_store("Twin").await.unwrap();
    store.insert_store("Twin").await.unwrap();
    let first_customer = store.insert_customer("Sam", "Lee").await.unwrap();
    store.insert_customer("Sam", "Lee").await.unwrap();

    let mut uow = store.begin().await.unwrap();
    let s = uow
        .find_store(&Predicate::NameEquals("Twin"))
        .await
        .unwrap()
        .unwrap();
    let c = uow
        .find_customer(&Predicate::DisplayNameEquals("Sam Lee"))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(s.id, first_store);
    assert_eq!(c.id, first_customer);
}

// =============================================================================
// Writes
// =============================================================================

pub async fn test_insert_assigns_distinct_ids<S: SalesStore>(store: &S) {
    let refs = seed(store).await;
    let mut uow = store.begin().await.unwrap();
    uow.add_sale(new_sale(&refs, 1));
    uow.add_sale(new_sale(&refs, 2));

    let receipt = uow.commit().await.unwrap();
    assert_eq!(receipt.inserted.len(), 2);
    assert!(receipt.inserted[0] < receipt.inserted[1]);

    let mut uow = store.begin().await.unwrap();
    let sale = uow.find_sale(receipt.inserted[1]).await.unwrap().unwrap();
    assert_eq!(sale.date_sold, day(2));
    assert_eq!(sale.version, 1);
}

pub async fn test_load_sales_joined_in_id_order<S: SalesStore>(store: &S) {
    let refs = seed(store).await;
    let a = insert_sale(store, &refs, 3).await;
    let b = insert_sale(store, &refs, 1).await;

    let mut uow = store.begin().await.unwrap();
    let records = uow.load_sales().await.unwrap();
    assert_eq!(records.len(), 2);
    assert_eq!(records[0].sale.id, a);
    assert_eq!(records[1].sale.id, b);
    assert_eq!(records[0].store.name, "Acme");
    assert_eq!(records[0].customer.display_name(), "Jane Doe");
    assert_eq!(records[0].product.name, "Widget");

    let one = uow.load_sale(b).await.unwrap().unwrap();
    assert_eq!(one.sale.date_sold, day(1));
    assert!(uow.load_sale(SaleId(9_999)).await.unwrap().is_none());
}

pub async fn test_update_bumps_version<S: SalesStore>(store: &S) {
    let refs = seed(store).await;
    let id = insert_sale(store, &refs, 1).await;

    let mut uow = store.begin().await.unwrap();
    let mut sale = uow.find_sale(id).await.unwrap().unwrap();
    sale.date_sold = day(5);
    uow.update_sale(sale);
    let receipt = uow.commit().await.unwrap();
    assert_eq!(receipt.updated, 1);

    let mut uow = store.begin().await.unwrap();
    let sale = uow.find_sale(id).await.unwrap().unwrap();
    assert_eq!(sale.version, 2);
    assert_eq!(sale.date_sold, day(5));
}

pub async fn test_stale_update_conflicts<S: SalesStore>(store: &S) {
    let refs = seed(store).await;
    let id = insert_sale(store, &refs, 1).await;

    let mut first = store.begin().await.unwrap();
    let mut second = store.begin().await.unwrap();
    let mut a = first.find_sale(id).await.unwrap().unwrap();
    let mut b = second.find_sale(id).await.unwrap().unwrap();

    a.date_sold = day(2);
    first.update_sale(a);
    first.commit().await.unwrap();

    b.date_sold = day(3);
    second.update_sale(b);
    let err = second.commit().await.unwrap_err();
    assert!(matches!(err, StorageError::Conflict { id: c } if c == id));

    let mut uow = store.begin().await.unwrap();
    let sale = uow.find_sale(id).await.unwrap().unwrap();
    assert_eq!(sale.date_sold, day(2));
}

pub async fn test_remove<S: SalesStore>(store: &S) {
    let refs = seed(store).await;
    let id = insert_sale(store, &refs, 1).await;

    let mut uow = store.begin().await.unwrap();
    let sale = uow.find_sale(id).await.unwrap().unwrap();
    uow.remove_sale(sale.clone());
    assert_eq!(uow.commit().await.unwrap().removed, 1);

    let mut uow = store.begin().await.unwrap();
    assert!(uow.find_sale(id).await.unwrap().is_none());

    // Removing again with the stale copy conflicts.
    uow.remove_sale(sale);
    assert!(matches!(
        uow.commit().await,
        Err(StorageError::Conflict { .. })
    ));

    // References are untouched.
    assert_eq!(store.reference_counts().await.unwrap(), (1, 1, 1));
}

pub async fn test_dangling_reference_rejected<S: SalesStore>(store: &S) {
    let refs = seed(store).await;
    let mut uow = store.begin().await.unwrap();
    uow.add_sale(NewSale {
        product_id: ProductId(refs.widget.0 + 1_000),
        ..new_sale(&refs, 1)
    });

    let err = uow.commit().await.unwrap_err();
    assert!(matches!(err, StorageError::DanglingReference { .. }));

    let mut uow = store.begin().await.unwrap();
    assert!(uow.load_sales().await.unwrap().is_empty());
}

pub async fn test_empty_commit_is_noop<S: SalesStore>(store: &S) {
    let mut uow = store.begin().await.unwrap();
    let receipt = uow.commit().await.unwrap();
    assert!(receipt.inserted.is_empty());
    assert_eq!(receipt.updated, 0);
    assert_eq!(receipt.removed, 0);
}

// =============================================================================
// End to end through the services
// =============================================================================

fn view(id: i64, customer: &str, date: &str) -> SaleView {
    SaleView {
        id,
        store_name: "Acme".to_string(),
        customer_name: customer.to_string(),
        product_name: "Widget".to_string(),
        sale_date: Some(SaleDate::parse(date).unwrap()),
    }
}

pub async fn test_sale_lifecycle(store: Arc<dyn SalesStore>) {
    seed(store.as_ref()).await;
    let reconciler = SaleReconciler::new(store.clone());
    let query = SaleQuery::new(store, true);

    assert!(matches!(query.get_all().await, Err(SaleError::EmptyResult)));

    let created = reconciler
        .create(&view(0, "Jane Doe", "2024-01-10"))
        .await
        .unwrap();
    let id = SaleId(created.id);
    assert_eq!(query.get_by_id(id).await.unwrap(), created);

    let err = reconciler
        .update(id, &view(created.id, "Jane X", "2024-01-10"))
        .await
        .unwrap_err();
    assert!(matches!(err, SaleError::InvalidReference { .. }));
    assert_eq!(query.get_by_id(id).await.unwrap(), created);

    let updated = reconciler
        .update(id, &view(created.id, "Jane Doe", "2024-02-02T08:00:00"))
        .await
        .unwrap();
    assert_eq!(query.get_all().await.unwrap(), vec![updated]);

    reconciler.delete(id).await.unwrap();
    assert!(matches!(
        query.get_by_id(id).await,
        Err(SaleError::NotFound(_))
    ));
}

#[macro_export]
macro_rules! run_sales_store_tests {
    ($store:expr) => {
        use $crate::storage::sales_store_tests::*;

        // lookups
        test_find_by_exact_name(&$store).await;
        println!("  test_find_by_exact_name: PASSED");

        test_find_customer_by_display_name(&$store).await;
        println!("  test_find_customer_by_display_name: PASSED");

        test_duplicate_names_resolve_to_lowest_id(&$store).await;
        println!("  test_duplicate_names_resolve_to_lowest_id: PASSED");

        // writes
        test_insert_assigns_distinct_ids(&$store).await;
        println!("  test_insert_assigns_distinct_ids: PASSED");

        test_load_sales_joined_in_id_order(&$store).await;
        println!("  test_load_sales_joined_in_id_order: PASSED");

        test_update_bumps_version(&$store).await;
        println!("  test_update_bumps_version: PASSED");

        test_stale_update_conflicts(&$store).await;
        println!("  test_stale_update_conflicts: PASSED");

        test_remove(&$store).await;
        println!("  test_remove: PASSED");

        test_dangling_reference_rejected(&$store).await;
        println!("  test_dangling_reference_rejected: PASSED");

        test_empty_commit_is_noop(&$store).await;
        println!("  test_empty_commit_is_noop: PASSED");

        // services
        test_sale_lifecycle(std::sync::Arc::new($store)).await;
        println!("  test_sale_lifecycle: PASSED");
    };
}
