//! Query service: read paths producing sale views.

use std::sync::Arc;

use tracing::debug;

use crate::error::{Result, SaleError};
use crate::interfaces::SalesStore;
use crate::model::{SaleId, SaleView};

use super::mapper;

/// Single and collection reads over sales.
pub struct SaleQuery {
    store: Arc<dyn SalesStore>,
    empty_list_is_error: bool,
}

impl SaleQuery {
    /// `empty_list_is_error` turns an empty listing into `SaleError::EmptyResult`.
    pub fn new(store: Arc<dyn SalesStore>, empty_list_is_error: bool) -> Self {
        Self {
            store,
            empty_list_is_error,
        }
    }

    /// Every sale, joined and projected, ordered by identifier.
    pub async fn get_all(&self) -> Result<Vec<SaleView>> {
        let mut uow = self.store.begin().await?;
        let records = uow.load_sales().await?;
        debug!(count = records.len(), "loaded sales");

        if records.is_empty() && self.empty_list_is_error {
            return Err(SaleError::EmptyResult);
        }
        Ok(records.iter().map(mapper::to_view_record).collect())
    }

    pub async fn get_by_id(&self, id: SaleId) -> Result<SaleView> {
        let mut uow = self.store.begin().await?;
        let record = uow.load_sale(id).await?.ok_or(SaleError::NotFound(id))?;
        Ok(mapper::to_view_record(&record))
    }
}
