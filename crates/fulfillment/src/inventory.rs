//! Manual stock maintenance: privileged adjustments and history reads.

use common::StockUnitId;
use domain::{Actor, InventoryAction, InventoryAuditEntry, StockUnit};
use store::{StockAdjustment, Store};

use crate::error::InventoryError;

/// Staff-facing stock operations.
///
/// Adjustments bypass the version token (they are not racing checkouts for
/// a customer) but still bump it, so any in-flight checkout rereads, and
/// always land on the audit trail. An adjustment that would take the
/// quantity below zero is refused.
pub struct StockService<S: Store> {
    store: S,
}

impl<S: Store> StockService<S> {
    /// Creates a new stock service.
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Creates a stock unit with an initial quantity.
    pub async fn create_unit(
        &self,
        actor: &Actor,
        available: u32,
    ) -> Result<StockUnit, InventoryError> {
        if !actor.is_staff() {
            return Err(InventoryError::StaffOnly);
        }
        let unit = StockUnit::new(StockUnitId::new(), available);
        self.store.insert_stock_unit(unit.clone()).await?;
        Ok(unit)
    }

    /// Reads a unit's current quantity and version token.
    pub async fn stock_unit(&self, id: StockUnitId) -> Result<Option<StockUnit>, InventoryError> {
        Ok(self.store.stock_unit(id).await?)
    }

    /// Applies a signed manual adjustment.
    #[tracing::instrument(skip(self, actor, adjust_reason))]
    pub async fn adjust(
        &self,
        actor: &Actor,
        stock_unit_id: StockUnitId,
        delta: i64,
        action: InventoryAction,
        adjust_reason: Option<String>,
    ) -> Result<InventoryAuditEntry, InventoryError> {
        if !actor.is_staff() {
            return Err(InventoryError::StaffOnly);
        }

        let entry = self
            .store
            .commit_adjustment(StockAdjustment {
                stock_unit_id,
                delta,
                action,
                reason: adjust_reason,
                actor_id: Some(actor.id),
            })
            .await?;

        metrics::counter!("stock_adjustments_total", "action" => action.as_str()).increment(1);
        tracing::info!(
            %stock_unit_id,
            delta,
            after = entry.quantity_after,
            "stock adjusted"
        );
        Ok(entry)
    }

    /// A unit's full mutation history, newest first.
    pub async fn history(
        &self,
        id: StockUnitId,
    ) -> Result<Vec<InventoryAuditEntry>, InventoryError> {
        Ok(self.store.inventory_audit(id).await?)
    }
}
