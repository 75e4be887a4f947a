//! Append-only audit records for stock mutations and status transitions.

use chrono::{DateTime, Utc};
use common::{ActorId, OrderId, StockUnitId};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::actor::Role;
use crate::status::OrderStatus;

/// Why a stock quantity changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InventoryAction {
    /// Restock from a supplier.
    Import,
    /// Sold through checkout.
    Export,
    /// Manual correction.
    Adjust,
    /// Customer return.
    Return,
    /// Written off as damaged.
    Damaged,
}

impl InventoryAction {
    /// Returns the action name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            InventoryAction::Import => "Import",
            InventoryAction::Export => "Export",
            InventoryAction::Adjust => "Adjust",
            InventoryAction::Return => "Return",
            InventoryAction::Damaged => "Damaged",
        }
    }
}

impl std::fmt::Display for InventoryAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for InventoryAction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Import" => Ok(InventoryAction::Import),
            "Export" => Ok(InventoryAction::Export),
            "Adjust" => Ok(InventoryAction::Adjust),
            "Return" => Ok(InventoryAction::Return),
            "Damaged" => Ok(InventoryAction::Damaged),
            other => Err(format!("unknown inventory action: {other}")),
        }
    }
}

/// Immutable record of one stock mutation. One entry per debited unit at
/// checkout, one per manual adjustment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InventoryAuditEntry {
    pub id: Uuid,
    pub stock_unit_id: StockUnitId,
    pub action: InventoryAction,
    /// Signed change applied to the quantity.
    pub delta: i64,
    pub quantity_before: u32,
    pub quantity_after: u32,
    pub reason: Option<String>,
    /// The order that caused the change, when it came from checkout.
    pub order_id: Option<OrderId>,
    pub actor_id: Option<ActorId>,
    pub recorded_at: DateTime<Utc>,
}

impl InventoryAuditEntry {
    /// Records a stock mutation.
    #[allow(clippy::too_many_arguments)]
    pub fn record(
        stock_unit_id: StockUnitId,
        action: InventoryAction,
        delta: i64,
        quantity_before: u32,
        quantity_after: u32,
        reason: Option<String>,
        order_id: Option<OrderId>,
        actor_id: Option<ActorId>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            stock_unit_id,
            action,
            delta,
            quantity_before,
            quantity_after,
            reason,
            order_id,
            actor_id,
            recorded_at: Utc::now(),
        }
    }
}

/// Immutable record of one order status transition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderAuditEntry {
    pub id: Uuid,
    pub order_id: OrderId,
    pub old_status: OrderStatus,
    pub new_status: OrderStatus,
    pub actor_id: Option<ActorId>,
    pub actor_role: Role,
    pub reason: Option<String>,
    pub changed_at: DateTime<Utc>,
}

impl OrderAuditEntry {
    /// Records a status transition.
    pub fn record(
        order_id: OrderId,
        old_status: OrderStatus,
        new_status: OrderStatus,
        actor_id: Option<ActorId>,
        actor_role: Role,
        reason: Option<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            order_id,
            old_status,
            new_status,
            actor_id,
            actor_role,
            reason,
            changed_at: Utc::now(),
        }
    }
}
