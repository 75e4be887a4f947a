//! Catalog snapshots consumed at checkout time.
//!
//! The catalog itself (admin screens, pricing, images) is an external
//! collaborator; checkout only reads a point-in-time view of an item to
//! freeze its price and find its stock unit.

use chrono::{DateTime, Utc};
use common::{ComboId, StockUnitId, VariantId};
use serde::{Deserialize, Serialize};

use crate::money::Money;

/// Reference to exactly one sellable catalog entity: a product variant or
/// a combo. A cart line or order line points at one of these, never both.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id")]
pub enum ItemRef {
    Variant(VariantId),
    Combo(ComboId),
}

impl ItemRef {
    /// Returns "variant" or "combo" for logging and persistence.
    pub fn kind(&self) -> &'static str {
        match self {
            ItemRef::Variant(_) => "variant",
            ItemRef::Combo(_) => "combo",
        }
    }
}

impl std::fmt::Display for ItemRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ItemRef::Variant(id) => write!(f, "variant {id}"),
            ItemRef::Combo(id) => write!(f, "combo {id}"),
        }
    }
}

/// Point-in-time view of a catalog entity as read at checkout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogItem {
    pub item: ItemRef,
    pub name: String,
    pub price: Money,
    pub active: bool,
    /// Start of the availability window (combos); None means no lower bound.
    pub available_from: Option<DateTime<Utc>>,
    /// End of the availability window (combos); None means no upper bound.
    pub available_until: Option<DateTime<Utc>>,
    /// Stock unit backing this item. None means unlimited availability:
    /// nothing to debit at checkout.
    pub stock_unit: Option<StockUnitId>,
}

impl CatalogItem {
    /// Returns true if the item can be purchased at `now`.
    pub fn is_available_at(&self, now: DateTime<Utc>) -> bool {
        if !self.active {
            return false;
        }
        if let Some(from) = self.available_from
            && now < from
        {
            return false;
        }
        if let Some(until) = self.available_until
            && now > until
        {
            return false;
        }
        true
    }
}
