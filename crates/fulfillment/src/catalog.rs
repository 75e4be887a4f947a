//! Catalog trait and in-memory implementation.
//!
//! The real catalog (admin screens, pricing, availability windows) lives
//! outside this system; checkout only needs a point-in-time read of each
//! cart line's item.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use domain::{CatalogItem, ItemRef};

use crate::error::CheckoutError;

/// Trait for catalog lookups at checkout time.
#[async_trait]
pub trait Catalog: Send + Sync {
    /// Resolves a sellable item to its current catalog entry, or `None` if
    /// the catalog does not know it.
    async fn item(&self, item: ItemRef) -> Result<Option<CatalogItem>, CheckoutError>;
}

#[derive(Debug, Default)]
struct InMemoryCatalogState {
    items: HashMap<ItemRef, CatalogItem>,
    fail_on_lookup: bool,
}

/// In-memory catalog for testing and single-process deployments.
#[derive(Debug, Clone, Default)]
pub struct InMemoryCatalog {
    state: Arc<RwLock<InMemoryCatalogState>>,
}

impl InMemoryCatalog {
    /// Creates a new empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces a catalog entry.
    pub fn insert(&self, item: CatalogItem) {
        self.state.write().unwrap().items.insert(item.item, item);
    }

    /// Activates or deactivates an entry. No-op if the item is unknown.
    pub fn set_active(&self, item: ItemRef, active: bool) {
        if let Some(entry) = self.state.write().unwrap().items.get_mut(&item) {
            entry.active = active;
        }
    }

    /// Updates an entry's price. No-op if the item is unknown.
    pub fn set_price(&self, item: ItemRef, price: domain::Money) {
        if let Some(entry) = self.state.write().unwrap().items.get_mut(&item) {
            entry.price = price;
        }
    }

    /// Configures the catalog to fail lookups, for error-path tests.
    pub fn set_fail_on_lookup(&self, fail: bool) {
        self.state.write().unwrap().fail_on_lookup = fail;
    }
}

#[async_trait]
impl Catalog for InMemoryCatalog {
    async fn item(&self, item: ItemRef) -> Result<Option<CatalogItem>, CheckoutError> {
        let state = self.state.read().unwrap();
        if state.fail_on_lookup {
            return Err(CheckoutError::Catalog("lookup failed".to_string()));
        }
        Ok(state.items.get(&item).cloned())
    }
}
