//! Stock units and their optimistic-concurrency version tokens.

use common::StockUnitId;
use serde::{Deserialize, Serialize};

/// Monotonically increasing version token on a stock unit.
///
/// Every successful debit advances the version; a writer whose expected
/// version no longer matches knows another writer got there first.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(transparent)]
pub struct Version(i64);

impl Version {
    /// Creates a version from a raw value.
    pub fn new(value: i64) -> Self {
        Self(value)
    }

    /// Returns the initial version (0) for a newly created stock unit.
    pub fn initial() -> Self {
        Self(0)
    }

    /// Returns the next version.
    pub fn next(&self) -> Self {
        Self(self.0 + 1)
    }

    /// Returns the raw version value.
    pub fn as_i64(&self) -> i64 {
        self.0
    }
}

impl std::fmt::Display for Version {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The smallest independently stocked sellable entity: a product variant's
/// counter, or a combo's limited-availability counter.
///
/// Quantity is never negative. The only legal way to reduce it during
/// checkout is the store's conditional debit; manual corrections go through
/// the privileged adjustment path, and both write an inventory audit entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockUnit {
    pub id: StockUnitId,
    pub available: u32,
    pub version: Version,
}

impl StockUnit {
    /// Creates a stock unit with an initial quantity and version.
    pub fn new(id: StockUnitId, available: u32) -> Self {
        Self {
            id,
            available,
            version: Version::initial(),
        }
    }

    /// Returns true if the unit can cover a debit of `quantity`.
    pub fn can_cover(&self, quantity: u32) -> bool {
        self.available >= quantity
    }
}
