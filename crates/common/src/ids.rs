//! Typed UUID identifiers shared across the workspace.
//!
//! Every entity gets its own newtype so an order ID can never be passed
//! where a cart ID is expected. All of them serialize transparently as
//! plain UUIDs.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Defines a UUID-backed identifier newtype with the standard conversions.
macro_rules! uuid_id {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            /// Creates a new random identifier.
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            /// Creates an identifier from an existing UUID.
            pub fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }

            /// Returns the underlying UUID.
            pub fn as_uuid(&self) -> Uuid {
                self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<Uuid> for $name {
            fn from(uuid: Uuid) -> Self {
                Self(uuid)
            }
        }

        impl From<$name> for Uuid {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

uuid_id! {
    /// Unique identifier for an order.
    OrderId
}

uuid_id! {
    /// Unique identifier for a customer.
    CustomerId
}

uuid_id! {
    /// Unique identifier for a shopping cart.
    CartId
}

uuid_id! {
    /// Unique identifier for a single line inside a cart.
    CartLineId
}

uuid_id! {
    /// Unique identifier for an independently stocked sellable unit
    /// (a product variant's counter, or a combo's limited-availability
    /// counter).
    StockUnitId
}

uuid_id! {
    /// Unique identifier for a product variant in the catalog.
    VariantId
}

uuid_id! {
    /// Unique identifier for a combo (bundle) in the catalog.
    ComboId
}

uuid_id! {
    /// Unique identifier for the person performing an operation
    /// (customer, staff, or admin).
    ActorId
}
