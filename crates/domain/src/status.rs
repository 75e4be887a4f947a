//! Order status state machine.

use serde::{Deserialize, Serialize};

/// The status of an order in its post-purchase lifecycle.
///
/// Status transitions:
/// ```text
/// Pending ──► Confirmed ──► Shipped ──► Completed
///    │  ▲        │  ▲
///    │  └────────┼──┴─◄── CancelRequested
///    │           │              │
///    └───────────┴──────────────┴──► Cancelled
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum OrderStatus {
    /// Order placed by the customer, awaiting staff confirmation.
    #[default]
    Pending,

    /// Confirmed by staff, awaiting shipment.
    Confirmed,

    /// Handed to the carrier.
    Shipped,

    /// Customer confirmed receipt (terminal state).
    Completed,

    /// Customer asked to cancel, awaiting staff decision.
    CancelRequested,

    /// Order was cancelled (terminal state).
    Cancelled,
}

impl OrderStatus {
    /// All statuses, for exhaustive table checks.
    pub const ALL: [OrderStatus; 6] = [
        OrderStatus::Pending,
        OrderStatus::Confirmed,
        OrderStatus::Shipped,
        OrderStatus::Completed,
        OrderStatus::CancelRequested,
        OrderStatus::Cancelled,
    ];

    /// Returns true if the transition from `self` to `target` is legal.
    ///
    /// This is the single source of truth for the order workflow; any pair
    /// not listed here is illegal.
    pub fn can_transition_to(&self, target: OrderStatus) -> bool {
        use OrderStatus::*;
        matches!(
            (self, target),
            (Pending, Confirmed)
                | (Pending, Cancelled)
                | (Pending, CancelRequested)
                | (Confirmed, Shipped)
                | (Confirmed, Cancelled)
                | (Confirmed, CancelRequested)
                | (Shipped, Completed)
                | (CancelRequested, Cancelled)
                | (CancelRequested, Pending)
                | (CancelRequested, Confirmed)
        )
    }

    /// Returns true if the owning customer may request a cancellation in
    /// this status.
    pub fn customer_can_cancel(&self) -> bool {
        matches!(self, OrderStatus::Pending | OrderStatus::Confirmed)
    }

    /// Returns true if this is a terminal status (no further transitions).
    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Completed | OrderStatus::Cancelled)
    }

    /// Statuses an admin workflow screen may offer next from this one.
    pub fn admin_next(&self) -> &'static [OrderStatus] {
        match self {
            OrderStatus::Pending => &[OrderStatus::Confirmed, OrderStatus::Cancelled],
            OrderStatus::Confirmed => &[OrderStatus::Shipped, OrderStatus::Cancelled],
            OrderStatus::Shipped => &[OrderStatus::Completed],
            OrderStatus::CancelRequested => &[OrderStatus::Cancelled, OrderStatus::Confirmed],
            OrderStatus::Completed | OrderStatus::Cancelled => &[],
        }
    }

    /// Returns the status name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "Pending",
            OrderStatus::Confirmed => "Confirmed",
            OrderStatus::Shipped => "Shipped",
            OrderStatus::Completed => "Completed",
            OrderStatus::CancelRequested => "CancelRequested",
            OrderStatus::Cancelled => "Cancelled",
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for OrderStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Pending" => Ok(OrderStatus::Pending),
            "Confirmed" => Ok(OrderStatus::Confirmed),
            "Shipped" => Ok(OrderStatus::Shipped),
            "Completed" => Ok(OrderStatus::Completed),
            "CancelRequested" => Ok(OrderStatus::CancelRequested),
            "Cancelled" => Ok(OrderStatus::Cancelled),
            other => Err(format!("unknown order status: {other}")),
        }
    }
}
