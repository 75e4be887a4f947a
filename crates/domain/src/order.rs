//! Order aggregate with frozen line prices and lifecycle timestamps.

use chrono::{DateTime, Utc};
use common::{CustomerId, OrderId};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::catalog::ItemRef;
use crate::money::Money;
use crate::status::OrderStatus;

/// How the customer pays. Unrecognized input defaults to `Cash` at the
/// API edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum PayMethod {
    #[default]
    Cash,
    CreditCard,
    DebitCard,
    MobilePayment,
}

impl PayMethod {
    /// Returns the payment method name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            PayMethod::Cash => "Cash",
            PayMethod::CreditCard => "CreditCard",
            PayMethod::DebitCard => "DebitCard",
            PayMethod::MobilePayment => "MobilePayment",
        }
    }
}

impl std::fmt::Display for PayMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for PayMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Cash" => Ok(PayMethod::Cash),
            "CreditCard" => Ok(PayMethod::CreditCard),
            "DebitCard" => Ok(PayMethod::DebitCard),
            "MobilePayment" => Ok(PayMethod::MobilePayment),
            other => Err(format!("unknown pay method: {other}")),
        }
    }
}

/// Delivery information captured at checkout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recipient {
    pub name: String,
    pub phone_number: String,
    pub address: String,
    pub note: Option<String>,
}

/// One line of an order: a frozen copy of the item's name, unit price and
/// quantity at the time of purchase. Never recomputed from live catalog
/// prices.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderLine {
    pub item: ItemRef,
    pub name: String,
    pub unit_price: Money,
    pub quantity: u32,
}

impl OrderLine {
    /// Creates a frozen order line.
    pub fn new(item: ItemRef, name: impl Into<String>, unit_price: Money, quantity: u32) -> Self {
        Self {
            item,
            name: name.into(),
            unit_price,
            quantity,
        }
    }

    /// The frozen line total: unit price times quantity.
    pub fn line_total(&self) -> Money {
        self.unit_price.multiply(self.quantity)
    }
}

/// Errors raised by the order aggregate itself.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum OrderError {
    /// An order needs at least one line.
    #[error("Order has no lines")]
    EmptyOrder,

    /// Line quantities must be positive.
    #[error("Invalid quantity: {quantity} (must be greater than 0)")]
    InvalidQuantity { quantity: u32 },

    /// The requested status change violates the transition table.
    #[error("Illegal transition: {from} -> {to}")]
    IllegalTransition { from: OrderStatus, to: OrderStatus },
}

/// Order aggregate root.
///
/// Created atomically by the checkout coordinator and mutated only through
/// the workflow service. Owns its lines by value; lines refer back to the
/// catalog by ID only, so later catalog edits can never reach into a
/// placed order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    id: OrderId,
    customer_id: CustomerId,
    pay_method: PayMethod,
    recipient: Recipient,
    lines: Vec<OrderLine>,
    total_amount: Money,
    status: OrderStatus,
    cancel_reason: Option<String>,
    created_at: DateTime<Utc>,
    confirmed_at: Option<DateTime<Utc>>,
    shipped_at: Option<DateTime<Utc>>,
    completed_at: Option<DateTime<Utc>>,
    cancelled_at: Option<DateTime<Utc>>,
    retired: bool,
}

impl Order {
    /// Places a new order in `Pending` with frozen lines and a computed
    /// total.
    pub fn place(
        customer_id: CustomerId,
        pay_method: PayMethod,
        recipient: Recipient,
        lines: Vec<OrderLine>,
        now: DateTime<Utc>,
    ) -> Result<Self, OrderError> {
        if lines.is_empty() {
            return Err(OrderError::EmptyOrder);
        }
        for line in &lines {
            if line.quantity == 0 {
                return Err(OrderError::InvalidQuantity { quantity: 0 });
            }
        }

        let total_amount = lines.iter().map(OrderLine::line_total).sum();

        Ok(Self {
            id: OrderId::new(),
            customer_id,
            pay_method,
            recipient,
            lines,
            total_amount,
            status: OrderStatus::Pending,
            cancel_reason: None,
            created_at: now,
            confirmed_at: None,
            shipped_at: None,
            completed_at: None,
            cancelled_at: None,
            retired: false,
        })
    }
}

// Query methods
impl Order {
    pub fn id(&self) -> OrderId {
        self.id
    }

    pub fn customer_id(&self) -> CustomerId {
        self.customer_id
    }

    pub fn pay_method(&self) -> PayMethod {
        self.pay_method
    }

    pub fn recipient(&self) -> &Recipient {
        &self.recipient
    }

    pub fn lines(&self) -> &[OrderLine] {
        &self.lines
    }

    /// The frozen total. Always equals the sum of the frozen line totals.
    pub fn total_amount(&self) -> Money {
        self.total_amount
    }

    pub fn status(&self) -> OrderStatus {
        self.status
    }

    pub fn cancel_reason(&self) -> Option<&str> {
        self.cancel_reason.as_deref()
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn confirmed_at(&self) -> Option<DateTime<Utc>> {
        self.confirmed_at
    }

    pub fn shipped_at(&self) -> Option<DateTime<Utc>> {
        self.shipped_at
    }

    pub fn completed_at(&self) -> Option<DateTime<Utc>> {
        self.completed_at
    }

    pub fn cancelled_at(&self) -> Option<DateTime<Utc>> {
        self.cancelled_at
    }

    /// Returns true if the order has been logically retired (soft-deleted).
    pub fn is_retired(&self) -> bool {
        self.retired
    }

    /// The status this order held before a cancellation request, inferred
    /// from which lifecycle timestamp was most recently set.
    pub fn revert_target(&self) -> OrderStatus {
        if self.shipped_at.is_some() {
            OrderStatus::Shipped
        } else if self.confirmed_at.is_some() {
            OrderStatus::Confirmed
        } else {
            OrderStatus::Pending
        }
    }
}

// Mutators. All status changes go through the transition table; callers
// receive an error and an untouched order on any violation.
impl Order {
    /// Moves the order to `target`, stamping the matching lifecycle
    /// timestamp. Returns the previous status.
    pub fn transition(
        &mut self,
        target: OrderStatus,
        now: DateTime<Utc>,
    ) -> Result<OrderStatus, OrderError> {
        if !self.status.can_transition_to(target) {
            return Err(OrderError::IllegalTransition {
                from: self.status,
                to: target,
            });
        }

        let old = self.status;
        self.status = target;
        match target {
            OrderStatus::Confirmed => self.confirmed_at = Some(now),
            OrderStatus::Shipped => self.shipped_at = Some(now),
            OrderStatus::Completed => self.completed_at = Some(now),
            OrderStatus::Cancelled => self.cancelled_at = Some(now),
            OrderStatus::Pending | OrderStatus::CancelRequested => {}
        }
        Ok(old)
    }

    /// Reverts a cancellation request to the status held before it,
    /// clearing the cancel reason and touching no timestamps. Fails if the
    /// order is not in `CancelRequested` or the table forbids the revert
    /// (a request taken after shipment cannot be reverted).
    pub fn revert_cancel_request(&mut self) -> Result<OrderStatus, OrderError> {
        let target = self.revert_target();
        if self.status != OrderStatus::CancelRequested || !self.status.can_transition_to(target) {
            return Err(OrderError::IllegalTransition {
                from: self.status,
                to: target,
            });
        }

        let old = self.status;
        self.status = target;
        self.cancel_reason = None;
        Ok(old)
    }

    /// Sets or clears the cancellation reason.
    pub fn set_cancel_reason(&mut self, reason: Option<String>) {
        self.cancel_reason = reason;
    }

    /// Logically retires the order. Retired orders are invisible to
    /// queries and workflow operations; nothing hard-deletes an order.
    pub fn retire(&mut self) {
        self.retired = true;
    }
}
