//! Post-purchase order workflow: status transitions, role checks, audit.

use chrono::Utc;
use common::OrderId;
use domain::{Actor, Order, OrderAuditEntry, OrderStatus};
use store::Store;

use crate::error::WorkflowError;

// Default reasons recorded on the audit trail when the caller gives none.
const REASON_CONFIRMED: &str = "order confirmed";
const REASON_SHIPPED: &str = "order shipped";
const REASON_COMPLETED: &str = "order received";
const REASON_CANCELLED_BY_STAFF: &str = "cancelled by staff";
const REASON_CANCEL_APPROVED: &str = "cancellation approved";
const REASON_CANCEL_REJECTED: &str = "cancellation rejected";

/// Drives the order status machine.
///
/// Every mutation validates the transition on a fresh copy of the order,
/// then asks the store to persist the new status together with its audit
/// entry in one unit; a concurrent writer surfaces as a conflict, never as
/// a double transition.
pub struct OrderWorkflowService<S: Store> {
    store: S,
}

impl<S: Store> OrderWorkflowService<S> {
    /// Creates a new workflow service.
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Loads an order, enforcing that customers only see their own.
    pub async fn order(&self, actor: &Actor, order_id: OrderId) -> Result<Order, WorkflowError> {
        let order = self.load(order_id).await?;
        if !actor.is_staff() && !owns(actor, &order) {
            return Err(WorkflowError::NotYourOrder);
        }
        Ok(order)
    }

    /// Lists the actor's own orders, newest first.
    pub async fn my_orders(&self, actor: &Actor) -> Result<Vec<Order>, WorkflowError> {
        let customer = common::CustomerId::from_uuid(actor.id.as_uuid());
        Ok(self.store.orders_by_customer(customer).await?)
    }

    /// Lists orders awaiting a cancellation decision. Staff see all of
    /// them; customers only their own.
    pub async fn cancel_requests(&self, actor: &Actor) -> Result<Vec<Order>, WorkflowError> {
        if actor.is_staff() {
            Ok(self.store.cancel_requests().await?)
        } else {
            let customer = common::CustomerId::from_uuid(actor.id.as_uuid());
            Ok(self.store.cancel_requests_for_customer(customer).await?)
        }
    }

    /// Returns an order's full transition history, oldest first.
    pub async fn audit(
        &self,
        actor: &Actor,
        order_id: OrderId,
    ) -> Result<Vec<OrderAuditEntry>, WorkflowError> {
        // Ownership check rides on the order load.
        self.order(actor, order_id).await?;
        Ok(self.store.order_audit(order_id).await?)
    }

    /// Staff: confirm a pending order.
    #[tracing::instrument(skip(self, actor))]
    pub async fn confirm(&self, actor: &Actor, order_id: OrderId) -> Result<Order, WorkflowError> {
        self.require_staff(actor)?;
        let order = self.load(order_id).await?;
        self.apply(order, actor, OrderStatus::Confirmed, reason(REASON_CONFIRMED))
            .await
    }

    /// Staff: mark a confirmed order as handed to the carrier.
    #[tracing::instrument(skip(self, actor))]
    pub async fn mark_shipped(
        &self,
        actor: &Actor,
        order_id: OrderId,
    ) -> Result<Order, WorkflowError> {
        self.require_staff(actor)?;
        let order = self.load(order_id).await?;
        self.apply(order, actor, OrderStatus::Shipped, reason(REASON_SHIPPED))
            .await
    }

    /// Customer: confirm receipt of a shipped order.
    #[tracing::instrument(skip(self, actor))]
    pub async fn mark_completed(
        &self,
        actor: &Actor,
        order_id: OrderId,
    ) -> Result<Order, WorkflowError> {
        let order = self.load(order_id).await?;
        if !owns(actor, &order) {
            return Err(WorkflowError::NotYourOrder);
        }
        self.apply(order, actor, OrderStatus::Completed, reason(REASON_COMPLETED))
            .await
    }

    /// Customer: ask to cancel an order that has not shipped yet.
    #[tracing::instrument(skip(self, actor, cancel_reason))]
    pub async fn request_cancel(
        &self,
        actor: &Actor,
        order_id: OrderId,
        cancel_reason: Option<String>,
    ) -> Result<Order, WorkflowError> {
        let mut order = self.load(order_id).await?;
        if !owns(actor, &order) {
            return Err(WorkflowError::NotYourOrder);
        }
        order.set_cancel_reason(cancel_reason.clone());
        self.apply(order, actor, OrderStatus::CancelRequested, cancel_reason)
            .await
    }

    /// Staff: cancel an order outright, skipping the request step.
    #[tracing::instrument(skip(self, actor, cancel_reason))]
    pub async fn admin_cancel(
        &self,
        actor: &Actor,
        order_id: OrderId,
        cancel_reason: Option<String>,
    ) -> Result<Order, WorkflowError> {
        self.require_staff(actor)?;
        let mut order = self.load(order_id).await?;
        let cancel_reason =
            Some(cancel_reason.unwrap_or_else(|| REASON_CANCELLED_BY_STAFF.to_string()));
        order.set_cancel_reason(cancel_reason.clone());
        self.apply(order, actor, OrderStatus::Cancelled, cancel_reason)
            .await
    }

    /// Staff: approve a pending cancellation request. With no reason given,
    /// the customer's original reason stands.
    #[tracing::instrument(skip(self, actor, cancel_reason))]
    pub async fn approve_cancel(
        &self,
        actor: &Actor,
        order_id: OrderId,
        cancel_reason: Option<String>,
    ) -> Result<Order, WorkflowError> {
        self.require_staff(actor)?;
        let mut order = self.load(order_id).await?;
        // Approval only acts on an open request; a live order must go
        // through admin_cancel instead.
        if order.status() != OrderStatus::CancelRequested {
            return Err(domain::OrderError::IllegalTransition {
                from: order.status(),
                to: OrderStatus::Cancelled,
            }
            .into());
        }
        let cancel_reason = Some(
            cancel_reason
                .or_else(|| order.cancel_reason().map(str::to_string))
                .unwrap_or_else(|| REASON_CANCEL_APPROVED.to_string()),
        );
        order.set_cancel_reason(cancel_reason.clone());
        self.apply(order, actor, OrderStatus::Cancelled, cancel_reason)
            .await
    }

    /// Staff: reject a pending cancellation request, returning the order to
    /// the status it held before the request. Requests taken after shipment
    /// cannot be rejected back.
    #[tracing::instrument(skip(self, actor))]
    pub async fn reject_cancel(
        &self,
        actor: &Actor,
        order_id: OrderId,
    ) -> Result<Order, WorkflowError> {
        self.require_staff(actor)?;
        let mut order = self.load(order_id).await?;

        let old = order.revert_cancel_request()?;
        let entry = OrderAuditEntry::record(
            order.id(),
            old,
            order.status(),
            Some(actor.id),
            actor.role,
            reason(REASON_CANCEL_REJECTED),
        );
        self.store.commit_transition(&order, &entry).await?;
        self.record_transition(&order, old);
        Ok(order)
    }

    /// Admin: retire (soft-delete) an order. It disappears from every
    /// query; nothing is hard-deleted.
    #[tracing::instrument(skip(self, actor))]
    pub async fn retire(&self, actor: &Actor, order_id: OrderId) -> Result<(), WorkflowError> {
        if actor.role != domain::Role::Admin {
            return Err(WorkflowError::StaffOnly);
        }
        // Load first so retiring a missing order reports not-found.
        self.load(order_id).await?;
        self.store.retire_order(order_id).await?;
        tracing::info!(%order_id, "order retired");
        Ok(())
    }

    async fn load(&self, order_id: OrderId) -> Result<Order, WorkflowError> {
        self.store
            .order(order_id)
            .await?
            .ok_or(WorkflowError::OrderNotFound(order_id))
    }

    fn require_staff(&self, actor: &Actor) -> Result<(), WorkflowError> {
        if actor.is_staff() {
            Ok(())
        } else {
            Err(WorkflowError::StaffOnly)
        }
    }

    /// Validates the transition on the aggregate, then persists it with its
    /// audit entry as one unit.
    async fn apply(
        &self,
        mut order: Order,
        actor: &Actor,
        target: OrderStatus,
        audit_reason: Option<String>,
    ) -> Result<Order, WorkflowError> {
        let old = order.transition(target, Utc::now())?;
        let entry = OrderAuditEntry::record(
            order.id(),
            old,
            target,
            Some(actor.id),
            actor.role,
            audit_reason,
        );
        self.store.commit_transition(&order, &entry).await?;
        self.record_transition(&order, old);
        Ok(order)
    }

    fn record_transition(&self, order: &Order, old: OrderStatus) {
        metrics::counter!("order_transitions_total", "to" => order.status().as_str())
            .increment(1);
        tracing::info!(
            order_id = %order.id(),
            from = %old,
            to = %order.status(),
            "order transition"
        );
    }
}

fn owns(actor: &Actor, order: &Order) -> bool {
    actor.id.as_uuid() == order.customer_id().as_uuid()
}

fn reason(text: &str) -> Option<String> {
    Some(text.to_string())
}
