//! Checkout coordinator: cart in, order out, atomically.

use chrono::Utc;
use common::{CartId, CartLineId, StockUnitId};
use domain::{Actor, Order, OrderLine, PayMethod, Recipient};
use store::{CheckoutCommit, StockDebit, Store, StoreError};

use crate::catalog::Catalog;
use crate::error::CheckoutError;

/// Default number of attempts before giving up on a contended checkout.
const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// A checkout request as it arrives from the customer.
#[derive(Debug, Clone)]
pub struct CheckoutRequest {
    pub cart_id: CartId,
    /// Lines to buy; `None` means the whole cart.
    pub selected_lines: Option<Vec<CartLineId>>,
    pub pay_method: PayMethod,
    pub recipient: Recipient,
}

/// Turns a cart into an order through the store's checkout unit of work.
///
/// Each attempt reads the cart, freezes prices from the catalog, snapshots
/// the stock version tokens and asks the store to commit. A version
/// conflict means another checkout debited the same stock first; the
/// coordinator rereads and retries up to its attempt limit. All other
/// errors are final.
pub struct CheckoutCoordinator<S, C>
where
    S: Store,
    C: Catalog,
{
    store: S,
    catalog: C,
    max_attempts: u32,
}

impl<S, C> CheckoutCoordinator<S, C>
where
    S: Store,
    C: Catalog,
{
    /// Creates a coordinator with the default attempt limit.
    pub fn new(store: S, catalog: C) -> Self {
        Self {
            store,
            catalog,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }

    /// Overrides the attempt limit.
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    /// Executes a checkout, retrying on stock contention.
    #[tracing::instrument(skip(self, actor, request), fields(cart_id = %request.cart_id))]
    pub async fn checkout(
        &self,
        actor: &Actor,
        request: CheckoutRequest,
    ) -> Result<Order, CheckoutError> {
        metrics::counter!("checkout_attempts_total").increment(1);
        let start = std::time::Instant::now();

        let mut attempt = 0;
        loop {
            attempt += 1;
            match self.try_checkout(actor, &request).await {
                Ok(order) => {
                    metrics::counter!("checkout_success_total").increment(1);
                    metrics::histogram!("checkout_duration_seconds")
                        .record(start.elapsed().as_secs_f64());
                    tracing::info!(
                        order_id = %order.id(),
                        total = %order.total_amount(),
                        attempt,
                        "checkout committed"
                    );
                    return Ok(order);
                }
                Err(CheckoutError::Store(StoreError::VersionConflict {
                    stock_unit_id, ..
                })) if attempt < self.max_attempts => {
                    metrics::counter!("checkout_retries_total").increment(1);
                    tracing::debug!(%stock_unit_id, attempt, "stock version moved, retrying");
                }
                Err(CheckoutError::Store(StoreError::VersionConflict { .. })) => {
                    metrics::counter!("checkout_contended_total").increment(1);
                    return Err(CheckoutError::Contended { attempts: attempt });
                }
                Err(err) => return Err(err),
            }
        }
    }

    /// One checkout attempt against a fresh read of cart, catalog and stock.
    async fn try_checkout(
        &self,
        actor: &Actor,
        request: &CheckoutRequest,
    ) -> Result<Order, CheckoutError> {
        let cart = self
            .store
            .cart(request.cart_id)
            .await?
            .ok_or(CheckoutError::CartNotFound(request.cart_id))?;

        let lines = cart.selected_lines(request.selected_lines.as_deref());
        if lines.is_empty() {
            return Err(CheckoutError::EmptyCart);
        }

        let now = Utc::now();
        let mut order_lines = Vec::with_capacity(lines.len());
        let mut debits: Vec<StockDebit> = Vec::new();
        let mut unit_names: Vec<(StockUnitId, String)> = Vec::new();

        for line in &lines {
            let item = self
                .catalog
                .item(line.item)
                .await?
                .filter(|entry| entry.is_available_at(now))
                .ok_or(CheckoutError::ItemUnavailable { item: line.item })?;

            // Unlimited items carry no stock unit and debit nothing.
            if let Some(unit_id) = item.stock_unit {
                let unit = self
                    .store
                    .stock_unit(unit_id)
                    .await?
                    .ok_or(StoreError::StockUnitNotFound(unit_id))?;

                // Two lines may share a stock unit (a variant and a combo
                // built on it); coalesce into one debit so the version
                // token is only checked once.
                let existing = debits.iter_mut().find(|d| d.stock_unit_id == unit_id);
                let requested = match existing {
                    Some(debit) => {
                        debit.quantity += line.quantity;
                        debit.quantity
                    }
                    None => {
                        debits.push(StockDebit {
                            stock_unit_id: unit_id,
                            quantity: line.quantity,
                            expected_version: unit.version,
                        });
                        unit_names.push((unit_id, item.name.clone()));
                        line.quantity
                    }
                };
                if !unit.can_cover(requested) {
                    return Err(CheckoutError::InsufficientStock {
                        name: item.name.clone(),
                        requested,
                        available: unit.available,
                    });
                }
            }

            order_lines.push(OrderLine::new(
                line.item,
                item.name,
                item.price,
                line.quantity,
            ));
        }

        let order = Order::place(
            cart.customer_id,
            request.pay_method,
            request.recipient.clone(),
            order_lines,
            now,
        )?;

        let commit = CheckoutCommit {
            order: order.clone(),
            cart_id: cart.id,
            debits,
            actor_id: Some(actor.id),
        };

        match self.store.commit_checkout(commit).await {
            Ok(()) => Ok(order),
            // Lost the race between the pre-check and the commit; report
            // with the item name the customer saw.
            Err(StoreError::InsufficientStock {
                stock_unit_id,
                requested,
                available,
            }) => {
                let name = unit_names
                    .into_iter()
                    .find(|(id, _)| *id == stock_unit_id)
                    .map(|(_, name)| name)
                    .unwrap_or_else(|| stock_unit_id.to_string());
                Err(CheckoutError::InsufficientStock {
                    name,
                    requested,
                    available,
                })
            }
            Err(err) => Err(err.into()),
        }
    }
}
