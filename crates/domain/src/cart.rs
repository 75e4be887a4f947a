//! Carts as read at checkout time.
//!
//! Cart editing (add/remove/update lines) is an external collaborator;
//! checkout only needs to enumerate the lines and delete the cart once the
//! order exists.

use common::{CartId, CartLineId, CustomerId};
use serde::{Deserialize, Serialize};

use crate::catalog::ItemRef;

/// One line in a cart: a sellable item and a positive quantity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartLine {
    pub id: CartLineId,
    pub item: ItemRef,
    pub quantity: u32,
}

impl CartLine {
    /// Creates a cart line with a fresh line ID.
    pub fn new(item: ItemRef, quantity: u32) -> Self {
        Self {
            id: CartLineId::new(),
            item,
            quantity,
        }
    }
}

/// A customer's shopping cart. Ephemeral: deleted when checkout commits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cart {
    pub id: CartId,
    pub customer_id: CustomerId,
    pub lines: Vec<CartLine>,
}

impl Cart {
    /// Creates an empty cart for a customer.
    pub fn new(customer_id: CustomerId) -> Self {
        Self {
            id: CartId::new(),
            customer_id,
            lines: Vec::new(),
        }
    }

    /// Returns the lines selected for checkout. With `None`, the whole cart
    /// is selected; otherwise only the named lines, in cart order.
    pub fn selected_lines(&self, selected: Option<&[CartLineId]>) -> Vec<&CartLine> {
        match selected {
            None => self.lines.iter().collect(),
            Some(ids) => self
                .lines
                .iter()
                .filter(|line| ids.contains(&line.id))
                .collect(),
        }
    }
}
