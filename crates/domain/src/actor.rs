//! Actors and their roles.
//!
//! Identity resolution happens outside this core; callers supply the actor
//! making the request and the role they hold.

use common::ActorId;
use serde::{Deserialize, Serialize};

/// Role held by the actor performing an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    Customer,
    Staff,
    Admin,
}

impl Role {
    /// Returns true for roles allowed to run the staff-gated workflow
    /// operations (confirm, ship, cancel decisions).
    pub fn is_staff(&self) -> bool {
        matches!(self, Role::Staff | Role::Admin)
    }

    /// Returns the role name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Customer => "Customer",
            Role::Staff => "Staff",
            Role::Admin => "Admin",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Customer" => Ok(Role::Customer),
            "Staff" => Ok(Role::Staff),
            "Admin" => Ok(Role::Admin),
            other => Err(format!("unknown role: {other}")),
        }
    }
}

/// The person making a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub id: ActorId,
    pub role: Role,
}

impl Actor {
    /// Creates a customer actor.
    pub fn customer(id: ActorId) -> Self {
        Self {
            id,
            role: Role::Customer,
        }
    }

    /// Creates a staff actor.
    pub fn staff(id: ActorId) -> Self {
        Self {
            id,
            role: Role::Staff,
        }
    }

    /// Creates an admin actor.
    pub fn admin(id: ActorId) -> Self {
        Self {
            id,
            role: Role::Admin,
        }
    }

    /// Returns true if this actor may run staff-gated operations.
    pub fn is_staff(&self) -> bool {
        self.role.is_staff()
    }
}
