//! HTTP route handlers.

pub mod health;
pub mod metrics;
pub mod orders;
pub mod stock;

use axum::http::HeaderMap;
use common::ActorId;
use domain::{Actor, Role};

use crate::error::ApiError;

/// Resolves the requesting actor from the `x-actor-id` and `x-actor-role`
/// headers. Identity verification is an upstream concern (gateway or
/// session layer); these headers carry its result. A missing or
/// unrecognized role falls back to `Customer`.
pub fn actor_from_headers(headers: &HeaderMap) -> Result<Actor, ApiError> {
    let id = headers
        .get("x-actor-id")
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| ApiError::BadRequest("Missing x-actor-id header".to_string()))?;
    let id = uuid::Uuid::parse_str(id)
        .map_err(|e| ApiError::BadRequest(format!("Invalid x-actor-id: {e}")))?;

    let role = headers
        .get("x-actor-role")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<Role>().ok())
        .unwrap_or(Role::Customer);

    Ok(Actor {
        id: ActorId::from_uuid(id),
        role,
    })
}
