//! Stock maintenance endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::HeaderMap;
use common::StockUnitId;
use domain::{InventoryAction, InventoryAuditEntry, StockUnit};
use serde::{Deserialize, Serialize};
use store::Store;

use crate::error::ApiError;
use crate::routes::actor_from_headers;
use crate::routes::orders::AppState;

// -- Request types --

#[derive(Deserialize)]
pub struct CreateUnitBody {
    pub available: u32,
}

#[derive(Deserialize)]
pub struct AdjustBody {
    pub delta: i64,
    /// One of `Import`, `Export`, `Adjust`, `Return`, `Damaged`.
    pub action: String,
    pub reason: Option<String>,
}

// -- Response types --

#[derive(Serialize)]
pub struct StockUnitResponse {
    pub id: String,
    pub available: u32,
    pub version: i64,
}

#[derive(Serialize)]
pub struct InventoryEntryResponse {
    pub action: String,
    pub delta: i64,
    pub quantity_before: u32,
    pub quantity_after: u32,
    pub reason: Option<String>,
    pub order_id: Option<String>,
    pub recorded_at: String,
}

impl From<&StockUnit> for StockUnitResponse {
    fn from(unit: &StockUnit) -> Self {
        Self {
            id: unit.id.to_string(),
            available: unit.available,
            version: unit.version.as_i64(),
        }
    }
}

impl From<&InventoryAuditEntry> for InventoryEntryResponse {
    fn from(entry: &InventoryAuditEntry) -> Self {
        Self {
            action: entry.action.to_string(),
            delta: entry.delta,
            quantity_before: entry.quantity_before,
            quantity_after: entry.quantity_after,
            reason: entry.reason.clone(),
            order_id: entry.order_id.map(|id| id.to_string()),
            recorded_at: entry.recorded_at.to_rfc3339(),
        }
    }
}

// -- Handlers --

/// POST /stock — staff create a stock unit.
#[tracing::instrument(skip(state, headers, body))]
pub async fn create<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    headers: HeaderMap,
    Json(body): Json<CreateUnitBody>,
) -> Result<(axum::http::StatusCode, Json<StockUnitResponse>), ApiError> {
    let actor = actor_from_headers(&headers)?;
    let unit = state.stock.create_unit(&actor, body.available).await?;
    Ok((
        axum::http::StatusCode::CREATED,
        Json(StockUnitResponse::from(&unit)),
    ))
}

/// GET /stock/:id — current quantity and version token.
#[tracing::instrument(skip(state))]
pub async fn get<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
) -> Result<Json<StockUnitResponse>, ApiError> {
    let unit_id = parse_unit_id(&id)?;
    let unit = state
        .stock
        .stock_unit(unit_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Stock unit {id} not found")))?;
    Ok(Json(StockUnitResponse::from(&unit)))
}

/// POST /stock/:id/adjust — staff apply a signed manual adjustment.
#[tracing::instrument(skip(state, headers, body))]
pub async fn adjust<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(body): Json<AdjustBody>,
) -> Result<Json<InventoryEntryResponse>, ApiError> {
    let actor = actor_from_headers(&headers)?;
    let action = body
        .action
        .parse::<InventoryAction>()
        .map_err(ApiError::BadRequest)?;

    let entry = state
        .stock
        .adjust(&actor, parse_unit_id(&id)?, body.delta, action, body.reason)
        .await?;
    Ok(Json(InventoryEntryResponse::from(&entry)))
}

/// GET /stock/:id/audit — a unit's mutation history, newest first.
#[tracing::instrument(skip(state))]
pub async fn audit<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
) -> Result<Json<Vec<InventoryEntryResponse>>, ApiError> {
    let entries = state.stock.history(parse_unit_id(&id)?).await?;
    Ok(Json(entries.iter().map(InventoryEntryResponse::from).collect()))
}

fn parse_unit_id(id: &str) -> Result<StockUnitId, ApiError> {
    let uuid = uuid::Uuid::parse_str(id)
        .map_err(|e| ApiError::BadRequest(format!("Invalid ID format: {e}")))?;
    Ok(StockUnitId::from_uuid(uuid))
}
