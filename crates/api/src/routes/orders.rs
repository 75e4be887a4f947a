//! Checkout and order workflow endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::HeaderMap;
use common::{CartId, CartLineId, CustomerId, OrderId};
use domain::{Order, OrderAuditEntry, PayMethod, Recipient};
use fulfillment::{
    CheckoutCoordinator, CheckoutRequest, InMemoryCatalog, OrderWorkflowService, StockService,
};
use serde::{Deserialize, Serialize};
use store::Store;

use crate::error::ApiError;
use crate::routes::actor_from_headers;

/// Shared application state accessible from all handlers.
pub struct AppState<S: Store> {
    pub checkout: CheckoutCoordinator<S, InMemoryCatalog>,
    pub workflow: OrderWorkflowService<S>,
    pub stock: StockService<S>,
    pub catalog: InMemoryCatalog,
    pub store: S,
}

// -- Request types --

#[derive(Deserialize)]
pub struct RecipientRequest {
    pub name: String,
    pub phone_number: String,
    pub address: String,
    pub note: Option<String>,
}

#[derive(Deserialize)]
pub struct CheckoutBody {
    pub cart_id: uuid::Uuid,
    pub selected_lines: Option<Vec<uuid::Uuid>>,
    /// Unrecognized or missing values fall back to cash.
    pub pay_method: Option<String>,
    pub recipient: RecipientRequest,
}

#[derive(Deserialize, Default)]
pub struct ReasonBody {
    pub reason: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ListParams {
    /// Staff only: list another customer's orders.
    pub customer_id: Option<uuid::Uuid>,
}

// -- Response types --

#[derive(Serialize)]
pub struct OrderLineResponse {
    pub kind: String,
    pub name: String,
    pub unit_price_cents: i64,
    pub quantity: u32,
}

#[derive(Serialize)]
pub struct OrderResponse {
    pub id: String,
    pub customer_id: String,
    pub status: String,
    pub pay_method: String,
    pub total_cents: i64,
    pub cancel_reason: Option<String>,
    pub lines: Vec<OrderLineResponse>,
    pub created_at: String,
}

#[derive(Serialize)]
pub struct AuditEntryResponse {
    pub old_status: String,
    pub new_status: String,
    pub actor_role: String,
    pub reason: Option<String>,
    pub changed_at: String,
}

impl From<&Order> for OrderResponse {
    fn from(order: &Order) -> Self {
        Self {
            id: order.id().to_string(),
            customer_id: order.customer_id().to_string(),
            status: order.status().to_string(),
            pay_method: order.pay_method().to_string(),
            total_cents: order.total_amount().cents(),
            cancel_reason: order.cancel_reason().map(str::to_string),
            lines: order
                .lines()
                .iter()
                .map(|line| OrderLineResponse {
                    kind: line.item.kind().to_string(),
                    name: line.name.clone(),
                    unit_price_cents: line.unit_price.cents(),
                    quantity: line.quantity,
                })
                .collect(),
            created_at: order.created_at().to_rfc3339(),
        }
    }
}

impl From<&OrderAuditEntry> for AuditEntryResponse {
    fn from(entry: &OrderAuditEntry) -> Self {
        Self {
            old_status: entry.old_status.to_string(),
            new_status: entry.new_status.to_string(),
            actor_role: entry.actor_role.to_string(),
            reason: entry.reason.clone(),
            changed_at: entry.changed_at.to_rfc3339(),
        }
    }
}

// -- Handlers --

/// POST /checkout — turn a cart into an order.
#[tracing::instrument(skip(state, headers, body))]
pub async fn checkout<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    headers: HeaderMap,
    Json(body): Json<CheckoutBody>,
) -> Result<(axum::http::StatusCode, Json<OrderResponse>), ApiError> {
    let actor = actor_from_headers(&headers)?;

    let request = CheckoutRequest {
        cart_id: CartId::from_uuid(body.cart_id),
        selected_lines: body
            .selected_lines
            .map(|ids| ids.into_iter().map(CartLineId::from_uuid).collect()),
        pay_method: body
            .pay_method
            .and_then(|p| p.parse::<PayMethod>().ok())
            .unwrap_or_default(),
        recipient: Recipient {
            name: body.recipient.name,
            phone_number: body.recipient.phone_number,
            address: body.recipient.address,
            note: body.recipient.note,
        },
    };

    let order = state.checkout.checkout(&actor, request).await?;
    Ok((
        axum::http::StatusCode::CREATED,
        Json(OrderResponse::from(&order)),
    ))
}

/// GET /orders/:id — load one order. Customers only see their own.
#[tracing::instrument(skip(state, headers))]
pub async fn get<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<OrderResponse>, ApiError> {
    let actor = actor_from_headers(&headers)?;
    let order = state.workflow.order(&actor, parse_order_id(&id)?).await?;
    Ok(Json(OrderResponse::from(&order)))
}

/// GET /orders — list the caller's orders, or any customer's for staff.
#[tracing::instrument(skip(state, headers))]
pub async fn list<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    headers: HeaderMap,
    Query(params): Query<ListParams>,
) -> Result<Json<Vec<OrderResponse>>, ApiError> {
    let actor = actor_from_headers(&headers)?;

    let orders = match params.customer_id {
        Some(customer) if actor.is_staff() => state
            .store
            .orders_by_customer(CustomerId::from_uuid(customer))
            .await
            .map_err(|e| ApiError::Internal(e.to_string()))?,
        Some(_) => return Err(ApiError::BadRequest(
            "Only staff can list another customer's orders".to_string(),
        )),
        None => state.workflow.my_orders(&actor).await?,
    };

    Ok(Json(orders.iter().map(OrderResponse::from).collect()))
}

/// GET /orders/cancel-requests — orders awaiting a cancellation decision.
#[tracing::instrument(skip(state, headers))]
pub async fn cancel_requests<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    headers: HeaderMap,
) -> Result<Json<Vec<OrderResponse>>, ApiError> {
    let actor = actor_from_headers(&headers)?;
    let orders = state.workflow.cancel_requests(&actor).await?;
    Ok(Json(orders.iter().map(OrderResponse::from).collect()))
}

/// GET /orders/:id/audit — an order's transition history, oldest first.
#[tracing::instrument(skip(state, headers))]
pub async fn audit<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<Vec<AuditEntryResponse>>, ApiError> {
    let actor = actor_from_headers(&headers)?;
    let entries = state.workflow.audit(&actor, parse_order_id(&id)?).await?;
    Ok(Json(entries.iter().map(AuditEntryResponse::from).collect()))
}

/// POST /orders/:id/confirm — staff confirm a pending order.
#[tracing::instrument(skip(state, headers))]
pub async fn confirm<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<OrderResponse>, ApiError> {
    let actor = actor_from_headers(&headers)?;
    let order = state.workflow.confirm(&actor, parse_order_id(&id)?).await?;
    Ok(Json(OrderResponse::from(&order)))
}

/// POST /orders/:id/ship — staff mark an order shipped.
#[tracing::instrument(skip(state, headers))]
pub async fn ship<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<OrderResponse>, ApiError> {
    let actor = actor_from_headers(&headers)?;
    let order = state
        .workflow
        .mark_shipped(&actor, parse_order_id(&id)?)
        .await?;
    Ok(Json(OrderResponse::from(&order)))
}

/// POST /orders/:id/complete — customer confirm receipt.
#[tracing::instrument(skip(state, headers))]
pub async fn complete<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<OrderResponse>, ApiError> {
    let actor = actor_from_headers(&headers)?;
    let order = state
        .workflow
        .mark_completed(&actor, parse_order_id(&id)?)
        .await?;
    Ok(Json(OrderResponse::from(&order)))
}

/// POST /orders/:id/cancel-request — customer ask to cancel.
#[tracing::instrument(skip(state, headers, body))]
pub async fn request_cancel<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    headers: HeaderMap,
    Path(id): Path<String>,
    body: Option<Json<ReasonBody>>,
) -> Result<Json<OrderResponse>, ApiError> {
    let actor = actor_from_headers(&headers)?;
    let reason = body.and_then(|Json(b)| b.reason);
    let order = state
        .workflow
        .request_cancel(&actor, parse_order_id(&id)?, reason)
        .await?;
    Ok(Json(OrderResponse::from(&order)))
}

/// POST /orders/:id/cancel — staff cancel outright.
#[tracing::instrument(skip(state, headers, body))]
pub async fn cancel<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    headers: HeaderMap,
    Path(id): Path<String>,
    body: Option<Json<ReasonBody>>,
) -> Result<Json<OrderResponse>, ApiError> {
    let actor = actor_from_headers(&headers)?;
    let reason = body.and_then(|Json(b)| b.reason);
    let order = state
        .workflow
        .admin_cancel(&actor, parse_order_id(&id)?, reason)
        .await?;
    Ok(Json(OrderResponse::from(&order)))
}

/// POST /orders/:id/cancel/approve — staff approve a pending request.
#[tracing::instrument(skip(state, headers, body))]
pub async fn approve_cancel<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    headers: HeaderMap,
    Path(id): Path<String>,
    body: Option<Json<ReasonBody>>,
) -> Result<Json<OrderResponse>, ApiError> {
    let actor = actor_from_headers(&headers)?;
    let reason = body.and_then(|Json(b)| b.reason);
    let order = state
        .workflow
        .approve_cancel(&actor, parse_order_id(&id)?, reason)
        .await?;
    Ok(Json(OrderResponse::from(&order)))
}

/// POST /orders/:id/cancel/reject — staff reject a pending request.
#[tracing::instrument(skip(state, headers))]
pub async fn reject_cancel<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<OrderResponse>, ApiError> {
    let actor = actor_from_headers(&headers)?;
    let order = state
        .workflow
        .reject_cancel(&actor, parse_order_id(&id)?)
        .await?;
    Ok(Json(OrderResponse::from(&order)))
}

/// DELETE /orders/:id — admin retire (soft-delete) an order.
#[tracing::instrument(skip(state, headers))]
pub async fn retire<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<axum::http::StatusCode, ApiError> {
    let actor = actor_from_headers(&headers)?;
    state.workflow.retire(&actor, parse_order_id(&id)?).await?;
    Ok(axum::http::StatusCode::NO_CONTENT)
}

fn parse_order_id(id: &str) -> Result<OrderId, ApiError> {
    let uuid = uuid::Uuid::parse_str(id)
        .map_err(|e| ApiError::BadRequest(format!("Invalid ID format: {e}")))?;
    Ok(OrderId::from_uuid(uuid))
}
