//! API error types with HTTP response mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use domain::OrderError;
use fulfillment::{CheckoutError, InventoryError, WorkflowError};
use store::StoreError;

/// API-level error type that maps to HTTP responses.
#[derive(Debug)]
pub enum ApiError {
    /// Resource not found.
    NotFound(String),
    /// Bad request from the client.
    BadRequest(String),
    /// Checkout failure.
    Checkout(CheckoutError),
    /// Order workflow failure.
    Workflow(WorkflowError),
    /// Stock maintenance failure.
    Inventory(InventoryError),
    /// Internal server error.
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Checkout(err) => checkout_error_to_response(err),
            ApiError::Workflow(err) => workflow_error_to_response(err),
            ApiError::Inventory(err) => inventory_error_to_response(err),
            ApiError::Internal(msg) => {
                tracing::error!(error = %msg, "internal server error");
                (StatusCode::INTERNAL_SERVER_ERROR, msg)
            }
        };

        let body = serde_json::json!({ "error": message });
        (status, axum::Json(body)).into_response()
    }
}

fn checkout_error_to_response(err: CheckoutError) -> (StatusCode, String) {
    match &err {
        CheckoutError::CartNotFound(_) => (StatusCode::NOT_FOUND, err.to_string()),
        CheckoutError::EmptyCart | CheckoutError::ItemUnavailable { .. } => {
            (StatusCode::BAD_REQUEST, err.to_string())
        }
        CheckoutError::InsufficientStock { .. } | CheckoutError::Contended { .. } => {
            (StatusCode::CONFLICT, err.to_string())
        }
        CheckoutError::Order(order_err) => match order_err {
            OrderError::IllegalTransition { .. } => (StatusCode::CONFLICT, err.to_string()),
            OrderError::EmptyOrder | OrderError::InvalidQuantity { .. } => {
                (StatusCode::BAD_REQUEST, err.to_string())
            }
        },
        CheckoutError::Store(store_err) => store_error_to_response(store_err),
        CheckoutError::Catalog(_) => (StatusCode::INTERNAL_SERVER_ERROR, err.to_string()),
    }
}

fn workflow_error_to_response(err: WorkflowError) -> (StatusCode, String) {
    match &err {
        WorkflowError::OrderNotFound(_) => (StatusCode::NOT_FOUND, err.to_string()),
        WorkflowError::Order(OrderError::IllegalTransition { .. })
        | WorkflowError::Conflict { .. } => (StatusCode::CONFLICT, err.to_string()),
        WorkflowError::Order(_) => (StatusCode::BAD_REQUEST, err.to_string()),
        WorkflowError::StaffOnly | WorkflowError::NotYourOrder => {
            (StatusCode::FORBIDDEN, err.to_string())
        }
        WorkflowError::Store(store_err) => store_error_to_response(store_err),
    }
}

fn inventory_error_to_response(err: InventoryError) -> (StatusCode, String) {
    match &err {
        InventoryError::StaffOnly => (StatusCode::FORBIDDEN, err.to_string()),
        InventoryError::Store(store_err) => store_error_to_response(store_err),
    }
}

fn store_error_to_response(err: &StoreError) -> (StatusCode, String) {
    match err {
        StoreError::CartNotFound(_)
        | StoreError::OrderNotFound(_)
        | StoreError::StockUnitNotFound(_) => (StatusCode::NOT_FOUND, err.to_string()),
        StoreError::InsufficientStock { .. }
        | StoreError::VersionConflict { .. }
        | StoreError::StatusConflict { .. } => (StatusCode::CONFLICT, err.to_string()),
        StoreError::Database(_) | StoreError::Migration(_) | StoreError::Serialization(_) => {
            tracing::error!(error = %err, "storage error");
            (StatusCode::INTERNAL_SERVER_ERROR, err.to_string())
        }
    }
}

impl From<CheckoutError> for ApiError {
    fn from(err: CheckoutError) -> Self {
        ApiError::Checkout(err)
    }
}

impl From<WorkflowError> for ApiError {
    fn from(err: WorkflowError) -> Self {
        ApiError::Workflow(err)
    }
}

impl From<InventoryError> for ApiError {
    fn from(err: InventoryError) -> Self {
        ApiError::Inventory(err)
    }
}
