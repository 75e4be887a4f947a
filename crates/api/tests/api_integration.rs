//! Integration tests for the API server.

use std::sync::{Arc, OnceLock};

use axum::body::Body;
use axum::http::{Request, StatusCode};
use common::{ActorId, CustomerId, StockUnitId, VariantId};
use domain::{Actor, Cart, CartLine, CatalogItem, ItemRef, Money, StockUnit};
use metrics_exporter_prometheus::PrometheusHandle;
use store::{InMemoryStore, Store};
use tower::ServiceExt;

use api::routes::orders::AppState;

static METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

fn get_metrics_handle() -> PrometheusHandle {
    METRICS_HANDLE
        .get_or_init(|| {
            let builder = metrics_exporter_prometheus::PrometheusBuilder::new();
            builder
                .install_recorder()
                .expect("failed to install Prometheus recorder")
        })
        .clone()
}

fn setup() -> (axum::Router, Arc<AppState<InMemoryStore>>) {
    let store = InMemoryStore::new();
    let state = api::create_default_state(store);
    let app = api::create_app(state.clone(), get_metrics_handle());
    (app, state)
}

/// Seeds one variant with stock and a one-line cart for a fresh customer.
async fn seed_cart(
    state: &AppState<InMemoryStore>,
    price: Money,
    available: u32,
    quantity: u32,
) -> (Cart, Actor) {
    let item = ItemRef::Variant(VariantId::new());
    let unit = StockUnit::new(StockUnitId::new(), available);
    state.store.insert_stock_unit(unit.clone()).await.unwrap();
    state.catalog.insert(CatalogItem {
        item,
        name: "Variant A".to_string(),
        price,
        active: true,
        available_from: None,
        available_until: None,
        stock_unit: Some(unit.id),
    });

    let customer = CustomerId::new();
    let mut cart = Cart::new(customer);
    cart.lines.push(CartLine::new(item, quantity));
    state.store.put_cart(cart.clone()).await.unwrap();

    let actor = Actor::customer(ActorId::from_uuid(customer.as_uuid()));
    (cart, actor)
}

fn request(method: &str, uri: &str, actor: Option<&Actor>, body: Option<serde_json::Value>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(actor) = actor {
        builder = builder
            .header("x-actor-id", actor.id.to_string())
            .header("x-actor-role", actor.role.as_str());
    }
    match body {
        Some(json) => builder
            .header("content-type", "application/json")
            .body(Body::from(serde_json::to_string(&json).unwrap()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

async fn json_body(response: axum::response::Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn checkout_body(cart: &Cart) -> serde_json::Value {
    serde_json::json!({
        "cart_id": cart.id.to_string(),
        "recipient": {
            "name": "An Nguyen",
            "phone_number": "0900000000",
            "address": "1 Main St"
        }
    })
}

#[tokio::test]
async fn test_health_check() {
    let (app, _) = setup();

    let response = app
        .oneshot(request("GET", "/health", None, None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = json_body(response).await;
    assert_eq!(json["status"], "ok");
}

#[tokio::test]
async fn test_checkout_and_get_order() {
    let (app, state) = setup();
    let (cart, actor) = seed_cart(&state, Money::from_dollars(10), 10, 2).await;

    let response = app
        .clone()
        .oneshot(request(
            "POST",
            "/checkout",
            Some(&actor),
            Some(checkout_body(&cart)),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CREATED);
    let json = json_body(response).await;
    assert_eq!(json["status"], "Pending");
    assert_eq!(json["total_cents"], 2000);
    assert_eq!(json["pay_method"], "Cash");
    let order_id = json["id"].as_str().unwrap().to_string();

    // Owner can read it back
    let response = app
        .clone()
        .oneshot(request(
            "GET",
            &format!("/orders/{order_id}"),
            Some(&actor),
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    // A stranger cannot
    let stranger = Actor::customer(ActorId::new());
    let response = app
        .oneshot(request(
            "GET",
            &format!("/orders/{order_id}"),
            Some(&stranger),
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_unknown_pay_method_falls_back_to_cash() {
    let (app, state) = setup();
    let (cart, actor) = seed_cart(&state, Money::from_dollars(10), 10, 1).await;

    let mut body = checkout_body(&cart);
    body["pay_method"] = serde_json::json!("Barter");

    let response = app
        .oneshot(request("POST", "/checkout", Some(&actor), Some(body)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let json = json_body(response).await;
    assert_eq!(json["pay_method"], "Cash");
}

#[tokio::test]
async fn test_insufficient_stock_is_a_conflict() {
    let (app, state) = setup();
    let (cart, actor) = seed_cart(&state, Money::from_dollars(10), 1, 5).await;

    let response = app
        .oneshot(request(
            "POST",
            "/checkout",
            Some(&actor),
            Some(checkout_body(&cart)),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);
    let json = json_body(response).await;
    assert!(json["error"].as_str().unwrap().contains("Insufficient"));
}

#[tokio::test]
async fn test_missing_actor_header_is_a_bad_request() {
    let (app, state) = setup();
    let (cart, _) = seed_cart(&state, Money::from_dollars(10), 10, 1).await;

    let response = app
        .oneshot(request("POST", "/checkout", None, Some(checkout_body(&cart))))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_workflow_over_http_respects_roles() {
    let (app, state) = setup();
    let (cart, owner) = seed_cart(&state, Money::from_dollars(10), 10, 1).await;
    let staff = Actor::staff(ActorId::new());

    let response = app
        .clone()
        .oneshot(request(
            "POST",
            "/checkout",
            Some(&owner),
            Some(checkout_body(&cart)),
        ))
        .await
        .unwrap();
    let order_id = json_body(response).await["id"].as_str().unwrap().to_string();

    // Customer may not confirm
    let response = app
        .clone()
        .oneshot(request(
            "POST",
            &format!("/orders/{order_id}/confirm"),
            Some(&owner),
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    // Staff confirm and ship
    for step in ["confirm", "ship"] {
        let response = app
            .clone()
            .oneshot(request(
                "POST",
                &format!("/orders/{order_id}/{step}"),
                Some(&staff),
                None,
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    // Owner completes
    let response = app
        .clone()
        .oneshot(request(
            "POST",
            &format!("/orders/{order_id}/complete"),
            Some(&owner),
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await["status"], "Completed");

    // Replaying the confirm now conflicts
    let response = app
        .oneshot(request(
            "POST",
            &format!("/orders/{order_id}/confirm"),
            Some(&staff),
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_cancel_request_lifecycle_over_http() {
    let (app, state) = setup();
    let (cart, owner) = seed_cart(&state, Money::from_dollars(10), 10, 1).await;
    let staff = Actor::staff(ActorId::new());

    let response = app
        .clone()
        .oneshot(request(
            "POST",
            "/checkout",
            Some(&owner),
            Some(checkout_body(&cart)),
        ))
        .await
        .unwrap();
    let order_id = json_body(response).await["id"].as_str().unwrap().to_string();

    let response = app
        .clone()
        .oneshot(request(
            "POST",
            &format!("/orders/{order_id}/cancel-request"),
            Some(&owner),
            Some(serde_json::json!({ "reason": "changed my mind" })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await["status"], "CancelRequested");

    // Staff see it in the queue
    let response = app
        .clone()
        .oneshot(request("GET", "/orders/cancel-requests", Some(&staff), None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = json_body(response).await;
    assert_eq!(json.as_array().unwrap().len(), 1);

    // Approve keeps the customer's reason
    let response = app
        .clone()
        .oneshot(request(
            "POST",
            &format!("/orders/{order_id}/cancel/approve"),
            Some(&staff),
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = json_body(response).await;
    assert_eq!(json["status"], "Cancelled");
    assert_eq!(json["cancel_reason"], "changed my mind");

    // Audit trail is visible to staff
    let response = app
        .oneshot(request(
            "GET",
            &format!("/orders/{order_id}/audit"),
            Some(&staff),
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = json_body(response).await;
    assert_eq!(json.as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_stock_endpoints() {
    let (app, _) = setup();
    let staff = Actor::staff(ActorId::new());
    let customer = Actor::customer(ActorId::new());

    // Customers may not create stock units
    let response = app
        .clone()
        .oneshot(request(
            "POST",
            "/stock",
            Some(&customer),
            Some(serde_json::json!({ "available": 5 })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = app
        .clone()
        .oneshot(request(
            "POST",
            "/stock",
            Some(&staff),
            Some(serde_json::json!({ "available": 5 })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let unit_id = json_body(response).await["id"].as_str().unwrap().to_string();

    // Restock and check the audit trail
    let response = app
        .clone()
        .oneshot(request(
            "POST",
            &format!("/stock/{unit_id}/adjust"),
            Some(&staff),
            Some(serde_json::json!({
                "delta": 20,
                "action": "Import",
                "reason": "restock"
            })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = json_body(response).await;
    assert_eq!(json["quantity_after"], 25);

    let response = app
        .clone()
        .oneshot(request("GET", &format!("/stock/{unit_id}"), None, None))
        .await
        .unwrap();
    let json = json_body(response).await;
    assert_eq!(json["available"], 25);
    assert_eq!(json["version"], 1);

    // Write-off below zero is refused
    let response = app
        .clone()
        .oneshot(request(
            "POST",
            &format!("/stock/{unit_id}/adjust"),
            Some(&staff),
            Some(serde_json::json!({ "delta": -100, "action": "Damaged" })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let response = app
        .oneshot(request("GET", &format!("/stock/{unit_id}/audit"), None, None))
        .await
        .unwrap();
    let json = json_body(response).await;
    assert_eq!(json.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_retire_is_admin_only() {
    let (app, state) = setup();
    let (cart, owner) = seed_cart(&state, Money::from_dollars(10), 10, 1).await;
    let staff = Actor::staff(ActorId::new());
    let admin = Actor::admin(ActorId::new());

    let response = app
        .clone()
        .oneshot(request(
            "POST",
            "/checkout",
            Some(&owner),
            Some(checkout_body(&cart)),
        ))
        .await
        .unwrap();
    let order_id = json_body(response).await["id"].as_str().unwrap().to_string();

    let response = app
        .clone()
        .oneshot(request(
            "DELETE",
            &format!("/orders/{order_id}"),
            Some(&staff),
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = app
        .clone()
        .oneshot(request(
            "DELETE",
            &format!("/orders/{order_id}"),
            Some(&admin),
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = app
        .oneshot(request(
            "GET",
            &format!("/orders/{order_id}"),
            Some(&owner),
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_unknown_order_is_not_found() {
    let (app, _) = setup();
    let staff = Actor::staff(ActorId::new());

    let response = app
        .oneshot(request(
            "POST",
            &format!("/orders/{}/confirm", uuid::Uuid::new_v4()),
            Some(&staff),
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_metrics_endpoint_renders() {
    let (app, _) = setup();

    let response = app
        .oneshot(request("GET", "/metrics", None, None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}
