//! End-to-end tests of the `/api` router over an in-memory database.
//!
//! Requests go through the full middleware stack with
//! `tower::ServiceExt::oneshot`; no socket is opened.

use std::time::Duration;

use axum::body::{to_bytes, Body};
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt;

use pdv_db::{Database, DbConfig};
use pdv_server::state::ConfigState;
use pdv_server::{build_router, AppState};

async fn app() -> Router {
    let db = Database::new(DbConfig::in_memory()).await.unwrap();
    build_router(AppState::new(db, ConfigState::default()), Duration::from_secs(30))
}

async fn raw(app: &Router, method: Method, uri: &str, body: Body, json_body: bool) -> (StatusCode, axum::http::HeaderMap, Vec<u8>) {
    let mut builder = Request::builder().method(method).uri(uri);
    if json_body {
        builder = builder.header(header::CONTENT_TYPE, "application/json");
    }
    let response = app.clone().oneshot(builder.body(body).unwrap()).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, headers, bytes.to_vec())
}

async fn send(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let (status, _, bytes) = match body {
        Some(value) => raw(app, method, uri, Body::from(value.to_string()), true).await,
        None => raw(app, method, uri, Body::empty(), false).await,
    };
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

async fn create_product(app: &Router, name: &str, price_cents: i64, stock: i64) -> Value {
    let (status, product) = send(
        app,
        Method::POST,
        "/api/products",
        Some(json!({
            "name": name,
            "category": "Gesso",
            "barcode": "7891234567895",
            "price_cents": price_cents,
            "cost_cents": price_cents / 2,
            "stock": stock,
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    product
}

#[tokio::test]
async fn test_health() {
    let app = app().await;
    let (status, body) = send(&app, Method::GET, "/api/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn test_create_and_search_product() {
    let app = app().await;
    let product = create_product(&app, "Placa de gesso 60x60", 1250, 40).await;
    assert_eq!(product["min_stock"], json!(ConfigState::default().default_min_stock));

    let (status, found) = send(&app, Method::GET, "/api/products/search?q=placa", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(found[0]["id"], product["id"]);

    let (status, by_code) = send(&app, Method::GET, "/api/products/search?q=7891234567895", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(by_code.as_array().map(Vec::len), Some(1));
}

#[tokio::test]
async fn test_unknown_product_is_not_found() {
    let app = app().await;
    let (status, body) = send(&app, Method::GET, "/api/products/does-not-exist", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "NOT_FOUND");
}

#[tokio::test]
async fn test_invalid_product_is_rejected() {
    let app = app().await;
    let (status, body) = send(
        &app,
        Method::POST,
        "/api/products",
        Some(json!({ "name": "   ", "price_cents": 100 })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn test_checkout_is_idempotent_per_token() {
    let app = app().await;
    let product = create_product(&app, "Sanca", 2000, 10).await;
    let product_id = product["id"].as_str().unwrap().to_string();

    let (status, cart) = send(
        &app,
        Method::POST,
        "/api/cart/items",
        Some(json!({ "product_id": product_id, "quantity": 3 })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(cart["lines"].as_array().map(Vec::len), Some(1));

    let (status, _) = send(&app, Method::PUT, "/api/cart/payment", Some(json!({ "method": "pix" }))).await;
    assert_eq!(status, StatusCode::OK);

    let body = json!({ "checkout_token": "click-1" });
    let (status, first) = send(&app, Method::POST, "/api/cart/checkout", Some(body.clone())).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(first["replayed"], false);
    assert_eq!(first["sale"]["total_cents"], 6000);
    assert!(first["cart"]["lines"].as_array().unwrap().is_empty());

    let (status, second) = send(&app, Method::POST, "/api/cart/checkout", Some(body)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(second["replayed"], true);
    assert_eq!(second["sale"]["id"], first["sale"]["id"]);

    let (_, product) = send(&app, Method::GET, &format!("/api/products/{}", product_id), None).await;
    assert_eq!(product["stock"], 7);

    let (_, sales) = send(&app, Method::GET, "/api/sales", None).await;
    assert_eq!(sales.as_array().map(Vec::len), Some(1));
}

#[tokio::test]
async fn test_checkout_of_empty_cart_fails() {
    let app = app().await;
    let (status, body) = send(&app, Method::POST, "/api/cart/checkout", None).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["code"], "CART_ERROR");
}

#[tokio::test]
async fn test_products_csv_download() {
    let app = app().await;
    create_product(&app, "Moldura", 900, 5).await;

    let (status, headers, bytes) = raw(&app, Method::GET, "/api/exports/products.csv", Body::empty(), false).await;
    assert_eq!(status, StatusCode::OK);
    assert!(headers[header::CONTENT_TYPE].to_str().unwrap().starts_with("text/csv"));
    let disposition = headers[header::CONTENT_DISPOSITION].to_str().unwrap();
    assert!(disposition.starts_with("attachment"));
    assert!(disposition.contains("Relatorio_Produtos_"));
    assert!(String::from_utf8_lossy(&bytes).contains("Moldura"));
}

#[tokio::test]
async fn test_budget_create_and_print() {
    let app = app().await;
    let (status, budget) = send(
        &app,
        Method::POST,
        "/api/budgets",
        Some(json!({
            "customer": { "name": "Construtora Alfa", "document": "11.222.333/0001-81" },
            "items": [
                { "name": "Forro de gesso", "quantity": 20, "unit": "m²", "unit_price_cents": 4500 }
            ],
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(budget["budget_number"], "0001");
    assert_eq!(budget["status"], "orcamento");
    assert_eq!(budget["total_cents"], 90000);

    let id = budget["id"].as_str().unwrap();
    let (status, headers, bytes) = raw(&app, Method::GET, &format!("/api/budgets/{}/print", id), Body::empty(), false).await;
    assert_eq!(status, StatusCode::OK);
    assert!(headers[header::CONTENT_TYPE].to_str().unwrap().starts_with("text/html"));
    assert!(String::from_utf8_lossy(&bytes).contains("Construtora Alfa"));
}

#[tokio::test]
async fn test_budget_sale_profit_uses_catalog_cost() {
    let app = app().await;
    let product = create_product(&app, "Placa de gesso 60x60", 1000, 30).await;

    let (status, budget) = send(
        &app,
        Method::POST,
        "/api/budgets",
        Some(json!({
            "customer": { "name": "Construtora Alfa", "document": "11.222.333/0001-81" },
            "items": [
                { "product_id": product["id"], "name": "Placa de gesso 60x60", "quantity": 2, "unit_price_cents": 1000 }
            ],
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(budget["items"][0]["unit_cost_cents"], 500);
    assert_eq!(budget["profit_cents"], 1000);

    let id = budget["id"].as_str().unwrap();
    let (status, converted) = send(
        &app,
        Method::POST,
        &format!("/api/budgets/{}/convert", id),
        Some(json!({ "payment_method": "pix" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(converted["budget"]["status"], "vendido");
    assert_eq!(converted["sale"]["total_cents"], 2000);
    assert_eq!(converted["sale"]["profit_cents"], 1000);
}

#[tokio::test]
async fn test_restore_rejects_malformed_backup() {
    let app = app().await;
    let (status, body) = send_text(&app, "/api/backup/restore", "{ not json").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn test_backup_round_trip_through_http() {
    let app = app().await;
    create_product(&app, "Gesso em pó 40kg", 3500, 12).await;

    let (status, headers, bytes) = raw(&app, Method::GET, "/api/backup", Body::empty(), false).await;
    assert_eq!(status, StatusCode::OK);
    assert!(headers[header::CONTENT_DISPOSITION]
        .to_str()
        .unwrap()
        .contains("backup_pdv_"));

    let fresh = self::app().await;
    let (status, restored) = send_text(&fresh, "/api/backup/restore", &String::from_utf8_lossy(&bytes)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(restored["restored"], true);

    let (_, products) = send(&fresh, Method::GET, "/api/products", None).await;
    assert_eq!(products[0]["name"], "Gesso em pó 40kg");
}

async fn send_text(app: &Router, uri: &str, text: &str) -> (StatusCode, Value) {
    let (status, _, bytes) = raw(app, Method::POST, uri, Body::from(text.to_string()), false).await;
    (status, serde_json::from_slice(&bytes).unwrap())
}
