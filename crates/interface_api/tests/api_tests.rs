//! Router tests over the in-memory engine
//!
//! Only the offline methods (cash, bank slip, voucher) are wired; the
//! redirect gateways are exercised in the settlement crate's suite.

use std::sync::Arc;

use axum_test::TestServer;
use chrono::Utc;
use core_kernel::{Currency, Money};
use domain_purchase::{Product, ProductCategory};
use domain_settlement::{
    BankSlipProcessor, CashProcessor, LoggingDispatcher, OrchestratorConfig, PaymentOrchestrator,
    ProcessorRegistry, SlipBatchReconciler, SlipConfig, VoucherProcessor,
};
use interface_api::{config::ApiConfig, create_router, AppState};
use rust_decimal_macros::dec;
use serde_json::{json, Value};
use test_utils::{MemoryLedgerStore, MemoryProductCatalog, TestProductBuilder};
use uuid::Uuid;

struct Ctx {
    server: TestServer,
    catalog: Arc<MemoryProductCatalog>,
}

fn context() -> Ctx {
    let store = Arc::new(MemoryLedgerStore::new());
    let catalog = Arc::new(MemoryProductCatalog::new());

    let registry = ProcessorRegistry::new()
        .register(Arc::new(CashProcessor))
        .register(Arc::new(BankSlipProcessor::new(
            store.clone(),
            SlipConfig::default(),
        )))
        .register(Arc::new(VoucherProcessor::new(
            store.clone(),
            catalog.clone(),
        )));

    let orchestrator = Arc::new(PaymentOrchestrator::new(
        store.clone(),
        catalog.clone(),
        registry,
        Arc::new(LoggingDispatcher),
        OrchestratorConfig {
            minimum_donation: Money::new(dec!(10.00), Currency::BRL),
        },
    ));
    let reconciler = Arc::new(SlipBatchReconciler::new(store.clone(), orchestrator.clone()));

    let state = AppState {
        orchestrator,
        reconciler,
        store,
        pool: None,
        config: ApiConfig::default(),
    };

    Ctx {
        server: TestServer::new(create_router(state)).expect("router builds"),
        catalog,
    }
}

async fn seat_product(ctx: &Ctx) -> Product {
    let product = TestProductBuilder::new()
        .with_description("Conference seat")
        .with_price(Money::new(dec!(120.00), Currency::BRL))
        .build();
    ctx.catalog.add(product.clone()).await;
    product
}

fn buyer_json() -> Value {
    json!({
        "kind": "person",
        "name": "Ada Lovelace",
        "document": "123.456.789-00"
    })
}

async fn open_purchase(ctx: &Ctx, product: &Product) -> Value {
    let response = ctx
        .server
        .post("/api/v1/purchases")
        .json(&json!({
            "product_id": product.id.as_uuid(),
            "customer_id": Uuid::new_v4(),
            "buyer": buyer_json(),
        }))
        .await;
    response.assert_status(axum::http::StatusCode::CREATED);
    response.json::<Value>()
}

async fn open_payment(ctx: &Ctx, purchase_id: &str, method: &str) -> Value {
    let response = ctx
        .server
        .post(&format!("/api/v1/purchases/{purchase_id}/payments/{method}"))
        .json(&json!({}))
        .await;
    response.assert_status(axum::http::StatusCode::CREATED);
    response.json::<Value>()
}

#[tokio::test]
async fn test_health_endpoints() {
    let ctx = context();

    let health = ctx.server.get("/health").await;
    health.assert_status_ok();
    assert_eq!(health.json::<Value>()["status"], "healthy");

    let ready = ctx.server.get("/health/ready").await;
    ready.assert_status_ok();
    assert_eq!(ready.json::<Value>()["status"], "ready");
}

#[tokio::test]
async fn test_cash_payment_settles_the_purchase() {
    let ctx = context();
    let product = seat_product(&ctx).await;

    let purchase = open_purchase(&ctx, &product).await;
    assert_eq!(purchase["status"], "pending");
    let purchase_id = purchase["id"].as_str().unwrap().to_string();

    let opened = open_payment(&ctx, &purchase_id, "cash").await;
    assert_eq!(opened["instructions"]["kind"], "attended");

    let fetched = ctx
        .server
        .get(&format!("/api/v1/purchases/{purchase_id}"))
        .await;
    fetched.assert_status_ok();
    let body = fetched.json::<Value>();
    assert_eq!(body["status"], "paid");
    assert_eq!(body["outstanding_amount"], "0.00");
    assert_eq!(body["paid_amount"], "120.00");
}

#[tokio::test]
async fn test_unknown_method_is_rejected() {
    let ctx = context();
    let product = seat_product(&ctx).await;
    let purchase = open_purchase(&ctx, &product).await;
    let purchase_id = purchase["id"].as_str().unwrap();

    let response = ctx
        .server
        .post(&format!(
            "/api/v1/purchases/{purchase_id}/payments/wire-transfer"
        ))
        .json(&json!({}))
        .await;
    response.assert_status(axum::http::StatusCode::BAD_REQUEST);
    assert_eq!(response.json::<Value>()["error"], "bad_request");
}

#[tokio::test]
async fn test_missing_purchase_is_not_found() {
    let ctx = context();

    let response = ctx
        .server
        .get(&format!("/api/v1/purchases/PUR-{}", Uuid::new_v4()))
        .await;
    response.assert_status(axum::http::StatusCode::NOT_FOUND);

    let malformed = ctx.server.get("/api/v1/purchases/not-an-id").await;
    malformed.assert_status(axum::http::StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_slip_notification_acknowledges_with_ok() {
    let ctx = context();
    let product = seat_product(&ctx).await;
    let purchase = open_purchase(&ctx, &product).await;
    let purchase_id = purchase["id"].as_str().unwrap().to_string();

    let opened = open_payment(&ctx, &purchase_id, "bank-slip").await;
    assert_eq!(opened["instructions"]["kind"], "bank-slip");
    assert_eq!(
        opened["instructions"]["our_number"].as_str().unwrap().len(),
        10
    );
    let payment_id = opened["payment_id"].as_str().unwrap().to_string();

    let today = Utc::now().date_naive().to_string();
    let response = ctx
        .server
        .post(&format!(
            "/api/v1/purchases/{purchase_id}/payments/{payment_id}/notify"
        ))
        .form(&[("paid_amount", "120.00"), ("paid_date", today.as_str())])
        .await;
    response.assert_status_ok();
    assert_eq!(response.text(), "OK");

    let fetched = ctx
        .server
        .get(&format!("/api/v1/purchases/{purchase_id}"))
        .await;
    assert_eq!(fetched.json::<Value>()["status"], "paid");
}

#[tokio::test]
async fn test_document_gate_via_api() {
    let ctx = context();
    let product = TestProductBuilder::new()
        .with_category(ProductCategory::Student)
        .with_price(Money::new(dec!(60.00), Currency::BRL))
        .build();
    ctx.catalog.add(product.clone()).await;

    let purchase = open_purchase(&ctx, &product).await;
    let purchase_id = purchase["id"].as_str().unwrap().to_string();

    open_payment(&ctx, &purchase_id, "cash").await;

    let fetched = ctx
        .server
        .get(&format!("/api/v1/purchases/{purchase_id}"))
        .await;
    assert_eq!(fetched.json::<Value>()["status"], "document-in-analysis");

    let analyzed = ctx
        .server
        .post(&format!("/api/v1/purchases/{purchase_id}/document/analyzed"))
        .await;
    analyzed.assert_status_ok();
    assert_eq!(analyzed.json::<Value>()["status"], "paid");

    // a second review is a lost compare-and-set
    let again = ctx
        .server
        .post(&format!("/api/v1/purchases/{purchase_id}/document/analyzed"))
        .await;
    again.assert_status(axum::http::StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_reconcile_settles_a_slip_batch() {
    let ctx = context();
    let product = seat_product(&ctx).await;
    let purchase = open_purchase(&ctx, &product).await;
    let purchase_id = purchase["id"].as_str().unwrap().to_string();

    let opened = open_payment(&ctx, &purchase_id, "bank-slip").await;
    let our_number = opened["instructions"]["our_number"].as_str().unwrap();

    let today = Utc::now().date_naive();
    let file = format!("{our_number};120.00;{today}\ngarbage-line\n");

    let response = ctx
        .server
        .post("/api/v1/purchases/slips/reconcile")
        .text(file)
        .await;
    response.assert_status_ok();
    let summary = response.json::<Value>();
    assert_eq!(summary["good"], 1);
    assert_eq!(summary["unknown"], 1);

    let fetched = ctx
        .server
        .get(&format!("/api/v1/purchases/{purchase_id}"))
        .await;
    assert_eq!(fetched.json::<Value>()["status"], "paid");
}

#[tokio::test]
async fn test_conclusion_redirects_to_the_frontend() {
    let ctx = context();
    let product = seat_product(&ctx).await;
    let purchase = open_purchase(&ctx, &product).await;
    let purchase_id = purchase["id"].as_str().unwrap().to_string();

    let opened = open_payment(&ctx, &purchase_id, "cash").await;
    let payment_id = opened["payment_id"].as_str().unwrap().to_string();

    let response = ctx
        .server
        .get(&format!(
            "/api/v1/purchases/{purchase_id}/payments/{payment_id}/conclude"
        ))
        .await;
    response.assert_status(axum::http::StatusCode::SEE_OTHER);

    let location = response.header("location");
    let location = location.to_str().unwrap();
    assert!(location.starts_with("http://localhost:3000/#/purchase/"));
    assert!(location.ends_with(&format!("payment/{payment_id}/conclude")));
}
