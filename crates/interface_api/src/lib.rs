//! HTTP API Layer
//!
//! This crate provides the REST API for the purchase/payment engine using
//! Axum.
//!
//! # Architecture
//!
//! - **Handlers**: purchase, payment, reconciliation, and health endpoints
//! - **DTOs**: Request/Response data transfer objects
//! - **Error Handling**: Consistent `{error, message}` responses
//!
//! Endpoints carry no authentication; authorization is the host
//! application's concern.
//!
//! # Example
//!
//! ```rust,ignore
//! use interface_api::{build_state, create_router, config::ApiConfig};
//!
//! let state = build_state(pool, ApiConfig::from_env()?)?;
//! let app = create_router(state);
//! axum::serve(listener, app).await?;
//! ```

pub mod config;
pub mod dto;
pub mod error;
pub mod handlers;

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use core_kernel::{Currency, Money};
use domain_purchase::{LedgerStore, ProductCatalog};
use domain_settlement::{
    BankSlipProcessor, CashProcessor, ExpressCheckoutProcessor, GatewayConfig,
    HttpCheckoutGateway, HttpExpressGateway, LoggingDispatcher, OrchestratorConfig,
    PaymentOrchestrator, ProcessorRegistry, SlipBatchReconciler, SlipConfig, VoucherProcessor,
    WebCheckoutProcessor,
};
use infra_db::{PgLedgerStore, PgProductCatalog};
use sqlx::PgPool;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::config::ApiConfig;
use crate::error::ApiError;
use crate::handlers::{health, payments, purchases, reconcile};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<PaymentOrchestrator>,
    pub reconciler: Arc<SlipBatchReconciler>,
    pub store: Arc<dyn LedgerStore>,
    /// Absent when the engine runs over a non-SQL store (tests)
    pub pool: Option<PgPool>,
    pub config: ApiConfig,
}

/// Assembles the settlement engine over PostgreSQL adapters and the HTTP
/// gateway clients named in the configuration
pub fn build_state(pool: PgPool, config: ApiConfig) -> Result<AppState, ApiError> {
    let store: Arc<dyn LedgerStore> = Arc::new(PgLedgerStore::new(pool.clone()));
    let catalog: Arc<dyn ProductCatalog> = Arc::new(PgProductCatalog::new(pool.clone()));

    let mut checkout_config = GatewayConfig::new(&config.checkout_url, &config.checkout_api_key);
    checkout_config.timeout_secs = config.gateway_timeout_secs;
    let checkout = Arc::new(
        HttpCheckoutGateway::new(checkout_config)
            .map_err(|e| ApiError::Internal(e.to_string()))?,
    );

    let mut express_config = GatewayConfig::new(&config.express_url, &config.express_api_key);
    express_config.timeout_secs = config.gateway_timeout_secs;
    let express = Arc::new(
        HttpExpressGateway::new(express_config).map_err(|e| ApiError::Internal(e.to_string()))?,
    );

    let registry = ProcessorRegistry::new()
        .register(Arc::new(CashProcessor))
        .register(Arc::new(BankSlipProcessor::new(
            store.clone(),
            SlipConfig {
                our_number_offset: config.slip_number_offset,
            },
        )))
        .register(Arc::new(WebCheckoutProcessor::new(store.clone(), checkout)))
        .register(Arc::new(ExpressCheckoutProcessor::new(
            store.clone(),
            express,
        )))
        .register(Arc::new(VoucherProcessor::new(
            store.clone(),
            catalog.clone(),
        )));

    let orchestrator = Arc::new(PaymentOrchestrator::new(
        store.clone(),
        catalog,
        registry,
        Arc::new(LoggingDispatcher),
        OrchestratorConfig {
            minimum_donation: Money::new(config.minimum_donation, Currency::BRL),
        },
    ));
    let reconciler = Arc::new(SlipBatchReconciler::new(store.clone(), orchestrator.clone()));

    Ok(AppState {
        orchestrator,
        reconciler,
        store,
        pool: Some(pool),
        config,
    })
}

/// Creates the main API router
pub fn create_router(state: AppState) -> Router {
    let public_routes = Router::new()
        .route("/health", get(health::health_check))
        .route("/health/ready", get(health::readiness_check));

    // POST on /:purchase/payments/:target opens a payment (target names the
    // method); GET reads one (target names the payment id)
    let purchase_routes = Router::new()
        .route("/", post(purchases::create_purchase))
        .route("/slips/reconcile", post(reconcile::reconcile_slips))
        .route("/:purchase", get(purchases::get_purchase))
        .route(
            "/:purchase/document/analyzed",
            post(purchases::document_analyzed),
        )
        .route(
            "/:purchase/payments/:target",
            post(payments::open_payment).get(payments::get_payment),
        )
        .route("/:purchase/payments/:target/notify", post(payments::notify))
        .route(
            "/:purchase/payments/:target/conclude",
            get(payments::conclude),
        );

    Router::new()
        .merge(public_routes)
        .nest("/api/v1/purchases", purchase_routes)
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}
