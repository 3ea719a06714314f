//! Purchase handlers

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use core_kernel::{AccountId, ProductId, PurchaseId};
use validator::Validate;

use crate::dto::purchase::{CreatePurchaseRequest, PurchaseResponse};
use crate::error::ApiError;
use crate::AppState;

use super::parse_id;

/// Opens a purchase for a product
pub async fn create_purchase(
    State(state): State<AppState>,
    Json(request): Json<CreatePurchaseRequest>,
) -> Result<(StatusCode, Json<PurchaseResponse>), ApiError> {
    request
        .validate()
        .map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let amount = request.amount_as_money();
    let product_id = ProductId::from_uuid(request.product_id);
    let customer_id = AccountId::from_uuid(request.customer_id);
    let quantity = request.quantity;
    let buyer = request.buyer.into_domain();

    let purchase = state
        .orchestrator
        .create_purchase(&buyer, product_id, customer_id, quantity, amount)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(PurchaseResponse::from_purchase(&purchase)),
    ))
}

/// Looks up a purchase with its balance figures
pub async fn get_purchase(
    State(state): State<AppState>,
    Path(purchase): Path<String>,
) -> Result<Json<PurchaseResponse>, ApiError> {
    let purchase_id: PurchaseId = parse_id(&purchase, "purchase")?;

    let purchase = state.store.purchase(purchase_id).await?;
    let payments = state.store.payments_of(purchase_id).await?;

    Ok(Json(
        PurchaseResponse::from_purchase(&purchase).with_balance(&purchase, &payments),
    ))
}

/// Finishes the manual-document gate for a purchase
pub async fn document_analyzed(
    State(state): State<AppState>,
    Path(purchase): Path<String>,
) -> Result<Json<PurchaseResponse>, ApiError> {
    let purchase_id: PurchaseId = parse_id(&purchase, "purchase")?;

    let purchase = state.orchestrator.document_analyzed(purchase_id).await?;

    Ok(Json(PurchaseResponse::from_purchase(&purchase)))
}
