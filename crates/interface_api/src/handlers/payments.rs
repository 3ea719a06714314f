//! Payment handlers: creation, gateway callbacks, and lookups

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::Redirect;
use axum::{Form, Json};
use core_kernel::{PaymentId, PurchaseId};
use domain_purchase::{PaymentMethod, TransitionSource};
use domain_settlement::NotificationPayload;
use tracing::info;

use crate::dto::payment::{OpenPaymentRequest, OpenPaymentResponse, PaymentResponse};
use crate::error::ApiError;
use crate::AppState;

use super::parse_id;

/// Opens a payment against a purchase; the path names the method
pub async fn open_payment(
    State(state): State<AppState>,
    Path((purchase, method)): Path<(String, String)>,
    Json(request): Json<OpenPaymentRequest>,
) -> Result<(StatusCode, Json<OpenPaymentResponse>), ApiError> {
    let purchase_id: PurchaseId = parse_id(&purchase, "purchase")?;
    let method: PaymentMethod = method
        .parse()
        .map_err(|_| ApiError::BadRequest(format!("unknown payment method: {method}")))?;

    let (instructions, payment_id) = state
        .orchestrator
        .create_payment(purchase_id, method, &request.into_domain())
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(OpenPaymentResponse {
            payment_id: payment_id.to_string(),
            instructions,
        }),
    ))
}

/// Looks up one payment of a purchase
pub async fn get_payment(
    State(state): State<AppState>,
    Path((purchase, payment)): Path<(String, String)>,
) -> Result<Json<PaymentResponse>, ApiError> {
    let purchase_id: PurchaseId = parse_id(&purchase, "purchase")?;
    let payment_id: PaymentId = parse_id(&payment, "payment")?;

    let payment = state.store.payment(purchase_id, payment_id).await?;

    Ok(Json(PaymentResponse::from_payment(&payment)))
}

/// Server-to-server gateway callback, form-encoded
///
/// Responds with the gateway's fixed acknowledgement body so it stops
/// retrying; the settlement itself already happened (or was rejected with
/// an error status).
pub async fn notify(
    State(state): State<AppState>,
    Path((purchase, payment)): Path<(String, String)>,
    Form(payload): Form<NotificationPayload>,
) -> Result<(StatusCode, &'static str), ApiError> {
    let purchase_id: PurchaseId = parse_id(&purchase, "purchase")?;
    let payment_id: PaymentId = parse_id(&payment, "payment")?;

    let receipt = state
        .orchestrator
        .notify(purchase_id, payment_id, &payload, TransitionSource::Notification)
        .await?;

    info!(
        payment_id = %receipt.payment.id,
        status = ?receipt.payment.status,
        "notification applied"
    );

    Ok((StatusCode::OK, acknowledgement(receipt.payment.method)))
}

/// The fixed body each gateway expects back from a callback endpoint
fn acknowledgement(method: PaymentMethod) -> &'static str {
    match method {
        PaymentMethod::ExpressCheckout => "VERIFIED",
        _ => "OK",
    }
}

/// User-facing return from a redirect gateway
///
/// The payload arrives on the query string; after processing, the browser
/// is sent back to the frontend's conclusion view.
pub async fn conclude(
    State(state): State<AppState>,
    Path((purchase, payment)): Path<(String, String)>,
    Query(payload): Query<NotificationPayload>,
) -> Result<Redirect, ApiError> {
    let purchase_id: PurchaseId = parse_id(&purchase, "purchase")?;
    let payment_id: PaymentId = parse_id(&payment, "payment")?;

    state
        .orchestrator
        .conclude(purchase_id, payment_id, &payload)
        .await?;

    let target = format!(
        "{}/#/purchase/{}/payment/{}/conclude",
        state.config.frontend_url, purchase_id, payment_id
    );
    Ok(Redirect::to(&target))
}
