//! Cash settlement
//!
//! Cash is operator-attested: opening the payment is the attestation, so it
//! settles at creation with no gateway round trip. A later manual notify is
//! accepted and simply re-states `paid`, which recalculation absorbs.

use async_trait::async_trait;
use core_kernel::Money;
use domain_purchase::{
    Payment, PaymentDetails, PaymentMethod, PaymentStatus, Product, Purchase, Transition,
    TransitionSource,
};

use crate::error::SettlementError;
use crate::processor::{
    payload_json, CreatePaymentRequest, NotificationPayload, PaymentInstructions, PaymentProcessor,
};

pub struct CashProcessor;

#[async_trait]
impl PaymentProcessor for CashProcessor {
    fn method(&self) -> PaymentMethod {
        PaymentMethod::Cash
    }

    fn settles_on_creation(&self) -> bool {
        true
    }

    async fn create(
        &self,
        purchase: &Purchase,
        _product: &Product,
        amount: Money,
        _request: &CreatePaymentRequest,
    ) -> Result<Payment, SettlementError> {
        Ok(Payment::new(
            purchase.id,
            PaymentMethod::Cash,
            amount,
            PaymentDetails::Cash {},
        )
        .with_description("Attended cash payment"))
    }

    async fn process(
        &self,
        payment: &mut Payment,
        _purchase: &Purchase,
    ) -> Result<PaymentInstructions, SettlementError> {
        Ok(PaymentInstructions::Attended {
            description: format!("Received in person: {}", payment.amount),
        })
    }

    async fn notify(
        &self,
        _purchase: &Purchase,
        payment: &Payment,
        payload: &NotificationPayload,
        source: TransitionSource,
    ) -> Result<Transition, SettlementError> {
        // any operator payload re-attests the settlement
        Ok(Transition::new(
            payment.id,
            payment.status,
            PaymentStatus::Paid,
            source,
            payload_json(payload),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Days, Utc};
    use core_kernel::{AccountId, BuyerId, Currency};
    use domain_purchase::{ProductCategory, PurchaseKind};
    use rust_decimal_macros::dec;

    fn fixtures() -> (Purchase, Product) {
        let product = Product::new(
            "Seat",
            ProductCategory::General,
            Money::new(dec!(120.00), Currency::BRL),
            Utc::now().checked_add_days(Days::new(10)).unwrap(),
        );
        let purchase = Purchase::new(
            product.id,
            AccountId::new(),
            BuyerId::new(),
            PurchaseKind::Single,
            product.price,
            1,
        );
        (purchase, product)
    }

    #[tokio::test]
    async fn test_cash_settles_on_creation() {
        let (purchase, product) = fixtures();
        let processor = CashProcessor;

        assert!(processor.settles_on_creation());

        let payment = processor
            .create(
                &purchase,
                &product,
                purchase.total_owed(),
                &CreatePaymentRequest::default(),
            )
            .await
            .unwrap();

        assert_eq!(payment.method, PaymentMethod::Cash);
        assert_eq!(payment.amount.amount(), dec!(120.00));
    }

    #[tokio::test]
    async fn test_notify_attests_paid() {
        let (purchase, product) = fixtures();
        let processor = CashProcessor;
        let payment = processor
            .create(
                &purchase,
                &product,
                purchase.total_owed(),
                &CreatePaymentRequest::default(),
            )
            .await
            .unwrap();

        let transition = processor
            .notify(
                &purchase,
                &payment,
                &NotificationPayload::new(),
                TransitionSource::Manual,
            )
            .await
            .unwrap();

        assert!(transition.is_settlement());
    }
}
