//! Settlement-file reconciliation scenarios

mod support;

use chrono::{Days, Utc};
use core_kernel::{Currency, Money};
use domain_purchase::{LedgerStore, PurchaseStatus};
use domain_settlement::{RecordClass, SlipBatchReconciler};
use rust_decimal_macros::dec;
use test_utils::{TestPaymentBuilder, TestProductBuilder, TestPurchaseBuilder};

use support::{harness, Harness};

/// Inserts a pending slip purchase/payment pair due `due_in_days` from now
async fn slip_fixture(h: &Harness, our_number: &str, amount: Money, due_in_days: u64) {
    let product = TestProductBuilder::new().with_price(amount).build();
    h.catalog.add(product.clone()).await;
    let purchase = TestPurchaseBuilder::new().for_product(&product).build();
    h.store.insert_purchase(&purchase).await.unwrap();

    let due = Utc::now()
        .date_naive()
        .checked_add_days(Days::new(due_in_days))
        .unwrap();
    let payment = TestPaymentBuilder::new()
        .for_purchase(&purchase)
        .as_bank_slip(our_number, due)
        .build();
    h.store.insert_payment(&payment).await.unwrap();
}

#[tokio::test]
async fn test_mixed_batch_classifies_each_record_independently() {
    let h = harness();
    let today = Utc::now().date_naive();
    slip_fixture(&h, "0000300001", Money::new(dec!(120.00), Currency::BRL), 5).await;
    slip_fixture(&h, "0000300002", Money::new(dec!(120.00), Currency::BRL), 0).await;

    let late_date = today.checked_add_days(Days::new(3)).unwrap();
    let file = format!(
        "0000300001;120.00;{today}\n\
         0000300002;120.00;{late_date}\n\
         0000999999;50.00;{today}\n\
         this line is noise\n"
    );

    let reconciler = SlipBatchReconciler::new(h.store.clone(), h.orchestrator.clone());
    let summary = reconciler.process(file.as_bytes()).await;

    assert_eq!(summary.good, 1);
    assert_eq!(summary.late, 1);
    assert_eq!(summary.bad, 0);
    assert_eq!(summary.unknown, 2);
    assert_eq!(summary.records.len(), 4);

    // the good record settled its purchase
    let settled = h
        .store
        .payment_by_slip_number("0000300001")
        .await
        .unwrap()
        .unwrap();
    let purchase = h.store.purchase(settled.purchase_id).await.unwrap();
    assert_eq!(purchase.status, PurchaseStatus::Paid);

    // the late record never entered the notify path
    let late = h
        .store
        .payment_by_slip_number("0000300002")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(h.store.transitions_of(late.id).await.unwrap().len(), 0);
}

#[tokio::test]
async fn test_insufficient_clearing_is_classified_bad() {
    let h = harness();
    let today = Utc::now().date_naive();
    slip_fixture(&h, "0000300010", Money::new(dec!(120.00), Currency::BRL), 5).await;

    let file = format!("0000300010;80.00;{today}\n");
    let reconciler = SlipBatchReconciler::new(h.store.clone(), h.orchestrator.clone());
    let summary = reconciler.process(file.as_bytes()).await;

    assert_eq!(summary.bad, 1);
    assert_eq!(summary.records[0].class, RecordClass::Bad);

    // the rejection is audited and the payment stays collectible
    let payment = h
        .store
        .payment_by_slip_number("0000300010")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(h.store.transitions_of(payment.id).await.unwrap().len(), 1);
    let purchase = h.store.purchase(payment.purchase_id).await.unwrap();
    assert_eq!(purchase.status, PurchaseStatus::Pending);
}

#[tokio::test]
async fn test_empty_file_produces_an_empty_summary() {
    let h = harness();
    let reconciler = SlipBatchReconciler::new(h.store.clone(), h.orchestrator.clone());
    let summary = reconciler.process(b"\n\n").await;

    assert_eq!(summary.good + summary.late + summary.bad + summary.unknown, 0);
    assert!(summary.records.is_empty());
}

#[tokio::test]
async fn test_one_failing_record_does_not_abort_the_rest() {
    let h = harness();
    let today = Utc::now().date_naive();
    slip_fixture(&h, "0000300020", Money::new(dec!(120.00), Currency::BRL), 5).await;

    // stale purchase behind a resolvable reference
    slip_fixture(&h, "0000300021", Money::new(dec!(120.00), Currency::BRL), 5).await;
    let stale_payment = h
        .store
        .payment_by_slip_number("0000300021")
        .await
        .unwrap()
        .unwrap();
    h.store
        .set_purchase_status(
            stale_payment.purchase_id,
            PurchaseStatus::Pending,
            PurchaseStatus::Stale,
        )
        .await
        .unwrap();

    let file = format!(
        "0000300021;120.00;{today}\n\
         0000300020;120.00;{today}\n"
    );
    let reconciler = SlipBatchReconciler::new(h.store.clone(), h.orchestrator.clone());
    let summary = reconciler.process(file.as_bytes()).await;

    assert_eq!(summary.bad, 1);
    assert_eq!(summary.good, 1);
}
