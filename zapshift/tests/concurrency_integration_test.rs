//! Concurrency integration tests.
//!
//! Races reconciliations of one parcel and duplicate rider applications
//! against the in-memory store on a multi-threaded runtime. Whatever the
//! interleaving, a parcel is settled once and an email holds one application.
//!
//! Run with: `cargo test --test concurrency_integration_test`

#![allow(clippy::expect_used)]
#![allow(clippy::unwrap_used)]

use chrono::{TimeZone, Utc};
use futures::future::join_all;
use rust_decimal_macros::dec;
use std::sync::Arc;
use zapshift::services::{ParcelService, RiderService};
use zapshift::store::InMemoryStore;
use zapshift_core::checkout::{ProviderPaymentStatus, SessionOutcome, SessionStatus};
use zapshift_core::parcel::{PAYMENT_SUCCESSFUL, PaymentFailurePolicy};
use zapshift_core::rider::{ApplicationForm, ApplicationPolicy};
use zapshift_core::{Error, FixedClock, Money, ParcelDraft, ParcelId, PaymentStatus};

const CONTENDERS: usize = 16;

fn clock() -> Arc<FixedClock> {
    Arc::new(FixedClock::new(
        Utc.with_ymd_and_hms(2026, 10, 16, 12, 0, 0).unwrap(),
    ))
}

fn paid_outcome(parcel_id: &ParcelId, attempt: usize) -> SessionOutcome {
    SessionOutcome {
        session_id: format!("cs_race_{attempt}"),
        status: SessionStatus::Complete,
        payment_status: ProviderPaymentStatus::Paid,
        amount_total: Some(Money::from_major(150)),
        currency: Some("usd".to_string()),
        payment_intent: Some(format!("pi_race_{attempt}")),
        payment_method_types: vec!["card".to_string()],
        parcel_id: Some(parcel_id.clone()),
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_settlements_mutate_the_parcel_once() {
    let store = InMemoryStore::new();
    let service = ParcelService::new(
        Arc::new(store.clone()),
        clock(),
        PaymentFailurePolicy::Record,
    );
    let parcel = service
        .create(ParcelDraft {
            parcel_type: Some("non-document".to_string()),
            weight: Some(dec!(2.5)),
            sender_email: Some("sender@example.com".to_string()),
            sender_division: Some("A".to_string()),
            receiver_division: Some("B".to_string()),
            ..ParcelDraft::default()
        })
        .await
        .unwrap();

    let tasks = (0..CONTENDERS).map(|attempt| {
        let service = service.clone();
        let parcel_id = parcel.id.clone();
        tokio::spawn(async move {
            service
                .record_payment_settlement(&parcel_id, &paid_outcome(&parcel_id, attempt))
                .await
        })
    });
    let results: Vec<_> = join_all(tasks)
        .await
        .into_iter()
        .map(|joined| joined.expect("settlement task panicked"))
        .collect();

    let winners: Vec<_> = results.iter().filter_map(|r| r.as_ref().ok()).collect();
    assert_eq!(winners.len(), 1, "exactly one settlement should win: {results:?}");
    assert!(
        results
            .iter()
            .filter(|r| r.is_err())
            .all(|r| matches!(r, Err(Error::AlreadySettled { .. }))),
        "losers must see AlreadySettled: {results:?}"
    );

    let stored = service.track(&parcel.id).await.unwrap();
    assert_eq!(stored.payment_status, PaymentStatus::Paid);
    assert_eq!(stored.state.len(), 1);
    assert_eq!(stored.state[0].title, PAYMENT_SUCCESSFUL);
    assert_eq!(stored.transaction_id, winners[0].transaction_id);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_applications_keep_one_record_per_email() {
    let store = InMemoryStore::new();
    let service = RiderService::new(Arc::new(store.clone()), clock(), ApplicationPolicy::default());

    let tasks = (0..CONTENDERS).map(|_| {
        let service = service.clone();
        tokio::spawn(async move {
            service
                .submit(ApplicationForm {
                    name: Some("Rahim".to_string()),
                    email: Some("rahim@example.com".to_string()),
                    ..ApplicationForm::default()
                })
                .await
        })
    });
    let results: Vec<_> = join_all(tasks)
        .await
        .into_iter()
        .map(|joined| joined.expect("submission task panicked"))
        .collect();

    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
    assert!(
        results
            .iter()
            .filter(|r| r.is_err())
            .all(|r| matches!(r, Err(Error::DuplicateApplication { .. })))
    );
    assert_eq!(store.application_count().unwrap(), 1);
}
