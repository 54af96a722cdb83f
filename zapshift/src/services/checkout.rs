//! Checkout orchestration: open provider sessions and reconcile them.

use super::ParcelService;
use crate::config::CheckoutConfig;
use crate::metrics;
use crate::payment_gateway::PaymentGateway;
use std::sync::Arc;
use zapshift_core::checkout::{CheckoutRequest, CheckoutSession, SessionStatus, SettlementReceipt};
use zapshift_core::{Error, ParcelId, Result};

/// Redirect path after a successful payment; the provider fills the session id.
const SUCCESS_PATH: &str = "/dashboard/payment-success?session_id={CHECKOUT_SESSION_ID}";

/// Redirect path after an abandoned payment.
const CANCEL_PATH: &str = "/dashboard/payment-cancelled";

/// Checkout orchestrator.
#[derive(Clone)]
pub struct CheckoutService {
    gateway: Arc<dyn PaymentGateway>,
    parcels: ParcelService,
    origins: CheckoutConfig,
    currency: String,
}

impl CheckoutService {
    /// Create a new checkout service
    #[must_use]
    pub fn new(
        gateway: Arc<dyn PaymentGateway>,
        parcels: ParcelService,
        origins: CheckoutConfig,
        currency: impl Into<String>,
    ) -> Self {
        Self {
            gateway,
            parcels,
            origins,
            currency: currency.into(),
        }
    }

    /// Opens a provider session for the parcel's delivery cost.
    ///
    /// The origin is checked before anything is read.
    ///
    /// # Errors
    ///
    /// `ForbiddenOrigin`, `NotFound`, `AlreadySettled` or `PaymentProvider`.
    pub async fn create_session(
        &self,
        parcel_id: &ParcelId,
        origin: Option<&str>,
    ) -> Result<CheckoutSession> {
        let origin = match origin {
            Some(origin) if self.origins.is_allowed(origin) => origin.trim_end_matches('/'),
            other => {
                tracing::warn!(origin = ?other, "Checkout requested from a disallowed origin");
                return Err(Error::ForbiddenOrigin {
                    origin: other.unwrap_or("<missing>").to_string(),
                });
            }
        };

        let parcel = self.parcels.track(parcel_id).await?;
        if parcel.is_settled() {
            return Err(Error::AlreadySettled {
                parcel_id: parcel.id.to_string(),
            });
        }

        let label = parcel
            .parcel_name
            .as_deref()
            .unwrap_or_else(|| parcel.parcel_type.as_str());
        let request = CheckoutRequest {
            parcel_id: parcel.id.clone(),
            amount: parcel.delivery_cost,
            currency: self.currency.clone(),
            product_name: format!("Parcel delivery: {label}"),
            customer_email: parcel.sender_email.clone(),
            weight: parcel.weight.kilograms(),
            success_url: format!("{origin}{SUCCESS_PATH}"),
            cancel_url: format!("{origin}{CANCEL_PATH}"),
        };

        let session = self.gateway.create_session(request).await?;
        metrics::record_checkout_session();
        tracing::info!(parcel_id = %parcel.id, session_id = %session.id, "Checkout session opened");
        Ok(session)
    }

    /// Reads a session back from the provider and settles its parcel.
    ///
    /// # Errors
    ///
    /// `SessionIncomplete` when the session is not complete, `Validation`
    /// when it carries no parcel id, then whatever settlement reports.
    pub async fn reconcile(&self, session_id: &str) -> Result<SettlementReceipt> {
        let outcome = self.gateway.retrieve_session(session_id).await?;
        if outcome.status != SessionStatus::Complete {
            metrics::record_payment("incomplete");
            return Err(Error::SessionIncomplete {
                session_id: outcome.session_id,
            });
        }
        let parcel_id = outcome
            .parcel_id
            .clone()
            .ok_or_else(|| Error::validation(format!("session {session_id} carries no parcelId")))?;

        let parcel = self
            .parcels
            .record_payment_settlement(&parcel_id, &outcome)
            .await?;

        Ok(SettlementReceipt {
            amount: outcome.amount_total.unwrap_or(parcel.delivery_cost).major(),
            currency: outcome.currency.unwrap_or_else(|| self.currency.clone()),
            transaction_id: parcel.transaction_id.unwrap_or(outcome.session_id),
            parcel_id,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::payment_gateway::MockPaymentGateway;
    use crate::store::InMemoryStore;
    use chrono::{TimeZone, Utc};
    use rust_decimal_macros::dec;
    use zapshift_core::checkout::{ProviderPaymentStatus, SessionOutcome};
    use zapshift_core::parcel::PaymentFailurePolicy;
    use zapshift_core::{FixedClock, Parcel, ParcelDraft, PaymentStatus};

    const ORIGIN: &str = "http://localhost:5173";

    struct Fixture {
        store: InMemoryStore,
        gateway: MockPaymentGateway,
        parcels: ParcelService,
        checkout: CheckoutService,
    }

    fn fixture() -> Fixture {
        let store = InMemoryStore::new();
        let gateway = MockPaymentGateway::new();
        let clock = FixedClock::new(Utc.with_ymd_and_hms(2026, 10, 16, 12, 0, 0).unwrap());
        let parcels = ParcelService::new(
            Arc::new(store.clone()),
            Arc::new(clock),
            PaymentFailurePolicy::Record,
        );
        let checkout = CheckoutService::new(
            Arc::new(gateway.clone()),
            parcels.clone(),
            CheckoutConfig::new([ORIGIN]),
            "usd",
        );
        Fixture {
            store,
            gateway,
            parcels,
            checkout,
        }
    }

    async fn parcel(parcels: &ParcelService) -> Parcel {
        parcels
            .create(ParcelDraft {
                parcel_type: Some("document".to_string()),
                weight: Some(dec!(0.5)),
                sender_email: Some("sender@example.com".to_string()),
                sender_division: Some("Dhaka".to_string()),
                receiver_division: Some("Rajshahi".to_string()),
                ..ParcelDraft::default()
            })
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn origin_is_checked_before_lookup() {
        let f = fixture();
        let missing = ParcelId::new("does-not-exist");

        let forbidden = f.checkout.create_session(&missing, Some("https://evil.example.com")).await;
        assert!(matches!(forbidden, Err(Error::ForbiddenOrigin { .. })));
        let absent = f.checkout.create_session(&missing, None).await;
        assert!(matches!(absent, Err(Error::ForbiddenOrigin { .. })));

        let not_found = f.checkout.create_session(&missing, Some(ORIGIN)).await;
        assert!(matches!(not_found, Err(Error::NotFound { .. })));
    }

    #[tokio::test]
    async fn session_carries_cost_and_redirects() {
        let f = fixture();
        let parcel = parcel(&f.parcels).await;

        f.checkout
            .create_session(&parcel.id, Some("http://localhost:5173/"))
            .await
            .unwrap();

        let requests = f.gateway.requests().unwrap();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].amount, parcel.delivery_cost);
        assert_eq!(
            requests[0].success_url,
            "http://localhost:5173/dashboard/payment-success?session_id={CHECKOUT_SESSION_ID}"
        );
        assert_eq!(requests[0].cancel_url, "http://localhost:5173/dashboard/payment-cancelled");
    }

    #[tokio::test]
    async fn reconcile_settles_once() {
        let f = fixture();
        let parcel = parcel(&f.parcels).await;
        let session = f.checkout.create_session(&parcel.id, Some(ORIGIN)).await.unwrap();

        let open = f.checkout.reconcile(&session.id).await;
        assert!(matches!(open, Err(Error::SessionIncomplete { .. })));

        f.gateway.complete(&session.id, true).unwrap();
        let receipt = f.checkout.reconcile(&session.id).await.unwrap();
        assert_eq!(receipt.amount, dec!(80));
        assert_eq!(receipt.parcel_id, parcel.id);
        assert!(receipt.transaction_id.starts_with("pi_mock_"));

        let again = f.checkout.reconcile(&session.id).await;
        assert!(matches!(again, Err(Error::AlreadySettled { .. })));

        let settled = ParcelService::track(&f.parcels, &parcel.id).await.unwrap();
        assert_eq!(settled.payment_status, PaymentStatus::Paid);
        assert_eq!(settled.state.len(), 1);

        let paid_again = f.checkout.create_session(&parcel.id, Some(ORIGIN)).await;
        assert!(matches!(paid_again, Err(Error::AlreadySettled { .. })));
        assert_eq!(f.store.parcel_count().unwrap(), 1);
    }

    #[tokio::test]
    async fn unpaid_and_unlabelled_sessions_are_rejected() {
        let f = fixture();
        let parcel = parcel(&f.parcels).await;
        let session = f.checkout.create_session(&parcel.id, Some(ORIGIN)).await.unwrap();
        f.gateway.complete(&session.id, false).unwrap();

        let unpaid = f.checkout.reconcile(&session.id).await;
        assert!(matches!(unpaid, Err(Error::PaymentNotCompleted { .. })));

        f.gateway
            .stage(SessionOutcome {
                session_id: "cs_orphan".to_string(),
                status: SessionStatus::Complete,
                payment_status: ProviderPaymentStatus::Paid,
                amount_total: None,
                currency: None,
                payment_intent: None,
                payment_method_types: Vec::new(),
                parcel_id: None,
            })
            .unwrap();
        let orphan = f.checkout.reconcile("cs_orphan").await;
        assert!(matches!(orphan, Err(Error::Validation(_))));
    }
}
