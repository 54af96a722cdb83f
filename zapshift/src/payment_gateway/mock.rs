//! In-process payment gateway for development and testing.
//!
//! Sessions start open and unpaid. Tests (or a local operator) drive them to
//! a final state with [`MockPaymentGateway::complete`] or stage an arbitrary
//! provider answer with [`MockPaymentGateway::stage`].

use super::{GatewayFuture, PaymentGateway};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, RwLock};
use zapshift_core::checkout::{
    CheckoutRequest, CheckoutSession, ProviderPaymentStatus, SessionOutcome, SessionStatus,
};
use zapshift_core::{Error, Result};

/// Sessions kept before the oldest are forgotten.
pub const DEFAULT_RETAINED_SESSIONS: usize = 1024;

#[derive(Debug, Default)]
struct Sessions {
    outcomes: HashMap<String, SessionOutcome>,
    /// Session ids, oldest first.
    order: VecDeque<String>,
    requests: VecDeque<CheckoutRequest>,
}

impl Sessions {
    fn insert(&mut self, outcome: SessionOutcome, capacity: usize) {
        let id = outcome.session_id.clone();
        if self.outcomes.insert(id.clone(), outcome).is_none() {
            self.order.push_back(id);
        }
        while self.order.len() > capacity {
            if let Some(oldest) = self.order.pop_front() {
                self.outcomes.remove(&oldest);
            }
        }
    }

    fn record(&mut self, request: CheckoutRequest, capacity: usize) {
        self.requests.push_back(request);
        while self.requests.len() > capacity {
            self.requests.pop_front();
        }
    }
}

/// Mock payment gateway
///
/// Keeps at most `capacity` sessions and requests; the oldest are dropped
/// first, so a long-running server on the mock backend stays bounded.
#[derive(Clone, Debug)]
pub struct MockPaymentGateway {
    sessions: Arc<RwLock<Sessions>>,
    capacity: usize,
}

impl Default for MockPaymentGateway {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_RETAINED_SESSIONS)
    }
}

fn poisoned() -> Error {
    Error::PaymentProvider("mock gateway lock poisoned".to_string())
}

impl MockPaymentGateway {
    /// Creates a new mock payment gateway
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a gateway that retains at most `capacity` sessions (at least one).
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            sessions: Arc::new(RwLock::new(Sessions::default())),
            capacity: capacity.max(1),
        }
    }

    /// Creates an Arc-wrapped instance for sharing
    #[must_use]
    pub fn shared() -> Arc<dyn PaymentGateway> {
        Arc::new(Self::new())
    }

    /// Finishes a session, paid or not. Returns false for an unknown id.
    ///
    /// # Errors
    ///
    /// Fails only if the lock was poisoned.
    pub fn complete(&self, session_id: &str, paid: bool) -> Result<bool> {
        let mut sessions = self.sessions.write().map_err(|_| poisoned())?;
        let Some(outcome) = sessions.outcomes.get_mut(session_id) else {
            return Ok(false);
        };
        outcome.status = SessionStatus::Complete;
        if paid {
            outcome.payment_status = ProviderPaymentStatus::Paid;
            outcome.payment_intent = Some(format!("pi_mock_{}", uuid::Uuid::new_v4().simple()));
            outcome.payment_method_types = vec!["card".to_string()];
        } else {
            outcome.payment_status = ProviderPaymentStatus::Unpaid;
        }
        Ok(true)
    }

    /// Stages the answer returned for `outcome.session_id`.
    ///
    /// # Errors
    ///
    /// Fails only if the lock was poisoned.
    pub fn stage(&self, outcome: SessionOutcome) -> Result<()> {
        let mut sessions = self.sessions.write().map_err(|_| poisoned())?;
        sessions.insert(outcome, self.capacity);
        Ok(())
    }

    /// Requests received so far, oldest first.
    ///
    /// # Errors
    ///
    /// Fails only if the lock was poisoned.
    pub fn requests(&self) -> Result<Vec<CheckoutRequest>> {
        let sessions = self.sessions.read().map_err(|_| poisoned())?;
        Ok(sessions.requests.iter().cloned().collect())
    }

    fn open(&self, request: CheckoutRequest) -> Result<CheckoutSession> {
        let id = format!("cs_mock_{}", uuid::Uuid::new_v4().simple());
        let outcome = SessionOutcome {
            session_id: id.clone(),
            status: SessionStatus::Open,
            payment_status: ProviderPaymentStatus::Unpaid,
            amount_total: Some(request.amount),
            currency: Some(request.currency.clone()),
            payment_intent: None,
            payment_method_types: Vec::new(),
            parcel_id: Some(request.parcel_id.clone()),
        };

        tracing::info!(
            parcel_id = %request.parcel_id,
            session_id = %id,
            amount = request.amount.minor(),
            "Mock checkout session created"
        );

        let mut sessions = self.sessions.write().map_err(|_| poisoned())?;
        sessions.insert(outcome, self.capacity);
        sessions.record(request, self.capacity);

        Ok(CheckoutSession {
            url: format!("https://checkout.mock/pay/{id}"),
            id,
        })
    }

    fn lookup(&self, session_id: &str) -> Result<SessionOutcome> {
        self.sessions
            .read()
            .map_err(|_| poisoned())?
            .outcomes
            .get(session_id)
            .cloned()
            .ok_or_else(|| Error::not_found("Checkout session", session_id))
    }
}

impl PaymentGateway for MockPaymentGateway {
    fn create_session(&self, request: CheckoutRequest) -> GatewayFuture<'_, CheckoutSession> {
        let result = self.open(request);
        Box::pin(async move { result })
    }

    fn retrieve_session<'a>(&'a self, session_id: &'a str) -> GatewayFuture<'a, SessionOutcome> {
        let result = self.lookup(session_id);
        Box::pin(async move { result })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;
    use zapshift_core::{Money, ParcelId};

    fn request() -> CheckoutRequest {
        CheckoutRequest {
            parcel_id: ParcelId::new("p-1"),
            amount: Money::from_major(80),
            currency: "usd".to_string(),
            product_name: "Parcel delivery".to_string(),
            customer_email: None,
            weight: Decimal::ONE,
            success_url: "http://localhost:5173/dashboard/payment-success".to_string(),
            cancel_url: "http://localhost:5173/dashboard/payment-cancelled".to_string(),
        }
    }

    #[tokio::test]
    async fn session_lifecycle() {
        let gateway = MockPaymentGateway::new();
        let session = gateway.create_session(request()).await.unwrap();
        assert!(session.url.ends_with(&session.id));

        let open = gateway.retrieve_session(&session.id).await.unwrap();
        assert_eq!(open.status, SessionStatus::Open);
        assert_eq!(open.parcel_id, Some(ParcelId::new("p-1")));

        assert!(gateway.complete(&session.id, true).unwrap());
        let paid = gateway.retrieve_session(&session.id).await.unwrap();
        assert_eq!(paid.payment_status, ProviderPaymentStatus::Paid);
        assert!(paid.payment_intent.unwrap().starts_with("pi_mock_"));
        assert_eq!(gateway.requests().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn oldest_sessions_are_forgotten_past_capacity() {
        let gateway = MockPaymentGateway::with_capacity(2);
        let first = gateway.create_session(request()).await.unwrap();
        let second = gateway.create_session(request()).await.unwrap();
        let third = gateway.create_session(request()).await.unwrap();

        assert!(matches!(
            gateway.retrieve_session(&first.id).await,
            Err(Error::NotFound { .. })
        ));
        assert!(gateway.retrieve_session(&second.id).await.is_ok());
        assert!(gateway.retrieve_session(&third.id).await.is_ok());
        assert_eq!(gateway.requests().unwrap().len(), 2);

        assert!(gateway.complete(&second.id, true).unwrap());
        assert!(gateway.retrieve_session(&third.id).await.is_ok());
    }

    #[tokio::test]
    async fn unknown_session_is_not_found() {
        let gateway = MockPaymentGateway::new();
        assert!(!gateway.complete("cs_missing", true).unwrap());
        let result = gateway.retrieve_session("cs_missing").await;
        assert!(matches!(result, Err(Error::NotFound { .. })));
    }
}
