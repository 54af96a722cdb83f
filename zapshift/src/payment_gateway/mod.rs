//! Payment gateway abstraction.
//!
//! The checkout orchestrator talks to the provider only through
//! [`PaymentGateway`]: open a hosted checkout session, and later read back
//! what happened to it. [`StripeGateway`] is the production implementation;
//! [`MockPaymentGateway`] keeps sessions in memory for tests and local runs.

pub mod mock;
pub mod stripe;

pub use mock::MockPaymentGateway;
pub use stripe::StripeGateway;

use std::future::Future;
use std::pin::Pin;
use zapshift_core::Result;
use zapshift_core::checkout::{CheckoutRequest, CheckoutSession, SessionOutcome};

/// Boxed future returned by gateway operations.
pub type GatewayFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T>> + Send + 'a>>;

/// Payment gateway trait
///
/// Abstraction over hosted-checkout providers.
pub trait PaymentGateway: Send + Sync {
    /// Opens a checkout session for one parcel.
    ///
    /// # Errors
    ///
    /// Returns `PaymentProvider` when the provider is unreachable or rejects
    /// the request.
    fn create_session(&self, request: CheckoutRequest) -> GatewayFuture<'_, CheckoutSession>;

    /// Reads back a session's state.
    ///
    /// # Errors
    ///
    /// Returns `Validation` for an id that is not a provider session id,
    /// `NotFound` for an unknown session id and `PaymentProvider` for
    /// any other provider failure.
    fn retrieve_session<'a>(&'a self, session_id: &'a str) -> GatewayFuture<'a, SessionOutcome>;
}
