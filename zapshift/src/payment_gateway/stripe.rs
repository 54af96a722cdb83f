//! Stripe Checkout client.
//!
//! Sessions are created with a single price-data line item and carry the
//! parcel id and weight as metadata so reconciliation can find the parcel
//! from the session alone.

use super::{GatewayFuture, PaymentGateway};
use reqwest::{Client, StatusCode, Url};
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;
use zapshift_core::checkout::{
    CheckoutRequest, CheckoutSession, PARCEL_ID_METADATA, ProviderPaymentStatus, SessionOutcome,
    SessionStatus, WEIGHT_METADATA,
};
use zapshift_core::{Error, Money, ParcelId, Result};

/// Stripe API client.
#[derive(Clone)]
pub struct StripeGateway {
    client: Client,
    secret_key: String,
    api_base: String,
}

impl std::fmt::Debug for StripeGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StripeGateway")
            .field("api_base", &self.api_base)
            .finish_non_exhaustive()
    }
}

/// Session as returned by `POST /checkout/sessions`.
#[derive(Debug, Deserialize)]
struct CreatedSession {
    id: String,
    url: Option<String>,
}

/// Session as returned by `GET /checkout/sessions/:id`.
#[derive(Debug, Deserialize)]
struct RetrievedSession {
    id: String,
    #[serde(default)]
    status: Option<SessionStatus>,
    payment_status: ProviderPaymentStatus,
    #[serde(default)]
    amount_total: Option<i64>,
    #[serde(default)]
    currency: Option<String>,
    /// Either an id or, when expanded, an object with an `id`.
    #[serde(default)]
    payment_intent: Option<serde_json::Value>,
    #[serde(default)]
    payment_method_types: Vec<String>,
    #[serde(default)]
    metadata: HashMap<String, String>,
}

impl From<RetrievedSession> for SessionOutcome {
    fn from(session: RetrievedSession) -> Self {
        let payment_intent = session.payment_intent.and_then(|intent| match intent {
            serde_json::Value::String(id) => Some(id),
            serde_json::Value::Object(object) => object
                .get("id")
                .and_then(serde_json::Value::as_str)
                .map(str::to_string),
            _ => None,
        });

        Self {
            session_id: session.id,
            status: session.status.unwrap_or(SessionStatus::Unknown),
            payment_status: session.payment_status,
            amount_total: session.amount_total.map(Money::from_minor),
            currency: session.currency,
            payment_intent,
            payment_method_types: session.payment_method_types,
            parcel_id: session
                .metadata
                .get(PARCEL_ID_METADATA)
                .filter(|id| !id.is_empty())
                .map(|id| ParcelId::new(id.as_str())),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: Option<String>,
}

impl StripeGateway {
    /// Create a new client.
    ///
    /// # Errors
    ///
    /// Returns `PaymentProvider` if the HTTP client cannot be built.
    pub fn new(
        secret_key: impl Into<String>,
        api_base: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::PaymentProvider(e.to_string()))?;

        Ok(Self {
            client,
            secret_key: secret_key.into(),
            api_base: api_base.into().trim_end_matches('/').to_string(),
        })
    }

    /// Form fields for a session create request.
    fn session_form(request: &CheckoutRequest) -> Vec<(String, String)> {
        let mut form: Vec<(String, String)> = [
            ("mode", "payment".to_string()),
            ("success_url", request.success_url.clone()),
            ("cancel_url", request.cancel_url.clone()),
            ("line_items[0][quantity]", "1".to_string()),
            (
                "line_items[0][price_data][currency]",
                request.currency.clone(),
            ),
            (
                "line_items[0][price_data][unit_amount]",
                request.amount.minor().to_string(),
            ),
            (
                "line_items[0][price_data][product_data][name]",
                request.product_name.clone(),
            ),
            ("client_reference_id", request.parcel_id.to_string()),
        ]
        .into_iter()
        .map(|(key, value)| (key.to_string(), value))
        .collect();
        form.push((
            format!("metadata[{PARCEL_ID_METADATA}]"),
            request.parcel_id.to_string(),
        ));
        form.push((
            format!("metadata[{WEIGHT_METADATA}]"),
            request.weight.normalize().to_string(),
        ));
        if let Some(email) = &request.customer_email {
            form.push(("customer_email".to_string(), email.clone()));
        }
        form
    }

    async fn failure(response: reqwest::Response) -> Error {
        let status = response.status();
        let message = response
            .json::<ErrorEnvelope>()
            .await
            .ok()
            .and_then(|envelope| envelope.error.message)
            .unwrap_or_else(|| "no error message".to_string());
        Error::PaymentProvider(format!("stripe returned {}: {message}", status.as_u16()))
    }

    async fn create(&self, request: CheckoutRequest) -> Result<CheckoutSession> {
        let response = self
            .client
            .post(format!("{}/checkout/sessions", self.api_base))
            .bearer_auth(&self.secret_key)
            .form(&Self::session_form(&request))
            .send()
            .await
            .map_err(|e| Error::PaymentProvider(e.to_string()))?;

        if !response.status().is_success() {
            return Err(Self::failure(response).await);
        }

        let created = response
            .json::<CreatedSession>()
            .await
            .map_err(|e| Error::PaymentProvider(format!("unreadable session: {e}")))?;
        let url = created
            .url
            .ok_or_else(|| Error::PaymentProvider(format!("session {} has no url", created.id)))?;

        tracing::info!(
            parcel_id = %request.parcel_id,
            session_id = %created.id,
            amount = request.amount.minor(),
            "Checkout session created"
        );

        Ok(CheckoutSession {
            id: created.id,
            url,
        })
    }

    /// `{api_base}/checkout/sessions/{session_id}`, with the id as a single
    /// encoded path segment.
    fn session_url(&self, session_id: &str) -> Result<Url> {
        if session_id.is_empty()
            || !session_id
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_')
        {
            return Err(Error::validation(format!(
                "'{session_id}' is not a checkout session id"
            )));
        }
        let mut url = Url::parse(&format!("{}/checkout/sessions", self.api_base))
            .map_err(|e| Error::PaymentProvider(format!("invalid api base: {e}")))?;
        url.path_segments_mut()
            .map_err(|()| Error::PaymentProvider("api base cannot carry a path".to_string()))?
            .push(session_id);
        Ok(url)
    }

    async fn retrieve(&self, session_id: &str) -> Result<SessionOutcome> {
        let url = self.session_url(session_id)?;
        let response = self
            .client
            .get(url)
            .bearer_auth(&self.secret_key)
            .send()
            .await
            .map_err(|e| Error::PaymentProvider(e.to_string()))?;

        match response.status() {
            status if status.is_success() => response
                .json::<RetrievedSession>()
                .await
                .map(SessionOutcome::from)
                .map_err(|e| Error::PaymentProvider(format!("unreadable session: {e}"))),
            StatusCode::NOT_FOUND => Err(Error::not_found("Checkout session", session_id)),
            _ => Err(Self::failure(response).await),
        }
    }
}

impl PaymentGateway for StripeGateway {
    fn create_session(&self, request: CheckoutRequest) -> GatewayFuture<'_, CheckoutSession> {
        Box::pin(self.create(request))
    }

    fn retrieve_session<'a>(&'a self, session_id: &'a str) -> GatewayFuture<'a, SessionOutcome> {
        Box::pin(self.retrieve(session_id))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn request() -> CheckoutRequest {
        CheckoutRequest {
            parcel_id: ParcelId::new("p-9"),
            amount: Money::from_minor(15000),
            currency: "usd".to_string(),
            product_name: "Parcel delivery: Books".to_string(),
            customer_email: Some("sender@example.com".to_string()),
            weight: dec!(2.50),
            success_url: "https://app.example.com/dashboard/payment-success?session_id={CHECKOUT_SESSION_ID}".to_string(),
            cancel_url: "https://app.example.com/dashboard/payment-cancelled".to_string(),
        }
    }

    #[test]
    fn form_carries_amount_and_metadata() {
        let form: HashMap<String, String> = StripeGateway::session_form(&request()).into_iter().collect();
        assert_eq!(form["line_items[0][price_data][unit_amount]"], "15000");
        assert_eq!(form["metadata[parcelId]"], "p-9");
        assert_eq!(form["metadata[weight]"], "2.5");
        assert_eq!(form["customer_email"], "sender@example.com");
        assert_eq!(form["mode"], "payment");
    }

    #[test]
    fn expanded_payment_intent_is_flattened() {
        let session: RetrievedSession = serde_json::from_value(serde_json::json!({
            "id": "cs_1",
            "status": "complete",
            "payment_status": "paid",
            "amount_total": 15000,
            "currency": "usd",
            "payment_intent": { "id": "pi_7", "object": "payment_intent" },
            "payment_method_types": ["card"],
            "metadata": { "parcelId": "p-9", "weight": "2.5" }
        }))
        .unwrap();
        let outcome = SessionOutcome::from(session);
        assert_eq!(outcome.payment_intent.as_deref(), Some("pi_7"));
        assert_eq!(outcome.parcel_id, Some(ParcelId::new("p-9")));
        assert_eq!(outcome.amount_total, Some(Money::from_minor(15000)));
    }

    #[test]
    fn missing_status_is_unknown() {
        let session: RetrievedSession = serde_json::from_value(serde_json::json!({
            "id": "cs_2",
            "status": null,
            "payment_status": "unpaid"
        }))
        .unwrap();
        let outcome = SessionOutcome::from(session);
        assert_eq!(outcome.status, SessionStatus::Unknown);
        assert!(outcome.parcel_id.is_none());
    }

    #[test]
    fn session_ids_stay_in_their_path_segment() {
        let gateway = StripeGateway::new("sk_test", "https://api.stripe.com/v1", Duration::from_secs(1)).unwrap();
        assert_eq!(
            gateway.session_url("cs_test_a1B2").unwrap().as_str(),
            "https://api.stripe.com/v1/checkout/sessions/cs_test_a1B2"
        );
        for hostile in ["../../customers/cus_1", "cs_1?expand[]=customer", "cs/1", ""] {
            assert!(matches!(gateway.session_url(hostile), Err(Error::Validation(_))), "{hostile}");
        }
    }

    #[test]
    fn base_url_trailing_slash_is_trimmed() {
        let gateway = StripeGateway::new("sk_test", "http://localhost:1234/v1/", Duration::from_secs(1)).unwrap();
        assert_eq!(gateway.api_base, "http://localhost:1234/v1");
    }
}
