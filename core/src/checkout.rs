//! Checkout session types exchanged with the payment provider.

use crate::types::{Money, ParcelId};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Metadata key carrying the parcel id on a provider session.
pub const PARCEL_ID_METADATA: &str = "parcelId";

/// Metadata key carrying the parcel weight on a provider session.
pub const WEIGHT_METADATA: &str = "weight";

/// Everything the provider needs to open a hosted checkout page.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CheckoutRequest {
    /// Parcel being paid for.
    pub parcel_id: ParcelId,
    /// Amount to charge.
    pub amount: Money,
    /// ISO currency code, lowercase.
    pub currency: String,
    /// Line item label shown to the payer.
    pub product_name: String,
    /// Prefills the payer email when known.
    pub customer_email: Option<String>,
    /// Parcel weight, recorded as metadata.
    pub weight: Decimal,
    /// Redirect after payment.
    pub success_url: String,
    /// Redirect after abandoning checkout.
    pub cancel_url: String,
}

/// A created provider session.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckoutSession {
    /// Provider session id.
    pub id: String,
    /// Hosted checkout URL.
    pub url: String,
}

/// Lifecycle state of a provider session.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    /// Awaiting the payer.
    Open,
    /// Payer finished the flow.
    Complete,
    /// Session timed out.
    Expired,
    /// Any state this service does not know about.
    #[serde(other)]
    Unknown,
}

/// Payment state of a provider session.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderPaymentStatus {
    /// Funds captured.
    Paid,
    /// Not (yet) paid.
    Unpaid,
    /// Zero-amount session.
    NoPaymentRequired,
    /// Any state this service does not know about.
    #[serde(other)]
    Unknown,
}

impl ProviderPaymentStatus {
    /// Provider wire name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Paid => "paid",
            Self::Unpaid => "unpaid",
            Self::NoPaymentRequired => "no_payment_required",
            Self::Unknown => "unknown",
        }
    }
}

/// Provider view of a session, as retrieved during reconciliation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SessionOutcome {
    /// Provider session id.
    pub session_id: String,
    /// Session state.
    pub status: SessionStatus,
    /// Payment state.
    pub payment_status: ProviderPaymentStatus,
    /// Total charged.
    pub amount_total: Option<Money>,
    /// ISO currency code.
    pub currency: Option<String>,
    /// Provider payment intent id; becomes the parcel's transaction id.
    pub payment_intent: Option<String>,
    /// Payment method types offered/used.
    pub payment_method_types: Vec<String>,
    /// Parcel id recovered from session metadata.
    pub parcel_id: Option<ParcelId>,
}

/// Result of a successful reconciliation, returned to the client.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SettlementReceipt {
    /// Amount in major units.
    #[serde(with = "rust_decimal::serde::float")]
    pub amount: Decimal,
    /// ISO currency code.
    pub currency: String,
    /// Recorded transaction id.
    pub transaction_id: String,
    /// Settled parcel.
    pub parcel_id: ParcelId,
}
