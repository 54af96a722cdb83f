//! Parcel records and their lifecycle rules.
//!
//! A parcel starts `pending` / `unpaid` with an empty history. The only
//! mutations this service performs are payment settlement (exactly once,
//! guarded on the transaction id) and, by policy, recording a failed payment.
//!
//! ```text
//! create ──► pending/unpaid ──settle──► pending/paid  (+ "Payment Successful")
//!                    │
//!                    └──failed outcome──► pending/failed (+ "Payment Failed")
//! ```
//!
//! Storage backends apply [`Settlement`] and [`PaymentFailure`] values
//! produced here, so the rules live in one place.

use crate::checkout::{ProviderPaymentStatus, SessionOutcome, SessionStatus};
use crate::error::{Error, Result};
use crate::pricing::{ParcelType, Tariff, Zone};
use crate::types::{Money, ParcelId, Weight};
use chrono::{DateTime, Duration, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// History title appended on successful settlement.
pub const PAYMENT_SUCCESSFUL: &str = "Payment Successful";

/// History title appended when the provider reports a non-paid outcome.
pub const PAYMENT_FAILED: &str = "Payment Failed";

/// History title that marks a parcel as delivered.
pub const DELIVERED: &str = "Delivered";

/// Default trailing window for delivery statistics.
pub const DEFAULT_DELIVERY_WINDOW_DAYS: i64 = 7;

/// Delivery status of a parcel.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ParcelStatus {
    /// Created, waiting for pickup.
    Pending,
    /// A rider has been assigned.
    Assigned,
    /// Picked up and moving.
    InTransit,
    /// Handed to the receiver.
    Delivered,
    /// Withdrawn before delivery.
    Cancelled,
}

impl ParcelStatus {
    /// Wire name of the status.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Assigned => "assigned",
            Self::InTransit => "in-transit",
            Self::Delivered => "delivered",
            Self::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for ParcelStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ParcelStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "pending" => Ok(Self::Pending),
            "assigned" => Ok(Self::Assigned),
            "in-transit" => Ok(Self::InTransit),
            "delivered" => Ok(Self::Delivered),
            "cancelled" => Ok(Self::Cancelled),
            other => Err(Error::validation(format!("unknown parcel status '{other}'"))),
        }
    }
}

/// Payment state of a parcel.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    /// No successful payment yet.
    #[default]
    Unpaid,
    /// Settled; `transactionId` is set.
    Paid,
    /// The last checkout attempt did not pay.
    Failed,
}

/// One entry of the append-only parcel history.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateEntry {
    /// Event title, e.g. "Payment Successful".
    pub title: String,
    /// Whether the step completed.
    pub completed: bool,
    /// When the entry was recorded.
    pub time: DateTime<Utc>,
}

impl StateEntry {
    /// Builds an entry.
    #[must_use]
    pub fn new(title: impl Into<String>, completed: bool, time: DateTime<Utc>) -> Self {
        Self {
            title: title.into(),
            completed,
            time,
        }
    }
}

/// Parcel as submitted by a client, before validation.
///
/// Numeric fields accept numbers or numeric strings.
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ParcelDraft {
    /// `document` or `non-document`.
    pub parcel_type: Option<String>,
    /// Free-text description.
    pub parcel_name: Option<String>,
    /// Weight in kilograms.
    #[serde(alias = "parcelWeight")]
    pub weight: Option<Decimal>,
    /// Client-side due amount in major units; defaults to the delivery cost.
    pub due: Option<Decimal>,
    /// Sender name.
    pub sender_name: Option<String>,
    /// Sender email.
    pub sender_email: Option<String>,
    /// Sender phone.
    pub sender_phone: Option<String>,
    /// Sender zone.
    #[serde(alias = "senderRegion")]
    pub sender_division: Option<String>,
    /// Sender district / service center.
    pub sender_district: Option<String>,
    /// Sender street address.
    pub sender_address: Option<String>,
    /// Receiver name.
    pub receiver_name: Option<String>,
    /// Receiver phone.
    pub receiver_phone: Option<String>,
    /// Receiver zone.
    #[serde(alias = "receiverRegion")]
    pub receiver_division: Option<String>,
    /// Receiver district / service center.
    pub receiver_district: Option<String>,
    /// Receiver street address.
    pub receiver_address: Option<String>,
    /// Account that created the parcel; defaults to the sender email.
    pub created_by: Option<String>,
}

/// A stored parcel.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Parcel {
    /// Identifier.
    #[serde(rename = "_id")]
    pub id: ParcelId,
    /// Parcel type.
    pub parcel_type: ParcelType,
    /// Free-text description.
    #[serde(default)]
    pub parcel_name: Option<String>,
    /// Weight in kilograms.
    #[serde(default)]
    pub weight: Weight,
    /// Sender name.
    #[serde(default)]
    pub sender_name: Option<String>,
    /// Sender email.
    #[serde(default)]
    pub sender_email: Option<String>,
    /// Sender phone.
    #[serde(default)]
    pub sender_phone: Option<String>,
    /// Sender zone.
    pub sender_division: String,
    /// Sender district.
    #[serde(default)]
    pub sender_district: Option<String>,
    /// Sender address.
    #[serde(default)]
    pub sender_address: Option<String>,
    /// Receiver name.
    #[serde(default)]
    pub receiver_name: Option<String>,
    /// Receiver phone.
    #[serde(default)]
    pub receiver_phone: Option<String>,
    /// Receiver zone.
    pub receiver_division: String,
    /// Receiver district.
    #[serde(default)]
    pub receiver_district: Option<String>,
    /// Receiver address.
    #[serde(default)]
    pub receiver_address: Option<String>,
    /// Creator account email.
    #[serde(default)]
    pub created_by: Option<String>,
    /// Server-computed delivery cost.
    pub delivery_cost: Money,
    /// Amount still due.
    pub due: Money,
    /// Delivery status.
    pub status: ParcelStatus,
    /// Append-only history, oldest first.
    #[serde(default)]
    pub state: Vec<StateEntry>,
    /// Payment status.
    #[serde(default)]
    pub payment_status: PaymentStatus,
    /// Provider payment method types used for settlement.
    #[serde(default)]
    pub payment_method: Vec<String>,
    /// Provider transaction id; set at most once.
    #[serde(default)]
    pub transaction_id: Option<String>,
    /// Rider assigned to deliver the parcel.
    #[serde(default)]
    pub rider_email: Option<String>,
    /// Creation time.
    pub created_at: DateTime<Utc>,
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

impl Parcel {
    /// Validates a draft and builds a fresh pending parcel.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] when a zone, the parcel type or the
    /// sender email is missing, or when any field cannot be priced.
    pub fn from_draft(
        id: ParcelId,
        draft: ParcelDraft,
        tariff: &Tariff,
        now: DateTime<Utc>,
    ) -> Result<Self> {
        let sender_division = non_blank(draft.sender_division)
            .ok_or_else(|| Error::validation("senderDivision is required"))?;
        let receiver_division = non_blank(draft.receiver_division)
            .ok_or_else(|| Error::validation("receiverDivision is required"))?;
        let parcel_type = non_blank(draft.parcel_type)
            .ok_or_else(|| Error::validation("parcelType is required"))?
            .parse::<ParcelType>()?;

        let weight = Weight::new(draft.weight.unwrap_or_default())
            .ok_or_else(|| Error::validation("weight must not be negative"))?;

        let delivery_cost = tariff.price(
            &Zone::parse(&sender_division)?,
            &Zone::parse(&receiver_division)?,
            parcel_type,
            weight,
        )?;

        let due = match draft.due {
            Some(amount) => Money::from_major_decimal(amount)
                .filter(|due| !due.is_negative())
                .ok_or_else(|| Error::validation("due must be a non-negative amount"))?,
            None => delivery_cost,
        };

        let sender_email = non_blank(draft.sender_email)
            .ok_or_else(|| Error::validation("senderEmail is required"))?;
        let created_by = non_blank(draft.created_by).or_else(|| Some(sender_email.clone()));

        Ok(Self {
            id,
            parcel_type,
            parcel_name: non_blank(draft.parcel_name),
            weight,
            sender_name: non_blank(draft.sender_name),
            sender_email: Some(sender_email),
            sender_phone: non_blank(draft.sender_phone),
            sender_division,
            sender_district: non_blank(draft.sender_district),
            sender_address: non_blank(draft.sender_address),
            receiver_name: non_blank(draft.receiver_name),
            receiver_phone: non_blank(draft.receiver_phone),
            receiver_division,
            receiver_district: non_blank(draft.receiver_district),
            receiver_address: non_blank(draft.receiver_address),
            created_by,
            delivery_cost,
            due,
            status: ParcelStatus::Pending,
            state: Vec::new(),
            payment_status: PaymentStatus::Unpaid,
            payment_method: Vec::new(),
            transaction_id: None,
            rider_email: None,
            created_at: now,
        })
    }

    /// True once a transaction id has been recorded.
    #[must_use]
    pub const fn is_settled(&self) -> bool {
        self.transaction_id.is_some()
    }

    /// Applies a settlement if the parcel is not yet settled.
    ///
    /// # Errors
    ///
    /// Returns [`Error::AlreadySettled`] and leaves the parcel untouched when
    /// a transaction id is already present.
    pub fn apply_settlement(&mut self, settlement: &Settlement) -> Result<()> {
        if self.is_settled() {
            return Err(Error::AlreadySettled {
                parcel_id: self.id.to_string(),
            });
        }
        self.payment_status = PaymentStatus::Paid;
        self.payment_method.clone_from(&settlement.payment_method);
        self.transaction_id = Some(settlement.transaction_id.clone());
        self.state.push(settlement.entry.clone());
        Ok(())
    }

    /// Records a failed payment attempt. Returns false (and changes nothing)
    /// when the parcel is already settled.
    pub fn apply_payment_failure(&mut self, failure: &PaymentFailure) -> bool {
        if self.is_settled() {
            return false;
        }
        self.payment_status = PaymentStatus::Failed;
        self.state.push(failure.entry.clone());
        true
    }

    /// Time of the most recent "Delivered" history entry.
    #[must_use]
    pub fn delivered_at(&self) -> Option<DateTime<Utc>> {
        self.state
            .iter()
            .rev()
            .find(|entry| entry.title == DELIVERED)
            .map(|entry| entry.time)
    }
}

/// Payment fields written by a successful settlement.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Settlement {
    /// Provider transaction id (payment intent).
    pub transaction_id: String,
    /// Provider payment method types.
    pub payment_method: Vec<String>,
    /// History entry to append.
    pub entry: StateEntry,
}

impl Settlement {
    /// Derives a settlement from a provider session outcome.
    ///
    /// # Errors
    ///
    /// - [`Error::SessionIncomplete`] when the session is not complete.
    /// - [`Error::PaymentNotCompleted`] when the session did not pay.
    pub fn from_outcome(outcome: &SessionOutcome, now: DateTime<Utc>) -> Result<Self> {
        if outcome.status != SessionStatus::Complete {
            return Err(Error::SessionIncomplete {
                session_id: outcome.session_id.clone(),
            });
        }
        if outcome.payment_status != ProviderPaymentStatus::Paid {
            return Err(Error::PaymentNotCompleted {
                status: outcome.payment_status.as_str().to_string(),
            });
        }
        let transaction_id = outcome
            .payment_intent
            .clone()
            .unwrap_or_else(|| outcome.session_id.clone());

        Ok(Self {
            transaction_id,
            payment_method: outcome.payment_method_types.clone(),
            entry: StateEntry::new(PAYMENT_SUCCESSFUL, true, now),
        })
    }
}

/// History entry written when a checkout did not pay.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PaymentFailure {
    /// History entry to append.
    pub entry: StateEntry,
}

impl PaymentFailure {
    /// Builds the failure record.
    #[must_use]
    pub fn at(now: DateTime<Utc>) -> Self {
        Self {
            entry: StateEntry::new(PAYMENT_FAILED, false, now),
        }
    }
}

/// What to do with a parcel when the provider reports a non-paid outcome.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentFailurePolicy {
    /// Mark `failed` and append a "Payment Failed" entry.
    #[default]
    Record,
    /// Leave the parcel untouched.
    Ignore,
}

impl FromStr for PaymentFailurePolicy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "record" => Ok(Self::Record),
            "ignore" => Ok(Self::Ignore),
            other => Err(Error::validation(format!(
                "unknown payment failure policy '{other}'"
            ))),
        }
    }
}

/// Filter for parcel listings.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ParcelFilter {
    /// Matches the creator or the sender email.
    pub email: Option<String>,
    /// Exact status.
    pub status: Option<ParcelStatus>,
}

impl ParcelFilter {
    /// True when the parcel satisfies every set criterion.
    #[must_use]
    pub fn matches(&self, parcel: &Parcel) -> bool {
        let email_ok = self.email.as_deref().is_none_or(|email| {
            parcel.created_by.as_deref() == Some(email)
                || parcel.sender_email.as_deref() == Some(email)
        });
        let status_ok = self.status.is_none_or(|status| parcel.status == status);
        email_ok && status_ok
    }
}

/// Number of parcels in one status.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusCount {
    /// Status name.
    pub status: String,
    /// Parcels in that status.
    pub count: u64,
}

/// Number of deliveries on one calendar day.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyCount {
    /// UTC day.
    pub date: NaiveDate,
    /// Deliveries completed that day.
    pub count: u64,
}

/// Start of the trailing delivery window ending at `now`.
#[must_use]
pub fn window_start(now: DateTime<Utc>, days: i64) -> DateTime<Utc> {
    now - Duration::days(days)
}

/// Counts parcels per status, sorted by status name.
pub fn count_by_status<'a>(parcels: impl IntoIterator<Item = &'a Parcel>) -> Vec<StatusCount> {
    let mut counts: BTreeMap<&'static str, u64> = BTreeMap::new();
    for parcel in parcels {
        *counts.entry(parcel.status.as_str()).or_default() += 1;
    }
    counts
        .into_iter()
        .map(|(status, count)| StatusCount {
            status: status.to_string(),
            count,
        })
        .collect()
}

/// Counts parcels delivered at or after `since`, bucketed by UTC day,
/// optionally restricted to one rider. Days are ascending.
pub fn deliveries_by_day<'a>(
    parcels: impl IntoIterator<Item = &'a Parcel>,
    rider_email: Option<&str>,
    since: DateTime<Utc>,
) -> Vec<DailyCount> {
    let mut counts: BTreeMap<NaiveDate, u64> = BTreeMap::new();
    for parcel in parcels {
        if rider_email.is_some_and(|rider| parcel.rider_email.as_deref() != Some(rider)) {
            continue;
        }
        if let Some(at) = parcel.delivered_at().filter(|at| *at >= since) {
            *counts.entry(at.date_naive()).or_default() += 1;
        }
    }
    counts
        .into_iter()
        .map(|(date, count)| DailyCount { date, count })
        .collect()
}
