//! Functional core of the ZapShift parcel-delivery API.
//!
//! Everything in this crate is pure: domain types, the pricing calculator,
//! parcel lifecycle rules and rider-application rules. Storage, HTTP and the
//! payment provider live in the `zapshift` crate and call into these rules.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │      Imperative Shell (zapshift)        │  ← axum, MongoDB, Stripe
//! ├─────────────────────────────────────────┤
//! │      Functional Core (this crate)       │
//! │  - pricing: zone/type/weight → Money    │  ← deterministic, no clock
//! │  - parcel: create, settle, aggregate    │  ← time passed in
//! │  - rider: admit, decide                 │  ← policy passed in
//! └─────────────────────────────────────────┘
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod catalog;
pub mod checkout;
pub mod environment;
pub mod error;
pub mod parcel;
pub mod pricing;
pub mod query;
pub mod rider;
pub mod types;

pub use environment::{Clock, FixedClock, SystemClock};
pub use error::{Error, Result};
pub use parcel::{Parcel, ParcelDraft, ParcelStatus, PaymentStatus, StateEntry};
pub use pricing::{ParcelType, Tariff};
pub use query::{Page, Paged};
pub use rider::{ApplicationStatus, Decision, RiderApplication, Role};
pub use types::{ApplicationId, Money, ParcelId, Weight};
