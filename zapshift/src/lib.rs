//! ZapShift parcel-delivery marketplace API.
//!
//! Customers book parcels (priced server-side), pay through a hosted Stripe
//! Checkout page and track delivery; riders apply to join the fleet and
//! admins approve them; dashboards read aggregate delivery statistics.
//!
//! # Architecture
//!
//! ```text
//!   HTTP (axum)          api/  ─── read_or_empty (fail-open reads)
//!        │
//!        ▼
//!   services/            ParcelService · RiderService · CheckoutService · CatalogService
//!        │                       │                           │
//!        ▼                       ▼                           ▼
//!   zapshift-core        pricing · parcel rules · rider rules (pure)
//!        │
//!        ▼
//!   store/               MongoStore | InMemoryStore      payment_gateway/  Stripe | Mock
//! ```
//!
//! Settlement is exactly-once: the store applies it with a compare-and-set
//! on the parcel's transaction id, so concurrent reconciliations of the same
//! session mutate the parcel once.

#![forbid(unsafe_code)]
#![warn(missing_docs, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod api;
pub mod bootstrap;
pub mod config;
pub mod metrics;
pub mod payment_gateway;
pub mod server;
pub mod services;
pub mod store;

pub use bootstrap::Resources;
pub use config::Config;
pub use server::{AppState, app, build_router};
