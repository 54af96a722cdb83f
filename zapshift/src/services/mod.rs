//! Workflow orchestration.
//!
//! Services load records through the store traits, apply the rules from
//! `zapshift-core`, persist the result and record metrics:
//!
//! 1. Read current state from the store
//! 2. Apply the pure rule with the injected clock and policy
//! 3. Persist through an atomic store operation
//! 4. Log and count the outcome

pub mod catalog;
pub mod checkout;
pub mod parcels;
pub mod riders;

pub use catalog::CatalogService;
pub use checkout::CheckoutService;
pub use parcels::{DeliveryReport, ParcelService};
pub use riders::RiderService;
