//! Application state for the ZapShift HTTP server.

use crate::config::Config;
use crate::payment_gateway::PaymentGateway;
use crate::services::{CatalogService, CheckoutService, ParcelService, RiderService};
use crate::store::{StoreHealth, Stores};
use std::sync::Arc;
use zapshift_core::Clock;

/// Application state shared across all HTTP handlers.
///
/// It's cloned (cheaply via Arc) for each request.
#[derive(Clone)]
pub struct AppState {
    /// Reference data
    pub catalog: CatalogService,
    /// Parcel lifecycle
    pub parcels: ParcelService,
    /// Rider applications
    pub riders: RiderService,
    /// Checkout sessions
    pub checkout: CheckoutService,
    /// Store probe for `/ready`
    pub store_health: Arc<dyn StoreHealth>,
    /// Read endpoints answer empty instead of failing
    pub fail_open_reads: bool,
}

impl AppState {
    /// Wires the services over one set of stores and a payment gateway.
    #[must_use]
    pub fn new(
        stores: Stores,
        gateway: Arc<dyn PaymentGateway>,
        clock: Arc<dyn Clock>,
        config: &Config,
    ) -> Self {
        let parcels = ParcelService::new(
            stores.parcels,
            clock.clone(),
            config.policy.payment_failure,
        );
        let checkout = CheckoutService::new(
            gateway,
            parcels.clone(),
            config.checkout.clone(),
            config.payments.currency.clone(),
        );

        Self {
            catalog: CatalogService::new(stores.catalog),
            riders: RiderService::new(stores.applications, clock, config.policy.applications),
            parcels,
            checkout,
            store_health: stores.health,
            fail_open_reads: config.policy.fail_open_reads,
        }
    }
}
