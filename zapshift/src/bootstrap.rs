//! Infrastructure setup.
//!
//! Turns a [`Config`] into the resources [`AppState`](crate::server::AppState)
//! is built from:
//!
//! 1. Connect the document store (and create its indexes)
//! 2. Build the payment gateway client
//! 3. Pick the clock

use crate::config::{Config, PaymentBackend, StoreBackend};
use crate::payment_gateway::{MockPaymentGateway, PaymentGateway, StripeGateway};
use crate::store::{InMemoryStore, MongoStore, Stores};
use anyhow::Context;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use zapshift_core::{Clock, SystemClock};

/// Everything the server needs from the outside world.
#[derive(Clone)]
pub struct Resources {
    /// Repositories
    pub stores: Stores,
    /// Payment provider
    pub gateway: Arc<dyn PaymentGateway>,
    /// Wall clock
    pub clock: Arc<dyn Clock>,
}

impl Resources {
    /// Initialize all infrastructure resources from configuration.
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - MongoDB cannot be reached or its indexes cannot be created
    /// - the Stripe backend is selected without a secret key
    /// - the HTTP client for the provider cannot be built
    pub async fn from_config(config: &Config) -> anyhow::Result<Self> {
        let stores = match config.store.backend {
            StoreBackend::MongoDb => {
                info!(database = %config.store.database, "Connecting to MongoDB...");
                let store = MongoStore::connect(
                    &config.store.uri,
                    &config.store.database,
                    Duration::from_secs(config.store.connect_timeout),
                    config.store.operation_timeout(),
                )
                .await
                .context("failed to connect to MongoDB")?;
                info!("MongoDB connected");
                Stores::from_backend(store)
            }
            StoreBackend::Memory => {
                warn!("Using the in-memory store; data is lost on restart");
                Stores::from_backend(InMemoryStore::new())
            }
        };

        let gateway: Arc<dyn PaymentGateway> = match config.payments.backend {
            PaymentBackend::Stripe => {
                let secret_key = config
                    .payments
                    .secret_key
                    .clone()
                    .context("STRIPE_SECRET_KEY is required when PAYMENT_BACKEND=stripe")?;
                let gateway = StripeGateway::new(
                    secret_key,
                    config.payments.api_base.clone(),
                    Duration::from_secs(config.payments.timeout),
                )
                .context("failed to build the Stripe client")?;
                info!(api_base = %config.payments.api_base, "Payment gateway initialized (Stripe)");
                Arc::new(gateway)
            }
            PaymentBackend::Mock => {
                warn!("Payment gateway initialized (using mock)");
                MockPaymentGateway::shared()
            }
        };

        Ok(Self {
            stores,
            gateway,
            clock: Arc::new(SystemClock),
        })
    }
}
