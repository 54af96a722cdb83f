//! Parcel lifecycle: booking, tracking, settlement and delivery reports.

use crate::metrics;
use crate::store::ParcelStore;
use serde::Serialize;
use std::sync::Arc;
use zapshift_core::checkout::SessionOutcome;
use zapshift_core::parcel::{
    self, DailyCount, DEFAULT_DELIVERY_WINDOW_DAYS, ParcelFilter, PaymentFailure,
    PaymentFailurePolicy, Settlement, StatusCount,
};
use zapshift_core::{Clock, Error, Page, Paged, Parcel, ParcelDraft, ParcelId, Result, Tariff};

/// Body of `GET /track-deliveries`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryReport {
    /// Parcel counts per status.
    pub states_result: Vec<StatusCount>,
    /// Deliveries per day over the trailing window.
    pub deliveries_result: Vec<DailyCount>,
}

/// Parcel lifecycle manager.
#[derive(Clone)]
pub struct ParcelService {
    store: Arc<dyn ParcelStore>,
    clock: Arc<dyn Clock>,
    tariff: Tariff,
    failure_policy: PaymentFailurePolicy,
}

impl ParcelService {
    /// Create a new parcel service with the default tariff.
    #[must_use]
    pub fn new(
        store: Arc<dyn ParcelStore>,
        clock: Arc<dyn Clock>,
        failure_policy: PaymentFailurePolicy,
    ) -> Self {
        Self {
            store,
            clock,
            tariff: Tariff::default(),
            failure_policy,
        }
    }

    /// Replaces the rate card.
    #[must_use]
    pub fn with_tariff(mut self, tariff: Tariff) -> Self {
        self.tariff = tariff;
        self
    }

    /// Books a parcel: validates the draft, prices it and stores it pending
    /// and unpaid.
    ///
    /// # Errors
    ///
    /// `Validation` for a bad draft, `Store` when persisting fails.
    pub async fn create(&self, draft: ParcelDraft) -> Result<Parcel> {
        let parcel = Parcel::from_draft(ParcelId::generate(), draft, &self.tariff, self.clock.now())?;
        self.store.insert(&parcel).await?;

        metrics::record_parcel_created();
        tracing::info!(
            parcel_id = %parcel.id,
            delivery_cost = parcel.delivery_cost.minor(),
            sender = %parcel.sender_division,
            receiver = %parcel.receiver_division,
            "Parcel created"
        );
        Ok(parcel)
    }

    /// Looks a parcel up.
    ///
    /// # Errors
    ///
    /// `NotFound` for an unknown id.
    pub async fn track(&self, id: &ParcelId) -> Result<Parcel> {
        self.store
            .find(id)
            .await?
            .ok_or_else(|| Error::not_found("Parcel", id))
    }

    /// Parcels matching `filter`, newest first.
    ///
    /// # Errors
    ///
    /// Propagates store failures.
    pub async fn list(&self, filter: &ParcelFilter, page: Page) -> Result<Paged<Parcel>> {
        self.store.list(filter, page).await
    }

    /// Parcel counts per status.
    ///
    /// # Errors
    ///
    /// Propagates store failures.
    pub async fn status_counts(&self) -> Result<Vec<StatusCount>> {
        self.store.status_counts().await
    }

    /// Deliveries per UTC day over the trailing window, optionally for one
    /// rider.
    ///
    /// # Errors
    ///
    /// Propagates store failures.
    pub async fn deliveries_by_day(&self, rider_email: Option<&str>) -> Result<Vec<DailyCount>> {
        let since = parcel::window_start(self.clock.now(), DEFAULT_DELIVERY_WINDOW_DAYS);
        self.store.deliveries_by_day(rider_email, since).await
    }

    /// Status counts and daily deliveries for all riders.
    ///
    /// # Errors
    ///
    /// Propagates store failures.
    pub async fn delivery_report(&self) -> Result<DeliveryReport> {
        let (states_result, deliveries_result) =
            futures::try_join!(self.status_counts(), self.deliveries_by_day(None))?;
        Ok(DeliveryReport {
            states_result,
            deliveries_result,
        })
    }

    /// Applies a provider outcome to a parcel.
    ///
    /// A paid outcome settles the parcel exactly once. A non-paid outcome is
    /// recorded on the parcel (unless the policy says otherwise) and reported
    /// as `PaymentNotCompleted`.
    ///
    /// # Errors
    ///
    /// `SessionIncomplete`, `PaymentNotCompleted`, `AlreadySettled`,
    /// `NotFound`, or `Store`.
    pub async fn record_payment_settlement(
        &self,
        id: &ParcelId,
        outcome: &SessionOutcome,
    ) -> Result<Parcel> {
        let now = self.clock.now();
        match Settlement::from_outcome(outcome, now) {
            Ok(settlement) => match self.store.settle(id, &settlement).await {
                Ok(parcel) => {
                    metrics::record_payment("settled");
                    tracing::info!(
                        parcel_id = %id,
                        transaction_id = %settlement.transaction_id,
                        "Payment settled"
                    );
                    Ok(parcel)
                }
                Err(err @ Error::AlreadySettled { .. }) => {
                    metrics::record_payment("already_settled");
                    tracing::warn!(parcel_id = %id, "Parcel already settled, ignoring outcome");
                    Err(err)
                }
                Err(err) => Err(err),
            },
            Err(err @ Error::PaymentNotCompleted { .. }) => {
                metrics::record_payment("not_paid");
                if self.failure_policy == PaymentFailurePolicy::Record {
                    let changed = self
                        .store
                        .record_payment_failure(id, &PaymentFailure::at(now))
                        .await?;
                    tracing::info!(parcel_id = %id, changed, "Payment failure recorded");
                }
                Err(err)
            }
            Err(err) => {
                metrics::record_payment("incomplete");
                Err(err)
            }
        }
    }
}
