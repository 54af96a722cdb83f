//! Repository traits over the `ZapShift` document database.
//!
//! Services only see these traits. Two backends implement all of them:
//!
//! - [`MongoStore`]: the production MongoDB database
//! - [`InMemoryStore`]: process-local maps for tests and local runs
//!
//! Every operation fails with [`zapshift_core::Error::Store`] when the
//! backend errors or exceeds its operation timeout.

pub mod memory;
pub mod mongo;

pub use memory::InMemoryStore;
pub use mongo::MongoStore;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use zapshift_core::catalog::{Division, Review, Service, Warehouse};
use zapshift_core::parcel::{
    DailyCount, Parcel, ParcelFilter, PaymentFailure, Settlement, StatusCount,
};
use zapshift_core::rider::{Decision, EmployeeFilter, RiderApplication};
use zapshift_core::{ApplicationId, Page, Paged, ParcelId, Result};

/// Collection names.
pub const DIVISIONS_COLLECTION: &str = "divisions";
/// Reviews collection.
pub const REVIEWS_COLLECTION: &str = "reviews";
/// Services collection.
pub const SERVICES_COLLECTION: &str = "services";
/// Warehouses collection.
pub const WAREHOUSES_COLLECTION: &str = "wareHouses";
/// Rider applications collection.
pub const EMPLOYEES_COLLECTION: &str = "employees";
/// Parcels collection.
pub const PARCELS_COLLECTION: &str = "parcels";

/// Read-only reference data.
#[async_trait]
pub trait CatalogStore: Send + Sync {
    /// All divisions.
    async fn divisions(&self) -> Result<Vec<Division>>;

    /// All warehouses, including inactive ones.
    async fn warehouses(&self) -> Result<Vec<Warehouse>>;

    /// All marketed services.
    async fn services(&self) -> Result<Vec<Service>>;

    /// All reviews.
    async fn reviews(&self) -> Result<Vec<Review>>;
}

/// Parcel records.
#[async_trait]
pub trait ParcelStore: Send + Sync {
    /// Inserts a new parcel.
    async fn insert(&self, parcel: &Parcel) -> Result<()>;

    /// Looks a parcel up by id.
    async fn find(&self, id: &ParcelId) -> Result<Option<Parcel>>;

    /// Parcels matching `filter`, newest first.
    async fn list(&self, filter: &ParcelFilter, page: Page) -> Result<Paged<Parcel>>;

    /// Applies a settlement atomically, guarded on the transaction id being
    /// unset. Returns the updated parcel.
    ///
    /// Fails with `NotFound` for an unknown id and `AlreadySettled` when the
    /// guard does not hold; the record is unchanged in both cases.
    async fn settle(&self, id: &ParcelId, settlement: &Settlement) -> Result<Parcel>;

    /// Records a failed payment on an unsettled parcel. Returns whether the
    /// parcel changed.
    async fn record_payment_failure(&self, id: &ParcelId, failure: &PaymentFailure)
    -> Result<bool>;

    /// Parcel counts per status, sorted by status.
    async fn status_counts(&self) -> Result<Vec<StatusCount>>;

    /// Deliveries since `since` per UTC day, ascending.
    async fn deliveries_by_day(
        &self,
        rider_email: Option<&str>,
        since: DateTime<Utc>,
    ) -> Result<Vec<DailyCount>>;
}

/// Rider applications (`employees`).
#[async_trait]
pub trait ApplicationStore: Send + Sync {
    /// Applications whose email matches, exactly or ignoring ASCII case.
    async fn find_by_email(&self, email: &str, ignore_case: bool)
    -> Result<Vec<RiderApplication>>;

    /// Inserts a new application; `DuplicateApplication` if the email is taken.
    async fn insert(&self, application: &RiderApplication) -> Result<()>;

    /// Overwrites an existing application (used when a rejected applicant
    /// applies again).
    async fn replace(&self, application: &RiderApplication) -> Result<()>;

    /// Applies a decision and returns the updated record, or `None` for an
    /// unknown id.
    async fn decide(
        &self,
        id: &ApplicationId,
        decision: Decision,
        now: DateTime<Utc>,
    ) -> Result<Option<RiderApplication>>;

    /// Applications matching `filter`, newest first.
    async fn list(&self, filter: &EmployeeFilter, page: Page) -> Result<Paged<RiderApplication>>;
}

/// Connectivity probe used by the readiness endpoint.
#[async_trait]
pub trait StoreHealth: Send + Sync {
    /// Succeeds when the backend answers.
    async fn ping(&self) -> Result<()>;
}

/// The repositories the server runs against, as shared trait objects.
#[derive(Clone)]
pub struct Stores {
    /// Reference data
    pub catalog: Arc<dyn CatalogStore>,
    /// Parcels
    pub parcels: Arc<dyn ParcelStore>,
    /// Rider applications
    pub applications: Arc<dyn ApplicationStore>,
    /// Readiness probe
    pub health: Arc<dyn StoreHealth>,
}

impl Stores {
    /// Serves every repository from one backend.
    #[must_use]
    pub fn from_backend<B>(backend: B) -> Self
    where
        B: CatalogStore + ParcelStore + ApplicationStore + StoreHealth + 'static,
    {
        let backend = Arc::new(backend);
        Self {
            catalog: backend.clone(),
            parcels: backend.clone(),
            applications: backend.clone(),
            health: backend,
        }
    }
}
