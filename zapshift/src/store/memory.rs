//! In-memory repositories.
//!
//! Maps behind `RwLock`s, cloned cheaply via `Arc`. Settlement is a
//! check-and-set under the parcel map's write lock, which gives the same
//! exactly-once guarantee as the MongoDB filter on `transactionId`.

use super::{ApplicationStore, CatalogStore, ParcelStore, StoreHealth};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use zapshift_core::catalog::{Division, Review, Service, Warehouse};
use zapshift_core::parcel::{
    self, DailyCount, Parcel, ParcelFilter, PaymentFailure, Settlement, StatusCount,
};
use zapshift_core::rider::{Decision, EmployeeFilter, RiderApplication};
use zapshift_core::{ApplicationId, Error, Page, Paged, ParcelId, Result};

/// Reference data held by an [`InMemoryStore`].
#[derive(Clone, Debug, Default)]
pub struct Catalog {
    /// Divisions
    pub divisions: Vec<Division>,
    /// Warehouses
    pub warehouses: Vec<Warehouse>,
    /// Services
    pub services: Vec<Service>,
    /// Reviews
    pub reviews: Vec<Review>,
}

/// In-memory implementation of every repository trait.
#[derive(Clone, Debug, Default)]
pub struct InMemoryStore {
    catalog: Arc<RwLock<Catalog>>,
    parcels: Arc<RwLock<HashMap<ParcelId, Parcel>>>,
    applications: Arc<RwLock<HashMap<ApplicationId, RiderApplication>>>,
}

fn read<T>(lock: &RwLock<T>) -> Result<RwLockReadGuard<'_, T>> {
    lock.read().map_err(|_| Error::store("in-memory store lock poisoned"))
}

fn write<T>(lock: &RwLock<T>) -> Result<RwLockWriteGuard<'_, T>> {
    lock.write().map_err(|_| Error::store("in-memory store lock poisoned"))
}

impl InMemoryStore {
    /// Create a new empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store seeded with reference data.
    #[must_use]
    pub fn with_catalog(catalog: Catalog) -> Self {
        Self {
            catalog: Arc::new(RwLock::new(catalog)),
            ..Self::default()
        }
    }

    /// Number of stored parcels.
    ///
    /// # Errors
    ///
    /// Fails only if a lock was poisoned.
    pub fn parcel_count(&self) -> Result<usize> {
        Ok(read(&self.parcels)?.len())
    }

    /// Number of stored applications.
    ///
    /// # Errors
    ///
    /// Fails only if a lock was poisoned.
    pub fn application_count(&self) -> Result<usize> {
        Ok(read(&self.applications)?.len())
    }

    /// Stores a parcel as-is, replacing any parcel with the same id. Used to
    /// seed delivered or assigned parcels that this service never creates.
    ///
    /// # Errors
    ///
    /// Fails only if a lock was poisoned.
    pub fn put_parcel(&self, parcel: Parcel) -> Result<()> {
        write(&self.parcels)?.insert(parcel.id.clone(), parcel);
        Ok(())
    }
}

/// Sorts newest first and applies the page.
fn paginate<T, K: Ord>(mut items: Vec<T>, page: Page, created_at: impl Fn(&T) -> K) -> Paged<T> {
    items.sort_by(|a, b| created_at(b).cmp(&created_at(a)));
    let total = items.len() as u64;
    Paged {
        items: page.slice(items),
        total,
    }
}

#[async_trait]
impl CatalogStore for InMemoryStore {
    async fn divisions(&self) -> Result<Vec<Division>> {
        Ok(read(&self.catalog)?.divisions.clone())
    }

    async fn warehouses(&self) -> Result<Vec<Warehouse>> {
        Ok(read(&self.catalog)?.warehouses.clone())
    }

    async fn services(&self) -> Result<Vec<Service>> {
        Ok(read(&self.catalog)?.services.clone())
    }

    async fn reviews(&self) -> Result<Vec<Review>> {
        Ok(read(&self.catalog)?.reviews.clone())
    }
}

#[async_trait]
impl ParcelStore for InMemoryStore {
    async fn insert(&self, parcel: &Parcel) -> Result<()> {
        let mut parcels = write(&self.parcels)?;
        if parcels.contains_key(&parcel.id) {
            return Err(Error::store(format!("duplicate parcel id {}", parcel.id)));
        }
        parcels.insert(parcel.id.clone(), parcel.clone());
        Ok(())
    }

    async fn find(&self, id: &ParcelId) -> Result<Option<Parcel>> {
        Ok(read(&self.parcels)?.get(id).cloned())
    }

    async fn list(&self, filter: &ParcelFilter, page: Page) -> Result<Paged<Parcel>> {
        let matching: Vec<Parcel> = read(&self.parcels)?
            .values()
            .filter(|p| filter.matches(p))
            .cloned()
            .collect();
        Ok(paginate(matching, page, |p| p.created_at))
    }

    async fn settle(&self, id: &ParcelId, settlement: &Settlement) -> Result<Parcel> {
        let mut parcels = write(&self.parcels)?;
        let parcel = parcels
            .get_mut(id)
            .ok_or_else(|| Error::not_found("Parcel", id))?;
        parcel.apply_settlement(settlement)?;
        Ok(parcel.clone())
    }

    async fn record_payment_failure(
        &self,
        id: &ParcelId,
        failure: &PaymentFailure,
    ) -> Result<bool> {
        let mut parcels = write(&self.parcels)?;
        Ok(parcels
            .get_mut(id)
            .is_some_and(|parcel| parcel.apply_payment_failure(failure)))
    }

    async fn status_counts(&self) -> Result<Vec<StatusCount>> {
        Ok(parcel::count_by_status(read(&self.parcels)?.values()))
    }

    async fn deliveries_by_day(
        &self,
        rider_email: Option<&str>,
        since: DateTime<Utc>,
    ) -> Result<Vec<DailyCount>> {
        Ok(parcel::deliveries_by_day(
            read(&self.parcels)?.values(),
            rider_email,
            since,
        ))
    }
}

#[async_trait]
impl ApplicationStore for InMemoryStore {
    async fn find_by_email(
        &self,
        email: &str,
        ignore_case: bool,
    ) -> Result<Vec<RiderApplication>> {
        Ok(read(&self.applications)?
            .values()
            .filter(|app| {
                if ignore_case {
                    app.email.eq_ignore_ascii_case(email)
                } else {
                    app.email == email
                }
            })
            .cloned()
            .collect())
    }

    async fn insert(&self, application: &RiderApplication) -> Result<()> {
        let mut applications = write(&self.applications)?;
        // unique index on email
        if applications.values().any(|app| app.email == application.email) {
            return Err(Error::DuplicateApplication {
                email: application.email.clone(),
            });
        }
        applications.insert(application.id.clone(), application.clone());
        Ok(())
    }

    async fn replace(&self, application: &RiderApplication) -> Result<()> {
        let mut applications = write(&self.applications)?;
        let slot = applications
            .get_mut(&application.id)
            .ok_or_else(|| Error::not_found("Application", &application.id))?;
        *slot = application.clone();
        Ok(())
    }

    async fn decide(
        &self,
        id: &ApplicationId,
        decision: Decision,
        now: DateTime<Utc>,
    ) -> Result<Option<RiderApplication>> {
        let mut applications = write(&self.applications)?;
        Ok(applications.get_mut(id).map(|app| {
            app.apply_decision(decision, now);
            app.clone()
        }))
    }

    async fn list(
        &self,
        filter: &EmployeeFilter,
        page: Page,
    ) -> Result<Paged<RiderApplication>> {
        let matching: Vec<RiderApplication> = read(&self.applications)?
            .values()
            .filter(|app| filter.matches(app))
            .cloned()
            .collect();
        Ok(paginate(matching, page, |app| app.created_at))
    }
}

#[async_trait]
impl StoreHealth for InMemoryStore {
    async fn ping(&self) -> Result<()> {
        read(&self.parcels).map(|_| ())
    }
}
