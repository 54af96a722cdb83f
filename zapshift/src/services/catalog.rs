//! Reference data reads.

use crate::store::CatalogStore;
use std::sync::Arc;
use zapshift_core::Result;
use zapshift_core::catalog::{self, Branch, Division, Review, Service, WarehouseView};

/// Read-only catalog queries.
#[derive(Clone)]
pub struct CatalogService {
    store: Arc<dyn CatalogStore>,
}

impl CatalogService {
    /// Create a new catalog service
    #[must_use]
    pub fn new(store: Arc<dyn CatalogStore>) -> Self {
        Self { store }
    }

    /// All reviews.
    ///
    /// # Errors
    ///
    /// Propagates store failures.
    pub async fn reviews(&self) -> Result<Vec<Review>> {
        self.store.reviews().await
    }

    /// All marketed services.
    ///
    /// # Errors
    ///
    /// Propagates store failures.
    pub async fn services(&self) -> Result<Vec<Service>> {
        self.store.services().await
    }

    /// All divisions.
    ///
    /// # Errors
    ///
    /// Propagates store failures.
    pub async fn divisions(&self) -> Result<Vec<Division>> {
        self.store.divisions().await
    }

    /// Active warehouses without internal fields.
    ///
    /// # Errors
    ///
    /// Propagates store failures.
    pub async fn warehouses(&self) -> Result<Vec<WarehouseView>> {
        Ok(catalog::active_warehouses(self.store.warehouses().await?))
    }

    /// Active warehouses projected to `{region, district}`.
    ///
    /// # Errors
    ///
    /// Propagates store failures.
    pub async fn branches(&self) -> Result<Vec<Branch>> {
        Ok(catalog::active_branches(self.store.warehouses().await?))
    }
}
