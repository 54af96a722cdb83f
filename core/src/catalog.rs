//! Read-only reference data: divisions, warehouses, services and reviews.
//!
//! Every field except the id defaults when absent; these collections are
//! curated by hand and vary in shape.

use serde::{Deserialize, Serialize};

/// Warehouse status that makes it visible to clients.
pub const ACTIVE: &str = "active";

/// A delivery division (zone).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Division {
    /// Identifier.
    #[serde(rename = "_id")]
    pub id: String,
    /// Division name.
    #[serde(default)]
    pub name: String,
    /// Map longitude.
    #[serde(default)]
    pub longitude: Option<f64>,
    /// Map latitude.
    #[serde(default)]
    pub latitude: Option<f64>,
}

/// A warehouse / service center as stored.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Warehouse {
    /// Identifier.
    #[serde(rename = "_id")]
    pub id: String,
    /// Division.
    #[serde(default)]
    pub region: String,
    /// District.
    #[serde(default)]
    pub district: String,
    /// City.
    #[serde(default)]
    pub city: String,
    /// Areas served.
    #[serde(default, alias = "covered_area")]
    pub covered_area: Vec<String>,
    /// `active` or anything else.
    #[serde(default)]
    pub status: String,
    /// Internal operations diagram.
    #[serde(default)]
    pub flowchart: Option<String>,
    /// Longitude.
    #[serde(default)]
    pub longitude: Option<f64>,
    /// Latitude.
    #[serde(default)]
    pub latitude: Option<f64>,
}

impl Warehouse {
    /// True when the warehouse is open to clients.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.status.eq_ignore_ascii_case(ACTIVE)
    }
}

/// Public view of a warehouse, without internal fields.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WarehouseView {
    /// Identifier.
    #[serde(rename = "_id")]
    pub id: String,
    /// Division.
    pub region: String,
    /// District.
    pub district: String,
    /// City.
    pub city: String,
    /// Areas served.
    pub covered_area: Vec<String>,
    /// Longitude.
    pub longitude: Option<f64>,
    /// Latitude.
    pub latitude: Option<f64>,
}

impl From<Warehouse> for WarehouseView {
    fn from(w: Warehouse) -> Self {
        Self {
            id: w.id,
            region: w.region,
            district: w.district,
            city: w.city,
            covered_area: w.covered_area,
            longitude: w.longitude,
            latitude: w.latitude,
        }
    }
}

/// A branch: the region/district pair of an active warehouse.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Branch {
    /// Division.
    pub region: String,
    /// District.
    pub district: String,
}

impl From<Warehouse> for Branch {
    fn from(w: Warehouse) -> Self {
        Self {
            region: w.region,
            district: w.district,
        }
    }
}

/// A marketed service.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Service {
    /// Identifier.
    #[serde(rename = "_id")]
    pub id: String,
    /// Headline.
    #[serde(default)]
    pub title: String,
    /// Body text.
    #[serde(default)]
    pub description: String,
    /// Icon URL.
    #[serde(default)]
    pub icon: Option<String>,
}

/// A customer review.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Review {
    /// Identifier.
    #[serde(rename = "_id")]
    pub id: String,
    /// Reviewer name.
    #[serde(default)]
    pub user_name: String,
    /// Reviewer email.
    #[serde(default, alias = "user_email")]
    pub user_email: Option<String>,
    /// Reviewer avatar.
    #[serde(default, alias = "user_photoURL")]
    pub user_photo: Option<String>,
    /// Rating out of five.
    #[serde(default, alias = "ratings")]
    pub rating: f64,
    /// Review text.
    #[serde(default)]
    pub review: String,
    /// Review date as recorded.
    #[serde(default)]
    pub date: Option<String>,
    /// Parcel reviewed.
    #[serde(default, alias = "parcel_id")]
    pub parcel_id: Option<String>,
}

/// Active warehouses as public views, in input order.
pub fn active_warehouses(all: impl IntoIterator<Item = Warehouse>) -> Vec<WarehouseView> {
    all.into_iter()
        .filter(Warehouse::is_active)
        .map(WarehouseView::from)
        .collect()
}

/// Region/district pairs of active warehouses, in input order.
pub fn active_branches(all: impl IntoIterator<Item = Warehouse>) -> Vec<Branch> {
    all.into_iter()
        .filter(Warehouse::is_active)
        .map(Branch::from)
        .collect()
}
