//! MongoDB implementation of the repository traits.
//!
//! Documents are written with camelCase field names, string `_id`s and BSON
//! dates for `createdAt`, `updatedAt` and `state[].time`. Records created
//! outside this service may carry `ObjectId` ids; lookups accept both forms
//! and reads render them as hex strings.

use super::{
    ApplicationStore, CatalogStore, DIVISIONS_COLLECTION, EMPLOYEES_COLLECTION, PARCELS_COLLECTION,
    ParcelStore, REVIEWS_COLLECTION, SERVICES_COLLECTION, StoreHealth, WAREHOUSES_COLLECTION,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::TryStreamExt;
use mongodb::bson::{self, Bson, Document, doc, oid::ObjectId};
use mongodb::error::{ErrorKind, WriteFailure};
use mongodb::options::{ClientOptions, IndexOptions, ReturnDocument};
use mongodb::{Client, Collection, Database, IndexModel};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::future::IntoFuture;
use std::time::Duration;
use zapshift_core::catalog::{Division, Review, Service, Warehouse};
use zapshift_core::parcel::{
    self, DELIVERED, DailyCount, Parcel, ParcelFilter, PaymentFailure, PaymentStatus, Settlement,
    StatusCount,
};
use zapshift_core::rider::{Decision, EmployeeFilter, RiderApplication};
use zapshift_core::{ApplicationId, Error, Page, Paged, ParcelId, Result};

/// Fields stored as BSON dates.
const DATE_FIELDS: [&str; 3] = ["createdAt", "updatedAt", "time"];

/// MongoDB duplicate key error code.
const DUPLICATE_KEY: i32 = 11000;

/// MongoDB-backed repositories.
#[derive(Clone, Debug)]
pub struct MongoStore {
    database: Database,
    operation_timeout: Duration,
}

impl MongoStore {
    /// Connects to `uri` and prepares indexes.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Store`] when the URI is invalid, the server cannot be
    /// reached within `connect_timeout`, or index creation fails.
    pub async fn connect(
        uri: &str,
        database_name: &str,
        connect_timeout: Duration,
        operation_timeout: Duration,
    ) -> Result<Self> {
        let mut options = ClientOptions::parse(uri).await.map_err(Error::store)?;
        options.app_name = Some("zapshift".to_string());
        options.connect_timeout = Some(connect_timeout);
        options.server_selection_timeout = Some(connect_timeout);

        let client = Client::with_options(options).map_err(Error::store)?;
        let store = Self::new(&client, database_name, operation_timeout);
        store.init().await?;
        Ok(store)
    }

    /// Wraps an existing client without touching indexes.
    #[must_use]
    pub fn new(client: &Client, database_name: &str, operation_timeout: Duration) -> Self {
        Self {
            database: client.database(database_name),
            operation_timeout,
        }
    }

    /// Initialize indexes.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Store`] if any index cannot be created.
    pub async fn init(&self) -> Result<()> {
        // One application per email
        let email_index = IndexModel::builder()
            .keys(doc! { "email": 1 })
            .options(IndexOptions::builder().unique(true).build())
            .build();
        self.timed(self.employees().create_index(email_index)).await?;

        let parcel_owner_index = IndexModel::builder()
            .keys(doc! { "createdBy": 1, "createdAt": -1 })
            .build();
        self.timed(self.parcels().create_index(parcel_owner_index))
            .await?;

        let parcel_rider_index = IndexModel::builder()
            .keys(doc! { "riderEmail": 1, "state.title": 1 })
            .build();
        self.timed(self.parcels().create_index(parcel_rider_index))
            .await?;

        Ok(())
    }

    fn collection(&self, name: &str) -> Collection<Document> {
        self.database.collection(name)
    }

    fn parcels(&self) -> Collection<Document> {
        self.collection(PARCELS_COLLECTION)
    }

    fn employees(&self) -> Collection<Document> {
        self.collection(EMPLOYEES_COLLECTION)
    }

    /// Runs one driver operation under the operation timeout.
    async fn timed<A, T>(&self, action: A) -> Result<T>
    where
        A: IntoFuture<Output = mongodb::error::Result<T>>,
    {
        tokio::time::timeout(self.operation_timeout, action.into_future())
            .await
            .map_err(|_| Error::store(format!("operation timed out after {:?}", self.operation_timeout)))?
            .map_err(Error::store)
    }

    /// Collects a cursor under the operation timeout.
    async fn collect(&self, collection: &Collection<Document>, filter: Document) -> Result<Vec<Document>> {
        let cursor = self.timed(collection.find(filter)).await?;
        tokio::time::timeout(self.operation_timeout, cursor.try_collect::<Vec<_>>())
            .await
            .map_err(|_| Error::store("cursor timed out"))?
            .map_err(Error::store)
    }

    /// Reads a whole reference collection, skipping malformed records.
    async fn read_all<T: DeserializeOwned>(&self, name: &'static str) -> Result<Vec<T>> {
        let documents = self.collect(&self.collection(name), doc! {}).await?;
        Ok(decode_all(name, documents))
    }

    async fn find_page<T: DeserializeOwned>(
        &self,
        collection: Collection<Document>,
        name: &'static str,
        filter: Document,
        page: Page,
    ) -> Result<Paged<T>> {
        let total = self
            .timed(collection.count_documents(filter.clone()))
            .await?;
        let cursor = self
            .timed(
                collection
                    .find(filter)
                    .sort(doc! { "createdAt": -1, "_id": -1 })
                    .skip(page.skip)
                    .limit(i64::from(page.limit)),
            )
            .await?;
        let documents: Vec<Document> =
            tokio::time::timeout(self.operation_timeout, cursor.try_collect())
                .await
                .map_err(|_| Error::store("cursor timed out"))?
                .map_err(Error::store)?;

        Ok(Paged {
            items: decode_all(name, documents),
            total,
        })
    }
}

/// Filter matching a string id or its `ObjectId` form.
fn id_filter(id: &str) -> Document {
    match ObjectId::parse_str(id) {
        Ok(oid) => doc! { "_id": { "$in": [oid, id] } },
        Err(_) => doc! { "_id": id },
    }
}

/// Escapes a literal for use inside a regular expression.
fn regex_escape(literal: &str) -> String {
    let mut escaped = String::with_capacity(literal.len());
    for c in literal.chars() {
        if "\\.^$|?*+()[]{}/".contains(c) {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

fn email_filter(email: &str, ignore_case: bool) -> Document {
    if ignore_case {
        doc! { "email": { "$regex": format!("^{}$", regex_escape(email)), "$options": "i" } }
    } else {
        doc! { "email": email }
    }
}

fn parcel_filter(filter: &ParcelFilter) -> Document {
    let mut query = Document::new();
    if let Some(email) = &filter.email {
        query.insert(
            "$or",
            vec![doc! { "createdBy": email.as_str() }, doc! { "senderEmail": email.as_str() }],
        );
    }
    if let Some(status) = filter.status {
        query.insert("status", status.as_str());
    }
    query
}

fn employee_filter(filter: &EmployeeFilter) -> Document {
    let mut query = Document::new();
    if let Some(role) = filter.requested_role {
        query.insert("requestedRole", role.as_str());
    }
    if let Some(status) = filter.status {
        query.insert("status", status.as_str());
    }
    if let Some(role) = filter.role {
        query.insert("role", role.as_str());
    }
    query
}

/// Serializes a record, storing timestamps as BSON dates.
fn encode<T: Serialize>(value: &T) -> Result<Document> {
    let mut document = bson::to_document(value).map_err(Error::store)?;
    dates_to_bson(&mut document);
    Ok(document)
}

fn dates_to_bson(document: &mut Document) {
    for (key, value) in document.iter_mut() {
        match value {
            Bson::String(text) if DATE_FIELDS.contains(&key.as_str()) => {
                if let Ok(at) = DateTime::parse_from_rfc3339(text) {
                    *value = Bson::DateTime(bson::DateTime::from_millis(at.timestamp_millis()));
                }
            }
            Bson::Array(items) => {
                for item in items {
                    if let Bson::Document(inner) = item {
                        dates_to_bson(inner);
                    }
                }
            }
            _ => {}
        }
    }
}

/// Converts driver-native values into the shapes the domain types expect.
fn normalize(document: &mut Document) {
    for (_, value) in document.iter_mut() {
        match value {
            Bson::ObjectId(oid) => *value = Bson::String(oid.to_hex()),
            Bson::DateTime(at) => {
                if let Some(at) = DateTime::<Utc>::from_timestamp_millis(at.timestamp_millis()) {
                    *value = Bson::String(at.to_rfc3339());
                }
            }
            Bson::Array(items) => {
                for item in items {
                    if let Bson::Document(inner) = item {
                        normalize(inner);
                    }
                }
            }
            Bson::Document(inner) => normalize(inner),
            _ => {}
        }
    }
}

fn decode<T: DeserializeOwned>(mut document: Document) -> Result<T> {
    normalize(&mut document);
    bson::from_document(document).map_err(Error::store)
}

fn decode_all<T: DeserializeOwned>(collection: &'static str, documents: Vec<Document>) -> Vec<T> {
    documents
        .into_iter()
        .filter_map(|document| {
            let id = document.get("_id").map(ToString::to_string);
            decode(document)
                .inspect_err(|err| {
                    tracing::warn!(collection, id = ?id, error = %err, "Skipping malformed record");
                })
                .ok()
        })
        .collect()
}

fn is_duplicate_key(err: &mongodb::error::Error) -> bool {
    matches!(
        err.kind.as_ref(),
        ErrorKind::Write(WriteFailure::WriteError(write)) if write.code == DUPLICATE_KEY
    )
}

fn count_of(document: &Document) -> u64 {
    match document.get("count") {
        Some(Bson::Int32(n)) => u64::try_from(*n).unwrap_or(0),
        Some(Bson::Int64(n)) => u64::try_from(*n).unwrap_or(0),
        _ => 0,
    }
}

#[async_trait]
impl CatalogStore for MongoStore {
    async fn divisions(&self) -> Result<Vec<Division>> {
        self.read_all(DIVISIONS_COLLECTION).await
    }

    async fn warehouses(&self) -> Result<Vec<Warehouse>> {
        self.read_all(WAREHOUSES_COLLECTION).await
    }

    async fn services(&self) -> Result<Vec<Service>> {
        self.read_all(SERVICES_COLLECTION).await
    }

    async fn reviews(&self) -> Result<Vec<Review>> {
        self.read_all(REVIEWS_COLLECTION).await
    }
}

#[async_trait]
impl ParcelStore for MongoStore {
    async fn insert(&self, parcel: &Parcel) -> Result<()> {
        let document = encode(parcel)?;
        self.timed(self.parcels().insert_one(document)).await?;
        Ok(())
    }

    async fn find(&self, id: &ParcelId) -> Result<Option<Parcel>> {
        self.timed(self.parcels().find_one(id_filter(id.as_str())))
            .await?
            .map(decode)
            .transpose()
    }

    async fn list(&self, filter: &ParcelFilter, page: Page) -> Result<Paged<Parcel>> {
        self.find_page(self.parcels(), PARCELS_COLLECTION, parcel_filter(filter), page)
            .await
    }

    async fn settle(&self, id: &ParcelId, settlement: &Settlement) -> Result<Parcel> {
        let mut guard = id_filter(id.as_str());
        guard.insert("transactionId", Bson::Null);

        let update = doc! {
            "$set": {
                "paymentStatus": bson::to_bson(&PaymentStatus::Paid).map_err(Error::store)?,
                "paymentMethod": settlement.payment_method.clone(),
                "transactionId": settlement.transaction_id.as_str(),
            },
            "$push": { "state": encode(&settlement.entry)? },
        };

        let updated = self
            .timed(
                self.parcels()
                    .find_one_and_update(guard, update)
                    .return_document(ReturnDocument::After),
            )
            .await?;

        match updated {
            Some(document) => decode(document),
            None => match ParcelStore::find(self, id).await? {
                Some(_) => Err(Error::AlreadySettled {
                    parcel_id: id.to_string(),
                }),
                None => Err(Error::not_found("Parcel", id)),
            },
        }
    }

    async fn record_payment_failure(
        &self,
        id: &ParcelId,
        failure: &PaymentFailure,
    ) -> Result<bool> {
        let mut guard = id_filter(id.as_str());
        guard.insert("transactionId", Bson::Null);

        let update = doc! {
            "$set": {
                "paymentStatus": bson::to_bson(&PaymentStatus::Failed).map_err(Error::store)?,
            },
            "$push": { "state": encode(&failure.entry)? },
        };

        let result = self.timed(self.parcels().update_one(guard, update)).await?;
        Ok(result.modified_count > 0)
    }

    async fn status_counts(&self) -> Result<Vec<StatusCount>> {
        let pipeline = vec![
            doc! { "$group": { "_id": "$status", "count": { "$sum": 1 } } },
            doc! { "$sort": { "_id": 1 } },
        ];
        let cursor = self.timed(self.parcels().aggregate(pipeline)).await?;
        let groups: Vec<Document> = tokio::time::timeout(self.operation_timeout, cursor.try_collect())
            .await
            .map_err(|_| Error::store("cursor timed out"))?
            .map_err(Error::store)?;

        Ok(groups
            .iter()
            .filter_map(|group| {
                let status = group.get_str("_id").ok()?;
                Some(StatusCount {
                    status: status.to_string(),
                    count: count_of(group),
                })
            })
            .collect())
    }

    async fn deliveries_by_day(
        &self,
        rider_email: Option<&str>,
        since: DateTime<Utc>,
    ) -> Result<Vec<DailyCount>> {
        let mut filter = doc! {
            "state": {
                "$elemMatch": {
                    "title": DELIVERED,
                    "time": { "$gte": bson::DateTime::from_millis(since.timestamp_millis()) },
                }
            }
        };
        if let Some(rider) = rider_email {
            filter.insert("riderEmail", rider);
        }

        let documents = self.collect(&self.parcels(), filter).await?;
        let parcels: Vec<Parcel> = decode_all(PARCELS_COLLECTION, documents);
        Ok(parcel::deliveries_by_day(&parcels, rider_email, since))
    }
}

#[async_trait]
impl ApplicationStore for MongoStore {
    async fn find_by_email(
        &self,
        email: &str,
        ignore_case: bool,
    ) -> Result<Vec<RiderApplication>> {
        let documents = self
            .collect(&self.employees(), email_filter(email, ignore_case))
            .await?;
        Ok(decode_all(EMPLOYEES_COLLECTION, documents))
    }

    async fn insert(&self, application: &RiderApplication) -> Result<()> {
        let document = encode(application)?;
        match tokio::time::timeout(
            self.operation_timeout,
            self.employees().insert_one(document).into_future(),
        )
        .await
        {
            Err(_) => Err(Error::store("operation timed out")),
            Ok(Err(err)) if is_duplicate_key(&err) => Err(Error::DuplicateApplication {
                email: application.email.clone(),
            }),
            Ok(Err(err)) => Err(Error::store(err)),
            Ok(Ok(_)) => Ok(()),
        }
    }

    async fn replace(&self, application: &RiderApplication) -> Result<()> {
        let document = encode(application)?;
        let result = self
            .timed(
                self.employees()
                    .replace_one(id_filter(application.id.as_str()), document),
            )
            .await?;
        if result.matched_count == 0 {
            return Err(Error::not_found("Application", &application.id));
        }
        Ok(())
    }

    async fn decide(
        &self,
        id: &ApplicationId,
        decision: Decision,
        now: DateTime<Utc>,
    ) -> Result<Option<RiderApplication>> {
        let (role, status) = decision.outcome();
        let update = doc! {
            "$set": {
                "role": role.as_str(),
                "status": status.as_str(),
                "updatedAt": bson::DateTime::from_millis(now.timestamp_millis()),
            }
        };
        self.timed(
            self.employees()
                .find_one_and_update(id_filter(id.as_str()), update)
                .return_document(ReturnDocument::After),
        )
        .await?
        .map(decode)
        .transpose()
    }

    async fn list(
        &self,
        filter: &EmployeeFilter,
        page: Page,
    ) -> Result<Paged<RiderApplication>> {
        self.find_page(self.employees(), EMPLOYEES_COLLECTION, employee_filter(filter), page)
            .await
    }
}

#[async_trait]
impl StoreHealth for MongoStore {
    async fn ping(&self) -> Result<()> {
        self.timed(self.database.run_command(doc! { "ping": 1 }))
            .await
            .map(|_| ())
    }
}
