//! Rider application workflow.

use crate::metrics;
use crate::store::ApplicationStore;
use std::sync::Arc;
use zapshift_core::rider::{Admission, ApplicationForm, ApplicationPolicy, EmployeeFilter};
use zapshift_core::{ApplicationId, Clock, Decision, Error, Page, Paged, Result, RiderApplication};

/// Submits, decides and lists rider applications.
#[derive(Clone)]
pub struct RiderService {
    store: Arc<dyn ApplicationStore>,
    clock: Arc<dyn Clock>,
    policy: ApplicationPolicy,
}

impl RiderService {
    /// Create a new rider service
    #[must_use]
    pub fn new(
        store: Arc<dyn ApplicationStore>,
        clock: Arc<dyn Clock>,
        policy: ApplicationPolicy,
    ) -> Self {
        Self {
            store,
            clock,
            policy,
        }
    }

    /// Submits an application.
    ///
    /// # Errors
    ///
    /// `Validation` for a bad form, `DuplicateApplication` when the email
    /// already has an application under the configured policy.
    pub async fn submit(&self, form: ApplicationForm) -> Result<RiderApplication> {
        let application = RiderApplication::submit(ApplicationId::generate(), form, self.clock.now())?;
        let existing = self
            .store
            .find_by_email(&application.email, self.policy.case_insensitive_email)
            .await?;

        let admission = match self.policy.admit(&application.email, &existing) {
            Ok(admission) => admission,
            Err(err) => {
                metrics::record_rider_application("duplicate");
                tracing::info!(email = %application.email, "Duplicate rider application rejected");
                return Err(err);
            }
        };

        match admission {
            Admission::New => {
                self.store.insert(&application).await.inspect_err(|err| {
                    if matches!(err, Error::DuplicateApplication { .. }) {
                        metrics::record_rider_application("duplicate");
                    }
                })?;
                metrics::record_rider_application("submitted");
                tracing::info!(
                    application_id = %application.id,
                    email = %application.email,
                    "Rider application submitted"
                );
                Ok(application)
            }
            Admission::Reapply(previous) => {
                let reopened = RiderApplication {
                    id: previous,
                    ..application
                };
                self.store.replace(&reopened).await?;
                metrics::record_rider_application("reapplied");
                tracing::info!(
                    application_id = %reopened.id,
                    email = %reopened.email,
                    "Rejected rider application reopened"
                );
                Ok(reopened)
            }
        }
    }

    /// Approves or rejects an application.
    ///
    /// # Errors
    ///
    /// `NotFound` for an unknown id.
    pub async fn decide(&self, id: &ApplicationId, decision: Decision) -> Result<RiderApplication> {
        let updated = self
            .store
            .decide(id, decision, self.clock.now())
            .await?
            .ok_or_else(|| Error::not_found("Application", id))?;

        metrics::record_rider_application(updated.status.as_str());
        tracing::info!(
            application_id = %id,
            status = updated.status.as_str(),
            role = updated.role.as_str(),
            "Rider application decided"
        );
        Ok(updated)
    }

    /// Applications matching `filter`, newest first.
    ///
    /// # Errors
    ///
    /// Propagates store failures.
    pub async fn find(&self, filter: &EmployeeFilter, page: Page) -> Result<Paged<RiderApplication>> {
        self.store.list(filter, page).await
    }
}
