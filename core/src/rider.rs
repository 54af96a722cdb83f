//! Rider applications.
//!
//! Applicants submit once per email and wait as `pending` users. A decision
//! overwrites status and role in one step; no history is kept.

use crate::error::{Error, Result};
use crate::types::ApplicationId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, de};

/// Account role.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Regular customer.
    #[default]
    User,
    /// Approved delivery rider.
    Rider,
}

impl Role {
    /// Wire name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Rider => "rider",
        }
    }
}

/// Review state of an application.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApplicationStatus {
    /// Awaiting a decision.
    #[default]
    Pending,
    /// Accepted; role is rider.
    Approved,
    /// Declined; role is user.
    Rejected,
}

impl ApplicationStatus {
    /// Wire name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
        }
    }
}

/// Reviewer verdict.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Decision {
    /// Promote to rider.
    Approved,
    /// Keep as user.
    Rejected,
}

impl Decision {
    /// Role and status a decision produces.
    #[must_use]
    pub const fn outcome(self) -> (Role, ApplicationStatus) {
        match self {
            Self::Approved => (Role::Rider, ApplicationStatus::Approved),
            Self::Rejected => (Role::User, ApplicationStatus::Rejected),
        }
    }
}

/// Application form as submitted.
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ApplicationForm {
    /// Applicant name.
    pub name: Option<String>,
    /// Applicant email; the uniqueness key.
    pub email: Option<String>,
    /// Contact phone.
    pub phone: Option<String>,
    /// Age in years; a number or a numeric string.
    #[serde(deserialize_with = "age_from_number_or_string")]
    pub age: Option<u8>,
    /// Region (division) the rider will cover.
    pub region: Option<String>,
    /// District the rider will cover.
    pub district: Option<String>,
    /// National id number.
    pub nid: Option<String>,
    /// Bike registration number.
    pub bike_registration: Option<String>,
}

/// Stored rider application (an `employees` record).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RiderApplication {
    /// Identifier.
    #[serde(rename = "_id")]
    pub id: ApplicationId,
    /// Applicant name.
    pub name: String,
    /// Applicant email.
    pub email: String,
    /// Contact phone.
    #[serde(default)]
    pub phone: Option<String>,
    /// Age in years.
    #[serde(default)]
    pub age: Option<u8>,
    /// Covered region.
    #[serde(default)]
    pub region: Option<String>,
    /// Covered district.
    #[serde(default)]
    pub district: Option<String>,
    /// National id number.
    #[serde(default)]
    pub nid: Option<String>,
    /// Bike registration number.
    #[serde(default)]
    pub bike_registration: Option<String>,
    /// Role applied for.
    #[serde(default = "requested_rider")]
    pub requested_role: Role,
    /// Current role.
    #[serde(default)]
    pub role: Role,
    /// Review state.
    #[serde(default)]
    pub status: ApplicationStatus,
    /// Submission time.
    pub created_at: DateTime<Utc>,
    /// Last change.
    pub updated_at: DateTime<Utc>,
}

const fn requested_rider() -> Role {
    Role::Rider
}

/// Browser forms send numbers as strings; blank means absent.
fn age_from_number_or_string<'de, D>(deserializer: D) -> std::result::Result<Option<u8>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Number(u8),
        Text(String),
    }

    match Option::<Raw>::deserialize(deserializer)? {
        None => Ok(None),
        Some(Raw::Number(age)) => Ok(Some(age)),
        Some(Raw::Text(text)) if text.trim().is_empty() => Ok(None),
        Some(Raw::Text(text)) => text
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| de::Error::custom(format!("age '{text}' is not a whole number of years"))),
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

impl RiderApplication {
    /// Validates a form and builds a pending application.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] for a missing name or an email without `@`.
    pub fn submit(id: ApplicationId, form: ApplicationForm, now: DateTime<Utc>) -> Result<Self> {
        let name = non_blank(form.name).ok_or_else(|| Error::validation("name is required"))?;
        let email = non_blank(form.email).ok_or_else(|| Error::validation("email is required"))?;
        if !email.contains('@') {
            return Err(Error::validation(format!("'{email}' is not an email address")));
        }

        Ok(Self {
            id,
            name,
            email,
            phone: non_blank(form.phone),
            age: form.age,
            region: non_blank(form.region),
            district: non_blank(form.district),
            nid: non_blank(form.nid),
            bike_registration: non_blank(form.bike_registration),
            requested_role: Role::Rider,
            role: Role::User,
            status: ApplicationStatus::Pending,
            created_at: now,
            updated_at: now,
        })
    }

    /// Overwrites status and role from a decision.
    pub fn apply_decision(&mut self, decision: Decision, now: DateTime<Utc>) {
        let (role, status) = decision.outcome();
        self.role = role;
        self.status = status;
        self.updated_at = now;
    }
}

/// How existing applications block a new submission.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct ApplicationPolicy {
    /// Compare emails ignoring ASCII case.
    pub case_insensitive_email: bool,
    /// Let a rejected applicant apply again (the record is reset in place).
    pub allow_reapply_after_rejection: bool,
}

/// What to do with a submission that passed the duplicate check.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Admission {
    /// Insert a new record.
    New,
    /// Reset the existing rejected record with this id.
    Reapply(ApplicationId),
}

impl ApplicationPolicy {
    /// True when two emails identify the same applicant.
    #[must_use]
    pub fn same_email(&self, a: &str, b: &str) -> bool {
        if self.case_insensitive_email {
            a.eq_ignore_ascii_case(b)
        } else {
            a == b
        }
    }

    /// Decides whether `email` may submit given the applications already on file.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DuplicateApplication`] when an application for the
    /// same email blocks the submission.
    pub fn admit(&self, email: &str, existing: &[RiderApplication]) -> Result<Admission> {
        let Some(previous) = existing.iter().find(|app| self.same_email(&app.email, email)) else {
            return Ok(Admission::New);
        };
        if self.allow_reapply_after_rejection && previous.status == ApplicationStatus::Rejected {
            return Ok(Admission::Reapply(previous.id.clone()));
        }
        Err(Error::DuplicateApplication {
            email: email.to_string(),
        })
    }
}

/// Filter for employee listings.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct EmployeeFilter {
    /// Role applied for.
    pub requested_role: Option<Role>,
    /// Review state.
    pub status: Option<ApplicationStatus>,
    /// Current role.
    pub role: Option<Role>,
}

impl EmployeeFilter {
    /// True when the application satisfies every set criterion.
    #[must_use]
    pub fn matches(&self, app: &RiderApplication) -> bool {
        self.requested_role.is_none_or(|r| app.requested_role == r)
            && self.status.is_none_or(|s| app.status == s)
            && self.role.is_none_or(|r| app.role == r)
    }
}
