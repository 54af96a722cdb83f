//! Error taxonomy shared by every workflow.
//!
//! Each variant maps to exactly one HTTP status in `zapshift-web`; services
//! never construct HTTP errors themselves.

use thiserror::Error;

/// Result alias used across the workspace.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised by the parcel, rider and checkout workflows.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Missing or malformed input.
    #[error("validation failed: {0}")]
    Validation(String),

    /// Referenced entity does not exist.
    #[error("{entity} with id {id} not found")]
    NotFound {
        /// Kind of entity that was looked up.
        entity: &'static str,
        /// Identifier that was requested.
        id: String,
    },

    /// An application already exists for this email.
    #[error("an application already exists for {email}")]
    DuplicateApplication {
        /// Email that collided.
        email: String,
    },

    /// The parcel already carries a transaction id.
    #[error("parcel {parcel_id} is already settled")]
    AlreadySettled {
        /// Parcel that was already paid for.
        parcel_id: String,
    },

    /// The provider reports the session as not paid.
    #[error("payment not completed (provider status: {status})")]
    PaymentNotCompleted {
        /// Provider payment status as reported.
        status: String,
    },

    /// The checkout session has not reached the complete state.
    #[error("checkout session {session_id} is not complete")]
    SessionIncomplete {
        /// Provider session id.
        session_id: String,
    },

    /// The caller origin is not allow-listed for checkout.
    #[error("origin {origin} is not allowed to create checkout sessions")]
    ForbiddenOrigin {
        /// Origin header value, or `<missing>`.
        origin: String,
    },

    /// The document store failed or timed out.
    #[error("store error: {0}")]
    Store(String),

    /// The payment provider failed or timed out.
    #[error("payment provider error: {0}")]
    PaymentProvider(String),
}

impl Error {
    /// Shorthand for a validation error.
    #[must_use]
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Shorthand for a not-found error.
    #[must_use]
    pub fn not_found(entity: &'static str, id: impl std::fmt::Display) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    /// Shorthand for a store error.
    #[must_use]
    pub fn store(message: impl std::fmt::Display) -> Self {
        Self::Store(message.to_string())
    }

    /// True for errors caused by the caller rather than by a dependency.
    #[must_use]
    pub const fn is_client_error(&self) -> bool {
        !matches!(self, Self::Store(_) | Self::PaymentProvider(_))
    }
}
