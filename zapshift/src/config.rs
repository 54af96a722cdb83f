//! Configuration management for the ZapShift server.
//!
//! Loads configuration from environment variables with sensible defaults.
//! `main` loads a `.env` file first (via `dotenvy`), so both work.

use std::env;
use std::str::FromStr;
use std::time::Duration;
use zapshift_core::parcel::PaymentFailurePolicy;
use zapshift_core::rider::ApplicationPolicy;

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// HTTP server configuration
    pub server: ServerConfig,
    /// Document store configuration
    pub store: StoreConfig,
    /// Payment provider configuration
    pub payments: PaymentConfig,
    /// Checkout redirect allow-list
    pub checkout: CheckoutConfig,
    /// Behavioral policies
    pub policy: PolicyConfig,
}

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Host to bind to
    pub host: String,
    /// Port to bind to
    pub port: u16,
    /// Upper bound for a whole request, in seconds
    pub request_timeout: u64,
    /// Graceful shutdown timeout in seconds
    pub shutdown_timeout: u64,
    /// Prometheus exporter port; no exporter when unset
    pub metrics_port: Option<u16>,
}

/// Which repository implementation backs the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    /// MongoDB (production)
    MongoDb,
    /// Process-local maps; data is lost on restart
    Memory,
}

impl FromStr for StoreBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "mongodb" | "mongo" => Ok(Self::MongoDb),
            "memory" | "in-memory" => Ok(Self::Memory),
            other => Err(format!("unknown store backend '{other}'")),
        }
    }
}

/// Document store configuration
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Backend selection
    pub backend: StoreBackend,
    /// MongoDB connection string
    pub uri: String,
    /// Database name
    pub database: String,
    /// Server selection / connect timeout in seconds
    pub connect_timeout: u64,
    /// Upper bound for each store operation, in milliseconds
    pub operation_timeout_ms: u64,
}

impl StoreConfig {
    /// Per-operation timeout.
    #[must_use]
    pub const fn operation_timeout(&self) -> Duration {
        Duration::from_millis(self.operation_timeout_ms)
    }
}

/// Which payment gateway implementation is used.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentBackend {
    /// Stripe Checkout
    Stripe,
    /// In-process fake; sessions never leave the server
    Mock,
}

impl FromStr for PaymentBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "stripe" => Ok(Self::Stripe),
            "mock" => Ok(Self::Mock),
            other => Err(format!("unknown payment backend '{other}'")),
        }
    }
}

/// Payment provider configuration
#[derive(Clone)]
pub struct PaymentConfig {
    /// Backend selection
    pub backend: PaymentBackend,
    /// Stripe secret key
    pub secret_key: Option<String>,
    /// Stripe API base URL
    pub api_base: String,
    /// HTTP timeout for provider calls, in seconds
    pub timeout: u64,
    /// ISO currency code used for every session
    pub currency: String,
}

impl std::fmt::Debug for PaymentConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PaymentConfig")
            .field("backend", &self.backend)
            .field("secret_key", &self.secret_key.as_ref().map(|_| "<redacted>"))
            .field("api_base", &self.api_base)
            .field("timeout", &self.timeout)
            .field("currency", &self.currency)
            .finish()
    }
}

/// Checkout configuration
#[derive(Debug, Clone, Default)]
pub struct CheckoutConfig {
    /// Origins allowed to receive checkout redirects, without trailing slash
    pub allowed_origins: Vec<String>,
}

impl CheckoutConfig {
    /// Builds the allow-list from raw entries, normalizing each.
    #[must_use]
    pub fn new<I, S>(origins: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut allowed_origins: Vec<String> = origins
            .into_iter()
            .map(|o| normalize_origin(o.as_ref()))
            .filter(|o| !o.is_empty())
            .collect();
        allowed_origins.sort();
        allowed_origins.dedup();
        Self { allowed_origins }
    }

    /// True when `origin` may receive checkout redirects.
    #[must_use]
    pub fn is_allowed(&self, origin: &str) -> bool {
        let origin = normalize_origin(origin);
        self.allowed_origins.iter().any(|allowed| *allowed == origin)
    }
}

fn normalize_origin(origin: &str) -> String {
    origin.trim().trim_end_matches('/').to_ascii_lowercase()
}

/// Behavioral policies
#[derive(Debug, Clone, Copy)]
pub struct PolicyConfig {
    /// Read endpoints answer with an empty result instead of an error
    pub fail_open_reads: bool,
    /// Duplicate-application rules
    pub applications: ApplicationPolicy,
    /// What a non-paid checkout outcome does to the parcel
    pub payment_failure: PaymentFailurePolicy,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            fail_open_reads: true,
            applications: ApplicationPolicy::default(),
            payment_failure: PaymentFailurePolicy::default(),
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup.
    ///
    /// Unparseable values fall back to their defaults with a warning.
    #[must_use]
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let mut origins: Vec<String> = get("ALLOWED_ORIGINS")
            .map(|raw| raw.split(',').map(str::to_string).collect())
            .unwrap_or_default();
        origins.extend(get("CLIENT_URL"));

        Self {
            server: ServerConfig {
                host: get("HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
                port: parse_or(&get, "PORT", 2000),
                request_timeout: parse_or(&get, "REQUEST_TIMEOUT_SECS", 30),
                shutdown_timeout: parse_or(&get, "SHUTDOWN_TIMEOUT", 30),
                metrics_port: get("METRICS_PORT").and_then(|v| v.parse().ok()),
            },
            store: StoreConfig {
                backend: parse_or(&get, "STORE_BACKEND", StoreBackend::MongoDb),
                uri: get("MONGODB_URI")
                    .or_else(|| get("DB"))
                    .unwrap_or_else(|| "mongodb://localhost:27017".to_string()),
                database: get("MONGODB_DATABASE").unwrap_or_else(|| "ZapShift".to_string()),
                connect_timeout: parse_or(&get, "MONGODB_CONNECT_TIMEOUT_SECS", 10),
                operation_timeout_ms: parse_or(&get, "MONGODB_OPERATION_TIMEOUT_MS", 5000),
            },
            payments: PaymentConfig {
                backend: parse_or(&get, "PAYMENT_BACKEND", PaymentBackend::Stripe),
                secret_key: get("STRIPE_SECRET_KEY"),
                api_base: get("STRIPE_API_BASE")
                    .unwrap_or_else(|| "https://api.stripe.com/v1".to_string()),
                timeout: parse_or(&get, "STRIPE_TIMEOUT_SECS", 10),
                currency: get("PAYMENT_CURRENCY")
                    .map_or_else(|| "usd".to_string(), |c| c.trim().to_ascii_lowercase()),
            },
            checkout: CheckoutConfig::new(origins),
            policy: PolicyConfig {
                fail_open_reads: parse_or(&get, "FAIL_OPEN_READS", true),
                applications: ApplicationPolicy {
                    case_insensitive_email: parse_or(&get, "RIDER_EMAIL_CASE_INSENSITIVE", false),
                    allow_reapply_after_rejection: parse_or(
                        &get,
                        "RIDER_ALLOW_REAPPLY_AFTER_REJECTION",
                        false,
                    ),
                },
                payment_failure: parse_or(
                    &get,
                    "PAYMENT_FAILURE_POLICY",
                    PaymentFailurePolicy::Record,
                ),
            },
        }
    }
}

fn parse_or<T, G>(get: &G, key: &str, default: T) -> T
where
    T: FromStr,
    T::Err: std::fmt::Display,
    G: Fn(&str) -> Option<String>,
{
    match get(key) {
        None => default,
        Some(raw) => raw.trim().parse().unwrap_or_else(|err| {
            tracing::warn!(key, value = %raw, error = %err, "Invalid configuration value, using default");
            default
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(pairs: &[(&str, &str)]) -> Config {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults() {
        let config = config(&[]);
        assert_eq!(config.server.port, 2000);
        assert_eq!(config.store.backend, StoreBackend::MongoDb);
        assert_eq!(config.store.database, "ZapShift");
        assert_eq!(config.store.operation_timeout(), Duration::from_secs(5));
        assert_eq!(config.payments.backend, PaymentBackend::Stripe);
        assert_eq!(config.payments.currency, "usd");
        assert!(config.policy.fail_open_reads);
        assert!(!config.policy.applications.case_insensitive_email);
        assert_eq!(config.policy.payment_failure, PaymentFailurePolicy::Record);
        assert!(config.checkout.allowed_origins.is_empty());
    }

    #[test]
    fn legacy_db_variable_is_honored() {
        let config = config(&[("DB", "mongodb+srv://cluster.example.net")]);
        assert_eq!(config.store.uri, "mongodb+srv://cluster.example.net");

        let both = super::Config::from_lookup(|key| match key {
            "DB" => Some("mongodb://legacy".to_string()),
            "MONGODB_URI" => Some("mongodb://preferred".to_string()),
            _ => None,
        });
        assert_eq!(both.store.uri, "mongodb://preferred");
    }

    #[test]
    fn origins_merge_client_url_and_normalize() {
        let config = config(&[
            ("ALLOWED_ORIGINS", "https://a.example.com/, https://B.example.com"),
            ("CLIENT_URL", "http://localhost:5173"),
        ]);
        assert!(config.checkout.is_allowed("https://a.example.com"));
        assert!(config.checkout.is_allowed("https://b.example.com/"));
        assert!(config.checkout.is_allowed("http://localhost:5173"));
        assert!(!config.checkout.is_allowed("https://evil.example.com"));
    }

    #[test]
    fn invalid_values_fall_back() {
        let config = config(&[
            ("PORT", "not-a-port"),
            ("FAIL_OPEN_READS", "false"),
            ("STORE_BACKEND", "memory"),
            ("PAYMENT_FAILURE_POLICY", "ignore"),
            ("RIDER_EMAIL_CASE_INSENSITIVE", "true"),
        ]);
        assert_eq!(config.server.port, 2000);
        assert!(!config.policy.fail_open_reads);
        assert_eq!(config.store.backend, StoreBackend::Memory);
        assert_eq!(config.policy.payment_failure, PaymentFailurePolicy::Ignore);
        assert!(config.policy.applications.case_insensitive_email);
    }

    #[test]
    fn secret_key_is_redacted_in_debug() {
        let config = config(&[("STRIPE_SECRET_KEY", "sk_test_123")]);
        let debug = format!("{:?}", config.payments);
        assert!(!debug.contains("sk_test_123"));
    }
}
