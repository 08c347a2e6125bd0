//! Configuration structures for VMmanager clients.
//!
//! [`Vm6Config`] carries the host, the login credentials, and the transport
//! knobs. It can be built in code, deserialized from JSON, or read from
//! `VM6_*` environment variables.

use crate::client::{ClientConfig, RetryPolicy, DEFAULT_TIMEOUT_SECS};
use crate::Error;
use secrecy::SecretString;
use serde::{Deserialize, Deserializer, Serialize};
use std::env;
use std::fmt;
use std::time::Duration;
use url::Url;
use validator::Validate;

/// Environment variable prefix
pub const ENV_PREFIX: &str = "VM6";

/// Configuration for a VMmanager client instance.
#[derive(Serialize, Deserialize, Validate)]
pub struct Vm6Config {
    /// API base URL
    #[validate(url)]
    pub host: String,

    /// Login email
    #[validate(length(min = 1))]
    pub email: String,

    /// Login password
    #[serde(skip_serializing, deserialize_with = "deserialize_secret")]
    pub password: SecretString,

    /// Whether to verify TLS certificates
    #[serde(default = "default_tls_verify")]
    pub tls_verify: bool,

    /// Request timeout in seconds
    #[validate(range(min = 1, max = 300))]
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Maximum number of 503 retries (unbounded when absent)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_retries: Option<u32>,

    /// Delay before the first 503 retry, doubled on each later retry
    #[validate(range(max = 60_000))]
    #[serde(default)]
    pub retry_delay_ms: u64,
}

const fn default_tls_verify() -> bool {
    true
}

const fn default_request_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

fn deserialize_secret<'de, D>(deserializer: D) -> std::result::Result<SecretString, D::Error>
where
    D: Deserializer<'de>,
{
    String::deserialize(deserializer).map(SecretString::from)
}

impl Vm6Config {
    /// Create a new configuration with required parameters.
    ///
    /// # Errors
    ///
    /// Returns an error if the host is not a URL or the email is empty.
    pub fn new(
        host: impl Into<String>,
        email: impl Into<String>,
        password: impl Into<String>,
    ) -> Result<Self, Error> {
        let config = Self {
            host: host.into(),
            email: email.into(),
            password: SecretString::from(password.into()),
            tls_verify: default_tls_verify(),
            request_timeout_secs: default_request_timeout_secs(),
            max_retries: None,
            retry_delay_ms: 0,
        };

        config
            .validate()
            .map_err(|e| Error::ConfigError(format!("Invalid configuration: {e}")))?;

        Ok(config)
    }

    /// Load configuration from `VM6_*` environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if a required variable is missing, a numeric variable
    /// does not parse, or validation fails.
    pub fn from_env() -> Result<Self, Error> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    ///
    /// Variable names are `VM6_HOST`, `VM6_EMAIL`, `VM6_PASSWORD`,
    /// `VM6_TIMEOUT`, `VM6_TLS_VERIFY`, `VM6_MAX_RETRIES` and `VM6_RETRY_DELAY_MS`.
    ///
    /// # Errors
    ///
    /// See [`Vm6Config::from_env`].
    pub fn from_lookup<F>(lookup: F) -> Result<Self, Error>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(&format!("{ENV_PREFIX}_{key}"));
        let required = |key: &str| {
            get(key).ok_or_else(|| {
                Error::ConfigError(format!("Missing environment variable {ENV_PREFIX}_{key}"))
            })
        };

        let mut config = Self::new(required("HOST")?, required("EMAIL")?, required("PASSWORD")?)?;

        if let Some(timeout) = parse_var(get("TIMEOUT"), "TIMEOUT")? {
            config.request_timeout_secs = timeout;
        }
        if let Some(verify) = get("TLS_VERIFY") {
            config.tls_verify = parse_bool(&verify, "TLS_VERIFY")?;
        }
        config.max_retries = parse_var(get("MAX_RETRIES"), "MAX_RETRIES")?;
        if let Some(delay) = parse_var(get("RETRY_DELAY_MS"), "RETRY_DELAY_MS")? {
            config.retry_delay_ms = delay;
        }

        config
            .validate()
            .map_err(|e| Error::ConfigError(format!("Invalid configuration: {e}")))?;

        Ok(config)
    }

    /// Set whether to verify TLS certificates.
    #[must_use]
    pub const fn with_tls_verify(mut self, verify: bool) -> Self {
        self.tls_verify = verify;
        self
    }

    /// Set request timeout in seconds.
    #[must_use]
    pub const fn with_timeout(mut self, seconds: u64) -> Self {
        self.request_timeout_secs = seconds;
        self
    }

    /// Bound the number of 503 retries.
    #[must_use]
    pub const fn with_max_retries(mut self, retries: u32) -> Self {
        self.max_retries = Some(retries);
        self
    }

    /// Set the delay before the first 503 retry in milliseconds.
    #[must_use]
    pub const fn with_retry_delay_ms(mut self, delay_ms: u64) -> Self {
        self.retry_delay_ms = delay_ms;
        self
    }

    /// Get the request timeout as a Duration.
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Retry policy described by this configuration.
    ///
    /// With a non-zero delay the policy doubles it on every retry, capped at
    /// thirty times the initial delay.
    #[must_use]
    pub fn retry_policy(&self) -> RetryPolicy {
        let mut policy = RetryPolicy::new();
        if let Some(max) = self.max_retries {
            policy = policy.with_max_retries(max);
        }
        if self.retry_delay_ms > 0 {
            let initial = Duration::from_millis(self.retry_delay_ms);
            policy = policy
                .with_initial_delay(initial)
                .with_max_delay(initial * 30)
                .with_backoff_multiplier(2);
        }
        policy
    }

    /// HTTP client configuration described by this configuration.
    #[must_use]
    pub fn http_config(&self) -> ClientConfig {
        ClientConfig::new()
            .with_timeout(self.timeout())
            .with_retry_policy(self.retry_policy())
            .with_tls_verify(self.tls_verify)
    }

    /// Parse and validate the host URL.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL cannot be parsed.
    pub fn parse_host(&self) -> Result<Url, Error> {
        Url::parse(&self.host).map_err(|e| Error::ConfigError(format!("Invalid host URL: {e}")))
    }
}

impl Clone for Vm6Config {
    fn clone(&self) -> Self {
        use secrecy::ExposeSecret;

        Self {
            host: self.host.clone(),
            email: self.email.clone(),
            password: SecretString::from(self.password.expose_secret().to_string()),
            tls_verify: self.tls_verify,
            request_timeout_secs: self.request_timeout_secs,
            max_retries: self.max_retries,
            retry_delay_ms: self.retry_delay_ms,
        }
    }
}

impl fmt::Debug for Vm6Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Vm6Config")
            .field("host", &self.host)
            .field("email", &self.email)
            .field("password", &"[REDACTED]")
            .field("tls_verify", &self.tls_verify)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("max_retries", &self.max_retries)
            .field("retry_delay_ms", &self.retry_delay_ms)
            .finish()
    }
}

fn parse_var<T: std::str::FromStr>(value: Option<String>, key: &str) -> Result<Option<T>, Error> {
    value
        .map(|raw| {
            raw.trim().parse::<T>().map_err(|_| {
                Error::ConfigError(format!("Invalid value for {ENV_PREFIX}_{key}: `{raw}`"))
            })
        })
        .transpose()
}

fn parse_bool(raw: &str, key: &str) -> Result<bool, Error> {
    match raw.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(Error::ConfigError(format!(
            "Invalid value for {ENV_PREFIX}_{key}: `{raw}`"
        ))),
    }
}
