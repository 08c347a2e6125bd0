//! HTTP client utilities and retry logic.
//!
//! This module provides the HTTP client configuration, the 503 retry policy,
//! and [`ServiceClient`], the request routine every endpoint method goes through.

use crate::error::{Error, Result};
use crate::session::{SessionToken, SESSION_HEADER};
use crate::types::ApiPath;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::{Client, ClientBuilder, Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, info, warn};
use url::Url;

/// Default request timeout in seconds
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Default connect timeout in seconds
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;

/// Highest status code treated as success
pub const MAX_SUCCESS_STATUS: u16 = 201;

const USER_AGENT: &str = concat!("vm6-core/", env!("CARGO_PKG_VERSION"));
const JSON_MEDIA_TYPE: &str = "application/json";

/// Retry policy applied to `503 Service Unavailable` responses.
///
/// The default retries forever with no delay between attempts. A bound and an
/// exponential backoff can be configured explicitly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Maximum number of retries, `None` for unbounded
    pub max_retries: Option<u32>,

    /// Delay before the first retry
    pub initial_delay: Duration,

    /// Maximum delay between retries (cap for exponential backoff)
    pub max_delay: Duration,

    /// Backoff multiplier
    pub backoff_multiplier: u32,
}

impl RetryPolicy {
    /// Unbounded retries with no delay.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            max_retries: None,
            initial_delay: Duration::from_millis(0),
            max_delay: Duration::from_millis(0),
            backoff_multiplier: 1,
        }
    }

    /// Create a retry policy that gives up on the first 503.
    #[must_use]
    pub const fn no_retry() -> Self {
        Self::new().with_max_retries(0)
    }

    /// Set the maximum number of retries.
    #[must_use]
    pub const fn with_max_retries(mut self, retries: u32) -> Self {
        self.max_retries = Some(retries);
        self
    }

    /// Remove the retry bound.
    #[must_use]
    pub const fn unbounded(mut self) -> Self {
        self.max_retries = None;
        self
    }

    /// Set the initial delay. Raises the cap if it is lower.
    #[must_use]
    pub const fn with_initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = delay;
        if self.max_delay.as_nanos() < delay.as_nanos() {
            self.max_delay = delay;
        }
        self
    }

    /// Set the maximum delay.
    #[must_use]
    pub const fn with_max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    /// Set the backoff multiplier.
    #[must_use]
    pub const fn with_backoff_multiplier(mut self, multiplier: u32) -> Self {
        self.backoff_multiplier = multiplier;
        self
    }

    /// Calculate delay for a given retry number.
    ///
    /// Uses exponential backoff: delay = min(initial_delay * multiplier^(attempt-1), max_delay)
    #[must_use]
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        if attempt == 0 {
            return Duration::from_secs(0);
        }

        let multiplier = self.backoff_multiplier.saturating_pow(attempt - 1);
        let initial_ms = u64::try_from(self.initial_delay.as_millis()).unwrap_or(u64::MAX);
        let delay = Duration::from_millis(initial_ms.saturating_mul(u64::from(multiplier)));

        std::cmp::min(delay, self.max_delay)
    }

    /// Whether another retry is allowed after `retries` retries.
    #[must_use]
    pub const fn allows_retry(&self, retries: u32) -> bool {
        match self.max_retries {
            Some(max) => retries < max,
            None => true,
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new()
    }
}

/// HTTP client configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Request timeout
    pub timeout: Duration,

    /// Retry policy for 503 responses
    pub retry_policy: RetryPolicy,

    /// Verify TLS certificates
    pub tls_verify: bool,

    /// Enable response compression
    pub enable_compression: bool,
}

impl ClientConfig {
    /// Create a new client configuration with default values.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            retry_policy: RetryPolicy::new(),
            tls_verify: true,
            enable_compression: true,
        }
    }

    /// Set request timeout.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set retry policy.
    #[must_use]
    pub const fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry_policy = policy;
        self
    }

    /// Disable retries.
    #[must_use]
    pub const fn without_retries(mut self) -> Self {
        self.retry_policy = RetryPolicy::no_retry();
        self
    }

    /// Enable or disable TLS certificate verification.
    #[must_use]
    pub const fn with_tls_verify(mut self, verify: bool) -> Self {
        self.tls_verify = verify;
        self
    }

    /// Enable or disable compression.
    #[must_use]
    pub const fn with_compression(mut self, enabled: bool) -> Self {
        self.enable_compression = enabled;
        self
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for [`ServiceClient`].
#[derive(Debug, Clone)]
pub struct ServiceClientBuilder {
    base_url: Url,
    http_config: ClientConfig,
    user_agent: String,
    session: SessionToken,
}

impl ServiceClientBuilder {
    /// Create a builder for the given API host.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConfigError`] if the host is not an absolute `http`/`https` URL.
    pub fn new(host: impl AsRef<str>) -> Result<Self> {
        Ok(Self {
            base_url: parse_host(host.as_ref())?,
            http_config: ClientConfig::new(),
            user_agent: USER_AGENT.to_string(),
            session: SessionToken::new(),
        })
    }

    /// Override the HTTP client configuration.
    #[must_use]
    pub fn with_http_config(mut self, config: ClientConfig) -> Self {
        self.http_config = config;
        self
    }

    /// Override the retry policy.
    #[must_use]
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.http_config.retry_policy = retry;
        self
    }

    /// Override the request timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.http_config.timeout = timeout;
        self
    }

    /// Override the `User-Agent` header.
    #[must_use]
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Start with a session token already stored.
    #[must_use]
    pub fn with_token(self, token: impl Into<String>) -> Self {
        self.session.set(token);
        self
    }

    /// Share an existing session slot.
    #[must_use]
    pub fn with_session(mut self, session: SessionToken) -> Self {
        self.session = session;
        self
    }

    /// Build the client.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConfigError`] if the HTTP transport cannot be built.
    pub fn build(self) -> Result<ServiceClient> {
        let mut builder = ClientBuilder::new()
            .user_agent(self.user_agent)
            .timeout(self.http_config.timeout)
            .connect_timeout(Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS))
            .gzip(self.http_config.enable_compression);

        if !self.http_config.tls_verify {
            warn!(host = %self.base_url, "TLS verification disabled for VMmanager client");
            builder = builder.danger_accept_invalid_certs(true);
        }

        let http = builder.build().map_err(|err| {
            Error::ConfigError(format!("Failed to build HTTP client: {err}"))
        })?;

        Ok(ServiceClient {
            http,
            base_url: self.base_url,
            retry_policy: self.http_config.retry_policy,
            session: self.session,
        })
    }
}

/// Shared HTTP client holding the host, the transport, and the session token.
#[derive(Debug, Clone)]
pub struct ServiceClient {
    http: Client,
    base_url: Url,
    retry_policy: RetryPolicy,
    session: SessionToken,
}

impl ServiceClient {
    /// Construct a client with default settings.
    ///
    /// # Errors
    ///
    /// Returns an error if the host is invalid.
    pub fn new(host: impl AsRef<str>) -> Result<Self> {
        ServiceClientBuilder::new(host)?.build()
    }

    /// Start a builder for the given host.
    ///
    /// # Errors
    ///
    /// Returns an error if the host is invalid.
    pub fn builder(host: impl AsRef<str>) -> Result<ServiceClientBuilder> {
        ServiceClientBuilder::new(host)
    }

    /// Return the base URL (always ends with `/`).
    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Return the retry policy.
    #[must_use]
    pub const fn retry_policy(&self) -> &RetryPolicy {
        &self.retry_policy
    }

    /// Return the session slot shared by clones of this client.
    #[must_use]
    pub fn session(&self) -> &SessionToken {
        &self.session
    }

    /// Build the absolute URL for a request path.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidEndpoint`] if the path cannot be joined to the host.
    pub fn url_for(&self, path: &ApiPath) -> Result<Url> {
        let relative = path.to_string();
        self.base_url
            .join(&relative)
            .map_err(|err| Error::InvalidEndpoint(format!("Invalid path `{relative}`: {err}")))
    }

    /// Send a request and return the raw response body.
    ///
    /// The body, if any, is encoded as JSON once and resent on every attempt.
    /// `Accept: application/json` is always sent and the session token is
    /// attached when one is stored. A 503 is retried according to the
    /// [`RetryPolicy`]; any other status above 201 is returned as
    /// [`Error::Status`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::Status`] for rejected responses, [`Error::Encode`] when
    /// the body cannot be serialized, and a transport error when the request
    /// cannot be delivered.
    pub async fn send<B>(&self, method: Method, path: &ApiPath, body: Option<&B>) -> Result<Vec<u8>>
    where
        B: Serialize + ?Sized,
    {
        let url = self.url_for(path)?;
        let payload = body
            .map(serde_json::to_vec)
            .transpose()
            .map_err(|err| Error::Encode(format!("`{path}`: {err}")))?;

        let mut retries: u32 = 0;

        loop {
            let mut request = self
                .http
                .request(method.clone(), url.clone())
                .header(ACCEPT, JSON_MEDIA_TYPE);

            if let Some(token) = self.session.header_value() {
                request = request.header(SESSION_HEADER, token);
            }

            if let Some(bytes) = &payload {
                request = request
                    .header(CONTENT_TYPE, JSON_MEDIA_TYPE)
                    .body(bytes.clone());
            }

            info!(method = %method, path = %path, attempt = retries, "Sending VMmanager request");

            let response = request.send().await?;
            let status = response.status();
            let body = response.bytes().await?.to_vec();

            if status == StatusCode::SERVICE_UNAVAILABLE {
                if !self.retry_policy.allows_retry(retries) {
                    warn!(path = %path, retries, "Giving up after repeated 503 responses");
                    return Err(status_error(status, &body));
                }

                retries = retries.saturating_add(1);
                let delay = self.retry_policy.delay_for_attempt(retries);
                warn!(path = %path, retries, "VMmanager service unavailable, retrying");
                if delay > Duration::from_millis(0) {
                    debug!("Retrying VMmanager request after {:?}", delay);
                    sleep(delay).await;
                }
                continue;
            }

            if status.as_u16() > MAX_SUCCESS_STATUS {
                debug!(path = %path, status = status.as_u16(), "VMmanager request rejected");
                return Err(status_error(status, &body));
            }

            debug!(path = %path, status = status.as_u16(), bytes = body.len(), "VMmanager response received");
            return Ok(body);
        }
    }

    /// Decode a response body, naming the path in the error.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Decode`] if the body does not match `R`.
    pub fn decode<R>(path: &ApiPath, body: &[u8]) -> Result<R>
    where
        R: DeserializeOwned,
    {
        serde_json::from_slice(body)
            .map_err(|err| Error::Decode(format!("Failed to parse response for `{path}`: {err}")))
    }
}

fn status_error(status: StatusCode, body: &[u8]) -> Error {
    Error::Status {
        status: status.as_u16(),
        body: String::from_utf8_lossy(body).into_owned(),
    }
}

fn parse_host(host: &str) -> Result<Url> {
    let mut url = Url::parse(host)
        .map_err(|err| Error::ConfigError(format!("Invalid host URL `{host}`: {err}")))?;

    if !matches!(url.scheme(), "http" | "https") {
        return Err(Error::ConfigError(format!(
            "Unsupported scheme `{}` in host URL `{host}`",
            url.scheme()
        )));
    }

    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }

    Ok(url)
}
