//! Asynchronous authentication client implementation.

use crate::models::{AuthKey, LoginRequest, LoginResponse};
use crate::Result;
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{info, warn};
use url::Url;
use vm6_core::client::{ClientConfig, RetryPolicy, ServiceClient, ServiceClientBuilder};
use vm6_core::session::SessionToken;
use vm6_core::types::{ApiPath, Service, UserId};

const USER_AGENT: &str = concat!("vm6-auth/", env!("CARGO_PKG_VERSION"));

/// Builder for [`AuthClient`].
#[derive(Debug, Clone)]
pub struct AuthClientBuilder {
    inner: ServiceClientBuilder,
}

impl AuthClientBuilder {
    /// Create a builder for the specified API host.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConfigError`](vm6_core::Error::ConfigError) if the host
    /// is not an absolute `http`/`https` URL.
    pub fn new(host: impl AsRef<str>) -> Result<Self> {
        let builder = ServiceClientBuilder::new(host)?.with_user_agent(USER_AGENT);
        Ok(Self { inner: builder })
    }

    /// Override the retry policy.
    #[must_use]
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.inner = self.inner.with_retry_policy(retry);
        self
    }

    /// Override the HTTP client configuration.
    #[must_use]
    pub fn with_http_config(mut self, config: ClientConfig) -> Self {
        self.inner = self.inner.with_http_config(config);
        self
    }

    /// Start with a session token already stored.
    #[must_use]
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.inner = self.inner.with_token(token);
        self
    }

    /// Share an existing session slot.
    #[must_use]
    pub fn with_session(mut self, session: SessionToken) -> Self {
        self.inner = self.inner.with_session(session);
        self
    }

    /// Build the client.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConfigError`](vm6_core::Error::ConfigError) if the HTTP transport
    /// cannot be built.
    pub fn build(self) -> Result<AuthClient> {
        let inner = self.inner.build()?;
        Ok(AuthClient { inner })
    }
}

/// Asynchronous client for the `auth/v4` endpoints.
#[derive(Debug, Clone)]
pub struct AuthClient {
    inner: ServiceClient,
}

impl AuthClient {
    /// Construct a client directly from the API host.
    ///
    /// # Errors
    ///
    /// Returns an error if the host is invalid.
    pub fn new(host: impl AsRef<str>) -> Result<Self> {
        AuthClientBuilder::new(host)?.build()
    }

    /// Wrap an existing service client, sharing its transport and session.
    #[must_use]
    pub fn from_service_client(inner: ServiceClient) -> Self {
        Self { inner }
    }

    /// Return the base URL.
    #[must_use]
    pub fn base_url(&self) -> &Url {
        self.inner.base_url()
    }

    /// Return the session slot the token is stored in.
    #[must_use]
    pub fn session(&self) -> &SessionToken {
        self.inner.session()
    }

    /// Exchange credentials for a session token and store it.
    ///
    /// Every later request made through a client sharing this session carries
    /// the token. A response without a token leaves the session empty; a
    /// failed login leaves it untouched.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Status`](vm6_core::Error::Status) when the credentials are
    /// rejected, a decode
    /// error when the response is not a login body, and a transport error when
    /// the request cannot be delivered.
    pub async fn login(&self, email: &str, password: &str) -> Result<LoginResponse> {
        let request = LoginRequest { email, password };
        let response: LoginResponse = self
            .send_json(Method::POST, "public/token", Some(&request))
            .await?;

        self.inner.session().set(response.token.as_str());
        if response.has_token() {
            info!(user_id = response.id, "VMmanager session established");
        } else {
            warn!("VMmanager login response carried no token");
        }

        Ok(response)
    }

    /// Fetch the auth key of a user. A response without `key` yields an empty string.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Status`](vm6_core::Error::Status) for rejected requests and a decode or
    /// transport error otherwise.
    pub async fn get_auth_key(&self, user_id: &UserId) -> Result<String> {
        let function = format!("user/{user_id}/key");
        let key: AuthKey = self.send_json::<(), _>(Method::POST, &function, None).await?;
        Ok(key.key)
    }

    async fn send_json<B, R>(&self, method: Method, function: &str, body: Option<&B>) -> Result<R>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let path = ApiPath::for_service(Service::Auth, function);
        let bytes = self.inner.send(method, &path, body).await?;
        ServiceClient::decode(&path, &bytes)
    }
}
