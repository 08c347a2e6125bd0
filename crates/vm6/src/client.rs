//! The [`Vm6Client`] facade.
//!
//! One client owns the credentials and a single [`ServiceClient`]; the auth
//! and VM clients are views over it, so the token stored by [`Vm6Client::login`]
//! is sent by every later call.

use crate::Result;
use reqwest::Method;
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use std::fmt;
use std::time::Duration;
use tracing::info;
use url::Url;
use vm6_auth::{AuthClient, LoginResponse};
use vm6_core::client::{ClientConfig, RetryPolicy, ServiceClient, ServiceClientBuilder};
use vm6_core::config::Vm6Config;
use vm6_core::types::{ApiPath, HostId, UserId};
use vm6_core::JsonObject;
use vm6_vm::{HostAction, VmClient};

const USER_AGENT: &str = concat!("vm6/", env!("CARGO_PKG_VERSION"));

/// Builder for [`Vm6Client`].
#[derive(Debug)]
pub struct Vm6ClientBuilder {
    inner: ServiceClientBuilder,
    email: String,
    password: SecretString,
}

impl Vm6ClientBuilder {
    /// Create a builder for the given host and credentials.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConfigError`](crate::Error::ConfigError) if the host is
    /// not an absolute `http`/`https` URL.
    pub fn new(
        host: impl AsRef<str>,
        email: impl Into<String>,
        password: impl Into<String>,
    ) -> Result<Self> {
        let inner = ServiceClientBuilder::new(host)?.with_user_agent(USER_AGENT);
        Ok(Self {
            inner,
            email: email.into(),
            password: SecretString::from(password.into()),
        })
    }

    /// Override the retry policy applied to 503 responses.
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

    /// Override the request timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.inner = self.inner.with_timeout(timeout);
        self
    }

    /// Start authenticated with a previously obtained token.
    #[must_use]
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.inner = self.inner.with_token(token);
        self
    }

    /// Build the client.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConfigError`](crate::Error::ConfigError) if the HTTP transport
    /// cannot be built.
    pub fn build(self) -> Result<Vm6Client> {
        let http = self.inner.build()?;
        Ok(Vm6Client {
            auth: AuthClient::from_service_client(http.clone()),
            vm: VmClient::from_service_client(http.clone()),
            http,
            email: self.email,
            password: self.password,
        })
    }
}

/// Client for the VMmanager 6 API.
pub struct Vm6Client {
    http: ServiceClient,
    auth: AuthClient,
    vm: VmClient,
    email: String,
    password: SecretString,
}

impl Vm6Client {
    /// Construct an unauthenticated client with default settings.
    ///
    /// # Errors
    ///
    /// Returns an error if the host is invalid.
    pub fn new(
        host: impl AsRef<str>,
        email: impl Into<String>,
        password: impl Into<String>,
    ) -> Result<Self> {
        Vm6ClientBuilder::new(host, email, password)?.build()
    }

    /// Start a builder for the given host and credentials.
    ///
    /// # Errors
    ///
    /// Returns an error if the host is invalid.
    pub fn builder(
        host: impl AsRef<str>,
        email: impl Into<String>,
        password: impl Into<String>,
    ) -> Result<Vm6ClientBuilder> {
        Vm6ClientBuilder::new(host, email, password)
    }

    /// Construct a client from a validated configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the host is invalid or the transport cannot be built.
    pub fn from_config(config: &Vm6Config) -> Result<Self> {
        Vm6ClientBuilder::new(
            &config.host,
            config.email.clone(),
            config.password.expose_secret(),
        )?
        .with_http_config(config.http_config())
        .build()
    }

    /// Construct a client from `VM6_*` environment variables.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConfigError`](crate::Error::ConfigError) if a variable is missing
    /// or invalid.
    pub fn from_env() -> Result<Self> {
        Self::from_config(&Vm6Config::from_env()?)
    }

    /// Return the API base URL.
    #[must_use]
    pub fn host(&self) -> &Url {
        self.http.base_url()
    }

    /// Return the login email.
    #[must_use]
    pub fn email(&self) -> &str {
        &self.email
    }

    /// Whether a session token is stored.
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.http.session().is_set()
    }

    /// Authenticate with the stored credentials and keep the session token.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Status`](crate::Error::Status) when the credentials are rejected.
    /// The stored
    /// token is left unchanged on any error.
    pub async fn login(&self) -> Result<LoginResponse> {
        info!(email = %self.email, "Logging in to VMmanager");
        self.auth
            .login(&self.email, self.password.expose_secret())
            .await
    }

    /// Forget the session token locally. No request is made.
    pub fn logout(&self) {
        self.http.session().clear();
    }

    /// Send an arbitrary request to `{host}/{service}/{version}/{function}`.
    ///
    /// Returns the raw body when the status is at most 201.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Status`](crate::Error::Status) for any other status except 503, which is
    /// retried according to the [`RetryPolicy`].
    pub async fn send<B>(
        &self,
        method: Method,
        version: &str,
        service: &str,
        function: &str,
        body: Option<&B>,
    ) -> Result<Vec<u8>>
    where
        B: Serialize + ?Sized,
    {
        let path = ApiPath::new(service, version, function);
        self.http.send(method, &path, body).await
    }

    /// Fetch the auth key of a user.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Status`](crate::Error::Status) when the API rejects the request.
    pub async fn get_auth_key(&self, user_id: impl Into<UserId>) -> Result<String> {
        self.auth.get_auth_key(&user_id.into()).await
    }

    /// Create a host; returns the decoded response.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Status`](crate::Error::Status) when the API rejects the
    /// request and a decode error when the response is not a JSON object.
    pub async fn create(&self, params: &JsonObject) -> Result<JsonObject> {
        self.vm.create_host(params).await
    }

    /// Remove a host.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Status`](crate::Error::Status) when the API rejects the request.
    pub async fn remove(&self, id: impl Into<HostId>) -> Result<()> {
        self.vm.remove_host(&id.into()).await
    }

    /// Fetch a host.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Status`](crate::Error::Status) when the API rejects the
    /// request and a decode error when the response is not a JSON object.
    pub async fn vm(&self, id: impl Into<HostId>) -> Result<JsonObject> {
        self.vm.get_host(&id.into()).await
    }

    /// Boot a host.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Status`](crate::Error::Status) when the API rejects the request.
    pub async fn start(&self, id: impl Into<HostId>) -> Result<()> {
        self.vm.power(&id.into(), HostAction::Start).await
    }

    /// Force a host off.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Status`](crate::Error::Status) when the API rejects the request.
    pub async fn stop(&self, id: impl Into<HostId>) -> Result<()> {
        self.vm.power(&id.into(), HostAction::Stop).await
    }

    /// Force a host to reboot.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Status`](crate::Error::Status) when the API rejects the request.
    pub async fn restart(&self, id: impl Into<HostId>) -> Result<()> {
        self.vm.power(&id.into(), HostAction::Restart).await
    }

    /// Fetch the VNC console settings of a host.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Status`](crate::Error::Status) when the API rejects the
    /// request and a decode error when the response is not a JSON object.
    pub async fn vnc_settings(&self, id: impl Into<HostId>) -> Result<JsonObject> {
        self.vm.vnc_settings(&id.into()).await
    }

    /// Authentication endpoints sharing this client's session.
    #[must_use]
    pub fn auth(&self) -> &AuthClient {
        &self.auth
    }

    /// Host endpoints sharing this client's session.
    #[must_use]
    pub fn hosts(&self) -> &VmClient {
        &self.vm
    }
}

impl fmt::Debug for Vm6Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Vm6Client")
            .field("host", &self.http.base_url().as_str())
            .field("email", &self.email)
            .field("authenticated", &self.is_authenticated())
            .finish_non_exhaustive()
    }
}
