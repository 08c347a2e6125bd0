//! Asynchronous VM client implementation.

use crate::models::HostAction;
use crate::Result;
use reqwest::Method;
use serde::Serialize;
use tracing::debug;
use url::Url;
use vm6_core::client::{ClientConfig, RetryPolicy, ServiceClient, ServiceClientBuilder};
use vm6_core::session::SessionToken;
use vm6_core::types::{ApiPath, HostId, Service};
use vm6_core::JsonObject;

const USER_AGENT: &str = concat!("vm6-vm/", env!("CARGO_PKG_VERSION"));

/// Builder for [`VmClient`].
#[derive(Debug, Clone)]
pub struct VmClientBuilder {
    inner: ServiceClientBuilder,
}

impl VmClientBuilder {
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

    /// Configure the session token sent in `x-xsrf-token`.
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
    pub fn build(self) -> Result<VmClient> {
        let inner = self.inner.build()?;
        Ok(VmClient { inner })
    }
}

/// Asynchronous client for the `vm/v3/host` endpoints.
#[derive(Debug, Clone)]
pub struct VmClient {
    inner: ServiceClient,
}

impl VmClient {
    /// Construct a client directly from the API host.
    ///
    /// # Errors
    ///
    /// Returns an error if the host is invalid.
    pub fn new(host: impl AsRef<str>) -> Result<Self> {
        VmClientBuilder::new(host)?.build()
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

    /// Create a host from a caller-supplied parameter map.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Status`](vm6_core::Error::Status) when the API rejects the request
    /// and a decode error when
    /// the response is not a JSON object.
    pub async fn create_host(&self, params: &JsonObject) -> Result<JsonObject> {
        self.send_object(Method::POST, "host", Some(params)).await
    }

    /// Fetch a host.
    ///
    /// # Errors
    ///
    /// Same as [`VmClient::create_host`].
    pub async fn get_host(&self, id: &HostId) -> Result<JsonObject> {
        let function = format!("host/{id}");
        self.send_object::<()>(Method::GET, &function, None).await
    }

    /// Remove a host. The response body is discarded.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Status`](vm6_core::Error::Status) when the API rejects the request.
    pub async fn remove_host(&self, id: &HostId) -> Result<()> {
        let function = format!("host/{id}");
        self.send_discard::<()>(Method::DELETE, &function, None)
            .await
    }

    /// Run a power action on a host. The response body is discarded.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Status`](vm6_core::Error::Status) when the API rejects the action.
    pub async fn power(&self, id: &HostId, action: HostAction) -> Result<()> {
        let function = action.function(id);
        let body = action.body();
        self.send_discard(Method::POST, &function, body.as_ref())
            .await
    }

    /// Boot a host.
    pub async fn start_host(&self, id: &HostId) -> Result<()> {
        self.power(id, HostAction::Start).await
    }

    /// Force a host off.
    pub async fn stop_host(&self, id: &HostId) -> Result<()> {
        self.power(id, HostAction::Stop).await
    }

    /// Force a host to reboot.
    pub async fn restart_host(&self, id: &HostId) -> Result<()> {
        self.power(id, HostAction::Restart).await
    }

    /// Fetch the VNC console settings of a host.
    ///
    /// # Errors
    ///
    /// Same as [`VmClient::create_host`].
    pub async fn vnc_settings(&self, id: &HostId) -> Result<JsonObject> {
        let function = format!("host/{id}/vnc_settings");
        self.send_object::<()>(Method::GET, &function, None).await
    }

    async fn send_object<B>(
        &self,
        method: Method,
        function: &str,
        body: Option<&B>,
    ) -> Result<JsonObject>
    where
        B: Serialize + ?Sized,
    {
        let path = ApiPath::for_service(Service::Vm, function);
        let bytes = self.inner.send(method, &path, body).await?;
        ServiceClient::decode(&path, &bytes)
    }

    async fn send_discard<B>(&self, method: Method, function: &str, body: Option<&B>) -> Result<()>
    where
        B: Serialize + ?Sized,
    {
        let path = ApiPath::for_service(Service::Vm, function);
        let bytes = self.inner.send(method, &path, body).await?;
        debug!(path = %path, bytes = bytes.len(), "Discarding VMmanager response body");
        Ok(())
    }
}
