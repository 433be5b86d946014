use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, trace};

use super::{
    tls::{self, TlsConfigError},
    Transport, TransportError, WireRequest, WireResponse,
};
use crate::credentials::TrustAnchor;

/// HTTPS (or plain HTTP) transport for JSON/form REST APIs.
///
/// The underlying `reqwest` client pools connections and transparently reconnects after a
/// dropped connection on the next request.
pub struct RestTransport {
    base_url: String,
    client: reqwest::Client,
}

impl RestTransport {
    /// Bind a transport to `base_url` (scheme, host and port, no trailing slash).
    ///
    /// `timeout` is applied by the HTTP client as well so sockets are torn down even when the
    /// caller does not drop the call future.
    ///
    /// # Errors
    /// Returns [`RestBuildError`] when the pinned certificate cannot be used as a trust anchor or
    /// the HTTP client cannot be initialised.
    pub fn new(
        base_url: impl Into<String>,
        trust: &TrustAnchor,
        timeout: Duration,
    ) -> Result<Self, RestBuildError> {
        let mut builder = reqwest::Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout);
        if let Some(tls) = tls::client_config(trust)? {
            builder = builder.use_preconfigured_tls(tls);
        }
        let client = builder.build().map_err(RestBuildError::Client)?;
        Ok(Self {
            base_url: base_url.into(),
            client,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RestBuildError {
    #[error(transparent)]
    Tls(#[from] TlsConfigError),
    #[error("failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),
}

#[async_trait]
impl Transport for RestTransport {
    async fn send(&self, request: WireRequest) -> Result<WireResponse, TransportError> {
        let url = format!("{}{}", self.base_url, request.path);
        trace!(target: "lnclient::transport::rest", method = %request.method, %url, "sending request");

        let response = self
            .client
            .request(request.method, &url)
            .headers(request.headers)
            .body(request.body)
            .send()
            .await
            .map_err(|e| {
                debug!(target: "lnclient::transport::rest", error = %e, %url, "request failed");
                TransportError::connection("REST request failed", e)
            })?;

        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(|e| TransportError::connection("failed to read REST response body", e))?;
        trace!(
            target: "lnclient::transport::rest",
            %status,
            body_len = body.len(),
            "response received"
        );
        Ok(WireResponse { status, body })
    }
}
