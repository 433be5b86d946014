use std::{fmt, str::FromStr, time::Duration};

use serde::{Deserialize, Serialize};

/// Deadline applied to every node call when the configuration does not set one.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Invoice expiry used when an [`InvoiceRequest`](crate::types::InvoiceRequest) leaves it unset.
pub const DEFAULT_INVOICE_EXPIRY_SECS: u32 = 3600;

/// Errors raised while validating a [`NodeConfig`] for a backend.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("missing field: {0}")]
    MissingField(&'static str),
    #[error("invalid field {field}: {reason}")]
    InvalidField { field: &'static str, reason: String },
    #[error("field {0}: expected hex or base64")]
    InvalidEncoding(&'static str),
    #[error("unknown backend: {0}")]
    UnknownBackend(String),
}

impl ConfigError {
    pub(crate) fn invalid<R: Into<String>>(field: &'static str, reason: R) -> Self {
        Self::InvalidField {
            field,
            reason: reason.into(),
        }
    }
}

/// Closed set of supported node APIs.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BackendKind {
    LndRest,
    LndGrpc,
    ClnRest,
    EclairRest,
}

impl BackendKind {
    pub const ALL: [BackendKind; 4] = [
        BackendKind::LndRest,
        BackendKind::LndGrpc,
        BackendKind::ClnRest,
        BackendKind::EclairRest,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            BackendKind::LndRest => "LndRest",
            BackendKind::LndGrpc => "LndGrpc",
            BackendKind::ClnRest => "ClnRest",
            BackendKind::EclairRest => "EclairRest",
        }
    }

    /// Whether the backend ships a self-signed certificate that must be supplied by the caller.
    pub fn requires_certificate(&self) -> bool {
        matches!(self, BackendKind::LndRest | BackendKind::LndGrpc)
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BackendKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| ConfigError::UnknownBackend(s.to_string()))
    }
}

/// Connection settings supplied by the caller.
///
/// Keys that a backend does not use are ignored, as are keys this struct does not know about, so
/// the same mapping shape can be deserialized for every backend:
///
/// ```
/// let config: lnclient::NodeConfig = serde_json::from_value(serde_json::json!({
///     "url": "https://127.0.0.1:8081",
///     "macaroon": "a1b2c3",
///     "certificate": "a1b2c3",
///     "color": "ignored",
/// }))
/// .unwrap();
/// assert_eq!(config.url.as_deref(), Some("https://127.0.0.1:8081"));
/// ```
#[derive(Clone, Default, Deserialize)]
pub struct NodeConfig {
    /// Base URL of the node API, scheme included (`https://host:port`).
    pub url: Option<String>,
    /// LND macaroon, hex- or base64-encoded.
    pub macaroon: Option<String>,
    /// Core Lightning rune.
    pub rune: Option<String>,
    /// Eclair API user. Eclair accepts any user name, so this defaults to empty.
    pub username: Option<String>,
    /// Eclair API password.
    pub password: Option<String>,
    /// TLS trust: PEM, hex/base64 DER, base64 PEM, or `sha256:<hex>` fingerprint.
    pub certificate: Option<String>,
    /// Per-call deadline in seconds.
    pub timeout: Option<u64>,
}

impl NodeConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: Some(url.into()),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_macaroon(mut self, macaroon: impl Into<String>) -> Self {
        self.macaroon = Some(macaroon.into());
        self
    }

    #[must_use]
    pub fn with_rune(mut self, rune: impl Into<String>) -> Self {
        self.rune = Some(rune.into());
        self
    }

    #[must_use]
    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }

    #[must_use]
    pub fn with_certificate(mut self, certificate: impl Into<String>) -> Self {
        self.certificate = Some(certificate.into());
        self
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout.as_secs());
        self
    }

    /// Deadline applied to each call.
    pub fn call_timeout(&self) -> Duration {
        self.timeout
            .filter(|secs| *secs > 0)
            .map_or(DEFAULT_TIMEOUT, Duration::from_secs)
    }

    /// Validated, normalized base URL (no trailing slash).
    pub(crate) fn base_url(&self) -> Result<String, ConfigError> {
        let url = self
            .url
            .as_deref()
            .map(str::trim)
            .filter(|u| !u.is_empty())
            .ok_or(ConfigError::MissingField("url"))?;
        let uri: http::Uri = url
            .parse()
            .map_err(|e: http::uri::InvalidUri| ConfigError::invalid("url", e.to_string()))?;
        match uri.scheme_str() {
            Some("https" | "http") => {}
            Some(other) => return Err(ConfigError::invalid("url", format!("unsupported scheme {other}"))),
            None => return Err(ConfigError::invalid("url", "missing scheme")),
        }
        if uri.host().is_none() {
            return Err(ConfigError::invalid("url", "missing host"));
        }
        Ok(url.trim_end_matches('/').to_string())
    }
}

// Secrets stay out of Debug output.
impl fmt::Debug for NodeConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn mask(v: &Option<String>) -> Option<&'static str> {
            v.as_ref().map(|_| "<redacted>")
        }
        f.debug_struct("NodeConfig")
            .field("url", &self.url)
            .field("macaroon", &mask(&self.macaroon))
            .field("rune", &mask(&self.rune))
            .field("username", &self.username)
            .field("password", &mask(&self.password))
            .field("certificate", &self.certificate.as_ref().map(|_| "<set>"))
            .field("timeout", &self.timeout)
            .finish()
    }
}
