use std::fmt;

use base64::{
    engine::general_purpose::{STANDARD, STANDARD_NO_PAD, URL_SAFE, URL_SAFE_NO_PAD},
    Engine as _,
};
use http::{header::AUTHORIZATION, HeaderName, HeaderValue};
use rustls_pki_types::{pem::PemObject, CertificateDer};

use crate::{
    config::{BackendKind, ConfigError, NodeConfig},
    transport::WireRequest,
};

const LND_REST_MACAROON_HEADER: &str = "grpc-metadata-macaroon";
const LND_GRPC_MACAROON_METADATA: &str = "macaroon";
const CLN_RUNE_HEADER: &str = "rune";
const FINGERPRINT_PREFIX: &str = "sha256:";

/// Wrapper for credential material that never shows up in `Debug` output.
///
/// There is deliberately no `Display` or `Serialize` implementation.
#[derive(Clone, PartialEq, Eq)]
pub struct Secret<T>(T);

impl<T> Secret<T> {
    pub fn new(value: T) -> Self {
        Self(value)
    }

    pub fn expose(&self) -> &T {
        &self.0
    }
}

impl<T> fmt::Debug for Secret<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("<redacted>")
    }
}

/// Bearer material presented on every call, one variant per auth scheme.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Credential {
    /// LND macaroon bytes.
    Macaroon(Secret<Vec<u8>>),
    /// Core Lightning rune.
    Rune(Secret<String>),
    /// Eclair HTTP basic auth.
    Password {
        username: String,
        password: Secret<String>,
    },
}

/// How the server certificate is trusted.
#[derive(Clone, PartialEq, Eq)]
pub enum TrustAnchor {
    /// Standard web PKI validation.
    SystemRoots,
    /// The server must present exactly this DER certificate.
    Certificate(Vec<u8>),
    /// SHA-256 of the DER certificate the server must present.
    Fingerprint([u8; 32]),
}

impl fmt::Debug for TrustAnchor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrustAnchor::SystemRoots => f.write_str("SystemRoots"),
            TrustAnchor::Certificate(der) => write!(f, "Certificate({} bytes)", der.len()),
            TrustAnchor::Fingerprint(fp) => write!(f, "Fingerprint({})", hex::encode(fp)),
        }
    }
}

/// Per-session authorization: the bearer credential and the TLS trust anchor.
///
/// Read-only after construction, so it can be shared between concurrent calls without locking.
#[derive(Clone, Debug)]
pub struct Credentials {
    backend: BackendKind,
    credential: Credential,
    trust: TrustAnchor,
}

impl Credentials {
    /// Extract and validate the credential fields `backend` needs from `config`.
    ///
    /// # Errors
    /// Returns [`ConfigError`] when a required field is missing or cannot be decoded.
    pub fn from_config(backend: BackendKind, config: &NodeConfig) -> Result<Self, ConfigError> {
        let credential = match backend {
            BackendKind::LndRest | BackendKind::LndGrpc => {
                let raw = non_empty(config.macaroon.as_deref()).ok_or(ConfigError::MissingField("macaroon"))?;
                Credential::Macaroon(Secret::new(decode_binary("macaroon", raw)?))
            }
            BackendKind::ClnRest => {
                let rune = non_empty(config.rune.as_deref()).ok_or(ConfigError::MissingField("rune"))?;
                if HeaderValue::from_str(rune).is_err() {
                    return Err(ConfigError::invalid("rune", "not a valid header value"));
                }
                Credential::Rune(Secret::new(rune.to_string()))
            }
            BackendKind::EclairRest => {
                let password =
                    non_empty(config.password.as_deref()).ok_or(ConfigError::MissingField("password"))?;
                Credential::Password {
                    username: config.username.clone().unwrap_or_default(),
                    password: Secret::new(password.to_string()),
                }
            }
        };

        let trust = match non_empty(config.certificate.as_deref()) {
            Some(cert) => parse_trust_anchor(cert)?,
            None if backend.requires_certificate() => {
                return Err(ConfigError::MissingField("certificate"));
            }
            None => TrustAnchor::SystemRoots,
        };

        Ok(Self {
            backend,
            credential,
            trust,
        })
    }

    pub fn backend(&self) -> BackendKind {
        self.backend
    }

    pub fn credential(&self) -> &Credential {
        &self.credential
    }

    pub fn trust(&self) -> &TrustAnchor {
        &self.trust
    }

    /// Inject the bearer credential using the backend's header or metadata convention.
    #[must_use]
    pub fn attach(&self, request: WireRequest) -> WireRequest {
        let (name, value) = match (&self.credential, self.backend) {
            (Credential::Macaroon(mac), BackendKind::LndGrpc) => (
                HeaderName::from_static(LND_GRPC_MACAROON_METADATA),
                hex::encode(mac.expose()),
            ),
            (Credential::Macaroon(mac), _) => (
                HeaderName::from_static(LND_REST_MACAROON_HEADER),
                hex::encode(mac.expose()),
            ),
            (Credential::Rune(rune), _) => {
                (HeaderName::from_static(CLN_RUNE_HEADER), rune.expose().clone())
            }
            (Credential::Password { username, password }, _) => {
                let basic = STANDARD.encode(format!("{username}:{}", password.expose()));
                (AUTHORIZATION, format!("Basic {basic}"))
            }
        };
        match HeaderValue::try_from(value) {
            Ok(mut value) => {
                value.set_sensitive(true);
                request.header(name, value)
            }
            // Runes are checked at construction; hex and base64 are always header-safe.
            Err(_) => request,
        }
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// Decode a binary config value given either as hex or as (standard or URL-safe) base64.
///
/// Hex wins when a value is valid under both alphabets.
pub fn decode_binary(field: &'static str, value: &str) -> Result<Vec<u8>, ConfigError> {
    let value = value.trim();
    if !value.is_empty() && value.len() % 2 == 0 && value.bytes().all(|b| b.is_ascii_hexdigit()) {
        if let Ok(bytes) = hex::decode(value) {
            return Ok(bytes);
        }
    }
    [&STANDARD, &URL_SAFE, &STANDARD_NO_PAD, &URL_SAFE_NO_PAD]
        .into_iter()
        .find_map(|engine| engine.decode(value).ok())
        .filter(|bytes| !bytes.is_empty())
        .ok_or(ConfigError::InvalidEncoding(field))
}

/// Interpret the `certificate` config value.
///
/// Accepted forms: PEM text, hex or base64 DER, base64-wrapped PEM (as found in lndconnect
/// strings) and `sha256:<hex>` fingerprints of the DER certificate.
pub fn parse_trust_anchor(value: &str) -> Result<TrustAnchor, ConfigError> {
    let value = value.trim();
    if let Some(fp) = value.strip_prefix(FINGERPRINT_PREFIX) {
        let bytes = hex::decode(fp.replace(':', ""))
            .map_err(|_| ConfigError::InvalidEncoding("certificate"))?;
        let fp: [u8; 32] = bytes
            .try_into()
            .map_err(|_| ConfigError::invalid("certificate", "fingerprint must be 32 bytes"))?;
        return Ok(TrustAnchor::Fingerprint(fp));
    }
    if value.starts_with("-----BEGIN") {
        return pem_to_der(value.as_bytes()).map(TrustAnchor::Certificate);
    }
    let bytes = decode_binary("certificate", value)?;
    if bytes.starts_with(b"-----BEGIN") {
        return pem_to_der(&bytes).map(TrustAnchor::Certificate);
    }
    Ok(TrustAnchor::Certificate(bytes))
}

fn pem_to_der(pem: &[u8]) -> Result<Vec<u8>, ConfigError> {
    CertificateDer::from_pem_slice(pem)
        .map(|der| der.as_ref().to_vec())
        .map_err(|e| ConfigError::invalid("certificate", format!("{e:?}")))
}
