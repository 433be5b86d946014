//! Per-backend wire encoding and decoding.
//!
//! A codec turns domain requests into [`WireRequest`]s for one node API and parses the matching
//! [`WireResponse`]s into that API's own response types. Mapping those types onto the domain
//! schema is left to [`Normalize`].

use serde::de::DeserializeOwned;
use tracing::debug;

use crate::{
    client::{Error, Result},
    config::BackendKind,
    normalize::Normalize,
    transport::{WireRequest, WireResponse},
    types::{Invoice, InvoiceRequest, InvoiceResponse, NodeInfo, PayRequest, PaymentHash, PaymentResponse},
};

pub mod cln_rest;
pub mod eclair_rest;
pub mod lnd_grpc;
pub mod lnd_rest;

pub use cln_rest::ClnRestCodec;
pub use eclair_rest::EclairRestCodec;
pub use lnd_grpc::LndGrpcCodec;
pub use lnd_rest::LndRestCodec;

/// Encoding and decoding rules for one node API.
///
/// Codecs are stateless apart from immutable settings and are shared by concurrent calls.
/// Every `encode_*` validates its input before producing a request, so a rejected request never
/// reaches the transport.
pub trait BackendCodec: Send + Sync + 'static {
    const KIND: BackendKind;

    type Info: Normalize<Output = NodeInfo>;
    type Created: Normalize<Output = InvoiceResponse>;
    type Lookup: Normalize<Output = Invoice>;
    type Payment: Normalize<Output = PaymentResponse>;

    fn encode_get_info(&self) -> Result<WireRequest>;
    fn decode_get_info(&self, response: WireResponse) -> Result<Self::Info>;

    fn encode_create_invoice(&self, request: &InvoiceRequest) -> Result<WireRequest>;
    fn decode_create_invoice(&self, response: WireResponse) -> Result<Self::Created>;

    fn encode_lookup_invoice(&self, payment_hash: &PaymentHash) -> Result<WireRequest>;
    fn decode_lookup_invoice(&self, response: WireResponse) -> Result<Self::Lookup>;

    fn encode_pay_invoice(&self, request: &PayRequest) -> Result<WireRequest>;
    fn decode_pay_invoice(&self, response: WireResponse) -> Result<Self::Payment>;
}

// Phrases node implementations use when a macaroon, rune or password is refused.
const AUTH_REJECTION_MARKERS: [&str; 4] = [
    "permission denied",
    "verification failed",
    "not authorized",
    "invalid rune",
];

/// Turn a non-success response into the matching error, passing successful ones through.
pub(crate) fn check_status(backend: BackendKind, response: WireResponse) -> Result<WireResponse> {
    let status = response.status;
    if status.is_success() {
        return Ok(response);
    }
    let message = error_message(&response.body);
    debug!(target: "lnclient::codec", %backend, %status, %message, "node returned an error");

    let lowered = message.to_ascii_lowercase();
    if status.as_u16() == 401
        || status.as_u16() == 403
        || AUTH_REJECTION_MARKERS.iter().any(|m| lowered.contains(m))
    {
        return Err(Error::AuthRejected(message));
    }
    Err(Error::Remote {
        status: status.as_u16(),
        message,
    })
}

/// Check the status and parse a JSON body.
pub(crate) fn decode_json<T: DeserializeOwned>(
    backend: BackendKind,
    what: &'static str,
    response: WireResponse,
) -> Result<T> {
    let response = check_status(backend, response)?;
    serde_json::from_slice(&response.body).map_err(|e| Error::protocol(what, e))
}

/// Best-effort extraction of a human readable message from an error body.
///
/// LND uses `{"code", "message", "details"}` (older releases `{"error"}`), Core Lightning
/// `{"code", "message"}` and Eclair `{"error"}`. Anything else is returned as text.
fn error_message(body: &[u8]) -> String {
    if let Ok(value) = serde_json::from_slice::<serde_json::Value>(body) {
        let found = ["message", "error"].iter().find_map(|key| match value.get(key) {
            Some(serde_json::Value::String(s)) => Some(s.clone()),
            Some(serde_json::Value::Object(inner)) => inner
                .get("message")
                .and_then(serde_json::Value::as_str)
                .map(str::to_string),
            _ => None,
        });
        if let Some(message) = found {
            return message;
        }
    }
    String::from_utf8_lossy(body).trim().to_string()
}

/// Serde helper for integers that may arrive as JSON numbers or as decimal strings.
///
/// LND's REST gateway renders 64-bit integers as strings.
pub(crate) mod string_or_number {
    use std::{fmt::Display, str::FromStr};

    use serde::{de, Deserialize, Deserializer};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw<T> {
        Number(T),
        Text(String),
    }

    impl<T> Raw<T>
    where
        T: FromStr,
        T::Err: Display,
    {
        fn parse<E: de::Error>(self) -> Result<T, E> {
            match self {
                Raw::Number(v) => Ok(v),
                Raw::Text(s) => s.trim().parse().map_err(E::custom),
            }
        }
    }

    pub(crate) fn deserialize<'de, D, T>(deserializer: D) -> Result<T, D::Error>
    where
        D: Deserializer<'de>,
        T: Deserialize<'de> + FromStr,
        T::Err: Display,
    {
        Raw::<T>::deserialize(deserializer)?.parse()
    }

    pub(crate) fn option<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
    where
        D: Deserializer<'de>,
        T: Deserialize<'de> + FromStr,
        T::Err: Display,
    {
        Option::<Raw<T>>::deserialize(deserializer)?
            .map(|raw| raw.parse())
            .transpose()
    }
}
