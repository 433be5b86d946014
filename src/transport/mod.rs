use std::{borrow::Cow, error::Error};

use async_trait::async_trait;
use bytes::Bytes;
use http::{
    header::{HeaderName, CONTENT_TYPE},
    HeaderMap, HeaderValue, Method, StatusCode,
};
use serde::Serialize;

type BoxError = Box<dyn Error + Send + Sync>;

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("{context}")]
    Connection {
        context: Cow<'static, str>,
        #[source]
        source: Option<BoxError>,
    },
    #[error("{context}")]
    Tls {
        context: Cow<'static, str>,
        #[source]
        source: Option<BoxError>,
    },
    #[error("request timed out")]
    Timeout,
    #[error("credential rejected: {0}")]
    AuthRejected(String),
}

impl TransportError {
    /// Build a connection error with context and source.
    ///
    /// The source chain is inspected so TLS handshake failures and client-side timeouts surface as
    /// [`TransportError::Tls`] and [`TransportError::Timeout`] instead of a generic connection error.
    pub fn connection<S, E>(context: S, source: E) -> Self
    where
        S: Into<Cow<'static, str>>,
        E: Error + Send + Sync + 'static,
    {
        if is_tls_failure(&source) {
            return Self::Tls {
                context: context.into(),
                source: Some(Box::new(source)),
            };
        }
        if is_timeout(&source) {
            return Self::Timeout;
        }
        Self::Connection {
            context: context.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Build a connection error that only has context (no underlying source).
    pub fn connection_message<S>(context: S) -> Self
    where
        S: Into<Cow<'static, str>>,
    {
        Self::Connection {
            context: context.into(),
            source: None,
        }
    }
}

/// Walk a source chain looking for a rustls failure.
///
/// `io::Error` hides its payload from `source()` and connectors nest them, so every wrapped
/// `io::Error` layer is unpacked explicitly.
pub(crate) fn is_tls_failure(err: &(dyn Error + 'static)) -> bool {
    chain(err).any(|e| unwrap_io(e).is::<rustls::Error>())
}

fn unwrap_io<'a>(mut err: &'a (dyn Error + 'static)) -> &'a (dyn Error + 'static) {
    while let Some(inner) = err
        .downcast_ref::<std::io::Error>()
        .and_then(std::io::Error::get_ref)
    {
        err = inner;
    }
    err
}

fn is_timeout(err: &(dyn Error + 'static)) -> bool {
    chain(err).any(|e| {
        e.downcast_ref::<std::io::Error>()
            .is_some_and(|io| io.kind() == std::io::ErrorKind::TimedOut)
            || e.downcast_ref::<reqwest::Error>()
                .is_some_and(reqwest::Error::is_timeout)
    })
}

fn chain<'a>(err: &'a (dyn Error + 'static)) -> impl Iterator<Item = &'a (dyn Error + 'static)> {
    std::iter::successors(Some(err), |e| (*e).source())
}

/// One backend call in wire form: what to send and where, relative to the endpoint.
#[derive(Clone, Debug)]
pub struct WireRequest {
    pub method: Method,
    /// Path relative to the endpoint URL (`/v1/getinfo`, `/lnrpc.Lightning/GetInfo`).
    pub path: String,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl WireRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            headers: HeaderMap::new(),
            body: Bytes::new(),
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    /// Attach a JSON body.
    pub fn json<T: Serialize + ?Sized>(self, body: &T) -> Result<Self, serde_json::Error> {
        let body = serde_json::to_vec(body)?;
        Ok(self
            .header(CONTENT_TYPE, HeaderValue::from_static("application/json"))
            .with_body(body))
    }

    /// Attach a `application/x-www-form-urlencoded` body.
    #[must_use]
    pub fn form<'a, I>(self, fields: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, String)>,
    {
        let mut ser = url::form_urlencoded::Serializer::new(String::new());
        for (key, value) in fields {
            ser.append_pair(key, &value);
        }
        self.header(
            CONTENT_TYPE,
            HeaderValue::from_static("application/x-www-form-urlencoded"),
        )
        .with_body(ser.finish())
    }

    /// Attach an encoded protobuf message as the body of a unary gRPC call.
    #[must_use]
    pub fn protobuf<M: prost::Message>(self, message: &M) -> Self {
        self.header(CONTENT_TYPE, HeaderValue::from_static("application/grpc"))
            .with_body(message.encode_to_vec())
    }

    #[must_use]
    pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    #[must_use]
    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }
}

/// Raw backend reply; status handling and decoding belong to the codec.
#[derive(Clone, Debug)]
pub struct WireResponse {
    pub status: StatusCode,
    pub body: Bytes,
}

impl WireResponse {
    pub fn new(status: StatusCode, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn ok(body: impl Into<Bytes>) -> Self {
        Self::new(StatusCode::OK, body)
    }
}

/// A channel to one node endpoint.
///
/// Implementations own any connection reuse and must tolerate a dropped connection by
/// reconnecting on the next call. They never retry a request on their own: node calls such as
/// invoice creation are not idempotent. The client enforces the call deadline and cancels by
/// dropping the returned future, so implementations must release resources on drop.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: WireRequest) -> Result<WireResponse, TransportError>;
}

pub mod grpc;
pub mod rest;
pub mod tls;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tls_errors_are_found_inside_io_errors() {
        let inner = rustls::Error::InvalidCertificate(rustls::CertificateError::UnknownIssuer);
        let io = std::io::Error::new(std::io::ErrorKind::InvalidData, inner);
        assert!(matches!(
            TransportError::connection("handshake", io),
            TransportError::Tls { .. }
        ));
    }

    #[test]
    fn tls_errors_are_found_below_nested_io_errors() {
        let inner = rustls::Error::InvalidCertificate(
            rustls::CertificateError::ApplicationVerificationFailure,
        );
        let io = std::io::Error::new(std::io::ErrorKind::InvalidData, inner);
        let outer = std::io::Error::new(std::io::ErrorKind::Other, io);
        assert!(matches!(
            TransportError::connection("REST request failed", outer),
            TransportError::Tls { .. }
        ));
    }

    #[test]
    fn plain_io_errors_stay_connection_errors() {
        let io = std::io::Error::from(std::io::ErrorKind::ConnectionRefused);
        assert!(matches!(
            TransportError::connection("connect", io),
            TransportError::Connection { .. }
        ));
        let io = std::io::Error::from(std::io::ErrorKind::TimedOut);
        assert!(matches!(
            TransportError::connection("connect", io),
            TransportError::Timeout
        ));
    }

    #[test]
    fn form_bodies_are_url_encoded() {
        let req = WireRequest::post("/createinvoice").form([
            ("description", "coffee & cake".to_string()),
            ("amountMsat", "1000".to_string()),
        ]);
        assert_eq!(&req.body[..], b"description=coffee+%26+cake&amountMsat=1000");
        assert_eq!(
            req.headers.get(CONTENT_TYPE).unwrap(),
            "application/x-www-form-urlencoded"
        );
    }
}
