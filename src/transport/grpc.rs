use std::error::Error as StdError;

use async_trait::async_trait;
use bytes::{Buf, BufMut, Bytes};
use http::{
    header::CONTENT_TYPE,
    uri::{PathAndQuery, Scheme},
    StatusCode, Uri,
};
use hyper_rustls::HttpsConnectorBuilder;
use hyper_util::client::legacy::connect::HttpConnector;
use parking_lot::Mutex;
use tonic::{
    codec::{Codec, DecodeBuf, Decoder, EncodeBuf, Encoder},
    metadata::{AsciiMetadataKey, AsciiMetadataValue},
    transport::{Channel, Endpoint},
    Code, Status,
};
use tower::{service_fn, Service};
use tracing::{debug, trace};

use super::{
    tls::{self, TlsConfigError},
    Transport, TransportError, WireRequest, WireResponse,
};
use crate::credentials::TrustAnchor;

type BoxError = Box<dyn StdError + Send + Sync>;

/// Direct TLS gRPC connection to a node.
///
/// Request bodies arrive already protobuf-encoded from the codec; this transport only frames them
/// as unary gRPC calls and turns header entries into request metadata. The HTTP/2 channel is
/// created on first use and shared by later calls; it is discarded after a connection failure so
/// the following call dials again.
pub struct GrpcTransport {
    addr: String,
    tls: Option<rustls::ClientConfig>,
    channel: Mutex<Option<Channel>>,
}

impl GrpcTransport {
    /// Bind a transport to `addr` (`https://host:port`).
    ///
    /// # Errors
    /// Returns [`TlsConfigError`] when the trust anchor cannot be turned into a TLS config.
    pub fn new(addr: impl Into<String>, trust: &TrustAnchor) -> Result<Self, TlsConfigError> {
        let addr = addr.into();
        let tls = if addr.starts_with("http://") {
            None
        } else {
            // `enable_http2` on the connector advertises h2.
            Some(match tls::client_config(trust)? {
                Some(config) => config,
                None => tls::native_roots_config()?,
            })
        };
        Ok(Self {
            addr,
            tls,
            channel: Mutex::new(None),
        })
    }

    async fn channel(&self) -> Result<Channel, TransportError> {
        let cached = self.channel.lock().clone();
        if let Some(channel) = cached {
            return Ok(channel);
        }
        let channel = self.connect().await?;
        *self.channel.lock() = Some(channel.clone());
        Ok(channel)
    }

    fn reset(&self) {
        if self.channel.lock().take().is_some() {
            debug!(target: "lnclient::transport::grpc", addr = %self.addr, "dropping cached channel");
        }
    }

    async fn connect(&self) -> Result<Channel, TransportError> {
        let Some(tls) = self.tls.clone() else {
            let ep = Endpoint::from_shared(self.addr.clone())
                .map_err(|e| TransportError::connection("invalid gRPC endpoint", e))?;
            return ep
                .connect()
                .await
                .map_err(|e| TransportError::connection("gRPC connect failed", e));
        };

        // The connector owns TLS, so tonic is handed an http:// origin and the scheme is
        // switched back to https before dialing.
        let requested_uri: Uri = self
            .addr
            .parse()
            .map_err(|e| TransportError::connection("invalid endpoint URI", e))?;
        let mut http_parts = requested_uri.into_parts();
        http_parts.scheme = Some(Scheme::HTTP);
        let http_uri = Uri::from_parts(http_parts)
            .map_err(|e| TransportError::connection("invalid http URI", e))?;
        let ep = Endpoint::from_shared(http_uri.to_string())
            .map_err(|e| TransportError::connection("invalid gRPC endpoint", e))?;

        let connector = Self::https_connector(tls);
        let svc = service_fn(move |uri: Uri| {
            let mut inner = connector.clone();
            async move {
                let mut parts = uri.into_parts();
                parts.scheme = Some(Scheme::HTTPS);
                let https_target_uri =
                    Uri::from_parts(parts).map_err(|e| -> BoxError { BoxError::from(e) })?;
                inner
                    .call(https_target_uri)
                    .await
                    .map_err(|e| -> BoxError { BoxError::from(e) })
            }
        });

        debug!(target: "lnclient::transport::grpc", addr = %self.addr, "dialing");
        ep.connect_with_connector(svc)
            .await
            .map_err(|e| TransportError::connection("gRPC connect failed", e))
    }

    fn https_connector(
        tls: rustls::ClientConfig,
    ) -> hyper_rustls::HttpsConnector<HttpConnector> {
        HttpsConnectorBuilder::new()
            .with_tls_config(tls)
            .https_only()
            .enable_http2()
            .build()
    }

    fn metadata_request(request: &WireRequest) -> Result<tonic::Request<Bytes>, TransportError> {
        let mut req = tonic::Request::new(request.body.clone());
        for (name, value) in &request.headers {
            if name == CONTENT_TYPE {
                continue;
            }
            let key = AsciiMetadataKey::from_bytes(name.as_str().as_bytes())
                .map_err(|e| TransportError::connection("invalid metadata key", e))?;
            let value = value
                .to_str()
                .map_err(|e| TransportError::connection("invalid metadata value", e))
                .and_then(|v| {
                    AsciiMetadataValue::try_from(v)
                        .map_err(|e| TransportError::connection("invalid metadata value", e))
                })?;
            req.metadata_mut().insert(key, value);
        }
        Ok(req)
    }

    fn status_to_response(&self, status: Status) -> Result<WireResponse, TransportError> {
        match status.code() {
            Code::Unauthenticated | Code::PermissionDenied => {
                Err(TransportError::AuthRejected(status.message().to_string()))
            }
            Code::DeadlineExceeded => Err(TransportError::Timeout),
            // A status carrying a source error came from the HTTP/2 layer, not from the node.
            Code::Unavailable | Code::Unknown | Code::Cancelled
                if status.code() == Code::Unavailable || StdError::source(&status).is_some() =>
            {
                self.reset();
                Err(TransportError::connection("gRPC call failed", status))
            }
            code => {
                trace!(target: "lnclient::transport::grpc", ?code, message = status.message(), "node returned error status");
                Ok(WireResponse::new(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    status.message().to_string(),
                ))
            }
        }
    }
}

#[async_trait]
impl Transport for GrpcTransport {
    async fn send(&self, request: WireRequest) -> Result<WireResponse, TransportError> {
        let path = PathAndQuery::try_from(request.path.as_str())
            .map_err(|e| TransportError::connection("invalid gRPC method path", e))?;
        let req = Self::metadata_request(&request)?;

        let channel = self.channel().await?;
        let mut grpc = tonic::client::Grpc::new(channel);
        if let Err(e) = grpc.ready().await {
            self.reset();
            return Err(TransportError::connection("gRPC channel not ready", e));
        }

        trace!(target: "lnclient::transport::grpc", path = %path, "unary call");
        match grpc.unary(req, path, RawCodec).await {
            Ok(response) => Ok(WireResponse::ok(response.into_inner())),
            Err(status) => self.status_to_response(status),
        }
    }
}

/// Pass-through codec: message bodies are encoded and decoded by the backend codec.
#[derive(Clone, Copy, Debug, Default)]
struct RawCodec;

impl Codec for RawCodec {
    type Encode = Bytes;
    type Decode = Bytes;
    type Encoder = RawCodec;
    type Decoder = RawCodec;

    fn encoder(&mut self) -> Self::Encoder {
        RawCodec
    }

    fn decoder(&mut self) -> Self::Decoder {
        RawCodec
    }
}

impl Encoder for RawCodec {
    type Item = Bytes;
    type Error = Status;

    fn encode(&mut self, item: Self::Item, dst: &mut EncodeBuf<'_>) -> Result<(), Self::Error> {
        dst.put(item);
        Ok(())
    }
}

impl Decoder for RawCodec {
    type Item = Bytes;
    type Error = Status;

    fn decode(&mut self, src: &mut DecodeBuf<'_>) -> Result<Option<Self::Item>, Self::Error> {
        Ok(Some(src.copy_to_bytes(src.remaining())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::HeaderValue;

    fn transport() -> GrpcTransport {
        GrpcTransport::new("https://127.0.0.1:10009", &TrustAnchor::Fingerprint([1; 32])).unwrap()
    }

    #[test]
    fn headers_become_metadata_without_content_type() {
        let request = WireRequest::post("/lnrpc.Lightning/GetInfo")
            .header(CONTENT_TYPE, HeaderValue::from_static("application/grpc"))
            .header(
                http::HeaderName::from_static("macaroon"),
                HeaderValue::from_static("0201"),
            );
        let req = GrpcTransport::metadata_request(&request).unwrap();
        assert_eq!(req.metadata().get("macaroon").unwrap().to_str().unwrap(), "0201");
        assert!(req.metadata().get("content-type").is_none());
    }

    #[test]
    fn auth_statuses_map_to_rejection() {
        let t = transport();
        assert!(matches!(
            t.status_to_response(Status::unauthenticated("bad macaroon")),
            Err(TransportError::AuthRejected(msg)) if msg == "bad macaroon"
        ));
        assert!(matches!(
            t.status_to_response(Status::deadline_exceeded("slow")),
            Err(TransportError::Timeout)
        ));
        assert!(matches!(
            t.status_to_response(Status::unavailable("down")),
            Err(TransportError::Connection { .. })
        ));
    }

    #[test]
    fn node_errors_become_wire_responses() {
        let response = transport()
            .status_to_response(Status::unknown("invoice not found"))
            .unwrap();
        assert_eq!(response.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(&response.body[..], b"invoice not found");
    }
}
