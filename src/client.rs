use std::{
    borrow::Cow,
    error::Error as StdError,
    fmt,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    time::Duration,
};

use thiserror::Error;
use tracing::{debug, trace};

use crate::{
    codec::{BackendCodec, ClnRestCodec, EclairRestCodec, LndGrpcCodec, LndRestCodec},
    config::{BackendKind, ConfigError, NodeConfig},
    credentials::Credentials,
    normalize::Normalize,
    transport::{
        grpc::GrpcTransport,
        rest::{RestBuildError, RestTransport},
        tls::TlsConfigError,
        Transport, TransportError, WireRequest, WireResponse,
    },
    types::{
        Invoice, InvoiceRequest, InvoiceResponse, NodeInfo, PayRequest, PaymentHash,
        PaymentResponse, ValidationError,
    },
};

type BoxError = Box<dyn StdError + Send + Sync>;

/// Library-level error type surfaced by [`NodeClient`].
#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),
    #[error("unusable TLS credentials: {0}")]
    AuthConfig(#[source] BoxError),
    #[error("credential rejected by node: {0}")]
    AuthRejected(String),
    #[error("connection failed: {0}")]
    Connection(#[source] TransportError),
    #[error("TLS failure: {0}")]
    Tls(#[source] TransportError),
    #[error("no response within {0:?}")]
    Timeout(Duration),
    #[error("malformed {context}")]
    Protocol {
        context: Cow<'static, str>,
        #[source]
        source: Option<BoxError>,
    },
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("node error (status {status}): {message}")]
    Remote { status: u16, message: String },
}

impl Error {
    pub(crate) fn protocol<S, E>(context: S, source: E) -> Self
    where
        S: Into<Cow<'static, str>>,
        E: StdError + Send + Sync + 'static,
    {
        Self::Protocol {
            context: context.into(),
            source: Some(Box::new(source)),
        }
    }

    pub(crate) fn protocol_message<S>(context: S) -> Self
    where
        S: Into<Cow<'static, str>>,
    {
        Self::Protocol {
            context: context.into(),
            source: None,
        }
    }

    fn from_transport(err: TransportError, deadline: Duration) -> Self {
        match err {
            TransportError::AuthRejected(message) => Self::AuthRejected(message),
            TransportError::Timeout => Self::Timeout(deadline),
            err @ TransportError::Tls { .. } => Self::Tls(err),
            err @ TransportError::Connection { .. } => Self::Connection(err),
        }
    }
}

impl From<TlsConfigError> for Error {
    fn from(err: TlsConfigError) -> Self {
        Self::AuthConfig(Box::new(err))
    }
}

impl From<RestBuildError> for Error {
    fn from(err: RestBuildError) -> Self {
        match err {
            RestBuildError::Tls(e) => e.into(),
            RestBuildError::Client(e) => {
                Self::Connection(TransportError::connection("failed to build HTTP client", e))
            }
        }
    }
}

/// Result alias that defaults to [`Error`].
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Remote operations, used to label log events.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Operation {
    GetInfo,
    CreateInvoice,
    LookupInvoice,
    PayInvoice,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Operation::GetInfo => "get_info",
            Operation::CreateInvoice => "create_invoice",
            Operation::LookupInvoice => "lookup_invoice",
            Operation::PayInvoice => "pay_invoice",
        })
    }
}

/// Lifecycle of a [`NodeClient`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ClientState {
    /// Configuration validated, no call has succeeded yet.
    Constructed,
    /// At least one call completed successfully.
    Active,
}

/// Codec, credentials and transport for one backend.
struct Session<C> {
    codec: C,
    credentials: Credentials,
    transport: Arc<dyn Transport>,
    timeout: Duration,
}

impl<C: BackendCodec> Session<C> {
    async fn round_trip(&self, operation: Operation, request: WireRequest) -> Result<WireResponse> {
        let request = self.credentials.attach(request);
        trace!(
            target: "lnclient::client",
            backend = %C::KIND,
            %operation,
            method = %request.method,
            path = %request.path,
            "dispatching"
        );
        // Dropping the send future on expiry cancels the in-flight request.
        match tokio::time::timeout(self.timeout, self.transport.send(request)).await {
            Ok(Ok(response)) => Ok(response),
            Ok(Err(e)) => Err(Error::from_transport(e, self.timeout)),
            Err(_) => {
                debug!(target: "lnclient::client", backend = %C::KIND, %operation, timeout = ?self.timeout, "deadline elapsed");
                Err(Error::Timeout(self.timeout))
            }
        }
    }

    async fn get_info(&self) -> Result<NodeInfo> {
        let request = self.codec.encode_get_info()?;
        let response = self.round_trip(Operation::GetInfo, request).await?;
        self.codec.decode_get_info(response)?.normalize()
    }

    async fn create_invoice(&self, invoice: &InvoiceRequest) -> Result<InvoiceResponse> {
        let request = self.codec.encode_create_invoice(invoice)?;
        let response = self.round_trip(Operation::CreateInvoice, request).await?;
        self.codec.decode_create_invoice(response)?.normalize()
    }

    async fn lookup_invoice(&self, payment_hash: &PaymentHash) -> Result<Invoice> {
        let request = self.codec.encode_lookup_invoice(payment_hash)?;
        let response = self.round_trip(Operation::LookupInvoice, request).await?;
        self.codec.decode_lookup_invoice(response)?.normalize()
    }

    async fn pay_invoice(&self, payment: &PayRequest) -> Result<PaymentResponse> {
        let request = self.codec.encode_pay_invoice(payment)?;
        let response = self.round_trip(Operation::PayInvoice, request).await?;
        self.codec.decode_pay_invoice(response)?.normalize()
    }
}

enum Backend {
    LndRest(Session<LndRestCodec>),
    LndGrpc(Session<LndGrpcCodec>),
    ClnRest(Session<ClnRestCodec>),
    EclairRest(Session<EclairRestCodec>),
}

macro_rules! with_session {
    ($backend:expr, $session:ident => $body:expr) => {
        match $backend {
            Backend::LndRest($session) => $body,
            Backend::LndGrpc($session) => $body,
            Backend::ClnRest($session) => $body,
            Backend::EclairRest($session) => $body,
        }
    };
}

/// Authenticated client for one Lightning node.
///
/// The backend is chosen once at construction; switching backends means building a new client.
/// Calls take `&self` and may run concurrently. Invoice creation and payments are never retried
/// by the client.
///
/// ```no_run
/// use lnclient::{BackendKind, InvoiceRequest, NodeClient, NodeConfig};
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), lnclient::Error> {
/// let config = NodeConfig::new("https://127.0.0.1:8081")
///     .with_macaroon("0201036c6e64...")
///     .with_certificate("-----BEGIN CERTIFICATE-----...");
/// let node = NodeClient::new(BackendKind::LndRest, &config)?;
/// let info = node.get_info().await?;
/// let invoice = node
///     .create_invoice(&InvoiceRequest::new(100, "test bindings"))
///     .await?;
/// println!("{} {}", info.version, invoice.payment_request);
/// # Ok(())
/// # }
/// ```
pub struct NodeClient {
    backend: Backend,
    url: String,
    active: AtomicBool,
}

impl NodeClient {
    /// Validate `config` for `kind` and build the matching network transport.
    ///
    /// No connection is opened until the first call.
    ///
    /// # Errors
    /// Returns [`Error::Config`] for missing or malformed fields and [`Error::AuthConfig`] when
    /// the certificate cannot be used as a TLS trust anchor.
    pub fn new(kind: BackendKind, config: &NodeConfig) -> Result<Self> {
        let url = config.base_url()?;
        let credentials = Credentials::from_config(kind, config)?;
        let timeout = config.call_timeout();
        let transport: Arc<dyn Transport> = match kind {
            BackendKind::LndGrpc => Arc::new(GrpcTransport::new(url.clone(), credentials.trust())?),
            BackendKind::LndRest | BackendKind::ClnRest | BackendKind::EclairRest => {
                Arc::new(RestTransport::new(url.clone(), credentials.trust(), timeout)?)
            }
        };
        Ok(Self::assemble(url, credentials, transport, timeout))
    }

    /// Same as [`new`](Self::new) with the backend given by name (`"LndRest"`, `"ClnRest"`, ...).
    ///
    /// # Errors
    /// Returns [`Error::Config`] for an unknown backend name, otherwise as [`new`](Self::new).
    pub fn from_name(backend: &str, config: &NodeConfig) -> Result<Self> {
        Self::new(backend.parse()?, config)
    }

    /// Validate `config` for `kind` and send every call through `transport`.
    ///
    /// # Errors
    /// Returns [`Error::Config`] for missing or malformed fields.
    pub fn with_transport(
        kind: BackendKind,
        config: &NodeConfig,
        transport: Arc<dyn Transport>,
    ) -> Result<Self> {
        let url = config.base_url()?;
        let credentials = Credentials::from_config(kind, config)?;
        Ok(Self::assemble(url, credentials, transport, config.call_timeout()))
    }

    fn assemble(
        url: String,
        credentials: Credentials,
        transport: Arc<dyn Transport>,
        timeout: Duration,
    ) -> Self {
        let kind = credentials.backend();
        let backend = match kind {
            BackendKind::LndRest => Backend::LndRest(Session {
                codec: LndRestCodec,
                credentials,
                transport,
                timeout,
            }),
            BackendKind::LndGrpc => Backend::LndGrpc(Session {
                codec: LndGrpcCodec,
                credentials,
                transport,
                timeout,
            }),
            BackendKind::ClnRest => Backend::ClnRest(Session {
                codec: ClnRestCodec,
                credentials,
                transport,
                timeout,
            }),
            BackendKind::EclairRest => Backend::EclairRest(Session {
                codec: EclairRestCodec,
                credentials,
                transport,
                timeout,
            }),
        };
        debug!(target: "lnclient::client", backend = %kind, %url, ?timeout, "client constructed");
        Self {
            backend,
            url,
            active: AtomicBool::new(false),
        }
    }

    pub fn backend(&self) -> BackendKind {
        match self.backend {
            Backend::LndRest(_) => BackendKind::LndRest,
            Backend::LndGrpc(_) => BackendKind::LndGrpc,
            Backend::ClnRest(_) => BackendKind::ClnRest,
            Backend::EclairRest(_) => BackendKind::EclairRest,
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Deadline applied to each call.
    pub fn timeout(&self) -> Duration {
        with_session!(&self.backend, s => s.timeout)
    }

    pub fn state(&self) -> ClientState {
        if self.active.load(Ordering::Acquire) {
            ClientState::Active
        } else {
            ClientState::Constructed
        }
    }

    /// Fetch node identity and chain sync status.
    ///
    /// # Errors
    /// Returns the transport, authentication, protocol or remote error of the call.
    pub async fn get_info(&self) -> Result<NodeInfo> {
        let result = with_session!(&self.backend, s => s.get_info().await);
        self.record(Operation::GetInfo, result)
    }

    /// Create an invoice. Zero `amount` requests an any-amount invoice.
    ///
    /// A call that times out or is cancelled may still have created the invoice on the node.
    ///
    /// # Errors
    /// Returns [`Error::Validation`] without contacting the node for negative amounts, otherwise
    /// the error of the call.
    pub async fn create_invoice(&self, request: &InvoiceRequest) -> Result<InvoiceResponse> {
        let result = with_session!(&self.backend, s => s.create_invoice(request).await);
        self.record(Operation::CreateInvoice, result)
    }

    /// Look up an invoice by its hex payment hash.
    ///
    /// # Errors
    /// Returns [`Error::Validation`] for a hash that is not 32 bytes of hex, otherwise the error
    /// of the call.
    pub async fn lookup_invoice(&self, payment_hash: &str) -> Result<Invoice> {
        let result = match PaymentHash::from_hex(payment_hash) {
            Ok(hash) => with_session!(&self.backend, s => s.lookup_invoice(&hash).await),
            Err(e) => Err(e.into()),
        };
        self.record(Operation::LookupInvoice, result)
    }

    /// Pay a BOLT11 invoice and wait for the outcome.
    ///
    /// # Errors
    /// Returns [`Error::Validation`] for negative amounts or fees, [`Error::Remote`] when the node
    /// reports the payment as failed, otherwise the error of the call.
    pub async fn pay_invoice(&self, request: &PayRequest) -> Result<PaymentResponse> {
        let result = with_session!(&self.backend, s => s.pay_invoice(request).await);
        self.record(Operation::PayInvoice, result)
    }

    fn record<T>(&self, operation: Operation, result: Result<T>) -> Result<T> {
        match &result {
            Ok(_) => {
                if !self.active.swap(true, Ordering::AcqRel) {
                    debug!(target: "lnclient::client", backend = %self.backend(), %operation, "client active");
                }
            }
            Err(e) => {
                debug!(target: "lnclient::client", backend = %self.backend(), %operation, error = %e, "call failed");
            }
        }
        result
    }
}

impl fmt::Debug for NodeClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NodeClient")
            .field("backend", &self.backend())
            .field("url", &self.url)
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}
