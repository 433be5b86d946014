#![deny(unsafe_code)]

//! Unified client for Lightning node APIs.
//!
//! One [`NodeClient`] talks to one node through the API selected by [`BackendKind`] and exposes
//! the same typed operations for every backend: [`get_info`](NodeClient::get_info),
//! [`create_invoice`](NodeClient::create_invoice), [`lookup_invoice`](NodeClient::lookup_invoice)
//! and [`pay_invoice`](NodeClient::pay_invoice).
//!
//! Backends
//! - `LndRest`: LND REST gateway, macaroon in the `Grpc-Metadata-macaroon` header
//! - `LndGrpc`: LND gRPC over tonic, macaroon in request metadata
//! - `ClnRest`: Core Lightning `clnrest`, rune header
//! - `EclairRest`: Eclair HTTP API, basic auth
//!
//! Layers
//! - [`credentials`]: parses the configured credential and TLS trust anchor and attaches auth
//!   headers to each request
//! - [`codec`]: encodes requests and decodes responses in each backend's wire format
//! - [`normalize`]: maps backend responses onto the types in [`types`]
//! - [`transport`]: sends encoded requests over REST or gRPC; implement [`Transport`] to plug in
//!   a custom channel
//!
//! Example (custom transport)
//! ```
//! use std::sync::Arc;
//!
//! use async_trait::async_trait;
//! use lnclient::transport::{Transport, TransportError, WireRequest, WireResponse};
//! use lnclient::{BackendKind, NodeClient, NodeConfig};
//!
//! struct Canned;
//!
//! #[async_trait]
//! impl Transport for Canned {
//!     async fn send(&self, _request: WireRequest) -> Result<WireResponse, TransportError> {
//!         Ok(WireResponse::ok(r#"{"version":"0.17.0","synced_to_chain":true}"#))
//!     }
//! }
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), lnclient::Error> {
//! let config = NodeConfig::new("https://127.0.0.1:8081")
//!     .with_macaroon("a1b2c3")
//!     .with_certificate("a1b2c3");
//! let node = NodeClient::with_transport(BackendKind::LndRest, &config, Arc::new(Canned))?;
//! let info = node.get_info().await?;
//! assert_eq!(info.version, "0.17.0");
//! assert!(info.synced);
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod codec;
pub mod config;
pub mod credentials;
pub mod normalize;
pub mod proto;
pub mod transport;
pub mod types;

pub use client::{ClientState, Error, NodeClient, Operation, Result};
pub use config::{BackendKind, ConfigError, NodeConfig};
pub use transport::{Transport, TransportError};
pub use types::{
    ChannelStats, Invoice, InvoiceRequest, InvoiceResponse, InvoiceStatus, Network, NodeInfo,
    PayRequest, PaymentHash, PaymentResponse, ValidationError,
};
