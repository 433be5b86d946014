//! Client TLS configuration pinned to the node's certificate.
//!
//! Node implementations generate self-signed certificates that are often marked `CA:TRUE` and
//! rarely list the hostname a caller dials, so web PKI path validation rejects them. Trust is
//! instead established by comparing the presented end-entity certificate with the configured
//! one (or its SHA-256 fingerprint). Handshake signatures are still verified.

use std::sync::Arc;

use hyper_rustls::ConfigBuilderExt;
use rustls::{
    client::danger::{HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier},
    crypto::{verify_tls12_signature, verify_tls13_signature, CryptoProvider},
    pki_types::{CertificateDer, ServerName, UnixTime},
    CertificateError, ClientConfig, DigitallySignedStruct, RootCertStore, SignatureScheme,
};
use sha2::{Digest, Sha256};

use crate::credentials::TrustAnchor;

#[derive(Debug, thiserror::Error)]
pub enum TlsConfigError {
    #[error("unusable TLS trust anchor: {0}")]
    Rustls(#[from] rustls::Error),
    #[error("failed to load platform root certificates: {0}")]
    NativeRoots(#[from] std::io::Error),
}

pub(crate) fn provider() -> Arc<CryptoProvider> {
    Arc::new(rustls::crypto::ring::default_provider())
}

/// Build a rustls client config for `trust`.
///
/// Returns `Ok(None)` for [`TrustAnchor::SystemRoots`]; the caller keeps its default web PKI
/// setup in that case. ALPN is left empty: the HTTP connectors negotiate it themselves and refuse
/// configs that predefine protocols.
///
/// # Errors
/// Returns [`TlsConfigError`] when a configured certificate is not a parseable X.509 DER blob.
pub fn client_config(trust: &TrustAnchor) -> Result<Option<ClientConfig>, TlsConfigError> {
    let pin = match trust {
        TrustAnchor::SystemRoots => return Ok(None),
        TrustAnchor::Certificate(der) => {
            // Parse once up front so garbage fails at construction rather than at handshake.
            RootCertStore::empty().add(CertificateDer::from(der.clone()))?;
            Pin::Certificate(der.clone())
        }
        TrustAnchor::Fingerprint(fp) => Pin::Fingerprint(*fp),
    };

    let provider = provider();
    let verifier = Arc::new(PinnedCertVerifier {
        pin,
        provider: provider.clone(),
    });
    let config = ClientConfig::builder_with_provider(provider)
        .with_safe_default_protocol_versions()?
        .dangerous()
        .with_custom_certificate_verifier(verifier)
        .with_no_client_auth();
    Ok(Some(config))
}

/// Web PKI config backed by the platform trust store, for endpoints without a pinned certificate.
pub(crate) fn native_roots_config() -> Result<ClientConfig, TlsConfigError> {
    Ok(ClientConfig::builder_with_provider(provider())
        .with_safe_default_protocol_versions()?
        .with_native_roots()?
        .with_no_client_auth())
}

#[derive(Debug)]
enum Pin {
    Certificate(Vec<u8>),
    Fingerprint([u8; 32]),
}

impl Pin {
    fn matches(&self, end_entity: &[u8]) -> bool {
        match self {
            Pin::Certificate(der) => der.as_slice() == end_entity,
            Pin::Fingerprint(fp) => Sha256::digest(end_entity).as_slice() == fp,
        }
    }
}

#[derive(Debug)]
struct PinnedCertVerifier {
    pin: Pin,
    provider: Arc<CryptoProvider>,
}

impl ServerCertVerifier for PinnedCertVerifier {
    fn verify_server_cert(
        &self,
        end_entity: &CertificateDer<'_>,
        _intermediates: &[CertificateDer<'_>],
        _server_name: &ServerName<'_>,
        _ocsp_response: &[u8],
        _now: UnixTime,
    ) -> Result<ServerCertVerified, rustls::Error> {
        if self.pin.matches(end_entity.as_ref()) {
            Ok(ServerCertVerified::assertion())
        } else {
            Err(rustls::Error::InvalidCertificate(
                CertificateError::ApplicationVerificationFailure,
            ))
        }
    }

    fn verify_tls12_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        verify_tls12_signature(
            message,
            cert,
            dss,
            &self.provider.signature_verification_algorithms,
        )
    }

    fn verify_tls13_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        verify_tls13_signature(
            message,
            cert,
            dss,
            &self.provider.signature_verification_algorithms,
        )
    }

    fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
        self.provider
            .signature_verification_algorithms
            .supported_schemes()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pins_compare_exact_bytes_or_digest() {
        let der = b"certificate bytes".to_vec();
        assert!(Pin::Certificate(der.clone()).matches(&der));
        assert!(!Pin::Certificate(der.clone()).matches(b"other"));

        let fp: [u8; 32] = Sha256::digest(&der).into();
        assert!(Pin::Fingerprint(fp).matches(&der));
        assert!(!Pin::Fingerprint([0; 32]).matches(&der));
    }

    #[test]
    fn garbage_certificates_are_rejected_up_front() {
        let trust = TrustAnchor::Certificate(vec![0xa1, 0xb2, 0xc3]);
        assert!(client_config(&trust).is_err());
    }

    #[test]
    fn fingerprint_pins_need_no_parsing() {
        let config = client_config(&TrustAnchor::Fingerprint([7; 32]))
            .unwrap()
            .unwrap();
        assert!(config.alpn_protocols.is_empty());
        assert!(client_config(&TrustAnchor::SystemRoots).unwrap().is_none());
    }
}
