//! Backend-independent request and response shapes.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::config::BackendKind;

/// Bitcoin network a node runs on.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Network {
    Mainnet,
    Testnet,
    Signet,
    Regtest,
    Unknown(String),
}

impl Network {
    /// Map the network names used by the supported backends.
    pub fn from_name(name: &str) -> Self {
        match name {
            "mainnet" | "bitcoin" => Network::Mainnet,
            "testnet" | "testnet3" => Network::Testnet,
            "signet" => Network::Signet,
            "regtest" => Network::Regtest,
            other => Network::Unknown(other.to_string()),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeInfo {
    pub backend: BackendKind,
    pub version: String,
    pub alias: String,
    pub pubkey: String,
    pub block_height: u32,
    pub synced: bool,
    pub network: Network,
    /// `None` when the backend's info call does not report channel counts (Eclair).
    pub channels: Option<ChannelStats>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelStats {
    pub active: u32,
    pub inactive: u32,
    pub pending: u32,
}

/// Parameters for a new invoice. `amount` is in satoshis; zero requests an any-amount invoice.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvoiceRequest {
    pub amount: i64,
    #[serde(default)]
    pub description: String,
    /// Seconds until the invoice expires.
    #[serde(default)]
    pub expiry: Option<u32>,
}

impl InvoiceRequest {
    pub fn new(amount: i64, description: impl Into<String>) -> Self {
        Self {
            amount,
            description: description.into(),
            expiry: None,
        }
    }

    #[must_use]
    pub fn with_expiry(mut self, secs: u32) -> Self {
        self.expiry = Some(secs);
        self
    }

    /// Amount in millisatoshis after validation.
    ///
    /// # Errors
    /// Returns [`ValidationError`] for negative or overflowing amounts and zero expiry.
    pub fn amount_msat(&self) -> Result<u64, ValidationError> {
        if self.expiry == Some(0) {
            return Err(ValidationError::new("expiry", "must be positive"));
        }
        non_negative_msat("amount", self.amount)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvoiceResponse {
    pub payment_request: String,
    /// Lowercase hex.
    pub payment_hash: String,
    pub add_index: Option<u64>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum InvoiceStatus {
    Pending,
    Settled,
    Cancelled,
    Accepted,
    Expired,
}

/// Invoice as stored by the node.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Invoice {
    pub payment_request: String,
    pub payment_hash: String,
    pub description: Option<String>,
    /// Requested amount in satoshis (rounded down); zero for any-amount invoices.
    pub amount: u64,
    pub amount_msat: u64,
    pub status: InvoiceStatus,
    /// Unix seconds, when the backend reports it.
    pub created_at: Option<i64>,
    pub settled_at: Option<i64>,
    /// Lowercase hex, only once settled.
    pub preimage: Option<String>,
}

/// Parameters for paying a BOLT11 invoice.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayRequest {
    pub payment_request: String,
    /// Satoshis to pay when the invoice does not carry an amount.
    #[serde(default)]
    pub amount: Option<i64>,
    /// Fee ceiling in satoshis.
    #[serde(default)]
    pub max_fee: Option<i64>,
}

impl PayRequest {
    pub fn new(payment_request: impl Into<String>) -> Self {
        Self {
            payment_request: payment_request.into(),
            ..Self::default()
        }
    }

    /// Validate and return `(amount_msat, max_fee_msat)`.
    ///
    /// # Errors
    /// Returns [`ValidationError`] for an empty invoice or negative amounts.
    pub fn amounts_msat(&self) -> Result<(Option<u64>, Option<u64>), ValidationError> {
        if self.payment_request.trim().is_empty() {
            return Err(ValidationError::new("payment_request", "must not be empty"));
        }
        let amount = self
            .amount
            .map(|sat| non_negative_msat("amount", sat))
            .transpose()?;
        let max_fee = self
            .max_fee
            .map(|sat| non_negative_msat("max_fee", sat))
            .transpose()?;
        Ok((amount, max_fee))
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentResponse {
    pub payment_hash: String,
    pub preimage: String,
    pub fee_msat: u64,
    /// Fee in satoshis, rounded down.
    pub fee: u64,
}

/// 32-byte payment hash, validated from hex.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct PaymentHash([u8; 32]);

impl PaymentHash {
    /// # Errors
    /// Returns [`ValidationError`] unless `hex` is exactly 64 hex characters.
    pub fn from_hex(hex: &str) -> Result<Self, ValidationError> {
        let bytes = hex::decode(hex.trim())
            .map_err(|_| ValidationError::new("payment_hash", "expected hex"))?;
        bytes
            .try_into()
            .map(Self)
            .map_err(|_| ValidationError::new("payment_hash", "expected 32 bytes"))
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Debug for PaymentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PaymentHash({})", self.to_hex())
    }
}

impl fmt::Display for PaymentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

/// Domain-level rejection of caller input, raised before any network call.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid {field}: {reason}")]
pub struct ValidationError {
    pub field: &'static str,
    pub reason: &'static str,
}

impl ValidationError {
    pub fn new(field: &'static str, reason: &'static str) -> Self {
        Self { field, reason }
    }
}

fn non_negative_msat(field: &'static str, sat: i64) -> Result<u64, ValidationError> {
    let sat = u64::try_from(sat).map_err(|_| ValidationError::new(field, "must not be negative"))?;
    sat.checked_mul(1_000)
        .ok_or(ValidationError::new(field, "too large"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn negative_amounts_are_rejected() {
        let err = InvoiceRequest::new(-1, "x").amount_msat().unwrap_err();
        assert_eq!(err.field, "amount");
        assert_eq!(InvoiceRequest::new(0, "any").amount_msat().unwrap(), 0);
        assert_eq!(InvoiceRequest::new(100, "x").amount_msat().unwrap(), 100_000);
        assert!(InvoiceRequest::new(i64::MAX, "x").amount_msat().is_err());
        assert!(InvoiceRequest::new(1, "x").with_expiry(0).amount_msat().is_err());
    }

    #[test]
    fn pay_request_validation() {
        let mut req = PayRequest::new("lnbc1");
        assert_eq!(req.amounts_msat().unwrap(), (None, None));
        req.max_fee = Some(-5);
        assert_eq!(req.amounts_msat().unwrap_err().field, "max_fee");
        assert!(PayRequest::new("  ").amounts_msat().is_err());
    }

    #[test]
    fn payment_hash_requires_32_bytes() {
        let hash = PaymentHash::from_hex(&"0f".repeat(32)).unwrap();
        assert_eq!(hash.to_hex(), "0f".repeat(32));
        assert!(PaymentHash::from_hex("0f0f").is_err());
        assert!(PaymentHash::from_hex("zz").is_err());
    }

    #[test]
    fn network_names() {
        assert_eq!(Network::from_name("bitcoin"), Network::Mainnet);
        assert_eq!(Network::from_name("regtest"), Network::Regtest);
        assert_eq!(
            Network::from_name("liquid"),
            Network::Unknown("liquid".into())
        );
    }
}
