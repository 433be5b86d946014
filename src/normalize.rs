//! Mapping of backend response types onto the domain schema.
//!
//! Every conversion here is pure: no I/O, no clock, same input gives the same output.

use base64::{
    engine::general_purpose::{STANDARD, URL_SAFE},
    Engine as _,
};

use crate::{
    client::{Error, Result},
    codec::{cln_rest, eclair_rest, lnd_rest},
    config::BackendKind,
    proto::lnrpc,
    types::{
        ChannelStats, Invoice, InvoiceResponse, InvoiceStatus, Network, NodeInfo, PaymentResponse,
    },
};

/// Conversion of a decoded backend response into its domain counterpart.
pub trait Normalize {
    type Output;

    fn normalize(self) -> Result<Self::Output>;
}

/// Millisatoshis to satoshis, rounding down.
pub fn msat_to_sat(msat: u64) -> u64 {
    msat / 1_000
}

pub fn sat_to_msat(sat: u64) -> Option<u64> {
    sat.checked_mul(1_000)
}

/// Re-encode a base64 byte string (as LND's REST gateway emits them) as lowercase hex.
///
/// Values that already are even-length hex of 32 bytes are passed through lowercased.
pub fn base64_to_hex(field: &'static str, value: &str) -> Result<String> {
    let value = value.trim();
    if value.len() == 64 && value.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Ok(value.to_ascii_lowercase());
    }
    STANDARD
        .decode(value)
        .or_else(|_| URL_SAFE.decode(value))
        .map(hex::encode)
        .map_err(|e| Error::protocol(field, e))
}

fn optional_hex(field: &'static str, value: Option<&str>) -> Result<Option<String>> {
    match value.map(str::trim).filter(|v| !v.is_empty()) {
        Some(v) => base64_to_hex(field, v).map(Some),
        None => Ok(None),
    }
}

fn non_empty(value: String) -> Option<String> {
    (!value.is_empty()).then_some(value)
}

fn positive(value: i64) -> Option<i64> {
    (value > 0).then_some(value)
}

fn lnd_network(networks: &[&str], testnet: bool) -> Network {
    match networks.first() {
        Some(network) => Network::from_name(network),
        None if testnet => Network::Testnet,
        None => Network::Unknown(String::new()),
    }
}

fn lnd_invoice_status(state: &str) -> Result<InvoiceStatus> {
    match state {
        "OPEN" => Ok(InvoiceStatus::Pending),
        "SETTLED" => Ok(InvoiceStatus::Settled),
        "CANCELED" => Ok(InvoiceStatus::Cancelled),
        "ACCEPTED" => Ok(InvoiceStatus::Accepted),
        other => Err(Error::protocol_message(format!("unknown invoice state {other}"))),
    }
}

// LND REST

impl Normalize for lnd_rest::GetInfoResponse {
    type Output = NodeInfo;

    fn normalize(self) -> Result<NodeInfo> {
        let networks: Vec<&str> = self.chains.iter().map(|c| c.network.as_str()).collect();
        Ok(NodeInfo {
            backend: BackendKind::LndRest,
            network: lnd_network(&networks, self.testnet),
            channels: Some(ChannelStats {
                active: self.num_active_channels,
                inactive: self.num_inactive_channels,
                pending: self.num_pending_channels,
            }),
            version: self.version,
            alias: self.alias,
            pubkey: self.identity_pubkey,
            block_height: self.block_height,
            synced: self.synced_to_chain,
        })
    }
}

impl Normalize for lnd_rest::AddInvoiceResponse {
    type Output = InvoiceResponse;

    fn normalize(self) -> Result<InvoiceResponse> {
        Ok(InvoiceResponse {
            payment_hash: base64_to_hex("r_hash", &self.r_hash)?,
            payment_request: self.payment_request,
            add_index: self.add_index,
        })
    }
}

impl Normalize for lnd_rest::Invoice {
    type Output = Invoice;

    fn normalize(self) -> Result<Invoice> {
        let status = lnd_invoice_status(&self.state)?;
        let preimage = match status {
            InvoiceStatus::Settled => optional_hex("r_preimage", self.r_preimage.as_deref())?,
            _ => None,
        };
        Ok(Invoice {
            payment_hash: base64_to_hex("r_hash", &self.r_hash)?,
            preimage,
            status,
            payment_request: self.payment_request,
            description: non_empty(self.memo),
            amount: msat_to_sat(self.value_msat),
            amount_msat: self.value_msat,
            created_at: positive(self.creation_date),
            settled_at: positive(self.settle_date),
        })
    }
}

impl Normalize for lnd_rest::SendResponse {
    type Output = PaymentResponse;

    fn normalize(self) -> Result<PaymentResponse> {
        let fee_msat = self.payment_route.map_or(0, |r| r.total_fees_msat);
        Ok(PaymentResponse {
            payment_hash: base64_to_hex("payment_hash", &self.payment_hash)?,
            preimage: base64_to_hex("payment_preimage", &self.payment_preimage)?,
            fee_msat,
            fee: msat_to_sat(fee_msat),
        })
    }
}

// LND gRPC

impl Normalize for lnrpc::GetInfoResponse {
    type Output = NodeInfo;

    fn normalize(self) -> Result<NodeInfo> {
        let networks: Vec<&str> = self.chains.iter().map(|c| c.network.as_str()).collect();
        Ok(NodeInfo {
            backend: BackendKind::LndGrpc,
            network: lnd_network(&networks, self.testnet),
            channels: Some(ChannelStats {
                active: self.num_active_channels,
                inactive: self.num_inactive_channels,
                pending: self.num_pending_channels,
            }),
            version: self.version,
            alias: self.alias,
            pubkey: self.identity_pubkey,
            block_height: self.block_height,
            synced: self.synced_to_chain,
        })
    }
}

impl Normalize for lnrpc::AddInvoiceResponse {
    type Output = InvoiceResponse;

    fn normalize(self) -> Result<InvoiceResponse> {
        Ok(InvoiceResponse {
            payment_hash: hex::encode(self.r_hash),
            payment_request: self.payment_request,
            add_index: (self.add_index > 0).then_some(self.add_index),
        })
    }
}

impl Normalize for lnrpc::Invoice {
    type Output = Invoice;

    fn normalize(self) -> Result<Invoice> {
        use lnrpc::invoice::InvoiceState;

        let status = match InvoiceState::try_from(self.state) {
            Ok(InvoiceState::Open) => InvoiceStatus::Pending,
            Ok(InvoiceState::Settled) => InvoiceStatus::Settled,
            Ok(InvoiceState::Canceled) => InvoiceStatus::Cancelled,
            Ok(InvoiceState::Accepted) => InvoiceStatus::Accepted,
            Err(_) => {
                return Err(Error::protocol_message(format!(
                    "unknown invoice state {}",
                    self.state
                )))
            }
        };
        let amount_msat = u64::try_from(self.value_msat)
            .map_err(|_| Error::protocol_message("negative invoice amount"))?;
        Ok(Invoice {
            payment_hash: hex::encode(&self.r_hash),
            preimage: (status == InvoiceStatus::Settled && !self.r_preimage.is_empty())
                .then(|| hex::encode(&self.r_preimage)),
            status,
            payment_request: self.payment_request,
            description: non_empty(self.memo),
            amount: msat_to_sat(amount_msat),
            amount_msat,
            created_at: positive(self.creation_date),
            settled_at: positive(self.settle_date),
        })
    }
}

impl Normalize for lnrpc::SendResponse {
    type Output = PaymentResponse;

    fn normalize(self) -> Result<PaymentResponse> {
        let fee_msat = match self.payment_route {
            Some(route) => u64::try_from(route.total_fees_msat)
                .map_err(|_| Error::protocol_message("negative route fee"))?,
            None => 0,
        };
        Ok(PaymentResponse {
            payment_hash: hex::encode(self.payment_hash),
            preimage: hex::encode(self.payment_preimage),
            fee_msat,
            fee: msat_to_sat(fee_msat),
        })
    }
}

// Core Lightning

impl Normalize for cln_rest::GetInfoResponse {
    type Output = NodeInfo;

    fn normalize(self) -> Result<NodeInfo> {
        Ok(NodeInfo {
            backend: BackendKind::ClnRest,
            synced: self.warning_bitcoind_sync.is_none() && self.warning_lightningd_sync.is_none(),
            network: Network::from_name(&self.network),
            channels: Some(ChannelStats {
                active: self.num_active_channels,
                inactive: self.num_inactive_channels,
                pending: self.num_pending_channels,
            }),
            version: self.version,
            alias: self.alias,
            pubkey: self.id,
            block_height: self.blockheight,
        })
    }
}

impl Normalize for cln_rest::InvoiceResponse {
    type Output = InvoiceResponse;

    fn normalize(self) -> Result<InvoiceResponse> {
        Ok(InvoiceResponse {
            payment_hash: self.payment_hash.to_ascii_lowercase(),
            payment_request: self.bolt11,
            add_index: self.created_index,
        })
    }
}

impl Normalize for cln_rest::ListedInvoice {
    type Output = Invoice;

    fn normalize(self) -> Result<Invoice> {
        let status = match self.status.as_str() {
            "unpaid" => InvoiceStatus::Pending,
            "paid" => InvoiceStatus::Settled,
            "expired" => InvoiceStatus::Expired,
            other => {
                return Err(Error::protocol_message(format!("unknown invoice status {other}")))
            }
        };
        let amount_msat = self.amount_msat.unwrap_or(0);
        Ok(Invoice {
            payment_request: self.bolt11.unwrap_or_default(),
            payment_hash: self.payment_hash.to_ascii_lowercase(),
            description: self.description,
            amount: msat_to_sat(amount_msat),
            amount_msat,
            status,
            created_at: None,
            settled_at: self.paid_at,
            preimage: self.payment_preimage.map(|p| p.to_ascii_lowercase()),
        })
    }
}

impl Normalize for cln_rest::PayResponse {
    type Output = PaymentResponse;

    fn normalize(self) -> Result<PaymentResponse> {
        let fee_msat = match (self.amount_sent_msat, self.amount_msat) {
            (Some(sent), Some(amount)) => sent.saturating_sub(amount),
            _ => 0,
        };
        Ok(PaymentResponse {
            payment_hash: self.payment_hash.to_ascii_lowercase(),
            preimage: self.payment_preimage.to_ascii_lowercase(),
            fee_msat,
            fee: msat_to_sat(fee_msat),
        })
    }
}

// Eclair

fn eclair_seconds(ts: eclair_rest::Timestamp) -> i64 {
    match ts {
        eclair_rest::Timestamp::Unix { unix } => unix,
        // Older releases report milliseconds for some fields.
        eclair_rest::Timestamp::Raw(v) if v > 100_000_000_000 => v / 1_000,
        eclair_rest::Timestamp::Raw(v) => v,
    }
}

impl Normalize for eclair_rest::GetInfoResponse {
    type Output = NodeInfo;

    fn normalize(self) -> Result<NodeInfo> {
        Ok(NodeInfo {
            backend: BackendKind::EclairRest,
            network: Network::from_name(&self.network),
            version: self.version,
            alias: self.alias,
            pubkey: self.node_id,
            block_height: self.block_height,
            // Eclair only opens its API once its bitcoind has finished the initial sync.
            synced: true,
            channels: None,
        })
    }
}

impl Normalize for eclair_rest::PaymentRequest {
    type Output = InvoiceResponse;

    fn normalize(self) -> Result<InvoiceResponse> {
        Ok(InvoiceResponse {
            payment_request: self.serialized,
            payment_hash: self.payment_hash.to_ascii_lowercase(),
            add_index: None,
        })
    }
}

impl Normalize for eclair_rest::ReceivedInfo {
    type Output = Invoice;

    fn normalize(self) -> Result<Invoice> {
        let status = match self.status.kind.as_str() {
            "pending" => InvoiceStatus::Pending,
            "received" => InvoiceStatus::Settled,
            "expired" => InvoiceStatus::Expired,
            other => {
                return Err(Error::protocol_message(format!("unknown invoice status {other}")))
            }
        };
        let request = self.payment_request;
        let amount_msat = request.amount.unwrap_or(0);
        Ok(Invoice {
            payment_request: request.serialized,
            payment_hash: request.payment_hash.to_ascii_lowercase(),
            description: request.description,
            amount: msat_to_sat(amount_msat),
            amount_msat,
            status,
            created_at: request.timestamp.map(eclair_seconds),
            settled_at: self.status.received_at.map(eclair_seconds),
            preimage: if status == InvoiceStatus::Settled {
                self.payment_preimage.map(|p| p.to_ascii_lowercase())
            } else {
                None
            },
        })
    }
}

impl Normalize for eclair_rest::PaymentSent {
    type Output = PaymentResponse;

    fn normalize(self) -> Result<PaymentResponse> {
        let fee_msat = self.parts.iter().map(|p| p.fees_paid).sum();
        Ok(PaymentResponse {
            payment_hash: self.payment_hash.to_ascii_lowercase(),
            preimage: self.payment_preimage.to_ascii_lowercase(),
            fee_msat,
            fee: msat_to_sat(fee_msat),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unit_conversions() {
        assert_eq!(msat_to_sat(100_000), 100);
        assert_eq!(msat_to_sat(1_999), 1);
        assert_eq!(sat_to_msat(21), Some(21_000));
        assert_eq!(sat_to_msat(u64::MAX), None);
    }

    #[test]
    fn base64_hashes_become_hex() {
        assert_eq!(base64_to_hex("r_hash", "AAEC/w==").unwrap(), "000102ff");
        assert_eq!(base64_to_hex("r_hash", "AAEC_w==").unwrap(), "000102ff");
        let hex = "AB".repeat(32);
        assert_eq!(base64_to_hex("r_hash", &hex).unwrap(), "ab".repeat(32));
        assert!(matches!(
            base64_to_hex("r_hash", "%%%"),
            Err(Error::Protocol { .. })
        ));
    }

    #[test]
    fn lnd_network_prefers_chain_list() {
        assert_eq!(lnd_network(&["regtest"], false), Network::Regtest);
        assert_eq!(lnd_network(&[], true), Network::Testnet);
        assert_eq!(lnd_network(&[], false), Network::Unknown(String::new()));
    }

    #[test]
    fn negative_route_fees_are_rejected() {
        let sent = lnrpc::SendResponse {
            payment_hash: vec![0xab; 32],
            payment_preimage: vec![0xcd; 32],
            payment_route: Some(lnrpc::Route {
                total_fees_msat: -5,
                ..Default::default()
            }),
            ..Default::default()
        };
        assert!(matches!(sent.normalize(), Err(Error::Protocol { .. })));
    }

    #[test]
    fn payment_hex_is_lowercased() {
        let cln = cln_rest::PayResponse {
            payment_hash: "AB".repeat(32),
            payment_preimage: "CD".repeat(32),
            status: "complete".into(),
            amount_msat: Some(100_000),
            amount_sent_msat: Some(100_100),
        }
        .normalize()
        .unwrap();
        assert_eq!(cln.payment_hash, "ab".repeat(32));
        assert_eq!(cln.preimage, "cd".repeat(32));
        assert_eq!(cln.fee_msat, 100);

        let eclair = eclair_rest::PaymentSent {
            kind: "payment-sent".into(),
            payment_hash: "AB".repeat(32),
            payment_preimage: "CD".repeat(32),
            parts: Vec::new(),
        }
        .normalize()
        .unwrap();
        assert_eq!(eclair.payment_hash, "ab".repeat(32));
        assert_eq!(eclair.preimage, "cd".repeat(32));
    }

    #[test]
    fn normalization_is_deterministic() {
        let info = cln_rest::GetInfoResponse {
            id: "02ab".into(),
            alias: "cln".into(),
            version: "v24.02".into(),
            blockheight: 800_000,
            network: "bitcoin".into(),
            warning_bitcoind_sync: None,
            warning_lightningd_sync: Some("still loading".into()),
            num_active_channels: 2,
            num_inactive_channels: 1,
            num_pending_channels: 0,
        };
        let first = info.clone().normalize().unwrap();
        assert_eq!(first, info.normalize().unwrap());
        assert!(!first.synced);
        assert_eq!(first.network, Network::Mainnet);
        assert_eq!(
            first.channels,
            Some(ChannelStats {
                active: 2,
                inactive: 1,
                pending: 0
            })
        );
    }
}
