//! Core Lightning `clnrest` plugin (`POST /v1/<method>`, JSON, rune header).

use rand::RngCore;
use serde::{Deserialize, Deserializer, Serialize};

use super::{decode_json, string_or_number, BackendCodec};
use crate::{
    client::{Error, Result},
    config::{BackendKind, DEFAULT_INVOICE_EXPIRY_SECS},
    transport::{WireRequest, WireResponse},
    types::{InvoiceRequest, PayRequest, PaymentHash},
};

#[derive(Clone, Copy, Debug, Default)]
pub struct ClnRestCodec;

/// Invoice labels must be unique per node; callers do not supply one.
fn invoice_label() -> String {
    let mut bytes = [0u8; 8];
    rand::thread_rng().fill_bytes(&mut bytes);
    format!("inv-{}", hex::encode(bytes))
}

/// Millisatoshi amounts: integers on current releases, `"1000msat"` strings on older ones.
fn msat<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Option<u64>, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Number(u64),
        Text(String),
    }

    match Option::<Raw>::deserialize(deserializer)? {
        None => Ok(None),
        Some(Raw::Number(v)) => Ok(Some(v)),
        Some(Raw::Text(s)) => s
            .trim_end_matches("msat")
            .parse()
            .map(Some)
            .map_err(serde::de::Error::custom),
    }
}

#[derive(Debug, Serialize)]
struct InvoiceBody<'a> {
    amount_msat: serde_json::Value,
    label: String,
    description: &'a str,
    expiry: u32,
}

#[derive(Debug, Serialize)]
struct ListInvoicesBody {
    payment_hash: String,
}

#[derive(Debug, Serialize)]
struct PayBody<'a> {
    bolt11: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    amount_msat: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    maxfee: Option<u64>,
}

/// `getinfo`. Sync state is reported through the two warning fields.
#[derive(Clone, Debug, Deserialize)]
pub struct GetInfoResponse {
    pub id: String,
    #[serde(default)]
    pub alias: String,
    pub version: String,
    #[serde(deserialize_with = "string_or_number::deserialize")]
    pub blockheight: u32,
    #[serde(default)]
    pub network: String,
    #[serde(default)]
    pub warning_bitcoind_sync: Option<String>,
    #[serde(default)]
    pub warning_lightningd_sync: Option<String>,
    #[serde(default)]
    pub num_active_channels: u32,
    #[serde(default)]
    pub num_inactive_channels: u32,
    #[serde(default)]
    pub num_pending_channels: u32,
}

#[derive(Clone, Debug, Deserialize)]
pub struct InvoiceResponse {
    pub bolt11: String,
    pub payment_hash: String,
    #[serde(default)]
    pub created_index: Option<u64>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct ListedInvoice {
    #[serde(default)]
    pub bolt11: Option<String>,
    pub payment_hash: String,
    pub status: String,
    #[serde(default, deserialize_with = "msat")]
    pub amount_msat: Option<u64>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub expires_at: Option<i64>,
    #[serde(default)]
    pub paid_at: Option<i64>,
    #[serde(default)]
    pub payment_preimage: Option<String>,
}

#[derive(Clone, Debug, Deserialize)]
struct ListInvoicesResponse {
    invoices: Vec<ListedInvoice>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct PayResponse {
    pub payment_hash: String,
    pub payment_preimage: String,
    pub status: String,
    #[serde(deserialize_with = "msat")]
    pub amount_msat: Option<u64>,
    #[serde(deserialize_with = "msat")]
    pub amount_sent_msat: Option<u64>,
}

impl BackendCodec for ClnRestCodec {
    const KIND: BackendKind = BackendKind::ClnRest;

    type Info = GetInfoResponse;
    type Created = InvoiceResponse;
    type Lookup = ListedInvoice;
    type Payment = PayResponse;

    fn encode_get_info(&self) -> Result<WireRequest> {
        WireRequest::post("/v1/getinfo")
            .json(&serde_json::json!({}))
            .map_err(|e| Error::protocol("getinfo request", e))
    }

    fn decode_get_info(&self, response: WireResponse) -> Result<Self::Info> {
        decode_json(Self::KIND, "getinfo response", response)
    }

    fn encode_create_invoice(&self, request: &InvoiceRequest) -> Result<WireRequest> {
        let amount_msat = match request.amount_msat()? {
            0 => serde_json::Value::from("any"),
            msat => serde_json::Value::from(msat),
        };
        let body = InvoiceBody {
            amount_msat,
            label: invoice_label(),
            description: &request.description,
            expiry: request.expiry.unwrap_or(DEFAULT_INVOICE_EXPIRY_SECS),
        };
        WireRequest::post("/v1/invoice")
            .json(&body)
            .map_err(|e| Error::protocol("invoice request", e))
    }

    fn decode_create_invoice(&self, response: WireResponse) -> Result<Self::Created> {
        decode_json(Self::KIND, "invoice response", response)
    }

    fn encode_lookup_invoice(&self, payment_hash: &PaymentHash) -> Result<WireRequest> {
        let body = ListInvoicesBody {
            payment_hash: payment_hash.to_hex(),
        };
        WireRequest::post("/v1/listinvoices")
            .json(&body)
            .map_err(|e| Error::protocol("listinvoices request", e))
    }

    fn decode_lookup_invoice(&self, response: WireResponse) -> Result<Self::Lookup> {
        let status = response.status.as_u16();
        let listed: ListInvoicesResponse =
            decode_json(Self::KIND, "listinvoices response", response)?;
        listed.invoices.into_iter().next().ok_or(Error::Remote {
            status,
            message: "invoice not found".to_string(),
        })
    }

    fn encode_pay_invoice(&self, request: &PayRequest) -> Result<WireRequest> {
        let (amount_msat, maxfee) = request.amounts_msat()?;
        let body = PayBody {
            bolt11: request.payment_request.trim(),
            amount_msat,
            maxfee,
        };
        WireRequest::post("/v1/pay")
            .json(&body)
            .map_err(|e| Error::protocol("pay request", e))
    }

    fn decode_pay_invoice(&self, response: WireResponse) -> Result<Self::Payment> {
        let status = response.status.as_u16();
        let paid: PayResponse = decode_json(Self::KIND, "pay response", response)?;
        if paid.status != "complete" {
            return Err(Error::Remote {
                status,
                message: format!("payment {}", paid.status),
            });
        }
        Ok(paid)
    }
}
