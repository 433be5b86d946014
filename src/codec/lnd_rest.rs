//! LND REST gateway (`/v1/...`, JSON, macaroon header).

use serde::{Deserialize, Serialize};

use super::{decode_json, string_or_number, BackendCodec};
use crate::{
    client::{Error, Result},
    config::{BackendKind, DEFAULT_INVOICE_EXPIRY_SECS},
    transport::{WireRequest, WireResponse},
    types::{InvoiceRequest, PayRequest, PaymentHash},
};

#[derive(Clone, Copy, Debug, Default)]
pub struct LndRestCodec;

#[derive(Debug, Serialize)]
struct AddInvoiceBody<'a> {
    memo: &'a str,
    value_msat: String,
    expiry: String,
}

#[derive(Debug, Serialize)]
struct SendPaymentBody<'a> {
    payment_request: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    amt_msat: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    fee_limit: Option<FeeLimitBody>,
}

#[derive(Debug, Serialize)]
struct FeeLimitBody {
    fixed_msat: String,
}

#[derive(Clone, Debug, Deserialize)]
pub struct Chain {
    #[serde(default)]
    pub chain: String,
    #[serde(default)]
    pub network: String,
}

/// `GET /v1/getinfo`. Only `version` and `synced_to_chain` are required.
#[derive(Clone, Debug, Deserialize)]
pub struct GetInfoResponse {
    pub version: String,
    pub synced_to_chain: bool,
    #[serde(default)]
    pub identity_pubkey: String,
    #[serde(default)]
    pub alias: String,
    #[serde(default, deserialize_with = "string_or_number::deserialize")]
    pub block_height: u32,
    #[serde(default)]
    pub chains: Vec<Chain>,
    #[serde(default)]
    pub testnet: bool,
    #[serde(default, deserialize_with = "string_or_number::deserialize")]
    pub num_active_channels: u32,
    #[serde(default, deserialize_with = "string_or_number::deserialize")]
    pub num_inactive_channels: u32,
    #[serde(default, deserialize_with = "string_or_number::deserialize")]
    pub num_pending_channels: u32,
}

/// `POST /v1/invoices`. Hashes are base64.
#[derive(Clone, Debug, Deserialize)]
pub struct AddInvoiceResponse {
    pub r_hash: String,
    pub payment_request: String,
    #[serde(default, deserialize_with = "string_or_number::option")]
    pub add_index: Option<u64>,
}

/// `GET /v1/invoice/{r_hash_str}`.
#[derive(Clone, Debug, Deserialize)]
pub struct Invoice {
    pub r_hash: String,
    #[serde(default)]
    pub payment_request: String,
    #[serde(default)]
    pub memo: String,
    #[serde(default)]
    pub r_preimage: Option<String>,
    #[serde(default, deserialize_with = "string_or_number::deserialize")]
    pub value_msat: u64,
    #[serde(default, deserialize_with = "string_or_number::deserialize")]
    pub creation_date: i64,
    #[serde(default, deserialize_with = "string_or_number::deserialize")]
    pub settle_date: i64,
    pub state: String,
}

#[derive(Clone, Debug, Deserialize)]
pub struct Route {
    #[serde(default, deserialize_with = "string_or_number::deserialize")]
    pub total_fees_msat: u64,
}

/// `POST /v1/channels/transactions`. A non-empty `payment_error` means the payment failed.
#[derive(Clone, Debug, Deserialize)]
pub struct SendResponse {
    #[serde(default)]
    pub payment_error: String,
    #[serde(default)]
    pub payment_preimage: String,
    #[serde(default)]
    pub payment_hash: String,
    #[serde(default)]
    pub payment_route: Option<Route>,
}

impl BackendCodec for LndRestCodec {
    const KIND: BackendKind = BackendKind::LndRest;

    type Info = GetInfoResponse;
    type Created = AddInvoiceResponse;
    type Lookup = Invoice;
    type Payment = SendResponse;

    fn encode_get_info(&self) -> Result<WireRequest> {
        Ok(WireRequest::get("/v1/getinfo"))
    }

    fn decode_get_info(&self, response: WireResponse) -> Result<Self::Info> {
        decode_json(Self::KIND, "getinfo response", response)
    }

    fn encode_create_invoice(&self, request: &InvoiceRequest) -> Result<WireRequest> {
        let value_msat = request.amount_msat()?;
        let body = AddInvoiceBody {
            memo: &request.description,
            value_msat: value_msat.to_string(),
            expiry: request
                .expiry
                .unwrap_or(DEFAULT_INVOICE_EXPIRY_SECS)
                .to_string(),
        };
        WireRequest::post("/v1/invoices")
            .json(&body)
            .map_err(|e| Error::protocol("invoice request", e))
    }

    fn decode_create_invoice(&self, response: WireResponse) -> Result<Self::Created> {
        decode_json(Self::KIND, "invoice response", response)
    }

    fn encode_lookup_invoice(&self, payment_hash: &PaymentHash) -> Result<WireRequest> {
        Ok(WireRequest::get(format!("/v1/invoice/{payment_hash}")))
    }

    fn decode_lookup_invoice(&self, response: WireResponse) -> Result<Self::Lookup> {
        decode_json(Self::KIND, "invoice lookup response", response)
    }

    fn encode_pay_invoice(&self, request: &PayRequest) -> Result<WireRequest> {
        let (amount_msat, max_fee_msat) = request.amounts_msat()?;
        let body = SendPaymentBody {
            payment_request: request.payment_request.trim(),
            amt_msat: amount_msat.map(|v| v.to_string()),
            fee_limit: max_fee_msat.map(|v| FeeLimitBody {
                fixed_msat: v.to_string(),
            }),
        };
        WireRequest::post("/v1/channels/transactions")
            .json(&body)
            .map_err(|e| Error::protocol("payment request", e))
    }

    fn decode_pay_invoice(&self, response: WireResponse) -> Result<Self::Payment> {
        let status = response.status.as_u16();
        let decoded: SendResponse = decode_json(Self::KIND, "payment response", response)?;
        if !decoded.payment_error.is_empty() {
            return Err(Error::Remote {
                status,
                message: decoded.payment_error,
            });
        }
        Ok(decoded)
    }
}
