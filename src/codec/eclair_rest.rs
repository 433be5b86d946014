//! Eclair HTTP API (form-encoded `POST`s, basic auth).

use serde::Deserialize;

use super::{decode_json, BackendCodec};
use crate::{
    client::{Error, Result},
    config::{BackendKind, DEFAULT_INVOICE_EXPIRY_SECS},
    transport::{WireRequest, WireResponse},
    types::{InvoiceRequest, PayRequest, PaymentHash},
};

#[derive(Clone, Copy, Debug, Default)]
pub struct EclairRestCodec;

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetInfoResponse {
    pub version: String,
    pub node_id: String,
    #[serde(default)]
    pub alias: String,
    #[serde(default)]
    pub network: String,
    pub block_height: u32,
}

/// Serialized invoice as returned by `createinvoice` and embedded in `getreceivedinfo`.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentRequest {
    pub serialized: String,
    pub payment_hash: String,
    #[serde(default)]
    pub description: Option<String>,
    /// Millisatoshis; absent for any-amount invoices.
    #[serde(default)]
    pub amount: Option<u64>,
    #[serde(default)]
    pub timestamp: Option<Timestamp>,
}

/// Eclair renders times either as a bare number or as `{"iso": ..., "unix": ...}`.
#[derive(Clone, Copy, Debug, Deserialize)]
#[serde(untagged)]
pub enum Timestamp {
    Unix { unix: i64 },
    Raw(i64),
}

#[derive(Clone, Debug, Deserialize)]
pub struct ReceivedStatus {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, rename = "receivedAt")]
    pub received_at: Option<Timestamp>,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReceivedInfo {
    pub payment_request: PaymentRequest,
    #[serde(default)]
    pub payment_preimage: Option<String>,
    pub status: ReceivedStatus,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentPart {
    #[serde(default)]
    pub fees_paid: u64,
}

/// Outcome of a blocking `payinvoice`.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentSent {
    #[serde(rename = "type")]
    pub kind: String,
    pub payment_hash: String,
    #[serde(default)]
    pub payment_preimage: String,
    #[serde(default)]
    pub parts: Vec<PaymentPart>,
}

impl BackendCodec for EclairRestCodec {
    const KIND: BackendKind = BackendKind::EclairRest;

    type Info = GetInfoResponse;
    type Created = PaymentRequest;
    type Lookup = ReceivedInfo;
    type Payment = PaymentSent;

    fn encode_get_info(&self) -> Result<WireRequest> {
        Ok(WireRequest::post("/getinfo"))
    }

    fn decode_get_info(&self, response: WireResponse) -> Result<Self::Info> {
        decode_json(Self::KIND, "getinfo response", response)
    }

    fn encode_create_invoice(&self, request: &InvoiceRequest) -> Result<WireRequest> {
        let amount_msat = request.amount_msat()?;
        let mut fields = vec![
            ("description", request.description.clone()),
            (
                "expireIn",
                request
                    .expiry
                    .unwrap_or(DEFAULT_INVOICE_EXPIRY_SECS)
                    .to_string(),
            ),
        ];
        if amount_msat > 0 {
            fields.push(("amountMsat", amount_msat.to_string()));
        }
        Ok(WireRequest::post("/createinvoice").form(fields))
    }

    fn decode_create_invoice(&self, response: WireResponse) -> Result<Self::Created> {
        decode_json(Self::KIND, "createinvoice response", response)
    }

    fn encode_lookup_invoice(&self, payment_hash: &PaymentHash) -> Result<WireRequest> {
        Ok(WireRequest::post("/getreceivedinfo").form([("paymentHash", payment_hash.to_hex())]))
    }

    fn decode_lookup_invoice(&self, response: WireResponse) -> Result<Self::Lookup> {
        decode_json(Self::KIND, "getreceivedinfo response", response)
    }

    fn encode_pay_invoice(&self, request: &PayRequest) -> Result<WireRequest> {
        let (amount_msat, max_fee_msat) = request.amounts_msat()?;
        let mut fields = vec![
            ("invoice", request.payment_request.trim().to_string()),
            ("blocking", "true".to_string()),
        ];
        if let Some(msat) = amount_msat {
            fields.push(("amountMsat", msat.to_string()));
        }
        if let Some(msat) = max_fee_msat {
            fields.push(("maxFeeFlatSat", (msat / 1_000).to_string()));
        }
        Ok(WireRequest::post("/payinvoice").form(fields))
    }

    fn decode_pay_invoice(&self, response: WireResponse) -> Result<Self::Payment> {
        let status = response.status.as_u16();
        let sent: PaymentSent = decode_json(Self::KIND, "payinvoice response", response)?;
        if sent.kind != "payment-sent" {
            return Err(Error::Remote {
                status,
                message: sent.kind,
            });
        }
        Ok(sent)
    }
}
