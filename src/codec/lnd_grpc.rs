//! LND gRPC (`lnrpc.Lightning`, protobuf, macaroon metadata).

use prost::Message;

use super::{check_status, BackendCodec};
use crate::{
    client::{Error, Result},
    config::{BackendKind, DEFAULT_INVOICE_EXPIRY_SECS},
    proto::lnrpc,
    transport::{WireRequest, WireResponse},
    types::{InvoiceRequest, PayRequest, PaymentHash, ValidationError},
};

const GET_INFO: &str = "/lnrpc.Lightning/GetInfo";
const ADD_INVOICE: &str = "/lnrpc.Lightning/AddInvoice";
const LOOKUP_INVOICE: &str = "/lnrpc.Lightning/LookupInvoice";
const SEND_PAYMENT_SYNC: &str = "/lnrpc.Lightning/SendPaymentSync";

#[derive(Clone, Copy, Debug, Default)]
pub struct LndGrpcCodec;

fn decode_message<M: Message + Default>(what: &'static str, response: WireResponse) -> Result<M> {
    let response = check_status(BackendKind::LndGrpc, response)?;
    M::decode(response.body).map_err(|e| Error::protocol(what, e))
}

fn to_i64(field: &'static str, value: u64) -> Result<i64> {
    i64::try_from(value).map_err(|_| ValidationError::new(field, "too large").into())
}

impl BackendCodec for LndGrpcCodec {
    const KIND: BackendKind = BackendKind::LndGrpc;

    type Info = lnrpc::GetInfoResponse;
    type Created = lnrpc::AddInvoiceResponse;
    type Lookup = lnrpc::Invoice;
    type Payment = lnrpc::SendResponse;

    fn encode_get_info(&self) -> Result<WireRequest> {
        Ok(WireRequest::post(GET_INFO).protobuf(&lnrpc::GetInfoRequest {}))
    }

    fn decode_get_info(&self, response: WireResponse) -> Result<Self::Info> {
        let info: lnrpc::GetInfoResponse = decode_message("GetInfo response", response)?;
        // proto3 cannot mark fields required; an empty version means the reply was not GetInfo.
        if info.version.is_empty() {
            return Err(Error::protocol_message("GetInfo response without version"));
        }
        Ok(info)
    }

    fn encode_create_invoice(&self, request: &InvoiceRequest) -> Result<WireRequest> {
        let value_msat = to_i64("amount", request.amount_msat()?)?;
        let invoice = lnrpc::Invoice {
            memo: request.description.clone(),
            value_msat,
            expiry: i64::from(request.expiry.unwrap_or(DEFAULT_INVOICE_EXPIRY_SECS)),
            ..lnrpc::Invoice::default()
        };
        Ok(WireRequest::post(ADD_INVOICE).protobuf(&invoice))
    }

    fn decode_create_invoice(&self, response: WireResponse) -> Result<Self::Created> {
        let created: lnrpc::AddInvoiceResponse = decode_message("AddInvoice response", response)?;
        if created.payment_request.is_empty() || created.r_hash.is_empty() {
            return Err(Error::protocol_message("AddInvoice response without invoice"));
        }
        Ok(created)
    }

    fn encode_lookup_invoice(&self, payment_hash: &PaymentHash) -> Result<WireRequest> {
        let request = lnrpc::PaymentHash {
            r_hash: payment_hash.as_bytes().to_vec(),
        };
        Ok(WireRequest::post(LOOKUP_INVOICE).protobuf(&request))
    }

    fn decode_lookup_invoice(&self, response: WireResponse) -> Result<Self::Lookup> {
        let invoice: lnrpc::Invoice = decode_message("LookupInvoice response", response)?;
        if invoice.r_hash.is_empty() {
            return Err(Error::protocol_message("LookupInvoice response without hash"));
        }
        Ok(invoice)
    }

    fn encode_pay_invoice(&self, request: &PayRequest) -> Result<WireRequest> {
        let (amount_msat, max_fee_msat) = request.amounts_msat()?;
        let fee_limit = max_fee_msat
            .map(|fee| to_i64("max_fee", fee))
            .transpose()?
            .map(|fee| lnrpc::FeeLimit {
                limit: Some(lnrpc::fee_limit::Limit::FixedMsat(fee)),
            });
        let send = lnrpc::SendRequest {
            payment_request: request.payment_request.trim().to_string(),
            amt_msat: amount_msat.map(|v| to_i64("amount", v)).transpose()?.unwrap_or(0),
            fee_limit,
            ..lnrpc::SendRequest::default()
        };
        Ok(WireRequest::post(SEND_PAYMENT_SYNC).protobuf(&send))
    }

    fn decode_pay_invoice(&self, response: WireResponse) -> Result<Self::Payment> {
        let status = response.status.as_u16();
        let sent: lnrpc::SendResponse = decode_message("SendPaymentSync response", response)?;
        if !sent.payment_error.is_empty() {
            return Err(Error::Remote {
                status,
                message: sent.payment_error,
            });
        }
        Ok(sent)
    }
}

#[cfg(test)]
mod tests {
    use http::StatusCode;

    use super::*;

    #[test]
    fn add_invoice_encodes_lnrpc_invoice() {
        let req = LndGrpcCodec
            .encode_create_invoice(&InvoiceRequest::new(100, "test bindings").with_expiry(600))
            .unwrap();
        assert_eq!(req.path, ADD_INVOICE);
        let invoice = lnrpc::Invoice::decode(req.body).unwrap();
        assert_eq!(invoice.value_msat, 100_000);
        assert_eq!(invoice.memo, "test bindings");
        assert_eq!(invoice.expiry, 600);
    }

    #[test]
    fn fee_limit_is_sent_in_msat() {
        let mut pay = PayRequest::new("lnbc1");
        pay.max_fee = Some(10);
        let req = LndGrpcCodec.encode_pay_invoice(&pay).unwrap();
        let send = lnrpc::SendRequest::decode(req.body).unwrap();
        assert_eq!(
            send.fee_limit.unwrap().limit,
            Some(lnrpc::fee_limit::Limit::FixedMsat(10_000))
        );
        assert_eq!(send.amt_msat, 0);
    }

    #[test]
    fn node_status_messages_become_remote_errors() {
        let response = WireResponse::new(StatusCode::INTERNAL_SERVER_ERROR, "unable to locate invoice");
        assert!(matches!(
            LndGrpcCodec.decode_lookup_invoice(response),
            Err(Error::Remote { status: 500, message }) if message == "unable to locate invoice"
        ));
    }

    #[test]
    fn garbage_bodies_are_protocol_errors() {
        let response = WireResponse::ok(vec![0xff, 0xff, 0xff]);
        assert!(matches!(
            LndGrpcCodec.decode_get_info(response),
            Err(Error::Protocol { .. })
        ));
    }
}
