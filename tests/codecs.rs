//! Backend fixtures decoded and normalized into the domain schema.

use http::StatusCode;
use lnclient::codec::{BackendCodec, ClnRestCodec, EclairRestCodec, LndGrpcCodec, LndRestCodec};
use lnclient::normalize::Normalize;
use lnclient::proto::lnrpc;
use lnclient::transport::WireResponse;
use lnclient::{BackendKind, ChannelStats, Error, InvoiceStatus, Network};
use prost::Message;

const HASH_HEX: &str = "deadbeef000102030405060708090a0b0c0d0e0f101112131415161718191a1b";
const HASH_B64: &str = "3q2+7wABAgMEBQYHCAkKCwwNDg8QERITFBUWFxgZGhs=";

fn ok(body: &str) -> WireResponse {
    WireResponse::ok(body.to_string())
}

#[test]
fn lnd_rest_fixtures() {
    let info = LndRestCodec
        .decode_get_info(ok(r#"{
            "version": "0.17.0-beta commit=v0.17.0-beta",
            "identity_pubkey": "03abc",
            "alias": "alice",
            "block_height": 812345,
            "synced_to_chain": true,
            "testnet": false,
            "num_active_channels": 4,
            "num_inactive_channels": 1,
            "num_pending_channels": 2,
            "chains": [{"chain": "bitcoin", "network": "mainnet"}],
            "features": {"0": {"name": "data-loss-protect", "is_required": true, "is_known": true}}
        }"#))
        .unwrap()
        .normalize()
        .unwrap();
    assert_eq!(info.alias, "alice");
    assert_eq!(info.pubkey, "03abc");
    assert_eq!(info.block_height, 812_345);
    assert_eq!(info.network, Network::Mainnet);
    assert_eq!(
        info.channels,
        Some(ChannelStats {
            active: 4,
            inactive: 1,
            pending: 2
        })
    );

    let invoice = LndRestCodec
        .decode_lookup_invoice(ok(&format!(
            r#"{{
                "memo": "coffee",
                "r_preimage": "{HASH_B64}",
                "r_hash": "{HASH_B64}",
                "value": "100",
                "value_msat": "100000",
                "settled": true,
                "creation_date": "1700000000",
                "settle_date": "1700000100",
                "payment_request": "lnbc1u1p...",
                "state": "SETTLED"
            }}"#
        )))
        .unwrap()
        .normalize()
        .unwrap();
    assert_eq!(invoice.amount, 100);
    assert_eq!(invoice.amount_msat, 100_000);
    assert_eq!(invoice.payment_hash, HASH_HEX);
    assert_eq!(invoice.preimage.as_deref(), Some(HASH_HEX));
    assert_eq!(invoice.status, InvoiceStatus::Settled);
    assert_eq!(invoice.description.as_deref(), Some("coffee"));
    assert_eq!(invoice.created_at, Some(1_700_000_000));

    let payment = LndRestCodec
        .decode_pay_invoice(ok(&format!(
            r#"{{
                "payment_error": "",
                "payment_preimage": "{HASH_B64}",
                "payment_hash": "{HASH_B64}",
                "payment_route": {{"total_fees": "2", "total_fees_msat": "2500", "total_amt_msat": "102500"}}
            }}"#
        )))
        .unwrap()
        .normalize()
        .unwrap();
    assert_eq!(payment.fee_msat, 2_500);
    assert_eq!(payment.fee, 2);
    assert_eq!(payment.preimage, HASH_HEX);
}

#[test]
fn lnd_rest_open_invoices_hide_the_preimage() {
    let invoice = LndRestCodec
        .decode_lookup_invoice(ok(&format!(
            r#"{{"r_hash":"{HASH_B64}","r_preimage":"{HASH_B64}","value_msat":"0","state":"OPEN"}}"#
        )))
        .unwrap()
        .normalize()
        .unwrap();
    assert_eq!(invoice.status, InvoiceStatus::Pending);
    assert_eq!(invoice.preimage, None);
    assert_eq!(invoice.created_at, None);
}

#[test]
fn lnd_grpc_fixtures() {
    let info = lnrpc::GetInfoResponse {
        version: "0.18.0-beta".into(),
        identity_pubkey: "02def".into(),
        alias: "bob".into(),
        block_height: 2_500_000,
        synced_to_chain: true,
        testnet: true,
        num_active_channels: 7,
        chains: vec![lnrpc::Chain {
            chain: "bitcoin".into(),
            network: "testnet".into(),
        }],
        ..Default::default()
    };
    let info = LndGrpcCodec
        .decode_get_info(WireResponse::ok(info.encode_to_vec()))
        .unwrap()
        .normalize()
        .unwrap();
    assert_eq!(info.backend, BackendKind::LndGrpc);
    assert_eq!(info.network, Network::Testnet);
    assert_eq!(info.block_height, 2_500_000);
    assert_eq!(info.channels.map(|c| c.active), Some(7));

    let hash = hex::decode(HASH_HEX).unwrap();
    let created = lnrpc::AddInvoiceResponse {
        r_hash: hash.clone(),
        payment_request: "lntb1...".into(),
        add_index: 12,
        payment_addr: vec![0; 32],
    };
    let created = LndGrpcCodec
        .decode_create_invoice(WireResponse::ok(created.encode_to_vec()))
        .unwrap()
        .normalize()
        .unwrap();
    assert_eq!(created.payment_hash, HASH_HEX);
    assert_eq!(created.add_index, Some(12));

    let invoice = lnrpc::Invoice {
        r_hash: hash,
        r_preimage: vec![7; 32],
        value_msat: 100_000,
        state: lnrpc::invoice::InvoiceState::Accepted as i32,
        creation_date: 1_700_000_000,
        ..Default::default()
    };
    let invoice = LndGrpcCodec
        .decode_lookup_invoice(WireResponse::ok(invoice.encode_to_vec()))
        .unwrap()
        .normalize()
        .unwrap();
    assert_eq!(invoice.amount, 100);
    assert_eq!(invoice.status, InvoiceStatus::Accepted);
    assert_eq!(invoice.preimage, None);
    assert_eq!(invoice.description, None);
}

#[test]
fn lnd_grpc_rejects_replies_without_invoice() {
    let empty = lnrpc::AddInvoiceResponse::default().encode_to_vec();
    assert!(matches!(
        LndGrpcCodec.decode_create_invoice(WireResponse::ok(empty)),
        Err(Error::Protocol { .. })
    ));
}

#[test]
fn cln_rest_fixtures() {
    let info = ClnRestCodec
        .decode_get_info(ok(r#"{
            "id": "02cln",
            "alias": "carol",
            "color": "02cln0",
            "num_peers": 3,
            "num_active_channels": 3,
            "num_pending_channels": 1,
            "version": "v24.02.2",
            "blockheight": 190000,
            "network": "signet",
            "fees_collected_msat": 0,
            "address": [],
            "binding": []
        }"#))
        .unwrap()
        .normalize()
        .unwrap();
    assert_eq!(info.pubkey, "02cln");
    assert_eq!(info.network, Network::Signet);
    assert!(info.synced);
    assert_eq!(
        info.channels,
        Some(ChannelStats {
            active: 3,
            inactive: 0,
            pending: 1
        })
    );

    let created = ClnRestCodec
        .decode_create_invoice(ok(&format!(
            r#"{{"payment_hash":"{HASH_HEX}","expires_at":1700003600,"bolt11":"lntbs1...","payment_secret":"00","created_index":4}}"#
        )))
        .unwrap()
        .normalize()
        .unwrap();
    assert_eq!(created.payment_request, "lntbs1...");
    assert_eq!(created.payment_hash, HASH_HEX);
    assert_eq!(created.add_index, Some(4));

    let invoice = ClnRestCodec
        .decode_lookup_invoice(ok(&format!(
            r#"{{"invoices":[{{"label":"inv-1","payment_hash":"{HASH_HEX}","status":"expired","amount_msat":100000,"expires_at":1700003600}}]}}"#
        )))
        .unwrap()
        .normalize()
        .unwrap();
    assert_eq!(invoice.amount, 100);
    assert_eq!(invoice.status, InvoiceStatus::Expired);
    assert_eq!(invoice.payment_request, "");
}

#[test]
fn eclair_rest_fixtures() {
    let info = EclairRestCodec
        .decode_get_info(ok(r##"{
            "version": "0.10.0-a63d2c3",
            "nodeId": "03eclair",
            "alias": "dave",
            "color": "#49daaa",
            "features": {},
            "chainHash": "06226e46111a0b59caaf126043eb5bbf28c34f3a5e332a1fc7b2b73cf188910f",
            "network": "regtest",
            "blockHeight": 150,
            "publicAddresses": [],
            "instanceId": "x"
        }"##))
        .unwrap()
        .normalize()
        .unwrap();
    assert_eq!(info.pubkey, "03eclair");
    assert_eq!(info.network, Network::Regtest);
    assert_eq!(info.block_height, 150);
    assert_eq!(info.channels, None);

    let created = EclairRestCodec
        .decode_create_invoice(ok(&format!(
            r#"{{"prefix":"lnbcrt","timestamp":1700000000,"nodeId":"03eclair","serialized":"lnbcrt1...","description":"test","paymentHash":"{}","expiry":3600,"amount":100000}}"#,
            HASH_HEX.to_uppercase()
        )))
        .unwrap()
        .normalize()
        .unwrap();
    assert_eq!(created.payment_request, "lnbcrt1...");
    assert_eq!(created.payment_hash, HASH_HEX);
    assert_eq!(created.add_index, None);

    let received = EclairRestCodec
        .decode_lookup_invoice(ok(&format!(
            r#"{{
                "paymentRequest": {{"serialized":"lnbcrt1...","paymentHash":"{HASH_HEX}","description":"test","amount":100000,"timestamp":{{"iso":"2023-11-14T22:13:20Z","unix":1700000000}},"expiry":3600}},
                "paymentPreimage": "{pre}",
                "createdAt": {{"iso":"2023-11-14T22:13:20Z","unix":1700000000}},
                "status": {{"type":"received","amount":100000,"receivedAt":1700000100000}}
            }}"#,
            pre = "11".repeat(32)
        )))
        .unwrap()
        .normalize()
        .unwrap();
    assert_eq!(received.status, InvoiceStatus::Settled);
    assert_eq!(received.amount, 100);
    assert_eq!(received.created_at, Some(1_700_000_000));
    assert_eq!(received.settled_at, Some(1_700_000_100));
    assert_eq!(received.preimage, Some("11".repeat(32)));

    let paid = EclairRestCodec
        .decode_pay_invoice(ok(&format!(
            r#"{{"type":"payment-sent","id":"p1","paymentHash":"{HASH_HEX}","paymentPreimage":"{pre}","recipientAmount":100000,"parts":[{{"id":"a","amount":60000,"feesPaid":600}},{{"id":"b","amount":40000,"feesPaid":450}}]}}"#,
            pre = "11".repeat(32)
        )))
        .unwrap()
        .normalize()
        .unwrap();
    assert_eq!(paid.fee_msat, 1_050);
    assert_eq!(paid.fee, 1);
}

#[test]
fn remote_errors_keep_status_and_message() {
    let response = WireResponse::new(
        StatusCode::NOT_FOUND,
        r#"{"code":5,"message":"there are no existing invoices","details":[]}"#,
    );
    match LndRestCodec.decode_lookup_invoice(response) {
        Err(Error::Remote { status, message }) => {
            assert_eq!(status, 404);
            assert_eq!(message, "there are no existing invoices");
        }
        other => panic!("unexpected result: {other:?}"),
    }
}
