//! Subset of LND's `lnrpc` messages used by the gRPC codec.
//!
//! Field numbers follow `lightning.proto`; fields the client never reads are left out and are
//! skipped by the decoder.

pub mod lnrpc {
    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct GetInfoRequest {}

    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct Chain {
        #[prost(string, tag = "1")]
        pub chain: String,
        #[prost(string, tag = "2")]
        pub network: String,
    }

    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct GetInfoResponse {
        #[prost(string, tag = "1")]
        pub identity_pubkey: String,
        #[prost(string, tag = "2")]
        pub alias: String,
        #[prost(uint32, tag = "3")]
        pub num_pending_channels: u32,
        #[prost(uint32, tag = "4")]
        pub num_active_channels: u32,
        #[prost(uint32, tag = "5")]
        pub num_peers: u32,
        #[prost(uint32, tag = "6")]
        pub block_height: u32,
        #[prost(string, tag = "8")]
        pub block_hash: String,
        #[prost(bool, tag = "9")]
        pub synced_to_chain: bool,
        #[prost(bool, tag = "10")]
        pub testnet: bool,
        #[prost(string, repeated, tag = "12")]
        pub uris: Vec<String>,
        #[prost(string, tag = "14")]
        pub version: String,
        #[prost(uint32, tag = "15")]
        pub num_inactive_channels: u32,
        #[prost(message, repeated, tag = "16")]
        pub chains: Vec<Chain>,
        #[prost(bool, tag = "18")]
        pub synced_to_graph: bool,
    }

    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct Invoice {
        #[prost(string, tag = "1")]
        pub memo: String,
        #[prost(bytes = "vec", tag = "3")]
        pub r_preimage: Vec<u8>,
        #[prost(bytes = "vec", tag = "4")]
        pub r_hash: Vec<u8>,
        #[prost(int64, tag = "5")]
        pub value: i64,
        #[prost(bool, tag = "6")]
        pub settled: bool,
        #[prost(int64, tag = "7")]
        pub creation_date: i64,
        #[prost(int64, tag = "8")]
        pub settle_date: i64,
        #[prost(string, tag = "9")]
        pub payment_request: String,
        #[prost(int64, tag = "11")]
        pub expiry: i64,
        #[prost(uint64, tag = "16")]
        pub add_index: u64,
        #[prost(int64, tag = "19")]
        pub amt_paid_sat: i64,
        #[prost(int64, tag = "20")]
        pub amt_paid_msat: i64,
        #[prost(enumeration = "invoice::InvoiceState", tag = "21")]
        pub state: i32,
        #[prost(int64, tag = "23")]
        pub value_msat: i64,
    }

    pub mod invoice {
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
        #[repr(i32)]
        pub enum InvoiceState {
            Open = 0,
            Settled = 1,
            Canceled = 2,
            Accepted = 3,
        }
    }

    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct AddInvoiceResponse {
        #[prost(bytes = "vec", tag = "1")]
        pub r_hash: Vec<u8>,
        #[prost(string, tag = "2")]
        pub payment_request: String,
        #[prost(uint64, tag = "16")]
        pub add_index: u64,
        #[prost(bytes = "vec", tag = "17")]
        pub payment_addr: Vec<u8>,
    }

    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct PaymentHash {
        #[prost(bytes = "vec", tag = "2")]
        pub r_hash: Vec<u8>,
    }

    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct FeeLimit {
        #[prost(oneof = "fee_limit::Limit", tags = "1, 3, 2")]
        pub limit: Option<fee_limit::Limit>,
    }

    pub mod fee_limit {
        #[derive(Clone, PartialEq, ::prost::Oneof)]
        pub enum Limit {
            #[prost(int64, tag = "1")]
            Fixed(i64),
            #[prost(int64, tag = "3")]
            FixedMsat(i64),
            #[prost(int64, tag = "2")]
            Percent(i64),
        }
    }

    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct SendRequest {
        #[prost(int64, tag = "3")]
        pub amt: i64,
        #[prost(string, tag = "6")]
        pub payment_request: String,
        #[prost(message, optional, tag = "8")]
        pub fee_limit: Option<FeeLimit>,
        #[prost(int64, tag = "12")]
        pub amt_msat: i64,
    }

    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct Route {
        #[prost(int64, tag = "2")]
        pub total_fees: i64,
        #[prost(int64, tag = "3")]
        pub total_amt: i64,
        #[prost(int64, tag = "5")]
        pub total_fees_msat: i64,
        #[prost(int64, tag = "6")]
        pub total_amt_msat: i64,
    }

    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct SendResponse {
        #[prost(string, tag = "1")]
        pub payment_error: String,
        #[prost(bytes = "vec", tag = "2")]
        pub payment_preimage: Vec<u8>,
        #[prost(message, optional, tag = "3")]
        pub payment_route: Option<Route>,
        #[prost(bytes = "vec", tag = "4")]
        pub payment_hash: Vec<u8>,
    }
}
