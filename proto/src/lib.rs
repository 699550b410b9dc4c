// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Protocol definitions for Phantom deep-link communication
//!
//! Requests are issued by opening a universal link of the form
//! `<base>/<method>?<key>=<value>&...`, replies are delivered back to the
//! application as an activation of the `redirect_link` supplied with each
//! request, with the same `?key=value&...` query encoding.
//!
//! Replies carry either an `errorCode` / `errorMessage` pair (always in
//! plaintext), or a `nonce` and an encrypted `data` blob. Request and reply
//! bodies are JSON objects sealed with X25519 / XSalsa20-Poly1305 using the
//! secret established by the `connect` handshake, see [payload] for the
//! object definitions.
//!
//! All binary values (keys, nonces, ciphertexts, messages, transactions)
//! are base-58 encoded.

use num_enum::TryFromPrimitive;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString, EnumVariantNames, IntoStaticStr};

pub mod consts;

mod error;
pub use error::Error;

pub mod link;
pub use link::DeepLink;

pub mod payload;

/// Wallet methods, used as the final path segment of request links
#[derive(
    Copy, Clone, PartialEq, Eq, Debug, Hash, Display, EnumString, EnumVariantNames, EnumIter, IntoStaticStr,
)]
#[strum(serialize_all = "camelCase")]
pub enum Method {
    /// Establish a session and fetch the wallet public key
    Connect,
    /// Invalidate an established session
    Disconnect,
    /// Sign an arbitrary message
    SignMessage,
    /// Sign a transaction and submit it to the network
    SignAndSendTransaction,
    /// Sign a transaction and return it to the caller
    SignTransaction,
}

impl Method {
    /// Callback on which the wallet replies to this method
    pub const fn callback(&self) -> Callback {
        match self {
            Method::Connect => Callback::OnPhantomConnected,
            Method::Disconnect => Callback::OnPhantomDisconnected,
            Method::SignMessage => Callback::OnMessageSigned,
            Method::SignAndSendTransaction => Callback::OnTxSignedAndSent,
            Method::SignTransaction => Callback::OnTxSigned,
        }
    }
}

/// Application callbacks, appended to the app URL scheme to form
/// the `redirect_link` for each request
#[derive(
    Copy, Clone, PartialEq, Eq, Debug, Hash, Display, EnumString, EnumVariantNames, EnumIter, IntoStaticStr,
)]
#[strum(serialize_all = "camelCase")]
pub enum Callback {
    OnPhantomConnected,
    OnPhantomDisconnected,
    OnMessageSigned,
    OnTxSignedAndSent,
    OnTxSigned,
}

/// Solana cluster requested on connect
#[derive(
    Copy,
    Clone,
    PartialEq,
    Eq,
    Debug,
    Default,
    Display,
    EnumString,
    EnumVariantNames,
    EnumIter,
    Serialize,
    Deserialize,
)]
#[strum(serialize_all = "kebab-case")]
#[serde(rename_all = "kebab-case")]
pub enum Cluster {
    #[default]
    Devnet,
    Testnet,
    MainnetBeta,
}

/// Error codes returned by the wallet in the `errorCode` parameter
#[derive(Copy, Clone, PartialEq, Eq, Debug, Display, EnumIter, TryFromPrimitive)]
#[repr(i32)]
pub enum PeerErrorCode {
    /// Wallet could not reach the network
    Disconnected = 4900,
    /// Requested method or account has not been authorized
    Unauthorized = 4100,
    /// User declined the request
    UserRejectedRequest = 4001,
    /// Missing or invalid parameters
    InvalidInput = -32000,
    /// Request is not available (for example a pending request)
    ResourceNotAvailable = -32002,
    /// Transaction was rejected by the wallet
    TransactionRejected = -32003,
    /// Unsupported method
    MethodNotFound = -32601,
    /// Internal wallet error
    InternalError = -32603,
}

impl PeerErrorCode {
    /// Parse a wallet error code from its query parameter encoding,
    /// returning `None` for unknown codes
    pub fn from_code(code: &str) -> Option<Self> {
        let v = code.trim().parse::<i32>().ok()?;
        Self::try_from(v).ok()
    }
}

/// Transaction commitment levels for [payload::SendOptions]
#[derive(Copy, Clone, PartialEq, Eq, Debug, Display, EnumString, Serialize, Deserialize)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Commitment {
    Processed,
    Confirmed,
    Finalized,
}

/// Display hint for message signing requests
#[derive(Copy, Clone, PartialEq, Eq, Debug, Display, EnumString, Serialize, Deserialize)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum DisplayEncoding {
    Utf8,
    Hex,
}
