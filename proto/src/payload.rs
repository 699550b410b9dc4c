// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Sealed request and reply bodies
//!
//! Each object is JSON encoded then sealed for transport in the `payload`
//! (request) or `data` (reply) query parameter. Field names are fixed by
//! the wallet, see [fields][crate::consts::fields].

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{Commitment, DisplayEncoding};

/// Generic string-keyed body, for bodies without a typed definition
pub type Payload = BTreeMap<String, String>;

/// Reply body for `connect`
#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
pub struct ConnectData {
    /// Wallet (account) public key, base-58
    pub public_key: String,
    /// Session token to be included in subsequent requests
    pub session: String,
}

/// Request body for `disconnect`
#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
pub struct SessionPayload {
    pub session: String,
}

/// Request body for `signMessage`
#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
pub struct SignMessagePayload {
    pub session: String,
    /// Message bytes, base-58
    pub message: String,
    /// How the wallet should render the message
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display: Option<DisplayEncoding>,
}

/// Request body for `signTransaction` and `signAndSendTransaction`
#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
pub struct TransactionPayload {
    pub session: String,
    /// Serialized transaction, base-58
    pub transaction: String,
    /// Submission options (`signAndSendTransaction` only)
    #[serde(
        rename = "sendOptions",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub send_options: Option<SendOptions>,
}

/// Options for transaction submission by the wallet
#[derive(Clone, PartialEq, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendOptions {
    /// Maximum number of times the wallet retries submission
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_retries: Option<u32>,

    /// Commitment level for preflight simulation
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preflight_commitment: Option<Commitment>,

    /// Skip the preflight simulation
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skip_preflight: Option<bool>,
}

/// Reply body for `signMessage` and `signAndSendTransaction`
#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
pub struct SignatureData {
    /// Signature, base-58
    pub signature: String,
}

/// Reply body for `signTransaction`
#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
pub struct SignedTransactionData {
    /// Signed serialized transaction, base-58
    pub transaction: String,
}
