// Copyright (c) 2022-2023 The MobileCoin Foundation

use tokio::time::error::Elapsed;

use crate::ConnectionState;

/// Phantom bridge API Error Type
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Operation not permitted in the current connection state
    #[error("Invalid connection state (actual: {0}, expected: {1})")]
    InvalidState(ConnectionState, ConnectionState),

    /// Wallet returned an error in place of a result
    #[error("Wallet error {code}: {message}")]
    Peer { code: String, message: String },

    /// Sealed data failed authentication (tampered or wrong key)
    #[error("Payload authentication failed")]
    Authentication,

    /// Deep link could not be decoded
    #[error("Invalid deep link: {0}")]
    Link(#[from] phantom_link_proto::Error),

    /// Reply is missing a required query parameter
    #[error("Reply missing parameter '{0}'")]
    MissingParam(&'static str),

    /// Invalid base-58 encoding
    #[error("Invalid base58 encoding: {0}")]
    Encoding(#[from] bs58::decode::Error),

    /// Sealed payload is not valid JSON (or is missing fields)
    #[error("Invalid payload encoding: {0}")]
    Json(#[from] serde_json::Error),

    /// Public key with invalid length
    #[error("Invalid public key length ({0} bytes)")]
    InvalidKey(usize),

    /// Nonce with invalid length
    #[error("Invalid nonce length ({0} bytes)")]
    InvalidNonce(usize),

    /// Payload sealing failed
    #[error("Payload encryption failed")]
    Encryption,

    /// Encryption requested prior to key exchange
    #[error("No shared secret established")]
    NoSharedSecret,

    /// A request is already outstanding on this callback
    #[error("Request already pending for '{0}'")]
    RequestPending(String),

    /// Request timeout
    #[error("Timeout waiting for wallet response")]
    RequestTimeout,

    /// Request cancelled before a response was received
    #[error("Request cancelled")]
    RequestCancelled,

    /// Failed to open the request link
    #[error("Failed to open link: {0}")]
    Open(anyhow::Error),
}

impl Error {
    /// Check whether an error is a decoding failure of wallet provided data
    pub fn is_format(&self) -> bool {
        matches!(
            self,
            Error::Link(_)
                | Error::MissingParam(_)
                | Error::Encoding(_)
                | Error::Json(_)
                | Error::InvalidKey(_)
                | Error::InvalidNonce(_)
        )
    }

    /// Fetch the classified wallet error code for [Error::Peer] errors
    pub fn peer_code(&self) -> Option<phantom_link_proto::PeerErrorCode> {
        match self {
            Error::Peer { code, .. } => phantom_link_proto::PeerErrorCode::from_code(code),
            _ => None,
        }
    }
}

impl From<Elapsed> for Error {
    fn from(_: Elapsed) -> Self {
        Error::RequestTimeout
    }
}
