// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Wire constants shared with the wallet
//!
//! These must match the wallet byte-for-byte.

/// Default universal link base for Phantom
pub const PHANTOM_BASE_URL: &str = "https://phantom.app/ul/v1";

/// X25519 public key length
pub const KEY_LEN: usize = 32;

/// XSalsa20-Poly1305 nonce length
pub const NONCE_LEN: usize = 24;

/// Query parameter keys
pub mod query {
    /// Application URL, used by the wallet to fetch app metadata (connect only)
    pub const APP_URL: &str = "app_url";

    /// Escaped app-scheme link the wallet replies to
    pub const REDIRECT_LINK: &str = "redirect_link";

    /// Requested cluster (connect only)
    pub const CLUSTER: &str = "cluster";

    /// Application encryption public key
    pub const DAPP_ENCRYPTION_PUBLIC_KEY: &str = "dapp_encryption_public_key";

    /// Wallet encryption public key (connect reply only)
    pub const PHANTOM_ENCRYPTION_PUBLIC_KEY: &str = "phantom_encryption_public_key";

    /// Nonce for the sealed `payload` / `data` blob
    pub const NONCE: &str = "nonce";

    /// Sealed request body
    pub const PAYLOAD: &str = "payload";

    /// Sealed reply body
    pub const DATA: &str = "data";

    pub const ERROR_CODE: &str = "errorCode";

    pub const ERROR_MESSAGE: &str = "errorMessage";
}

/// Keys used within sealed request and reply bodies
pub mod fields {
    pub const SESSION: &str = "session";

    pub const PUBLIC_KEY: &str = "public_key";

    pub const MESSAGE: &str = "message";

    pub const DISPLAY: &str = "display";

    pub const TRANSACTION: &str = "transaction";

    pub const SEND_OPTIONS: &str = "sendOptions";

    pub const SIGNATURE: &str = "signature";
}
