// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Phantom wallet deep-link bridge library (and CLI)
//!
//! A [PhantomBridge] issues wallet requests by opening deep links with an
//! [Opener], the host application then delivers the wallet's reply links
//! via [Activations] to resolve outstanding requests.
//!
//! ```no_run
//! # fn on_link_activated(_f: impl Fn(&str) + Send + 'static) {}
//! # async fn example() -> Result<(), phantom_link::Error> {
//! use phantom_link::{BridgeConfig, GenericOpener, PhantomBridge};
//!
//! let cfg = BridgeConfig::new("https://app.example", "myapp://")
//!     .with_auto_connect(true)
//!     .with_request_timeout_s(Some(120));
//! let mut b = PhantomBridge::new(cfg, GenericOpener::System);
//!
//! // Forward each app activation from the platform link handler,
//! // replies resolve the matching outstanding request
//! let a = b.activations();
//! on_link_activated(move |url| {
//!     a.activate(url);
//! });
//!
//! let _signature = b.sign_message("hello").await?;
//! # Ok(())
//! # }
//! ```

/// Re-export transports for consumer use
pub mod transport;
pub use transport::{Activations, DeepLinkProtocol, GenericOpener, Opener};

/// Re-export `phantom-link-proto` for consumers
pub use phantom_link_proto::{self as proto};

mod bridge;
pub use bridge::{PhantomBridge, Session};

mod config;
pub use config::{BridgeConfig, KeyPolicy};

mod error;
pub use error::Error;

mod vault;
pub use vault::{Sealed, Vault};

/// Bridge connection state
#[derive(Copy, Clone, Debug, PartialEq, Eq, strum::Display)]
pub enum ConnectionState {
    Disconnected,
    Connected,
}

/// Link opener selection
#[derive(Copy, Clone, Debug, PartialEq, clap::ValueEnum, strum::Display)]
#[non_exhaustive]
pub enum OpenerKind {
    /// Print request links for the user to open
    Print,
    /// Open request links with the platform link handler
    System,
}
