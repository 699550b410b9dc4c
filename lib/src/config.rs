// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Bridge configuration

use std::time::Duration;

use phantom_link_proto::{consts::PHANTOM_BASE_URL, Cluster};

/// Key pair lifecycle across connections
#[derive(
    Copy, Clone, PartialEq, Eq, Debug, Default, clap::ValueEnum, strum::Display, strum::EnumString,
)]
#[strum(serialize_all = "kebab-case")]
pub enum KeyPolicy {
    /// Generate a fresh key pair after each disconnect
    #[default]
    PerConnection,
    /// Keep the key pair created with the bridge for all connections
    Reuse,
}

/// [PhantomBridge][crate::PhantomBridge] configuration
#[derive(Clone, PartialEq, Debug, clap::Args)]
pub struct BridgeConfig {
    /// Application URL, shown by the wallet when connecting
    #[clap(long, env = "PHANTOM_APP_URL")]
    pub app_url: String,

    /// Application link scheme for wallet replies (eg. `myapp://`)
    #[clap(long, env = "PHANTOM_APP_SCHEME")]
    pub app_url_scheme: String,

    /// Cluster requested on connect
    #[clap(long, env = "PHANTOM_CLUSTER", default_value = "devnet")]
    pub cluster: Cluster,

    /// Wallet universal link base
    #[clap(long, env = "PHANTOM_BASE_URL", default_value = PHANTOM_BASE_URL)]
    pub base_url: String,

    /// Connect on demand when a signing operation is requested while disconnected
    #[clap(long)]
    pub auto_connect: bool,

    /// Timeout for wallet replies in seconds (waits indefinitely if unset)
    #[clap(long, env = "PHANTOM_TIMEOUT_S")]
    pub request_timeout_s: Option<u64>,

    /// Key pair lifecycle across connections
    #[clap(long, value_enum, default_value = "per-connection")]
    pub key_policy: KeyPolicy,
}

impl BridgeConfig {
    /// Create a configuration for the provided application URL and link
    /// scheme, using defaults for all other options
    pub fn new(app_url: impl ToString, app_url_scheme: impl ToString) -> Self {
        Self {
            app_url: app_url.to_string(),
            app_url_scheme: app_url_scheme.to_string(),
            cluster: Cluster::default(),
            base_url: PHANTOM_BASE_URL.to_string(),
            auto_connect: false,
            request_timeout_s: None,
            key_policy: KeyPolicy::default(),
        }
    }

    pub fn with_cluster(mut self, cluster: Cluster) -> Self {
        self.cluster = cluster;
        self
    }

    pub fn with_base_url(mut self, base_url: impl ToString) -> Self {
        self.base_url = base_url.to_string();
        self
    }

    pub fn with_auto_connect(mut self, auto_connect: bool) -> Self {
        self.auto_connect = auto_connect;
        self
    }

    pub fn with_request_timeout_s(mut self, timeout_s: Option<u64>) -> Self {
        self.request_timeout_s = timeout_s;
        self
    }

    pub fn with_key_policy(mut self, key_policy: KeyPolicy) -> Self {
        self.key_policy = key_policy;
        self
    }

    /// Helper to fetch the reply timeout
    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_s.map(Duration::from_secs)
    }
}
