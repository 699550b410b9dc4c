// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Bridge for wallet operations over deep links
//!
//! This manages the connection state machine and session keys,
//! and is generic over [Opener] implementations

use log::{debug, info};
use percent_encoding::{utf8_percent_encode, NON_ALPHANUMERIC};
use serde::{de::DeserializeOwned, Serialize};

use phantom_link_proto::{
    consts::query,
    payload::{
        ConnectData, SendOptions, SessionPayload, SignMessagePayload, SignatureData,
        SignedTransactionData, TransactionPayload,
    },
    DeepLink, DisplayEncoding, Method,
};

use crate::{
    transport::{Activations, DeepLinkProtocol, Opener},
    BridgeConfig, ConnectionState, Error, KeyPolicy, Vault,
};

/// Session established by a successful `connect`
#[derive(Clone, PartialEq, Debug)]
pub struct Session {
    /// Session token, included in all subsequent requests
    pub token: String,
    /// Wallet (account) public key, base-58
    pub wallet_public_key: String,
    /// Wallet encryption public key, base-58
    pub peer_public_key: String,
}

/// Wallet bridge, issues requests via an [Opener] and awaits replies
/// delivered through [PhantomBridge::activations]
pub struct PhantomBridge<O: Opener> {
    protocol: DeepLinkProtocol<O>,
    vault: Vault,
    config: BridgeConfig,
    session: Option<Session>,
}

impl<O: Opener> PhantomBridge<O> {
    /// Create a new bridge with a freshly generated key pair
    pub fn new(config: BridgeConfig, opener: O) -> Self {
        Self::with_vault(config, opener, Vault::new())
    }

    /// Create a new bridge using the provided [Vault]
    pub fn with_vault(config: BridgeConfig, opener: O, vault: Vault) -> Self {
        Self {
            protocol: DeepLinkProtocol::new(&config.base_url, opener),
            vault,
            config,
            session: None,
        }
    }

    /// Fetch a handle for delivering inbound link activations
    pub fn activations(&self) -> Activations {
        self.protocol.activations()
    }

    /// Current connection state
    pub fn state(&self) -> ConnectionState {
        match self.session.is_some() {
            true => ConnectionState::Connected,
            false => ConnectionState::Disconnected,
        }
    }

    pub fn is_connected(&self) -> bool {
        self.session.is_some()
    }

    /// Active session, if connected
    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    /// Local encryption public key, base-58
    pub fn public_key(&self) -> String {
        self.vault.public_key()
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    pub fn set_auto_connect(&mut self, auto_connect: bool) {
        self.config.auto_connect = auto_connect;
    }

    /// Connect to the wallet, returning the wallet public key
    pub async fn connect(&mut self) -> Result<String, Error> {
        if self.session.is_some() {
            return Err(Error::InvalidState(
                ConnectionState::Connected,
                ConnectionState::Disconnected,
            ));
        }

        info!("Connecting to wallet ({})", self.config.cluster);

        let req = DeepLink::new(Method::Connect)
            .with_param(query::APP_URL, escape(&self.config.app_url))
            .with_param(query::REDIRECT_LINK, self.redirect_link(Method::Connect))
            .with_param(query::DAPP_ENCRYPTION_PUBLIC_KEY, self.vault.public_key())
            .with_param(query::CLUSTER, self.config.cluster);

        let resp = self.send(&req, Method::Connect).await?;

        let peer_public_key = required(&resp, query::PHANTOM_ENCRYPTION_PUBLIC_KEY)?;
        self.vault.establish_shared_secret(peer_public_key)?;

        // Shared secret is only retained once the handshake completes
        let data: ConnectData = match self.open(&resp) {
            Ok(v) => v,
            Err(e) => {
                self.vault.clear();
                return Err(e);
            }
        };

        info!("Connected to wallet: {}", data.public_key);

        self.session = Some(Session {
            token: data.session,
            wallet_public_key: data.public_key.clone(),
            peer_public_key: peer_public_key.to_string(),
        });

        Ok(data.public_key)
    }

    /// Disconnect from the wallet
    pub async fn disconnect(&mut self) -> Result<(), Error> {
        let token = match &self.session {
            Some(s) => s.token.clone(),
            None => {
                return Err(Error::InvalidState(
                    ConnectionState::Disconnected,
                    ConnectionState::Connected,
                ))
            }
        };

        info!("Disconnecting from wallet");

        let req = self.sealed(Method::Disconnect, &SessionPayload { session: token })?;

        // Reply body carries nothing of interest
        let _resp = self.send(&req, Method::Disconnect).await?;

        self.session = None;

        match self.config.key_policy {
            KeyPolicy::PerConnection => self.vault.rekey(),
            KeyPolicy::Reuse => self.vault.clear(),
        }

        debug!("Disconnected, using public key: {}", self.vault.public_key());

        Ok(())
    }

    /// Request a signature over a UTF-8 message, returning the base-58
    /// encoded signature
    pub async fn sign_message(&mut self, message: &str) -> Result<String, Error> {
        self.sign_message_bytes(message.as_bytes(), None).await
    }

    /// Request a signature over arbitrary message bytes, with an optional
    /// hint for how the wallet should display the message
    pub async fn sign_message_bytes(
        &mut self,
        message: &[u8],
        display: Option<DisplayEncoding>,
    ) -> Result<String, Error> {
        let session = self.session_token().await?;

        debug!("Requesting signature for {} byte message", message.len());

        let payload = SignMessagePayload {
            session,
            message: bs58::encode(message).into_string(),
            display,
        };

        let data: SignatureData = self.request(Method::SignMessage, &payload).await?;

        Ok(data.signature)
    }

    /// Request the wallet sign and submit a serialized transaction,
    /// returning the base-58 encoded transaction signature
    pub async fn sign_and_send_transaction(
        &mut self,
        transaction: &[u8],
        send_options: Option<SendOptions>,
    ) -> Result<String, Error> {
        let session = self.session_token().await?;

        debug!(
            "Requesting signature and submission for {} byte transaction",
            transaction.len()
        );

        let payload = TransactionPayload {
            session,
            transaction: bs58::encode(transaction).into_string(),
            send_options,
        };

        let data: SignatureData = self
            .request(Method::SignAndSendTransaction, &payload)
            .await?;

        Ok(data.signature)
    }

    /// Request the wallet sign a serialized transaction without
    /// submitting it, returning the signed transaction
    pub async fn sign_transaction(&mut self, transaction: &[u8]) -> Result<Vec<u8>, Error> {
        let session = self.session_token().await?;

        debug!(
            "Requesting signature for {} byte transaction",
            transaction.len()
        );

        let payload = TransactionPayload {
            session,
            transaction: bs58::encode(transaction).into_string(),
            send_options: None,
        };

        let data: SignedTransactionData = self.request(Method::SignTransaction, &payload).await?;

        let signed = bs58::decode(&data.transaction).into_vec()?;

        Ok(signed)
    }

    /// Fetch the session token, connecting first where auto-connect is enabled
    async fn session_token(&mut self) -> Result<String, Error> {
        if self.session.is_none() {
            if !self.config.auto_connect {
                return Err(Error::InvalidState(
                    ConnectionState::Disconnected,
                    ConnectionState::Connected,
                ));
            }

            debug!("Not connected, attempting auto-connect");

            self.connect().await?;
        }

        self.session
            .as_ref()
            .map(|s| s.token.clone())
            .ok_or(Error::InvalidState(
                ConnectionState::Disconnected,
                ConnectionState::Connected,
            ))
    }

    /// Issue a sealed request and open the sealed reply
    async fn request<T: DeserializeOwned>(
        &self,
        method: Method,
        payload: &impl Serialize,
    ) -> Result<T, Error> {
        let req = self.sealed(method, payload)?;
        let resp = self.send(&req, method).await?;
        self.open(&resp)
    }

    /// Build a request carrying a sealed payload
    fn sealed(&self, method: Method, payload: &impl Serialize) -> Result<DeepLink, Error> {
        let sealed = self.vault.encrypt(payload)?;

        let req = DeepLink::new(method)
            .with_param(query::DAPP_ENCRYPTION_PUBLIC_KEY, self.vault.public_key())
            .with_param(query::NONCE, sealed.nonce)
            .with_param(query::REDIRECT_LINK, self.redirect_link(method))
            .with_param(query::PAYLOAD, sealed.data);

        Ok(req)
    }

    /// Send a request and await the reply, failing on wallet errors
    async fn send(&self, req: &DeepLink, method: Method) -> Result<DeepLink, Error> {
        let callback: &'static str = method.callback().into();

        let resp = self
            .protocol
            .send(req, callback, self.config.request_timeout())
            .await?;

        check_error(&resp)?;

        Ok(resp)
    }

    /// Open the sealed `data` of a reply
    fn open<T: DeserializeOwned>(&self, resp: &DeepLink) -> Result<T, Error> {
        let nonce = required(resp, query::NONCE)?;
        let data = required(resp, query::DATA)?;

        self.vault.decrypt(data, nonce)
    }

    /// Escaped application callback link for replies to `method`
    fn redirect_link(&self, method: Method) -> String {
        escape(&format!("{}{}", self.config.app_url_scheme, method.callback()))
    }
}

/// Percent-escape a value for inclusion in a query parameter
fn escape(s: &str) -> String {
    utf8_percent_encode(s, NON_ALPHANUMERIC).to_string()
}

/// Fetch a required reply parameter
fn required<'a>(resp: &'a DeepLink, key: &'static str) -> Result<&'a str, Error> {
    resp.param(key).ok_or(Error::MissingParam(key))
}

/// Map wallet errors in plaintext reply parameters
fn check_error(resp: &DeepLink) -> Result<(), Error> {
    match resp.param(query::ERROR_CODE) {
        Some(code) => Err(Error::Peer {
            code: code.to_string(),
            message: resp
                .param(query::ERROR_MESSAGE)
                .unwrap_or_default()
                .to_string(),
        }),
        None => Ok(()),
    }
}
