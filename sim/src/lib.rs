// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Phantom wallet simulator
//!
//! [PhantomSim] answers deep-link requests the way the wallet does,
//! holding an ed25519 wallet key and one encrypted session per dapp key.
//! It implements [Opener] so it can stand in for the platform link
//! handler, delivering replies via an attached [Activations] handle.

use std::{
    collections::{BTreeMap, HashMap},
    fmt::Display,
    sync::{Arc, Mutex, MutexGuard},
};

use async_trait::async_trait;
use ed25519_dalek::{Signer, SigningKey, VerifyingKey};
use log::{debug, warn};
use percent_encoding::{percent_decode_str, utf8_percent_encode, NON_ALPHANUMERIC};
use rand_core::{OsRng, RngCore};
use serde::{de::DeserializeOwned, Serialize};

use phantom_link::{Activations, Opener, Vault};
use phantom_link_proto::{
    consts::query,
    payload::{
        ConnectData, SendOptions, SessionPayload, SignMessagePayload, SignatureData,
        SignedTransactionData, TransactionPayload,
    },
    DeepLink, Method, PeerErrorCode,
};

/// Simulator response mode
#[derive(Clone, PartialEq, Debug, Default)]
pub enum Mode {
    /// Approve all requests
    #[default]
    Approve,
    /// Reject all requests with the provided error
    Reject { code: PeerErrorCode, message: String },
    /// Approve requests but also attach the provided error
    RejectWithData { code: PeerErrorCode, message: String },
    /// Record requests without replying
    Drop,
    /// Approve requests, corrupting the sealed reply
    Tamper,
}

/// Transaction submitted via `signAndSendTransaction`
#[derive(Clone, PartialEq, Debug)]
pub struct Submitted {
    pub transaction: Vec<u8>,
    pub send_options: Option<SendOptions>,
}

type Params = BTreeMap<String, String>;

type Rejection = (PeerErrorCode, String);

#[derive(Default)]
struct State {
    mode: Mode,
    activations: Option<Activations>,
    /// Session vaults by dapp encryption key
    vaults: HashMap<String, Vault>,
    /// Session tokens mapped to dapp encryption key
    sessions: HashMap<String, String>,
    requests: Vec<DeepLink>,
    submitted: Vec<Submitted>,
}

/// Simulated wallet
#[derive(Clone)]
pub struct PhantomSim {
    wallet: Arc<SigningKey>,
    state: Arc<Mutex<State>>,
}

impl Default for PhantomSim {
    fn default() -> Self {
        Self::new()
    }
}

impl PhantomSim {
    /// Create a simulator with a random wallet key
    pub fn new() -> Self {
        Self::from_key(SigningKey::generate(&mut OsRng))
    }

    /// Create a simulator with the provided wallet key
    pub fn from_key(wallet: SigningKey) -> Self {
        Self {
            wallet: Arc::new(wallet),
            state: Arc::new(Mutex::new(State::default())),
        }
    }

    /// Attach an [Activations] handle for reply delivery
    pub fn attach(&self, a: Activations) {
        self.lock().activations = Some(a);
    }

    pub fn set_mode(&self, mode: Mode) {
        self.lock().mode = mode;
    }

    /// Wallet public key, base-58
    pub fn wallet_public_key(&self) -> String {
        bs58::encode(self.wallet.verifying_key().as_bytes()).into_string()
    }

    pub fn verifying_key(&self) -> VerifyingKey {
        self.wallet.verifying_key()
    }

    /// Requests received, in order
    pub fn requests(&self) -> Vec<DeepLink> {
        self.lock().requests.clone()
    }

    /// Transactions submitted to the (simulated) network
    pub fn submitted(&self) -> Vec<Submitted> {
        self.lock().submitted.clone()
    }

    /// Number of active sessions
    pub fn sessions(&self) -> usize {
        self.lock().sessions.len()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Handle a request link, returning the reply link if one is to be sent
    pub fn respond(&self, url: &str) -> anyhow::Result<Option<String>> {
        let req = DeepLink::parse(url)?;

        let redirect = req
            .param(query::REDIRECT_LINK)
            .ok_or_else(|| anyhow::anyhow!("Request missing redirect link"))?;
        let redirect = percent_decode_str(redirect).decode_utf8()?.to_string();

        let method: Method = req.method.parse()?;

        debug!("Sim request: {} (reply: {})", method, redirect);

        let mut s = self.lock();
        s.requests.push(req.clone());

        let mode = s.mode.clone();

        let mut params = match &mode {
            Mode::Drop => {
                debug!("Dropping '{}' request", method);
                return Ok(None);
            }
            Mode::Reject { code, message } => error_params(*code, message),
            _ => match self.approve(&mut s, method, &req) {
                Ok(p) => p,
                Err((code, message)) => {
                    warn!("Rejecting '{}' request: {}", method, message);
                    error_params(code, &message)
                }
            },
        };

        match &mode {
            Mode::RejectWithData { code, message } => {
                params.extend(error_params(*code, message));
            }
            Mode::Tamper => tamper(&mut params)?,
            _ => (),
        }

        Ok(Some(reply_url(&redirect, &params)))
    }

    /// Process an approved request
    fn approve(&self, s: &mut State, method: Method, req: &DeepLink) -> Result<Params, Rejection> {
        let dapp_key = param(req, query::DAPP_ENCRYPTION_PUBLIC_KEY)?;

        if method == Method::Connect {
            return self.connect(s, dapp_key);
        }

        let v = s.vaults.get(dapp_key).ok_or((
            PeerErrorCode::Unauthorized,
            "unknown dapp encryption key".to_string(),
        ))?;

        let p = match method {
            Method::Disconnect => {
                let body: SessionPayload = open(v, req)?;
                check_session(s, &body.session, dapp_key)?;

                s.sessions.remove(&body.session);
                s.vaults.remove(dapp_key);

                Params::new()
            }
            Method::SignMessage => {
                let body: SignMessagePayload = open(v, req)?;
                check_session(s, &body.session, dapp_key)?;

                let message = bs58::decode(&body.message).into_vec().map_err(invalid)?;
                let signature = self.wallet.sign(&message);

                seal(
                    v,
                    &SignatureData {
                        signature: bs58::encode(signature.to_bytes()).into_string(),
                    },
                )?
            }
            Method::SignTransaction => {
                let body: TransactionPayload = open(v, req)?;
                check_session(s, &body.session, dapp_key)?;

                let tx = bs58::decode(&body.transaction).into_vec().map_err(invalid)?;
                let signature = self.wallet.sign(&tx);

                let signed = [signature.to_bytes().as_slice(), tx.as_slice()].concat();

                seal(
                    v,
                    &SignedTransactionData {
                        transaction: bs58::encode(signed).into_string(),
                    },
                )?
            }
            Method::SignAndSendTransaction => {
                let body: TransactionPayload = open(v, req)?;
                check_session(s, &body.session, dapp_key)?;

                let tx = bs58::decode(&body.transaction).into_vec().map_err(invalid)?;
                let signature = self.wallet.sign(&tx);

                let p = seal(
                    v,
                    &SignatureData {
                        signature: bs58::encode(signature.to_bytes()).into_string(),
                    },
                )?;

                s.submitted.push(Submitted {
                    transaction: tx,
                    send_options: body.send_options,
                });

                p
            }
            Method::Connect => self.connect(s, dapp_key)?,
        };

        Ok(p)
    }

    /// Establish a session for the provided dapp key
    fn connect(&self, s: &mut State, dapp_key: &str) -> Result<Params, Rejection> {
        let mut v = Vault::new();
        v.establish_shared_secret(dapp_key).map_err(invalid)?;

        let mut token = [0u8; 32];
        OsRng.fill_bytes(&mut token);
        let session = bs58::encode(token).into_string();

        let data = ConnectData {
            public_key: self.wallet_public_key(),
            session: session.clone(),
        };

        let mut p = seal(&v, &data)?;
        p.insert(
            query::PHANTOM_ENCRYPTION_PUBLIC_KEY.to_string(),
            v.public_key(),
        );

        debug!("Sim session established for dapp key: {}", dapp_key);

        s.sessions.insert(session, dapp_key.to_string());
        s.vaults.insert(dapp_key.to_string(), v);

        Ok(p)
    }
}

#[async_trait]
impl Opener for PhantomSim {
    async fn open(&self, url: &str) -> anyhow::Result<()> {
        let reply = match self.respond(url)? {
            Some(r) => r,
            None => return Ok(()),
        };

        match self.lock().activations.clone() {
            Some(a) => {
                // Replies arrive later, as with the platform handler
                tokio::spawn(async move {
                    tokio::task::yield_now().await;
                    a.activate(&reply);
                });
            }
            None => warn!("No activations attached, discarding reply"),
        }

        Ok(())
    }
}

fn invalid(e: impl Display) -> Rejection {
    (PeerErrorCode::InvalidInput, e.to_string())
}

fn param<'a>(req: &'a DeepLink, key: &str) -> Result<&'a str, Rejection> {
    req.param(key)
        .ok_or_else(|| invalid(format!("missing parameter '{key}'")))
}

fn check_session(s: &State, session: &str, dapp_key: &str) -> Result<(), Rejection> {
    match s.sessions.get(session) {
        Some(k) if k == dapp_key => Ok(()),
        _ => Err((PeerErrorCode::Unauthorized, "invalid session".to_string())),
    }
}

/// Open the sealed request payload
fn open<T: DeserializeOwned>(v: &Vault, req: &DeepLink) -> Result<T, Rejection> {
    let nonce = param(req, query::NONCE)?;
    let payload = param(req, query::PAYLOAD)?;

    v.decrypt(payload, nonce).map_err(invalid)
}

/// Seal a reply body into `nonce` and `data` parameters
fn seal(v: &Vault, data: &impl Serialize) -> Result<Params, Rejection> {
    let sealed = v
        .encrypt(data)
        .map_err(|e| (PeerErrorCode::InternalError, e.to_string()))?;

    let mut p = Params::new();
    p.insert(query::NONCE.to_string(), sealed.nonce);
    p.insert(query::DATA.to_string(), sealed.data);

    Ok(p)
}

fn error_params(code: PeerErrorCode, message: &str) -> Params {
    let mut p = Params::new();
    p.insert(query::ERROR_CODE.to_string(), (code as i32).to_string());
    p.insert(
        query::ERROR_MESSAGE.to_string(),
        utf8_percent_encode(message, NON_ALPHANUMERIC).to_string(),
    );
    p
}

/// Flip a bit in the sealed reply
fn tamper(p: &mut Params) -> anyhow::Result<()> {
    if let Some(d) = p.get_mut(query::DATA) {
        let mut b = bs58::decode(d.as_str()).into_vec()?;
        if let Some(v) = b.first_mut() {
            *v ^= 0x01;
        }
        *d = bs58::encode(b).into_string();
    }

    Ok(())
}

/// Build a reply link against the (unescaped) redirect link
fn reply_url(redirect: &str, params: &Params) -> String {
    let mut url = redirect.to_string();

    if !params.is_empty() {
        let query: Vec<String> = params.iter().map(|(k, v)| format!("{k}={v}")).collect();

        url.push('?');
        url.push_str(&query.join("&"));
    }

    url
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn reply_links() {
        assert_eq!(
            reply_url("app://onPhantomDisconnected", &Params::new()),
            "app://onPhantomDisconnected"
        );

        let p = error_params(PeerErrorCode::UserRejectedRequest, "user rejected");
        assert_eq!(
            reply_url("app://onTxSigned", &p),
            "app://onTxSigned?errorCode=4001&errorMessage=user%20rejected"
        );
    }

    #[test]
    fn reject_mode() {
        let s = PhantomSim::new();
        s.set_mode(Mode::Reject {
            code: PeerErrorCode::UserRejectedRequest,
            message: "no".to_string(),
        });

        let req = DeepLink::new(Method::Connect)
            .with_param(query::REDIRECT_LINK, "app%3A%2F%2FonPhantomConnected")
            .with_param(query::DAPP_ENCRYPTION_PUBLIC_KEY, Vault::new().public_key());

        let reply = s
            .respond(&req.to_url("https://wallet.example/ul/v1"))
            .unwrap()
            .unwrap();

        let reply = DeepLink::parse(&reply).unwrap();
        assert_eq!(reply.method, "onPhantomConnected");
        assert_eq!(reply.param(query::ERROR_CODE), Some("4001"));
        assert_eq!(reply.param(query::DATA), None);

        assert_eq!(s.requests().len(), 1);
        assert_eq!(s.sessions(), 0);
    }

    #[test]
    fn unknown_dapp_key_is_unauthorized() {
        let s = PhantomSim::new();

        let req = DeepLink::new(Method::SignMessage)
            .with_param(query::REDIRECT_LINK, "app%3A%2F%2FonMessageSigned")
            .with_param(query::DAPP_ENCRYPTION_PUBLIC_KEY, Vault::new().public_key())
            .with_param(query::NONCE, "abc")
            .with_param(query::PAYLOAD, "def");

        let reply = s
            .respond(&req.to_url("https://wallet.example/ul/v1"))
            .unwrap()
            .unwrap();

        let reply = DeepLink::parse(&reply).unwrap();
        assert_eq!(reply.param(query::ERROR_CODE), Some("4100"));
    }

    #[test]
    fn invalid_requests() {
        let s = PhantomSim::new();

        assert!(s.respond("not a link").is_err());
        assert!(s.respond("https://wallet.example/ul/v1/connect").is_err());
        assert!(s
            .respond("https://wallet.example/ul/v1/transfer?redirect_link=app%3A%2F%2Fx")
            .is_err());
    }
}
