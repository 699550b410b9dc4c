// Copyright (c) 2022-2023 The MobileCoin Foundation

use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use phantom_link::{
    proto::{consts::query, payload::Payload, Cluster, DeepLink, PeerErrorCode},
    Activations, ConnectionState, Error, KeyPolicy, Opener, PhantomBridge, Vault,
};
use phantom_link_sim::Mode;

mod helpers;
use helpers::*;

#[tokio::test(flavor = "multi_thread")]
async fn connect_disconnect() -> anyhow::Result<()> {
    let (mut b, sim) = setup(config());
    assert_eq!(b.state(), ConnectionState::Disconnected);

    let wallet = b.connect().await?;

    assert_eq!(wallet, sim.wallet_public_key());
    assert_eq!(b.state(), ConnectionState::Connected);

    let s = b.session().unwrap();
    assert_eq!(s.wallet_public_key, wallet);
    assert!(!s.token.is_empty());
    assert_eq!(sim.sessions(), 1);

    // Check connect request parameters
    let r = &sim.requests()[0];
    assert_eq!(r.method, "connect");
    assert_eq!(r.param(query::APP_URL), Some("https%3A%2F%2Fapp%2Eexample"));
    assert_eq!(
        r.param(query::REDIRECT_LINK),
        Some("testapp%3A%2F%2FonPhantomConnected")
    );
    assert_eq!(r.param(query::CLUSTER), Some("devnet"));
    assert_eq!(
        r.param(query::DAPP_ENCRYPTION_PUBLIC_KEY),
        Some(b.public_key().as_str())
    );

    b.disconnect().await?;

    assert_eq!(b.state(), ConnectionState::Disconnected);
    assert!(b.session().is_none());
    assert_eq!(sim.sessions(), 0);

    let r = &sim.requests()[1];
    assert_eq!(r.method, "disconnect");
    assert_eq!(
        r.param(query::REDIRECT_LINK),
        Some("testapp%3A%2F%2FonPhantomDisconnected")
    );
    assert!(r.param(query::NONCE).is_some());
    assert!(r.param(query::PAYLOAD).is_some());

    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn connect_cluster() -> anyhow::Result<()> {
    let (mut b, sim) = setup(config().with_cluster(Cluster::MainnetBeta));

    b.connect().await?;

    assert_eq!(
        sim.requests()[0].param(query::CLUSTER),
        Some("mainnet-beta")
    );

    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn state_guards() -> anyhow::Result<()> {
    let (mut b, sim) = setup(config());

    // Disconnect while disconnected
    let r = b.disconnect().await;
    assert!(matches!(
        r,
        Err(Error::InvalidState(
            ConnectionState::Disconnected,
            ConnectionState::Connected
        ))
    ));
    assert!(sim.requests().is_empty());

    b.connect().await?;

    // Connect while connected
    let r = b.connect().await;
    assert!(matches!(
        r,
        Err(Error::InvalidState(
            ConnectionState::Connected,
            ConnectionState::Disconnected
        ))
    ));
    assert_eq!(methods(&sim), &["connect"]);
    assert_eq!(b.state(), ConnectionState::Connected);

    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn connect_rejected() -> anyhow::Result<()> {
    let (mut b, sim) = setup(config());

    sim.set_mode(Mode::Reject {
        code: PeerErrorCode::UserRejectedRequest,
        message: "declined".to_string(),
    });

    let e = b.connect().await.unwrap_err();
    assert!(matches!(&e, Error::Peer { code, message } if code == "4001" && message == "declined"));
    assert_eq!(e.peer_code(), Some(PeerErrorCode::UserRejectedRequest));
    assert_eq!(b.state(), ConnectionState::Disconnected);

    // Subsequent connect succeeds
    sim.set_mode(Mode::Approve);
    b.connect().await?;
    assert_eq!(b.state(), ConnectionState::Connected);

    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn connect_error_precedes_data() -> anyhow::Result<()> {
    let (mut b, sim) = setup(config());

    // Well formed reply data with an error attached
    sim.set_mode(Mode::RejectWithData {
        code: PeerErrorCode::InternalError,
        message: "oops".to_string(),
    });

    let r = b.connect().await;
    assert!(matches!(r, Err(Error::Peer { code, .. }) if code == "-32603"));
    assert_eq!(b.state(), ConnectionState::Disconnected);
    assert!(b.session().is_none());

    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn connect_tampered() -> anyhow::Result<()> {
    let (mut b, sim) = setup(config());

    sim.set_mode(Mode::Tamper);

    let r = b.connect().await;
    assert!(matches!(r, Err(Error::Authentication)));
    assert_eq!(b.state(), ConnectionState::Disconnected);

    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn connect_timeout() -> anyhow::Result<()> {
    let (mut b, sim) = setup(config().with_request_timeout_s(Some(1)));

    sim.set_mode(Mode::Drop);

    let r = b.connect().await;
    assert!(matches!(r, Err(Error::RequestTimeout)));
    assert_eq!(b.state(), ConnectionState::Disconnected);

    // Request slot is released on timeout
    sim.set_mode(Mode::Approve);
    b.connect().await?;

    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn reconnect_rotates_keys() -> anyhow::Result<()> {
    let (mut b, sim) = setup(config());
    assert_eq!(b.config().key_policy, KeyPolicy::PerConnection);

    b.connect().await?;
    let k1 = b.public_key();

    b.disconnect().await?;
    let k2 = b.public_key();
    assert_ne!(k1, k2);

    b.connect().await?;

    let keys: Vec<_> = sim
        .requests()
        .iter()
        .map(|r| r.param(query::DAPP_ENCRYPTION_PUBLIC_KEY).unwrap().to_string())
        .collect();
    assert_eq!(keys, &[k1.clone(), k1, k2]);

    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn reconnect_reuses_keys() -> anyhow::Result<()> {
    let (mut b, _sim) = setup(config().with_key_policy(KeyPolicy::Reuse));

    b.connect().await?;
    let k1 = b.public_key();

    b.disconnect().await?;
    assert_eq!(b.public_key(), k1);

    b.connect().await?;
    assert_eq!(b.public_key(), k1);

    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn disconnect_rejected() -> anyhow::Result<()> {
    let (mut b, sim) = setup(config());

    b.connect().await?;
    let k = b.public_key();

    sim.set_mode(Mode::Reject {
        code: PeerErrorCode::UserRejectedRequest,
        message: "no".to_string(),
    });

    let r = b.disconnect().await;
    assert!(matches!(r, Err(Error::Peer { code, .. }) if code == "4001"));

    // Session and keys are retained on failure
    assert_eq!(b.state(), ConnectionState::Connected);
    assert!(b.session().is_some());
    assert_eq!(b.public_key(), k);
    assert_eq!(sim.sessions(), 1);

    sim.set_mode(Mode::Approve);
    b.disconnect().await?;

    assert_eq!(b.state(), ConnectionState::Disconnected);
    assert_ne!(b.public_key(), k);
    assert_eq!(sim.sessions(), 0);

    Ok(())
}

/// Wallet replying to `connect` with a fixed body
#[derive(Clone, Default)]
struct FixedWallet {
    activations: Arc<Mutex<Option<Activations>>>,
}

#[async_trait]
impl Opener for FixedWallet {
    async fn open(&self, url: &str) -> anyhow::Result<()> {
        let req = DeepLink::parse(url)?;

        let mut wallet = Vault::new();
        wallet.establish_shared_secret(req.param(query::DAPP_ENCRYPTION_PUBLIC_KEY).unwrap())?;

        let body: Payload = [("public_key", "W"), ("session", "S")]
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        let sealed = wallet.encrypt(&body)?;

        let reply = format!(
            "testapp://onPhantomConnected?phantom_encryption_public_key={}&nonce={}&data={}",
            wallet.public_key(),
            sealed.nonce,
            sealed.data
        );

        let a = self.activations.lock().unwrap().clone().unwrap();

        // Deliver from another thread
        std::thread::spawn(move || a.activate(&reply));

        Ok(())
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn connect_fixed_reply() -> anyhow::Result<()> {
    setup_logging();

    let w = FixedWallet::default();
    let mut b = PhantomBridge::new(config(), w.clone());
    *w.activations.lock().unwrap() = Some(b.activations());

    let wallet = b.connect().await?;

    assert_eq!(wallet, "W");
    assert_eq!(b.state(), ConnectionState::Connected);

    let s = b.session().unwrap();
    assert_eq!(s.token, "S");
    assert_eq!(s.wallet_public_key, "W");

    Ok(())
}
