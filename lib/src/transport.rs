//! Deep link transport, correlating opened links with inbound activations
//!
// Copyright (c) 2022-2023 The MobileCoin Foundation

use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc, Mutex, MutexGuard, Weak,
    },
    time::Duration,
};

use async_trait::async_trait;
use log::{debug, warn};
use strum::Display;
use tokio::sync::oneshot;

use phantom_link_proto::DeepLink;

use crate::{Error, OpenerKind};

/// Platform facility for opening links (handing control to the wallet)
#[async_trait]
pub trait Opener: Send + Sync {
    /// Open the provided URL
    async fn open(&self, url: &str) -> anyhow::Result<()>;
}

#[async_trait]
impl<T: Opener + ?Sized> Opener for Arc<T> {
    async fn open(&self, url: &str) -> anyhow::Result<()> {
        T::open(self, url).await
    }
}

#[async_trait]
impl<T: Opener + ?Sized> Opener for Box<T> {
    async fn open(&self, url: &str) -> anyhow::Result<()> {
        T::open(self, url).await
    }
}

/// Generic opener (abstract over supported openers)
#[derive(Clone, Debug, PartialEq, Display)]
#[non_exhaustive]
pub enum GenericOpener {
    /// Write links to stdout for the user to open
    Print,
    /// Open links using the platform handler (`open` / `xdg-open` / `start`)
    System,
}

impl From<OpenerKind> for GenericOpener {
    fn from(k: OpenerKind) -> Self {
        match k {
            OpenerKind::Print => Self::Print,
            OpenerKind::System => Self::System,
        }
    }
}

#[async_trait]
impl Opener for GenericOpener {
    async fn open(&self, url: &str) -> anyhow::Result<()> {
        match self {
            Self::Print => {
                println!("{url}");
            }
            Self::System => {
                #[cfg(target_os = "macos")]
                let mut c = tokio::process::Command::new("open");
                #[cfg(target_os = "windows")]
                let mut c = {
                    let mut c = tokio::process::Command::new("cmd");
                    c.args(["/C", "start", ""]);
                    c
                };
                #[cfg(not(any(target_os = "macos", target_os = "windows")))]
                let mut c = tokio::process::Command::new("xdg-open");

                let status = c.arg(url).status().await?;
                if !status.success() {
                    return Err(anyhow::anyhow!("link handler exited with {}", status));
                }
            }
        }

        Ok(())
    }
}

/// Outstanding request, tagged so only its owner removes it
struct Pending {
    id: u64,
    tx: oneshot::Sender<DeepLink>,
}

type PendingMap = Mutex<HashMap<String, Pending>>;

fn lock(m: &PendingMap) -> MutexGuard<'_, HashMap<String, Pending>> {
    m.lock().unwrap_or_else(|e| e.into_inner())
}

/// Deep link protocol, issues requests via an [Opener] and resolves
/// them as replies are delivered through [Activations]
///
/// At most one request may be outstanding per reply method.
pub struct DeepLinkProtocol<O: Opener> {
    base_url: String,
    opener: O,
    pending: Arc<PendingMap>,
    next_id: AtomicU64,
}

impl<O: Opener> DeepLinkProtocol<O> {
    /// Create a new protocol instance issuing requests under `base_url`
    pub fn new(base_url: impl ToString, opener: O) -> Self {
        Self {
            base_url: base_url.to_string(),
            opener,
            pending: Arc::new(Mutex::new(HashMap::new())),
            next_id: AtomicU64::new(0),
        }
    }

    /// Fetch a handle for delivering inbound link activations
    ///
    /// Handles hold a weak reference and become no-ops once the
    /// protocol is dropped.
    pub fn activations(&self) -> Activations {
        Activations {
            pending: Arc::downgrade(&self.pending),
        }
    }

    /// Base URL for outgoing requests
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Issue a request and await the reply on `reply_method`
    ///
    /// With no `timeout` this waits until a reply arrives, the request
    /// is cancelled, or the returned future is dropped.
    pub async fn send(
        &self,
        req: &DeepLink,
        reply_method: &str,
        timeout: Option<Duration>,
    ) -> Result<DeepLink, Error> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = oneshot::channel();

        // Register before opening so an immediate reply cannot be missed
        {
            let mut p = lock(&self.pending);
            if p.contains_key(reply_method) {
                return Err(Error::RequestPending(reply_method.to_string()));
            }
            p.insert(reply_method.to_string(), Pending { id, tx });
        }

        // Entry is released on every exit path
        let _guard = PendingGuard {
            pending: &self.pending,
            key: reply_method,
            id,
        };

        let url = req.to_url(&self.base_url);

        debug!("Opening '{}' request (reply: '{}')", req.method, reply_method);

        self.opener.open(&url).await.map_err(Error::Open)?;

        let resp = match timeout {
            Some(t) => tokio::time::timeout(t, rx).await?,
            None => rx.await,
        };

        resp.map_err(|_| Error::RequestCancelled)
    }

    /// Cancel an outstanding request, returning true if one was pending
    pub fn cancel(&self, reply_method: &str) -> bool {
        let cancelled = lock(&self.pending).remove(reply_method).is_some();
        if cancelled {
            debug!("Cancelled request for '{}'", reply_method);
        }
        cancelled
    }

    /// Check whether a request is outstanding for the provided reply method
    pub fn is_pending(&self, reply_method: &str) -> bool {
        lock(&self.pending).contains_key(reply_method)
    }
}

struct PendingGuard<'a> {
    pending: &'a PendingMap,
    key: &'a str,
    id: u64,
}

impl<'a> Drop for PendingGuard<'a> {
    fn drop(&mut self) {
        let mut p = lock(self.pending);
        if p.get(self.key).map(|v| v.id) == Some(self.id) {
            p.remove(self.key);
        }
    }
}

/// Handle for delivering inbound link activations to a [DeepLinkProtocol]
///
/// This may be cloned and called from any thread.
#[derive(Clone, Debug)]
pub struct Activations {
    pending: Weak<PendingMap>,
}

impl Activations {
    /// Deliver an activation URL, returning true if it resolved a request
    ///
    /// Invalid links, links without a matching request, and activations
    /// after the protocol is dropped are ignored.
    pub fn activate(&self, url: &str) -> bool {
        let pending = match self.pending.upgrade() {
            Some(p) => p,
            None => {
                debug!("Ignoring activation, transport closed");
                return false;
            }
        };

        let link = match DeepLink::parse(url) {
            Ok(l) => l,
            Err(e) => {
                warn!("Ignoring invalid activation: {}", e);
                return false;
            }
        };

        let entry = lock(&pending).remove(&link.method);

        match entry {
            Some(p) => {
                debug!("Resolving request for '{}'", link.method);
                p.tx.send(link).is_ok()
            }
            None => {
                debug!("Ignoring unmatched activation for '{}'", link.method);
                false
            }
        }
    }
}
