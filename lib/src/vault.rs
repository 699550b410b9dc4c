// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Session key storage and payload sealing
//!
//! The [Vault] owns an ephemeral X25519 key pair and, following the
//! `connect` handshake, the box derived from the wallet public key.
//! Payloads are sealed with XSalsa20-Poly1305 (NaCl `crypto_box`) using a
//! fresh random nonce for every message.

use crypto_box::{
    aead::{generic_array::GenericArray, Aead},
    PublicKey, SalsaBox, SecretKey,
};
use log::debug;
use rand_core::{OsRng, RngCore};
use serde::{de::DeserializeOwned, Serialize};
use zeroize::Zeroizing;

use phantom_link_proto::consts::{KEY_LEN, NONCE_LEN};

use crate::Error;

/// Sealed payload and nonce, both base-58 encoded for transport
#[derive(Clone, PartialEq, Debug)]
pub struct Sealed {
    pub data: String,
    pub nonce: String,
}

/// Ephemeral session keys and shared secret
pub struct Vault {
    secret: SecretKey,
    public: PublicKey,
    shared: Option<SalsaBox>,
}

impl Default for Vault {
    fn default() -> Self {
        Self::new()
    }
}

impl Vault {
    /// Create a new vault with a randomly generated key pair
    pub fn new() -> Self {
        Self::from_secret(SecretKey::generate(&mut OsRng))
    }

    /// Create a vault from an existing secret key
    pub fn from_secret(secret: impl Into<SecretKey>) -> Self {
        let secret = secret.into();
        let public = secret.public_key();

        Self {
            secret,
            public,
            shared: None,
        }
    }

    /// Base-58 encoded local public key
    pub fn public_key(&self) -> String {
        bs58::encode(self.public.as_bytes()).into_string()
    }

    /// Check whether a shared secret has been established
    pub fn has_shared_secret(&self) -> bool {
        self.shared.is_some()
    }

    /// Derive the shared secret from a base-58 encoded peer public key,
    /// replacing any existing secret
    pub fn establish_shared_secret(&mut self, peer_public_key: &str) -> Result<(), Error> {
        let peer = decode_public_key(peer_public_key)?;

        debug!("Establishing shared secret with peer key: {}", peer_public_key);

        self.shared = Some(SalsaBox::new(&peer, &self.secret));

        Ok(())
    }

    /// Serialize and seal a payload using a fresh random nonce
    pub fn encrypt<T: Serialize>(&self, payload: &T) -> Result<Sealed, Error> {
        let b = self.shared.as_ref().ok_or(Error::NoSharedSecret)?;

        let plaintext = Zeroizing::new(serde_json::to_vec(payload)?);

        let mut nonce = [0u8; NONCE_LEN];
        OsRng.fill_bytes(&mut nonce);

        let ciphertext = b
            .encrypt(GenericArray::from_slice(&nonce), plaintext.as_slice())
            .map_err(|_| Error::Encryption)?;

        Ok(Sealed {
            data: bs58::encode(ciphertext).into_string(),
            nonce: bs58::encode(nonce).into_string(),
        })
    }

    /// Open and deserialize a sealed payload
    pub fn decrypt<T: DeserializeOwned>(&self, data: &str, nonce: &str) -> Result<T, Error> {
        let b = self.shared.as_ref().ok_or(Error::NoSharedSecret)?;

        let nonce = bs58::decode(nonce).into_vec()?;
        if nonce.len() != NONCE_LEN {
            return Err(Error::InvalidNonce(nonce.len()));
        }

        let ciphertext = bs58::decode(data).into_vec()?;

        let plaintext = b
            .decrypt(GenericArray::from_slice(&nonce), ciphertext.as_slice())
            .map(Zeroizing::new)
            .map_err(|_| Error::Authentication)?;

        let v = serde_json::from_slice(&plaintext)?;

        Ok(v)
    }

    /// Discard the shared secret
    pub fn clear(&mut self) {
        self.shared = None;
    }

    /// Replace the key pair with a freshly generated one,
    /// discarding the shared secret
    pub fn rekey(&mut self) {
        *self = Self::new();
    }
}

impl std::fmt::Debug for Vault {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Vault")
            .field("public_key", &self.public_key())
            .field("shared", &self.shared.is_some())
            .finish()
    }
}

/// Decode a base-58 encoded X25519 public key
fn decode_public_key(s: &str) -> Result<PublicKey, Error> {
    let b = bs58::decode(s).into_vec()?;

    let k: [u8; KEY_LEN] = b
        .as_slice()
        .try_into()
        .map_err(|_| Error::InvalidKey(b.len()))?;

    Ok(PublicKey::from(k))
}

#[cfg(test)]
mod test {
    use std::collections::HashSet;

    use phantom_link_proto::payload::Payload;

    use super::*;

    /// Create a pair of vaults sharing a secret
    fn pair() -> (Vault, Vault) {
        let (mut a, mut b) = (Vault::new(), Vault::new());

        a.establish_shared_secret(&b.public_key()).unwrap();
        b.establish_shared_secret(&a.public_key()).unwrap();

        (a, b)
    }

    fn payload(entries: &[(&str, &str)]) -> Payload {
        entries
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn public_key_encoding() {
        let v = Vault::new();

        let k = bs58::decode(v.public_key()).into_vec().unwrap();
        assert_eq!(k.len(), KEY_LEN);
    }

    #[test]
    fn seal_open() {
        let (a, b) = pair();

        let p = payload(&[("session", "abc"), ("message", "3yZe7d")]);

        let sealed = a.encrypt(&p).unwrap();
        let opened: Payload = b.decrypt(&sealed.data, &sealed.nonce).unwrap();
        assert_eq!(opened, p);

        // And in the other direction
        let sealed = b.encrypt(&Payload::new()).unwrap();
        let opened: Payload = a.decrypt(&sealed.data, &sealed.nonce).unwrap();
        assert!(opened.is_empty());
    }

    /// Seal `n` payloads, checking every nonce is distinct
    fn check_unique_nonces(n: usize) {
        let (a, _b) = pair();
        let p = payload(&[("session", "abc")]);

        let nonces: HashSet<String> = (0..n).map(|_| a.encrypt(&p).unwrap().nonce).collect();

        assert_eq!(nonces.len(), n);
    }

    #[test]
    fn nonces_are_unique() {
        check_unique_nonces(10_000);
    }

    #[test]
    #[ignore = "long running, run with --ignored"]
    fn nonces_are_unique_1m() {
        check_unique_nonces(1_000_000);
    }

    #[test]
    fn requires_shared_secret() {
        let v = Vault::new();
        assert!(!v.has_shared_secret());

        assert!(matches!(
            v.encrypt(&Payload::new()),
            Err(Error::NoSharedSecret)
        ));
        assert!(matches!(
            v.decrypt::<Payload>("abc", "abc"),
            Err(Error::NoSharedSecret)
        ));
    }

    #[test]
    fn tampered_data_fails_authentication() {
        let (a, b) = pair();

        let sealed = a.encrypt(&payload(&[("session", "abc")])).unwrap();

        let mut data = bs58::decode(&sealed.data).into_vec().unwrap();
        data[0] ^= 0x01;
        let data = bs58::encode(data).into_string();

        assert!(matches!(
            b.decrypt::<Payload>(&data, &sealed.nonce),
            Err(Error::Authentication)
        ));
    }

    #[test]
    fn wrong_key_fails_authentication() {
        let (a, _b) = pair();
        let (_c, d) = pair();

        let sealed = a.encrypt(&payload(&[("session", "abc")])).unwrap();

        assert!(matches!(
            d.decrypt::<Payload>(&sealed.data, &sealed.nonce),
            Err(Error::Authentication)
        ));
    }

    #[test]
    fn invalid_plaintext_is_format_error() {
        let (a, b) = pair();

        // Valid JSON, but not an object
        let sealed = a.encrypt(&"not a payload").unwrap();

        let r = b.decrypt::<Payload>(&sealed.data, &sealed.nonce);
        assert!(matches!(r, Err(Error::Json(_))));
        assert!(r.unwrap_err().is_format());
    }

    #[test]
    fn invalid_encodings() {
        let (a, b) = pair();
        let sealed = a.encrypt(&Payload::new()).unwrap();

        // Short nonce
        let short = bs58::encode([0u8; 12]).into_string();
        assert!(matches!(
            b.decrypt::<Payload>(&sealed.data, &short),
            Err(Error::InvalidNonce(12))
        ));

        // Not base58 (`0` is outside the alphabet)
        assert!(matches!(
            b.decrypt::<Payload>("0OIl", &sealed.nonce),
            Err(Error::Encoding(_))
        ));

        // Short peer key
        let mut v = Vault::new();
        assert!(matches!(
            v.establish_shared_secret(&bs58::encode([1u8; 16]).into_string()),
            Err(Error::InvalidKey(16))
        ));
        assert!(!v.has_shared_secret());
    }

    #[test]
    fn rekey_replaces_keys() {
        let (mut a, _b) = pair();
        let k = a.public_key();

        a.rekey();

        assert_ne!(a.public_key(), k);
        assert!(!a.has_shared_secret());
    }

    #[test]
    fn fixed_secret_is_deterministic() {
        let a = Vault::from_secret([7u8; 32]);
        let b = Vault::from_secret([7u8; 32]);

        assert_eq!(a.public_key(), b.public_key());
    }
}
