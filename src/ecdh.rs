//! Key agreement.
//!
//! An [`Ecdh`] instance holds an X25519 key pair. Two parties exchange public keys, each combines
//! the other's public key with its own private key, and both arrive at the same [`SharedSecret`].
//! Run that through the [KDF](crate::kdf) and they hold the same symmetric key without it ever
//! having been transmitted.
//!
//! # Example
//!
//! ```
//! # use envelope_crypto::{ecdh::Ecdh, kdf::Kdf, keypair::KeyPairAccess};
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let alice = Ecdh::new()?;
//! let bob = Ecdh::new()?;
//!
//! // Public keys are base64 strings by default, and are decoded as base64 by default.
//! let alice_pub = alice.public_key().unwrap();
//! let bob_pub = bob.public_key().unwrap();
//!
//! let alice_secret = alice.compute_secret(bob_pub.as_str(), None)?.unwrap();
//! let bob_secret = bob.compute_secret(alice_pub.as_str(), None)?.unwrap();
//! assert_eq!(alice_secret, bob_secret);
//!
//! let key = alice_secret.derive_key(&Kdf::default(), b"")?;
//! # let _ = key;
//! # Ok(())
//! # }
//! ```
//!
//! # States
//!
//! An instance is either *ready* (both keys present) or *uninitialized* (built with
//! [`Ecdh::without_keys`], holding nothing). Computing a secret on an uninitialized instance is a
//! no-op that returns `None`. Nothing ever moves a ready instance back to uninitialized.

use crate::{
    encoding::{Encoding, Input},
    kdf::{Kdf, SymmetricKey},
    keypair::{KeyPair, KeyPairAccess, DEFAULT_KEY_ENCODING},
    CryptoError, Result,
};

use rand_core::{CryptoRng, OsRng, RngCore};
use subtle::ConstantTimeEq;
use zeroize::{Zeroize, Zeroizing};

use std::fmt;

/// Size of an X25519 private key, in bytes.
pub const PRIVATE_KEY_SIZE: usize = 32;

/// Size of an X25519 public key, in bytes.
pub const PUBLIC_KEY_SIZE: usize = 32;

/// Size of a computed shared secret, in bytes.
pub const SHARED_SECRET_SIZE: usize = 32;

/// An X25519 key agreement participant.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Ecdh {
    keys: KeyPair,
}

impl Ecdh {
    /// Generate a fresh key pair from the operating system's secure random source.
    pub fn new() -> Result<Self> {
        Self::generate_with(&mut OsRng)
    }

    /// Generate a fresh key pair from the given cryptographic RNG.
    pub fn generate_with<R>(csprng: &mut R) -> Result<Self>
        where R: CryptoRng + RngCore + ?Sized
    {
        let mut raw_key = [0u8; PRIVATE_KEY_SIZE];
        csprng.try_fill_bytes(&mut raw_key)?;
        let new = Self::from_private_key(&raw_key);
        raw_key.zeroize();
        tracing::debug!("generated X25519 key pair");
        new
    }

    /// An uninitialized instance, with neither key present.
    pub fn without_keys() -> Self {
        Ecdh { keys: KeyPair::empty() }
    }

    /// Rebuild an instance from a raw private key. The public key is recomputed from it.
    pub fn from_private_key(private_key: &[u8]) -> Result<Self> {
        let mut raw_key: [u8; PRIVATE_KEY_SIZE] = private_key.try_into()
            .map_err(|_| CryptoError::InvalidKeyLength {
                expected: PRIVATE_KEY_SIZE,
                actual: private_key.len(),
            })?;
        // StaticSecret zeroizes itself on drop; clear the stack copy too.
        let secret = x25519_dalek::StaticSecret::from(raw_key);
        raw_key.zeroize();
        let public = x25519_dalek::PublicKey::from(&secret);
        Ok(Ecdh {
            keys: KeyPair::new(private_key.to_vec(), public.as_bytes().to_vec()),
        })
    }

    /// Rebuild an instance from an encoded private key. Defaults to base64.
    pub fn from_encoded_private_key(private_key: &str, encoding: Option<Encoding>) -> Result<Self> {
        let raw = Input::Text(private_key)
            .to_bytes("private_key", encoding.unwrap_or(DEFAULT_KEY_ENCODING))?;
        let raw = Zeroizing::new(raw.into_owned());
        Self::from_private_key(&raw)
    }

    /// True if this instance holds a key pair.
    pub fn is_ready(&self) -> bool {
        self.keys.is_complete()
    }

    /// Combine our private key with a peer's public key.
    ///
    /// A string public key is decoded with `input_encoding`, defaulting to base64. Returns
    /// `Ok(None)` without looking at the peer key at all if this instance is uninitialized.
    ///
    /// Fails with [`CryptoError::InvalidInput`] if the peer key doesn't decode to 32 bytes, and
    /// with [`CryptoError::KeyImportFailed`] if it is a low-order point that would force an
    /// all-zero secret.
    pub fn compute_secret<'a>(
        &self,
        peer_public_key: impl Into<Input<'a>>,
        input_encoding: Option<Encoding>,
    ) -> Result<Option<SharedSecret>> {
        let private_key = match self.keys.private_key_bytes() {
            Some(key) => key,
            None => {
                tracing::debug!("compute_secret called on an uninitialized key agreement instance");
                return Ok(None);
            }
        };
        let peer: Input = peer_public_key.into();
        let encoding = input_encoding.unwrap_or(DEFAULT_KEY_ENCODING);
        let peer = peer.to_bytes("peer_public_key", encoding)?;
        let peer: [u8; PUBLIC_KEY_SIZE] = (&peer[..]).try_into().map_err(|_| {
            CryptoError::input(
                "peer_public_key",
                format!("expected {} bytes, got {}", PUBLIC_KEY_SIZE, peer.len()),
            )
        })?;
        let peer = x25519_dalek::PublicKey::from(peer);

        let mut raw_key: [u8; PRIVATE_KEY_SIZE] = private_key.try_into()
            .map_err(|_| CryptoError::InvalidKeyLength {
                expected: PRIVATE_KEY_SIZE,
                actual: private_key.len(),
            })?;
        let secret = x25519_dalek::StaticSecret::from(raw_key);
        raw_key.zeroize();

        let shared = secret.diffie_hellman(&peer);
        if !shared.was_contributory() {
            return Err(CryptoError::KeyImportFailed(
                "peer public key is a low-order point".to_string(),
            ));
        }
        tracing::debug!("computed X25519 shared secret");
        Ok(Some(SharedSecret(shared.to_bytes())))
    }

    /// Like [`compute_secret`](Self::compute_secret), but return the secret encoded as a string.
    pub fn compute_secret_encoded<'a>(
        &self,
        peer_public_key: impl Into<Input<'a>>,
        input_encoding: Option<Encoding>,
        output_encoding: Encoding,
    ) -> Result<Option<String>> {
        Ok(self
            .compute_secret(peer_public_key, input_encoding)?
            .map(|s| s.to_encoded(output_encoding)))
    }

    /// Non-blocking [`compute_secret`](Self::compute_secret).
    pub async fn compute_secret_async<'a>(
        &self,
        peer_public_key: impl Into<Input<'a>>,
        input_encoding: Option<Encoding>,
    ) -> Result<Option<SharedSecret>> {
        self.compute_secret(peer_public_key, input_encoding)
    }

    /// Non-blocking [`compute_secret_encoded`](Self::compute_secret_encoded).
    pub async fn compute_secret_encoded_async<'a>(
        &self,
        peer_public_key: impl Into<Input<'a>>,
        input_encoding: Option<Encoding>,
        output_encoding: Encoding,
    ) -> Result<Option<String>> {
        self.compute_secret_encoded(peer_public_key, input_encoding, output_encoding)
    }
}

impl KeyPairAccess for Ecdh {
    fn key_pair(&self) -> &KeyPair {
        &self.keys
    }
}

/// The output of a key agreement. Zeroized on drop.
pub struct SharedSecret([u8; SHARED_SECRET_SIZE]);

impl SharedSecret {
    /// The raw secret.
    pub fn as_bytes(&self) -> &[u8; SHARED_SECRET_SIZE] {
        &self.0
    }

    /// Encode the secret as a string. The result is as sensitive as the secret.
    pub fn to_encoded(&self, encoding: Encoding) -> String {
        encoding.encode(&self.0)
    }

    /// Stretch the secret into a symmetric key.
    pub fn derive_key(&self, kdf: &Kdf, salt: &[u8]) -> Result<SymmetricKey> {
        kdf.derive(&self.0, salt)
    }
}

impl AsRef<[u8]> for SharedSecret {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl PartialEq for SharedSecret {
    fn eq(&self, other: &Self) -> bool {
        self.0[..].ct_eq(&other.0[..]).into()
    }
}

impl Eq for SharedSecret {}

impl Drop for SharedSecret {
    fn drop(&mut self) {
        self.0.zeroize();
    }
}

impl fmt::Debug for SharedSecret {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("SharedSecret(<redacted>)")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PRIVATE_B64: &str = "d05yp7dX+X9FW9KkiunJ+qSp8/RDrFpiQ02EasZre9E=";
    const PUBLIC_B64: &str = "2voilmPU8BamDr1brLjDa3+UlxGllvXN9Zl3xP3GQ38=";

    #[test]
    fn generate() {
        let mut csprng = rand::rngs::OsRng;
        let a = Ecdh::generate_with(&mut csprng).unwrap();
        let b = Ecdh::new().unwrap();
        assert!(a.is_ready());
        assert_eq!(a.public_key_bytes().unwrap().len(), PUBLIC_KEY_SIZE);
        assert_eq!(a.private_key_bytes().unwrap().len(), PRIVATE_KEY_SIZE);
        assert_ne!(a, b);
    }

    #[test]
    fn known_public_key() {
        let a = Ecdh::from_encoded_private_key(PRIVATE_B64, None).unwrap();
        let b = Ecdh::from_encoded_private_key(PRIVATE_B64, Some(Encoding::Base64)).unwrap();
        assert_eq!(a.public_key().unwrap(), PUBLIC_B64);
        assert_eq!(a.public_key(), b.public_key());
        assert_eq!(a.private_key().unwrap(), PRIVATE_B64);
        assert_eq!(
            a.public_key_to(Encoding::Hex).unwrap(),
            "dafa229663d4f016a60ebd5bacb8c36b7f949711a596f5cdf59977c4fdc6437f"
        );
        let hex = a.private_key_to(Encoding::Hex).unwrap();
        let c = Ecdh::from_encoded_private_key(&hex, Some(Encoding::Hex)).unwrap();
        assert_eq!(a, c);
    }

    #[test]
    fn commutative() {
        let alice = Ecdh::new().unwrap();
        let bob = Ecdh::new().unwrap();
        let ab = alice.compute_secret(bob.public_key_bytes().unwrap(), None).unwrap().unwrap();
        let ba = bob.compute_secret(alice.public_key().unwrap().as_str(), None).unwrap().unwrap();
        assert_eq!(ab, ba);
        let hex = bob.public_key_to(Encoding::Hex).unwrap();
        let ab_hex = alice
            .compute_secret_encoded(hex.as_str(), Some(Encoding::Hex), Encoding::Hex)
            .unwrap()
            .unwrap();
        assert_eq!(ab_hex, ab.to_encoded(Encoding::Hex));

        let kdf = Kdf::default();
        assert_eq!(ab.derive_key(&kdf, b"").unwrap(), ba.derive_key(&kdf, b"").unwrap());
    }

    #[test]
    fn uninitialized_is_noop() {
        let empty = Ecdh::without_keys();
        assert!(!empty.is_ready());
        assert!(empty.public_key().is_none());
        assert!(empty.private_key_to(Encoding::Hex).is_none());
        assert!(empty.compute_secret(PUBLIC_B64, None).unwrap().is_none());
        // Even garbage input is never looked at
        assert!(empty.compute_secret("***", Some(Encoding::Hex)).unwrap().is_none());
        assert!(empty.compute_secret_encoded(PUBLIC_B64, None, Encoding::Hex).unwrap().is_none());
    }

    #[test]
    fn bad_peer_keys() {
        let alice = Ecdh::new().unwrap();
        assert!(matches!(
            alice.compute_secret("not base64!", None),
            Err(CryptoError::InvalidInput(_))
        ));
        assert!(matches!(
            alice.compute_secret(&[1u8; 31], None),
            Err(CryptoError::InvalidInput(_))
        ));
        // Well-formed base64 of the wrong length is malformed key material too
        let short = Encoding::Base64.encode(&[7u8; 33]);
        match alice.compute_secret(short.as_str(), None) {
            Err(CryptoError::InvalidInput(why)) => assert!(why.contains("peer_public_key")),
            other => panic!("unexpected result: {:?}", other),
        }
        assert!(matches!(
            alice.compute_secret(&[0u8; 32], None),
            Err(CryptoError::KeyImportFailed(_))
        ));
        assert!(matches!(
            alice.compute_secret(PUBLIC_B64, Some(Encoding::Hex)),
            Err(CryptoError::InvalidInput(_))
        ));
    }

    #[test]
    fn bad_private_keys() {
        assert!(matches!(
            Ecdh::from_private_key(&[1u8; 16]),
            Err(CryptoError::InvalidKeyLength { expected: 32, actual: 16 })
        ));
        assert!(matches!(
            Ecdh::from_encoded_private_key("zz", Some(Encoding::Hex)),
            Err(CryptoError::InvalidInput(_))
        ));
    }

    #[test]
    fn debug_redacted() {
        let a = Ecdh::from_encoded_private_key(PRIVATE_B64, None).unwrap();
        let dbg = format!("{:?}", a);
        assert!(dbg.contains(PUBLIC_B64));
        assert!(!dbg.contains(PRIVATE_B64));
        let b = Ecdh::new().unwrap();
        let secret = a.compute_secret(b.public_key_bytes().unwrap(), None).unwrap().unwrap();
        assert_eq!(format!("{:?}", secret), "SharedSecret(<redacted>)");
    }

    #[tokio::test]
    async fn async_forms() {
        let alice = Ecdh::new().unwrap();
        let bob = Ecdh::new().unwrap();
        let bob_pub = bob.public_key().unwrap();
        let ab = alice.compute_secret_async(bob_pub.as_str(), None).await.unwrap().unwrap();
        let ba = bob.compute_secret(alice.public_key_bytes().unwrap(), None).unwrap().unwrap();
        assert_eq!(ab, ba);
        let ab_b64 = alice
            .compute_secret_encoded_async(bob_pub.as_str(), None, Encoding::Base64)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(ab_b64, ab.to_encoded(Encoding::Base64));
        let res = alice.compute_secret_async(&[0u8; 32], None).await;
        assert!(matches!(res, Err(CryptoError::KeyImportFailed(_))));
        let empty = Ecdh::without_keys();
        assert!(empty.compute_secret_async(bob_pub.as_str(), None).await.unwrap().is_none());
    }
}
