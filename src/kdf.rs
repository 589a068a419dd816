//! Password-based symmetric key derivation.
//!
//! Every key used with [`aead`](crate::aead) comes out of PBKDF2-HMAC-SHA512 with a [`KEY_SIZE`]
//! output. Derivation is deterministic: the same secret, salt, and round count always give the
//! same key. That is what lets two parties who computed the same [ECDH](crate::ecdh) shared secret
//! arrive at the same symmetric key without ever sending it.
//!
//! # Example
//!
//! ```
//! # use envelope_crypto::{encoding::Encoding, kdf};
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! // Secrets given as strings are base64 unless told otherwise; salts given as strings are text.
//! let a = kdf::derive_key_salted("c2VjcmV0", "salt")?;
//! let b = kdf::derive_key_with("secret", Encoding::Utf8, "salt")?;
//! assert_eq!(a, b);
//!
//! // A key from nothing: random secret, random salt, still run through PBKDF2.
//! let fresh = kdf::derive_random_key()?;
//! assert_ne!(fresh, a);
//! # Ok(())
//! # }
//! ```
//!
//! The round count defaults to [`DEFAULT_KDF_ROUNDS`]; build a [`Kdf`] to use another.

use crate::{
    aead::KEY_SIZE,
    encoding::{Encoding, Input},
    CryptoError, Result,
};

use rand_core::{CryptoRng, OsRng, RngCore};
use sha2::Sha512;
use subtle::ConstantTimeEq;
use zeroize::{Zeroize, Zeroizing};

#[cfg(feature = "with-serde")]
use serde::{Deserialize, Serialize};

use std::fmt;

/// Default PBKDF2 iteration count: ten rounds per byte of key.
pub const DEFAULT_KDF_ROUNDS: u32 = 10 * KEY_SIZE as u32;

/// Encoding assumed for secrets given as strings.
pub const DEFAULT_SECRET_ENCODING: Encoding = Encoding::Base64;

/// Salts given as strings are always read as text.
const SALT_ENCODING: Encoding = Encoding::Utf8;

/// A derived symmetric key, ready for use with [`aead`](crate::aead). Zeroized on drop.
pub struct SymmetricKey([u8; KEY_SIZE]);

impl SymmetricKey {
    /// Copy a key out of a byte slice, which must be exactly [`KEY_SIZE`] long.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() != KEY_SIZE {
            return Err(CryptoError::InvalidKeyLength {
                expected: KEY_SIZE,
                actual: bytes.len(),
            });
        }
        let mut key = [0u8; KEY_SIZE];
        key.copy_from_slice(bytes);
        Ok(SymmetricKey(key))
    }

    /// Decode a key from a string.
    pub fn from_encoded(key: &str, encoding: Encoding) -> Result<Self> {
        let raw = Zeroizing::new(encoding.decode(key)?);
        Self::from_bytes(&raw)
    }

    /// The raw key.
    pub fn as_bytes(&self) -> &[u8; KEY_SIZE] {
        &self.0
    }

    /// Encode the key as a string. The result is as sensitive as the key.
    pub fn to_encoded(&self, encoding: Encoding) -> String {
        encoding.encode(&self.0)
    }
}

impl AsRef<[u8]> for SymmetricKey {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl PartialEq for SymmetricKey {
    fn eq(&self, other: &Self) -> bool {
        self.0[..].ct_eq(&other.0[..]).into()
    }
}

impl Eq for SymmetricKey {}

impl Drop for SymmetricKey {
    fn drop(&mut self) {
        self.0.zeroize();
    }
}

impl fmt::Debug for SymmetricKey {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("SymmetricKey(<redacted>)")
    }
}

/// PBKDF2-HMAC-SHA512 parameters.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "with-serde", derive(Serialize, Deserialize))]
pub struct Kdf {
    /// Iteration count. Must be at least 1.
    pub rounds: u32,
}

impl Default for Kdf {
    fn default() -> Self {
        Kdf { rounds: DEFAULT_KDF_ROUNDS }
    }
}

impl Kdf {
    /// Parameters with the default round count.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parameters with a specific round count.
    pub fn with_rounds(rounds: u32) -> Self {
        Kdf { rounds }
    }

    /// Derive a key from raw secret and salt bytes.
    pub fn derive(&self, secret: &[u8], salt: &[u8]) -> Result<SymmetricKey> {
        if self.rounds == 0 {
            return Err(CryptoError::input("rounds", "must be at least 1"));
        }
        tracing::debug!(
            rounds = self.rounds,
            salt_len = salt.len(),
            "deriving key with PBKDF2-HMAC-SHA512"
        );
        let mut key = SymmetricKey([0u8; KEY_SIZE]);
        pbkdf2::pbkdf2_hmac::<Sha512>(secret, salt, self.rounds, &mut key.0);
        Ok(key)
    }

    /// Derive a key from a secret decoded with `encoding` and a salt.
    ///
    /// Byte inputs are used unchanged. A string salt is read as UTF-8 text.
    pub fn derive_encoded<'s, 'a>(
        &self,
        secret: impl Into<Input<'s>>,
        encoding: Encoding,
        salt: impl Into<Input<'a>>,
    ) -> Result<SymmetricKey> {
        let secret: Input = secret.into();
        let salt: Input = salt.into();
        let secret = Zeroizing::new(secret.to_bytes("secret", encoding)?.into_owned());
        let salt = salt.to_bytes("salt", SALT_ENCODING)?;
        self.derive(&secret, &salt)
    }

    /// Derive a key from a random secret and a random salt, each [`KEY_SIZE`] bytes long, drawn
    /// from the operating system's secure random source.
    pub fn derive_random(&self) -> Result<SymmetricKey> {
        self.derive_random_with(&mut OsRng)
    }

    /// Derive a key from a random secret and a random salt drawn from the given cryptographic RNG.
    pub fn derive_random_with<R>(&self, csprng: &mut R) -> Result<SymmetricKey>
        where R: CryptoRng + RngCore + ?Sized
    {
        let mut secret = Zeroizing::new([0u8; KEY_SIZE]);
        let mut salt = [0u8; KEY_SIZE];
        csprng.try_fill_bytes(secret.as_mut_slice())?;
        csprng.try_fill_bytes(&mut salt)?;
        self.derive(secret.as_slice(), &salt)
    }
}

/// Derive a key from a random secret and salt. See [`Kdf::derive_random`].
pub fn derive_random_key() -> Result<SymmetricKey> {
    Kdf::default().derive_random()
}

/// Derive a key from a secret alone (base64 if a string), with an empty salt.
pub fn derive_key<'s>(secret: impl Into<Input<'s>>) -> Result<SymmetricKey> {
    Kdf::default().derive_encoded(secret, DEFAULT_SECRET_ENCODING, Input::Bytes(&[]))
}

/// Derive a key from a secret (base64 if a string) and a salt (text if a string).
pub fn derive_key_salted<'s, 'a>(
    secret: impl Into<Input<'s>>,
    salt: impl Into<Input<'a>>,
) -> Result<SymmetricKey> {
    Kdf::default().derive_encoded(secret, DEFAULT_SECRET_ENCODING, salt)
}

/// Derive a key from a secret decoded with `encoding` and a salt (text if a string).
pub fn derive_key_with<'s, 'a>(
    secret: impl Into<Input<'s>>,
    encoding: Encoding,
    salt: impl Into<Input<'a>>,
) -> Result<SymmetricKey> {
    Kdf::default().derive_encoded(secret, encoding, salt)
}

/// Non-blocking [`derive_random_key`].
pub async fn derive_random_key_async() -> Result<SymmetricKey> {
    derive_random_key()
}

/// Non-blocking [`derive_key`].
pub async fn derive_key_async<'s>(secret: impl Into<Input<'s>>) -> Result<SymmetricKey> {
    derive_key(secret)
}

/// Non-blocking [`derive_key_salted`].
pub async fn derive_key_salted_async<'s, 'a>(
    secret: impl Into<Input<'s>>,
    salt: impl Into<Input<'a>>,
) -> Result<SymmetricKey> {
    derive_key_salted(secret, salt)
}

/// Non-blocking [`derive_key_with`].
pub async fn derive_key_with_async<'s, 'a>(
    secret: impl Into<Input<'s>>,
    encoding: Encoding,
    salt: impl Into<Input<'a>>,
) -> Result<SymmetricKey> {
    derive_key_with(secret, encoding, salt)
}
