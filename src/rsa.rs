//! RSA public-key encryption.
//!
//! [`Rsa`] wraps an RSA key pair for small one-shot messages, typically a symmetric key or a
//! short JSON document. It applies the same [plaintext](crate::plaintext) rules as
//! [`aead`](crate::aead): structured values go in as JSON text and come back out parsed.
//!
//! # Example
//!
//! ```no_run
//! # use envelope_crypto::{keypair::KeyPairAccess, rsa::Rsa, Encoding, Plaintext};
//! # use serde_json::json;
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let owner = Rsa::new()?;
//!
//! // Hand the public key to someone else, who can only encrypt with it.
//! let mut sender = Rsa::without_keys();
//! sender.set_public_key(owner.public_key().unwrap().as_str(), None)?;
//! let message = Plaintext::Json(json!({"hello": "world"}));
//! let sealed = sender.encrypt_to(message, Encoding::Base64)?;
//!
//! let opened = owner.decrypt(sealed.as_str(), None)?;
//! assert_eq!(opened.as_json(), Some(&json!({"hello": "world"})));
//! # Ok(())
//! # }
//! ```
//!
//! # Algorithms & Format
//!
//! Encryption is RSA-OAEP with SHA-1. Private keys are exported and imported as PKCS#1 DER,
//! public keys as SubjectPublicKeyInfo DER. Both show up base64-encoded through
//! [`KeyPairAccess`].

use crate::{
    encoding::{Encoding, Input},
    keypair::{KeyPair, KeyPairAccess, DEFAULT_KEY_ENCODING},
    plaintext::{Decrypted, Plaintext, DEFAULT_PLAINTEXT_ENCODING},
    CryptoError, Result,
};

use ::rsa::{
    pkcs1::{DecodeRsaPrivateKey, EncodeRsaPrivateKey},
    pkcs8::{DecodePublicKey, EncodePublicKey},
    Oaep, RsaPrivateKey, RsaPublicKey,
};
use rand_core::{CryptoRng, OsRng, RngCore};
use sha1::Sha1;

#[cfg(feature = "with-serde")]
use serde::{Deserialize, Serialize};

use std::fmt;

/// Default modulus size for newly generated keys, in bits.
pub const DEFAULT_RSA_BITS: usize = 2048;

/// Encoding assumed for ciphertext given as a string.
pub const DEFAULT_RSA_CIPHERTEXT_ENCODING: Encoding = Encoding::Base64;

/// Key generation parameters.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "with-serde", derive(Serialize, Deserialize))]
pub struct RsaOptions {
    /// Modulus size in bits.
    pub bits: usize,
}

impl Default for RsaOptions {
    fn default() -> Self {
        RsaOptions { bits: DEFAULT_RSA_BITS }
    }
}

/// An RSA key pair, or just the public half of one.
#[derive(Clone)]
pub struct Rsa {
    keys: KeyPair,
    private: Option<RsaPrivateKey>,
    public: Option<RsaPublicKey>,
}

fn rsa_err(err: ::rsa::Error) -> CryptoError {
    CryptoError::Rsa(err.to_string())
}

impl Rsa {
    /// Generate a key pair with the default modulus size.
    pub fn new() -> Result<Self> {
        Self::with_options(RsaOptions::default())
    }

    /// Generate a key pair with a specific modulus size.
    pub fn with_bits(bits: usize) -> Result<Self> {
        Self::with_options(RsaOptions { bits })
    }

    /// Generate a key pair from the given options.
    pub fn with_options(options: RsaOptions) -> Result<Self> {
        Self::generate_with(&mut OsRng, options.bits)
    }

    /// Generate a key pair, given a cryptographic RNG.
    pub fn generate_with<R>(csprng: &mut R, bits: usize) -> Result<Self>
        where R: CryptoRng + RngCore
    {
        tracing::debug!(bits, "generating RSA key pair");
        let private = RsaPrivateKey::new(csprng, bits).map_err(rsa_err)?;
        let mut new = Self::without_keys();
        new.install_private(private)?;
        Ok(new)
    }

    /// An instance with no keys at all. Load one with [`set_private_key`](Self::set_private_key)
    /// or [`set_public_key`](Self::set_public_key).
    pub fn without_keys() -> Self {
        Rsa {
            keys: KeyPair::empty(),
            private: None,
            public: None,
        }
    }

    /// Import a PKCS#1 DER private key, given as bytes or as a string (base64 unless `encoding`
    /// says otherwise). The public key is refreshed to match.
    pub fn set_private_key<'a>(
        &mut self,
        key: impl Into<Input<'a>>,
        encoding: Option<Encoding>,
    ) -> Result<()> {
        let key: Input = key.into();
        let der = key.to_bytes("private_key", encoding.unwrap_or(DEFAULT_KEY_ENCODING))?;
        let private = RsaPrivateKey::from_pkcs1_der(&der)
            .map_err(|e| CryptoError::KeyImportFailed(format!("RSA private key: {}", e)))?;
        self.install_private(private)?;
        tracing::debug!("imported RSA private key");
        Ok(())
    }

    /// Import a SubjectPublicKeyInfo DER public key, given as bytes or as a string (base64 unless
    /// `encoding` says otherwise). Any private key is dropped; the instance can then only encrypt.
    pub fn set_public_key<'a>(
        &mut self,
        key: impl Into<Input<'a>>,
        encoding: Option<Encoding>,
    ) -> Result<()> {
        let key: Input = key.into();
        let der = key.to_bytes("public_key", encoding.unwrap_or(DEFAULT_KEY_ENCODING))?;
        let public = RsaPublicKey::from_public_key_der(&der)
            .map_err(|e| CryptoError::KeyImportFailed(format!("RSA public key: {}", e)))?;
        self.keys.set_private_key(None);
        self.keys.set_public_key(Some(der.into_owned()));
        self.private = None;
        self.public = Some(public);
        tracing::debug!("imported RSA public key");
        Ok(())
    }

    fn install_private(&mut self, private: RsaPrivateKey) -> Result<()> {
        let public = private.to_public_key();
        let private_der = private
            .to_pkcs1_der()
            .map_err(|e| CryptoError::Rsa(format!("PKCS#1 export failed: {}", e)))?;
        let public_der = public
            .to_public_key_der()
            .map_err(|e| CryptoError::Rsa(format!("SPKI export failed: {}", e)))?;
        self.keys = KeyPair::new(private_der.as_bytes().to_vec(), public_der.as_bytes().to_vec());
        self.private = Some(private);
        self.public = Some(public);
        Ok(())
    }

    /// True if a private key is loaded, so this instance can decrypt.
    pub fn can_decrypt(&self) -> bool {
        self.private.is_some()
    }

    /// Encrypt a plaintext with the public key. Text is read as UTF-8.
    ///
    /// The message must fit in a single OAEP block: 42 bytes less than the modulus size.
    pub fn encrypt<'p>(&self, plaintext: impl Into<Plaintext<'p>>) -> Result<Vec<u8>> {
        let public = self.public.as_ref()
            .ok_or_else(|| CryptoError::input("public_key", "no RSA public key loaded"))?;
        let plaintext: Plaintext = plaintext.into();
        let bytes = plaintext.to_bytes(DEFAULT_PLAINTEXT_ENCODING)?;
        tracing::trace!(len = bytes.len(), "encrypting with RSA-OAEP");
        public
            .encrypt(&mut OsRng, Oaep::new::<Sha1>(), &bytes)
            .map_err(rsa_err)
    }

    /// Encrypt a plaintext and encode the ciphertext as a string.
    pub fn encrypt_to<'p>(
        &self,
        plaintext: impl Into<Plaintext<'p>>,
        encoding: Encoding,
    ) -> Result<String> {
        self.encrypt(plaintext).map(|c| encoding.encode(&c))
    }

    /// Decrypt a ciphertext given as bytes or as a string (base64 unless `encoding` says
    /// otherwise). Plaintext that parses as JSON comes back parsed.
    pub fn decrypt<'a>(
        &self,
        ciphertext: impl Into<Input<'a>>,
        encoding: Option<Encoding>,
    ) -> Result<Decrypted> {
        let private = self.private.as_ref()
            .ok_or_else(|| CryptoError::input("private_key", "no RSA private key loaded"))?;
        let ciphertext: Input = ciphertext.into();
        let ciphertext = ciphertext
            .to_bytes("ciphertext", encoding.unwrap_or(DEFAULT_RSA_CIPHERTEXT_ENCODING))?;
        let plaintext = private
            .decrypt(Oaep::new::<Sha1>(), &ciphertext)
            .map_err(rsa_err)?;
        Ok(Decrypted::from_plaintext(plaintext))
    }

    /// Non-blocking [`set_private_key`](Self::set_private_key).
    pub async fn set_private_key_async<'a>(
        &mut self,
        key: impl Into<Input<'a>>,
        encoding: Option<Encoding>,
    ) -> Result<()> {
        self.set_private_key(key, encoding)
    }

    /// Non-blocking [`set_public_key`](Self::set_public_key).
    pub async fn set_public_key_async<'a>(
        &mut self,
        key: impl Into<Input<'a>>,
        encoding: Option<Encoding>,
    ) -> Result<()> {
        self.set_public_key(key, encoding)
    }

    /// Non-blocking [`encrypt`](Self::encrypt).
    pub async fn encrypt_async<'p>(&self, plaintext: impl Into<Plaintext<'p>>) -> Result<Vec<u8>> {
        self.encrypt(plaintext)
    }

    /// Non-blocking [`encrypt_to`](Self::encrypt_to).
    pub async fn encrypt_to_async<'p>(
        &self,
        plaintext: impl Into<Plaintext<'p>>,
        encoding: Encoding,
    ) -> Result<String> {
        self.encrypt_to(plaintext, encoding)
    }

    /// Non-blocking [`decrypt`](Self::decrypt).
    pub async fn decrypt_async<'a>(
        &self,
        ciphertext: impl Into<Input<'a>>,
        encoding: Option<Encoding>,
    ) -> Result<Decrypted> {
        self.decrypt(ciphertext, encoding)
    }
}

impl KeyPairAccess for Rsa {
    fn key_pair(&self) -> &KeyPair {
        &self.keys
    }
}

impl fmt::Debug for Rsa {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Rsa")
            .field("keys", &self.keys)
            .finish()
    }
}
