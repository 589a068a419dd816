//! Authenticated symmetric encryption.
//!
//! This module provides stateless ChaCha20-Poly1305 encryption & decryption with an externally
//! supplied key and nonce, plus the [`Nonce`] lifecycle: a random starting nonce from
//! [`generate_nonce`], then one [`increment_nonce`] per message. Keys normally come from
//! [`kdf`](crate::kdf).
//!
//! # Example
//!
//! ```
//! # use envelope_crypto::{aead, kdf};
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let key = kdf::derive_random_key()?;
//! let mut nonce = aead::generate_nonce();
//!
//! let first = aead::encrypt("first message", nonce.as_bytes(), key.as_bytes())?;
//! nonce.increment();
//! let second = aead::encrypt("second message", nonce.as_bytes(), key.as_bytes())?;
//!
//! let plain = aead::decrypt(&second, nonce.as_bytes(), key.as_bytes())?;
//! assert_eq!(plain.as_bytes().unwrap(), b"second message");
//! # let _ = first;
//! # Ok(())
//! # }
//! ```
//!
//! # Algorithms
//!
//! The cipher is the original ChaCha20-Poly1305 construction with a 64-bit nonce (libsodium's
//! `crypto_aead_chacha20poly1305`), not the 96-bit IETF variant. The Poly1305 key is the first 32
//! bytes of keystream block 0, the message is encrypted starting at block 1, and the tag
//! authenticates `ad || le64(len(ad)) || ciphertext || le64(len(ciphertext))`. Associated data is
//! always empty.
//!
//! Nonces are little-endian counters: incrementing carries from byte 0 upward and wraps silently
//! once every byte overflows.
//!
//! # Format
//!
//! Ciphertext is the encrypted message immediately followed by the 16-byte tag. The nonce is not
//! included; tracking it is up to the caller.
//!
//! ```text
//! +==============+=====+
//! |  Ciphertext  | Tag |
//! +==============+=====+
//! ```
//!
//! Never encrypt two different messages with the same key and nonce.

use crate::{
    encoding::{Encoding, Input},
    plaintext::{Decrypted, Plaintext, DEFAULT_PLAINTEXT_ENCODING},
    CryptoError, Result,
};

use byteorder::{ByteOrder, LittleEndian};
use chacha20::{
    cipher::{KeyIvInit, StreamCipher},
    ChaCha20Legacy, LegacyNonce,
};
use poly1305::{universal_hash::KeyInit, Poly1305};
use rand_core::{CryptoRng, OsRng, RngCore};
use subtle::ConstantTimeEq;
use zeroize::Zeroizing;

use std::fmt;

/// Size of a symmetric key, in bytes.
pub const KEY_SIZE: usize = 32;

/// Size of a nonce, in bytes.
pub const NONCE_SIZE: usize = 8;

/// Size of the authentication tag appended to every ciphertext, in bytes.
pub const TAG_SIZE: usize = 16;

/// Encoding assumed for nonces given as strings.
pub const DEFAULT_NONCE_ENCODING: Encoding = Encoding::Base64;

/// Encoding assumed for ciphertext given as a string.
pub const DEFAULT_CIPHERTEXT_ENCODING: Encoding = Encoding::Base64;

/// An 8-byte ChaCha20-Poly1305 nonce.
///
/// Nonces are not secret, but must never repeat for a given key. Start from a random one and
/// [`increment`](Self::increment) it for each message.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Nonce([u8; NONCE_SIZE]);

impl Nonce {
    /// Generate a random nonce from the operating system's secure random source.
    pub fn generate() -> Self {
        Self::generate_with(&mut OsRng)
    }

    /// Generate a random nonce from the given cryptographic RNG.
    pub fn generate_with<R>(csprng: &mut R) -> Self
    where
        R: CryptoRng + RngCore + ?Sized,
    {
        let mut nonce = [0u8; NONCE_SIZE];
        csprng.fill_bytes(&mut nonce);
        Nonce(nonce)
    }

    /// Copy a nonce out of a byte slice, which must be exactly [`NONCE_SIZE`] long.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let nonce: [u8; NONCE_SIZE] =
            bytes.try_into().map_err(|_| CryptoError::InvalidNonceLength {
                expected: NONCE_SIZE,
                actual: bytes.len(),
            })?;
        Ok(Nonce(nonce))
    }

    /// Decode a nonce from a string.
    pub fn from_encoded(nonce: &str, encoding: Encoding) -> Result<Self> {
        let raw = Input::Text(nonce).to_bytes("nonce", encoding)?;
        Self::from_bytes(&raw)
    }

    /// The raw nonce.
    pub fn as_bytes(&self) -> &[u8; NONCE_SIZE] {
        &self.0
    }

    /// Encode the nonce as a string.
    pub fn to_encoded(&self, encoding: Encoding) -> String {
        encoding.encode(&self.0)
    }

    /// Advance to the next nonce.
    pub fn increment(&mut self) {
        increment_le(&mut self.0);
    }

    /// The nonce after this one, leaving this one untouched.
    pub fn incremented(&self) -> Nonce {
        let mut next = *self;
        next.increment();
        next
    }
}

impl AsRef<[u8]> for Nonce {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for Nonce {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Nonce({})", hex::encode(self.0))
    }
}

/// Add one to a little-endian counter, wrapping at the end. Runs in constant time.
fn increment_le(counter: &mut [u8]) {
    let mut carry: u16 = 1;
    for byte in counter.iter_mut() {
        carry += u16::from(*byte);
        *byte = carry as u8;
        carry >>= 8;
    }
}

/// Generate a random nonce. See [`Nonce::generate`].
pub fn generate_nonce() -> Nonce {
    Nonce::generate()
}

/// Increment a caller-owned nonce buffer.
///
/// The buffer is advanced **in place** and a copy of the new value is returned, so the caller's
/// own storage is always left holding the next nonce. Fails with
/// [`CryptoError::InvalidNonceLength`] (leaving the buffer untouched) if the buffer isn't exactly
/// [`NONCE_SIZE`] bytes.
pub fn increment_nonce(nonce: &mut [u8]) -> Result<Nonce> {
    if nonce.len() != NONCE_SIZE {
        return Err(CryptoError::InvalidNonceLength {
            expected: NONCE_SIZE,
            actual: nonce.len(),
        });
    }
    increment_le(nonce);
    tracing::trace!("incremented nonce buffer in place");
    Nonce::from_bytes(nonce)
}

/// Decode a base64 nonce and return the one after it.
pub fn increment_nonce_str(nonce: &str) -> Result<Nonce> {
    increment_nonce_encoded(nonce, DEFAULT_NONCE_ENCODING)
}

/// Decode a nonce in the given encoding and return the one after it.
pub fn increment_nonce_encoded(nonce: &str, encoding: Encoding) -> Result<Nonce> {
    Ok(Nonce::from_encoded(nonce, encoding)?.incremented())
}

/// Set up the keystream and the one-time authenticator for a key/nonce pair.
fn init(nonce: &[u8], key: &[u8]) -> Result<(ChaCha20Legacy, Poly1305)> {
    if key.len() != KEY_SIZE {
        return Err(CryptoError::InvalidKeyLength {
            expected: KEY_SIZE,
            actual: key.len(),
        });
    }
    if nonce.len() != NONCE_SIZE {
        return Err(CryptoError::InvalidNonceLength {
            expected: NONCE_SIZE,
            actual: nonce.len(),
        });
    }
    let mut cipher = ChaCha20Legacy::new(
        chacha20::Key::from_slice(key),
        LegacyNonce::from_slice(nonce),
    );
    // Keystream block 0 provides the Poly1305 key; the message starts at block 1.
    let mut block0 = Zeroizing::new([0u8; 64]);
    cipher.apply_keystream(&mut block0[..]);
    let mac = Poly1305::new(poly1305::Key::from_slice(&block0[..32]));
    Ok((cipher, mac))
}

fn compute_tag(mac: Poly1305, ciphertext: &[u8]) -> poly1305::Tag {
    let mut data = Vec::with_capacity(ciphertext.len() + 16);
    let mut len = [0u8; 8];
    // Associated data is always empty: nothing but its zero length.
    data.extend_from_slice(&len);
    data.extend_from_slice(ciphertext);
    LittleEndian::write_u64(&mut len, ciphertext.len() as u64);
    data.extend_from_slice(&len);
    mac.compute_unpadded(&data)
}

/// Encrypt raw bytes. The result is the ciphertext followed by the tag.
///
/// Fails if the key or nonce is the wrong length.
pub fn seal(plaintext: &[u8], nonce: &[u8], key: &[u8]) -> Result<Vec<u8>> {
    let (mut cipher, mac) = init(nonce, key)?;
    let mut sealed = Vec::with_capacity(plaintext.len() + TAG_SIZE);
    sealed.extend_from_slice(plaintext);
    cipher
        .try_apply_keystream(&mut sealed)
        .map_err(|_| CryptoError::input("plaintext", "too long for a single nonce"))?;
    let tag = compute_tag(mac, &sealed);
    sealed.extend_from_slice(tag.as_slice());
    Ok(sealed)
}

/// Verify and decrypt raw bytes produced by [`seal`].
///
/// Nothing is decrypted unless the tag verifies: any tampering, truncation, or wrong key/nonce
/// fails with [`CryptoError::AuthenticationFailed`].
pub fn open(sealed: &[u8], nonce: &[u8], key: &[u8]) -> Result<Vec<u8>> {
    let (mut cipher, mac) = init(nonce, key)?;
    if sealed.len() < TAG_SIZE {
        return Err(CryptoError::AuthenticationFailed);
    }
    let (ciphertext, tag) = sealed.split_at(sealed.len() - TAG_SIZE);
    let expected = compute_tag(mac, ciphertext);
    if !bool::from(expected.as_slice().ct_eq(tag)) {
        return Err(CryptoError::AuthenticationFailed);
    }
    let mut plaintext = ciphertext.to_vec();
    cipher
        .try_apply_keystream(&mut plaintext)
        .map_err(|_| CryptoError::input("ciphertext", "too long for a single nonce"))?;
    Ok(plaintext)
}

/// Encrypt a plaintext, reading any text as UTF-8.
///
/// The nonce and key must already be raw bytes of exactly [`NONCE_SIZE`] and [`KEY_SIZE`]. See
/// [`plaintext`](crate::plaintext) for how each kind of plaintext becomes bytes.
pub fn encrypt<'a>(
    plaintext: impl Into<Plaintext<'a>>,
    nonce: &[u8],
    key: &[u8],
) -> Result<Vec<u8>> {
    encrypt_with_encoding(plaintext, DEFAULT_PLAINTEXT_ENCODING, nonce, key)
}

/// Encrypt a plaintext, decoding any text (including JSON text) with `encoding`.
pub fn encrypt_with_encoding<'a>(
    plaintext: impl Into<Plaintext<'a>>,
    encoding: Encoding,
    nonce: &[u8],
    key: &[u8],
) -> Result<Vec<u8>> {
    let plaintext: Plaintext = plaintext.into();
    let bytes = plaintext.to_bytes(encoding)?;
    tracing::debug!(len = bytes.len(), %encoding, "encrypting with ChaCha20-Poly1305");
    seal(&bytes, nonce, key)
}

/// Decrypt a ciphertext given as bytes or as a base64 string.
///
/// Plaintext that parses as JSON is returned parsed; anything else comes back as raw bytes.
pub fn decrypt<'a>(
    ciphertext: impl Into<Input<'a>>,
    nonce: &[u8],
    key: &[u8],
) -> Result<Decrypted> {
    decrypt_with_encoding(ciphertext, DEFAULT_CIPHERTEXT_ENCODING, nonce, key)
}

/// Decrypt a ciphertext given as bytes or as a string in `encoding`.
pub fn decrypt_with_encoding<'a>(
    ciphertext: impl Into<Input<'a>>,
    encoding: Encoding,
    nonce: &[u8],
    key: &[u8],
) -> Result<Decrypted> {
    let ciphertext: Input = ciphertext.into();
    let ciphertext = ciphertext.to_bytes("ciphertext", encoding)?;
    let plaintext = open(&ciphertext, nonce, key).map_err(|e| {
        tracing::debug!(len = ciphertext.len(), error = %e, "ChaCha20-Poly1305 decryption failed");
        e
    })?;
    Ok(Decrypted::from_plaintext(plaintext))
}

// Non-blocking forms. Each runs its synchronous counterpart when first polled.

/// Non-blocking [`encrypt`].
pub async fn encrypt_async<'a>(
    plaintext: impl Into<Plaintext<'a>>,
    nonce: &[u8],
    key: &[u8],
) -> Result<Vec<u8>> {
    encrypt(plaintext, nonce, key)
}

/// Non-blocking [`encrypt_with_encoding`].
pub async fn encrypt_with_encoding_async<'a>(
    plaintext: impl Into<Plaintext<'a>>,
    encoding: Encoding,
    nonce: &[u8],
    key: &[u8],
) -> Result<Vec<u8>> {
    encrypt_with_encoding(plaintext, encoding, nonce, key)
}

/// Non-blocking [`decrypt`].
pub async fn decrypt_async<'a>(
    ciphertext: impl Into<Input<'a>>,
    nonce: &[u8],
    key: &[u8],
) -> Result<Decrypted> {
    decrypt(ciphertext, nonce, key)
}

/// Non-blocking [`decrypt_with_encoding`].
pub async fn decrypt_with_encoding_async<'a>(
    ciphertext: impl Into<Input<'a>>,
    encoding: Encoding,
    nonce: &[u8],
    key: &[u8],
) -> Result<Decrypted> {
    decrypt_with_encoding(ciphertext, encoding, nonce, key)
}

/// Non-blocking [`increment_nonce`].
pub async fn increment_nonce_async(nonce: &mut [u8]) -> Result<Nonce> {
    increment_nonce(nonce)
}

/// Non-blocking [`increment_nonce_str`].
pub async fn increment_nonce_str_async(nonce: &str) -> Result<Nonce> {
    increment_nonce_str(nonce)
}

/// Non-blocking [`increment_nonce_encoded`].
pub async fn increment_nonce_encoded_async(nonce: &str, encoding: Encoding) -> Result<Nonce> {
    increment_nonce_encoded(nonce, encoding)
}
