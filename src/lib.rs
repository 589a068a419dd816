/*!
A small crypto envelope: symmetric encryption with nonce management, password-based key
derivation, key agreement, and public-key encryption, with every binary parameter accepted either
as raw bytes or as an encoded string.

The intended workflow is two parties, each with an [`Ecdh`] instance, swapping public keys. Each
computes the same shared secret, stretches it into the same symmetric key with the [`kdf`], and
then exchanges messages with [`aead`], incrementing a nonce for every message.

```
# use envelope_crypto::*;
# fn main() -> Result<()> {
let alice = Ecdh::new()?;
let bob = Ecdh::new()?;

let alice_key = kdf::derive_key(
    alice.compute_secret(bob.public_key().unwrap().as_str(), None)?.unwrap().as_bytes()
)?;
let bob_key = kdf::derive_key(
    bob.compute_secret(alice.public_key().unwrap().as_str(), None)?.unwrap().as_bytes()
)?;

let nonce = aead::generate_nonce();
let message = "Test message from Alice to Bob";
let sealed = aead::encrypt(message, nonce.as_bytes(), alice_key.as_bytes())?;
let opened = aead::decrypt(&sealed, nonce.as_bytes(), bob_key.as_bytes())?;
assert_eq!(opened.to_text(), message);
# Ok(())
# }
```

# Cryptographic Algorithms Used

- Symmetric Encryption: ChaCha20-Poly1305 with a 64-bit nonce (the pre-IETF construction)
- Key derivation: PBKDF2 with HMAC-SHA512
- DH key exchange: X25519
- Public-key encryption: RSA-OAEP with SHA-1

# Encodings

Strings are decoded with an [`Encoding`] before use. Each operation documents its default, and
takes an explicit one where it matters. Nonces and keys passed to [`aead`] must already be raw
bytes: guessing the encoding of a key is never done.

Any operation fails with a [`CryptoError`]; none of them are worth retrying with the same input.
The library emits [`tracing`](https://docs.rs/tracing) events but never installs a subscriber, and
never logs key material or plaintext.

*/

mod error;
pub use self::error::{CryptoError, Result};

pub mod encoding;
pub use encoding::{Encoding, Input};

pub mod keypair;
pub use keypair::{KeyPair, KeyPairAccess};

pub mod plaintext;
pub use plaintext::{Decrypted, Plaintext};

pub mod aead;
pub use aead::Nonce;

pub mod kdf;
pub use kdf::{Kdf, SymmetricKey};

pub mod ecdh;
pub use ecdh::{Ecdh, SharedSecret};

pub mod rsa;
pub use self::rsa::{Rsa, RsaOptions};

#[cfg(feature = "with-serde")]
pub mod serde;

#[cfg(test)]
mod proptests;

use rand_core::{CryptoRng, RngCore};

/// Holds a cryptographic random number generator (RNG). This trait is needed so that a RNG can be
/// passed around as a trait object.
pub trait CryptoSrc: CryptoRng + RngCore {}
impl<T: CryptoRng + RngCore> CryptoSrc for T {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trait_object_rng() {
        let mut boxed: Box<dyn CryptoSrc> = Box::new(rand::rngs::OsRng);
        let csprng: &mut dyn CryptoSrc = boxed.as_mut();
        let a = Nonce::generate_with(csprng);
        let b = Nonce::generate_with(csprng);
        assert_ne!(a, b);
        let ecdh = Ecdh::generate_with(csprng).unwrap();
        assert!(ecdh.is_ready());
        let key = Kdf::default().derive_random_with(csprng).unwrap();
        assert_eq!(key.as_bytes().len(), aead::KEY_SIZE);
    }
}
