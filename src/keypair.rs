//! Key pair storage shared by every asymmetric key type.
//!
//! A [`KeyPair`] is plain data: an optional private key and an optional public key, both as the
//! raw bytes the owning algorithm works with. Concrete key types ([`Ecdh`](crate::ecdh::Ecdh),
//! [`Rsa`](crate::rsa::Rsa)) own one and expose it through [`KeyPairAccess`], which supplies all
//! the encoding accessors.
//!
//! A key pair built "without keys" has both halves absent, never zero-filled.

use crate::encoding::Encoding;

use zeroize::Zeroizing;

use std::fmt;

/// Encoding used by [`KeyPairAccess::public_key`] and [`KeyPairAccess::private_key`].
pub const DEFAULT_KEY_ENCODING: Encoding = Encoding::Base64;

/// Optional private and public key bytes. The private half is zeroized on drop.
#[derive(Clone, Default)]
pub struct KeyPair {
    private_key: Option<Zeroizing<Vec<u8>>>,
    public_key: Option<Vec<u8>>,
}

impl KeyPair {
    /// A key pair with neither key present.
    pub fn empty() -> Self {
        Self::default()
    }

    /// A key pair holding both keys. The caller is responsible for them matching.
    pub fn new(private_key: Vec<u8>, public_key: Vec<u8>) -> Self {
        Self {
            private_key: Some(Zeroizing::new(private_key)),
            public_key: Some(public_key),
        }
    }

    /// True if both halves are present.
    pub fn is_complete(&self) -> bool {
        self.private_key.is_some() && self.public_key.is_some()
    }

    pub(crate) fn set_private_key(&mut self, key: Option<Vec<u8>>) {
        self.private_key = key.map(Zeroizing::new);
    }

    pub(crate) fn set_public_key(&mut self, key: Option<Vec<u8>>) {
        self.public_key = key;
    }
}

impl fmt::Debug for KeyPair {
    /// Display the public key only; the private key is only ever reported as present or absent.
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("KeyPair")
            .field("public_key", &self.public_key_to(Encoding::Base64))
            .field("has_private_key", &self.private_key.is_some())
            .finish()
    }
}

impl PartialEq for KeyPair {
    fn eq(&self, other: &Self) -> bool {
        use subtle::ConstantTimeEq;
        let private_eq = match (self.private_key_bytes(), other.private_key_bytes()) {
            (Some(a), Some(b)) => bool::from(a.ct_eq(b)),
            (None, None) => true,
            _ => false,
        };
        private_eq && self.public_key == other.public_key
    }
}

impl Eq for KeyPair {}

/// Accessors for anything that owns a [`KeyPair`].
///
/// Every accessor returns `None` when the corresponding key is absent.
pub trait KeyPairAccess {
    /// The underlying key pair.
    fn key_pair(&self) -> &KeyPair;

    /// Raw public key bytes.
    fn public_key_bytes(&self) -> Option<&[u8]> {
        self.key_pair().public_key.as_deref()
    }

    /// Raw private key bytes.
    fn private_key_bytes(&self) -> Option<&[u8]> {
        self.key_pair().private_key.as_ref().map(|k| k.as_slice())
    }

    /// Public key as a base64 string.
    fn public_key(&self) -> Option<String> {
        self.public_key_to(DEFAULT_KEY_ENCODING)
    }

    /// Private key as a base64 string.
    fn private_key(&self) -> Option<String> {
        self.private_key_to(DEFAULT_KEY_ENCODING)
    }

    /// Public key in the given encoding.
    fn public_key_to(&self, encoding: Encoding) -> Option<String> {
        self.public_key_bytes().map(|k| encoding.encode(k))
    }

    /// Private key in the given encoding.
    fn private_key_to(&self, encoding: Encoding) -> Option<String> {
        self.private_key_bytes().map(|k| encoding.encode(k))
    }
}

impl KeyPairAccess for KeyPair {
    fn key_pair(&self) -> &KeyPair {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_pair() {
        let pair = KeyPair::empty();
        assert!(!pair.is_complete());
        assert!(pair.public_key().is_none());
        assert!(pair.private_key().is_none());
        assert!(pair.public_key_bytes().is_none());
        assert!(pair.private_key_bytes().is_none());
        assert!(pair.public_key_to(Encoding::Hex).is_none());
        assert!(pair.private_key_to(Encoding::Hex).is_none());
    }

    #[test]
    fn full_pair() {
        let pair = KeyPair::new(vec![0xAB; 4], vec![0x01, 0x02]);
        assert!(pair.is_complete());
        assert_eq!(pair.private_key().unwrap(), "q6urqw==");
        assert_eq!(pair.public_key().unwrap(), "AQI=");
        assert_eq!(pair.private_key_to(Encoding::Hex).unwrap(), "abababab");
        assert_eq!(pair.public_key_to(Encoding::Hex).unwrap(), "0102");
        assert_eq!(pair.public_key_bytes().unwrap(), &[1, 2]);
    }

    #[test]
    fn debug_never_shows_private_key() {
        let pair = KeyPair::new(vec![0xAB; 4], vec![0x01, 0x02]);
        let dbg = format!("{:?}", pair);
        assert!(dbg.contains("AQI="));
        assert!(!dbg.contains("q6urqw"));
    }

    #[test]
    fn equality() {
        let a = KeyPair::new(vec![1; 4], vec![2; 4]);
        let mut b = a.clone();
        assert_eq!(a, b);
        b.set_private_key(None);
        assert_ne!(a, b);
        assert_eq!(KeyPair::empty(), KeyPair::empty());
    }
}
