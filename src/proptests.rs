//! Property-based tests.
//!
//! These check that the core invariants hold for arbitrary inputs:
//!
//! - Encryption round-trips bytes and structured values through every ciphertext encoding
//! - Any single bit flip in a ciphertext is caught
//! - Nonce increment is a little-endian counter with wraparound
//! - Key derivation is deterministic and salt-sensitive
//! - Key agreement is commutative

use proptest::prelude::*;
use serde_json::{Map, Value};

use crate::aead::{self, Nonce, KEY_SIZE, NONCE_SIZE};
use crate::ecdh::Ecdh;
use crate::encoding::Encoding;
use crate::kdf::Kdf;
use crate::keypair::KeyPairAccess;
use crate::plaintext::{Decrypted, Plaintext};
use crate::CryptoError;

const CIPHERTEXT_ENCODINGS: [Encoding; 5] = [
    Encoding::Base64,
    Encoding::Base64Url,
    Encoding::Hex,
    Encoding::Latin1,
    Encoding::Base58,
];

fn finite_f64() -> impl Strategy<Value = f64> {
    use prop::num::f64::{NEGATIVE, NORMAL, POSITIVE, SUBNORMAL, ZERO};
    POSITIVE | NEGATIVE | NORMAL | SUBNORMAL | ZERO
}

/// Arbitrary JSON values. Booleans are left out since they can't be encrypted at top level, and
/// non-finite floats have no JSON form.
fn json_value() -> impl Strategy<Value = Value> {
    let leaf = prop_oneof![
        Just(Value::Null),
        any::<i64>().prop_map(Value::from),
        any::<u64>().prop_map(Value::from),
        finite_f64().prop_map(Value::from),
        ".{0,40}".prop_map(Value::from),
    ];
    leaf.prop_recursive(3, 32, 6, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..6).prop_map(Value::Array),
            prop::collection::btree_map("[a-z]{1,8}", inner, 0..6)
                .prop_map(|m| Value::Object(m.into_iter().collect::<Map<String, Value>>())),
        ]
    })
}

// ==================== AEAD Property Tests ====================

proptest! {
    /// Raw bytes come back unchanged, or parsed if they happen to be JSON text.
    #[test]
    fn bytes_round_trip(
        plaintext in prop::collection::vec(any::<u8>(), 0..512),
        nonce in any::<[u8; NONCE_SIZE]>(),
        key in any::<[u8; KEY_SIZE]>(),
    ) {
        let enc = aead::encrypt(&plaintext, &nonce, &key).unwrap();
        prop_assert_eq!(enc.len(), plaintext.len() + aead::TAG_SIZE);
        for encoding in CIPHERTEXT_ENCODINGS {
            let text = encoding.encode(&enc);
            let dec = aead::decrypt_with_encoding(text.as_str(), encoding, &nonce, &key).unwrap();
            match dec {
                Decrypted::Bytes(bytes) => prop_assert_eq!(bytes, plaintext.clone()),
                Decrypted::Json(value) => {
                    let expected: Value = serde_json::from_slice(&plaintext).unwrap();
                    prop_assert_eq!(value, expected);
                }
            }
        }
    }

    /// Structured values come back deep-equal.
    #[test]
    fn json_round_trip(
        value in json_value(),
        nonce in any::<[u8; NONCE_SIZE]>(),
        key in any::<[u8; KEY_SIZE]>(),
    ) {
        let enc = aead::encrypt(Plaintext::Json(value.clone()), &nonce, &key).unwrap();
        let dec = aead::decrypt(&enc, &nonce, &key).unwrap();
        prop_assert_eq!(dec.into_json(), Some(value));
    }

    /// Flipping any bit of a ciphertext makes decryption fail outright.
    #[test]
    fn bit_flip_detected(
        plaintext in prop::collection::vec(any::<u8>(), 0..128),
        nonce in any::<[u8; NONCE_SIZE]>(),
        key in any::<[u8; KEY_SIZE]>(),
        flip in any::<prop::sample::Index>(),
        bit in 0u8..8,
    ) {
        let mut enc = aead::seal(&plaintext, &nonce, &key).unwrap();
        let i = flip.index(enc.len());
        enc[i] ^= 1 << bit;
        let opened = aead::open(&enc, &nonce, &key);
        prop_assert!(matches!(opened, Err(CryptoError::AuthenticationFailed)));
    }

    /// A different key or nonce never opens the ciphertext.
    #[test]
    fn wrong_key_or_nonce_rejected(
        plaintext in prop::collection::vec(any::<u8>(), 0..128),
        nonce in any::<[u8; NONCE_SIZE]>(),
        key in any::<[u8; KEY_SIZE]>(),
        other_key in any::<[u8; KEY_SIZE]>(),
    ) {
        prop_assume!(key != other_key);
        let enc = aead::seal(&plaintext, &nonce, &key).unwrap();
        let opened = aead::open(&enc, &nonce, &other_key);
        prop_assert!(matches!(opened, Err(CryptoError::AuthenticationFailed)));
        let next = Nonce::from_bytes(&nonce).unwrap().incremented();
        let opened = aead::open(&enc, next.as_bytes(), &key);
        prop_assert!(matches!(opened, Err(CryptoError::AuthenticationFailed)));
    }
}

// ==================== Nonce Property Tests ====================

proptest! {
    /// Incrementing changes the nonce, deterministically, as a little-endian 64-bit counter.
    #[test]
    fn increment_is_le_counter(raw in any::<[u8; NONCE_SIZE]>()) {
        let nonce = Nonce::from_bytes(&raw).unwrap();
        let next = nonce.incremented();
        prop_assert_ne!(next, nonce);
        prop_assert_eq!(next, nonce.incremented());
        let expected = u64::from_le_bytes(raw).wrapping_add(1).to_le_bytes();
        prop_assert_eq!(next.as_bytes(), &expected);

        let mut buf = raw;
        let returned = aead::increment_nonce(&mut buf).unwrap();
        prop_assert_eq!(buf, expected);
        prop_assert_eq!(returned, next);

        let b64 = nonce.to_encoded(Encoding::Base64);
        prop_assert_eq!(aead::increment_nonce_str(&b64).unwrap(), next);
    }

    /// Any buffer that isn't exactly one nonce long is rejected untouched.
    #[test]
    fn increment_rejects_bad_lengths(
        raw in prop::collection::vec(any::<u8>(), 0..32)
    ) {
        prop_assume!(raw.len() != NONCE_SIZE);
        let mut buf = raw.clone();
        let is_bad_length = matches!(
            aead::increment_nonce(&mut buf),
            Err(CryptoError::InvalidNonceLength { .. })
        );
        prop_assert!(is_bad_length);
        prop_assert_eq!(buf, raw);
    }
}

// ==================== Key Derivation Property Tests ====================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Same secret and salt always give the same key; a different salt gives a different one.
    #[test]
    fn derivation_deterministic(
        secret in prop::collection::vec(any::<u8>(), 0..64),
        salt in prop::collection::vec(any::<u8>(), 0..32),
        other_salt in prop::collection::vec(any::<u8>(), 0..32),
    ) {
        let kdf = Kdf::default();
        let a = kdf.derive(&secret, &salt).unwrap();
        let b = kdf.derive(&secret, &salt).unwrap();
        prop_assert_eq!(&a, &b);
        if salt != other_salt {
            let c = kdf.derive(&secret, &other_salt).unwrap();
            prop_assert_ne!(&a, &c);
        }
    }
}

// ==================== Key Agreement Property Tests ====================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Both sides of an exchange compute the same secret.
    #[test]
    fn agreement_commutes(
        a in any::<[u8; 32]>(),
        b in any::<[u8; 32]>(),
    ) {
        let alice = Ecdh::from_private_key(&a).unwrap();
        let bob = Ecdh::from_private_key(&b).unwrap();
        let ab = alice.compute_secret(bob.public_key_bytes().unwrap(), None).unwrap().unwrap();
        let ba = bob.compute_secret(alice.public_key_bytes().unwrap(), None).unwrap().unwrap();
        prop_assert_eq!(ab, ba);

        let again = Ecdh::from_private_key(&a).unwrap();
        prop_assert_eq!(again.public_key(), alice.public_key());
    }
}
