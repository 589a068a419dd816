//! [`serde`](https://serde.rs/) support.
//!
//! This module is optionally compiled if the `with-serde` feature is enabled (which is the
//! default). Supported types are [`Encoding`], [`Nonce`], [`KeyPair`], and [`Ecdh`]. The
//! [`Kdf`](crate::kdf::Kdf) and [`RsaOptions`](crate::rsa::RsaOptions) parameter structs derive
//! their implementations directly.
//!
//! Binary data serializes as bytes if the serializer is not marked as human-readable. If
//! human-readable, nonces and keys serialize as base64 strings, matching the default encoding
//! used everywhere else in this crate. An `Encoding` always serializes as its name.
//!
//! A `KeyPair` is a struct with two optional fields, `private_key` and `public_key`. An `Ecdh`
//! serializes exactly like its key pair; on the way back in, the public key is recomputed from the
//! private key and must match the stored one if present.
//!
//! Serialized key pairs contain private keys in the clear. Treat the output accordingly.

use crate::{
    aead::{Nonce, DEFAULT_NONCE_ENCODING},
    ecdh::Ecdh,
    encoding::Encoding,
    keypair::{KeyPair, KeyPairAccess, DEFAULT_KEY_ENCODING},
    CryptoError,
};

use serde::{
    de::{Deserialize, Deserializer, Error},
    ser::{Serialize, SerializeStruct, Serializer},
};
use serde_bytes::{ByteBuf, Bytes};
use zeroize::Zeroizing;

const KEY_PAIR_STRUCT: &str = "KeyPair";

impl Serialize for Encoding {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(self.name())
    }
}

impl<'de> Deserialize<'de> for Encoding {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let name = String::deserialize(deserializer)?;
        name.parse()
            .map_err(|e: CryptoError| D::Error::custom(e.serde_err()))
    }
}

impl Serialize for Nonce {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        if serializer.is_human_readable() {
            serializer.serialize_str(&self.to_encoded(DEFAULT_NONCE_ENCODING))
        } else {
            serializer.serialize_bytes(self.as_ref())
        }
    }
}

impl<'de> Deserialize<'de> for Nonce {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        if deserializer.is_human_readable() {
            let text = String::deserialize(deserializer)?;
            Nonce::from_encoded(&text, DEFAULT_NONCE_ENCODING)
                .map_err(|e| D::Error::custom(e.serde_err()))
        } else {
            let bytes = ByteBuf::deserialize(deserializer)?;
            Nonce::from_bytes(&bytes).map_err(|e| D::Error::custom(e.serde_err()))
        }
    }
}

impl Serialize for KeyPair {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let is_human_readable = serializer.is_human_readable();
        let mut state = serializer.serialize_struct(KEY_PAIR_STRUCT, 2)?;
        if is_human_readable {
            let private = self.private_key_to(DEFAULT_KEY_ENCODING).map(Zeroizing::new);
            state.serialize_field("private_key", &private.as_deref())?;
            state.serialize_field("public_key", &self.public_key_to(DEFAULT_KEY_ENCODING))?;
        } else {
            state.serialize_field("private_key", &self.private_key_bytes().map(Bytes::new))?;
            state.serialize_field("public_key", &self.public_key_bytes().map(Bytes::new))?;
        }
        state.end()
    }
}

#[derive(serde::Deserialize)]
#[serde(rename = "KeyPair")]
struct EncodedKeyPair {
    private_key: Option<String>,
    public_key: Option<String>,
}

#[derive(serde::Deserialize)]
#[serde(rename = "KeyPair")]
struct RawKeyPair {
    private_key: Option<ByteBuf>,
    public_key: Option<ByteBuf>,
}

impl<'de> Deserialize<'de> for KeyPair {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let (private_key, public_key) = if deserializer.is_human_readable() {
            let encoded = EncodedKeyPair::deserialize(deserializer)?;
            let private_key = encoded.private_key.map(Zeroizing::new);
            let decode = |key: Option<&str>| {
                key.map(|k| DEFAULT_KEY_ENCODING.decode(k))
                    .transpose()
                    .map_err(|e| D::Error::custom(e.serde_err()))
            };
            (
                decode(private_key.as_deref().map(String::as_str))?,
                decode(encoded.public_key.as_deref())?,
            )
        } else {
            let raw = RawKeyPair::deserialize(deserializer)?;
            (
                raw.private_key.map(ByteBuf::into_vec),
                raw.public_key.map(ByteBuf::into_vec),
            )
        };
        let mut pair = KeyPair::empty();
        pair.set_private_key(private_key);
        pair.set_public_key(public_key);
        Ok(pair)
    }
}

impl Serialize for Ecdh {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        self.key_pair().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Ecdh {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let pair = KeyPair::deserialize(deserializer)?;
        match (pair.private_key_bytes(), pair.public_key_bytes()) {
            (None, None) => Ok(Ecdh::without_keys()),
            (None, Some(_)) => Err(D::Error::custom(
                "key agreement instance has a public key but no private key",
            )),
            (Some(private), public) => {
                let ecdh = Ecdh::from_private_key(private)
                    .map_err(|e| D::Error::custom(e.serde_err()))?;
                match public {
                    Some(public) if Some(public) != ecdh.public_key_bytes() => Err(
                        D::Error::custom("public key does not match the private key"),
                    ),
                    _ => Ok(ecdh),
                }
            }
        }
    }
}
