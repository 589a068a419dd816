//! Structured plaintext for the encrypting operations.
//!
//! Both [`aead::encrypt`](crate::aead::encrypt) and [`Rsa::encrypt`](crate::rsa::Rsa::encrypt)
//! accept a [`Plaintext`], and both decrypting counterparts return a [`Decrypted`]. Together they
//! let a caller push raw bytes, text, or any JSON-serializable value through a cipher and get an
//! equivalent value back out, without carrying a format tag alongside the ciphertext.
//!
//! # Coercion to bytes
//!
//! | Plaintext                          | Bytes that get encrypted                              |
//! | --                                 | --                                                    |
//! | `Bytes`                            | Unchanged                                             |
//! | `Text`                             | Decoded with the operation's encoding (utf8 default)  |
//! | `Json` (null, number, array, map)  | JSON text, then decoded with the operation's encoding |
//! | `Json` (boolean)                   | Rejected with `InvalidInput`                          |
//! | `Json` (deeper than 127 levels)    | Rejected with `InvalidInput`                          |
//! | `Absent`                           | Empty                                                 |
//!
//! A JSON string coming in through [`Plaintext::from_value`] is treated as `Text`, not as JSON.
//!
//! # Decryption
//!
//! Decrypted bytes that parse as JSON text come back as [`Decrypted::Json`]; everything else comes
//! back as [`Decrypted::Bytes`]. This is decided by looking at the bytes, so a plaintext that
//! merely looks like JSON (the text `123`, say) will come back parsed.
//!
//! Parsing stops at [`MAX_JSON_DEPTH`] nested arrays and maps, which is why deeper values are
//! refused on the way in. Text or bytes that happen to hold deeper JSON come back as bytes.

use crate::{
    encoding::{value_kind, Encoding},
    CryptoError, Result,
};

use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;

use std::{borrow::Cow, convert::TryFrom};

/// Encoding applied to textual plaintext when the caller doesn't name one.
pub const DEFAULT_PLAINTEXT_ENCODING: Encoding = Encoding::Utf8;

/// Deepest nesting of arrays and maps allowed in a JSON plaintext.
pub const MAX_JSON_DEPTH: usize = 127;

/// A value to be encrypted.
#[derive(Clone, Debug, PartialEq)]
pub enum Plaintext<'a> {
    /// Raw bytes.
    Bytes(Cow<'a, [u8]>),
    /// Text, decoded with the operation's encoding.
    Text(Cow<'a, str>),
    /// A structured value, encrypted as its JSON text.
    Json(Value),
    /// No value at all. Encrypts as the empty string.
    Absent,
}

impl Plaintext<'static> {
    /// Classify a dynamically typed value. Strings become `Text`, booleans are rejected, and
    /// everything else becomes `Json`.
    pub fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::String(s) => Ok(Plaintext::Text(Cow::Owned(s))),
            Value::Bool(_) => Err(CryptoError::input(
                "plaintext",
                "booleans cannot be encrypted",
            )),
            other => Ok(Plaintext::Json(other)),
        }
    }

    /// Serialize any value with serde and classify the result like
    /// [`from_value`](Self::from_value).
    pub fn serialize<T: Serialize + ?Sized>(value: &T) -> Result<Self> {
        let value = serde_json::to_value(value)
            .map_err(|e| CryptoError::input("plaintext", e))?;
        Self::from_value(value)
    }
}

impl<'a> Plaintext<'a> {
    /// Coerce into the bytes that actually get encrypted.
    pub fn to_bytes(&self, encoding: Encoding) -> Result<Cow<'_, [u8]>> {
        match self {
            Plaintext::Bytes(b) => Ok(Cow::Borrowed(b.as_ref())),
            Plaintext::Text(s) => decode_text(s, encoding),
            Plaintext::Json(Value::Bool(_)) => Err(CryptoError::input(
                "plaintext",
                "booleans cannot be encrypted",
            )),
            Plaintext::Json(v) => {
                let depth = json_depth(v);
                if depth > MAX_JSON_DEPTH {
                    return Err(CryptoError::input(
                        "plaintext",
                        format!("JSON nested {} levels deep, limit is {}", depth, MAX_JSON_DEPTH),
                    ));
                }
                let text = serde_json::to_string(v)
                    .map_err(|e| CryptoError::input("plaintext", e))?;
                decode_text(&text, encoding).map(|b| Cow::Owned(b.into_owned()))
            }
            Plaintext::Absent => Ok(Cow::Owned(Vec::new())),
        }
    }
}

/// Nesting depth of arrays and maps. Scalars are depth 0.
fn json_depth(value: &Value) -> usize {
    let mut deepest = 0;
    let mut pending = vec![(value, 0)];
    while let Some((value, depth)) = pending.pop() {
        match value {
            Value::Array(items) => {
                deepest = deepest.max(depth + 1);
                pending.extend(items.iter().map(|v| (v, depth + 1)));
            }
            Value::Object(map) => {
                deepest = deepest.max(depth + 1);
                pending.extend(map.values().map(|v| (v, depth + 1)));
            }
            _ => (),
        }
    }
    deepest
}

fn decode_text<'s>(text: &'s str, encoding: Encoding) -> Result<Cow<'s, [u8]>> {
    match encoding {
        Encoding::Utf8 => Ok(Cow::Borrowed(text.as_bytes())),
        other => crate::encoding::Input::Text(text).to_bytes("plaintext", other),
    }
}

impl TryFrom<Value> for Plaintext<'static> {
    type Error = CryptoError;

    fn try_from(value: Value) -> Result<Self> {
        Plaintext::from_value(value)
    }
}

impl<'a> From<&'a [u8]> for Plaintext<'a> {
    fn from(value: &'a [u8]) -> Self {
        Plaintext::Bytes(Cow::Borrowed(value))
    }
}

impl<'a, const N: usize> From<&'a [u8; N]> for Plaintext<'a> {
    fn from(value: &'a [u8; N]) -> Self {
        Plaintext::Bytes(Cow::Borrowed(value.as_ref()))
    }
}

impl<'a> From<&'a Vec<u8>> for Plaintext<'a> {
    fn from(value: &'a Vec<u8>) -> Self {
        Plaintext::Bytes(Cow::Borrowed(value.as_slice()))
    }
}

impl From<Vec<u8>> for Plaintext<'static> {
    fn from(value: Vec<u8>) -> Self {
        Plaintext::Bytes(Cow::Owned(value))
    }
}

impl<'a> From<&'a str> for Plaintext<'a> {
    fn from(value: &'a str) -> Self {
        Plaintext::Text(Cow::Borrowed(value))
    }
}

impl<'a> From<&'a String> for Plaintext<'a> {
    fn from(value: &'a String) -> Self {
        Plaintext::Text(Cow::Borrowed(value.as_str()))
    }
}

impl From<String> for Plaintext<'static> {
    fn from(value: String) -> Self {
        Plaintext::Text(Cow::Owned(value))
    }
}

impl<'a, P: Into<Plaintext<'a>>> From<Option<P>> for Plaintext<'a> {
    fn from(value: Option<P>) -> Self {
        value.map_or(Plaintext::Absent, Into::into)
    }
}

/// The result of a decryption.
#[derive(Clone, Debug, PartialEq)]
pub enum Decrypted {
    /// The plaintext wasn't JSON text.
    Bytes(Vec<u8>),
    /// The plaintext parsed as JSON text.
    Json(Value),
}

impl Decrypted {
    /// Classify freshly decrypted bytes.
    pub fn from_plaintext(bytes: Vec<u8>) -> Self {
        match serde_json::from_slice::<Value>(&bytes) {
            Ok(value) => {
                tracing::trace!(kind = value_kind(&value), "decrypted plaintext parsed as JSON");
                Decrypted::Json(value)
            }
            Err(_) => Decrypted::Bytes(bytes),
        }
    }

    /// True if the plaintext was JSON.
    pub fn is_json(&self) -> bool {
        matches!(self, Decrypted::Json(_))
    }

    /// The raw plaintext, if it wasn't JSON.
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Decrypted::Bytes(b) => Some(b),
            Decrypted::Json(_) => None,
        }
    }

    /// The raw plaintext, if it wasn't JSON.
    pub fn into_bytes(self) -> Option<Vec<u8>> {
        match self {
            Decrypted::Bytes(b) => Some(b),
            Decrypted::Json(_) => None,
        }
    }

    /// The parsed plaintext, if it was JSON.
    pub fn as_json(&self) -> Option<&Value> {
        match self {
            Decrypted::Json(v) => Some(v),
            Decrypted::Bytes(_) => None,
        }
    }

    /// The parsed plaintext, if it was JSON.
    pub fn into_json(self) -> Option<Value> {
        match self {
            Decrypted::Json(v) => Some(v),
            Decrypted::Bytes(_) => None,
        }
    }

    /// Deserialize a JSON plaintext into a concrete type. Fails with `InvalidInput` if the
    /// plaintext wasn't JSON or doesn't match `T`.
    pub fn deserialize<T: DeserializeOwned>(&self) -> Result<T> {
        match self {
            Decrypted::Json(v) => T::deserialize(v)
                .map_err(|e| CryptoError::input("plaintext", e)),
            Decrypted::Bytes(_) => Err(CryptoError::input(
                "plaintext",
                "decrypted data was not JSON",
            )),
        }
    }

    /// The plaintext as text: raw bytes are read as (lossy) UTF-8, JSON is re-serialized.
    pub fn to_text(&self) -> String {
        match self {
            Decrypted::Bytes(b) => String::from_utf8_lossy(b).into_owned(),
            Decrypted::Json(v) => v.to_string(),
        }
    }
}
