//! String encodings for byte buffers.
//!
//! Every public operation in this crate takes its binary parameters as an [`Input`]: either a byte
//! slice, which is used as-is, or a string, which is decoded with an [`Encoding`] before it gets
//! anywhere near a cryptographic primitive. Each operation documents which encoding it assumes
//! when the caller doesn't name one.
//!
//! # Example
//!
//! ```
//! # use envelope_crypto::encoding::*;
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let encoding: Encoding = "hex".parse()?;
//! let bytes = Input::from("deadbeef").to_bytes("example", encoding)?;
//! assert_eq!(&bytes[..], &[0xde, 0xad, 0xbe, 0xef]);
//! assert_eq!(Encoding::Base64.encode(&bytes), "3q2+7w==");
//!
//! // Unknown names are rejected rather than falling back to some default.
//! assert!("rot13".parse::<Encoding>().is_err());
//! # Ok(())
//! # }
//! ```
//!
//! # Recognized names
//!
//! Names are matched case-insensitively:
//!
//! | Name(s)              | Encoding                                   |
//! | --                   | --                                         |
//! | `utf8`, `utf-8`      | [`Encoding::Utf8`]                          |
//! | `hex`                | [`Encoding::Hex`]                           |
//! | `base64`             | [`Encoding::Base64`]                        |
//! | `base64url`          | [`Encoding::Base64Url`]                     |
//! | `latin1`, `binary`   | [`Encoding::Latin1`]                        |
//! | `ascii`              | [`Encoding::Ascii`]                         |
//! | `base58`             | [`Encoding::Base58`]                        |

use crate::{CryptoError, Result};

use base64::{
    alphabet,
    engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig},
    Engine,
};

use serde_json::Value;

use std::{borrow::Cow, convert::TryFrom, fmt, str::FromStr};

// Padding is written on encode but optional on decode.
const BASE64: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

const BASE64_URL: GeneralPurpose = GeneralPurpose::new(
    &alphabet::URL_SAFE,
    GeneralPurposeConfig::new()
        .with_encode_padding(false)
        .with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// A way of representing a byte buffer as a string.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Encoding {
    /// UTF-8 text. Encoding bytes that aren't valid UTF-8 replaces them with U+FFFD.
    Utf8,
    /// Lowercase hexadecimal. Decoding accepts either case.
    Hex,
    /// Standard base64 alphabet, padded.
    Base64,
    /// URL-safe base64 alphabet, unpadded.
    Base64Url,
    /// One byte per character (ISO-8859-1). Decoding keeps the low byte of each character.
    Latin1,
    /// 7-bit ASCII. Encoding strips the high bit; decoding behaves like `Latin1`.
    Ascii,
    /// Bitcoin-alphabet base58.
    Base58,
}

impl Encoding {
    /// The canonical name of the encoding.
    pub fn name(&self) -> &'static str {
        match self {
            Encoding::Utf8 => "utf8",
            Encoding::Hex => "hex",
            Encoding::Base64 => "base64",
            Encoding::Base64Url => "base64url",
            Encoding::Latin1 => "latin1",
            Encoding::Ascii => "ascii",
            Encoding::Base58 => "base58",
        }
    }

    /// Encode a byte buffer as a string. Never fails.
    pub fn encode(&self, data: &[u8]) -> String {
        match self {
            Encoding::Utf8 => String::from_utf8_lossy(data).into_owned(),
            Encoding::Hex => hex::encode(data),
            Encoding::Base64 => BASE64.encode(data),
            Encoding::Base64Url => BASE64_URL.encode(data),
            Encoding::Latin1 => data.iter().map(|&b| char::from(b)).collect(),
            Encoding::Ascii => data.iter().map(|&b| char::from(b & 0x7F)).collect(),
            Encoding::Base58 => bs58::encode(data).into_string(),
        }
    }

    /// Decode a string into a byte buffer. Fails with [`CryptoError::InvalidInput`] if the string
    /// isn't valid for this encoding.
    pub fn decode(&self, text: &str) -> Result<Vec<u8>> {
        self.try_decode(text).map_err(CryptoError::InvalidInput)
    }

    fn try_decode(&self, text: &str) -> std::result::Result<Vec<u8>, String> {
        let decoded = match self {
            Encoding::Utf8 => Ok(text.as_bytes().to_vec()),
            Encoding::Hex => hex::decode(text).map_err(|e| e.to_string()),
            Encoding::Base64 => BASE64.decode(text).map_err(|e| e.to_string()),
            Encoding::Base64Url => BASE64_URL.decode(text).map_err(|e| e.to_string()),
            Encoding::Latin1 | Encoding::Ascii => {
                Ok(text.chars().map(|c| c as u32 as u8).collect())
            }
            Encoding::Base58 => bs58::decode(text).into_vec().map_err(|e| e.to_string()),
        };
        decoded.map_err(|e| format!("not valid {} ({})", self.name(), e))
    }
}

impl fmt::Display for Encoding {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Encoding {
    type Err = CryptoError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "utf8" | "utf-8" => Ok(Encoding::Utf8),
            "hex" => Ok(Encoding::Hex),
            "base64" => Ok(Encoding::Base64),
            "base64url" => Ok(Encoding::Base64Url),
            "latin1" | "binary" => Ok(Encoding::Latin1),
            "ascii" => Ok(Encoding::Ascii),
            "base58" => Ok(Encoding::Base58),
            _ => Err(CryptoError::InvalidEncoding(s.to_string())),
        }
    }
}

impl TryFrom<&str> for Encoding {
    type Error = CryptoError;

    fn try_from(value: &str) -> Result<Self> {
        value.parse()
    }
}

/// A binary parameter, given either as raw bytes or as an encoded string.
#[derive(Clone, Copy)]
pub enum Input<'a> {
    /// Raw bytes. Always passed through unchanged.
    Bytes(&'a [u8]),
    /// A string that still needs decoding.
    Text(&'a str),
}

impl<'a> Input<'a> {
    /// Accept a dynamically typed parameter. Only JSON strings are usable as an encoded buffer;
    /// anything else fails with [`CryptoError::InvalidInput`] naming `param`.
    pub fn from_value(param: &str, value: &'a Value) -> Result<Self> {
        match value {
            Value::String(s) => Ok(Input::Text(s)),
            other => Err(CryptoError::input(
                param,
                format!("expected bytes or an encoded string, got {}", value_kind(other)),
            )),
        }
    }

    /// Normalize to bytes. Byte input is returned as-is; strings are decoded with `encoding`.
    /// Decoding failures are reported against `param`.
    pub fn to_bytes(&self, param: &str, encoding: Encoding) -> Result<Cow<'a, [u8]>> {
        match *self {
            Input::Bytes(b) => Ok(Cow::Borrowed(b)),
            Input::Text(s) => encoding
                .try_decode(s)
                .map(Cow::Owned)
                .map_err(|why| CryptoError::input(param, why)),
        }
    }

    /// True if this still needs decoding.
    pub fn is_text(&self) -> bool {
        matches!(self, Input::Text(_))
    }
}

impl fmt::Debug for Input<'_> {
    /// Shows only the length, never the content.
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Input::Bytes(b) => write!(f, "Input::Bytes(len={})", b.len()),
            Input::Text(s) => write!(f, "Input::Text(len={})", s.len()),
        }
    }
}

impl<'a> From<&'a [u8]> for Input<'a> {
    fn from(value: &'a [u8]) -> Self {
        Input::Bytes(value)
    }
}

impl<'a, const N: usize> From<&'a [u8; N]> for Input<'a> {
    fn from(value: &'a [u8; N]) -> Self {
        Input::Bytes(value.as_ref())
    }
}

impl<'a> From<&'a Vec<u8>> for Input<'a> {
    fn from(value: &'a Vec<u8>) -> Self {
        Input::Bytes(value.as_slice())
    }
}

impl<'a> From<&'a str> for Input<'a> {
    fn from(value: &'a str) -> Self {
        Input::Text(value)
    }
}

impl<'a> From<&'a String> for Input<'a> {
    fn from(value: &'a String) -> Self {
        Input::Text(value.as_str())
    }
}

/// Short name for the kind of a JSON value, for error messages.
pub(crate) fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
