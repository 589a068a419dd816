use thiserror::Error;

/// Possible error conditions for every operation in this crate.
///
/// Every failure is either a problem with the caller's input or a cryptographic integrity
/// failure. Neither is worth retrying without changing the input.
#[derive(Error, Debug)]
pub enum CryptoError {
    /// An argument had the wrong type, or a required value was missing. The message names the
    /// offending parameter.
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    /// A named encoding wasn't recognized.
    #[error("Unrecognized encoding {0:?}")]
    InvalidEncoding(String),
    /// A nonce didn't decode to the length the cipher requires.
    #[error("Invalid nonce length: expected {expected}, got {actual}")]
    InvalidNonceLength { expected: usize, actual: usize },
    /// Key material didn't decode to the length the algorithm requires.
    #[error("Invalid key length: expected {expected}, got {actual}")]
    InvalidKeyLength { expected: usize, actual: usize },
    /// The AEAD tag didn't verify: wrong key, wrong nonce, or tampered/truncated ciphertext.
    #[error("Authentication failed: ciphertext could not be verified with this key and nonce")]
    AuthenticationFailed,
    /// A key couldn't be imported (malformed DER, unusable curve point).
    #[error("Key import failed: {0}")]
    KeyImportFailed(String),
    /// The secure random source reported a failure.
    #[error("Random number generation failed: {0}")]
    RandomSource(String),
    /// The RSA engine rejected an operation.
    #[error("RSA operation failed: {0}")]
    Rsa(String),
}

impl CryptoError {
    pub(crate) fn input(param: &str, why: impl std::fmt::Display) -> Self {
        CryptoError::InvalidInput(format!("{}: {}", param, why))
    }

    /// Convert to a string suitable for a serde error message.
    #[cfg(feature = "with-serde")]
    pub(crate) fn serde_err(&self) -> String {
        self.to_string()
    }
}

impl From<rand_core::Error> for CryptoError {
    fn from(err: rand_core::Error) -> CryptoError {
        CryptoError::RandomSource(err.to_string())
    }
}

/// Result type for every fallible operation in this crate.
pub type Result<T> = std::result::Result<T, CryptoError>;
