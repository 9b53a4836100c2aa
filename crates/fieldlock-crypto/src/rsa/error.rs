//! RSA error types.
//!
//! Decryption failures collapse into the single [`RsaError::Decryption`]
//! variant: distinguishing bad padding from a wrong key or a corrupted
//! ciphertext would hand a padding oracle to whoever controls the input.

use thiserror::Error;

/// Errors from keypair generation and PKCS#1 v1.5 operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RsaError {
    /// Requested modulus size is unsupported
    #[error("invalid key size: {bits} bits (even size of at least 256 required)")]
    InvalidKeySize {
        /// Bit length that was requested
        bits: usize,
    },

    /// Prime search gave up before finding a prime of the requested size
    #[error("prime search exhausted after {attempts} attempts")]
    PrimeSearchExhausted {
        /// Number of candidates that were tested
        attempts: u32,
    },

    /// Keypair assembly kept failing (coprimality retries used up)
    #[error("key generation exhausted its retry budget")]
    GenerationExhausted,

    /// Plaintext does not fit under the padding overhead
    #[error("message too long: at most {max} bytes fit in this key's encryption block")]
    MessageTooLong {
        /// Maximum payload for the key in use
        max: usize,
    },

    /// Deserialized key components are inconsistent
    #[error("invalid key components")]
    InvalidComponents,

    /// Decryption failed. Deliberately carries no cause.
    #[error("decryption failed")]
    Decryption,
}
