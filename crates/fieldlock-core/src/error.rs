//! Error types for the Fieldlock protocol core.
//!
//! All variants are recoverable at the request level; none should take the
//! process down. Two policy points are encoded in the shape of this enum:
//!
//! - [`Error::Decryption`] carries no cause. Distinguishing padding
//!   failures from wrong-key or corrupted-ciphertext failures would hand an
//!   oracle to whoever submits the form.
//! - [`Error::NoKey`] is a normal outcome (stale or replayed submission),
//!   kept separate from [`Error::Persistence`] so callers can prompt a
//!   re-render rather than log an incident.

use fieldlock_crypto::RsaError;
use thiserror::Error;

/// Errors from key lifecycle, wire codec, key store and orchestrator
/// operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// A second generation attempt on key material that already holds a key
    #[error("key already generated: refusing to overwrite a live key")]
    AlreadyGenerated,

    /// The RSA primitive could not produce a key of the requested size
    #[error("key generation failed: {0}")]
    Generation(#[source] RsaError),

    /// Key material used before generation
    #[error("key material not yet generated")]
    NotGenerated,

    /// Malformed wire input (non-hex ciphertext, bad public key string)
    #[error("malformed wire input: {0}")]
    Decode(String),

    /// Decryption failed. Deliberately carries no cause.
    #[error("decryption failed")]
    Decryption,

    /// The session slot holds no key (never populated, or already voided)
    #[error("no key stored in session slot")]
    NoKey,

    /// The host session layer failed to persist or retrieve the key
    #[error("session persistence failed during {stage}: {detail}")]
    Persistence {
        /// Operation stage that failed (store, load, void, ...)
        stage: &'static str,
        /// Backend failure description
        detail: String,
    },
}

impl Error {
    /// Build a [`Error::Persistence`] naming the failing stage.
    pub(crate) fn persistence(stage: &'static str, err: impl std::fmt::Display) -> Self {
        Self::Persistence { stage, detail: err.to_string() }
    }

    /// True when this error is the normal stale-submission outcome rather
    /// than an infrastructure failure.
    ///
    /// A submission without a prior render (or after the key was consumed)
    /// warrants a re-render prompt; everything else warrants investigation.
    pub fn is_stale_submission(&self) -> bool {
        matches!(self, Self::NoKey)
    }
}

impl From<hex::FromHexError> for Error {
    fn from(err: hex::FromHexError) -> Self {
        Self::Decode(err.to_string())
    }
}
