//! RSA keypair generation and PKCS#1 v1.5 encryption.
//!
//! The keypair carries the CRT private components (`p`, `q`, `dp`, `dq`,
//! `qinv`) alongside `n`, `e`, `d` so decryption runs with the CRT speedup
//! and the full component set survives a serialize/deserialize round trip.

mod error;
mod keypair;
pub mod pkcs1;
mod primes;

pub use error::RsaError;
pub use keypair::{KeyComponents, MIN_KEY_BITS, RsaKeyPair, RsaPublicKey};
