//! Fieldlock Cryptographic Primitives
//!
//! RSA keypair generation and PKCS#1 v1.5 block encryption for the Fieldlock
//! form-field encryption protocol. No I/O and no session state; the protocol
//! core owns key lifecycle and wiring.
//!
//! # Key Lifecycle
//!
//! Each rendered form gets one fresh keypair. The public half travels to the
//! browser, the private half stays server-side and is used for exactly one
//! decryption pass before the owning session slot is voided.
//!
//! ```text
//! RsaKeyPair::generate(bits)
//!        │
//!        ▼
//! public half → browser (hex wire form, encoded by the protocol core)
//!        │
//!        ▼
//! pkcs1::decrypt → plaintext form fields (single use)
//! ```
//!
//! # Security
//!
//! - Primes come from `OsRng` via Miller-Rabin search; the public exponent is
//!   fixed at 65537.
//! - Decryption uses the CRT private components and reports every failure as
//!   the single [`RsaError::Decryption`] kind. Padding-check details never
//!   reach the caller.
//! - PKCS#1 intermediate buffers are zeroized after use. `num-bigint` limbs
//!   cannot be zeroized in place; see [`rsa::RsaKeyPair`] for the residue
//!   caveat.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod rsa;

pub use rsa::{KeyComponents, RsaError, RsaKeyPair, RsaPublicKey, pkcs1};
