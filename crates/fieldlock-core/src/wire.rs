//! Wire encoding for the public key and submitted ciphertext.
//!
//! Public key wire form: `<modulus-hex>:<exponent-hex>`, both lowercase
//! hex. The encoding is injective because the hex alphabet never contains
//! the `:` separator. Ciphertext arrives as one hex string per encrypted
//! form field.

use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Separator between the modulus and exponent halves of the wire form.
const SEPARATOR: char = ':';

/// Encode a public key as `<modulus-hex>:<exponent-hex>`.
///
/// Pure function; well-formed byte inputs cannot fail.
pub fn encode_public_key(modulus: &[u8], exponent: &[u8]) -> String {
    format!("{}{SEPARATOR}{}", hex::encode(modulus), hex::encode(exponent))
}

/// Decode a public key wire string back into modulus and exponent bytes.
///
/// Inverse of [`encode_public_key`], used by Rust-side clients and tests
/// (the browser side does the equivalent split in JavaScript).
pub fn decode_public_key(wire: &str) -> Result<(Vec<u8>, Vec<u8>), Error> {
    let (modulus_hex, exponent_hex) = wire
        .split_once(SEPARATOR)
        .ok_or_else(|| Error::Decode("missing ':' separator".to_string()))?;
    Ok((hex::decode(modulus_hex)?, hex::decode(exponent_hex)?))
}

/// Decode one submitted ciphertext field.
///
/// # Errors
///
/// - [`Error::Decode`]: non-hex characters or odd-length input
pub fn decode_ciphertext(ciphertext_hex: &str) -> Result<Vec<u8>, Error> {
    Ok(hex::decode(ciphertext_hex)?)
}

/// Ordered list of form-field names the client-side script must encrypt
/// before submission.
///
/// Order is preserved from caller input; nothing cryptographic depends on
/// it, but deterministic output keeps rendering reproducible. Serializes
/// as a plain array for embedding into host markup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FieldList(Vec<String>);

impl FieldList {
    /// Build a field list from names, preserving their order.
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(names.into_iter().map(Into::into).collect())
    }

    /// Field names in caller order.
    pub fn names(&self) -> &[String] {
        &self.0
    }

    /// Number of fields.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True when no fields are configured.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}
