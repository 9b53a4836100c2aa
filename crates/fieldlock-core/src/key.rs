//! Ephemeral key material bound to one rendered form.
//!
//! A [`KeyMaterial`] is created empty with only a bit length, populated by
//! [`KeyMaterial::generate`] at most once, and read-only thereafter. The
//! generate-once guard is a safety device, not a convenience: a stale
//! public key already delivered to a browser must never silently mismatch a
//! regenerated private key, because the resulting decryption failures are
//! miserable to diagnose. Rejecting the second generation surfaces the bug
//! immediately.

use fieldlock_crypto::{RsaKeyPair, pkcs1};

use crate::{error::Error, wire};

/// One ephemeral RSA keypair and its usage state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyMaterial {
    bit_length: usize,
    keypair: Option<RsaKeyPair>,
}

impl KeyMaterial {
    /// Create empty key material for a keypair of `bit_length` bits
    /// (e.g. 1024, 2048, 4096).
    pub fn new(bit_length: usize) -> Self {
        Self { bit_length, keypair: None }
    }

    /// Requested modulus size in bits.
    pub fn bit_length(&self) -> usize {
        self.bit_length
    }

    /// True once [`KeyMaterial::generate`] has succeeded.
    pub fn is_generated(&self) -> bool {
        self.keypair.is_some()
    }

    /// Generate the keypair from a cryptographically secure random source.
    ///
    /// # Errors
    ///
    /// - [`Error::AlreadyGenerated`]: this material already holds a key;
    ///   the existing key is left untouched
    /// - [`Error::Generation`]: the RSA primitive could not produce a key
    ///   of the requested size
    pub fn generate(&mut self) -> Result<(), Error> {
        if self.keypair.is_some() {
            return Err(Error::AlreadyGenerated);
        }
        self.keypair = Some(RsaKeyPair::generate(self.bit_length).map_err(Error::Generation)?);
        Ok(())
    }

    /// Public half in wire form: `<modulus-hex>:<exponent-hex>`.
    ///
    /// # Errors
    ///
    /// - [`Error::NotGenerated`]: called before a successful generation
    pub fn public_key_wire_form(&self) -> Result<String, Error> {
        let keypair = self.keypair.as_ref().ok_or(Error::NotGenerated)?;
        let public = keypair.public();
        Ok(wire::encode_public_key(&public.modulus_bytes(), &public.exponent_bytes()))
    }

    /// Decrypt one submitted ciphertext field.
    ///
    /// Decodes the hex string and applies PKCS#1 v1.5 RSA decryption with
    /// the private key, returning the recovered plaintext bytes (callers
    /// may interpret them as text). Does not mutate the key material.
    ///
    /// # Errors
    ///
    /// - [`Error::NotGenerated`]: called before a successful generation
    /// - [`Error::Decode`]: malformed hex input
    /// - [`Error::Decryption`]: any cryptographic failure; the cause is
    ///   deliberately not distinguished
    pub fn decrypt(&self, ciphertext_hex: &str) -> Result<Vec<u8>, Error> {
        let keypair = self.keypair.as_ref().ok_or(Error::NotGenerated)?;
        let ciphertext = wire::decode_ciphertext(ciphertext_hex)?;
        pkcs1::decrypt(keypair, &ciphertext).map_err(|_| Error::Decryption)
    }

    pub(crate) fn keypair(&self) -> Option<&RsaKeyPair> {
        self.keypair.as_ref()
    }

    pub(crate) fn from_parts(bit_length: usize, keypair: Option<RsaKeyPair>) -> Self {
        Self { bit_length, keypair }
    }
}

#[cfg(test)]
mod tests {
    use fieldlock_crypto::RsaPublicKey;

    use super::*;
    use crate::wire::decode_public_key;

    fn generated(bits: usize) -> KeyMaterial {
        let mut key = KeyMaterial::new(bits);
        key.generate().unwrap();
        key
    }

    #[test]
    fn new_material_is_not_generated() {
        let key = KeyMaterial::new(512);
        assert!(!key.is_generated());
        assert_eq!(key.bit_length(), 512);
    }

    #[test]
    fn second_generation_fails_and_leaves_key_unchanged() {
        let mut key = generated(512);
        let wire_before = key.public_key_wire_form().unwrap();

        assert_eq!(key.generate().unwrap_err(), Error::AlreadyGenerated);
        assert_eq!(key.public_key_wire_form().unwrap(), wire_before);
    }

    #[test]
    fn generation_error_for_unsupported_size() {
        let mut key = KeyMaterial::new(130);
        assert!(matches!(key.generate().unwrap_err(), Error::Generation(_)));
        assert!(!key.is_generated());
    }

    #[test]
    fn wire_form_matches_expected_pattern() {
        let wire = generated(512).public_key_wire_form().unwrap();

        // ^[0-9a-f]+:[0-9a-f]+$
        let (modulus_hex, exponent_hex) = wire.split_once(':').unwrap();
        for half in [modulus_hex, exponent_hex] {
            assert!(!half.is_empty());
            assert!(half.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
        }
    }

    #[test]
    fn wire_form_before_generation_fails() {
        let key = KeyMaterial::new(512);
        assert_eq!(key.public_key_wire_form().unwrap_err(), Error::NotGenerated);
    }

    #[test]
    fn decrypt_before_generation_fails() {
        let key = KeyMaterial::new(512);
        assert_eq!(key.decrypt("abcd").unwrap_err(), Error::NotGenerated);
    }

    #[test]
    fn decrypt_round_trip() {
        let key = generated(512);
        let (modulus, exponent) = decode_public_key(&key.public_key_wire_form().unwrap()).unwrap();
        let public = RsaPublicKey::from_bytes(&modulus, &exponent).unwrap();

        let ciphertext = pkcs1::encrypt(&public, b"correct horse battery staple").unwrap();
        let plaintext = key.decrypt(&hex::encode(ciphertext)).unwrap();
        assert_eq!(plaintext, b"correct horse battery staple");
    }

    #[test]
    fn decrypt_rejects_malformed_hex() {
        let key = generated(512);
        assert!(matches!(key.decrypt("not-hex!").unwrap_err(), Error::Decode(_)));
        assert!(matches!(key.decrypt("abc").unwrap_err(), Error::Decode(_)));
    }

    #[test]
    fn decrypt_failure_is_uniform() {
        let key = generated(512);
        // Valid hex, garbage ciphertext
        assert_eq!(key.decrypt(&"ab".repeat(64)).unwrap_err(), Error::Decryption);
    }

    #[test]
    fn supported_bit_lengths_generate_once() {
        for bits in [1024, 2048] {
            let mut key = generated(bits);
            assert_eq!(key.generate().unwrap_err(), Error::AlreadyGenerated);
        }
    }

    // Slow: two 2048-bit prime searches. Run with `cargo test -- --ignored`.
    #[test]
    #[ignore = "4096-bit prime search is slow"]
    fn supports_4096_bit_keys() {
        let mut key = generated(4096);
        assert_eq!(key.generate().unwrap_err(), Error::AlreadyGenerated);
    }
}
