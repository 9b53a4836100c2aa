//! PKCS#1 v1.5 encryption block encoding (EME-PKCS1-v1_5).
//!
//! Matches the padding scheme the browser-side RSA library applies before
//! submission: `EB = 00 || 02 || PS || 00 || M` with at least eight nonzero
//! random padding bytes.
//!
//! # Security
//!
//! Decryption validates the whole block without early exits and reports
//! every failure as [`RsaError::Decryption`]. Encryption blocks are
//! zeroized after the big-integer conversion.

use num_bigint::BigUint;
use rand::{RngCore, rngs::OsRng};
use zeroize::Zeroize;

use super::{
    error::RsaError,
    keypair::{RsaKeyPair, RsaPublicKey},
};

/// Fixed padding overhead: two marker bytes, eight padding bytes minimum,
/// one separator.
const PADDING_OVERHEAD: usize = 11;

/// Minimum length of the nonzero random padding string PS.
const MIN_PADDING_LEN: usize = 8;

/// Block type marker for encryption blocks.
const BLOCK_TYPE: u8 = 0x02;

/// Largest plaintext that fits in one encryption block for `public`.
pub fn max_payload(public: &RsaPublicKey) -> usize {
    public.modulus_size().saturating_sub(PADDING_OVERHEAD)
}

/// Encrypt `plaintext` under `public` with PKCS#1 v1.5 padding.
///
/// Returns the ciphertext left-padded to the modulus size. This is the
/// server-side twin of the browser library, used by Rust clients and by the
/// round-trip tests.
///
/// # Errors
///
/// - [`RsaError::MessageTooLong`]: plaintext exceeds [`max_payload`]
pub fn encrypt(public: &RsaPublicKey, plaintext: &[u8]) -> Result<Vec<u8>, RsaError> {
    let k = public.modulus_size();
    if k < PADDING_OVERHEAD || plaintext.len() > k - PADDING_OVERHEAD {
        return Err(RsaError::MessageTooLong { max: max_payload(public) });
    }

    let ps_len = k - plaintext.len() - 3;
    let mut rng = OsRng;

    let mut block = vec![0u8; k];
    block[1] = BLOCK_TYPE;
    fill_nonzero(&mut rng, &mut block[2..2 + ps_len]);
    // block[2 + ps_len] is the 0x00 separator
    block[3 + ps_len..].copy_from_slice(plaintext);

    let m = BigUint::from_bytes_be(&block);
    block.zeroize();

    debug_assert!(&m < public.n());
    let c = m.modpow(public.e(), public.n());

    Ok(left_pad(&c.to_bytes_be(), k))
}

/// Decrypt a PKCS#1 v1.5 encryption block with the private key.
///
/// # Errors
///
/// - [`RsaError::Decryption`]: for any failure (ciphertext out of range,
///   malformed padding, wrong key). Callers never learn which.
pub fn decrypt(key: &RsaKeyPair, ciphertext: &[u8]) -> Result<Vec<u8>, RsaError> {
    let k = key.public().modulus_size();
    if ciphertext.is_empty() {
        return Err(RsaError::Decryption);
    }

    let c = BigUint::from_bytes_be(ciphertext);
    if &c >= key.public().n() {
        return Err(RsaError::Decryption);
    }

    let mut block = left_pad(&key.decrypt_int(&c).to_bytes_be(), k);
    if block.len() != k {
        block.zeroize();
        return Err(RsaError::Decryption);
    }

    // Scan the whole block instead of returning at the first bad byte to
    // keep the timing profile flat across malformed inputs.
    let mut valid = block[0] == 0x00 && block[1] == BLOCK_TYPE;
    let mut separator: Option<usize> = None;
    for (i, &byte) in block.iter().enumerate().skip(2) {
        if byte == 0x00 && separator.is_none() {
            separator = Some(i);
        }
    }

    let plaintext = match separator {
        Some(sep) if sep >= 2 + MIN_PADDING_LEN => {
            valid &= block[2..sep].iter().all(|&b| b != 0x00);
            block[sep + 1..].to_vec()
        },
        _ => {
            valid = false;
            Vec::new()
        },
    };

    block.zeroize();

    if valid { Ok(plaintext) } else { Err(RsaError::Decryption) }
}

/// Fill `buffer` with nonzero random bytes.
fn fill_nonzero(rng: &mut impl RngCore, buffer: &mut [u8]) {
    rng.fill_bytes(buffer);
    for byte in buffer.iter_mut() {
        while *byte == 0 {
            let mut replacement = [0u8; 1];
            rng.fill_bytes(&mut replacement);
            *byte = replacement[0];
        }
    }
}

/// Left-pad big-endian bytes with zeros to exactly `len` bytes.
///
/// Returns the input unchanged when it is already `len` bytes or longer;
/// the caller checks the final length.
fn left_pad(bytes: &[u8], len: usize) -> Vec<u8> {
    if bytes.len() >= len {
        return bytes.to_vec();
    }
    let mut padded = vec![0u8; len - bytes.len()];
    padded.extend_from_slice(bytes);
    padded
}

#[cfg(test)]
mod tests {
    use std::sync::OnceLock;

    use proptest::prelude::{ProptestConfig, any, proptest};

    use super::*;

    /// Shared key so the prime search runs once for the whole module.
    fn test_key() -> &'static RsaKeyPair {
        static KEY: OnceLock<RsaKeyPair> = OnceLock::new();
        KEY.get_or_init(|| RsaKeyPair::generate(512).unwrap())
    }

    #[test]
    fn round_trip_ascii() {
        let key = test_key();
        let ciphertext = encrypt(key.public(), b"hunter2").unwrap();
        assert_eq!(decrypt(key, &ciphertext).unwrap(), b"hunter2");
    }

    #[test]
    fn round_trip_empty_payload() {
        let key = test_key();
        let ciphertext = encrypt(key.public(), b"").unwrap();
        assert_eq!(decrypt(key, &ciphertext).unwrap(), Vec::<u8>::new());
    }

    #[test]
    fn round_trip_max_payload() {
        let key = test_key();
        let payload = vec![0xabu8; max_payload(key.public())];
        let ciphertext = encrypt(key.public(), &payload).unwrap();
        assert_eq!(decrypt(key, &ciphertext).unwrap(), payload);
    }

    #[test]
    fn payload_may_contain_zero_bytes() {
        let key = test_key();
        let payload = [0u8, 1, 0, 2, 0];
        let ciphertext = encrypt(key.public(), &payload).unwrap();
        assert_eq!(decrypt(key, &ciphertext).unwrap(), payload);
    }

    #[test]
    fn oversized_payload_rejected() {
        let key = test_key();
        let payload = vec![1u8; max_payload(key.public()) + 1];
        assert_eq!(
            encrypt(key.public(), &payload).unwrap_err(),
            RsaError::MessageTooLong { max: max_payload(key.public()) }
        );
    }

    #[test]
    fn ciphertext_has_modulus_width() {
        let key = test_key();
        let ciphertext = encrypt(key.public(), b"x").unwrap();
        assert_eq!(ciphertext.len(), key.public().modulus_size());
    }

    #[test]
    fn tampered_ciphertext_fails() {
        let key = test_key();
        let mut ciphertext = encrypt(key.public(), b"secret").unwrap();
        ciphertext[10] ^= 0x01;
        assert_eq!(decrypt(key, &ciphertext).unwrap_err(), RsaError::Decryption);
    }

    #[test]
    fn wrong_key_fails() {
        let key = test_key();
        let other = RsaKeyPair::generate(512).unwrap();
        let ciphertext = encrypt(key.public(), b"secret").unwrap();
        assert_eq!(decrypt(&other, &ciphertext).unwrap_err(), RsaError::Decryption);
    }

    #[test]
    fn out_of_range_ciphertext_fails() {
        let key = test_key();
        let too_big = key.public().modulus_bytes();
        assert_eq!(decrypt(key, &too_big).unwrap_err(), RsaError::Decryption);
        assert_eq!(decrypt(key, &[]).unwrap_err(), RsaError::Decryption);
    }

    #[test]
    fn wrong_key_and_bad_padding_are_indistinguishable() {
        let key = test_key();
        let other = RsaKeyPair::generate(512).unwrap();
        let ciphertext = encrypt(key.public(), b"secret").unwrap();

        let wrong_key = decrypt(&other, &ciphertext).unwrap_err();
        let garbage = decrypt(key, &[0x01; 64]).unwrap_err();
        assert_eq!(wrong_key, garbage);
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(32))]

        #[test]
        fn round_trip_arbitrary_payloads(payload in proptest::collection::vec(any::<u8>(), 0..53)) {
            let key = test_key();
            let ciphertext = encrypt(key.public(), &payload).unwrap();
            let recovered = decrypt(key, &ciphertext).unwrap();
            assert_eq!(recovered, payload);
        }
    }
}
