//! RSA keypair with CRT private components.

use std::fmt;

use num_bigint::BigUint;
use num_integer::Integer;
use num_traits::{One, Zero};
use zeroize::{Zeroize, ZeroizeOnDrop};

use super::{error::RsaError, primes};

/// Smallest supported modulus size in bits.
pub const MIN_KEY_BITS: usize = 256;

/// Fixed public exponent (F4).
const PUBLIC_EXPONENT: u32 = 65_537;

/// Retries for whole-keypair assembly when a prime pair is unusable
/// (equal primes, or phi not coprime with e).
const MAX_GENERATE_ATTEMPTS: u32 = 8;

/// Public half of an RSA keypair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RsaPublicKey {
    n: BigUint,
    e: BigUint,
}

impl RsaPublicKey {
    pub(crate) fn new(n: BigUint, e: BigUint) -> Self {
        Self { n, e }
    }

    /// Reconstruct a public key from big-endian modulus and exponent bytes,
    /// as carried on the wire.
    pub fn from_bytes(modulus: &[u8], exponent: &[u8]) -> Result<Self, RsaError> {
        let n = BigUint::from_bytes_be(modulus);
        let e = BigUint::from_bytes_be(exponent);
        if n.is_zero() || e <= BigUint::one() {
            return Err(RsaError::InvalidComponents);
        }
        Ok(Self { n, e })
    }

    /// Modulus size in whole bytes (the PKCS#1 block size `k`).
    pub fn modulus_size(&self) -> usize {
        self.n.bits().div_ceil(8) as usize
    }

    /// Modulus `n` as big-endian bytes.
    pub fn modulus_bytes(&self) -> Vec<u8> {
        self.n.to_bytes_be()
    }

    /// Public exponent `e` as big-endian bytes.
    pub fn exponent_bytes(&self) -> Vec<u8> {
        self.e.to_bytes_be()
    }

    pub(crate) fn n(&self) -> &BigUint {
        &self.n
    }

    pub(crate) fn e(&self) -> &BigUint {
        &self.e
    }
}

/// Complete RSA keypair.
///
/// Constructed only by [`RsaKeyPair::generate`] or by a validated
/// [`RsaKeyPair::from_components`], so a keypair in hand is always
/// internally consistent.
///
/// # Security
///
/// `Debug` output redacts the private components. `num-bigint` stores limbs
/// on the heap without a zeroizing drop, so freed private material is not
/// scrubbed in place; the byte-level export ([`KeyComponents`]) is zeroized
/// on drop instead.
#[derive(Clone, PartialEq, Eq)]
pub struct RsaKeyPair {
    public: RsaPublicKey,
    d: BigUint,
    p: BigUint,
    q: BigUint,
    dp: BigUint,
    dq: BigUint,
    qinv: BigUint,
}

impl fmt::Debug for RsaKeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RsaKeyPair")
            .field("public", &self.public)
            .field("private", &"<redacted>")
            .finish()
    }
}

impl RsaKeyPair {
    /// Generate a fresh keypair with a modulus of exactly `bits` bits.
    ///
    /// # Errors
    ///
    /// - [`RsaError::InvalidKeySize`]: `bits` is odd or below
    ///   [`MIN_KEY_BITS`]
    /// - [`RsaError::PrimeSearchExhausted`]: the random source kept
    ///   producing composites
    /// - [`RsaError::GenerationExhausted`]: no usable prime pair within the
    ///   retry budget
    pub fn generate(bits: usize) -> Result<Self, RsaError> {
        if bits < MIN_KEY_BITS || bits % 2 != 0 {
            return Err(RsaError::InvalidKeySize { bits });
        }

        let e = BigUint::from(PUBLIC_EXPONENT);
        let one = BigUint::one();
        let half = (bits / 2) as u64;

        for _ in 0..MAX_GENERATE_ATTEMPTS {
            let p = primes::generate_prime(half)?;
            let q = primes::generate_prime(half)?;
            if p == q {
                continue;
            }

            let p_minus_one = &p - &one;
            let q_minus_one = &q - &one;
            let phi = &p_minus_one * &q_minus_one;
            if phi.gcd(&e) != one {
                continue;
            }

            let Some(d) = e.modinv(&phi) else {
                continue;
            };
            let Some(qinv) = q.modinv(&p) else {
                continue;
            };

            let n = &p * &q;
            debug_assert_eq!(n.bits(), bits as u64);

            let dp = &d % &p_minus_one;
            let dq = &d % &q_minus_one;

            return Ok(Self { public: RsaPublicKey::new(n, e.clone()), d, p, q, dp, dq, qinv });
        }

        Err(RsaError::GenerationExhausted)
    }

    /// Public half of the keypair.
    pub fn public(&self) -> &RsaPublicKey {
        &self.public
    }

    /// Export every component as big-endian bytes for persistence.
    pub fn components(&self) -> KeyComponents {
        KeyComponents {
            modulus: self.public.modulus_bytes(),
            public_exponent: self.public.exponent_bytes(),
            private_exponent: self.d.to_bytes_be(),
            prime_p: self.p.to_bytes_be(),
            prime_q: self.q.to_bytes_be(),
            exponent_p: self.dp.to_bytes_be(),
            exponent_q: self.dq.to_bytes_be(),
            crt_coefficient: self.qinv.to_bytes_be(),
        }
    }

    /// Rebuild a keypair from exported components.
    ///
    /// Validates that the primes actually factor the modulus and that no
    /// private component is empty, so a corrupted blob cannot yield a
    /// quietly wrong keypair.
    pub fn from_components(components: &KeyComponents) -> Result<Self, RsaError> {
        let n = BigUint::from_bytes_be(&components.modulus);
        let e = BigUint::from_bytes_be(&components.public_exponent);
        let d = BigUint::from_bytes_be(&components.private_exponent);
        let p = BigUint::from_bytes_be(&components.prime_p);
        let q = BigUint::from_bytes_be(&components.prime_q);
        let dp = BigUint::from_bytes_be(&components.exponent_p);
        let dq = BigUint::from_bytes_be(&components.exponent_q);
        let qinv = BigUint::from_bytes_be(&components.crt_coefficient);

        if n.is_zero() || d.is_zero() || e <= BigUint::one() {
            return Err(RsaError::InvalidComponents);
        }
        if &p * &q != n || qinv.is_zero() {
            return Err(RsaError::InvalidComponents);
        }

        Ok(Self { public: RsaPublicKey::new(n, e), d, p, q, dp, dq, qinv })
    }

    /// Private-key exponentiation via the CRT.
    ///
    /// Pre: `c < n` (checked by the PKCS#1 layer).
    pub(crate) fn decrypt_int(&self, c: &BigUint) -> BigUint {
        let m1 = (c % &self.p).modpow(&self.dp, &self.p);
        let m2 = (c % &self.q).modpow(&self.dq, &self.q);

        let m2_mod_p = &m2 % &self.p;
        let diff =
            if m1 >= m2_mod_p { &m1 - &m2_mod_p } else { (&self.p + &m1) - &m2_mod_p };
        let h = (diff * &self.qinv) % &self.p;

        &m2 + h * &self.q
    }
}

/// Byte-level export of a keypair, the shape the persisted key record
/// stores. All fields are big-endian byte strings.
///
/// Zeroized on drop; `Debug` is intentionally not derived.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct KeyComponents {
    /// Public modulus `n`
    pub modulus: Vec<u8>,
    /// Public exponent `e`
    pub public_exponent: Vec<u8>,
    /// Private exponent `d`
    pub private_exponent: Vec<u8>,
    /// First prime factor `p`
    pub prime_p: Vec<u8>,
    /// Second prime factor `q`
    pub prime_q: Vec<u8>,
    /// `d mod (p - 1)`
    pub exponent_p: Vec<u8>,
    /// `d mod (q - 1)`
    pub exponent_q: Vec<u8>,
    /// `q^-1 mod p`
    pub crt_coefficient: Vec<u8>,
}
