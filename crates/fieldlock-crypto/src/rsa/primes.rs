//! Prime search for RSA modulus construction.
//!
//! Random candidates from `OsRng` with the top two bits and the low bit
//! forced, filtered through small-prime trial division and Miller-Rabin.
//! Forcing the top two bits guarantees the product of two half-width primes
//! always reaches the full modulus width.

use num_bigint::{BigUint, RandBigInt};
use num_integer::Integer;
use num_traits::{One, Zero};
use rand::rngs::OsRng;

use super::error::RsaError;

/// Candidates tested before the search gives up.
const MAX_ATTEMPTS: u32 = 5000;

/// Miller-Rabin witness rounds. 40 rounds bound the false-positive
/// probability below 2^-80 for random candidates.
const MILLER_RABIN_ROUNDS: u32 = 40;

/// Small odd primes for cheap trial division ahead of Miller-Rabin.
const SMALL_PRIMES: [u32; 46] = [
    3, 5, 7, 11, 13, 17, 19, 23, 29, 31, 37, 41, 43, 47, 53, 59, 61, 67, 71, 73, 79, 83, 89, 97,
    101, 103, 107, 109, 113, 127, 131, 137, 139, 149, 151, 157, 163, 167, 173, 179, 181, 191, 193,
    197, 199, 211,
];

/// Find a probable prime of exactly `bits` bits.
///
/// Callers pass at least 128 bits (half of [`super::MIN_KEY_BITS`]), so the
/// bit-forcing indices below are always in range.
pub(crate) fn generate_prime(bits: u64) -> Result<BigUint, RsaError> {
    let mut rng = OsRng;

    for _ in 0..MAX_ATTEMPTS {
        let mut candidate = rng.gen_biguint(bits);
        candidate.set_bit(bits - 1, true);
        candidate.set_bit(bits - 2, true);
        candidate.set_bit(0, true);

        if passes_trial_division(&candidate) && is_probably_prime(&candidate, MILLER_RABIN_ROUNDS)
        {
            return Ok(candidate);
        }
    }

    Err(RsaError::PrimeSearchExhausted { attempts: MAX_ATTEMPTS })
}

/// Reject candidates divisible by a small prime.
fn passes_trial_division(candidate: &BigUint) -> bool {
    SMALL_PRIMES.iter().all(|&p| !(candidate % BigUint::from(p)).is_zero())
}

/// Miller-Rabin probabilistic primality test with random witnesses.
pub(crate) fn is_probably_prime(n: &BigUint, rounds: u32) -> bool {
    let one = BigUint::one();
    let two = BigUint::from(2u32);
    let three = BigUint::from(3u32);

    if *n == two || *n == three {
        return true;
    }
    if *n < two || n.is_even() {
        return false;
    }

    // Write n - 1 as d * 2^s with d odd
    let n_minus_one = n - &one;
    let mut d = n_minus_one.clone();
    let mut s = 0u64;
    while d.is_even() {
        d /= 2u32;
        s += 1;
    }

    let mut rng = OsRng;

    'witness: for _ in 0..rounds {
        let a = rng.gen_biguint_range(&two, &n_minus_one);
        let mut x = a.modpow(&d, n);

        if x == one || x == n_minus_one {
            continue;
        }

        for _ in 0..s.saturating_sub(1) {
            x = x.modpow(&two, n);
            if x == n_minus_one {
                continue 'witness;
            }
        }

        return false;
    }

    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_primes_pass() {
        for p in [5u32, 13, 97, 7919, 65_537] {
            assert!(is_probably_prime(&BigUint::from(p), 20), "{p} should test prime");
        }
    }

    #[test]
    fn known_composites_fail() {
        // Includes Carmichael numbers (561, 41041) which fool Fermat tests
        for c in [9u32, 15, 561, 41_041, 65_536, 7917] {
            assert!(!is_probably_prime(&BigUint::from(c), 20), "{c} should test composite");
        }
    }

    #[test]
    fn generated_prime_has_requested_width() {
        let p = generate_prime(128).unwrap();
        assert_eq!(p.bits(), 128);
        assert!(p.is_odd());
        assert!(is_probably_prime(&p, 20));
    }

    #[test]
    fn generated_primes_differ() {
        let a = generate_prime(128).unwrap();
        let b = generate_prime(128).unwrap();
        assert_ne!(a, b);
    }
}
