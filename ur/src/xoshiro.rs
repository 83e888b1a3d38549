// SPDX-FileCopyrightText: © 2024 QRLink Contributors <dev@qrlink.dev>
// SPDX-License-Identifier: MIT

//! Deterministic PRNG used by the fountain fragment chooser.
//!
//! The generator is xoshiro256** seeded from SHA-256 of an arbitrary byte
//! string: the digest is read as four big-endian 64-bit words. Both sides
//! of a transfer derive identical index sets from it, so nothing about the
//! fragment selection ever travels on the wire.

use bitcoin_hashes::{sha256, Hash};
use rand_xoshiro::{
    rand_core::{RngCore, SeedableRng},
    Xoshiro256StarStar,
};

/// Seeded xoshiro256** generator.
pub struct Xoshiro256 {
    rng: Xoshiro256StarStar,
}

impl Xoshiro256 {
    /// Seed from arbitrary bytes via SHA-256.
    pub fn new(seed: &[u8]) -> Self {
        Self::from_digest(sha256::Hash::hash(seed).to_byte_array())
    }

    /// Seed directly from a 32-byte digest, interpreting each consecutive
    /// 8-byte block as a big-endian word of generator state.
    pub fn from_digest(digest: [u8; 32]) -> Self {
        // `Xoshiro256StarStar::from_seed` reads its seed as little-endian
        // words, hence the byte swap.
        let mut state = [0u8; 32];
        for i in 0..4 {
            let mut word = [0u8; 8];
            word.copy_from_slice(&digest[i * 8..i * 8 + 8]);
            state[i * 8..i * 8 + 8].copy_from_slice(&u64::from_be_bytes(word).to_le_bytes());
        }

        Self {
            rng: Xoshiro256StarStar::from_seed(state),
        }
    }

    /// The next raw 64-bit output.
    pub fn next_u64(&mut self) -> u64 {
        self.rng.next_u64()
    }

    /// The next value uniform in `[0, 1)`.
    #[allow(clippy::cast_precision_loss)]
    pub fn next_double(&mut self) -> f64 {
        self.next_u64() as f64 / (u64::MAX as f64 + 1.0)
    }

    /// The next integer uniform in `[low, high]`.
    #[allow(clippy::cast_precision_loss)]
    #[allow(clippy::cast_possible_truncation)]
    #[allow(clippy::cast_sign_loss)]
    pub fn next_int(&mut self, low: u64, high: u64) -> u64 {
        (self.next_double() * (high - low + 1) as f64) as u64 + low
    }
}

#[cfg(test)]
pub mod test_utils {
    use super::*;
    use crate::CRC32;

    impl Xoshiro256 {
        #[allow(clippy::cast_possible_truncation)]
        fn next_byte(&mut self) -> u8 {
            self.next_int(0, 255) as u8
        }

        #[must_use]
        pub fn from_crc(bytes: &[u8]) -> Self {
            Self::new(&CRC32.checksum(bytes).to_be_bytes())
        }
    }

    /// Deterministic pseudo-random payload shared by the test suites.
    #[must_use]
    pub fn make_message(seed: &str, len: usize) -> Vec<u8> {
        let mut rng = Xoshiro256::new(seed.as_bytes());
        (0..len).map(|_| rng.next_byte()).collect()
    }
}
