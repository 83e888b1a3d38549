// SPDX-FileCopyrightText: © 2024 QRLink Contributors <dev@qrlink.dev>
// SPDX-License-Identifier: MIT

//! Weighted random sampler (Vose alias method).
//!
//! One sample costs two PRNG draws and two table lookups, independent of
//! how many weights were supplied. The fragment chooser keeps a sampler
//! initialized over the degree distribution of the current message.

use crate::{collections::Vec, xoshiro::Xoshiro256};

/// A weighted sampler using [`alloc`] collection types.
#[cfg(feature = "alloc")]
pub type Weighted = BaseWeighted<Alloc>;

#[cfg(feature = "alloc")]
impl Weighted {
    /// Construct a new [`Weighted`].
    pub const fn new() -> Self {
        Self {
            alias: alloc::vec::Vec::new(),
            prob: alloc::vec::Vec::new(),
            scaled: alloc::vec::Vec::new(),
            small: alloc::vec::Vec::new(),
            large: alloc::vec::Vec::new(),
        }
    }
}

/// A weighted sampler using fixed-capacity collection types.
///
/// `N` bounds the number of weights, which for fountain coding equals the
/// sequence count of the message.
pub type HeaplessWeighted<const N: usize> = BaseWeighted<Heapless<N>>;

impl<const N: usize> HeaplessWeighted<N> {
    /// Construct a new [`HeaplessWeighted`].
    pub const fn new() -> Self {
        Self {
            alias: heapless::Vec::new(),
            prob: heapless::Vec::new(),
            scaled: heapless::Vec::new(),
            small: heapless::Vec::new(),
            large: heapless::Vec::new(),
        }
    }
}

/// Alias-method sampler over a caller-supplied weight vector.
#[derive(Default)]
pub struct BaseWeighted<T: Types> {
    alias: T::Alias,
    prob: T::Prob,
    scaled: T::Scaled,

    // Work stacks, reused between `set` calls.
    small: T::Stack,
    large: T::Stack,
}

impl<T: Types> BaseWeighted<T> {
    /// Rebuild the alias tables for `weights`.
    ///
    /// Weights need not sum to one; they are normalized here.
    ///
    /// # Panics
    ///
    /// Panics when a weight is negative, when the weights sum to zero, or
    /// when a fixed-capacity backend cannot hold them.
    pub fn set<I: ExactSizeIterator<Item = f64>>(&mut self, weights: I) {
        let count = u32::try_from(weights.len()).expect("weight count exceeds u32");

        self.scaled.clear();
        self.scaled.extend(weights);

        let mut total = 0.0;
        for &w in self.scaled.iter() {
            assert!(w >= 0.0, "negative weight");
            total += w;
        }
        assert!(total > 0.0, "weights sum to zero");

        let scale = f64::from(count) / total;
        for w in self.scaled.iter_mut() {
            *w *= scale;
        }

        let n = self.scaled.len();
        self.alias.clear();
        self.prob.clear();
        self.alias.try_resize(n, 0).expect("sampler capacity");
        self.prob.try_resize(n, 0.0).expect("sampler capacity");

        self.small.clear();
        self.large.clear();
        for i in (0..n).rev() {
            if self.scaled[i] < 1.0 {
                self.small.try_push(i).expect("sampler capacity");
            } else {
                self.large.try_push(i).expect("sampler capacity");
            }
        }

        while let (Some(&s), Some(&l)) = (self.small.last(), self.large.last()) {
            self.small.pop();
            self.large.pop();

            self.prob[s] = self.scaled[s];
            self.alias[s] = u32::try_from(l).expect("index exceeds u32");

            self.scaled[l] += self.scaled[s] - 1.0;
            if self.scaled[l] < 1.0 {
                self.small.try_push(l).expect("sampler capacity");
            } else {
                self.large.try_push(l).expect("sampler capacity");
            }
        }

        // Whatever remains on either stack saturates to probability one.
        while let Some(i) = self.large.pop() {
            self.prob[i] = 1.0;
        }
        while let Some(i) = self.small.pop() {
            self.prob[i] = 1.0;
        }
    }

    /// Draw one sample, spending exactly two PRNG doubles.
    #[allow(clippy::cast_possible_truncation)]
    #[allow(clippy::cast_precision_loss)]
    #[allow(clippy::cast_sign_loss)]
    pub fn next(&mut self, rng: &mut Xoshiro256) -> u32 {
        let r1 = rng.next_double();
        let r2 = rng.next_double();

        let n = self.prob.len();
        let i = (n as f64 * r1) as usize;
        if r2 < self.prob[i] {
            i as u32
        } else {
            self.alias[i]
        }
    }
}

/// Types for [`BaseWeighted`].
pub trait Types: Default {
    /// Alias table.
    type Alias: Vec<u32>;
    /// Probability table.
    type Prob: Vec<f64>;
    /// Normalized weights.
    type Scaled: Vec<f64>;
    /// Work stack.
    type Stack: Vec<usize>;
}

/// [`alloc`] types for [`BaseWeighted`].
#[derive(Default)]
#[cfg(feature = "alloc")]
pub struct Alloc;

#[cfg(feature = "alloc")]
impl Types for Alloc {
    type Alias = alloc::vec::Vec<u32>;
    type Prob = alloc::vec::Vec<f64>;
    type Scaled = alloc::vec::Vec<f64>;
    type Stack = alloc::vec::Vec<usize>;
}

/// [`heapless`] types for [`BaseWeighted`].
#[derive(Default)]
pub struct Heapless<const N: usize>;

impl<const N: usize> Types for Heapless<N> {
    type Alias = heapless::Vec<u32, N>;
    type Prob = heapless::Vec<f64, N>;
    type Scaled = heapless::Vec<f64, N>;
    type Stack = heapless::Vec<usize, N>;
}

#[cfg(test)]
#[cfg(feature = "alloc")]
mod tests {
    use super::*;

    const WEIGHTS_LEN: usize = 4;
    const WEIGHTS: [f64; WEIGHTS_LEN] = [1.0, 2.0, 4.0, 8.0];
    const EXPECTED_SAMPLES: &[u32] = &[
        3, 3, 3, 3, 3, 3, 3, 0, 2, 3, 3, 3, 3, 1, 2, 2, 1, 3, 3, 2, 3, 3, 1, 1, 2, 1, 1, 3, 1, 3,
        1, 2, 0, 2, 1, 0, 3, 3, 3, 1, 3, 3, 3, 3, 1, 3, 2, 3, 2, 2, 3, 3, 3, 3, 2, 3, 3, 0, 3, 3,
        3, 3, 1, 2, 3, 3, 2, 2, 2, 1, 2, 2, 1, 2, 3, 1, 3, 0, 3, 2, 3, 3, 3, 3, 3, 3, 3, 3, 2, 3,
        1, 3, 3, 2, 0, 2, 2, 3, 1, 1, 2, 3, 2, 3, 3, 3, 3, 2, 3, 3, 3, 3, 3, 2, 3, 1, 2, 1, 1, 3,
        1, 3, 2, 2, 3, 3, 3, 1, 3, 3, 3, 3, 3, 3, 3, 3, 2, 3, 2, 3, 3, 1, 2, 3, 3, 1, 3, 2, 3, 3,
        3, 2, 3, 1, 3, 0, 3, 2, 1, 1, 3, 1, 3, 2, 3, 3, 3, 3, 2, 0, 3, 3, 1, 3, 0, 2, 1, 3, 3, 1,
        1, 3, 1, 2, 3, 3, 3, 0, 2, 3, 2, 0, 1, 3, 3, 3, 2, 2, 2, 3, 3, 3, 3, 3, 2, 3, 3, 3, 3, 2,
        3, 3, 2, 0, 2, 3, 3, 3, 3, 2, 1, 1, 1, 2, 1, 3, 3, 3, 2, 2, 3, 3, 1, 2, 3, 0, 3, 2, 3, 3,
        3, 3, 0, 2, 2, 3, 2, 2, 3, 3, 3, 3, 1, 3, 2, 3, 3, 3, 3, 3, 2, 2, 3, 1, 3, 0, 2, 1, 3, 3,
        3, 3, 3, 3, 3, 3, 1, 3, 3, 3, 3, 2, 2, 2, 3, 1, 1, 3, 2, 2, 0, 3, 2, 1, 2, 1, 0, 3, 3, 3,
        2, 2, 3, 2, 1, 2, 0, 0, 3, 3, 2, 3, 3, 2, 3, 3, 3, 3, 3, 2, 2, 2, 3, 3, 3, 3, 3, 1, 1, 3,
        2, 2, 3, 1, 1, 0, 1, 3, 2, 3, 3, 2, 3, 3, 2, 3, 3, 2, 2, 2, 2, 3, 2, 2, 2, 2, 2, 1, 2, 3,
        3, 2, 2, 2, 2, 3, 3, 2, 0, 2, 1, 3, 3, 3, 3, 0, 3, 3, 3, 3, 2, 2, 3, 1, 3, 3, 3, 2, 3, 3,
        3, 2, 3, 3, 3, 3, 2, 3, 2, 1, 3, 3, 3, 3, 2, 2, 0, 1, 2, 3, 2, 0, 3, 3, 3, 3, 3, 3, 1, 3,
        3, 2, 3, 2, 2, 3, 3, 3, 3, 3, 2, 2, 3, 3, 2, 2, 2, 1, 3, 3, 3, 3, 1, 2, 3, 2, 3, 3, 2, 3,
        2, 3, 3, 3, 2, 3, 1, 2, 3, 2, 1, 1, 3, 3, 2, 3, 3, 2, 3, 3, 0, 0, 1, 3, 3, 2, 3, 3, 3, 3,
        1, 3, 3, 0, 3, 2, 3, 3, 1, 3, 3, 3, 3, 3, 3, 3, 0, 3, 3, 2,
    ];

    #[test]
    fn test_sampler_vectors() {
        fn run<T: Types>(sampler: &mut BaseWeighted<T>) {
            let mut rng = Xoshiro256::new(b"Wolf");
            sampler.set(WEIGHTS.iter().copied());

            for &expected in EXPECTED_SAMPLES {
                assert_eq!(sampler.next(&mut rng), expected);
            }
        }

        run(&mut Weighted::new());
        run::<Heapless<WEIGHTS_LEN>>(&mut HeaplessWeighted::new());
    }

    #[test]
    fn test_sampler_reuse() {
        let mut sampler = Weighted::new();
        sampler.set([5.0, 5.0].into_iter());
        sampler.set(WEIGHTS.iter().copied());

        let mut rng = Xoshiro256::new(b"Wolf");
        for &expected in &EXPECTED_SAMPLES[..32] {
            assert_eq!(sampler.next(&mut rng), expected);
        }
    }

    #[test]
    #[should_panic(expected = "negative weight")]
    fn test_negative_weight() {
        Weighted::new().set([2.0, -1.0].into_iter());
    }

    #[test]
    #[should_panic(expected = "weights sum to zero")]
    fn test_zero_weights() {
        Weighted::new().set(core::iter::once(0.0));
    }
}
