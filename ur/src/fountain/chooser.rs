// SPDX-FileCopyrightText: © 2024 QRLink Contributors <dev@qrlink.dev>
// SPDX-License-Identifier: MIT

//! Fragment chooser.
//!
//! Maps `(sequence, sequence_count, checksum)` to the set of fragment
//! indexes mixed into that part. The mapping is pure: both ends of a
//! transfer compute it locally and never exchange index sets.

use crate::{
    collections::{Set, Vec},
    fountain::{sampler, sampler::BaseWeighted},
    xoshiro::Xoshiro256,
};

/// A fragment chooser using [`alloc`] collection types.
#[cfg(feature = "alloc")]
pub type FragmentChooser = BaseFragmentChooser<Alloc>;

#[cfg(feature = "alloc")]
impl FragmentChooser {
    /// Construct a new [`FragmentChooser`].
    pub const fn new() -> Self {
        Self {
            sampler: sampler::Weighted::new(),
            sampler_count: 0,
            pool: alloc::vec::Vec::new(),
            picked: alloc::vec::Vec::new(),
        }
    }
}

/// A fragment chooser using fixed-capacity collection types.
pub type HeaplessFragmentChooser<const MAX_SEQUENCE_COUNT: usize> =
    BaseFragmentChooser<Heapless<MAX_SEQUENCE_COUNT>>;

impl<const MAX_SEQUENCE_COUNT: usize> HeaplessFragmentChooser<MAX_SEQUENCE_COUNT> {
    /// Construct a new [`HeaplessFragmentChooser`].
    pub const fn new() -> Self {
        Self {
            sampler: sampler::HeaplessWeighted::new(),
            sampler_count: 0,
            pool: heapless::Vec::new(),
            picked: heapless::Vec::new(),
        }
    }
}

/// Deterministic `(sequence, sequence_count, checksum) → index set` map.
#[derive(Default)]
pub struct BaseFragmentChooser<T: Types> {
    sampler: BaseWeighted<T::Sampler>,
    // Sequence count the sampler tables are currently built for; zero when
    // they are not built at all.
    sampler_count: u32,
    pool: T::Indexes,
    picked: T::Indexes,
}

impl<T: Types> BaseFragmentChooser<T> {
    /// The index set mixed into part `sequence` of a message with
    /// `sequence_count` fragments and payload CRC-32 `checksum`.
    ///
    /// The first `sequence_count` parts are systematic: part `k` carries
    /// exactly fragment `k - 1`.
    ///
    /// # Panics
    ///
    /// Panics when `sequence` or `sequence_count` is zero.
    pub fn choose_fragments<I>(&mut self, sequence: u32, sequence_count: u32, checksum: u32) -> I
    where
        I: Set<usize>,
    {
        assert!(sequence > 0 && sequence_count > 0);

        let mut indexes = I::default();
        if sequence <= sequence_count {
            indexes
                .insert((sequence - 1) as usize)
                .unwrap_or_else(|_| panic!("index set capacity"));
            return indexes;
        }

        let mut rng = Xoshiro256::new(&part_seed(sequence, checksum));
        let degree = self.choose_degree(&mut rng, sequence_count);

        self.pool.clear();
        self.picked.clear();
        self.pool.extend(0..sequence_count as usize);

        // Partial Fisher-Yates: `degree` draws pick without replacement.
        while self.picked.len() < degree {
            let i = rng.next_int(0, (self.pool.len() - 1) as u64) as usize;
            let index = self.pool.remove(i);
            self.picked.try_push(index).expect("chooser capacity");
        }

        indexes.extend(self.picked.iter().copied());
        indexes
    }

    fn choose_degree(&mut self, rng: &mut Xoshiro256, sequence_count: u32) -> usize {
        // Rebuild the 1/(i + 1) degree tables only when the sequence count
        // changes; a decoder calls this once per received part.
        if self.sampler_count != sequence_count {
            self.sampler
                .set((0..sequence_count).map(|i| 1.0 / f64::from(i + 1)));
            self.sampler_count = sequence_count;
        }

        self.sampler.next(rng) as usize + 1
    }
}

fn part_seed(sequence: u32, checksum: u32) -> [u8; 8] {
    let mut seed = [0u8; 8];
    seed[..4].copy_from_slice(&sequence.to_be_bytes());
    seed[4..].copy_from_slice(&checksum.to_be_bytes());
    seed
}

/// Types for [`BaseFragmentChooser`].
pub trait Types: Default {
    /// Sampler types.
    type Sampler: sampler::Types;
    /// Index scratch space.
    type Indexes: Vec<usize>;
}

/// [`alloc`] types for [`BaseFragmentChooser`].
#[cfg(feature = "alloc")]
#[derive(Default)]
pub struct Alloc;

#[cfg(feature = "alloc")]
impl Types for Alloc {
    type Sampler = sampler::Alloc;
    type Indexes = alloc::vec::Vec<usize>;
}

/// [`heapless`] types for [`BaseFragmentChooser`].
#[derive(Default)]
pub struct Heapless<const MAX_SEQUENCE_COUNT: usize>;

impl<const MAX_SEQUENCE_COUNT: usize> Types for Heapless<MAX_SEQUENCE_COUNT> {
    type Sampler = sampler::Heapless<MAX_SEQUENCE_COUNT>;
    type Indexes = heapless::Vec<usize, MAX_SEQUENCE_COUNT>;
}
