// SPDX-FileCopyrightText: © 2024 QRLink Contributors <dev@qrlink.dev>
// SPDX-License-Identifier: MIT

//! Fountain decoder.
//!
//! Reassembly is an online Gaussian elimination. Recovered fragments land
//! directly in the message buffer; parts still mixing several fragments
//! wait in a bounded side store, keyed by their index set, and shrink as
//! new information arrives. When every fragment is recovered the buffer is
//! checked against the message CRC-32 and the decoder becomes terminal,
//! successfully or not.

use core::fmt;

use crate::{
    collections::{Deque, Set, Vec},
    fountain::{
        chooser::{self, BaseFragmentChooser},
        part::{IndexedPart, Metadata, Part},
        util::index_set_hash,
        MAX_DUPLICATE_TRACKING, MAX_MIXED_PARTS,
    },
    CRC32,
};

/// A fountain decoder using [`alloc`] collection types.
#[cfg(feature = "alloc")]
pub type Decoder = BaseDecoder<Alloc>;

#[cfg(feature = "alloc")]
impl Decoder {
    /// Construct a new [`Decoder`].
    pub const fn new() -> Self {
        Self {
            message: alloc::vec::Vec::new(),
            metadata: None,
            received: alloc::collections::BTreeSet::new(),
            mixed: alloc::vec::Vec::new(),
            queue: alloc::collections::VecDeque::new(),
            seen: alloc::collections::BTreeSet::new(),
            chooser: chooser::FragmentChooser::new(),
            last_sequence: 0,
            have_received: false,
            processed: 0,
            completion: None,
            cross_reduction: false,
        }
    }
}

/// A fountain decoder using fixed-capacity collection types.
///
/// `MAX_SEQUENCE_COUNT` and `QUEUE_SIZE` must be powers of two. The mixed
/// store holds at most `min(MIXED_CAPACITY, MAX_MIXED_PARTS)` parts.
pub type HeaplessDecoder<
    const MAX_MESSAGE_LEN: usize,
    const MIXED_CAPACITY: usize,
    const MAX_FRAGMENT_LEN: usize,
    const MAX_SEQUENCE_COUNT: usize,
    const QUEUE_SIZE: usize,
> = BaseDecoder<
    Heapless<MAX_MESSAGE_LEN, MIXED_CAPACITY, MAX_FRAGMENT_LEN, MAX_SEQUENCE_COUNT, QUEUE_SIZE>,
>;

impl<
        const MAX_MESSAGE_LEN: usize,
        const MIXED_CAPACITY: usize,
        const MAX_FRAGMENT_LEN: usize,
        const MAX_SEQUENCE_COUNT: usize,
        const QUEUE_SIZE: usize,
    >
    HeaplessDecoder<MAX_MESSAGE_LEN, MIXED_CAPACITY, MAX_FRAGMENT_LEN, MAX_SEQUENCE_COUNT, QUEUE_SIZE>
{
    /// Construct a new [`HeaplessDecoder`].
    pub const fn new() -> Self {
        Self {
            message: heapless::Vec::new(),
            metadata: None,
            received: heapless::FnvIndexSet::new(),
            mixed: heapless::Vec::new(),
            queue: heapless::Deque::new(),
            seen: heapless::FnvIndexSet::new(),
            chooser: chooser::HeaplessFragmentChooser::new(),
            last_sequence: 0,
            have_received: false,
            processed: 0,
            completion: None,
            cross_reduction: false,
        }
    }
}

/// A decoder that recombines fountain-encoded parts into the message.
///
/// # Examples
///
/// See the [`crate::fountain`] module documentation for an example.
pub struct BaseDecoder<T: Types> {
    /// Recovered fragments, laid out at their final offsets.
    message: T::Message,
    metadata: Option<Metadata>,
    /// Indexes of the fragments present in `message`.
    received: T::Indexes,
    /// Mixed parts, unique by index set, none containing a received index.
    mixed: T::Mixed,
    queue: T::Queue,
    /// Hashes of index sets already admitted, for duplicate suppression.
    seen: T::Seen,
    chooser: BaseFragmentChooser<T::Chooser>,
    last_sequence: u32,
    have_received: bool,
    processed: u32,
    completion: Option<Completion>,
    cross_reduction: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Completion {
    Verified,
    ChecksumMismatch,
}

impl<T: Types> Default for BaseDecoder<T> {
    fn default() -> Self {
        Self {
            message: T::Message::default(),
            metadata: None,
            received: T::Indexes::default(),
            mixed: T::Mixed::default(),
            queue: T::Queue::default(),
            seen: T::Seen::default(),
            chooser: BaseFragmentChooser::default(),
            last_sequence: 0,
            have_received: false,
            processed: 0,
            completion: None,
            cross_reduction: false,
        }
    }
}

impl<T: Types> BaseDecoder<T> {
    /// Receives one fountain-encoded part.
    ///
    /// Returns `Ok(true)` when the part was consumed (or benignly ignored
    /// as a duplicate) and more parts are wanted, and `Ok(false)` once the
    /// decoder is terminal — because this part completed it, or because it
    /// already was. A terminal decoder never mutates its state again.
    ///
    /// # Errors
    ///
    /// Fails when the part is structurally invalid, inconsistent with the
    /// parts received before it, or too large for the backing storage.
    /// A per-part error leaves the decoder usable for further parts.
    pub fn receive(&mut self, part: &Part<'_>) -> Result<bool, Error> {
        if self.is_complete() {
            return Ok(false);
        }

        if !part.is_valid() {
            return Err(Error::InvalidPart);
        }

        // A stuck transmitter shows the same frame over and over; skip the
        // index-set computation entirely in that case.
        if self.have_received && part.sequence == self.last_sequence {
            return Ok(true);
        }

        if let Some(metadata) = &self.metadata {
            if part != metadata {
                return Err(Error::InconsistentPart {
                    received: part.metadata(),
                    expected: metadata.clone(),
                });
            }
        } else {
            self.initialize(part)?;
        }

        self.last_sequence = part.sequence;
        self.have_received = true;

        let indexes: T::Indexes =
            self.chooser
                .choose_fragments(part.sequence, part.sequence_count, part.checksum);

        if self.is_duplicate(&indexes, part.sequence_count) {
            return Ok(true);
        }

        let mut data = T::Fragment::default();
        data.try_extend_from_slice(part.data)
            .map_err(|_| Error::NotEnoughSpace {
                needed: part.data.len(),
                capacity: data.capacity(),
            })?;

        self.processed = self.processed.saturating_add(1);
        self.queue.push_back(IndexedPart::new(data, indexes));
        self.drain_queue()?;

        if self.cross_reduction && !self.is_complete() {
            self.cross_reduce()?;
        }

        Ok(!self.is_complete())
    }

    /// Capture the per-message constants from the first part and size the
    /// working storage.
    fn initialize(&mut self, part: &Part<'_>) -> Result<(), Error> {
        let sequence_count = part.sequence_count as usize;
        let padded_len = part
            .data
            .len()
            .checked_mul(sequence_count)
            .ok_or(Error::InvalidPart)?;

        self.message
            .try_resize(padded_len, 0)
            .map_err(|_| Error::NotEnoughSpace {
                needed: padded_len,
                capacity: self.message.capacity(),
            })?;

        self.metadata = Some(part.metadata());
        Ok(())
    }

    /// Whether this index set was admitted before.
    ///
    /// Tracking stops once `MAX_DUPLICATE_TRACKING` distinct sets have been
    /// recorded; the reduction engine still discards repeats, just later.
    fn is_duplicate(&mut self, indexes: &T::Indexes, sequence_count: u32) -> bool {
        if self.seen.len() >= MAX_DUPLICATE_TRACKING {
            return false;
        }

        // Ascending scan so the hash does not depend on the set's internal
        // iteration order.
        let hash = index_set_hash(
            (0..sequence_count as usize)
                .filter(|i| indexes.contains(i))
                .map(|i| i as u32),
        );

        if self.seen.contains(&hash) {
            return true;
        }

        let _ = self.seen.insert(hash);
        false
    }

    fn drain_queue(&mut self) -> Result<(), Error> {
        while !self.is_complete() {
            let Some(part) = self.queue.pop_front() else {
                break;
            };

            if part.is_simple() {
                self.process_simple(&part)?;
            } else {
                self.process_mixed(part);
            }
        }
        Ok(())
    }

    fn process_simple(&mut self, part: &IndexedPart<T::Fragment, T::Indexes>) -> Result<(), Error> {
        let index = *part.indexes.first().expect("simple part has one index");
        if self.received.contains(&index) {
            return Ok(());
        }

        let metadata = self.metadata.as_ref().expect("metadata set on first part");
        let (fragment_length, sequence_count) =
            (metadata.fragment_length, metadata.sequence_count);

        let offset = index * fragment_length;
        self.message[offset..offset + fragment_length].copy_from_slice(&part.data);
        self.received
            .insert(index)
            .map_err(|_| Error::TooManyFragments)?;

        if self.received.len() == sequence_count as usize {
            self.finalize();
        } else {
            self.reduce_mixed_by(part);
        }

        Ok(())
    }

    fn process_mixed(&mut self, mut part: IndexedPart<T::Fragment, T::Indexes>) {
        if self.mixed_contains(&part.indexes) {
            return;
        }

        // First cancel out every fragment already recovered...
        let metadata = self.metadata.as_ref().expect("metadata set on first part");
        let fragment_length = metadata.fragment_length;
        for &index in self.received.iter() {
            let offset = index * fragment_length;
            part.reduce_by_fragment(&self.message[offset..offset + fragment_length], index);
            if part.is_simple() {
                break;
            }
        }

        // ...then every stored mixed part that is a strict subset.
        if !part.is_simple() {
            for entry in self.mixed.iter() {
                part.reduce(entry);
                if part.is_simple() {
                    break;
                }
            }
        }

        if part.is_simple() {
            self.queue.push_back(part);
            return;
        }

        // Reduction may have collapsed it onto an existing key.
        if self.mixed_contains(&part.indexes) {
            return;
        }

        // What survives becomes a pivot for the store, space permitting;
        // when the store is full the part is dropped and decoding simply
        // needs more input.
        if self.mixed.len() < MAX_MIXED_PARTS {
            self.reduce_mixed_by(&part);
            let _ = self.mixed.try_push(part);
        }
    }

    /// Reduce every stored mixed part by `part`; entries that collapse to a
    /// single fragment move to the queue.
    fn reduce_mixed_by(&mut self, part: &IndexedPart<T::Fragment, T::Indexes>) {
        let queue = &mut self.queue;
        self.mixed.retain_mut(|entry| {
            entry.reduce(part);

            if entry.is_simple() {
                queue.push_back(entry.clone());
                return false;
            }
            true
        });

        self.drop_duplicate_mixed();
    }

    /// Restore key uniqueness after a reduction pass: two entries that
    /// collapse onto the same index set carry the same bytes, so the later
    /// one adds nothing.
    fn drop_duplicate_mixed(&mut self) {
        let mut i = 0;
        while i < self.mixed.len() {
            let mut j = i + 1;
            while j < self.mixed.len() {
                if set_eq(&self.mixed[i].indexes, &self.mixed[j].indexes) {
                    self.mixed.remove(j);
                } else {
                    j += 1;
                }
            }
            i += 1;
        }
    }

    fn mixed_contains(&self, indexes: &T::Indexes) -> bool {
        self.mixed
            .iter()
            .any(|entry| set_eq(&entry.indexes, indexes))
    }

    /// Pairwise symmetric-difference pass over the mixed store, bounded to
    /// seven applications per received part.
    ///
    /// Purely an acceleration: a combined part replaces the larger of its
    /// two sources only when it mixes strictly fewer fragments than both.
    fn cross_reduce(&mut self) -> Result<(), Error> {
        for _ in 0..7 {
            if !self.cross_reduce_once() {
                break;
            }

            self.drain_queue()?;
            if self.is_complete() {
                break;
            }
        }
        Ok(())
    }

    fn cross_reduce_once(&mut self) -> bool {
        for i in 0..self.mixed.len() {
            for j in i + 1..self.mixed.len() {
                let Some(combined) = symmetric_difference(&self.mixed[i], &self.mixed[j]) else {
                    continue;
                };

                let target =
                    if self.mixed[i].indexes.len() >= self.mixed[j].indexes.len() {
                        i
                    } else {
                        j
                    };
                self.mixed.remove(target);

                if combined.is_simple() {
                    self.queue.push_back(combined);
                } else if !self.mixed_contains(&combined.indexes) {
                    let _ = self.mixed.try_push(combined);
                }
                return true;
            }
        }
        false
    }

    fn finalize(&mut self) {
        let metadata = self.metadata.as_ref().expect("metadata set on first part");
        let message = &self.message[..metadata.message_length];

        self.completion = Some(if CRC32.checksum(message) == metadata.checksum {
            Completion::Verified
        } else {
            Completion::ChecksumMismatch
        });
    }

    /// Whether the decoder reached a terminal state, successful or not.
    #[must_use]
    #[inline]
    pub fn is_complete(&self) -> bool {
        self.completion.is_some()
    }

    /// Whether the reassembled message verified against its checksum.
    #[must_use]
    #[inline]
    pub fn is_success(&self) -> bool {
        self.completion == Some(Completion::Verified)
    }

    /// The reassembled message, once complete and verified.
    #[must_use]
    pub fn message(&self) -> Option<&[u8]> {
        if !self.is_success() {
            return None;
        }

        self.metadata
            .as_ref()
            .map(|metadata| &self.message[..metadata.message_length])
    }

    /// The unpadded message length, known from the first received part on.
    #[must_use]
    pub fn message_length(&self) -> Option<usize> {
        self.metadata.as_ref().map(|m| m.message_length)
    }

    /// The number of fragments in the message, known from the first
    /// received part on.
    #[must_use]
    pub fn sequence_count(&self) -> Option<u32> {
        self.metadata.as_ref().map(|m| m.sequence_count)
    }

    /// How many parts were admitted into the reduction engine; suppressed
    /// duplicates do not count.
    #[must_use]
    pub fn processed_parts_count(&self) -> u32 {
        self.processed
    }

    /// Rough completion estimate in `[0, 1]`.
    ///
    /// `1.75 × sequence_count` parts is the empirical cost of a fountain
    /// transfer; the estimate saturates at 0.99 until the decoder is
    /// actually done.
    #[must_use]
    pub fn estimated_percent_complete(&self) -> f64 {
        if self.is_complete() {
            return 1.0;
        }

        let Some(metadata) = &self.metadata else {
            return 0.0;
        };

        let expected = f64::from(metadata.sequence_count) * 1.75;
        f64::min(0.99, f64::from(self.processed) / expected)
    }

    /// Opt in or out of the cross-reduction pass. Off by default; changes
    /// throughput on lossy streams, never the decoded result.
    pub fn set_cross_reduction(&mut self, enabled: bool) {
        self.cross_reduction = enabled;
    }

    /// Whether the decoder holds no data yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.metadata.is_none() && !self.have_received
    }

    /// Reset to a fresh decoder, retaining allocations where possible.
    pub fn clear(&mut self) {
        self.message.clear();
        self.metadata = None;
        self.received.clear();
        self.mixed.clear();
        self.queue.clear();
        self.seen.clear();
        self.last_sequence = 0;
        self.have_received = false;
        self.processed = 0;
        self.completion = None;

        debug_assert!(self.is_empty());
    }
}

fn set_eq<I: Set<usize>>(a: &I, b: &I) -> bool {
    a.len() == b.len() && a.is_subset(b)
}

/// The combined part `a ⊕ b`, when the combination is strictly smaller
/// than both inputs.
fn symmetric_difference<D, I>(a: &IndexedPart<D, I>, b: &IndexedPart<D, I>) -> Option<IndexedPart<D, I>>
where
    D: Clone + Vec<u8>,
    I: Set<usize>,
{
    let overlap = a
        .indexes
        .iter()
        .filter(|&i| b.indexes.contains(i))
        .count();
    if overlap == 0 {
        return None;
    }

    let combined_len = a.indexes.len() + b.indexes.len() - 2 * overlap;
    if combined_len == 0
        || combined_len >= a.indexes.len()
        || combined_len >= b.indexes.len()
    {
        return None;
    }

    let mut indexes = a.indexes.difference(&b.indexes);
    indexes.extend(b.indexes.difference(&a.indexes).iter().copied());

    let mut data = a.data.clone();
    crate::fountain::util::xor_into(&mut data, &b.data);

    Some(IndexedPart::new(data, indexes))
}

/// Types for [`BaseDecoder`].
pub trait Types: Default {
    /// Message buffer.
    type Message: Vec<u8>;

    /// Mixed part store.
    type Mixed: Vec<IndexedPart<Self::Fragment, Self::Indexes>>;

    /// Fragment buffer.
    type Fragment: Clone + Vec<u8>;

    /// Fragment index sets.
    type Indexes: Set<usize>;

    /// Queue of parts awaiting reduction.
    type Queue: Deque<IndexedPart<Self::Fragment, Self::Indexes>>;

    /// Admitted index-set hashes.
    type Seen: Set<u32>;

    /// Fragment chooser types.
    type Chooser: chooser::Types;
}

/// [`alloc`] types for [`BaseDecoder`].
#[derive(Default)]
#[cfg(feature = "alloc")]
pub struct Alloc;

#[cfg(feature = "alloc")]
impl Types for Alloc {
    type Message = alloc::vec::Vec<u8>;
    type Mixed =
        alloc::vec::Vec<IndexedPart<alloc::vec::Vec<u8>, alloc::collections::BTreeSet<usize>>>;
    type Fragment = alloc::vec::Vec<u8>;
    type Indexes = alloc::collections::BTreeSet<usize>;
    type Queue = alloc::collections::VecDeque<
        IndexedPart<alloc::vec::Vec<u8>, alloc::collections::BTreeSet<usize>>,
    >;
    type Seen = alloc::collections::BTreeSet<u32>;
    type Chooser = chooser::Alloc;
}

/// [`heapless`] types for [`BaseDecoder`].
#[derive(Default)]
pub struct Heapless<
    const MAX_MESSAGE_LEN: usize,
    const MIXED_CAPACITY: usize,
    const MAX_FRAGMENT_LEN: usize,
    const MAX_SEQUENCE_COUNT: usize,
    const QUEUE_SIZE: usize,
>;

impl<
        const MAX_MESSAGE_LEN: usize,
        const MIXED_CAPACITY: usize,
        const MAX_FRAGMENT_LEN: usize,
        const MAX_SEQUENCE_COUNT: usize,
        const QUEUE_SIZE: usize,
    > Types
    for Heapless<MAX_MESSAGE_LEN, MIXED_CAPACITY, MAX_FRAGMENT_LEN, MAX_SEQUENCE_COUNT, QUEUE_SIZE>
{
    type Message = heapless::Vec<u8, MAX_MESSAGE_LEN>;

    type Mixed = heapless::Vec<
        IndexedPart<
            heapless::Vec<u8, MAX_FRAGMENT_LEN>,
            heapless::FnvIndexSet<usize, MAX_SEQUENCE_COUNT>,
        >,
        MIXED_CAPACITY,
    >;

    type Fragment = heapless::Vec<u8, MAX_FRAGMENT_LEN>;

    type Indexes = heapless::FnvIndexSet<usize, MAX_SEQUENCE_COUNT>;

    type Queue = heapless::Deque<
        IndexedPart<
            heapless::Vec<u8, MAX_FRAGMENT_LEN>,
            heapless::FnvIndexSet<usize, MAX_SEQUENCE_COUNT>,
        >,
        QUEUE_SIZE,
    >;

    type Seen = heapless::FnvIndexSet<u32, MAX_DUPLICATE_TRACKING>;

    type Chooser = chooser::Heapless<MAX_SEQUENCE_COUNT>;
}

/// Errors that can happen while receiving parts.
#[derive(Debug)]
pub enum Error {
    /// The part fails its standalone shape checks.
    InvalidPart,
    /// The part disagrees with the metadata captured from earlier parts.
    InconsistentPart {
        /// Metadata carried by the offending part.
        received: Metadata,
        /// Metadata captured from the first part.
        expected: Metadata,
    },
    /// The backing storage cannot hold the part.
    NotEnoughSpace {
        /// Bytes required.
        needed: usize,
        /// Bytes available.
        capacity: usize,
    },
    /// More distinct fragment indexes than the storage can track.
    TooManyFragments,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::InvalidPart => write!(f, "invalid part"),
            Error::InconsistentPart { received, expected } => {
                write!(f, "part inconsistent with the stream:")?;

                if received.sequence_count != expected.sequence_count {
                    write!(
                        f,
                        " sequence count {} (expected {})",
                        received.sequence_count, expected.sequence_count
                    )?;
                }
                if received.message_length != expected.message_length {
                    write!(
                        f,
                        " message length {} (expected {})",
                        received.message_length, expected.message_length
                    )?;
                }
                if received.checksum != expected.checksum {
                    write!(
                        f,
                        " checksum {:08x} (expected {:08x})",
                        received.checksum, expected.checksum
                    )?;
                }
                if received.fragment_length != expected.fragment_length {
                    write!(
                        f,
                        " fragment length {} (expected {})",
                        received.fragment_length, expected.fragment_length
                    )?;
                }
                Ok(())
            }
            Error::NotEnoughSpace { needed, capacity } => {
                write!(f, "not enough space: needed {needed}, capacity {capacity}")
            }
            Error::TooManyFragments => write!(f, "too many fragments to track"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for Error {}

#[cfg(test)]
#[cfg(feature = "alloc")]
mod tests {
    use super::*;
    use crate::fountain::encoder::Encoder;
    use crate::xoshiro::test_utils::make_message;

    const MESSAGE_SIZE: usize = 32767;
    const MAX_FRAGMENT_LEN: usize = 1000;
    const SEED: &str = "Wolf";

    fn run_to_completion<T: Types>(
        decoder: &mut BaseDecoder<T>,
        encoder: &mut Encoder<'_>,
    ) {
        while !decoder.is_complete() {
            assert_eq!(decoder.message(), None);
            decoder.receive(&encoder.next_part()).unwrap();
        }
    }

    #[test]
    fn test_lossless_roundtrip() {
        let message = make_message(SEED, MESSAGE_SIZE);
        let mut encoder = Encoder::new();
        encoder.start(&message, MAX_FRAGMENT_LEN).unwrap();

        let mut decoder = Decoder::new();
        run_to_completion(&mut decoder, &mut encoder);

        assert!(decoder.is_success());
        assert_eq!(decoder.message(), Some(message.as_slice()));
        assert_eq!(decoder.message_length(), Some(MESSAGE_SIZE));
        assert_eq!(decoder.estimated_percent_complete(), 1.0);
    }

    #[test]
    fn test_heapless_roundtrip() {
        const N: usize = 64;

        let message = make_message(SEED, MESSAGE_SIZE);
        let mut encoder = Encoder::new();
        encoder.start(&message, MAX_FRAGMENT_LEN).unwrap();

        let mut decoder: HeaplessDecoder<{ MAX_FRAGMENT_LEN * N }, N, MAX_FRAGMENT_LEN, N, N> =
            HeaplessDecoder::new();
        while !decoder.is_complete() {
            decoder.receive(&encoder.next_part()).unwrap();
        }

        assert_eq!(decoder.message(), Some(message.as_slice()));
    }

    #[test]
    fn test_lossy_roundtrip() {
        let message = make_message(SEED, MESSAGE_SIZE);
        let mut encoder = Encoder::new();
        encoder.start(&message, MAX_FRAGMENT_LEN).unwrap();

        let mut decoder = Decoder::new();
        let mut skip = false;
        while !decoder.is_complete() {
            let part = encoder.next_part();
            if !skip {
                decoder.receive(&part).unwrap();
            }
            skip = !skip;
        }

        assert_eq!(decoder.message(), Some(message.as_slice()));
    }

    #[test]
    fn test_cross_reduction_parity() {
        let message = make_message(SEED, 4096);
        for drop_modulus in [2usize, 3] {
            let mut plain = Decoder::new();
            let mut accelerated = Decoder::new();
            accelerated.set_cross_reduction(true);

            let mut encoder = Encoder::new();
            encoder.start(&message, 100).unwrap();

            let mut n = 0;
            while !(plain.is_complete() && accelerated.is_complete()) {
                let part = encoder.next_part();
                n += 1;
                if n % drop_modulus == 0 {
                    continue;
                }
                if !plain.is_complete() {
                    plain.receive(&part).unwrap();
                }
                if !accelerated.is_complete() {
                    accelerated.receive(&part).unwrap();
                }
            }

            assert_eq!(plain.message(), Some(message.as_slice()));
            assert_eq!(plain.message(), accelerated.message());
        }
    }

    #[test]
    fn test_duplicates_are_ignored() {
        let message = make_message(SEED, 1024);
        let mut encoder = Encoder::new();
        encoder.start(&message, 100).unwrap();
        let sequence_count = encoder.sequence_count();

        let mut decoder = Decoder::new();

        let mut parts = alloc::vec::Vec::new();
        for _ in 0..sequence_count {
            let part = encoder.next_part();
            parts.push((
                part.sequence,
                part.sequence_count,
                part.message_length,
                part.checksum,
                part.data.to_vec(),
            ));
        }

        let rebuild = |index: usize| {
            let (sequence, count, message_length, checksum, data) = &parts[index];
            Part {
                sequence: *sequence,
                sequence_count: *count,
                message_length: *message_length,
                checksum: *checksum,
                data,
            }
        };

        // Replay the first part between every two fresh parts: never
        // back-to-back, so only the index-set tracking can drop it.
        for i in 0..parts.len() {
            decoder.receive(&rebuild(i)).unwrap();
            if !decoder.is_complete() {
                decoder.receive(&rebuild(0)).unwrap();
            }
        }

        assert!(decoder.is_success());
        // One admission per distinct part.
        assert_eq!(decoder.processed_parts_count(), sequence_count);
        assert_eq!(decoder.message(), Some(message.as_slice()));
    }

    #[test]
    fn test_same_sequence_suppression() {
        let message = make_message(SEED, 1024);
        let mut encoder = Encoder::new();
        encoder.start(&message, 100).unwrap();

        let mut decoder = Decoder::new();
        let part = encoder.next_part();
        assert!(decoder.receive(&part).unwrap());
        assert!(decoder.receive(&part).unwrap());
        assert_eq!(decoder.processed_parts_count(), 1);
    }

    #[test]
    fn test_checksum_mismatch_is_terminal() {
        let message = make_message(SEED, 300);
        let mut encoder = Encoder::new();
        encoder.start(&message, 100).unwrap();
        let sequence_count = encoder.sequence_count();

        let mut decoder = Decoder::new();
        for _ in 0..sequence_count {
            let mut part = encoder.next_part();
            // Systematic index sets do not depend on the checksum, so the
            // stream stays self-consistent while the payload hash is off.
            part.checksum ^= 1;
            decoder.receive(&part).unwrap();
        }

        assert!(decoder.is_complete());
        assert!(!decoder.is_success());
        assert_eq!(decoder.message(), None);

        // Terminal failure is permanent.
        let part = encoder.next_part();
        assert!(!decoder.receive(&part).unwrap());
        assert!(!decoder.is_success());
    }

    #[test]
    fn test_mixed_store_cap_preserves_systematic_feed() {
        let message = make_message(SEED, 1000);
        let mut encoder = Encoder::new();
        encoder.start(&message, 100).unwrap();
        let sequence_count = encoder.sequence_count();

        // Tiny mixed store: almost every non-systematic part is dropped.
        let mut decoder: HeaplessDecoder<1000, 2, 100, 16, 16> = HeaplessDecoder::new();

        let mut parts = alloc::vec::Vec::new();
        for _ in 0..sequence_count * 4 {
            let part = encoder.next_part();
            parts.push((
                part.sequence,
                part.sequence_count,
                part.message_length,
                part.checksum,
                part.data.to_vec(),
            ));
        }

        // Non-systematic parts first, to saturate the store...
        for (sequence, count, message_length, checksum, data) in
            parts.iter().filter(|p| p.0 > sequence_count)
        {
            let part = Part {
                sequence: *sequence,
                sequence_count: *count,
                message_length: *message_length,
                checksum: *checksum,
                data,
            };
            decoder.receive(&part).unwrap();
        }

        // ...then the plain fragments, which bypass it entirely.
        for (sequence, count, message_length, checksum, data) in
            parts.iter().filter(|p| p.0 <= sequence_count)
        {
            if decoder.is_complete() {
                break;
            }
            let part = Part {
                sequence: *sequence,
                sequence_count: *count,
                message_length: *message_length,
                checksum: *checksum,
                data,
            };
            decoder.receive(&part).unwrap();
        }

        assert!(decoder.is_success());
        assert_eq!(decoder.message(), Some(message.as_slice()));
    }

    #[test]
    fn test_inconsistent_part_is_rejected_not_fatal() {
        let message = make_message(SEED, 1024);
        let mut encoder = Encoder::new();
        encoder.start(&message, 100).unwrap();

        let mut decoder = Decoder::new();
        decoder.receive(&encoder.next_part()).unwrap();

        let mut bad = encoder.next_part();
        bad.message_length += 1;
        assert!(matches!(
            decoder.receive(&bad),
            Err(Error::InconsistentPart { .. })
        ));

        // The decoder keeps going with good parts.
        while !decoder.is_complete() {
            decoder.receive(&encoder.next_part()).unwrap();
        }
        assert_eq!(decoder.message(), Some(message.as_slice()));
    }

    #[test]
    fn test_empty_and_invalid_parts() {
        let mut decoder = Decoder::new();
        assert!(decoder.is_empty());

        let mut part = Part {
            sequence: 12,
            sequence_count: 8,
            message_length: 100,
            checksum: 0x1234_5678,
            data: &[1, 5, 3, 3, 5, 1, 5, 3, 3, 5, 1, 5, 3],
        };

        part.sequence_count = 0;
        assert!(matches!(decoder.receive(&part), Err(Error::InvalidPart)));
        part.sequence_count = 8;

        part.message_length = 0;
        assert!(matches!(decoder.receive(&part), Err(Error::InvalidPart)));
        part.message_length = 100;

        part.data = &[];
        assert!(matches!(decoder.receive(&part), Err(Error::InvalidPart)));

        assert!(decoder.is_empty());
    }

    #[test]
    fn test_clear() {
        let message = make_message(SEED, 1024);
        let mut encoder = Encoder::new();
        encoder.start(&message, 100).unwrap();

        let mut decoder = Decoder::new();
        decoder.receive(&encoder.next_part()).unwrap();
        assert!(!decoder.is_empty());

        decoder.clear();
        assert!(decoder.is_empty());
        assert_eq!(decoder.estimated_percent_complete(), 0.0);

        while !decoder.is_complete() {
            decoder.receive(&encoder.next_part()).unwrap();
        }
        assert_eq!(decoder.message(), Some(message.as_slice()));
    }

    #[test]
    fn test_progress_estimate() {
        let message = make_message(SEED, 1024);
        let mut encoder = Encoder::new();
        encoder.start(&message, 100).unwrap();
        let sequence_count = encoder.sequence_count();

        let mut decoder = Decoder::new();
        assert_eq!(decoder.estimated_percent_complete(), 0.0);

        decoder.receive(&encoder.next_part()).unwrap();
        let expected = 1.0 / (f64::from(sequence_count) * 1.75);
        assert!((decoder.estimated_percent_complete() - expected).abs() < 1e-9);
    }
}
