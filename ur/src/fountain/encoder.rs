// SPDX-FileCopyrightText: © 2024 QRLink Contributors <dev@qrlink.dev>
// SPDX-License-Identifier: MIT

//! Fountain encoder.

use core::fmt;

use crate::{
    collections::{Set, Vec},
    fountain::{
        chooser,
        part::Part,
        util::{div_ceil, fragment_length, xor_into},
        DEFAULT_MIN_FRAGMENT_LEN,
    },
    CRC32,
};

/// A fountain encoder using [`alloc`] collection types.
#[cfg(feature = "alloc")]
pub type Encoder<'a> = BaseEncoder<'a, Alloc>;

#[cfg(feature = "alloc")]
impl<'a> Encoder<'a> {
    /// Construct a new [`Encoder`].
    pub const fn new() -> Self {
        Self {
            message: None,
            fragment_length: 0,
            sequence_count: 0,
            checksum: 0,
            sequence: 0,
            chooser: chooser::FragmentChooser::new(),
            buffer: alloc::vec::Vec::new(),
            indexes: alloc::collections::BTreeSet::new(),
        }
    }
}

/// A fountain encoder using fixed-capacity collection types.
pub type HeaplessEncoder<'a, const MAX_FRAGMENT_LEN: usize, const MAX_SEQUENCE_COUNT: usize> =
    BaseEncoder<'a, Heapless<MAX_FRAGMENT_LEN, MAX_SEQUENCE_COUNT>>;

impl<'a, const MAX_FRAGMENT_LEN: usize, const MAX_SEQUENCE_COUNT: usize>
    HeaplessEncoder<'a, MAX_FRAGMENT_LEN, MAX_SEQUENCE_COUNT>
{
    /// Construct a new [`HeaplessEncoder`].
    pub const fn new() -> Self {
        Self {
            message: None,
            fragment_length: 0,
            sequence_count: 0,
            checksum: 0,
            sequence: 0,
            chooser: chooser::HeaplessFragmentChooser::new(),
            buffer: heapless::Vec::new(),
            indexes: heapless::FnvIndexSet::new(),
        }
    }
}

/// An encoder emitting an unbounded stream of fountain-coded parts.
///
/// # Examples
///
/// See the [`crate::fountain`] module documentation for an example.
pub struct BaseEncoder<'a, T: Types> {
    message: Option<&'a [u8]>,
    fragment_length: usize,
    sequence_count: u32,
    checksum: u32,
    sequence: u32,
    chooser: chooser::BaseFragmentChooser<T::Chooser>,
    buffer: T::Buffer,
    indexes: T::Indexes,
}

impl<'a, T: Types> BaseEncoder<'a, T> {
    /// Start encoding `message`, using the default minimum fragment length
    /// and starting the sequence numbering at zero.
    ///
    /// # Errors
    ///
    /// See [`start_with`](Self::start_with).
    pub fn start(&mut self, message: &'a [u8], max_fragment_length: usize) -> Result<(), Error> {
        self.start_with(
            message,
            DEFAULT_MIN_FRAGMENT_LEN,
            max_fragment_length,
            0,
        )
    }

    /// Start encoding `message` with full control over the fragment sizing
    /// bounds and the first sequence number.
    ///
    /// `first_sequence` is the sequence number *before* the first emitted
    /// part: the next [`next_part`](Self::next_part) call emits
    /// `first_sequence + 1`.
    ///
    /// # Errors
    ///
    /// Fails when the message is empty, when no fragment length satisfies
    /// the bounds, or when a fragment does not fit the backing storage.
    pub fn start_with(
        &mut self,
        message: &'a [u8],
        min_fragment_length: usize,
        max_fragment_length: usize,
        first_sequence: u32,
    ) -> Result<(), Error> {
        if message.is_empty() {
            return Err(Error::EmptyMessage);
        }

        let fragment_len =
            fragment_length(message.len(), min_fragment_length, max_fragment_length)
                .ok_or(Error::InvalidFragmentBounds {
                    min: min_fragment_length,
                    max: max_fragment_length,
                })?;

        self.buffer.clear();
        self.buffer
            .try_resize(fragment_len, 0)
            .map_err(|_| Error::FragmentTooBig {
                needed: fragment_len,
                capacity: self.buffer.capacity(),
            })?;

        self.message = Some(message);
        self.fragment_length = fragment_len;
        self.sequence_count = div_ceil(message.len(), fragment_len) as u32;
        self.checksum = CRC32.checksum(message);
        self.sequence = first_sequence;

        Ok(())
    }

    /// The sequence number of the most recently emitted part; the starting
    /// number when nothing was emitted yet.
    #[must_use]
    #[inline]
    pub fn current_sequence(&self) -> u32 {
        self.sequence
    }

    /// The number of fragments the message was split into.
    #[must_use]
    #[inline]
    pub fn sequence_count(&self) -> u32 {
        self.sequence_count
    }

    /// Whether the whole message fits in a single part.
    #[must_use]
    #[inline]
    pub fn is_single_part(&self) -> bool {
        self.sequence_count == 1
    }

    /// Whether every fragment was emitted at least once.
    ///
    /// The stream is systematic: the first
    /// [`sequence_count`](Self::sequence_count) parts carry the fragments
    /// verbatim, so a lossless receiver is done exactly here.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.sequence >= self.sequence_count
    }

    /// The message checksum, as carried by every emitted part.
    #[must_use]
    #[inline]
    pub fn checksum(&self) -> u32 {
        self.checksum
    }

    /// Emit the next part.
    ///
    /// Defined for every sequence number: after the systematic prefix the
    /// stream continues indefinitely with seed-chosen fragment mixtures.
    /// The caller decides when to stop.
    ///
    /// # Panics
    ///
    /// Panics when called before a successful [`start`](Self::start).
    pub fn next_part(&mut self) -> Part<'_> {
        let message = self.message.expect("encoder is not started");

        self.sequence = self.sequence.wrapping_add(1);
        self.indexes =
            self.chooser
                .choose_fragments(self.sequence, self.sequence_count, self.checksum);

        self.buffer.as_mut().fill(0);
        for &index in self.indexes.iter() {
            let start = index * self.fragment_length;
            let end = usize::min(start + self.fragment_length, message.len());
            // The last fragment is implicitly zero-padded.
            xor_into(&mut self.buffer[..end - start], &message[start..end]);
        }

        Part {
            sequence: self.sequence,
            sequence_count: self.sequence_count,
            message_length: message.len(),
            checksum: self.checksum,
            data: &self.buffer,
        }
    }

    /// The fragment indexes mixed into the most recently emitted part.
    #[must_use]
    pub fn last_indexes(&self) -> &T::Indexes {
        &self.indexes
    }
}

/// Types for [`BaseEncoder`].
pub trait Types: Default {
    /// Fragment chooser types.
    type Chooser: chooser::Types;

    /// Part data buffer.
    type Buffer: Vec<u8>;

    /// Index set of the emitted part.
    type Indexes: Set<usize>;
}

/// [`alloc`] types for [`BaseEncoder`].
#[derive(Default)]
#[cfg(feature = "alloc")]
pub struct Alloc;

#[cfg(feature = "alloc")]
impl Types for Alloc {
    type Chooser = chooser::Alloc;
    type Buffer = alloc::vec::Vec<u8>;
    type Indexes = alloc::collections::BTreeSet<usize>;
}

/// [`heapless`] types for [`BaseEncoder`].
#[derive(Default)]
pub struct Heapless<const MAX_FRAGMENT_LEN: usize, const MAX_SEQUENCE_COUNT: usize>;

impl<const MAX_FRAGMENT_LEN: usize, const MAX_SEQUENCE_COUNT: usize> Types
    for Heapless<MAX_FRAGMENT_LEN, MAX_SEQUENCE_COUNT>
{
    type Chooser = chooser::Heapless<MAX_SEQUENCE_COUNT>;
    type Buffer = heapless::Vec<u8, MAX_FRAGMENT_LEN>;
    type Indexes = heapless::FnvIndexSet<usize, MAX_SEQUENCE_COUNT>;
}

/// Errors that can happen when starting an encoder.
#[derive(Debug, PartialEq, Eq)]
pub enum Error {
    /// There is nothing to encode.
    EmptyMessage,
    /// No fragment length satisfies the requested bounds.
    InvalidFragmentBounds {
        /// Requested minimum fragment length.
        min: usize,
        /// Requested maximum fragment length.
        max: usize,
    },
    /// The fragment length exceeds the backing storage.
    FragmentTooBig {
        /// Bytes required per fragment.
        needed: usize,
        /// Bytes available.
        capacity: usize,
    },
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::EmptyMessage => write!(f, "message is empty"),
            Error::InvalidFragmentBounds { min, max } => {
                write!(f, "no fragment length satisfies bounds {min}..={max}")
            }
            Error::FragmentTooBig { needed, capacity } => {
                write!(
                    f,
                    "fragment of {needed} bytes exceeds buffer capacity {capacity}"
                )
            }
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for Error {}
