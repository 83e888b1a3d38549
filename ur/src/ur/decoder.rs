// SPDX-FileCopyrightText: © 2024 QRLink Contributors <dev@qrlink.dev>
// SPDX-License-Identifier: MIT

//! Uniform Resource decoder.

use core::{fmt, str};

use crate::{
    bytewords::{self, Style},
    collections::Vec,
    fountain,
    ur::{ParseError, UR},
};

/// A UR decoder using [`alloc`] collection types.
#[cfg(feature = "alloc")]
pub type Decoder = BaseDecoder<Alloc>;

#[cfg(feature = "alloc")]
impl Decoder {
    /// Construct a new [`Decoder`].
    pub const fn new() -> Self {
        Self {
            fountain: fountain::decoder::Decoder::new(),
            fragment: alloc::vec::Vec::new(),
            single_length: None,
            ur_type: alloc::vec::Vec::new(),
        }
    }
}

/// A UR decoder using fixed-capacity collection types.
///
/// `MAX_FRAGMENT_LEN` sizes the scratch buffer holding one decoded body,
/// so it must cover the CBOR envelope as well, not just the fragment
/// bytes.
pub type HeaplessDecoder<
    const MAX_MESSAGE_LEN: usize,
    const MIXED_CAPACITY: usize,
    const MAX_FRAGMENT_LEN: usize,
    const MAX_SEQUENCE_COUNT: usize,
    const QUEUE_SIZE: usize,
    const MAX_UR_TYPE: usize,
> = BaseDecoder<
    Heapless<
        MAX_MESSAGE_LEN,
        MIXED_CAPACITY,
        MAX_FRAGMENT_LEN,
        MAX_SEQUENCE_COUNT,
        QUEUE_SIZE,
        MAX_UR_TYPE,
    >,
>;

impl<
        const MAX_MESSAGE_LEN: usize,
        const MIXED_CAPACITY: usize,
        const MAX_FRAGMENT_LEN: usize,
        const MAX_SEQUENCE_COUNT: usize,
        const QUEUE_SIZE: usize,
        const MAX_UR_TYPE: usize,
    >
    HeaplessDecoder<
        MAX_MESSAGE_LEN,
        MIXED_CAPACITY,
        MAX_FRAGMENT_LEN,
        MAX_SEQUENCE_COUNT,
        QUEUE_SIZE,
        MAX_UR_TYPE,
    >
{
    /// Construct a new [`HeaplessDecoder`].
    pub const fn new() -> Self {
        Self {
            fountain: fountain::decoder::HeaplessDecoder::new(),
            fragment: heapless::Vec::new(),
            single_length: None,
            ur_type: heapless::Vec::new(),
        }
    }
}

/// A Uniform Resource decoder.
///
/// Accepts single-part resources, which complete immediately, and
/// multi-part fountain streams. The type of the first resource is captured
/// and every later resource must carry it too.
///
/// # Examples
///
/// See the [`crate`] documentation for an example.
pub struct BaseDecoder<T: Types> {
    fountain: fountain::decoder::BaseDecoder<T::Fountain>,
    /// Decoded body scratch; holds the payload itself after a single-part
    /// completion.
    fragment: T::Fragment,
    single_length: Option<usize>,
    ur_type: T::TypeBuffer,
}

impl<T: Types> BaseDecoder<T> {
    /// Receives one Uniform Resource string.
    ///
    /// Returns `Ok(true)` when more parts are wanted, `Ok(false)` once the
    /// decoder is terminal. Per-part errors leave the decoder usable; only
    /// a reassembled message failing its checksum is fatal for the whole
    /// stream.
    ///
    /// # Errors
    ///
    /// Every §error kind of the transport can surface here: a malformed
    /// URI, a type disagreeing with previous parts, a corrupted body, or a
    /// final checksum mismatch.
    pub fn receive(&mut self, ur: &str) -> Result<bool, Error> {
        let parsed = UR::parse(ur)?;
        self.receive_ur(&parsed)
    }

    /// Receives one parsed (or locally produced) Uniform Resource.
    ///
    /// # Errors
    ///
    /// See [`receive`](Self::receive).
    pub fn receive_ur(&mut self, ur: &UR<'_>) -> Result<bool, Error> {
        if self.is_complete() {
            return Ok(false);
        }

        self.note_type(ur.ur_type())?;

        match ur {
            UR::SinglePart { body, .. } => {
                let length = bytewords::validate(body, Style::Minimal)?;
                if length == 0 {
                    return Err(Error::InvalidFragment);
                }

                self.fragment.clear();
                self.fragment
                    .try_resize(length, 0)
                    .map_err(|_| Error::FragmentTooBig { size: length })?;
                bytewords::decode_to_slice(body, &mut self.fragment, Style::Minimal)?;

                self.single_length = Some(length);
                Ok(false)
            }
            UR::SinglePartPayload { payload, .. } => {
                if payload.is_empty() {
                    return Err(Error::InvalidFragment);
                }

                self.fragment.clear();
                self.fragment
                    .try_extend_from_slice(payload)
                    .map_err(|_| Error::FragmentTooBig {
                        size: payload.len(),
                    })?;

                self.single_length = Some(payload.len());
                Ok(false)
            }
            UR::MultiPart { body, .. } => {
                let length = bytewords::validate(body, Style::Minimal)?;

                self.fragment.clear();
                self.fragment
                    .try_resize(length, 0)
                    .map_err(|_| Error::FragmentTooBig { size: length })?;
                bytewords::decode_to_slice(body, &mut self.fragment, Style::Minimal)?;

                let part: fountain::part::Part<'_> = minicbor::decode(&self.fragment[..length])?;
                let more = self.fountain.receive(&part)?;
                finish_part(&self.fountain, more)
            }
            UR::MultiPartPayload { part, .. } => {
                let more = self.fountain.receive(part)?;
                finish_part(&self.fountain, more)
            }
        }
    }

    /// Capture the resource type on first contact, enforce it afterwards.
    fn note_type(&mut self, ur_type: &str) -> Result<(), Error> {
        if self.ur_type.is_empty() {
            self.ur_type
                .try_extend_from_slice(ur_type.as_bytes())
                .map_err(|_| Error::TypeTooBig {
                    size: ur_type.len(),
                })?;
            return Ok(());
        }

        let known: &[u8] = &self.ur_type;
        if !known.eq_ignore_ascii_case(ur_type.as_bytes()) {
            return Err(Error::InconsistentType);
        }

        Ok(())
    }

    /// The captured resource type, lowercase may not be assumed.
    #[must_use]
    pub fn ur_type(&self) -> Option<&str> {
        if self.ur_type.is_empty() {
            return None;
        }

        // Only validated ASCII is ever stored.
        str::from_utf8(&self.ur_type).ok()
    }

    /// Whether the decoder reached a terminal state, successful or not.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.single_length.is_some() || self.fountain.is_complete()
    }

    /// Whether a verified message is available.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.single_length.is_some() || self.fountain.is_success()
    }

    /// The payload, once available.
    ///
    /// For a single-part resource the bytewords checksum already vouched
    /// for it; a multi-part stream is additionally checked against the
    /// message CRC-32 carried by every part.
    #[must_use]
    pub fn message(&self) -> Option<&[u8]> {
        match self.single_length {
            Some(length) => Some(&self.fragment[..length]),
            None => self.fountain.message(),
        }
    }

    /// The payload length, as soon as it is known.
    #[must_use]
    pub fn message_length(&self) -> Option<usize> {
        self.single_length.or_else(|| self.fountain.message_length())
    }

    /// The number of parts the stream was split into; `1` for a
    /// single-part resource.
    #[must_use]
    pub fn sequence_count(&self) -> Option<u32> {
        match self.single_length {
            Some(_) => Some(1),
            None => self.fountain.sequence_count(),
        }
    }

    /// Rough completion estimate in `[0, 1]`.
    #[must_use]
    pub fn estimated_percent_complete(&self) -> f64 {
        if self.single_length.is_some() {
            return 1.0;
        }

        self.fountain.estimated_percent_complete()
    }

    /// Opt in or out of the fountain decoder's cross-reduction pass.
    pub fn set_cross_reduction(&mut self, enabled: bool) {
        self.fountain.set_cross_reduction(enabled);
    }

    /// Whether the decoder holds no data yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fountain.is_empty() && self.single_length.is_none() && self.ur_type.is_empty()
    }

    /// Reset to a fresh decoder, retaining allocations where possible.
    pub fn clear(&mut self) {
        self.fountain.clear();
        self.fragment.clear();
        self.single_length = None;
        self.ur_type.clear();
    }
}

/// A multi-part receive is fatal only when it finished the stream on a
/// checksum mismatch.
fn finish_part<F: fountain::decoder::Types>(
    fountain: &fountain::decoder::BaseDecoder<F>,
    more: bool,
) -> Result<bool, Error> {
    if fountain.is_complete() && !fountain.is_success() {
        return Err(Error::InvalidChecksum);
    }

    Ok(more)
}

impl<T: Types> Default for BaseDecoder<T> {
    fn default() -> Self {
        Self {
            fountain: fountain::decoder::BaseDecoder::default(),
            fragment: T::Fragment::default(),
            single_length: None,
            ur_type: T::TypeBuffer::default(),
        }
    }
}

/// Types for [`BaseDecoder`].
pub trait Types: Default {
    /// Fountain decoder types.
    type Fountain: fountain::decoder::Types;

    /// Decoded body scratch buffer.
    type Fragment: Vec<u8>;

    /// Captured UR type.
    type TypeBuffer: Vec<u8>;
}

/// [`alloc`] types for [`BaseDecoder`].
#[derive(Default)]
#[cfg(feature = "alloc")]
pub struct Alloc;

#[cfg(feature = "alloc")]
impl Types for Alloc {
    type Fountain = fountain::decoder::Alloc;
    type Fragment = alloc::vec::Vec<u8>;
    type TypeBuffer = alloc::vec::Vec<u8>;
}

/// [`heapless`] types for [`BaseDecoder`].
#[derive(Default)]
pub struct Heapless<
    const MAX_MESSAGE_LEN: usize,
    const MIXED_CAPACITY: usize,
    const MAX_FRAGMENT_LEN: usize,
    const MAX_SEQUENCE_COUNT: usize,
    const QUEUE_SIZE: usize,
    const MAX_UR_TYPE: usize,
>;

impl<
        const MAX_MESSAGE_LEN: usize,
        const MIXED_CAPACITY: usize,
        const MAX_FRAGMENT_LEN: usize,
        const MAX_SEQUENCE_COUNT: usize,
        const QUEUE_SIZE: usize,
        const MAX_UR_TYPE: usize,
    > Types
    for Heapless<
        MAX_MESSAGE_LEN,
        MIXED_CAPACITY,
        MAX_FRAGMENT_LEN,
        MAX_SEQUENCE_COUNT,
        QUEUE_SIZE,
        MAX_UR_TYPE,
    >
{
    type Fountain = fountain::decoder::Heapless<
        MAX_MESSAGE_LEN,
        MIXED_CAPACITY,
        MAX_FRAGMENT_LEN,
        MAX_SEQUENCE_COUNT,
        QUEUE_SIZE,
    >;

    type Fragment = heapless::Vec<u8, MAX_FRAGMENT_LEN>;

    type TypeBuffer = heapless::Vec<u8, MAX_UR_TYPE>;
}

/// Errors that can happen while receiving Uniform Resources.
#[derive(Debug)]
pub enum Error {
    /// The string is not a well-formed Uniform Resource.
    Parse(ParseError),
    /// The resource type differs from previously received parts.
    InconsistentType,
    /// The bytewords body was rejected.
    Bytewords(bytewords::DecodeError),
    /// The CBOR part frame was rejected.
    Cbor(minicbor::decode::Error),
    /// The fountain decoder rejected the part.
    Fountain(fountain::decoder::Error),
    /// The body decodes to an empty payload.
    InvalidFragment,
    /// The reassembled message failed its CRC-32; the stream is dead.
    InvalidChecksum,
    /// The decoded body does not fit the scratch buffer.
    FragmentTooBig {
        /// Body size in bytes.
        size: usize,
    },
    /// The resource type does not fit the type buffer.
    TypeTooBig {
        /// Type length in bytes.
        size: usize,
    },
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Parse(e) => write!(f, "parse error: {e}"),
            Error::InconsistentType => {
                write!(f, "resource type differs from previously received parts")
            }
            Error::Bytewords(e) => write!(f, "bytewords decoding error: {e}"),
            Error::Cbor(e) => write!(f, "CBOR decoding error: {e}"),
            Error::Fountain(e) => write!(f, "fountain decoding error: {e}"),
            Error::InvalidFragment => write!(f, "body carries no payload"),
            Error::InvalidChecksum => {
                write!(f, "reassembled message failed its checksum")
            }
            Error::FragmentTooBig { size } => {
                write!(f, "body of {size} bytes is too big for the decoder")
            }
            Error::TypeTooBig { size } => {
                write!(f, "resource type of {size} bytes is too big for the decoder")
            }
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for Error {}

impl From<ParseError> for Error {
    fn from(e: ParseError) -> Self {
        Self::Parse(e)
    }
}

impl From<bytewords::DecodeError> for Error {
    fn from(e: bytewords::DecodeError) -> Self {
        Self::Bytewords(e)
    }
}

impl From<minicbor::decode::Error> for Error {
    fn from(e: minicbor::decode::Error) -> Self {
        Self::Cbor(e)
    }
}

impl From<fountain::decoder::Error> for Error {
    fn from(e: fountain::decoder::Error) -> Self {
        Self::Fountain(e)
    }
}
