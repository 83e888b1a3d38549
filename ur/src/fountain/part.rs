// SPDX-FileCopyrightText: © 2024 QRLink Contributors <dev@qrlink.dev>
// SPDX-License-Identifier: MIT

//! Fountain parts.

use core::{fmt, ops::DerefMut};

use crate::{bytewords, collections::Set, fountain::util::xor_into};

/// A part emitted by a fountain [encoder](crate::fountain::BaseEncoder).
///
/// On the wire this is the CBOR array
/// `[sequence, sequence_count, message_length, checksum, data]`, with the
/// four integers constrained to 32 bits.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "arbitrary", derive(arbitrary::Arbitrary))]
pub struct Part<'a> {
    /// Sequence number of this part, starting at one and unbounded: it can
    /// exceed [`sequence_count`](Self::sequence_count).
    pub sequence: u32,
    /// Number of fragments the message was split into.
    pub sequence_count: u32,
    /// Unpadded message length in bytes.
    pub message_length: usize,
    /// CRC-32 of the whole message.
    pub checksum: u32,
    /// XOR of the fragments selected by `sequence`.
    pub data: &'a [u8],
}

impl<'a> Part<'a> {
    /// Whether the part is plausible at all, before any cross-part
    /// consistency checks.
    ///
    /// All counters must be positive, the fragment must be non-empty and no
    /// longer than the message, and `sequence_count` fragments of this size
    /// must cover `message_length` bytes.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.sequence > 0
            && self.sequence_count > 0
            && self.message_length > 0
            && !self.data.is_empty()
            && self.data.len() <= self.message_length
            && (self.sequence_count as usize).saturating_mul(self.data.len())
                >= self.message_length
    }

    /// Metadata shared by all parts of one message.
    #[must_use]
    pub fn metadata(&self) -> Metadata {
        Metadata {
            sequence_count: self.sequence_count,
            message_length: self.message_length,
            checksum: self.checksum,
            fragment_length: self.data.len(),
        }
    }
}

/// Formats the part as its bytewords-encoded CBOR, uppercase, checksummed.
///
/// This is the `<body>` component of a multi-part Uniform Resource.
impl<'a> fmt::Display for Part<'a> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // CBOR is encoded straight into the formatter as bytewords; no
        // intermediate buffer.
        let mut encoder = minicbor::Encoder::new(bytewords::minicbor::Writer::new(f));
        encoder.encode(self).map_err(|_| fmt::Error)?;
        encoder.into_writer().finish()?;
        Ok(())
    }
}

impl<'a, C> minicbor::Encode<C> for Part<'a> {
    fn encode<W: minicbor::encode::Write>(
        &self,
        e: &mut minicbor::Encoder<W>,
        _ctx: &mut C,
    ) -> Result<(), minicbor::encode::Error<W::Error>> {
        let message_length = u32::try_from(self.message_length)
            .map_err(|_| minicbor::encode::Error::message("message length exceeds 32 bits"))?;

        e.array(5)?
            .u32(self.sequence)?
            .u32(self.sequence_count)?
            .u32(message_length)?
            .u32(self.checksum)?
            .bytes(self.data)?;

        Ok(())
    }
}

impl<'b, C> minicbor::Decode<'b, C> for Part<'b> {
    fn decode(
        d: &mut minicbor::Decoder<'b>,
        _ctx: &mut C,
    ) -> Result<Self, minicbor::decode::Error> {
        if d.array()? != Some(5) {
            return Err(minicbor::decode::Error::message(
                "part must be a five element array",
            ));
        }

        Ok(Self {
            sequence: d.u32()?,
            sequence_count: d.u32()?,
            message_length: d.u32()? as usize,
            checksum: d.u32()?,
            data: d.bytes()?,
        })
    }
}

/// The per-message constants carried redundantly by every part.
///
/// The decoder captures this from the first part it sees and rejects any
/// later part that disagrees.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Metadata {
    /// Number of fragments.
    pub sequence_count: u32,
    /// Unpadded message length in bytes.
    pub message_length: usize,
    /// CRC-32 of the whole message.
    pub checksum: u32,
    /// Length of every fragment.
    pub fragment_length: usize,
}

impl<'a> PartialEq<Metadata> for Part<'a> {
    fn eq(&self, other: &Metadata) -> bool {
        self.sequence_count == other.sequence_count
            && self.message_length == other.message_length
            && self.checksum == other.checksum
            && self.data.len() == other.fragment_length
    }
}

/// A decoder-internal part: a fragment buffer and the set of fragment
/// indexes XORed into it.
///
/// A part with one index is *simple* and equals that fragment; two or more
/// indexes make it *mixed*.
#[derive(Debug, Clone)]
pub struct IndexedPart<D, I> {
    /// The (possibly mixed) fragment data.
    pub data: D,
    /// Indexes of the fragments XORed into `data`.
    pub indexes: I,
}

impl<D, I> IndexedPart<D, I> {
    /// Construct a new [`IndexedPart`].
    pub fn new(data: D, indexes: I) -> Self {
        Self { data, indexes }
    }

    /// Whether the part holds exactly one fragment.
    #[inline]
    pub fn is_simple(&self) -> bool
    where
        I: Set<usize>,
    {
        self.indexes.len() == 1
    }

    /// Remove `other`'s contribution when it is contained in this part.
    ///
    /// No-op when `other` is not a strict subset of this part.
    pub fn reduce(&mut self, other: &IndexedPart<D, I>)
    where
        D: DerefMut<Target = [u8]>,
        I: Set<usize>,
    {
        if other.indexes.len() >= self.indexes.len() {
            return;
        }

        if other.indexes.is_subset(&self.indexes) {
            self.indexes = self.indexes.difference(&other.indexes);
            xor_into(&mut self.data, &other.data);
        }
    }

    /// Remove fragment `index`'s contribution when it is mixed in here.
    pub fn reduce_by_fragment(&mut self, fragment: &[u8], index: usize)
    where
        D: DerefMut<Target = [u8]>,
        I: Set<usize>,
    {
        if self.indexes.len() > 1 && self.indexes.contains(&index) {
            self.indexes.remove(&index);
            xor_into(&mut self.data, fragment);
        }
    }
}

#[cfg(test)]
#[cfg(feature = "alloc")]
mod tests {
    use super::*;

    const PART: Part = Part {
        sequence: 12,
        sequence_count: 8,
        message_length: 100,
        checksum: 0x1234_5678,
        data: &[1, 5, 3, 3, 5, 8, 9, 10, 2, 7, 1, 5, 3],
    };

    #[test]
    fn test_cbor_roundtrip() {
        let cbor = minicbor::to_vec(&PART).unwrap();
        let decoded: Part = minicbor::decode(&cbor).unwrap();
        assert_eq!(decoded, PART);

        let cbor2 = minicbor::to_vec(&decoded).unwrap();
        assert_eq!(cbor, cbor2);
    }

    #[test]
    fn test_cbor_shape() {
        // Not an array.
        assert!(minicbor::decode::<Part>(&[0x01]).is_err());
        // Wrong arity.
        assert!(minicbor::decode::<Part>(&[0x84, 0x1, 0x2, 0x3, 0x4]).is_err());
        assert!(minicbor::decode::<Part>(&[0x86, 0x1, 0x2, 0x3, 0x4, 0x5, 0x6]).is_err());
        // Data must be a byte string.
        assert!(minicbor::decode::<Part>(&[0x85, 0x1, 0x2, 0x3, 0x4, 0x5]).is_err());
        // Integers beyond 32 bits are rejected.
        assert!(minicbor::decode::<Part>(&[
            0x85, 0x1b, 0x1, 0x2, 0x3, 0x4, 0xa, 0xb, 0xc, 0xd, 0x2, 0x3, 0x4, 0x41, 0x5,
        ])
        .is_err());

        minicbor::decode::<Part>(&[0x85, 0x1, 0x1, 0x1, 0x4, 0x41, 0x5]).unwrap();
    }

    #[test]
    fn test_validity() {
        assert!(PART.is_valid());

        let mut part = PART.clone();
        part.sequence = 0;
        assert!(!part.is_valid());

        let mut part = PART.clone();
        part.sequence_count = 0;
        assert!(!part.is_valid());

        let mut part = PART.clone();
        part.message_length = 0;
        assert!(!part.is_valid());

        let mut part = PART.clone();
        part.data = &[];
        assert!(!part.is_valid());

        // Eight fragments of one byte cannot cover 100 bytes.
        let mut part = PART.clone();
        part.data = &[1];
        assert!(!part.is_valid());
    }

    #[test]
    fn test_reduce() {
        use alloc::collections::BTreeSet;

        let mixed: BTreeSet<usize> = [0, 1, 2].into_iter().collect();
        let sub: BTreeSet<usize> = [1, 2].into_iter().collect();

        let mut a = IndexedPart::new(vec![0b1100u8], mixed);
        let b = IndexedPart::new(vec![0b1010u8], sub);
        a.reduce(&b);

        assert!(a.is_simple());
        assert_eq!(Set::first(&a.indexes), Some(&0));
        assert_eq!(&a.data[..], &[0b0110]);

        // Not a subset: untouched.
        let disjoint: BTreeSet<usize> = [5].into_iter().collect();
        let c = IndexedPart::new(vec![0xffu8], disjoint);
        a.reduce(&c);
        assert_eq!(&a.data[..], &[0b0110]);
    }

    #[test]
    fn test_reduce_by_fragment() {
        use alloc::collections::BTreeSet;

        let indexes: BTreeSet<usize> = [3, 4].into_iter().collect();
        let mut part = IndexedPart::new(vec![0xf0u8], indexes);

        part.reduce_by_fragment(&[0x0f], 2);
        assert_eq!(&part.data[..], &[0xf0]);

        part.reduce_by_fragment(&[0x0f], 3);
        assert!(part.is_simple());
        assert_eq!(&part.data[..], &[0xff]);

        // Simple parts are left alone.
        part.reduce_by_fragment(&[0xff], 4);
        assert_eq!(&part.data[..], &[0xff]);
    }
}
