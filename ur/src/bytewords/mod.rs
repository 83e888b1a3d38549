// SPDX-FileCopyrightText: © 2024 QRLink Contributors <dev@qrlink.dev>
// SPDX-License-Identifier: MIT

//! Encode and decode byte payloads using the `bytewords` alphabet.
//!
//! Every encoding carries a trailing CRC-32 over the payload, so a decoded
//! string is either intact or rejected. Three presentation styles exist;
//! the encoder side of the UR transport only ever emits the minimal style.
//!
//! # Standard style
//! ```
//! use qrlink_ur::bytewords::{decode, encode, Style};
//! let data = "Some bytes".as_bytes();
//! let encoded = encode(data, Style::Standard);
//! assert_eq!(
//!     encoded,
//!     "guru jowl join inch crux iced kick jury inch junk taxi aqua kite limp"
//! );
//! assert_eq!(data, decode(&encoded, Style::Standard).unwrap());
//! ```
//!
//! # Minimal style
//! ```
//! use qrlink_ur::bytewords::{decode, encode, Style};
//! let data = "Some binary data".as_bytes();
//! let encoded = encode(data, Style::Minimal);
//! assert_eq!(encoded, "gujljnihcxidinjthsjpkkcxiehsjyhsnsgdmkht");
//! assert_eq!(data, decode(&encoded, Style::Minimal).unwrap());
//! ```

pub mod minicbor;

mod constants;

use core::fmt::{self, Write as _};

use itertools::Either;

use crate::{
    bytewords::constants::{MINIMALS, MINIMALS_UPPER, MINIMAL_IDXS, WORDS, WORD_IDXS},
    CRC32,
};

/// The three `bytewords` presentation styles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "arbitrary", derive(arbitrary::Arbitrary))]
pub enum Style {
    /// Four-letter words separated by spaces.
    Standard,
    /// Four-letter words separated by dashes.
    Uri,
    /// Two-letter contractions, concatenated.
    Minimal,
}

impl Style {
    const fn separator(self) -> char {
        match self {
            Style::Standard => ' ',
            Style::Uri => '-',
            Style::Minimal => panic!("minimal style does not use separators"),
        }
    }
}

/// Errors returned when decoding bytewords.
#[derive(Debug, PartialEq, Eq)]
pub enum DecodeError {
    /// A word (or minimal pair) not part of the alphabet, usually a sign
    /// that the wrong [`Style`] was assumed.
    InvalidWord {
        /// Byte position of the offending word, when known.
        position: Option<usize>,
    },
    /// The trailing CRC-32 does not match the payload.
    InvalidChecksum {
        /// Checksum carried by the encoding.
        expected: [u8; 4],
        /// Checksum computed over the decoded payload.
        calculated: [u8; 4],
    },
    /// Fewer than four bytes decoded, so there is no checksum to verify.
    ChecksumNotPresent,
    /// A minimal-style string must have an even character count.
    InvalidLength,
    /// Bytewords are a pure ASCII encoding.
    NonAscii,
    /// The provided output buffer cannot hold the decoded payload.
    NotEnoughSpace {
        /// Space available in the output buffer.
        available: usize,
        /// Space the payload requires.
        needed: usize,
    },
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecodeError::InvalidWord {
                position: Some(position),
            } => write!(f, "invalid word at byte {position}"),
            DecodeError::InvalidWord { position: None } => write!(f, "invalid word"),
            DecodeError::InvalidChecksum {
                expected,
                calculated,
            } => write!(
                f,
                "checksum mismatch: encoding carries {:08x}, payload hashes to {:08x}",
                u32::from_be_bytes(*expected),
                u32::from_be_bytes(*calculated)
            ),
            DecodeError::ChecksumNotPresent => write!(f, "checksum not present"),
            DecodeError::InvalidLength => write!(f, "invalid length"),
            DecodeError::NonAscii => write!(f, "non-ASCII input"),
            DecodeError::NotEnoughSpace { available, needed } => write!(
                f,
                "not enough space to decode: needed {needed}, available {available}"
            ),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for DecodeError {}

/// Errors returned when encoding bytewords into a caller buffer.
#[derive(Debug, PartialEq, Eq)]
pub enum EncodeError {
    /// The provided output buffer cannot hold the encoding.
    NotEnoughSpace,
}

impl fmt::Display for EncodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EncodeError::NotEnoughSpace => write!(f, "not enough space to encode into"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for EncodeError {}

fn lookup_word(word: &str) -> Option<u8> {
    let mut lower = [0u8; 4];
    let word = word.as_bytes();
    if word.len() != 4 {
        return None;
    }
    for (l, b) in lower.iter_mut().zip(word) {
        *l = b.to_ascii_lowercase();
    }

    // `lower` came from an ASCII `&str`, so this cannot fail.
    core::str::from_utf8(&lower)
        .ok()
        .and_then(|w| WORD_IDXS.get(w).copied())
}

fn lookup_pair(pair: &[u8]) -> Option<u8> {
    let lower = [pair[0].to_ascii_lowercase(), pair[1].to_ascii_lowercase()];
    core::str::from_utf8(&lower)
        .ok()
        .and_then(|p| MINIMAL_IDXS.get(p).copied())
}

/// Split `encoded` into a byte-value iterator and the trailing checksum.
///
/// Each item is `None` when the corresponding word is not in the alphabet.
/// Lookups are case-insensitive.
fn decoder(
    encoded: &str,
    style: Style,
) -> Result<(impl DoubleEndedIterator<Item = Option<u8>> + '_, [u8; 4]), DecodeError> {
    if !encoded.is_ascii() {
        return Err(DecodeError::NonAscii);
    }

    if encoded.is_empty() {
        return Err(DecodeError::ChecksumNotPresent);
    }

    let mut values = match style {
        Style::Standard => Either::Left(encoded.split(' ').map(lookup_word)),
        Style::Uri => Either::Left(encoded.split('-').map(lookup_word)),
        Style::Minimal => {
            if encoded.len() % 2 != 0 {
                return Err(DecodeError::InvalidLength);
            }

            Either::Right(
                (0..encoded.len())
                    .step_by(2)
                    .map(move |i| lookup_pair(&encoded.as_bytes()[i..i + 2])),
            )
        }
    };

    // The last four bytes of every encoding are the checksum.
    let mut checksum = [0u8; 4];
    for slot in checksum.iter_mut().rev() {
        match values.next_back() {
            Some(Some(byte)) => *slot = byte,
            Some(None) => return Err(DecodeError::InvalidWord { position: None }),
            None => return Err(DecodeError::ChecksumNotPresent),
        }
    }

    Ok((values, checksum))
}

/// Decodes a `bytewords` string back into its payload, verifying the
/// trailing checksum.
///
/// # Examples
///
/// ```
/// use qrlink_ur::bytewords::{decode, Style};
/// assert_eq!(
///     decode("able tied also webs lung", Style::Standard).unwrap(),
///     vec![0]
/// );
/// assert_eq!(decode("aetdaowslg", Style::Minimal).unwrap(), vec![0]);
/// ```
///
/// # Errors
///
/// Returns an error on unknown words, a style mismatch, or a failed
/// checksum.
#[cfg(feature = "alloc")]
pub fn decode(encoded: &str, style: Style) -> Result<alloc::vec::Vec<u8>, DecodeError> {
    let (values, expected) = decoder(encoded, style)?;
    let payload = values
        .enumerate()
        .map(|(i, value)| value.ok_or(DecodeError::InvalidWord { position: Some(i) }))
        .collect::<Result<alloc::vec::Vec<u8>, _>>()?;

    let calculated = CRC32.checksum(&payload).to_be_bytes();
    if calculated != expected {
        return Err(DecodeError::InvalidChecksum {
            expected,
            calculated,
        });
    }

    Ok(payload)
}

/// Checks a `bytewords` string without materializing the payload and
/// returns the payload length in bytes.
///
/// The checksum is streamed, so this works with no allocation at all.
pub fn validate(encoded: &str, style: Style) -> Result<usize, DecodeError> {
    let (values, expected) = decoder(encoded, style)?;

    let mut digest = CRC32.digest();
    let mut n = 0;
    for value in values {
        let byte = value.ok_or(DecodeError::InvalidWord { position: Some(n) })?;
        digest.update(&[byte]);
        n += 1;
    }

    let calculated = digest.finalize().to_be_bytes();
    if calculated != expected {
        return Err(DecodeError::InvalidChecksum {
            expected,
            calculated,
        });
    }

    Ok(n)
}

/// Decodes a `bytewords` string into `out`, verifying the trailing
/// checksum, and returns the number of bytes written.
///
/// # Errors
///
/// Returns [`DecodeError::NotEnoughSpace`] when `out` is too small for the
/// payload; the payload length is reported so a caller can retry.
pub fn decode_to_slice(encoded: &str, out: &mut [u8], style: Style) -> Result<usize, DecodeError> {
    let (values, expected) = decoder(encoded, style)?;

    let mut n = 0;
    for value in values {
        let byte = value.ok_or(DecodeError::InvalidWord { position: Some(n) })?;
        if n == out.len() {
            return Err(DecodeError::NotEnoughSpace {
                available: out.len(),
                needed: payload_len(encoded, style),
            });
        }
        out[n] = byte;
        n += 1;
    }

    let calculated = CRC32.checksum(&out[..n]).to_be_bytes();
    if calculated != expected {
        return Err(DecodeError::InvalidChecksum {
            expected,
            calculated,
        });
    }

    Ok(n)
}

// Payload size in bytes, ignoring word validity.
fn payload_len(encoded: &str, style: Style) -> usize {
    let total = match style {
        Style::Minimal => encoded.len() / 2,
        Style::Standard => encoded.split(' ').count(),
        Style::Uri => encoded.split('-').count(),
    };

    total.saturating_sub(4)
}

fn encoder<'a>(
    payload: &'a [u8],
    checksum: &'a [u8],
    style: Style,
) -> impl Iterator<Item = &'static str> + 'a {
    let table = match style {
        Style::Standard | Style::Uri => &WORDS,
        Style::Minimal => &MINIMALS,
    };

    payload
        .iter()
        .chain(checksum.iter())
        .map(move |&b| table[usize::from(b)])
}

/// Encodes a byte payload into a `bytewords` string.
///
/// # Examples
///
/// ```
/// use qrlink_ur::bytewords::{encode, Style};
/// assert_eq!(encode(&[0], Style::Standard), "able tied also webs lung");
/// assert_eq!(encode(&[0], Style::Minimal), "aetdaowslg");
/// ```
#[must_use]
#[cfg(feature = "alloc")]
pub fn encode(payload: &[u8], style: Style) -> alloc::string::String {
    #[cfg(not(feature = "std"))]
    use alloc::string::ToString;

    Bytewords::new(payload, style).to_string()
}

/// Encodes a byte payload into `out` and returns the number of bytes
/// written.
///
/// # Errors
///
/// Returns [`EncodeError::NotEnoughSpace`] when `out` cannot hold the full
/// encoding.
pub fn encode_to_slice(payload: &[u8], out: &mut [u8], style: Style) -> Result<usize, EncodeError> {
    let checksum = CRC32.checksum(payload).to_be_bytes();

    let mut n = 0;
    for (i, word) in encoder(payload, &checksum, style).enumerate() {
        let word = word.as_bytes();

        if style != Style::Minimal && i > 0 {
            if n == out.len() {
                return Err(EncodeError::NotEnoughSpace);
            }
            out[n] = style.separator() as u8;
            n += 1;
        }

        if n + word.len() > out.len() {
            return Err(EncodeError::NotEnoughSpace);
        }
        out[n..n + word.len()].copy_from_slice(word);
        n += word.len();
    }

    Ok(n)
}

/// Formats a byte payload as `bytewords` through [`Display`](fmt::Display),
/// without any intermediate allocation.
///
/// # Examples
///
/// ```
/// use qrlink_ur::bytewords::{Bytewords, Style};
///
/// let encoded = format!("{}", Bytewords::new(&[0], Style::Minimal));
/// assert_eq!(encoded, "aetdaowslg");
/// ```
pub struct Bytewords<'a> {
    payload: &'a [u8],
    style: Style,
}

impl<'a> Bytewords<'a> {
    /// Construct a new [`Bytewords`] formatter.
    #[must_use]
    pub const fn new(payload: &'a [u8], style: Style) -> Self {
        Self { payload, style }
    }
}

impl<'a> fmt::Display for Bytewords<'a> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let checksum = CRC32.checksum(self.payload).to_be_bytes();

        let mut words = encoder(self.payload, &checksum, self.style);
        match self.style {
            Style::Minimal => words.try_for_each(|word| f.write_str(word)),
            Style::Standard | Style::Uri => {
                if let Some(first) = words.next() {
                    f.write_str(first)?;
                }

                let separator = self.style.separator();
                words.try_for_each(|word| {
                    f.write_char(separator)?;
                    f.write_str(word)
                })
            }
        }
    }
}

/// Uppercase minimal-style formatter used for the body of single-part
/// Uniform Resources.
pub(crate) struct UpperMinimal<'a>(pub &'a [u8]);

impl<'a> fmt::Display for UpperMinimal<'a> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let checksum = CRC32.checksum(self.0).to_be_bytes();
        for &b in self.0.iter().chain(checksum.iter()) {
            f.write_str(MINIMALS_UPPER[usize::from(b)])?;
        }
        Ok(())
    }
}

#[cfg(test)]
#[cfg(feature = "alloc")]
mod tests {
    use super::*;

    #[test]
    fn test_styles_roundtrip() {
        let input = vec![0, 1, 2, 128, 255];
        assert_eq!(
            encode(&input, Style::Standard),
            "able acid also lava zoom jade need echo taxi"
        );
        assert_eq!(
            encode(&input, Style::Uri),
            "able-acid-also-lava-zoom-jade-need-echo-taxi"
        );
        assert_eq!(encode(&input, Style::Minimal), "aeadaolazmjendeoti");

        assert_eq!(
            decode(
                "able acid also lava zoom jade need echo taxi",
                Style::Standard
            )
            .unwrap(),
            input
        );
        assert_eq!(
            decode("able-acid-also-lava-zoom-jade-need-echo-taxi", Style::Uri).unwrap(),
            input
        );
        assert_eq!(decode("aeadaolazmjendeoti", Style::Minimal).unwrap(), input);
    }

    #[test]
    fn test_case_insensitive_decode() {
        assert_eq!(decode("AEADAOLAZMJENDEOTI", Style::Minimal).unwrap(), vec![
            0, 1, 2, 128, 255
        ]);
        assert_eq!(
            decode("Able Tied Also Webs Lung", Style::Standard).unwrap(),
            vec![0]
        );
    }

    #[test]
    fn test_empty_payload() {
        // Four checksum bytes and nothing else.
        let encoded = encode(&[], Style::Minimal);
        assert_eq!(encoded.len(), 8);
        assert_eq!(decode(&encoded, Style::Minimal).unwrap(), vec![]);
    }

    #[test]
    fn test_bad_checksum() {
        assert_eq!(
            decode("aeadaolazojendeowf", Style::Minimal).unwrap_err(),
            DecodeError::InvalidChecksum {
                expected: [107, 155, 51, 243],
                calculated: [108, 246, 247, 201]
            }
        );
    }

    #[test]
    fn test_truncated_input() {
        assert_eq!(
            decode("wolf", Style::Standard).unwrap_err(),
            DecodeError::ChecksumNotPresent
        );
        assert_eq!(
            decode("", Style::Standard).unwrap_err(),
            DecodeError::ChecksumNotPresent
        );
        assert_eq!(
            decode("aea", Style::Minimal).unwrap_err(),
            DecodeError::InvalidLength
        );
        assert_eq!(
            decode("₿", Style::Minimal).unwrap_err(),
            DecodeError::NonAscii
        );
    }

    #[test]
    fn test_unknown_word_position() {
        assert_eq!(
            decode("able zzzz also webs lung jade need echo taxi", Style::Standard).unwrap_err(),
            DecodeError::InvalidWord { position: Some(1) }
        );
    }

    #[test]
    fn test_validate_matches_decode() {
        let encoded = encode(b"stream me", Style::Minimal);
        assert_eq!(validate(&encoded, Style::Minimal).unwrap(), 9);

        let mut out = [0u8; 9];
        let n = decode_to_slice(&encoded, &mut out, Style::Minimal).unwrap();
        assert_eq!(&out[..n], b"stream me");
    }

    #[test]
    fn test_decode_to_slice_too_small() {
        let encoded = encode(&[1, 2, 3, 4], Style::Minimal);
        let mut out = [0u8; 2];
        assert_eq!(
            decode_to_slice(&encoded, &mut out, Style::Minimal).unwrap_err(),
            DecodeError::NotEnoughSpace {
                available: 2,
                needed: 4
            }
        );
    }

    #[test]
    fn test_encode_to_slice() {
        let mut out = [0u8; 64];
        let n = encode_to_slice(&[0], &mut out, Style::Standard).unwrap();
        assert_eq!(&out[..n], b"able tied also webs lung");

        let mut tiny = [0u8; 4];
        assert_eq!(
            encode_to_slice(&[0], &mut tiny, Style::Minimal).unwrap_err(),
            EncodeError::NotEnoughSpace
        );
    }

    #[test]
    fn test_upper_minimal() {
        let formatted = format!("{}", UpperMinimal(&[0, 1, 2, 128, 255]));
        assert_eq!(formatted, "AEADAOLAZMJENDEOTI");
    }
}
