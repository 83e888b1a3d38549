// SPDX-FileCopyrightText: © 2024 QRLink Contributors <dev@qrlink.dev>
// SPDX-License-Identifier: MIT

//! The `ur:` URI layer.
//!
//! Grammar: `ur:<type>/<body>` for a single-part resource and
//! `ur:<type>/<seq>-<count>/<body>` for one part of a multi-part stream,
//! where `<body>` is minimal-style bytewords. Emitted strings are fully
//! uppercase for the dense QR alphanumeric mode; parsing accepts any case.

pub mod decoder;
pub mod encoder;

#[cfg(feature = "alloc")]
pub use self::decoder::Decoder;
pub use self::decoder::{BaseDecoder, HeaplessDecoder};

#[cfg(feature = "alloc")]
pub use self::encoder::Encoder;
pub use self::encoder::{BaseEncoder, HeaplessEncoder};

use crate::{bytewords::UpperMinimal, fountain::part::Part};
use core::fmt::{self, Write as _};

/// One Uniform Resource string, parsed or about to be formatted.
///
/// The `Payload` variants hold data that still needs bytewords encoding;
/// they exist so an encoder can format a UR straight into a QR renderer
/// without intermediate buffers. Parsing only ever produces the borrowed
/// string variants.
#[derive(Debug, Clone)]
pub enum UR<'a> {
    /// A whole resource in one string, body still bytewords-encoded.
    SinglePart {
        /// The UR type.
        ur_type: &'a str,
        /// The bytewords-encoded body.
        body: &'a str,
    },
    /// A whole resource in one string, body as raw payload bytes.
    SinglePartPayload {
        /// The UR type.
        ur_type: &'a str,
        /// The payload that becomes the body.
        payload: &'a [u8],
    },
    /// One part of a fountain stream, body still bytewords-encoded.
    MultiPart {
        /// The UR type.
        ur_type: &'a str,
        /// Sequence number from the path, one-based.
        sequence: u32,
        /// Sequence count from the path.
        sequence_count: u32,
        /// The bytewords-encoded body.
        body: &'a str,
    },
    /// One part of a fountain stream, body as a decoded fountain part.
    MultiPartPayload {
        /// The UR type.
        ur_type: &'a str,
        /// The fountain part that becomes the body.
        part: Part<'a>,
    },
}

impl<'a> UR<'a> {
    /// Wrap `payload` as a single-part resource of type `ur_type`.
    ///
    /// # Errors
    ///
    /// Fails when `ur_type` is not a well-formed UR type.
    pub fn new(ur_type: &'a str, payload: &'a [u8]) -> Result<Self, ParseError> {
        if !is_ur_type(ur_type) {
            return Err(ParseError::InvalidType);
        }

        Ok(UR::SinglePartPayload { ur_type, payload })
    }

    /// Parse a Uniform Resource string, case-insensitively.
    ///
    /// The body is not bytewords-decoded here; that happens in the
    /// [decoder](BaseDecoder), which knows where the payload goes.
    pub fn parse(s: &'a str) -> Result<Self, ParseError> {
        let rest = match (s.get(..3), s.get(3..)) {
            (Some(scheme), Some(rest)) if scheme.eq_ignore_ascii_case("ur:") => rest,
            _ => return Err(ParseError::InvalidScheme),
        };

        let (ur_type, path) = rest.split_once('/').ok_or(ParseError::InvalidPathLength)?;
        if !is_ur_type(ur_type) {
            return Err(ParseError::InvalidType);
        }

        match path.split_once('/') {
            None => Ok(UR::SinglePart {
                ur_type,
                body: path,
            }),
            Some((sequence, body)) => {
                if body.contains('/') {
                    return Err(ParseError::InvalidPathLength);
                }

                let (sequence, sequence_count) = parse_sequence(sequence)?;
                Ok(UR::MultiPart {
                    ur_type,
                    sequence,
                    sequence_count,
                    body,
                })
            }
        }
    }

    /// The UR type, exactly as given.
    #[must_use]
    pub fn ur_type(&self) -> &str {
        match self {
            UR::SinglePart { ur_type, .. }
            | UR::SinglePartPayload { ur_type, .. }
            | UR::MultiPart { ur_type, .. }
            | UR::MultiPartPayload { ur_type, .. } => ur_type,
        }
    }

    /// Whether this is a whole resource in one string.
    #[must_use]
    #[inline]
    pub fn is_single_part(&self) -> bool {
        matches!(
            self,
            UR::SinglePart { .. } | UR::SinglePartPayload { .. }
        )
    }

    /// Whether this is one part of a fountain stream.
    #[must_use]
    #[inline]
    pub fn is_multi_part(&self) -> bool {
        !self.is_single_part()
    }

    /// The bytewords body, when not yet decoded.
    #[must_use]
    pub fn body(&self) -> Option<&str> {
        match self {
            UR::SinglePart { body, .. } | UR::MultiPart { body, .. } => Some(body),
            _ => None,
        }
    }

    /// The fountain part, on a decoded multi-part resource.
    #[must_use]
    pub fn as_part(&self) -> Option<&Part<'a>> {
        match self {
            UR::MultiPartPayload { part, .. } => Some(part),
            _ => None,
        }
    }

    /// The sequence number, on multi-part resources.
    #[must_use]
    pub fn sequence(&self) -> Option<u32> {
        match self {
            UR::MultiPart { sequence, .. } => Some(*sequence),
            UR::MultiPartPayload { part, .. } => Some(part.sequence),
            _ => None,
        }
    }

    /// The sequence count, on multi-part resources.
    #[must_use]
    pub fn sequence_count(&self) -> Option<u32> {
        match self {
            UR::MultiPart { sequence_count, .. } => Some(*sequence_count),
            UR::MultiPartPayload { part, .. } => Some(part.sequence_count),
            _ => None,
        }
    }
}

impl<'a> fmt::Display for UR<'a> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UR::SinglePart { ur_type, body } => {
                write!(f, "UR:{}/{}", Upper(ur_type), Upper(body))
            }
            UR::SinglePartPayload { ur_type, payload } => {
                write!(f, "UR:{}/{}", Upper(ur_type), UpperMinimal(payload))
            }
            UR::MultiPart {
                ur_type,
                sequence,
                sequence_count,
                body,
            } => write!(
                f,
                "UR:{}/{sequence}-{sequence_count}/{}",
                Upper(ur_type),
                Upper(body)
            ),
            UR::MultiPartPayload { ur_type, part } => write!(
                f,
                "UR:{}/{}-{}/{part}",
                Upper(ur_type),
                part.sequence,
                part.sequence_count
            ),
        }
    }
}

/// Formats a string uppercased, without allocating.
struct Upper<'a>(&'a str);

impl<'a> fmt::Display for Upper<'a> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for c in self.0.chars() {
            f.write_char(c.to_ascii_uppercase())?;
        }
        Ok(())
    }
}

/// Whether `s` is a well-formed UR type: alphanumerics with single
/// interior hyphens. Case-insensitive.
fn is_ur_type(s: &str) -> bool {
    let mut previous_hyphen = true;
    for &b in s.as_bytes() {
        match b {
            b'-' if previous_hyphen => return false,
            b'-' => previous_hyphen = true,
            _ if b.is_ascii_alphanumeric() => previous_hyphen = false,
            _ => return false,
        }
    }

    !s.is_empty() && !s.ends_with('-')
}

/// Parse `<seq>-<count>`, both strictly decimal and positive.
fn parse_sequence(s: &str) -> Result<(u32, u32), ParseError> {
    let (sequence, count) = s.split_once('-').ok_or(ParseError::InvalidSequenceComponent)?;

    let number = |digits: &str| {
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(ParseError::InvalidSequenceComponent);
        }
        let n: u32 = digits
            .parse()
            .map_err(|_| ParseError::InvalidSequenceComponent)?;
        if n == 0 {
            return Err(ParseError::InvalidSequenceComponent);
        }
        Ok(n)
    };

    Ok((number(sequence)?, number(count)?))
}

/// Errors that can happen while parsing a Uniform Resource string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseError {
    /// The string does not start with the `ur:` scheme.
    InvalidScheme,
    /// The UR type contains invalid characters (or is missing).
    InvalidType,
    /// The path does not have one or two components after the type.
    InvalidPathLength,
    /// The `<seq>-<count>` component is malformed or contains a zero.
    InvalidSequenceComponent,
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseError::InvalidScheme => write!(f, "not an `ur:` resource"),
            ParseError::InvalidType => write!(f, "invalid resource type"),
            ParseError::InvalidPathLength => write!(f, "invalid number of path components"),
            ParseError::InvalidSequenceComponent => {
                write!(f, "invalid sequence component")
            }
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for ParseError {}

/// Encode a single-part UR string.
///
/// # Errors
///
/// Fails when `ur_type` is not a well-formed UR type.
#[cfg(feature = "alloc")]
pub fn encode(ur_type: &str, payload: &[u8]) -> Result<alloc::string::String, ParseError> {
    #[cfg(not(feature = "std"))]
    use alloc::string::ToString;

    UR::new(ur_type, payload).map(|ur| ur.to_string())
}

#[cfg(test)]
#[cfg(feature = "alloc")]
pub mod tests {
    use super::*;

    pub fn make_message_ur(length: usize, seed: &str) -> Vec<u8> {
        let message = crate::xoshiro::test_utils::make_message(seed, length);
        minicbor::to_vec(minicbor::bytes::ByteVec::from(message)).unwrap()
    }

    #[test]
    fn test_single_part_ur() {
        const EXPECTED: &str = "UR:BYTES/HDEYMEJTSWHHYLKEPMYKHHTSYTSNOYOYAXAEDSUTTYDMMHHPKTPMSRJTGWDPFNSBOXGWLBAAWZUEFYWKDPLRSRJYNBVYGABWJLDAPFCSDWKBRKCH";

        let message = make_message_ur(50, "Wolf");
        let encoded = encode("bytes", &message).unwrap();
        assert_eq!(encoded, EXPECTED);

        let parsed = UR::parse(&encoded).unwrap();
        assert!(parsed.is_single_part());
        assert!(parsed.ur_type().eq_ignore_ascii_case("bytes"));

        let decoded = crate::bytewords::decode(
            parsed.body().unwrap(),
            crate::bytewords::Style::Minimal,
        )
        .unwrap();
        assert_eq!(decoded, message);
    }

    #[test]
    fn test_parse_accepts_any_case() {
        UR::parse("ur:bytes/aeadaolazmjendeoti").unwrap();
        UR::parse("UR:BYTES/AEADAOLAZMJENDEOTI").unwrap();
        UR::parse("Ur:ByTeS/AeAdAoLaZmJeNdEoTi").unwrap();
        UR::parse("ur:whatever-12/aeadaolazmjendeoti").unwrap();
    }

    #[test]
    fn test_parse_multi_part() {
        let ur = UR::parse("ur:bytes/6-23/lpamchcfatttcyclehgsdphdhgehfghkkkdl").unwrap();
        assert!(ur.is_multi_part());
        assert_eq!(ur.sequence(), Some(6));
        assert_eq!(ur.sequence_count(), Some(23));
        assert_eq!(ur.body(), Some("lpamchcfatttcyclehgsdphdhgehfghkkkdl"));
    }

    #[test]
    fn test_parse_errors() {
        const VECTORS: &[(&str, ParseError)] = &[
            ("uhr:bytes/aeadaolazmjendeoti", ParseError::InvalidScheme),
            ("u", ParseError::InvalidScheme),
            ("", ParseError::InvalidScheme),
            ("ur:aeadaolazmjendeoti", ParseError::InvalidPathLength),
            ("ur:bytes#4/aeadaolazmjendeoti", ParseError::InvalidType),
            ("ur:-bytes/aeadaolazmjendeoti", ParseError::InvalidType),
            ("ur:bytes-/aeadaolazmjendeoti", ParseError::InvalidType),
            ("ur:by--tes/aeadaolazmjendeoti", ParseError::InvalidType),
            ("ur:/aeadaolazmjendeoti", ParseError::InvalidType),
            (
                "ur:bytes/1-1/too/much",
                ParseError::InvalidPathLength,
            ),
            (
                "ur:bytes/1 1/aeadaolazmjendeoti",
                ParseError::InvalidSequenceComponent,
            ),
            (
                "ur:bytes/1-1a/aeadaolazmjendeoti",
                ParseError::InvalidSequenceComponent,
            ),
            (
                "ur:bytes/+1-2/aeadaolazmjendeoti",
                ParseError::InvalidSequenceComponent,
            ),
            (
                "ur:bytes/0-1/aeadaolazmjendeoti",
                ParseError::InvalidSequenceComponent,
            ),
            (
                "ur:bytes/1-0/aeadaolazmjendeoti",
                ParseError::InvalidSequenceComponent,
            ),
        ];

        for (input, expected) in VECTORS {
            assert_eq!(UR::parse(input).unwrap_err(), *expected, "{input}");
        }
    }

    #[test]
    fn test_invalid_type_on_encode() {
        assert_eq!(
            encode("not a type", b"payload").unwrap_err(),
            ParseError::InvalidType
        );
    }
}
