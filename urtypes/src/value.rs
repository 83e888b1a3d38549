// SPDX-FileCopyrightText: © 2024 QRLink Contributors <dev@qrlink.dev>
// SPDX-License-Identifier: MIT

//! Type-string dispatch over the registry.
//!
//! [`Value`] aggregates the self-contained registry types, so a scanner
//! can turn a `(ur_type, cbor_payload)` pair from the transport into a
//! typed value in one call:
//!
//! ```rust
//! use qrlink_urtypes::value::Value;
//!
//! // As a UR: UR:BYTES/GDAEBYCPEOFYGOIYKTLONLPKRKSFUTWYZMWMFYEOZS
//! const PAYLOAD: &[u8] = &[
//!     0x50, 0x00, 0x11, 0x22, 0x33, 0x44, 0x55, 0x66, 0x77, 0x88, 0x99, 0xAA, 0xBB, 0xCC,
//!     0xDD, 0xEE, 0xFF,
//! ];
//!
//! let value = Value::from_ur("bytes", PAYLOAD).unwrap();
//! assert!(matches!(value, Value::Bytes(_)));
//! ```
//!
//! Output descriptors are absent here: their recursive script expressions
//! decode through an explicit arena context, see
//! [`registry::TerminalContext`](crate::registry::TerminalContext).

use core::fmt;

use minicbor::{bytes::ByteSlice, encode::Write, Encode, Encoder};

use crate::registry::{Bip39, HDKey};

/// A decoded Uniform Resource payload.
#[derive(Debug, Clone, PartialEq)]
pub enum Value<'a> {
    /// `bytes`.
    Bytes(&'a [u8]),
    /// `crypto-psbt`.
    Psbt(&'a [u8]),
    /// `crypto-bip39`.
    Bip39(Bip39<'a>),
    /// `crypto-hdkey`.
    HDKey(HDKey<'a>),
}

impl<'a> Value<'a> {
    /// Decode `payload` according to the UR type string.
    ///
    /// Both the `crypto-` prefixed type names and their modern short forms
    /// are accepted. Matching is case-insensitive, like the transport.
    pub fn from_ur(ur_type: &str, payload: &'a [u8]) -> Result<Self, Error> {
        let mut lowered = [0u8; 16];
        let ur_type = lowercase(ur_type, &mut lowered).ok_or(Error::UnknownType)?;

        let value = match ur_type {
            "bytes" => Self::Bytes(byte_string(payload)?),
            "psbt" | "crypto-psbt" => Self::Psbt(byte_string(payload)?),
            "bip39" | "crypto-bip39" => Self::Bip39(minicbor::decode(payload)?),
            "hdkey" | "crypto-hdkey" => Self::HDKey(minicbor::decode(payload)?),
            _ => return Err(Error::UnknownType),
        };

        Ok(value)
    }

    /// The UR type string for this value.
    ///
    /// Returns the `crypto-` prefixed names, which more deployed scanners
    /// understand.
    #[must_use]
    pub fn ur_type(&self) -> &'static str {
        match self {
            Value::Bytes(_) => "bytes",
            Value::Psbt(_) => "crypto-psbt",
            Value::Bip39(_) => "crypto-bip39",
            Value::HDKey(_) => "crypto-hdkey",
        }
    }
}

fn byte_string(payload: &[u8]) -> Result<&[u8], minicbor::decode::Error> {
    let bytes: &ByteSlice = minicbor::decode(payload)?;
    Ok(bytes)
}

fn lowercase<'s>(input: &str, scratch: &'s mut [u8; 16]) -> Option<&'s str> {
    let bytes = input.as_bytes();
    if bytes.len() > scratch.len() {
        return None;
    }

    for (out, b) in scratch.iter_mut().zip(bytes) {
        *out = b.to_ascii_lowercase();
    }

    core::str::from_utf8(&scratch[..bytes.len()]).ok()
}

impl<'a, C> Encode<C> for Value<'a> {
    fn encode<W: Write>(
        &self,
        e: &mut Encoder<W>,
        ctx: &mut C,
    ) -> Result<(), minicbor::encode::Error<W::Error>> {
        match self {
            Value::Bytes(payload) | Value::Psbt(payload) => {
                e.bytes(payload)?;
                Ok(())
            }
            Value::Bip39(phrase) => phrase.encode(e, ctx),
            Value::HDKey(key) => key.encode(e, ctx),
        }
    }
}

/// Errors that can occur when decoding a payload.
#[derive(Debug)]
pub enum Error {
    /// The UR type is not in the registry.
    UnknownType,
    /// The payload does not decode as the type's CBOR shape.
    InvalidCbor(minicbor::decode::Error),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownType => write!(f, "Uniform Resource type not in the registry"),
            Self::InvalidCbor(e) => write!(f, "payload does not match the type shape: {e}"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::InvalidCbor(e) => Some(e),
            Self::UnknownType => None,
        }
    }
}

impl From<minicbor::decode::Error> for Error {
    fn from(e: minicbor::decode::Error) -> Self {
        Self::InvalidCbor(e)
    }
}
