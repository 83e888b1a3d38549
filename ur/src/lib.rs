// SPDX-FileCopyrightText: © 2024 QRLink Contributors <dev@qrlink.dev>
// SPDX-License-Identifier: MIT

//! Uniform Resources (UR) transport codec.
//!
//! A UR wraps a typed binary payload into uppercase ASCII strings that fit
//! in QR codes. Payloads too large for one code are carried by an
//! unbounded stream of [`fountain`]-coded parts; a receiver that scans
//! enough of them — in any order, with losses and duplicates — recovers
//! the payload exactly.
//!
//! ```
//! # use qrlink_ur as ur;
//! const MAX_FRAGMENT_LENGTH: usize = 10;
//!
//! let data = "Ten chars!".repeat(10);
//!
//! let mut encoder = ur::Encoder::new();
//! encoder
//!     .start("bytes", data.as_bytes(), MAX_FRAGMENT_LENGTH)
//!     .unwrap();
//!
//! let mut decoder = ur::Decoder::new();
//! while !decoder.is_complete() {
//!     let sequence = encoder.current_sequence();
//!     let part = encoder.next_part().to_string();
//!     // Simulate laggy scanning: every other frame is missed.
//!     if sequence & 1 == 0 {
//!         decoder.receive(&part).unwrap();
//!     }
//! }
//! assert_eq!(decoder.message(), Some(data.as_bytes()));
//! ```
//!
//! The building blocks are public as well:
//!
//!  - [`bytewords`] maps bytes to a QR-friendly two-letter alphabet with a
//!    CRC-32 trailer.
//!
//!  - [`fountain`] splits a payload into fragments and emits an unbounded
//!    stream of XOR-combined parts, recombined on the receiving side under
//!    fixed memory bounds.
#![forbid(unsafe_code)]
#![cfg_attr(not(feature = "std"), no_std)]
#![warn(missing_docs)]

#[cfg(feature = "alloc")]
extern crate alloc;
extern crate core;

pub mod bytewords;
pub mod collections;
pub mod fountain;

mod ur;
mod xoshiro;

pub use self::ur::*;

const CRC32: crc::Crc<u32> = crc::Crc::<u32>::new(&crc::CRC_32_ISO_HDLC);

#[test]
fn test_crc() {
    assert_eq!(CRC32.checksum(b"Hello, world!"), 0xebe6_c6e6);
    assert_eq!(CRC32.checksum(b"Wolf"), 0x598c_84dc);
    assert_eq!(CRC32.checksum(b""), 0);
}
