// SPDX-FileCopyrightText: © 2024 QRLink Contributors <dev@qrlink.dev>
// SPDX-License-Identifier: MIT

//! # Fountain encoder and decoder.
//!
//! A payload is split into `N` equally sized fragments and the encoder
//! emits an unbounded stream of parts, each the XOR of a seed-determined
//! subset of fragments. The first `N` parts carry the fragments verbatim;
//! a receiver that observes enough parts, in any order and with any amount
//! of duplication or loss, reassembles the payload by online Gaussian
//! elimination over the received subsets.
//!
//! ```
//! use qrlink_ur::fountain::{Decoder, Encoder};
//!
//! let message = b"a payload that does not fit in one code".repeat(8);
//!
//! let mut encoder = Encoder::new();
//! encoder.start(&message, 30).unwrap();
//!
//! let mut decoder = Decoder::new();
//! while !decoder.is_complete() {
//!     decoder.receive(&encoder.next_part()).unwrap();
//! }
//! assert_eq!(decoder.message(), Some(&message[..]));
//! ```

pub mod chooser;
pub mod decoder;
pub mod encoder;
pub mod part;
pub mod sampler;

mod util;

#[cfg(feature = "alloc")]
pub use self::decoder::Decoder;
pub use self::decoder::{BaseDecoder, HeaplessDecoder};

#[cfg(feature = "alloc")]
pub use self::encoder::Encoder;
pub use self::encoder::{BaseEncoder, HeaplessEncoder};

pub use self::util::fragment_length;

/// Fragment length floor used when the encoder caller does not specify one.
pub const DEFAULT_MIN_FRAGMENT_LEN: usize = 10;

/// Most mixed (degree ≥ 2) parts a decoder retains.
///
/// When the store is full further mixed parts are dropped; decoding stays
/// correct but may need more input to finish.
pub const MAX_MIXED_PARTS: usize = 256;

/// Most distinct index-set hashes tracked for duplicate suppression.
///
/// Past this bound duplicates are no longer filtered up front; the
/// reduction engine still ignores them.
pub const MAX_DUPLICATE_TRACKING: usize = 512;
