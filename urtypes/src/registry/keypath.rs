// SPDX-FileCopyrightText: © 2024 QRLink Contributors <dev@qrlink.dev>
// SPDX-License-Identifier: MIT

use core::{fmt, num::NonZeroU32};

use minicbor::{
    data::{Tag, Type},
    decode::Error,
    encode::Write,
    Decode, Decoder, Encode, Encoder,
};

/// Most derivation steps a [`Keypath`] can carry.
pub const MAX_PATH_COMPONENTS: usize = 16;

/// Full or partial derivation path of a key.
#[doc(alias("crypto-keypath"))]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Keypath {
    /// Derivation steps, left to right.
    pub components: heapless::Vec<PathComponent, MAX_PATH_COMPONENTS>,
    /// Fingerprint of the ancestor key this path starts from.
    pub source_fingerprint: Option<NonZeroU32>,
    /// Number of derivations between the master key and this one.
    pub depth: Option<u8>,
}

impl Keypath {
    /// The CBOR tag for embedding [`Keypath`] in other types.
    pub const TAG: Tag = Tag::new(304);

    /// The path of a master key: no components, depth zero.
    #[must_use]
    pub fn new_master(source_fingerprint: NonZeroU32) -> Self {
        Self {
            components: heapless::Vec::new(),
            source_fingerprint: Some(source_fingerprint),
            depth: Some(0),
        }
    }
}

/// One derivation step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathComponent {
    /// A single child index.
    Index {
        /// Child index, below 2³¹.
        index: u32,
        /// Whether derivation is hardened.
        hardened: bool,
    },
    /// An inclusive range of child indexes.
    Range {
        /// Lowest child index.
        low: u32,
        /// Highest child index.
        high: u32,
        /// Whether derivation is hardened.
        hardened: bool,
    },
    /// Any child index.
    Wildcard {
        /// Whether derivation is hardened.
        hardened: bool,
    },
}

impl<'b, C> Decode<'b, C> for Keypath {
    fn decode(d: &mut Decoder<'b>, _ctx: &mut C) -> Result<Self, Error> {
        let mut components = None;
        let mut source_fingerprint = None;
        let mut depth = None;

        let mut entries = d.map()?;
        loop {
            match entries {
                Some(0) => break,
                Some(n) => entries = Some(n - 1),
                None => {
                    if d.datatype()? == Type::Break {
                        break;
                    }
                }
            }

            match d.u32()? {
                1 => components = Some(decode_components(d)?),
                2 => {
                    source_fingerprint = Some(
                        NonZeroU32::new(d.u32()?)
                            .ok_or_else(|| Error::message("source fingerprint is zero"))?,
                    );
                }
                3 => depth = Some(d.u8()?),
                _ => return Err(Error::message("unknown map entry")),
            }
        }

        Ok(Self {
            components: components.ok_or_else(|| Error::message("components are missing"))?,
            source_fingerprint,
            depth,
        })
    }
}

fn decode_components(
    d: &mut Decoder<'_>,
) -> Result<heapless::Vec<PathComponent, MAX_PATH_COMPONENTS>, Error> {
    let mut components = heapless::Vec::new();

    // The array alternates a component with its hardened flag.
    let mut items = d.array()?;
    loop {
        match items {
            Some(0) => break,
            Some(1) => return Err(Error::message("component without hardened flag")),
            Some(n) => items = Some(n - 2),
            None => {
                if d.datatype()? == Type::Break {
                    break;
                }
            }
        }

        let component = match d.datatype()? {
            Type::Array => match d.array()? {
                Some(0) => None,
                Some(2) => {
                    let low = d.u32()?;
                    let high = d.u32()?;
                    Some((low, high))
                }
                _ => return Err(Error::message("invalid child index range")),
            },
            _ => {
                let index = d.u32()?;
                Some((index, index))
            }
        };
        let hardened = d.bool()?;

        let component = match component {
            None => PathComponent::Wildcard { hardened },
            Some((low, high)) if low == high => PathComponent::Index {
                index: low,
                hardened,
            },
            Some((low, high)) => PathComponent::Range {
                low,
                high,
                hardened,
            },
        };

        components
            .push(component)
            .map_err(|_| Error::message("derivation path is too deep"))?;
    }

    Ok(components)
}

impl<C> Encode<C> for Keypath {
    fn encode<W: Write>(
        &self,
        e: &mut Encoder<W>,
        _ctx: &mut C,
    ) -> Result<(), minicbor::encode::Error<W::Error>> {
        let entries = 1
            + u64::from(self.source_fingerprint.is_some())
            + u64::from(self.depth.is_some());
        e.map(entries)?;

        e.u8(1)?.array(2 * self.components.len() as u64)?;
        for component in &self.components {
            match *component {
                PathComponent::Index { index, hardened } => {
                    e.u32(index)?.bool(hardened)?;
                }
                PathComponent::Range {
                    low,
                    high,
                    hardened,
                } => {
                    e.array(2)?.u32(low)?.u32(high)?.bool(hardened)?;
                }
                PathComponent::Wildcard { hardened } => {
                    e.array(0)?.bool(hardened)?;
                }
            }
        }

        if let Some(source_fingerprint) = self.source_fingerprint {
            e.u8(2)?.u32(source_fingerprint.get())?;
        }

        if let Some(depth) = self.depth {
            e.u8(3)?.u8(depth)?;
        }

        Ok(())
    }
}

/// Formats the path the way descriptors spell it: `44h/0h/0h/*`.
impl fmt::Display for Keypath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, component) in self.components.iter().enumerate() {
            if i > 0 {
                f.write_str("/")?;
            }

            let hardened = match *component {
                PathComponent::Index { index, hardened } => {
                    write!(f, "{index}")?;
                    hardened
                }
                PathComponent::Range { low, high, hardened } => {
                    write!(f, "{low}-{high}")?;
                    hardened
                }
                PathComponent::Wildcard { hardened } => {
                    write!(f, "*")?;
                    hardened
                }
            };

            if hardened {
                f.write_str("h")?;
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bip44_account() -> Keypath {
        let hardened = |index| PathComponent::Index {
            index,
            hardened: true,
        };

        let mut components = heapless::Vec::new();
        components.push(hardened(44)).unwrap();
        components.push(hardened(0)).unwrap();
        components.push(hardened(0)).unwrap();

        Keypath {
            components,
            source_fingerprint: None,
            depth: None,
        }
    }

    #[test]
    fn test_roundtrip() {
        let path = bip44_account();
        let cbor = minicbor::to_vec(&path).unwrap();

        // {1: [44, true, 0, true, 0, true]}
        assert_eq!(
            cbor,
            [0xa1, 0x01, 0x86, 0x18, 0x2c, 0xf5, 0x00, 0xf5, 0x00, 0xf5]
        );

        let decoded: Keypath = minicbor::decode(&cbor).unwrap();
        assert_eq!(decoded, path);
    }

    #[test]
    fn test_master_path() {
        let fingerprint = NonZeroU32::new(0x1234_5678).unwrap();
        let path = Keypath::new_master(fingerprint);
        let cbor = minicbor::to_vec(&path).unwrap();

        // {1: [], 2: 0x12345678, 3: 0}
        assert_eq!(
            cbor,
            [0xa3, 0x01, 0x80, 0x02, 0x1a, 0x12, 0x34, 0x56, 0x78, 0x03, 0x00]
        );

        let decoded: Keypath = minicbor::decode(&cbor).unwrap();
        assert_eq!(decoded, path);
    }

    #[test]
    fn test_wildcard_and_range() {
        let mut components = heapless::Vec::new();
        components
            .push(PathComponent::Range {
                low: 0,
                high: 100,
                hardened: false,
            })
            .unwrap();
        components
            .push(PathComponent::Wildcard { hardened: false })
            .unwrap();

        let path = Keypath {
            components,
            source_fingerprint: None,
            depth: None,
        };

        let cbor = minicbor::to_vec(&path).unwrap();
        let decoded: Keypath = minicbor::decode(&cbor).unwrap();
        assert_eq!(decoded, path);
    }

    #[test]
    fn test_display() {
        assert_eq!(format!("{}", bip44_account()), "44h/0h/0h");
    }

    #[test]
    fn test_missing_hardened_flag() {
        // {1: [44]}
        assert!(minicbor::decode::<Keypath>(&[0xa1, 0x01, 0x81, 0x18, 0x2c]).is_err());
    }

    #[test]
    fn test_zero_fingerprint_is_rejected() {
        // {1: [], 2: 0}
        assert!(minicbor::decode::<Keypath>(&[0xa2, 0x01, 0x80, 0x02, 0x00]).is_err());
    }
}
