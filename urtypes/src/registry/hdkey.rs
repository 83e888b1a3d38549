// SPDX-FileCopyrightText: © 2024 QRLink Contributors <dev@qrlink.dev>
// SPDX-License-Identifier: MIT

use core::num::NonZeroU32;

use minicbor::{
    data::{Tag, Type},
    decode::Error,
    encode::Write,
    Decode, Decoder, Encode, Encoder,
};

use crate::registry::{CoinInfo, Keypath};

/// A hierarchical-deterministic key.
#[doc(alias("crypto-hdkey"))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HDKey<'a> {
    /// A master key, always private.
    Master(MasterKey),
    /// A key derived somewhere below the master.
    Derived(DerivedKey<'a>),
}

impl<'a> HDKey<'a> {
    /// The CBOR tag for embedding [`HDKey`] in other types.
    pub const TAG: Tag = Tag::new(303);

    /// The 33-byte key material.
    #[must_use]
    pub fn key_data(&self) -> &[u8; 33] {
        match self {
            HDKey::Master(key) => &key.key_data,
            HDKey::Derived(key) => &key.key_data,
        }
    }
}

/// A master key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MasterKey {
    /// Private key material: a zero byte followed by the 32-byte secret.
    pub key_data: [u8; 33],
    /// The chain code.
    pub chain_code: [u8; 32],
}

/// A derived key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DerivedKey<'a> {
    /// Whether `key_data` holds a private key.
    pub is_private: bool,
    /// Key material: SEC1 compressed point, or zero byte plus secret.
    pub key_data: [u8; 33],
    /// The chain code, absent when no further derivation is intended.
    pub chain_code: Option<[u8; 32]>,
    /// Coin and network this key is used on.
    pub use_info: Option<CoinInfo>,
    /// How this key was derived from the master.
    pub origin: Option<Keypath>,
    /// What children should be derived from this key.
    pub children: Option<Keypath>,
    /// Fingerprint of the direct parent key.
    pub parent_fingerprint: Option<NonZeroU32>,
    /// Human-readable name.
    pub name: Option<&'a str>,
    /// Arbitrary note.
    pub note: Option<&'a str>,
}

impl<'b, C> Decode<'b, C> for HDKey<'b> {
    fn decode(d: &mut Decoder<'b>, ctx: &mut C) -> Result<Self, Error> {
        let mut is_master = false;
        let mut is_private = false;
        let mut key_data: Option<[u8; 33]> = None;
        let mut chain_code: Option<[u8; 32]> = None;
        let mut use_info = None;
        let mut origin = None;
        let mut children = None;
        let mut parent_fingerprint = None;
        let mut name = None;
        let mut note = None;

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
                1 => is_master = d.bool()?,
                2 => is_private = d.bool()?,
                3 => {
                    key_data = Some(
                        d.bytes()?
                            .try_into()
                            .map_err(|_| Error::message("key data must be 33 bytes"))?,
                    );
                }
                4 => {
                    chain_code = Some(
                        d.bytes()?
                            .try_into()
                            .map_err(|_| Error::message("chain code must be 32 bytes"))?,
                    );
                }
                5 => {
                    if d.tag()? != CoinInfo::TAG {
                        return Err(Error::message("expected coininfo tag"));
                    }
                    use_info = Some(CoinInfo::decode(d, ctx)?);
                }
                6 => {
                    if d.tag()? != Keypath::TAG {
                        return Err(Error::message("expected keypath tag"));
                    }
                    origin = Some(Keypath::decode(d, ctx)?);
                }
                7 => {
                    if d.tag()? != Keypath::TAG {
                        return Err(Error::message("expected keypath tag"));
                    }
                    children = Some(Keypath::decode(d, ctx)?);
                }
                8 => {
                    parent_fingerprint = Some(
                        NonZeroU32::new(d.u32()?)
                            .ok_or_else(|| Error::message("parent fingerprint is zero"))?,
                    );
                }
                9 => name = Some(d.str()?),
                10 => note = Some(d.str()?),
                _ => return Err(Error::message("unknown map entry")),
            }
        }

        let key_data = key_data.ok_or_else(|| Error::message("key data is missing"))?;

        if is_master {
            return Ok(HDKey::Master(MasterKey {
                key_data,
                chain_code: chain_code
                    .ok_or_else(|| Error::message("master key without chain code"))?,
            }));
        }

        Ok(HDKey::Derived(DerivedKey {
            is_private,
            key_data,
            chain_code,
            use_info,
            origin,
            children,
            parent_fingerprint,
            name,
            note,
        }))
    }
}

impl<'a, C> Encode<C> for HDKey<'a> {
    fn encode<W: Write>(
        &self,
        e: &mut Encoder<W>,
        ctx: &mut C,
    ) -> Result<(), minicbor::encode::Error<W::Error>> {
        match self {
            HDKey::Master(key) => {
                e.map(3)?;
                e.u8(1)?.bool(true)?;
                e.u8(3)?.bytes(&key.key_data)?;
                e.u8(4)?.bytes(&key.chain_code)?;
            }
            HDKey::Derived(key) => {
                let entries = 1
                    + u64::from(key.is_private)
                    + u64::from(key.chain_code.is_some())
                    + u64::from(key.use_info.is_some())
                    + u64::from(key.origin.is_some())
                    + u64::from(key.children.is_some())
                    + u64::from(key.parent_fingerprint.is_some())
                    + u64::from(key.name.is_some())
                    + u64::from(key.note.is_some());
                e.map(entries)?;

                if key.is_private {
                    e.u8(2)?.bool(true)?;
                }

                e.u8(3)?.bytes(&key.key_data)?;

                if let Some(chain_code) = &key.chain_code {
                    e.u8(4)?.bytes(chain_code)?;
                }

                if let Some(use_info) = &key.use_info {
                    e.u8(5)?.tag(CoinInfo::TAG)?;
                    use_info.encode(e, ctx)?;
                }

                if let Some(origin) = &key.origin {
                    e.u8(6)?.tag(Keypath::TAG)?;
                    origin.encode(e, ctx)?;
                }

                if let Some(children) = &key.children {
                    e.u8(7)?.tag(Keypath::TAG)?;
                    children.encode(e, ctx)?;
                }

                if let Some(parent_fingerprint) = key.parent_fingerprint {
                    e.u8(8)?.u32(parent_fingerprint.get())?;
                }

                if let Some(name) = key.name {
                    e.u8(9)?.str(name)?;
                }

                if let Some(note) = key.note {
                    e.u8(10)?.str(note)?;
                }
            }
        }

        Ok(())
    }
}
