// SPDX-FileCopyrightText: © 2024 QRLink Contributors <dev@qrlink.dev>
// SPDX-License-Identifier: MIT

use minicbor::{
    data::{Tag, Type},
    decode::Error,
    encode::Write,
    Decode, Decoder, Encode, Encoder,
};

/// An elliptic-curve key.
#[doc(alias("crypto-eckey"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ECKey<'a> {
    /// Curve identifier.
    pub curve: u64,
    /// Whether `data` is a private key.
    pub is_private: bool,
    /// Key material.
    pub data: &'a [u8],
}

impl<'a> ECKey<'a> {
    /// The CBOR tag for embedding [`ECKey`] in other types.
    pub const TAG: Tag = Tag::new(306);

    /// The secp256k1 curve.
    pub const CURVE_SECP256K1: u64 = 0;

    /// A public secp256k1 key.
    #[must_use]
    pub const fn public(data: &'a [u8]) -> Self {
        Self {
            curve: Self::CURVE_SECP256K1,
            is_private: false,
            data,
        }
    }
}

impl<'b, C> Decode<'b, C> for ECKey<'b> {
    fn decode(d: &mut Decoder<'b>, _ctx: &mut C) -> Result<Self, Error> {
        let mut curve = Self::CURVE_SECP256K1;
        let mut is_private = false;
        let mut data = None;

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
                1 => curve = d.u64()?,
                2 => is_private = d.bool()?,
                3 => data = Some(d.bytes()?),
                _ => return Err(Error::message("unknown map entry")),
            }
        }

        Ok(Self {
            curve,
            is_private,
            data: data.ok_or_else(|| Error::message("key data is missing"))?,
        })
    }
}

impl<'a, C> Encode<C> for ECKey<'a> {
    fn encode<W: Write>(
        &self,
        e: &mut Encoder<W>,
        _ctx: &mut C,
    ) -> Result<(), minicbor::encode::Error<W::Error>> {
        let encode_curve = self.curve != Self::CURVE_SECP256K1;
        e.map(u64::from(encode_curve) + u64::from(self.is_private) + 1)?;

        if encode_curve {
            e.u8(1)?.u64(self.curve)?;
        }

        if self.is_private {
            e.u8(2)?.bool(true)?;
        }

        e.u8(3)?.bytes(self.data)?;

        Ok(())
    }
}
