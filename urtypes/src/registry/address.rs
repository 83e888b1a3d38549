// SPDX-FileCopyrightText: © 2024 QRLink Contributors <dev@qrlink.dev>
// SPDX-License-Identifier: MIT

use minicbor::{
    data::{Tag, Type},
    decode::Error,
    encode::Write,
    Decode, Decoder, Encode, Encoder,
};

use crate::registry::CoinInfo;

/// A cryptocurrency address.
#[doc(alias("crypto-address"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Address<'a> {
    /// Coin and network, Bitcoin mainnet when absent.
    pub info: Option<CoinInfo>,
    /// Script kind of the address, when it matters for rendering.
    pub address_type: Option<AddressType>,
    /// The address payload, such as a hash160 or witness program.
    pub data: &'a [u8],
}

impl<'a> Address<'a> {
    /// The CBOR tag for embedding [`Address`] in other types.
    pub const TAG: Tag = Tag::new(307);
}

/// Script kind of an [`Address`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddressType {
    /// Pay to public key hash.
    P2pkh,
    /// Pay to script hash.
    P2sh,
    /// Pay to witness public key hash.
    P2wpkh,
}

impl AddressType {
    const fn from_u32(value: u32) -> Option<Self> {
        match value {
            0 => Some(Self::P2pkh),
            1 => Some(Self::P2sh),
            2 => Some(Self::P2wpkh),
            _ => None,
        }
    }

    const fn to_u32(self) -> u32 {
        match self {
            Self::P2pkh => 0,
            Self::P2sh => 1,
            Self::P2wpkh => 2,
        }
    }
}

impl<'b, C> Decode<'b, C> for Address<'b> {
    fn decode(d: &mut Decoder<'b>, ctx: &mut C) -> Result<Self, Error> {
        let mut info = None;
        let mut address_type = None;
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
                1 => {
                    if d.tag()? != CoinInfo::TAG {
                        return Err(Error::message("expected coininfo tag"));
                    }
                    info = Some(CoinInfo::decode(d, ctx)?);
                }
                2 => {
                    address_type = Some(
                        AddressType::from_u32(d.u32()?)
                            .ok_or_else(|| Error::message("unknown address type"))?,
                    );
                }
                3 => data = Some(d.bytes()?),
                _ => return Err(Error::message("unknown map entry")),
            }
        }

        Ok(Self {
            info,
            address_type,
            data: data.ok_or_else(|| Error::message("address data is missing"))?,
        })
    }
}

impl<'a, C> Encode<C> for Address<'a> {
    fn encode<W: Write>(
        &self,
        e: &mut Encoder<W>,
        ctx: &mut C,
    ) -> Result<(), minicbor::encode::Error<W::Error>> {
        let entries =
            1 + u64::from(self.info.is_some()) + u64::from(self.address_type.is_some());
        e.map(entries)?;

        if let Some(info) = self.info {
            e.u8(1)?.tag(CoinInfo::TAG)?;
            info.encode(e, ctx)?;
        }

        if let Some(address_type) = self.address_type {
            e.u8(2)?.u32(address_type.to_u32())?;
        }

        e.u8(3)?.bytes(self.data)?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HASH160: [u8; 20] = [
        0x77, 0xbf, 0xf2, 0x0c, 0x60, 0xe5, 0x22, 0xdf, 0xaa, 0x33, 0x50, 0xc3, 0x9b, 0x03,
        0x0a, 0x5d, 0x00, 0x4e, 0x83, 0x9a,
    ];

    #[test]
    fn test_bare_address_roundtrip() {
        let address = Address {
            info: None,
            address_type: None,
            data: &HASH160,
        };
        let cbor = minicbor::to_vec(address).unwrap();
        assert_eq!(&cbor[..3], &[0xa1, 0x03, 0x54]);

        let decoded: Address = minicbor::decode(&cbor).unwrap();
        assert_eq!(decoded, address);
    }

    #[test]
    fn test_testnet_p2sh_roundtrip() {
        let address = Address {
            info: Some(CoinInfo::new(
                CoinInfo::COIN_TYPE_BTC,
                CoinInfo::NETWORK_BTC_TESTNET,
            )),
            address_type: Some(AddressType::P2sh),
            data: &HASH160,
        };
        let cbor = minicbor::to_vec(address).unwrap();
        let decoded: Address = minicbor::decode(&cbor).unwrap();
        assert_eq!(decoded, address);
    }

    #[test]
    fn test_unknown_address_type_is_rejected() {
        // {2: 9, 3: h''}
        assert!(minicbor::decode::<Address>(&[0xa2, 0x02, 0x09, 0x03, 0x40]).is_err());
    }
}
