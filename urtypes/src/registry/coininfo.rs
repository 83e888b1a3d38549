// SPDX-FileCopyrightText: © 2024 QRLink Contributors <dev@qrlink.dev>
// SPDX-License-Identifier: MIT

use minicbor::{
    data::{Tag, Type},
    decode::Error,
    encode::Write,
    Decode, Decoder, Encode, Encoder,
};

/// Coin type and network a key or address belongs to.
#[doc(alias("crypto-coininfo"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CoinInfo {
    /// SLIP-44 coin type.
    pub coin_type: u32,
    /// Network identifier; zero is the main network for every coin.
    pub network: u64,
}

impl CoinInfo {
    /// The CBOR tag for embedding [`CoinInfo`] in other types.
    pub const TAG: Tag = Tag::new(305);

    /// SLIP-44 Bitcoin.
    pub const COIN_TYPE_BTC: u32 = 0;

    /// The main network of any coin.
    pub const NETWORK_MAINNET: u64 = 0;

    /// The Bitcoin test network.
    pub const NETWORK_BTC_TESTNET: u64 = 1;

    /// Bitcoin mainnet.
    pub const BTC_MAINNET: Self = Self::new(Self::COIN_TYPE_BTC, Self::NETWORK_MAINNET);

    /// Construct a new [`CoinInfo`].
    #[must_use]
    pub const fn new(coin_type: u32, network: u64) -> Self {
        Self { coin_type, network }
    }
}

impl Default for CoinInfo {
    fn default() -> Self {
        Self::BTC_MAINNET
    }
}

impl<'b, C> Decode<'b, C> for CoinInfo {
    fn decode(d: &mut Decoder<'b>, _ctx: &mut C) -> Result<Self, Error> {
        let mut coin_type = Self::COIN_TYPE_BTC;
        let mut network = Self::NETWORK_MAINNET;

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
                1 => coin_type = d.u32()?,
                2 => network = d.u64()?,
                _ => return Err(Error::message("unknown map entry")),
            }
        }

        Ok(Self { coin_type, network })
    }
}

impl<C> Encode<C> for CoinInfo {
    fn encode<W: Write>(
        &self,
        e: &mut Encoder<W>,
        _ctx: &mut C,
    ) -> Result<(), minicbor::encode::Error<W::Error>> {
        let encode_coin_type = self.coin_type != Self::COIN_TYPE_BTC;
        let encode_network = self.network != Self::NETWORK_MAINNET;
        e.map(u64::from(encode_coin_type) + u64::from(encode_network))?;

        if encode_coin_type {
            e.u8(1)?.u32(self.coin_type)?;
        }

        if encode_network {
            e.u8(2)?.u64(self.network)?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_omitted() {
        let cbor = minicbor::to_vec(CoinInfo::BTC_MAINNET).unwrap();
        assert_eq!(cbor, [0xa0]);

        let decoded: CoinInfo = minicbor::decode(&cbor).unwrap();
        assert_eq!(decoded, CoinInfo::BTC_MAINNET);
    }

    #[test]
    fn test_testnet_roundtrip() {
        let info = CoinInfo::new(CoinInfo::COIN_TYPE_BTC, CoinInfo::NETWORK_BTC_TESTNET);
        let cbor = minicbor::to_vec(info).unwrap();
        assert_eq!(cbor, [0xa1, 0x02, 0x01]);

        let decoded: CoinInfo = minicbor::decode(&cbor).unwrap();
        assert_eq!(decoded, info);
    }

    #[test]
    fn test_key_order_is_free() {
        // {2: 1, 1: 60}
        let cbor = [0xa2, 0x02, 0x01, 0x01, 0x18, 0x3c];
        let decoded: CoinInfo = minicbor::decode(&cbor).unwrap();
        assert_eq!(decoded, CoinInfo::new(60, 1));
    }
}
