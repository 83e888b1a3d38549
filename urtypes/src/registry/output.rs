// SPDX-FileCopyrightText: © 2024 QRLink Contributors <dev@qrlink.dev>
// SPDX-License-Identifier: MIT

use minicbor::{
    data::{Tag, Type},
    decode::Error,
    encode::Write,
    Decode, Decoder, Encode, Encoder,
};

use qrlink_arena::{boxed::Box, Arena};

use crate::registry::{Address, ECKey, HDKey};

/// Arena the recursive script expressions of an output descriptor are
/// decoded into.
///
/// `N` bounds the nesting depth; real descriptors nest two or three
/// levels.
pub type TerminalContext<'a, 'b, const N: usize> = Arena<Terminal<'a, 'b>, N>;

/// Most keys a multisig expression can carry.
pub const MAX_MULTIKEY_KEYS: usize = 16;

/// One node of an output descriptor script expression.
#[doc(alias("crypto-output"))]
#[derive(Debug, PartialEq)]
pub enum Terminal<'a, 'b> {
    /// `sh(…)`.
    ScriptHash(Box<'a, Terminal<'a, 'b>>),
    /// `wsh(…)`.
    WitnessScriptHash(Box<'a, Terminal<'a, 'b>>),
    /// `pk(key)`.
    PublicKey(Key<'b>),
    /// `pkh(key)`.
    PublicKeyHash(Key<'b>),
    /// `wpkh(key)`.
    WitnessPublicKeyHash(Key<'b>),
    /// `combo(key)`.
    Combo(Key<'b>),
    /// `multi(k, key, …)`.
    Multisig(Multikey<'b>),
    /// `sortedmulti(k, key, …)`.
    SortedMultisig(Multikey<'b>),
    /// `addr(address)`.
    Address(Address<'b>),
    /// `raw(hex)`.
    RawScript(&'b [u8]),
    /// `tr(…)`.
    Taproot(Box<'a, Terminal<'a, 'b>>),
    /// An additional cosigner key.
    Cosigner(Key<'b>),
}

impl<'a, 'b> Terminal<'a, 'b> {
    const TAG_SCRIPT_HASH: Tag = Tag::new(400);
    const TAG_WITNESS_SCRIPT_HASH: Tag = Tag::new(401);
    const TAG_PUBLIC_KEY: Tag = Tag::new(402);
    const TAG_PUBLIC_KEY_HASH: Tag = Tag::new(403);
    const TAG_WITNESS_PUBLIC_KEY_HASH: Tag = Tag::new(404);
    const TAG_COMBO: Tag = Tag::new(405);
    const TAG_MULTISIG: Tag = Tag::new(406);
    const TAG_SORTED_MULTISIG: Tag = Tag::new(407);
    const TAG_RAW_SCRIPT: Tag = Tag::new(408);
    const TAG_TAPROOT: Tag = Tag::new(409);
    const TAG_COSIGNER: Tag = Tag::new(410);
}

fn nested<'a, 'b, const N: usize>(
    inner: Terminal<'a, 'b>,
    arena: &'a TerminalContext<'a, 'b, N>,
) -> Result<Box<'a, Terminal<'a, 'b>>, Error> {
    Box::new_in(inner, arena).map_err(|_| Error::message("descriptor nests too deep"))
}

impl<'a, 'b, const N: usize> Decode<'b, &'a TerminalContext<'a, 'b, N>> for Terminal<'a, 'b> {
    fn decode(
        d: &mut Decoder<'b>,
        ctx: &mut &'a TerminalContext<'a, 'b, N>,
    ) -> Result<Self, Error> {
        let tag = d.tag()?;
        match tag {
            Self::TAG_SCRIPT_HASH => {
                nested(Terminal::decode(d, ctx)?, *ctx).map(Terminal::ScriptHash)
            }
            Self::TAG_WITNESS_SCRIPT_HASH => {
                nested(Terminal::decode(d, ctx)?, *ctx).map(Terminal::WitnessScriptHash)
            }
            Self::TAG_PUBLIC_KEY => Key::decode(d, ctx).map(Terminal::PublicKey),
            Self::TAG_PUBLIC_KEY_HASH => Key::decode(d, ctx).map(Terminal::PublicKeyHash),
            Self::TAG_WITNESS_PUBLIC_KEY_HASH => {
                Key::decode(d, ctx).map(Terminal::WitnessPublicKeyHash)
            }
            Self::TAG_COMBO => Key::decode(d, ctx).map(Terminal::Combo),
            Self::TAG_MULTISIG => Multikey::decode(d, ctx).map(Terminal::Multisig),
            Self::TAG_SORTED_MULTISIG => Multikey::decode(d, ctx).map(Terminal::SortedMultisig),
            Address::TAG => Address::decode(d, ctx).map(Terminal::Address),
            Self::TAG_RAW_SCRIPT => d.bytes().map(Terminal::RawScript),
            Self::TAG_TAPROOT => nested(Terminal::decode(d, ctx)?, *ctx).map(Terminal::Taproot),
            Self::TAG_COSIGNER => Key::decode(d, ctx).map(Terminal::Cosigner),
            _ => Err(Error::message("unknown script expression tag")),
        }
    }
}

impl<'a, 'b, C> Encode<C> for Terminal<'a, 'b> {
    fn encode<W: Write>(
        &self,
        e: &mut Encoder<W>,
        ctx: &mut C,
    ) -> Result<(), minicbor::encode::Error<W::Error>> {
        match self {
            Terminal::ScriptHash(inner) => {
                e.tag(Self::TAG_SCRIPT_HASH)?;
                inner.encode(e, ctx)?;
            }
            Terminal::WitnessScriptHash(inner) => {
                e.tag(Self::TAG_WITNESS_SCRIPT_HASH)?;
                inner.encode(e, ctx)?;
            }
            Terminal::PublicKey(key) => {
                e.tag(Self::TAG_PUBLIC_KEY)?;
                key.encode(e, ctx)?;
            }
            Terminal::PublicKeyHash(key) => {
                e.tag(Self::TAG_PUBLIC_KEY_HASH)?;
                key.encode(e, ctx)?;
            }
            Terminal::WitnessPublicKeyHash(key) => {
                e.tag(Self::TAG_WITNESS_PUBLIC_KEY_HASH)?;
                key.encode(e, ctx)?;
            }
            Terminal::Combo(key) => {
                e.tag(Self::TAG_COMBO)?;
                key.encode(e, ctx)?;
            }
            Terminal::Multisig(multikey) => {
                e.tag(Self::TAG_MULTISIG)?;
                multikey.encode(e, ctx)?;
            }
            Terminal::SortedMultisig(multikey) => {
                e.tag(Self::TAG_SORTED_MULTISIG)?;
                multikey.encode(e, ctx)?;
            }
            Terminal::Address(address) => {
                e.tag(Address::TAG)?;
                address.encode(e, ctx)?;
            }
            Terminal::RawScript(script) => {
                e.tag(Self::TAG_RAW_SCRIPT)?.bytes(script)?;
            }
            Terminal::Taproot(inner) => {
                e.tag(Self::TAG_TAPROOT)?;
                inner.encode(e, ctx)?;
            }
            Terminal::Cosigner(key) => {
                e.tag(Self::TAG_COSIGNER)?;
                key.encode(e, ctx)?;
            }
        }

        Ok(())
    }
}

/// A key inside a script expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Key<'b> {
    /// An elliptic-curve key.
    ECKey(ECKey<'b>),
    /// A hierarchical-deterministic key.
    HDKey(HDKey<'b>),
}

impl<'b, C> Decode<'b, C> for Key<'b> {
    fn decode(d: &mut Decoder<'b>, ctx: &mut C) -> Result<Self, Error> {
        let tag = d.tag()?;
        match tag {
            ECKey::TAG => ECKey::decode(d, ctx).map(Key::ECKey),
            HDKey::TAG => HDKey::decode(d, ctx).map(Key::HDKey),
            _ => Err(Error::message("expected an eckey or hdkey tag")),
        }
    }
}

impl<'b, C> Encode<C> for Key<'b> {
    fn encode<W: Write>(
        &self,
        e: &mut Encoder<W>,
        ctx: &mut C,
    ) -> Result<(), minicbor::encode::Error<W::Error>> {
        match self {
            Key::ECKey(key) => {
                e.tag(ECKey::TAG)?;
                key.encode(e, ctx)?;
            }
            Key::HDKey(key) => {
                e.tag(HDKey::TAG)?;
                key.encode(e, ctx)?;
            }
        }

        Ok(())
    }
}

/// Threshold multisignature over a set of keys.
#[derive(Debug, Clone, PartialEq)]
pub struct Multikey<'b> {
    /// How many of the keys must sign.
    pub threshold: u32,
    /// The candidate keys.
    pub keys: heapless::Vec<Key<'b>, MAX_MULTIKEY_KEYS>,
}

impl<'b, C> Decode<'b, C> for Multikey<'b> {
    fn decode(d: &mut Decoder<'b>, ctx: &mut C) -> Result<Self, Error> {
        let mut threshold = None;
        let mut keys = None;

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
                1 => threshold = Some(d.u32()?),
                2 => {
                    let mut collected = heapless::Vec::new();
                    let mut items = d.array()?;
                    loop {
                        match items {
                            Some(0) => break,
                            Some(n) => items = Some(n - 1),
                            None => {
                                if d.datatype()? == Type::Break {
                                    break;
                                }
                            }
                        }

                        collected
                            .push(Key::decode(d, ctx)?)
                            .map_err(|_| Error::message("too many multisig keys"))?;
                    }
                    keys = Some(collected);
                }
                _ => return Err(Error::message("unknown map entry")),
            }
        }

        Ok(Self {
            threshold: threshold.ok_or_else(|| Error::message("threshold is missing"))?,
            keys: keys.ok_or_else(|| Error::message("keys are missing"))?,
        })
    }
}

impl<'b, C> Encode<C> for Multikey<'b> {
    fn encode<W: Write>(
        &self,
        e: &mut Encoder<W>,
        ctx: &mut C,
    ) -> Result<(), minicbor::encode::Error<W::Error>> {
        e.map(2)?;
        e.u8(1)?.u32(self.threshold)?;

        e.u8(2)?.array(self.keys.len() as u64)?;
        for key in &self.keys {
            key.encode(e, ctx)?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PUBKEY: [u8; 33] = [
        0x02, 0xc6, 0x04, 0x7f, 0x94, 0x41, 0xed, 0x7d, 0x6d, 0x30, 0x45, 0x40, 0x6e, 0x95,
        0xc0, 0x7c, 0xd8, 0x5c, 0x77, 0x8e, 0x4b, 0x8c, 0xef, 0x3c, 0xa7, 0xab, 0xac, 0x09,
        0xb9, 0x5c, 0x70, 0x9e, 0xe5,
    ];

    #[test]
    fn test_pkh_vector() {
        let arena: TerminalContext<4> = TerminalContext::new();
        let mut cbor = Vec::new();

        let descriptor = Terminal::PublicKeyHash(Key::ECKey(ECKey::public(&PUBKEY)));
        cbor = minicbor::to_vec(&descriptor).unwrap();
        assert_eq!(
            hex::encode(&cbor),
            format!("d90193d90132a1035821{}", hex::encode(PUBKEY))
        );

        let decoded: Terminal =
            minicbor::decode_with(&cbor, &mut &arena).unwrap();
        assert_eq!(decoded, descriptor);
    }

    #[test]
    fn test_nested_sh_wsh_roundtrip() {
        let arena: TerminalContext<4> = TerminalContext::new();
        let decode_arena: TerminalContext<4> = TerminalContext::new();
        let mut cbor = Vec::new();

        let inner = Terminal::PublicKeyHash(Key::ECKey(ECKey::public(&PUBKEY)));
        let wsh = Terminal::WitnessScriptHash(Box::new_in(inner, &arena).ok().unwrap());
        let descriptor = Terminal::ScriptHash(Box::new_in(wsh, &arena).ok().unwrap());

        cbor = minicbor::to_vec(&descriptor).unwrap();
        assert!(cbor.starts_with(&[0xd9, 0x01, 0x90, 0xd9, 0x01, 0x91]));

        let decoded: Terminal =
            minicbor::decode_with(&cbor, &mut &decode_arena).unwrap();
        assert_eq!(decoded, descriptor);
    }

    #[test]
    fn test_multisig_roundtrip() {
        let arena: TerminalContext<4> = TerminalContext::new();
        let mut cbor = Vec::new();

        let mut keys = heapless::Vec::new();
        keys.push(Key::ECKey(ECKey::public(&PUBKEY))).unwrap();
        keys.push(Key::ECKey(ECKey::public(&PUBKEY))).unwrap();

        let descriptor = Terminal::Multisig(Multikey { threshold: 2, keys });
        cbor = minicbor::to_vec(&descriptor).unwrap();

        let decoded: Terminal =
            minicbor::decode_with(&cbor, &mut &arena).unwrap();
        assert_eq!(decoded, descriptor);
    }

    #[test]
    fn test_depth_bound() {
        // sh(sh(sh(pkh(…)))) into a two-slot arena.
        let mut cbor = vec![];
        for _ in 0..3 {
            cbor.extend_from_slice(&[0xd9, 0x01, 0x90]);
        }
        cbor.extend_from_slice(&[0xd9, 0x01, 0x93, 0xd9, 0x01, 0x32, 0xa1, 0x03, 0x58, 0x21]);
        cbor.extend_from_slice(&PUBKEY);

        let arena: TerminalContext<2> = TerminalContext::new();
        assert!(minicbor::decode_with::<_, Terminal>(&cbor, &mut &arena).is_err());
    }

    #[test]
    fn test_unknown_tag_is_rejected() {
        let arena: TerminalContext<2> = TerminalContext::new();
        // tag 500
        assert!(
            minicbor::decode_with::<_, Terminal>(&[0xd9, 0x01, 0xf4, 0x00], &mut &arena).is_err()
        );
    }
}
