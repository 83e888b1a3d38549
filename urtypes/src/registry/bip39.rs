// SPDX-FileCopyrightText: © 2024 QRLink Contributors <dev@qrlink.dev>
// SPDX-License-Identifier: MIT

use minicbor::{
    data::Type, decode::Error, encode::Write, Decode, Decoder, Encode, Encoder,
};

/// Most words a [`Bip39`] phrase can carry.
pub const MAX_BIP39_WORDS: usize = 24;

/// A BIP-39 mnemonic phrase.
///
/// Carried as a plain map, with no outer tag: `{1: [word, …], 2: lang?}`.
#[doc(alias("crypto-bip39"))]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Bip39<'a> {
    /// The phrase, in order.
    pub words: heapless::Vec<&'a str, MAX_BIP39_WORDS>,
    /// Wordlist language code, such as `en`.
    pub lang: Option<&'a str>,
}

impl<'a> Bip39<'a> {
    /// Construct a phrase from a word slice.
    ///
    /// Returns `None` when there are more than [`MAX_BIP39_WORDS`] words.
    #[must_use]
    pub fn new(words: &[&'a str], lang: Option<&'a str>) -> Option<Self> {
        let mut phrase = heapless::Vec::new();
        for &word in words {
            phrase.push(word).ok()?;
        }

        Some(Self {
            words: phrase,
            lang,
        })
    }
}

impl<'b, C> Decode<'b, C> for Bip39<'b> {
    fn decode(d: &mut Decoder<'b>, _ctx: &mut C) -> Result<Self, Error> {
        let mut words = None;
        let mut lang = None;

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
                1 => words = Some(decode_words(d)?),
                2 => lang = Some(d.str()?),
                _ => return Err(Error::message("unknown map entry")),
            }
        }

        Ok(Self {
            words: words.ok_or_else(|| Error::message("words are missing"))?,
            lang,
        })
    }
}

fn decode_words<'b>(
    d: &mut Decoder<'b>,
) -> Result<heapless::Vec<&'b str, MAX_BIP39_WORDS>, Error> {
    let mut words = heapless::Vec::new();

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

        words
            .push(d.str()?)
            .map_err(|_| Error::message("phrase has too many words"))?;
    }

    Ok(words)
}

impl<'a, C> Encode<C> for Bip39<'a> {
    fn encode<W: Write>(
        &self,
        e: &mut Encoder<W>,
        _ctx: &mut C,
    ) -> Result<(), minicbor::encode::Error<W::Error>> {
        e.map(1 + u64::from(self.lang.is_some()))?;

        e.u8(1)?.array(self.words.len() as u64)?;
        for word in &self.words {
            e.str(word)?;
        }

        if let Some(lang) = self.lang {
            e.u8(2)?.str(lang)?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PHRASE: [&str; 12] = [
        "shield", "group", "erode", "awake", "lock", "sausage", "cash", "glare", "wave",
        "crew", "flame", "glove",
    ];

    const PHRASE_CBOR: &str = "a2018c66736869656c646567726f75706565726f6465656177616b65646c6f\
636b6773617573616765646361736865676c6172656477617665646372657765666c616d6565676c6f76650262656e";

    #[test]
    fn test_twelve_word_vector() {
        let phrase = Bip39::new(&PHRASE, Some("en")).unwrap();
        let cbor = minicbor::to_vec(&phrase).unwrap();
        assert_eq!(hex::encode(&cbor), PHRASE_CBOR);

        let decoded: Bip39 = minicbor::decode(&cbor).unwrap();
        assert_eq!(decoded, phrase);
        assert_eq!(decoded.words.len(), 12);
        assert_eq!(decoded.words[0], "shield");
        assert_eq!(decoded.words[11], "glove");
        assert_eq!(decoded.lang, Some("en"));
    }

    #[test]
    fn test_lang_is_optional() {
        let phrase = Bip39::new(&PHRASE[..3], None).unwrap();
        let cbor = minicbor::to_vec(&phrase).unwrap();
        let decoded: Bip39 = minicbor::decode(&cbor).unwrap();
        assert_eq!(decoded.lang, None);
        assert_eq!(decoded.words.len(), 3);
    }

    #[test]
    fn test_key_order_is_free() {
        // {2: "en", 1: ["zoo"]}
        let cbor = [
            0xa2, 0x02, 0x62, 0x65, 0x6e, 0x01, 0x81, 0x63, 0x7a, 0x6f, 0x6f,
        ];
        let decoded: Bip39 = minicbor::decode(&cbor).unwrap();
        assert_eq!(decoded.words[0], "zoo");
        assert_eq!(decoded.lang, Some("en"));
    }

    #[test]
    fn test_missing_words_are_rejected() {
        assert!(minicbor::decode::<Bip39>(&[0xa1, 0x02, 0x62, 0x65, 0x6e]).is_err());
    }
}
