// SPDX-FileCopyrightText: © 2024 QRLink Contributors <dev@qrlink.dev>
// SPDX-License-Identifier: MIT

//! Uniform Resource encoder.

use core::fmt;

use crate::{
    fountain,
    ur::{is_ur_type, ParseError, UR},
};

/// A UR encoder using [`alloc`] collection types.
#[cfg(feature = "alloc")]
pub type Encoder<'a, 'b> = BaseEncoder<'a, 'b, fountain::encoder::Alloc>;

#[cfg(feature = "alloc")]
impl<'a, 'b> Encoder<'a, 'b> {
    /// Construct a new [`Encoder`].
    pub const fn new() -> Self {
        Self {
            ur_type: None,
            message: None,
            fountain: fountain::encoder::Encoder::new(),
        }
    }
}

/// A UR encoder using fixed-capacity collection types.
pub type HeaplessEncoder<'a, 'b, const MAX_FRAGMENT_LEN: usize, const MAX_SEQUENCE_COUNT: usize> =
    BaseEncoder<'a, 'b, fountain::encoder::Heapless<MAX_FRAGMENT_LEN, MAX_SEQUENCE_COUNT>>;

impl<'a, 'b, const MAX_FRAGMENT_LEN: usize, const MAX_SEQUENCE_COUNT: usize>
    HeaplessEncoder<'a, 'b, MAX_FRAGMENT_LEN, MAX_SEQUENCE_COUNT>
{
    /// Construct a new [`HeaplessEncoder`].
    pub const fn new() -> Self {
        Self {
            ur_type: None,
            message: None,
            fountain: fountain::encoder::HeaplessEncoder::new(),
        }
    }
}

/// A Uniform Resource encoder over a fountain encoding.
///
/// For a payload that fits one fragment every emitted UR is the same
/// single-part resource; larger payloads yield the unbounded multi-part
/// stream.
///
/// # Examples
///
/// See the [`crate`] documentation for an example.
pub struct BaseEncoder<'a, 'b, T: fountain::encoder::Types> {
    ur_type: Option<&'a str>,
    message: Option<&'b [u8]>,
    fountain: fountain::encoder::BaseEncoder<'b, T>,
}

impl<'a, 'b, T: fountain::encoder::Types> BaseEncoder<'a, 'b, T> {
    /// Start encoding `message` as resources of type `ur_type`.
    ///
    /// # Errors
    ///
    /// Fails when the type is malformed, the message is empty, or no
    /// fragment length satisfies `max_fragment_length`.
    pub fn start(
        &mut self,
        ur_type: &'a str,
        message: &'b [u8],
        max_fragment_length: usize,
    ) -> Result<(), Error> {
        if !is_ur_type(ur_type) {
            return Err(Error::InvalidType(ParseError::InvalidType));
        }

        self.fountain.start(message, max_fragment_length)?;
        self.ur_type = Some(ur_type);
        self.message = Some(message);
        Ok(())
    }

    /// The sequence number of the most recently emitted part.
    #[must_use]
    #[inline]
    pub fn current_sequence(&self) -> u32 {
        self.fountain.current_sequence()
    }

    /// The number of fragments the message was split into.
    #[must_use]
    #[inline]
    pub fn sequence_count(&self) -> u32 {
        self.fountain.sequence_count()
    }

    /// Whether the message fits in a single resource string.
    #[must_use]
    #[inline]
    pub fn is_single_part(&self) -> bool {
        self.fountain.is_single_part()
    }

    /// The next resource to display.
    ///
    /// # Panics
    ///
    /// Panics when called before a successful [`start`](Self::start).
    pub fn next_part(&mut self) -> UR<'_> {
        let ur_type = self.ur_type.expect("encoder is not started");

        if self.fountain.is_single_part() {
            UR::SinglePartPayload {
                ur_type,
                payload: self.message.expect("encoder is not started"),
            }
        } else {
            UR::MultiPartPayload {
                ur_type,
                part: self.fountain.next_part(),
            }
        }
    }
}

/// Errors that can happen when starting a UR encoder.
#[derive(Debug, PartialEq, Eq)]
pub enum Error {
    /// The UR type is malformed.
    InvalidType(ParseError),
    /// The fountain encoder rejected the message.
    Fountain(fountain::encoder::Error),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::InvalidType(e) => write!(f, "{e}"),
            Error::Fountain(e) => write!(f, "{e}"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for Error {}

impl From<fountain::encoder::Error> for Error {
    fn from(e: fountain::encoder::Error) -> Self {
        Self::Fountain(e)
    }
}

#[cfg(test)]
#[cfg(feature = "alloc")]
mod tests {
    use super::*;
    use crate::ur::tests::make_message_ur;

    #[test]
    fn test_multi_part_stream() {
        const EXPECTED: &[&str] = &[
            "UR:BYTES/1-9/LPADASCFADAXCYWENBPLJKHDCAHKADAEMEJTSWHHYLKEPMYKHHTSYTSNOYOYAXAEDSUTTYDMMHHPKTPMSRJTDKGSLPGH",
            "UR:BYTES/2-9/LPAOASCFADAXCYWENBPLJKHDCAGWDPFNSBOXGWLBAAWZUEFYWKDPLRSRJYNBVYGABWJLDAPFCSGMGHHKHSTLRDCXAEFZ",
            "UR:BYTES/3-9/LPAXASCFADAXCYWENBPLJKHDCAHELBKNLKUEJNBADMSSFHFRDPSBIEGECPASVSSOVLGEYKSSJYKKLRONVSJKSOPDZMOL",
            "UR:BYTES/4-9/LPAAASCFADAXCYWENBPLJKHDCASOTKHEMTHYDAWYDTAXNEURLKOSGWCEKONERTKBRLWMPLSSJTAMMDPLOLSBRDZCRTAS",
            "UR:BYTES/5-9/LPAHASCFADAXCYWENBPLJKHDCATBBDFMSSRKZMCWNEZELENNJPFZBGMUKTRHTEJSCKTELGFPDLRKFYFWDAJLDEJOKBWF",
            "UR:BYTES/6-9/LPAMASCFADAXCYWENBPLJKHDCACKJLHKHYBSSKLBWEFECTPFNBBECTRLJECTPAVYROLKZCZCPKMWIDMWOXKILGHDSOWP",
            "UR:BYTES/7-9/LPATASCFADAXCYWENBPLJKHDCAVSZMWNJKWTCLRTVAYNHPAHRTOXMWVWATMEDIBKAEGDOSFTVANDIODAGDHTHTRLNNHY",
            "UR:BYTES/8-9/LPAYASCFADAXCYWENBPLJKHDCADMSPONKKBBHGSOLTJNTEGEPMTTMOONFTNBUOIYREHFRTSABZSTTORODKLUBBUYAETK",
            "UR:BYTES/9-9/LPASASCFADAXCYWENBPLJKHDCAJSKECPMDCKIHDYHPHFOTJOJTFMLNWMADSPAXRKYTBZTPBAUOTBGTGTAEAEVTGAVTNY",
            "UR:BYTES/10-9/LPBKASCFADAXCYWENBPLJKHDCAHKADAEMEJTSWHHYLKEPMYKHHTSYTSNOYOYAXAEDSUTTYDMMHHPKTPMSRJTWDKIPLZS",
            "UR:BYTES/11-9/LPBDASCFADAXCYWENBPLJKHDCAHELBKNLKUEJNBADMSSFHFRDPSBIEGECPASVSSOVLGEYKSSJYKKLRONVSJKVETIIAPK",
            "UR:BYTES/12-9/LPBNASCFADAXCYWENBPLJKHDCARLLALUZMDMGSTOSPEYIEFMWEJLWTPEDAMKTKSRVLCYGMZEMOVOVLLARODTMTBNPTRS",
            "UR:BYTES/13-9/LPBTASCFADAXCYWENBPLJKHDCAMTKGTPKNGHCHCHYKETWSVWGWFDHPGMGTYLCTOTZOPDRPAYOSCHCMHPLFFZIACHRFGD",
            "UR:BYTES/14-9/LPBAASCFADAXCYWENBPLJKHDCAPAZEWNVONNVDNSBYLEYNWTNSJKJNDEOLDYDKBKDSLGJKBBKORTBELOMUEEKGVSTEGT",
            "UR:BYTES/15-9/LPBSASCFADAXCYWENBPLJKHDCAYNMHPDDPZMVERSBDQDFYREHNQZLUGMJZMNMTWMROUOHTSTGSBSAHPAWKDITKCKYNWT",
            "UR:BYTES/16-9/LPBEASCFADAXCYWENBPLJKHDCAWYGEKOBAMWTLIHSNPALNSGHENSKKIYNTHDZOTSIMTOJETPRSTTMUKIRLRSBTAMJTPD",
            "UR:BYTES/17-9/LPBYASCFADAXCYWENBPLJKHDCAMKLGFTAXYKPEWYRTQZHYDNTPNYTYISINCXMHTBCEAYKOLDUORTOTIAIAIAFHIAOYCE",
            "UR:BYTES/18-9/LPBGASCFADAXCYWENBPLJKHDCAHKADAEMEJTSWHHYLKEPMYKHHTSYTSNOYOYAXAEDSUTTYDMMHHPKTPMSRJTNTWKBKWY",
            "UR:BYTES/19-9/LPBWASCFADAXCYWENBPLJKHDCADEKICPAAJOOTJZPSDRBALPEYWLLBDSNBINAERKURSPBNCXGSLGFTVTSRJTKSPLCPEO",
            "UR:BYTES/20-9/LPBBASCFADAXCYWENBPLJKHDCAYAPMRLEELEAXPASFRTRDKNCFFWJYJZGYETDMLEWTKPKTGLLEPFRLTATAZTKSMHKBOT",
        ];

        let message = make_message_ur(256, "Wolf");

        fn run<'a, T: fountain::encoder::Types>(
            encoder: &mut BaseEncoder<'static, 'a, T>,
            message: &'a [u8],
        ) {
            encoder.start("bytes", message, 30).unwrap();
            assert_eq!(encoder.sequence_count(), 9);
            assert!(!encoder.is_single_part());

            for (index, &expected) in EXPECTED.iter().enumerate() {
                assert_eq!(encoder.current_sequence(), index as u32);
                assert_eq!(encoder.next_part().to_string(), expected);
            }
        }

        let mut heapless_encoder: HeaplessEncoder<'_, '_, 30, 16> = HeaplessEncoder::new();
        let mut encoder = Encoder::new();

        run(&mut heapless_encoder, &message);
        run(&mut encoder, &message);
    }

    #[test]
    fn test_single_part_is_stable() {
        let message = make_message_ur(20, "Wolf");
        let mut encoder = Encoder::new();
        encoder.start("bytes", &message, 100).unwrap();
        assert!(encoder.is_single_part());

        let first = encoder.next_part().to_string();
        let second = encoder.next_part().to_string();
        assert_eq!(first, second);
        assert!(first.starts_with("UR:BYTES/"));
        assert_eq!(first.matches('/').count(), 1);
    }

    #[test]
    fn test_start_rejects_bad_type() {
        let mut encoder = Encoder::new();
        assert_eq!(
            encoder.start("байты", b"data", 10),
            Err(Error::InvalidType(ParseError::InvalidType))
        );
        assert!(matches!(
            encoder.start("bytes", b"", 10),
            Err(Error::Fountain(fountain::encoder::Error::EmptyMessage))
        ));
    }
}
