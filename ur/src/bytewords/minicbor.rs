// SPDX-FileCopyrightText: © 2024 QRLink Contributors <dev@qrlink.dev>
// SPDX-License-Identifier: MIT

//! [`minicbor`] writer that emits bytewords.
//!
//! [`Writer`] lets `minicbor` serialize straight into a
//! [`formatter`](fmt::Formatter) as uppercase minimal bytewords while a
//! CRC-32 digest runs alongside, so a whole multi-part Uniform Resource is
//! formatted without an intermediate buffer.

use core::fmt;

use crate::{bytewords::constants::MINIMALS_UPPER, CRC32};

/// Bytewords-emitting `minicbor` writer.
pub struct Writer<W> {
    writer: W,
    digest: crc::Digest<'static, u32>,
}

impl<W> Writer<W>
where
    W: fmt::Write,
{
    /// Construct a new [`Writer`].
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            digest: CRC32.digest(),
        }
    }

    /// Append the checksum words and hand the inner writer back.
    pub fn finish(mut self) -> Result<W, fmt::Error> {
        for b in self.digest.finalize().to_be_bytes() {
            self.writer.write_str(MINIMALS_UPPER[usize::from(b)])?;
        }
        Ok(self.writer)
    }
}

impl<W> minicbor::encode::Write for Writer<W>
where
    W: fmt::Write,
{
    type Error = fmt::Error;

    fn write_all(&mut self, buf: &[u8]) -> Result<(), Self::Error> {
        for &b in buf {
            self.writer.write_str(MINIMALS_UPPER[usize::from(b)])?;
        }
        self.digest.update(buf);
        Ok(())
    }
}

#[cfg(test)]
#[cfg(feature = "alloc")]
mod tests {
    use super::*;

    #[test]
    fn test_writer_appends_checksum() {
        let mut out = alloc::string::String::new();
        let mut writer = Writer::new(&mut out);

        minicbor::encode::Write::write_all(&mut writer, &[0, 1, 2, 128, 255]).unwrap();
        writer.finish().unwrap();

        assert_eq!(out, "AEADAOLAZMJENDEOTI");
    }
}
