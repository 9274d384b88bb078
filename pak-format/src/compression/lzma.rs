//! Modern codec: LZMA1 via xz2.
//!
//! liblzma only speaks LZMA1 through the `.lzma` ("alone") container, whose
//! 13-byte header is the 5 property bytes followed by a 64-bit uncompressed
//! size. The archive stores the properties in the mini-header and the size in
//! its own length field, so the container header is stripped on compression
//! and rebuilt on decompression.

use std::io::{Read, Write};

use xz2::read::XzDecoder;
use xz2::stream::{LzmaOptions, Stream};
use xz2::write::XzEncoder;

use super::{Codec, CodecError, Encoded};

/// lc/lp/pb byte plus the 32-bit dictionary size.
const PROPERTIES_SIZE: usize = 5;
const ALONE_HEADER_SIZE: usize = PROPERTIES_SIZE + 8;
/// Uncompressed size marker for "unknown, terminated by end-of-payload marker".
const UNKNOWN_SIZE: u64 = u64::MAX;

#[derive(Debug, Clone, Copy)]
pub struct LzmaCodec {
    preset: u32,
}

impl LzmaCodec {
    /// Creates a codec with the specified compression preset (0-9).
    pub fn new(preset: u32) -> LzmaCodec {
        LzmaCodec {
            preset: preset.min(9),
        }
    }

    pub fn preset(&self) -> u32 {
        self.preset
    }
}

impl Default for LzmaCodec {
    fn default() -> Self {
        LzmaCodec::new(6)
    }
}

fn lzma_error(e: xz2::stream::Error) -> std::io::Error {
    std::io::Error::new(std::io::ErrorKind::Other, e)
}

impl Codec for LzmaCodec {
    fn name(&self) -> &'static str {
        "LZMA"
    }

    fn compress(&self, input: &[u8]) -> std::io::Result<Encoded> {
        let options = LzmaOptions::new_preset(self.preset).map_err(lzma_error)?;
        let stream = Stream::new_lzma_encoder(&options).map_err(lzma_error)?;

        let mut encoder = XzEncoder::new_stream(Vec::with_capacity(input.len() / 2), stream);
        encoder.write_all(input)?;
        let mut out = encoder.finish()?;

        if out.len() < ALONE_HEADER_SIZE {
            return Err(std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                "LZMA encoder produced no header",
            ));
        }

        let payload = out.split_off(ALONE_HEADER_SIZE);
        out.truncate(PROPERTIES_SIZE);

        Ok(Encoded {
            properties: out,
            payload,
        })
    }

    fn decompress(
        &self,
        properties: &[u8],
        payload: &[u8],
        expected_len: u64,
    ) -> Result<Vec<u8>, CodecError> {
        if properties.len() != PROPERTIES_SIZE {
            return Err(CodecError::InvalidProperties(
                "LZMA requires exactly 5 property bytes",
            ));
        }

        let mut header = [0u8; ALONE_HEADER_SIZE];
        header[..PROPERTIES_SIZE].copy_from_slice(properties);
        header[PROPERTIES_SIZE..].copy_from_slice(&UNKNOWN_SIZE.to_le_bytes());

        let stream = Stream::new_lzma_decoder(u64::MAX)
            .map_err(|e| CodecError::Stream(lzma_error(e)))?;
        let decoder = XzDecoder::new_stream((&header[..]).chain(payload), stream);

        // One byte of slack so an overlong stream shows up as a mismatch
        // instead of being cut to size.
        let mut out = Vec::with_capacity(expected_len as usize);
        decoder
            .take(expected_len.saturating_add(1))
            .read_to_end(&mut out)
            .map_err(CodecError::from_stream)?;

        if out.len() as u64 != expected_len {
            return Err(CodecError::LengthMismatch {
                expected: expected_len,
                actual: out.len() as u64,
            });
        }

        Ok(out)
    }
}
