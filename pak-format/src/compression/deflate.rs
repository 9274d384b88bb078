//! Legacy codec: a bare DEFLATE bitstream with no properties.

use std::io::Cursor;

use comde::deflate::{DeflateCompressor, DeflateDecompressor};
use comde::{Compressor, Decompressor};

use super::{Codec, CodecError, Encoded};

#[derive(Debug, Default, Clone, Copy)]
pub struct DeflateCodec;

impl Codec for DeflateCodec {
    fn name(&self) -> &'static str {
        "DEFLATE"
    }

    fn compress(&self, input: &[u8]) -> std::io::Result<Encoded> {
        let mut writer = Cursor::new(Vec::with_capacity(input.len() / 2));
        DeflateCompressor.compress(&mut writer, &mut Cursor::new(input))?;

        Ok(Encoded {
            properties: Vec::new(),
            payload: writer.into_inner(),
        })
    }

    fn decompress(
        &self,
        properties: &[u8],
        payload: &[u8],
        expected_len: u64,
    ) -> Result<Vec<u8>, CodecError> {
        if !properties.is_empty() {
            return Err(CodecError::InvalidProperties(
                "DEFLATE streams take no properties",
            ));
        }

        let mut out = Vec::with_capacity(expected_len as usize);
        DeflateDecompressor
            .copy(Cursor::new(payload), &mut out)
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
