//! Per-entry compression: the `Codec` capability, its two providers, and the
//! dispatch from an entry's compression variant to the right decoder.

use std::fmt;
use std::sync::Arc;

use byteorder::{ByteOrder, LittleEndian};

mod deflate;
mod lzma;

pub use self::deflate::DeflateCodec;
pub use self::lzma::LzmaCodec;

pub mod constants {
    /// Entry flag selecting the legacy (DEFLATE) codec.
    pub const FLAG_LEGACY: u32 = 0x1;
    /// Entry flag selecting the modern (LZMA) codec.
    pub const FLAG_MODERN: u32 = 0x2;
    /// Bits that select a codec. Anything outside this mask is carried but ignored.
    pub const CODEC_MASK: u32 = FLAG_LEGACY | FLAG_MODERN;

    /// Size of the mini-header in front of modern payloads.
    pub const MODERN_HEADER_SIZE: usize = 8;
}

use self::constants::*;

#[derive(Clone, Copy, Eq, PartialEq, Hash, Default)]
pub enum Compression {
    #[default]
    Stored,
    Legacy,
    Modern,
}

impl Compression {
    /// Resolves the codec bits of an entry's flags. Both codec bits set is not a
    /// valid combination.
    pub const fn from_flags(flags: u32) -> Option<Compression> {
        match flags & CODEC_MASK {
            0 => Some(Compression::Stored),
            FLAG_LEGACY => Some(Compression::Legacy),
            FLAG_MODERN => Some(Compression::Modern),
            _ => None,
        }
    }

    pub const fn flags(self) -> u32 {
        match self {
            Compression::Stored => 0,
            Compression::Legacy => FLAG_LEGACY,
            Compression::Modern => FLAG_MODERN,
        }
    }

    pub const fn is_compressed(self) -> bool {
        !matches!(self, Compression::Stored)
    }
}

impl fmt::Display for Compression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Compression::Stored => "stored",
            Compression::Legacy => "DEFLATE",
            Compression::Modern => "LZMA",
        };

        write!(f, "{}", s)
    }
}

impl fmt::Debug for Compression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    #[error("compressed data ended prematurely")]
    Truncated,

    #[error("decoded {actual} bytes, expected {expected}")]
    LengthMismatch { expected: u64, actual: u64 },

    #[error("invalid codec properties: {0}")]
    InvalidProperties(&'static str),

    #[error("codec stream error")]
    Stream(#[source] std::io::Error),
}

impl CodecError {
    pub(crate) fn from_stream(e: std::io::Error) -> CodecError {
        match e.kind() {
            std::io::ErrorKind::UnexpectedEof => CodecError::Truncated,
            _ => CodecError::Stream(e),
        }
    }
}

/// Output of a single compression run.
#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub struct Encoded {
    /// Codec parameters the decoder needs. Empty for codecs without any.
    pub properties: Vec<u8>,
    pub payload: Vec<u8>,
}

/// A buffer-to-buffer compression primitive.
pub trait Codec: Send + Sync {
    fn name(&self) -> &'static str;

    fn compress(&self, input: &[u8]) -> std::io::Result<Encoded>;

    /// Decodes `payload` to exactly `expected_len` bytes, or fails.
    fn decompress(
        &self,
        properties: &[u8],
        payload: &[u8],
        expected_len: u64,
    ) -> Result<Vec<u8>, CodecError>;
}

/// The pair of codec providers an archive is read or written with.
#[derive(Clone)]
pub struct Codecs {
    pub legacy: Arc<dyn Codec>,
    pub modern: Arc<dyn Codec>,
}

impl Default for Codecs {
    fn default() -> Self {
        Codecs {
            legacy: Arc::new(DeflateCodec::default()),
            modern: Arc::new(LzmaCodec::default()),
        }
    }
}

impl fmt::Debug for Codecs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Codecs")
            .field("legacy", &self.legacy.name())
            .field("modern", &self.modern.name())
            .finish()
    }
}

/// The self-describing prefix of a modern payload.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub(crate) struct ModernHeader {
    pub(crate) decompressed_length: u32,
    pub(crate) properties_length: u32,
}

impl ModernHeader {
    pub(crate) fn parse(data: &[u8]) -> Result<ModernHeader, CodecError> {
        if data.len() < MODERN_HEADER_SIZE {
            return Err(CodecError::Truncated);
        }

        Ok(ModernHeader {
            decompressed_length: LittleEndian::read_u32(&data[0..4]),
            properties_length: LittleEndian::read_u32(&data[4..8]),
        })
    }
}

/// Lays out a modern record: mini-header, properties, payload.
pub(crate) fn modern_record(decompressed_length: u32, encoded: &Encoded) -> Vec<u8> {
    let mut buf =
        Vec::with_capacity(MODERN_HEADER_SIZE + encoded.properties.len() + encoded.payload.len());
    buf.extend_from_slice(&decompressed_length.to_le_bytes());
    buf.extend_from_slice(&(encoded.properties.len() as u32).to_le_bytes());
    buf.extend_from_slice(&encoded.properties);
    buf.extend_from_slice(&encoded.payload);
    buf
}

/// Turns the stored bytes of an entry back into its logical contents.
///
/// `logical_length` is the directory's recorded size; it is only consulted for
/// legacy entries, since modern payloads carry their own length.
pub fn decode(
    codecs: &Codecs,
    compression: Compression,
    stored: &[u8],
    logical_length: u64,
) -> Result<Vec<u8>, CodecError> {
    match compression {
        Compression::Stored => {
            if stored.len() as u64 != logical_length {
                return Err(CodecError::LengthMismatch {
                    expected: logical_length,
                    actual: stored.len() as u64,
                });
            }
            Ok(stored.to_vec())
        }
        Compression::Legacy => codecs.legacy.decompress(&[], stored, logical_length),
        Compression::Modern => {
            let header = ModernHeader::parse(stored)?;
            let props_end = MODERN_HEADER_SIZE
                .checked_add(header.properties_length as usize)
                .filter(|end| *end <= stored.len())
                .ok_or(CodecError::Truncated)?;

            codecs.modern.decompress(
                &stored[MODERN_HEADER_SIZE..props_end],
                &stored[props_end..],
                header.decompressed_length as u64,
            )
        }
    }
}
