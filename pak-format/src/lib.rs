//! Reader and writer for PAK archives: a single seekable file holding many
//! named entries, each stored raw or compressed with DEFLATE or LZMA.
//!
//! Reads go through a [`PakReader`], which keeps decompressed entries in an
//! idle-evicted cache shared by every thread using it.

mod cache;
mod compression;
mod de;
mod encode;
mod error;
mod file;
mod header;
mod index;
pub mod path;
mod record;
#[cfg(feature = "writer")]
mod ser;
mod storage;

pub use cache::{Clock, SystemClock, DEFAULT_IDLE_THRESHOLD};
pub use compression::{
    constants, decode, Codec, CodecError, Codecs, Compression, DeflateCodec, Encoded, LzmaCodec,
};
pub use encode::{
    CompressionPolicy, EncodedEntry, Encoder, DEFAULT_MIN_SAVINGS, INCOMPRESSIBLE_EXTENSIONS,
};
pub use error::{Error, FormatError, Result};
pub use file::reader::{PakReader, ReaderOptions};
#[cfg(feature = "writer")]
pub use file::writer::{PakWriter, WriterOptions};
pub use header::{PakHeader, Version, FLAG_PATCHABLE};
pub use path::PakPath;
pub use record::Entry;
pub use storage::Source;
