use std::path::PathBuf;

use crate::compression::CodecError;

pub type Result<T> = std::result::Result<T, Error>;

/// Structural problems found while decoding the header or the directory.
///
/// These are fatal at open time: an archive that produces one is never handed
/// out as a reader.
#[derive(Debug, thiserror::Error)]
pub enum FormatError {
    #[error("Magic bytes invalid (found {0:02x?}). Is this a PAK archive?")]
    BadMagic([u8; 4]),

    #[error("Unsupported archive version {major}.{minor}")]
    UnsupportedVersion { major: u16, minor: u16 },

    #[error("Archive ends inside the {what} at {offset:#x}")]
    Truncated { offset: u64, what: &'static str },

    #[error("Malformed directory record at {offset:#x}: {reason}")]
    MalformedRecord { offset: u64, reason: &'static str },

    #[error("Unrecognized compression flags {flags:#x} for entry `{name}`")]
    UnknownCompression { name: String, flags: u32 },

    #[error("Directory continuation chain revisits offset {0:#x}")]
    DirectoryCycle(u64),

    #[error("Entry name at {offset:#x} is not valid UTF-16")]
    InvalidName { offset: u64 },
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Failed to open archive. Path: '{}'", .path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid archive structure")]
    Format(#[from] FormatError),

    #[error("Entry `{name}` is corrupt")]
    CorruptEntry {
        name: String,
        #[source]
        source: CodecError,
    },

    #[error("Reading from the archive storage failed")]
    Io(#[from] std::io::Error),

    #[error("Archive has been closed")]
    Closed,
}

impl Error {
    /// True for failures confined to a single entry; the archive stays usable.
    pub fn is_corrupt_entry(&self) -> bool {
        matches!(self, Error::CorruptEntry { .. })
    }
}
