use crate::compression::Compression;
use crate::error::FormatError;

/// One file's directory record.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Entry {
    /// The name as written in the directory, original case preserved. Folders
    /// are delimited by `\`.
    pub(crate) name: String,

    /// Raw flag bits from the directory record.
    pub(crate) flags: u32,

    /// The codec resolved from `flags` when the entry was built.
    pub(crate) compression: Compression,

    /// Absolute position of the stored bytes in the archive.
    pub(crate) offset: u64,

    /// For stored and legacy entries, the logical size. For modern entries,
    /// the size of the whole stored record including its mini-header.
    pub(crate) length: u32,
}

impl Entry {
    /// Builds an entry, rejecting codec flag combinations the reader cannot
    /// dispatch.
    pub fn new(name: String, flags: u32, offset: u64, length: u32) -> Result<Entry, FormatError> {
        let compression = Compression::from_flags(flags)
            .ok_or_else(|| FormatError::UnknownCompression {
                name: name.clone(),
                flags,
            })?;

        Ok(Entry {
            name,
            flags,
            compression,
            offset,
            length,
        })
    }

    #[inline(always)]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline(always)]
    pub fn flags(&self) -> u32 {
        self.flags
    }

    #[inline(always)]
    pub fn compression(&self) -> Compression {
        self.compression
    }

    #[inline(always)]
    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// The stored length field exactly as the directory records it.
    #[inline(always)]
    pub fn stored_length(&self) -> u32 {
        self.length
    }
}
