use std::fmt;

use crate::error::FormatError;

// Make some attempt to not accidentally load plain text files,
// and also make it break almost immediately in any UTF-8 compliant text parser.
pub(crate) const MAGIC_BYTES: &[u8; 4] = b"\xffPAK";

/// Header flag: the archive was opened for patching when it was last written.
pub const FLAG_PATCHABLE: u32 = 0x1;

#[derive(Debug, Clone, Copy, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct Version(u32);

impl Version {
    /// First generation: 32-bit storage offsets in directory records.
    pub const V1: Version = Version::new(1, 0);
    /// Second generation: 64-bit storage offsets in directory records.
    pub const V2: Version = Version::new(2, 0);

    pub const MIN_SUPPORTED: Version = Version::V1;
    pub const MAX_SUPPORTED: Version = Version::new(2, u16::MAX);

    pub const fn new(major: u16, minor: u16) -> Version {
        Version(((major as u32) << 16) | minor as u32)
    }

    pub const fn from_raw(raw: u32) -> Version {
        Version(raw)
    }

    pub const fn raw(self) -> u32 {
        self.0
    }

    pub const fn major(self) -> u16 {
        (self.0 >> 16) as u16
    }

    pub const fn minor(self) -> u16 {
        (self.0 & 0xffff) as u16
    }

    /// Whether directory records carry 64-bit storage offsets.
    pub const fn has_wide_offsets(self) -> bool {
        self.0 >= Version::V2.0
    }

    pub fn is_supported(self) -> bool {
        (Version::MIN_SUPPORTED..=Version::MAX_SUPPORTED).contains(&self)
    }
}

impl Default for Version {
    fn default() -> Self {
        Version::V2
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major(), self.minor())
    }
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct PakHeader {
    pub(crate) magic_bytes: [u8; 4],
    pub(crate) version: Version,
    pub(crate) flags: u32,
    pub(crate) directory: u32,
}

impl PakHeader {
    pub const SIZE: usize = 16;

    pub(crate) fn new(version: Version, flags: u32, directory: u32) -> PakHeader {
        PakHeader {
            magic_bytes: *MAGIC_BYTES,
            version,
            flags,
            directory,
        }
    }

    /// Decodes and checks the fixed header from its 16 raw bytes.
    pub(crate) fn parse(buf: &[u8; PakHeader::SIZE]) -> Result<PakHeader, FormatError> {
        use byteorder::{ByteOrder, LittleEndian};

        let mut magic_bytes = [0u8; 4];
        magic_bytes.copy_from_slice(&buf[0..4]);

        if &magic_bytes != MAGIC_BYTES {
            return Err(FormatError::BadMagic(magic_bytes));
        }

        let version = Version::from_raw(LittleEndian::read_u32(&buf[4..8]));
        if !version.is_supported() {
            return Err(FormatError::UnsupportedVersion {
                major: version.major(),
                minor: version.minor(),
            });
        }

        Ok(PakHeader {
            magic_bytes,
            version,
            flags: LittleEndian::read_u32(&buf[8..12]),
            directory: LittleEndian::read_u32(&buf[12..16]),
        })
    }

    #[inline(always)]
    pub fn version(&self) -> Version {
        self.version
    }

    #[inline(always)]
    pub fn flags(&self) -> u32 {
        self.flags
    }

    #[inline(always)]
    pub fn directory_offset(&self) -> u64 {
        self.directory as u64
    }

    #[inline(always)]
    pub fn is_patchable(&self) -> bool {
        self.flags & FLAG_PATCHABLE != 0
    }
}
