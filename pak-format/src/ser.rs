use std::io::{Result, Write};

use byteorder::{LittleEndian, WriteBytesExt};

use crate::header::{PakHeader, Version};
use crate::record::Entry;

/// Bytes of a continuation block: negative count, then the target offset.
pub(crate) const CONTINUATION_SIZE: u64 = 12;

pub(crate) trait Serialize {
    fn write<W: Write>(&self, writer: &mut W) -> Result<()>;
}

impl Serialize for PakHeader {
    fn write<W: Write>(&self, writer: &mut W) -> Result<()> {
        writer.write_all(&self.magic_bytes)?;
        writer.write_u32::<LittleEndian>(self.version.raw())?;
        writer.write_u32::<LittleEndian>(self.flags)?;
        writer.write_u32::<LittleEndian>(self.directory)
    }
}

fn invalid(msg: &'static str) -> std::io::Error {
    std::io::Error::new(std::io::ErrorKind::InvalidInput, msg)
}

/// Encodes one directory record in the layout of `version`.
pub(crate) fn write_record<W: Write>(writer: &mut W, entry: &Entry, version: Version) -> Result<()> {
    let name = entry
        .name()
        .encode_utf16()
        .flat_map(u16::to_le_bytes)
        .collect::<Vec<_>>();

    let width = if version.has_wide_offsets() { 8 } else { 4 };
    let total = 4 + name.len() + 4 + width + 4;
    let total = u16::try_from(total).map_err(|_| invalid("entry name too long for a directory record"))?;

    writer.write_u16::<LittleEndian>(total)?;
    writer.write_u16::<LittleEndian>(name.len() as u16)?;
    writer.write_all(&name)?;
    writer.write_u32::<LittleEndian>(entry.flags())?;

    if version.has_wide_offsets() {
        writer.write_u64::<LittleEndian>(entry.offset())?;
    } else {
        let offset = u32::try_from(entry.offset())
            .map_err(|_| invalid("storage offset does not fit a generation 1 record"))?;
        writer.write_u32::<LittleEndian>(offset)?;
    }

    writer.write_u32::<LittleEndian>(entry.stored_length())
}

/// Writes the count cell and every record. Returns the number of bytes written.
pub(crate) fn write_directory<W: Write>(
    writer: &mut W,
    entries: &[Entry],
    version: Version,
) -> Result<u64> {
    let count = i32::try_from(entries.len()).map_err(|_| invalid("too many entries"))?;

    let mut buf = Vec::new();
    buf.write_i32::<LittleEndian>(count)?;
    for entry in entries {
        write_record(&mut buf, entry, version)?;
    }

    writer.write_all(&buf)?;
    Ok(buf.len() as u64)
}

/// Writes a block that redirects the directory chain to `target`.
pub(crate) fn write_continuation<W: Write>(writer: &mut W, target: u64) -> Result<()> {
    writer.write_i32::<LittleEndian>(-1)?;
    writer.write_u64::<LittleEndian>(target)
}
