use std::collections::HashSet;

use byteorder::{ByteOrder, LittleEndian};

use crate::error::{FormatError, Result};
use crate::header::{PakHeader, Version};
use crate::record::Entry;
use crate::storage::Storage;

/// u16 total length + u16 name length.
const RECORD_PREFIX_SIZE: usize = 4;
/// Directory count cell.
const COUNT_SIZE: u64 = 4;
/// Bytes pulled from storage per refill while walking the directory.
const WINDOW_SIZE: usize = 64 * 1024;

/// Everything decoded from an archive at open time.
#[derive(Debug)]
pub(crate) struct Directory {
    pub(crate) header: PakHeader,
    pub(crate) entries: Vec<Entry>,
    /// Offsets of every directory block visited, continuation stubs included.
    pub(crate) blocks: Vec<u64>,
}

/// Buffered view over the storage used while decoding structure.
///
/// Every request is checked against the storage length first, so a field that
/// runs past the end is a `FormatError::Truncated` rather than an I/O error.
struct Window<'a> {
    storage: &'a Storage,
    end: u64,
    start: u64,
    buf: Vec<u8>,
}

impl<'a> Window<'a> {
    fn new(storage: &'a Storage) -> Result<Window<'a>> {
        Ok(Window {
            storage,
            end: storage.len()?,
            start: 0,
            buf: Vec::new(),
        })
    }

    fn read(&mut self, offset: u64, len: usize, what: &'static str) -> Result<&[u8]> {
        let stop = offset
            .checked_add(len as u64)
            .filter(|stop| *stop <= self.end)
            .ok_or(FormatError::Truncated { offset, what })?;

        if offset < self.start || stop > self.start + self.buf.len() as u64 {
            let fill = (len.max(WINDOW_SIZE) as u64).min(self.end - offset) as usize;
            self.buf = self.storage.read_range(offset, fill)?;
            self.start = offset;
        }

        let at = (offset - self.start) as usize;
        Ok(&self.buf[at..at + len])
    }
}

fn read_header(window: &mut Window<'_>) -> Result<PakHeader> {
    let mut raw = [0u8; PakHeader::SIZE];
    raw.copy_from_slice(window.read(0, PakHeader::SIZE, "header")?);

    let header = PakHeader::parse(&raw)?;
    tracing::debug!(
        version = %header.version,
        flags = format_args!("{:#x}", header.flags),
        directory = format_args!("{:#x}", header.directory),
        "deserialized PakHeader"
    );
    Ok(header)
}

pub(crate) fn read_directory(storage: &Storage) -> Result<Directory> {
    let mut window = Window::new(storage)?;
    let header = read_header(&mut window)?;

    let mut blocks = Vec::new();
    let mut visited = HashSet::new();
    let mut offset = header.directory_offset();

    let count = loop {
        if !visited.insert(offset) {
            return Err(FormatError::DirectoryCycle(offset).into());
        }
        blocks.push(offset);

        let cell = window.read(offset, COUNT_SIZE as usize, "directory count")?;
        let count = LittleEndian::read_i32(cell);
        if count >= 0 {
            break count as u32;
        }

        let next = window.read(offset + COUNT_SIZE, 8, "continuation offset")?;
        let next = LittleEndian::read_u64(next);
        tracing::debug!(
            from = format_args!("{:#x}", offset),
            to = format_args!("{:#x}", next),
            "following directory continuation"
        );
        offset = next;
    };

    let start = offset + COUNT_SIZE;
    let mut pos = start;
    // The count is untrusted until the records actually parse.
    let mut entries = Vec::with_capacity(count.min(4096) as usize);
    for _ in 0..count {
        let (entry, total) = read_record(&mut window, pos, header.version)?;
        entries.push(entry);
        pos += total;
    }

    tracing::debug!(
        start = format_args!("{:#x}", start),
        end = format_args!("{:#x}", pos),
        bytes = pos - start,
        count,
        blocks = blocks.len(),
        "deserialized directory"
    );

    Ok(Directory {
        header,
        entries,
        blocks,
    })
}

fn offset_width(version: Version) -> usize {
    if version.has_wide_offsets() {
        8
    } else {
        4
    }
}

/// Reads one record at `pos`, returning it with the number of bytes it spans.
///
/// The next record always starts at `pos + total length`, whatever fields the
/// writer appended after the ones known here.
fn read_record(window: &mut Window<'_>, pos: u64, version: Version) -> Result<(Entry, u64)> {
    let malformed = |reason| FormatError::MalformedRecord {
        offset: pos,
        reason,
    };

    let prefix = window.read(pos, RECORD_PREFIX_SIZE, "record")?;
    let total = LittleEndian::read_u16(&prefix[0..2]) as usize;
    let name_len = LittleEndian::read_u16(&prefix[2..4]) as usize;

    if name_len % 2 != 0 {
        return Err(malformed("name length is not a whole number of UTF-16 units").into());
    }

    let width = offset_width(version);
    let known = RECORD_PREFIX_SIZE + name_len + 4 + width + 4;
    if total < known {
        return Err(malformed("record length shorter than its fields").into());
    }

    let record = window.read(pos, total, "record")?;
    let mut cursor = RECORD_PREFIX_SIZE;

    let units = record[cursor..cursor + name_len]
        .chunks_exact(2)
        .map(LittleEndian::read_u16)
        .collect::<Vec<_>>();
    let name = String::from_utf16(&units).map_err(|_| FormatError::InvalidName { offset: pos })?;
    cursor += name_len;

    let flags = LittleEndian::read_u32(&record[cursor..]);
    cursor += 4;

    let offset = if width == 8 {
        LittleEndian::read_u64(&record[cursor..])
    } else {
        LittleEndian::read_u32(&record[cursor..]) as u64
    };
    cursor += width;

    let length = LittleEndian::read_u32(&record[cursor..]);

    tracing::debug!(
        start = format_args!("{:#x}", pos),
        bytes = total,
        %name,
        flags = format_args!("{:#x}", flags),
        data = format_args!("{:#x}", offset),
        length,
        "deserialized Entry"
    );

    Ok((Entry::new(name, flags, offset, length)?, total as u64))
}
