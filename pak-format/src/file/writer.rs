use std::collections::HashSet;
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Result, Seek, SeekFrom, Write};
use std::path::Path;

use crate::{
    encode::{CompressionPolicy, EncodedEntry, Encoder},
    header::{PakHeader, Version, FLAG_PATCHABLE},
    path::{lookup_key, PakPath},
    record::Entry,
    ser::{self, Serialize, CONTINUATION_SIZE},
};

#[derive(Debug, Clone, Copy, Default)]
pub struct WriterOptions {
    /// Record generation to write. Generation 1 limits storage offsets to 32 bits.
    pub version: Version,
    pub policy: CompressionPolicy,
    /// Sets the patchable header flag.
    pub patchable: bool,
    /// Always reach the directory through the continuation stub, even when its
    /// offset would fit in the header.
    pub chain_directory: bool,
}

/// Sequentially builds an archive: entry data first, then the directory.
///
/// Nothing is readable until [`PakWriter::finish`] writes the directory and
/// the final header.
#[derive(Debug)]
pub struct PakWriter<W: Write + Seek> {
    sink: W,
    options: WriterOptions,
    encoder: Encoder,
    entries: Vec<Entry>,
    keys: HashSet<String>,
    next_write_addr: u64,
}

impl PakWriter<BufWriter<File>> {
    /// Creates a new archive at `path`, and errors if the file already exists.
    pub fn create<P: AsRef<Path>>(
        path: P,
        options: WriterOptions,
    ) -> Result<PakWriter<BufWriter<File>>> {
        let file = OpenOptions::new()
            .write(true)
            .read(true)
            .create_new(true)
            .open(path.as_ref())?;

        PakWriter::new(BufWriter::new(file), options)
    }
}

impl<W: Write + Seek> PakWriter<W> {
    pub fn new(mut sink: W, options: WriterOptions) -> Result<PakWriter<W>> {
        if !options.version.is_supported() {
            return Err(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                format!("cannot write archive version {}", options.version),
            ));
        }

        // Placeholder header, rewritten by `finish`, then a zeroed stub the
        // header can later point at to redirect to the real directory.
        sink.seek(SeekFrom::Start(0))?;
        PakHeader::new(options.version, 0, 0).write(&mut sink)?;
        sink.write_all(&[0u8; CONTINUATION_SIZE as usize])?;

        Ok(PakWriter {
            sink,
            options,
            encoder: Encoder::new(options.policy),
            entries: Vec::new(),
            keys: HashSet::new(),
            next_write_addr: PakHeader::SIZE as u64 + CONTINUATION_SIZE,
        })
    }

    #[inline(always)]
    pub fn version(&self) -> Version {
        self.options.version
    }

    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    /// Encodes `data` under the writer's compression policy and appends it.
    pub fn insert(&mut self, name: &str, data: &[u8]) -> Result<&Entry> {
        let path = PakPath::new(name)?;
        let encoded = self.encoder.encode(path.as_str(), data)?;
        self.append(path, encoded)
    }

    /// Appends an entry that was encoded elsewhere.
    pub fn insert_encoded(&mut self, name: &str, encoded: EncodedEntry) -> Result<&Entry> {
        let path = PakPath::new(name)?;
        self.append(path, encoded)
    }

    fn append(&mut self, path: PakPath, encoded: EncodedEntry) -> Result<&Entry> {
        let key = lookup_key(path.as_str());
        if self.keys.contains(&key) {
            return Err(std::io::Error::new(
                std::io::ErrorKind::AlreadyExists,
                format!("entry `{}` already exists", path.as_str()),
            ));
        }

        let offset = self.next_write_addr;
        if !self.options.version.has_wide_offsets() && offset > u32::MAX as u64 {
            return Err(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                "storage offset does not fit a generation 1 record",
            ));
        }

        let length = u32::try_from(encoded.directory_length()).map_err(|_| {
            std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                "entry too large for a directory record",
            )
        })?;

        let entry = Entry::new(
            path.as_str().to_string(),
            encoded.compression.flags(),
            offset,
            length,
        )
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;

        self.sink.seek(SeekFrom::Start(offset))?;
        self.sink.write_all(&encoded.payload)?;
        self.next_write_addr += encoded.payload.len() as u64;

        tracing::debug!(
            name = entry.name(),
            compression = %entry.compression(),
            offset = format_args!("{:#x}", offset),
            stored = encoded.payload.len(),
            logical = encoded.logical_length,
            "inserted entry"
        );

        self.keys.insert(key);
        self.entries.push(entry);
        Ok(&self.entries[self.entries.len() - 1])
    }

    /// Writes the directory and the final header, returning the sink.
    pub fn finish(mut self) -> Result<W> {
        let directory = self.next_write_addr;
        self.sink.seek(SeekFrom::Start(directory))?;
        let len = ser::write_directory(&mut self.sink, &self.entries, self.options.version)?;

        let stub = PakHeader::SIZE as u64;
        let header_directory = match u32::try_from(directory) {
            Ok(offset) if !self.options.chain_directory => offset,
            _ => {
                self.sink.seek(SeekFrom::Start(stub))?;
                ser::write_continuation(&mut self.sink, directory)?;
                stub as u32
            }
        };

        let flags = if self.options.patchable { FLAG_PATCHABLE } else { 0 };
        let header = PakHeader::new(self.options.version, flags, header_directory);
        self.sink.seek(SeekFrom::Start(0))?;
        header.write(&mut self.sink)?;

        self.sink.seek(SeekFrom::Start(directory + len))?;
        self.sink.flush()?;

        tracing::debug!(
            directory = format_args!("{:#x}", directory),
            header = format_args!("{:#x}", header_directory),
            entries = self.entries.len(),
            "finished archive"
        );

        Ok(self.sink)
    }
}

