use std::fs::OpenOptions;
use std::io::{BufReader, Cursor};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use byteorder::{ByteOrder, LittleEndian};
use bytes::Bytes;

use crate::{
    cache::{BlockCache, Clock, SystemClock, DEFAULT_IDLE_THRESHOLD},
    compression::{self, Codecs, Compression},
    de::read_directory,
    error::{Error, Result},
    header::{PakHeader, Version},
    index::EntryIndex,
    record::Entry,
    storage::{Source, Storage},
};

#[derive(Debug, Clone)]
pub struct ReaderOptions {
    /// How long a decompressed entry may sit unread before the next read drops it.
    pub idle_threshold: Duration,
    pub codecs: Codecs,
    /// Open the file read-write instead of read-only. Nothing is ever written.
    pub patchable: bool,
}

impl Default for ReaderOptions {
    fn default() -> Self {
        ReaderOptions {
            idle_threshold: DEFAULT_IDLE_THRESHOLD,
            codecs: Codecs::default(),
            patchable: false,
        }
    }
}

/// An open archive. Safe to share between threads; all reads go through one
/// storage handle and one block cache.
#[derive(Debug)]
pub struct PakReader {
    storage: Storage,
    path: Option<PathBuf>,
    header: PakHeader,
    index: EntryIndex,
    cache: BlockCache,
    codecs: Codecs,
}

impl PakReader {
    /// Opens an existing archive read-only, and errors if the file is not valid.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<PakReader> {
        PakReader::open_with_options(path, ReaderOptions::default())
    }

    pub fn open_with_options<P: AsRef<Path>>(path: P, options: ReaderOptions) -> Result<PakReader> {
        let path = path.as_ref();
        let file = OpenOptions::new()
            .read(true)
            .write(options.patchable)
            .open(path)
            .map_err(|source| Error::Open {
                path: path.to_path_buf(),
                source,
            })?;

        let mut reader = PakReader::from_source(BufReader::new(file), options)?;
        reader.path = Some(path.to_path_buf());
        Ok(reader)
    }

    /// Reads an archive from any seekable source, such as an in-memory cursor.
    pub fn from_source<S: Source + 'static>(source: S, options: ReaderOptions) -> Result<PakReader> {
        PakReader::with_clock(source, options, Arc::new(SystemClock))
    }

    pub(crate) fn with_clock<S: Source + 'static>(
        source: S,
        options: ReaderOptions,
        clock: Arc<dyn Clock>,
    ) -> Result<PakReader> {
        let storage = Storage::new(source);
        let directory = read_directory(&storage)?;

        // Legacy bitstreams end at the next entry, directory block or end of file.
        let mut boundaries = directory.blocks;
        boundaries.push(storage.len()?);
        let index = EntryIndex::build(directory.entries, &boundaries);

        tracing::debug!(
            version = %directory.header.version(),
            entries = index.len(),
            "opened archive"
        );

        Ok(PakReader {
            storage,
            path: None,
            header: directory.header,
            index,
            cache: BlockCache::new(options.idle_threshold, clock),
            codecs: options.codecs,
        })
    }

    #[inline(always)]
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    #[inline(always)]
    pub fn header(&self) -> &PakHeader {
        &self.header
    }

    #[inline(always)]
    pub fn version(&self) -> Version {
        self.header.version()
    }

    /// Whether the archive header carries the patchable flag.
    #[inline(always)]
    pub fn is_patchable(&self) -> bool {
        self.header.is_patchable()
    }

    pub fn has_file(&self, name: &str) -> bool {
        self.index.contains_file(name)
    }

    /// True if `name` is a proper folder prefix of any entry. The empty name
    /// is never a folder.
    pub fn has_folder(&self, name: &str) -> bool {
        self.index.contains_folder(name)
    }

    pub fn entry(&self, name: &str) -> Option<&Entry> {
        self.index.get(name)
    }

    /// Every readable entry, in directory order.
    pub fn entries(&self) -> impl Iterator<Item = &Entry> + '_ {
        self.index.files()
    }

    pub fn file_names(&self) -> impl Iterator<Item = &str> + '_ {
        self.index.files().map(Entry::name)
    }

    pub fn folder_names(&self) -> impl Iterator<Item = &str> + '_ {
        self.index.folders()
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.len() == 0
    }

    /// The logical size of `name`, or `None` if the archive has no such entry.
    pub fn file_size(&self, name: &str) -> Result<Option<u64>> {
        let entry = match self.index.get(name) {
            Some(entry) => entry,
            None => return Ok(None),
        };

        match entry.compression() {
            Compression::Modern => {
                let prefix = self.storage.read_range(entry.offset(), 4)?;
                Ok(Some(LittleEndian::read_u32(&prefix) as u64))
            }
            Compression::Stored | Compression::Legacy => Ok(Some(entry.stored_length() as u64)),
        }
    }

    /// Bytes of storage `name` occupies. For legacy entries this is the extent
    /// up to the next entry or directory block.
    pub fn stored_size(&self, name: &str) -> Option<u64> {
        self.index.locate(name).map(|(_, span)| span)
    }

    /// The full contents of `name`, or `None` if the archive has no such entry.
    pub fn read_bytes(&self, name: &str) -> Result<Option<Bytes>> {
        match self.index.locate(name) {
            Some((entry, span)) => self.read_entry(entry, span).map(Some),
            None => Ok(None),
        }
    }

    /// Like [`PakReader::read_bytes`], wrapped in a cursor.
    pub fn read_stream(&self, name: &str) -> Result<Option<Cursor<Bytes>>> {
        Ok(self.read_bytes(name)?.map(Cursor::new))
    }

    fn read_entry(&self, entry: &Entry, span: u64) -> Result<Bytes> {
        if self.storage.is_closed() {
            return Err(Error::Closed);
        }

        let compression = entry.compression();
        if !compression.is_compressed() {
            let data = self
                .storage
                .read_range(entry.offset(), entry.stored_length() as usize)?;
            return Ok(Bytes::from(data));
        }

        let bytes = self.cache.get_or_create(entry, || {
            let extent = match compression {
                Compression::Legacy => span,
                _ => entry.stored_length() as u64,
            };
            let stored = self.storage.read_range(entry.offset(), extent as usize)?;

            compression::decode(
                &self.codecs,
                compression,
                &stored,
                entry.stored_length() as u64,
            )
            .map_err(|source| {
                tracing::warn!(name = entry.name(), error = %source, "failed to decode entry");
                Error::CorruptEntry {
                    name: entry.name().to_string(),
                    source,
                }
            })
        })?;

        // A close that landed after the check above must still win over a hit,
        // and must not leave a freshly installed slot behind.
        if self.storage.is_closed() {
            self.cache.clear();
            return Err(Error::Closed);
        }
        Ok(bytes)
    }

    /// Checks that every entry's stored range lies within the storage as it is
    /// now. Does not decode anything.
    pub fn validate(&self) -> Result<bool> {
        let len = self.storage.len()?;
        let mut valid = true;

        for (entry, span) in self.index.ranges() {
            let end = entry.offset().checked_add(span);
            if end.map(|end| end > len).unwrap_or(true) {
                tracing::warn!(
                    name = entry.name(),
                    offset = format_args!("{:#x}", entry.offset()),
                    span,
                    storage = len,
                    "entry extends past the end of storage"
                );
                valid = false;
            }
        }

        Ok(valid)
    }

    /// Releases the storage handle and every cached entry. Later reads fail
    /// with [`Error::Closed`]; closing twice is harmless.
    pub fn close(&self) {
        if self.storage.close() {
            tracing::debug!(path = ?self.path, "closed archive");
        }
        self.cache.clear();
    }

    pub fn is_closed(&self) -> bool {
        self.storage.is_closed()
    }

    #[cfg(test)]
    pub(crate) fn cache(&self) -> &BlockCache {
        &self.cache
    }

    #[cfg(test)]
    pub(crate) fn storage(&self) -> &Storage {
        &self.storage
    }
}
