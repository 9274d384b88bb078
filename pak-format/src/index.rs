use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::ops::Bound;

use crate::compression::Compression;
use crate::path::{folder_prefixes, lookup_key};
use crate::record::Entry;

/// Case-insensitive lookup structures built once from the directory.
#[derive(Debug, Default)]
pub(crate) struct EntryIndex {
    /// Every directory record, in directory order.
    entries: Vec<Entry>,

    /// Bytes of storage each entry occupies, parallel to `entries`.
    spans: Vec<u64>,

    /// Lookup key to the winning index in `entries`.
    by_name: HashMap<String, usize>,

    /// Indices of winning entries, in directory order.
    files: Vec<usize>,

    /// Folder lookup key to the folder name as first spelled in the directory.
    folders: BTreeMap<String, String>,
}

/// `name` with `/` folded to `\` and empty components dropped, case kept.
fn display_name(name: &str) -> String {
    name.split(|c| c == '\\' || c == '/')
        .filter(|x| !x.is_empty())
        .collect::<Vec<_>>()
        .join("\\")
}

impl EntryIndex {
    /// `boundaries` are storage positions that end any legacy bitstream
    /// running up to them: directory blocks and the storage length.
    pub(crate) fn build(entries: Vec<Entry>, boundaries: &[u64]) -> EntryIndex {
        let mut by_name = HashMap::with_capacity(entries.len());
        let mut folders = BTreeMap::new();

        for (i, entry) in entries.iter().enumerate() {
            let display = display_name(entry.name());

            for folder in folder_prefixes(&display) {
                folders
                    .entry(folder.to_lowercase())
                    .or_insert_with(|| folder.to_string());
            }

            if let Some(previous) = by_name.insert(lookup_key(entry.name()), i) {
                tracing::warn!(
                    name = entry.name(),
                    shadowed = entries[previous].name(),
                    "duplicate entry name, later record wins"
                );
            }
        }

        let mut files = by_name.values().copied().collect::<Vec<_>>();
        files.sort_unstable();

        let mut ends = entries.iter().map(Entry::offset).collect::<BTreeSet<_>>();
        ends.extend(boundaries.iter().copied());

        let spans = entries
            .iter()
            .map(|entry| match entry.compression() {
                Compression::Legacy => ends
                    .range((Bound::Excluded(entry.offset()), Bound::Unbounded))
                    .next()
                    .map(|end| end - entry.offset())
                    .unwrap_or(0),
                _ => entry.stored_length() as u64,
            })
            .collect();

        EntryIndex {
            entries,
            spans,
            by_name,
            files,
            folders,
        }
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.by_name.get(&lookup_key(name)).copied()
    }

    pub(crate) fn get(&self, name: &str) -> Option<&Entry> {
        self.position(name).map(|i| &self.entries[i])
    }

    /// The entry for `name` along with the number of storage bytes it spans.
    pub(crate) fn locate(&self, name: &str) -> Option<(&Entry, u64)> {
        self.position(name).map(|i| (&self.entries[i], self.spans[i]))
    }

    pub(crate) fn contains_file(&self, name: &str) -> bool {
        self.by_name.contains_key(&lookup_key(name))
    }

    pub(crate) fn contains_folder(&self, name: &str) -> bool {
        let key = lookup_key(name);
        !key.is_empty() && self.folders.contains_key(&key)
    }

    /// Winning entries in directory order.
    pub(crate) fn files(&self) -> impl Iterator<Item = &Entry> + '_ {
        self.files.iter().map(move |i| &self.entries[*i])
    }

    pub(crate) fn folders(&self) -> impl Iterator<Item = &str> + '_ {
        self.folders.values().map(String::as_str)
    }

    /// Every record, shadowed duplicates included, with its storage span.
    pub(crate) fn ranges(&self) -> impl Iterator<Item = (&Entry, u64)> + '_ {
        self.entries.iter().zip(self.spans.iter().copied())
    }

    pub(crate) fn len(&self) -> usize {
        self.files.len()
    }
}
