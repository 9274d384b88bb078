use std::path::{Component, Path, PathBuf};

use pak_format::{Entry, PakPath, PakReader};

use super::{format_name, open};
use crate::error::{Error, Result};

pub fn run(path: PathBuf, output: PathBuf, names: Vec<String>, verbose: bool) -> Result<()> {
    let pak = open(&path)?;
    let selected = select(&pak, &names)?;

    std::fs::create_dir_all(&output).map_err(|source| Error::CreateDirectory {
        path: output.clone(),
        source,
    })?;

    for entry in &selected {
        let dest = output.join(destination(entry.name())?);
        if verbose {
            println!("{}", format_name(entry.name()));
        }
        tracing::debug!(
            name = entry.name(),
            dest = %dest.display(),
            method = %entry.compression(),
            "extracting entry"
        );
        extract_entry(&pak, entry, &dest)?;
    }

    println!("Extracted {} files to {}", selected.len(), output.display());
    Ok(())
}

/// Entries named directly, or living under a named folder. No names means all.
fn select<'a>(pak: &'a PakReader, names: &[String]) -> Result<Vec<&'a Entry>> {
    if names.is_empty() {
        return Ok(pak.entries().collect());
    }

    let mut selected: Vec<&Entry> = Vec::new();
    for name in names {
        if let Some(entry) = pak.entry(name) {
            selected.push(entry);
        } else if pak.has_folder(name) {
            let prefix = format!("{}\\", folder_key(name));
            selected.extend(
                pak.entries()
                    .filter(|e| e.name().to_lowercase().replace('/', "\\").starts_with(&prefix)),
            );
        } else {
            return Err(Error::EntryNotFound { name: name.clone() });
        }
    }

    selected.sort_by_key(|e| (e.offset(), e.name()));
    selected.dedup_by(|a, b| std::ptr::eq(*a, *b));
    Ok(selected)
}

fn folder_key(name: &str) -> String {
    name.to_lowercase()
        .replace('/', "\\")
        .trim_matches('\\')
        .to_string()
}

/// Maps an entry name to a relative path that cannot leave the destination.
fn destination(name: &str) -> Result<PathBuf> {
    let path = PakPath::new(name)
        .map_err(|source| Error::UnsafePath {
            name: name.to_string(),
            source: Some(source),
        })?
        .to_path_buf();

    if !path.components().all(|c| matches!(c, Component::Normal(_))) {
        return Err(Error::UnsafePath {
            name: name.to_string(),
            source: None,
        });
    }

    Ok(path)
}

fn extract_entry(pak: &PakReader, entry: &Entry, dest: &Path) -> Result<()> {
    let data = pak
        .read_bytes(entry.name())
        .map_err(|source| Error::ReadEntry {
            name: entry.name().to_string(),
            source,
        })?
        .ok_or_else(|| Error::EntryNotFound {
            name: entry.name().to_string(),
        })?;

    if let Some(parent) = dest.parent() {
        std::fs::create_dir_all(parent).map_err(|source| Error::CreateDirectory {
            path: parent.to_path_buf(),
            source,
        })?;
    }

    std::fs::write(dest, &data).map_err(|source| Error::WriteFile {
        path: dest.to_path_buf(),
        source,
    })
}
