pub mod cat;
pub mod extract;
pub mod info;
pub mod list;
pub mod validate;

pub use cat::run as cat;
pub use extract::run as extract;
pub use info::run as info;
pub use list::run as list;
pub use validate::run as validate;

use std::path::{Path, PathBuf};

use pak_format::PakReader;

use crate::error::{Error, Result};

pub(crate) fn open(path: &Path) -> Result<PakReader> {
    tracing::debug!(path = %path.display(), "opening archive");
    let pak = PakReader::open(path).map_err(|source| Error::OpenArchive {
        path: path.to_path_buf(),
        source,
    })?;
    tracing::debug!(
        path = %path.display(),
        version = %pak.version(),
        entries = pak.len(),
        "opened archive"
    );
    Ok(pak)
}

pub(crate) fn format_size(len: u64) -> String {
    use humansize::{file_size_opts as options, FileSize};
    len.file_size(options::BINARY)
        .unwrap_or_else(|_| len.to_string())
}

/// Entry name with `\` shown as the platform separator.
pub(crate) fn format_name(name: &str) -> String {
    name.split('\\')
        .collect::<Vec<_>>()
        .join(pak_format::path::PATH_PLATFORM_SEP)
}

pub(crate) fn archive_path(path: &Path) -> PathBuf {
    path.canonicalize().unwrap_or_else(|_| path.to_path_buf())
}
