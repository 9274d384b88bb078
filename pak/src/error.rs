use std::path::PathBuf;

use pak_format::path::IntoPakPathError;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Cannot open archive `{}`", .path.display())]
    OpenArchive {
        path: PathBuf,
        #[source]
        source: pak_format::Error,
    },

    #[error("Cannot read archive `{}`", .path.display())]
    ReadArchive {
        path: PathBuf,
        #[source]
        source: pak_format::Error,
    },

    #[error("No entry or folder named `{name}` in the archive")]
    EntryNotFound { name: String },

    #[error("Cannot read entry `{name}`")]
    ReadEntry {
        name: String,
        #[source]
        source: pak_format::Error,
    },

    #[error("Refusing to extract `{name}` outside of the destination")]
    UnsafePath {
        name: String,
        #[source]
        source: Option<IntoPakPathError>,
    },

    #[error("Cannot create directory `{}`", .path.display())]
    CreateDirectory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Cannot write file `{}`", .path.display())]
    WriteFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Cannot write to standard output")]
    Stdout(#[source] std::io::Error),

    #[error("Cannot serialize listing")]
    Json(#[source] serde_json::Error),

    #[error("Archive `{}` failed validation ({failures} problems)", .path.display())]
    Invalid { path: PathBuf, failures: usize },
}
