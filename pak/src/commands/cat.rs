use std::io::Write;
use std::path::PathBuf;

use super::open;
use crate::error::{Error, Result};

pub fn run(path: PathBuf, name: String) -> Result<()> {
    let pak = open(&path)?;

    let data = pak
        .read_bytes(&name)
        .map_err(|source| Error::ReadEntry {
            name: name.clone(),
            source,
        })?
        .ok_or(Error::EntryNotFound { name })?;

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    out.write_all(&data).map_err(Error::Stdout)?;
    out.flush().map_err(Error::Stdout)
}
