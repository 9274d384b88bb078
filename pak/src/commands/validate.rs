use std::path::PathBuf;

use super::{format_name, open};
use crate::error::{Error, Result};

pub fn run(path: PathBuf, verbose: bool) -> Result<()> {
    let pak = open(&path)?;
    let mut failures = 0usize;

    let in_bounds = pak.validate().map_err(|source| Error::ReadArchive {
        path: path.clone(),
        source,
    })?;
    if !in_bounds {
        eprintln!("Some entries extend past the end of the archive");
        failures += 1;
    }

    for name in pak.file_names() {
        match pak.read_bytes(name) {
            Ok(_) => {
                if verbose {
                    println!("ok      {}", format_name(name));
                }
            }
            Err(e) => {
                failures += 1;
                println!("FAILED  {}: {}", format_name(name), e);
                let mut source = std::error::Error::source(&e);
                while let Some(cause) = source {
                    println!("          caused by: {}", cause);
                    source = cause.source();
                }
            }
        }
    }

    if failures > 0 {
        return Err(Error::Invalid { path, failures });
    }

    println!("{} entries OK", pak.len());
    Ok(())
}
