use std::path::PathBuf;

use pak_format::{constants, Compression};

use super::{archive_path, format_size, open};
use crate::error::Result;

pub fn run(path: PathBuf) -> Result<()> {
    let pak = open(&path)?;
    let header = pak.header();

    let storage = std::fs::metadata(&path)
        .map(|m| format_size(m.len()))
        .unwrap_or_else(|_| "-".into());

    let mut counts = [0usize; 3];
    for entry in pak.entries() {
        let slot = match entry.compression() {
            Compression::Stored => 0,
            Compression::Legacy => 1,
            Compression::Modern => 2,
        };
        counts[slot] += 1;
    }
    let unknown_flags = pak
        .entries()
        .filter(|e| e.flags() & !constants::CODEC_MASK != 0)
        .count();

    let wide = if header.version().has_wide_offsets() {
        "64-bit"
    } else {
        "32-bit"
    };

    println!("Archive:    {}", archive_path(&path).display());
    println!("Size:       {}", storage);
    println!("Version:    {} ({} offsets)", header.version(), wide);
    println!(
        "Flags:      {:#x}{}",
        header.flags(),
        if header.is_patchable() { " (patchable)" } else { "" }
    );
    println!("Directory:  {:#x}", header.directory_offset());
    println!("Entries:    {}", pak.len());
    println!("  stored:   {}", counts[0]);
    println!("  DEFLATE:  {}", counts[1]);
    println!("  LZMA:     {}", counts[2]);
    if unknown_flags > 0 {
        println!("  with unrecognized flag bits: {}", unknown_flags);
    }
    println!("Folders:    {}", pak.folder_names().count());

    Ok(())
}
