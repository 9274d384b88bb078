use std::path::PathBuf;

use pak_format::PakReader;
use serde::Serialize;

use super::{format_name, format_size, open};
use crate::error::{Error, Result};

#[derive(Serialize)]
struct JsonEntry<'a> {
    name: &'a str,
    compression: String,
    stored_size: u64,
    size: u64,
    flags: u32,
    offset: u64,
}

pub fn run(path: PathBuf, json: bool) -> Result<()> {
    let pak = open(&path)?;

    let mut rows = Vec::with_capacity(pak.len());
    for entry in pak.entries() {
        let size = pak
            .file_size(entry.name())
            .map_err(|source| Error::ReadEntry {
                name: entry.name().to_string(),
                source,
            })?
            .unwrap_or_default();

        rows.push(JsonEntry {
            name: entry.name(),
            compression: entry.compression().to_string(),
            stored_size: pak.stored_size(entry.name()).unwrap_or_default(),
            size,
            flags: entry.flags(),
            offset: entry.offset(),
        });
    }

    if json {
        list_json(&rows)
    } else {
        list_table(&pak, &rows);
        Ok(())
    }
}

fn list_json(rows: &[JsonEntry<'_>]) -> Result<()> {
    let out = serde_json::to_string_pretty(rows).map_err(Error::Json)?;
    println!("{}", out);
    Ok(())
}

fn list_table(pak: &PakReader, rows: &[JsonEntry<'_>]) {
    println!("{:8}  {:>12}  {:>12}  {:>6}  Path", "Method", "Stored", "Size", "Ratio");
    println!("{}", "-".repeat(60));

    let mut total_stored = 0u64;
    let mut total_size = 0u64;

    for row in rows {
        let ratio = if row.size == 0 {
            0.0
        } else {
            100.0 - (row.stored_size as f64 / row.size as f64 * 100.0)
        };

        println!(
            "{:8}  {:>12}  {:>12}  {:>5.1}%  {}",
            row.compression,
            format_size(row.stored_size),
            format_size(row.size),
            ratio,
            format_name(row.name)
        );

        total_stored += row.stored_size;
        total_size += row.size;
    }

    println!("{}", "-".repeat(60));
    println!(
        "{:8}  {:>12}  {:>12}  {:>6}  {} entries, {} folders",
        "",
        format_size(total_stored),
        format_size(total_size),
        "",
        pak.len(),
        pak.folder_names().count()
    );
}
