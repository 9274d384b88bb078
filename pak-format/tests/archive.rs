//! End-to-end tests against archives on disk and hand-built byte layouts.

#![cfg(feature = "writer")]

use std::io::{Read, Seek, SeekFrom};

use pak_format::{
    CompressionPolicy, Error, FormatError, PakReader, PakWriter, ReaderOptions, Version,
    WriterOptions,
};
use tempfile::TempDir;

/// Helper to create a temp dir and the archive path inside it
fn archive_path(name: &str) -> (TempDir, std::path::PathBuf) {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join(name);
    (temp_dir, path)
}

fn record(name: &str, flags: u32, offset: u64, length: u32) -> Vec<u8> {
    let name = name.encode_utf16().flat_map(u16::to_le_bytes).collect::<Vec<_>>();
    let mut buf = Vec::new();
    buf.extend_from_slice(&((4 + name.len() + 4 + 8 + 4) as u16).to_le_bytes());
    buf.extend_from_slice(&(name.len() as u16).to_le_bytes());
    buf.extend_from_slice(&name);
    buf.extend_from_slice(&flags.to_le_bytes());
    buf.extend_from_slice(&offset.to_le_bytes());
    buf.extend_from_slice(&length.to_le_bytes());
    buf
}

/// A mostly empty storage of arbitrary size; unset bytes read as zero.
struct Sparse {
    len: u64,
    regions: Vec<(u64, Vec<u8>)>,
    pos: u64,
}

impl Sparse {
    fn byte_at(&self, at: u64) -> u8 {
        self.regions
            .iter()
            .find(|(start, data)| at >= *start && at < start + data.len() as u64)
            .map(|(start, data)| data[(at - start) as usize])
            .unwrap_or(0)
    }
}

impl Read for Sparse {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        let n = (self.len.saturating_sub(self.pos)).min(buf.len() as u64) as usize;
        for (i, byte) in buf[..n].iter_mut().enumerate() {
            *byte = self.byte_at(self.pos + i as u64);
        }
        self.pos += n as u64;
        Ok(n)
    }
}

impl Seek for Sparse {
    fn seek(&mut self, pos: SeekFrom) -> std::io::Result<u64> {
        let next = match pos {
            SeekFrom::Start(n) => n as i128,
            SeekFrom::End(d) => self.len as i128 + d as i128,
            SeekFrom::Current(d) => self.pos as i128 + d as i128,
        };
        if next < 0 {
            return Err(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                "seek before start",
            ));
        }
        self.pos = next as u64;
        Ok(self.pos)
    }
}

#[test]
fn archive_round_trips_through_a_file() {
    let (_temp_dir, path) = archive_path("assets.pak");
    let music = b"not really an ogg stream".repeat(8);
    let script = b"on_enter { spawn(guard); spawn(guard); }\n".repeat(30);

    {
        let mut writer = PakWriter::create(&path, WriterOptions::default()).unwrap();
        writer.insert(r"sound\theme.ogg", &music).unwrap();
        writer.insert("scripts/town.lua", &script).unwrap();
        writer.finish().unwrap();
    }

    let pak = PakReader::open(&path).unwrap();
    assert_eq!(pak.path(), Some(path.as_path()));
    assert_eq!(pak.version(), Version::V2);
    assert_eq!(
        pak.file_names().collect::<Vec<_>>(),
        [r"sound\theme.ogg", r"scripts\town.lua"]
    );
    assert_eq!(pak.read_bytes(r"Sound\Theme.ogg").unwrap().unwrap(), music);
    assert_eq!(pak.read_bytes(r"scripts\town.lua").unwrap().unwrap(), script);
    assert_eq!(pak.file_size("scripts/town.lua").unwrap(), Some(script.len() as u64));
    assert!(pak.validate().unwrap());
}

#[test]
fn patchable_open_uses_a_writable_handle() {
    let (_temp_dir, path) = archive_path("patch.pak");
    let mut writer = PakWriter::create(&path, WriterOptions::default()).unwrap();
    writer.insert("a.txt", b"alpha").unwrap();
    writer.finish().unwrap();

    let options = ReaderOptions {
        patchable: true,
        ..ReaderOptions::default()
    };
    let pak = PakReader::open_with_options(&path, options).unwrap();
    assert_eq!(&pak.read_bytes("a.txt").unwrap().unwrap()[..], b"alpha");
}

#[test]
fn create_refuses_to_overwrite() {
    let (_temp_dir, path) = archive_path("exists.pak");
    std::fs::write(&path, b"keep me").unwrap();

    let err = PakWriter::create(&path, WriterOptions::default()).unwrap_err();
    assert_eq!(err.kind(), std::io::ErrorKind::AlreadyExists);
    assert_eq!(std::fs::read(&path).unwrap(), b"keep me");
}

#[test]
fn missing_file_reports_its_path() {
    let (_temp_dir, path) = archive_path("missing.pak");
    match PakReader::open(&path) {
        Err(Error::Open { path: reported, source }) => {
            assert_eq!(reported, path);
            assert_eq!(source.kind(), std::io::ErrorKind::NotFound);
        }
        other => panic!("unexpected result: {:?}", other.map(|_| ())),
    }
}

#[test]
fn unsupported_version_is_rejected() {
    let (_temp_dir, path) = archive_path("future.pak");
    let mut buf = b"\xffPAK".to_vec();
    buf.extend_from_slice(&Version::new(3, 0).raw().to_le_bytes());
    buf.extend_from_slice(&0u32.to_le_bytes());
    buf.extend_from_slice(&16u32.to_le_bytes());
    buf.extend_from_slice(&0i32.to_le_bytes());
    std::fs::write(&path, &buf).unwrap();

    let err = PakReader::open(&path).unwrap_err();
    assert!(matches!(
        err,
        Error::Format(FormatError::UnsupportedVersion { major: 3, minor: 0 })
    ));
}

#[test]
fn wide_offsets_and_chained_directory_beyond_four_gib() {
    let data_at = 0x1_0000_0040u64;
    let directory_at = 0x1_0000_1000u64;

    let mut header = b"\xffPAK".to_vec();
    header.extend_from_slice(&Version::V2.raw().to_le_bytes());
    header.extend_from_slice(&0u32.to_le_bytes());
    header.extend_from_slice(&16u32.to_le_bytes());
    header.extend_from_slice(&(-1i32).to_le_bytes());
    header.extend_from_slice(&directory_at.to_le_bytes());

    let mut directory = 2i32.to_le_bytes().to_vec();
    directory.extend_from_slice(&record(r"far\away.txt", 0, data_at, 5));
    directory.extend_from_slice(&record("near.txt", 0, 28, 4));

    let source = Sparse {
        len: directory_at + directory.len() as u64,
        regions: vec![
            (0, header),
            (28, b"near".to_vec()),
            (data_at, b"hello".to_vec()),
            (directory_at, directory),
        ],
        pos: 0,
    };

    let pak = PakReader::from_source(source, ReaderOptions::default()).unwrap();
    assert_eq!(pak.entry(r"far\away.txt").unwrap().offset(), data_at);
    assert_eq!(&pak.read_bytes(r"far\away.txt").unwrap().unwrap()[..], b"hello");
    assert_eq!(&pak.read_bytes("near.txt").unwrap().unwrap()[..], b"near");
    assert!(pak.has_folder("far"));
    assert!(pak.validate().unwrap());
}

#[test]
fn entry_past_end_of_storage_is_invalid() {
    let mut buf = b"\xffPAK".to_vec();
    buf.extend_from_slice(&Version::V2.raw().to_le_bytes());
    buf.extend_from_slice(&0u32.to_le_bytes());
    buf.extend_from_slice(&16u32.to_le_bytes());
    buf.extend_from_slice(&1i32.to_le_bytes());
    buf.extend_from_slice(&record("ghost.bin", 0, 0x1000, 64));

    let pak = PakReader::from_source(std::io::Cursor::new(buf), ReaderOptions::default()).unwrap();
    assert!(pak.has_file("ghost.bin"));
    assert!(!pak.validate().unwrap());
    assert!(matches!(pak.read_bytes("ghost.bin"), Err(Error::Io(_))));
}

#[test]
fn store_only_writes_raw_bytes() {
    let (_temp_dir, path) = archive_path("raw.pak");
    let data = b"plain text, stored as is".to_vec();

    let options = WriterOptions {
        policy: CompressionPolicy::StoreOnly,
        version: Version::V1,
        ..WriterOptions::default()
    };
    let mut writer = PakWriter::create(&path, options).unwrap();
    let offset = writer.insert("plain.txt", &data).unwrap().offset();
    writer.finish().unwrap();

    let raw = std::fs::read(&path).unwrap();
    assert_eq!(&raw[offset as usize..offset as usize + data.len()], &data[..]);

    let pak = PakReader::open(&path).unwrap();
    assert_eq!(pak.version(), Version::V1);
    assert_eq!(pak.read_bytes("plain.txt").unwrap().unwrap(), data);
}
