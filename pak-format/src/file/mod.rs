pub mod reader;
#[cfg(feature = "writer")]
pub mod writer;

#[cfg(all(test, feature = "writer"))]
mod tests {
    use crate::cache::tests::ManualClock;
    use crate::compression::{Codec, CodecError, Encoded};
    use crate::*;
    use std::io::{Cursor, Write};
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::{Arc, OnceLock, Weak};
    use std::time::{Duration, Instant};

    const CONFIG: &[u8] = b"[video]\nwidth=1920\nheight=1080\nfullscreen=true\n";

    fn level() -> Vec<u8> {
        b"tile grass tile grass tile water tile grass\n".repeat(40)
    }

    fn build(options: WriterOptions, files: &[(&str, &[u8])]) -> Vec<u8> {
        let mut writer = PakWriter::new(Cursor::new(Vec::new()), options).unwrap();
        for (name, data) in files {
            writer.insert(name, data).unwrap();
        }
        writer.finish().unwrap().into_inner()
    }

    fn open(buf: Vec<u8>) -> PakReader {
        PakReader::from_source(Cursor::new(buf), ReaderOptions::default()).unwrap()
    }

    /// Counts decompress calls on the modern codec.
    #[derive(Default)]
    struct Counting {
        inner: LzmaCodec,
        calls: AtomicUsize,
    }

    impl Codec for Counting {
        fn name(&self) -> &'static str {
            "counting"
        }

        fn compress(&self, input: &[u8]) -> std::io::Result<Encoded> {
            self.inner.compress(input)
        }

        fn decompress(
            &self,
            properties: &[u8],
            payload: &[u8],
            expected_len: u64,
        ) -> std::result::Result<Vec<u8>, CodecError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.inner.decompress(properties, payload, expected_len)
        }
    }

    #[test]
    fn reads_every_compression() {
        let mut writer = PakWriter::new(Cursor::new(Vec::new()), WriterOptions::default()).unwrap();
        writer.insert(r"cfg\video.ini", CONFIG).unwrap();
        writer
            .insert_encoded(
                r"maps\old.map",
                Encoder::default().encode_as(Compression::Legacy, &level()).unwrap(),
            )
            .unwrap();
        writer
            .insert_encoded(r"maps\raw.map", EncodedEntry::stored(&level()))
            .unwrap();
        let pak = open(writer.finish().unwrap().into_inner());

        assert_eq!(pak.len(), 3);
        assert_eq!(pak.entry(r"cfg\video.ini").unwrap().compression(), Compression::Modern);
        assert_eq!(pak.entry(r"maps\old.map").unwrap().compression(), Compression::Legacy);
        assert_eq!(pak.entry(r"maps\raw.map").unwrap().compression(), Compression::Stored);

        assert_eq!(&pak.read_bytes(r"cfg\video.ini").unwrap().unwrap()[..], CONFIG);
        assert_eq!(pak.read_bytes("maps/old.map").unwrap().unwrap(), level());
        assert_eq!(pak.read_bytes(r"MAPS\RAW.MAP").unwrap().unwrap(), level());

        for name in pak.file_names() {
            let size = pak.file_size(name).unwrap().unwrap();
            assert_eq!(size, pak.read_bytes(name).unwrap().unwrap().len() as u64);
        }

        assert!(pak.validate().unwrap());
    }

    #[test]
    fn unknown_names_are_none() {
        let pak = open(build(WriterOptions::default(), &[("a.txt", b"a")]));
        assert!(pak.read_bytes("b.txt").unwrap().is_none());
        assert!(pak.read_stream("b.txt").unwrap().is_none());
        assert!(pak.file_size("b.txt").unwrap().is_none());
        assert!(!pak.has_file("b.txt"));
    }

    #[test]
    fn read_stream_yields_contents() {
        use std::io::Read;

        let pak = open(build(WriterOptions::default(), &[("video.ini", CONFIG)]));
        let mut out = String::new();
        pak.read_stream("video.ini")
            .unwrap()
            .unwrap()
            .read_to_string(&mut out)
            .unwrap();
        assert_eq!(out.as_bytes(), CONFIG);
    }

    #[test]
    fn repeated_reads_share_one_decode() {
        let buf = build(WriterOptions::default(), &[("level.dat", &level())]);
        let counting = Arc::new(Counting::default());
        let options = ReaderOptions {
            codecs: Codecs {
                legacy: Arc::new(DeflateCodec::default()),
                modern: counting.clone(),
            },
            ..ReaderOptions::default()
        };
        let pak = PakReader::from_source(Cursor::new(buf), options).unwrap();

        let first = pak.read_bytes("level.dat").unwrap().unwrap();
        let second = pak.read_bytes("level.dat").unwrap().unwrap();

        assert_eq!(first, second);
        assert_eq!(first.as_ptr(), second.as_ptr());
        assert_eq!(counting.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn idle_entries_are_evicted_on_next_read() {
        let buf = build(
            WriterOptions::default(),
            &[("a.dat", &level()), ("b.dat", &level())],
        );
        let clock = ManualClock::new();
        let pak = PakReader::with_clock(Cursor::new(buf), ReaderOptions::default(), clock.clone())
            .unwrap();
        let a = pak.entry("a.dat").unwrap().offset();
        let b = pak.entry("b.dat").unwrap().offset();

        pak.read_bytes("a.dat").unwrap();
        assert!(pak.cache().contains(a));

        clock.advance(Duration::from_secs(61));
        pak.read_bytes("b.dat").unwrap();

        assert!(!pak.cache().contains(a));
        assert!(pak.cache().contains(b));
    }

    #[test]
    fn stored_entries_bypass_the_cache() {
        let options = WriterOptions {
            policy: CompressionPolicy::StoreOnly,
            ..WriterOptions::default()
        };
        let pak = open(build(options, &[("level.dat", &level())]));
        pak.read_bytes("level.dat").unwrap().unwrap();
        assert_eq!(pak.cache().len(), 0);
    }

    #[test]
    fn chained_directory_reads_like_a_direct_one() {
        let files: &[(&str, &[u8])] = &[
            (r"cfg\video.ini", CONFIG),
            (r"maps\town.map", b"town"),
            ("logo.png", b"\x89PNG"),
        ];
        let direct = open(build(WriterOptions::default(), files));
        let chained = open(build(
            WriterOptions {
                chain_directory: true,
                ..WriterOptions::default()
            },
            files,
        ));

        assert_ne!(direct.header().directory_offset(), 16);
        assert_eq!(chained.header().directory_offset(), 16);
        assert_eq!(
            direct.file_names().collect::<Vec<_>>(),
            chained.file_names().collect::<Vec<_>>()
        );
        for (name, data) in files {
            assert_eq!(&chained.read_bytes(name).unwrap().unwrap()[..], *data);
            assert_eq!(chained.entry(name), direct.entry(name));
        }
    }

    #[test]
    fn both_generations_resolve_offsets() {
        for version in [Version::V1, Version::new(1, 4), Version::V2, Version::new(2, 1)] {
            let options = WriterOptions {
                version,
                ..WriterOptions::default()
            };
            let pak = open(build(options, &[("a.txt", b"alpha"), (r"b\c.dat", &level())]));

            assert_eq!(pak.version(), version);
            assert_eq!(&pak.read_bytes("a.txt").unwrap().unwrap()[..], b"alpha");
            assert_eq!(pak.read_bytes(r"b\c.dat").unwrap().unwrap(), level());
        }
    }

    #[test]
    fn patchable_flag_is_reported() {
        let options = WriterOptions {
            patchable: true,
            ..WriterOptions::default()
        };
        assert!(open(build(options, &[("a.txt", b"a")])).is_patchable());
        assert!(!open(build(WriterOptions::default(), &[("a.txt", b"a")])).is_patchable());
    }

    #[test]
    fn truncated_storage_fails_validation() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("truncated.pak");

        let mut writer = PakWriter::create(&path, WriterOptions::default()).unwrap();
        writer.insert("a.txt", b"alpha").unwrap();
        let cut = writer.insert("b.dat", &level()).unwrap().offset() + 4;
        writer.finish().unwrap();

        let pak = PakReader::open(&path).unwrap();
        assert!(pak.validate().unwrap());

        std::fs::OpenOptions::new()
            .write(true)
            .open(&path)
            .unwrap()
            .set_len(cut)
            .unwrap();

        assert!(!pak.validate().unwrap());
    }

    #[test]
    fn folders_are_derived_from_names() {
        let pak = open(build(
            WriterOptions::default(),
            &[(r"a\b\c.txt", b"c"), (r"a\d.txt", b"d")],
        ));

        assert_eq!(pak.folder_names().collect::<Vec<_>>(), ["a", r"a\b"]);
        assert!(pak.has_folder("A"));
        assert!(pak.has_folder("a/b"));
        assert!(!pak.has_folder(r"a\b\c.txt"));
        assert!(!pak.has_folder(""));
        assert!(pak.has_file(r"A\B\C.TXT"));
    }

    #[test]
    fn corrupt_entry_leaves_the_archive_usable() {
        let mut buf = build(
            WriterOptions::default(),
            &[("broken.dat", &level()), ("fine.txt", b"fine")],
        );
        let pak = open(buf.clone());
        let offset = pak.entry("broken.dat").unwrap().offset() as usize;

        // Claim more output than the stream holds.
        let claimed = level().len() as u32 + 10;
        buf[offset..offset + 4].copy_from_slice(&claimed.to_le_bytes());
        let pak = open(buf);

        let err = pak.read_bytes("broken.dat").unwrap_err();
        assert!(err.is_corrupt_entry());
        assert!(matches!(err, Error::CorruptEntry { ref name, .. } if name == "broken.dat"));
        assert_eq!(pak.cache().len(), 0);

        assert_eq!(&pak.read_bytes("fine.txt").unwrap().unwrap()[..], b"fine");
        assert!(pak.read_bytes("broken.dat").unwrap_err().is_corrupt_entry());
    }

    #[test]
    fn concurrent_readers_see_correct_bytes() {
        let files = (0..16)
            .map(|i| (format!(r"maps\map{}.dat", i), format!("map {} ", i).repeat(100 + i)))
            .collect::<Vec<_>>();

        let mut writer = PakWriter::new(Cursor::new(Vec::new()), WriterOptions::default()).unwrap();
        for (name, data) in &files {
            writer.insert(name, data.as_bytes()).unwrap();
        }
        let pak = open(writer.finish().unwrap().into_inner());

        std::thread::scope(|s| {
            for t in 0..8 {
                let pak = &pak;
                let files = &files;
                s.spawn(move || {
                    for round in 0..10 {
                        for (name, data) in files.iter().cycle().skip(t + round).take(files.len()) {
                            let read = pak.read_bytes(name).unwrap().unwrap();
                            assert_eq!(&read[..], data.as_bytes());
                        }
                    }
                });
            }
        });
    }

    #[test]
    fn closed_reader_refuses_reads() {
        let pak = open(build(
            WriterOptions::default(),
            &[("a.dat", &level()), ("b.txt", b"b")],
        ));
        pak.read_bytes("a.dat").unwrap();

        pak.close();
        pak.close();

        assert!(pak.is_closed());
        assert!(matches!(pak.read_bytes("a.dat"), Err(Error::Closed)));
        assert!(matches!(pak.read_bytes("b.txt"), Err(Error::Closed)));
        assert!(matches!(pak.validate(), Err(Error::Closed)));
        assert_eq!(pak.cache().len(), 0);
        assert!(pak.has_file("a.dat"));
    }

    /// Closes the reader's storage from inside the cache's sweep, between the
    /// reader's own closed check and the cache lookup.
    #[derive(Default)]
    struct ClosingClock {
        reader: OnceLock<Weak<PakReader>>,
        armed: AtomicBool,
    }

    impl Clock for ClosingClock {
        fn now(&self) -> Instant {
            if self.armed.swap(false, Ordering::SeqCst) {
                if let Some(pak) = self.reader.get().and_then(Weak::upgrade) {
                    pak.storage().close();
                }
            }
            Instant::now()
        }
    }

    #[test]
    fn close_during_a_cache_hit_still_refuses() {
        let clock = Arc::new(ClosingClock::default());
        let pak = Arc::new(
            PakReader::with_clock(
                Cursor::new(build(WriterOptions::default(), &[("a.dat", &level())])),
                ReaderOptions::default(),
                clock.clone(),
            )
            .unwrap(),
        );
        assert!(clock.reader.set(Arc::downgrade(&pak)).is_ok());

        pak.read_bytes("a.dat").unwrap();
        assert_eq!(pak.cache().len(), 1);

        clock.armed.store(true, Ordering::SeqCst);
        assert!(matches!(pak.read_bytes("a.dat"), Err(Error::Closed)));
        assert_eq!(pak.cache().len(), 0);
    }

    #[test]
    fn truncated_directory_is_a_format_error() {
        let mut buf = build(WriterOptions::default(), &[("a.dat", &level()), ("b.txt", b"b")]);
        buf.truncate(buf.len() - 3);
        let err = PakReader::from_source(Cursor::new(buf), ReaderOptions::default()).unwrap_err();
        assert!(matches!(err, Error::Format(FormatError::Truncated { .. })));
    }

    #[test]
    fn duplicate_names_are_refused_by_the_writer() {
        let mut writer = PakWriter::new(Cursor::new(Vec::new()), WriterOptions::default()).unwrap();
        writer.insert(r"a\b.txt", b"one").unwrap();
        let err = writer.insert("A/B.TXT", b"two").unwrap_err();
        assert_eq!(err.kind(), std::io::ErrorKind::AlreadyExists);
    }

    #[test]
    fn reader_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<PakReader>();
    }

    #[test]
    fn empty_archive_opens() {
        let pak = open(build(WriterOptions::default(), &[]));
        assert!(pak.is_empty());
        assert_eq!(pak.folder_names().count(), 0);
        assert!(pak.validate().unwrap());
    }

    #[test]
    fn garbage_is_rejected() {
        let mut buf = Vec::new();
        buf.write_all(b"PK\x03\x04 not a pak archive").unwrap();
        let err = PakReader::from_source(Cursor::new(buf), ReaderOptions::default()).unwrap_err();
        assert!(matches!(err, Error::Format(FormatError::BadMagic(_))));
    }
}
