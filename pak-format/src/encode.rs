//! Single-shot entry encoding.
//!
//! An [`Encoder`] turns one candidate file into the bytes that get stored in
//! the archive, picking a codec according to its [`CompressionPolicy`].
//! Deciding where those bytes land in the archive is the writer's business.

use std::path::Path;

use crate::compression::{self, modern_record, CodecError, Codecs, Compression};

/// File extensions that are already compressed, skipped by
/// [`CompressionPolicy::ByExtension`].
pub const INCOMPRESSIBLE_EXTENSIONS: &[&str] = &[
    "png", "jpg", "jpeg", "gif", "webp", "ogg", "mp3", "mp4", "webm", "bik", "zip", "gz", "bz2",
    "xz", "7z", "rar",
];

/// The modern codec must shave off at least this share of the original size
/// for [`CompressionPolicy::AlwaysAttempt`] to keep its output.
pub const DEFAULT_MIN_SAVINGS: f64 = 0.2;

#[derive(Debug, Clone, Copy, Eq, PartialEq, Default)]
pub enum CompressionPolicy {
    /// Never compress.
    StoreOnly,
    /// Compress everything except files with an already-compressed extension.
    #[default]
    ByExtension,
    /// Always run the modern codec, falling back to storing when it does not
    /// save enough.
    AlwaysAttempt,
}

/// The stored form of one entry, ready to be placed in an archive.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct EncodedEntry {
    pub compression: Compression,
    /// The size of the original file.
    pub logical_length: u64,
    /// The bytes as they appear in storage. For modern entries this includes
    /// the mini-header.
    pub payload: Vec<u8>,
}

impl EncodedEntry {
    pub fn stored(data: &[u8]) -> EncodedEntry {
        EncodedEntry {
            compression: Compression::Stored,
            logical_length: data.len() as u64,
            payload: data.to_vec(),
        }
    }

    /// Value of the directory's stored length field for this entry.
    pub fn directory_length(&self) -> u64 {
        match self.compression {
            Compression::Modern => self.payload.len() as u64,
            Compression::Stored | Compression::Legacy => self.logical_length,
        }
    }

    /// Decodes the payload back into the original bytes.
    pub fn decode(&self, codecs: &Codecs) -> Result<Vec<u8>, CodecError> {
        compression::decode(codecs, self.compression, &self.payload, self.logical_length)
    }
}

#[derive(Debug, Clone)]
pub struct Encoder {
    policy: CompressionPolicy,
    codecs: Codecs,
    min_savings: f64,
}

impl Default for Encoder {
    fn default() -> Self {
        Encoder::new(CompressionPolicy::default())
    }
}

impl Encoder {
    pub fn new(policy: CompressionPolicy) -> Encoder {
        Encoder::with_codecs(policy, Codecs::default())
    }

    pub fn with_codecs(policy: CompressionPolicy, codecs: Codecs) -> Encoder {
        Encoder {
            policy,
            codecs,
            min_savings: DEFAULT_MIN_SAVINGS,
        }
    }

    /// Sets the minimum fraction (0.0 to 1.0) the modern codec has to save
    /// under [`CompressionPolicy::AlwaysAttempt`].
    pub fn min_savings(mut self, fraction: f64) -> Encoder {
        self.min_savings = fraction.clamp(0.0, 1.0);
        self
    }

    pub fn policy(&self) -> CompressionPolicy {
        self.policy
    }

    pub fn codecs(&self) -> &Codecs {
        &self.codecs
    }

    /// Encodes `data`, which will be stored under `name`, according to the policy.
    pub fn encode(&self, name: &str, data: &[u8]) -> std::io::Result<EncodedEntry> {
        // Modern records carry a 32-bit length, so anything larger stays raw.
        if data.len() as u64 > u32::MAX as u64 {
            return Ok(EncodedEntry::stored(data));
        }

        match self.policy {
            CompressionPolicy::StoreOnly => Ok(EncodedEntry::stored(data)),
            CompressionPolicy::ByExtension => {
                if has_incompressible_extension(name) {
                    tracing::trace!(name, "skipping compression for media extension");
                    Ok(EncodedEntry::stored(data))
                } else {
                    self.encode_as(Compression::Modern, data)
                }
            }
            CompressionPolicy::AlwaysAttempt => {
                let encoded = self.encode_as(Compression::Modern, data)?;
                let record = encoded.payload.len() as f64;
                let limit = data.len() as f64 * (1.0 - self.min_savings);

                if record <= limit {
                    Ok(encoded)
                } else {
                    tracing::trace!(
                        name,
                        original = data.len(),
                        compressed = encoded.payload.len(),
                        "compression not worthwhile, storing"
                    );
                    Ok(EncodedEntry::stored(data))
                }
            }
        }
    }

    /// Encodes `data` with an explicitly chosen codec, ignoring the policy.
    pub fn encode_as(&self, compression: Compression, data: &[u8]) -> std::io::Result<EncodedEntry> {
        let payload = match compression {
            Compression::Stored => return Ok(EncodedEntry::stored(data)),
            Compression::Legacy => self.codecs.legacy.compress(data)?.payload,
            Compression::Modern => {
                let length = u32::try_from(data.len()).map_err(|_| {
                    std::io::Error::new(
                        std::io::ErrorKind::InvalidInput,
                        "modern entries are limited to 4 GiB",
                    )
                })?;
                modern_record(length, &self.codecs.modern.compress(data)?)
            }
        };

        Ok(EncodedEntry {
            compression,
            logical_length: data.len() as u64,
            payload,
        })
    }
}

fn has_incompressible_extension(name: &str) -> bool {
    let filename = name.rsplit(|c| c == '\\' || c == '/').next().unwrap_or(name);
    Path::new(filename)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            INCOMPRESSIBLE_EXTENSIONS
                .iter()
                .any(|known| known.eq_ignore_ascii_case(ext))
        })
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rand::{rngs::StdRng, RngCore, SeedableRng};

    fn repetitive() -> Vec<u8> {
        b"level=1 spawn=town music=theme\n".repeat(64)
    }

    fn random(len: usize) -> Vec<u8> {
        let mut buf = vec![0u8; len];
        StdRng::seed_from_u64(0x5eed).fill_bytes(&mut buf);
        buf
    }

    #[test]
    fn png_is_never_compressed() {
        let encoder = Encoder::new(CompressionPolicy::ByExtension);
        let encoded = encoder.encode(r"ui\logo.PNG", &repetitive()).unwrap();
        assert_eq!(encoded.compression, Compression::Stored);
        assert_eq!(encoded.payload, repetitive());
    }

    #[test]
    fn repetitive_dat_is_compressed() {
        let encoder = Encoder::new(CompressionPolicy::ByExtension);
        let encoded = encoder.encode(r"data\level.dat", &repetitive()).unwrap();
        assert_eq!(encoded.compression, Compression::Modern);
        assert!(encoded.payload.len() < repetitive().len());
        assert_eq!(encoded.directory_length(), encoded.payload.len() as u64);
    }

    #[test]
    fn dense_random_data_falls_back_to_stored() {
        let data = random(16 * 1024);
        let encoded = Encoder::new(CompressionPolicy::AlwaysAttempt)
            .encode("noise.dat", &data)
            .unwrap();
        assert_eq!(encoded.compression, Compression::Stored);
        assert_eq!(encoded.payload, data);
    }

    #[test]
    fn always_attempt_keeps_worthwhile_output() {
        let encoded = Encoder::new(CompressionPolicy::AlwaysAttempt)
            .encode("music.ogg", &repetitive())
            .unwrap();
        assert_eq!(encoded.compression, Compression::Modern);
    }

    #[test]
    fn store_only_never_compresses() {
        let encoded = Encoder::new(CompressionPolicy::StoreOnly)
            .encode("level.dat", &repetitive())
            .unwrap();
        assert_eq!(encoded.compression, Compression::Stored);
    }

    #[test]
    fn legacy_records_logical_length() {
        let encoded = Encoder::default()
            .encode_as(Compression::Legacy, &repetitive())
            .unwrap();
        assert_eq!(encoded.directory_length(), repetitive().len() as u64);
        assert_eq!(encoded.decode(&Codecs::default()).unwrap(), repetitive());
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(32))]

        #[test]
        fn decode_inverts_encode(
            data in proptest::collection::vec(any::<u8>(), 0..2048),
            policy in prop_oneof![
                Just(CompressionPolicy::StoreOnly),
                Just(CompressionPolicy::ByExtension),
                Just(CompressionPolicy::AlwaysAttempt),
            ],
        ) {
            let encoder = Encoder::new(policy);
            let encoded = encoder.encode("file.bin", &data).unwrap();
            prop_assert_eq!(encoded.decode(encoder.codecs()).unwrap(), data);
        }
    }
}
