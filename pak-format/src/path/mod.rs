use std::{fmt, path::PathBuf};

mod error;

pub use self::error::IntoPakPathError;

#[cfg(not(windows))]
/// The platform-specific separator as a string, used for printing `PakPath`s
/// in the platform-preferred manner.
pub const PATH_PLATFORM_SEP: &str = "/";

#[cfg(windows)]
/// The platform-specific separator as a string, used for printing `PakPath`s
/// in the platform-preferred manner.
pub const PATH_PLATFORM_SEP: &str = "\\";

/// The folder separator used in entry names.
pub const PATH_PAK_SEP: char = '\\';

/// A sanitized entry name: relative, `\`-delimited, NFC-normalized, with no
/// `.`, `..` or empty components.
#[derive(Debug, Clone, PartialOrd, Ord, PartialEq, Eq, Hash)]
#[repr(transparent)]
pub struct PakPath(pub(crate) String);

fn is_separator(c: char) -> bool {
    c == PATH_PAK_SEP || c == '/'
}

pub fn sanitize(name: &str) -> Result<Vec<String>, IntoPakPathError> {
    use unic_normal::StrNormalForm;
    use unic_ucd::GeneralCategory;

    let mut out = vec![];

    for component in name.split(is_separator) {
        match component.trim() {
            "" | "." => {}
            ".." => return Err(IntoPakPathError::NonCanonical),
            x => {
                let bad = x.chars().any(|c| {
                    let cat = GeneralCategory::of(c);
                    cat == GeneralCategory::Control || (cat.is_separator() && c != ' ')
                });
                if bad {
                    return Err(IntoPakPathError::UnrepresentableStr);
                }
                out.push(x.nfc().collect::<String>());
            }
        }
    }

    Ok(out)
}

impl PakPath {
    pub fn new(name: &str) -> Result<PakPath, IntoPakPathError> {
        let out = sanitize(name)?;

        if out.is_empty() {
            return Err(IntoPakPathError::EmptyPath);
        }

        Ok(PakPath(out.join("\\")))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The path relative to an extraction root, using platform separators.
    pub fn to_path_buf(&self) -> PathBuf {
        self.iter().collect()
    }

    pub fn parent(&self) -> Option<PakPath> {
        self.0
            .rsplit_once(PATH_PAK_SEP)
            .map(|(parent, _)| PakPath(parent.to_string()))
    }

    pub fn filename(&self) -> &str {
        self.0
            .rsplit_once(PATH_PAK_SEP)
            .map(|(_, name)| name)
            .unwrap_or(&self.0)
    }

    pub fn depth(&self) -> usize {
        self.0.chars().filter(|c| *c == PATH_PAK_SEP).count()
    }

    pub fn iter(&self) -> std::str::Split<'_, char> {
        self.0.split(PATH_PAK_SEP)
    }
}

impl fmt::Display for PakPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut iter = self.iter();
        if let Some(v) = iter.next() {
            f.write_str(v)?;
        }
        for v in iter {
            f.write_str(PATH_PLATFORM_SEP)?;
            f.write_str(v)?;
        }
        Ok(())
    }
}

/// Case-folded form of a name used for lookups. `/` is accepted as a separator
/// and empty components are dropped, so `A/b\` and `a\B` share a key.
pub(crate) fn lookup_key(name: &str) -> String {
    name.split(is_separator)
        .filter(|x| !x.is_empty())
        .collect::<Vec<_>>()
        .join("\\")
        .to_lowercase()
}

/// Every proper folder prefix of a lookup key, shortest first.
pub(crate) fn folder_prefixes(key: &str) -> impl Iterator<Item = &str> + '_ {
    key.match_indices(PATH_PAK_SEP).map(move |(i, _)| &key[..i])
}
