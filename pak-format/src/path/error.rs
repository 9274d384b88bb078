use std::fmt;

#[derive(Debug, Clone)]
pub enum IntoPakPathError {
    UnrepresentableStr,
    NonCanonical,
    EmptyPath,
}

impl std::error::Error for IntoPakPathError {}

impl fmt::Display for IntoPakPathError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl IntoPakPathError {
    pub fn as_str(&self) -> &str {
        match self {
            IntoPakPathError::NonCanonical => "non-canonical path received as input",
            IntoPakPathError::UnrepresentableStr => "unrepresentable string found in path",
            IntoPakPathError::EmptyPath => "no path provided",
        }
    }

    pub fn as_io_error(&self) -> std::io::Error {
        use std::io::{Error, ErrorKind};
        Error::new(ErrorKind::InvalidInput, self.as_str())
    }
}

impl From<IntoPakPathError> for std::io::Error {
    fn from(err: IntoPakPathError) -> Self {
        err.as_io_error()
    }
}
