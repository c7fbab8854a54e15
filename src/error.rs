// Crate-wide error type.
//
// Errors are fatal to the current operation and surfaced to the caller;
// nothing is retried internally. The file-level driver removes partially
// written destination files before an error propagates.

use crate::format::Format;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug)]
pub enum Error {
    /// No registered magic matched the patch stream.
    UnknownFormat,
    /// The caller requested one format but the patch is another.
    FormatMismatch { requested: Format, detected: Format },
    /// The magic matched but a structural check failed: negative sizes,
    /// out-of-bounds old-cursor, truncated stream, bad integer decode.
    CorruptPatch(String),
    /// Index header wrong, unit byte invalid, or the file is shorter than
    /// the element count implies.
    CorruptIndex(String),
    /// Bad `BSDELTA_LOWMEM` value.
    Config(String),
    /// Underlying stream failure.
    Io(std::io::Error),
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnknownFormat => write!(f, "unrecognized patch format"),
            Self::FormatMismatch {
                requested,
                detected,
            } => write!(
                f,
                "patch format mismatch: requested {}, detected {}",
                requested.name(),
                detected.name()
            ),
            Self::CorruptPatch(msg) => write!(f, "corrupt patch: {msg}"),
            Self::CorruptIndex(msg) => write!(f, "corrupt index: {msg}"),
            Self::Config(msg) => write!(f, "configuration error: {msg}"),
            Self::Io(e) => write!(f, "I/O error: {e}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}

impl Error {
    /// Classify a failed read inside a patch stream: a short read means the
    /// patch is truncated, anything else is a plain I/O failure.
    pub(crate) fn from_patch_read(e: std::io::Error, what: &str) -> Self {
        if e.kind() == std::io::ErrorKind::UnexpectedEof {
            Self::CorruptPatch(format!("truncated {what}"))
        } else {
            Self::Io(e)
        }
    }
}
