// Patch formats: magic detection and format dispatch.
//
// Two on-disk formats are supported, identified by their leading magic
// bytes. Formats are a compile-time table; detection reads lazily and
// never consumes more than the longest registered magic.
//
// # Modules
//
// - `intcode` — signed-magnitude 64-bit integer codec
// - `classic` — "BSDIFF40": header + three bzip2 sub-streams
// - `endsley` — "ENDSLEY/BSDIFF43": single interleaved bzip2 stream

pub mod classic;
pub mod endsley;
pub mod intcode;

use std::io::{self, Read, Write};

use crate::compress::Config;
use crate::error::{Error, Result};

pub use classic::{ClassicReader, ClassicWriter};
pub use endsley::{EndsleyReader, EndsleyWriter};

/// Magic bytes of the classic format.
pub const CLASSIC_MAGIC: &[u8; 8] = b"BSDIFF40";
/// Magic bytes of the Endsley format.
pub const ENDSLEY_MAGIC: &[u8; 16] = b"ENDSLEY/BSDIFF43";

/// Length of the longest registered magic; detection never reads past it.
const MAX_MAGIC_LEN: usize = ENDSLEY_MAGIC.len();

// ---------------------------------------------------------------------------
// Format table
// ---------------------------------------------------------------------------

/// A supported patch format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Format {
    #[default]
    Classic,
    Endsley,
}

/// Registered formats, ordered by increasing magic length.
pub const FORMATS: [Format; 2] = [Format::Classic, Format::Endsley];

impl Format {
    pub fn name(self) -> &'static str {
        match self {
            Self::Classic => "classic",
            Self::Endsley => "endsley",
        }
    }

    pub fn magic(self) -> &'static [u8] {
        match self {
            Self::Classic => CLASSIC_MAGIC,
            Self::Endsley => ENDSLEY_MAGIC,
        }
    }
}

impl std::fmt::Display for Format {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

// ---------------------------------------------------------------------------
// Detection
// ---------------------------------------------------------------------------

/// Identify the format of an in-memory patch by its magic.
pub fn detect_slice(patch: &[u8]) -> Option<Format> {
    FORMATS
        .iter()
        .copied()
        .find(|fmt| patch.starts_with(fmt.magic()))
}

/// Identify the format of a patch stream by its magic.
///
/// Reads lazily: magics are tried in order of increasing length and a
/// format is abandoned as soon as the buffered prefix diverges from its
/// magic, so at most `MAX_MAGIC_LEN` bytes are ever consumed and an
/// unknown prefix is usually rejected after the first read.
pub fn detect<R: Read>(r: &mut R) -> io::Result<Option<Format>> {
    let mut buf = [0u8; MAX_MAGIC_LEN];
    let mut have = 0usize;

    'formats: for fmt in FORMATS {
        let magic = fmt.magic();
        if !magic.starts_with(&buf[..have.min(magic.len())]) {
            continue;
        }
        while have < magic.len() {
            let n = r.read(&mut buf[have..magic.len()])?;
            if n == 0 {
                continue 'formats;
            }
            have += n;
            if !magic.starts_with(&buf[..have.min(magic.len())]) {
                continue 'formats;
            }
        }
        return Ok(Some(fmt));
    }
    Ok(None)
}

// ---------------------------------------------------------------------------
// Control records
// ---------------------------------------------------------------------------

/// One step of patch application.
///
/// `diff_size` bytes are produced by adding diff-stream bytes to `old` at
/// the current old-cursor; `copy_size` bytes are copied verbatim from the
/// extra stream; `skip_size` then displaces the old-cursor (possibly
/// backwards) before the next record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControlRecord {
    pub diff_size: i64,
    pub copy_size: i64,
    pub skip_size: i64,
}

// ---------------------------------------------------------------------------
// Tagged encoder / decoder
// ---------------------------------------------------------------------------

/// A patch encoder bound to an output stream, dispatching on format.
pub enum PatchWriter<W: Write> {
    Classic(ClassicWriter<W>),
    Endsley(EndsleyWriter<W>),
}

impl<W: Write> PatchWriter<W> {
    /// Start a patch of `format` for a `new` of `new_size` bytes.
    pub fn new(format: Format, out: W, new_size: u64, config: &Config) -> Result<Self> {
        Ok(match format {
            Format::Classic => Self::Classic(ClassicWriter::new(out, new_size, config)),
            Format::Endsley => Self::Endsley(EndsleyWriter::new(out, new_size, config)?),
        })
    }

    pub fn format(&self) -> Format {
        match self {
            Self::Classic(_) => Format::Classic,
            Self::Endsley(_) => Format::Endsley,
        }
    }

    pub fn control(&mut self, rec: ControlRecord) -> Result<()> {
        match self {
            Self::Classic(w) => w.control(rec),
            Self::Endsley(w) => w.control(rec),
        }
    }

    pub fn diff_bytes(&mut self, data: &[u8]) -> Result<()> {
        match self {
            Self::Classic(w) => w.diff_bytes(data),
            Self::Endsley(w) => w.diff_bytes(data),
        }
    }

    pub fn copy_bytes(&mut self, data: &[u8]) -> Result<()> {
        match self {
            Self::Classic(w) => w.copy_bytes(data),
            Self::Endsley(w) => w.copy_bytes(data),
        }
    }

    /// Commit the patch and return the underlying writer.
    pub fn finish(self) -> Result<W> {
        match self {
            Self::Classic(w) => w.finish(),
            Self::Endsley(w) => w.finish(),
        }
    }
}

/// A patch decoder over an in-memory patch, dispatching on format.
pub enum PatchReader<'a> {
    Classic(ClassicReader<'a>),
    Endsley(EndsleyReader<'a>),
}

impl<'a> PatchReader<'a> {
    /// Detect the patch format, enforce `requested` if given, and parse the
    /// format header.
    pub fn open(patch: &'a [u8], requested: Option<Format>, config: &Config) -> Result<Self> {
        let detected = detect_slice(patch).ok_or(Error::UnknownFormat)?;
        if let Some(requested) = requested
            && requested != detected
        {
            return Err(Error::FormatMismatch {
                requested,
                detected,
            });
        }
        let body = &patch[detected.magic().len()..];
        Ok(match detected {
            Format::Classic => Self::Classic(ClassicReader::open(body, config)?),
            Format::Endsley => Self::Endsley(EndsleyReader::open(body, config)?),
        })
    }

    pub fn format(&self) -> Format {
        match self {
            Self::Classic(_) => Format::Classic,
            Self::Endsley(_) => Format::Endsley,
        }
    }

    /// The final size of `new` as recorded in the patch header.
    pub fn expected_new_size(&self) -> u64 {
        match self {
            Self::Classic(r) => r.new_size(),
            Self::Endsley(r) => r.new_size(),
        }
    }

    pub fn next_control(&mut self) -> Result<Option<ControlRecord>> {
        match self {
            Self::Classic(r) => r.next_control(),
            Self::Endsley(r) => r.next_control(),
        }
    }

    pub fn read_diff(&mut self, buf: &mut [u8]) -> Result<()> {
        match self {
            Self::Classic(r) => r.read_diff(buf),
            Self::Endsley(r) => r.read_diff(buf),
        }
    }

    pub fn read_copy(&mut self, buf: &mut [u8]) -> Result<()> {
        match self {
            Self::Classic(r) => r.read_copy(buf),
            Self::Endsley(r) => r.read_copy(buf),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
