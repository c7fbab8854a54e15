// bzip2 streaming layer shared by both patch formats.
//
// Both formats compress their record streams with bzip2. Block size and the
// decompressor's small-memory mode are controlled by `Config`, which is read
// once from the environment at startup and threaded explicitly through every
// constructor.

use std::io::{self, Read, Write};

use bzip2::write::BzEncoder;
use bzip2::{Compression, Decompress, Status};

use crate::error::{Error, Result};

/// Environment variable selecting low-memory mode.
pub const LOWMEM_ENV: &str = "BSDELTA_LOWMEM";

/// bzip2 block size (x 100 KiB) in normal mode, matching the reference tools.
const BLOCK_SIZE: u32 = 9;
/// Block size in low-memory mode.
const BLOCK_SIZE_LOWMEM: u32 = 1;

/// Decompressor input buffer size.
const IN_BUF_SIZE: usize = 16 * 1024;

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

/// Compression configuration threaded through patch encoders and decoders.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Config {
    /// Use small bzip2 block size and the decompressor's small-memory mode.
    pub lowmem: bool,
}

impl Config {
    /// Read the configuration from `BSDELTA_LOWMEM`.
    ///
    /// Accepted values (ASCII case-insensitive): `1`, `true`, `t`, `yes`,
    /// `y` enable low-memory mode; `0`, `false`, `f`, `no`, `n` disable it.
    /// An unset variable means normal mode; anything else is a hard error.
    pub fn from_env() -> Result<Self> {
        match std::env::var(LOWMEM_ENV) {
            Ok(val) => Self::parse(&val),
            Err(std::env::VarError::NotPresent) => Ok(Self::default()),
            Err(std::env::VarError::NotUnicode(_)) => Err(Error::Config(format!(
                "{LOWMEM_ENV} is not valid unicode"
            ))),
        }
    }

    /// Parse a `BSDELTA_LOWMEM` value.
    pub fn parse(value: &str) -> Result<Self> {
        match value.to_ascii_lowercase().as_str() {
            "1" | "true" | "t" | "yes" | "y" => Ok(Self { lowmem: true }),
            "0" | "false" | "f" | "no" | "n" => Ok(Self { lowmem: false }),
            other => Err(Error::Config(format!(
                "invalid {LOWMEM_ENV} value: {other:?} (expected a boolean)"
            ))),
        }
    }

    fn compression(&self) -> Compression {
        Compression::new(if self.lowmem {
            BLOCK_SIZE_LOWMEM
        } else {
            BLOCK_SIZE
        })
    }
}

// ---------------------------------------------------------------------------
// Compressor
// ---------------------------------------------------------------------------

/// Create a streaming bzip2 compressor writing into `w`.
pub fn compressor<W: Write>(w: W, config: &Config) -> BzEncoder<W> {
    BzEncoder::new(w, config.compression())
}

// ---------------------------------------------------------------------------
// Decompressor
// ---------------------------------------------------------------------------

/// Streaming bzip2 decompressor.
///
/// A thin `Read` adapter over `bzip2::Decompress`; unlike the crate's
/// high-level reader it exposes the small-memory decode mode. After the
/// stream end marker, further reads return `Ok(0)`, which is how the Endsley
/// decoder distinguishes a clean record boundary from truncation.
pub struct BzReader<R: Read> {
    inner: R,
    decomp: Decompress,
    buf: Vec<u8>,
    pos: usize,
    cap: usize,
    eof: bool,
    done: bool,
}

impl<R: Read> BzReader<R> {
    pub fn new(inner: R, config: &Config) -> Self {
        Self {
            inner,
            decomp: Decompress::new(config.lowmem),
            buf: vec![0u8; IN_BUF_SIZE],
            pos: 0,
            cap: 0,
            eof: false,
            done: false,
        }
    }

    /// Whether the bzip2 stream end marker has been consumed.
    pub fn stream_ended(&self) -> bool {
        self.done
    }
}

impl<R: Read> Read for BzReader<R> {
    fn read(&mut self, out: &mut [u8]) -> io::Result<usize> {
        if out.is_empty() || self.done {
            return Ok(0);
        }
        loop {
            if self.pos == self.cap && !self.eof {
                self.cap = self.inner.read(&mut self.buf)?;
                self.pos = 0;
                self.eof = self.cap == 0;
            }

            let before_in = self.decomp.total_in();
            let before_out = self.decomp.total_out();
            let status = self
                .decomp
                .decompress(&self.buf[self.pos..self.cap], out)
                .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
            self.pos += (self.decomp.total_in() - before_in) as usize;
            let produced = (self.decomp.total_out() - before_out) as usize;

            if matches!(status, Status::StreamEnd) {
                self.done = true;
                return Ok(produced);
            }
            if produced > 0 {
                return Ok(produced);
            }
            if self.eof {
                return Err(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    "bzip2 stream truncated",
                ));
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn roundtrip(data: &[u8], config: &Config) -> Vec<u8> {
        let mut enc = compressor(Vec::new(), config);
        enc.write_all(data).unwrap();
        let compressed = enc.finish().unwrap();

        let mut out = Vec::new();
        let mut dec = BzReader::new(&compressed[..], config);
        dec.read_to_end(&mut out).unwrap();
        assert!(dec.stream_ended());
        out
    }

    #[test]
    fn compress_decompress_roundtrip() {
        let data: Vec<u8> = b"bsdiff test payload "
            .iter()
            .copied()
            .cycle()
            .take(64 * 1024)
            .collect();
        assert_eq!(roundtrip(&data, &Config::default()), data);
    }

    #[test]
    fn lowmem_mode_roundtrip() {
        let config = Config { lowmem: true };
        let data: Vec<u8> = (0u8..=255).cycle().take(8192).collect();
        assert_eq!(roundtrip(&data, &config), data);
    }

    #[test]
    fn lowmem_output_readable_in_normal_mode() {
        let mut enc = compressor(Vec::new(), &Config { lowmem: true });
        enc.write_all(b"cross-mode payload").unwrap();
        let compressed = enc.finish().unwrap();

        let mut out = Vec::new();
        BzReader::new(&compressed[..], &Config::default())
            .read_to_end(&mut out)
            .unwrap();
        assert_eq!(out, b"cross-mode payload");
    }

    #[test]
    fn empty_stream_roundtrip() {
        assert_eq!(roundtrip(b"", &Config::default()), b"");
    }

    #[test]
    fn reads_after_stream_end_return_zero() {
        let mut enc = compressor(Vec::new(), &Config::default());
        enc.write_all(b"x").unwrap();
        let compressed = enc.finish().unwrap();

        let mut dec = BzReader::new(&compressed[..], &Config::default());
        let mut out = Vec::new();
        dec.read_to_end(&mut out).unwrap();
        assert_eq!(out, b"x");

        let mut buf = [0u8; 8];
        assert_eq!(dec.read(&mut buf).unwrap(), 0);
        assert_eq!(dec.read(&mut buf).unwrap(), 0);
    }

    #[test]
    fn truncated_stream_is_an_error() {
        let mut enc = compressor(Vec::new(), &Config::default());
        enc.write_all(&vec![0x5Au8; 4096]).unwrap();
        let compressed = enc.finish().unwrap();

        let cut = &compressed[..compressed.len() / 2];
        let mut dec = BzReader::new(cut, &Config::default());
        let err = dec.read_to_end(&mut Vec::new()).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);
    }

    #[test]
    fn garbage_input_is_an_error() {
        let mut dec = BzReader::new(&b"definitely not bzip2"[..], &Config::default());
        assert!(dec.read_to_end(&mut Vec::new()).is_err());
    }

    #[test]
    fn parse_accepts_boolean_spellings() {
        for v in ["1", "true", "T", "YES", "y"] {
            assert_eq!(Config::parse(v).unwrap(), Config { lowmem: true }, "{v}");
        }
        for v in ["0", "false", "F", "NO", "n"] {
            assert_eq!(Config::parse(v).unwrap(), Config { lowmem: false }, "{v}");
        }
    }

    #[test]
    fn parse_rejects_other_values() {
        for v in ["2", "maybe", "", "on"] {
            assert!(matches!(Config::parse(v), Err(Error::Config(_))), "{v}");
        }
    }
}
