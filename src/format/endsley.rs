// Endsley bsdiff patch format ("ENDSLEY/BSDIFF43").
//
// Layout: 16-byte magic, then the new size as one signed-magnitude
// integer, then a single bzip2 stream of interleaved records: three
// control integers, `diff_size` diff bytes, `copy_size` extra bytes,
// repeated. A clean end of stream at a record boundary terminates the
// patch; end of stream mid-record is corruption.

use std::io::{Read, Write};

use bzip2::write::BzEncoder;

use crate::compress::{self, BzReader, Config};
use crate::error::{Error, Result};
use crate::format::intcode::{self, INT_SIZE};
use crate::format::{ControlRecord, ENDSLEY_MAGIC};

// ---------------------------------------------------------------------------
// Encoder
// ---------------------------------------------------------------------------

/// Endsley patch encoder. The header is written eagerly; records stream
/// straight through the compressor.
pub struct EndsleyWriter<W: Write> {
    bz: BzEncoder<W>,
}

impl<W: Write> EndsleyWriter<W> {
    pub fn new(mut out: W, new_size: u64, config: &Config) -> Result<Self> {
        out.write_all(ENDSLEY_MAGIC)?;
        intcode::write_i64(&mut out, new_size as i64)?;
        Ok(Self {
            bz: compress::compressor(out, config),
        })
    }

    pub fn control(&mut self, rec: ControlRecord) -> Result<()> {
        intcode::write_i64(&mut self.bz, rec.diff_size)?;
        intcode::write_i64(&mut self.bz, rec.copy_size)?;
        intcode::write_i64(&mut self.bz, rec.skip_size)?;
        Ok(())
    }

    pub fn diff_bytes(&mut self, data: &[u8]) -> Result<()> {
        self.bz.write_all(data)?;
        Ok(())
    }

    pub fn copy_bytes(&mut self, data: &[u8]) -> Result<()> {
        self.bz.write_all(data)?;
        Ok(())
    }

    pub fn finish(self) -> Result<W> {
        let mut out = self.bz.finish()?;
        out.flush()?;
        Ok(out)
    }
}

// ---------------------------------------------------------------------------
// Decoder
// ---------------------------------------------------------------------------

/// Endsley patch decoder over an in-memory patch body (the bytes after the
/// magic).
pub struct EndsleyReader<'a> {
    new_size: u64,
    bz: BzReader<&'a [u8]>,
}

impl<'a> EndsleyReader<'a> {
    pub fn open(body: &'a [u8], config: &Config) -> Result<Self> {
        if body.len() < INT_SIZE {
            return Err(Error::CorruptPatch("truncated endsley header".into()));
        }
        let mut buf = [0u8; INT_SIZE];
        buf.copy_from_slice(&body[..INT_SIZE]);
        let new_size = intcode::decode_i64(buf);
        if new_size < 0 {
            return Err(Error::CorruptPatch(
                "negative new size in endsley header".into(),
            ));
        }
        Ok(Self {
            new_size: new_size as u64,
            bz: BzReader::new(&body[INT_SIZE..], config),
        })
    }

    pub fn new_size(&self) -> u64 {
        self.new_size
    }

    /// Decode the next control record, or `None` on a clean end of stream.
    pub fn next_control(&mut self) -> Result<Option<ControlRecord>> {
        let diff_size = match intcode::read_i64_opt(&mut self.bz)
            .map_err(|e| Error::from_patch_read(e, "patch stream"))?
        {
            Some(x) => x,
            None => return Ok(None),
        };
        let copy_size = intcode::read_i64(&mut self.bz)
            .map_err(|e| Error::from_patch_read(e, "control record"))?;
        let skip_size = intcode::read_i64(&mut self.bz)
            .map_err(|e| Error::from_patch_read(e, "control record"))?;
        Ok(Some(ControlRecord {
            diff_size,
            copy_size,
            skip_size,
        }))
    }

    pub fn read_diff(&mut self, buf: &mut [u8]) -> Result<()> {
        self.bz
            .read_exact(buf)
            .map_err(|e| Error::from_patch_read(e, "diff segment"))
    }

    pub fn read_copy(&mut self, buf: &mut [u8]) -> Result<()> {
        self.bz
            .read_exact(buf)
            .map_err(|e| Error::from_patch_read(e, "extra segment"))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
