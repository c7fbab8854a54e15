// Classic bsdiff patch format ("BSDIFF40").
//
// Layout: 8-byte magic, then three signed-magnitude integers (compressed
// control length, compressed diff length, new size), then three
// back-to-back bzip2 streams: control records, diff bytes, extra bytes.
// The three streams are consumed in lockstep, one record at a time.

use std::io::{Read, Write};

use bzip2::write::BzEncoder;

use crate::compress::{self, BzReader, Config};
use crate::error::{Error, Result};
use crate::format::intcode::{self, INT_SIZE};
use crate::format::{CLASSIC_MAGIC, ControlRecord};

/// Header length past the magic: ctrl_len, diff_len, new_size.
const HEADER_SIZE: usize = 3 * INT_SIZE;

// ---------------------------------------------------------------------------
// Encoder
// ---------------------------------------------------------------------------

/// Classic patch encoder.
///
/// The three sub-streams are compressed into memory as records arrive; the
/// header and the compressed blobs are committed in a single pass by
/// `finish`. The reference tool instead writes a placeholder header and
/// seeks back to fill it in; the bytes produced are identical, and no
/// `Seek` bound is needed.
pub struct ClassicWriter<W: Write> {
    out: W,
    new_size: u64,
    ctrl: BzEncoder<Vec<u8>>,
    diff: BzEncoder<Vec<u8>>,
    extra: BzEncoder<Vec<u8>>,
}

impl<W: Write> ClassicWriter<W> {
    pub fn new(out: W, new_size: u64, config: &Config) -> Self {
        Self {
            out,
            new_size,
            ctrl: compress::compressor(Vec::new(), config),
            diff: compress::compressor(Vec::new(), config),
            extra: compress::compressor(Vec::new(), config),
        }
    }

    pub fn control(&mut self, rec: ControlRecord) -> Result<()> {
        intcode::write_i64(&mut self.ctrl, rec.diff_size)?;
        intcode::write_i64(&mut self.ctrl, rec.copy_size)?;
        intcode::write_i64(&mut self.ctrl, rec.skip_size)?;
        Ok(())
    }

    pub fn diff_bytes(&mut self, data: &[u8]) -> Result<()> {
        self.diff.write_all(data)?;
        Ok(())
    }

    pub fn copy_bytes(&mut self, data: &[u8]) -> Result<()> {
        self.extra.write_all(data)?;
        Ok(())
    }

    /// Commit the patch: finish the three compressors, then write the
    /// header and the compressed blobs to the underlying writer.
    pub fn finish(self) -> Result<W> {
        let ctrl = self.ctrl.finish()?;
        let diff = self.diff.finish()?;
        let extra = self.extra.finish()?;

        let mut out = self.out;
        out.write_all(CLASSIC_MAGIC)?;
        intcode::write_i64(&mut out, ctrl.len() as i64)?;
        intcode::write_i64(&mut out, diff.len() as i64)?;
        intcode::write_i64(&mut out, self.new_size as i64)?;
        out.write_all(&ctrl)?;
        out.write_all(&diff)?;
        out.write_all(&extra)?;
        out.flush()?;
        Ok(out)
    }
}

// ---------------------------------------------------------------------------
// Decoder
// ---------------------------------------------------------------------------

/// Classic patch decoder over an in-memory patch body (the bytes after the
/// magic). Each sub-stream gets its own decompressor positioned by the
/// header's compressed lengths.
pub struct ClassicReader<'a> {
    new_size: u64,
    ctrl: BzReader<&'a [u8]>,
    diff: BzReader<&'a [u8]>,
    extra: BzReader<&'a [u8]>,
}

impl<'a> ClassicReader<'a> {
    /// Parse the header and position the three decompressors.
    pub fn open(body: &'a [u8], config: &Config) -> Result<Self> {
        if body.len() < HEADER_SIZE {
            return Err(Error::CorruptPatch("truncated classic header".into()));
        }
        let int_at = |i: usize| {
            let mut buf = [0u8; INT_SIZE];
            buf.copy_from_slice(&body[i * INT_SIZE..(i + 1) * INT_SIZE]);
            intcode::decode_i64(buf)
        };
        let ctrl_len = int_at(0);
        let diff_len = int_at(1);
        let new_size = int_at(2);
        if ctrl_len < 0 || diff_len < 0 || new_size < 0 {
            return Err(Error::CorruptPatch(
                "negative length in classic header".into(),
            ));
        }
        let (ctrl_len, diff_len) = (ctrl_len as usize, diff_len as usize);
        let rest = &body[HEADER_SIZE..];
        if ctrl_len
            .checked_add(diff_len)
            .is_none_or(|total| total > rest.len())
        {
            return Err(Error::CorruptPatch(
                "classic header lengths exceed patch size".into(),
            ));
        }

        Ok(Self {
            new_size: new_size as u64,
            ctrl: BzReader::new(&rest[..ctrl_len], config),
            diff: BzReader::new(&rest[ctrl_len..ctrl_len + diff_len], config),
            extra: BzReader::new(&rest[ctrl_len + diff_len..], config),
        })
    }

    pub fn new_size(&self) -> u64 {
        self.new_size
    }

    /// Decode the next control record, or `None` at the end of the control
    /// stream.
    pub fn next_control(&mut self) -> Result<Option<ControlRecord>> {
        let diff_size = match intcode::read_i64_opt(&mut self.ctrl)
            .map_err(|e| Error::from_patch_read(e, "control stream"))?
        {
            Some(x) => x,
            None => return Ok(None),
        };
        let copy_size = intcode::read_i64(&mut self.ctrl)
            .map_err(|e| Error::from_patch_read(e, "control record"))?;
        let skip_size = intcode::read_i64(&mut self.ctrl)
            .map_err(|e| Error::from_patch_read(e, "control record"))?;
        Ok(Some(ControlRecord {
            diff_size,
            copy_size,
            skip_size,
        }))
    }

    pub fn read_diff(&mut self, buf: &mut [u8]) -> Result<()> {
        self.diff
            .read_exact(buf)
            .map_err(|e| Error::from_patch_read(e, "diff stream"))
    }

    pub fn read_copy(&mut self, buf: &mut [u8]) -> Result<()> {
        self.extra
            .read_exact(buf)
            .map_err(|e| Error::from_patch_read(e, "extra stream"))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
