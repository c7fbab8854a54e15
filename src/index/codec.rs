// Index file codec.
//
// Layout: 13-byte magic, one unit byte (element width: 1, 2, 4, or 8),
// then the suffix array as little-endian integers of that width. The
// element count is not stored; the loader takes it from the length of the
// associated `old` buffer.

use std::io::{Read, Write};

use crate::error::{Error, Result};
use crate::index::suffix::SuffixArray;

/// Magic bytes of the index file format.
pub const INDEX_MAGIC: &[u8; 13] = b"SUFFIX ARRAY\0";

/// Serialise a suffix array.
pub fn write_index<W: Write>(w: &mut W, sa: &SuffixArray) -> Result<()> {
    w.write_all(INDEX_MAGIC)?;
    w.write_all(&[sa.unit()])?;
    let unit = sa.unit() as usize;
    for &entry in sa.entries() {
        w.write_all(&entry.to_le_bytes()[..unit])?;
    }
    w.flush()?;
    Ok(())
}

/// Deserialise a suffix array for an `old` buffer of `old_len` bytes.
///
/// Validates the magic, the unit byte, that the stream holds `old_len`
/// whole elements, and that every element is a valid suffix offset.
pub fn read_index<R: Read>(r: &mut R, old_len: usize) -> Result<SuffixArray> {
    let mut magic = [0u8; INDEX_MAGIC.len()];
    read_fully(r, &mut magic)?;
    if &magic != INDEX_MAGIC {
        return Err(Error::CorruptIndex("bad index magic".into()));
    }

    let mut unit = [0u8; 1];
    read_fully(r, &mut unit)?;
    let unit = unit[0];
    if !matches!(unit, 1 | 2 | 4 | 8) {
        return Err(Error::CorruptIndex(format!(
            "invalid element width {unit} (expected 1, 2, 4, or 8)"
        )));
    }

    let mut data = vec![0u8; old_len * unit as usize];
    read_fully(r, &mut data)?;

    let mut entries = Vec::with_capacity(old_len);
    for chunk in data.chunks_exact(unit as usize) {
        let mut buf = [0u8; 8];
        buf[..chunk.len()].copy_from_slice(chunk);
        let entry = u64::from_le_bytes(buf);
        if entry >= old_len as u64 {
            return Err(Error::CorruptIndex(format!(
                "element {entry} out of range for {old_len}-byte input"
            )));
        }
        entries.push(entry);
    }

    Ok(SuffixArray::from_parts(unit, entries))
}

fn read_fully<R: Read>(r: &mut R, buf: &mut [u8]) -> Result<()> {
    r.read_exact(buf).map_err(|e| {
        if e.kind() == std::io::ErrorKind::UnexpectedEof {
            Error::CorruptIndex("index file shorter than implied length".into())
        } else {
            Error::Io(e)
        }
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
