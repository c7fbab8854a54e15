// Signed-magnitude 64-bit integer codec used by both patch formats.
//
// Non-negative values are stored as-is in little-endian; negative values
// store the magnitude with the high bit set. Small negative values then
// keep their high bytes zero, which entropy-codes far better than the
// 0xFF runs of two's complement.
//
// `i64::MIN` has no representation: its encoding collides with negative
// zero. The reference tools never emit it and neither do we.

use std::io::{self, Read, Write};

const SIGN_BIT: u64 = 1 << 63;

/// Encoded width of every integer in a patch stream.
pub const INT_SIZE: usize = 8;

// ---------------------------------------------------------------------------
// Slice codec
// ---------------------------------------------------------------------------

/// Encode `x` into its 8-byte signed-magnitude little-endian form.
#[inline]
pub fn encode_i64(x: i64) -> [u8; INT_SIZE] {
    debug_assert!(x != i64::MIN, "i64::MIN is not representable");
    let raw = if x < 0 {
        x.unsigned_abs() | SIGN_BIT
    } else {
        x as u64
    };
    raw.to_le_bytes()
}

/// Decode an 8-byte signed-magnitude little-endian integer.
///
/// Negative zero (sign bit with zero magnitude) decodes to 0, matching the
/// reference decoders.
#[inline]
pub fn decode_i64(bytes: [u8; INT_SIZE]) -> i64 {
    let raw = u64::from_le_bytes(bytes);
    let magnitude = (raw & !SIGN_BIT) as i64;
    if raw & SIGN_BIT != 0 {
        -magnitude
    } else {
        magnitude
    }
}

// ---------------------------------------------------------------------------
// Stream helpers
// ---------------------------------------------------------------------------

/// Write one encoded integer to a `Write` sink.
pub fn write_i64<W: Write>(w: &mut W, x: i64) -> io::Result<()> {
    w.write_all(&encode_i64(x))
}

/// Read one encoded integer from a streaming source.
pub fn read_i64<R: Read>(r: &mut R) -> io::Result<i64> {
    let mut buf = [0u8; INT_SIZE];
    r.read_exact(&mut buf)?;
    Ok(decode_i64(buf))
}

/// Read one encoded integer, returning `None` on a clean end of stream.
///
/// "Clean" means the very first byte is already past the end; a partial
/// integer is reported as `UnexpectedEof`.
pub fn read_i64_opt<R: Read>(r: &mut R) -> io::Result<Option<i64>> {
    let mut buf = [0u8; INT_SIZE];
    let mut filled = 0;
    while filled < INT_SIZE {
        let n = r.read(&mut buf[filled..])?;
        if n == 0 {
            return if filled == 0 {
                Ok(None)
            } else {
                Err(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    "truncated integer",
                ))
            };
        }
        filled += n;
    }
    Ok(Some(decode_i64(buf)))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
