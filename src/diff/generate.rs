// Diff generation: the scan-extend-emit loop.
//
// Walks `new` with a cursor, querying the suffix array for the longest
// match of the remaining input in `old`. A candidate match is accepted
// only when it beats the "shifted old" alignment carried over from the
// previous record by more than 8 bytes (or matches it exactly, meaning
// the current diff region simply extends). Accepted boundaries are then
// refined: the previous region extends forward and the new match extends
// backward as long as more than half the bytes agree, and an overlap is
// split where the balance of matches tips from one side to the other.
//
// Each emitted record covers `diff_size` bytes encoded as new-minus-old
// deltas (long zero runs where the inputs agree, which bzip2 collapses)
// followed by `copy_size` literal bytes that have no counterpart in `old`.

use std::io::Write;

use log::debug;

use crate::error::Result;
use crate::format::{ControlRecord, PatchWriter};
use crate::index::SuffixArray;

/// Candidates must beat the shifted-old alignment by this many bytes.
const MATCH_SLACK: usize = 8;

/// Generate a patch transforming `old` into `new`, streaming records into
/// `patch`. Returns the number of control records emitted.
///
/// The caller retains ownership of the writer and must call its `finish`
/// to commit the patch.
pub fn generate<W: Write>(
    old: &[u8],
    index: &SuffixArray,
    new: &[u8],
    patch: &mut PatchWriter<W>,
) -> Result<u64> {
    let old_size = old.len();
    let new_size = new.len();
    let mut records = 0u64;
    let mut diff_buf: Vec<u8> = Vec::new();

    let mut scan = 0usize;
    let mut len = 0usize;
    let mut pos = 0usize;
    let mut lastscan = 0usize;
    let mut lastpos = 0usize;
    let mut lastoffset = 0i64;

    while scan < new_size {
        let mut oldscore = 0usize;
        scan += len;
        let mut scsc = scan;

        // Find the next candidate match.
        while scan < new_size {
            (pos, len) = index.search(old, &new[scan..]);

            // Extend the shifted-old score over the candidate's window.
            while scsc < scan + len {
                let shifted = (scsc as i64 + lastoffset) as usize;
                if shifted < old_size && old[shifted] == new[scsc] {
                    oldscore += 1;
                }
                scsc += 1;
            }

            if (len == oldscore && len != 0) || len > oldscore + MATCH_SLACK {
                break;
            }

            // The byte at `scan` leaves the window as the cursor advances.
            let shifted = (scan as i64 + lastoffset) as usize;
            if shifted < old_size && old[shifted] == new[scan] {
                oldscore -= 1;
            }
            scan += 1;
        }

        if len != oldscore || scan == new_size {
            // Forward extension from the previous boundary: keep the prefix
            // whose running match density stays above one half.
            let mut s = 0i64;
            let mut best = 0i64;
            let mut lenf = 0usize;
            let mut i = 0usize;
            while lastscan + i < scan && lastpos + i < old_size {
                if old[lastpos + i] == new[lastscan + i] {
                    s += 1;
                }
                i += 1;
                if s * 2 - i as i64 > best * 2 - lenf as i64 {
                    best = s;
                    lenf = i;
                }
            }

            // Backward extension from the candidate, symmetric.
            let mut lenb = 0usize;
            if scan < new_size {
                let mut s = 0i64;
                let mut best = 0i64;
                let mut i = 1usize;
                while scan >= lastscan + i && pos >= i {
                    if old[pos - i] == new[scan - i] {
                        s += 1;
                    }
                    if s * 2 - i as i64 > best * 2 - lenb as i64 {
                        best = s;
                        lenb = i;
                    }
                    i += 1;
                }
            }

            // If the regions overlap, split where the balance of forward
            // matches minus backward matches peaks.
            if lastscan + lenf > scan - lenb {
                let overlap = (lastscan + lenf) - (scan - lenb);
                let mut s = 0i64;
                let mut best = 0i64;
                let mut lens = 0usize;
                for i in 0..overlap {
                    if new[lastscan + lenf - overlap + i] == old[lastpos + lenf - overlap + i] {
                        s += 1;
                    }
                    if new[scan - lenb + i] == old[pos - lenb + i] {
                        s -= 1;
                    }
                    if s > best {
                        best = s;
                        lens = i + 1;
                    }
                }
                lenf += lens;
                lenf -= overlap;
                lenb -= lens;
            }

            let copy_start = lastscan + lenf;
            let copy_end = scan - lenb;
            let skip_size = (pos as i64 - lenb as i64) - (lastpos as i64 + lenf as i64);

            // Empty records are never written.
            if lenf > 0 || copy_end > copy_start {
                patch.control(ControlRecord {
                    diff_size: lenf as i64,
                    copy_size: (copy_end - copy_start) as i64,
                    skip_size,
                })?;

                diff_buf.clear();
                diff_buf.extend(
                    (0..lenf).map(|i| new[lastscan + i].wrapping_sub(old[lastpos + i])),
                );
                patch.diff_bytes(&diff_buf)?;
                patch.copy_bytes(&new[copy_start..copy_end])?;
                records += 1;
            }

            lastscan = scan - lenb;
            lastpos = pos - lenb;
            lastoffset = pos as i64 - scan as i64;
        }
    }

    debug!(
        "generated {} patch: old={} new={} records={}",
        patch.format(),
        old_size,
        new_size,
        records
    );
    Ok(records)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
