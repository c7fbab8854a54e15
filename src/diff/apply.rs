// Patch application: reconstruct `new` from `old` plus a patch stream.
//
// Every control record is validated before any of its bytes are consumed;
// a malformed patch fails with `CorruptPatch` and never reads out of
// bounds. Diff bytes are added (mod 256) to the old bytes at the running
// old-cursor; extra bytes are copied verbatim.

use log::debug;

use crate::error::{Error, Result};
use crate::format::PatchReader;

/// Apply `patch` to `old`, returning the reconstructed `new`.
pub fn apply(old: &[u8], patch: &mut PatchReader<'_>) -> Result<Vec<u8>> {
    let new_size = usize::try_from(patch.expected_new_size())
        .map_err(|_| Error::CorruptPatch("new size exceeds addressable memory".into()))?;

    let mut new = vec![0u8; new_size];
    let mut new_pos = 0usize;
    let mut old_pos = 0i64;
    let mut records = 0u64;

    while let Some(rec) = patch.next_control()? {
        if rec.diff_size < 0 || rec.copy_size < 0 {
            return Err(Error::CorruptPatch(format!(
                "negative segment size in control record {records}"
            )));
        }
        let diff_size = rec.diff_size as usize;
        let copy_size = rec.copy_size as usize;

        if diff_size
            .checked_add(copy_size)
            .and_then(|step| new_pos.checked_add(step))
            .is_none_or(|end| end > new_size)
        {
            return Err(Error::CorruptPatch(
                "control records exceed the declared new size".into(),
            ));
        }
        if old_pos < 0 || old_pos as usize + diff_size > old.len() {
            return Err(Error::CorruptPatch(format!(
                "old-cursor out of bounds at record {records} (cursor {old_pos})"
            )));
        }

        // Diff segment: patch bytes plus old bytes, mod 256.
        let dst = &mut new[new_pos..new_pos + diff_size];
        patch.read_diff(dst)?;
        for (b, &o) in dst.iter_mut().zip(&old[old_pos as usize..]) {
            *b = b.wrapping_add(o);
        }
        new_pos += diff_size;

        // Extra segment: verbatim copy.
        patch.read_copy(&mut new[new_pos..new_pos + copy_size])?;
        new_pos += copy_size;

        old_pos += rec.diff_size + rec.skip_size;
        records += 1;
    }

    if new_pos != new_size {
        return Err(Error::CorruptPatch(format!(
            "patch ended at byte {new_pos} of {new_size}"
        )));
    }

    debug!(
        "applied {} patch: old={} new={} records={}",
        patch.format(),
        old.len(),
        new_size,
        records
    );
    Ok(new)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
