// Buffer-level drivers tying the index, generator, applier, and formats
// together.
//
// These operate on in-memory buffers and byte streams; path-oriented
// wrappers with temp-file handling live in `io`.

use std::io::Write;

use crate::compress::Config;
use crate::diff;
use crate::error::Result;
use crate::format::{Format, PatchReader, PatchWriter};
use crate::index::SuffixArray;

// ---------------------------------------------------------------------------
// Options
// ---------------------------------------------------------------------------

/// Configuration for diff generation.
#[derive(Debug, Clone, Copy, Default)]
pub struct DiffOptions {
    /// Patch format to produce.
    pub format: Format,
    /// Compression configuration.
    pub config: Config,
}

// ---------------------------------------------------------------------------
// Diff
// ---------------------------------------------------------------------------

/// Diff `old` against `new`, writing a complete patch to `out`.
///
/// Builds a fresh suffix array; use `diff_with_index` to reuse one across
/// multiple diffs of the same `old`. Returns the number of control records.
pub fn diff<W: Write>(old: &[u8], new: &[u8], out: W, opts: &DiffOptions) -> Result<u64> {
    let index = SuffixArray::build(old);
    diff_with_index(old, &index, new, out, opts)
}

/// Diff with a precomputed suffix array of `old`.
///
/// The patch is fully committed before returning, whether or not the caller
/// looks at the result.
pub fn diff_with_index<W: Write>(
    old: &[u8],
    index: &SuffixArray,
    new: &[u8],
    out: W,
    opts: &DiffOptions,
) -> Result<u64> {
    let mut patch = PatchWriter::new(opts.format, out, new.len() as u64, &opts.config)?;
    let records = diff::generate(old, index, new, &mut patch)?;
    patch.finish()?;
    Ok(records)
}

// ---------------------------------------------------------------------------
// Apply
// ---------------------------------------------------------------------------

/// Apply a patch to `old`, reconstructing `new`.
///
/// With `requested == None` the format is auto-detected from the magic;
/// otherwise the detected format must match.
pub fn apply(
    old: &[u8],
    patch: &[u8],
    requested: Option<Format>,
    config: &Config,
) -> Result<Vec<u8>> {
    let mut reader = PatchReader::open(patch, requested, config)?;
    diff::apply(old, &mut reader)
}

// ---------------------------------------------------------------------------
// Index
// ---------------------------------------------------------------------------

/// Precompute the suffix array of `old` for reuse or serialisation.
pub fn index(old: &[u8]) -> SuffixArray {
    SuffixArray::build(old)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::FORMATS;

    fn roundtrip(old: &[u8], new: &[u8]) {
        for format in FORMATS {
            let opts = DiffOptions {
                format,
                ..Default::default()
            };
            let mut patch = Vec::new();
            diff(old, new, &mut patch, &opts).expect("diff failed");
            let got = apply(old, &patch, None, &opts.config).expect("apply failed");
            assert_eq!(
                got,
                new,
                "roundtrip mismatch ({format}, old={}, new={})",
                old.len(),
                new.len()
            );
        }
    }

    #[test]
    fn roundtrip_hello_world() {
        roundtrip(b"Goodbye, world.", b"Hello, world!");
    }

    #[test]
    fn roundtrip_empty_old() {
        roundtrip(b"", b"x");
        roundtrip(b"", b"entirely new content");
    }

    #[test]
    fn roundtrip_empty_new() {
        roundtrip(b"x", b"");
        roundtrip(b"old content", b"");
    }

    #[test]
    fn roundtrip_both_empty() {
        roundtrip(b"", b"");
    }

    #[test]
    fn roundtrip_identical() {
        roundtrip(b"abcdef", b"abcdef");
        let data: Vec<u8> = (0u8..=255).cycle().take(4096).collect();
        roundtrip(&data, &data);
    }

    #[test]
    fn roundtrip_binary_data() {
        let old: Vec<u8> = (0u8..=255).cycle().take(8192).collect();
        let mut new = old.clone();
        new[100] = 0xFF;
        new[4000] = 0x00;
        new[8000] = 0x42;
        roundtrip(&old, &new);
    }

    #[test]
    fn roundtrip_insert_and_delete() {
        let old = b"The quick brown fox jumps over the lazy dog.";
        let new = b"The very quick brown fox vaulted the dog.";
        roundtrip(old, new);
    }

    #[test]
    fn single_flip_patch_is_much_smaller_than_input() {
        let old = vec![0u8; 1024];
        let mut new = old.clone();
        new[500] = 0x01;

        for format in FORMATS {
            let opts = DiffOptions {
                format,
                ..Default::default()
            };
            let mut patch = Vec::new();
            diff(&old, &new, &mut patch, &opts).unwrap();
            assert!(
                patch.len() < 256,
                "{format} patch is {} bytes for a 1 KiB input",
                patch.len()
            );
            assert_eq!(apply(&old, &patch, None, &opts.config).unwrap(), new);
        }
    }

    #[test]
    fn lowmem_mode_roundtrip_and_interop() {
        let lowmem = Config { lowmem: true };
        let normal = Config::default();
        let old = b"low memory mode exercises the small decompressor";
        let new = b"low memory mode exercises the small decoder too!";

        for format in FORMATS {
            let opts = DiffOptions {
                format,
                config: lowmem,
            };
            let mut patch = Vec::new();
            diff(old, new, &mut patch, &opts).unwrap();
            // Either mode can decode either mode's output.
            assert_eq!(apply(old, &patch, None, &lowmem).unwrap(), new);
            assert_eq!(apply(old, &patch, None, &normal).unwrap(), new);
        }
    }

    #[test]
    fn precomputed_index_matches_fresh_index() {
        let old = b"shared old buffer, indexed once, diffed twice";
        let idx = index(old);
        let opts = DiffOptions::default();

        for new in [&b"shared old buffer, diffed twice"[..], b"unrelated"] {
            let mut with_idx = Vec::new();
            diff_with_index(old, &idx, new, &mut with_idx, &opts).unwrap();
            let mut fresh = Vec::new();
            diff(old, new, &mut fresh, &opts).unwrap();
            assert_eq!(with_idx, fresh);
            assert_eq!(apply(old, &with_idx, None, &opts.config).unwrap(), new);
        }
    }

    #[test]
    fn requested_format_is_enforced() {
        let opts = DiffOptions {
            format: Format::Endsley,
            ..Default::default()
        };
        let mut patch = Vec::new();
        diff(b"a", b"b", &mut patch, &opts).unwrap();

        assert!(apply(b"a", &patch, Some(Format::Endsley), &opts.config).is_ok());
        assert!(matches!(
            apply(b"a", &patch, Some(Format::Classic), &opts.config),
            Err(crate::error::Error::FormatMismatch { .. })
        ));
    }
}
