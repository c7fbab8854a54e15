// End-to-end diff/apply round trips across both patch formats.

use bsdelta::compress::Config;
use bsdelta::engine::{self, DiffOptions};
use bsdelta::format::{FORMATS, Format, PatchReader};

fn make_patch(old: &[u8], new: &[u8], format: Format) -> Vec<u8> {
    let opts = DiffOptions {
        format,
        ..Default::default()
    };
    let mut patch = Vec::new();
    engine::diff(old, new, &mut patch, &opts).expect("diff failed");
    patch
}

fn roundtrip(old: &[u8], new: &[u8]) {
    for format in FORMATS {
        let patch = make_patch(old, new, format);
        let got = engine::apply(old, &patch, None, &Config::default()).expect("apply failed");
        assert_eq!(
            got,
            new,
            "roundtrip mismatch ({format}, old={}, new={}, patch={})",
            old.len(),
            new.len(),
            patch.len()
        );
    }
}

/// Deterministic pseudo-random bytes.
fn noise(len: usize, seed: u32) -> Vec<u8> {
    let mut state = seed | 1;
    (0..len)
        .map(|_| {
            state = state.wrapping_mul(1664525).wrapping_add(1013904223);
            (state >> 24) as u8
        })
        .collect()
}

#[test]
fn roundtrip_text_edit() {
    roundtrip(b"Goodbye, world.", b"Hello, world!");
}

#[test]
fn roundtrip_small_cases() {
    roundtrip(b"", b"");
    roundtrip(b"", b"x");
    roundtrip(b"x", b"");
    roundtrip(b"x", b"x");
    roundtrip(b"x", b"y");
}

#[test]
fn roundtrip_scattered_mutations() {
    let old = noise(64 * 1024, 7);
    let mut new = old.clone();
    for i in (0..new.len()).step_by(1024) {
        new[i] = new[i].wrapping_add(1);
    }
    roundtrip(&old, &new);
}

#[test]
fn roundtrip_block_move() {
    let old = noise(16 * 1024, 11);
    let mut new = Vec::new();
    new.extend_from_slice(&old[8192..]);
    new.extend_from_slice(&old[..8192]);
    roundtrip(&old, &new);
}

#[test]
fn roundtrip_insert_delete_grow() {
    let old = noise(8192, 23);
    let mut new = old.clone();
    new.splice(4000..4100, b"freshly inserted content".iter().copied());
    new.extend_from_slice(&noise(2048, 29));
    roundtrip(&old, &new);
}

#[test]
fn roundtrip_unrelated_inputs() {
    roundtrip(&noise(4096, 1), &noise(4096, 2));
}

#[test]
fn roundtrip_highly_repetitive_input() {
    let old: Vec<u8> = b"abcabcabc".iter().copied().cycle().take(4096).collect();
    let mut new = old.clone();
    new[2000] = b'X';
    roundtrip(&old, &new);
}

#[test]
fn diffing_is_deterministic() {
    let old = noise(32 * 1024, 5);
    let mut new = old.clone();
    new.splice(10_000..10_000, b"wedge".iter().copied());

    for format in FORMATS {
        let a = make_patch(&old, &new, format);
        let b = make_patch(&old, &new, format);
        assert_eq!(a, b, "{format} output must be deterministic");
    }
}

#[test]
fn similar_inputs_compress_well() {
    let old = noise(128 * 1024, 3);
    let mut new = old.clone();
    new[70_000] ^= 0xFF;

    for format in FORMATS {
        let patch = make_patch(&old, &new, format);
        assert!(
            patch.len() < old.len() / 16,
            "{format} patch is {} bytes for a {} byte input",
            patch.len(),
            old.len()
        );
    }
}

#[test]
fn record_sums_match_declared_new_size() {
    let old = noise(8192, 17);
    let mut new = old.clone();
    new.truncate(6000);
    new.extend_from_slice(&noise(500, 19));

    let config = Config::default();
    for format in FORMATS {
        let patch = make_patch(&old, &new, format);
        let mut reader = PatchReader::open(&patch, None, &config).unwrap();
        assert_eq!(reader.expected_new_size(), new.len() as u64);

        let mut covered = 0i64;
        let mut old_pos = 0i64;
        while let Some(rec) = reader.next_control().unwrap() {
            assert!(rec.diff_size >= 0 && rec.copy_size >= 0, "{format}");
            assert!(old_pos >= 0 && old_pos + rec.diff_size <= old.len() as i64);
            covered += rec.diff_size + rec.copy_size;

            let mut sink = vec![0u8; rec.diff_size as usize];
            reader.read_diff(&mut sink).unwrap();
            let mut sink = vec![0u8; rec.copy_size as usize];
            reader.read_copy(&mut sink).unwrap();

            old_pos += rec.diff_size + rec.skip_size;
        }
        assert_eq!(covered, new.len() as i64, "{format}");
    }
}

#[test]
fn detection_matches_requested_format() {
    for format in FORMATS {
        let patch = make_patch(b"aaa", b"aab", format);
        assert_eq!(bsdelta::format::detect_slice(&patch), Some(format));
    }
}

#[test]
fn lowmem_roundtrip_large_input() {
    let config = Config { lowmem: true };
    let old = noise(96 * 1024, 41);
    let mut new = old.clone();
    new[1000] ^= 1;
    new[90_000] ^= 2;

    for format in FORMATS {
        let opts = DiffOptions { format, config };
        let mut patch = Vec::new();
        engine::diff(&old, &new, &mut patch, &opts).unwrap();
        assert_eq!(engine::apply(&old, &patch, None, &config).unwrap(), new);
    }
}
