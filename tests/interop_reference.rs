// Cross-implementation compatibility with the reference bsdiff-4.x
// implementation (the qbsdiff crate): patches we produce in the classic
// format must apply with the reference patcher, and reference patches must
// apply with our engine.

use std::io;

use bsdelta::compress::Config;
use bsdelta::engine::{self, DiffOptions};
use bsdelta::format::Format;
use qbsdiff::{Bsdiff, Bspatch};

fn our_diff(old: &[u8], new: &[u8]) -> Vec<u8> {
    let opts = DiffOptions {
        format: Format::Classic,
        ..Default::default()
    };
    let mut patch = Vec::new();
    engine::diff(old, new, &mut patch, &opts).unwrap();
    patch
}

fn reference_diff(old: &[u8], new: &[u8]) -> Vec<u8> {
    let mut patch = Vec::new();
    Bsdiff::new(old, new)
        .compare(io::Cursor::new(&mut patch))
        .unwrap();
    patch
}

fn reference_apply(old: &[u8], patch: &[u8]) -> Vec<u8> {
    let mut new = Vec::new();
    Bspatch::new(patch)
        .unwrap()
        .apply(old, io::Cursor::new(&mut new))
        .unwrap();
    new
}

fn vectors() -> Vec<(Vec<u8>, Vec<u8>)> {
    let mut state = 0x2545F491u32;
    let mut noise = |len: usize| -> Vec<u8> {
        (0..len)
            .map(|_| {
                state = state.wrapping_mul(1664525).wrapping_add(1013904223);
                (state >> 24) as u8
            })
            .collect()
    };

    let base = noise(24 * 1024);
    let mut edited = base.clone();
    edited[5000] ^= 0xFF;
    edited.splice(12_000..12_000, b"inserted run".iter().copied());

    vec![
        (b"Goodbye, world.".to_vec(), b"Hello, world!".to_vec()),
        (Vec::new(), b"from nothing".to_vec()),
        (b"to nothing".to_vec(), Vec::new()),
        (b"same bytes".to_vec(), b"same bytes".to_vec()),
        (base.clone(), edited),
        (noise(4096), noise(4096)),
    ]
}

#[test]
fn reference_patcher_accepts_our_patches() {
    for (i, (old, new)) in vectors().iter().enumerate() {
        let patch = our_diff(old, new);
        let restored = reference_apply(old, &patch);
        assert_eq!(&restored, new, "vector {i}");
    }
}

#[test]
fn our_engine_accepts_reference_patches() {
    let config = Config::default();
    for (i, (old, new)) in vectors().iter().enumerate() {
        let patch = reference_diff(old, new);
        assert_eq!(bsdelta::format::detect_slice(&patch), Some(Format::Classic));
        let restored = engine::apply(old, &patch, None, &config).unwrap();
        assert_eq!(&restored, new, "vector {i}");
    }
}

#[test]
fn reference_patches_pass_with_explicit_classic() {
    let (old, new) = (b"explicit format".to_vec(), b"explicit fmt!".to_vec());
    let patch = reference_diff(&old, &new);
    let restored = engine::apply(&old, &patch, Some(Format::Classic), &Config::default()).unwrap();
    assert_eq!(restored, new);
}
