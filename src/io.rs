// File-level drivers.
//
// Path-oriented wrappers over `engine`: inputs are read whole, outputs go
// through a guard that removes partially written files on failure, and an
// omitted output lands in a fresh temporary file whose path is returned.
// Optionally computes SHA-256 digests of the data that flowed through
// (feature `file-io`).

use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use log::debug;

use crate::compress::Config;
use crate::engine::{self, DiffOptions};
use crate::error::Result;
use crate::format::Format;
use crate::index::{self, SuffixArray};

const BUF_SIZE: usize = 64 * 1024;

// ---------------------------------------------------------------------------
// Stats
// ---------------------------------------------------------------------------

/// Statistics returned by `diff_file`.
#[derive(Debug, Clone)]
pub struct DiffStats {
    /// Old input size in bytes.
    pub old_size: u64,
    /// New input size in bytes.
    pub new_size: u64,
    /// Patch output size in bytes.
    pub patch_size: u64,
    /// Number of control records written.
    pub records: u64,
    /// SHA-256 of the old input (if the `file-io` feature is enabled).
    pub old_sha256: Option<[u8; 32]>,
    /// SHA-256 of the new input (if the `file-io` feature is enabled).
    pub new_sha256: Option<[u8; 32]>,
}

/// Statistics returned by `apply_file`.
#[derive(Debug, Clone)]
pub struct ApplyStats {
    /// Old input size in bytes.
    pub old_size: u64,
    /// Patch input size in bytes.
    pub patch_size: u64,
    /// Reconstructed output size in bytes.
    pub new_size: u64,
    /// SHA-256 of the reconstructed output (if `file-io` is enabled).
    pub new_sha256: Option<[u8; 32]>,
}

#[cfg(feature = "file-io")]
fn sha256(data: &[u8]) -> Option<[u8; 32]> {
    use sha2::Digest;
    let mut h = sha2::Sha256::new();
    h.update(data);
    Some(h.finalize().into())
}

#[cfg(not(feature = "file-io"))]
fn sha256(_data: &[u8]) -> Option<[u8; 32]> {
    None
}

// ---------------------------------------------------------------------------
// Output resolution
// ---------------------------------------------------------------------------

/// Where a driver output goes.
#[derive(Debug, Clone)]
pub enum OutputSink {
    /// Write to this path.
    Path(PathBuf),
    /// Write to a fresh temporary file; the resulting path is returned.
    Temp,
}

impl OutputSink {
    /// `Some(path)` writes there, `None` falls back to a temporary file.
    pub fn from_opt(path: Option<&Path>) -> Self {
        match path {
            Some(p) => Self::Path(p.to_path_buf()),
            None => Self::Temp,
        }
    }
}

/// An output file that is deleted unless the operation commits.
///
/// Explicit destination paths are removed on drop; temporary outputs rely
/// on `TempPath`'s own cleanup. `commit` persists the file and hands back
/// its path.
struct OutputGuard {
    path: PathBuf,
    temp: Option<tempfile::TempPath>,
    committed: bool,
}

impl OutputGuard {
    fn create(sink: &OutputSink) -> Result<(BufWriter<File>, Self)> {
        match sink {
            OutputSink::Path(path) => {
                let file = File::create(path)?;
                Ok((
                    BufWriter::with_capacity(BUF_SIZE, file),
                    Self {
                        path: path.clone(),
                        temp: None,
                        committed: false,
                    },
                ))
            }
            OutputSink::Temp => {
                let (file, temp) = tempfile::NamedTempFile::new()?.into_parts();
                Ok((
                    BufWriter::with_capacity(BUF_SIZE, file),
                    Self {
                        path: temp.to_path_buf(),
                        temp: Some(temp),
                        committed: false,
                    },
                ))
            }
        }
    }

    fn commit(mut self) -> Result<PathBuf> {
        if let Some(temp) = self.temp.take() {
            temp.keep().map_err(|e| e.error)?;
        }
        self.committed = true;
        Ok(std::mem::take(&mut self.path))
    }
}

impl Drop for OutputGuard {
    fn drop(&mut self) {
        if !self.committed && self.temp.is_none() {
            let _ = std::fs::remove_file(&self.path);
        }
    }
}

// ---------------------------------------------------------------------------
// diff_file
// ---------------------------------------------------------------------------

/// Diff two files, writing the patch to `sink`.
///
/// Both inputs are read fully into memory. Returns the patch path and
/// stats. On any failure the partially written patch is removed.
pub fn diff_file(
    old_path: &Path,
    new_path: &Path,
    sink: &OutputSink,
    opts: &DiffOptions,
) -> Result<(PathBuf, DiffStats)> {
    let old = std::fs::read(old_path)?;
    let index = SuffixArray::build(&old);
    diff_file_inner(&old, &index, new_path, sink, opts)
}

/// Diff with a previously serialised suffix array of the old file.
pub fn diff_file_with_index(
    old_path: &Path,
    index_path: &Path,
    new_path: &Path,
    sink: &OutputSink,
    opts: &DiffOptions,
) -> Result<(PathBuf, DiffStats)> {
    let old = std::fs::read(old_path)?;
    let mut reader = BufReader::with_capacity(BUF_SIZE, File::open(index_path)?);
    let index = index::read_index(&mut reader, old.len())?;
    diff_file_inner(&old, &index, new_path, sink, opts)
}

fn diff_file_inner(
    old: &[u8],
    index: &SuffixArray,
    new_path: &Path,
    sink: &OutputSink,
    opts: &DiffOptions,
) -> Result<(PathBuf, DiffStats)> {
    let new = std::fs::read(new_path)?;

    let (mut writer, guard) = OutputGuard::create(sink)?;
    let records = engine::diff_with_index(old, index, &new, &mut writer, opts)?;
    writer.flush()?;
    let patch_size = writer
        .into_inner()
        .map_err(|e| e.into_error())?
        .metadata()?
        .len();
    let path = guard.commit()?;

    debug!(
        "diff_file: {} -> {} ({patch_size} patch bytes)",
        old.len(),
        new.len()
    );

    Ok((
        path,
        DiffStats {
            old_size: old.len() as u64,
            new_size: new.len() as u64,
            patch_size,
            records,
            old_sha256: sha256(old),
            new_sha256: sha256(&new),
        },
    ))
}

// ---------------------------------------------------------------------------
// apply_file
// ---------------------------------------------------------------------------

/// Apply a patch file to an old file, writing the result to `sink`.
///
/// With `requested == None` the patch format is auto-detected.
pub fn apply_file(
    old_path: &Path,
    patch_path: &Path,
    sink: &OutputSink,
    requested: Option<Format>,
    config: &Config,
) -> Result<(PathBuf, ApplyStats)> {
    let old = std::fs::read(old_path)?;
    let patch = std::fs::read(patch_path)?;

    let new = engine::apply(&old, &patch, requested, config)?;

    let (mut writer, guard) = OutputGuard::create(sink)?;
    writer.write_all(&new)?;
    writer.flush()?;
    let path = guard.commit()?;

    Ok((
        path,
        ApplyStats {
            old_size: old.len() as u64,
            patch_size: patch.len() as u64,
            new_size: new.len() as u64,
            new_sha256: sha256(&new),
        },
    ))
}

// ---------------------------------------------------------------------------
// index_file
// ---------------------------------------------------------------------------

/// Precompute and serialise the suffix array of a file.
pub fn index_file(old_path: &Path, sink: &OutputSink) -> Result<PathBuf> {
    let old = std::fs::read(old_path)?;
    let index = SuffixArray::build(&old);

    let (mut writer, guard) = OutputGuard::create(sink)?;
    index::write_index(&mut writer, &index)?;
    writer.flush()?;
    guard.commit()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
