//! bsdelta: binary diff/patch compatible with the bsdiff patch formats.
//!
//! The crate provides:
//! - The suffix-array-driven diff generator and validated patch applier
//!   (`diff`, `index`)
//! - Codecs for the classic `BSDIFF40` and `ENDSLEY/BSDIFF43` patch
//!   formats with magic-based detection (`format`)
//! - Buffer-level drivers (`engine`) and file-oriented helpers (`io`)
//! - An optional CLI (`cli` feature)
//!
//! # Quick Start
//!
//! ```
//! use bsdelta::compress::Config;
//! use bsdelta::engine::{self, DiffOptions};
//!
//! let old = b"hello old world";
//! let new = b"hello new world";
//!
//! let mut patch = Vec::new();
//! engine::diff(old, new, &mut patch, &DiffOptions::default()).unwrap();
//! let restored = engine::apply(old, &patch, None, &Config::default()).unwrap();
//! assert_eq!(restored, new);
//! ```

pub mod compress;
pub mod diff;
pub mod engine;
pub mod error;
pub mod format;
pub mod index;
pub mod io;

#[cfg(feature = "cli")]
pub mod cli;

pub use error::{Error, Result};
pub use format::Format;
