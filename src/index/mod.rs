// Suffix-array index over the `old` buffer.
//
// - `suffix` — construction (via divsufsort) and longest-prefix search
// - `codec`  — on-disk index format ("SUFFIX ARRAY\0")

pub mod codec;
pub mod suffix;

pub use codec::{INDEX_MAGIC, read_index, write_index};
pub use suffix::SuffixArray;
