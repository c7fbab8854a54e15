// Diff generation and patch application.
//
// - `generate` — the scan-extend-emit loop producing control/diff/extra records
// - `apply`    — validated reconstruction of `new` from `old` plus a patch

pub mod apply;
pub mod generate;

pub use apply::apply;
pub use generate::generate;
