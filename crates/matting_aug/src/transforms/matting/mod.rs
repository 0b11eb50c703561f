//! src/transforms/matting/mod.rs
//!
//! Sample transforms for matting training data.
//!
//! ```text
//! transforms/matting/
//! ├── merge.rs      → MergeFgAndBg: composite fg over bg with alpha
//! ├── trimap.rs     → GenerateTrimap: random erode/dilate trimap from alpha
//! └── composite.rs  → CompositeFg: blend with a random fg/alpha pair from disk
//! ```
//!
//! Each transform is a `Transform<Sample, Sample>`; the random ones also
//! expose `apply_with_rng` for an explicit generator.

pub mod composite;
pub mod merge;
pub mod trimap;

pub use composite::{screen_alpha, CompositeFg, CompositeFgBuilder};
pub use merge::MergeFgAndBg;
pub use trimap::{GenerateTrimap, MorphDraw, TRIMAP_BG, TRIMAP_FG, TRIMAP_UNKNOWN};
