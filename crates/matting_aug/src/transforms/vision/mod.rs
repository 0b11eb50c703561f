//! src/transforms/vision/mod.rs
//!
//! Image utilities backing the matting transforms.
//!
//! # Module Organization
//!
//! ```text
//! transforms/vision/
//! ├── conversion.rs  → image buffers <-> ndarray planes, alpha scaling
//! ├── geometric.rs   → Interpolation and resizing
//! ├── io.rs          → Image loading utilities
//! └── morphology.rs  → Structuring elements, erosion and dilation
//! ```

pub mod conversion;
pub mod geometric;
pub mod io;
pub mod morphology;

pub use conversion::{denormalize_alpha, normalize_alpha};
pub use geometric::Interpolation;
pub use io::LoadImage;
pub use morphology::{dilate, erode, StructuringElement};
