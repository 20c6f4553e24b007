//! Small dense matrix type used for feature storage.
//!
//! `Array2` is row-major so a record's feature vector is a contiguous slice,
//! which is what tree descent and distance computations consume.
pub mod matrix;

pub use matrix::{Array2, ShapeError};
