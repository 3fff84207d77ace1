//! Data model of the stencil mesh update benchmark

pub mod csv;
pub mod mesh;
pub mod parameters;

/// Computation precision
pub type Precision = f32;

/// Build a 2-element array from an index -> value mapping
///
/// Most quantities in this workspace come in [rows, cols] pairs, this makes
/// them less tedious to compute.
#[inline]
pub fn array2<T>(f: impl FnMut(usize) -> T) -> [T; 2] {
    std::array::from_fn(f)
}
