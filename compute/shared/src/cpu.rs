//! Facilities that are specific to CPU implementations

use crate::{Update, UpdateBase, UpdateCreate};
use data::{
    mesh::MeshStore,
    parameters::{stencil_offset, StencilWeights},
    Precision,
};
use ndarray::{ArrayView2, ArrayViewMut2};

/// Simplified version of Update that performs a single update cycle at a time
///
/// If you implement this, then an [`Update`] implementation that loops over
/// update cycles will be automatically provided.
pub trait UpdateStep: UpdateBase + UpdateCreate {
    /// Perform a single update cycle
    ///
    /// On return, the live mesh of `store` must contain the updated values of
    /// all interior cells, computed from the values it held beforehand.
    fn perform_iteration(&self, store: &mut MeshStore) -> Result<(), Self::Error>;
}
//
impl<T: UpdateStep> Update for T {
    fn perform_iterations(
        &self,
        store: &mut MeshStore,
        iterations: usize,
    ) -> Result<(), Self::Error> {
        for _ in 0..iterations {
            self.perform_iteration(store)?;
        }
        Ok(())
    }
}

/// Lower-level grid-based interface to a CPU compute backend
///
/// Some CPU compute backends expose a lower-level interface based on
/// computations over rectangular regions of the mesh.
///
/// This is used by the block-based backends (`block`, `parallel`, ...) to
/// slice the mesh interior into smaller sub-computations for parallelization
/// purposes.
///
/// If you implement this, then [`Update`] will be implemented automatically,
/// by applying the stencil to the full interior then committing the result.
pub trait UpdateCpu: UpdateBase + UpdateCreate {
    /// Apply the stencil to the full mesh interior or a subset thereof
    ///
    /// This method does not check the grid for consistency, but is used to
    /// implement `apply_impl` that does perform some sanity checks.
    fn unchecked_apply_impl(&self, grid: CpuGrid);

    /// Check that the CpuGrid seems correct
    ///
    /// Note that full correctness checking would involve making sure that the
    /// input and output array views point to the same region of the mesh,
    /// which cannot be done. Therefore, this is only a partial sanity check.
    fn check_grid((input, output): &CpuGrid) {
        let stencil_offset = stencil_offset();
        debug_assert_eq!(input.nrows(), output.nrows() + 2 * stencil_offset[0]);
        debug_assert_eq!(input.ncols(), output.ncols() + 2 * stencil_offset[1]);
    }

    /// Like `unchecked_apply_impl()`, but with some sanity checks
    #[inline]
    fn apply_impl(&self, grid: CpuGrid) {
        Self::check_grid(&grid);
        self.unchecked_apply_impl(grid);
    }
}
//
/// Low-level representation of a region of the mesh used by UpdateCpu
///
/// Composed of the input values and the output values. Note that the input
/// values include a neighborhood of size [`data::parameters::stencil_offset()`]
/// around the region of interest, which the output values do not.
pub type CpuGrid<'input, 'output> = (
    ArrayView2<'input, Precision>,
    ArrayViewMut2<'output, Precision>,
);
//
impl<T: UpdateCpu> UpdateStep for T {
    fn perform_iteration(&self, store: &mut MeshStore) -> Result<(), Self::Error> {
        self.apply_impl(store.compute_views());
        store.commit_interior();
        Ok(())
    }
}

/// Updated value of the cell at the center of a stencil-shaped window
///
/// This is the cell's current value plus the weighted sum of the window, in
/// row-major order. All scalar code paths go through this function so that
/// they round in the same way.
#[inline]
pub fn update_cell(window: ArrayView2<Precision>, weights: &StencilWeights) -> Precision {
    let center = window[stencil_offset()];
    (window.rows().into_iter())
        .zip(&weights.0)
        .flat_map(|(values, weights)| values.into_iter().zip(weights))
        .fold(center, |acc, (&value, &weight)| acc + weight * value)
}
