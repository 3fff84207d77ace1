//! Naive implementation of the stencil mesh update
//!
//! Every interior cell is computed from its stencil-shaped neighborhood, one
//! cell at a time, into the scratch buffer. The scratch interior is committed
//! into the live mesh once the whole interior has been computed.
//!
//! This is slow, but simple enough to serve as the reference that all other
//! backends are checked against.

pub mod oracle;

use compute::{
    cpu::{update_cell, CpuGrid, UpdateCpu},
    NoArgs, UpdateBase, UpdateCreate,
};
use data::parameters::{StencilWeights, STENCIL_SHAPE};
use std::convert::Infallible;

/// Sequential scalar mesh update
#[derive(Clone, Debug, PartialEq)]
pub struct MeshUpdate {
    /// Stencil coefficients
    weights: StencilWeights,
}
//
impl UpdateBase for MeshUpdate {
    type CliArgs = NoArgs;

    type Error = Infallible;
}
//
impl UpdateCreate for MeshUpdate {
    fn new(weights: StencilWeights, _args: NoArgs) -> Result<Self, Infallible> {
        Ok(Self { weights })
    }
}
//
impl UpdateCpu for MeshUpdate {
    fn unchecked_apply_impl(&self, (input, output): CpuGrid) {
        ndarray::azip!((out in output, window in input.windows(STENCIL_SHAPE)) {
            *out = update_cell(window, &self.weights);
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use compute::Update;
    use data::{
        mesh::MeshStore,
        parameters::{BoundaryValues, InitialMesh},
    };
    use float_cmp::assert_approx_eq;

    fn update() -> MeshUpdate {
        MeshUpdate::new(StencilWeights::default(), NoArgs).unwrap()
    }

    fn zero_9x9() -> MeshStore {
        let mut store = MeshStore::allocate([9, 9]);
        store.initialize_interior(&InitialMesh::Zero);
        store.apply_boundary(&BoundaryValues::default());
        store
    }

    #[test]
    fn single_iteration_on_zero_mesh() {
        let mut store = zero_9x9();
        update().perform_iterations(&mut store, 1).unwrap();
        let live = store.live();

        let diag = 0.25 / 3.0;
        let axial = 0.5 / 3.0;
        // Corner of the interior: top-left diagonal and top are 10, left is
        // -10, bottom-left diagonal is -10
        assert_approx_eq!(
            f32,
            live[[1, 1]],
            diag * 10.0 + axial * 10.0 + diag * 10.0 + axial * -10.0 + diag * -10.0,
            epsilon = 1e-5
        );
        // Along the top edge, away from corners: three top neighbors
        assert_approx_eq!(
            f32,
            live[[1, 4]],
            2.0 * diag * 10.0 + axial * 10.0,
            epsilon = 1e-5
        );
        // Along the bottom edge
        assert_approx_eq!(f32, live[[7, 4]], 2.0 * diag * 5.0 + axial * 5.0, epsilon = 1e-5);
        // Along the left and right edges
        assert_approx_eq!(f32, live[[4, 1]], 2.0 * diag * -10.0 + axial * -10.0, epsilon = 1e-5);
        assert_approx_eq!(f32, live[[4, 7]], 2.0 * diag * -5.0 + axial * -5.0, epsilon = 1e-5);
        // Cells two or more steps away from the boundary are untouched
        for row in 2..7 {
            for col in 2..7 {
                assert_eq!(live[[row, col]], 0.0);
            }
        }
    }

    #[test]
    fn boundary_is_invariant() {
        let mut store = MeshStore::allocate([12, 17]);
        store.initialize_interior(&InitialMesh::random(3));
        store.apply_boundary(&BoundaryValues::default());
        let initial = store.live().clone();
        update().perform_iterations(&mut store, 25).unwrap();
        let [height, width] = store.shape();
        for ((row, col), &value) in store.live().indexed_iter() {
            if row == 0 || col == 0 || row == height - 1 || col == width - 1 {
                assert_eq!(value, initial[[row, col]]);
            }
        }
    }

    #[test]
    fn uses_previous_iteration_only() {
        // Updating in place would make cells depend on already-updated
        // neighbors, so compare against a recomputation from a snapshot
        let mut store = MeshStore::allocate([10, 11]);
        store.initialize_interior(&InitialMesh::random(77));
        store.apply_boundary(&BoundaryValues::default());
        let snapshot = store.live().clone();
        update().perform_iterations(&mut store, 1).unwrap();
        let weights = StencilWeights::default();
        for row in 1..9 {
            for col in 1..10 {
                let window = snapshot.slice(ndarray::s![row - 1..row + 2, col - 1..col + 2]);
                assert_eq!(store.live()[[row, col]], update_cell(window, &weights));
            }
        }
    }
}
