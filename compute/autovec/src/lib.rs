//! Auto-vectorized implementation of the stencil mesh update
//!
//! While compilers can automatically vectorize computations, said computations
//! must in all but simplest cases be shaped exactly like manually vectorized
//! code based on hardware intrinsics would be. This compute backend follows
//! this strategy: each output row is processed in batches of [`WIDTH`]
//! consecutive cells, each batch loading one vector of inputs per stencil
//! coefficient. Cells at the end of a row that do not fill a whole vector are
//! processed by the scalar code path.

use cfg_if::cfg_if;
use compute::{
    cpu::{update_cell, CpuGrid, UpdateCpu},
    NoArgs, UpdateBase, UpdateCreate,
};
use data::{
    parameters::{stencil_offset, StencilWeights, STENCIL_SHAPE},
    Precision,
};
use ndarray::{s, ArrayView2, ArrayViewMut1, Axis};
use slipstream::{vector::align, Vector};
use std::{array, convert::Infallible};

/// Vectorized mesh update
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
        log::debug!("Using {WIDTH}-lane vectors of {}", std::any::type_name::<Precision>());
        Ok(Self { weights })
    }
}
//
impl UpdateCpu for MeshUpdate {
    #[inline]
    fn unchecked_apply_impl(&self, (input, mut output): CpuGrid) {
        // Prepare vector versions of the stencil coefficients
        let weights = self.weights.0.map(|row| row.map(Values::splat));

        // Process output rows, using the matching input rows and their neighbors
        for (out_row_idx, mut out_row) in output.rows_mut().into_iter().enumerate() {
            let in_rows = input.slice(s![out_row_idx..out_row_idx + STENCIL_SHAPE[0], ..]);
            if let (Some(in_slices), Some(out_slice)) =
                (contiguous_rows(in_rows), out_row.as_slice_mut())
            {
                self.apply_row(&weights, in_rows, in_slices, out_slice);
                continue;
            }
            self.apply_row_scalar(in_rows, out_row);
        }
    }
}
//
impl MeshUpdate {
    /// Update one row of cells from contiguous input rows
    ///
    /// `in_rows` and `in_slices` are two views of the same input rows, the
    /// former being used for the scalar tail.
    #[inline]
    fn apply_row(
        &self,
        weights: &[[Values; STENCIL_SHAPE[1]]; STENCIL_SHAPE[0]],
        in_rows: ArrayView2<Precision>,
        in_slices: [&[Precision]; STENCIL_SHAPE[0]],
        out_slice: &mut [Precision],
    ) {
        let width = out_slice.len();
        debug_assert!(in_slices
            .iter()
            .all(|row| row.len() == width + 2 * stencil_offset()[1]));
        let center = stencil_offset();
        let tail_start = width - width % WIDTH;

        // Full vectors, accumulated in the same order as the scalar path
        let mut batches = out_slice.chunks_exact_mut(WIDTH);
        for (batch_idx, out_batch) in (&mut batches).enumerate() {
            let start = batch_idx * WIDTH;
            let load = |row: &[Precision], col: usize| {
                values_from_fn(|lane| row[start + col + lane])
            };
            let mut acc = load(in_slices[center[0]], center[1]);
            for (in_row, weights_row) in in_slices.into_iter().zip(weights) {
                for (col, &weight) in weights_row.iter().enumerate() {
                    acc = mul_add(weight, load(in_row, col), acc);
                }
            }
            acc.store(out_batch);
        }

        // Scalar tail
        for (idx, out) in batches.into_remainder().iter_mut().enumerate() {
            let col = tail_start + idx;
            *out = update_cell(
                in_rows.slice(s![.., col..col + STENCIL_SHAPE[1]]),
                &self.weights,
            );
        }
    }

    /// Update one row of cells from non-contiguous inputs or outputs
    #[cold]
    fn apply_row_scalar(&self, in_rows: ArrayView2<Precision>, out_row: ArrayViewMut1<Precision>) {
        for (out, window) in out_row
            .into_iter()
            .zip(in_rows.windows(STENCIL_SHAPE))
        {
            *out = update_cell(window, &self.weights);
        }
    }
}

/// Access the rows of a view as slices, if they are all contiguous
fn contiguous_rows(rows: ArrayView2<'_, Precision>) -> Option<[&[Precision]; STENCIL_SHAPE[0]]> {
    let mut slices = [&[][..]; STENCIL_SHAPE[0]];
    for (idx, slice) in slices.iter_mut().enumerate() {
        *slice = rows.index_axis_move(Axis(0), idx).to_slice()?;
    }
    Some(slices)
}

/// Build a vector from a lane index -> element mapping
#[inline]
fn values_from_fn(f: impl FnMut(usize) -> Precision) -> Values {
    Vector::from(array::from_fn(f))
}

// Pick vector size based on hardware support for vectorization of
// floating-point operations (which are the bulk of our SIMD workload)
const PRECISION_SIZE: usize = std::mem::size_of::<Precision>();
cfg_if! {
    if #[cfg(target_feature = "avx512f")] {
        pub const WIDTH: usize = 64 / PRECISION_SIZE;
        pub type Values = Vector<align::Align64, Precision, WIDTH>;
    } else if #[cfg(target_feature = "avx")] {
        pub const WIDTH: usize = 32 / PRECISION_SIZE;
        pub type Values = Vector<align::Align32, Precision, WIDTH>;
    } else {
        // NOTE: While most non-Intel CPUs use 128-bit vectorization, not all do.
        //       A benefit of autovectorization, however, is that supporting new
        //       hardware can just be a matter of adding cases in this cfg_if.
        pub const WIDTH: usize = 16 / PRECISION_SIZE;
        pub type Values = Vector<align::Align16, Precision, WIDTH>;
    }
}

// Use FMA if supported in hardware (unlike GCC, LLVM does not do it automatically)
cfg_if! {
    // NOTE: Extend this when porting to more CPU architectures
    if #[cfg(any(target_feature = "fma", target_feature = "vfp4"))] {
        #[inline]
        pub fn mul_add(x: Values, y: Values, z: Values) -> Values {
            x.mul_add(y, z)
        }
    } else {
        #[inline]
        pub fn mul_add(x: Values, y: Values, z: Values) -> Values {
            x * y + z
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use compute::Update;
    use data::{
        mesh::{Mesh, MeshStore},
        parameters::{BoundaryValues, InitialMesh},
    };
    use float_cmp::assert_approx_eq;
    use ndarray::ShapeBuilder;

    fn stamped(shape: [usize; 2], seed: u64) -> MeshStore {
        let mut store = MeshStore::allocate(shape);
        store.initialize_interior(&InitialMesh::random(seed));
        store.apply_boundary(&BoundaryValues::default());
        store
    }

    fn vectorized() -> MeshUpdate {
        MeshUpdate::new(StencilWeights::default(), NoArgs).unwrap()
    }

    fn scalar() -> compute_naive::MeshUpdate {
        compute_naive::MeshUpdate::new(StencilWeights::default(), NoArgs).unwrap()
    }

    fn assert_meshes_close(actual: &Mesh, expected: &Mesh) {
        assert_eq!(actual.shape(), expected.shape());
        for (&actual, &expected) in actual.iter().zip(expected) {
            assert_approx_eq!(f32, actual, expected, epsilon = 1e-3);
        }
    }

    #[test]
    fn matches_scalar_for_all_tail_lengths() {
        for interior_width in 1..=(3 * WIDTH + 1) {
            let mut store = stamped([7, interior_width + 2], interior_width as u64);
            let mut reference = store.clone();
            vectorized().perform_iterations(&mut store, 5).unwrap();
            scalar().perform_iterations(&mut reference, 5).unwrap();
            assert_meshes_close(store.live(), reference.live());
        }
    }

    #[test]
    fn tail_matches_wider_mesh() {
        // Same values in the shared columns, one mesh width being an exact
        // multiple of the vector width and the other not
        let rows = 6;
        let narrow_width = 2 * WIDTH + 3 + 2;
        let wide_width = 3 * WIDTH + 2;
        let value = |row: usize, col: usize| ((row * 31 + col * 17) % 23) as Precision - 11.0;
        let mut narrow = MeshStore::from_live(Mesh::from_shape_fn([rows, narrow_width], |(r, c)| {
            value(r, c)
        }));
        let mut wide =
            MeshStore::from_live(Mesh::from_shape_fn([rows, wide_width], |(r, c)| value(r, c)));
        vectorized().perform_iterations(&mut narrow, 1).unwrap();
        vectorized().perform_iterations(&mut wide, 1).unwrap();

        // The last interior column of the narrow mesh sees its right margin,
        // which holds different values in the wide mesh
        for row in 1..rows - 1 {
            for col in 1..narrow_width - 2 {
                assert_approx_eq!(
                    f32,
                    narrow.live()[[row, col]],
                    wide.live()[[row, col]],
                    epsilon = 1e-4
                );
            }
        }
    }

    #[test]
    fn non_contiguous_rows_fall_back_to_scalar() {
        let shape = [9, 2 * WIDTH + 5];
        let store = stamped(shape, 99);
        let mut column_major = Mesh::zeros(shape.f());
        column_major.assign(store.live());
        let mut output = Mesh::zeros([shape[0] - 2, shape[1] - 2].f());
        vectorized().apply_impl((column_major.view(), output.view_mut()));

        let mut reference = store.clone();
        scalar().perform_iterations(&mut reference, 1).unwrap();
        let expected = reference.live().slice(s![1..shape[0] - 1, 1..shape[1] - 1]);
        assert_eq!(output, expected);
    }
}
