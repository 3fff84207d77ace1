//! Mesh storage

use crate::{
    parameters::{interior_range, stencil_offset, BoundaryValues, InitialMesh},
    Precision,
};
use ndarray::{s, Array2, ArrayView2, ArrayViewMut2, Ix2, ShapeBuilder, SliceInfo, SliceInfoElem};
use rand::{rngs::StdRng, Rng, SeedableRng};

/// Grid of values evolved by the stencil update
pub type Mesh = Array2<Precision>;

/// Live mesh and scratch buffer of one benchmark run
///
/// Stencil updates read the live mesh and write their results into the
/// scratch buffer. Results are then committed back into the live mesh once
/// every cell of the interior has been computed, so that no update ever
/// observes a partially updated mesh.
///
/// Both buffers have the same shape. Only the interior region of the scratch
/// buffer is meaningful.
#[derive(Clone, Debug, PartialEq)]
pub struct MeshStore {
    /// Current state of the mesh
    live: Mesh,

    /// Output of the ongoing update cycle
    scratch: Mesh,
}
//
impl MeshStore {
    /// Set up zero-initialized mesh storage
    ///
    /// `shape` specifies the mesh dimensions in [rows, cols] order, e.g.
    /// [1000, 2000] for a 2000-wide and 1000-high mesh.
    pub fn allocate(shape: impl Clone + ShapeBuilder<Dim = Ix2>) -> Self {
        Self {
            live: Mesh::zeros(shape.clone()),
            scratch: Mesh::zeros(shape),
        }
    }

    /// Set up mesh storage around a pre-existing live mesh
    pub fn from_live(live: Mesh) -> Self {
        let scratch = Mesh::zeros(live.raw_dim());
        Self { live, scratch }
    }

    /// Mesh dimensions in [rows, cols] order
    pub fn shape(&self) -> [usize; 2] {
        let (rows, cols) = self.live.dim();
        [rows, cols]
    }

    /// Fill the interior of the live mesh according to some policy
    ///
    /// The boundary margin is left untouched.
    pub fn initialize_interior(&mut self, initial: &InitialMesh) {
        let mut interior = self.live.slice_mut(interior_slice(self.shape()));
        match *initial {
            InitialMesh::Zero => interior.fill(0.0),
            InitialMesh::Random {
                range: [low, high],
                seed,
            } => {
                let mut rng = StdRng::seed_from_u64(seed);
                interior.map_inplace(|cell| *cell = rng.gen_range(low..=high));
            }
        }
        log::debug!("Initialized mesh interior with policy {initial:?}");
    }

    /// Stamp the fixed edge values onto the margin of the live mesh
    ///
    /// Top and bottom values cover the full width of the mesh, corners
    /// included. Left and right values only cover the interior rows.
    pub fn apply_boundary(&mut self, boundary: &BoundaryValues) {
        let [rows, cols] = self.shape();
        let margin = stencil_offset();
        let interior_rows = margin[0]..rows - margin[0];
        let live = &mut self.live;
        live.slice_mut(s![..margin[0], ..]).fill(boundary.top);
        live.slice_mut(s![rows - margin[0].., ..]).fill(boundary.bottom);
        live.slice_mut(s![interior_rows.clone(), ..margin[1]]).fill(boundary.left);
        live.slice_mut(s![interior_rows, cols - margin[1]..]).fill(boundary.right);
    }

    /// Deep-copy another store's live mesh into this store's allocations
    ///
    /// # Panics
    ///
    /// If both stores do not have the same shape.
    pub fn copy_from(&mut self, other: &MeshStore) {
        assert_eq!(self.shape(), other.shape(), "mesh shape mismatch");
        self.live.assign(&other.live);
    }

    /// Read access to the live mesh
    pub fn live(&self) -> &Mesh {
        &self.live
    }

    /// Write access to the live mesh
    ///
    /// Callers are responsible for keeping the boundary margin intact.
    pub fn live_mut(&mut self) -> &mut Mesh {
        &mut self.live
    }

    /// Views used by the compute phase of an update cycle
    ///
    /// Returns the full live mesh (interior and margin) for reading, and the
    /// interior of the scratch buffer for writing.
    pub fn compute_views(&mut self) -> (ArrayView2<'_, Precision>, ArrayViewMut2<'_, Precision>) {
        let interior = interior_slice(self.shape());
        (self.live.view(), self.scratch.slice_mut(interior))
    }

    /// Views used by the commit phase of an update cycle
    ///
    /// Returns the interior of the live mesh for writing, and the interior of
    /// the scratch buffer for reading.
    pub fn commit_views(&mut self) -> (ArrayViewMut2<'_, Precision>, ArrayView2<'_, Precision>) {
        let shape = self.shape();
        (
            self.live.slice_mut(interior_slice(shape)),
            self.scratch.slice(interior_slice(shape)),
        )
    }

    /// Copy the interior of the scratch buffer into the live mesh
    pub fn commit_interior(&mut self) {
        let (mut live, scratch) = self.commit_views();
        live.assign(&scratch);
    }

    /// Extract the live mesh, dropping the scratch buffer
    pub fn into_live(self) -> Mesh {
        self.live
    }
}

/// Slice of a mesh of a certain shape that covers its interior region
fn interior_slice(shape: [usize; 2]) -> SliceInfo<[SliceInfoElem; 2], Ix2, Ix2> {
    let [rows, cols] = interior_range(shape);
    s![rows, cols]
}
