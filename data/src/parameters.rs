//! Computation parameters

use crate::{array2, Precision};
use std::ops::Range;
use thiserror::Error;

/// Shape of the stencil, in [rows, cols] order
///
/// Both dimensions must be odd so that the stencil has a center cell.
pub const STENCIL_SHAPE: [usize; 2] = [3, 3];

/// Offset from the top-left corner of the stencil to its center
///
/// This is also the width of the boundary margin around the interior region.
#[inline]
pub const fn stencil_offset() -> [usize; 2] {
    [(STENCIL_SHAPE[0] - 1) / 2, (STENCIL_SHAPE[1] - 1) / 2]
}

/// Region of a mesh of a certain shape that is updated by the stencil
///
/// Everything outside of this region belongs to the boundary margin. Assumes
/// that the mesh is at least as large as the stencil.
#[inline]
pub fn interior_range(shape: [usize; 2]) -> [Range<usize>; 2] {
    let offset = stencil_offset();
    array2(|i| offset[i]..shape[i] - offset[i])
}

/// Coefficient table of the stencil, in [row][col] order
///
/// The updated value of a cell is its current value plus the weighted sum of
/// its neighborhood, center cell included.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct StencilWeights(pub [[Precision; STENCIL_SHAPE[1]]; STENCIL_SHAPE[0]]);
//
impl Default for StencilWeights {
    fn default() -> Self {
        // A center weight of -1 cancels the cell's own value, so the result is
        // a blend of the neighbors where axial ones weigh twice the diagonals.
        Self([
            [0.25 / 3.0, 0.50 / 3.0, 0.25 / 3.0],
            [0.50 / 3.0, -1.00, 0.50 / 3.0],
            [0.25 / 3.0, 0.50 / 3.0, 0.25 / 3.0],
        ])
    }
}

/// Fixed values of the four edges of the mesh
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct BoundaryValues {
    /// Value of the top margin rows, corners included
    pub top: Precision,

    /// Value of the bottom margin rows, corners included
    pub bottom: Precision,

    /// Value of the left margin columns
    pub left: Precision,

    /// Value of the right margin columns
    pub right: Precision,
}
//
impl Default for BoundaryValues {
    fn default() -> Self {
        Self {
            top: 10.0,
            bottom: 5.0,
            left: -10.0,
            right: -5.0,
        }
    }
}

/// Initial value policy for the interior of the mesh
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum InitialMesh {
    /// All interior cells start at zero
    Zero,

    /// Interior cells are drawn uniformly from `range` (bounds included)
    ///
    /// The generator is seeded so that runs are reproducible.
    Random {
        /// Lower and upper bound of the generated values
        range: [Precision; 2],

        /// Random generator seed
        seed: u64,
    },
}
//
impl InitialMesh {
    /// Default range of randomized initial values
    pub const DEFAULT_RANDOM_RANGE: [Precision; 2] = [-10.0, 10.0];

    /// Randomized initial mesh with the default value range
    pub fn random(seed: u64) -> Self {
        Self::Random {
            range: Self::DEFAULT_RANDOM_RANGE,
            seed,
        }
    }

    /// Variant of this policy for the n-th repetition of a benchmark
    ///
    /// Random meshes get a different seed on every repetition, zero meshes are
    /// left alone.
    pub fn for_repetition(self, repetition: usize) -> Self {
        match self {
            Self::Zero => Self::Zero,
            Self::Random { range, seed } => Self::Random {
                range,
                seed: seed.wrapping_add(repetition as u64),
            },
        }
    }
}
//
impl Default for InitialMesh {
    fn default() -> Self {
        Self::Zero
    }
}

/// Configuration of one benchmark run
///
/// Built once by the caller, then only ever passed around by reference.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct RunConfig {
    /// Mesh dimensions in [rows, cols] order, i.e. [height, width]
    pub shape: [usize; 2],

    /// Number of update cycles
    pub nb_iterations: usize,

    /// Initial value policy for the mesh interior
    pub initial_mesh: InitialMesh,

    /// Fixed values of the mesh edges
    pub boundary: BoundaryValues,

    /// Stencil coefficients
    pub weights: StencilWeights,

    /// Maximal absolute difference between a variant and the reference
    pub tolerance: Precision,
}
//
impl RunConfig {
    /// Default comparison tolerance
    pub const DEFAULT_TOLERANCE: Precision = 1e-3;

    /// Mesh width (number of columns)
    pub fn width(&self) -> usize {
        self.shape[1]
    }

    /// Mesh height (number of rows)
    pub fn height(&self) -> usize {
        self.shape[0]
    }

    /// Reject configurations that the update engine cannot handle
    ///
    /// The engine itself does not check its configuration, so this must be
    /// called before a configuration from an untrusted source is used.
    pub fn validate(self) -> Result<Self, ConfigError> {
        if (0..2).any(|i| self.shape[i] < STENCIL_SHAPE[i]) {
            return Err(ConfigError::MeshTooSmall {
                shape: self.shape,
                stencil: STENCIL_SHAPE,
            });
        }
        if self.nb_iterations == 0 {
            return Err(ConfigError::NoIterations);
        }
        if !(self.tolerance >= 0.0) {
            return Err(ConfigError::InvalidTolerance(self.tolerance));
        }
        if let InitialMesh::Random {
            range: [low, high], ..
        } = self.initial_mesh
        {
            if !(low.is_finite() && high.is_finite() && low <= high) {
                return Err(ConfigError::InvalidRandomRange([low, high]));
            }
        }
        Ok(self)
    }
}
//
impl Default for RunConfig {
    fn default() -> Self {
        Self {
            shape: [1000, 2000],
            nb_iterations: 100,
            initial_mesh: InitialMesh::default(),
            boundary: BoundaryValues::default(),
            weights: StencilWeights::default(),
            tolerance: Self::DEFAULT_TOLERANCE,
        }
    }
}

/// Things that can be wrong with a run configuration
#[derive(Clone, Debug, Error, PartialEq)]
pub enum ConfigError {
    /// Mesh cannot hold a single stencil footprint
    #[error("mesh of shape {shape:?} is smaller than the {stencil:?} stencil")]
    MeshTooSmall {
        /// Requested mesh shape
        shape: [usize; 2],

        /// Stencil shape
        stencil: [usize; 2],
    },

    /// At least one update cycle must be performed
    #[error("number of iterations must be at least 1")]
    NoIterations,

    /// Tolerance is negative or NaN
    #[error("comparison tolerance {0} is not a non-negative number")]
    InvalidTolerance(Precision),

    /// Bounds of the random fill are reversed or not finite
    #[error("random initial value range {0:?} is invalid")]
    InvalidRandomRange([Precision; 2]),
}
