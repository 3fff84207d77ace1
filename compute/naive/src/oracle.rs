//! Correctness oracle
//!
//! Other backends are validated by advancing a private copy of the initial
//! mesh with the naive backend, then comparing every cell of the result with
//! the mesh produced by the backend under test.

use crate::MeshUpdate;
use compute::{NoArgs, Update, UpdateCreate};
use data::{
    mesh::{Mesh, MeshStore},
    parameters::RunConfig,
    Precision,
};
use ndarray::ArrayView2;
use std::convert::Infallible;

/// Outcome of a correctness check, as reported in benchmark metrics
#[derive(Copy, Clone, Debug, Eq, Hash, PartialEq)]
#[repr(u8)]
pub enum CheckStatus {
    /// All cells agree within tolerance
    Passed = 0,

    /// At least one cell differs by more than the tolerance
    Failed = 1,
}
//
impl CheckStatus {
    /// Numerical code of this status
    pub fn code(self) -> u8 {
        self as u8
    }
}

/// Cell where the candidate and reference meshes disagree
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Mismatch {
    /// Cell coordinates in [row, col] order
    pub position: [usize; 2],

    /// Value computed by the backend under test
    pub candidate: Precision,

    /// Value computed by the reference backend
    pub reference: Precision,
}

/// Result of comparing a candidate mesh with the reference
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CheckReport {
    /// Every cell that failed the comparison, in row-major order
    mismatches: Vec<Mismatch>,
}
//
impl CheckReport {
    /// Summarized outcome
    pub fn status(&self) -> CheckStatus {
        if self.mismatches.is_empty() {
            CheckStatus::Passed
        } else {
            CheckStatus::Failed
        }
    }

    /// Cells that failed the comparison
    pub fn mismatches(&self) -> &[Mismatch] {
        &self.mismatches
    }
}

/// Advance the reference mesh and compare the candidate mesh with it
///
/// `reference` must hold the same initial state that the candidate was
/// computed from. It is advanced by `config.nb_iterations` update cycles
/// using the naive backend, then compared with `candidate` cell by cell.
pub fn check(reference: &mut MeshStore, candidate: &Mesh, config: &RunConfig) -> CheckReport {
    check_with(reference, candidate, config, |_, _| Ok::<_, Infallible>(()))
        .unwrap_or_else(|never| match never {})
}

/// Variant of [`check()`] that lets the caller observe each reference cycle
///
/// `after_iteration` receives the 0-based index of the reference cycle that
/// was just performed and the resulting reference mesh.
pub fn check_with<E>(
    reference: &mut MeshStore,
    candidate: &Mesh,
    config: &RunConfig,
    mut after_iteration: impl FnMut(usize, &Mesh) -> Result<(), E>,
) -> Result<CheckReport, E> {
    let update = MeshUpdate::new(config.weights, NoArgs).unwrap_or_else(|never| match never {});
    for iteration in 0..config.nb_iterations {
        update
            .perform_iterations(reference, 1)
            .unwrap_or_else(|never| match never {});
        after_iteration(iteration, reference.live())?;
    }
    Ok(compare(
        reference.live().view(),
        candidate.view(),
        config.tolerance,
    ))
}

/// Compare every cell of two meshes
///
/// Cells whose absolute difference exceeds `tolerance`, or is NaN, are
/// reported as mismatches and logged.
///
/// # Panics
///
/// If both meshes do not have the same shape.
pub fn compare(
    reference: ArrayView2<Precision>,
    candidate: ArrayView2<Precision>,
    tolerance: Precision,
) -> CheckReport {
    assert_eq!(reference.shape(), candidate.shape(), "mesh shape mismatch");
    let mut mismatches = Vec::new();
    for (((row, col), &expected), &actual) in reference.indexed_iter().zip(&candidate) {
        let difference = (actual - expected).abs();
        if !(difference <= tolerance) {
            log::warn!(
                "check failed [x: {col}, y: {row}]: run = {actual:.6}, check = {expected:.6}"
            );
            mismatches.push(Mismatch {
                position: [row, col],
                candidate: actual,
                reference: expected,
            });
        }
    }
    CheckReport { mismatches }
}

#[cfg(test)]
mod tests {
    use super::*;
    use data::parameters::{BoundaryValues, InitialMesh, StencilWeights};
    use std::sync::Once;

    fn init_logger() {
        static INIT_LOGGER: Once = Once::new();
        INIT_LOGGER.call_once(|| {
            let _ = env_logger::builder().is_test(true).try_init();
        });
    }

    fn initial_store(shape: [usize; 2], seed: u64) -> MeshStore {
        let mut store = MeshStore::allocate(shape);
        store.initialize_interior(&InitialMesh::random(seed));
        store.apply_boundary(&BoundaryValues::default());
        store
    }

    fn config(shape: [usize; 2], nb_iterations: usize) -> RunConfig {
        RunConfig {
            shape,
            nb_iterations,
            initial_mesh: InitialMesh::random(0),
            ..Default::default()
        }
    }

    #[test]
    fn identical_meshes_pass() {
        init_logger();
        let store = initial_store([16, 24], 5);
        let report = compare(store.live().view(), store.live().view(), 1e-3);
        assert_eq!(report.status(), CheckStatus::Passed);
        assert_eq!(report.status().code(), 0);
        assert!(report.mismatches().is_empty());
    }

    #[test]
    fn every_mismatch_is_reported() {
        init_logger();
        let reference = initial_store([8, 10], 9);
        let mut candidate = reference.live().clone();
        candidate[[2, 3]] += 0.5;
        candidate[[6, 1]] -= 1e-2;
        candidate[[4, 4]] += 1e-4;
        candidate[[5, 5]] = Precision::NAN;
        let report = compare(reference.live().view(), candidate.view(), 1e-3);
        assert_eq!(report.status(), CheckStatus::Failed);
        assert_eq!(report.status().code(), 1);
        let positions = report
            .mismatches()
            .iter()
            .map(|mismatch| mismatch.position)
            .collect::<Vec<_>>();
        assert_eq!(positions, vec![[2, 3], [5, 5], [6, 1]]);
        let first = report.mismatches()[0];
        assert_eq!(first.reference, reference.live()[[2, 3]]);
        assert_eq!(first.candidate, candidate[[2, 3]]);
    }

    #[test]
    fn check_advances_reference() {
        init_logger();
        let config = config([12, 14], 6);
        let mut candidate = initial_store(config.shape, 11);
        let mut reference = candidate.clone();
        MeshUpdate::new(StencilWeights::default(), NoArgs)
            .unwrap()
            .perform_iterations(&mut candidate, config.nb_iterations)
            .unwrap();

        let mut observed = Vec::new();
        let report = check_with(&mut reference, candidate.live(), &config, |iteration, _| {
            observed.push(iteration);
            Ok::<_, Infallible>(())
        })
        .unwrap();
        assert_eq!(report.status(), CheckStatus::Passed);
        assert_eq!(observed, (0..6).collect::<Vec<_>>());
        assert_eq!(reference.live(), candidate.live());
    }

    #[test]
    fn check_detects_stale_candidate() {
        init_logger();
        let config = config([12, 14], 3);
        let candidate = initial_store(config.shape, 11);
        let mut reference = candidate.clone();
        let report = check(&mut reference, candidate.live(), &config);
        assert_eq!(report.status(), CheckStatus::Failed);
    }
}
