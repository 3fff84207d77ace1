//! Block-wise implementation of the stencil mesh update
//!
//! The mesh interior is split into blocks (see [`Decomposition`]), and each
//! update cycle is performed in two phases:
//!
//! 1. Every block is computed from the live mesh into the scratch buffer.
//! 2. Every block of the scratch buffer is committed into the live mesh.
//!
//! Within a phase, blocks are independent units of work, which an
//! [`Executor`] may run in any order or concurrently. The executor waits for
//! all units of a phase to complete before the next phase starts, so no block
//! ever observes another block's output of the same cycle.

mod args;
pub mod decomposition;
pub mod executor;

pub use args::{BlockArgs, DecompositionKind};
pub use decomposition::{Block, Decomposition, Partition};
pub use executor::{Executor, Sequential};

use compute::{cpu::UpdateCpu, Update, UpdateBase, UpdateCreate};
use data::{
    mesh::MeshStore,
    parameters::{interior_range, StencilWeights},
};
use ndarray::s;
use thiserror::Error;

/// Scalar block-wise mesh update, running on the calling thread
pub type MeshUpdate = BlockWiseUpdate<compute_naive::MeshUpdate, Sequential>;

/// Mesh update that processes the interior block by block
#[derive(Debug)]
pub struct BlockWiseUpdate<Backend: UpdateCpu + Sync, Exec: Executor> {
    /// Domain decomposition policy
    decomposition: Decomposition,

    /// Runs the units of work of each phase
    executor: Exec,

    /// Computes the blocks
    backend: Backend,
}
//
impl<Backend: UpdateCpu + Sync, Exec: Executor> BlockWiseUpdate<Backend, Exec> {
    /// Assemble a block-wise update from its parts
    pub fn with_decomposition(
        backend: Backend,
        executor: Exec,
        decomposition: Decomposition,
    ) -> Self {
        log::info!(
            "Using {decomposition:?} decomposition over {} worker(s)",
            executor.num_workers()
        );
        Self {
            decomposition,
            executor,
            backend,
        }
    }

    /// Domain decomposition policy
    pub fn decomposition(&self) -> Decomposition {
        self.decomposition
    }

    /// Blocks that a mesh of a certain shape would be split into
    pub fn partition(&self, shape: [usize; 2]) -> Partition {
        let partition = self
            .decomposition
            .partition(interior_range(shape), self.executor.num_workers());
        log::debug!(
            "Split {}x{} mesh into {} block(s)",
            shape[1],
            shape[0],
            partition.num_blocks()
        );
        partition
    }

    /// Perform one update cycle with a precomputed partition
    fn perform_iteration(&self, store: &mut MeshStore, partition: &Partition) {
        // Compute phase: read the live mesh, write disjoint scratch blocks
        {
            let (live, scratch) = store.compute_views();
            let backend = &self.backend;
            let units = partition
                .blocks()
                .zip(partition.split_mut(scratch))
                .collect::<Vec<_>>();
            self.executor.run_all(units, |(block, output)| {
                let [rows, cols] = block.with_halo();
                backend.apply_impl((live.slice(s![rows, cols]), output));
            });
        }

        // Commit phase: copy scratch blocks into disjoint live blocks
        let (live, scratch) = store.commit_views();
        let units = partition
            .split_mut(live)
            .into_iter()
            .zip(partition.split(scratch))
            .collect::<Vec<_>>();
        self.executor
            .run_all(units, |(mut target, source)| target.assign(&source));
    }
}
//
impl<Backend: UpdateCpu + Sync, Exec: Executor> UpdateBase for BlockWiseUpdate<Backend, Exec> {
    type CliArgs = BlockArgs<Exec::CliArgs, Backend::CliArgs>;

    type Error = Error<Backend::Error, Exec::Error>;
}
//
impl<Backend: UpdateCpu + Sync, Exec: Executor> UpdateCreate for BlockWiseUpdate<Backend, Exec> {
    fn new(weights: StencilWeights, args: Self::CliArgs) -> Result<Self, Self::Error> {
        let decomposition = args.decomposition();
        let executor = Exec::new(args.executor).map_err(Error::Executor)?;
        let backend = Backend::new(weights, args.backend).map_err(Error::Backend)?;
        Ok(Self::with_decomposition(backend, executor, decomposition))
    }
}
//
impl<Backend: UpdateCpu + Sync, Exec: Executor> Update for BlockWiseUpdate<Backend, Exec> {
    fn perform_iterations(
        &self,
        store: &mut MeshStore,
        iterations: usize,
    ) -> Result<(), Self::Error> {
        if iterations == 0 {
            return Ok(());
        }
        let partition = self.partition(store.shape());
        for _ in 0..iterations {
            self.perform_iteration(store, &partition);
        }
        Ok(())
    }
}

/// Things that can go wrong when setting up a block-wise update
#[derive(Debug, Error)]
pub enum Error<BackendError: std::error::Error, ExecutorError: std::error::Error> {
    /// Error from the underlying compute backend
    #[error(transparent)]
    Backend(BackendError),

    /// Error from the executor
    #[error("failed to set up the executor")]
    Executor(#[source] ExecutorError),
}
