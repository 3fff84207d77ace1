//! Multi-threaded implementation of the stencil mesh update
//!
//! Blocks of the mesh interior are distributed over a rayon thread pool. The
//! pool's `install` call returns once every block of a phase has been
//! processed, which provides the barrier between the compute and commit
//! phases of each update cycle.

mod args;

pub use args::ThreadPoolArgs;

use compute_block::{BlockWiseUpdate, Executor};
use rayon::{prelude::*, ThreadPoolBuildError, ThreadPoolBuilder};
use std::num::NonZeroUsize;
use thiserror::Error;

/// Scalar mesh update, parallelized over a thread pool
pub type MeshUpdate = BlockWiseUpdate<compute_naive::MeshUpdate, ThreadPool>;

/// Vectorized mesh update, parallelized over a thread pool
pub type VectorMeshUpdate = BlockWiseUpdate<compute_autovec::MeshUpdate, ThreadPool>;

/// Executor that runs units of work on a dedicated rayon thread pool
#[derive(Debug)]
pub struct ThreadPool {
    pool: rayon::ThreadPool,
}
//
impl Executor for ThreadPool {
    type CliArgs = ThreadPoolArgs;

    type Error = Error;

    fn new(args: ThreadPoolArgs) -> Result<Self, Error> {
        let mut builder =
            ThreadPoolBuilder::new().thread_name(|idx| format!("stencil-worker-{idx}"));
        if let Some(num_threads) = args.num_threads {
            builder = builder.num_threads(num_threads.get());
        }
        let pool = builder.build().map_err(Error::ThreadPool)?;
        log::info!(
            "Started thread pool with {} worker thread(s)",
            pool.current_num_threads()
        );
        Ok(Self { pool })
    }

    fn num_workers(&self) -> NonZeroUsize {
        NonZeroUsize::new(self.pool.current_num_threads()).unwrap_or(NonZeroUsize::MIN)
    }

    fn run_all<Unit: Send>(&self, units: Vec<Unit>, work: impl Fn(Unit) + Send + Sync) {
        self.pool.install(|| units.into_par_iter().for_each(work))
    }
}

/// Things that can go wrong when setting up the thread pool
#[derive(Debug, Error)]
pub enum Error {
    /// Failed to start the worker threads
    #[error("failed to build the thread pool")]
    ThreadPool(#[source] ThreadPoolBuildError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn pool(num_threads: usize) -> ThreadPool {
        ThreadPool::new(ThreadPoolArgs {
            num_threads: NonZeroUsize::new(num_threads),
        })
        .unwrap()
    }

    #[test]
    fn honors_thread_count() {
        for num_threads in [1, 2, 3] {
            assert_eq!(pool(num_threads).num_workers().get(), num_threads);
        }
        assert!(ThreadPool::new(ThreadPoolArgs::default()).is_ok());
    }

    #[test]
    fn runs_every_unit_once() {
        let executor = pool(4);
        let counts = (0..1000).map(|_| AtomicUsize::new(0)).collect::<Vec<_>>();
        executor.run_all((0..counts.len()).collect(), |unit| {
            counts[unit].fetch_add(1, Ordering::Relaxed);
        });
        assert!(counts.iter().all(|count| count.load(Ordering::Relaxed) == 1));
    }

    #[test]
    fn waits_for_completion() {
        let executor = pool(3);
        let done = AtomicUsize::new(0);
        for phase in 1..=5 {
            executor.run_all(vec![(); 64], |()| {
                std::thread::yield_now();
                done.fetch_add(1, Ordering::Relaxed);
            });
            assert_eq!(done.load(Ordering::Relaxed), 64 * phase);
        }
    }
}
