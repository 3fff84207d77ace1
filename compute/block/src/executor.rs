//! Execution of independent units of work

use clap::Args;
use compute::NoArgs;
use std::{convert::Infallible, fmt::Debug, num::NonZeroUsize};

/// Mechanism that runs a set of independent units of work
///
/// Each phase of a block-wise update cycle is submitted as one batch of
/// units. Returning from [`Executor::run_all()`] acts as a barrier: all units
/// must have completed by then.
pub trait Executor: Sized {
    /// Supplementary CLI arguments allowing fine-tuning of this executor
    type CliArgs: Args + Debug;

    /// Errors that can occur during setup
    type Error: std::error::Error + Send + Sync + 'static;

    /// Set up the executor
    fn new(args: Self::CliArgs) -> Result<Self, Self::Error>;

    /// Number of units that may run concurrently
    fn num_workers(&self) -> NonZeroUsize;

    /// Run `work` on every unit, in any order, and wait for completion
    fn run_all<Unit: Send>(&self, units: Vec<Unit>, work: impl Fn(Unit) + Send + Sync);
}

/// Executor that runs units one after another on the calling thread
#[derive(Copy, Clone, Debug, Default, Eq, Hash, PartialEq)]
pub struct Sequential;
//
impl Executor for Sequential {
    type CliArgs = NoArgs;

    type Error = Infallible;

    fn new(_args: NoArgs) -> Result<Self, Infallible> {
        Ok(Self)
    }

    fn num_workers(&self) -> NonZeroUsize {
        NonZeroUsize::MIN
    }

    fn run_all<Unit: Send>(&self, units: Vec<Unit>, work: impl Fn(Unit) + Send + Sync) {
        units.into_iter().for_each(work)
    }
}
