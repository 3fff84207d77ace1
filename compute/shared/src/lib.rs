//! Common facilities shared by all compute backends

#[cfg(feature = "criterion")]
#[doc(hidden)]
pub mod benchmark;
#[cfg(feature = "cpu")]
pub mod cpu;

use clap::Args;
use data::{
    mesh::{Mesh, MeshStore},
    parameters::{RunConfig, StencilWeights},
};
use std::{
    fmt::Debug,
    time::{Duration, Instant},
};

/// Common supertrait of all mesh update backend traits
///
/// Gathers the associated types that every layer of the backend interface
/// needs to know about.
pub trait UpdateBase: Sized {
    /// Supplementary CLI arguments allowing fine-tuning of this backend
    ///
    /// To honor the principle of least surprise and make criterion
    /// microbenchmarks work smoothly, any argument you add must have a default
    /// value and should also be configurable through environment variables.
    type CliArgs: Args + Debug;

    /// Errors that can occur during setup or mesh updates
    type Error: std::error::Error + Send + Sync + 'static;
}

/// Mesh update backend setup
pub trait UpdateCreate: UpdateBase {
    /// Set up the update backend for some stencil coefficients
    fn new(weights: StencilWeights, args: Self::CliArgs) -> Result<Self, Self::Error>;
}

/// Mesh update backend interface expected by the benchmark harness
pub trait Update: UpdateBase {
    /// Perform `iterations` full update cycles of the mesh interior
    ///
    /// On return, the live mesh of `store` holds the result of the final
    /// cycle. The boundary margin of the mesh is never modified.
    fn perform_iterations(&self, store: &mut MeshStore, iterations: usize)
        -> Result<(), Self::Error>;
}

/// Dummy [`UpdateBase::CliArgs`] for backends that have no tuning knobs
#[derive(Args, Copy, Clone, Debug, Default, Eq, Hash, PartialEq)]
#[group(skip)]
pub struct NoArgs;

/// Run all the update cycles of a benchmark run and measure how long it took
///
/// A configuration with zero iterations is accepted and leaves the mesh
/// untouched, use [`RunConfig::validate()`] to reject it beforehand.
pub fn run<U: Update>(
    update: &U,
    store: &mut MeshStore,
    config: &RunConfig,
) -> Result<Duration, U::Error> {
    let start = Instant::now();
    update.perform_iterations(store, config.nb_iterations)?;
    let elapsed = start.elapsed();
    log::debug!("Performed {} update cycle(s) in {elapsed:?}", config.nb_iterations);
    Ok(elapsed)
}

/// Variant of [`run()`] that lets the caller observe the mesh after each cycle
///
/// `after_iteration` receives the 0-based index of the cycle that was just
/// performed and the resulting live mesh. Time spent inside of it is not
/// accounted for in the resulting duration.
pub fn run_with<U: Update, E: From<U::Error>>(
    update: &U,
    store: &mut MeshStore,
    config: &RunConfig,
    mut after_iteration: impl FnMut(usize, &Mesh) -> Result<(), E>,
) -> Result<Duration, E> {
    let mut elapsed = Duration::ZERO;
    for iteration in 0..config.nb_iterations {
        let start = Instant::now();
        update.perform_iterations(store, 1)?;
        elapsed += start.elapsed();
        after_iteration(iteration, store.live())?;
    }
    log::debug!("Performed {} observed update cycle(s) in {elapsed:?}", config.nb_iterations);
    Ok(elapsed)
}

/// Macro that generates a complete criterion benchmark harness for you
///
/// Pass it the name of a backend crate that exports a `MeshUpdate` type, or an
/// update type and a benchmark group name.
#[macro_export]
#[cfg(feature = "criterion")]
macro_rules! criterion_benchmark {
    ($backend:ident) => {
        $crate::criterion_benchmark!($backend::MeshUpdate, stringify!($backend));
    };
    ($update:ty, $name:expr) => {
        fn criterion_benchmark(c: &mut $crate::benchmark::criterion::Criterion) {
            $crate::benchmark::criterion_benchmark::<$update>(c, $name)
        }
        $crate::benchmark::criterion::criterion_group!(benches, criterion_benchmark);
        $crate::benchmark::criterion::criterion_main!(benches);
    };
}
