//! Benchmarking utilities
//!
//! Please consider using the macros provided by this crate instead of calling
//! these implementation details directly.

use crate::{Update, UpdateCreate};
use clap::{Args, Command, FromArgMatches};
use criterion::{BenchmarkId, Criterion, Throughput};
use data::{
    mesh::MeshStore,
    parameters::{BoundaryValues, InitialMesh, StencilWeights},
};
use std::{hint::black_box, sync::Once};

/// Re-export criterion for the criterion_benchmark macro
pub use criterion;

// Make sure env_logger is only initialized once
fn init_logger() {
    static INIT_LOGGER: Once = Once::new();
    INIT_LOGGER.call_once(env_logger::init);
}

/// Common criterion benchmark for all mesh update backends
/// Use via the criterion_benchmark macro
pub fn criterion_benchmark<U: Update + UpdateCreate>(c: &mut Criterion, backend_name: &str) {
    init_logger();

    let args = U::CliArgs::from_arg_matches(
        &U::CliArgs::augment_args(Command::default().no_binary_name(true))
            .get_matches_from(None::<&str>),
    )
    .expect("Failed to parse arguments from defaults & environment");

    let update = U::new(black_box(StencilWeights::default()), black_box(args)).unwrap();
    let mut group = c.benchmark_group(backend_name.to_owned());
    for num_iterations_pow2 in 0..=4 {
        let num_iterations = 2u64.pow(num_iterations_pow2);
        for size_pow2 in 4..=10 {
            let size = 2usize.pow(size_pow2);
            let shape = [size, 2 * size];
            let num_elems = ((shape[0] - 2) * (shape[1] - 2)) as u64;

            let mut store = MeshStore::allocate(black_box(shape));
            store.initialize_interior(&InitialMesh::random(size as u64));
            store.apply_boundary(&BoundaryValues::default());

            group.throughput(Throughput::Elements(num_elems * num_iterations));
            group.bench_function(
                BenchmarkId::from_parameter(format!(
                    "{}x{}cells,{num_iterations}iters",
                    shape[1], shape[0]
                )),
                |b| {
                    b.iter(|| {
                        update
                            .perform_iterations(&mut store, num_iterations as usize)
                            .unwrap()
                    });
                },
            );
            black_box(store);
        }
    }
    group.finish();
}
