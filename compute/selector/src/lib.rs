//! Pick the best compute backend allowed by enabled crate features, expose it
//! as a MeshUpdate typedef.

cfg_if::cfg_if! {
    if #[cfg(feature = "compute_parallel_vec")] {
        pub type MeshUpdate = compute_parallel::VectorMeshUpdate;
    } else if #[cfg(feature = "compute_parallel")] {
        pub type MeshUpdate = compute_parallel::MeshUpdate;
    } else if #[cfg(feature = "compute_block")] {
        pub type MeshUpdate = compute_block::MeshUpdate;
    } else if #[cfg(feature = "compute_autovec")] {
        pub type MeshUpdate = compute_autovec::MeshUpdate;
    } else if #[cfg(any(feature = "compute_naive", test))] {
        pub type MeshUpdate = compute_naive::MeshUpdate;
    } else {
        // If no backend was specified, use a backend skeleton that throws a
        // minimal number of compiler errors.
        use compute::{NoArgs, Update, UpdateBase, UpdateCreate};
        use data::{mesh::MeshStore, parameters::StencilWeights};
        use std::convert::Infallible;
        //
        pub struct MeshUpdate;
        //
        impl UpdateBase for MeshUpdate {
            type CliArgs = NoArgs;

            type Error = Infallible;
        }
        //
        impl UpdateCreate for MeshUpdate {
            fn new(_weights: StencilWeights, _args: NoArgs) -> Result<Self, Infallible> {
                std::compile_error!("Please enable at least one compute backend via crate features")
            }
        }
        //
        impl Update for MeshUpdate {
            fn perform_iterations(
                &self,
                _store: &mut MeshStore,
                _iterations: usize
            ) -> Result<(), Infallible> {
                Ok(())
            }
        }
    }
}
