//! This crate collects elements that are shared between the benchmark binary
//! and any other front-end to the stencil mesh update engine.

use clap::{Args, ValueEnum};
use compute::UpdateBase;
use data::parameters::{InitialMesh, RunConfig};
use indicatif::{ProgressBar, ProgressFinish, ProgressStyle};
use log::LevelFilter;
use std::{num::NonZeroUsize, path::PathBuf, time::Duration};

/// Maximal number of iterations when per-iteration mesh dumps are enabled
pub const MAX_OUTPUT_ITERATIONS: usize = 100;

/// Initial value policy for the mesh interior, as selected on the CLI
#[derive(Copy, Clone, Debug, Default, Eq, Hash, PartialEq, ValueEnum)]
pub enum InitialMeshKind {
    /// All interior cells start at zero
    #[default]
    Zero,

    /// Interior cells are drawn uniformly from [-10, 10]
    Random,
}

/// CLI arguments shared by every front-end of the benchmark
#[derive(Args)]
pub struct SharedArgs<Update: UpdateBase> {
    /// Number of columns of the mesh
    #[arg(long, default_value_t = 2000)]
    pub mesh_width: usize,

    /// Number of rows of the mesh
    #[arg(long, default_value_t = 1000)]
    pub mesh_height: usize,

    /// Initial value of the mesh interior
    #[arg(long, value_enum, default_value_t)]
    pub initial_mesh: InitialMeshKind,

    /// Seed of the random initial mesh
    ///
    /// Each repetition offsets this seed by its index.
    #[arg(long, default_value_t = 0)]
    pub seed: u64,

    /// Number of update cycles per repetition
    #[arg(long, default_value_t = NonZeroUsize::new(100).unwrap())]
    pub nb_iterations: NonZeroUsize,

    /// Number of timed repetitions
    #[arg(long, default_value_t = NonZeroUsize::new(10).unwrap())]
    pub nb_repeat: NonZeroUsize,

    /// Dump the mesh as CSV after every update cycle
    ///
    /// This forces a single repetition and caps the number of iterations to
    /// 100, since every iteration produces two files.
    #[arg(long)]
    pub output: bool,

    /// Directory where CSV mesh dumps are written
    #[arg(long, default_value = ".")]
    pub output_dir: PathBuf,

    /// Print the mesh after every update cycle
    #[arg(long)]
    pub verbose: bool,

    /// Backend-specific CLI arguments
    #[command(flatten)]
    pub backend: Update::CliArgs,
}
//
impl<Update: UpdateBase> SharedArgs<Update> {
    /// Run configuration described by these arguments
    ///
    /// The result still needs to go through [`RunConfig::validate()`].
    pub fn run_config(&self) -> RunConfig {
        let initial_mesh = match self.initial_mesh {
            InitialMeshKind::Zero => InitialMesh::Zero,
            InitialMeshKind::Random => InitialMesh::random(self.seed),
        };
        RunConfig {
            shape: [self.mesh_height, self.mesh_width],
            nb_iterations: self.nb_iterations(),
            initial_mesh,
            ..RunConfig::default()
        }
    }

    /// Number of update cycles, accounting for the mesh dump cap
    pub fn nb_iterations(&self) -> usize {
        if self.output {
            self.nb_iterations.get().min(MAX_OUTPUT_ITERATIONS)
        } else {
            self.nb_iterations.get()
        }
    }

    /// Number of repetitions, accounting for mesh dumps
    pub fn nb_repeat(&self) -> usize {
        if self.output {
            1
        } else {
            self.nb_repeat.get()
        }
    }
}

/// Set up logging to stderr
///
/// Warnings and errors are displayed by default, use the `RUST_LOG`
/// environment variable to see more.
pub fn init_logger() {
    env_logger::Builder::new()
        .filter_level(LevelFilter::Warn)
        .parse_default_env()
        .init();
}

/// Set up a progress bar over some number of work items
pub fn init_progress_reporting(message: &'static str, len: usize) -> ProgressBar {
    let progress = ProgressBar::new(len as u64)
        .with_message(message)
        .with_style(
            ProgressStyle::with_template("{msg} {pos}/{len} {wide_bar} {elapsed}/~{duration}")
                .expect("Failed to parse style"),
        )
        .with_finish(ProgressFinish::AndClear);
    progress.enable_steady_tick(Duration::from_millis(100));
    progress
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::{Command, FromArgMatches};
    use compute::NoArgs;
    use std::convert::Infallible;

    struct NoBackend;
    //
    impl UpdateBase for NoBackend {
        type CliArgs = NoArgs;

        type Error = Infallible;
    }

    type TestArgs = SharedArgs<NoBackend>;

    fn parse(args: &[&str]) -> TestArgs {
        let command = TestArgs::augment_args(Command::default().no_binary_name(true));
        TestArgs::from_arg_matches(&command.get_matches_from(args)).unwrap()
    }

    fn try_parse(args: &[&str]) -> Result<TestArgs, clap::Error> {
        let command = TestArgs::augment_args(Command::default().no_binary_name(true));
        TestArgs::from_arg_matches(&command.try_get_matches_from(args)?)
    }

    /// Parse the defaults of a backend's full CLI
    fn parse_backend_defaults<Backend: UpdateBase>() -> SharedArgs<Backend> {
        let command = SharedArgs::<Backend>::augment_args(Command::default().no_binary_name(true));
        command.clone().debug_assert();
        let matches = command.try_get_matches_from(Vec::<&str>::new()).unwrap();
        SharedArgs::<Backend>::from_arg_matches(&matches).unwrap()
    }

    #[test]
    fn backends_parse_defaults() {
        let expected = RunConfig::default();
        let configs = [
            parse_backend_defaults::<compute_naive::MeshUpdate>().run_config(),
            parse_backend_defaults::<compute_autovec::MeshUpdate>().run_config(),
            parse_backend_defaults::<compute_block::MeshUpdate>().run_config(),
            parse_backend_defaults::<compute_parallel::MeshUpdate>().run_config(),
            parse_backend_defaults::<compute_parallel::VectorMeshUpdate>().run_config(),
        ];
        for config in configs {
            assert_eq!(config, expected);
        }
    }

    #[test]
    fn defaults() {
        let args = parse(&[]);
        assert_eq!(args.run_config(), RunConfig::default());
        assert_eq!(args.nb_repeat(), 10);
        assert!(!args.verbose);
    }

    #[test]
    fn mesh_options() {
        let args = parse(&[
            "--mesh-width",
            "40",
            "--mesh-height",
            "30",
            "--initial-mesh",
            "random",
            "--seed",
            "7",
            "--nb-iterations",
            "12",
        ]);
        let config = args.run_config();
        assert_eq!(config.shape, [30, 40]);
        assert_eq!((config.width(), config.height()), (40, 30));
        assert_eq!(config.nb_iterations, 12);
        assert_eq!(config.initial_mesh, InitialMesh::random(7));
    }

    #[test]
    fn output_caps_the_run() {
        let args = parse(&["--output", "--nb-iterations", "500", "--nb-repeat", "4"]);
        assert_eq!(args.nb_repeat(), 1);
        assert_eq!(args.run_config().nb_iterations, MAX_OUTPUT_ITERATIONS);

        let args = parse(&["--output", "--nb-iterations", "20"]);
        assert_eq!(args.run_config().nb_iterations, 20);
    }

    #[test]
    fn rejects_invalid_counts() {
        assert!(try_parse(&["--nb-iterations", "0"]).is_err());
        assert!(try_parse(&["--nb-repeat", "0"]).is_err());
        assert!(try_parse(&["--initial-mesh", "ones"]).is_err());
    }

    #[test]
    fn small_mesh_fails_validation() {
        let args = parse(&["--mesh-width", "2"]);
        assert!(args.run_config().validate().is_err());
    }
}
