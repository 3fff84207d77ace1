use clap::Parser;
use compute::UpdateCreate;
use compute_naive::oracle;
use compute_selector::MeshUpdate;
use data::{
    csv::{MeshDisplay, MeshDumper, MetricsRecord},
    mesh::{Mesh, MeshStore},
    parameters::RunConfig,
};
use eyre::Result;
use indicatif::ProgressBar;
use ui::SharedArgs;

/// Benchmark iterative 3x3 stencil updates of a 2D mesh
///
/// Every repetition initializes the mesh, times the configured number of
/// update cycles, then checks the result against the sequential reference.
/// One line of CSV metrics is printed per repetition.
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// CLI arguments shared with other front-ends
    #[command(flatten)]
    shared: SharedArgs<MeshUpdate>,
}

fn main() -> Result<()> {
    // Enable logging to stderr
    ui::init_logger();

    // Parse CLI arguments and derive the run configuration
    let args = Args::parse();
    let config = args.shared.run_config().validate()?;
    let nb_repeat = args.shared.nb_repeat();
    let verbose = args.shared.verbose;
    let dumpers = if args.shared.output {
        std::fs::create_dir_all(&args.shared.output_dir)?;
        Some([MeshDumper::RUN_PREFIX, MeshDumper::CHECK_PREFIX]
            .map(|prefix| MeshDumper::new(args.shared.output_dir.clone(), prefix)))
    } else {
        None
    };
    let [run_dumper, check_dumper] = match &dumpers {
        Some([run, check]) => [Some(run), Some(check)],
        None => [None, None],
    };

    // Set up the mesh update and the mesh storage, which is reused across
    // repetitions
    let update = MeshUpdate::new(config.weights, args.shared.backend)?;
    let mut store = MeshStore::allocate(config.shape);
    let mut reference = MeshStore::allocate(config.shape);

    // Set up progress reporting, which would garble verbose output
    let progress = if verbose {
        ProgressBar::hidden()
    } else {
        ui::init_progress_reporting("Running repetition", nb_repeat)
    };

    if !verbose {
        println!("{}", MetricsRecord::HEADER);
    }
    for rep in 0..nb_repeat {
        if verbose {
            println!("repeat {rep}");
        }

        // Prepare the mesh and the private copy used by the check
        let config = RunConfig {
            initial_mesh: config.initial_mesh.for_repetition(rep),
            ..config
        };
        store.initialize_interior(&config.initial_mesh);
        store.apply_boundary(&config.boundary);
        reference.copy_from(&store);
        if verbose {
            print!("initial mesh\n{}\n\n", MeshDisplay(store.live().view()));
        }

        // Run the timed update cycles, then check the outcome
        let observe = run_dumper.is_some() || verbose;
        let timing = if observe {
            compute::run_with(
                &update,
                &mut store,
                &config,
                mesh_observer(run_dumper, verbose, "mesh"),
            )?
        } else {
            compute::run(&update, &mut store, &config)?
        };
        let report = if observe {
            oracle::check_with(
                &mut reference,
                store.live(),
                &config,
                mesh_observer(check_dumper, verbose, "check mesh"),
            )?
        } else {
            oracle::check(&mut reference, store.live(), &config)
        };
        if !report.mismatches().is_empty() {
            log::error!(
                "Repetition {rep} failed the check with {} mismatching cell(s)",
                report.mismatches().len()
            );
        }

        // Report metrics
        let record = MetricsRecord {
            mesh_width: config.width(),
            mesh_height: config.height(),
            nb_iterations: config.nb_iterations,
            nb_repeat,
            rep,
            timing,
            check_status: report.status().code(),
        };
        progress.suspend(|| {
            if verbose {
                println!("{}", MetricsRecord::HEADER);
            }
            println!("{record}");
        });
        progress.inc(1);
    }
    progress.finish_using_style();
    Ok(())
}

/// Per-iteration callback that dumps and/or prints the mesh
fn mesh_observer<'dumper>(
    dumper: Option<&'dumper MeshDumper>,
    verbose: bool,
    label: &'static str,
) -> impl FnMut(usize, &Mesh) -> Result<()> + 'dumper {
    move |iteration, mesh| {
        if let Some(dumper) = dumper {
            dumper.dump(iteration, mesh.view())?;
        }
        if verbose {
            print!(
                "{label} after iteration {iteration}\n{}\n\n",
                MeshDisplay(mesh.view())
            );
        }
        Ok(())
    }
}
