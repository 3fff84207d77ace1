//! CSV output and textual display of meshes and benchmark metrics

use crate::Precision;
use ndarray::ArrayView2;
use std::{
    fmt::{self, Display, Formatter},
    fs::File,
    io::{self, BufWriter, Write},
    path::PathBuf,
    time::Duration,
};

/// Write a mesh as comma-separated rows of fixed-point values
///
/// Each value is printed with six decimals, each mesh row ends with a newline.
pub fn write_mesh(mut output: impl Write, mesh: ArrayView2<Precision>) -> io::Result<()> {
    for row in mesh.rows() {
        for (col, value) in row.iter().enumerate() {
            if col > 0 {
                output.write_all(b",")?;
            }
            write!(output, "{value:.6}")?;
        }
        output.write_all(b"\n")?;
    }
    Ok(())
}

/// Per-iteration mesh dumps into a directory
///
/// Files are named `<prefix>_<iteration>.csv` where the iteration number is
/// zero-padded to three digits, e.g. `run_mesh_007.csv`.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct MeshDumper {
    /// Output directory
    directory: PathBuf,

    /// File name prefix
    prefix: String,
}
//
impl MeshDumper {
    /// Prefix of the meshes produced by the benchmarked computation
    pub const RUN_PREFIX: &'static str = "run_mesh";

    /// Prefix of the meshes produced by the reference computation
    pub const CHECK_PREFIX: &'static str = "check_mesh";

    /// Prepare to dump meshes into some directory, which must exist
    pub fn new(directory: impl Into<PathBuf>, prefix: impl Into<String>) -> Self {
        Self {
            directory: directory.into(),
            prefix: prefix.into(),
        }
    }

    /// Path of the file associated with some iteration
    pub fn path(&self, iteration: usize) -> PathBuf {
        self.directory
            .join(format!("{}_{iteration:03}.csv", self.prefix))
    }

    /// Dump the state of the mesh after some iteration
    pub fn dump(&self, iteration: usize, mesh: ArrayView2<Precision>) -> io::Result<PathBuf> {
        let path = self.path(iteration);
        let mut output = BufWriter::new(File::create(&path)?);
        write_mesh(&mut output, mesh)?;
        output.flush()?;
        log::trace!("Wrote mesh of iteration {iteration} to {}", path.display());
        Ok(path)
    }
}

/// One line of benchmark metrics
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct MetricsRecord {
    /// Number of mesh columns
    pub mesh_width: usize,

    /// Number of mesh rows
    pub mesh_height: usize,

    /// Number of update cycles per repetition
    pub nb_iterations: usize,

    /// Number of repetitions
    pub nb_repeat: usize,

    /// Repetition index
    pub rep: usize,

    /// Wall-clock duration of the update cycles
    pub timing: Duration,

    /// Outcome of the correctness check, 0 for success and 1 for failure
    pub check_status: u8,
}
//
impl MetricsRecord {
    /// CSV header matching the Display output of this type
    pub const HEADER: &'static str =
        "mesh_width,mesh_height,nb_iterations,nb_repeat,rep,timing_seconds,check_status";
}
//
impl Display for MetricsRecord {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{},{},{},{},{},{},{}",
            self.mesh_width,
            self.mesh_height,
            self.nb_iterations,
            self.nb_repeat,
            self.rep,
            Scientific(self.timing.as_secs_f64()),
            self.check_status
        )
    }
}

/// Scientific notation with a signed exponent of at least two digits
///
/// Rust's `{:e}` writes `1.5e-3`, tools that ingest these metrics expect
/// `1.500000e-03`.
struct Scientific(f64);
//
impl Display for Scientific {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let formatted = format!("{:.6e}", self.0);
        let Some((mantissa, exponent)) = formatted.split_once('e') else {
            // Non-finite values have no exponent
            return f.write_str(&formatted);
        };
        let (sign, digits) = match exponent.strip_prefix('-') {
            Some(digits) => ('-', digits),
            None => ('+', exponent),
        };
        write!(f, "{mantissa}e{sign}{digits:0>2}")
    }
}

/// Human-readable preview of a mesh
///
/// At most [`MeshDisplay::MAX_ROWS`] rows and [`MeshDisplay::MAX_COLS`]
/// columns are displayed, the rest is elided with `...`.
#[derive(Copy, Clone, Debug)]
pub struct MeshDisplay<'mesh>(pub ArrayView2<'mesh, Precision>);
//
impl MeshDisplay<'_> {
    /// Maximal number of displayed rows
    pub const MAX_ROWS: usize = 100;

    /// Maximal number of displayed columns
    pub const MAX_COLS: usize = 20;
}
//
impl Display for MeshDisplay<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        writeln!(f, "[")?;
        for (idx, row) in self.0.rows().into_iter().enumerate() {
            if idx >= Self::MAX_ROWS {
                writeln!(f, "...")?;
                break;
            }
            write!(f, "[{idx:03}: ")?;
            for value in row.iter().take(Self::MAX_COLS) {
                write!(f, " {value:+8.2}")?;
            }
            if row.len() > Self::MAX_COLS {
                write!(f, "...")?;
            }
            writeln!(f, "]")?;
        }
        write!(f, "]")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::Mesh;
    use ndarray::Array2;
    use std::path::Path;

    #[test]
    fn mesh_csv() {
        let mesh: Mesh = ndarray::array![[1.0, -2.5], [0.125, 10.0]];
        let mut output = Vec::new();
        write_mesh(&mut output, mesh.view()).unwrap();
        assert_eq!(
            String::from_utf8(output).unwrap(),
            "1.000000,-2.500000\n0.125000,10.000000\n"
        );
    }

    #[test]
    fn dump_file_names() {
        let dumper = MeshDumper::new("out", MeshDumper::RUN_PREFIX);
        assert_eq!(dumper.path(7), Path::new("out/run_mesh_007.csv"));
        assert_eq!(dumper.path(123), Path::new("out/run_mesh_123.csv"));
    }

    #[test]
    fn dump_to_disk() {
        let directory = std::env::temp_dir().join(format!("mesh_dump_{}", std::process::id()));
        std::fs::create_dir_all(&directory).unwrap();
        let dumper = MeshDumper::new(&directory, MeshDumper::CHECK_PREFIX);
        let mesh = Mesh::from_elem([2, 3], 0.5);
        let path = dumper.dump(1, mesh.view()).unwrap();
        assert_eq!(path, directory.join("check_mesh_001.csv"));
        assert_eq!(
            std::fs::read_to_string(&path).unwrap(),
            "0.500000,0.500000,0.500000\n0.500000,0.500000,0.500000\n"
        );
        std::fs::remove_dir_all(&directory).unwrap();
    }

    #[test]
    fn metrics_line() {
        let record = MetricsRecord {
            mesh_width: 2000,
            mesh_height: 1000,
            nb_iterations: 100,
            nb_repeat: 10,
            rep: 3,
            timing: Duration::from_micros(1500),
            check_status: 0,
        };
        assert_eq!(
            record.to_string(),
            "2000,1000,100,10,3,1.500000e-03,0"
        );
        assert_eq!(MetricsRecord::HEADER.split(',').count(), 7);
        assert_eq!(Scientific(12.5).to_string(), "1.250000e+01");
        assert_eq!(Scientific(0.0).to_string(), "0.000000e+00");
    }

    #[test]
    fn small_mesh_display() {
        let mesh: Mesh = ndarray::array![[1.0, -2.0], [10.0, 0.5]];
        assert_eq!(
            MeshDisplay(mesh.view()).to_string(),
            "[\n[000:     +1.00    -2.00]\n[001:    +10.00    +0.50]\n]"
        );
    }

    #[test]
    fn large_mesh_display_is_elided() {
        let mesh = Array2::<Precision>::zeros([150, 30]);
        let text = MeshDisplay(mesh.view()).to_string();
        let lines = text.lines().collect::<Vec<_>>();
        // Opening bracket, 100 rows, elision, closing bracket
        assert_eq!(lines.len(), 103);
        assert_eq!(lines[101], "...");
        assert!(lines[1].ends_with("...]"));
        assert_eq!(lines[1].matches("+0.00").count(), MeshDisplay::MAX_COLS);
    }
}
