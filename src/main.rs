use clap::Parser;
use jacobi3d::config::{ConfigFile, SolverConfig};
use jacobi3d::error::{JacobiError, Result};
use jacobi3d::output;
use jacobi3d::solver::comm::{Communicator, SingleProcessComm};
use jacobi3d::solver::comm_thread::ThreadComm;
use jacobi3d::solver::{solve, SolveOutcome};
use jacobi3d::stats::Stats;
use std::io;
use std::path::PathBuf;

/// Distributed Jacobi solver for a 3D Poisson problem
#[derive(Parser)]
#[command(name = "jacobi3d", version)]
struct Cli {
    /// TOML file with solver settings (flags override it)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Grid points per axis
    #[arg(short, long)]
    n: Option<usize>,

    /// Stop once the global max delta is at or below this
    #[arg(long)]
    epsilon: Option<f64>,

    /// Penalty constant of the reaction term
    #[arg(long)]
    penalty: Option<f64>,

    /// Give up after this many iterations
    #[arg(long)]
    max_iterations: Option<usize>,

    /// Number of in-process ranks
    #[arg(long, default_value_t = 1)]
    ranks: usize,

    /// Use MPI ranks (launch with mpirun)
    #[cfg(feature = "distributed")]
    #[arg(long, conflicts_with = "ranks")]
    mpi: bool,

    /// Print performance stats to stderr
    #[arg(long)]
    stats: bool,

    /// Write the assembled field as CSV to this file
    #[arg(long)]
    dump: Option<PathBuf>,
}

impl Cli {
    fn solver_config(&self) -> Result<SolverConfig> {
        let mut config = match &self.config {
            Some(path) => ConfigFile::load(path)?.apply(SolverConfig::default()),
            None => SolverConfig::default(),
        };
        if let Some(n) = self.n {
            config.n = n;
        }
        if let Some(epsilon) = self.epsilon {
            config.epsilon = epsilon;
        }
        if let Some(penalty) = self.penalty {
            config.penalty = penalty;
        }
        if self.max_iterations.is_some() {
            config.max_iterations = self.max_iterations;
        }
        Ok(config)
    }
}

/// Solve on every rank and return rank 0's outcome with its stats. Other
/// ranks' results are dropped; they fail the same way rank 0 does.
fn run(cli: &Cli, config: &SolverConfig) -> Result<(SolveOutcome, Option<Stats>)> {
    let solve_rank = |comm: &dyn Communicator| {
        let mut stats = cli.stats.then(Stats::new);
        solve(config, comm, stats.as_mut()).map(|outcome| (outcome, stats))
    };

    if cli.ranks == 0 {
        return Err(JacobiError::Partition("process count must be positive".into()));
    }
    if cli.ranks > 1 {
        ThreadComm::run(cli.ranks, |comm| solve_rank(&comm)).swap_remove(0)
    } else {
        solve_rank(&SingleProcessComm)
    }
}

fn report(cli: &Cli, config: &SolverConfig, outcome: &SolveOutcome, stats: Option<&Stats>) -> Result<()> {
    output::write_report(outcome, &mut io::stdout())?;
    if let (Some(path), Some(field)) = (&cli.dump, &outcome.field) {
        let mut file = io::BufWriter::new(std::fs::File::create(path)?);
        output::write_field_csv(config, field, &mut file)?;
    }
    if let Some(stats) = stats {
        stats.display();
    }
    Ok(())
}

#[cfg(feature = "distributed")]
fn run_mpi(cli: &Cli, config: &SolverConfig) {
    use jacobi3d::solver::comm_mpi::MpiComm;

    let _universe = mpi::initialize().unwrap_or_else(|| {
        eprintln!("MPI initialization failed");
        std::process::exit(1);
    });
    let comm = MpiComm::new();
    let mut stats = cli.stats.then(Stats::new);

    let outcome = solve(config, &comm, stats.as_mut()).unwrap_or_else(|e| {
        if comm.is_root() {
            eprintln!("Solve error: {}", e);
        }
        std::process::exit(1);
    });

    if comm.is_root() {
        report(cli, config, &outcome, stats.as_ref()).unwrap_or_else(|e| {
            eprintln!("Output error: {}", e);
            std::process::exit(1);
        });
    }
}

fn main() {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let config = cli.solver_config().unwrap_or_else(|e| {
        eprintln!("Config error: {}", e);
        std::process::exit(1);
    });

    #[cfg(feature = "distributed")]
    if cli.mpi {
        run_mpi(&cli, &config);
        return;
    }

    let (outcome, stats) = run(&cli, &config).unwrap_or_else(|e| {
        eprintln!("Solve error: {}", e);
        std::process::exit(1);
    });

    report(&cli, &config, &outcome, stats.as_ref()).unwrap_or_else(|e| {
        eprintln!("Output error: {}", e);
        std::process::exit(1);
    });
}
