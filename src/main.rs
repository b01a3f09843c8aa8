use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use uart_conformance::config::{Config, ConfigError, ConfigLoader, LogFormat, LoggingConfig};
use uart_conformance::{
    ConnectionPolicy, HarnessError, HarnessResult, LiveBackend, MatrixGenerator, MockBackend,
    SimulatedBackend, SuiteRunner, TestCase, TransportBackend,
};

// Command-line arguments
#[derive(Parser, Debug)]
#[command(
    name = "uart-conformance",
    version,
    about = "Loopback conformance suite for UART channels.",
    long_about = "Generates a matrix of baud rates, clock pairs and data patterns, pushes each case through a live serial port, an external simulator or an in-memory loopback, and reports a verdict per case."
)]
struct Cli {
    /// Configuration file (default: resolved from UART_CONFORMANCE_CONFIG and standard locations)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Seed for random data patterns; logged when chosen automatically.
    #[arg(long, global = true)]
    seed: Option<u64>,

    /// Write the suite result as JSON to this path.
    #[arg(long, global = true)]
    report: Option<PathBuf>,

    /// Log level or filter directive, e.g. "debug" or "uart_conformance=trace".
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Only run cases whose id matches this regex.
    #[arg(long, global = true)]
    filter: Option<String>,

    /// Only run cases at these baud rates (comma separated).
    #[arg(long = "baud", global = true, value_delimiter = ',')]
    bauds: Vec<u32>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the generated test matrix without running it.
    List,
    /// Run against a serial port with a physical loopback.
    Live {
        /// Port name, e.g. /dev/ttyUSB0 or COM3 (falls back to live.port / TEST_PORT).
        #[arg(short, long)]
        port: Option<String>,
        /// Close and reopen the port around every case.
        #[arg(long)]
        reopen_per_case: bool,
    },
    /// Run against an external simulator through stimulus/response artifacts.
    Sim {
        /// Simulator executable (overrides simulation.command).
        #[arg(long = "command")]
        sim_command: Option<String>,
        /// Directory for artifacts (overrides simulation.working_dir).
        #[arg(long)]
        working_dir: Option<PathBuf>,
        /// Keep artifacts on disk after each case.
        #[arg(long)]
        keep_artifacts: bool,
    },
    /// Dry run against an in-memory loopback.
    Mock,
    /// Write the default configuration to a file.
    InitConfig {
        /// Destination path.
        path: PathBuf,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(1),
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::from(2)
        }
    }
}

/// Returns whether every case passed.
fn run(cli: Cli) -> HarnessResult<bool> {
    if let Command::InitConfig { path } = &cli.command {
        ConfigLoader::from_config(Config::default()).save_to(path)?;
        println!("Wrote default configuration to {}", path.display());
        return Ok(true);
    }

    let mut config = match &cli.config {
        Some(path) => ConfigLoader::load_from(path)?,
        None => ConfigLoader::load()?,
    }
    .into_config();
    apply_cli_overrides(&mut config, &cli);
    init_tracing(&config.logging)?;

    let cases = build_matrix(&config, cli.seed)?;
    if matches!(cli.command, Command::List) {
        for case in &cases {
            println!(
                "{}\t{}\t{} bytes\t{}",
                case.id(),
                case.config(),
                case.total_bytes(),
                case.description()
            );
        }
        println!("{} cases", cases.len());
        return Ok(true);
    }

    let settings = config.transfer.settings()?;
    let (mut backend, policy) = open_backend(&config, cli.command)?;
    let result = SuiteRunner::new(settings)
        .with_policy(policy)
        .run(&cases, &mut backend)?;

    print!("{result}");
    if let Some(path) = &config.report.output {
        result.write_json(path)?;
        info!(path = %path.display(), "report written");
    }
    Ok(result.is_success())
}

fn apply_cli_overrides(config: &mut Config, cli: &Cli) {
    if let Some(level) = &cli.log_level {
        config.logging.level = level.clone();
    }
    if let Some(report) = &cli.report {
        config.report.output = Some(report.clone());
    }
    if let Some(filter) = &cli.filter {
        config.selection.id_pattern = Some(filter.clone());
    }
    if !cli.bauds.is_empty() {
        config.selection.bauds = cli.bauds.clone();
    }
}

fn init_tracing(logging: &LoggingConfig) -> HarnessResult<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&logging.level))
        .map_err(|e| ConfigError::invalid("logging.level", e.to_string()))?;
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    let installed = match logging.format {
        LogFormat::Json => builder.json().try_init(),
        LogFormat::Pretty => builder.pretty().try_init(),
        LogFormat::Compact => builder.compact().try_init(),
    };
    installed.map_err(|e| HarnessError::configuration(format!("cannot install logger: {e}")))
}

fn build_matrix(config: &Config, seed: Option<u64>) -> HarnessResult<Vec<TestCase>> {
    let seed = seed.unwrap_or_else(rand::random);
    info!(seed, "generating test matrix");

    let generated = MatrixGenerator::new(config.matrix.clone())
        .with_seed(seed)
        .generate()?;
    let total = generated.len();
    let cases = config.selection.filter()?.apply(generated);
    if cases.len() < total {
        info!(selected = cases.len(), total, "applied case selection");
    }
    if cases.is_empty() {
        warn!("case selection matched nothing");
    }
    Ok(cases)
}

fn open_backend(
    config: &Config,
    command: Command,
) -> HarnessResult<(Box<dyn TransportBackend>, ConnectionPolicy)> {
    let (backend, policy): (Box<dyn TransportBackend>, ConnectionPolicy) = match command {
        Command::Live {
            port,
            reopen_per_case,
        } => {
            let port = port
                .or_else(|| config.live.port.clone())
                .ok_or_else(|| ConfigError::missing("live.port"))?;
            let policy = if reopen_per_case {
                ConnectionPolicy::ReopenPerCase
            } else {
                config.live.policy()
            };
            let backend = LiveBackend::new(port).with_io_timeout(config.live.io_timeout());
            (Box::new(backend), policy)
        }
        Command::Sim {
            sim_command,
            working_dir,
            keep_artifacts,
        } => {
            let mut simulation = config.simulation.clone();
            if sim_command.is_some() {
                simulation.command = sim_command;
            }
            if let Some(dir) = working_dir {
                simulation.working_dir = dir;
            }
            simulation.keep_artifacts |= keep_artifacts;
            let backend = SimulatedBackend::new(simulation.settings()?);
            (Box::new(backend), ConnectionPolicy::Reuse)
        }
        Command::Mock => (Box::new(MockBackend::new("loopback")), ConnectionPolicy::Reuse),
        Command::List | Command::InitConfig { .. } => {
            return Err(HarnessError::configuration("subcommand does not run a suite"));
        }
    };
    info!(backend = backend.name(), ?policy, "backend ready");
    Ok((backend, policy))
}
