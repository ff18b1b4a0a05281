use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand, ValueEnum};
use hazard_config::{ConfigError, FillSchedule, HarnessConfig, ScenarioKind, ScratchPolicy};
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser)]
#[command(
    name = "hazard",
    version,
    about = "Concurrency hazard harness - check-then-act races and scratch leaks"
)]
struct Cli {
    /// Path to the configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one scenario, or all of them
    Run {
        /// Scenario to run
        #[arg(value_enum, default_value_t = ScenarioArg::All)]
        scenario: ScenarioArg,
        /// Print the full report as JSON
        #[arg(long)]
        json: bool,
        /// Override the worker count
        #[arg(short, long)]
        threads: Option<usize>,
        /// Override the number of frequency-count increments
        #[arg(short, long)]
        loops: Option<u64>,
        /// Fix the random seed for the frequency count
        #[arg(long)]
        seed: Option<u64>,
        /// Override the timeout in seconds
        #[arg(long)]
        timeout_secs: Option<u64>,
        /// Fill-race schedule
        #[arg(long, value_enum)]
        schedule: Option<ScheduleArg>,
        /// Clear the scratch slot after each task
        #[arg(long)]
        clear_scratch: bool,
    },
    /// Show the effective configuration
    Config,
}

#[derive(Clone, Copy, ValueEnum)]
enum ScenarioArg {
    All,
    Fill,
    Frequency,
    Scratch,
}

impl ScenarioArg {
    fn kinds(self) -> Vec<ScenarioKind> {
        match self {
            ScenarioArg::All => ScenarioKind::ALL.to_vec(),
            ScenarioArg::Fill => vec![ScenarioKind::Fill],
            ScenarioArg::Frequency => vec![ScenarioKind::Frequency],
            ScenarioArg::Scratch => vec![ScenarioKind::Scratch],
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum ScheduleArg {
    Free,
    ReadsFirst,
    Guarded,
}

impl From<ScheduleArg> for FillSchedule {
    fn from(arg: ScheduleArg) -> Self {
        match arg {
            ScheduleArg::Free => FillSchedule::Free,
            ScheduleArg::ReadsFirst => FillSchedule::ReadsFirst,
            ScheduleArg::Guarded => FillSchedule::Guarded,
        }
    }
}

/// Find a configuration file. Running without one uses the defaults.
fn find_config() -> Option<PathBuf> {
    // 1. HAZARD_CONFIG environment variable
    if let Ok(path) = std::env::var("HAZARD_CONFIG") {
        let path = PathBuf::from(path);
        if path.exists() {
            return Some(path);
        }
    }

    // 2. hazard.yaml in current directory
    let cwd_config = PathBuf::from("hazard.yaml");
    if cwd_config.exists() {
        return Some(cwd_config);
    }

    // 3. ~/.config/hazard/config.yaml
    if let Some(home) = dirs_next::home_dir() {
        let home_config = home.join(".config/hazard/config.yaml");
        if home_config.exists() {
            return Some(home_config);
        }
    }

    None
}

/// Load the configuration at `path`, or the defaults when there is none.
fn load_config(path: Option<PathBuf>) -> Result<HarnessConfig, ConfigError> {
    match path {
        Some(path) => {
            tracing::debug!(path = %path.display(), "loading configuration");
            HarnessConfig::from_file(&path)
        }
        None => Ok(HarnessConfig::default()),
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_tracing();

    let config = load_config(cli.config.or_else(find_config))?;

    match cli.command {
        None => {
            let args = commands::run::RunArgs {
                scenarios: ScenarioKind::ALL.to_vec(),
                json: false,
            };
            commands::run::run(config, args).await?;
        }
        Some(Commands::Run {
            scenario,
            json,
            threads,
            loops,
            seed,
            timeout_secs,
            schedule,
            clear_scratch,
        }) => {
            let mut config = config;
            if let Some(threads) = threads {
                config = config.with_threads(threads);
            }
            if let Some(loops) = loops {
                config = config.with_loops(loops);
            }
            if let Some(seed) = seed {
                config = config.with_seed(seed);
            }
            if let Some(secs) = timeout_secs {
                config = config.with_timeout(Duration::from_secs(secs));
            }
            if let Some(schedule) = schedule {
                config = config.with_fill_schedule(schedule.into());
            }
            if clear_scratch {
                config = config.with_scratch_policy(ScratchPolicy::ClearAfterTask);
            }
            let args = commands::run::RunArgs {
                scenarios: scenario.kinds(),
                json,
            };
            commands::run::run(config, args).await?;
        }
        Some(Commands::Config) => {
            commands::config::run(&config)?;
        }
    }

    Ok(())
}
