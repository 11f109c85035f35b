//! The command line interface for the optimiser.
use crate::cache::ResultCache;
use crate::input::{
    CsvProfileSource, ProblemInput, read_batch_input, read_json, read_problem_input,
};
use crate::log;
use crate::output::metadata::{RunMetadata, write_metadata};
use crate::output::{BATCH_RESULTS_FILE_NAME, write_json, write_result};
use crate::runner::Runner;
use crate::settings::Settings;
use ::log::{info, warn};
use anyhow::{Context, Result, ensure};
use clap::{Args, CommandFactory, Parser, Subcommand};
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};

pub mod settings;
use settings::SettingsSubcommands;

/// The file name for metadata about a batch run
const BATCH_METADATA_FILE_NAME: &str = "batch.metadata.json";

/// The command line interface for the optimiser.
#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// The available commands.
    #[command(subcommand)]
    command: Option<Commands>,
    /// Flag to provide the CLI docs as markdown
    #[arg(long, hide = true)]
    markdown_help: bool,
}

/// Options for locating renewable profiles
#[derive(Args)]
pub struct ProfileOpts {
    /// Directory containing aggregated profile files (overrides settings)
    #[arg(short, long)]
    pub profiles_dir: Option<PathBuf>,
}

/// Options for the `solve` command
#[derive(Args)]
pub struct SolveOpts {
    /// Where to find profiles
    #[command(flatten)]
    pub profiles: ProfileOpts,
    /// File to write the result to. If not given, the result is printed.
    #[arg(short, long)]
    pub output: Option<PathBuf>,
    /// Don't read or write cached results
    #[arg(long)]
    pub no_cache: bool,
}

/// Options for the `batch` command
#[derive(Args)]
pub struct BatchOpts {
    /// Where to find profiles
    #[command(flatten)]
    pub profiles: ProfileOpts,
    /// Directory for output files
    #[arg(short, long)]
    pub output_dir: Option<PathBuf>,
    /// Don't read or write cached results
    #[arg(long)]
    pub no_cache: bool,
}

/// The available commands.
#[derive(Subcommand)]
enum Commands {
    /// Optimise a single process chain.
    Solve {
        /// Path to the input JSON file.
        input: PathBuf,
        /// Other solve options
        #[command(flatten)]
        opts: SolveOpts,
    },
    /// Optimise many process chains in parallel.
    Batch {
        /// Path to a JSON file containing an array of inputs.
        input: PathBuf,
        /// Other batch options
        #[command(flatten)]
        opts: BatchOpts,
    },
    /// Validate an input file (a single problem or a batch) without solving it.
    Validate {
        /// Path to the input JSON file.
        input: PathBuf,
        /// Where to find profiles
        #[command(flatten)]
        opts: ProfileOpts,
    },
    /// Manage settings file.
    Settings {
        /// The subcommands for managing the settings file.
        #[command(subcommand)]
        subcommand: SettingsSubcommands,
    },
}

impl Commands {
    /// Execute the supplied CLI command
    fn execute(self) -> Result<()> {
        match self {
            Self::Solve { input, opts } => handle_solve_command(&input, &opts, None),
            Self::Batch { input, opts } => handle_batch_command(&input, &opts, None),
            Self::Validate { input, opts } => handle_validate_command(&input, &opts, None),
            Self::Settings { subcommand } => subcommand.execute(),
        }
    }
}

/// Parse CLI arguments and start the optimiser
pub fn run_cli() -> Result<()> {
    let cli = Cli::parse();

    // Invoked as: `$ flh-opt --markdown-help`
    if cli.markdown_help {
        clap_markdown::print_help_markdown::<Cli>();
        return Ok(());
    }

    if let Some(command) = cli.command {
        command.execute()?;
    } else {
        // No command provided. Show help.
        Cli::command().print_long_help()?;
    }

    Ok(())
}

/// Load program settings, if not provided
fn load_settings(settings: Option<Settings>) -> Result<Settings> {
    match settings {
        Some(settings) => Ok(settings),
        None => Settings::load().context("Failed to load settings."),
    }
}

/// Get the profile source, preferring the command-line option over settings
fn get_profile_source(opts: &ProfileOpts, settings: &Settings) -> Result<CsvProfileSource> {
    let dir = opts
        .profiles_dir
        .clone()
        .unwrap_or_else(|| settings.profiles_dir.clone());
    ensure!(
        dir.is_dir(),
        "Profiles directory not found: {}",
        dir.display()
    );
    info!("Reading profiles from {}", dir.display());

    Ok(CsvProfileSource::new(dir))
}

fn get_cache(no_cache: bool, settings: &Settings) -> Option<ResultCache> {
    if no_cache {
        return None;
    }

    settings.cache_dir().map(ResultCache::new)
}

/// Handle the `solve` command.
pub fn handle_solve_command(
    input_path: &Path,
    opts: &SolveOpts,
    settings: Option<Settings>,
) -> Result<()> {
    let settings = load_settings(settings)?;

    // Initialise program logger (we won't save log files when solving a single problem)
    log::init(&settings.log_level, None).context("Failed to initialise logging.")?;

    let input = read_problem_input(input_path).context("Failed to read input.")?;
    let profiles = get_profile_source(&opts.profiles, &settings)?;
    let cache = get_cache(opts.no_cache, &settings);
    let runner = Runner::new(&profiles)
        .with_cache(cache.as_ref())
        .with_options(settings.solver_options())
        .with_retry(settings.retry_numerical_failures);

    let result = runner
        .solve(&input)
        .with_context(|| format!("Optimisation failed for {}", input.source_region_code))?;
    info!(
        "Optimisation complete. Objective value: {}",
        result.objective_value
    );

    match &opts.output {
        Some(output_path) => {
            write_result(output_path, &result)?;
            info!("Result written to {}", output_path.display());
        }
        None => println!("{}", serde_json::to_string_pretty(&result)?),
    }

    Ok(())
}

/// Handle the `batch` command.
pub fn handle_batch_command(
    input_path: &Path,
    opts: &BatchOpts,
    settings: Option<Settings>,
) -> Result<()> {
    let settings = load_settings(settings)?;

    // Get path to output folder
    let output_dir = opts.output_dir.clone().unwrap_or_else(|| PathBuf::from("."));
    fs::create_dir_all(&output_dir).with_context(|| {
        format!(
            "Failed to create output directory: {}",
            output_dir.display()
        )
    })?;

    // Initialise program logger
    log::init(&settings.log_level, Some(&output_dir))
        .context("Failed to initialise logging.")?;
    info!("Starting flh-opt v{}", env!("CARGO_PKG_VERSION"));

    let inputs = read_batch_input(input_path).context("Failed to read input.")?;
    info!("Loaded {} problems from {}", inputs.len(), input_path.display());

    let profiles = get_profile_source(&opts.profiles, &settings)?;
    let cache = get_cache(opts.no_cache, &settings);
    let runner = Runner::new(&profiles)
        .with_cache(cache.as_ref())
        .with_options(settings.solver_options())
        .with_retry(settings.retry_numerical_failures);
    let entries = runner.solve_batch(&inputs);

    let num_failed = entries.iter().filter(|entry| !entry.is_ok()).count();
    write_json(&output_dir.join(BATCH_RESULTS_FILE_NAME), &entries)?;
    write_metadata(
        &output_dir.join(BATCH_METADATA_FILE_NAME),
        RunMetadata::new(
            inputs
                .iter()
                .map(|input| input.source_region_code.clone())
                .collect(),
            if num_failed == 0 { "Optimal" } else { "Failed" },
        ),
    )?;

    if num_failed > 0 {
        warn!("{num_failed} of {} optimisations failed", entries.len());
    }
    info!("Results written to {}", output_dir.display());

    Ok(())
}

/// Handle the `validate` command.
pub fn handle_validate_command(
    input_path: &Path,
    opts: &ProfileOpts,
    settings: Option<Settings>,
) -> Result<()> {
    let settings = load_settings(settings)?;
    log::init(&settings.log_level, None).context("Failed to initialise logging.")?;

    // The input may be a single problem or a batch
    let value: Value = read_json(input_path).context("Failed to read input.")?;
    let inputs: Vec<ProblemInput> = if value.is_array() {
        serde_json::from_value(value)
    } else {
        serde_json::from_value::<ProblemInput>(value).map(|input| vec![input])
    }
    .with_context(|| format!("Invalid input file {}", input_path.display()))?;

    let profiles = get_profile_source(opts, &settings)?;
    let runner = Runner::new(&profiles);
    for (index, input) in inputs.iter().enumerate() {
        runner.validate(input).with_context(|| {
            format!(
                "Validation failed for problem {index} ({})",
                input.source_region_code
            )
        })?;
    }
    info!("Validation successful!");

    Ok(())
}
