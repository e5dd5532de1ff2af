//! Solve command implementation.

use super::CliError;
use indicatif::{ProgressBar, ProgressStyle};
use mep::data::{DATASET_NAMES, TrainingData, dataset_by_name};
use mep::gp::{
    ConstantsConfig, CrossoverKind, ErrorMeasure, EvolutionConfig, Mep, RunReport, load_config, save_report,
};
use rand::SeedableRng;
use rand::rngs::SmallRng;
use std::path::{Path, PathBuf};

/// Arguments of the `solve` command.
#[derive(clap::Args, Debug)]
pub(crate) struct SolveArgs {
    /// Dataset name (quarticpoly, pi, pythagorean, rastrigin, ackley) or a
    /// delimited file whose last column is the target
    #[arg(required = true)]
    input: String,

    /// Rows to generate for a synthetic dataset (default: 100)
    #[arg(long, default_value = "100")]
    rows: usize,

    /// Individuals per island, must be even (default: 100)
    #[arg(long)]
    sub_pop: Option<usize>,

    /// Number of islands (default: 1)
    #[arg(long)]
    islands: Option<usize>,

    /// Genes per chromosome (default: 50)
    #[arg(long)]
    code: Option<usize>,

    /// Maximum generations (default: 1000)
    #[arg(short, long, default_value = "1000")]
    gens: usize,

    /// Random seed (default: 42)
    #[arg(short, long)]
    seed: Option<u64>,

    /// Stop once the best error is at or below this value
    #[arg(short, long, default_value = "0.0")]
    fitness_threshold: f64,

    /// Mutation probability (default: 0.1)
    #[arg(long)]
    mp: Option<f64>,

    /// Crossover probability (default: 0.9)
    #[arg(long)]
    cp: Option<f64>,

    /// Crossover operator: one-cut-point or uniform
    #[arg(long)]
    crossover: Option<CrossoverKind>,

    /// Random constants as num,min,max
    #[arg(long = "const")]
    constants: Option<String>,

    /// Fixed constants shared by every chromosome
    #[arg(long, value_delimiter = ',', allow_negative_numbers = true)]
    fixed: Vec<f64>,

    /// Operators to enable (comma separated)
    #[arg(long, value_delimiter = ',')]
    enable: Vec<String>,

    /// Operators to disable (comma separated)
    #[arg(long, value_delimiter = ',')]
    disable: Vec<String>,

    /// Error measure: total, mean, logloss, misclassified[@threshold]
    #[arg(short, long, default_value = "total")]
    error: ErrorMeasure,

    /// Field separator for input files (default: whitespace)
    #[arg(long)]
    sep: Option<char>,

    /// Input file starts with a header line of labels
    #[arg(long)]
    header: bool,

    /// JSON configuration file; flags override its values
    #[arg(long)]
    config: Option<PathBuf>,

    /// Save a JSON run report
    #[arg(long)]
    save: Option<PathBuf>,

    /// Show progress bar
    #[arg(short, long)]
    progress: bool,

    /// Print the summary only
    #[arg(long)]
    summary: bool,
}

/// Parse `num,min,max`.
fn parse_constants(spec: &str, fixed: Vec<f64>) -> Result<ConstantsConfig, CliError> {
    let bad = || CliError::new(format!("invalid --const '{spec}': expected num,min,max"));
    let parts: Vec<&str> = spec.split(',').map(str::trim).collect();
    let [num, min, max] = parts.as_slice() else {
        return Err(bad());
    };
    Ok(ConstantsConfig {
        fixed,
        num_random: num.parse().map_err(|_| bad())?,
        min: min.parse().map_err(|_| bad())?,
        max: max.parse().map_err(|_| bad())?,
    })
}

fn build_config(args: &SolveArgs) -> Result<EvolutionConfig, CliError> {
    let mut config = match &args.config {
        Some(path) => load_config(path)
            .map_err(|e| CliError::new(format!("Failed to read {}: {e}", path.display())))?,
        None => EvolutionConfig::default(),
    };

    if let Some(n) = args.sub_pop {
        config.sub_population_size = n;
    }
    if let Some(n) = args.islands {
        config.num_islands = n;
    }
    if let Some(n) = args.code {
        config.code_length = n;
    }
    if let Some(seed) = args.seed {
        config.seed = seed;
    }
    if let Some(p) = args.mp {
        config.mutation.probability = p;
    }
    if let Some(p) = args.cp {
        config.crossover.probability = p;
    }
    if let Some(kind) = args.crossover {
        config.crossover.kind = kind;
    }
    if let Some(spec) = &args.constants {
        let fixed = if args.fixed.is_empty() {
            config.constants.fixed.clone()
        } else {
            args.fixed.clone()
        };
        config.constants = parse_constants(spec, fixed)?;
    } else if !args.fixed.is_empty() {
        config.constants.fixed.clone_from(&args.fixed);
    }

    let mut operators = config.operator_set();
    for name in &args.enable {
        operators.enable_named(name)?;
    }
    for name in &args.disable {
        operators.disable_named(name)?;
    }
    config.operators = operators.enabled().to_vec();

    config.validate()?;
    Ok(config)
}

fn load_data(args: &SolveArgs, seed: u64) -> Result<TrainingData, CliError> {
    if DATASET_NAMES.contains(&args.input.as_str()) {
        let mut rng = SmallRng::seed_from_u64(seed);
        return Ok(dataset_by_name(&args.input, &mut rng, args.rows)?);
    }
    let path = Path::new(&args.input);
    TrainingData::read_file(path, args.sep, args.header)
        .map_err(|e| CliError::new(format!("Failed to load {}: {e}", path.display())))
}

/// Execute the solve command.
///
/// # Errors
///
/// Returns an error if the configuration or the data is invalid, or the
/// report cannot be written.
pub(crate) fn execute(args: &SolveArgs) -> Result<(), CliError> {
    let config = build_config(args)?;
    let data = load_data(args, config.seed)?;

    if !args.summary {
        println!("Training data: {} rows, {} variables", data.num_rows(), data.num_variables());
        println!(
            "  Population: {} x {} islands, code length {}",
            config.sub_population_size, config.num_islands, config.code_length
        );
        let names: Vec<&str> = config.operators.iter().map(|op| op.name()).collect();
        println!("  Operators: {}", names.join(","));
        println!("  Error measure: {}", args.error);
        println!();
    }

    let mut mep = Mep::new(config, data, args.error)?;

    // Progress bar
    let pb = if args.progress {
        let pb = ProgressBar::new(args.gens as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} gens {msg}")
                .map_err(|e| CliError::new(format!("invalid progress template: {e}")))?
                .progress_chars("=>-"),
        );
        Some(pb)
    } else {
        None
    };

    let verbose = !args.summary && pb.is_none();
    let mut last_best = mep.best_fitness();
    let outcome = mep.solve_with(args.gens, args.fitness_threshold, |report| {
        if let Some(pb) = &pb {
            pb.set_position(report.generation as u64);
            pb.set_message(format!("best={:.6}", report.stats.best_fitness));
        } else if verbose && report.stats.best_fitness < last_best {
            println!(
                "Gen {:>5}: best={:.6} mean={:.6}",
                report.generation, report.stats.best_fitness, report.stats.mean_fitness
            );
        }
        last_best = last_best.min(report.stats.best_fitness);
    });

    if let Some(pb) = pb {
        pb.finish_with_message(format!("best={:.6}", outcome.best_fitness));
    }

    println!("Elapsed time: {:.3?}", outcome.elapsed);
    println!("Solution after {} generations ({:?}):", outcome.generations, outcome.state);
    println!("  Error: {}", outcome.best_fitness);
    println!("  Expression: {}", mep.best_expression());

    if let Some(path) = &args.save {
        let report = RunReport::new(&mep, &outcome);
        save_report(&report, path)
            .map_err(|e| CliError::new(format!("Failed to save {}: {e}", path.display())))?;
        println!("  Report saved to: {}", path.display());
    }

    Ok(())
}
