#![deny(unused_variables)]
#![deny(dead_code)]
#![deny(unused_imports)]
#![deny(clippy::no_effect_underscore_binding)]

use clap::{Args, CommandFactory, Parser, Subcommand};
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::path::PathBuf;
use std::process;

use selgain::config::{AnalysisConfig, PhenotypeScale};
use selgain::families::{AnalysisReport, run_analysis};
use selgain::hockey::hockey_stick_pmf_with;
use selgain::normax::{ExtremeValueMethod, expected_max, simulate_expected_max};
use selgain::types::PmfVariant;

#[derive(Args)]
pub struct GainArgs {
    /// Family table with FID, IID, predicted and measured columns (.csv, .tsv or .txt)
    #[arg(required_unless_present = "config")]
    pub data: Option<PathBuf>,

    /// Start from a saved analysis configuration (.toml); flags given here take precedence
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Size of the random subset the best-predicted member is chosen from
    #[arg(short = 'k', long, value_name = "N")]
    pub selection_size: Option<usize>,

    /// Replace predictions with measured values (upper bound only)
    #[arg(long)]
    pub oracle: bool,

    /// Keep only individuals whose IID is below this value
    #[arg(long, value_name = "T")]
    pub child_id_threshold: Option<i64>,

    /// Population mean of the measured trait; reported gains are then in SD units
    #[arg(long, requires = "phenotype_sd")]
    pub phenotype_mean: Option<f64>,

    /// Population standard deviation of the measured trait
    #[arg(long, requires = "phenotype_mean")]
    pub phenotype_sd: Option<f64>,

    /// Measured values are adult heights in cm (mean 173, SD 5.6)
    #[arg(long, conflicts_with_all = ["phenotype_mean", "phenotype_sd"])]
    pub height_cm: bool,

    /// Also estimate the null variance by shuffling
    #[arg(long)]
    pub simulate_null: bool,

    /// Shuffles per family for the simulated null
    #[arg(long, value_name = "N")]
    pub trials: Option<usize>,

    /// Seed for the simulated null
    #[arg(long)]
    pub seed: Option<u64>,

    /// Write the effective configuration to this file before running
    #[arg(long, value_name = "FILE")]
    pub save_config: Option<PathBuf>,
}

#[derive(Parser)]
#[command(
    name = "selgain",
    about = "Expected gain of selecting the best-predicted member of a group",
    long_about = "Estimates the expected benefit of choosing the top candidate by a noisy \
                 predictor out of a random group, its spread under a no-information null, \
                 and the expected maximum of standard normal variables."
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Average selection gain across the families of a table
    #[command(about = "Average selection gain across families, with its null spread")]
    Gain(GainArgs),

    /// Expected maximum of n standard normal variables
    #[command(about = "Expected maximum of n i.i.d. standard normals, every estimator")]
    Normax {
        /// One or more group sizes
        #[arg(required = true, num_args = 1..)]
        n: Vec<usize>,

        /// Rows drawn for the Monte Carlo estimate
        #[arg(long, default_value = "10000")]
        trials: usize,

        /// Seed for the Monte Carlo estimate
        #[arg(long)]
        seed: Option<u64>,
    },

    /// Probability that the best of a random k-subset has each rank
    #[command(about = "Print the hockey-stick rank distribution for n items and subsets of k")]
    Pmf {
        n: usize,
        k: usize,

        /// Evaluate with direct binomial coefficients instead of the stable recursion
        #[arg(long)]
        reference: bool,
    },
}

fn effective_config(args: GainArgs) -> Result<AnalysisConfig, Box<dyn std::error::Error>> {
    let mut config = match (&args.config, &args.data) {
        (Some(path), _) => {
            println!("Loading configuration from: {}", path.display());
            AnalysisConfig::load(path)?
        }
        (None, Some(data)) => AnalysisConfig::new(data.clone()),
        (None, None) => return Err("either a data file or --config is required".into()),
    };

    if let Some(data) = args.data {
        config.data_source = data;
    }
    if let Some(k) = args.selection_size {
        config.selection_size = k;
    }
    if args.oracle {
        config.oracle_mode = true;
    }
    if args.child_id_threshold.is_some() {
        config.child_id_threshold = args.child_id_threshold;
    }
    if let (Some(mean), Some(sd)) = (args.phenotype_mean, args.phenotype_sd) {
        config.phenotype_scale = Some(PhenotypeScale { mean, sd });
    }
    if args.height_cm {
        config.phenotype_scale = Some(PhenotypeScale::HEIGHT_CM);
    }
    if args.simulate_null {
        config.simulate_null = true;
    }
    if let Some(trials) = args.trials {
        config.trials = trials;
    }
    if args.seed.is_some() {
        config.random_seed = args.seed;
    }
    config.validate()?;

    if let Some(path) = args.save_config {
        config.save(&path)?;
        println!("Configuration saved to: {}", path.display());
    }
    Ok(config)
}

fn print_report(config: &AnalysisConfig, report: &AnalysisReport) {
    let gain = &report.gain;
    let unit = if gain.mean_gain_in_sd.is_some() {
        " SD"
    } else {
        ""
    };

    if config.oracle_mode {
        println!("[ORACLE] Predictions replaced by measured values; this is an upper bound.");
    }
    println!(
        "Families: {} ({} used, {} with fewer than {} members skipped)",
        report.families_total, gain.families_used, gain.families_skipped, gain.selection_size
    );
    println!(
        "Average gain, best of {}: {:.6}{}",
        gain.selection_size,
        gain.reported_gain(),
        unit
    );
    if let Some(scale) = &config.phenotype_scale {
        println!(
            "  ({:.6} in measured units, phenotype SD {})",
            gain.mean_gain, scale.sd
        );
    }
    println!(
        "Null SD of the average (exact): {:.6}{}",
        report.null_exact.standard_deviation, unit
    );
    if let Some(simulated) = &report.null_simulated {
        println!(
            "Null SD of the average (simulated, {} shuffles per family): {:.6}{}",
            config.trials, simulated.standard_deviation, unit
        );
    }
    match report.z_score() {
        Some(z) => println!("z-score against the null: {z:.3}"),
        None => println!("z-score against the null: undefined (no spread under the null)"),
    }
}

fn run_gain(args: GainArgs) -> Result<(), Box<dyn std::error::Error>> {
    let config = effective_config(args)?;
    println!("Analysing: {}", config.data_source.display());
    let report = run_analysis(&config)?;
    print_report(&config, &report);
    Ok(())
}

fn run_normax(
    sizes: Vec<usize>,
    trials: usize,
    seed: Option<u64>,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut rng = match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };

    for n in sizes {
        println!("n = {n}");
        let estimate = simulate_expected_max(n, trials, &mut rng)?;
        println!(
            "  {:<28} {:.6} ± {:.6} ({} trials)",
            "Monte Carlo", estimate.mean, estimate.standard_error, estimate.trials
        );
        for method in ExtremeValueMethod::ALL {
            println!("  {:<28} {:.6}", method.name(), expected_max(n, method)?);
        }
    }
    Ok(())
}

fn run_pmf(n: usize, k: usize, reference: bool) -> Result<(), Box<dyn std::error::Error>> {
    let variant = if reference {
        PmfVariant::DirectBinomial
    } else {
        PmfVariant::Recursive
    };
    let pmf = hockey_stick_pmf_with(n, k, variant)?;
    println!("rank\tprobability");
    for (idx, p) in pmf.iter().enumerate() {
        println!("{}\t{:.12e}", idx + 1, p);
    }
    Ok(())
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let Cli { command } = cli;

    let result = match command {
        Some(Commands::Gain(args)) => run_gain(args),
        Some(Commands::Normax { n, trials, seed }) => run_normax(n, trials, seed),
        Some(Commands::Pmf { n, k, reference }) => run_pmf(n, k, reference),
        None => {
            Cli::command().print_help().expect("print help");
            println!();
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}
