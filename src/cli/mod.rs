//! Command-line parsing for the probe-budget optimizer.
//!
//! The goal of this module is to keep **argument parsing** and **command dispatch**
//! separate from the interpolation/optimization code.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::domain::ScanOrder;

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(
    name = "probe-budget",
    version,
    about = "Choose per-dataset probe design parameters under a total probe budget"
)]
pub struct Cli {
    /// Log debug detail (overridden by RUST_LOG).
    #[arg(short = 'v', long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Optimize parameters for every dataset and print/write the choice.
    Optimize(OptimizeArgs),
    /// Check a parameter file against the grid and a budget.
    Check(CheckArgs),
    /// Print one interpolated probe count.
    Interp(InterpArgs),
    /// Print a dataset's grid as a mismatches x cover_extension matrix.
    Matrix(DatasetArgs),
    /// Plot probe count against mismatches for one dataset.
    Plot(PlotArgs),
}

/// Where probe counts come from.
#[derive(Debug, Args, Clone)]
#[group(required = true, multiple = false)]
pub struct GridArgs {
    /// Results directory: one subdirectory of FASTA files per dataset.
    #[arg(short = 'i', long = "results-dir", value_name = "DIR")]
    pub results_dir: Option<PathBuf>,

    /// Tab-separated grid table (dataset, mismatches, cover_extension, probe_count).
    #[arg(long, value_name = "TSV")]
    pub grid: Option<PathBuf>,
}

/// Options for `optimize`.
#[derive(Debug, Args, Clone)]
pub struct OptimizeArgs {
    #[command(flatten)]
    pub source: GridArgs,

    /// Only optimize these datasets.
    #[arg(short = 'd', long = "limit-datasets", num_args = 1.., value_name = "NAME")]
    pub limit_datasets: Option<Vec<String>>,

    /// Total probe budget (the final total stays strictly below it).
    #[arg(short = 'n', long = "max-probe-count", default_value_t = 90_000)]
    pub max_probe_count: u64,

    /// Write the chosen parameters here (`<dataset>\t(<m>, <ce>)` per line).
    #[arg(short = 'o', long = "output-params", value_name = "FILE")]
    pub output_params: Option<PathBuf>,

    /// Recount the final total by direct grid lookup and require it to match.
    #[arg(long)]
    pub verify_without_interp: bool,

    /// Which decrement wins when refinement candidates tie on loss.
    #[arg(long = "tie-break", value_enum, default_value_t = ScanOrder::DatasetMajor)]
    pub tie_break: ScanOrder,

    /// Export the whole run (passes, solutions, refinement) to JSON.
    #[arg(long = "export-json", value_name = "JSON")]
    pub export_json: Option<PathBuf>,

    /// Barrier weight of the first annealing pass.
    #[arg(long, default_value_t = 10.0)]
    pub initial_eps: f64,

    /// Factor applied to the barrier weight after each pass.
    #[arg(long, default_value_t = 0.1)]
    pub eps_decay: f64,

    /// Last barrier weight to run a pass with.
    #[arg(long, default_value_t = 0.01)]
    pub min_eps: f64,

    /// Evaluation cap of each annealing pass.
    #[arg(long, default_value_t = 2500)]
    pub max_evaluations: usize,

    /// Finite-difference step (also the margin below each upper bound).
    #[arg(long, default_value_t = 0.001)]
    pub step_size: f64,

    /// Seed mismatches applied to every dataset.
    #[arg(long, default_value_t = 5.0)]
    pub seed_mismatches: f64,

    /// Seed cover_extension applied to every dataset.
    #[arg(long, default_value_t = 30.0)]
    pub seed_cover_extension: f64,

    /// Loss offset for parameter vectors at or over the budget.
    #[arg(long, default_value_t = crate::optimize::INFEASIBLE_OFFSET)]
    pub infeasible_offset: f64,
}

/// Options for `check`.
#[derive(Debug, Args, Clone)]
pub struct CheckArgs {
    #[command(flatten)]
    pub source: GridArgs,

    /// Parameter file to check.
    #[arg(short = 'p', long, value_name = "FILE")]
    pub params: PathBuf,

    /// Budget to compare against.
    #[arg(short = 'n', long = "max-probe-count", default_value_t = 90_000)]
    pub max_probe_count: u64,
}

/// Options for `interp`.
#[derive(Debug, Args, Clone)]
pub struct InterpArgs {
    #[command(flatten)]
    pub source: GridArgs,

    #[arg(long)]
    pub dataset: String,

    #[arg(long, allow_negative_numbers = true)]
    pub mismatches: f64,

    #[arg(long, allow_negative_numbers = true)]
    pub cover_extension: f64,
}

/// Options for commands working on one dataset's grid.
#[derive(Debug, Args, Clone)]
pub struct DatasetArgs {
    #[command(flatten)]
    pub source: GridArgs,

    #[arg(long)]
    pub dataset: String,
}

/// Options for `plot`.
#[derive(Debug, Args, Clone)]
pub struct PlotArgs {
    #[command(flatten)]
    pub target: DatasetArgs,

    /// Highlight the pair chosen for this dataset in a parameter file.
    #[arg(short = 'p', long, value_name = "FILE")]
    pub params: Option<PathBuf>,

    /// Plot width (columns).
    #[arg(long, default_value_t = 80)]
    pub width: usize,

    /// Plot height (rows).
    #[arg(long, default_value_t = 20)]
    pub height: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn optimize_defaults_match_documented_values() {
        let cli = Cli::parse_from(["probe-budget", "optimize", "-i", "results"]);
        let Command::Optimize(args) = cli.command else {
            panic!("expected optimize");
        };
        assert_eq!(args.max_probe_count, 90_000);
        assert_eq!(args.tie_break, ScanOrder::DatasetMajor);
        assert_eq!(args.source.results_dir, Some(PathBuf::from("results")));
        assert!(args.limit_datasets.is_none());
        assert!(!args.verify_without_interp);
    }

    #[test]
    fn grid_sources_are_mutually_exclusive() {
        let res = Cli::try_parse_from(["probe-budget", "optimize", "-i", "r", "--grid", "g.tsv"]);
        assert!(res.is_err());
        let res = Cli::try_parse_from(["probe-budget", "optimize"]);
        assert!(res.is_err());
    }

    #[test]
    fn limit_datasets_takes_several_names() {
        let cli = Cli::parse_from([
            "probe-budget", "optimize", "--grid", "g.tsv", "-d", "ebola", "lassa", "-n", "5000",
        ]);
        let Command::Optimize(args) = cli.command else {
            panic!("expected optimize");
        };
        assert_eq!(args.limit_datasets, Some(vec!["ebola".to_string(), "lassa".to_string()]));
        assert_eq!(args.max_probe_count, 5000);
    }
}
