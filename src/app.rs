//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - parses CLI arguments and sets up logging
//! - loads the grid store
//! - runs the optimizer or one of the grid inspection commands
//! - prints reports and writes optional outputs

use clap::Parser;
use tracing::info;

use crate::cli::{CheckArgs, Command, DatasetArgs, GridArgs, InterpArgs, OptimizeArgs, PlotArgs};
use crate::domain::{AnnealSchedule, GridSource, OptimizeConfig};
use crate::error::AppError;

pub mod pipeline;

/// Entry point for the `probe-budget` binary.
pub fn run() -> Result<(), AppError> {
    // `probe-budget -i DIR ...` behaves like `probe-budget optimize -i DIR ...`.
    //
    // Clap requires a subcommand name, so we rewrite argv before parsing.
    let argv = rewrite_args(std::env::args().collect());
    let cli = crate::cli::Cli::parse_from(argv);
    crate::logging::init_tracing(cli.verbose);

    match cli.command {
        Command::Optimize(args) => handle_optimize(args),
        Command::Check(args) => handle_check(args),
        Command::Interp(args) => handle_interp(args),
        Command::Matrix(args) => handle_matrix(args),
        Command::Plot(args) => handle_plot(args),
    }
}

fn handle_optimize(args: OptimizeArgs) -> Result<(), AppError> {
    let config = optimize_config_from_args(&args)?;
    let out = pipeline::run_optimize(&config)?;
    let run = &out.run;

    println!("{}", crate::report::format_run_summary(run, &out.order, &config));
    println!("{}", crate::report::format_continuous(&out.order, &run.continuous));
    println!("{}", crate::report::format_refine_steps(&run.refine_steps));
    print!(
        "{}",
        crate::report::format_rounded(&out.choices, &run.best, run.direct_total)
    );

    // Optional outputs.
    if let Some(path) = &config.output_params {
        crate::io::params::write_params_file(path, &out.choices)?;
        info!(path = %path.display(), "wrote parameter file");
    }
    if let Some(path) = &config.export_json {
        let export = crate::io::export::RunExport::from_run(
            run,
            &out.order,
            config.max_probe_count,
            config.scan_order,
            &config.schedule,
        );
        crate::io::export::write_run_json(path, &export)?;
        info!(path = %path.display(), "wrote run export");
    }

    Ok(())
}

fn handle_check(args: CheckArgs) -> Result<(), AppError> {
    let source = grid_source(&args.source)?;
    let choices = crate::io::params::read_params_file(&args.params)?;
    let store = pipeline::load_store(&source, None)?;
    let outcome = pipeline::check_choices(&store, &choices)?;

    print!(
        "{}",
        crate::report::format_check(
            &outcome.choices,
            outcome.interpolated,
            outcome.direct,
            args.max_probe_count
        )
    );
    Ok(())
}

fn handle_interp(args: InterpArgs) -> Result<(), AppError> {
    let source = grid_source(&args.source)?;
    let names = [args.dataset.clone()];
    let store = pipeline::load_store(&source, Some(&names))?;
    let order = store.order();
    let mut interp = crate::grid::Interpolator::new(&store, &order)?;

    let count = interp.probe_count(&args.dataset, args.mismatches, args.cover_extension)?;
    println!("{count:.3}");
    Ok(())
}

fn handle_matrix(args: DatasetArgs) -> Result<(), AppError> {
    let source = grid_source(&args.source)?;
    let store = pipeline::load_store(&source, None)?;
    let grid = store.dataset(&args.dataset)?;

    print!("{}", crate::report::format_matrix(grid));
    Ok(())
}

fn handle_plot(args: PlotArgs) -> Result<(), AppError> {
    let source = grid_source(&args.target.source)?;
    let store = pipeline::load_store(&source, None)?;
    let dataset = &args.target.dataset;
    let grid = store.dataset(dataset)?;

    let highlight = match &args.params {
        Some(path) => crate::io::params::read_params_file(path)?
            .into_iter()
            .find(|c| &c.dataset == dataset)
            .map(|c| c.params),
        None => None,
    };

    let plot = crate::plot::render_grid_plot(dataset, grid, highlight, args.width, args.height);
    print!("{plot}");
    Ok(())
}

fn grid_source(args: &GridArgs) -> Result<GridSource, AppError> {
    match (&args.results_dir, &args.grid) {
        (Some(dir), None) => Ok(GridSource::ResultsDir(dir.clone())),
        (None, Some(table)) => Ok(GridSource::Table(table.clone())),
        _ => Err(AppError::new(
            2,
            "Give exactly one of --results-dir or --grid.",
        )),
    }
}

pub fn optimize_config_from_args(args: &OptimizeArgs) -> Result<OptimizeConfig, AppError> {
    Ok(OptimizeConfig {
        source: grid_source(&args.source)?,
        limit_datasets: args.limit_datasets.clone(),
        max_probe_count: args.max_probe_count,
        output_params: args.output_params.clone(),
        export_json: args.export_json.clone(),
        verify_without_interp: args.verify_without_interp,
        scan_order: args.tie_break,
        schedule: AnnealSchedule {
            initial_eps: args.initial_eps,
            eps_decay: args.eps_decay,
            min_eps: args.min_eps,
            max_evaluations: args.max_evaluations,
            step_size: args.step_size,
        },
        initial_guess: (args.seed_mismatches, args.seed_cover_extension),
        infeasible_offset: args.infeasible_offset,
    })
}

/// Rewrite argv so bare flags default to `optimize`.
///
/// Rules:
/// - `probe-budget -i DIR ...`          -> `probe-budget optimize -i DIR ...`
/// - `probe-budget --help/--version/-h` -> unchanged (show top-level help/version)
/// - `probe-budget <subcommand> ...`    -> unchanged
fn rewrite_args(mut argv: Vec<String>) -> Vec<String> {
    let Some(arg1) = argv.get(1).cloned() else {
        return argv;
    };

    let is_top_level_help_or_version = matches!(
        arg1.as_str(),
        "-h" | "--help" | "-V" | "--version" | "help"
    );
    if is_top_level_help_or_version {
        return argv;
    }

    let is_subcommand = matches!(
        arg1.as_str(),
        "optimize" | "check" | "interp" | "matrix" | "plot"
    );
    if is_subcommand {
        return argv;
    }

    // If the first token is a flag, treat it as "optimize flags".
    if arg1.starts_with('-') {
        argv.insert(1, "optimize".to_string());
        return argv;
    }

    argv
}

#[cfg(test)]
mod tests {
    use super::*;

    fn argv(args: &[&str]) -> Vec<String> {
        args.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn bare_flags_default_to_optimize() {
        assert_eq!(
            rewrite_args(argv(&["probe-budget", "-i", "results", "-n", "500"])),
            argv(&["probe-budget", "optimize", "-i", "results", "-n", "500"])
        );
    }

    #[test]
    fn subcommands_and_help_pass_through() {
        for args in [
            &["probe-budget", "matrix", "--grid", "g.tsv", "--dataset", "a"][..],
            &["probe-budget", "--help"][..],
            &["probe-budget"][..],
        ] {
            assert_eq!(rewrite_args(argv(args)), argv(args));
        }
    }

    #[test]
    fn args_become_config() {
        let cli = crate::cli::Cli::parse_from(["probe-budget", "optimize", "--grid", "g.tsv", "--eps-decay", "0.5"]);
        let Command::Optimize(args) = cli.command else {
            panic!("expected optimize");
        };
        let config = optimize_config_from_args(&args).unwrap();
        assert_eq!(config.source, GridSource::Table("g.tsv".into()));
        assert_eq!(config.schedule.eps_decay, 0.5);
        assert_eq!(config.initial_guess, (5.0, 30.0));
        assert_eq!(config.max_probe_count, 90_000);
    }
}
