//! Shared pipeline logic used by the CLI subcommands.
//!
//! Keeping this in one place avoids duplicating the core workflow:
//! grid ingest -> dataset selection -> optimization -> parameter choices
//!
//! The subcommands can then focus on presentation and file output.

use tracing::{info, warn};

use crate::domain::{DatasetOrder, GridSource, OptimizeConfig, ParamChoice, ParameterVector, param_choices};
use crate::error::{AppError, OptError};
use crate::grid::{GridStore, Interpolator};
use crate::io::ingest::load_grid;
use crate::optimize::{OptimizationRun, optimize, validate_schedule};

/// All computed outputs of a single `optimize` run.
#[derive(Debug, Clone)]
pub struct RunOutput {
    pub order: DatasetOrder,
    pub run: OptimizationRun,
    pub choices: Vec<ParamChoice>,
}

/// Totals of a parameter file evaluated against a grid.
#[derive(Debug, Clone, PartialEq)]
pub struct CheckOutcome {
    pub choices: Vec<ParamChoice>,
    pub interpolated: f64,
    /// `None` when some chosen pair was never measured.
    pub direct: Option<u64>,
}

/// Load the grid store and keep only the requested datasets.
pub fn load_store(source: &GridSource, limit: Option<&[String]>) -> Result<GridStore, AppError> {
    let ingested = load_grid(source)?;
    for entry in &ingested.skipped {
        info!(entry = %entry, "skipped entry without probe counts");
    }
    let mut store = ingested.store;
    if let Some(names) = limit {
        store = store.restrict(names)?;
    }
    if store.is_empty() {
        return Err(OptError::EmptyStore.into());
    }
    Ok(store)
}

fn validate_config(config: &OptimizeConfig) -> Result<(), AppError> {
    if config.max_probe_count == 0 {
        return Err(AppError::new(2, "Max probe count must be >= 1."));
    }
    let (m, ce) = config.initial_guess;
    if !(m.is_finite() && ce.is_finite() && m >= 0.0 && ce >= 0.0) {
        return Err(AppError::new(2, "Seed parameters must be finite and >= 0."));
    }
    if !(config.infeasible_offset.is_finite() && config.infeasible_offset > 0.0) {
        return Err(AppError::new(2, "Infeasible offset must be finite and > 0."));
    }
    if let Some(names) = &config.limit_datasets {
        if names.is_empty() {
            return Err(AppError::new(2, "--limit-datasets needs at least one name."));
        }
    }
    validate_schedule(&config.schedule)
}

/// Execute the full optimization pipeline and return the computed outputs.
pub fn run_optimize(config: &OptimizeConfig) -> Result<RunOutput, AppError> {
    // 1) Validate before touching the filesystem.
    validate_config(config)?;

    // 2) Build the grid store.
    let store = load_store(&config.source, config.limit_datasets.as_deref())?;
    let order = store.order();
    info!(datasets = order.len(), budget = config.max_probe_count, "optimizing");

    // 3) Optimize.
    let run = optimize(&store, &order, config)?;
    let choices = param_choices(&order, &run.best.params);

    Ok(RunOutput {
        order,
        run,
        choices,
    })
}

/// Evaluate a set of choices: interpolated total, and direct total when every
/// pair was measured.
pub fn check_choices(store: &GridStore, choices: &[ParamChoice]) -> Result<CheckOutcome, AppError> {
    if choices.is_empty() {
        return Err(AppError::new(2, "Parameter file lists no datasets."));
    }
    let order = DatasetOrder::new(choices.iter().map(|c| c.dataset.clone()));
    if order.len() != choices.len() {
        return Err(AppError::new(2, "Parameter file lists a dataset more than once."));
    }

    let mut pairs = vec![(0.0, 0.0); order.len()];
    for c in choices {
        let idx = order
            .index_of(&c.dataset)
            .ok_or_else(|| OptError::UnknownDataset(c.dataset.clone()))?;
        pairs[idx] = (c.params.mismatches as f64, c.params.cover_extension as f64);
    }
    let x = ParameterVector::from_pairs(&pairs);

    let mut interp = Interpolator::new(store, &order)?;
    let interpolated = interp.total(&x)?;
    let direct = match interp.direct_total(&x) {
        Ok(d) => Some(d),
        Err(OptError::MissingMeasurement { dataset, mismatches, cover_extension }) => {
            warn!(%dataset, mismatches, cover_extension, "pair was not measured; direct total unavailable");
            None
        }
        Err(e) => return Err(e.into()),
    };

    Ok(CheckOutcome {
        choices: param_choices(&order, &x),
        interpolated,
        direct,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ParamPair;

    fn store() -> GridStore {
        let mut store = GridStore::new();
        for (m, ce, c) in [(0, 0, 100), (5, 0, 40), (0, 30, 80), (5, 30, 20)] {
            store.insert_point("a", ParamPair::new(m, ce), c);
        }
        store.insert_point("b", ParamPair::new(0, 0), 10);
        store
    }

    fn choice(name: &str, m: i64, ce: i64) -> ParamChoice {
        ParamChoice {
            dataset: name.to_string(),
            params: ParamPair::new(m, ce),
        }
    }

    #[test]
    fn check_reports_both_totals_when_measured() {
        let out = check_choices(&store(), &[choice("b", 0, 0), choice("a", 5, 30)]).unwrap();
        assert_eq!(out.interpolated, 30.0);
        assert_eq!(out.direct, Some(30));
        assert_eq!(out.choices[0].dataset, "a");
    }

    #[test]
    fn check_without_measurement_has_no_direct_total() {
        let out = check_choices(&store(), &[choice("a", 2, 10), choice("b", 0, 0)]).unwrap();
        assert!(out.direct.is_none());
        assert!(out.interpolated > 10.0);
    }

    #[test]
    fn check_rejects_unknown_datasets() {
        let err = check_choices(&store(), &[choice("zika", 0, 0)]).unwrap_err();
        assert_eq!(err.exit_code(), 2);
    }
}
