//! Probe-budget optimization over a grid store.
//!
//! The run proceeds in fixed stages:
//!
//! - search bounds and a validated seed (`space`)
//! - barrier annealing in continuous space (`anneal`, over `objective`)
//! - rounding to grid resolution and greedy refinement (`rounding`)
//! - an optional check of the final total against direct grid lookups

pub mod anneal;
pub mod objective;
pub mod rounding;
pub mod space;

use tracing::info;

use crate::domain::{DatasetOrder, OptimizeConfig, ParameterVector, Solution};
use crate::error::OptError;
use crate::grid::{GridStore, Interpolator};

pub use anneal::{AnnealOutcome, AnnealPass, anneal, validate_schedule};
pub use objective::{INFEASIBLE_OFFSET, Objective, barrier, parameter_cost};
pub use rounding::{RefineOutcome, RefineStep, refine, round_feasible, round_params};
pub use space::{ParamBounds, initial_guess, param_bounds};

/// Tolerance when comparing interpolated and directly counted totals.
pub const CONSISTENCY_TOLERANCE: f64 = 1e-6;

/// Everything computed by one optimization run.
#[derive(Debug, Clone)]
pub struct OptimizationRun {
    pub bounds: ParamBounds,
    pub seed: ParameterVector,
    pub seed_total: f64,
    pub passes: Vec<AnnealPass>,
    pub continuous: Solution,
    pub rounded: Solution,
    pub refine_steps: Vec<RefineStep>,
    pub best: Solution,
    /// Direct (non-interpolated) total of `best`, when verification was requested.
    pub direct_total: Option<u64>,
    pub cache_hits: u64,
    pub cache_misses: u64,
}

/// Optimize parameters for the datasets of `order` under `config.max_probe_count`.
pub fn optimize(
    store: &GridStore,
    order: &DatasetOrder,
    config: &OptimizeConfig,
) -> Result<OptimizationRun, OptError> {
    let schedule = &config.schedule;
    let bounds = param_bounds(store, order, schedule.step_size)?;
    let interp = Interpolator::new(store, order)?;
    let mut objective =
        Objective::new(interp, config.max_probe_count).with_infeasible_offset(config.infeasible_offset);

    let seed = initial_guess(&mut objective, &bounds, config.initial_guess)?;
    let seed_total = objective.total(&seed)?;

    let AnnealOutcome {
        solution: continuous,
        passes,
    } = anneal(&mut objective, &bounds, seed.clone(), schedule)?;

    let rounded = round_feasible(&mut objective, &continuous.params)?;
    let RefineOutcome {
        solution: best,
        steps: refine_steps,
    } = refine(&mut objective, config.scan_order, rounded.clone())?;

    let direct_total = if config.verify_without_interp {
        let direct = objective.interpolator().direct_total(&best.params)?;
        verify_consistency(best.total_probes, direct)?;
        info!(direct, "interpolated total matches direct lookup");
        Some(direct)
    } else {
        None
    };

    let cache = objective.interpolator().cache();
    Ok(OptimizationRun {
        bounds,
        seed,
        seed_total,
        passes,
        continuous,
        rounded,
        refine_steps,
        best,
        direct_total,
        cache_hits: cache.hits(),
        cache_misses: cache.misses(),
    })
}

/// Require an interpolated total to equal a directly counted one.
pub fn verify_consistency(interpolated: f64, direct: u64) -> Result<(), OptError> {
    if (interpolated - direct as f64).abs() < CONSISTENCY_TOLERANCE {
        Ok(())
    } else {
        Err(OptError::ConsistencyMismatch {
            interpolated,
            direct,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{AnnealSchedule, GridSource, ParamPair, ScanOrder};

    fn config(budget: u64) -> OptimizeConfig {
        OptimizeConfig {
            source: GridSource::Table("unused.tsv".into()),
            limit_datasets: None,
            max_probe_count: budget,
            output_params: None,
            export_json: None,
            verify_without_interp: true,
            scan_order: ScanOrder::DatasetMajor,
            schedule: AnnealSchedule::default(),
            initial_guess: (5.0, 30.0),
            infeasible_offset: INFEASIBLE_OFFSET,
        }
    }

    fn two_dataset_store() -> GridStore {
        let mut store = GridStore::new();
        store.insert_point("a", ParamPair::new(0, 0), 100);
        store.insert_point("a", ParamPair::new(5, 0), 40);
        store.insert_point("a", ParamPair::new(0, 30), 80);
        store.insert_point("a", ParamPair::new(5, 30), 20);
        store.insert_point("b", ParamPair::new(0, 0), 10);
        store
    }

    /// `a` measured densely on the plane 100 - 12 m - 0.6 ce; `b` constant 10.
    fn dense_store() -> GridStore {
        let mut store = GridStore::new();
        for m in 0..=5 {
            for ce in [0, 10, 20, 30] {
                let count = 100 - 12 * m - 6 * (ce / 10);
                store.insert_point("a", ParamPair::new(m, ce), count as u64);
            }
        }
        store.insert_point("b", ParamPair::new(0, 0), 10);
        store
    }

    #[test]
    fn full_run_lands_on_measured_feasible_point() {
        let store = dense_store();
        let order = store.order();
        let run = optimize(&store, &order, &config(77)).unwrap();

        assert_eq!(run.passes.len(), 4);
        assert!(run.continuous.total_probes < 77.0);
        assert_eq!(
            run.rounded.params.to_param_pairs(),
            vec![ParamPair::new(3, 20), ParamPair::new(0, 0)]
        );
        assert_eq!(
            run.best.params.to_param_pairs(),
            vec![ParamPair::new(2, 20), ParamPair::new(0, 0)]
        );
        assert_eq!(run.refine_steps.len(), 1);
        assert_eq!(run.best.total_probes, 74.0);
        assert_eq!(run.direct_total, Some(74));
        assert!(run.cache_misses > 0);
    }

    #[test]
    fn seed_over_budget_fails_before_annealing() {
        let store = two_dataset_store();
        let order = store.order();
        let err = optimize(&store, &order, &config(30)).unwrap_err();
        assert!(matches!(err, OptError::InfeasibleSeed { budget: 30, .. }));
    }

    #[test]
    fn consistency_check_flags_interpolated_totals() {
        assert!(verify_consistency(42.0, 42).is_ok());
        let err = verify_consistency(41.5, 42).unwrap_err();
        assert_eq!(err.exit_code(), 6);
    }
}
