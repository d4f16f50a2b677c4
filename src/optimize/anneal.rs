//! Barrier annealing: repeated bounded minimization with a shrinking barrier weight.
//!
//! Each pass minimizes the loss for the current `ε` starting from the previous
//! pass's solution, then `ε` is multiplied by the decay factor. A large `ε`
//! keeps early passes well inside the budget; small `ε` lets later passes
//! approach it.

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::domain::{AnnealSchedule, ParameterVector, Solution};
use crate::error::{AppError, OptError};
use crate::math::{MinimizeOptions, MinimizeStatus, minimize_bounded};
use crate::optimize::objective::Objective;
use crate::optimize::space::ParamBounds;

/// Diagnostics of a single annealing pass.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnnealPass {
    pub eps: f64,
    pub start_total: f64,
    pub loss: f64,
    pub total: f64,
    pub evaluations: usize,
    pub iterations: usize,
    pub status: MinimizeStatus,
}

/// Result of the continuous phase.
#[derive(Debug, Clone)]
pub struct AnnealOutcome {
    pub solution: Solution,
    pub passes: Vec<AnnealPass>,
}

/// Check a schedule before running it.
pub fn validate_schedule(schedule: &AnnealSchedule) -> Result<(), AppError> {
    if !(schedule.initial_eps.is_finite() && schedule.initial_eps > 0.0) {
        return Err(AppError::new(2, "Initial barrier weight must be finite and > 0."));
    }
    if !(schedule.eps_decay > 0.0 && schedule.eps_decay < 1.0) {
        return Err(AppError::new(2, "Barrier decay must lie strictly between 0 and 1."));
    }
    if !(schedule.min_eps.is_finite() && schedule.min_eps > 0.0) {
        return Err(AppError::new(2, "Minimum barrier weight must be finite and > 0."));
    }
    if !(schedule.step_size.is_finite() && schedule.step_size > 0.0 && schedule.step_size < 1.0) {
        return Err(AppError::new(2, "Step size must lie strictly between 0 and 1."));
    }
    if schedule.max_evaluations == 0 {
        return Err(AppError::new(2, "Evaluation cap must be >= 1."));
    }
    Ok(())
}

/// Run the annealing schedule from a feasible `x0`.
///
/// A pass that stops without converging is logged and the next pass starts
/// from wherever it ended. Interpolation errors abort the whole run.
pub fn anneal(
    objective: &mut Objective<'_>,
    bounds: &ParamBounds,
    x0: ParameterVector,
    schedule: &AnnealSchedule,
) -> Result<AnnealOutcome, OptError> {
    let opts = MinimizeOptions {
        fd_step: schedule.step_size,
        max_evaluations: schedule.max_evaluations,
        ..MinimizeOptions::default()
    };

    let mut x = x0;
    let mut passes = Vec::new();
    let mut eps = schedule.initial_eps;
    while eps >= schedule.min_eps {
        let start_total = objective.total(&x)?;
        info!(eps, start_total, "starting annealing pass");

        let out = minimize_bounded(
            |v| objective.loss_flat(v, eps),
            x.as_vector(),
            &bounds.lower,
            &bounds.upper,
            &opts,
        )?;

        x = ParameterVector::from_vector(out.x);
        let total = objective.total(&x)?;
        if out.status.converged() {
            info!(
                eps,
                loss = out.value,
                total,
                evaluations = out.evaluations,
                "pass converged: {}",
                out.status.describe()
            );
        } else {
            warn!(
                eps,
                loss = out.value,
                total,
                evaluations = out.evaluations,
                "pass failed to converge: {}",
                out.status.describe()
            );
        }

        passes.push(AnnealPass {
            eps,
            start_total,
            loss: out.value,
            total,
            evaluations: out.evaluations,
            iterations: out.iterations,
            status: out.status,
        });
        eps *= schedule.eps_decay;
    }

    let (loss, total) = match passes.last() {
        Some(last) => (last.loss, last.total),
        None => objective.evaluate(&x, 0.0)?,
    };
    Ok(AnnealOutcome {
        solution: Solution {
            params: x,
            loss,
            total_probes: total,
        },
        passes,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ParamPair;
    use crate::grid::{GridStore, Interpolator};
    use crate::optimize::space::{initial_guess, param_bounds};

    fn plane_store() -> GridStore {
        let mut store = GridStore::new();
        store.insert_point("a", ParamPair::new(0, 0), 100);
        store.insert_point("a", ParamPair::new(5, 0), 40);
        store.insert_point("a", ParamPair::new(0, 30), 80);
        store.insert_point("a", ParamPair::new(5, 30), 20);
        store
    }

    #[test]
    fn default_schedule_runs_four_passes_and_stays_feasible() {
        let store = plane_store();
        let order = store.order();
        let schedule = AnnealSchedule::default();
        let bounds = param_bounds(&store, &order, schedule.step_size).unwrap();
        let mut objective = Objective::new(Interpolator::new(&store, &order).unwrap(), 70);
        let x0 = initial_guess(&mut objective, &bounds, (5.0, 30.0)).unwrap();

        let out = anneal(&mut objective, &bounds, x0, &schedule).unwrap();
        let eps: Vec<f64> = out.passes.iter().map(|p| p.eps).collect();
        assert_eq!(eps.len(), 4, "eps schedule: {eps:?}");
        assert!((eps[3] - 0.01).abs() < 1e-12);

        assert!(out.solution.total_probes < 70.0);
        // The constrained optimum lies on 12 m + (2/3) ce = 30, near (1.91, 10.6).
        let (m, ce) = out.solution.params.pair(0);
        assert!((m - 1.91).abs() < 0.1, "m={m}");
        assert!((ce - 10.6).abs() < 1.0, "ce={ce}");
    }

    #[test]
    fn unconverged_passes_do_not_stop_the_schedule() {
        let store = plane_store();
        let order = store.order();
        let schedule = AnnealSchedule {
            max_evaluations: 3,
            ..AnnealSchedule::default()
        };
        let bounds = param_bounds(&store, &order, schedule.step_size).unwrap();
        let mut objective = Objective::new(Interpolator::new(&store, &order).unwrap(), 70);
        let x0 = initial_guess(&mut objective, &bounds, (5.0, 30.0)).unwrap();

        let out = anneal(&mut objective, &bounds, x0, &schedule).unwrap();
        assert_eq!(out.passes.len(), 4);
        for pass in &out.passes {
            assert!(!pass.status.converged(), "status: {:?}", pass.status);
        }
        assert!(out.solution.total_probes < 70.0);
        assert_eq!(out.solution.loss, out.passes[3].loss);
    }

    #[test]
    fn schedule_validation_rejects_bad_decay() {
        let schedule = AnnealSchedule {
            eps_decay: 1.5,
            ..AnnealSchedule::default()
        };
        assert_eq!(validate_schedule(&schedule).unwrap_err().exit_code(), 2);
        assert!(validate_schedule(&AnnealSchedule::default()).is_ok());
    }
}
