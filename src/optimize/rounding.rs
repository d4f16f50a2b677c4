//! Snapping a continuous solution to grid resolution, then greedy refinement.
//!
//! Rounding prefers rounding *up*: larger parameters generally mean fewer
//! probes, so rounding up keeps the total under the budget. A component only
//! rounds down when it is already within a small tolerance of the lower grid
//! value, which is where the continuous optimizer tends to park just above a
//! measured value.
//!
//! Refinement then repeatedly applies the single one-step decrement with the
//! lowest loss that keeps the total under the budget, until none improves.
//! Decrements may leave the search box as long as the result stays at or above
//! zero and the grid still encloses it.

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::domain::{Axis, ParameterVector, ScanOrder, Solution};
use crate::error::OptError;
use crate::optimize::objective::Objective;

/// Distance below which a mismatches value rounds down.
pub const MISMATCHES_ROUND_TOLERANCE: f64 = 0.01;

/// Distance below which a cover_extension value rounds down.
pub const COVER_EXTENSION_ROUND_TOLERANCE: f64 = 0.1;

fn round_tolerance(axis: Axis) -> f64 {
    match axis {
        Axis::Mismatches => MISMATCHES_ROUND_TOLERANCE,
        Axis::CoverExtension => COVER_EXTENSION_ROUND_TOLERANCE,
    }
}

/// Round one value onto the grid of `axis`.
pub fn round_component(value: f64, axis: Axis) -> f64 {
    let step = axis.step() as f64;
    let down = (value / step).floor() * step;
    if value - down < round_tolerance(axis) {
        down
    } else {
        (value / step).ceil() * step
    }
}

/// Round every component of `x` onto its axis grid.
pub fn round_params(x: &ParameterVector) -> ParameterVector {
    let pairs: Vec<(f64, f64)> = (0..x.dataset_count())
        .map(|idx| {
            let (m, ce) = x.pair(idx);
            (
                round_component(m, Axis::Mismatches),
                round_component(ce, Axis::CoverExtension),
            )
        })
        .collect();
    ParameterVector::from_pairs(&pairs)
}

/// Round `continuous` and require the result to stay under the budget.
///
/// An infeasible rounding means some dataset's count rose when parameters went
/// up; the error names the dataset whose count grew the most.
pub fn round_feasible(
    objective: &mut Objective<'_>,
    continuous: &ParameterVector,
) -> Result<Solution, OptError> {
    let rounded = round_params(continuous);
    let (loss, total) = objective.evaluate(&rounded, 0.0)?;
    if total < objective.budget() as f64 {
        info!(total, "rounded parameters are feasible");
        return Ok(Solution {
            params: rounded,
            loss,
            total_probes: total,
        });
    }

    let order = objective.interpolator().order();
    let mut worst: Option<(usize, f64)> = None;
    for (idx, _) in order.iter() {
        let (m0, ce0) = continuous.pair(idx);
        let (m1, ce1) = rounded.pair(idx);
        let before = objective.interpolator_mut().probe_count_at(idx, m0, ce0)?;
        let after = objective.interpolator_mut().probe_count_at(idx, m1, ce1)?;
        let growth = after - before;
        if worst.is_none_or(|(_, g)| growth > g) {
            worst = Some((idx, growth));
        }
    }
    let idx = worst.map_or(0, |(idx, _)| idx);
    let pair = rounded.to_param_pairs()[idx];
    Err(OptError::MonotonicityViolation {
        dataset: order.name(idx).to_string(),
        mismatches: pair.mismatches,
        cover_extension: pair.cover_extension,
        total,
        budget: objective.budget(),
    })
}

/// One applied decrement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RefineStep {
    pub dataset: String,
    pub axis: String,
    pub from: i64,
    pub to: i64,
    pub loss: f64,
    pub total: f64,
}

#[derive(Debug, Clone)]
pub struct RefineOutcome {
    pub solution: Solution,
    pub steps: Vec<RefineStep>,
}

/// Greedy descent over single-step decrements of a feasible rounded vector.
pub fn refine(
    objective: &mut Objective<'_>,
    scan_order: ScanOrder,
    start: Solution,
) -> Result<RefineOutcome, OptError> {
    let order = objective.interpolator().order();
    let components = scan_order.components(order);
    let budget = objective.budget() as f64;

    let mut current = start;
    let mut steps = Vec::new();
    loop {
        let mut best: Option<(usize, ParameterVector, f64, f64)> = None;
        for &c in &components {
            let (idx, axis) = order.locate_component(c);
            let value = current.params.component(c);
            let lowered = value - axis.step() as f64;
            if lowered < 0.0 {
                continue;
            }

            let mut candidate = current.params.clone();
            candidate.set_component(c, lowered);
            let (loss, total) = match objective.evaluate(&candidate, 0.0) {
                Ok(v) => v,
                Err(OptError::OutOfRange { .. } | OptError::NoBoundingBox { .. }) => {
                    debug!(dataset = order.name(idx), axis = axis.name(), "decrement leaves the measured grid");
                    continue;
                }
                Err(e) => return Err(e),
            };
            if total >= budget {
                continue;
            }
            let to_beat = best.as_ref().map_or(current.loss, |b| b.2);
            if loss < to_beat {
                debug!(dataset = order.name(idx), axis = axis.name(), loss, total, "candidate decrement");
                best = Some((c, candidate, loss, total));
            }
        }

        let Some((c, params, loss, total)) = best else {
            break;
        };
        let (idx, axis) = order.locate_component(c);
        steps.push(RefineStep {
            dataset: order.name(idx).to_string(),
            axis: axis.name().to_string(),
            from: current.params.component(c).round() as i64,
            to: params.component(c).round() as i64,
            loss,
            total,
        });
        current = Solution {
            params,
            loss,
            total_probes: total,
        };
    }

    info!(
        decrements = steps.len(),
        total = current.total_probes,
        loss = current.loss,
        "refinement finished"
    );
    Ok(RefineOutcome {
        solution: current,
        steps,
    })
}
