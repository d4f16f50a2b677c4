//! Search space: per-component bounds and the seed vector.

use nalgebra::DVector;
use tracing::info;

use crate::domain::{Axis, DatasetOrder, ParamPair, ParameterVector};
use crate::error::OptError;
use crate::grid::{DatasetGrid, GridStore};
use crate::math::project;
use crate::optimize::objective::Objective;

/// Box constraints for a flat parameter vector.
#[derive(Debug, Clone, PartialEq)]
pub struct ParamBounds {
    pub lower: DVector<f64>,
    pub upper: DVector<f64>,
}

impl ParamBounds {
    pub fn clamp(&self, x: &ParameterVector) -> ParameterVector {
        ParameterVector::from_vector(project(x.as_vector(), &self.lower, &self.upper))
    }
}

/// Bounds for one dataset: `(m_lo, m_hi, ce_lo, ce_hi)` before the step margin.
///
/// Cover extension spans the full observed range. Mismatches is limited to
/// values measured at both the lowest and the highest cover extension, which
/// guarantees the outer rectangle of the search box is fully measured and every
/// query inside it has a bounding box.
fn dataset_bounds(name: &str, grid: &DatasetGrid) -> Result<(i64, i64, i64, i64), OptError> {
    let extent = grid.extent().ok_or_else(|| OptError::InvalidBounds {
        dataset: name.to_string(),
        detail: "no measurements".to_string(),
    })?;
    let ce_lo = extent.cover_extension_min;
    let ce_hi = extent.cover_extension_max;

    let spanning: Vec<i64> = grid
        .mismatches_values()
        .into_iter()
        .filter(|&m| {
            grid.contains(&ParamPair::new(m, ce_lo))
                && grid.contains(&ParamPair::new(m, ce_hi))
        })
        .collect();
    let (Some(&m_lo), Some(&m_hi)) = (spanning.first(), spanning.last()) else {
        return Err(OptError::InvalidBounds {
            dataset: name.to_string(),
            detail: format!(
                "no mismatches value is measured at both cover_extension {ce_lo} and {ce_hi}"
            ),
        });
    };
    Ok((m_lo, m_hi, ce_lo, ce_hi))
}

/// Per-component bounds for every dataset in `order`.
///
/// Upper bounds are pulled in by `step` so a forward-difference probe from
/// the bound still lands on measured territory.
pub fn param_bounds(
    store: &GridStore,
    order: &DatasetOrder,
    step: f64,
) -> Result<ParamBounds, OptError> {
    let mut lower = DVector::zeros(order.dim());
    let mut upper = DVector::zeros(order.dim());
    for (idx, name) in order.iter() {
        let (m_lo, m_hi, ce_lo, ce_hi) = dataset_bounds(name, store.dataset(name)?)?;
        let m = order.component(idx, Axis::Mismatches);
        let ce = order.component(idx, Axis::CoverExtension);
        lower[m] = m_lo as f64;
        upper[m] = (m_hi as f64 - step).max(m_lo as f64);
        lower[ce] = ce_lo as f64;
        upper[ce] = (ce_hi as f64 - step).max(ce_lo as f64);
    }
    Ok(ParamBounds { lower, upper })
}

/// The heuristic seed, clamped into `bounds` and checked against the budget.
pub fn initial_guess(
    objective: &mut Objective<'_>,
    bounds: &ParamBounds,
    seed: (f64, f64),
) -> Result<ParameterVector, OptError> {
    let order = objective.interpolator().order();
    let x0 = bounds.clamp(&ParameterVector::uniform(order, seed.0, seed.1));
    let count = objective.total(&x0)?;
    if count >= objective.budget() as f64 {
        return Err(OptError::InfeasibleSeed {
            count,
            budget: objective.budget(),
        });
    }
    info!(count, budget = objective.budget(), "initial guess is feasible");
    Ok(x0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::Interpolator;

    fn scenario_store() -> GridStore {
        let mut store = GridStore::new();
        store.insert_point("a", ParamPair::new(0, 0), 100);
        store.insert_point("a", ParamPair::new(5, 0), 40);
        store.insert_point("a", ParamPair::new(0, 30), 80);
        store.insert_point("a", ParamPair::new(5, 30), 20);
        store.insert_point("b", ParamPair::new(0, 0), 10);
        store
    }

    #[test]
    fn bounds_shrink_upper_by_step_and_pin_constant_datasets() {
        let store = scenario_store();
        let order = store.order();
        let b = param_bounds(&store, &order, 0.001).unwrap();
        assert_eq!(b.lower.as_slice(), &[0.0, 0.0, 0.0, 0.0]);
        assert!((b.upper[0] - 4.999).abs() < 1e-12);
        assert!((b.upper[1] - 29.999).abs() < 1e-12);
        assert_eq!(b.upper[2], 0.0);
        assert_eq!(b.upper[3], 0.0);
    }

    #[test]
    fn mismatch_bounds_require_both_cover_extension_extremes() {
        let mut store = GridStore::new();
        for (m, ce) in [(0, 0), (0, 40), (1, 0), (1, 40), (3, 0), (3, 20), (6, 40)] {
            store.insert_point("ebola", ParamPair::new(m, ce), 1);
        }
        let order = store.order();
        let b = param_bounds(&store, &order, 0.001).unwrap();
        assert_eq!(b.lower[0], 0.0);
        assert!((b.upper[0] - 0.999).abs() < 1e-12);
        assert!((b.upper[1] - 39.999).abs() < 1e-12);
    }

    #[test]
    fn bounds_fail_without_spanning_mismatches() {
        let mut store = GridStore::new();
        store.insert_point("sars", ParamPair::new(0, 0), 5);
        store.insert_point("sars", ParamPair::new(1, 10), 4);
        let order = store.order();
        let err = param_bounds(&store, &order, 0.001).unwrap_err();
        assert!(matches!(err, OptError::InvalidBounds { ref dataset, .. } if dataset == "sars"));
    }

    #[test]
    fn seed_at_or_above_budget_is_rejected() {
        let store = scenario_store();
        let order = store.order();
        let bounds = param_bounds(&store, &order, 0.001).unwrap();
        let interp = Interpolator::new(&store, &order).unwrap();
        let mut objective = Objective::new(interp, 30);

        let err = initial_guess(&mut objective, &bounds, (5.0, 30.0)).unwrap_err();
        match err {
            OptError::InfeasibleSeed { count, budget } => {
                assert_eq!(budget, 30);
                assert!(count >= 30.0 && count < 30.1, "count={count}");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn feasible_seed_is_clamped_into_bounds() {
        let store = scenario_store();
        let order = store.order();
        let bounds = param_bounds(&store, &order, 0.001).unwrap();
        let interp = Interpolator::new(&store, &order).unwrap();
        let mut objective = Objective::new(interp, 140);

        let x0 = initial_guess(&mut objective, &bounds, (5.0, 30.0)).unwrap();
        assert!((x0.pair(0).0 - 4.999).abs() < 1e-12);
        assert_eq!(x0.pair(1), (0.0, 0.0));
    }
}
