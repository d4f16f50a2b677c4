//! Loss over parameter vectors: quadratic parameter cost plus a budget barrier.
//!
//! ```text
//! loss(x) = Σ_d (m_d² + (ce_d / 10)²) + barrier(T(x))
//! ```
//!
//! where `T(x)` is the total interpolated probe count. Below the budget the
//! barrier is `-ε ln(budget - T)`. At or above it the true barrier would be
//! infinite, which leaves a finite-difference gradient with nothing to follow;
//! instead we return a large offset plus `10 ln(T)` so the surface still slopes
//! back toward feasibility.

use nalgebra::DVector;

use crate::domain::ParameterVector;
use crate::error::OptError;
use crate::grid::Interpolator;

/// Offset added to the loss for infeasible vectors.
pub const INFEASIBLE_OFFSET: f64 = 9999.0;

/// Slope of the logarithmic penalty on infeasible totals.
const INFEASIBLE_LOG_WEIGHT: f64 = 10.0;

/// Cover extension is down-weighted by this factor in the parameter cost.
const COVER_EXTENSION_SCALE: f64 = 10.0;

/// Sum of per-dataset costs `m² + (ce/10)²`.
pub fn parameter_cost(x: &ParameterVector) -> f64 {
    (0..x.dataset_count())
        .map(|i| {
            let (m, ce) = x.pair(i);
            m.powi(2) + (ce / COVER_EXTENSION_SCALE).powi(2)
        })
        .sum()
}

/// Barrier term for a total probe count against a budget.
pub fn barrier(total: f64, budget: f64, eps: f64, infeasible_offset: f64) -> f64 {
    if total >= budget {
        infeasible_offset + INFEASIBLE_LOG_WEIGHT * total.max(1.0).ln()
    } else {
        -eps * (budget - total).ln()
    }
}

/// Loss evaluation bound to one run's interpolator and budget.
#[derive(Debug)]
pub struct Objective<'a> {
    interp: Interpolator<'a>,
    budget: u64,
    infeasible_offset: f64,
}

impl<'a> Objective<'a> {
    pub fn new(interp: Interpolator<'a>, budget: u64) -> Self {
        Self {
            interp,
            budget,
            infeasible_offset: INFEASIBLE_OFFSET,
        }
    }

    pub fn with_infeasible_offset(mut self, offset: f64) -> Self {
        self.infeasible_offset = offset;
        self
    }

    pub fn budget(&self) -> u64 {
        self.budget
    }

    pub fn interpolator(&self) -> &Interpolator<'a> {
        &self.interp
    }

    pub fn interpolator_mut(&mut self) -> &mut Interpolator<'a> {
        &mut self.interp
    }

    /// Total interpolated probe count.
    pub fn total(&mut self, x: &ParameterVector) -> Result<f64, OptError> {
        self.interp.total(x)
    }

    /// Loss at `x` with barrier weight `eps`.
    pub fn loss(&mut self, x: &ParameterVector, eps: f64) -> Result<f64, OptError> {
        let total = self.total(x)?;
        Ok(parameter_cost(x) + barrier(total, self.budget as f64, eps, self.infeasible_offset))
    }

    /// Loss and total in one interpolation pass.
    pub fn evaluate(&mut self, x: &ParameterVector, eps: f64) -> Result<(f64, f64), OptError> {
        let total = self.total(x)?;
        let loss = parameter_cost(x) + barrier(total, self.budget as f64, eps, self.infeasible_offset);
        Ok((loss, total))
    }

    /// Loss on a raw flat vector, as handed out by the minimizer.
    pub fn loss_flat(&mut self, x: &DVector<f64>, eps: f64) -> Result<f64, OptError> {
        self.loss(&ParameterVector::from_vector(x.clone()), eps)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ParamPair;
    use crate::grid::GridStore;

    fn plane_store() -> GridStore {
        let mut store = GridStore::new();
        store.insert_point("a", ParamPair::new(0, 0), 100);
        store.insert_point("a", ParamPair::new(5, 0), 40);
        store.insert_point("a", ParamPair::new(0, 30), 80);
        store.insert_point("a", ParamPair::new(5, 30), 20);
        store
    }

    #[test]
    fn parameter_cost_downweights_cover_extension() {
        let x = ParameterVector::from_pairs(&[(3.0, 20.0), (1.0, 0.0)]);
        assert_eq!(parameter_cost(&x), 9.0 + 4.0 + 1.0);
    }

    #[test]
    fn barrier_is_log_inside_and_offset_outside() {
        let inside = barrier(90.0, 100.0, 2.0, INFEASIBLE_OFFSET);
        assert!((inside - (-2.0 * 10.0f64.ln())).abs() < 1e-12);

        let at = barrier(100.0, 100.0, 2.0, INFEASIBLE_OFFSET);
        let beyond = barrier(200.0, 100.0, 2.0, INFEASIBLE_OFFSET);
        assert!(at > INFEASIBLE_OFFSET);
        assert!(beyond > at, "penalty must keep growing past the budget");
    }

    #[test]
    fn barrier_steepens_near_budget() {
        let far = barrier(10.0, 100.0, 1.0, INFEASIBLE_OFFSET);
        let near = barrier(99.0, 100.0, 1.0, INFEASIBLE_OFFSET);
        let nearer = barrier(99.9, 100.0, 1.0, INFEASIBLE_OFFSET);
        assert!(far < near && near < nearer);
    }

    #[test]
    fn loss_combines_cost_and_barrier() {
        let store = plane_store();
        let order = store.order();
        let interp = Interpolator::new(&store, &order).unwrap();
        let mut objective = Objective::new(interp, 70);

        // count(2.5, 15) = 60, so the barrier is -eps ln(10).
        let x = ParameterVector::from_pairs(&[(2.5, 15.0)]);
        let (loss, total) = objective.evaluate(&x, 1.0).unwrap();
        assert_eq!(total, 60.0);
        assert!((loss - (6.25 + 2.25 - 10.0f64.ln())).abs() < 1e-12);
        assert_eq!(objective.loss(&x, 0.0).unwrap(), 8.5);
    }
}
