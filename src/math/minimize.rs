//! Bound-constrained minimization with approximated gradients.
//!
//! The objectives minimized here (interpolated probe counts behind a barrier)
//! are only piecewise smooth, so we never ask for analytic derivatives. We use
//! a spectral projected-gradient method:
//!
//! - gradients by finite differences (central where the lower bound leaves
//!   room, forward otherwise)
//! - search direction `P(x - λ g) - x`, with `P` the projection onto the box
//!   and `λ` the Barzilai–Borwein step from the previous iteration
//! - Armijo backtracking along that direction, which stays inside the box
//!
//! The objective must be evaluable on `[lower, upper + fd_step]` because a
//! forward difference may step just past an upper bound.

use nalgebra::DVector;
use serde::{Deserialize, Serialize};

const ARMIJO: f64 = 1e-4;
const LAMBDA_MIN: f64 = 1e-10;
const LAMBDA_MAX: f64 = 1e10;

/// Tuning knobs for [`minimize_bounded`].
#[derive(Debug, Clone, PartialEq)]
pub struct MinimizeOptions {
    /// Finite-difference step.
    pub fd_step: f64,
    /// Hard cap on objective evaluations (gradient probes included).
    pub max_evaluations: usize,
    /// Stop when the projected gradient's largest component is below this.
    pub gtol: f64,
    /// Stop when an accepted step improves the value by less than this (relative).
    pub ftol: f64,
    /// Stop when an accepted step moves no component by more than this.
    pub xtol: f64,
    /// Halvings tried before a line search is declared failed.
    pub max_backtracks: usize,
}

impl Default for MinimizeOptions {
    fn default() -> Self {
        Self {
            fd_step: 1e-3,
            max_evaluations: 2500,
            gtol: 1e-8,
            ftol: 1e-10,
            xtol: 1e-9,
            max_backtracks: 40,
        }
    }
}

/// Why a minimization stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MinimizeStatus {
    LocalMinimum,
    FunctionConverged,
    StepConverged,
    MaxEvaluations,
    LineSearchFailed,
}

impl MinimizeStatus {
    pub fn converged(self) -> bool {
        matches!(
            self,
            MinimizeStatus::LocalMinimum
                | MinimizeStatus::FunctionConverged
                | MinimizeStatus::StepConverged
        )
    }

    pub fn describe(self) -> &'static str {
        match self {
            MinimizeStatus::LocalMinimum => "local minimum reached",
            MinimizeStatus::FunctionConverged => "function value converged",
            MinimizeStatus::StepConverged => "step size converged",
            MinimizeStatus::MaxEvaluations => "evaluation cap reached",
            MinimizeStatus::LineSearchFailed => "line search failed",
        }
    }
}

#[derive(Debug, Clone)]
pub struct MinimizeOutcome {
    pub x: DVector<f64>,
    pub value: f64,
    pub evaluations: usize,
    pub iterations: usize,
    pub status: MinimizeStatus,
}

/// Clamp every component of `x` into `[lower, upper]`.
pub fn project(x: &DVector<f64>, lower: &DVector<f64>, upper: &DVector<f64>) -> DVector<f64> {
    DVector::from_fn(x.len(), |i, _| x[i].max(lower[i]).min(upper[i]))
}

struct Counted<F> {
    f: F,
    evaluations: usize,
}

impl<F> Counted<F> {
    fn eval<E>(&mut self, x: &DVector<f64>) -> Result<f64, E>
    where
        F: FnMut(&DVector<f64>) -> Result<f64, E>,
    {
        self.evaluations += 1;
        (self.f)(x)
    }
}

fn approx_gradient<F, E>(
    objective: &mut Counted<F>,
    x: &DVector<f64>,
    fx: f64,
    lower: &DVector<f64>,
    upper: &DVector<f64>,
    h: f64,
) -> Result<DVector<f64>, E>
where
    F: FnMut(&DVector<f64>) -> Result<f64, E>,
{
    let mut g = DVector::zeros(x.len());
    let mut probe = x.clone();
    for i in 0..x.len() {
        // Fixed components contribute nothing.
        if upper[i] <= lower[i] {
            continue;
        }
        let xi = x[i];
        probe[i] = xi + h;
        let f_plus = objective.eval(&probe)?;
        if xi - h >= lower[i] {
            probe[i] = xi - h;
            let f_minus = objective.eval(&probe)?;
            g[i] = (f_plus - f_minus) / (2.0 * h);
        } else {
            g[i] = (f_plus - fx) / h;
        }
        probe[i] = xi;
    }
    Ok(g)
}

/// Minimize `f` over the box `[lower, upper]` starting from `x0` (projected into the box).
///
/// Errors from `f` abort the minimization and are returned unchanged.
pub fn minimize_bounded<F, E>(
    f: F,
    x0: &DVector<f64>,
    lower: &DVector<f64>,
    upper: &DVector<f64>,
    opts: &MinimizeOptions,
) -> Result<MinimizeOutcome, E>
where
    F: FnMut(&DVector<f64>) -> Result<f64, E>,
{
    let mut objective = Counted { f, evaluations: 0 };
    let h = opts.fd_step;

    let mut x = project(x0, lower, upper);
    let mut fx = objective.eval(&x)?;
    let mut g = approx_gradient(&mut objective, &x, fx, lower, upper, h)?;
    let mut lambda = 1.0 / g.amax().max(1.0);
    let mut iterations = 0usize;

    let status = loop {
        if objective.evaluations >= opts.max_evaluations {
            break MinimizeStatus::MaxEvaluations;
        }

        let projected_gradient = project(&(&x - &g), lower, upper) - &x;
        if projected_gradient.amax() <= opts.gtol {
            break MinimizeStatus::LocalMinimum;
        }

        let d = project(&(&x - &g * lambda), lower, upper) - &x;
        let slope = g.dot(&d);
        if slope >= 0.0 {
            break MinimizeStatus::LocalMinimum;
        }

        let mut t = 1.0;
        let mut accepted = None;
        for _ in 0..=opts.max_backtracks {
            let trial = &x + &d * t;
            let f_trial = objective.eval(&trial)?;
            if f_trial <= fx + ARMIJO * t * slope {
                accepted = Some((trial, f_trial));
                break;
            }
            if objective.evaluations >= opts.max_evaluations {
                break;
            }
            t *= 0.5;
        }
        let Some((x_new, f_new)) = accepted else {
            break if objective.evaluations >= opts.max_evaluations {
                MinimizeStatus::MaxEvaluations
            } else {
                MinimizeStatus::LineSearchFailed
            };
        };
        iterations += 1;

        let g_new = approx_gradient(&mut objective, &x_new, f_new, lower, upper, h)?;
        let s = &x_new - &x;
        let y = &g_new - &g;
        let sy = s.dot(&y);
        lambda = if sy > 0.0 {
            (s.dot(&s) / sy).clamp(LAMBDA_MIN, LAMBDA_MAX)
        } else {
            LAMBDA_MAX
        };

        let improvement = fx - f_new;
        x = x_new;
        fx = f_new;
        g = g_new;

        if s.amax() <= opts.xtol {
            break MinimizeStatus::StepConverged;
        }
        if improvement.abs() <= opts.ftol * fx.abs().max(1.0) {
            break MinimizeStatus::FunctionConverged;
        }
    };

    Ok(MinimizeOutcome {
        x,
        value: fx,
        evaluations: objective.evaluations,
        iterations,
        status,
    })
}
