//! Shared domain types.
//!
//! These types are intentionally kept lightweight so they can be:
//!
//! - used in-memory during optimization
//! - exported to JSON / parameter files
//! - reloaded later for checking a previous choice against a grid

use std::path::PathBuf;

use clap::ValueEnum;
use nalgebra::DVector;
use serde::{Deserialize, Serialize};

/// Step between consecutive valid mismatches values.
pub const MISMATCHES_STEP: i64 = 1;

/// Step between consecutive valid cover_extension values.
pub const COVER_EXTENSION_STEP: i64 = 10;

/// An integer (mismatches, cover_extension) grid coordinate.
///
/// Ordering is lexicographic on (mismatches, cover_extension).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ParamPair {
    pub mismatches: i64,
    pub cover_extension: i64,
}

impl ParamPair {
    pub const fn new(mismatches: i64, cover_extension: i64) -> Self {
        Self {
            mismatches,
            cover_extension,
        }
    }
}

impl std::fmt::Display for ParamPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.mismatches, self.cover_extension)
    }
}

/// A measured grid point: parameters plus the observed probe count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridPoint {
    pub params: ParamPair,
    pub probe_count: u64,
}

/// One of the two parameter axes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Axis {
    Mismatches,
    CoverExtension,
}

impl Axis {
    /// Resolution of valid values on this axis.
    pub fn step(self) -> i64 {
        match self {
            Axis::Mismatches => MISMATCHES_STEP,
            Axis::CoverExtension => COVER_EXTENSION_STEP,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Axis::Mismatches => "mismatches",
            Axis::CoverExtension => "cover_extension",
        }
    }
}

/// The canonical dataset ordering for one run.
///
/// Position `i` in the order owns components `2i` (mismatches) and `2i + 1`
/// (cover_extension) of every flat parameter vector built during the run.
/// Built once from the grid store and passed everywhere a vector is created
/// or read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatasetOrder {
    names: Vec<String>,
}

impl DatasetOrder {
    /// Build an order from arbitrary names (sorted lexicographically, deduplicated).
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut names: Vec<String> = names.into_iter().map(Into::into).collect();
        names.sort();
        names.dedup();
        Self { names }
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn name(&self, idx: usize) -> &str {
        &self.names[idx]
    }

    pub fn index_of(&self, dataset: &str) -> Option<usize> {
        self.names.binary_search_by(|n| n.as_str().cmp(dataset)).ok()
    }

    /// Number of flat components for this order.
    pub fn dim(&self) -> usize {
        self.names.len() * 2
    }

    /// Flat component index of `axis` for the dataset at position `idx`.
    pub fn component(&self, idx: usize, axis: Axis) -> usize {
        match axis {
            Axis::Mismatches => 2 * idx,
            Axis::CoverExtension => 2 * idx + 1,
        }
    }

    /// Inverse of [`DatasetOrder::component`].
    pub fn locate_component(&self, component: usize) -> (usize, Axis) {
        let axis = if component % 2 == 0 {
            Axis::Mismatches
        } else {
            Axis::CoverExtension
        };
        (component / 2, axis)
    }

    pub fn iter(&self) -> impl Iterator<Item = (usize, &str)> {
        self.names.iter().enumerate().map(|(i, n)| (i, n.as_str()))
    }
}

/// Flat parameter vector: `[m_0, ce_0, m_1, ce_1, ...]` in [`DatasetOrder`] order.
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterVector {
    values: DVector<f64>,
}

impl ParameterVector {
    pub fn from_vector(values: DVector<f64>) -> Self {
        Self { values }
    }

    /// The same `(mismatches, cover_extension)` for every dataset.
    pub fn uniform(order: &DatasetOrder, mismatches: f64, cover_extension: f64) -> Self {
        let values = DVector::from_fn(order.dim(), |i, _| {
            if i % 2 == 0 { mismatches } else { cover_extension }
        });
        Self { values }
    }

    pub fn from_pairs(pairs: &[(f64, f64)]) -> Self {
        let mut flat = Vec::with_capacity(pairs.len() * 2);
        for &(m, ce) in pairs {
            flat.push(m);
            flat.push(ce);
        }
        Self {
            values: DVector::from_vec(flat),
        }
    }

    pub fn as_vector(&self) -> &DVector<f64> {
        &self.values
    }

    pub fn dataset_count(&self) -> usize {
        self.values.len() / 2
    }

    /// `(mismatches, cover_extension)` for the dataset at position `idx`.
    pub fn pair(&self, idx: usize) -> (f64, f64) {
        (self.values[2 * idx], self.values[2 * idx + 1])
    }

    pub fn component(&self, component: usize) -> f64 {
        self.values[component]
    }

    pub fn set_component(&mut self, component: usize, value: f64) {
        self.values[component] = value;
    }

    /// Integer pairs, assuming the vector already sits on grid resolution.
    pub fn to_param_pairs(&self) -> Vec<ParamPair> {
        (0..self.dataset_count())
            .map(|i| {
                let (m, ce) = self.pair(i);
                ParamPair::new(m.round() as i64, ce.round() as i64)
            })
            .collect()
    }
}

/// An optimizer result: parameters plus achieved loss and total probe count.
#[derive(Debug, Clone, PartialEq)]
pub struct Solution {
    pub params: ParameterVector,
    pub loss: f64,
    pub total_probes: f64,
}

/// A final per-dataset choice, as written to parameter files.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParamChoice {
    pub dataset: String,
    pub params: ParamPair,
}

/// Build per-dataset choices from a rounded solution.
pub fn param_choices(order: &DatasetOrder, params: &ParameterVector) -> Vec<ParamChoice> {
    order
        .iter()
        .zip(params.to_param_pairs())
        .map(|((_, name), params)| ParamChoice {
            dataset: name.to_string(),
            params,
        })
        .collect()
}

/// Component scan order used by the refinement engine.
///
/// The first improving candidate in scan order wins ties on loss.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum ScanOrder {
    /// Dataset-name order; mismatches before cover_extension within a dataset.
    #[default]
    DatasetMajor,
    /// All mismatches components (dataset order), then all cover_extension components.
    AxisMajor,
}

impl ScanOrder {
    /// Flat component indices in scan order.
    pub fn components(self, order: &DatasetOrder) -> Vec<usize> {
        match self {
            ScanOrder::DatasetMajor => (0..order.dim()).collect(),
            ScanOrder::AxisMajor => {
                let mut out = Vec::with_capacity(order.dim());
                out.extend((0..order.len()).map(|i| order.component(i, Axis::Mismatches)));
                out.extend((0..order.len()).map(|i| order.component(i, Axis::CoverExtension)));
                out
            }
        }
    }
}

/// Where the grid store is read from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GridSource {
    /// Results directory: one subdirectory per dataset with FASTA artifacts.
    ResultsDir(PathBuf),
    /// Tab-separated table `dataset, mismatches, cover_extension, probe_count`.
    Table(PathBuf),
}

/// Constants of the barrier-annealing schedule and its inner minimizer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnnealSchedule {
    pub initial_eps: f64,
    pub eps_decay: f64,
    pub min_eps: f64,
    /// Function-evaluation cap of each minimizer pass.
    pub max_evaluations: usize,
    /// Finite-difference step for gradient approximation; also the margin
    /// taken off each upper search bound.
    pub step_size: f64,
}

impl Default for AnnealSchedule {
    fn default() -> Self {
        Self {
            initial_eps: 10.0,
            eps_decay: 0.1,
            min_eps: 0.01,
            max_evaluations: 2500,
            step_size: 0.001,
        }
    }
}

/// A full run's configuration as understood by the pipeline.
///
/// This is derived from CLI flags (plus defaults).
#[derive(Debug, Clone)]
pub struct OptimizeConfig {
    pub source: GridSource,
    /// Restrict the run to these datasets (all datasets when `None`).
    pub limit_datasets: Option<Vec<String>>,
    pub max_probe_count: u64,
    pub output_params: Option<PathBuf>,
    pub export_json: Option<PathBuf>,
    /// Re-verify the final total by direct grid lookup.
    pub verify_without_interp: bool,
    pub scan_order: ScanOrder,
    pub schedule: AnnealSchedule,
    /// Heuristic seed applied to every dataset before optimization.
    pub initial_guess: (f64, f64),
    /// Loss offset for vectors at or over the budget.
    pub infeasible_offset: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dataset_order_is_sorted_and_maps_components() {
        let order = DatasetOrder::new(["marburg", "ebola", "lassa", "ebola"]);
        assert_eq!(order.names(), &["ebola", "lassa", "marburg"]);
        assert_eq!(order.index_of("lassa"), Some(1));
        assert_eq!(order.index_of("zika"), None);
        assert_eq!(order.component(1, Axis::CoverExtension), 3);
        assert_eq!(order.locate_component(4), (2, Axis::Mismatches));
    }

    #[test]
    fn scan_orders_visit_every_component_once() {
        let order = DatasetOrder::new(["a", "b", "c"]);
        assert_eq!(ScanOrder::DatasetMajor.components(&order), vec![0, 1, 2, 3, 4, 5]);
        assert_eq!(ScanOrder::AxisMajor.components(&order), vec![0, 2, 4, 1, 3, 5]);
    }

    #[test]
    fn param_choices_follow_dataset_order() {
        let order = DatasetOrder::new(["b", "a"]);
        let params = ParameterVector::from_pairs(&[(1.0, 20.0), (3.0, 0.0)]);
        let choices = param_choices(&order, &params);
        assert_eq!(choices[0].dataset, "a");
        assert_eq!(choices[0].params, ParamPair::new(1, 20));
        assert_eq!(choices[1].dataset, "b");
        assert_eq!(choices[1].params, ParamPair::new(3, 0));
    }
}
