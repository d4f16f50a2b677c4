//! Bilinear interpolation of probe counts.
//!
//! A probe count at a fractional `(mismatches, cover_extension)` is estimated
//! from the four measured corners of its bounding box:
//!
//! 1. along each cover_extension edge (bottom and top), interpolate linearly in
//!    mismatches
//! 2. interpolate linearly between the two edge values in cover_extension
//!
//! A zero-length span on either axis means both endpoints are the same
//! measurement, so their counts must agree.

use crate::domain::{Axis, DatasetOrder, ParamPair, ParameterVector};
use crate::error::OptError;
use crate::grid::locate::{BoundingBox, BoxCache};
use crate::grid::store::{DatasetGrid, GridStore};

/// Interpolate the probe count at `(mismatches, cover_extension)` inside `bbox`.
pub fn bilinear(
    dataset: &str,
    grid: &DatasetGrid,
    bbox: &BoundingBox,
    mismatches: f64,
    cover_extension: f64,
) -> Result<f64, OptError> {
    let m_lo = bbox.mismatches_floor();
    let m_hi = bbox.mismatches_ceil();
    let ce_lo = bbox.cover_extension_floor();
    let ce_hi = bbox.cover_extension_ceil();

    let edge = |ce: i64| -> Result<f64, OptError> {
        let left = corner(dataset, grid, ParamPair::new(m_lo, ce))?;
        let right = corner(dataset, grid, ParamPair::new(m_hi, ce))?;
        lerp(dataset, Axis::Mismatches, m_lo, m_hi, left, right, mismatches)
    };
    let count_floor = edge(ce_lo)?;
    let count_ceil = edge(ce_hi)?;

    lerp(
        dataset,
        Axis::CoverExtension,
        ce_lo,
        ce_hi,
        count_floor,
        count_ceil,
        cover_extension,
    )
}

fn corner(dataset: &str, grid: &DatasetGrid, p: ParamPair) -> Result<f64, OptError> {
    grid.get(&p)
        .map(|c| c as f64)
        .ok_or_else(|| OptError::CorruptGrid {
            dataset: dataset.to_string(),
            detail: format!("bounding box corner {p} has no measurement"),
        })
}

fn lerp(
    dataset: &str,
    axis: Axis,
    lo: i64,
    hi: i64,
    at_lo: f64,
    at_hi: f64,
    x: f64,
) -> Result<f64, OptError> {
    if hi == lo {
        if at_lo != at_hi {
            return Err(OptError::CorruptGrid {
                dataset: dataset.to_string(),
                detail: format!(
                    "zero-width {} span at {lo} has differing counts {at_lo} and {at_hi}",
                    axis.name()
                ),
            });
        }
        return Ok(at_lo);
    }
    let f = (x - lo as f64) / (hi - lo) as f64;
    Ok(at_lo + f * (at_hi - at_lo))
}

/// Interpolates probe counts for the datasets of one run.
///
/// Holds the run's bounding-box cache, so each optimization run needs its
/// own interpolator.
#[derive(Debug)]
pub struct Interpolator<'a> {
    order: &'a DatasetOrder,
    grids: Vec<&'a DatasetGrid>,
    cache: BoxCache,
}

impl<'a> Interpolator<'a> {
    /// Resolve every dataset of `order` in `store`.
    pub fn new(store: &'a GridStore, order: &'a DatasetOrder) -> Result<Self, OptError> {
        if order.is_empty() {
            return Err(OptError::EmptyStore);
        }
        let mut grids = Vec::with_capacity(order.len());
        for (_, name) in order.iter() {
            let grid = store.dataset(name)?;
            if grid.is_empty() {
                return Err(OptError::InvalidBounds {
                    dataset: name.to_string(),
                    detail: "no measurements".to_string(),
                });
            }
            grids.push(grid);
        }
        Ok(Self {
            order,
            grids,
            cache: BoxCache::new(),
        })
    }

    pub fn order(&self) -> &'a DatasetOrder {
        self.order
    }

    pub fn cache(&self) -> &BoxCache {
        &self.cache
    }

    /// Interpolated probe count for a dataset given by name.
    pub fn probe_count(
        &mut self,
        dataset: &str,
        mismatches: f64,
        cover_extension: f64,
    ) -> Result<f64, OptError> {
        let idx = self
            .order
            .index_of(dataset)
            .ok_or_else(|| OptError::UnknownDataset(dataset.to_string()))?;
        self.probe_count_at(idx, mismatches, cover_extension)
    }

    /// Interpolated probe count for the dataset at position `idx` of the order.
    pub fn probe_count_at(
        &mut self,
        idx: usize,
        mismatches: f64,
        cover_extension: f64,
    ) -> Result<f64, OptError> {
        let order = self.order;
        let dataset = order.name(idx);
        let grid = self.grids[idx];

        if grid.is_constant() {
            if let Some(p) = grid.points().next() {
                return Ok(p.probe_count as f64);
            }
        }

        let in_range = grid
            .extent()
            .is_some_and(|e| e.contains(mismatches, cover_extension));
        if !in_range {
            return Err(OptError::OutOfRange {
                dataset: dataset.to_string(),
                mismatches,
                cover_extension,
            });
        }

        let bbox = self
            .cache
            .get_or_locate(dataset, grid, mismatches, cover_extension)?;
        bilinear(dataset, grid, &bbox, mismatches, cover_extension)
    }

    /// Sum of interpolated probe counts across all datasets.
    pub fn total(&mut self, x: &ParameterVector) -> Result<f64, OptError> {
        let mut sum = 0.0;
        for idx in 0..self.order.len() {
            let (m, ce) = x.pair(idx);
            sum += self.probe_count_at(idx, m, ce)?;
        }
        Ok(sum)
    }

    /// Sum of measured probe counts, without interpolation.
    ///
    /// Every parameter pair in `x` must have been measured directly.
    pub fn direct_total(&self, x: &ParameterVector) -> Result<u64, OptError> {
        let mut sum = 0u64;
        for (idx, p) in x.to_param_pairs().into_iter().enumerate() {
            let count = self.grids[idx]
                .get(&p)
                .ok_or_else(|| OptError::MissingMeasurement {
                    dataset: self.order.name(idx).to_string(),
                    mismatches: p.mismatches,
                    cover_extension: p.cover_extension,
                })?;
            sum += count;
        }
        Ok(sum)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Dataset `a` is a 2x2 plane; dataset `b` is a single measurement.
    fn two_dataset_store() -> GridStore {
        let mut store = GridStore::new();
        store.insert_point("a", ParamPair::new(0, 0), 100);
        store.insert_point("a", ParamPair::new(5, 0), 40);
        store.insert_point("a", ParamPair::new(0, 30), 80);
        store.insert_point("a", ParamPair::new(5, 30), 20);
        store.insert_point("b", ParamPair::new(0, 0), 10);
        store
    }

    /// Irregular grid: no measurement at (2, 20) or (4, 0).
    fn irregular_store() -> GridStore {
        let mut store = GridStore::new();
        let pts = [
            (0, 0, 900),
            (2, 0, 500),
            (0, 20, 700),
            (4, 20, 150),
            (0, 40, 400),
            (2, 40, 250),
            (4, 40, 90),
        ];
        for (m, ce, c) in pts {
            store.insert_point("lassa", ParamPair::new(m, ce), c);
        }
        store
    }

    #[test]
    fn midpoint_of_plane_is_exact() {
        let store = two_dataset_store();
        let order = store.order();
        let mut interp = Interpolator::new(&store, &order).unwrap();
        assert_eq!(interp.probe_count("a", 2.5, 15.0).unwrap(), 60.0);
    }

    #[test]
    fn observed_points_interpolate_to_their_counts() {
        let store = irregular_store();
        let order = store.order();
        let mut interp = Interpolator::new(&store, &order).unwrap();
        let grid = store.dataset("lassa").unwrap();
        for p in grid.points() {
            let v = interp
                .probe_count("lassa", p.params.mismatches as f64, p.params.cover_extension as f64)
                .unwrap();
            assert_eq!(v, p.probe_count as f64, "at {}", p.params);
        }
    }

    #[test]
    fn interior_values_stay_within_corner_range() {
        let store = irregular_store();
        let order = store.order();
        let mut interp = Interpolator::new(&store, &order).unwrap();
        let grid = store.dataset("lassa").unwrap();
        for &(m, ce) in &[(0.3, 30.0), (1.7, 25.5), (3.2, 33.3), (3.9, 21.0), (0.1, 39.9)] {
            let bbox = crate::grid::locate::locate_bounding_box(grid, m, ce).unwrap();
            let corners = [bbox.top_left, bbox.top_right, bbox.bottom_left, bbox.bottom_right]
                .map(|p| grid.get(&p).unwrap() as f64);
            let lo = corners.iter().copied().fold(f64::INFINITY, f64::min);
            let hi = corners.iter().copied().fold(f64::NEG_INFINITY, f64::max);
            let v = interp.probe_count("lassa", m, ce).unwrap();
            assert!(v >= lo - 1e-9 && v <= hi + 1e-9, "{v} not in [{lo}, {hi}] at ({m}, {ce})");
        }
    }

    #[test]
    fn constant_dataset_ignores_query_point() {
        let store = two_dataset_store();
        let order = store.order();
        let mut interp = Interpolator::new(&store, &order).unwrap();
        assert_eq!(interp.probe_count("b", 5.0, 30.0).unwrap(), 10.0);
        assert_eq!(interp.probe_count("b", 0.0, 0.0).unwrap(), 10.0);
    }

    #[test]
    fn query_outside_extent_is_range_error() {
        let store = two_dataset_store();
        let order = store.order();
        let mut interp = Interpolator::new(&store, &order).unwrap();
        let err = interp.probe_count("a", 6.0, 10.0).unwrap_err();
        assert!(matches!(err, OptError::OutOfRange { ref dataset, .. } if dataset == "a"));
    }

    #[test]
    fn totals_follow_dataset_order() {
        let store = two_dataset_store();
        let order = store.order();
        let mut interp = Interpolator::new(&store, &order).unwrap();
        let x = ParameterVector::from_pairs(&[(5.0, 30.0), (0.0, 0.0)]);
        assert_eq!(interp.total(&x).unwrap(), 30.0);
        assert_eq!(interp.direct_total(&x).unwrap(), 30);

        let off_grid = ParameterVector::from_pairs(&[(2.0, 10.0), (0.0, 0.0)]);
        assert!(matches!(
            interp.direct_total(&off_grid).unwrap_err(),
            OptError::MissingMeasurement { .. }
        ));
    }

    #[test]
    fn lerp_rejects_disagreeing_zero_span() {
        let err = lerp("d", Axis::Mismatches, 3, 3, 1.0, 2.0, 3.0).unwrap_err();
        assert!(matches!(err, OptError::CorruptGrid { .. }));
        assert_eq!(lerp("d", Axis::Mismatches, 3, 3, 2.0, 2.0, 3.0).unwrap(), 2.0);
    }
}
