//! The grid store: per-dataset sparse probe-count measurements.
//!
//! A store is assembled once by an ingest routine and is read-only afterwards.

use std::collections::{BTreeMap, BTreeSet};

use crate::domain::{DatasetOrder, GridPoint, ParamPair};
use crate::error::OptError;

/// Sparse measurements for a single dataset.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DatasetGrid {
    points: BTreeMap<ParamPair, u64>,
}

/// Observed extent of a dataset's grid (inclusive).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridExtent {
    pub mismatches_min: i64,
    pub mismatches_max: i64,
    pub cover_extension_min: i64,
    pub cover_extension_max: i64,
}

impl GridExtent {
    pub fn contains(&self, mismatches: f64, cover_extension: f64) -> bool {
        mismatches >= self.mismatches_min as f64
            && mismatches <= self.mismatches_max as f64
            && cover_extension >= self.cover_extension_min as f64
            && cover_extension <= self.cover_extension_max as f64
    }
}

impl DatasetGrid {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a measurement; a repeated coordinate keeps the latest count.
    pub fn insert(&mut self, params: ParamPair, probe_count: u64) -> Option<u64> {
        self.points.insert(params, probe_count)
    }

    pub fn get(&self, params: &ParamPair) -> Option<u64> {
        self.points.get(params).copied()
    }

    pub fn contains(&self, params: &ParamPair) -> bool {
        self.points.contains_key(params)
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// A single measurement is treated as a constant over the whole parameter space.
    pub fn is_constant(&self) -> bool {
        self.points.len() == 1
    }

    pub fn points(&self) -> impl Iterator<Item = GridPoint> + '_ {
        self.points.iter().map(|(&params, &probe_count)| GridPoint { params, probe_count })
    }

    pub fn keys(&self) -> impl Iterator<Item = &ParamPair> {
        self.points.keys()
    }

    pub fn extent(&self) -> Option<GridExtent> {
        let mut it = self.points.keys();
        let first = it.next()?;
        let mut extent = GridExtent {
            mismatches_min: first.mismatches,
            mismatches_max: first.mismatches,
            cover_extension_min: first.cover_extension,
            cover_extension_max: first.cover_extension,
        };
        for p in it {
            extent.mismatches_min = extent.mismatches_min.min(p.mismatches);
            extent.mismatches_max = extent.mismatches_max.max(p.mismatches);
            extent.cover_extension_min = extent.cover_extension_min.min(p.cover_extension);
            extent.cover_extension_max = extent.cover_extension_max.max(p.cover_extension);
        }
        Some(extent)
    }

    /// Distinct observed mismatches values (ascending).
    pub fn mismatches_values(&self) -> Vec<i64> {
        let set: BTreeSet<i64> = self.points.keys().map(|p| p.mismatches).collect();
        set.into_iter().collect()
    }

    /// Distinct observed cover_extension values (ascending).
    pub fn cover_extension_values(&self) -> Vec<i64> {
        let set: BTreeSet<i64> = self.points.keys().map(|p| p.cover_extension).collect();
        set.into_iter().collect()
    }
}

impl FromIterator<(ParamPair, u64)> for DatasetGrid {
    fn from_iter<T: IntoIterator<Item = (ParamPair, u64)>>(iter: T) -> Self {
        Self {
            points: iter.into_iter().collect(),
        }
    }
}

/// All datasets of a run, keyed by name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GridStore {
    datasets: BTreeMap<String, DatasetGrid>,
}

impl GridStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one measurement, creating the dataset on first use.
    pub fn insert_point(&mut self, dataset: &str, params: ParamPair, probe_count: u64) {
        self.datasets
            .entry(dataset.to_string())
            .or_default()
            .insert(params, probe_count);
    }

    pub fn dataset(&self, name: &str) -> Result<&DatasetGrid, OptError> {
        self.datasets
            .get(name)
            .ok_or_else(|| OptError::UnknownDataset(name.to_string()))
    }

    pub fn len(&self) -> usize {
        self.datasets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.datasets.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.datasets.keys().map(String::as_str)
    }

    /// Canonical (lexicographic) dataset order of this store.
    pub fn order(&self) -> DatasetOrder {
        DatasetOrder::new(self.datasets.keys().cloned())
    }

    /// Keep only the named datasets. Every requested name must exist.
    pub fn restrict(mut self, names: &[String]) -> Result<Self, OptError> {
        for name in names {
            if !self.datasets.contains_key(name) {
                return Err(OptError::UnknownDataset(name.clone()));
            }
        }
        self.datasets.retain(|k, _| names.contains(k));
        Ok(self)
    }
}
