//! Bounding-box search over an irregular measurement grid.
//!
//! Mismatches is the horizontal axis (left to right) and cover_extension the
//! vertical axis (bottom to top). For a query point we want the smallest
//! rectangle whose four corners were all actually measured, so the corners
//! can feed bilinear interpolation.
//!
//! The search brute-forces candidate rectangles, pruned by requiring the
//! top-right corner to share the top-left's cover_extension and the
//! bottom-left corner to share its mismatches. That is cubic in the number of
//! points at worst, which is fine for grids of a few hundred measurements,
//! and results are memoized per unit cell by [`BoxCache`].

use std::collections::{BTreeMap, BTreeSet, HashMap};

use tracing::debug;

use crate::domain::ParamPair;
use crate::error::OptError;
use crate::grid::store::DatasetGrid;

/// Pseudocount added to each rectangle side so that degenerate rectangles
/// still rank by their other side.
pub const AREA_PSEUDOCOUNT: f64 = 0.001;

/// Cover extension is sampled in steps of ten; heights are measured in those
/// units so both sides are on comparable scales.
const HEIGHT_UNIT: f64 = 10.0;

/// Four measured corners enclosing a query point.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoundingBox {
    pub top_left: ParamPair,
    pub top_right: ParamPair,
    pub bottom_left: ParamPair,
    pub bottom_right: ParamPair,
}

impl BoundingBox {
    /// A zero-size box sitting on a single measured point.
    pub fn point(p: ParamPair) -> Self {
        Self {
            top_left: p,
            top_right: p,
            bottom_left: p,
            bottom_right: p,
        }
    }

    pub fn mismatches_floor(&self) -> i64 {
        self.top_left.mismatches
    }

    pub fn mismatches_ceil(&self) -> i64 {
        self.bottom_right.mismatches
    }

    pub fn cover_extension_floor(&self) -> i64 {
        self.bottom_right.cover_extension
    }

    pub fn cover_extension_ceil(&self) -> i64 {
        self.top_left.cover_extension
    }

    pub fn width(&self) -> i64 {
        self.mismatches_ceil() - self.mismatches_floor()
    }

    pub fn height(&self) -> i64 {
        self.cover_extension_ceil() - self.cover_extension_floor()
    }

    /// Ranking area: `(width + ε) * (height / 10 + ε)`.
    pub fn area(&self) -> f64 {
        (self.width() as f64 + AREA_PSEUDOCOUNT)
            * (self.height() as f64 / HEIGHT_UNIT + AREA_PSEUDOCOUNT)
    }
}

/// Find the minimum-area measured rectangle enclosing `(mismatches, cover_extension)`.
///
/// Returns `None` when no rectangle exists. Among rectangles of equal area the
/// first one in `(top-left, top-right, bottom-left)` coordinate order wins.
pub fn locate_bounding_box(
    grid: &DatasetGrid,
    mismatches: f64,
    cover_extension: f64,
) -> Option<BoundingBox> {
    let mut top_left = BTreeSet::new();
    let mut top_right = BTreeSet::new();
    let mut bottom_left = BTreeSet::new();
    let mut bottom_right = BTreeSet::new();

    for &p in grid.keys() {
        let m = p.mismatches as f64;
        let ce = p.cover_extension as f64;
        let left = m <= mismatches;
        let right = m >= mismatches;
        let top = ce >= cover_extension;
        let bottom = ce <= cover_extension;
        if left && top {
            top_left.insert(p);
        }
        if right && top {
            top_right.insert(p);
        }
        if left && bottom {
            bottom_left.insert(p);
        }
        if right && bottom {
            bottom_right.insert(p);
        }
    }

    let mut top_right_by_ce: BTreeMap<i64, Vec<ParamPair>> = BTreeMap::new();
    for &p in &top_right {
        top_right_by_ce.entry(p.cover_extension).or_default().push(p);
    }
    let mut bottom_left_by_m: BTreeMap<i64, Vec<ParamPair>> = BTreeMap::new();
    for &p in &bottom_left {
        bottom_left_by_m.entry(p.mismatches).or_default().push(p);
    }

    let mut best: Option<(BoundingBox, f64)> = None;
    for &tl in &top_left {
        let Some(trs) = top_right_by_ce.get(&tl.cover_extension) else {
            continue;
        };
        let Some(bls) = bottom_left_by_m.get(&tl.mismatches) else {
            continue;
        };
        for &tr in trs {
            for &bl in bls {
                let br = ParamPair::new(tr.mismatches, bl.cover_extension);
                if !bottom_right.contains(&br) {
                    continue;
                }
                let candidate = BoundingBox {
                    top_left: tl,
                    top_right: tr,
                    bottom_left: bl,
                    bottom_right: br,
                };
                let area = candidate.area();
                if best.as_ref().is_none_or(|(_, a)| area < *a) {
                    best = Some((candidate, area));
                }
            }
        }
    }

    best.map(|(b, _)| b)
}

/// Unit cell around a query: its coordinates rounded down and up to integers.
///
/// Every measured rectangle enclosing a point also encloses that point's whole
/// cell (corners are integers), so a box found for one point can be reused for
/// any other point of the same cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ImmediateBox {
    pub mismatches_floor: i64,
    pub mismatches_ceil: i64,
    pub cover_extension_floor: i64,
    pub cover_extension_ceil: i64,
}

impl ImmediateBox {
    pub fn around(mismatches: f64, cover_extension: f64) -> Self {
        Self {
            mismatches_floor: mismatches.floor() as i64,
            mismatches_ceil: mismatches.ceil() as i64,
            cover_extension_floor: cover_extension.floor() as i64,
            cover_extension_ceil: cover_extension.ceil() as i64,
        }
    }
}

/// Per-run memo of located bounding boxes, keyed by dataset then unit cell.
///
/// Owned by one interpolator; not meant to be shared between runs.
#[derive(Debug, Default)]
pub struct BoxCache {
    boxes: HashMap<String, HashMap<ImmediateBox, BoundingBox>>,
    hits: u64,
    misses: u64,
}

impl BoxCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached box for the query's cell, locating (and storing) it on a miss.
    pub fn get_or_locate(
        &mut self,
        dataset: &str,
        grid: &DatasetGrid,
        mismatches: f64,
        cover_extension: f64,
    ) -> Result<BoundingBox, OptError> {
        let key = ImmediateBox::around(mismatches, cover_extension);
        if let Some(found) = self.boxes.get(dataset).and_then(|m| m.get(&key)) {
            self.hits += 1;
            return Ok(*found);
        }

        self.misses += 1;
        let located = locate_bounding_box(grid, mismatches, cover_extension).ok_or_else(|| {
            OptError::NoBoundingBox {
                dataset: dataset.to_string(),
                mismatches,
                cover_extension,
            }
        })?;
        debug!(
            dataset,
            mismatches,
            cover_extension,
            m_lo = located.mismatches_floor(),
            m_hi = located.mismatches_ceil(),
            ce_lo = located.cover_extension_floor(),
            ce_hi = located.cover_extension_ceil(),
            "located bounding box"
        );
        self.boxes
            .entry(dataset.to_string())
            .or_default()
            .insert(key, located);
        Ok(located)
    }

    pub fn hits(&self) -> u64 {
        self.hits
    }

    pub fn misses(&self) -> u64 {
        self.misses
    }

    pub fn len(&self) -> usize {
        self.boxes.values().map(HashMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
