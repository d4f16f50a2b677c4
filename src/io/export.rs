//! Export a full optimization run to JSON.
//!
//! The export carries everything needed to audit a run afterwards: the
//! schedule, per-pass diagnostics, the continuous and rounded solutions, and
//! the refinement steps taken.

use std::fs::File;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{AnnealSchedule, DatasetOrder, ParamChoice, ScanOrder, Solution, param_choices};
use crate::error::AppError;
use crate::optimize::{AnnealPass, OptimizationRun, RefineStep};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContinuousParam {
    pub dataset: String,
    pub mismatches: f64,
    pub cover_extension: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunExport {
    pub tool: String,
    pub generated_at: DateTime<Utc>,
    pub max_probe_count: u64,
    pub scan_order: ScanOrder,
    pub schedule: AnnealSchedule,
    pub datasets: Vec<String>,
    pub seed_total: f64,
    pub passes: Vec<AnnealPass>,
    pub continuous: Vec<ContinuousParam>,
    pub continuous_total: f64,
    pub rounded: Vec<ParamChoice>,
    pub rounded_total: f64,
    pub refine_steps: Vec<RefineStep>,
    pub params: Vec<ParamChoice>,
    pub total_probes: f64,
    pub loss: f64,
    pub direct_total: Option<u64>,
}

impl RunExport {
    pub fn from_run(
        run: &OptimizationRun,
        order: &DatasetOrder,
        max_probe_count: u64,
        scan_order: ScanOrder,
        schedule: &AnnealSchedule,
    ) -> Self {
        Self {
            tool: env!("CARGO_PKG_NAME").to_string(),
            generated_at: Utc::now(),
            max_probe_count,
            scan_order,
            schedule: schedule.clone(),
            datasets: order.names().to_vec(),
            seed_total: run.seed_total,
            passes: run.passes.clone(),
            continuous: continuous_params(order, &run.continuous),
            continuous_total: run.continuous.total_probes,
            rounded: param_choices(order, &run.rounded.params),
            rounded_total: run.rounded.total_probes,
            refine_steps: run.refine_steps.clone(),
            params: param_choices(order, &run.best.params),
            total_probes: run.best.total_probes,
            loss: run.best.loss,
            direct_total: run.direct_total,
        }
    }
}

fn continuous_params(order: &DatasetOrder, solution: &Solution) -> Vec<ContinuousParam> {
    order
        .iter()
        .map(|(idx, name)| {
            let (mismatches, cover_extension) = solution.params.pair(idx);
            ContinuousParam {
                dataset: name.to_string(),
                mismatches,
                cover_extension,
            }
        })
        .collect()
}

/// Write a run export as pretty JSON.
pub fn write_run_json(path: &Path, export: &RunExport) -> Result<(), AppError> {
    let file = File::create(path)
        .map_err(|e| AppError::new(2, format!("Failed to create export JSON '{}': {e}", path.display())))?;
    serde_json::to_writer_pretty(file, export)
        .map_err(|e| AppError::new(2, format!("Failed to write export JSON: {e}")))?;
    Ok(())
}

/// Read a run export back.
pub fn read_run_json(path: &Path) -> Result<RunExport, AppError> {
    let file = File::open(path)
        .map_err(|e| AppError::new(2, format!("Failed to open export JSON '{}': {e}", path.display())))?;
    serde_json::from_reader(file).map_err(|e| AppError::new(2, format!("Invalid export JSON: {e}")))
}
