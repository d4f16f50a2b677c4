//! Results-directory ingest.
//!
//! A results directory holds one subdirectory per dataset. Each subdirectory
//! contains probe FASTA files named
//! `mismatches_<m>-coverextension_<ce>.fasta`; the number of records in a file
//! is the probe count at `(m, ce)`.
//!
//! Design goals:
//! - **Tolerant layout**: top-level files (e.g. `datasets.txt`) and
//!   non-matching file names are skipped, but reported
//! - **Parallel counting**: files are counted with `rayon`, the store is built
//!   afterwards on one thread
//! - **Deterministic output**: the store is keyed by sorted names and pairs

use std::fs::{self, File};
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use rayon::prelude::*;
use tracing::{debug, info, warn};

use crate::domain::{Axis, GridSource, ParamPair};
use crate::error::AppError;
use crate::grid::GridStore;

const FASTA_PREFIX: &str = "mismatches_";
const FASTA_SEPARATOR: &str = "-coverextension_";
const FASTA_SUFFIX: &str = ".fasta";

/// A FASTA artifact discovered under a dataset directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeArtifact {
    pub dataset: String,
    pub params: ParamPair,
    pub path: PathBuf,
}

/// Ingest output: the grid store plus what was skipped along the way.
#[derive(Debug, Clone)]
pub struct IngestedGrid {
    pub store: GridStore,
    /// Entries that did not contribute a measurement (relative to the root).
    pub skipped: Vec<String>,
    /// Dataset directories without any usable artifact; not in `store`.
    pub empty_datasets: Vec<String>,
}

/// Parse `mismatches_<m>-coverextension_<ce>.fasta` into its parameter pair.
pub fn parse_artifact_name(file_name: &str) -> Option<ParamPair> {
    let rest = file_name.strip_prefix(FASTA_PREFIX)?;
    let rest = rest.strip_suffix(FASTA_SUFFIX)?;
    let (m, ce) = rest.split_once(FASTA_SEPARATOR)?;
    let all_digits = |s: &str| !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit());
    if !all_digits(m) || !all_digits(ce) {
        return None;
    }
    Some(ParamPair::new(m.parse().ok()?, ce.parse().ok()?))
}

/// Reject cover_extension values off the grid's step.
pub(crate) fn check_cover_extension(dataset: &str, cover_extension: i64) -> Result<(), String> {
    let step = Axis::CoverExtension.step();
    if cover_extension % step != 0 {
        return Err(format!(
            "dataset '{dataset}': cover_extension {cover_extension} is not a multiple of {step}"
        ));
    }
    Ok(())
}

/// Number of FASTA records (header lines starting with `>`) in a file.
pub fn count_probes(path: &Path) -> Result<u64, AppError> {
    let file = File::open(path)
        .map_err(|e| AppError::new(2, format!("Failed to open FASTA '{}': {e}", path.display())))?;
    let mut count = 0u64;
    for line in BufReader::new(file).lines() {
        let line =
            line.map_err(|e| AppError::new(2, format!("Failed to read FASTA '{}': {e}", path.display())))?;
        if line.starts_with('>') {
            count += 1;
        }
    }
    Ok(count)
}

/// Load a grid store from whichever source the run was configured with.
pub fn load_grid(source: &GridSource) -> Result<IngestedGrid, AppError> {
    match source {
        GridSource::ResultsDir(dir) => load_results_dir(dir),
        GridSource::Table(path) => {
            let store = crate::io::grid_tsv::read_grid_table(path)?;
            Ok(IngestedGrid {
                store,
                skipped: Vec::new(),
                empty_datasets: Vec::new(),
            })
        }
    }
}

/// Walk a results directory, count every artifact, and build the store.
pub fn load_results_dir(root: &Path) -> Result<IngestedGrid, AppError> {
    let (artifacts, mut skipped, mut dataset_dirs) = discover_artifacts(root)?;

    let counts: Vec<u64> = artifacts
        .par_iter()
        .map(|a| count_probes(&a.path))
        .collect::<Result<_, _>>()?;

    let mut store = GridStore::new();
    for (artifact, count) in artifacts.iter().zip(counts) {
        debug!(dataset = %artifact.dataset, params = %artifact.params, count, "counted artifact");
        store.insert_point(&artifact.dataset, artifact.params, count);
    }

    dataset_dirs.retain(|name| store.dataset(name).is_err());
    for name in &dataset_dirs {
        warn!(dataset = %name, "dataset directory has no probe artifacts; ignoring it");
    }
    skipped.sort();

    info!(
        datasets = store.len(),
        artifacts = artifacts.len(),
        skipped = skipped.len(),
        "loaded results directory"
    );
    Ok(IngestedGrid {
        store,
        skipped,
        empty_datasets: dataset_dirs,
    })
}

type Discovery = (Vec<ProbeArtifact>, Vec<String>, Vec<String>);

fn discover_artifacts(root: &Path) -> Result<Discovery, AppError> {
    let entries = read_dir_sorted(root)?;
    if entries.is_empty() {
        return Err(AppError::new(
            2,
            format!("Results directory '{}' is empty.", root.display()),
        ));
    }

    let mut artifacts = Vec::new();
    let mut skipped = Vec::new();
    let mut dataset_dirs = Vec::new();
    for (name, path) in entries {
        if !path.is_dir() {
            debug!(entry = %name, "skipping non-directory entry");
            skipped.push(name);
            continue;
        }
        dataset_dirs.push(name.clone());
        for (file_name, file_path) in read_dir_sorted(&path)? {
            match parse_artifact_name(&file_name) {
                Some(params) if file_path.is_file() => {
                    check_cover_extension(&name, params.cover_extension).map_err(|msg| {
                        AppError::new(2, format!("Probe artifact '{name}/{file_name}': {msg}."))
                    })?;
                    artifacts.push(ProbeArtifact {
                        dataset: name.clone(),
                        params,
                        path: file_path,
                    })
                }
                _ => skipped.push(format!("{name}/{file_name}")),
            }
        }
    }
    Ok((artifacts, skipped, dataset_dirs))
}

fn read_dir_sorted(dir: &Path) -> Result<Vec<(String, PathBuf)>, AppError> {
    let reader = fs::read_dir(dir)
        .map_err(|e| AppError::new(2, format!("Failed to read directory '{}': {e}", dir.display())))?;
    let mut out = Vec::new();
    for entry in reader {
        let entry = entry
            .map_err(|e| AppError::new(2, format!("Failed to read directory '{}': {e}", dir.display())))?;
        let name = entry.file_name().to_string_lossy().into_owned();
        out.push((name, entry.path()));
    }
    out.sort();
    Ok(out)
}
