//! Tab-separated grid tables.
//!
//! An alternative to a results directory when probe counts were already
//! tabulated elsewhere. One measurement per row:
//!
//! ```text
//! # dataset  mismatches  cover_extension  probe_count
//! ebola      0           0                1520
//! ebola      1           10               840
//! ```
//!
//! Lines starting with `#` are comments. A first row whose mismatches column is
//! not numeric is treated as a header.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use csv::StringRecord;
use tracing::info;

use crate::domain::ParamPair;
use crate::error::AppError;
use crate::grid::GridStore;

/// Read a grid table from a file.
pub fn read_grid_table(path: &Path) -> Result<GridStore, AppError> {
    let file = File::open(path)
        .map_err(|e| AppError::new(2, format!("Failed to open grid table '{}': {e}", path.display())))?;
    let store = parse_grid_table(file)?;
    info!(path = %path.display(), datasets = store.len(), "loaded grid table");
    Ok(store)
}

/// Parse grid-table rows from any reader.
pub fn parse_grid_table<R: Read>(reader: R) -> Result<GridStore, AppError> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(b'\t')
        .has_headers(false)
        .comment(Some(b'#'))
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut store = GridStore::new();
    for (idx, result) in reader.records().enumerate() {
        let record = result.map_err(|e| AppError::new(2, format!("Grid table parse error: {e}")))?;
        let line = record.position().map_or(idx + 1, |p| p.line() as usize);
        if idx == 0 && is_header(&record) {
            continue;
        }
        let (dataset, params, count) = parse_row(&record).map_err(|msg| {
            AppError::new(2, format!("Grid table line {line}: {msg}"))
        })?;
        store.insert_point(dataset, params, count);
    }

    if store.is_empty() {
        return Err(AppError::new(2, "Grid table contains no measurements."));
    }
    Ok(store)
}

fn is_header(record: &StringRecord) -> bool {
    record.get(1).is_some_and(|s| s.parse::<i64>().is_err())
}

fn parse_row(record: &StringRecord) -> Result<(&str, ParamPair, u64), String> {
    if record.len() != 4 {
        return Err(format!("expected 4 tab-separated fields, found {}", record.len()));
    }
    let dataset = &record[0];
    if dataset.is_empty() {
        return Err("empty dataset name".to_string());
    }
    let mismatches: i64 = parse_field(&record[1], "mismatches")?;
    let cover_extension: i64 = parse_field(&record[2], "cover_extension")?;
    if mismatches < 0 || cover_extension < 0 {
        return Err("parameters must be >= 0".to_string());
    }
    crate::io::ingest::check_cover_extension(dataset, cover_extension)?;
    let count: u64 = parse_field(&record[3], "probe_count")?;
    Ok((dataset, ParamPair::new(mismatches, cover_extension), count))
}

fn parse_field<T: std::str::FromStr>(raw: &str, name: &str) -> Result<T, String> {
    raw.parse()
        .map_err(|_| format!("invalid {name} '{raw}'"))
}
