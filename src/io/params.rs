//! Parameter files: one chosen `(mismatches, cover_extension)` per dataset.
//!
//! ```text
//! ebola	(2, 20)
//! lassa	(3, 0)
//! ```
//!
//! Lines are sorted by dataset name. Downstream design tools read this file
//! back, so the format is fixed.

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::domain::{ParamChoice, ParamPair};
use crate::error::AppError;

/// Render choices in file format (one line per dataset, trailing newline).
pub fn format_param_lines(choices: &[ParamChoice]) -> String {
    let mut sorted: Vec<&ParamChoice> = choices.iter().collect();
    sorted.sort_by(|a, b| a.dataset.cmp(&b.dataset));
    let mut out = String::new();
    for c in sorted {
        out.push_str(&format!(
            "{}\t({}, {})\n",
            c.dataset, c.params.mismatches, c.params.cover_extension
        ));
    }
    out
}

/// Write a parameter file.
pub fn write_params_file(path: &Path, choices: &[ParamChoice]) -> Result<(), AppError> {
    let file = File::create(path)
        .map_err(|e| AppError::new(2, format!("Failed to create params file '{}': {e}", path.display())))?;
    let mut w = BufWriter::new(file);
    w.write_all(format_param_lines(choices).as_bytes())
        .and_then(|()| w.flush())
        .map_err(|e| AppError::new(2, format!("Failed to write params file '{}': {e}", path.display())))?;
    Ok(())
}

/// Read a parameter file written by [`write_params_file`].
pub fn read_params_file(path: &Path) -> Result<Vec<ParamChoice>, AppError> {
    let text = fs::read_to_string(path)
        .map_err(|e| AppError::new(2, format!("Failed to read params file '{}': {e}", path.display())))?;
    parse_param_lines(&text)
}

pub fn parse_param_lines(text: &str) -> Result<Vec<ParamChoice>, AppError> {
    let mut out = Vec::new();
    for (idx, raw) in text.lines().enumerate() {
        let line = raw.trim_end();
        if line.trim().is_empty() {
            continue;
        }
        let choice = parse_line(line)
            .ok_or_else(|| AppError::new(2, format!("Params line {}: cannot parse '{line}'", idx + 1)))?;
        out.push(choice);
    }
    Ok(out)
}

fn parse_line(line: &str) -> Option<ParamChoice> {
    let (dataset, pair) = line.split_once('\t')?;
    let inner = pair.trim().strip_prefix('(')?.strip_suffix(')')?;
    let (m, ce) = inner.split_once(',')?;
    Some(ParamChoice {
        dataset: dataset.trim().to_string(),
        params: ParamPair::new(m.trim().parse().ok()?, ce.trim().parse().ok()?),
    })
}
