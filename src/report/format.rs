//! Formatted terminal output for optimization runs and grids.
//!
//! We keep formatting code in one place so:
//! - the optimization code stays clean and testable
//! - output changes are localized

use crate::domain::{DatasetOrder, OptimizeConfig, ParamChoice, Solution};
use crate::grid::DatasetGrid;
use crate::optimize::{AnnealPass, OptimizationRun, RefineStep};

const RULE: &str = "##############################";

/// Format the run header: datasets, budget, seed and per-pass diagnostics.
pub fn format_run_summary(run: &OptimizationRun, order: &DatasetOrder, config: &OptimizeConfig) -> String {
    let mut out = String::new();

    out.push_str("=== probe-budget - parameter optimization ===\n");
    out.push_str(&format!("Datasets: {} ({})\n", order.len(), order.names().join(", ")));
    out.push_str(&format!("Max probe count: {}\n", config.max_probe_count));
    out.push_str(&format!("Seed total: {:.1}\n", run.seed_total));
    out.push_str(&format!(
        "Box cache: {} hits / {} misses\n",
        run.cache_hits, run.cache_misses
    ));

    out.push_str("\nAnnealing passes:\n");
    out.push_str(&format_passes(&run.passes));
    out.push('\n');
    out
}

/// Per-pass table.
pub fn format_passes(passes: &[AnnealPass]) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "{:>8} {:>12} {:>12} {:>12} {:>6}  {}\n",
        "eps", "start", "total", "loss", "evals", "status"
    ));
    out.push_str(&format!(
        "{:->8} {:->12} {:->12} {:->12} {:->6}  {:-<16}\n",
        "", "", "", "", "", ""
    ));
    for p in passes {
        out.push_str(&format!(
            "{:>8} {:>12.2} {:>12.2} {:>12.4} {:>6}  {}\n",
            fmt_eps(p.eps),
            p.start_total,
            p.total,
            p.loss,
            p.evaluations,
            p.status.describe()
        ));
    }
    out
}

/// Continuous parameters, one dataset per line.
pub fn format_continuous(order: &DatasetOrder, solution: &Solution) -> String {
    let mut out = String::new();
    out.push_str(RULE);
    out.push('\n');
    out.push_str("Continuous parameter values:\n");
    for (idx, name) in order.iter() {
        let (m, ce) = solution.params.pair(idx);
        out.push_str(&format!("{name}: ({m:.6}, {ce:.6})\n"));
    }
    out.push_str(&format!(
        "TOTAL INTERPOLATED PROBE COUNT: {:.0}\n",
        solution.total_probes.floor()
    ));
    out.push_str(RULE);
    out.push('\n');
    out
}

/// Rounded and refined parameters.
pub fn format_rounded(choices: &[ParamChoice], solution: &Solution, direct_total: Option<u64>) -> String {
    let mut out = String::new();
    out.push_str(RULE);
    out.push('\n');
    out.push_str("Rounded parameter values:\n");
    for c in choices {
        out.push_str(&format!("{}: {}\n", c.dataset, c.params));
    }
    out.push_str(&format!("TOTAL PROBE COUNT: {:.0}\n", solution.total_probes.floor()));
    if let Some(direct) = direct_total {
        out.push_str(&format!("Verified without interpolation: {direct}\n"));
    }
    out.push_str(RULE);
    out.push('\n');
    out
}

/// Refinement decrements in the order they were applied.
pub fn format_refine_steps(steps: &[RefineStep]) -> String {
    if steps.is_empty() {
        return "Refinement: no decrement improved the loss.\n".to_string();
    }
    let mut out = String::from("Refinement:\n");
    for (i, s) in steps.iter().enumerate() {
        out.push_str(&format!(
            "{:>3}. {:<20} {:<15} {:>4} -> {:<4} loss={:.4} total={:.1}\n",
            i + 1,
            truncate(&s.dataset, 20),
            s.axis,
            s.from,
            s.to,
            s.loss,
            s.total
        ));
    }
    out
}

/// Totals of a parameter file checked against a grid.
pub fn format_check(choices: &[ParamChoice], interpolated: f64, direct: Option<u64>, budget: u64) -> String {
    let mut out = String::new();
    for c in choices {
        out.push_str(&format!("{}: {}\n", c.dataset, c.params));
    }
    out.push_str(&format!("Interpolated total: {interpolated:.1}\n"));
    match direct {
        Some(d) => out.push_str(&format!("Direct total: {d}\n")),
        None => out.push_str("Direct total: unavailable (some pairs were not measured)\n"),
    }
    let verdict = if interpolated < budget as f64 { "within" } else { "OVER" };
    out.push_str(&format!("Budget: {budget} ({verdict})\n"));
    out
}

/// A dataset grid as a tab-separated matrix.
///
/// Rows are mismatches values, columns cover_extension values; unmeasured
/// cells print as `-`.
pub fn format_matrix(grid: &DatasetGrid) -> String {
    let rows = grid.mismatches_values();
    let cols = grid.cover_extension_values();

    let mut out = String::new();
    let header: Vec<String> = std::iter::once("/".to_string())
        .chain(cols.iter().map(|c| c.to_string()))
        .collect();
    out.push_str(&header.join("\t"));
    out.push('\n');

    for &m in &rows {
        let mut line = vec![m.to_string()];
        for &ce in &cols {
            let cell = grid
                .get(&crate::domain::ParamPair::new(m, ce))
                .map_or_else(|| "-".to_string(), |c| c.to_string());
            line.push(cell);
        }
        out.push_str(&line.join("\t"));
        out.push('\n');
    }
    out
}

fn fmt_eps(eps: f64) -> String {
    if eps >= 1.0 {
        format!("{eps:.0}")
    } else {
        format!("{eps:.3}")
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let mut out: String = s.chars().take(max.saturating_sub(1)).collect();
    out.push('.');
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ParamPair, ParameterVector};

    #[test]
    fn matrix_marks_missing_cells() {
        let grid: DatasetGrid = [
            (ParamPair::new(0, 0), 900),
            (ParamPair::new(0, 20), 700),
            (ParamPair::new(2, 0), 500),
        ]
        .into_iter()
        .collect();
        assert_eq!(format_matrix(&grid), "/\t0\t20\n0\t900\t700\n2\t500\t-\n");
    }

    #[test]
    fn continuous_listing_uses_six_decimals() {
        let order = DatasetOrder::new(["ebola"]);
        let solution = Solution {
            params: ParameterVector::from_pairs(&[(1.5, 12.25)]),
            loss: 0.0,
            total_probes: 69.7,
        };
        let text = format_continuous(&order, &solution);
        assert!(text.contains("ebola: (1.500000, 12.250000)\n"));
        assert!(text.contains("TOTAL INTERPOLATED PROBE COUNT: 69\n"));
    }

    #[test]
    fn check_reports_budget_verdict() {
        let choices = vec![ParamChoice {
            dataset: "ebola".to_string(),
            params: ParamPair::new(2, 20),
        }];
        let text = format_check(&choices, 120.0, Some(120), 100);
        assert!(text.contains("ebola: (2, 20)"));
        assert!(text.contains("Budget: 100 (OVER)"));
    }

    #[test]
    fn truncate_marks_cut_names() {
        assert_eq!(truncate("short", 8), "short");
        assert_eq!(truncate("hepatitis_b", 8), "hepatit.");
    }
}
