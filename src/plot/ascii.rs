//! ASCII plotting of a dataset grid for terminal output.
//!
//! Probe count against mismatches, one series per cover_extension value.
//! Output is a fixed-size character grid so it stays deterministic.
//!
//! Plot elements:
//! - series lines: `.`
//! - measured points: the series glyph (`a`, `b`, ... in cover_extension order)
//! - optional highlight: `*` at a chosen parameter pair

use crate::domain::ParamPair;
use crate::grid::DatasetGrid;

const SERIES_GLYPHS: &[u8] = b"abcdefghijklmnopqrstuvwxyz";

/// One cover_extension series: `(mismatches, probe_count)` sorted by mismatches.
#[derive(Debug, Clone, PartialEq)]
pub struct Series {
    pub cover_extension: i64,
    pub glyph: char,
    pub points: Vec<(f64, f64)>,
}

/// Split a grid into per-cover_extension series.
pub fn grid_series(grid: &DatasetGrid) -> Vec<Series> {
    grid.cover_extension_values()
        .into_iter()
        .enumerate()
        .map(|(i, ce)| {
            let points = grid
                .points()
                .filter(|p| p.params.cover_extension == ce)
                .map(|p| (p.params.mismatches as f64, p.probe_count as f64))
                .collect();
            Series {
                cover_extension: ce,
                glyph: SERIES_GLYPHS[i % SERIES_GLYPHS.len()] as char,
                points,
            }
        })
        .collect()
}

/// Render a dataset grid, optionally highlighting a chosen pair.
pub fn render_grid_plot(
    dataset: &str,
    grid: &DatasetGrid,
    highlight: Option<ParamPair>,
    width: usize,
    height: usize,
) -> String {
    let width = width.max(10);
    let height = height.max(5);
    let series = grid_series(grid);

    let (m_min, m_max) = x_range(&series).unwrap_or((0.0, 1.0));
    let (y_min, y_max) = y_range(&series).unwrap_or((0.0, 1.0));
    let (y_min, y_max) = pad_range(y_min, y_max, 0.05);

    let mut canvas = vec![vec![' '; width]; height];

    // Lines first so points overlay them.
    for s in &series {
        draw_series(&mut canvas, &s.points, m_min, m_max, y_min, y_max);
    }
    for s in &series {
        for &(m, y) in &s.points {
            let x = map_x(m, m_min, m_max, width);
            let yy = map_y(y, y_min, y_max, height);
            canvas[yy][x] = s.glyph;
        }
    }
    if let Some((p, count)) = highlight.and_then(|p| grid.get(&p).map(|c| (p, c))) {
        let x = map_x(p.mismatches as f64, m_min, m_max, width);
        let yy = map_y(count as f64, y_min, y_max, height);
        canvas[yy][x] = '*';
    }

    let mut out = String::new();
    out.push_str(&format!(
        "Plot: {dataset} | mismatches=[{m_min:.0}, {m_max:.0}] | probes=[{y_min:.0}, {y_max:.0}]\n"
    ));
    for row in canvas {
        out.push_str(row.into_iter().collect::<String>().trim_end());
        out.push('\n');
    }

    let legend: Vec<String> = series
        .iter()
        .map(|s| format!("{}=ce {}", s.glyph, s.cover_extension))
        .collect();
    out.push_str(&format!("Legend: {}\n", legend.join("  ")));
    out
}

fn x_range(series: &[Series]) -> Option<(f64, f64)> {
    let mut min_x = f64::INFINITY;
    let mut max_x = f64::NEG_INFINITY;
    for &(x, _) in series.iter().flat_map(|s| s.points.iter()) {
        min_x = min_x.min(x);
        max_x = max_x.max(x);
    }
    if min_x.is_finite() && max_x.is_finite() && max_x > min_x {
        Some((min_x, max_x))
    } else {
        None
    }
}

fn y_range(series: &[Series]) -> Option<(f64, f64)> {
    let mut min_y = f64::INFINITY;
    let mut max_y = f64::NEG_INFINITY;
    for &(_, y) in series.iter().flat_map(|s| s.points.iter()) {
        min_y = min_y.min(y);
        max_y = max_y.max(y);
    }
    if min_y.is_finite() && max_y.is_finite() && max_y > min_y {
        Some((min_y, max_y))
    } else {
        None
    }
}

fn pad_range(min: f64, max: f64, frac: f64) -> (f64, f64) {
    let span = (max - min).abs();
    let pad = (span * frac).max(1e-12);
    (min - pad, max + pad)
}

fn map_x(x: f64, x_min: f64, x_max: f64, width: usize) -> usize {
    let width = width.max(2);
    let u = ((x - x_min) / (x_max - x_min)).clamp(0.0, 1.0);
    (u * (width as f64 - 1.0)).round() as usize
}

fn map_y(y: f64, y_min: f64, y_max: f64, height: usize) -> usize {
    let height = height.max(2);
    let u = ((y - y_min) / (y_max - y_min)).clamp(0.0, 1.0);
    // Largest count on row 0.
    (height as f64 - 1.0 - (u * (height as f64 - 1.0))).round() as usize
}

fn draw_series(canvas: &mut [Vec<char>], points: &[(f64, f64)], x_min: f64, x_max: f64, y_min: f64, y_max: f64) {
    let height = canvas.len();
    let width = canvas[0].len();
    for pair in points.windows(2) {
        let (x0, y0) = (map_x(pair[0].0, x_min, x_max, width), map_y(pair[0].1, y_min, y_max, height));
        let (x1, y1) = (map_x(pair[1].0, x_min, x_max, width), map_y(pair[1].1, y_min, y_max, height));
        draw_line(canvas, x0, y0, x1, y1, '.');
    }
}

/// Integer line drawing (Bresenham).
fn draw_line(canvas: &mut [Vec<char>], x0: usize, y0: usize, x1: usize, y1: usize, ch: char) {
    let mut x0 = x0 as isize;
    let mut y0 = y0 as isize;
    let x1 = x1 as isize;
    let y1 = y1 as isize;

    let dx = (x1 - x0).abs();
    let sx = if x0 < x1 { 1 } else { -1 };
    let dy = -(y1 - y0).abs();
    let sy = if y0 < y1 { 1 } else { -1 };
    let mut err = dx + dy;

    loop {
        if y0 >= 0
            && (y0 as usize) < canvas.len()
            && x0 >= 0
            && (x0 as usize) < canvas[0].len()
            && canvas[y0 as usize][x0 as usize] == ' '
        {
            canvas[y0 as usize][x0 as usize] = ch;
        }

        if x0 == x1 && y0 == y1 {
            break;
        }
        let e2 = 2 * err;
        if e2 >= dy {
            err += dy;
            x0 += sx;
        }
        if e2 <= dx {
            err += dx;
            y0 += sy;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid() -> DatasetGrid {
        [
            (ParamPair::new(0, 0), 100),
            (ParamPair::new(5, 0), 40),
            (ParamPair::new(0, 30), 80),
            (ParamPair::new(5, 30), 20),
        ]
        .into_iter()
        .collect()
    }

    #[test]
    fn series_split_by_cover_extension() {
        let series = grid_series(&grid());
        assert_eq!(series.len(), 2);
        assert_eq!(series[0].cover_extension, 0);
        assert_eq!(series[0].glyph, 'a');
        assert_eq!(series[1].points, vec![(0.0, 80.0), (5.0, 20.0)]);
    }

    #[test]
    fn plot_has_fixed_size_and_legend() {
        let out = render_grid_plot("lassa", &grid(), None, 30, 8);
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines.len(), 1 + 8 + 1);
        assert!(lines[0].starts_with("Plot: lassa"));
        assert_eq!(lines[9], "Legend: a=ce 0  b=ce 30");
        // Highest count (a at m=0) sits on the top row, first column.
        assert!(lines[1].starts_with('a'));
    }

    #[test]
    fn highlight_overrides_point_glyph() {
        let out = render_grid_plot("lassa", &grid(), Some(ParamPair::new(5, 30)), 30, 8);
        let bottom = out.lines().nth(8).unwrap();
        assert!(bottom.ends_with('*'), "{bottom:?}");
    }
}
