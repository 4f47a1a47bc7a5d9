//! ASCII plotting for terminal output.
//!
//! This is intentionally "dumb" (fixed-size grid), optimized for:
//! - quick visual sanity checks in a terminal
//! - deterministic output (helpful for golden tests)
//!
//! Plot elements:
//! - observed history: `o`
//! - forecast path: `-` line, forecast points `*`
//! - optional interval bounds: `.`

use crate::domain::Variable;

/// Lower/upper interval bounds, one value per forecast step.
pub type Bands<'a> = (&'a [f64], &'a [f64]);

/// Render history followed by the forecast for one variable.
///
/// The x axis is the month index: history first, then forecast steps.
pub fn render_forecast_plot(
    variable: Variable,
    history: &[f64],
    forecast: &[f64],
    bands: Option<Bands<'_>>,
    width: usize,
    height: usize,
) -> String {
    let width = width.max(10);
    let height = height.max(5);

    let n = history.len() + forecast.len();
    let (x_min, x_max) = if n >= 2 { (0.0, (n - 1) as f64) } else { (0.0, 1.0) };

    let band_values = bands.into_iter().flat_map(|(lo, hi)| lo.iter().chain(hi));
    let (y_min, y_max) =
        y_range(history.iter().chain(forecast).chain(band_values)).unwrap_or((0.0, 1.0));
    let (y_min, y_max) = pad_range(y_min, y_max, 0.05);

    let mut grid = vec![vec![' '; width]; height];
    let to_cell = |i: usize, y: f64| {
        (
            map_x(i as f64, x_min, x_max, width),
            map_y(y, y_min, y_max, height),
        )
    };

    // Forecast path, anchored on the last observation so the two connect.
    let offset = history.len();
    let mut path: Vec<(usize, usize)> = Vec::with_capacity(forecast.len() + 1);
    if let Some(&last) = history.last() {
        path.push(to_cell(offset - 1, last));
    }
    path.extend(forecast.iter().enumerate().map(|(i, &y)| to_cell(offset + i, y)));
    draw_path(&mut grid, &path, '-');

    // Bands only fill empty cells, so the forecast line stays visible.
    if let Some((lower, upper)) = bands {
        for bound in [lower, upper] {
            let cells: Vec<(usize, usize)> = bound
                .iter()
                .enumerate()
                .map(|(i, &y)| to_cell(offset + i, y))
                .collect();
            draw_path(&mut grid, &cells, '.');
        }
    }

    for (i, &y) in history.iter().enumerate() {
        let (x, yy) = to_cell(i, y);
        grid[yy][x] = 'o';
    }
    for (i, &y) in forecast.iter().enumerate() {
        let (x, yy) = to_cell(offset + i, y);
        grid[yy][x] = '*';
    }

    // Build final string. We include a small header with ranges.
    let mut out = String::new();
    out.push_str(&format!(
        "Plot: {} | history={} forecast={} | y=[{y_min:.2}, {y_max:.2}]{}\n",
        variable.display_name(),
        history.len(),
        forecast.len(),
        variable.unit_label(),
    ));

    for row in grid {
        out.push_str(&row.into_iter().collect::<String>());
        out.push('\n');
    }

    out
}

fn y_range<'a>(values: impl Iterator<Item = &'a f64>) -> Option<(f64, f64)> {
    let mut min_y = f64::INFINITY;
    let mut max_y = f64::NEG_INFINITY;
    for &y in values {
        if y.is_finite() {
            min_y = min_y.min(y);
            max_y = max_y.max(y);
        }
    }

    if min_y.is_finite() && max_y.is_finite() && max_y > min_y {
        Some((min_y, max_y))
    } else if min_y.is_finite() {
        // Flat series: center it.
        Some((min_y - 0.5, min_y + 0.5))
    } else {
        None
    }
}

fn pad_range(min: f64, max: f64, frac: f64) -> (f64, f64) {
    let span = (max - min).abs();
    let pad = (span * frac).max(1e-12);
    (min - pad, max + pad)
}

fn map_x(t: f64, t_min: f64, t_max: f64, width: usize) -> usize {
    let width = width.max(2);
    let u = ((t - t_min) / (t_max - t_min)).clamp(0.0, 1.0);
    (u * (width as f64 - 1.0)).round() as usize
}

fn map_y(y: f64, y_min: f64, y_max: f64, height: usize) -> usize {
    let height = height.max(2);
    let u = ((y - y_min) / (y_max - y_min)).clamp(0.0, 1.0);
    // y=top is max -> row 0
    (height as f64 - 1.0 - (u * (height as f64 - 1.0))).round() as usize
}

fn draw_path(grid: &mut [Vec<char>], cells: &[(usize, usize)], ch: char) {
    match cells {
        [] => {}
        [(x, y)] => {
            if grid[*y][*x] == ' ' {
                grid[*y][*x] = ch;
            }
        }
        _ => {
            for pair in cells.windows(2) {
                let ((x0, y0), (x1, y1)) = (pair[0], pair[1]);
                draw_line(grid, x0, y0, x1, y1, ch);
            }
        }
    }
}

/// Integer line drawing (Bresenham-ish).
fn draw_line(grid: &mut [Vec<char>], x0: usize, y0: usize, x1: usize, y1: usize, ch: char) {
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
            && (y0 as usize) < grid.len()
            && x0 >= 0
            && (x0 as usize) < grid[0].len()
            && grid[y0 as usize][x0 as usize] == ' '
        {
            grid[y0 as usize][x0 as usize] = ch;
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
