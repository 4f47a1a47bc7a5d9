//! Ratatui-based terminal UI.
//!
//! The TUI provides a settings panel for choosing the displayed variable, the
//! maximum lag for selection, an optional lag override, and the forecast
//! horizon, then renders history + forecast and the model diagnostics.

use std::io;
use std::time::Duration;

use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{
    Terminal,
    backend::CrosstermBackend,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Clear, List, ListItem, Paragraph},
};

use crate::app::pipeline::{self, ModelSettings};
use crate::cli::TuiArgs;
use crate::domain::{DataSource, ForecastTable, VarSeriesTable, Variable};
use crate::error::AppError;
use crate::var::VarModelBuilder;

mod plotters_chart;

use plotters_chart::ForecastPlottersChart;

/// Months of history drawn left of the forecast.
const HISTORY_MONTHS: usize = 60;

/// Number of rows in the settings list.
const FIELD_COUNT: usize = 4;

/// Start the TUI.
pub fn run(args: TuiArgs) -> Result<(), AppError> {
    // Load before touching the terminal so input errors print normally.
    let mut app = App::new(args)?;

    let _guard = TerminalGuard::new()?;

    let backend = CrosstermBackend::new(io::stdout());
    let mut terminal = Terminal::new(backend)
        .map_err(|e| AppError::new(4, format!("Failed to initialize terminal: {e}")))?;

    app.event_loop(&mut terminal)
}

/// Ensures the terminal is restored (raw mode, alternate screen) on exit.
struct TerminalGuard;

impl TerminalGuard {
    fn new() -> Result<Self, AppError> {
        enable_raw_mode().map_err(|e| AppError::new(4, format!("Failed to enable raw mode: {e}")))?;
        if let Err(e) = execute!(io::stdout(), EnterAlternateScreen) {
            let _ = disable_raw_mode();
            return Err(AppError::new(4, format!("Failed to enter alternate screen: {e}")));
        }
        Ok(Self)
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        let _ = disable_raw_mode();
        let _ = execute!(io::stdout(), LeaveAlternateScreen);
    }
}

struct App {
    args: TuiArgs,
    source: DataSource,
    data: VarSeriesTable,
    settings: ModelSettings,
    variable: Variable,
    selected_field: usize,
    status: String,
    run: Option<(VarModelBuilder, ForecastTable)>,
}

impl App {
    fn new(args: TuiArgs) -> Result<Self, AppError> {
        let source = args.data.source();
        let (raw, _) = pipeline::load_raw(&source)?;
        let data = pipeline::prepare(&raw, false)?;
        let settings = ModelSettings {
            max_lags: args.max_lags,
            lag_order: None,
            skip_selection: false,
            steps: args.steps,
        };
        let mut app = Self {
            args,
            source,
            data,
            settings,
            variable: Variable::GdpGrowth,
            selected_field: 0,
            status: String::new(),
            run: None,
        };
        app.refit();
        Ok(app)
    }

    fn event_loop<B: ratatui::backend::Backend>(&mut self, terminal: &mut Terminal<B>) -> Result<(), AppError> {
        let mut needs_redraw = true;
        loop {
            if needs_redraw {
                terminal
                    .draw(|f| self.draw(f))
                    .map_err(|e| AppError::new(4, format!("Terminal draw error: {e}")))?;
                needs_redraw = false;
            }

            if !event::poll(Duration::from_millis(100))
                .map_err(|e| AppError::new(4, format!("Event poll error: {e}")))?
            {
                continue;
            }

            match event::read().map_err(|e| AppError::new(4, format!("Event read error: {e}")))? {
                Event::Key(key) => {
                    if key.kind != KeyEventKind::Press {
                        continue;
                    }
                    if self.handle_key(key.code)? {
                        break;
                    }
                    needs_redraw = true;
                }
                Event::Resize(_, _) => {
                    needs_redraw = true;
                }
                _ => {}
            }
        }
        Ok(())
    }

    fn handle_key(&mut self, code: KeyCode) -> Result<bool, AppError> {
        match code {
            KeyCode::Char('q') | KeyCode::Esc => return Ok(true),
            KeyCode::Up => {
                if self.selected_field > 0 {
                    self.selected_field -= 1;
                }
            }
            KeyCode::Down => {
                if self.selected_field + 1 < FIELD_COUNT {
                    self.selected_field += 1;
                }
            }
            KeyCode::Left => self.adjust_field(-1),
            KeyCode::Right => self.adjust_field(1),
            KeyCode::Tab => {
                self.variable = self.variable.next();
                self.status = format!("variable: {}", self.variable.display_name());
            }
            KeyCode::BackTab => {
                self.variable = self.variable.prev();
                self.status = format!("variable: {}", self.variable.display_name());
            }
            KeyCode::Char('r') => self.resample()?,
            KeyCode::Char('s') => self.save_model(),
            KeyCode::Char('e') => self.export_forecast(),
            _ => {}
        }

        Ok(false)
    }

    fn adjust_field(&mut self, delta: i32) {
        match self.selected_field {
            0 => {
                self.variable = if delta >= 0 {
                    self.variable.next()
                } else {
                    self.variable.prev()
                };
                self.status = format!("variable: {}", self.variable.display_name());
            }
            1 => {
                self.settings.max_lags = step_usize(self.settings.max_lags, delta, 1, 24);
                self.refit();
            }
            2 => {
                self.settings.lag_order = step_lag_override(self.settings.lag_order, delta, self.settings.max_lags);
                self.refit();
            }
            3 => {
                self.settings.steps = step_usize(self.settings.steps, delta * 6, 6, 120);
                self.refit();
            }
            _ => {}
        }
    }

    /// Re-run selection, fit, and forecast from the cached prepared table.
    ///
    /// Failures are shown in the status line; the previous fit stays on screen.
    fn refit(&mut self) {
        match pipeline::fit_and_forecast(self.data.clone(), &self.settings) {
            Ok(run) => {
                self.status = match run.0.model() {
                    Some(model) => format!("fitted VAR({}) ({:?})", model.lag_order, model.lag_source),
                    None => "fitted".to_string(),
                };
                self.run = Some(run);
            }
            Err(err) => {
                self.status = format!("fit failed: {err}");
            }
        }
    }

    fn resample(&mut self) -> Result<(), AppError> {
        let DataSource::Synthetic(config) = &mut self.source else {
            self.status = "Resampling needs synthetic data (no --data).".to_string();
            return Ok(());
        };
        config.seed = config.seed.wrapping_add(1);
        let seed = config.seed;

        let (raw, _) = pipeline::load_raw(&self.source)?;
        self.data = pipeline::prepare(&raw, false)?;
        self.refit();
        self.status = format!("resampled (seed {seed}); {}", self.status);
        Ok(())
    }

    fn save_model(&mut self) {
        let Some((builder, _)) = &self.run else {
            self.status = "Nothing to save.".to_string();
            return;
        };
        self.status = match crate::io::save_model(&self.args.save_path, builder) {
            Ok(()) => format!("Saved model: {}", self.args.save_path.display()),
            Err(err) => format!("Save failed: {err}"),
        };
    }

    fn export_forecast(&mut self) {
        let Some((_, forecast)) = &self.run else {
            self.status = "Nothing to export.".to_string();
            return;
        };
        self.status = match crate::io::write_forecast_csv(&self.args.export_path, forecast) {
            Ok(()) => format!("Exported forecast: {}", self.args.export_path.display()),
            Err(err) => format!("Export failed: {err}"),
        };
    }

    fn draw(&mut self, frame: &mut ratatui::Frame<'_>) {
        let size = frame.area();
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(4), Constraint::Min(0), Constraint::Length(3)])
            .split(size);

        self.draw_header(frame, chunks[0]);
        self.draw_body(frame, chunks[1]);
        self.draw_footer(frame, chunks[2]);
    }

    fn draw_header(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let mut lines: Vec<Line> = Vec::new();
        lines.push(Line::from(vec![
            Span::styled("mvar", Style::default().fg(Color::Cyan)),
            Span::raw(" - VAR forecast explorer"),
        ]));

        let source = match &self.source {
            DataSource::Csv(path) => path.display().to_string(),
            DataSource::Synthetic(config) => format!("synthetic (seed {})", config.seed),
        };
        lines.push(Line::from(Span::styled(
            format!(
                "data: {source} | months: {} to {} | n={}",
                self.data.first_month().unwrap_or("-"),
                self.data.last_month().unwrap_or("-"),
                self.data.len(),
            ),
            Style::default().fg(Color::Gray),
        )));

        let p = Paragraph::new(Text::from(lines)).block(Block::default().borders(Borders::ALL));
        frame.render_widget(p, area);
    }

    fn draw_body(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Min(0), Constraint::Length(FIELD_COUNT as u16 + 2)])
            .split(area);
        let bottom = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(40), Constraint::Percentage(60)])
            .split(rows[1]);

        self.draw_chart(frame, rows[0]);
        self.draw_settings(frame, bottom[0]);
        self.draw_diagnostics(frame, bottom[1]);
    }

    fn draw_chart(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let title = format!("{} ({})", self.variable.display_name(), self.variable.unit_label());
        let block = Block::default().title(title).borders(Borders::ALL);
        let inner = block.inner(area);
        frame.render_widget(block, area);
        frame.render_widget(Clear, inner);

        let Some((_, forecast)) = &self.run else {
            let msg = Paragraph::new("No fitted model (adjust settings).")
                .style(Style::default().fg(Color::Yellow))
                .block(Block::default());
            frame.render_widget(msg, inner);
            return;
        };

        let series = chart_series(&self.data, forecast, self.variable, HISTORY_MONTHS);

        let (chart_rect, insets) = chart_layout(inner);
        let widget = ForecastPlottersChart {
            history: &series.history,
            forecast: &series.forecast,
            x_bounds: series.x_bounds,
            y_bounds: series.y_bounds,
            x_label: "months from last obs",
            y_label: self.variable.column_name().to_string(),
            fmt_x: fmt_axis_x,
            fmt_y: fmt_axis_y,
        };

        frame.render_widget(widget, chart_rect);
        if let Some(insets) = insets {
            draw_axis_ticks(frame, inner, chart_rect, insets, series.x_bounds, series.y_bounds);
        }
    }

    fn draw_settings(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let lag_label = match self.settings.lag_order {
            Some(p) => p.to_string(),
            None => "auto".to_string(),
        };

        let items = vec![
            ListItem::new(format!("Variable: {}", self.variable.display_name())),
            ListItem::new(format!("Max lags: {}", self.settings.max_lags)),
            ListItem::new(format!("Lag order: {lag_label}")),
            ListItem::new(format!("Steps: {}", self.settings.steps)),
        ];

        let list = List::new(items)
            .block(Block::default().title("Settings").borders(Borders::ALL))
            .highlight_style(Style::default().fg(Color::Black).bg(Color::White))
            .highlight_symbol("» ");

        let mut state = ratatui::widgets::ListState::default();
        state.select(Some(self.selected_field));
        frame.render_stateful_widget(list, area, &mut state);
    }

    fn draw_diagnostics(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let block = Block::default().title("Model").borders(Borders::ALL);
        let lines = match &self.run {
            Some((builder, forecast)) => diagnostics_lines(builder, forecast, self.variable),
            None => vec![Line::from(Span::styled("-", Style::default().fg(Color::Gray)))],
        };
        frame.render_widget(Paragraph::new(Text::from(lines)).block(block), area);
    }

    fn draw_footer(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let help = "↑/↓ select  ←/→ adjust  Tab variable  r resample  s save  e export  q quit";
        let line = Line::from(vec![
            Span::styled(help, Style::default().fg(Color::Gray)),
            Span::raw(" | "),
            Span::styled(&self.status, Style::default().fg(Color::Yellow)),
        ]);
        let p = Paragraph::new(line).block(Block::default().borders(Borders::ALL));
        frame.render_widget(p, area);
    }
}

fn diagnostics_lines(builder: &VarModelBuilder, forecast: &ForecastTable, variable: Variable) -> Vec<Line<'static>> {
    let gray = Style::default().fg(Color::Gray);
    let mut lines = Vec::new();

    if let Some(selection) = builder.lag_selection() {
        lines.push(Line::from(Span::styled(
            format!(
                "selection: aic={} bic={} fpe={} hqic={} -> {}",
                selection.aic_lag, selection.bic_lag, selection.fpe_lag, selection.hqic_lag, selection.optimal_lag
            ),
            gray,
        )));
    }
    if let Ok(diag) = builder.model_diagnostics() {
        lines.push(Line::from(Span::styled(
            format!(
                "VAR({}) llf={:.2} aic={:.4} bic={:.4} nobs={}",
                diag.lag_order, diag.log_likelihood, diag.aic, diag.bic, diag.num_obs
            ),
            Style::default().add_modifier(Modifier::BOLD),
        )));
    }
    let column = forecast.column(variable);
    if let (Some(first), Some(last)) = (column.first(), column.last()) {
        lines.push(Line::from(Span::styled(
            format!(
                "{}: step 1 = {first:.3}{unit}, step {} = {last:.3}{unit}",
                variable.display_name(),
                column.len(),
                unit = variable.unit_label()
            ),
            gray,
        )));
    }
    lines
}

/// Plot-ready series for one variable.
///
/// History sits at `x = -(n-1)..=0`; the forecast line starts at the last
/// observation (x = 0) and runs to `x = steps`.
#[derive(Debug, Clone, PartialEq)]
struct ChartSeries {
    history: Vec<(f64, f64)>,
    forecast: Vec<(f64, f64)>,
    x_bounds: [f64; 2],
    y_bounds: [f64; 2],
}

fn chart_series(data: &VarSeriesTable, forecast: &ForecastTable, variable: Variable, history_len: usize) -> ChartSeries {
    let tail = data.tail(history_len);
    let n = tail.len();
    let history: Vec<(f64, f64)> = tail
        .iter()
        .enumerate()
        .map(|(i, row)| (i as f64 - (n as f64 - 1.0), row.values[variable.index()]))
        .collect();

    let mut forecast_points = Vec::with_capacity(forecast.steps() + 1);
    if let Some(&anchor) = history.last() {
        forecast_points.push(anchor);
    }
    forecast_points.extend(forecast.rows.iter().map(|r| (r.step as f64, r.values[variable.index()])));

    let mut x0 = history.first().map(|p| p.0).unwrap_or(0.0);
    let mut x1 = forecast.steps() as f64;
    if x1 <= x0 {
        x0 -= 1.0;
        x1 += 1.0;
    }

    let (mut y_min, mut y_max) = (f64::INFINITY, f64::NEG_INFINITY);
    for &(_, y) in history.iter().chain(forecast_points.iter()) {
        y_min = y_min.min(y);
        y_max = y_max.max(y);
    }
    if !y_min.is_finite() || !y_max.is_finite() || y_max <= y_min {
        let mid = if y_min.is_finite() { y_min } else { 0.0 };
        y_min = mid - 0.5;
        y_max = mid + 0.5;
    }
    let pad = ((y_max - y_min).abs() * 0.05).max(1e-12);

    ChartSeries {
        history,
        forecast: forecast_points,
        x_bounds: [x0, x1],
        y_bounds: [y_min - pad, y_max + pad],
    }
}

fn step_usize(value: usize, delta: i32, min: usize, max: usize) -> usize {
    let next = if delta >= 0 {
        value.saturating_add(delta as usize)
    } else {
        value.saturating_sub(delta.unsigned_abs() as usize)
    };
    next.clamp(min, max)
}

/// `None` (auto) sits below lag 1; stepping past `max_lags` stays at `max_lags`.
fn step_lag_override(current: Option<usize>, delta: i32, max_lags: usize) -> Option<usize> {
    match (current, delta >= 0) {
        (None, true) => Some(1),
        (None, false) => None,
        (Some(1), false) => None,
        (Some(p), false) => Some(p - 1),
        (Some(p), true) => Some((p + 1).min(max_lags.max(1))),
    }
}

fn fmt_axis_x(v: f64) -> String {
    format!("{v:.0}")
}

fn fmt_axis_y(v: f64) -> String {
    format!("{v:.2}")
}

#[derive(Debug, Clone, Copy)]
struct AxisInsets {
    left: u16,
    right: u16,
    top: u16,
    bottom: u16,
}

fn chart_layout(inner: Rect) -> (Rect, Option<AxisInsets>) {
    let insets = AxisInsets {
        left: 8,
        right: 2,
        top: 1,
        bottom: 2,
    };

    if inner.width <= insets.left + insets.right + 10 || inner.height <= insets.top + insets.bottom + 5 {
        return (inner, None);
    }

    let rect = Rect {
        x: inner.x + insets.left,
        y: inner.y + insets.top,
        width: inner.width - insets.left - insets.right,
        height: inner.height - insets.top - insets.bottom,
    };

    (rect, Some(insets))
}

fn draw_axis_ticks(
    frame: &mut ratatui::Frame<'_>,
    inner: Rect,
    chart: Rect,
    insets: AxisInsets,
    x_bounds: [f64; 2],
    y_bounds: [f64; 2],
) {
    let ticks = 5usize;
    let style = Style::default().fg(Color::Gray);

    for i in 0..ticks {
        let u = i as f64 / (ticks as f64 - 1.0);
        let x_val = x_bounds[0] + u * (x_bounds[1] - x_bounds[0]);
        let x = chart.x + ((chart.width - 1) as f64 * u).round() as u16;
        let label = fmt_axis_x(x_val);
        let label_len = label.len() as u16;
        let start = x.saturating_sub((label.len() / 2) as u16);
        let y = chart.y + chart.height;
        if y >= inner.y + inner.height - 1 {
            continue;
        }
        frame.render_widget(
            Paragraph::new(label).style(style),
            Rect {
                x: start,
                y,
                width: label_len,
                height: 1,
            },
        );
    }

    for i in 0..ticks {
        let u = i as f64 / (ticks as f64 - 1.0);
        let y_val = y_bounds[0] + u * (y_bounds[1] - y_bounds[0]);
        let y = chart.y + (chart.height - 1) - ((chart.height - 1) as f64 * u).round() as u16;
        let label = format!("{y_val:.1}");
        let label_len = label.len() as u16;
        let x = inner.x + insets.left.saturating_sub(1);
        let start = x.saturating_sub(label.len() as u16);
        if start < inner.x {
            continue;
        }
        frame.render_widget(
            Paragraph::new(label).style(style),
            Rect {
                x: start,
                y,
                width: label_len,
                height: 1,
            },
        );
    }

    let x_label = Paragraph::new("months from last obs")
        .alignment(Alignment::Center)
        .style(Style::default().fg(Color::Gray));
    let x_rect = Rect {
        x: chart.x,
        y: chart.y + chart.height + 1,
        width: chart.width,
        height: 1,
    };
    if x_rect.y < inner.y + inner.height {
        frame.render_widget(x_label, x_rect);
    }
}
