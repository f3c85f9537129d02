use crate::config::ChartConfig;
use crate::model::LagSeries;
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

const MARGIN_LEFT: f64 = 90.0;
const MARGIN_RIGHT: f64 = 220.0;
const MARGIN_TOP: f64 = 60.0;
const MARGIN_BOTTOM: f64 = 110.0;
const MIN_PLOT_SIZE: f64 = 100.0;

pub const MIN_CHART_WIDTH: f64 = MARGIN_LEFT + MARGIN_RIGHT + MIN_PLOT_SIZE;
pub const MIN_CHART_HEIGHT: f64 = MARGIN_TOP + MARGIN_BOTTOM + MIN_PLOT_SIZE;
const DAYS_PER_YEAR: f64 = 365.0;

const PALETTE: [&str; 10] = [
    "#1f77b4", "#ff7f0e", "#2ca02c", "#d62728", "#9467bd", "#8c564b", "#e377c2", "#7f7f7f",
    "#bcbd22", "#17becf",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChartOutcome {
    Written(PathBuf),
    Skipped,
}

pub fn chart_title(target: &str) -> String {
    format!("Lag Trends for '{target}' Column")
}

pub fn chart_file_name(title: &str) -> String {
    let stem = title
        .to_lowercase()
        .replace(' ', "_")
        .replace(['\'', '"'], "");
    format!("{stem}.svg")
}

pub fn render_lag_chart(
    series: &LagSeries,
    title: &str,
    chart: &ChartConfig,
) -> Result<ChartOutcome> {
    if series.is_empty() {
        return Ok(ChartOutcome::Skipped);
    }

    let file_name = chart
        .file_name
        .clone()
        .unwrap_or_else(|| chart_file_name(title));
    let path = chart.out_dir.join(file_name);
    write_svg(series, title, chart.width, chart.height, &path)?;
    Ok(ChartOutcome::Written(path))
}

struct Frame {
    width: f64,
    height: f64,
    points: usize,
    y_min: f64,
    y_max: f64,
}

impl Frame {
    fn plot_width(&self) -> f64 {
        self.width - MARGIN_LEFT - MARGIN_RIGHT
    }

    fn plot_height(&self) -> f64 {
        self.height - MARGIN_TOP - MARGIN_BOTTOM
    }

    fn bottom(&self) -> f64 {
        MARGIN_TOP + self.plot_height()
    }

    fn x(&self, index: usize) -> f64 {
        if self.points <= 1 {
            return MARGIN_LEFT + self.plot_width() / 2.0;
        }
        MARGIN_LEFT + self.plot_width() * index as f64 / (self.points - 1) as f64
    }

    fn y(&self, years: f64) -> f64 {
        let span = self.y_max - self.y_min;
        self.bottom() - (years - self.y_min) / span * self.plot_height()
    }
}

fn write_svg(series: &LagSeries, title: &str, width: u32, height: u32, path: &Path) -> Result<()> {
    let years = series
        .series
        .values()
        .flatten()
        .filter_map(|v| v.days())
        .map(|d| d as f64 / DAYS_PER_YEAR)
        .collect::<Vec<_>>();
    let y_min = years.iter().copied().fold(0.0_f64, f64::min).floor();
    let y_max = years
        .iter()
        .copied()
        .fold(y_min + 1.0, f64::max)
        .ceil();

    let frame = Frame {
        width: width as f64,
        height: height as f64,
        points: series.month_axis.len(),
        y_min,
        y_max,
    };

    let mut lines = Vec::new();
    push_line(
        &mut lines,
        format!(
            r#"<svg xmlns="http://www.w3.org/2000/svg" width="{width}" height="{height}" viewBox="0 0 {width} {height}" font-family="sans-serif">"#
        ),
    );
    push_line(
        &mut lines,
        format!(r#"<rect width="{width}" height="{height}" fill="white"/>"#),
    );
    push_line(
        &mut lines,
        format!(
            r#"<text x="{:.1}" y="32" font-size="20" text-anchor="middle">{}</text>"#,
            frame.width / 2.0,
            escape_text(title)
        ),
    );

    append_y_axis(&mut lines, &frame);
    append_x_axis(&mut lines, &frame, &series.month_axis);

    for (slot, (category, values)) in series.series.iter().enumerate() {
        let color = PALETTE[slot % PALETTE.len()];
        append_series(&mut lines, &frame, values.iter().map(|v| v.days()), color);
        append_legend_entry(&mut lines, &frame, slot, category, color);
    }

    push_line(&mut lines, "</svg>".to_string());

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create chart dir {}", parent.display()))?;
    }

    std::fs::write(path, lines.join("\n") + "\n")
        .with_context(|| format!("failed to write chart {}", path.display()))?;

    Ok(())
}

fn append_y_axis(lines: &mut Vec<String>, frame: &Frame) {
    let span = frame.y_max - frame.y_min;
    let step = (span / 8.0).ceil().max(1.0);
    let right = MARGIN_LEFT + frame.plot_width();

    let mut tick = frame.y_min;
    while tick <= frame.y_max + f64::EPSILON {
        let y = frame.y(tick);
        push_line(
            lines,
            format!(
                r##"<line x1="{MARGIN_LEFT:.1}" y1="{y:.1}" x2="{right:.1}" y2="{y:.1}" stroke="#cccccc" stroke-width="0.5" stroke-dasharray="4 3"/>"##
            ),
        );
        push_line(
            lines,
            format!(
                r#"<text x="{:.1}" y="{:.1}" font-size="12" text-anchor="end">{tick:.0}</text>"#,
                MARGIN_LEFT - 8.0,
                y + 4.0
            ),
        );
        tick += step;
    }

    push_line(
        lines,
        format!(
            r#"<line x1="{MARGIN_LEFT:.1}" y1="{MARGIN_TOP:.1}" x2="{MARGIN_LEFT:.1}" y2="{:.1}" stroke="black"/>"#,
            frame.bottom()
        ),
    );
    let mid = MARGIN_TOP + frame.plot_height() / 2.0;
    push_line(
        lines,
        format!(
            r#"<text x="30" y="{mid:.1}" font-size="14" text-anchor="middle" transform="rotate(-90 30 {mid:.1})">Lag (Years)</text>"#
        ),
    );
}

// Years get a labelled, gridded major tick; every other month a minor tick.
fn append_x_axis(lines: &mut Vec<String>, frame: &Frame, month_axis: &[String]) {
    let bottom = frame.bottom();
    let right = MARGIN_LEFT + frame.plot_width();

    for (index, label) in month_axis.iter().enumerate() {
        let x = frame.x(index);
        if label.starts_with("Jan") {
            push_line(
                lines,
                format!(
                    r##"<line x1="{x:.1}" y1="{MARGIN_TOP:.1}" x2="{x:.1}" y2="{bottom:.1}" stroke="#cccccc" stroke-width="0.5" stroke-dasharray="4 3"/>"##
                ),
            );
            push_line(
                lines,
                format!(
                    r#"<line x1="{x:.1}" y1="{bottom:.1}" x2="{x:.1}" y2="{:.1}" stroke="black"/>"#,
                    bottom + 6.0
                ),
            );
            let ty = bottom + 18.0;
            push_line(
                lines,
                format!(
                    r#"<text x="{x:.1}" y="{ty:.1}" font-size="11" text-anchor="end" transform="rotate(-45 {x:.1} {ty:.1})">{}</text>"#,
                    escape_text(label)
                ),
            );
        } else {
            push_line(
                lines,
                format!(
                    r#"<line x1="{x:.1}" y1="{bottom:.1}" x2="{x:.1}" y2="{:.1}" stroke="black" stroke-width="0.5"/>"#,
                    bottom + 3.0
                ),
            );
        }
    }

    push_line(
        lines,
        format!(
            r#"<line x1="{MARGIN_LEFT:.1}" y1="{bottom:.1}" x2="{right:.1}" y2="{bottom:.1}" stroke="black"/>"#
        ),
    );
    push_line(
        lines,
        format!(
            r#"<text x="{:.1}" y="{:.1}" font-size="14" text-anchor="middle">Timeline (Visa Bulletin Date)</text>"#,
            MARGIN_LEFT + frame.plot_width() / 2.0,
            frame.height - 16.0
        ),
    );
}

// Missing values break the line; each run of present values is its own
// polyline.
fn append_series(
    lines: &mut Vec<String>,
    frame: &Frame,
    values: impl Iterator<Item = Option<i64>>,
    color: &str,
) {
    let mut runs: Vec<Vec<(f64, f64)>> = vec![Vec::new()];
    for (index, value) in values.enumerate() {
        match value {
            Some(days) => {
                let point = (frame.x(index), frame.y(days as f64 / DAYS_PER_YEAR));
                if let Some(run) = runs.last_mut() {
                    run.push(point);
                }
            }
            None => {
                if runs.last().is_some_and(|run| !run.is_empty()) {
                    runs.push(Vec::new());
                }
            }
        }
    }

    for run in runs.iter().filter(|run| !run.is_empty()) {
        if run.len() > 1 {
            let points = run
                .iter()
                .map(|(x, y)| format!("{x:.1},{y:.1}"))
                .collect::<Vec<_>>()
                .join(" ");
            push_line(
                lines,
                format!(
                    r#"<polyline points="{points}" fill="none" stroke="{color}" stroke-width="1.5"/>"#
                ),
            );
        }
        for (x, y) in run {
            push_line(
                lines,
                format!(r#"<circle cx="{x:.1}" cy="{y:.1}" r="3" fill="{color}"/>"#),
            );
        }
    }
}

fn append_legend_entry(lines: &mut Vec<String>, frame: &Frame, slot: usize, label: &str, color: &str) {
    let x = frame.width - MARGIN_RIGHT + 20.0;
    let y = MARGIN_TOP + 10.0 + slot as f64 * 22.0;
    push_line(
        lines,
        format!(
            r#"<line x1="{x:.1}" y1="{y:.1}" x2="{:.1}" y2="{y:.1}" stroke="{color}" stroke-width="2"/>"#,
            x + 24.0
        ),
    );
    push_line(
        lines,
        format!(r#"<circle cx="{:.1}" cy="{y:.1}" r="3" fill="{color}"/>"#, x + 12.0),
    );
    push_line(
        lines,
        format!(
            r#"<text x="{:.1}" y="{:.1}" font-size="13">{}</text>"#,
            x + 32.0,
            y + 4.0,
            escape_text(label)
        ),
    );
}

// Children of the root element are indented one level.
fn push_line(lines: &mut Vec<String>, line: String) {
    if lines.is_empty() || line == "</svg>" {
        lines.push(line);
    } else {
        lines.push(format!("  {line}"));
    }
}

fn escape_text(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}
