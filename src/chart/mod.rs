//! Character-grid line chart for a single time series.
//!
//! Pure and stateless: `render` recomputes everything from the points it is
//! given, so it can be called on every redraw.

use std::error::Error;
use std::fmt;

use chrono::{DateTime, Local};

const POINT: char = '●';
const FALLING: char = '╲';
const RISING: char = '╱';
const AXIS_CORNER: char = '└';
const AXIS_LINE: char = '─';
const LABEL_BAR: char = '│';
const TIME_FORMAT: &str = "%H:%M:%S";

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ChartPoint {
    pub timestamp: DateTime<Local>,
    pub value: f64,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ChartError {
    InsufficientData { points: usize },
    TooSmall { width: usize, height: usize },
}

impl fmt::Display for ChartError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChartError::InsufficientData { points } => {
                write!(f, "need at least 2 data points, have {points}")
            }
            ChartError::TooSmall { width, height } => {
                write!(f, "chart area {width}x{height} is too small")
            }
        }
    }
}

impl Error for ChartError {}

/// A rendered chart: `rows` top to bottom, then the axis and the time line.
#[derive(Clone, Debug, PartialEq)]
pub struct ChartGrid {
    pub min: f64,
    pub max: f64,
    /// Columns taken by the y labels, including the bar.
    pub label_width: usize,
    pub rows: Vec<String>,
    pub axis: String,
    pub time_axis: String,
}

impl ChartGrid {
    pub fn plot_width(&self) -> usize {
        self.axis.chars().count().saturating_sub(self.label_width)
    }

    pub fn lines(&self) -> impl Iterator<Item = &str> {
        self.rows
            .iter()
            .map(String::as_str)
            .chain([self.axis.as_str(), self.time_axis.as_str()])
    }
}

pub fn render(points: &[ChartPoint], width: usize, height: usize) -> Result<ChartGrid, ChartError> {
    if points.len() < 2 {
        return Err(ChartError::InsufficientData {
            points: points.len(),
        });
    }
    if height < 2 {
        return Err(ChartError::TooSmall { width, height });
    }

    let (min, max) = points.iter().fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), p| {
        (lo.min(p.value), hi.max(p.value))
    });
    let range = if max - min == 0.0 { 1.0 } else { max - min };

    let thresholds: Vec<f64> = (0..height)
        .map(|row| min + range * (height - 1 - row) as f64 / (height - 1) as f64)
        .collect();
    let labels: Vec<String> = thresholds.iter().map(|t| format!("{t:.1}")).collect();
    let label_chars = labels.iter().map(|l| l.chars().count()).max().unwrap_or(0);
    let label_width = label_chars + 1;

    if width <= label_width {
        return Err(ChartError::TooSmall { width, height });
    }
    let plot_width = width - label_width;

    let columns: Vec<usize> = (0..plot_width)
        .map(|col| source_index(col, plot_width, points.len()))
        .collect();
    let tolerance = range / height as f64;

    let rows = thresholds
        .iter()
        .zip(&labels)
        .map(|(&threshold, label)| {
            let mut line = format!("{label:>label_chars$}{LABEL_BAR}");
            line.extend(columns.iter().map(|&idx| {
                let value = points[idx].value;
                let next = points.get(idx + 1).map(|p| p.value);
                cell(value, next, threshold, tolerance)
            }));
            line
        })
        .collect();

    let mut axis = " ".repeat(label_width - 1);
    axis.push(AXIS_CORNER);
    axis.extend(std::iter::repeat_n(AXIS_LINE, plot_width));

    let time_axis = time_line(points, label_width, plot_width);

    Ok(ChartGrid {
        min,
        max,
        label_width,
        rows,
        axis,
        time_axis,
    })
}

/// Maps a plot column to a point index so that the first column shows the
/// first point and the last column the last one. Scaling by `plot_width`
/// instead of `plot_width - 1` would pin every column of a two-point series
/// to the first point.
fn source_index(col: usize, plot_width: usize, len: usize) -> usize {
    if plot_width <= 1 {
        return 0;
    }
    (col * (len - 1) / (plot_width - 1)).min(len - 1)
}

fn cell(value: f64, next: Option<f64>, threshold: f64, tolerance: f64) -> char {
    if (value - threshold).abs() < tolerance {
        return POINT;
    }
    match next {
        Some(next) if value > threshold && next <= threshold => FALLING,
        Some(next) if value < threshold && next >= threshold => RISING,
        _ => ' ',
    }
}

/// Start and end stamps under the plot, exactly `label_width + plot_width`
/// wide. The end stamp is dropped when both do not fit.
fn time_line(points: &[ChartPoint], label_width: usize, plot_width: usize) -> String {
    let (Some(first), Some(last)) = (points.first(), points.last()) else {
        return " ".repeat(label_width + plot_width);
    };
    let start = first.timestamp.format(TIME_FORMAT).to_string();
    let end = last.timestamp.format(TIME_FORMAT).to_string();

    let mut line = " ".repeat(label_width);
    if start.len() + end.len() < plot_width {
        let gap = plot_width - start.len() - end.len();
        line.push_str(&start);
        line.push_str(&" ".repeat(gap));
        line.push_str(&end);
    } else {
        line.extend(start.chars().take(plot_width));
        let used = start.len().min(plot_width);
        line.push_str(&" ".repeat(plot_width - used));
    }
    line
}
