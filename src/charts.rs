//! Chart selection and data preparation from the filtered table.
//!
//! Each chart kind is independently toggled and has type preconditions
//! (numeric/categorical column counts). A kind whose preconditions are not
//! met is silently suppressed rather than erroring. Data is extracted into
//! plain point/bin structures so rendering is backend-agnostic.

use color_eyre::Result;
use polars::prelude::*;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Cap on rows pulled into chart data structures.
const CHART_ROW_LIMIT: usize = 10_000;

/// Default number of histogram bins.
pub const DEFAULT_HISTOGRAM_BINS: usize = 20;

/// The available chart kinds, in report order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ChartKind {
    Histogram,
    Scatter,
    Correlation,
    Box,
    Violin,
    Count,
    ScatterMatrix,
}

impl ChartKind {
    pub const ALL: [Self; 7] = [
        Self::Histogram,
        Self::Scatter,
        Self::Correlation,
        Self::Box,
        Self::Violin,
        Self::Count,
        Self::ScatterMatrix,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Histogram => "histogram",
            Self::Scatter => "scatter",
            Self::Correlation => "correlation",
            Self::Box => "box",
            Self::Violin => "violin",
            Self::Count => "count",
            Self::ScatterMatrix => "matrix",
        }
    }
}

impl fmt::Display for ChartKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ChartKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "histogram" | "hist" => Ok(Self::Histogram),
            "scatter" => Ok(Self::Scatter),
            "correlation" | "corr" => Ok(Self::Correlation),
            "box" | "boxplot" => Ok(Self::Box),
            "violin" => Ok(Self::Violin),
            "count" | "countplot" => Ok(Self::Count),
            "matrix" | "scatter-matrix" => Ok(Self::ScatterMatrix),
            other => Err(format!("unknown chart kind: {}", other)),
        }
    }
}

/// Which chart kinds are enabled. Defaults mirror the dashboard: histogram,
/// scatter, and correlation on, the rest opt-in.
#[derive(Clone, Debug)]
pub struct ChartToggles {
    pub histogram: bool,
    pub scatter: bool,
    pub correlation: bool,
    pub box_plot: bool,
    pub violin: bool,
    pub count: bool,
    pub matrix: bool,
}

impl Default for ChartToggles {
    fn default() -> Self {
        Self {
            histogram: true,
            scatter: true,
            correlation: true,
            box_plot: false,
            violin: false,
            count: false,
            matrix: false,
        }
    }
}

impl ChartToggles {
    pub fn none() -> Self {
        Self {
            histogram: false,
            scatter: false,
            correlation: false,
            box_plot: false,
            violin: false,
            count: false,
            matrix: false,
        }
    }

    pub fn is_enabled(&self, kind: ChartKind) -> bool {
        match kind {
            ChartKind::Histogram => self.histogram,
            ChartKind::Scatter => self.scatter,
            ChartKind::Correlation => self.correlation,
            ChartKind::Box => self.box_plot,
            ChartKind::Violin => self.violin,
            ChartKind::Count => self.count,
            ChartKind::ScatterMatrix => self.matrix,
        }
    }

    pub fn set(&mut self, kind: ChartKind, on: bool) {
        match kind {
            ChartKind::Histogram => self.histogram = on,
            ChartKind::Scatter => self.scatter = on,
            ChartKind::Correlation => self.correlation = on,
            ChartKind::Box => self.box_plot = on,
            ChartKind::Violin => self.violin = on,
            ChartKind::Count => self.count = on,
            ChartKind::ScatterMatrix => self.matrix = on,
        }
    }
}

/// Column choices for the charts that need them. Every field falls back to a
/// sensible default derived from the table when unset.
#[derive(Clone, Debug, Default)]
pub struct ChartSelection {
    pub x: Option<String>,
    pub y: Option<String>,
    pub color: Option<String>,
    pub box_column: Option<String>,
    pub violin_numeric: Option<String>,
    pub violin_categorical: Option<String>,
    pub count_column: Option<String>,
    pub matrix_columns: Vec<String>,
}

/// Names of numeric columns, in table order.
pub fn numeric_columns(df: &DataFrame) -> Vec<String> {
    df.get_columns()
        .iter()
        .filter(|c| c.dtype().is_numeric())
        .map(|c| c.name().to_string())
        .collect()
}

/// Names of non-numeric (categorical) columns, in table order.
pub fn categorical_columns(df: &DataFrame) -> Vec<String> {
    df.get_columns()
        .iter()
        .filter(|c| !c.dtype().is_numeric())
        .map(|c| c.name().to_string())
        .collect()
}

/// Five-number summary used by box and violin charts.
#[derive(Clone, Debug, PartialEq)]
pub struct BoxStats {
    pub min: f64,
    pub q1: f64,
    pub median: f64,
    pub q3: f64,
    pub max: f64,
}

/// One scatter trace; `label` is the color-column value when one is chosen.
#[derive(Clone, Debug)]
pub struct ScatterGroup {
    pub label: Option<String>,
    pub points: Vec<(f64, f64)>,
}

/// One violin body: category label, box summary, and a density outline of
/// (value, relative width in 0..1) samples.
#[derive(Clone, Debug)]
pub struct ViolinGroup {
    pub label: String,
    pub stats: BoxStats,
    pub density: Vec<(f64, f64)>,
}

/// Backend-agnostic chart payloads.
#[derive(Clone, Debug)]
pub enum ChartData {
    Histogram {
        column: String,
        edges: Vec<f64>,
        counts: Vec<u32>,
    },
    Scatter {
        x: String,
        y: String,
        groups: Vec<ScatterGroup>,
    },
    Correlation {
        columns: Vec<String>,
        matrix: Vec<Vec<f64>>,
    },
    Box {
        column: String,
        stats: BoxStats,
    },
    Violin {
        numeric: String,
        categorical: String,
        groups: Vec<ViolinGroup>,
    },
    Count {
        column: String,
        labels: Vec<String>,
        counts: Vec<u32>,
    },
    ScatterMatrix {
        columns: Vec<String>,
        cells: Vec<Vec<Vec<(f64, f64)>>>,
    },
}

/// A rendered-chart artifact: payload plus an optional analyst comment.
/// Empty comments are treated as absent in reports.
#[derive(Clone, Debug)]
pub struct Chart {
    pub kind: ChartKind,
    pub title: String,
    pub data: ChartData,
    pub comment: Option<String>,
}

impl Chart {
    pub fn set_comment(&mut self, text: &str) {
        let trimmed = text.trim();
        self.comment = if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        };
    }
}

/// Builds the enabled charts from the filtered table, in report order.
/// Charts whose preconditions fail are skipped without error.
pub fn build_charts(
    df: &DataFrame,
    toggles: &ChartToggles,
    selection: &ChartSelection,
    histogram_bins: usize,
) -> Result<Vec<Chart>> {
    let numeric = numeric_columns(df);
    let categorical = categorical_columns(df);
    let mut charts = Vec::new();

    let x_col = selection.x.clone().or_else(|| numeric.first().cloned());
    let y_col = selection
        .y
        .clone()
        .or_else(|| numeric.get(1).or_else(|| numeric.first()).cloned());

    if toggles.histogram {
        if let Some(x) = &x_col {
            if let Some(data) = histogram(df, x, histogram_bins)? {
                charts.push(Chart {
                    kind: ChartKind::Histogram,
                    title: format!("Histogram: {}", x),
                    data,
                    comment: None,
                });
            }
        }
    }

    if toggles.scatter {
        if let (Some(x), Some(y)) = (&x_col, &y_col) {
            let data = scatter(df, x, y, selection.color.as_deref())?;
            charts.push(Chart {
                kind: ChartKind::Scatter,
                title: format!("Wykres punktowy: {} vs {}", x, y),
                data,
                comment: None,
            });
        }
    }

    if toggles.correlation && numeric.len() >= 2 {
        let data = correlation(df, &numeric)?;
        charts.push(Chart {
            kind: ChartKind::Correlation,
            title: "Heatmapa korelacji".to_string(),
            data,
            comment: None,
        });
    }

    if toggles.box_plot {
        let column = selection
            .box_column
            .clone()
            .or_else(|| numeric.first().cloned());
        if let Some(column) = column {
            let values = column_f64_values(df, &column)?;
            if !values.is_empty() {
                charts.push(Chart {
                    kind: ChartKind::Box,
                    title: format!("Boxplot: {}", column),
                    data: ChartData::Box {
                        stats: box_stats(&values),
                        column,
                    },
                    comment: None,
                });
            }
        }
    }

    if toggles.violin && !numeric.is_empty() && !categorical.is_empty() {
        let num = selection
            .violin_numeric
            .clone()
            .unwrap_or_else(|| numeric[0].clone());
        let cat = selection
            .violin_categorical
            .clone()
            .unwrap_or_else(|| categorical[0].clone());
        if let Some(data) = violin(df, &num, &cat)? {
            charts.push(Chart {
                kind: ChartKind::Violin,
                title: format!("Violin: {} wg {}", num, cat),
                data,
                comment: None,
            });
        }
    }

    if toggles.count && !categorical.is_empty() {
        let column = selection
            .count_column
            .clone()
            .unwrap_or_else(|| categorical[0].clone());
        let data = count(df, &column)?;
        charts.push(Chart {
            kind: ChartKind::Count,
            title: format!("Countplot: {}", column),
            data,
            comment: None,
        });
    }

    if toggles.matrix && numeric.len() >= 2 {
        let columns: Vec<String> = if selection.matrix_columns.len() >= 2 {
            selection.matrix_columns.clone()
        } else {
            numeric.iter().take(4).cloned().collect()
        };
        if columns.len() >= 2 {
            let data = scatter_matrix(df, &columns)?;
            charts.push(Chart {
                kind: ChartKind::ScatterMatrix,
                title: "Scatter Matrix".to_string(),
                data,
                comment: None,
            });
        }
    }

    Ok(charts)
}

/// Finite non-null values of a numeric column, capped at the row limit.
fn column_f64_values(df: &DataFrame, column: &str) -> Result<Vec<f64>> {
    let series = df.column(column)?.as_materialized_series().clone();
    if !series.dtype().is_numeric() {
        return Ok(Vec::new());
    }
    let f = series.cast(&DataType::Float64)?;
    Ok(f.f64()?
        .into_iter()
        .flatten()
        .filter(|v| v.is_finite())
        .take(CHART_ROW_LIMIT)
        .collect())
}

/// Row-aligned (x, y) pairs with nulls and non-finite values dropped.
fn paired_values(df: &DataFrame, x: &str, y: &str) -> Result<Vec<(f64, f64)>> {
    let xs = df
        .column(x)?
        .as_materialized_series()
        .cast(&DataType::Float64)?;
    let ys = df
        .column(y)?
        .as_materialized_series()
        .cast(&DataType::Float64)?;
    let xs = xs.f64()?;
    let ys = ys.f64()?;
    let mut points = Vec::new();
    for (xv, yv) in xs.into_iter().zip(ys.into_iter()) {
        if let (Some(xv), Some(yv)) = (xv, yv) {
            if xv.is_finite() && yv.is_finite() {
                points.push((xv, yv));
                if points.len() >= CHART_ROW_LIMIT {
                    break;
                }
            }
        }
    }
    Ok(points)
}

fn histogram(df: &DataFrame, column: &str, bins: usize) -> Result<Option<ChartData>> {
    let values = column_f64_values(df, column)?;
    if values.is_empty() || bins == 0 {
        return Ok(None);
    }
    let min = values.iter().cloned().fold(f64::INFINITY, f64::min);
    let max = values.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    let width = if max > min { (max - min) / bins as f64 } else { 1.0 };
    let mut counts = vec![0u32; bins];
    for v in &values {
        let mut idx = ((v - min) / width) as usize;
        if idx >= bins {
            idx = bins - 1;
        }
        counts[idx] += 1;
    }
    let edges: Vec<f64> = (0..=bins).map(|i| min + i as f64 * width).collect();
    Ok(Some(ChartData::Histogram {
        column: column.to_string(),
        edges,
        counts,
    }))
}

fn scatter(df: &DataFrame, x: &str, y: &str, color: Option<&str>) -> Result<ChartData> {
    let groups = match color {
        Some(color_col) if df.column(color_col).is_ok() => {
            let labels = df
                .column(color_col)?
                .as_materialized_series()
                .cast(&DataType::String)?;
            let labels = labels.str()?;
            let xs = df
                .column(x)?
                .as_materialized_series()
                .cast(&DataType::Float64)?;
            let ys = df
                .column(y)?
                .as_materialized_series()
                .cast(&DataType::Float64)?;
            let xs = xs.f64()?;
            let ys = ys.f64()?;
            let mut by_label: BTreeMap<String, Vec<(f64, f64)>> = BTreeMap::new();
            let mut total = 0usize;
            for ((xv, yv), label) in xs.into_iter().zip(ys.into_iter()).zip(labels.into_iter()) {
                if let (Some(xv), Some(yv)) = (xv, yv) {
                    if xv.is_finite() && yv.is_finite() {
                        let key = label.unwrap_or("(brak)").to_string();
                        by_label.entry(key).or_default().push((xv, yv));
                        total += 1;
                        if total >= CHART_ROW_LIMIT {
                            break;
                        }
                    }
                }
            }
            by_label
                .into_iter()
                .map(|(label, points)| ScatterGroup {
                    label: Some(label),
                    points,
                })
                .collect()
        }
        _ => vec![ScatterGroup {
            label: None,
            points: paired_values(df, x, y)?,
        }],
    };
    Ok(ChartData::Scatter {
        x: x.to_string(),
        y: y.to_string(),
        groups,
    })
}

fn correlation(df: &DataFrame, columns: &[String]) -> Result<ChartData> {
    let n = columns.len();
    let mut matrix = vec![vec![1.0; n]; n];
    for i in 0..n {
        for j in (i + 1)..n {
            let pairs = paired_values(df, &columns[i], &columns[j])?;
            let r = pearson(&pairs);
            matrix[i][j] = r;
            matrix[j][i] = r;
        }
    }
    Ok(ChartData::Correlation {
        columns: columns.to_vec(),
        matrix,
    })
}

/// Pearson correlation over paired samples; NaN when undefined (fewer than
/// two pairs or a zero-variance side).
fn pearson(pairs: &[(f64, f64)]) -> f64 {
    if pairs.len() < 2 {
        return f64::NAN;
    }
    let n = pairs.len() as f64;
    let mean_x = pairs.iter().map(|(x, _)| x).sum::<f64>() / n;
    let mean_y = pairs.iter().map(|(_, y)| y).sum::<f64>() / n;
    let mut cov = 0.0;
    let mut var_x = 0.0;
    let mut var_y = 0.0;
    for (x, y) in pairs {
        cov += (x - mean_x) * (y - mean_y);
        var_x += (x - mean_x).powi(2);
        var_y += (y - mean_y).powi(2);
    }
    if var_x == 0.0 || var_y == 0.0 {
        return f64::NAN;
    }
    cov / (var_x.sqrt() * var_y.sqrt())
}

/// Five-number summary with linearly interpolated quartiles.
pub fn box_stats(values: &[f64]) -> BoxStats {
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).expect("finite values"));
    BoxStats {
        min: sorted[0],
        q1: quantile(&sorted, 0.25),
        median: quantile(&sorted, 0.5),
        q3: quantile(&sorted, 0.75),
        max: sorted[sorted.len() - 1],
    }
}

fn quantile(sorted: &[f64], q: f64) -> f64 {
    if sorted.len() == 1 {
        return sorted[0];
    }
    let pos = q * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    let frac = pos - lo as f64;
    sorted[lo] + (sorted[hi] - sorted[lo]) * frac
}

fn violin(df: &DataFrame, numeric: &str, categorical: &str) -> Result<Option<ChartData>> {
    let num = df
        .column(numeric)?
        .as_materialized_series()
        .cast(&DataType::Float64)?;
    let cat = df
        .column(categorical)?
        .as_materialized_series()
        .cast(&DataType::String)?;
    let num = num.f64()?;
    let cat = cat.str()?;
    let mut by_label: BTreeMap<String, Vec<f64>> = BTreeMap::new();
    for (value, label) in num.into_iter().zip(cat.into_iter()) {
        if let (Some(value), Some(label)) = (value, label) {
            if value.is_finite() {
                by_label.entry(label.to_string()).or_default().push(value);
            }
        }
    }
    let groups: Vec<ViolinGroup> = by_label
        .into_iter()
        .filter(|(_, values)| !values.is_empty())
        .map(|(label, values)| ViolinGroup {
            stats: box_stats(&values),
            density: kde_outline(&values, 40),
            label,
        })
        .collect();
    if groups.is_empty() {
        return Ok(None);
    }
    Ok(Some(ChartData::Violin {
        numeric: numeric.to_string(),
        categorical: categorical.to_string(),
        groups,
    }))
}

/// Gaussian KDE sampled on a uniform grid, normalized to peak width 1.
fn kde_outline(values: &[f64], samples: usize) -> Vec<(f64, f64)> {
    let n = values.len() as f64;
    let min = values.iter().cloned().fold(f64::INFINITY, f64::min);
    let max = values.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    if !(max > min) {
        return vec![(min, 1.0)];
    }
    let mean = values.iter().sum::<f64>() / n;
    let std = (values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n).sqrt();
    // Silverman's rule; fall back to a tenth of the range for flat data.
    let bandwidth = if std > 0.0 {
        1.06 * std * n.powf(-0.2)
    } else {
        (max - min) / 10.0
    };
    let step = (max - min) / (samples - 1).max(1) as f64;
    let mut outline: Vec<(f64, f64)> = (0..samples)
        .map(|i| {
            let x = min + i as f64 * step;
            let density: f64 = values
                .iter()
                .map(|v| (-0.5 * ((x - v) / bandwidth).powi(2)).exp())
                .sum();
            (x, density)
        })
        .collect();
    let peak = outline.iter().map(|(_, d)| *d).fold(0.0, f64::max);
    if peak > 0.0 {
        for (_, d) in &mut outline {
            *d /= peak;
        }
    }
    outline
}

fn count(df: &DataFrame, column: &str) -> Result<ChartData> {
    let series = df
        .column(column)?
        .as_materialized_series()
        .cast(&DataType::String)?;
    let ca = series.str()?;
    let mut counts: BTreeMap<String, u32> = BTreeMap::new();
    for value in ca.into_iter().flatten() {
        *counts.entry(value.to_string()).or_insert(0) += 1;
    }
    let mut pairs: Vec<(String, u32)> = counts.into_iter().collect();
    // Most frequent first; ties stay alphabetical.
    pairs.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    let (labels, counts) = pairs.into_iter().unzip();
    Ok(ChartData::Count {
        column: column.to_string(),
        labels,
        counts,
    })
}

fn scatter_matrix(df: &DataFrame, columns: &[String]) -> Result<ChartData> {
    let n = columns.len();
    let mut cells = vec![vec![Vec::new(); n]; n];
    for i in 0..n {
        for j in 0..n {
            cells[i][j] = paired_values(df, &columns[j], &columns[i])?;
        }
    }
    Ok(ChartData::ScatterMatrix {
        columns: columns.to_vec(),
        cells,
    })
}
