//! Chart rendering with plotters: PNG for the PDF assembler, SVG markup for
//! the HTML assembler. Both go through the same generic drawing code.
//!
//! Trace colors come from a fixed qualitative palette (index mod palette
//! length) because report output does not carry the dashboard theme.

use color_eyre::Result;
use plotters::coord::Shift;
use plotters::prelude::*;
use std::path::Path;

use crate::charts::{Chart, ChartData};

/// Base raster size, 16:9 to match the report image box.
pub const BASE_SIZE: (u32, u32) = (800, 450);

/// ColorBrewer Set2 qualitative palette.
pub const SET2: [RGBColor; 8] = [
    RGBColor(102, 194, 165),
    RGBColor(252, 141, 98),
    RGBColor(141, 160, 203),
    RGBColor(231, 138, 195),
    RGBColor(166, 216, 84),
    RGBColor(255, 217, 47),
    RGBColor(229, 196, 148),
    RGBColor(179, 179, 179),
];

/// Color for trace `index`, cycling through the palette.
pub fn palette_color(index: usize) -> RGBColor {
    SET2[index % SET2.len()]
}

/// Renders a chart to a PNG file. `scale` multiplies the base size (reports
/// use 2 for print quality).
pub fn render_png(chart: &Chart, path: &Path, scale: u32) -> Result<()> {
    let size = (BASE_SIZE.0 * scale.max(1), BASE_SIZE.1 * scale.max(1));
    let root = BitMapBackend::new(path, size).into_drawing_area();
    draw(&root, chart)?;
    root.present()?;
    Ok(())
}

/// Renders a chart to a standalone SVG string.
pub fn render_svg(chart: &Chart) -> Result<String> {
    let mut buffer = String::new();
    {
        let root = SVGBackend::with_string(&mut buffer, BASE_SIZE).into_drawing_area();
        draw(&root, chart)?;
        root.present()?;
    }
    Ok(buffer)
}

fn draw<DB: DrawingBackend>(root: &DrawingArea<DB, Shift>, chart: &Chart) -> Result<()>
where
    DB::ErrorType: std::error::Error + Send + Sync + 'static,
{
    root.fill(&WHITE)?;
    match &chart.data {
        ChartData::Histogram {
            column,
            edges,
            counts,
        } => draw_histogram(root, column, edges, counts),
        ChartData::Scatter { x, y, groups } => draw_scatter(root, x, y, groups),
        ChartData::Correlation { columns, matrix } => draw_correlation(root, columns, matrix),
        ChartData::Box { column, stats } => draw_box(root, column, stats),
        ChartData::Violin {
            numeric,
            categorical,
            groups,
        } => draw_violin(root, numeric, categorical, groups),
        ChartData::Count {
            column,
            labels,
            counts,
        } => draw_count(root, column, labels, counts),
        ChartData::ScatterMatrix { columns, cells } => draw_matrix(root, columns, cells),
    }
}

fn pad_range(min: f64, max: f64) -> (f64, f64) {
    if max > min {
        let pad = (max - min) * 0.05;
        (min - pad, max + pad)
    } else {
        (min - 0.5, max + 0.5)
    }
}

fn draw_histogram<DB: DrawingBackend>(
    root: &DrawingArea<DB, Shift>,
    column: &str,
    edges: &[f64],
    counts: &[u32],
) -> Result<()>
where
    DB::ErrorType: std::error::Error + Send + Sync + 'static,
{
    let x_min = edges.first().copied().unwrap_or(0.0);
    let x_max = edges.last().copied().unwrap_or(1.0);
    let y_max = counts.iter().copied().max().unwrap_or(1).max(1) as f64 * 1.05;
    let mut chart = ChartBuilder::on(root)
        .margin(20)
        .x_label_area_size(40)
        .y_label_area_size(50)
        .build_cartesian_2d(x_min..x_max, 0.0..y_max)?;
    chart
        .configure_mesh()
        .x_desc(column)
        .y_desc("liczba")
        .draw()?;
    let color = palette_color(0);
    chart.draw_series(counts.iter().enumerate().map(|(i, &count)| {
        Rectangle::new(
            [(edges[i], 0.0), (edges[i + 1], count as f64)],
            color.mix(0.8).filled(),
        )
    }))?;
    chart.draw_series(counts.iter().enumerate().map(|(i, &count)| {
        Rectangle::new(
            [(edges[i], 0.0), (edges[i + 1], count as f64)],
            ShapeStyle::from(&color).stroke_width(1),
        )
    }))?;
    Ok(())
}

fn draw_scatter<DB: DrawingBackend>(
    root: &DrawingArea<DB, Shift>,
    x: &str,
    y: &str,
    groups: &[crate::charts::ScatterGroup],
) -> Result<()>
where
    DB::ErrorType: std::error::Error + Send + Sync + 'static,
{
    let all: Vec<(f64, f64)> = groups.iter().flat_map(|g| g.points.iter().copied()).collect();
    if all.is_empty() {
        return Ok(());
    }
    let (x_min, x_max) = pad_range(
        all.iter().map(|p| p.0).fold(f64::INFINITY, f64::min),
        all.iter().map(|p| p.0).fold(f64::NEG_INFINITY, f64::max),
    );
    let (y_min, y_max) = pad_range(
        all.iter().map(|p| p.1).fold(f64::INFINITY, f64::min),
        all.iter().map(|p| p.1).fold(f64::NEG_INFINITY, f64::max),
    );
    let mut chart = ChartBuilder::on(root)
        .margin(20)
        .x_label_area_size(40)
        .y_label_area_size(50)
        .build_cartesian_2d(x_min..x_max, y_min..y_max)?;
    chart.configure_mesh().x_desc(x).y_desc(y).draw()?;
    let mut has_labels = false;
    for (idx, group) in groups.iter().enumerate() {
        let color = palette_color(idx);
        let series = chart.draw_series(
            group
                .points
                .iter()
                .map(|&(px, py)| Circle::new((px, py), 3, color.mix(0.8).filled())),
        )?;
        if let Some(label) = &group.label {
            has_labels = true;
            series
                .label(label.as_str())
                .legend(move |(lx, ly)| Circle::new((lx + 10, ly), 3, color.filled()));
        }
    }
    if has_labels {
        chart
            .configure_series_labels()
            .background_style(WHITE.mix(0.8))
            .border_style(BLACK)
            .draw()?;
    }
    Ok(())
}

/// RdBu-style diverging map over [-1, 1]: red for negative, blue for positive.
fn correlation_color(r: f64) -> RGBColor {
    if r.is_nan() {
        return RGBColor(220, 220, 220);
    }
    let t = ((r + 1.0) / 2.0).clamp(0.0, 1.0);
    let lerp = |a: f64, b: f64, t: f64| (a + (b - a) * t) as u8;
    if t < 0.5 {
        let k = t * 2.0;
        RGBColor(lerp(178.0, 247.0, k), lerp(24.0, 247.0, k), lerp(43.0, 247.0, k))
    } else {
        let k = (t - 0.5) * 2.0;
        RGBColor(lerp(247.0, 33.0, k), lerp(247.0, 102.0, k), lerp(247.0, 172.0, k))
    }
}

fn draw_correlation<DB: DrawingBackend>(
    root: &DrawingArea<DB, Shift>,
    columns: &[String],
    matrix: &[Vec<f64>],
) -> Result<()>
where
    DB::ErrorType: std::error::Error + Send + Sync + 'static,
{
    let n = columns.len();
    let x_labels = columns.to_vec();
    let y_labels = columns.to_vec();
    let mut chart = ChartBuilder::on(root)
        .margin(20)
        .x_label_area_size(40)
        .y_label_area_size(90)
        .build_cartesian_2d(0.0..n as f64, 0.0..n as f64)?;
    chart
        .configure_mesh()
        .disable_x_mesh()
        .disable_y_mesh()
        .x_labels(n)
        .y_labels(n)
        .x_label_formatter(&move |v| index_label(*v, &x_labels))
        .y_label_formatter(&move |v| index_label(*v, &y_labels))
        .draw()?;
    for (i, row) in matrix.iter().enumerate() {
        for (j, &r) in row.iter().enumerate() {
            // Row 0 at the top, as in the dashboard heatmap.
            let y0 = (n - 1 - i) as f64;
            chart.draw_series(std::iter::once(Rectangle::new(
                [(j as f64, y0), (j as f64 + 1.0, y0 + 1.0)],
                correlation_color(r).filled(),
            )))?;
            let text = if r.is_nan() {
                "–".to_string()
            } else {
                format!("{:.2}", r)
            };
            chart.draw_series(std::iter::once(Text::new(
                text,
                (j as f64 + 0.35, y0 + 0.55),
                ("sans-serif", 14).into_font().color(&BLACK),
            )))?;
        }
    }
    Ok(())
}

/// Label for a cell-centered categorical axis backed by a numeric range.
fn index_label(v: f64, labels: &[String]) -> String {
    let idx = v.floor() as isize;
    if (v - v.floor() - 0.5).abs() > 0.35 {
        // Only label near cell centers so edges stay clean.
        return String::new();
    }
    if idx >= 0 && (idx as usize) < labels.len() {
        labels[idx as usize].clone()
    } else {
        String::new()
    }
}

fn draw_box<DB: DrawingBackend>(
    root: &DrawingArea<DB, Shift>,
    column: &str,
    stats: &crate::charts::BoxStats,
) -> Result<()>
where
    DB::ErrorType: std::error::Error + Send + Sync + 'static,
{
    let (y_min, y_max) = pad_range(stats.min, stats.max);
    let mut chart = ChartBuilder::on(root)
        .margin(20)
        .x_label_area_size(40)
        .y_label_area_size(50)
        .build_cartesian_2d(-1.0..1.0, y_min..y_max)?;
    chart
        .configure_mesh()
        .disable_x_mesh()
        .x_labels(0)
        .y_desc(column)
        .draw()?;
    draw_box_body(&mut chart, 0.0, stats, palette_color(0))?;
    Ok(())
}

/// Shared box-with-whiskers drawing for box and violin charts.
fn draw_box_body<DB: DrawingBackend, X, Y>(
    chart: &mut ChartContext<'_, DB, Cartesian2d<X, Y>>,
    x: f64,
    stats: &crate::charts::BoxStats,
    color: RGBColor,
) -> Result<()>
where
    DB::ErrorType: std::error::Error + Send + Sync + 'static,
    X: plotters::coord::ranged1d::Ranged<ValueType = f64>,
    Y: plotters::coord::ranged1d::Ranged<ValueType = f64>,
{
    let box_half = 0.3;
    let cap_half = 0.2;
    chart.draw_series(std::iter::once(Rectangle::new(
        [(x - box_half, stats.q1), (x + box_half, stats.q3)],
        ShapeStyle::from(&color).stroke_width(1),
    )))?;
    chart.draw_series(std::iter::once(PathElement::new(
        vec![(x - box_half, stats.median), (x + box_half, stats.median)],
        color,
    )))?;
    chart.draw_series(std::iter::once(PathElement::new(
        vec![(x, stats.min), (x, stats.q1)],
        color,
    )))?;
    chart.draw_series(std::iter::once(PathElement::new(
        vec![(x, stats.q3), (x, stats.max)],
        color,
    )))?;
    chart.draw_series(std::iter::once(PathElement::new(
        vec![(x - cap_half, stats.min), (x + cap_half, stats.min)],
        color,
    )))?;
    chart.draw_series(std::iter::once(PathElement::new(
        vec![(x - cap_half, stats.max), (x + cap_half, stats.max)],
        color,
    )))?;
    Ok(())
}

fn draw_violin<DB: DrawingBackend>(
    root: &DrawingArea<DB, Shift>,
    numeric: &str,
    categorical: &str,
    groups: &[crate::charts::ViolinGroup],
) -> Result<()>
where
    DB::ErrorType: std::error::Error + Send + Sync + 'static,
{
    if groups.is_empty() {
        return Ok(());
    }
    let y_min = groups.iter().map(|g| g.stats.min).fold(f64::INFINITY, f64::min);
    let y_max = groups
        .iter()
        .map(|g| g.stats.max)
        .fold(f64::NEG_INFINITY, f64::max);
    let (y_min, y_max) = pad_range(y_min, y_max);
    let labels: Vec<String> = groups.iter().map(|g| g.label.clone()).collect();
    let n = groups.len();
    let mut chart = ChartBuilder::on(root)
        .margin(20)
        .x_label_area_size(40)
        .y_label_area_size(50)
        .build_cartesian_2d(-0.5..(n as f64 - 0.5), y_min..y_max)?;
    chart
        .configure_mesh()
        .disable_x_mesh()
        .x_labels(n)
        .x_desc(categorical)
        .y_desc(numeric)
        .x_label_formatter(&move |v| center_label(*v, &labels))
        .draw()?;
    for (idx, group) in groups.iter().enumerate() {
        let x = idx as f64;
        let color = palette_color(idx);
        let mut outline: Vec<(f64, f64)> = group
            .density
            .iter()
            .map(|&(v, w)| (x - w * 0.4, v))
            .collect();
        outline.extend(group.density.iter().rev().map(|&(v, w)| (x + w * 0.4, v)));
        chart.draw_series(std::iter::once(Polygon::new(
            outline.clone(),
            color.mix(0.5).filled(),
        )))?;
        chart.draw_series(std::iter::once(PathElement::new(outline, color)))?;
        draw_box_body(&mut chart, x, &group.stats, color)?;
    }
    Ok(())
}

/// Label for integer-positioned categories on a numeric axis.
fn center_label(v: f64, labels: &[String]) -> String {
    let idx = v.round() as isize;
    if (v - idx as f64).abs() > 0.25 {
        return String::new();
    }
    if idx >= 0 && (idx as usize) < labels.len() {
        labels[idx as usize].clone()
    } else {
        String::new()
    }
}

fn draw_count<DB: DrawingBackend>(
    root: &DrawingArea<DB, Shift>,
    column: &str,
    labels: &[String],
    counts: &[u32],
) -> Result<()>
where
    DB::ErrorType: std::error::Error + Send + Sync + 'static,
{
    if labels.is_empty() {
        return Ok(());
    }
    let y_max = counts.iter().copied().max().unwrap_or(1).max(1) as f64 * 1.15;
    let n = labels.len();
    let label_vec = labels.to_vec();
    let mut chart = ChartBuilder::on(root)
        .margin(20)
        .x_label_area_size(40)
        .y_label_area_size(50)
        .build_cartesian_2d(-0.5..(n as f64 - 0.5), 0.0..y_max)?;
    chart
        .configure_mesh()
        .disable_x_mesh()
        .x_labels(n)
        .x_desc(column)
        .y_desc("liczba")
        .x_label_formatter(&move |v| center_label(*v, &label_vec))
        .draw()?;
    for (idx, &count) in counts.iter().enumerate() {
        let x = idx as f64;
        let color = palette_color(idx);
        chart.draw_series(std::iter::once(Rectangle::new(
            [(x - 0.35, 0.0), (x + 0.35, count as f64)],
            color.mix(0.8).filled(),
        )))?;
        chart.draw_series(std::iter::once(Text::new(
            count.to_string(),
            (x - 0.05, count as f64 + y_max * 0.02),
            ("sans-serif", 14).into_font().color(&BLACK),
        )))?;
    }
    Ok(())
}

fn draw_matrix<DB: DrawingBackend>(
    root: &DrawingArea<DB, Shift>,
    columns: &[String],
    cells: &[Vec<Vec<(f64, f64)>>],
) -> Result<()>
where
    DB::ErrorType: std::error::Error + Send + Sync + 'static,
{
    let n = columns.len();
    if n == 0 {
        return Ok(());
    }
    let areas = root.split_evenly((n, n));
    for (i, row) in cells.iter().enumerate() {
        for (j, points) in row.iter().enumerate() {
            let area = &areas[i * n + j];
            if points.is_empty() {
                continue;
            }
            let (x_min, x_max) = pad_range(
                points.iter().map(|p| p.0).fold(f64::INFINITY, f64::min),
                points.iter().map(|p| p.0).fold(f64::NEG_INFINITY, f64::max),
            );
            let (y_min, y_max) = pad_range(
                points.iter().map(|p| p.1).fold(f64::INFINITY, f64::min),
                points.iter().map(|p| p.1).fold(f64::NEG_INFINITY, f64::max),
            );
            let mut chart = ChartBuilder::on(area)
                .margin(5)
                .x_label_area_size(if i == n - 1 { 25 } else { 0 })
                .y_label_area_size(if j == 0 { 35 } else { 0 })
                .build_cartesian_2d(x_min..x_max, y_min..y_max)?;
            let mut mesh = chart.configure_mesh();
            mesh.x_labels(3).y_labels(3);
            if i == n - 1 {
                mesh.x_desc(columns[j].as_str());
            }
            if j == 0 {
                mesh.y_desc(columns[i].as_str());
            }
            mesh.draw()?;
            chart.draw_series(
                points
                    .iter()
                    .map(|&(px, py)| Circle::new((px, py), 2, palette_color(0).mix(0.7).filled())),
            )?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::charts::{build_charts, ChartSelection, ChartToggles};
    use polars::prelude::*;

    fn all_charts() -> Vec<Chart> {
        let df = df!(
            "age" => &[20.0, 25.0, 30.0, 35.0, 40.0, 45.0],
            "experience_years" => &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0],
            "gender" => &["K", "M", "K", "M", "K", "M"]
        )
        .unwrap();
        let toggles = ChartToggles {
            histogram: true,
            scatter: true,
            correlation: true,
            box_plot: true,
            violin: true,
            count: true,
            matrix: true,
        };
        build_charts(&df, &toggles, &ChartSelection::default(), 10).unwrap()
    }

    #[test]
    fn every_kind_renders_to_svg() {
        let charts = all_charts();
        assert_eq!(charts.len(), 7);
        for chart in &charts {
            let svg = render_svg(chart).unwrap();
            assert!(svg.contains("<svg"), "no svg markup for {}", chart.kind);
        }
    }

    #[test]
    fn png_render_writes_file() {
        let charts = all_charts();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("chart.png");
        render_png(&charts[0], &path, 2).unwrap();
        let len = std::fs::metadata(&path).unwrap().len();
        assert!(len > 0);
    }

    #[test]
    fn palette_cycles() {
        assert_eq!(palette_color(0), palette_color(SET2.len()));
        assert_ne!(palette_color(0), palette_color(1));
    }

    #[test]
    fn correlation_color_endpoints() {
        assert_eq!(correlation_color(1.0), RGBColor(33, 102, 172));
        assert_eq!(correlation_color(-1.0), RGBColor(178, 24, 43));
        // undefined correlations render gray
        assert_eq!(correlation_color(f64::NAN), RGBColor(220, 220, 220));
    }
}
