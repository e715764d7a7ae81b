//! Self-contained HTML report: header with generation timestamp, filter
//! summary, data preview, then one titled section per chart with its SVG
//! markup inline. A table of contents is assembled in parallel with the body
//! and emitted once above all sections, in document order.
//!
//! Pan/zoom support for the embedded charts comes from a CDN-hosted script;
//! nothing else is loaded from the network.

use base64::Engine as _;
use chrono::Local;
use color_eyre::Result;
use std::path::Path;

use super::TablePreview;
use crate::charts::Chart;
use crate::figure;

/// CDN reference for the chart pan/zoom script (not embedded).
const CHART_SCRIPT_CDN: &str =
    "https://cdn.jsdelivr.net/npm/svg-pan-zoom@3.6.1/dist/svg-pan-zoom.min.js";

/// Page chrome and layout options.
#[derive(Default)]
pub struct HtmlOptions {
    /// PNG logo embedded as a base64 data URI in the page header.
    pub logo_png: Option<Vec<u8>>,
    /// Fixed timestamp override (tests); defaults to now.
    pub generated_at: Option<String>,
}

impl HtmlOptions {
    /// Reads the logo from a PNG file on disk.
    pub fn with_logo_file(mut self, path: &Path) -> Result<Self> {
        self.logo_png = Some(std::fs::read(path)?);
        Ok(self)
    }
}

/// Renders the full report document as a UTF-8 string.
pub fn render_report(
    preview: &TablePreview,
    filter_lines: &[String],
    charts: &[Chart],
    options: &HtmlOptions,
) -> Result<String> {
    let mut toc: Vec<String> = Vec::new();
    let mut sections: Vec<String> = Vec::new();

    toc.push("<li><a href='#filters'>Zastosowane filtry</a></li>".to_string());
    sections.push(render_filters(filter_lines));

    toc.push("<li><a href='#table'>Podgląd danych</a></li>".to_string());
    sections.push(render_table(preview));

    for (i, chart) in charts.iter().enumerate() {
        let section_id = format!("plot-{}", i + 1);
        let title = if chart.title.is_empty() {
            format!("Wykres {}", i + 1)
        } else {
            chart.title.clone()
        };
        toc.push(format!(
            "<li><a href='#{}'>{}</a></li>",
            section_id,
            escape(&title)
        ));

        let svg = figure::render_svg(chart)?;
        let mut section = format!(
            "<h2 id='{}'>{}</h2><div class='chart'>{}</div>",
            section_id,
            escape(&title),
            svg
        );
        if let Some(comment) = &chart.comment {
            section.push_str(&format!(
                "<div class='comment'><b>Komentarz:</b><br>{}</div>",
                escape(comment)
            ));
        }
        sections.push(section);
    }

    let generated = options
        .generated_at
        .clone()
        .unwrap_or_else(|| Local::now().format("%Y-%m-%d %H:%M:%S").to_string());
    let logo = options
        .logo_png
        .as_ref()
        .map(|png| {
            format!(
                "<img class='logo' src='data:image/png;base64,{}' alt='logo'>",
                base64::engine::general_purpose::STANDARD.encode(png)
            )
        })
        .unwrap_or_default();

    Ok(format!(
        r#"<!DOCTYPE html>
<html lang="pl">
<head>
<meta charset="utf-8">
<title>Raport danych</title>
<style>{css}</style>
</head>
<body>
{logo}
<h1>Raport danych po filtrach</h1>
<div class="meta">Wygenerowano: {generated}</div>
<h2>Spis treści</h2>
<ul>{toc}</ul>
{sections}
<script src="{cdn}"></script>
<script>
document.querySelectorAll('.chart svg').forEach(function (el) {{
  svgPanZoom(el, {{ controlIconsEnabled: true }});
}});
</script>
</body>
</html>"#,
        css = inline_css(),
        logo = logo,
        generated = generated,
        toc = toc.join(""),
        sections = sections.join("\n"),
        cdn = CHART_SCRIPT_CDN,
    ))
}

/// Renders and writes the report to `path`.
pub fn write_report(
    path: &Path,
    preview: &TablePreview,
    filter_lines: &[String],
    charts: &[Chart],
    options: &HtmlOptions,
) -> Result<()> {
    let html = render_report(preview, filter_lines, charts, options)?;
    std::fs::write(path, html)?;
    Ok(())
}

fn render_filters(filter_lines: &[String]) -> String {
    let mut html = String::from("<h2 id='filters'>Zastosowane filtry</h2><ul>");
    for line in filter_lines {
        match line.split_once(": ") {
            Some((name, rest)) => {
                html.push_str(&format!("<li><b>{}</b>: {}</li>", escape(name), escape(rest)));
            }
            None => html.push_str(&format!("<li>{}</li>", escape(line))),
        }
    }
    html.push_str("</ul>");
    html
}

fn render_table(preview: &TablePreview) -> String {
    let mut html =
        String::from("<h2 id='table'>Podgląd danych (pierwsze 10 wierszy)</h2><table><thead><tr>");
    for header in &preview.headers {
        html.push_str(&format!("<th>{}</th>", escape(header)));
    }
    html.push_str("</tr></thead><tbody>");
    for row in &preview.rows {
        html.push_str("<tr>");
        for cell in row {
            html.push_str(&format!("<td>{}</td>", escape(cell)));
        }
        html.push_str("</tr>");
    }
    html.push_str("</tbody></table>");
    html
}

fn inline_css() -> &'static str {
    r#"
body { font-family: Arial, sans-serif; margin: 40px; }
h1 { margin-bottom: 0; }
h2 { margin-top: 40px; border-bottom: 1px solid #ccc; padding-bottom: 5px; }
ul { line-height: 1.6; }
table { border-collapse: collapse; margin-top: 10px; }
th, td { border: 1px solid #ccc; padding: 4px 8px; font-size: 0.9em; }
th { background: #eee; }
.chart svg { max-width: 100%; height: auto; border: 1px solid #eee; }
.comment { background: #f7f7f7; padding: 10px; margin-top: 10px; }
.meta { color: #666; font-size: 0.9em; }
.logo { position: fixed; top: 20px; right: 20px; height: 28px; }
"#
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::charts::{build_charts, ChartSelection, ChartToggles};
    use polars::prelude::*;

    fn preview() -> TablePreview {
        let df = df!(
            "age" => &[29.5, 9.0],
            "gender" => &["Kobieta", "Mężczyzna"]
        )
        .unwrap();
        TablePreview::from_dataframe(&df, 10).unwrap()
    }

    fn sample_charts() -> Vec<Chart> {
        let df = df!(
            "age" => &[20.0, 25.0, 30.0, 35.0],
            "experience_years" => &[1.0, 2.0, 3.0, 4.0]
        )
        .unwrap();
        build_charts(
            &df,
            &ChartToggles::default(),
            &ChartSelection::default(),
            10,
        )
        .unwrap()
    }

    #[test]
    fn toc_lists_fixed_entries_plus_one_per_chart_in_order() {
        let charts = sample_charts();
        let html = render_report(&preview(), &[], &charts, &HtmlOptions::default()).unwrap();
        let entries: Vec<&str> = html.matches("<li><a href='#").collect();
        assert_eq!(entries.len(), 2 + charts.len());
        let filters_pos = html.find("href='#filters'").unwrap();
        let table_pos = html.find("href='#table'").unwrap();
        let first_plot_pos = html.find("href='#plot-1'").unwrap();
        assert!(filters_pos < table_pos && table_pos < first_plot_pos);
    }

    #[test]
    fn comment_block_present_only_when_set() {
        let mut charts = sample_charts();
        let html = render_report(&preview(), &[], &charts, &HtmlOptions::default()).unwrap();
        assert!(!html.contains("class='comment'"));
        charts[0].set_comment("wyraźny trend wzrostowy");
        let html = render_report(&preview(), &[], &charts, &HtmlOptions::default()).unwrap();
        assert!(html.contains("wyraźny trend wzrostowy"));
        assert!(html.contains("class='comment'"));
    }

    #[test]
    fn filter_lines_render_bold_names() {
        let html = render_report(
            &preview(),
            &["age: 21 – 30".to_string()],
            &[],
            &HtmlOptions::default(),
        )
        .unwrap();
        assert!(html.contains("<li><b>age</b>: 21 – 30</li>"));
    }

    #[test]
    fn chart_script_comes_from_cdn() {
        let html = render_report(&preview(), &[], &[], &HtmlOptions::default()).unwrap();
        assert!(html.contains("cdn.jsdelivr.net"));
    }

    #[test]
    fn logo_embedded_as_data_uri() {
        let options = HtmlOptions {
            logo_png: Some(vec![0x89, b'P', b'N', b'G']),
            generated_at: Some("2025-01-01 12:00:00".to_string()),
        };
        let html = render_report(&preview(), &[], &[], &options).unwrap();
        assert!(html.contains("data:image/png;base64,"));
        assert!(html.contains("Wygenerowano: 2025-01-01 12:00:00"));
    }

    #[test]
    fn table_shows_preview_values() {
        let html = render_report(&preview(), &[], &[], &HtmlOptions::default()).unwrap();
        assert!(html.contains("<td>Kobieta</td>"));
        assert!(html.contains("<th>age</th>"));
    }

    #[test]
    fn escapes_markup_in_text() {
        assert_eq!(escape("a<b>&c"), "a&lt;b&gt;&amp;c");
    }
}
