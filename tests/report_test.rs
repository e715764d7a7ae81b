mod common;

use ankieta::dataset;
use ankieta::report::html::{self, HtmlOptions};
use ankieta::report::{pdf, TablePreview};
use ankieta::state::DashboardState;

fn loaded_state(dir: &std::path::Path) -> DashboardState {
    let path = common::write_full_survey_csv(dir);
    let (df, _) = dataset::load_files(&[path]).unwrap();
    DashboardState::new(df).unwrap()
}

#[test]
fn pdf_export_with_zero_charts_is_valid() {
    let dir = tempfile::tempdir().unwrap();
    let mut state = loaded_state(dir.path());
    state.toggles = ankieta::ChartToggles::none();

    let filtered = state.filtered().unwrap();
    let preview = TablePreview::from_dataframe(&filtered, 10).unwrap();
    let charts = state.charts().unwrap();
    assert!(charts.is_empty());

    let bytes = pdf::render_report(&preview, &state.filter_summary(), &charts).unwrap();
    let doc = lopdf::Document::load_mem(&bytes).unwrap();
    // Title/filters page and the table page, nothing else.
    assert_eq!(doc.get_pages().len(), 2);
}

#[test]
fn pdf_export_adds_a_page_per_chart() {
    let dir = tempfile::tempdir().unwrap();
    let state = loaded_state(dir.path());

    let filtered = state.filtered().unwrap();
    let preview = TablePreview::from_dataframe(&filtered, 10).unwrap();
    let charts = state.charts().unwrap();
    assert!(!charts.is_empty());

    let bytes = pdf::render_report(&preview, &state.filter_summary(), &charts).unwrap();
    let doc = lopdf::Document::load_mem(&bytes).unwrap();
    assert_eq!(doc.get_pages().len(), 2 + charts.len());
}

#[test]
fn html_toc_matches_rendered_sections() {
    let dir = tempfile::tempdir().unwrap();
    let mut state = loaded_state(dir.path());
    state.set_comment(ankieta::ChartKind::Histogram, "pik około 30 lat");

    let filtered = state.filtered().unwrap();
    let preview = TablePreview::from_dataframe(&filtered, 10).unwrap();
    let charts = state.charts().unwrap();

    let html = html::render_report(
        &preview,
        &state.filter_summary(),
        &charts,
        &HtmlOptions::default(),
    )
    .unwrap();

    // One TOC entry per chart plus the two fixed entries, in document order.
    let toc_entries = html.matches("<li><a href='#").count();
    assert_eq!(toc_entries, charts.len() + 2);
    let filters_pos = html.find("href='#filters'").unwrap();
    let table_pos = html.find("href='#table'").unwrap();
    let plot_pos = html.find("href='#plot-1'").unwrap();
    assert!(filters_pos < table_pos && table_pos < plot_pos);

    // Chart sections carry inline SVG and the histogram's comment block.
    assert!(html.matches("<svg").count() >= charts.len());
    assert!(html.contains("pik około 30 lat"));
}
