//! Dashboard view-model: the loaded table plus current filters, chart
//! toggles, column selections, and comments. Interactions are explicit
//! update methods; rendering asks the state for the filtered table and the
//! chart list instead of re-running the whole pipeline.

use color_eyre::Result;
use polars::prelude::DataFrame;
use std::collections::BTreeMap;

use crate::charts::{self, Chart, ChartKind, ChartSelection, ChartToggles};
use crate::filter::FilterSet;

pub struct DashboardState {
    df: DataFrame,
    pub filters: FilterSet,
    pub toggles: ChartToggles,
    pub selection: ChartSelection,
    comments: BTreeMap<ChartKind, String>,
    histogram_bins: usize,
}

impl DashboardState {
    /// Seeds filters and chart defaults from the preprocessed table.
    pub fn new(df: DataFrame) -> Result<Self> {
        let filters = FilterSet::from_dataframe(&df)?;
        Ok(Self {
            df,
            filters,
            toggles: ChartToggles::default(),
            selection: ChartSelection::default(),
            comments: BTreeMap::new(),
            histogram_bins: charts::DEFAULT_HISTOGRAM_BINS,
        })
    }

    pub fn dataframe(&self) -> &DataFrame {
        &self.df
    }

    pub fn row_count(&self) -> usize {
        self.df.height()
    }

    pub fn set_histogram_bins(&mut self, bins: usize) {
        self.histogram_bins = bins.max(1);
    }

    /// Narrows a numeric filter.
    pub fn set_range_filter(&mut self, column: &str, low: f64, high: f64) -> Result<()> {
        self.filters.set_range(column, low, high)
    }

    /// Replaces a categorical selection.
    pub fn set_selected_values(&mut self, column: &str, values: &[String]) -> Result<()> {
        self.filters.set_selected(column, values)
    }

    pub fn reset_filters(&mut self) {
        self.filters.reset();
    }

    pub fn toggle_chart(&mut self, kind: ChartKind, on: bool) {
        self.toggles.set(kind, on);
    }

    /// Attaches a comment to a chart kind; blank text clears it.
    pub fn set_comment(&mut self, kind: ChartKind, text: &str) {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            self.comments.remove(&kind);
        } else {
            self.comments.insert(kind, trimmed.to_string());
        }
    }

    /// The table after applying the current filters.
    pub fn filtered(&self) -> Result<DataFrame> {
        self.filters.apply(&self.df)
    }

    /// Builds the enabled charts from the filtered table, with comments
    /// attached. Chart preconditions are re-checked against the filtered
    /// data, so a filter that empties a column also suppresses its charts.
    pub fn charts(&self) -> Result<Vec<Chart>> {
        let filtered = self.filtered()?;
        let mut charts = charts::build_charts(
            &filtered,
            &self.toggles,
            &self.selection,
            self.histogram_bins,
        )?;
        for chart in &mut charts {
            if let Some(comment) = self.comments.get(&chart.kind) {
                chart.set_comment(comment);
            }
        }
        Ok(charts)
    }

    /// Filter summary lines for the report assemblers.
    pub fn filter_summary(&self) -> Vec<String> {
        self.filters.summary_lines()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use polars::prelude::*;

    fn state() -> DashboardState {
        let df = df!(
            "age" => &[Some(21.0), Some(29.5), None, Some(49.5)],
            "gender" => &[Some("Kobieta"), Some("Mężczyzna"), Some("Kobieta"), None]
        )
        .unwrap();
        DashboardState::new(df).unwrap()
    }

    #[test]
    fn filtered_respects_updates_and_reset() {
        let mut state = state();
        assert_eq!(state.filtered().unwrap().height(), 4);
        state.set_range_filter("age", 25.0, 30.0).unwrap();
        assert_eq!(state.filtered().unwrap().height(), 2);
        state.reset_filters();
        assert_eq!(state.filtered().unwrap().height(), 4);
    }

    #[test]
    fn comments_attach_to_built_charts() {
        let mut state = state();
        state.set_comment(ChartKind::Histogram, "uwaga do histogramu");
        let charts = state.charts().unwrap();
        let hist = charts
            .iter()
            .find(|c| c.kind == ChartKind::Histogram)
            .unwrap();
        assert_eq!(hist.comment.as_deref(), Some("uwaga do histogramu"));
    }

    #[test]
    fn blank_comment_clears() {
        let mut state = state();
        state.set_comment(ChartKind::Histogram, "coś");
        state.set_comment(ChartKind::Histogram, "  ");
        let charts = state.charts().unwrap();
        assert!(charts.iter().all(|c| c.comment.is_none()));
    }

    #[test]
    fn charts_follow_toggles() {
        let mut state = state();
        state.toggles = ChartToggles::none();
        assert!(state.charts().unwrap().is_empty());
        state.toggle_chart(ChartKind::Count, true);
        let charts = state.charts().unwrap();
        assert_eq!(charts.len(), 1);
        assert_eq!(charts[0].kind, ChartKind::Count);
    }
}
