//! Per-column filters derived from the loaded table's observed domain.
//!
//! Numeric columns with at least two distinct values get an inclusive range
//! seeded to min/max; categorical columns with 2..=30 distinct values get a
//! multi-select seeded to every observed value. Rows with a null in a
//! filtered column always pass that column's filter (null-permissive), so
//! incomplete records are never dropped silently.

use color_eyre::eyre::eyre;
use color_eyre::Result;
use polars::prelude::*;
use std::collections::BTreeSet;

/// Upper bound on distinct values for a categorical column to be filterable.
pub const MAX_CATEGORICAL_VALUES: usize = 30;

/// A single column's filter configuration.
#[derive(Clone, Debug, PartialEq)]
pub enum ColumnFilter {
    /// Inclusive numeric range; `min`/`max` remember the observed domain.
    Numeric {
        low: f64,
        high: f64,
        min: f64,
        max: f64,
    },
    /// Multi-select over observed values; seeded with all of them.
    Categorical {
        selected: BTreeSet<String>,
        observed: Vec<String>,
    },
}

/// Ordered set of filters, one per filterable column of the source table.
#[derive(Clone, Debug, Default)]
pub struct FilterSet {
    filters: Vec<(String, ColumnFilter)>,
}

impl FilterSet {
    /// Derives filters from the observed domain of every column, in column
    /// order. Columns outside the cardinality bounds are not filterable.
    pub fn from_dataframe(df: &DataFrame) -> Result<Self> {
        let mut filters = Vec::new();
        for column in df.get_columns() {
            let name = column.name().to_string();
            let series = column.as_materialized_series();
            if series.dtype().is_numeric() {
                let values = numeric_values(series)?;
                let distinct: BTreeSet<u64> = values.iter().map(|v| v.to_bits()).collect();
                if distinct.len() < 2 {
                    continue;
                }
                let min = values.iter().cloned().fold(f64::INFINITY, f64::min);
                let max = values.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
                filters.push((
                    name,
                    ColumnFilter::Numeric {
                        low: min,
                        high: max,
                        min,
                        max,
                    },
                ));
            } else if series.dtype() == &DataType::String {
                let ca = series.str()?;
                let observed: BTreeSet<String> =
                    ca.into_iter().flatten().map(str::to_string).collect();
                if observed.len() < 2 || observed.len() > MAX_CATEGORICAL_VALUES {
                    continue;
                }
                filters.push((
                    name,
                    ColumnFilter::Categorical {
                        selected: observed.clone(),
                        observed: observed.into_iter().collect(),
                    },
                ));
            }
        }
        Ok(Self { filters })
    }

    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }

    pub fn len(&self) -> usize {
        self.filters.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &(String, ColumnFilter)> {
        self.filters.iter()
    }

    pub fn get(&self, column: &str) -> Option<&ColumnFilter> {
        self.filters
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, f)| f)
    }

    /// Narrows a numeric filter. Bounds are clamped to the observed domain.
    pub fn set_range(&mut self, column: &str, low: f64, high: f64) -> Result<()> {
        match self.get_mut(column) {
            Some(ColumnFilter::Numeric {
                low: l,
                high: h,
                min,
                max,
            }) => {
                *l = low.max(*min);
                *h = high.min(*max);
                Ok(())
            }
            Some(ColumnFilter::Categorical { .. }) => {
                Err(eyre!("column '{}' has a categorical filter", column))
            }
            None => Err(eyre!("no filter for column '{}'", column)),
        }
    }

    /// Replaces a categorical selection. Values outside the observed domain
    /// are rejected so a typo cannot silently select nothing.
    pub fn set_selected(&mut self, column: &str, values: &[String]) -> Result<()> {
        match self.get_mut(column) {
            Some(ColumnFilter::Categorical { selected, observed }) => {
                for v in values {
                    if !observed.contains(v) {
                        return Err(eyre!("value '{}' not present in column '{}'", v, column));
                    }
                }
                *selected = values.iter().cloned().collect();
                Ok(())
            }
            Some(ColumnFilter::Numeric { .. }) => {
                Err(eyre!("column '{}' has a numeric filter", column))
            }
            None => Err(eyre!("no filter for column '{}'", column)),
        }
    }

    /// Resets every filter to its seeded (pass-everything) state.
    pub fn reset(&mut self) {
        for (_, filter) in &mut self.filters {
            match filter {
                ColumnFilter::Numeric { low, high, min, max } => {
                    *low = *min;
                    *high = *max;
                }
                ColumnFilter::Categorical { selected, observed } => {
                    *selected = observed.iter().cloned().collect();
                }
            }
        }
    }

    /// Applies the conjunction of all filters. Within a column, rows pass
    /// when the value is in range/in set or null.
    pub fn apply(&self, df: &DataFrame) -> Result<DataFrame> {
        let mut predicate: Option<Expr> = None;
        for (name, filter) in &self.filters {
            let column_pred = match filter {
                ColumnFilter::Numeric { low, high, .. } => col(name.as_str())
                    .gt_eq(lit(*low))
                    .and(col(name.as_str()).lt_eq(lit(*high))),
                ColumnFilter::Categorical { selected, .. } => {
                    let mut any: Option<Expr> = None;
                    for value in selected {
                        let eq = col(name.as_str()).eq(lit(value.as_str()));
                        any = Some(match any {
                            Some(e) => e.or(eq),
                            None => eq,
                        });
                    }
                    // Empty selection matches nothing (nulls still pass).
                    any.unwrap_or_else(|| lit(false))
                }
            };
            let column_pred = column_pred.or(col(name.as_str()).is_null());
            predicate = Some(match predicate {
                Some(p) => p.and(column_pred),
                None => column_pred,
            });
        }
        match predicate {
            Some(p) => Ok(df.clone().lazy().filter(p).collect()?),
            None => Ok(df.clone()),
        }
    }

    /// One summary line per filter: numeric as `name: lo – hi`, categorical
    /// as `name: a, b, c`. Used verbatim by both report assemblers.
    pub fn summary_lines(&self) -> Vec<String> {
        self.filters
            .iter()
            .map(|(name, filter)| match filter {
                ColumnFilter::Numeric { low, high, .. } => {
                    format!("{}: {} – {}", name, format_bound(*low), format_bound(*high))
                }
                ColumnFilter::Categorical { selected, .. } => {
                    let values: Vec<&str> = selected.iter().map(String::as_str).collect();
                    format!("{}: {}", name, values.join(", "))
                }
            })
            .collect()
    }

    fn get_mut(&mut self, column: &str) -> Option<&mut ColumnFilter> {
        self.filters
            .iter_mut()
            .find(|(name, _)| name == column)
            .map(|(_, f)| f)
    }
}

fn format_bound(v: f64) -> String {
    if (v - v.trunc()).abs() < f64::EPSILON {
        format!("{}", v as i64)
    } else {
        format!("{}", v)
    }
}

fn numeric_values(series: &Series) -> Result<Vec<f64>> {
    let f = series.cast(&DataType::Float64)?;
    let ca = f.f64()?;
    Ok(ca.into_iter().flatten().filter(|v| v.is_finite()).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> DataFrame {
        df!(
            "age" => &[Some(21.0), Some(29.5), None, Some(49.5)],
            "gender" => &[Some("Kobieta"), Some("Mężczyzna"), Some("Kobieta"), None],
            "id" => &["a", "b", "c", "d"]
        )
        .unwrap()
    }

    #[test]
    fn builds_filters_within_cardinality_bounds() {
        let df = sample();
        let filters = FilterSet::from_dataframe(&df).unwrap();
        assert!(matches!(
            filters.get("age"),
            Some(ColumnFilter::Numeric { .. })
        ));
        assert!(matches!(
            filters.get("gender"),
            Some(ColumnFilter::Categorical { .. })
        ));
        assert!(filters.get("id").is_some());
    }

    #[test]
    fn constant_numeric_column_not_filterable() {
        let df = df!("x" => &[1.0, 1.0, 1.0]).unwrap();
        let filters = FilterSet::from_dataframe(&df).unwrap();
        assert!(filters.get("x").is_none());
    }

    #[test]
    fn high_cardinality_categorical_not_filterable() {
        let values: Vec<String> = (0..40).map(|i| format!("v{}", i)).collect();
        let df = df!("c" => values).unwrap();
        let filters = FilterSet::from_dataframe(&df).unwrap();
        assert!(filters.get("c").is_none());
    }

    #[test]
    fn numeric_filter_keeps_nulls() {
        let df = sample();
        let mut filters = FilterSet::from_dataframe(&df).unwrap();
        filters.set_range("age", 25.0, 30.0).unwrap();
        let out = filters.apply(&df).unwrap();
        // 29.5 passes, the null age passes, 21.0 and 49.5 fail.
        let ages: Vec<Option<f64>> = out.column("age").unwrap().f64().unwrap().iter().collect();
        assert!(ages.contains(&Some(29.5)));
        assert!(ages.contains(&None));
        assert_eq!(out.height(), 2);
    }

    #[test]
    fn categorical_filter_keeps_nulls() {
        let df = sample();
        let mut filters = FilterSet::from_dataframe(&df).unwrap();
        filters
            .set_selected("gender", &["Kobieta".to_string()])
            .unwrap();
        let out = filters.apply(&df).unwrap();
        // Two Kobieta rows plus the null-gender row.
        assert_eq!(out.height(), 3);
    }

    #[test]
    fn empty_selection_keeps_only_nulls() {
        let df = sample();
        let mut filters = FilterSet::from_dataframe(&df).unwrap();
        filters.set_selected("gender", &[]).unwrap();
        let out = filters.apply(&df).unwrap();
        assert_eq!(out.height(), 1);
        assert_eq!(out.column("gender").unwrap().null_count(), 1);
    }

    #[test]
    fn filtering_is_idempotent() {
        let df = sample();
        let mut filters = FilterSet::from_dataframe(&df).unwrap();
        filters.set_range("age", 25.0, 30.0).unwrap();
        filters
            .set_selected("gender", &["Mężczyzna".to_string()])
            .unwrap();
        let once = filters.apply(&df).unwrap();
        let twice = filters.apply(&once).unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn seeded_filters_pass_every_row() {
        let df = sample();
        let filters = FilterSet::from_dataframe(&df).unwrap();
        let out = filters.apply(&df).unwrap();
        assert_eq!(out.height(), df.height());
    }

    #[test]
    fn unknown_selection_value_rejected() {
        let df = sample();
        let mut filters = FilterSet::from_dataframe(&df).unwrap();
        assert!(filters
            .set_selected("gender", &["Nieznana".to_string()])
            .is_err());
    }

    #[test]
    fn summary_line_formats() {
        let df = sample();
        let mut filters = FilterSet::from_dataframe(&df).unwrap();
        filters.set_range("age", 21.0, 30.0).unwrap();
        let lines = filters.summary_lines();
        assert!(lines.contains(&"age: 21 – 30".to_string()));
        assert!(lines
            .iter()
            .any(|l| l.starts_with("gender: ") && l.contains("Kobieta")));
    }

    #[test]
    fn reset_restores_seeded_state() {
        let df = sample();
        let mut filters = FilterSet::from_dataframe(&df).unwrap();
        filters.set_range("age", 25.0, 26.0).unwrap();
        filters.reset();
        let out = filters.apply(&df).unwrap();
        assert_eq!(out.height(), df.height());
    }
}
