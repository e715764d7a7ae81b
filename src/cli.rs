//! Command-line definitions for ankieta.

use clap::{Args as ClapArgs, Parser, Subcommand};
use color_eyre::eyre::eyre;
use color_eyre::Result;
use std::path::PathBuf;

use crate::charts::ChartKind;

/// Command-line arguments for ankieta
#[derive(Clone, Parser, Debug)]
#[command(
    name = "ankieta",
    version,
    about = "Survey data analysis: filtering, charts, and PDF/HTML report export"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Clone, Subcommand, Debug)]
pub enum Command {
    /// Load survey files, filter them, and export data and reports
    Report(ReportArgs),
    /// Classify a profile into a cluster and chart the matching group
    Cluster(ClusterArgs),
    /// Write a commented default config file and exit
    GenerateConfig,
}

#[derive(Clone, ClapArgs, Debug)]
pub struct ReportArgs {
    /// Path(s) to CSV/Excel files; multiple files are concatenated
    #[arg(required = true, num_args = 1.., value_name = "PATH")]
    pub paths: Vec<PathBuf>,

    /// Filter override, e.g. "age=20..40" or "gender=Kobieta,Mężczyzna".
    /// Repeatable; unfiltered columns keep their seeded pass-all state
    #[arg(long = "filter", value_name = "SPEC")]
    pub filters: Vec<String>,

    /// Chart kinds to render (histogram, scatter, correlation, box, violin,
    /// count, matrix). Overrides the config defaults when given
    #[arg(long = "chart", value_name = "KIND")]
    pub charts: Vec<ChartKind>,

    /// Chart comment, e.g. "histogram=wyraźny pik w okolicach 30"
    #[arg(long = "comment", value_name = "KIND=TEXT")]
    pub comments: Vec<String>,

    /// Numeric column for the X axis
    #[arg(long)]
    pub x: Option<String>,

    /// Numeric column for the Y axis
    #[arg(long)]
    pub y: Option<String>,

    /// Categorical column used to color the scatter chart
    #[arg(long)]
    pub color: Option<String>,

    /// Write the filtered dataset as CSV
    #[arg(long, value_name = "PATH")]
    pub out_csv: Option<PathBuf>,

    /// Write the filtered dataset as an Excel workbook
    #[arg(long, value_name = "PATH")]
    pub out_xlsx: Option<PathBuf>,

    /// Write the PDF report
    #[arg(long, value_name = "PATH")]
    pub out_pdf: Option<PathBuf>,

    /// Write the HTML report
    #[arg(long, value_name = "PATH")]
    pub out_html: Option<PathBuf>,

    /// PNG logo embedded into the HTML report chrome
    #[arg(long, value_name = "PATH")]
    pub logo: Option<PathBuf>,

    /// Rows in the report preview table (default from config)
    #[arg(long, value_name = "N")]
    pub preview_rows: Option<usize>,
}

#[derive(Clone, ClapArgs, Debug)]
pub struct ClusterArgs {
    /// Directory holding the pipeline, survey CSV, and descriptions JSON
    #[arg(long, value_name = "DIR", default_value = ".")]
    pub artifacts: PathBuf,

    /// Age bracket
    #[arg(long, default_value = "25-34")]
    pub age: String,

    /// Education level
    #[arg(long, default_value = "Średnie")]
    pub edu_level: String,

    /// Favorite animals
    #[arg(long, default_value = "Psy")]
    pub fav_animals: String,

    /// Favorite place
    #[arg(long, default_value = "Nad wodą")]
    pub fav_place: String,

    /// Gender
    #[arg(long, default_value = "Kobieta")]
    pub gender: String,

    /// Write the group-comparison report as HTML
    #[arg(long, value_name = "PATH")]
    pub out_html: Option<PathBuf>,

    /// PNG logo embedded into the HTML report chrome
    #[arg(long, value_name = "PATH")]
    pub logo: Option<PathBuf>,
}

/// A parsed `--filter` argument.
#[derive(Clone, Debug, PartialEq)]
pub enum FilterArg {
    Range {
        column: String,
        low: f64,
        high: f64,
    },
    Values {
        column: String,
        values: Vec<String>,
    },
}

/// Parses `col=lo..hi` into a range filter and `col=a,b,c` into a value
/// selection. A single numeric value is a degenerate range.
pub fn parse_filter_arg(spec: &str) -> Result<FilterArg> {
    let (column, rest) = spec
        .split_once('=')
        .ok_or_else(|| eyre!("filter '{}' must look like column=spec", spec))?;
    let column = column.trim().to_string();
    let rest = rest.trim();
    if column.is_empty() || rest.is_empty() {
        return Err(eyre!("filter '{}' must look like column=spec", spec));
    }
    if let Some((lo, hi)) = rest.split_once("..") {
        let low: f64 = lo
            .trim()
            .parse()
            .map_err(|_| eyre!("filter '{}': bad lower bound '{}'", spec, lo))?;
        let high: f64 = hi
            .trim()
            .parse()
            .map_err(|_| eyre!("filter '{}': bad upper bound '{}'", spec, hi))?;
        if high < low {
            return Err(eyre!("filter '{}': empty range", spec));
        }
        return Ok(FilterArg::Range { column, low, high });
    }
    if let Ok(value) = rest.parse::<f64>() {
        return Ok(FilterArg::Range {
            column,
            low: value,
            high: value,
        });
    }
    Ok(FilterArg::Values {
        column,
        values: rest.split(',').map(|v| v.trim().to_string()).collect(),
    })
}

/// Parses a `--comment kind=text` argument.
pub fn parse_comment_arg(spec: &str) -> Result<(ChartKind, String)> {
    let (kind, text) = spec
        .split_once('=')
        .ok_or_else(|| eyre!("comment '{}' must look like kind=text", spec))?;
    let kind: ChartKind = kind
        .trim()
        .parse()
        .map_err(|e: String| eyre!("comment '{}': {}", spec, e))?;
    Ok((kind, text.trim().to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_range_filter() {
        assert_eq!(
            parse_filter_arg("age=20..40").unwrap(),
            FilterArg::Range {
                column: "age".to_string(),
                low: 20.0,
                high: 40.0
            }
        );
    }

    #[test]
    fn parses_value_filter() {
        assert_eq!(
            parse_filter_arg("gender=Kobieta,Mężczyzna").unwrap(),
            FilterArg::Values {
                column: "gender".to_string(),
                values: vec!["Kobieta".to_string(), "Mężczyzna".to_string()]
            }
        );
    }

    #[test]
    fn single_number_is_degenerate_range() {
        assert_eq!(
            parse_filter_arg("age=30").unwrap(),
            FilterArg::Range {
                column: "age".to_string(),
                low: 30.0,
                high: 30.0
            }
        );
    }

    #[test]
    fn rejects_malformed_filters() {
        assert!(parse_filter_arg("age").is_err());
        assert!(parse_filter_arg("age=").is_err());
        assert!(parse_filter_arg("age=40..20").is_err());
        assert!(parse_filter_arg("age=x..y").is_err());
    }

    #[test]
    fn parses_comment() {
        let (kind, text) = parse_comment_arg("histogram=pik przy 30").unwrap();
        assert_eq!(kind, ChartKind::Histogram);
        assert_eq!(text, "pik przy 30");
        assert!(parse_comment_arg("nosuchchart=x").is_err());
    }
}
