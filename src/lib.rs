//! Survey data analysis: load CSV/Excel uploads, normalize and coerce the
//! canonical survey columns, filter interactively, build charts, and export
//! the result as CSV/Excel data or PDF/HTML reports. A second entry point
//! classifies a user profile into a pre-trained cluster and charts the
//! matching group.

pub mod cache;
pub mod charts;
pub mod cli;
pub mod cluster;
pub mod coerce;
pub mod config;
pub mod dataset;
pub mod export;
pub mod figure;
pub mod filter;
pub mod report;
pub mod schema;
pub mod state;

/// Application name used for the config directory and other app paths.
pub const APP_NAME: &str = "ankieta";

pub use cache::{Fingerprint, MemoCache};
pub use charts::{Chart, ChartKind, ChartSelection, ChartToggles};
pub use cluster::{ClusterArtifacts, Profile};
pub use config::{AppConfig, ConfigManager};
pub use filter::{ColumnFilter, FilterSet};
pub use state::DashboardState;
