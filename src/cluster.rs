//! Cluster lookup for the friend-finder dashboards: a pre-trained pipeline
//! classifies a user profile into a cluster, the cluster's name and
//! description come from a JSON sidecar, and the reference survey is
//! filtered to same-cluster rows for comparison charts.
//!
//! The pipeline artifact is consumed through a fixed contract (profile row
//! in, cluster id out): a JSON file of per-feature one-hot encodings plus
//! cluster centroids, assignment by nearest centroid. A cluster id missing
//! from the descriptions sidecar is a data-integrity error, not a
//! recoverable condition.

use color_eyre::eyre::eyre;
use color_eyre::Result;
use polars::prelude::*;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use crate::cache::{Fingerprint, MemoCache};
use crate::charts::{Chart, ChartData, ChartKind};
use crate::dataset;

/// Sidecar file names, fixed relative to the artifacts directory.
pub const PIPELINE_FILE: &str = "welcome_survey_clustering_pipeline_v2.json";
pub const DATA_FILE: &str = "welcome_survey_simple_v2.csv";
pub const DESCRIPTIONS_FILE: &str = "welcome_survey_cluster_names_and_descriptions_v2.json";

/// Profile fields, in pipeline input order.
pub const PROFILE_FIELDS: [&str; 5] = ["age", "edu_level", "fav_animals", "fav_place", "gender"];

/// Survey age brackets in display order (also the histogram order).
pub const AGE_BRACKETS: [&str; 8] = [
    "<18", "18-24", "25-34", "35-44", "45-54", "55-64", ">=65", "unknown",
];
pub const EDU_LEVELS: [&str; 3] = ["Podstawowe", "Średnie", "Wyższe"];
pub const FAV_ANIMALS: [&str; 5] = ["Brak ulubionych", "Psy", "Koty", "Koty i Psy", "Inne"];
pub const FAV_PLACES: [&str; 4] = ["Nad wodą", "W lesie", "W górach", "Inne"];
pub const GENDERS: [&str; 2] = ["Kobieta", "Mężczyzna"];

/// One user's answers, the classifier's only input.
#[derive(Clone, Debug)]
pub struct Profile {
    pub age: String,
    pub edu_level: String,
    pub fav_animals: String,
    pub fav_place: String,
    pub gender: String,
}

impl Profile {
    fn field(&self, name: &str) -> Option<&str> {
        match name {
            "age" => Some(&self.age),
            "edu_level" => Some(&self.edu_level),
            "fav_animals" => Some(&self.fav_animals),
            "fav_place" => Some(&self.fav_place),
            "gender" => Some(&self.gender),
            _ => None,
        }
    }
}

#[derive(Debug, Deserialize)]
struct FeatureEncoder {
    column: String,
    categories: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct Centroid {
    cluster: String,
    values: Vec<f64>,
}

/// The serialized clustering pipeline: one-hot feature encoders plus
/// cluster centroids. Assignment is nearest centroid in encoded space.
#[derive(Debug, Deserialize)]
pub struct ClusterPipeline {
    features: Vec<FeatureEncoder>,
    centroids: Vec<Centroid>,
}

impl ClusterPipeline {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| eyre!("pipeline artifact {}: {}", path.display(), e))?;
        let pipeline: Self = serde_json::from_str(&raw)?;
        let width: usize = pipeline.features.iter().map(|f| f.categories.len()).sum();
        if pipeline.centroids.is_empty() {
            return Err(eyre!("pipeline artifact has no centroids"));
        }
        for centroid in &pipeline.centroids {
            if centroid.values.len() != width {
                return Err(eyre!(
                    "centroid '{}' has {} values, expected {}",
                    centroid.cluster,
                    centroid.values.len(),
                    width
                ));
            }
        }
        Ok(pipeline)
    }

    /// One-hot encodes a row; values outside the known categories encode to
    /// all zeros for that feature.
    fn encode<'a>(&self, mut get: impl FnMut(&str) -> Option<&'a str>) -> Vec<f64> {
        let mut encoded = Vec::new();
        for feature in &self.features {
            let value = get(&feature.column);
            for category in &feature.categories {
                let hit = value.is_some_and(|v| v == category.as_str());
                encoded.push(if hit { 1.0 } else { 0.0 });
            }
        }
        encoded
    }

    fn nearest(&self, encoded: &[f64]) -> &str {
        let mut best = &self.centroids[0];
        let mut best_dist = f64::INFINITY;
        for centroid in &self.centroids {
            let dist: f64 = centroid
                .values
                .iter()
                .zip(encoded)
                .map(|(c, v)| (c - v).powi(2))
                .sum();
            if dist < best_dist {
                best_dist = dist;
                best = centroid;
            }
        }
        &best.cluster
    }

    /// Classifies one profile.
    pub fn predict(&self, profile: &Profile) -> String {
        self.nearest(&self.encode(|name| profile.field(name)))
            .to_string()
    }

    /// Classifies every row of a table holding the profile columns, returning
    /// the cluster id per row. Missing cells encode as all zeros.
    pub fn predict_all(&self, df: &DataFrame) -> Result<Vec<String>> {
        let mut held = Vec::new();
        let mut columns: BTreeMap<&str, &StringChunked> = BTreeMap::new();
        for feature in &self.features {
            let series = df
                .column(feature.column.as_str())
                .map_err(|_| eyre!("survey data lacks column '{}'", feature.column))?
                .as_materialized_series()
                .clone();
            held.push((feature.column.as_str(), series));
        }
        for (name, series) in &held {
            columns.insert(*name, series.str()?);
        }
        let mut out = Vec::with_capacity(df.height());
        for i in 0..df.height() {
            let encoded = self.encode(|name| columns.get(name).and_then(|ca| ca.get(i)));
            out.push(self.nearest(&encoded).to_string());
        }
        Ok(out)
    }
}

/// Human-readable cluster identity from the JSON sidecar.
#[derive(Clone, Debug, Deserialize)]
pub struct ClusterInfo {
    pub name: String,
    pub description: String,
}

/// Cluster id -> name/description, loaded once, read-only.
#[derive(Debug)]
pub struct ClusterCatalog {
    entries: BTreeMap<String, ClusterInfo>,
}

impl ClusterCatalog {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| eyre!("cluster descriptions {}: {}", path.display(), e))?;
        let entries: BTreeMap<String, ClusterInfo> = serde_json::from_str(&raw)?;
        Ok(Self { entries })
    }

    /// An id the pipeline produced but the sidecar does not know is fatal.
    pub fn get(&self, cluster_id: &str) -> Result<&ClusterInfo> {
        self.entries
            .get(cluster_id)
            .ok_or_else(|| eyre!("cluster id '{}' missing from descriptions table", cluster_id))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// The three sidecars loaded together, with the reference survey already
/// classified (the `Cluster` column is appended at load time).
pub struct ClusterArtifacts {
    pub pipeline: ClusterPipeline,
    pub catalog: ClusterCatalog,
    pub participants: DataFrame,
}

impl ClusterArtifacts {
    /// Loads all three sidecars from `dir`. Any missing file is fatal.
    pub fn load(dir: &Path) -> Result<Self> {
        let pipeline = ClusterPipeline::load(&dir.join(PIPELINE_FILE))?;
        let catalog = ClusterCatalog::load(&dir.join(DESCRIPTIONS_FILE))?;
        let mut participants = dataset::load_csv_with(&dir.join(DATA_FILE), Some(b';'))?;
        let clusters = pipeline.predict_all(&participants)?;
        participants.with_column(Series::new("Cluster".into(), clusters))?;
        log::info!(
            "loaded cluster artifacts: {} participants, {} clusters",
            participants.height(),
            catalog.len()
        );
        Ok(Self {
            pipeline,
            catalog,
            participants,
        })
    }

    /// Memoized load keyed by the sidecar fingerprints; re-reads only when
    /// one of the three files changed.
    pub fn load_cached(dir: &Path, cache: &mut MemoCache<ClusterArtifacts>) -> Result<Arc<Self>> {
        let fingerprint = Fingerprint::for_value(&(
            Fingerprint::for_path(&dir.join(PIPELINE_FILE))?,
            Fingerprint::for_path(&dir.join(DATA_FILE))?,
            Fingerprint::for_path(&dir.join(DESCRIPTIONS_FILE))?,
        ));
        cache.get_or_load("cluster-artifacts", fingerprint, || Self::load(dir))
    }

    /// Classifies the profile and returns its cluster with the same-cluster
    /// participants.
    pub fn find_match(&self, profile: &Profile) -> Result<ClusterMatch<'_>> {
        let cluster_id = self.pipeline.predict(profile);
        let info = self.catalog.get(&cluster_id)?;
        let members = self
            .participants
            .clone()
            .lazy()
            .filter(col("Cluster").eq(lit(cluster_id.as_str())))
            .collect()?;
        Ok(ClusterMatch {
            cluster_id,
            info,
            members,
        })
    }
}

/// The user's predicted cluster and everyone else in it.
#[derive(Debug)]
pub struct ClusterMatch<'a> {
    pub cluster_id: String,
    pub info: &'a ClusterInfo,
    pub members: DataFrame,
}

impl ClusterMatch<'_> {
    /// Distribution charts over the profile fields for the group, age in
    /// bracket order, the rest by frequency.
    pub fn comparison_charts(&self) -> Result<Vec<Chart>> {
        let titled = [
            ("age", "Rozkład wieku w grupie"),
            ("edu_level", "Rozkład wykształcenia w grupie"),
            ("fav_animals", "Rozkład ulubionych zwierząt w grupie"),
            ("fav_place", "Rozkład ulubionych miejsc w grupie"),
            ("gender", "Rozkład płci w grupie"),
        ];
        let mut charts = Vec::new();
        for (field, title) in titled {
            let Ok(column) = self.members.column(field) else {
                continue;
            };
            let series = column.as_materialized_series().cast(&DataType::String)?;
            let ca = series.str()?;
            let mut counts: BTreeMap<String, u32> = BTreeMap::new();
            for value in ca.into_iter().flatten() {
                *counts.entry(value.to_string()).or_insert(0) += 1;
            }
            let mut pairs: Vec<(String, u32)> = counts.into_iter().collect();
            if field == "age" {
                pairs.sort_by_key(|(label, _)| {
                    AGE_BRACKETS
                        .iter()
                        .position(|b| b == label)
                        .unwrap_or(AGE_BRACKETS.len())
                });
            } else {
                pairs.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
            }
            let (labels, counts) = pairs.into_iter().unzip();
            charts.push(Chart {
                kind: ChartKind::Count,
                title: title.to_string(),
                data: ChartData::Count {
                    column: field.to_string(),
                    labels,
                    counts,
                },
                comment: None,
            });
        }
        Ok(charts)
    }

    /// Most frequent value per profile field ("typical member" summary).
    pub fn mode_summary(&self) -> Result<Vec<(String, String)>> {
        let mut summary = Vec::new();
        for field in PROFILE_FIELDS {
            let Ok(column) = self.members.column(field) else {
                continue;
            };
            let series = column.as_materialized_series().cast(&DataType::String)?;
            let ca = series.str()?;
            let mut counts: BTreeMap<String, u32> = BTreeMap::new();
            for value in ca.into_iter().flatten() {
                *counts.entry(value.to_string()).or_insert(0) += 1;
            }
            if let Some((value, _)) = counts
                .into_iter()
                .max_by(|a, b| a.1.cmp(&b.1).then_with(|| b.0.cmp(&a.0)))
            {
                summary.push((field.to_string(), value));
            }
        }
        Ok(summary)
    }
}
