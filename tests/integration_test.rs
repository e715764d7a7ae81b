mod common;

use ankieta::charts::ChartKind;
use ankieta::dataset;
use ankieta::state::DashboardState;

#[test]
fn upload_normalizes_columns_and_coerces_ages() {
    let dir = tempfile::tempdir().unwrap();
    let path = common::write_survey_csv(dir.path());

    let (df, skipped) = dataset::load_files(&[path]).unwrap();
    assert!(skipped.is_empty());

    let names: Vec<String> = df
        .get_column_names()
        .iter()
        .map(|s| s.to_string())
        .collect();
    assert_eq!(names, vec!["age", "gender"]);

    let ages = df.column("age").unwrap().f64().unwrap();
    assert_eq!(ages.get(0), Some(29.5));
    assert_eq!(ages.get(1), Some(9.0));
}

#[test]
fn full_pipeline_filters_and_charts() {
    let dir = tempfile::tempdir().unwrap();
    let path = common::write_full_survey_csv(dir.path());

    let (df, _) = dataset::load_files(&[path]).unwrap();
    let mut state = DashboardState::new(df).unwrap();

    // "nie wiem" degraded to a missing experience value and must survive
    // any experience filter (null-permissive policy).
    state
        .set_range_filter("experience_years", 4.0, 20.0)
        .unwrap();
    let filtered = state.filtered().unwrap();
    let experience = filtered.column("experience_years").unwrap();
    assert_eq!(experience.null_count(), 1);
    assert_eq!(filtered.height(), 3); // >=5, >=10, and the null row

    // Applying the same filters to the already-filtered frame changes nothing.
    let again = state.filters.apply(&filtered).unwrap();
    assert_eq!(filtered, again);

    let charts = state.charts().unwrap();
    assert!(charts.iter().any(|c| c.kind == ChartKind::Histogram));
    assert!(charts.iter().any(|c| c.kind == ChartKind::Scatter));
    assert!(charts.iter().any(|c| c.kind == ChartKind::Correlation));
}

#[test]
fn two_uploads_concatenate() {
    let dir = tempfile::tempdir().unwrap();
    let first = common::write_survey_csv(dir.path());
    let second = dir.path().join("druga.csv");
    std::fs::write(&second, "wiek,płeć\n55-64,Kobieta\n").unwrap();

    let (df, _) = dataset::load_files(&[first, second]).unwrap();
    assert_eq!(df.height(), 3);
    let ages = df.column("age").unwrap().f64().unwrap();
    assert_eq!(ages.get(2), Some(59.5));
}
