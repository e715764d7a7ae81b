//! Canonical column schema and header normalization for uploaded survey files.

use polars::prelude::DataFrame;

/// Canonical field names that downstream coercion and filtering depend on.
pub const CANONICAL_FIELDS: &[&str] = &[
    "age",
    "experience_years",
    "gender",
    "edu_level",
    "industry",
    "class",
];

/// Synonym table: lowercase substring -> canonical field name.
/// Scanned in order; the first key contained in a header wins.
pub const STANDARD_COLUMNS: &[(&str, &str)] = &[
    ("wiek", "age"),
    ("lat", "age"),
    ("years_of_experience", "experience_years"),
    ("doświadczenie", "experience_years"),
    ("płeć", "gender"),
    ("gender", "gender"),
    ("edu_level", "edu_level"),
    ("edukacja", "edu_level"),
    ("industry", "industry"),
    ("branża", "industry"),
    ("class", "class"),
];

/// Maps a raw header to its canonical field name, if any synonym matches.
/// Headers are trimmed and lower-cased before matching.
pub fn canonical_name(raw: &str) -> Option<&'static str> {
    let cleaned = raw.trim().to_lowercase();
    STANDARD_COLUMNS
        .iter()
        .find(|(key, _)| cleaned.contains(key))
        .map(|(_, std_name)| *std_name)
}

/// Lower-cases and trims every column name, then renames synonym matches to
/// their canonical field. Unmatched columns pass through (cleaned but kept).
pub fn normalize_columns(df: &mut DataFrame) -> polars::prelude::PolarsResult<()> {
    let renames: Vec<(String, String)> = df
        .get_column_names()
        .iter()
        .map(|name| {
            let target = match canonical_name(name) {
                Some(std_name) => std_name.to_string(),
                None => name.trim().to_lowercase(),
            };
            (name.to_string(), target)
        })
        .collect();

    for (old, new) in renames {
        if old != new {
            df.rename(&old, new.into())?;
        }
    }
    Ok(())
}
