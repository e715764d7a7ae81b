//! Loading uploaded survey files into a single normalized table.
//!
//! CSV delimiters are sniffed from the first line; Excel files are read
//! eagerly through calamine with per-column type inference. Files with an
//! unsupported extension are skipped with a visible error instead of
//! aborting the whole load.

use calamine::{open_workbook_auto, Data, Reader};
use color_eyre::eyre::eyre;
use color_eyre::Result;
use polars::prelude::*;
use std::collections::BTreeMap;
use std::fs::File;
use std::io::Read as _;
use std::path::Path;

use crate::coerce;
use crate::schema;

/// Supported input file formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileFormat {
    /// Delimiter-sniffed CSV
    Csv,
    /// Excel (.xls, .xlsx, .xlsm, .xlsb)
    Excel,
}

impl FileFormat {
    /// Detect file format from path extension. Returns None when the
    /// extension is missing or unsupported.
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension().and_then(|e| e.to_str())?;
        match ext.to_lowercase().as_str() {
            "csv" => Some(Self::Csv),
            "xls" | "xlsx" | "xlsm" | "xlsb" => Some(Self::Excel),
            _ => None,
        }
    }
}

/// A file that could not be loaded, with the reason. Collected so one bad
/// upload does not abort the rest.
#[derive(Debug)]
pub struct SkippedFile {
    pub path: std::path::PathBuf,
    pub reason: String,
}

/// Candidate CSV delimiters, most common first.
const DELIMITER_CANDIDATES: &[u8] = b",;\t|";

/// Sniffs the delimiter from the first non-empty line: the candidate with the
/// most occurrences outside double quotes wins, defaulting to a comma.
pub fn sniff_delimiter(sample: &str) -> u8 {
    let line = sample.lines().find(|l| !l.trim().is_empty()).unwrap_or("");
    let mut best = b',';
    let mut best_count = 0usize;
    for &candidate in DELIMITER_CANDIDATES {
        let mut in_quotes = false;
        let mut count = 0usize;
        for b in line.bytes() {
            match b {
                b'"' => in_quotes = !in_quotes,
                _ if b == candidate && !in_quotes => count += 1,
                _ => {}
            }
        }
        if count > best_count {
            best = candidate;
            best_count = count;
        }
    }
    best
}

/// Reads a CSV file with a sniffed delimiter.
pub fn load_csv(path: &Path) -> Result<DataFrame> {
    load_csv_with(path, None)
}

/// Reads a CSV file, sniffing the delimiter unless one is given.
pub fn load_csv_with(path: &Path, delimiter: Option<u8>) -> Result<DataFrame> {
    let separator = match delimiter {
        Some(d) => d,
        None => {
            let mut sample = vec![0u8; 8192];
            let mut file = File::open(path)?;
            let n = file.read(&mut sample)?;
            sniff_delimiter(&String::from_utf8_lossy(&sample[..n]))
        }
    };
    let df = CsvReadOptions::default()
        .map_parse_options(|opts| opts.with_separator(separator))
        .try_into_reader_with_file_path(Some(path.into()))?
        .finish()?;
    Ok(df)
}

/// Inferred column type for Excel ingestion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ExcelColType {
    Int64,
    Float64,
    Boolean,
    Utf8,
}

/// Reads the first worksheet of an Excel file (eager, calamine).
pub fn load_excel(path: &Path) -> Result<DataFrame> {
    let mut workbook = open_workbook_auto(path).map_err(|e| eyre!("Excel: {}", e))?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| eyre!("Excel file has no worksheets"))?
        .map_err(|e| eyre!("Excel: {}", e))?;
    let rows: Vec<Vec<Data>> = range.rows().map(|r| r.to_vec()).collect();
    if rows.is_empty() {
        return Ok(DataFrame::empty());
    }
    let headers: Vec<String> = rows[0]
        .iter()
        .map(|c| calamine::DataType::as_string(c).unwrap_or_else(|| c.to_string()))
        .collect();
    let mut columns = Vec::with_capacity(headers.len());
    for (col_idx, header) in headers.iter().enumerate() {
        let cells: Vec<Option<&Data>> = rows[1..].iter().map(|row| row.get(col_idx)).collect();
        let name = if header.is_empty() {
            format!("column_{}", col_idx + 1)
        } else {
            header.clone()
        };
        columns.push(excel_column_to_series(&name, &cells, excel_infer_column_type(&cells)).into());
    }
    Ok(DataFrame::new(columns)?)
}

/// Prefers Int64 for whole-number floats; any string cell makes the column text.
fn excel_infer_column_type(cells: &[Option<&Data>]) -> ExcelColType {
    use calamine::DataType as CalamineTrait;
    let mut has_float = false;
    let mut has_int = false;
    let mut has_bool = false;
    for cell in cells.iter().flatten() {
        if CalamineTrait::is_string(*cell) {
            return ExcelColType::Utf8;
        }
        if CalamineTrait::is_float(*cell) {
            has_float = true;
        }
        if CalamineTrait::is_int(*cell) {
            has_int = true;
        }
        if CalamineTrait::is_bool(*cell) {
            has_bool = true;
        }
    }
    if has_int && !has_float {
        ExcelColType::Int64
    } else if has_float {
        let all_whole = cells.iter().flatten().all(|cell| {
            CalamineTrait::as_f64(*cell)
                .is_none_or(|f| f.is_finite() && (f - f.trunc()).abs() < 1e-10)
        });
        if all_whole {
            ExcelColType::Int64
        } else {
            ExcelColType::Float64
        }
    } else if has_bool {
        ExcelColType::Boolean
    } else {
        ExcelColType::Utf8
    }
}

fn excel_column_to_series(name: &str, cells: &[Option<&Data>], col_type: ExcelColType) -> Series {
    use calamine::DataType as CalamineTrait;
    match col_type {
        ExcelColType::Int64 => {
            let v: Vec<Option<i64>> = cells
                .iter()
                .map(|c| c.and_then(|cell| CalamineTrait::as_i64(cell)))
                .collect();
            Series::new(name.into(), v)
        }
        ExcelColType::Float64 => {
            let v: Vec<Option<f64>> = cells
                .iter()
                .map(|c| c.and_then(|cell| CalamineTrait::as_f64(cell)))
                .collect();
            Series::new(name.into(), v)
        }
        ExcelColType::Boolean => {
            let v: Vec<Option<bool>> = cells
                .iter()
                .map(|c| c.and_then(|cell| cell.get_bool()))
                .collect();
            Series::new(name.into(), v)
        }
        ExcelColType::Utf8 => {
            let v: Vec<Option<String>> = cells
                .iter()
                .map(|c| {
                    c.and_then(|cell| {
                        if CalamineTrait::is_empty(cell) {
                            None
                        } else {
                            CalamineTrait::as_string(cell)
                        }
                    })
                })
                .collect();
            Series::new(name.into(), v)
        }
    }
}

/// Loads one file by extension and normalizes its column names.
pub fn load_table(path: &Path) -> Result<DataFrame> {
    let format = FileFormat::from_path(path)
        .ok_or_else(|| eyre!("Nieobsługiwany format pliku: {}", path.display()))?;
    let mut df = match format {
        FileFormat::Csv => load_csv(path)?,
        FileFormat::Excel => load_excel(path)?,
    };
    schema::normalize_columns(&mut df)?;
    Ok(df)
}

/// Loads many files, skipping the ones that fail, concatenating the rest by
/// column-name union, and coercing the canonical fields. Errors only when no
/// file loaded at all.
pub fn load_files(paths: &[impl AsRef<Path>]) -> Result<(DataFrame, Vec<SkippedFile>)> {
    let mut frames = Vec::new();
    let mut skipped = Vec::new();
    for path in paths {
        let path = path.as_ref();
        match load_table(path) {
            Ok(df) => {
                log::info!("loaded {} ({} rows)", path.display(), df.height());
                frames.push(df);
            }
            Err(e) => {
                log::warn!("skipping {}: {}", path.display(), e);
                skipped.push(SkippedFile {
                    path: path.to_path_buf(),
                    reason: e.to_string(),
                });
            }
        }
    }
    if frames.is_empty() {
        return Err(eyre!("no loadable input files"));
    }
    let mut df = align_concat(frames)?;
    coerce::preprocess(&mut df)?;
    Ok((df, skipped))
}

/// Concatenates frames over the union of their columns (first-seen order).
/// A column missing in a frame is filled with nulls; a column whose dtype
/// disagrees between frames is unified to text.
pub fn align_concat(frames: Vec<DataFrame>) -> Result<DataFrame> {
    let mut order: Vec<String> = Vec::new();
    let mut dtypes: BTreeMap<String, DataType> = BTreeMap::new();
    for frame in &frames {
        for column in frame.get_columns() {
            let name = column.name().to_string();
            match dtypes.get(&name) {
                None => {
                    order.push(name.clone());
                    dtypes.insert(name, column.dtype().clone());
                }
                Some(existing) if existing != column.dtype() => {
                    dtypes.insert(name, DataType::String);
                }
                Some(_) => {}
            }
        }
    }

    let mut combined: Option<DataFrame> = None;
    for frame in frames {
        let height = frame.height();
        let mut columns = Vec::with_capacity(order.len());
        for name in &order {
            let dtype = &dtypes[name];
            let series = match frame.column(name.as_str()) {
                Ok(column) => column.as_materialized_series().cast(dtype)?,
                Err(_) => Series::full_null(name.as_str().into(), height, dtype),
            };
            columns.push(series.into());
        }
        let aligned = DataFrame::new(columns)?;
        combined = Some(match combined {
            Some(mut acc) => {
                acc.vstack_mut(&aligned)?;
                acc
            }
            None => aligned,
        });
    }
    Ok(combined.unwrap_or_else(DataFrame::empty))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn sniffs_common_delimiters() {
        assert_eq!(sniff_delimiter("a,b,c\n1,2,3"), b',');
        assert_eq!(sniff_delimiter("a;b;c\n1;2;3"), b';');
        assert_eq!(sniff_delimiter("a\tb\tc"), b'\t');
        assert_eq!(sniff_delimiter("a|b|c"), b'|');
        // quoted separators do not count
        assert_eq!(sniff_delimiter("\"a;b\",c\n"), b',');
        // no separator at all: default comma
        assert_eq!(sniff_delimiter("justonecolumn"), b',');
    }

    #[test]
    fn format_detection() {
        assert_eq!(
            FileFormat::from_path(Path::new("dane.csv")),
            Some(FileFormat::Csv)
        );
        assert_eq!(
            FileFormat::from_path(Path::new("dane.XLSX")),
            Some(FileFormat::Excel)
        );
        assert_eq!(FileFormat::from_path(Path::new("dane.parquet")), None);
        assert_eq!(FileFormat::from_path(Path::new("dane")), None);
    }

    #[test]
    fn loads_semicolon_csv() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dane.csv");
        let mut f = File::create(&path).unwrap();
        writeln!(f, "Wiek;Płeć").unwrap();
        writeln!(f, "25-34;Kobieta").unwrap();
        writeln!(f, "<18;Mężczyzna").unwrap();
        drop(f);
        let df = load_table(&path).unwrap();
        assert_eq!(df.height(), 2);
        let names: Vec<String> = df
            .get_column_names()
            .iter()
            .map(|s| s.to_string())
            .collect();
        assert_eq!(names, vec!["age", "gender"]);
    }

    #[test]
    fn unsupported_extension_is_skipped_not_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let good = dir.path().join("dane.csv");
        std::fs::write(&good, "wiek,gender\n25-34,Kobieta\n").unwrap();
        let bad = dir.path().join("dane.parquet");
        std::fs::write(&bad, "not really parquet").unwrap();
        let (df, skipped) = load_files(&[good, bad]).unwrap();
        assert_eq!(df.height(), 1);
        assert_eq!(skipped.len(), 1);
        assert!(skipped[0].reason.contains("Nieobsługiwany format"));
    }

    #[test]
    fn all_files_unloadable_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let bad = dir.path().join("dane.foo");
        std::fs::write(&bad, "x").unwrap();
        assert!(load_files(&[bad]).is_err());
    }

    #[test]
    fn align_concat_unions_columns() {
        let a = df!("x" => &[1i64, 2], "y" => &["a", "b"]).unwrap();
        let b = df!("x" => &[3i64]).unwrap();
        let out = align_concat(vec![a, b]).unwrap();
        assert_eq!(out.height(), 3);
        assert_eq!(out.column("y").unwrap().null_count(), 1);
    }

    #[test]
    fn align_concat_unifies_clashing_dtypes_to_text() {
        let a = df!("x" => &[1i64, 2]).unwrap();
        let b = df!("x" => &["trzy"]).unwrap();
        let out = align_concat(vec![a, b]).unwrap();
        assert_eq!(out.column("x").unwrap().dtype(), &DataType::String);
        assert_eq!(out.height(), 3);
    }
}
